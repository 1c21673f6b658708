//! Edge callbacks driven by a pin change interrupt.
//!
//! A [`ChangeRegistry`] owns the channels that are watched from the interrupt
//! and the platform's [`ChangeNotifier`]. Call [`ChangeRegistry::dispatch`]
//! from the change notification interrupt handler; it checks every registered
//! channel and calls back on matching, debounced edges.
//!
//! A registered channel is moved into the registry, so it cannot be polled at
//! the same time. Take it back with [`ChangeRegistry::release`].
//!
//! The interrupt path keeps its own debounce timer. It does not touch the
//! transition history. On release the channel's debounced value is set to the
//! last level the interrupt reported.
//!
//! # Example
//!
//! ```rust,ignore
//! use core::cell::RefCell;
//! use debounced_input::notify::{self, ChangeRegistry, Edge, Shared};
//!
//! static BUTTONS: Shared<ChangeRegistry<ButtonPin, fn() -> u32, ActiveLow, CnPort, 4>> =
//!     Shared::new(RefCell::new(ChangeRegistry::new(CnPort)));
//!
//! fn pressed(_level: bool) {
//!     // ...
//! }
//!
//! critical_section::with(|cs| {
//!     let mut buttons = BUTTONS.borrow_ref_mut(cs);
//!     buttons.register(button, pressed, Edge::Falling).ok();
//! });
//!
//! #[interrupt]
//! fn CHANGE_NOTICE() {
//!     notify::dispatch_shared(&BUTTONS);
//! }
//! ```

use core::cell::RefCell;
use core::fmt;

use embedded_hal::digital::v2::InputPin;
use log::{debug, trace, warn};

use crate::{Activeness, Clock, DebouncedInput};

/// A registry shared between setup code and the interrupt handler.
pub type Shared<R> = critical_section::Mutex<RefCell<R>>;

/// Platform access to pin change notification.
pub trait ChangeNotifier<P> {
    /// `true` if `pin` can raise a change notification.
    fn supports(&self, pin: &P) -> bool;

    /// Sets up the shared interrupt (vector, priority, global enable).
    ///
    /// Called once, on the first successful registration.
    fn install(&mut self);

    /// Enables change notification for `pin`.
    fn enable(&mut self, pin: &P);

    /// Disables change notification for `pin`.
    fn disable(&mut self, pin: &P);

    /// `true` if the change notification interrupt flag is set.
    fn is_pending(&self) -> bool;

    /// Clears the change notification interrupt flag.
    fn clear_pending(&mut self);
}

/// Which level changes invoke a callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    /// Low to high.
    Rising,
    /// High to low.
    Falling,
    /// Either direction.
    Both,
}

impl Edge {
    fn matches(self, level: bool) -> bool {
        match self {
            Edge::Rising => level,
            Edge::Falling => !level,
            Edge::Both => true,
        }
    }
}

/// Identifies a registered channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeHandle(usize);

/// A rejected registration. The channel is handed back.
pub enum RegisterError<T> {
    /// The pin cannot raise change notifications.
    NotCapable(T),
    /// Every slot of the registry is in use.
    Full(T),
}

impl<T> RegisterError<T> {
    /// Recovers the channel that could not be registered.
    pub fn into_inner(self) -> T {
        match self {
            RegisterError::NotCapable(channel) | RegisterError::Full(channel) => channel,
        }
    }
}

impl<T> fmt::Debug for RegisterError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegisterError::NotCapable(_) => f.write_str("NotCapable(_)"),
            RegisterError::Full(_) => f.write_str("Full(_)"),
        }
    }
}

impl<T> fmt::Display for RegisterError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegisterError::NotCapable(_) => f.write_str("pin has no change notification"),
            RegisterError::Full(_) => f.write_str("no free edge callback slot"),
        }
    }
}

struct Watch<P, C, A> {
    channel: DebouncedInput<P, C, A>,
    callback: fn(bool),
    edge: Edge,
    /// When the callback last ran.
    last_fired: Option<u32>,
}

/// A fixed-size table of channels watched from the change interrupt.
pub struct ChangeRegistry<P, C, A, N, const SLOTS: usize> {
    notifier: N,
    installed: bool,
    slots: [Option<Watch<P, C, A>>; SLOTS],
}

impl<P, C, A, N, const SLOTS: usize> ChangeRegistry<P, C, A, N, SLOTS>
where
    P: InputPin,
    C: Clock,
    A: Activeness,
    N: ChangeNotifier<P>,
{
    const EMPTY: Option<Watch<P, C, A>> = None;

    /// An empty registry. Usable in a `static`.
    pub const fn new(notifier: N) -> Self {
        Self {
            notifier,
            installed: false,
            slots: [Self::EMPTY; SLOTS],
        }
    }

    /// Hands `channel` over to interrupt-driven edge detection.
    ///
    /// `callback` runs from within [`dispatch`](Self::dispatch) with the new
    /// level whenever the pin changes in the `edge` direction and more than
    /// the channel's debounce interval has passed since its last call.
    pub fn register(
        &mut self,
        channel: DebouncedInput<P, C, A>,
        callback: fn(bool),
        edge: Edge,
    ) -> Result<EdgeHandle, RegisterError<DebouncedInput<P, C, A>>> {
        if !self.notifier.supports(channel.pin()) {
            return Err(RegisterError::NotCapable(channel));
        }

        let index = match self.slots.iter().position(Option::is_none) {
            Some(index) => index,
            None => return Err(RegisterError::Full(channel)),
        };

        self.notifier.enable(channel.pin());
        if !self.installed {
            self.notifier.install();
            self.installed = true;
        }

        self.slots[index] = Some(Watch {
            channel,
            callback,
            edge,
            last_fired: None,
        });

        debug!("edge callback registered in slot {} for {:?}", index, edge);
        Ok(EdgeHandle(index))
    }

    /// Stops watching a channel and gives it back.
    ///
    /// The channel's debounced value is brought in line with the level last
    /// seen by the interrupt, so polling resumes without a stale edge. No
    /// history entry is recorded for it.
    pub fn release(&mut self, handle: EdgeHandle) -> Option<DebouncedInput<P, C, A>> {
        let mut watch = self.slots.get_mut(handle.0)?.take()?;
        self.notifier.disable(watch.channel.pin());

        let channel = &mut watch.channel;
        let level = channel.reported;
        channel.raw = level;
        channel.raw_since = channel.clock.now_ms();
        channel.value = level;

        debug!("edge callback in slot {} released at level {}", handle.0, level);
        Some(watch.channel)
    }

    /// Read access to a registered channel.
    pub fn channel(&self, handle: EdgeHandle) -> Option<&DebouncedInput<P, C, A>> {
        self.slots
            .get(handle.0)?
            .as_ref()
            .map(|watch| &watch.channel)
    }

    /// Number of registered channels.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// `true` if no channel is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The platform notifier.
    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Mutable access to the platform notifier.
    pub fn notifier_mut(&mut self) -> &mut N {
        &mut self.notifier
    }

    /// The change interrupt entry point.
    ///
    /// Checks every registered channel, then clears the pending flag. Returns
    /// how many callbacks were invoked.
    pub fn dispatch(&mut self) -> usize {
        if !self.notifier.is_pending() {
            return 0;
        }

        let mut fired = 0;
        for (index, slot) in self.slots.iter_mut().enumerate() {
            let watch = match slot {
                Some(watch) => watch,
                None => continue,
            };

            match watch.check() {
                Ok(Some(level)) => {
                    trace!("edge callback in slot {} -> {}", index, level);
                    (watch.callback)(level);
                    fired += 1;
                }
                Ok(None) => {}
                Err(_) => warn!("reading pin in slot {} failed", index),
            }
        }

        self.notifier.clear_pending();
        fired
    }
}

impl<P, C, A> Watch<P, C, A>
where
    P: InputPin,
    C: Clock,
{
    /// Returns the level to report, if this change should fire the callback.
    fn check(&mut self) -> Result<Option<bool>, P::Error> {
        let channel = &mut self.channel;

        let level = channel.pin.is_high()?;
        if level == channel.reported {
            return Ok(None);
        }
        channel.reported = level;

        if !self.edge.matches(level) {
            return Ok(None);
        }

        let now = channel.clock.now_ms();
        let settled = match self.last_fired {
            Some(at) => now.wrapping_sub(at) > channel.debounce_ms,
            None => true,
        };
        if !settled {
            return Ok(None);
        }

        self.last_fired = Some(now);
        Ok(Some(level))
    }
}

/// Runs [`ChangeRegistry::dispatch`] inside a critical section.
pub fn dispatch_shared<P, C, A, N, const SLOTS: usize>(
    registry: &Shared<ChangeRegistry<P, C, A, N, SLOTS>>,
) -> usize
where
    P: InputPin,
    C: Clock,
    A: Activeness,
    N: ChangeNotifier<P>,
{
    critical_section::with(|cs| registry.borrow_ref_mut(cs).dispatch())
}
