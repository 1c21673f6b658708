//! Debounces a single `InputPin` against a millisecond clock.
//!
//! # Implementation
//!
//! The raw level must stay unchanged for strictly longer than the debounce
//! interval before the debounced value follows it. Any bounce restarts the
//! timer.
//!
//! Nothing happens in the background. You drive the debouncer by calling
//! `sample()` (or one of the change queries, which sample for you) from your
//! control loop. Call it at least as often as your debounce interval.
//!
//! Optionally the channel keeps the times of the last few confirmed rising and
//! falling transitions.
//!
//! # Example
//!
//! ## Polling
//!
//! ```rust,ignore
//! use debounced_input::prelude::*;
//!
//! // This is up to the implementation details of the embedded_hal you are using.
//! let pin = hal_function_which_returns_configurable_input_pin();
//!
//! let mut button = DebouncedInput::active_low(pin, millis, 20);
//! button.begin()?;
//!
//! loop {
//!     if button.changed_to(false)? {
//!         // Pressed
//!     }
//! }
//! ```
//!
//! ## Keeping Transition Times
//!
//! ```rust,ignore
//! use debounced_input::prelude::*;
//!
//! let options = Options::new(20).history(4);
//! let mut input = DebouncedInput::new(pin, millis, options, ActiveHigh)?;
//! input.begin()?;
//!
//! loop {
//!     if input.changed()?.is_some() {
//!         // Time between the last two rising edges.
//!         let period = input.rising_time(0).wrapping_sub(input.rising_time(1));
//!     }
//! }
//! ```
//!
//! ## Interrupt Based
//!
//! On parts with a pin change interrupt, a channel can be handed over to a
//! [`notify::ChangeRegistry`] instead of being polled. See that module.

#![no_std]

extern crate alloc;

mod clock;
mod history;
pub mod notify;

use core::marker::PhantomData;
use embedded_hal::digital::v2::InputPin;
use log::{debug, trace};

pub use crate::clock::Clock;
pub use crate::history::HistoryAllocError;
use crate::history::History;

/// Everything needed to set up and poll a debounced input.
pub mod prelude {
    pub use crate::notify::{ChangeNotifier, ChangeRegistry, Edge};
    pub use crate::{
        ActiveHigh, ActiveLow, Clock, ConfigurableInput, DebouncedInput, Options, Pull,
    };
    pub use embedded_hal::digital::v2::InputPin as _;
}

/// Unit struct for active-low pins.
pub struct ActiveLow;

/// Unit struct for active-high pins.
pub struct ActiveHigh;

/// The electrical level at which an input counts as active.
pub trait Activeness {
    /// `true` if the input is active when high.
    const ACTIVE_HIGH: bool;
}

impl Activeness for ActiveHigh {
    const ACTIVE_HIGH: bool = true;
}

impl Activeness for ActiveLow {
    const ACTIVE_HIGH: bool = false;
}

/// Internal bias applied when an input is configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pull {
    /// Floating input.
    None,
    /// Input with the internal pull-up enabled.
    Up,
}

/// An input pin whose mode can be set at runtime.
///
/// Implement this for your HAL's pin type. It is only needed by
/// [`DebouncedInput::begin`].
pub trait ConfigurableInput: InputPin {
    /// Puts the pin into input mode with the given bias.
    fn configure(&mut self, pull: Pull) -> Result<(), Self::Error>;
}

/// Construction parameters of a [`DebouncedInput`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    /// How long the raw level must hold before it is accepted, in ms.
    pub debounce_ms: u32,
    /// Enable the internal pull-up in `begin()`.
    pub pull_up: bool,
    /// Number of rising and falling transition times to keep. `0` disables
    /// the history.
    pub history: u8,
}

impl Options {
    /// Pull-up enabled, no history.
    pub const fn new(debounce_ms: u32) -> Self {
        Self {
            debounce_ms,
            pull_up: true,
            history: 0,
        }
    }

    /// Enables or disables the internal pull-up.
    pub const fn pull_up(mut self, enabled: bool) -> Self {
        self.pull_up = enabled;
        self
    }

    /// Keeps the last `depth` transition times per direction.
    pub const fn history(mut self, depth: u8) -> Self {
        self.history = depth;
        self
    }
}

/// A debounced input.
///
/// `begin()` must be called once before any of the polling methods; until
/// then the raw and debounced state are simply `false`.
pub struct DebouncedInput<P, C, A> {
    /// The wrapped pin.
    pin: P,

    clock: C,

    /// Whether the pin is active-high or active-low.
    activeness: PhantomData<A>,

    debounce_ms: u32,
    pull_up: bool,

    /// Last raw level seen and when it first appeared.
    raw: bool,
    raw_since: u32,

    /// The debounced pin state.
    value: bool,

    /// The level last handed out by a change query.
    reported: bool,

    rising: History,
    falling: History,
}

impl<P, C, A> DebouncedInput<P, C, A>
where
    P: InputPin,
    C: Clock,
    A: Activeness,
{
    /// Creates a debounced input, allocating its history rings if any.
    pub fn new(
        pin: P,
        clock: C,
        options: Options,
        _activeness: A,
    ) -> Result<Self, HistoryAllocError> {
        let depth = usize::from(options.history);
        let rising = History::with_capacity(depth)?;
        let falling = History::with_capacity(depth)?;

        Ok(Self::with_history(pin, clock, options, rising, falling))
    }

    fn with_history(pin: P, clock: C, options: Options, rising: History, falling: History) -> Self {
        Self {
            pin,
            clock,
            activeness: PhantomData,
            debounce_ms: options.debounce_ms,
            pull_up: options.pull_up,
            raw: false,
            raw_since: 0,
            value: false,
            reported: false,
            rising,
            falling,
        }
    }

    /// Configures the pin and seeds the debouncer with its current level.
    ///
    /// Seeding avoids a spurious change on the first poll. Returns the level
    /// read.
    pub fn begin(&mut self) -> Result<bool, P::Error>
    where
        P: ConfigurableInput,
    {
        let pull = if self.pull_up { Pull::Up } else { Pull::None };
        self.pin.configure(pull)?;

        let level = self.pin.is_high()?;
        let now = self.clock.now_ms();

        self.raw = level;
        self.raw_since = now;
        self.value = level;
        self.reported = level;

        debug!("debounced input started at {} ms, level {}", now, level);
        Ok(level)
    }

    /// Reads the pin and advances the debouncer.
    ///
    /// Returns the debounced value, which changes at most once per call.
    pub fn sample(&mut self) -> Result<bool, P::Error> {
        let now = self.clock.now_ms();
        let raw = self.pin.is_high()?;

        if raw != self.raw {
            self.raw = raw;
            self.raw_since = now;
        }

        if now.wrapping_sub(self.raw_since) > self.debounce_ms && self.raw != self.value {
            self.value = self.raw;
            if self.value {
                self.rising.push(now);
            } else {
                self.falling.push(now);
            }
            trace!("debounced level -> {} at {} ms", self.value, now);
        }

        Ok(self.value)
    }

    /// Samples, then reports the new level if it differs from the one last
    /// reported.
    ///
    /// Several transitions between two calls collapse into one report, or
    /// into none if the level ends up where it was.
    pub fn changed(&mut self) -> Result<Option<bool>, P::Error> {
        let value = self.sample()?;
        if value != self.reported {
            self.reported = value;
            Ok(Some(value))
        } else {
            Ok(None)
        }
    }

    /// Like [`changed`](Self::changed), without the new level.
    pub fn has_changed(&mut self) -> Result<bool, P::Error> {
        Ok(self.changed()?.is_some())
    }

    /// `true` if the input just changed, and changed to `level`.
    pub fn changed_to(&mut self, level: bool) -> Result<bool, P::Error> {
        Ok(self.changed()? == Some(level))
    }

    /// The debounced value as of the last sample.
    pub fn value(&self) -> bool {
        self.value
    }

    /// `true` if the debounced value is the active level.
    pub fn is_active(&self) -> bool {
        self.value == A::ACTIVE_HIGH
    }

    /// Time of the `index`-th most recent rising transition.
    ///
    /// `0` if there is no such entry, including when history is disabled.
    pub fn rising_time(&self, index: usize) -> u32 {
        self.rising.get(index)
    }

    /// Time of the `index`-th most recent falling transition.
    ///
    /// `0` if there is no such entry, including when history is disabled.
    pub fn falling_time(&self, index: usize) -> u32 {
        self.falling.get(index)
    }

    /// Forgets all recorded transition times.
    pub fn clear_history(&mut self) {
        self.rising.clear();
        self.falling.clear();
    }

    /// The debounce interval in ms.
    pub fn debounce_ms(&self) -> u32 {
        self.debounce_ms
    }

    /// Whether `begin()` enables the internal pull-up.
    pub fn pull_up(&self) -> bool {
        self.pull_up
    }

    /// Number of transitions kept per direction.
    pub fn history_capacity(&self) -> usize {
        self.rising.capacity()
    }

    /// The wrapped pin.
    pub fn pin(&self) -> &P {
        &self.pin
    }

    /// Releases the wrapped pin.
    pub fn free(self) -> P {
        self.pin
    }
}

impl<P: InputPin, C: Clock> DebouncedInput<P, C, ActiveHigh> {
    /// Initializes a new `ActiveHigh` debounced input without history.
    pub fn active_high(pin: P, clock: C, debounce_ms: u32) -> Self {
        Self::with_history(
            pin,
            clock,
            Options::new(debounce_ms),
            History::disabled(),
            History::disabled(),
        )
    }
}

impl<P: InputPin, C: Clock> DebouncedInput<P, C, ActiveLow> {
    /// Initializes a new `ActiveLow` debounced input without history.
    pub fn active_low(pin: P, clock: C, debounce_ms: u32) -> Self {
        Self::with_history(
            pin,
            clock,
            Options::new(debounce_ms),
            History::disabled(),
            History::disabled(),
        )
    }
}

/// Reports the debounced state; the pin itself is not read.
impl<P: InputPin, C, A> InputPin for DebouncedInput<P, C, A> {
    type Error = P::Error;

    fn is_high(&self) -> Result<bool, Self::Error> {
        Ok(self.value)
    }

    fn is_low(&self) -> Result<bool, Self::Error> {
        Ok(!self.value)
    }
}
