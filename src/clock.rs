/// A monotonic millisecond clock.
///
/// The counter is allowed to wrap; elapsed times are computed with wrapping
/// arithmetic.
pub trait Clock {
    /// Milliseconds since some fixed point in the past.
    fn now_ms(&self) -> u32;
}

/// Any `fn() -> u32`, such as a board's `millis`, is a clock.
impl<F> Clock for F
where
    F: Fn() -> u32,
{
    fn now_ms(&self) -> u32 {
        self()
    }
}
