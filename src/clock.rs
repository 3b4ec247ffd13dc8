/// A free-running microsecond counter.
///
/// The counter is allowed to wrap around; durations are always
/// computed with [`ticks_diff`], so only the distance between two
/// readings matters.
///
/// # Examples
///
/// ```
/// use ultrasonic_sensor::Clock;
///
/// struct Fixed(u32);
///
/// impl Clock for Fixed {
///     fn now_micros(&self) -> u32 {
///         self.0
///     }
/// }
///
/// assert_eq!(Fixed(42).now_micros(), 42);
/// ```
pub trait Clock {
    /// Returns the current value of the counter in microseconds.
    fn now_micros(&self) -> u32;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_micros(&self) -> u32 {
        (**self).now_micros()
    }
}

/// Returns the signed number of microseconds from `start` to `end`,
/// correct across a single wraparound of the counter.
pub fn ticks_diff(end: u32, start: u32) -> i32 {
    end.wrapping_sub(start) as i32
}
