//! A polling driver for HC-SR04 style ultrasonic distance sensors,
//! built on the [`embedded-hal`](https://crates.io/crates/embedded-hal) traits.
//!
//! Each call to [`measure_cycle`](DistanceSensor::measure_cycle) fires
//! the sensor once, times the echo pulse with a busy-wait and stores the
//! resulting distance in a short rolling history. [`distance`](DistanceSensor::distance)
//! reports either the latest sample or, with filtering enabled, the mean
//! of the inner half of the sorted history, which rejects spikes caused by
//! stray echoes.
//!
//! ## Features
//!
//! - `defmt`: Enables logging using the `defmt` framework.
//! - `log`: Enables logging using the `log` framework.
//!
//! # Examples
//!
//! ```
//! use core::cell::Cell;
//! use ultrasonic_sensor::{Clock, DistanceSensor, Reading};
//! # use embedded_hal_mock::{
//! #     delay::MockNoop,
//! #     pin::{Mock, State, Transaction},
//! # };
//! #
//! # let trigger = Mock::new(&[
//! #     Transaction::set(State::Low),
//! #     Transaction::set(State::Low),
//! #     Transaction::set(State::High),
//! #     Transaction::set(State::Low),
//! # ]);
//! # let echo = Mock::new(&[
//! #     Transaction::get(State::High),
//! #     Transaction::get(State::Low),
//! # ]);
//! # let delay = MockNoop::new();
//!
//! // A clock that moves forward 1 ms every time it is read
//! struct Ticker(Cell<u32>);
//!
//! impl Clock for Ticker {
//!     fn now_micros(&self) -> u32 {
//!         let now = self.0.get();
//!         self.0.set(now + 1000);
//!         now
//!     }
//! }
//!
//! let mut sensor: DistanceSensor<_, _, _, _> =
//!     DistanceSensor::new(trigger, echo, delay, Ticker(Cell::new(0))).unwrap();
//! assert_eq!(sensor.distance(), Reading::NoData);
//!
//! sensor.measure_cycle().unwrap();
//!
//! // A 1 ms echo is 17 cm
//! let centimeters = sensor.distance().centimeters().unwrap();
//! assert!((centimeters - 17.0).abs() < 1e-9);
//! ```

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

mod clock;
mod filter;
mod sensor;

use core::fmt::{Debug, Display, Formatter, Result as FmtResult};

pub use clock::{ticks_diff, Clock};
pub use sensor::{
    Config, DistanceSensor, CM_PER_ECHO_US, DEFAULT_FILTER_SAMPLES, ECHO_TIMEOUT_US,
};

/// The processed distance reported by [`DistanceSensor::distance`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Reading {
    /// An object was detected at this distance (cm).
    Measured(f64),
    /// A distance was measured, but it is beyond the detection threshold.
    OutOfRange,
    /// No usable samples yet, or the filter window trimmed away every sample.
    NoData,
}

impl Reading {
    /// Returns the distance in centimeters if an object was detected.
    pub fn centimeters(self) -> Option<f64> {
        match self {
            Reading::Measured(distance) => Some(distance),
            Reading::OutOfRange | Reading::NoData => None,
        }
    }
}

/// The outcome of a single [`DistanceSensor::measure_cycle`].
///
/// Timeouts are not errors: the cycle is skipped and the sample history
/// is left as it was.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Cycle {
    /// The echo was timed and this distance (cm) was added to the history.
    Sampled(f64),
    /// The echo line never went high after the trigger pulse.
    EchoStartTimeout,
    /// The echo line went high but never came back down.
    EchoEndTimeout,
}

/// A rejected filter window size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InvalidSampleCount {
    /// The window must hold at least one sample.
    Zero,
    /// The window is larger than the sensor's history buffer.
    ExceedsCapacity { requested: usize, capacity: usize },
}

impl Display for InvalidSampleCount {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            InvalidSampleCount::Zero => write!(f, "number of samples must be greater than 0"),
            InvalidSampleCount::ExceedsCapacity {
                requested,
                capacity,
            } => write!(
                f,
                "{} samples requested, but the history holds at most {}",
                requested, capacity
            ),
        }
    }
}

/// Errors returned by [`DistanceSensor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<TriggerError, EchoError> {
    /// Driving the trigger pin failed.
    Trigger(TriggerError),
    /// Reading the echo pin failed.
    Echo(EchoError),
    /// The [`Config`] asked for an invalid filter window.
    Config(InvalidSampleCount),
}

impl<TriggerError, EchoError> From<InvalidSampleCount> for Error<TriggerError, EchoError> {
    fn from(error: InvalidSampleCount) -> Self {
        Error::Config(error)
    }
}

impl<TriggerError: Debug, EchoError: Debug> Display for Error<TriggerError, EchoError> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Error::Trigger(error) => write!(f, "trigger pin error: {:?}", error),
            Error::Echo(error) => write!(f, "echo pin error: {:?}", error),
            Error::Config(error) => write!(f, "invalid configuration: {}", error),
        }
    }
}
