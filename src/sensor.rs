use crate::{
    clock::{ticks_diff, Clock},
    filter::trimmed_mean,
    Cycle, Error, InvalidSampleCount, Reading,
};
use embedded_hal::{
    blocking::delay::DelayUs,
    digital::v2::{InputPin, OutputPin},
};
use heapless::Deque;

/// How long to wait for each edge of the echo pulse before giving up (µs).
pub const ECHO_TIMEOUT_US: i32 = 30_000;

/// Centimeters of distance per microsecond of echo pulse: half the
/// speed of sound (343 m/s), since the pulse covers the round trip.
pub const CM_PER_ECHO_US: f64 = 0.017;

/// The filter window used when none is specified, and the default
/// history capacity of a [`DistanceSensor`].
pub const DEFAULT_FILTER_SAMPLES: usize = 20;

const SETTLE_US: u32 = 5;
const TRIGGER_PULSE_US: u32 = 10;

/// Initial settings for a [`DistanceSensor`].
///
/// # Examples
///
/// ```
/// use ultrasonic_sensor::Config;
///
/// let config = Config {
///     detection_threshold: 140.0, // ignore anything further than 1.4 m
///     filter: Some(20),           // trimmed mean over the last 20 samples
/// };
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Config {
    /// Distances beyond this (cm) are reported as [`Reading::OutOfRange`].
    pub detection_threshold: f64,
    /// Filter window size, or `None` to report the latest sample as is.
    pub filter: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            detection_threshold: f64::INFINITY,
            filter: None,
        }
    }
}

/// An HC-SR04 style sensor driven by polling its echo line.
///
/// `CAPACITY` is the size of the sample history and therefore the
/// largest filter window [`enable_filter`](DistanceSensor::enable_filter)
/// accepts.
#[derive(Debug)]
pub struct DistanceSensor<
    Trigger,
    Echo,
    Delay,
    Clk,
    const CAPACITY: usize = DEFAULT_FILTER_SAMPLES,
> {
    trigger: Trigger,
    echo: Echo,
    delay: Delay,
    clock: Clk,
    detection_threshold: f64,
    filter_enabled: bool,
    num_samples: usize,
    history: Deque<f64, CAPACITY>,
}

type SensorError<Trigger, Echo> =
    Error<<Trigger as OutputPin>::Error, <Echo as InputPin>::Error>;

impl<Trigger, Echo, Delay, Clk, const CAPACITY: usize>
    DistanceSensor<Trigger, Echo, Delay, Clk, CAPACITY>
where
    Trigger: OutputPin,
    Echo: InputPin,
    Delay: DelayUs<u32>,
    Clk: Clock,
{
    const NONZERO_CAPACITY: () = assert!(
        CAPACITY > 0,
        "The history must hold at least one sample"
    );

    /// Returns a sensor with no detection threshold and filtering
    /// disabled. The trigger pin is driven low.
    ///
    /// `CAPACITY` must be at least 1, otherwise the sensor does not compile:
    ///
    /// ```compile_fail
    /// use ultrasonic_sensor::DistanceSensor;
    /// # use embedded_hal_mock::{
    /// #     delay::MockNoop,
    /// #     pin::{Mock, State, Transaction},
    /// # };
    /// # let trigger = Mock::new(&[Transaction::set(State::Low)]);
    /// # let echo = Mock::new(&[]);
    /// # struct Stopped;
    /// # impl ultrasonic_sensor::Clock for Stopped {
    /// #     fn now_micros(&self) -> u32 { 0 }
    /// # }
    ///
    /// let sensor: DistanceSensor<_, _, _, _, 0> =
    ///     DistanceSensor::new(trigger, echo, MockNoop::new(), Stopped).unwrap();
    /// ```
    pub fn new(
        trigger: Trigger,
        echo: Echo,
        delay: Delay,
        clock: Clk,
    ) -> Result<Self, SensorError<Trigger, Echo>> {
        Self::with_config(trigger, echo, delay, clock, Config::default())
    }

    /// Returns a sensor using the provided `config`.
    ///
    /// Fails with [`Error::Config`] if `config.filter` would be rejected
    /// by [`enable_filter`](DistanceSensor::enable_filter). The trigger
    /// pin is left untouched in that case.
    pub fn with_config(
        mut trigger: Trigger,
        echo: Echo,
        delay: Delay,
        clock: Clk,
        config: Config,
    ) -> Result<Self, SensorError<Trigger, Echo>> {
        let () = Self::NONZERO_CAPACITY;

        let num_samples = match config.filter {
            Some(num_samples) => Self::check_sample_count(num_samples)?,
            None => 1,
        };

        trigger.set_low().map_err(Error::Trigger)?;

        Ok(Self {
            trigger,
            echo,
            delay,
            clock,
            detection_threshold: config.detection_threshold,
            filter_enabled: config.filter.is_some(),
            num_samples,
            history: Deque::new(),
        })
    }

    /// Fires the sensor, times the echo pulse and records the distance.
    ///
    /// Blocks until the echo ends, or for up to [`ECHO_TIMEOUT_US`] per
    /// edge. A timeout skips the sample and is reported through the
    /// returned [`Cycle`], not as an error.
    pub fn measure_cycle(&mut self) -> Result<Cycle, SensorError<Trigger, Echo>> {
        self.fire().map_err(Error::Trigger)?;

        let start = self.clock.now_micros();
        if !self.wait_while(false, start).map_err(Error::Echo)? {
            warn!("echo did not start within {} us", ECHO_TIMEOUT_US);
            return Ok(Cycle::EchoStartTimeout);
        }

        let rise = self.clock.now_micros();
        if !self.wait_while(true, rise).map_err(Error::Echo)? {
            warn!("echo did not end within {} us", ECHO_TIMEOUT_US);
            return Ok(Cycle::EchoEndTimeout);
        }

        let fall = self.clock.now_micros();
        let pulse_width = ticks_diff(fall, rise);
        let distance = f64::from(pulse_width) * CM_PER_ECHO_US;

        trace!("echo {} us, {} cm", pulse_width, distance);
        self.record(distance);

        Ok(Cycle::Sampled(distance))
    }

    fn fire(&mut self) -> Result<(), Trigger::Error> {
        self.trigger.set_low()?;
        self.delay.delay_us(SETTLE_US);

        self.trigger.set_high()?;
        self.delay.delay_us(TRIGGER_PULSE_US);
        self.trigger.set_low()
    }

    /// Polls the echo line until it leaves the `high` level. Returns
    /// `false` if it is still there [`ECHO_TIMEOUT_US`] after `since`.
    fn wait_while(&mut self, high: bool, since: u32) -> Result<bool, Echo::Error> {
        while self.echo.is_high()? == high {
            if ticks_diff(self.clock.now_micros(), since) > ECHO_TIMEOUT_US {
                return Ok(false);
            }
        }

        Ok(true)
    }
}

impl<Trigger, Echo, Delay, Clk, const CAPACITY: usize>
    DistanceSensor<Trigger, Echo, Delay, Clk, CAPACITY>
{
    /// Destroys the sensor and returns the trigger pin, echo pin, delay
    /// and clock.
    pub fn free(self) -> (Trigger, Echo, Delay, Clk) {
        (self.trigger, self.echo, self.delay, self.clock)
    }

    /// Returns the distance based on the recorded samples.
    ///
    /// With filtering enabled and a full window, this is the mean of the
    /// middle half of the sorted samples. Otherwise it is the latest
    /// sample. Distances beyond the detection threshold are reported as
    /// [`Reading::OutOfRange`].
    ///
    /// Windows of a single sample have no middle half, so a sensor
    /// filtering over one sample always reports [`Reading::NoData`].
    pub fn distance(&self) -> Reading {
        if self.history.is_empty() {
            return Reading::NoData;
        }

        let distance = if self.filter_enabled && self.history.len() >= self.num_samples {
            let mut sorted: heapless::Vec<f64, CAPACITY> =
                self.history.iter().copied().collect();
            trimmed_mean(&mut sorted)
        } else {
            self.history.back().copied()
        };

        match distance {
            None => Reading::NoData,
            Some(distance) if distance > self.detection_threshold => Reading::OutOfRange,
            Some(distance) => Reading::Measured(distance),
        }
    }

    /// Sets the distance (cm) beyond which nothing counts as detected.
    pub fn set_detection_threshold(&mut self, distance: f64) {
        debug!("detection threshold set to {} cm", distance);
        self.detection_threshold = distance;
    }

    pub fn detection_threshold(&self) -> f64 {
        self.detection_threshold
    }

    /// Enables filtering over the last `num_samples` samples.
    ///
    /// The history is not resized right away. The next cycle drops every
    /// sample that no longer fits, all at once, and a larger window fills
    /// up over the following cycles.
    ///
    /// # Examples
    ///
    /// ```
    /// use ultrasonic_sensor::{DistanceSensor, InvalidSampleCount, DEFAULT_FILTER_SAMPLES};
    /// # use embedded_hal_mock::{
    /// #     delay::MockNoop,
    /// #     pin::{Mock, State, Transaction},
    /// # };
    /// # let trigger = Mock::new(&[Transaction::set(State::Low)]);
    /// # let echo = Mock::new(&[]);
    /// # struct Stopped;
    /// # impl ultrasonic_sensor::Clock for Stopped {
    /// #     fn now_micros(&self) -> u32 { 0 }
    /// # }
    ///
    /// let mut sensor: DistanceSensor<_, _, _, _> =
    ///     DistanceSensor::new(trigger, echo, MockNoop::new(), Stopped).unwrap();
    ///
    /// assert_eq!(sensor.enable_filter(0), Err(InvalidSampleCount::Zero));
    /// assert!(!sensor.is_filter_enabled());
    ///
    /// sensor.enable_filter(DEFAULT_FILTER_SAMPLES).unwrap();
    /// assert_eq!(sensor.num_samples(), 20);
    /// ```
    pub fn enable_filter(&mut self, num_samples: usize) -> Result<(), InvalidSampleCount> {
        self.num_samples = Self::check_sample_count(num_samples)?;
        self.filter_enabled = true;
        debug!("filter enabled over {} samples", num_samples);
        Ok(())
    }

    /// Disables filtering and goes back to reporting the latest sample.
    pub fn disable_filter(&mut self) {
        self.filter_enabled = false;
        self.num_samples = 1;
        debug!("filter disabled");
    }

    pub fn is_filter_enabled(&self) -> bool {
        self.filter_enabled
    }

    /// The number of samples the history is trimmed to after each cycle.
    pub fn num_samples(&self) -> usize {
        self.num_samples
    }

    /// Returns the recorded distances (cm), oldest first.
    pub fn samples(&self) -> impl Iterator<Item = f64> + '_ {
        self.history.iter().copied()
    }

    fn check_sample_count(num_samples: usize) -> Result<usize, InvalidSampleCount> {
        if num_samples == 0 {
            Err(InvalidSampleCount::Zero)
        } else if num_samples > CAPACITY {
            Err(InvalidSampleCount::ExceedsCapacity {
                requested: num_samples,
                capacity: CAPACITY,
            })
        } else {
            Ok(num_samples)
        }
    }

    fn record(&mut self, distance: f64) {
        if self.history.is_full() {
            self.history.pop_front();
        }
        let _ = self.history.push_back(distance);

        while self.history.len() > self.num_samples {
            self.history.pop_front();
        }
    }
}
