use crate::constants::{DEFAULT_LA, SECS_PER_DAY};
use crate::measure::amplitude_to_time;

/// Virtual movement driving the simulated engine.
#[derive(Clone, Debug, serde::Deserialize)]
#[serde(default)]
pub struct WatchModel {
    pub bph: u32,
    /// Seconds per day gained (positive) or lost
    pub rate: f64,
    pub beat_error_ms: f64,
    /// Balance amplitude in degrees
    pub amplitude: f64,
    pub lift_angle: f64,
    /// Standard deviation of each tick's timing, in samples
    pub jitter: f64,
    /// The watch stops beating after this many seconds
    pub stop_after_secs: Option<f64>,
    pub seed: Option<u64>,
}

impl Default for WatchModel {
    fn default() -> Self {
        Self {
            bph: 28800,
            rate: 0.0,
            beat_error_ms: 0.5,
            amplitude: 270.0,
            lift_angle: DEFAULT_LA,
            jitter: 0.0,
            stop_after_secs: None,
            seed: None,
        }
    }
}

impl WatchModel {
    pub fn with_bph(mut self, bph: u32) -> Self {
        self.bph = bph;
        self
    }

    pub fn with_rate(mut self, rate: f64) -> Self {
        self.rate = rate;
        self
    }

    pub fn with_beat_error(mut self, beat_error_ms: f64) -> Self {
        self.beat_error_ms = beat_error_ms;
        self
    }

    pub fn with_amplitude(mut self, amplitude: f64) -> Self {
        self.amplitude = amplitude;
        self
    }

    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn with_stop_after(mut self, secs: f64) -> Self {
        self.stop_after_secs = Some(secs);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Tic plus toc, in samples
    pub fn period_samples(&self, sample_rate: f64) -> f64 {
        7200.0 / self.bph as f64 * sample_rate / (1.0 + self.rate / SECS_PER_DAY)
    }

    /// Offset of the toc from the midpoint between two tics, in samples
    pub fn beat_error_samples(&self, sample_rate: f64) -> f64 {
        self.beat_error_ms * sample_rate / 1000.0
    }

    /// Duration of one tick pulse for the configured amplitude, in samples
    pub fn pulse_samples(&self, sample_rate: f64) -> f64 {
        self.period_samples(sample_rate) * amplitude_to_time(self.lift_angle, self.amplitude)
    }
}
