use serde::{Deserialize, Serialize};

use crate::constants::{EVENTS_MAX, FIRST_STEP, NSTEPS, PRECISION_THRESHOLD};

/// Result of one analysis window.
///
/// All durations and offsets are in samples. The engine owns and updates
/// these in place; the core only reads them (and clones one for the stale
/// fallback).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSnapshot {
    /// Full beat cycle (tic + toc); negative until first measured
    pub period: f64,
    /// Uncertainty of `period`
    pub sigma: f64,
    /// Tic pulse offset within the period
    pub tic: i64,
    /// Toc pulse offset within the period
    pub toc: i64,
    /// Tic pulse duration, <= 0 when not detected
    pub tic_pulse: f64,
    /// Toc pulse duration, <= 0 when not detected
    pub toc_pulse: f64,
    /// Signed offset between the tic and toc half periods
    pub be: f64,
    /// Absolute sample count at the end of the window
    pub timestamp: u64,
    /// Absolute timestamps of detected ticks, oldest first, 0-terminated
    pub events: Vec<u64>,
    /// Nominal sample rate of the stream
    pub sample_rate: u32,
    /// Length of the integration window
    pub sample_count: usize,
    /// Set once the window has integrated enough audio
    pub ready: bool,
    /// Averaged amplitude envelope over one period
    pub waveform: Vec<f32>,
    pub waveform_max: f32,
}

impl Default for AnalysisSnapshot {
    fn default() -> Self {
        Self {
            period: -1.0,
            sigma: 0.0,
            tic: 0,
            toc: 0,
            tic_pulse: 0.0,
            toc_pulse: 0.0,
            be: 0.0,
            timestamp: 0,
            events: Vec::new(),
            sample_rate: 0,
            sample_count: 0,
            ready: false,
            waveform: Vec::new(),
            waveform_max: 0.0,
        }
    }
}

impl AnalysisSnapshot {
    pub fn new(sample_rate: u32, sample_count: usize) -> Self {
        Self {
            sample_rate,
            sample_count,
            ..Self::default()
        }
    }

    /// Detected event timestamps up to the terminating 0, at most `EVENTS_MAX`.
    pub fn events(&self) -> impl Iterator<Item = u64> + '_ {
        self.events
            .iter()
            .copied()
            .take(EVENTS_MAX)
            .take_while(|&e| e != 0)
    }

    /// Whether the period estimate is precise enough to be displayed.
    pub fn is_precise(&self) -> bool {
        self.period > 0.0 && self.sigma <= self.period * PRECISION_THRESHOLD
    }
}

/// Empty analysis windows, shortest first: window `i` spans
/// `sample_rate << (i + FIRST_STEP)` samples.
pub fn analysis_windows(sample_rate: u32) -> Vec<AnalysisSnapshot> {
    (0..NSTEPS)
        .map(|i| AnalysisSnapshot::new(sample_rate, (sample_rate as usize) << (i + FIRST_STEP)))
        .collect()
}

/// Which half of the beat a waveform view shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pulse {
    Tic,
    Toc,
}

impl Pulse {
    pub fn offset(self, snapshot: &AnalysisSnapshot) -> i64 {
        match self {
            Self::Tic => snapshot.tic,
            Self::Toc => snapshot.toc,
        }
    }

    pub fn duration(self, snapshot: &AnalysisSnapshot) -> f64 {
        match self {
            Self::Tic => snapshot.tic_pulse,
            Self::Toc => snapshot.toc_pulse,
        }
    }
}
