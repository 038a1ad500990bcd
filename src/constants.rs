//! Constants shared by the readout calculators and the chart views.
//!
//! The precision and deduplication thresholds are empirically tuned values
//! kept for compatibility with existing recordings; they have no physical
//! derivation.

/// Standard beat rates offered for manual selection and used by the bph guesser.
pub const PRESET_BPH: [u32; 11] = [
    12000, 14400, 17280, 18000, 19800, 21600, 25200, 28800, 36000, 43200, 72000,
];

/// Lowest bph accepted from user input.
pub const MIN_BPH: u32 = 8100;
/// Highest bph accepted from user input.
pub const MAX_BPH: u32 = 72000;
/// Beat rate assumed before the first lock.
pub const DEFAULT_BPH: u32 = 21600;

/// Lift angle bounds in degrees.
pub const MIN_LA: f64 = 10.0;
pub const MAX_LA: f64 = 90.0;
pub const DEFAULT_LA: f64 = 52.0;

/// Number of analysis windows kept by the engine.
pub const NSTEPS: usize = 4;
/// Window `i` integrates `sample_rate << (i + FIRST_STEP)` samples.
pub const FIRST_STEP: usize = 1;

/// Capacity of the paperstrip event history.
pub const EVENTS_COUNT: usize = 10000;
/// Maximum number of events reported by a single analysis window.
pub const EVENTS_MAX: usize = 100;

/// A window is acceptable when `sigma <= period * PRECISION_THRESHOLD`.
pub const PRECISION_THRESHOLD: f64 = 1.0 / 10000.0;
/// New events must be later than the last one by more than `period / DEDUP_DIVISOR`.
pub const DEDUP_DIVISOR: f64 = 4.0;

/// Extra width on each side of the paperstrip, as a fraction of the strip.
pub const PAPERSTRIP_MARGIN: f64 = 0.2;
/// Seconds without a new event before the paperstrip stops scrolling.
pub const STALL_SECS: f64 = 5.0;

/// Accepted refresh rates in Hz.
pub const MIN_REFRESH_HZ: f64 = 0.1;
pub const MAX_REFRESH_HZ: f64 = 1000.0;

pub const MIN_ZOOM: u32 = 1;
pub const MAX_ZOOM: u32 = 20;
pub const DEFAULT_ZOOM: u32 = 10;

/// Milliseconds shown before the pulse onset in the waveform views.
pub const NEGATIVE_SPAN: i32 = 25;
/// Milliseconds shown after the pulse onset.
pub const POSITIVE_SPAN: i32 = 50;

pub const SECS_PER_DAY: f64 = 24.0 * 3600.0;
