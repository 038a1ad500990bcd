use std::collections::VecDeque;

use rand_chacha::ChaCha8Rng;

use super::jitter::{TimingJitter, create_rng};
use super::watch::WatchModel;
use crate::analysis::{AnalysisEngine, AnalysisSnapshot};
use crate::constants::EVENTS_MAX;
use crate::error::{Result, TickgraphError};

/// Fewer beats than this in a window means no lock.
const MIN_BEATS: usize = 4;
/// Silence longer than this many periods means the watch stopped.
const SILENT_PERIODS: f64 = 2.0;
const NOISE_FLOOR: f32 = 0.02;

/// Analysis engine that produces snapshots for a [`WatchModel`] instead of audio.
///
/// Each `analyze` call advances the stream by one refresh interval.
pub struct SimulatedEngine {
    watch: WatchModel,
    sample_rate: f64,
    step: u64,
    timestamp: u64,
    rng: ChaCha8Rng,
    jitter: TimingJitter,
    period: f64,
    be: f64,
    pulse: f64,
    next_beat: f64,
    next_is_tic: bool,
    beats: VecDeque<u64>,
    tic_offset: i64,
    toc_offset: i64,
    waveform: Vec<f32>,
    waveform_max: f32,
}

impl SimulatedEngine {
    pub fn new(watch: WatchModel, sample_rate: u32, refresh_hz: f64) -> Result<Self> {
        if watch.bph == 0 {
            return Err(TickgraphError::Simulation("bph must be positive".into()));
        }
        if sample_rate == 0 {
            return Err(TickgraphError::Simulation("sample rate must be positive".into()));
        }
        if !(refresh_hz > 0.0 && refresh_hz.is_finite()) {
            return Err(TickgraphError::Simulation(format!(
                "refresh rate must be positive, got {}",
                refresh_hz
            )));
        }
        if !(2.0 * watch.amplitude > watch.lift_angle && watch.amplitude < 360.0) {
            return Err(TickgraphError::Simulation(format!(
                "amplitude {}° impossible with lift angle {}°",
                watch.amplitude, watch.lift_angle
            )));
        }

        let sr = sample_rate as f64;
        let period = watch.period_samples(sr);
        let be = watch.beat_error_samples(sr);
        if be.abs() >= period / 4.0 {
            return Err(TickgraphError::Simulation(format!(
                "beat error {} ms too large",
                watch.beat_error_ms
            )));
        }
        let pulse = watch.pulse_samples(sr);

        let first_beat = period / 4.0;
        let tic_offset = first_beat.rem_euclid(period).round() as i64;
        let toc_offset = (first_beat + period / 2.0 + be).rem_euclid(period).round() as i64;
        let waveform = synth_waveform(period, pulse, [tic_offset, toc_offset]);
        let waveform_max = waveform.iter().copied().fold(0.0, f32::max);

        log::debug!(
            "Simulating {} bph, {:+.1} s/d, {:.2} ms, {:.0}° (period {:.1} samples)",
            watch.bph,
            watch.rate,
            watch.beat_error_ms,
            watch.amplitude,
            period
        );

        Ok(Self {
            rng: create_rng(watch.seed),
            jitter: TimingJitter::new(watch.jitter)?,
            watch,
            sample_rate: sr,
            step: ((sr / refresh_hz).round() as u64).max(1),
            timestamp: 0,
            period,
            be,
            pulse,
            next_beat: first_beat,
            next_is_tic: true,
            beats: VecDeque::new(),
            tic_offset,
            toc_offset,
            waveform,
            waveform_max,
        })
    }

    pub fn watch(&self) -> &WatchModel {
        &self.watch
    }

    /// Samples advanced by each `analyze` call
    pub fn step(&self) -> u64 {
        self.step
    }

    pub fn period_samples(&self) -> f64 {
        self.period
    }

    fn stop_at(&self) -> Option<f64> {
        self.watch.stop_after_secs.map(|s| s * self.sample_rate)
    }

    /// Whether the simulated watch has stopped beating.
    pub fn is_stopped(&self) -> bool {
        self.stop_at().is_some_and(|s| self.timestamp as f64 > s)
    }

    fn advance(&mut self, horizon: u64) {
        let limit = self.timestamp as f64;
        let stop_at = self.stop_at();
        let half = self.period / 2.0;

        while self.next_beat <= limit {
            if stop_at.is_some_and(|s| self.next_beat > s) {
                break;
            }
            let ts = (self.next_beat + self.jitter.sample(&mut self.rng)).round().max(1.0);
            self.beats.push_back(ts as u64);
            self.next_beat += if self.next_is_tic {
                half + self.be
            } else {
                half - self.be
            };
            self.next_is_tic = !self.next_is_tic;
        }

        let oldest = self.timestamp.saturating_sub(horizon);
        while self.beats.front().is_some_and(|&b| b < oldest) {
            self.beats.pop_front();
        }
    }

    fn is_silent(&self) -> bool {
        match self.beats.back() {
            Some(&last) => last as f64 + SILENT_PERIODS * self.period < self.timestamp as f64,
            None => true,
        }
    }
}

impl AnalysisEngine for SimulatedEngine {
    fn analyze(&mut self, windows: &mut [AnalysisSnapshot], bph_hint: u32, events_from: u64) -> i32 {
        if bph_hint != 0 && bph_hint != self.watch.bph {
            log::trace!("Simulated watch beats at {} bph, hint {}", self.watch.bph, bph_hint);
        }
        self.timestamp += self.step;
        let horizon = windows.iter().map(|w| w.sample_count as u64).max().unwrap_or(0);
        self.advance(horizon);
        let silent = self.is_silent();

        let mut precise = 0;
        for w in windows.iter_mut() {
            w.timestamp = self.timestamp;
            let len = w.sample_count as u64;
            if self.timestamp < len {
                w.ready = false;
                continue;
            }
            w.ready = true;

            let start = self.timestamp - len;
            let beats = self.beats.iter().filter(|&&b| b >= start).count();
            w.period = self.period;
            w.events.clear();

            if silent || beats < MIN_BEATS {
                w.sigma = self.period;
                w.tic_pulse = -1.0;
                w.toc_pulse = -1.0;
                continue;
            }

            w.sigma = 0.05 + self.watch.jitter * 2.0 / (beats as f64).sqrt();
            w.tic = self.tic_offset;
            w.toc = self.toc_offset;
            w.tic_pulse = self.pulse;
            w.toc_pulse = self.pulse;
            w.be = self.be;

            let from = start.max(events_from);
            let fresh = self.beats.iter().filter(|&&b| b >= from).count();
            w.events.extend(
                self.beats
                    .iter()
                    .copied()
                    .filter(|&b| b >= from)
                    .skip(fresh.saturating_sub(EVENTS_MAX)),
            );

            if w.waveform.len() != self.waveform.len() {
                w.waveform.clone_from(&self.waveform);
            }
            w.waveform_max = self.waveform_max;

            if w.is_precise() {
                precise += 1;
            }
        }

        precise
    }

    fn timestamp(&self) -> u64 {
        self.timestamp
    }
}

/// One period of envelope with an unlock and a drop peak per beat.
///
/// `offsets` mark the end of each pulse; the pulse starts `pulse` samples earlier.
fn synth_waveform(period: f64, pulse: f64, offsets: [i64; 2]) -> Vec<f32> {
    let n = period.round().max(1.0) as usize;
    let mut waveform = vec![NOISE_FLOOR; n];
    let decay = (pulse / 3.0).max(1.0);
    let span = (pulse * 3.0).round() as i64;
    let pulse_len = pulse.round() as i64;

    for offset in offsets {
        let onset = offset - pulse_len;
        for k in 0..span {
            let idx = (onset + k).rem_euclid(n as i64) as usize;
            let unlock = 0.5 * (-(k as f64) / decay).exp();
            let drop = if k >= pulse_len {
                (-((k - pulse_len) as f64) / decay).exp()
            } else {
                0.0
            };
            waveform[idx] += (unlock + drop) as f32;
        }
    }
    waveform
}
