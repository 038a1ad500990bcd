use serde::Serialize;

use crate::analysis::{
    AnalysisEngine, AnalysisSnapshot, Pulse, Selection, SnapshotSelector, analysis_windows,
};
use crate::config::{BphSetting, TimegrapherConfig, sanitize_lift_angle};
use crate::constants::{DEFAULT_BPH, STALL_SECS};
use crate::events::EventRing;
use crate::measure;
use crate::render::{
    Canvas, ChartParams, PaperstripLayout, ScrollDirection, StripInputs, WaveformInputs,
    draw_paperstrip, draw_period, draw_waveform, layout_paperstrip,
};

/// Values shown in the readout labels after one refresh
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Readout {
    /// Stream time in seconds
    pub time_secs: f64,
    pub bph: u32,
    /// Seconds per day, positive when the watch gains
    pub rate: f64,
    pub beat_error_ms: f64,
    /// Degrees; `None` when the pulses do not give a plausible value
    pub amplitude: Option<f64>,
    /// Negative when the readout comes from stale data
    pub signal: i32,
    pub stale: bool,
}

/// Timegrapher application state driven by the refresh tick and user input.
pub struct Session {
    windows: Vec<AnalysisSnapshot>,
    selector: SnapshotSelector,
    events: EventRing,
    chart: ChartParams,
    bph: BphSetting,
    guessed_bph: u32,
    lift_angle: f64,
    sample_rate: f64,
    signal: i32,
    time: u64,
    stalled: bool,
    redraw: bool,
}

impl Session {
    pub fn new(config: &TimegrapherConfig) -> Self {
        let bph = config.watch.bph;
        Self {
            windows: analysis_windows(config.audio.sample_rate),
            selector: SnapshotSelector::new(),
            events: EventRing::new(),
            chart: ChartParams::with_zoom(config.display.trace_zoom),
            bph,
            guessed_bph: bph.fixed().unwrap_or(DEFAULT_BPH),
            lift_angle: sanitize_lift_angle(config.watch.lift_angle),
            sample_rate: config.audio.effective_sample_rate(),
            signal: 0,
            time: 0,
            stalled: false,
            redraw: true,
        }
    }

    /// Replace the event history, e.g. with a smaller ring for tests.
    pub fn with_event_ring(mut self, events: EventRing) -> Self {
        self.events = events;
        self
    }

    /// Run the engine and refresh the selection, signal and guessed bph.
    pub fn recompute<E: AnalysisEngine + ?Sized>(&mut self, engine: &mut E) {
        let signal = engine.analyze(&mut self.windows, self.bph.hint(), self.chart.events_from);
        let selection = self.selector.select(&self.windows);

        self.signal = if selection.is_stale() { -signal } else { signal };

        if let Some(snapshot) = selection.snapshot() {
            let guessed = self
                .bph
                .fixed()
                .unwrap_or_else(|| measure::guess_bph(snapshot.period / self.sample_rate));
            if guessed != self.guessed_bph {
                log::info!("Beat rate now {} bph", guessed);
            }
            self.guessed_bph = guessed;
        }
    }

    /// One refresh: recompute, feed the event history and build the readout.
    ///
    /// Returns `None` while no window has ever been acceptable.
    pub fn on_tick<E: AnalysisEngine + ?Sized>(&mut self, engine: &mut E) -> Option<Readout> {
        self.recompute(engine);
        self.time = engine.timestamp();

        let selection = self.selector.view(&self.windows);
        match selection {
            Selection::Fresh(snapshot) => {
                let accepted = self.events.ingest(snapshot.events(), snapshot.period);
                if accepted > 0 {
                    log::debug!("Accepted {} events", accepted);
                }
                self.chart.events_from = snapshot
                    .timestamp
                    .saturating_sub(snapshot.period.ceil() as u64);
            }
            _ => self.chart.events_from = self.time,
        }

        let stall_limit = (STALL_SECS * self.sample_rate) as u64;
        let stalled = self
            .events
            .last()
            .is_some_and(|last| self.time > last + stall_limit);
        if stalled && !self.stalled {
            log::warn!("No ticks heard for {} s", STALL_SECS);
        }
        self.stalled = stalled;
        self.redraw = true;

        let snapshot = selection.snapshot()?;
        Some(Readout {
            time_secs: self.time as f64 / self.sample_rate,
            bph: self.guessed_bph,
            rate: measure::rate(self.guessed_bph, self.sample_rate, snapshot.period),
            beat_error_ms: measure::beat_error_ms(snapshot.be, snapshot.sample_rate as f64),
            amplitude: measure::amplitude(
                self.lift_angle,
                snapshot.tic_pulse,
                snapshot.toc_pulse,
                snapshot.period,
            ),
            signal: self.signal,
            stale: selection.is_stale(),
        })
    }

    /// Pin or release the beat rate.
    ///
    /// The guessed bph follows immediately; the engine sees the new hint on
    /// the next tick.
    pub fn on_user_bph_override(&mut self, bph: BphSetting) {
        self.bph = bph;
        match bph {
            BphSetting::Fixed(bph) => self.guessed_bph = bph,
            BphSetting::Automatic => {
                if let Some(snapshot) = self.selection().snapshot() {
                    self.guessed_bph = measure::guess_bph(snapshot.period / self.sample_rate);
                }
            }
        }
        log::info!("Beat rate set to {} ({} bph)", bph, self.guessed_bph);
        self.redraw = true;
    }

    pub fn on_lift_angle_change(&mut self, lift_angle: f64) {
        self.lift_angle = sanitize_lift_angle(lift_angle);
        self.redraw = true;
    }

    /// Forget the paperstrip history.
    pub fn on_clear(&mut self) {
        self.events.clear();
        self.redraw = true;
    }

    /// Recenter the newest event on the strip.
    pub fn on_center(&mut self) {
        self.chart
            .center_trace(self.events.last(), self.sample_rate, self.guessed_bph);
        self.redraw = true;
    }

    pub fn on_zoom_scroll(&mut self, direction: ScrollDirection) {
        if self.chart.scroll_zoom(direction) {
            log::debug!("Zoom {}", self.chart.trace_zoom);
        }
        self.on_center();
    }

    /// Lay out and draw the paperstrip as of sample time `now`.
    pub fn render_paperstrip<C: Canvas + ?Sized>(
        &self,
        canvas: &mut C,
        now: u64,
    ) -> PaperstripLayout {
        let inputs = StripInputs {
            snapshot: self.selection().snapshot(),
            events: &self.events,
            bph: self.guessed_bph,
            sample_rate: self.sample_rate,
            params: &self.chart,
        };
        let layout = layout_paperstrip(&inputs, canvas.width(), canvas.height(), now);
        draw_paperstrip(canvas, &layout);
        layout
    }

    pub fn render_waveform<C: Canvas + ?Sized>(&self, canvas: &mut C, pulse: Pulse) {
        draw_waveform(canvas, &self.waveform_inputs(), pulse);
    }

    pub fn render_period<C: Canvas + ?Sized>(&self, canvas: &mut C) {
        draw_period(canvas, &self.waveform_inputs());
    }

    fn waveform_inputs(&self) -> WaveformInputs<'_> {
        WaveformInputs {
            selection: self.selection(),
            lift_angle: self.lift_angle,
            sample_rate: self.sample_rate,
            guessed_bph: self.guessed_bph,
        }
    }

    /// Whether anything changed since the last call.
    pub fn take_redraw(&mut self) -> bool {
        std::mem::take(&mut self.redraw)
    }

    /// Selection made by the last recompute
    pub fn selection(&self) -> Selection<'_> {
        self.selector.view(&self.windows)
    }

    pub fn windows(&self) -> &[AnalysisSnapshot] {
        &self.windows
    }

    pub fn events(&self) -> &EventRing {
        &self.events
    }

    pub fn chart(&self) -> &ChartParams {
        &self.chart
    }

    pub fn bph(&self) -> BphSetting {
        self.bph
    }

    pub fn guessed_bph(&self) -> u32 {
        self.guessed_bph
    }

    pub fn lift_angle(&self) -> f64 {
        self.lift_angle
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn signal(&self) -> i32 {
        self.signal
    }

    /// Engine timestamp seen by the last tick
    pub fn time(&self) -> u64 {
        self.time
    }
}
