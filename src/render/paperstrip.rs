//! Paperstrip chronograph: every tick is a dot whose row is the number of
//! beats elapsed since it happened and whose column is its phase within the
//! beat. A watch running at its nominal rate draws vertical columns; any rate
//! error tilts them, and the four guide lines show the slope expected from
//! the current rate estimate.

use super::{Canvas, LogicalColor, clear_background, fill_square};
use crate::analysis::AnalysisSnapshot;
use crate::constants::{
    DEFAULT_ZOOM, MAX_ZOOM, MIN_ZOOM, PAPERSTRIP_MARGIN, SECS_PER_DAY, STALL_SECS,
};
use crate::events::EventRing;
use crate::measure;

const GUIDE_LINES: usize = 4;
const MINUTE_EVERY: i64 = 6;
const SCALE_OFFSET: f64 = 20.5;

/// Mouse wheel direction over the paperstrip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    Up,
    Down,
}

/// User-adjustable chart state
#[derive(Debug, Clone, PartialEq)]
pub struct ChartParams {
    /// Phase offset added to every event, in samples
    pub trace_centering: f64,
    /// Beats per displayed row, 1-20
    pub trace_zoom: u32,
    /// Low-water mark handed to the engine so it can skip consumed history
    pub events_from: u64,
}

impl Default for ChartParams {
    fn default() -> Self {
        Self {
            trace_centering: 0.0,
            trace_zoom: DEFAULT_ZOOM,
            events_from: 0,
        }
    }
}

impl ChartParams {
    pub fn with_zoom(zoom: u32) -> Self {
        Self {
            trace_zoom: zoom.clamp(MIN_ZOOM, MAX_ZOOM),
            ..Self::default()
        }
    }

    /// Shift the trace so the newest event sits in the middle of its row.
    pub fn center_trace(&mut self, last_event: Option<u64>, sample_rate: f64, bph: u32) {
        self.trace_centering = match last_event {
            Some(last) => {
                let sweep = sample_rate * 3600.0 / (self.trace_zoom as f64 * bph.max(1) as f64);
                (last as f64 + 0.5 * sweep) % sweep
            }
            None => 0.0,
        };
    }

    /// Step the zoom by one and report whether it changed.
    pub fn scroll_zoom(&mut self, direction: ScrollDirection) -> bool {
        let zoom = match direction {
            ScrollDirection::Up => (self.trace_zoom + 1).min(MAX_ZOOM),
            ScrollDirection::Down => self.trace_zoom.saturating_sub(1).max(MIN_ZOOM),
        };
        let changed = zoom != self.trace_zoom;
        self.trace_zoom = zoom;
        changed
    }
}

/// Everything the mapper reads, borrowed from the session
pub struct StripInputs<'a> {
    /// Selected snapshot (fresh or stale), `None` before any lock
    pub snapshot: Option<&'a AnalysisSnapshot>,
    pub events: &'a EventRing,
    pub bph: u32,
    pub sample_rate: f64,
    pub params: &'a ChartParams,
}

/// Horizontal ten-second line
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLine {
    pub y: f64,
    /// Every sixth line marks a full minute
    pub minute: bool,
}

/// One plotted event, in pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dot {
    pub column: i64,
    pub row: i64,
    pub color: LogicalColor,
    /// Copy drawn in the right margin for a dot near the left seam
    pub mirrored: bool,
}

/// Computed geometry of one paperstrip frame
#[derive(Debug, Clone)]
pub struct PaperstripLayout {
    pub width: f64,
    pub height: f64,
    pub strip_width: f64,
    pub left_margin: f64,
    pub right_margin: f64,
    /// Sample time shown at the top row, clamped when the watch stopped
    pub time: u64,
    pub stopped: bool,
    /// Samples per beat
    pub sweep: f64,
    /// Slope of the guide lines in pixels per row, when drawn
    pub slope: Option<f64>,
    /// Polylines of the rate guide lines
    pub guide_lines: Vec<Vec<(f64, f64)>>,
    pub grid_lines: Vec<GridLine>,
    pub dots: Vec<Dot>,
    pub scale_label: String,
}

impl PaperstripLayout {
    /// Dots excluding margin copies
    pub fn primary_dots(&self) -> impl Iterator<Item = &Dot> {
        self.dots.iter().filter(|d| !d.mirrored)
    }
}

/// Map the event history onto a `width` x `height` strip at sample time `time`.
pub fn layout_paperstrip(
    inputs: &StripInputs<'_>,
    width: f64,
    height: f64,
    time: u64,
) -> PaperstripLayout {
    let width = width.floor();
    let height = height.floor();
    let sample_rate = inputs.sample_rate;
    let bph = inputs.bph.max(1);
    let zoom = inputs.params.trace_zoom.clamp(MIN_ZOOM, MAX_ZOOM) as f64;
    let last_event = inputs.events.last();

    let mut time = time;
    let mut stopped = false;
    if let Some(last) = last_event {
        let limit = last + (STALL_SECS * sample_rate) as u64;
        if time > limit {
            log::trace!("No events for {}s, holding the strip", STALL_SECS);
            time = limit;
            stopped = true;
        }
    }

    let strip_width = (width / (1.0 + PAPERSTRIP_MARGIN)).round();
    let left_margin = ((width - strip_width) / 2.0).floor();
    let right_margin = ((width + strip_width) / 2.0).floor();

    let mut slope = None;
    let mut guide_lines = Vec::new();
    if let (Some(snapshot), Some(_)) = (inputs.snapshot, last_event)
        && width >= 1.0
        && height >= 1.0
    {
        let rate = measure::rate(bph, sample_rate, snapshot.period);
        let s = -rate * strip_width * zoom / SECS_PER_DAY;
        if (-1.0..=1.0).contains(&s) {
            slope = Some(s);
            for i in 0..GUIDE_LINES {
                let start = width * (i as f64 + 0.5) / GUIDE_LINES as f64;
                guide_lines.extend(guide_line(start, s, width, height));
            }
        }
    }

    let sweep = sample_rate * 3600.0 / bph as f64;
    let now = sweep * (time as f64 / sweep).ceil();

    let grid_lines = grid_lines(now, sweep, sample_rate, height);

    let margin_compensation = sweep * PAPERSTRIP_MARGIN / (2.0 * zoom);
    let span = sweep / zoom;
    let mut dots = Vec::new();
    for (slot, ts) in inputs.events.iter() {
        let event = now - ts as f64 + inputs.params.trace_centering + margin_compensation;
        if event < 0.0 {
            continue;
        }
        let row = (event / sweep).floor();
        if row >= height {
            break;
        }
        let column = ((event % span) * strip_width / span).floor() as i64;
        let row = row as i64;
        let color = if slot % 2 == 1 {
            LogicalColor::Tick
        } else {
            LogicalColor::Tock
        };
        dots.push(Dot {
            column,
            row,
            color,
            mirrored: false,
        });
        if (column as f64) < width - strip_width && row > 0 {
            dots.push(Dot {
                column: column + strip_width as i64,
                row: row - 1,
                color,
                mirrored: true,
            });
        }
    }

    PaperstripLayout {
        width,
        height,
        strip_width,
        left_margin,
        right_margin,
        time,
        stopped,
        sweep,
        slope,
        guide_lines,
        grid_lines,
        dots,
        scale_label: format!("{:.1} ms", 3_600_000.0 / (bph as f64 * zoom)),
    }
}

/// Trace one guide line from the top edge down, wrapping at the sides.
fn guide_line(start: f64, slope: f64, width: f64, height: f64) -> Vec<Vec<(f64, f64)>> {
    let mut pieces = Vec::new();
    let mut piece = vec![(start, 0.0)];
    let mut y = 0.0;

    loop {
        let x = (y * slope + start).rem_euclid(width);
        let nx = x + slope * (height - y);
        if (0.0..=width).contains(&nx) {
            piece.push((nx, height));
            pieces.push(piece);
            break;
        }

        let d = if slope > 0.0 { width - x } else { x };
        y += d / slope.abs();
        piece.push((if slope > 0.0 { width } else { 0.0 }, y));
        pieces.push(std::mem::take(&mut piece));

        y += 1.0;
        if !y.is_finite() || y > height {
            break;
        }
        piece.push((if slope > 0.0 { 0.0 } else { width }, y));
    }

    pieces
}

fn grid_lines(now: f64, sweep: f64, sample_rate: f64, height: f64) -> Vec<GridLine> {
    let ten_s = sample_rate * 10.0 / sweep;
    if ten_s <= 0.0 || !ten_s.is_finite() {
        return Vec::new();
    }
    let last_line = (now / sweep) % ten_s;
    let last_tenth = (now / (sweep * ten_s)).floor() as i64;

    let mut lines = Vec::new();
    for i in 0.. {
        let y = 0.5 + (last_line + i as f64 * ten_s).round();
        if y > height {
            break;
        }
        lines.push(GridLine {
            y,
            minute: (last_tenth - i) % MINUTE_EVERY == 0,
        });
    }
    lines
}

/// Render a computed layout.
pub fn draw_paperstrip<C: Canvas + ?Sized>(canvas: &mut C, layout: &PaperstripLayout) {
    clear_background(canvas);
    let (width, height) = (layout.width, layout.height);

    if !layout.guide_lines.is_empty() {
        canvas.set_line_width(1.3);
        for piece in &layout.guide_lines {
            let mut points = piece.iter();
            if let Some(&(x, y)) = points.next() {
                canvas.move_to(x, y);
            }
            for &(x, y) in points {
                canvas.line_to(x, y);
            }
        }
        canvas.set_color(LogicalColor::Pulse);
        canvas.stroke();
    }

    canvas.set_line_width(1.0);
    canvas.move_to(layout.left_margin + 0.5, 0.5);
    canvas.line_to(layout.left_margin + 0.5, height - 0.5);
    canvas.move_to(layout.right_margin + 0.5, 0.5);
    canvas.line_to(layout.right_margin + 0.5, height - 0.5);
    canvas.set_color(LogicalColor::Grid);
    canvas.stroke();

    for line in &layout.grid_lines {
        canvas.move_to(0.5, line.y);
        canvas.line_to(width - 0.5, line.y);
        canvas.set_color(if line.minute {
            LogicalColor::GridAlternate
        } else {
            LogicalColor::Grid
        });
        canvas.stroke();
    }

    for dot in &layout.dots {
        canvas.set_color(dot.color);
        fill_square(canvas, dot.column as f64, dot.row as f64, 1.0);
    }

    draw_scale(canvas, layout);
}

/// Double-headed arrow across the strip with the beat duration of one row.
fn draw_scale<C: Canvas + ?Sized>(canvas: &mut C, layout: &PaperstripLayout) {
    let y = layout.height - SCALE_OFFSET;
    let (left, right) = (layout.left_margin, layout.right_margin);

    canvas.set_color(LogicalColor::Text);
    canvas.set_line_width(2.0);
    canvas.move_to(left + 3.0, y);
    canvas.line_to(right - 3.0, y);
    canvas.stroke();

    canvas.set_line_width(1.0);
    canvas.move_to(left + 0.5, y);
    canvas.line_to(left + 5.5, y + 5.0);
    canvas.line_to(left + 5.5, y - 5.0);
    canvas.line_to(left + 0.5, y);
    canvas.fill();
    canvas.move_to(right + 0.5, y);
    canvas.line_to(right - 4.5, y + 5.0);
    canvas.line_to(right - 4.5, y - 5.0);
    canvas.line_to(right + 0.5, y);
    canvas.fill();

    let label_width = canvas.text_width(&layout.scale_label);
    canvas.show_text(
        (layout.width - label_width) / 2.0,
        layout.height - 30.0,
        &layout.scale_label,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::PathRecorder;

    const SAMPLE_RATE: f64 = 48000.0;
    const BPH: u32 = 21600;
    // 48000 * 3600 / 21600
    const SWEEP: u64 = 8000;

    fn snapshot(period: f64) -> AnalysisSnapshot {
        AnalysisSnapshot {
            period,
            sigma: 0.0,
            ready: true,
            sample_rate: SAMPLE_RATE as u32,
            ..AnalysisSnapshot::default()
        }
    }

    fn ring_with(events: &[u64]) -> EventRing {
        let mut ring = EventRing::with_capacity(64);
        ring.ingest(events.iter().copied(), 2.0 * SWEEP as f64);
        ring
    }

    fn layout(
        snapshot: Option<&AnalysisSnapshot>,
        events: &EventRing,
        params: &ChartParams,
        time: u64,
    ) -> PaperstripLayout {
        let inputs = StripInputs {
            snapshot,
            events,
            bph: BPH,
            sample_rate: SAMPLE_RATE,
            params,
        };
        layout_paperstrip(&inputs, 600.0, 400.0, time)
    }

    #[test]
    fn test_evenly_spaced_events_stack_vertically() {
        let events: Vec<u64> = (1..=20).map(|k| k * SWEEP).collect();
        let ring = ring_with(&events);
        let params = ChartParams::with_zoom(1);
        let layout = layout(None, &ring, &params, 20 * SWEEP);

        let dots: Vec<&Dot> = layout.primary_dots().collect();
        assert_eq!(dots.len(), 20);
        assert!(dots.iter().all(|d| d.column == dots[0].column));
        let rows: Vec<i64> = dots.iter().map(|d| d.row).collect();
        assert_eq!(rows, (0..20).collect::<Vec<_>>());
        assert!(!layout.stopped);
    }

    #[test]
    fn test_colors_alternate() {
        let events: Vec<u64> = (1..=4).map(|k| k * SWEEP).collect();
        let ring = ring_with(&events);
        let params = ChartParams::with_zoom(1);
        let layout = layout(None, &ring, &params, 4 * SWEEP);
        let colors: Vec<LogicalColor> = layout.primary_dots().map(|d| d.color).collect();
        assert_eq!(
            colors,
            vec![
                LogicalColor::Tock,
                LogicalColor::Tick,
                LogicalColor::Tock,
                LogicalColor::Tick
            ]
        );
    }

    #[test]
    fn test_dots_near_left_seam_are_mirrored() {
        // strip 500 px, margin band 100 px; centering 0 puts dots at column 50
        let events: Vec<u64> = (1..=3).map(|k| k * SWEEP).collect();
        let ring = ring_with(&events);
        let params = ChartParams::with_zoom(1);
        let layout = layout(None, &ring, &params, 3 * SWEEP);

        let mirrored: Vec<&Dot> = layout.dots.iter().filter(|d| d.mirrored).collect();
        // The newest dot is on row 0 and has no previous row to copy into
        assert_eq!(mirrored.len(), 2);
        for dot in mirrored {
            assert_eq!(dot.column, 50 + 500);
        }
    }

    #[test]
    fn test_stall_clamps_time() {
        let ring = ring_with(&[SWEEP]);
        let params = ChartParams::default();
        let late = SWEEP + 10 * SAMPLE_RATE as u64;
        let layout = layout(None, &ring, &params, late);
        assert!(layout.stopped);
        assert_eq!(layout.time, SWEEP + 5 * SAMPLE_RATE as u64);

        let layout = super::layout_paperstrip(
            &StripInputs {
                snapshot: None,
                events: &ring,
                bph: BPH,
                sample_rate: SAMPLE_RATE,
                params: &params,
            },
            600.0,
            400.0,
            SWEEP + 4 * SAMPLE_RATE as u64,
        );
        assert!(!layout.stopped);

        // Exactly five seconds is not yet a stall
        let limit = SWEEP + 5 * SAMPLE_RATE as u64;
        let layout = layout_paperstrip(
            &StripInputs {
                snapshot: None,
                events: &ring,
                bph: BPH,
                sample_rate: SAMPLE_RATE,
                params: &params,
            },
            600.0,
            400.0,
            limit,
        );
        assert!(!layout.stopped);
        assert_eq!(layout.time, limit);
    }

    #[test]
    fn test_degenerate_surface_has_no_guides() {
        let ring = ring_with(&[SWEEP]);
        let snap = snapshot(2.0 * SWEEP as f64 * 1.00001);
        let params = ChartParams::default();
        for width in [0.0, 0.5] {
            let inputs = StripInputs {
                snapshot: Some(&snap),
                events: &ring,
                bph: BPH,
                sample_rate: SAMPLE_RATE,
                params: &params,
            };
            let layout = layout_paperstrip(&inputs, width, 300.0, 2 * SWEEP);
            assert!(layout.guide_lines.is_empty(), "width {}", width);
            assert!(layout.slope.is_none());
        }
    }

    #[test]
    fn test_guide_line_stops_on_zero_width() {
        let pieces = guide_line(0.0, 0.5, 0.0, 300.0);
        assert!(pieces.len() <= 2, "{} pieces", pieces.len());
    }

    #[test]
    fn test_no_events_no_guides() {
        let ring = EventRing::with_capacity(8);
        let snap = snapshot(16000.0);
        let params = ChartParams::default();
        let layout = layout(Some(&snap), &ring, &params, 100_000);
        assert!(layout.dots.is_empty());
        assert!(layout.guide_lines.is_empty());
        assert!(!layout.stopped);
    }

    #[test]
    fn test_zero_rate_guides_are_vertical() {
        let ring = ring_with(&[SWEEP]);
        let snap = snapshot(2.0 * SWEEP as f64);
        let params = ChartParams::default();
        let layout = layout(Some(&snap), &ring, &params, 2 * SWEEP);

        assert_eq!(layout.guide_lines.len(), 4);
        for (i, piece) in layout.guide_lines.iter().enumerate() {
            let x = 600.0 * (i as f64 + 0.5) / 4.0;
            assert_eq!(piece.len(), 2);
            approx::assert_abs_diff_eq!(piece[0].0, x, epsilon = 1e-9);
            approx::assert_abs_diff_eq!(piece[1].0, x, epsilon = 1e-9);
            assert_eq!(piece[1].1, 400.0);
        }
    }

    #[test]
    fn test_guides_wrap_inside_surface() {
        let ring = ring_with(&[SWEEP]);
        // Losing ~17 s/day at zoom 10 over a 500 px strip gives slope ~1
        let rate = -15.0;
        let period = 2.0 * SWEEP as f64 / (1.0 + rate / SECS_PER_DAY);
        let snap = snapshot(period);
        let params = ChartParams::default();
        let layout = layout(Some(&snap), &ring, &params, 2 * SWEEP);

        let slope = layout.slope.unwrap();
        assert!(slope > 0.8 && slope <= 1.0, "slope {}", slope);
        assert!(layout.guide_lines.len() > 4);
        for piece in &layout.guide_lines {
            for &(x, y) in piece {
                assert!((0.0..=600.0).contains(&x), "x {}", x);
                assert!(y <= 400.0 + 1.0);
            }
        }
    }

    #[test]
    fn test_steep_rate_hides_guides() {
        let ring = ring_with(&[SWEEP]);
        let snap = snapshot(2.0 * SWEEP as f64 * 0.999);
        let params = ChartParams::default();
        let layout = layout(Some(&snap), &ring, &params, 2 * SWEEP);
        assert!(layout.slope.is_none());
        assert!(layout.guide_lines.is_empty());
    }

    #[test]
    fn test_grid_every_ten_seconds() {
        let ring = EventRing::with_capacity(8);
        let params = ChartParams::default();
        // 25 s in; ten seconds is 60 rows
        let layout = layout(None, &ring, &params, 25 * SAMPLE_RATE as u64);
        let ys: Vec<f64> = layout.grid_lines.iter().map(|l| l.y).collect();
        assert_eq!(ys, vec![30.5, 90.5, 150.5, 210.5, 270.5, 330.5, 390.5]);
        let minutes: Vec<bool> = layout.grid_lines.iter().map(|l| l.minute).collect();
        // Lines mark 20 s, 10 s, 0 s, -10 s, ...; 0 s and -60 s are minutes
        assert_eq!(minutes, vec![false, false, true, false, false, false, false]);
    }

    #[test]
    fn test_scale_label() {
        let ring = EventRing::with_capacity(8);
        let params = ChartParams::with_zoom(1);
        let layout = layout(None, &ring, &params, 0);
        assert_eq!(layout.scale_label, "166.7 ms");
    }

    #[test]
    fn test_center_trace() {
        let mut params = ChartParams::default();
        params.center_trace(Some(1000), SAMPLE_RATE, BPH);
        // sweep at zoom 10 is 800 samples
        approx::assert_abs_diff_eq!(params.trace_centering, 600.0, epsilon = 1e-9);
        params.center_trace(None, SAMPLE_RATE, BPH);
        assert_eq!(params.trace_centering, 0.0);
    }

    #[test]
    fn test_zoom_clamps() {
        let mut params = ChartParams::with_zoom(10);
        for _ in 0..25 {
            params.scroll_zoom(ScrollDirection::Up);
        }
        assert_eq!(params.trace_zoom, 20);

        let mut params = ChartParams::with_zoom(10);
        for _ in 0..25 {
            params.scroll_zoom(ScrollDirection::Down);
        }
        assert_eq!(params.trace_zoom, 1);
        assert!(!params.scroll_zoom(ScrollDirection::Down));
    }

    #[test]
    fn test_draw_empty_strip() {
        let ring = EventRing::with_capacity(8);
        let params = ChartParams::default();
        let layout = layout(None, &ring, &params, 0);
        let mut canvas = PathRecorder::new(600.0, 400.0);
        draw_paperstrip(&mut canvas, &layout);
        assert_eq!(canvas.fills_with(LogicalColor::Tick), 0);
        assert_eq!(canvas.fills_with(LogicalColor::Tock), 0);
        assert_eq!(canvas.strokes_with(LogicalColor::Pulse), 0);
        assert!(canvas.texts().contains(&"16.7 ms"));
    }
}
