//! Tic/toc waveform views and the full-period view.

use super::{Canvas, LogicalColor, clear_background};
use crate::analysis::{AnalysisSnapshot, Pulse, Selection};
use crate::constants::{NEGATIVE_SPAN, POSITIVE_SPAN};
use crate::measure::amplitude_to_time;

const FONT_SIZE: f64 = 12.0;
const PERIOD_GRID: i32 = 16;

const SPAN: f64 = (NEGATIVE_SPAN + POSITIVE_SPAN) as f64;

/// Session state the waveform views read
#[derive(Debug, Clone, Copy)]
pub struct WaveformInputs<'a> {
    pub selection: Selection<'a>,
    pub lift_angle: f64,
    pub sample_rate: f64,
    pub guessed_bph: u32,
}

/// Amplitude grid positions as `(degrees, x)` for a view `width` pixels wide.
///
/// Amplitudes below half the lift angle cannot occur and amplitudes whose
/// pulse would start before the visible span are left out.
pub fn amplitude_grid(lift_angle: f64, period_secs: f64, width: f64) -> Vec<(u32, f64)> {
    (10..360)
        .step_by(10)
        .filter(|&amp| 2.0 * amp as f64 >= lift_angle)
        .filter_map(|amp| {
            let t = period_secs * amplitude_to_time(lift_angle, amp as f64);
            if t > 0.001 * NEGATIVE_SPAN as f64 {
                return None;
            }
            let x = (width * (NEGATIVE_SPAN as f64 - 1000.0 * t) / SPAN).round();
            Some((amp, x))
        })
        .collect()
}

/// Points of the mirrored envelope between sample offsets `a` and `b`.
///
/// The first `width` points trace the upper half left to right, the rest
/// trace the lower half back, so the path closes on itself for filling.
pub fn envelope(
    snapshot: &AnalysisSnapshot,
    a: f64,
    b: f64,
    width: f64,
    height: f64,
) -> Vec<(f64, f64)> {
    let w = width.max(0.0) as usize;
    let period = snapshot.period;
    let last = snapshot.waveform.len().saturating_sub(1);
    let mid = (height / 2.0).floor();

    (0..2 * w)
        .map(|n| {
            let i = if n < w { n } else { 2 * w - 1 - n };
            let x = (a + i as f64 * (b - a) / width).rem_euclid(period);
            let sample = snapshot
                .waveform
                .get((x.floor() as usize).min(last))
                .copied()
                .unwrap_or(0.0);
            let y = if sample <= 0.0 || snapshot.waveform_max <= 0.0 {
                0.0
            } else {
                (sample * 0.4 / snapshot.waveform_max) as f64
            };
            let mut k = (y * height).round();
            if n < w {
                k = -k;
            }
            (i as f64 + 0.5, mid + k + 0.5)
        })
        .collect()
}

fn fill_envelope<C: Canvas + ?Sized>(canvas: &mut C, points: &[(f64, f64)], stale: bool) {
    let mut points = points.iter();
    if let Some(&(x, y)) = points.next() {
        canvas.move_to(x, y);
    }
    for &(x, y) in points {
        canvas.line_to(x, y);
    }
    canvas.set_color(if stale {
        LogicalColor::Stopped
    } else {
        LogicalColor::Waveform
    });
    canvas.stroke_preserve();
    canvas.fill();
}

fn center_line<C: Canvas + ?Sized>(canvas: &mut C) {
    let (width, height) = (canvas.width(), canvas.height());
    let y = (height / 2.0).floor() + 0.5;
    canvas.move_to(0.5, y);
    canvas.line_to(width - 0.5, y);
    canvas.set_color(LogicalColor::Stopped);
    canvas.stroke();
}

fn span_x(ms: f64, width: f64) -> f64 {
    ((NEGATIVE_SPAN as f64 + ms) * width / SPAN).floor()
}

/// Draw the tic or toc waveform with its ms and amplitude scales.
pub fn draw_waveform<C: Canvas + ?Sized>(canvas: &mut C, inputs: &WaveformInputs<'_>, pulse: Pulse) {
    clear_background(canvas);
    let (width, height) = (canvas.width().floor(), canvas.height().floor());
    let mid = (height / 2.0).floor();

    for i in (1 - NEGATIVE_SPAN)..POSITIVE_SPAN {
        let x = span_x(i as f64, width);
        canvas.move_to(x + 0.5, mid + 0.5);
        canvas.line_to(x + 0.5, height - 0.5);
        canvas.set_color(if i % 5 != 0 {
            LogicalColor::Grid
        } else {
            LogicalColor::GridAlternate
        });
        canvas.stroke();
    }

    canvas.set_color(LogicalColor::Text);
    for i in ((1 - NEGATIVE_SPAN)..POSITIVE_SPAN).filter(|i| i % 5 == 0) {
        let x = span_x(i as f64, width);
        canvas.show_text(x + FONT_SIZE / 4.0, height - FONT_SIZE / 2.0, &i.to_string());
    }
    let ms_x = width - canvas.text_width("ms") - FONT_SIZE / 4.0;
    canvas.show_text(ms_x, height - FONT_SIZE / 2.0, "ms");

    let snapshot = inputs.selection.snapshot();
    let period_secs = match snapshot {
        Some(s) => s.period / inputs.sample_rate,
        None => 7200.0 / inputs.guessed_bph.max(1) as f64,
    };

    let grid = amplitude_grid(inputs.lift_angle, period_secs, width);
    for &(amp, x) in &grid {
        canvas.move_to(x + 0.5, 0.5);
        canvas.line_to(x + 0.5, mid + 0.5);
        canvas.set_color(if amp % 50 != 0 {
            LogicalColor::Grid
        } else {
            LogicalColor::GridAlternate
        });
        canvas.stroke();
    }

    canvas.set_color(LogicalColor::Text);
    let mut last_x = 0.0;
    for &(amp, x) in grid.iter().filter(|(amp, _)| amp % 50 == 0) {
        if x > last_x {
            let label = amp.to_string();
            canvas.show_text(x + FONT_SIZE / 4.0, FONT_SIZE * 1.5, &label);
            last_x = x + FONT_SIZE / 4.0 + canvas.text_width(&label);
        }
    }
    let deg_x = width - canvas.text_width("deg") - FONT_SIZE / 4.0;
    canvas.show_text(deg_x, FONT_SIZE * 1.5, "deg");

    let Some(snapshot) = snapshot else {
        center_line(canvas);
        return;
    };

    let span = 0.001 * inputs.sample_rate;
    let offset = pulse.offset(snapshot) as f64;
    let a = offset - span * NEGATIVE_SPAN as f64;
    let b = offset + span * POSITIVE_SPAN as f64;
    let points = envelope(snapshot, a, b, width, height);
    fill_envelope(canvas, &points, inputs.selection.is_stale());

    let duration = pulse.duration(snapshot);
    if duration > 0.0 {
        let x = ((NEGATIVE_SPAN as f64 - duration * 1000.0 / snapshot.sample_rate as f64) * width
            / SPAN)
            .round();
        canvas.move_to(x, 1.0);
        canvas.line_to(x, height - 1.0);
        canvas.set_color(LogicalColor::Pulse);
        canvas.set_line_width(2.0);
        canvas.stroke();
    }
}

/// Draw one whole period centred between the tic and the toc.
pub fn draw_period<C: Canvas + ?Sized>(canvas: &mut C, inputs: &WaveformInputs<'_>) {
    clear_background(canvas);
    let (width, height) = (canvas.width().floor(), canvas.height().floor());
    let snapshot = inputs.selection.snapshot();

    let mut bounds = None;
    if let Some(p) = snapshot {
        let tic = p.tic as f64;
        let toc = if p.tic < p.toc {
            p.toc as f64
        } else {
            p.toc as f64 + p.period
        };
        let a = (tic + toc) / 2.0 - p.period / 2.0;
        let b = (tic + toc) / 2.0 + p.period / 2.0;

        let before = NEGATIVE_SPAN as f64 * 0.001 * inputs.sample_rate;
        let after = POSITIVE_SPAN as f64 * 0.001 * inputs.sample_rate;
        for center in [tic, toc] {
            let left = (center - a - before) * width / p.period;
            let right = (center - a + after) * width / p.period;
            canvas.move_to(left, 0.0);
            canvas.line_to(left, height);
            canvas.line_to(right, height);
            canvas.line_to(right, 0.0);
            canvas.set_color(LogicalColor::PulseRange);
            canvas.fill();
        }
        bounds = Some((p, a, b));
    }

    for i in 1..PERIOD_GRID {
        let x = (i as f64 * width / PERIOD_GRID as f64).floor();
        canvas.move_to(x + 0.5, 0.5);
        canvas.line_to(x + 0.5, height - 0.5);
        canvas.set_color(if i % 4 != 0 {
            LogicalColor::Grid
        } else {
            LogicalColor::GridAlternate
        });
        canvas.stroke();
    }

    match bounds {
        Some((p, a, b)) => {
            let points = envelope(p, a, b, width, height);
            fill_envelope(canvas, &points, inputs.selection.is_stale());
        }
        None => center_line(canvas),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::PathRecorder;

    fn locked_snapshot() -> AnalysisSnapshot {
        let period = 16000.0;
        let waveform = (0..16000)
            .map(|i| if (1000..1400).contains(&i) { 1.0 } else { 0.1 })
            .collect();
        AnalysisSnapshot {
            period,
            sigma: 0.5,
            tic: 1000,
            toc: 9000,
            tic_pulse: 300.0,
            toc_pulse: 310.0,
            sample_rate: 48000,
            ready: true,
            waveform,
            waveform_max: 1.0,
            ..AnalysisSnapshot::default()
        }
    }

    fn inputs(selection: Selection<'_>) -> WaveformInputs<'_> {
        WaveformInputs {
            selection,
            lift_angle: 52.0,
            sample_rate: 48000.0,
            guessed_bph: 21600,
        }
    }

    #[test]
    fn test_no_data_draws_center_line() {
        let mut canvas = PathRecorder::new(300.0, 200.0);
        draw_waveform(&mut canvas, &inputs(Selection::NoData), Pulse::Tic);
        assert_eq!(canvas.strokes_with(LogicalColor::Stopped), 1);
        assert_eq!(canvas.fills_with(LogicalColor::Waveform), 0);
        assert_eq!(canvas.strokes_with(LogicalColor::Pulse), 0);

        let texts = canvas.texts();
        for label in ["-20", "0", "45", "ms", "deg"] {
            assert!(texts.contains(&label), "missing {}", label);
        }
    }

    #[test]
    fn test_fresh_waveform_with_pulse_marker() {
        let snapshot = locked_snapshot();
        let mut canvas = PathRecorder::new(300.0, 200.0);
        draw_waveform(&mut canvas, &inputs(Selection::Fresh(&snapshot)), Pulse::Toc);
        assert_eq!(canvas.fills_with(LogicalColor::Waveform), 1);
        assert_eq!(canvas.fills_with(LogicalColor::Stopped), 0);
        assert_eq!(canvas.strokes_with(LogicalColor::Pulse), 1);
    }

    #[test]
    fn test_stale_waveform_uses_stopped_color() {
        let snapshot = locked_snapshot();
        let mut canvas = PathRecorder::new(300.0, 200.0);
        draw_waveform(&mut canvas, &inputs(Selection::Stale(&snapshot)), Pulse::Tic);
        assert_eq!(canvas.fills_with(LogicalColor::Stopped), 1);
        assert_eq!(canvas.fills_with(LogicalColor::Waveform), 0);
    }

    #[test]
    fn test_missing_pulse_has_no_marker() {
        let mut snapshot = locked_snapshot();
        snapshot.tic_pulse = 0.0;
        let mut canvas = PathRecorder::new(300.0, 200.0);
        draw_waveform(&mut canvas, &inputs(Selection::Fresh(&snapshot)), Pulse::Tic);
        assert_eq!(canvas.strokes_with(LogicalColor::Pulse), 0);
    }

    #[test]
    fn test_amplitude_grid_bounds() {
        let width = 750.0;
        let grid = amplitude_grid(52.0, 1.0 / 3.0, width);
        assert!(!grid.is_empty());
        // 10 and 20 degrees are below half the lift angle
        assert!(grid.iter().all(|&(amp, _)| amp >= 30));
        let onset = width * NEGATIVE_SPAN as f64 / SPAN;
        for pair in grid.windows(2) {
            // Larger amplitude, shorter pulse, closer to the onset
            assert!(pair[0].1 <= pair[1].1);
        }
        assert!(grid.iter().all(|&(_, x)| (0.0..=onset).contains(&x)));
    }

    #[test]
    fn test_envelope_is_mirrored() {
        let snapshot = locked_snapshot();
        let (width, height) = (100.0, 80.0);
        let points = envelope(&snapshot, 900.0, 1900.0, width, height);
        assert_eq!(points.len(), 200);
        let mid = 40.5;
        for n in 0..100 {
            let upper = points[n];
            let lower = points[199 - n];
            assert_eq!(upper.0, lower.0);
            approx::assert_abs_diff_eq!(mid - upper.1, lower.1 - mid, epsilon = 1e-9);
            assert!(upper.1 <= mid);
        }
        // Peak at 0.4 of the height
        assert!(points.iter().any(|&(_, y)| y == mid + 32.0));
    }

    #[test]
    fn test_period_view() {
        let snapshot = locked_snapshot();
        let mut canvas = PathRecorder::new(320.0, 100.0);
        draw_period(&mut canvas, &inputs(Selection::Fresh(&snapshot)));
        assert_eq!(canvas.fills_with(LogicalColor::PulseRange), 2);
        assert_eq!(canvas.fills_with(LogicalColor::Waveform), 1);
        assert_eq!(
            canvas.strokes_with(LogicalColor::Grid) + canvas.strokes_with(LogicalColor::GridAlternate),
            15
        );

        let mut canvas = PathRecorder::new(320.0, 100.0);
        draw_period(&mut canvas, &inputs(Selection::NoData));
        assert_eq!(canvas.fills_with(LogicalColor::PulseRange), 0);
        assert_eq!(canvas.strokes_with(LogicalColor::Stopped), 1);
    }
}
