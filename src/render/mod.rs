//! Drawing surface abstraction and the chart views built on it.

pub mod paperstrip;
pub mod waveform;

pub use paperstrip::{
    ChartParams, Dot, GridLine, PaperstripLayout, ScrollDirection, StripInputs, draw_paperstrip,
    layout_paperstrip,
};
pub use waveform::{WaveformInputs, draw_period, draw_waveform};

/// Palette entries; the canvas maps them to concrete colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalColor {
    Background,
    Waveform,
    Stopped,
    Grid,
    GridAlternate,
    Pulse,
    PulseRange,
    Text,
    Tick,
    Tock,
}

/// Minimal path-based 2D drawing capability.
///
/// Mirrors a cairo-like API: build a path with `move_to`/`line_to`, then
/// `stroke` or `fill` it with the current color and line width.
pub trait Canvas {
    fn move_to(&mut self, x: f64, y: f64);
    fn line_to(&mut self, x: f64, y: f64);
    /// Stroke and clear the current path
    fn stroke(&mut self);
    /// Fill and clear the current path
    fn fill(&mut self);
    fn set_color(&mut self, color: LogicalColor);
    fn set_line_width(&mut self, width: f64);
    fn width(&self) -> f64;
    fn height(&self) -> f64;

    /// Draw a label with its baseline starting at `(x, y)`.
    fn show_text(&mut self, _x: f64, _y: f64, _text: &str) {}

    /// Advance width of a label, for centering.
    fn text_width(&self, text: &str) -> f64 {
        text.chars().count() as f64 * 7.0
    }

    /// Stroke the current path and keep it so it can be filled too.
    ///
    /// Canvases without path preservation may stroke only.
    fn stroke_preserve(&mut self) {
        self.stroke();
    }
}

/// Paint the whole surface with the background and reset the line width.
pub fn clear_background<C: Canvas + ?Sized>(canvas: &mut C) {
    let (w, h) = (canvas.width(), canvas.height());
    canvas.set_line_width(1.0);
    canvas.set_color(LogicalColor::Background);
    canvas.move_to(0.0, 0.0);
    canvas.line_to(w, 0.0);
    canvas.line_to(w, h);
    canvas.line_to(0.0, h);
    canvas.line_to(0.0, 0.0);
    canvas.fill();
}

/// Fill a `size`-pixel square with its top-left corner at `(x, y)`.
pub fn fill_square<C: Canvas + ?Sized>(canvas: &mut C, x: f64, y: f64, size: f64) {
    canvas.move_to(x, y);
    canvas.line_to(x + size, y);
    canvas.line_to(x + size, y + size);
    canvas.line_to(x, y + size);
    canvas.line_to(x, y);
    canvas.fill();
}

/// One recorded drawing call
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    MoveTo(f64, f64),
    LineTo(f64, f64),
    Stroke,
    Fill,
    Color(LogicalColor),
    LineWidth(f64),
    Text(f64, f64, String),
}

/// Canvas that records every call, for tests and headless inspection.
#[derive(Debug, Clone)]
pub struct PathRecorder {
    width: f64,
    height: f64,
    pub ops: Vec<DrawOp>,
}

impl PathRecorder {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            ops: Vec::new(),
        }
    }

    /// Number of `fill` calls made while `color` was active.
    pub fn fills_with(&self, color: LogicalColor) -> usize {
        self.count_with(color, |op| matches!(op, DrawOp::Fill))
    }

    /// Number of `stroke` calls made while `color` was active.
    pub fn strokes_with(&self, color: LogicalColor) -> usize {
        self.count_with(color, |op| matches!(op, DrawOp::Stroke))
    }

    pub fn texts(&self) -> Vec<&str> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text(_, _, s) => Some(s.as_str()),
                _ => None,
            })
            .collect()
    }

    fn count_with(&self, color: LogicalColor, pred: impl Fn(&DrawOp) -> bool) -> usize {
        let mut current = None;
        let mut count = 0;
        for op in &self.ops {
            if let DrawOp::Color(c) = op {
                current = Some(*c);
            } else if pred(op) && current == Some(color) {
                count += 1;
            }
        }
        count
    }
}

impl Canvas for PathRecorder {
    fn move_to(&mut self, x: f64, y: f64) {
        self.ops.push(DrawOp::MoveTo(x, y));
    }

    fn line_to(&mut self, x: f64, y: f64) {
        self.ops.push(DrawOp::LineTo(x, y));
    }

    fn stroke(&mut self) {
        self.ops.push(DrawOp::Stroke);
    }

    fn fill(&mut self) {
        self.ops.push(DrawOp::Fill);
    }

    fn set_color(&mut self, color: LogicalColor) {
        self.ops.push(DrawOp::Color(color));
    }

    fn set_line_width(&mut self, width: f64) {
        self.ops.push(DrawOp::LineWidth(width));
    }

    fn width(&self) -> f64 {
        self.width
    }

    fn height(&self) -> f64 {
        self.height
    }

    fn show_text(&mut self, x: f64, y: f64, text: &str) {
        self.ops.push(DrawOp::Text(x, y, text.to_string()));
    }
}
