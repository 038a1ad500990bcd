use std::collections::VecDeque;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Parser;
use crossbeam_channel::{Receiver, Sender};
use eframe::egui;
use egui_plot::{Line, Plot, PlotPoints};

use tickgraph::analysis::{AnalysisEngine, Pulse};
use tickgraph::constants::{MAX_LA, MIN_LA, PRESET_BPH};
use tickgraph::output::{amplitude_label, beat_error_label, rate_label};
use tickgraph::render::{Canvas, LogicalColor, ScrollDirection};
use tickgraph::simulation::{SimulatedEngine, WatchModel};
use tickgraph::{BphSetting, Readout, ReplayEngine, Session, TimegrapherConfig};

const RATE_HISTORY_SECS: f64 = 120.0;
const FONT_SIZE: f32 = 12.0;
const MAX_CATCH_UP: u32 = 10;

#[derive(Parser, Debug)]
#[command(name = "tickgraph_gui")]
#[command(about = "Timegrapher paperstrip - GUI", long_about = None)]
struct Args {
    /// JSON-lines recording to replay; a simulated watch is used otherwise
    #[arg(short = 'i', long)]
    input: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    #[arg(short = 'b', long)]
    bph: Option<BphSetting>,

    #[arg(short = 'l', long)]
    lift_angle: Option<f64>,

    /// Simulated beat rate
    #[arg(long, default_value_t = 28800)]
    sim_bph: u32,

    /// Simulated rate error in s/d
    #[arg(long, default_value_t = 4.0, allow_hyphen_values = true)]
    sim_rate: f64,

    /// Simulated beat error in ms
    #[arg(long, default_value_t = 0.6)]
    sim_beat_error: f64,

    /// Simulated amplitude in degrees
    #[arg(long, default_value_t = 275.0)]
    sim_amplitude: f64,

    /// Simulated tick jitter in samples
    #[arg(long, default_value_t = 2.0)]
    sim_jitter: f64,

    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

struct GuiLogger {
    tx: Sender<String>,
    max_level: log::LevelFilter,
}

impl log::Log for GuiLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            let msg = format!("[{}] {}", record.level(), record.args());
            let _ = self.tx.send(msg);
        }
    }

    fn flush(&self) {}
}

fn palette(color: LogicalColor) -> egui::Color32 {
    match color {
        LogicalColor::Background => egui::Color32::from_rgb(0, 0, 0),
        LogicalColor::Waveform => egui::Color32::from_rgb(50, 205, 50),
        LogicalColor::Stopped => egui::Color32::from_rgb(230, 200, 40),
        LogicalColor::Grid => egui::Color32::from_rgb(60, 60, 60),
        LogicalColor::GridAlternate => egui::Color32::from_rgb(120, 120, 120),
        LogicalColor::Pulse => egui::Color32::from_rgb(80, 140, 255),
        LogicalColor::PulseRange => egui::Color32::from_rgb(30, 30, 60),
        LogicalColor::Text => egui::Color32::from_rgb(220, 220, 220),
        LogicalColor::Tick => egui::Color32::from_rgb(255, 90, 90),
        LogicalColor::Tock => egui::Color32::from_rgb(90, 160, 255),
    }
}

/// [`Canvas`] drawing into an egui painter rectangle.
struct EguiCanvas<'a> {
    painter: &'a egui::Painter,
    rect: egui::Rect,
    paths: Vec<Vec<egui::Pos2>>,
    color: egui::Color32,
    line_width: f32,
}

impl<'a> EguiCanvas<'a> {
    fn new(painter: &'a egui::Painter, rect: egui::Rect) -> Self {
        Self {
            painter,
            rect,
            paths: Vec::new(),
            color: egui::Color32::WHITE,
            line_width: 1.0,
        }
    }

    fn point(&self, x: f64, y: f64) -> egui::Pos2 {
        self.rect.min + egui::vec2(x as f32, y as f32)
    }

    /// Even-odd scanline fill for path outlines that may not be convex.
    fn fill_scanline(&self, points: &[egui::Pos2]) {
        let (top, bottom) = points
            .iter()
            .fold((f32::MAX, f32::MIN), |(lo, hi), p| (lo.min(p.y), hi.max(p.y)));
        let mut y = top.floor();
        let mut crossings = Vec::new();
        while y <= bottom {
            let scan = y + 0.5;
            crossings.clear();
            for (i, a) in points.iter().enumerate() {
                let b = points[(i + 1) % points.len()];
                if (a.y <= scan) != (b.y <= scan) {
                    crossings.push(a.x + (scan - a.y) * (b.x - a.x) / (b.y - a.y));
                }
            }
            crossings.sort_by(|a, b| a.total_cmp(b));
            for span in crossings.chunks_exact(2) {
                let r = egui::Rect::from_min_max(egui::pos2(span[0], y), egui::pos2(span[1], y + 1.0));
                self.painter.rect_filled(r, 0.0, self.color);
            }
            y += 1.0;
        }
    }
}

impl Canvas for EguiCanvas<'_> {
    fn move_to(&mut self, x: f64, y: f64) {
        let p = self.point(x, y);
        self.paths.push(vec![p]);
    }

    fn line_to(&mut self, x: f64, y: f64) {
        let p = self.point(x, y);
        match self.paths.last_mut() {
            Some(path) => path.push(p),
            None => self.paths.push(vec![p]),
        }
    }

    fn stroke(&mut self) {
        let stroke = egui::Stroke::new(self.line_width, self.color);
        for path in self.paths.drain(..) {
            if path.len() > 1 {
                self.painter.add(egui::Shape::line(path, stroke));
            }
        }
    }

    fn stroke_preserve(&mut self) {
        let stroke = egui::Stroke::new(self.line_width, self.color);
        for path in &self.paths {
            if path.len() > 1 {
                self.painter.add(egui::Shape::line(path.clone(), stroke));
            }
        }
    }

    fn fill(&mut self) {
        let paths = std::mem::take(&mut self.paths);
        for path in paths {
            match path.len() {
                0..=2 => {}
                3..=5 => {
                    self.painter
                        .add(egui::Shape::convex_polygon(path, self.color, egui::Stroke::NONE));
                }
                _ => self.fill_scanline(&path),
            }
        }
    }

    fn set_color(&mut self, color: LogicalColor) {
        self.color = palette(color);
    }

    fn set_line_width(&mut self, width: f64) {
        self.line_width = width as f32;
    }

    fn width(&self) -> f64 {
        self.rect.width() as f64
    }

    fn height(&self) -> f64 {
        self.rect.height() as f64
    }

    fn show_text(&mut self, x: f64, y: f64, text: &str) {
        self.painter.text(
            self.point(x, y),
            egui::Align2::LEFT_BOTTOM,
            text,
            egui::FontId::proportional(FONT_SIZE),
            self.color,
        );
    }

    fn text_width(&self, text: &str) -> f64 {
        let galley = self.painter.layout_no_wrap(
            text.to_string(),
            egui::FontId::proportional(FONT_SIZE),
            self.color,
        );
        galley.size().x as f64
    }
}

struct TickgraphApp {
    session: Session,
    engine: Box<dyn AnalysisEngine>,
    replay: bool,
    interval: Duration,
    last_tick: Instant,
    latest: Option<Readout>,
    rate_history: VecDeque<[f64; 2]>,
    log_rx: Receiver<String>,
    log_lines: VecDeque<String>,
    lift_angle: f64,
    finished: bool,
}

impl TickgraphApp {
    fn new(
        _cc: &eframe::CreationContext<'_>,
        session: Session,
        engine: Box<dyn AnalysisEngine>,
        replay: bool,
        refresh_hz: f64,
        log_rx: Receiver<String>,
    ) -> Self {
        let lift_angle = session.lift_angle();
        Self {
            session,
            engine,
            replay,
            interval: Duration::from_secs_f64(1.0 / refresh_hz),
            last_tick: Instant::now(),
            latest: None,
            rate_history: VecDeque::new(),
            log_rx,
            log_lines: VecDeque::new(),
            lift_angle,
            finished: false,
        }
    }

    fn run_ticks(&mut self) {
        if self.last_tick.elapsed() > self.interval * MAX_CATCH_UP {
            log::debug!("Refresh fell behind, skipping missed ticks");
            self.last_tick = Instant::now() - self.interval;
        }
        while !self.finished && self.last_tick.elapsed() >= self.interval {
            self.last_tick += self.interval;
            let before = self.engine.timestamp();
            self.latest = self.session.on_tick(self.engine.as_mut());
            if self.replay && self.engine.timestamp() == before && before > 0 {
                log::info!("Recording finished");
                self.finished = true;
            }

            if let Some(r) = &self.latest
                && !r.stale
            {
                self.rate_history.push_back([r.time_secs, r.rate]);
                while self
                    .rate_history
                    .front()
                    .is_some_and(|p| p[0] < r.time_secs - RATE_HISTORY_SECS)
                {
                    self.rate_history.pop_front();
                }
            }
        }
    }

    fn drain_logs(&mut self) {
        while let Ok(line) = self.log_rx.try_recv() {
            self.log_lines.push_back(line);
            if self.log_lines.len() > 500 {
                self.log_lines.pop_front();
            }
        }
    }

    fn draw_paperstrip(&mut self, ui: &mut egui::Ui, size: egui::Vec2) {
        let (response, painter) = ui.allocate_painter(size, egui::Sense::click());
        if response.hovered() {
            let scroll = ui.input(|i| i.raw_scroll_delta.y);
            if scroll > 0.0 {
                self.session.on_zoom_scroll(ScrollDirection::Up);
            } else if scroll < 0.0 {
                self.session.on_zoom_scroll(ScrollDirection::Down);
            }
        }
        if response.double_clicked() {
            self.session.on_center();
        }

        let mut canvas = EguiCanvas::new(&painter, response.rect);
        let layout = self
            .session
            .render_paperstrip(&mut canvas, self.session.time());
        if layout.stopped {
            painter.text(
                response.rect.center_top() + egui::vec2(0.0, 16.0),
                egui::Align2::CENTER_CENTER,
                "STOPPED",
                egui::FontId::proportional(16.0),
                palette(LogicalColor::Stopped),
            );
        }
    }

    fn draw_view(&self, ui: &mut egui::Ui, size: egui::Vec2, pulse: Option<Pulse>) {
        let (response, painter) = ui.allocate_painter(size, egui::Sense::hover());
        let mut canvas = EguiCanvas::new(&painter, response.rect);
        match pulse {
            Some(pulse) => self.session.render_waveform(&mut canvas, pulse),
            None => self.session.render_period(&mut canvas),
        }
    }

    fn draw_rate_plot(&self, ui: &mut egui::Ui) {
        let points: PlotPoints = self.rate_history.iter().copied().collect();
        Plot::new("rate_plot")
            .height(120.0)
            .y_axis_label("s/d")
            .x_axis_label("s")
            .y_axis_min_width(50.0)
            .allow_drag(false)
            .allow_zoom(false)
            .allow_scroll(false)
            .show(ui, |plot_ui| {
                plot_ui.line(Line::new("Rate", points).color(palette(LogicalColor::Waveform)));
            });
    }

    fn readout_label(ui: &mut egui::Ui, name: &str, value: String, stale: bool) {
        ui.label(egui::RichText::new(name).color(egui::Color32::LIGHT_GRAY));
        let color = if stale {
            palette(LogicalColor::Stopped)
        } else {
            egui::Color32::WHITE
        };
        ui.label(
            egui::RichText::new(value)
                .monospace()
                .size(18.0)
                .color(color)
                .strong(),
        );
        ui.separator();
    }
}

impl eframe::App for TickgraphApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.run_ticks();
        self.drain_logs();
        self.session.take_redraw();
        ctx.request_repaint_after(self.interval);

        if ctx.input(|i| i.key_pressed(egui::Key::Q)) {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }

        egui::TopBottomPanel::top("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                let stale = self.latest.as_ref().is_none_or(|r| r.stale);
                match &self.latest {
                    Some(r) => {
                        Self::readout_label(ui, "Rate", format!("{} s/d", rate_label(r.rate)), stale);
                        Self::readout_label(
                            ui,
                            "Beat error",
                            format!("{} ms", beat_error_label(r.beat_error_ms)),
                            stale,
                        );
                        Self::readout_label(ui, "Amplitude", amplitude_label(r.amplitude), stale);
                    }
                    None => {
                        Self::readout_label(ui, "Rate", "---- s/d".into(), true);
                        Self::readout_label(ui, "Beat error", "---- ms".into(), true);
                        Self::readout_label(ui, "Amplitude", amplitude_label(None), true);
                    }
                }
                Self::readout_label(ui, "bph", self.session.guessed_bph().to_string(), false);
                ui.label(
                    egui::RichText::new(format!("signal {:+}", self.session.signal()))
                        .color(egui::Color32::LIGHT_GRAY),
                );
                if self.finished {
                    ui.separator();
                    ui.label(
                        egui::RichText::new("END")
                            .color(egui::Color32::from_rgb(255, 80, 80))
                            .strong(),
                    );
                }
            });

            ui.horizontal(|ui| {
                let mut bph = self.session.bph();
                egui::ComboBox::from_label("bph")
                    .selected_text(bph.to_string())
                    .show_ui(ui, |ui| {
                        ui.selectable_value(&mut bph, BphSetting::Automatic, "Automatic");
                        for &preset in PRESET_BPH.iter() {
                            ui.selectable_value(&mut bph, BphSetting::Fixed(preset), preset.to_string());
                        }
                    });
                if bph != self.session.bph() {
                    self.session.on_user_bph_override(bph);
                }

                ui.separator();
                ui.label("Lift angle");
                let response = ui.add(
                    egui::DragValue::new(&mut self.lift_angle)
                        .range(MIN_LA..=MAX_LA)
                        .suffix("°"),
                );
                if response.changed() {
                    self.session.on_lift_angle_change(self.lift_angle);
                }

                ui.separator();
                if ui.button("Center").clicked() {
                    self.session.on_center();
                }
                if ui.button("Clear").clicked() {
                    self.session.on_clear();
                }
                ui.label(
                    egui::RichText::new(format!("zoom {}x", self.session.chart().trace_zoom))
                        .color(egui::Color32::LIGHT_GRAY),
                );
            });
        });

        egui::TopBottomPanel::bottom("debug_log")
            .resizable(true)
            .default_height(100.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical()
                    .stick_to_bottom(true)
                    .show(ui, |ui| {
                        for line in &self.log_lines {
                            ui.label(
                                egui::RichText::new(line)
                                    .font(egui::FontId::monospace(11.0))
                                    .color(egui::Color32::from_rgb(180, 180, 180)),
                            );
                        }
                    });
            });

        egui::SidePanel::left("paperstrip_panel")
            .default_width(360.0)
            .resizable(true)
            .show(ctx, |ui| {
                let size = ui.available_size();
                self.draw_paperstrip(ui, size);
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            let width = ui.available_width();
            let view_height = ((ui.available_height() - 140.0) / 3.0).max(60.0);
            let size = egui::vec2(width, view_height);
            ui.horizontal(|ui| {
                let half = egui::vec2(width / 2.0 - 4.0, view_height);
                self.draw_view(ui, half, Some(Pulse::Tic));
                self.draw_view(ui, half, Some(Pulse::Toc));
            });
            ui.add_space(4.0);
            self.draw_view(ui, size, None);
            ui.add_space(4.0);
            self.draw_rate_plot(ui);
        });
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = match args.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    let (log_tx, log_rx) = crossbeam_channel::unbounded::<String>();
    let logger = GuiLogger {
        tx: log_tx,
        max_level: log_level,
    };
    log::set_boxed_logger(Box::new(logger)).ok();
    log::set_max_level(log_level);

    let mut config = match &args.config {
        Some(path) => TimegrapherConfig::load(path)?,
        None => TimegrapherConfig::default(),
    };
    if let Some(bph) = args.bph {
        config.watch.bph = bph;
    }
    if let Some(la) = args.lift_angle {
        config.watch.lift_angle = la;
    }

    let session = Session::new(&config);
    let (engine, replay): (Box<dyn AnalysisEngine>, bool) = match &args.input {
        Some(path) => (
            Box::new(ReplayEngine::open(path, session.windows().len())?),
            true,
        ),
        None => {
            let watch = WatchModel::default()
                .with_bph(args.sim_bph)
                .with_rate(args.sim_rate)
                .with_beat_error(args.sim_beat_error)
                .with_amplitude(args.sim_amplitude)
                .with_jitter(args.sim_jitter);
            let engine =
                SimulatedEngine::new(watch, config.audio.sample_rate, config.display.refresh_hz)?;
            (Box::new(engine), false)
        }
    };
    let refresh_hz = config.display.refresh_hz;

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1100.0, 750.0])
            .with_min_inner_size([800.0, 500.0])
            .with_title("Tickgraph"),
        ..Default::default()
    };

    eframe::run_native(
        "Tickgraph",
        native_options,
        Box::new(move |cc| {
            Ok(Box::new(TickgraphApp::new(
                cc, session, engine, replay, refresh_hz, log_rx,
            )))
        }),
    )
    .map_err(|e| anyhow::anyhow!("eframe error: {}", e))?;

    Ok(())
}
