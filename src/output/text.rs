use super::{Formatter, amplitude_label, beat_error_label, rate_label};
use crate::processing::Readout;

pub struct TextFormatter {
    verbose: bool,
}

impl TextFormatter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl Formatter for TextFormatter {
    fn format(&self, readout: &Readout) -> String {
        let marker = if readout.stale { " (stale)" } else { "" };
        if self.verbose {
            format!(
                "[{:>8.1}s] {} s/d  {} ms  {}  {} bph  signal {:+}{}",
                readout.time_secs,
                rate_label(readout.rate),
                beat_error_label(readout.beat_error_ms),
                amplitude_label(readout.amplitude),
                readout.bph,
                readout.signal,
                marker
            )
        } else {
            format!(
                "{} s/d  {} ms  {}  {} bph{}",
                rate_label(readout.rate),
                beat_error_label(readout.beat_error_ms),
                amplitude_label(readout.amplitude),
                readout.bph,
                marker
            )
        }
    }
}
