mod csv;
mod json;
mod text;

use chrono::Utc;

pub use self::csv::CsvFormatter;
pub use self::json::JsonFormatter;
pub use self::text::TextFormatter;

use crate::processing::Readout;

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Csv,
}

pub trait Formatter: Send {
    fn format(&self, readout: &Readout) -> String;

    fn header(&self) -> Option<&'static str> {
        None
    }
}

pub fn create_formatter(format: OutputFormat, verbose: bool) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter::new(verbose)),
        OutputFormat::Json => Box::new(JsonFormatter),
        OutputFormat::Csv => Box::new(CsvFormatter),
    }
}

/// Rate rounded to whole seconds per day with an explicit sign.
pub fn rate_label(rate: f64) -> String {
    format!("{:+4}", rate.round() as i64)
}

pub fn beat_error_label(beat_error_ms: f64) -> String {
    format!("{:4.1}", beat_error_ms)
}

/// Amplitude in whole degrees, or dashes when it could not be measured.
pub fn amplitude_label(amplitude: Option<f64>) -> String {
    match amplitude {
        Some(amp) => format!("{:3.0}°", amp),
        None => "---°".to_string(),
    }
}

pub fn iso8601_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(super) fn readout() -> Readout {
        Readout {
            time_secs: 12.5,
            bph: 28800,
            rate: -3.6,
            beat_error_ms: 0.44,
            amplitude: Some(271.4),
            signal: 4,
            stale: false,
        }
    }

    #[test]
    fn test_labels() {
        assert_eq!(rate_label(-3.6), "  -4");
        assert_eq!(rate_label(12.2), " +12");
        assert_eq!(rate_label(0.2), "  +0");
        assert_eq!(beat_error_label(0.44), " 0.4");
        assert_eq!(amplitude_label(Some(271.4)), "271°");
        assert_eq!(amplitude_label(None), "---°");
    }

    #[test]
    fn test_csv_header_matches_fields() {
        let formatter = create_formatter(OutputFormat::Csv, false);
        let header = formatter.header().unwrap();
        let line = formatter.format(&readout());
        assert_eq!(header.split(',').count(), line.split(',').count());
    }

    #[test]
    fn test_json_is_valid() {
        let line = create_formatter(OutputFormat::Json, false).format(&readout());
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["bph"], 28800);
        assert_eq!(value["stale"], false);
        assert!(value["ts"].is_string());

        let mut no_amp = readout();
        no_amp.amplitude = None;
        let line = create_formatter(OutputFormat::Json, false).format(&no_amp);
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert!(value["amplitude"].is_null());
    }

    #[test]
    fn test_text_marks_stale() {
        let formatter = create_formatter(OutputFormat::Text, false);
        assert!(!formatter.format(&readout()).contains("stale"));
        let mut stale = readout();
        stale.stale = true;
        assert!(formatter.format(&stale).contains("stale"));
    }
}
