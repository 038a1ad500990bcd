use super::{Formatter, iso8601_timestamp};
use crate::processing::Readout;

pub struct CsvFormatter;

impl Formatter for CsvFormatter {
    fn format(&self, readout: &Readout) -> String {
        let amplitude = readout
            .amplitude
            .map_or(String::new(), |a| format!("{:.1}", a));
        format!(
            "{},{:.3},{},{:.2},{:.2},{},{},{}",
            iso8601_timestamp(),
            readout.time_secs,
            readout.bph,
            readout.rate,
            readout.beat_error_ms,
            amplitude,
            readout.signal,
            readout.stale
        )
    }

    fn header(&self) -> Option<&'static str> {
        Some("ts,time_secs,bph,rate,beat_error_ms,amplitude,signal,stale")
    }
}
