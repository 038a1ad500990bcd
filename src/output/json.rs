use serde::Serialize;

use super::{Formatter, iso8601_timestamp};
use crate::processing::Readout;

pub struct JsonFormatter;

#[derive(Serialize)]
struct JsonLine<'a> {
    ts: String,
    #[serde(flatten)]
    readout: &'a Readout,
}

impl Formatter for JsonFormatter {
    fn format(&self, readout: &Readout) -> String {
        let line = JsonLine {
            ts: iso8601_timestamp(),
            readout,
        };
        serde_json::to_string(&line).unwrap_or_else(|e| {
            log::warn!("Failed to serialize readout: {}", e);
            String::new()
        })
    }
}
