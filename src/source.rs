//! Recorded analysis output.
//!
//! A recording is a JSON-lines file with one [`RecordedFrame`] per refresh
//! tick. Blank lines and lines starting with `#` are ignored.

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::analysis::{AnalysisEngine, AnalysisSnapshot};
use crate::error::{Result, TickgraphError};

/// Engine state captured after one `analyze` call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedFrame {
    pub signal: i32,
    pub timestamp: u64,
    pub windows: Vec<AnalysisSnapshot>,
}

impl RecordedFrame {
    /// Append this frame as one line.
    pub fn write_line<W: Write>(&self, writer: &mut W) -> Result<()> {
        serde_json::to_writer(&mut *writer, self)
            .map_err(|e| TickgraphError::Io(std::io::Error::other(e)))?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

/// Replays a recording as if it came from a live engine.
pub struct ReplayEngine {
    frames: Vec<RecordedFrame>,
    next: usize,
    timestamp: u64,
}

impl ReplayEngine {
    pub fn new(frames: Vec<RecordedFrame>) -> Self {
        Self {
            frames,
            next: 0,
            timestamp: 0,
        }
    }

    /// Parse a recording whose frames must each hold `window_count` windows.
    pub fn from_reader<R: BufRead>(reader: R, window_count: usize) -> Result<Self> {
        let mut frames = Vec::new();

        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let frame: RecordedFrame =
                serde_json::from_str(trimmed).map_err(|e| TickgraphError::Recording {
                    line: index + 1,
                    message: e.to_string(),
                })?;
            if frame.windows.len() != window_count {
                return Err(TickgraphError::WindowCount {
                    expected: window_count,
                    actual: frame.windows.len(),
                });
            }
            frames.push(frame);
        }

        log::info!("Loaded {} recorded frames", frames.len());
        Ok(Self::new(frames))
    }

    pub fn open<P: AsRef<Path>>(path: P, window_count: usize) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file), window_count)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Whether every frame has been replayed.
    pub fn is_finished(&self) -> bool {
        self.next >= self.frames.len()
    }
}

impl AnalysisEngine for ReplayEngine {
    fn analyze(&mut self, windows: &mut [AnalysisSnapshot], bph_hint: u32, events_from: u64) -> i32 {
        let Some(frame) = self.frames.get(self.next) else {
            return 0;
        };
        self.next += 1;
        if bph_hint != 0 {
            log::trace!("Replay ignores bph hint {}", bph_hint);
        }

        for (window, recorded) in windows.iter_mut().zip(&frame.windows) {
            window.clone_from(recorded);
            window.events.retain(|&e| e == 0 || e >= events_from);
        }
        self.timestamp = frame.timestamp;
        frame.signal
    }

    fn timestamp(&self) -> u64 {
        self.timestamp
    }
}
