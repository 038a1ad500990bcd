pub mod engine;
pub mod selector;
pub mod snapshot;

pub use engine::AnalysisEngine;
pub use selector::{Selection, SnapshotSelector, most_precise};
pub use snapshot::{AnalysisSnapshot, Pulse, analysis_windows};
