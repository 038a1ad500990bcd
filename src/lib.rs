pub mod analysis;
pub mod config;
pub mod constants;
pub mod driver;
pub mod error;
pub mod events;
pub mod measure;
pub mod output;
pub mod processing;
pub mod render;
pub mod source;

#[cfg(feature = "simulation")]
pub mod simulation;

pub use analysis::{AnalysisEngine, AnalysisSnapshot, Pulse, Selection};
pub use config::{BphSetting, TimegrapherConfig};
pub use driver::{RefreshDriver, StopHandle};
pub use error::{Result, TickgraphError};
pub use events::EventRing;
pub use processing::{Readout, Session};
pub use source::ReplayEngine;
