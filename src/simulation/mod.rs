mod engine;
mod jitter;
mod watch;

pub use engine::SimulatedEngine;
pub use jitter::{TimingJitter, create_rng};
pub use watch::WatchModel;
