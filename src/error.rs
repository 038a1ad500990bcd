use thiserror::Error;

#[derive(Error, Debug)]
pub enum TickgraphError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Recording line {line}: {message}")]
    Recording { line: usize, message: String },

    #[error("Window count mismatch: expected {expected}, got {actual}")]
    WindowCount { expected: usize, actual: usize },

    #[error("Simulation error: {0}")]
    Simulation(String),
}

pub type Result<T> = std::result::Result<T, TickgraphError>;
