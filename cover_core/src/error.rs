use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoverError {
    #[error("device fault: {0}")]
    DeviceFault(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("invalid state: {0}")]
    State(String),
    #[error("invalid command: {0}")]
    InvalidCommand(String),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing activation device")]
    MissingActivator,
    #[error("missing open endstop")]
    MissingOpenEndstop,
    #[error("missing close endstop")]
    MissingCloseEndstop,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
