//! Application layer errors

use thiserror::Error;

/// General bot errors
#[derive(Error, Debug)]
pub enum BotError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Plugin error: {0}")]
    Plugin(#[from] PluginError),

    #[error("Schedule error: {0}")]
    Schedule(#[from] ScheduleError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Plugin lifecycle and execution errors
#[derive(Error, Debug)]
pub enum PluginError {
    #[error("Load failed: {0}")]
    LoadFailed(String),

    #[error("Initialization failed: {0}")]
    ConfigFailed(String),

    #[error("Runtime failure: {0}")]
    Runtime(String),
}

/// Schedule storage and validation errors
#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("Storage error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("Value out of range: {0}")]
    OutOfRange(&'static str),

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("No such entry")]
    NoSuchEntry,

    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON file storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),
}
