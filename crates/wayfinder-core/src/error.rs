use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Reading errors
    #[error("Invalid reading: {0}")]
    InvalidReading(String),

    // Route errors
    #[error("Room not found: {0}")]
    RoomNotFound(u32),

    #[error("Invalid map: {0}")]
    InvalidMap(String),

    #[error("No route from node {from} to node {to}")]
    NoRoute { from: u32, to: u32 },

    // Navigation errors
    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
