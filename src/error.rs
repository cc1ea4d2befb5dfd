use crate::serial_data_provider::PortCandidate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// No port matched any device signature.
    #[error("no serial device matching {signatures:?} found")]
    DeviceNotFound {
        signatures: Vec<String>,
        available: Vec<PortCandidate>,
    },

    #[error("serial port error: {0}")]
    Serial(#[from] tokio_serial::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config file: {0}")]
    Config(#[from] serde_json::Error),

    #[error("invalid setting: {0}")]
    InvalidSetting(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
