use std::path::PathBuf;

use thiserror::Error;

use crate::usecases::error::{AccountError, ChatError};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to read config file at {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file at {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to initialize logging: {0}")]
    LoggingInit(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
    #[error("failed to open log file at {path}: {source}")]
    LogFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to start async runtime: {0}")]
    RuntimeInit(#[source] std::io::Error),
    #[error("account workflow failed: {0}")]
    Account(#[from] AccountError),
    #[error("chat workflow failed: {0}")]
    Chat(#[from] ChatError),
    #[error("console I/O failed: {0}")]
    Console(#[from] std::io::Error),
}
