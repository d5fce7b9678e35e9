use anyhow::Error as ANYHOW_ERROR;
use bigdecimal::ParseBigDecimalError as BIG_DECIMAL_ERROR;
use serde_json::Error as JSON_ERROR;
use sqlx::error::Error as SQL_ERROR;
use std::{env::VarError, io::Error as IO_ERROR, num::ParseIntError};
use thiserror::Error;
use tracing::subscriber::SetGlobalDefaultError as TRACING_GLOBAL_DEFAULT_ERROR;
use url::ParseError as URL_ERROR;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Io(#[from] IO_ERROR),

    #[error("{0}")]
    URL(#[from] URL_ERROR),

    #[error("{0}")]
    INT(#[from] ParseIntError),

    #[error("{0}")]
    SQL(#[from] SQL_ERROR),

    #[error("{0}")]
    VAR(#[from] VarError),

    #[error("{0}")]
    BigDecimalError(#[from] BIG_DECIMAL_ERROR),

    #[error("Field not exists: {0}")]
    FieldNotExist(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("{0}")]
    JsonError(#[from] JSON_ERROR),

    #[error("Parse message error: {0}")]
    ParseMessage(String),

    #[error("Chain read error: {0}")]
    Read(#[from] ReadFailure),

    #[error("Migration error: {0}")]
    MigrationError(String),

    #[error("Tracing error: {0}")]
    SetGlobalDefaultError(#[from] TRACING_GLOBAL_DEFAULT_ERROR),

    #[error("{0}")]
    AnyHowError(#[from] ANYHOW_ERROR),
}

impl Error {
    /// Errors raised while turning a raw feed record into a typed event.
    /// The event is dropped and processing continues.
    pub fn is_malformed_event(&self) -> bool {
        matches!(
            self,
            Error::FieldNotExist(_)
                | Error::ParseMessage(_)
                | Error::BigDecimalError(_)
                | Error::INT(_)
        )
    }
}

/// Failure of a view-function read. Never fatal for the engine: callers keep
/// the last known value and move on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReadFailure {
    #[error("call reverted: {0}")]
    Reverted(String),

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("cannot decode return data: {0}")]
    Decode(String),
}
