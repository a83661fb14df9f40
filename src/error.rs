//! Crate-level error type.

use crate::connection::ConnectionError;
use crate::executor::DriverError;
use crate::query::render::RenderError;
use crate::value::ConversionError;
use std::fmt;

/// Any error raised while building, rendering or running a statement
#[derive(Debug)]
pub enum BuoyError {
    /// Stored and semantic values could not be converted
    Conversion(ConversionError),
    /// The statement could not be rendered
    Render(RenderError),
    /// The driver failed; passed through unmodified
    Driver(DriverError),
    /// The connection could not be opened
    Connection(ConnectionError),
    /// Configuration could not be loaded
    Config(config::ConfigError),
    /// A refreshed record's row no longer exists
    RecordNotFound { table: String },
    /// A single-row fetch matched several rows
    TooManyRows { table: String, count: usize },
    /// The table has no primary key to identify a record by
    MissingPrimaryKey { table: String },
}

impl fmt::Display for BuoyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuoyError::Conversion(e) => write!(f, "Conversion error: {}", e),
            BuoyError::Render(e) => write!(f, "Render error: {}", e),
            BuoyError::Driver(e) => write!(f, "Driver error: {}", e),
            BuoyError::Connection(e) => write!(f, "Connection error: {}", e),
            BuoyError::Config(e) => write!(f, "Configuration error: {}", e),
            BuoyError::RecordNotFound { table } => {
                write!(f, "Record not found in table {}", table)
            }
            BuoyError::TooManyRows { table, count } => {
                write!(f, "Expected at most one row from {}, got {}", table, count)
            }
            BuoyError::MissingPrimaryKey { table } => {
                write!(f, "Table {} has no primary key", table)
            }
        }
    }
}

impl std::error::Error for BuoyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BuoyError::Conversion(e) => Some(e),
            BuoyError::Render(e) => Some(e),
            BuoyError::Driver(e) => Some(e),
            BuoyError::Connection(e) => Some(e),
            BuoyError::Config(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConversionError> for BuoyError {
    fn from(err: ConversionError) -> Self {
        BuoyError::Conversion(err)
    }
}

impl From<RenderError> for BuoyError {
    fn from(err: RenderError) -> Self {
        BuoyError::Render(err)
    }
}

impl From<DriverError> for BuoyError {
    fn from(err: DriverError) -> Self {
        BuoyError::Driver(err)
    }
}

impl From<ConnectionError> for BuoyError {
    fn from(err: ConnectionError) -> Self {
        BuoyError::Connection(err)
    }
}

impl From<config::ConfigError> for BuoyError {
    fn from(err: config::ConfigError) -> Self {
        BuoyError::Config(err)
    }
}
