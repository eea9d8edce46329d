//! Error types for the SQLite bindings.

use std::ffi::NulError;
use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use super::ffi;

/// Result code returned by SQLite.
///
/// Connections enable extended result codes, so this may carry an extended
/// code (e.g. `SQLITE_CONSTRAINT_UNIQUE`); [`ErrorCode::primary`] recovers the
/// primary class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorCode(pub i32);

impl ErrorCode {
    /// The primary result code (low eight bits of an extended code).
    #[must_use]
    pub const fn primary(self) -> i32 {
        self.0 & 0xff
    }

    /// The engine's English description of this code.
    #[must_use]
    pub fn description(self) -> &'static str {
        ffi::errstr(self.0)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error returned by database operations.
#[derive(Debug, Error)]
pub enum DbError {
    /// An engine call returned a non-success status code.
    #[error("sqlite error {code}: {}", .code.description())]
    Status {
        /// `SQLite` result code.
        code: ErrorCode,
    },

    /// Direct SQL execution failed.
    #[error("sqlite execute error {code}: {}", describe(.message, .code))]
    Execute {
        /// `SQLite` result code.
        code: ErrorCode,
        /// Diagnostic message produced by the engine, when it gave one.
        message: Option<String>,
    },

    /// A string argument contained an interior NUL byte.
    #[error("string cannot be passed to sqlite: {0}")]
    Nul(#[from] NulError),

    /// A file name that the engine cannot represent (not valid UTF-8 on a
    /// platform where it expects UTF-8).
    #[error("path is not valid UTF-8: {}", .0.display())]
    InvalidPath(PathBuf),
}

impl DbError {
    /// Creates a status-code error.
    pub(crate) const fn status(code: i32) -> Self {
        Self::Status {
            code: ErrorCode(code),
        }
    }

    /// The engine result code carried by this error, if any.
    #[must_use]
    pub const fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Status { code } | Self::Execute { code, .. } => Some(*code),
            Self::Nul(_) | Self::InvalidPath(_) => None,
        }
    }

    /// The engine's diagnostic message, if one was captured.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Execute { message, .. } => message.as_deref(),
            Self::Status { .. } | Self::Nul(_) | Self::InvalidPath(_) => None,
        }
    }
}

#[allow(clippy::ref_option)]
fn describe<'a>(message: &'a Option<String>, code: &ErrorCode) -> &'a str {
    message.as_deref().unwrap_or_else(|| code.description())
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

/// Converts an engine status into a [`DbResult`].
pub(crate) const fn check(rc: i32) -> DbResult<()> {
    if rc == ffi::SQLITE_OK {
        Ok(())
    } else {
        Err(DbError::status(rc))
    }
}
