//! Open flags and connection options.

use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

use super::connection::Connection;
use super::error::DbResult;
use super::ffi;

/// Flags passed to `sqlite3_open_v2`.
///
/// Combine with `|`. The default is `READ_WRITE | URI`, which opens an
/// existing database for writing and does not create a missing file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OpenFlags(i32);

impl OpenFlags {
    /// Open read-only.
    pub const READ_ONLY: Self = Self(ffi::SQLITE_OPEN_READONLY);
    /// Open for reading and writing.
    pub const READ_WRITE: Self = Self(ffi::SQLITE_OPEN_READWRITE);
    /// Create the database if it does not exist.
    pub const CREATE: Self = Self(ffi::SQLITE_OPEN_CREATE);
    /// Interpret the file name as a URI.
    pub const URI: Self = Self(ffi::SQLITE_OPEN_URI);
    /// Open an in-memory database.
    pub const MEMORY: Self = Self(ffi::SQLITE_OPEN_MEMORY);
    /// Multi-thread mode: no per-connection mutex.
    pub const NO_MUTEX: Self = Self(ffi::SQLITE_OPEN_NOMUTEX);
    /// Serialized mode: every call takes the connection mutex.
    pub const FULL_MUTEX: Self = Self(ffi::SQLITE_OPEN_FULLMUTEX);
    /// Enable shared cache.
    pub const SHARED_CACHE: Self = Self(ffi::SQLITE_OPEN_SHAREDCACHE);
    /// Disable shared cache.
    pub const PRIVATE_CACHE: Self = Self(ffi::SQLITE_OPEN_PRIVATECACHE);

    /// No flags set.
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    /// The raw flag bits.
    #[must_use]
    pub const fn bits(self) -> i32 {
        self.0
    }

    /// Returns `true` if every bit in `other` is set in `self`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl Default for OpenFlags {
    fn default() -> Self {
        Self::READ_WRITE | Self::URI
    }
}

impl BitOr for OpenFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for OpenFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// One open flag, as spelled in configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpenMode {
    /// [`OpenFlags::READ_ONLY`]
    ReadOnly,
    /// [`OpenFlags::READ_WRITE`]
    ReadWrite,
    /// [`OpenFlags::CREATE`]
    Create,
    /// [`OpenFlags::URI`]
    Uri,
    /// [`OpenFlags::MEMORY`]
    Memory,
    /// [`OpenFlags::NO_MUTEX`]
    NoMutex,
    /// [`OpenFlags::FULL_MUTEX`]
    FullMutex,
    /// [`OpenFlags::SHARED_CACHE`]
    SharedCache,
    /// [`OpenFlags::PRIVATE_CACHE`]
    PrivateCache,
}

impl OpenMode {
    /// The flag this mode stands for.
    #[must_use]
    pub const fn flag(self) -> OpenFlags {
        match self {
            Self::ReadOnly => OpenFlags::READ_ONLY,
            Self::ReadWrite => OpenFlags::READ_WRITE,
            Self::Create => OpenFlags::CREATE,
            Self::Uri => OpenFlags::URI,
            Self::Memory => OpenFlags::MEMORY,
            Self::NoMutex => OpenFlags::NO_MUTEX,
            Self::FullMutex => OpenFlags::FULL_MUTEX,
            Self::SharedCache => OpenFlags::SHARED_CACHE,
            Self::PrivateCache => OpenFlags::PRIVATE_CACHE,
        }
    }
}

/// `PRAGMA journal_mode` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JournalMode {
    /// Delete the rollback journal at the end of each transaction.
    Delete,
    /// Truncate the rollback journal instead of deleting it.
    Truncate,
    /// Overwrite the journal header instead of deleting it.
    Persist,
    /// Keep the rollback journal in memory.
    Memory,
    /// Write-ahead log.
    Wal,
    /// No rollback journal.
    Off,
}

impl JournalMode {
    /// The pragma argument for this mode.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Delete => "DELETE",
            Self::Truncate => "TRUNCATE",
            Self::Persist => "PERSIST",
            Self::Memory => "MEMORY",
            Self::Wal => "WAL",
            Self::Off => "OFF",
        }
    }
}

/// Declarative connection setup, e.g. loaded from a JSON or TOML file.
///
/// ```json
/// { "modes": ["read_write", "create"], "busy_timeout_ms": 500, "journal_mode": "wal" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConnectionOptions {
    /// Open flags, one entry per flag.
    pub modes: Vec<OpenMode>,
    /// Busy handler timeout in milliseconds.
    pub busy_timeout_ms: Option<u32>,
    /// `PRAGMA foreign_keys`.
    pub foreign_keys: Option<bool>,
    /// `PRAGMA journal_mode`.
    pub journal_mode: Option<JournalMode>,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            modes: vec![OpenMode::ReadWrite, OpenMode::Uri],
            busy_timeout_ms: None,
            foreign_keys: None,
            journal_mode: None,
        }
    }
}

impl ConnectionOptions {
    /// Folds [`modes`](Self::modes) into [`OpenFlags`].
    #[must_use]
    pub fn flags(&self) -> OpenFlags {
        self.modes
            .iter()
            .fold(OpenFlags::empty(), |flags, mode| flags | mode.flag())
    }

    /// Applies the post-open settings to `conn`: busy timeout, foreign keys,
    /// then journal mode.
    pub(crate) fn apply(&self, conn: &Connection) -> DbResult<()> {
        if let Some(ms) = self.busy_timeout_ms {
            conn.busy_timeout(std::time::Duration::from_millis(u64::from(ms)))?;
        }
        if let Some(on) = self.foreign_keys {
            conn.execute(if on {
                "PRAGMA foreign_keys = ON;"
            } else {
                "PRAGMA foreign_keys = OFF;"
            })?;
        }
        if let Some(mode) = self.journal_mode {
            conn.execute(&format!("PRAGMA journal_mode = {};", mode.as_str()))?;
        }
        Ok(())
    }
}
