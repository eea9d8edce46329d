//! Safe wrapper around a SQLite database connection.
//!
//! This file contains **no `unsafe` code**. All FFI interaction is delegated to
//! [`ffi::RawDb`] which encapsulates the raw pointers and C type conversions.

use std::ffi::{c_int, CString};
use std::path::Path;
use std::time::Duration;

use tracing::{debug, trace};

use super::config::{ConnectionOptions, OpenFlags};
use super::error::{check, DbError, DbResult, ErrorCode};
use super::ffi::{self, RawDb};
use super::params::Params;
use super::row::{Row, Rows};
use super::statement::Statement;
use super::transaction::{Transaction, TransactionBehavior};

/// A SQLite database connection.
///
/// Closed when dropped. `Send` but not `Sync`: a connection may move between
/// threads, but the wrapper adds no locking of its own. Whether the engine
/// tolerates concurrent use is governed by the threading flags passed to
/// [`open`](Self::open).
pub struct Connection {
    db: RawDb,
}

impl Connection {
    /// Opens the database at `path` with `flags`.
    ///
    /// Extended result codes are enabled on every successful open.
    ///
    /// # Errors
    ///
    /// Fails if `path` contains a NUL byte, cannot be expressed as a file
    /// name for the engine, or the engine cannot open the database (e.g.
    /// `SQLITE_CANTOPEN` for a missing file without [`OpenFlags::CREATE`]).
    pub fn open<P: AsRef<Path>>(path: P, flags: OpenFlags) -> DbResult<Self> {
        let path = path.as_ref();
        let c_path = path_to_cstring(path)?;
        let db = RawDb::open(&c_path, flags.bits()).map_err(DbError::status)?;
        check(db.extended_result_codes(true))?;
        debug!(path = %path.display(), flags = flags.bits(), "opened sqlite database");
        Ok(Self { db })
    }

    /// Opens a private in-memory database.
    ///
    /// # Errors
    ///
    /// Fails only if the engine cannot allocate the database.
    pub fn open_in_memory() -> DbResult<Self> {
        Self::open(
            ":memory:",
            OpenFlags::READ_WRITE | OpenFlags::CREATE | OpenFlags::MEMORY,
        )
    }

    /// Opens the database at `path` and applies `options`.
    ///
    /// # Errors
    ///
    /// Fails if opening fails or any of the options is rejected.
    pub fn open_with<P: AsRef<Path>>(path: P, options: &ConnectionOptions) -> DbResult<Self> {
        let conn = Self::open(path, options.flags())?;
        options.apply(&conn)?;
        Ok(conn)
    }

    /// Closes the connection, reporting the engine's status.
    ///
    /// Dropping the connection closes it too, silently.
    ///
    /// # Errors
    ///
    /// Returns the engine's status if the handle could not be closed
    /// cleanly (e.g. `SQLITE_BUSY` with unfinalized statements). The handle is
    /// released either way.
    pub fn close(self) -> DbResult<()> {
        debug!("closing sqlite database");
        check(self.db.close())
    }

    // ── execute ─────────────────────────────────────────────────────────

    /// Runs one or more SQL statements separated by semicolons.
    ///
    /// No parameters are bound and no rows are returned. Suitable for DDL,
    /// PRAGMAs and scripts. A non-success status, or any diagnostic message
    /// from the engine, is returned as [`DbError::Execute`].
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Execute`] on any engine failure and
    /// [`DbError::Nul`] if `sql` contains a NUL byte.
    pub fn execute(&self, sql: &str) -> DbResult<()> {
        let c_sql = CString::new(sql)?;
        trace!(sql, "executing sql");
        match self.db.exec(&c_sql) {
            (ffi::SQLITE_OK, None) => Ok(()),
            (rc, message) => Err(DbError::Execute {
                code: ErrorCode(rc),
                message,
            }),
        }
    }

    // ── prepare ─────────────────────────────────────────────────────────

    /// Compiles a single SQL statement.
    ///
    /// SQL that contains no statement (only whitespace or comments) is
    /// rejected with `SQLITE_MISUSE`.
    ///
    /// # Errors
    ///
    /// Fails if the SQL does not compile or contains no statement.
    pub fn prepare(&self, sql: &str) -> DbResult<Statement<'_>> {
        trace!(sql, "preparing statement");
        match self.db.prepare(sql).map_err(DbError::status)? {
            Some(raw) => Ok(Statement::new(raw)),
            None => Err(DbError::status(ffi::SQLITE_MISUSE)),
        }
    }

    // ── fetch ───────────────────────────────────────────────────────────

    /// Prepares `sql`, binds `params` (pass `()` for none) and returns its
    /// rows. The returned cursor owns the statement.
    ///
    /// # Errors
    ///
    /// Fails if the statement cannot be prepared or a parameter cannot be
    /// bound.
    pub fn fetch<P: Params>(&self, sql: &str, params: P) -> DbResult<Rows<'_>> {
        let mut stmt = self.prepare(sql)?;
        stmt.bind(params)?;
        Ok(stmt.into_rows())
    }

    // ── query_row ───────────────────────────────────────────────────────

    /// Prepares and runs a statement, mapping exactly one result row.
    ///
    /// Returns an error with code `SQLITE_DONE` if no row is returned.
    ///
    /// # Errors
    ///
    /// Fails if preparing, binding, stepping or `mapper` fails.
    pub fn query_row<P, T, F>(&self, sql: &str, params: P, mapper: F) -> DbResult<T>
    where
        P: Params,
        F: FnOnce(&Row<'_>) -> DbResult<T>,
    {
        self.query_row_optional(sql, params, mapper)?
            .ok_or_else(|| DbError::status(ffi::SQLITE_DONE))
    }

    /// Like [`query_row`](Self::query_row) but returns `Ok(None)` when no row
    /// is returned.
    ///
    /// # Errors
    ///
    /// Fails if preparing, binding, stepping or `mapper` fails.
    pub fn query_row_optional<P, T, F>(
        &self,
        sql: &str,
        params: P,
        mapper: F,
    ) -> DbResult<Option<T>>
    where
        P: Params,
        F: FnOnce(&Row<'_>) -> DbResult<T>,
    {
        let mut rows = self.fetch(sql, params)?;
        let Some(row) = rows.next()? else {
            return Ok(None);
        };
        mapper(&row).map(Some)
    }

    // ── Transactions ────────────────────────────────────────────────────

    /// Begins a deferred transaction.
    ///
    /// # Errors
    ///
    /// Fails if `BEGIN` fails, e.g. inside an already open transaction.
    pub fn transaction(&self) -> DbResult<Transaction<'_>> {
        Transaction::begin(self, TransactionBehavior::Deferred)
    }

    /// Begins a transaction with the given locking behaviour.
    ///
    /// # Errors
    ///
    /// Fails if `BEGIN` fails, e.g. when the lock cannot be taken.
    pub fn transaction_with(&self, behavior: TransactionBehavior) -> DbResult<Transaction<'_>> {
        Transaction::begin(self, behavior)
    }

    // ── Engine pass-throughs ────────────────────────────────────────────

    /// Returns the rowid of the most recent successful INSERT.
    #[must_use]
    pub fn last_insert_rowid(&self) -> i64 {
        self.db.last_insert_rowid()
    }

    /// Returns the number of rows changed by the most recent statement.
    #[must_use]
    pub fn changes(&self) -> usize {
        usize::try_from(self.db.changes()).unwrap_or(0)
    }

    /// Sets the busy handler timeout; `Duration::ZERO` turns it off.
    ///
    /// # Errors
    ///
    /// Returns the engine's status if the handler cannot be installed.
    pub fn busy_timeout(&self, timeout: Duration) -> DbResult<()> {
        let ms = c_int::try_from(timeout.as_millis()).unwrap_or(c_int::MAX);
        check(self.db.busy_timeout(ms))
    }

    /// Whether the attached database `name` (e.g. `"main"`) is read-only.
    ///
    /// `None` if no database by that name is attached.
    #[must_use]
    pub fn is_database_readonly(&self, name: &str) -> Option<bool> {
        let name = CString::new(name).ok()?;
        match self.db.db_readonly(&name) {
            -1 => None,
            rc => Some(rc != 0),
        }
    }

    /// Frees as much heap memory as possible from this connection's caches.
    ///
    /// # Errors
    ///
    /// Returns the engine's status on failure.
    pub fn release_memory(&self) -> DbResult<()> {
        check(self.db.release_memory())
    }
}

/// File names go to the engine byte for byte on unix, where a path is an
/// arbitrary byte string.
#[cfg(unix)]
fn path_to_cstring(path: &Path) -> DbResult<CString> {
    use std::os::unix::ffi::OsStrExt;

    Ok(CString::new(path.as_os_str().as_bytes())?)
}

/// Elsewhere the engine expects UTF-8 file names.
#[cfg(not(unix))]
fn path_to_cstring(path: &Path) -> DbResult<CString> {
    let utf8 = path
        .to_str()
        .ok_or_else(|| DbError::InvalidPath(path.to_path_buf()))?;
    Ok(CString::new(utf8)?)
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection").finish_non_exhaustive()
    }
}
