//! Safe wrapper around a SQLite prepared statement.
//!
//! This file contains **no `unsafe` code**. All FFI interaction is delegated to
//! [`ffi::RawStmt`] which encapsulates the raw pointer and C type conversions.

use std::ffi::{c_int, CString};
use std::marker::PhantomData;

use tracing::trace;

use super::connection::Connection;
use super::error::{check, DbError, DbResult};
use super::ffi::{self, RawStmt};
use super::params::Params;
use super::row::{MappedRows, Row, Rows};
use super::types::{ToSql, ToSqlOutput};

/// A prepared SQLite statement.
///
/// Created via [`Connection::prepare`](super::Connection::prepare) and tied to
/// the lifetime of that connection. Finalized when dropped.
///
/// Lifecycle: prepared → bound → stepped ([`execute`](Self::execute) or
/// [`fetch`](Self::fetch)) → reset → bound again, any number of times.
pub struct Statement<'conn> {
    raw: RawStmt,
    _conn: PhantomData<&'conn Connection>,
}

impl<'conn> Statement<'conn> {
    /// Wraps a raw statement handle.
    pub(super) const fn new(raw: RawStmt) -> Self {
        Self {
            raw,
            _conn: PhantomData,
        }
    }

    pub(super) fn into_rows(self) -> Rows<'conn> {
        Rows::owned(self.raw)
    }

    // ── Binding ─────────────────────────────────────────────────────────

    /// Binds a parameter list.
    ///
    /// Positional lists (tuples, [`params!`](crate::params)) bind in order
    /// starting at index 1. Named lists ([`named_params!`](crate::named_params),
    /// slices of [`Named`](crate::Named)) resolve each name and silently skip
    /// names the statement does not declare.
    ///
    /// A failure part-way through leaves the earlier parameters bound.
    ///
    /// # Errors
    ///
    /// Fails on the first parameter the engine refuses to bind.
    pub fn bind<P: Params>(&mut self, params: P) -> DbResult<()> {
        params.bind_to(self)
    }

    /// Binds `value` at the 1-based parameter `index`.
    ///
    /// # Errors
    ///
    /// Fails with `SQLITE_RANGE` if `index` is out of range.
    pub fn bind_at<T: ToSql + ?Sized>(&mut self, index: usize, value: &T) -> DbResult<()> {
        let index = c_int::try_from(index).map_err(|_| DbError::status(ffi::SQLITE_RANGE))?;
        let rc = match value.to_sql() {
            ToSqlOutput::Null => self.raw.bind_null(index),
            ToSqlOutput::Int(v) => self.raw.bind_int(index, v),
            ToSqlOutput::Int64(v) => self.raw.bind_int64(index, v),
            ToSqlOutput::Double(v) => self.raw.bind_double(index, v),
            ToSqlOutput::Text(v) => self.raw.bind_text(index, v),
            ToSqlOutput::Text16(v) => self.raw.bind_text16(index, v),
        };
        check(rc)
    }

    /// Binds `value` to the parameter called `name` (prefix included).
    ///
    /// Returns `Ok(false)` without binding anything when the statement has no
    /// such parameter.
    ///
    /// # Errors
    ///
    /// Fails if the engine refuses the value.
    pub fn bind_named<T: ToSql + ?Sized>(&mut self, name: &str, value: &T) -> DbResult<bool> {
        match self.parameter_index(name) {
            Some(index) => self.bind_at(index, value).map(|()| true),
            None => Ok(false),
        }
    }

    /// Number of SQL parameters (the largest parameter index).
    #[must_use]
    pub fn parameter_count(&self) -> usize {
        usize::try_from(self.raw.parameter_count()).unwrap_or(0)
    }

    /// 1-based index of the parameter called `name`, if the statement has one.
    #[must_use]
    pub fn parameter_index(&self, name: &str) -> Option<usize> {
        let name = CString::new(name).ok()?;
        match self.raw.parameter_index(&name) {
            0 => None,
            index => usize::try_from(index).ok(),
        }
    }

    /// Resets every parameter to NULL.
    ///
    /// # Errors
    ///
    /// Returns the engine's status on failure.
    pub fn clear_bindings(&mut self) -> DbResult<()> {
        check(self.raw.clear_bindings())
    }

    // ── Stepping ────────────────────────────────────────────────────────

    /// Returns the statement to its unstepped state. Bindings are kept.
    ///
    /// # Errors
    ///
    /// Returns the error of the previous step if that step failed.
    pub fn reset(&mut self) -> DbResult<()> {
        check(self.raw.reset())
    }

    /// Binds `params` (pass `()` for none) and steps the statement once.
    ///
    /// Any result other than a row or done is an error. The statement is
    /// reset afterwards, ready for the next bind/execute cycle.
    ///
    /// # Errors
    ///
    /// Fails if binding fails or the step yields anything other than a
    /// row or done.
    pub fn execute<P: Params>(&mut self, params: P) -> DbResult<()> {
        self.bind(params)?;
        trace!(sql = self.sql().unwrap_or_default(), "executing statement");
        match self.raw.step() {
            ffi::SQLITE_ROW | ffi::SQLITE_DONE => self.reset(),
            rc => {
                self.rewind();
                Err(DbError::status(rc))
            }
        }
    }

    /// Starts a fresh pass over the result rows.
    ///
    /// The statement is reset first, so calling `fetch` again replays the
    /// same rows with the current bindings, even after a pass that ended in
    /// an error.
    #[must_use]
    pub fn fetch(&mut self) -> Rows<'_> {
        self.rewind();
        Rows::borrowed(&self.raw)
    }

    /// Binds `params`, then maps every result row with `f`.
    ///
    /// # Errors
    ///
    /// Fails if a parameter cannot be bound. Step and mapping errors
    /// are yielded by the iterator.
    pub fn query_map<P, T, F>(&mut self, params: P, f: F) -> DbResult<MappedRows<'_, F>>
    where
        P: Params,
        F: FnMut(&Row<'_>) -> DbResult<T>,
    {
        self.rewind();
        self.bind(params)?;
        Ok(Rows::borrowed(&self.raw).mapped(f))
    }

    // sqlite3_reset echoes the error of a failed previous step, which was
    // already reported; the statement is reset either way.
    fn rewind(&self) {
        let _ = self.raw.reset();
    }

    // ── Metadata ────────────────────────────────────────────────────────

    /// Number of columns in the result set (0 for statements without rows).
    #[must_use]
    pub fn column_count(&self) -> usize {
        usize::try_from(self.raw.column_count()).unwrap_or(0)
    }

    /// Name of result column `index`.
    #[must_use]
    pub fn column_name(&self, index: usize) -> Option<String> {
        self.raw.column_name(Row::column_index(index))
    }

    /// The SQL text this statement was compiled from.
    #[must_use]
    pub fn sql(&self) -> Option<&str> {
        self.raw.sql()
    }
}

impl std::fmt::Debug for Statement<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Statement")
            .field("sql", &self.sql())
            .finish_non_exhaustive()
    }
}
