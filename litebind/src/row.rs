//! Lazy row cursor and the per-row accessor.

use std::ffi::c_int;
use std::fmt;

use super::error::{check, DbError, DbResult};
use super::ffi::{self, RawStmt};
use super::types::{FromColumn, FromRow};

/// A view over the current row of a stepped statement.
///
/// Only obtainable from [`Rows::next`]; the borrow it holds keeps the cursor
/// from stepping or resetting while the row (or anything borrowed from it)
/// is alive.
pub struct Row<'row> {
    stmt: &'row RawStmt,
}

impl<'row> Row<'row> {
    pub(crate) const fn new(stmt: &'row RawStmt) -> Self {
        Self { stmt }
    }

    pub(crate) const fn raw(&self) -> &'row RawStmt {
        self.stmt
    }

    /// Clamps a column index into the engine's index type. An index that
    /// does not fit is out of range either way.
    pub(crate) fn column_index(index: usize) -> c_int {
        c_int::try_from(index).unwrap_or(c_int::MAX)
    }

    /// Reads column `index` (0-based) as `T`.
    #[must_use]
    pub fn get<T: FromColumn<'row>>(&self, index: usize) -> T {
        T::from_column(self, index)
    }

    /// Decodes the whole row, e.g. into a tuple `(i64, String)`.
    ///
    /// # Errors
    ///
    /// Whatever the [`FromRow`] implementation reports.
    pub fn decode<T: FromRow<'row>>(&self) -> DbResult<T> {
        T::from_row(self)
    }

    /// Number of columns in the result set.
    #[must_use]
    pub fn column_count(&self) -> usize {
        usize::try_from(self.stmt.column_count()).unwrap_or(0)
    }

    /// Name of column `index`.
    #[must_use]
    pub fn column_name(&self, index: usize) -> Option<String> {
        self.stmt.column_name(Self::column_index(index))
    }

    /// Returns `true` if column `index` is SQL NULL.
    #[must_use]
    pub fn is_null(&self, index: usize) -> bool {
        self.stmt.column_type(Self::column_index(index)) == ffi::SQLITE_NULL
    }
}

impl fmt::Debug for Row<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Row")
            .field("columns", &self.column_count())
            .finish_non_exhaustive()
    }
}

enum Cursor<'stmt> {
    Borrowed(&'stmt RawStmt),
    Owned(RawStmt),
}

/// A lazy, single-pass sequence of rows.
///
/// Each call to [`next`](Self::next) steps the statement once. The sequence
/// ends when the engine reports `SQLITE_DONE`; any other step result is
/// returned as an error immediately. [`reset`](Self::reset) (or a fresh
/// [`Statement::fetch`](super::Statement::fetch)) restarts it from the first
/// row.
///
/// `Rows` is a lending cursor rather than an [`Iterator`]: a [`Row`] borrows
/// the cursor, so two overlapping passes over one statement cannot exist.
/// Use [`mapped`](Self::mapped) for a standard iterator of owned values.
pub struct Rows<'stmt> {
    cursor: Cursor<'stmt>,
    done: bool,
}

impl<'stmt> Rows<'stmt> {
    pub(crate) const fn borrowed(stmt: &'stmt RawStmt) -> Self {
        Self {
            cursor: Cursor::Borrowed(stmt),
            done: false,
        }
    }

    pub(crate) const fn owned(stmt: RawStmt) -> Self {
        Self {
            cursor: Cursor::Owned(stmt),
            done: false,
        }
    }

    const fn raw(&self) -> &RawStmt {
        match &self.cursor {
            Cursor::Borrowed(stmt) => *stmt,
            Cursor::Owned(stmt) => stmt,
        }
    }

    /// Advances to the next row.
    ///
    /// Returns `Ok(None)` once the statement is done; further calls keep
    /// returning `Ok(None)` without stepping until the cursor is reset.
    ///
    /// # Errors
    ///
    /// Returns the engine's status when a step yields neither a row nor
    /// done.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> DbResult<Option<Row<'_>>> {
        if self.done {
            return Ok(None);
        }
        match self.raw().step() {
            ffi::SQLITE_ROW => Ok(Some(Row::new(self.raw()))),
            ffi::SQLITE_DONE => {
                self.done = true;
                Ok(None)
            }
            rc => {
                self.done = true;
                Err(DbError::status(rc))
            }
        }
    }

    /// Rewinds the statement so the next call yields the first row again.
    /// Bound parameters are kept.
    ///
    /// # Errors
    ///
    /// Returns the error of the previous step if that step failed.
    pub fn reset(&mut self) -> DbResult<()> {
        self.done = false;
        check(self.raw().reset())
    }

    /// Converts the cursor into an iterator that maps every row with `f`.
    #[must_use]
    pub const fn mapped<T, F>(self, f: F) -> MappedRows<'stmt, F>
    where
        F: FnMut(&Row<'_>) -> DbResult<T>,
    {
        MappedRows { rows: self, map: f }
    }
}

impl fmt::Debug for Rows<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rows")
            .field("owned", &matches!(self.cursor, Cursor::Owned(_)))
            .field("done", &self.done)
            .finish()
    }
}

/// Iterator adapter returned by [`Rows::mapped`] and
/// [`Statement::query_map`](super::Statement::query_map).
pub struct MappedRows<'stmt, F> {
    rows: Rows<'stmt>,
    map: F,
}

impl<T, F> Iterator for MappedRows<'_, F>
where
    F: FnMut(&Row<'_>) -> DbResult<T>,
{
    type Item = DbResult<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let map = &mut self.map;
        self.rows
            .next()
            .transpose()
            .map(|row| row.and_then(|row| map(&row)))
    }
}

impl<F> fmt::Debug for MappedRows<'_, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappedRows")
            .field("rows", &self.rows)
            .finish_non_exhaustive()
    }
}
