//! Scoped transaction guard.

use tracing::warn;

use super::connection::Connection;
use super::error::DbResult;
use super::params::Params;
use super::row::Rows;
use super::statement::Statement;

/// Transaction locking behaviour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TransactionBehavior {
    /// `BEGIN DEFERRED` (the default): locks are taken on first access.
    #[default]
    Deferred,
    /// `BEGIN IMMEDIATE`: acquires a RESERVED lock right away.
    Immediate,
    /// `BEGIN EXCLUSIVE`: acquires an EXCLUSIVE lock right away.
    Exclusive,
}

impl TransactionBehavior {
    const fn begin_sql(self) -> &'static str {
        match self {
            Self::Deferred => "BEGIN DEFERRED TRANSACTION;",
            Self::Immediate => "BEGIN IMMEDIATE TRANSACTION;",
            Self::Exclusive => "BEGIN EXCLUSIVE TRANSACTION;",
        }
    }
}

/// An open database transaction.
///
/// `COMMIT` and `ROLLBACK` are prepared before `BEGIN` is issued, so ending
/// the transaction never has to compile SQL. At most one of them runs:
/// [`commit`](Self::commit) and [`rollback`](Self::rollback) are no-ops once
/// either has succeeded.
///
/// Dropping an active transaction rolls it back. That rollback is
/// best-effort: a failure is logged and otherwise ignored, so call
/// [`rollback`](Self::rollback) explicitly when the outcome matters.
pub struct Transaction<'conn> {
    conn: &'conn Connection,
    commit: Statement<'conn>,
    rollback: Statement<'conn>,
    active: bool,
}

impl<'conn> Transaction<'conn> {
    /// Prepares the end statements and begins a transaction on `conn`.
    pub(super) fn begin(conn: &'conn Connection, behavior: TransactionBehavior) -> DbResult<Self> {
        let commit = conn.prepare("COMMIT;")?;
        let rollback = conn.prepare("ROLLBACK;")?;
        conn.execute(behavior.begin_sql())?;
        Ok(Self {
            conn,
            commit,
            rollback,
            active: true,
        })
    }

    /// Returns `true` until the transaction has been committed or rolled back.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Commits the transaction.
    ///
    /// If the commit fails the transaction stays active.
    ///
    /// # Errors
    ///
    /// Returns the engine's status if `COMMIT` fails, e.g. `SQLITE_BUSY`.
    pub fn commit(&mut self) -> DbResult<()> {
        if self.active {
            self.commit.execute(())?;
            self.active = false;
        }
        Ok(())
    }

    /// Rolls the transaction back.
    ///
    /// # Errors
    ///
    /// Returns the engine's status if `ROLLBACK` fails.
    pub fn rollback(&mut self) -> DbResult<()> {
        if self.active {
            self.rollback.execute(())?;
            self.active = false;
        }
        Ok(())
    }

    // ── Delegated Connection methods ────────────────────────────────────

    /// See [`Connection::execute`].
    ///
    /// # Errors
    ///
    /// See [`Connection::execute`].
    pub fn execute(&self, sql: &str) -> DbResult<()> {
        self.conn.execute(sql)
    }

    /// See [`Connection::prepare`].
    ///
    /// # Errors
    ///
    /// See [`Connection::prepare`].
    pub fn prepare(&self, sql: &str) -> DbResult<Statement<'conn>> {
        self.conn.prepare(sql)
    }

    /// See [`Connection::fetch`].
    ///
    /// # Errors
    ///
    /// See [`Connection::fetch`].
    pub fn fetch<P: Params>(&self, sql: &str, params: P) -> DbResult<Rows<'conn>> {
        self.conn.fetch(sql, params)
    }
}

impl std::fmt::Debug for Transaction<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if self.active {
            if let Err(err) = self.rollback() {
                warn!(error = %err, "implicit rollback of dropped transaction failed");
            }
        }
    }
}
