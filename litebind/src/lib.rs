//! Statically-typed, resource-safe bindings over the SQLite C API.
//!
//! This crate maps the engine's connection, prepared-statement, bind and
//! column calls onto owned Rust types. It implements no storage or query
//! logic of its own; every operation is a checked call into the bundled
//! SQLite library.
//!
//! * [`Connection`] owns a database handle: open, direct execution,
//!   statement preparation and one-call [`fetch`](Connection::fetch).
//! * [`Statement`] owns a prepared statement: positional or named binding,
//!   execution, reset, and a lazy [`Rows`] cursor.
//! * [`Row`] reads typed columns through [`FromColumn`]; parameters go in
//!   through [`ToSql`]. Both dispatch statically on the Rust type.
//! * [`Transaction`] is a scoped BEGIN/COMMIT/ROLLBACK guard.
//!
//! ```no_run
//! use litebind::{params, Connection};
//!
//! # fn main() -> litebind::DbResult<()> {
//! let conn = Connection::open_in_memory()?;
//! conn.execute("CREATE TABLE t (a INTEGER, b TEXT);")?;
//! conn.prepare("INSERT INTO t VALUES (?, ?)")?.execute(params![1, "x"])?;
//!
//! let mut rows = conn.fetch("SELECT a, b FROM t", ())?;
//! while let Some(row) = rows.next()? {
//!     let (a, b): (i64, String) = row.decode()?;
//!     println!("{a} {b}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! The `ffi` module is the **only** file that contains `unsafe` code or C
//! types; everything else is safe Rust over its `RawDb` / `RawStmt` handles.

#![deny(unsafe_code)]

mod ffi;

mod config;
mod connection;
pub mod error;
mod params;
mod row;
mod statement;
mod transaction;
pub mod types;

pub use config::{ConnectionOptions, JournalMode, OpenFlags, OpenMode};
pub use connection::Connection;
pub use error::{DbError, DbResult, ErrorCode};
pub use params::{named, Named, Params};
pub use row::{MappedRows, Row, Rows};
pub use statement::Statement;
pub use transaction::{Transaction, TransactionBehavior};
pub use types::{Blob, FromColumn, FromRow, Null, ToSql, ToSqlOutput};

#[cfg(test)]
mod tests;
