//! Raw handles over the SQLite C API.
//!
//! The symbols come from `libsqlite3-sys` (bundled amalgamation). This is the
//! **only** module that contains `unsafe` code or C types: [`RawDb`] owns a
//! `sqlite3*`, [`RawStmt`] owns a `sqlite3_stmt*`, and both expose safe methods
//! that return the engine's raw status codes for the wrappers above to check.

#![allow(unsafe_code)]

use std::ffi::{c_char, c_int, CStr};
use std::ptr::{self, NonNull};

use libsqlite3_sys as sys;

// ── SQLite constants ────────────────────────────────────────────────────

pub const SQLITE_OK: c_int = sys::SQLITE_OK;
#[cfg(test)]
pub const SQLITE_ERROR: c_int = sys::SQLITE_ERROR;
pub const SQLITE_MISUSE: c_int = sys::SQLITE_MISUSE;
pub const SQLITE_TOOBIG: c_int = sys::SQLITE_TOOBIG;
pub const SQLITE_RANGE: c_int = sys::SQLITE_RANGE;
pub const SQLITE_ROW: c_int = sys::SQLITE_ROW;
pub const SQLITE_DONE: c_int = sys::SQLITE_DONE;

// Column type constants
pub const SQLITE_NULL: c_int = sys::SQLITE_NULL;
pub const SQLITE_BLOB: c_int = sys::SQLITE_BLOB;

// Open flags
pub const SQLITE_OPEN_READONLY: c_int = sys::SQLITE_OPEN_READONLY;
pub const SQLITE_OPEN_READWRITE: c_int = sys::SQLITE_OPEN_READWRITE;
pub const SQLITE_OPEN_CREATE: c_int = sys::SQLITE_OPEN_CREATE;
pub const SQLITE_OPEN_URI: c_int = sys::SQLITE_OPEN_URI;
pub const SQLITE_OPEN_MEMORY: c_int = sys::SQLITE_OPEN_MEMORY;
pub const SQLITE_OPEN_NOMUTEX: c_int = sys::SQLITE_OPEN_NOMUTEX;
pub const SQLITE_OPEN_FULLMUTEX: c_int = sys::SQLITE_OPEN_FULLMUTEX;
pub const SQLITE_OPEN_SHAREDCACHE: c_int = sys::SQLITE_OPEN_SHAREDCACHE;
pub const SQLITE_OPEN_PRIVATECACHE: c_int = sys::SQLITE_OPEN_PRIVATECACHE;

/// Returns the engine's static English description of a result code.
pub fn errstr(code: c_int) -> &'static str {
    // SAFETY: sqlite3_errstr returns a pointer to a static, NUL-terminated
    // string (or NULL for nothing we know of).
    let ptr = unsafe { sys::sqlite3_errstr(code) };
    if ptr.is_null() {
        return "unknown error";
    }
    unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .unwrap_or("unknown error")
}

// ── Connection handle ───────────────────────────────────────────────────

/// Exclusive owner of a `sqlite3*`. Closed with `sqlite3_close` on drop.
pub struct RawDb {
    db: NonNull<sys::sqlite3>,
}

// SAFETY: the handle is only ever used from one thread at a time (`RawDb` is
// not `Sync`), which every SQLite threading mode permits.
unsafe impl Send for RawDb {}

impl RawDb {
    /// Opens `filename` with `sqlite3_open_v2`.
    ///
    /// On failure any handle the engine allocated is closed before the status
    /// code is returned.
    pub fn open(filename: &CStr, flags: c_int) -> Result<Self, c_int> {
        let mut db: *mut sys::sqlite3 = ptr::null_mut();
        // SAFETY: `filename` is NUL-terminated and `db` is a valid out-pointer.
        let rc =
            unsafe { sys::sqlite3_open_v2(filename.as_ptr(), &mut db, flags, ptr::null()) };
        match NonNull::new(db) {
            Some(db) if rc == SQLITE_OK => Ok(Self { db }),
            Some(db) => {
                // SAFETY: the engine hands out a handle even on failure; it
                // must still be released. No statement exists on it yet.
                unsafe { sys::sqlite3_close(db.as_ptr()) };
                Err(rc)
            }
            None if rc == SQLITE_OK => Err(sys::SQLITE_NOMEM),
            None => Err(rc),
        }
    }

    const fn as_ptr(&self) -> *mut sys::sqlite3 {
        self.db.as_ptr()
    }

    /// Enables or disables extended result codes.
    pub fn extended_result_codes(&self, on: bool) -> c_int {
        unsafe { sys::sqlite3_extended_result_codes(self.as_ptr(), c_int::from(on)) }
    }

    /// Runs `sql` through `sqlite3_exec` without a row callback.
    ///
    /// Returns the status code and the engine's diagnostic message, if any.
    /// The engine-allocated message buffer is copied and freed here.
    pub fn exec(&self, sql: &CStr) -> (c_int, Option<String>) {
        let mut errmsg: *mut c_char = ptr::null_mut();
        // SAFETY: `sql` is NUL-terminated; `errmsg` is a valid out-pointer.
        let rc = unsafe {
            sys::sqlite3_exec(self.as_ptr(), sql.as_ptr(), None, ptr::null_mut(), &mut errmsg)
        };
        let message = if errmsg.is_null() {
            None
        } else {
            // SAFETY: a non-null errmsg is a NUL-terminated string obtained
            // from sqlite3_malloc and must be released with sqlite3_free.
            let msg = unsafe { CStr::from_ptr(errmsg) }
                .to_string_lossy()
                .into_owned();
            unsafe { sys::sqlite3_free(errmsg.cast()) };
            Some(msg)
        };
        (rc, message)
    }

    /// Compiles the first statement in `sql`.
    ///
    /// Returns `Ok(None)` when `sql` holds no statement (blank or comment).
    pub fn prepare(&self, sql: &str) -> Result<Option<RawStmt>, c_int> {
        let len = c_int::try_from(sql.len()).map_err(|_| SQLITE_TOOBIG)?;
        let mut stmt: *mut sys::sqlite3_stmt = ptr::null_mut();
        // SAFETY: `sql` is valid for `len` bytes; NUL termination is not
        // required when the byte count is given.
        let rc = unsafe {
            sys::sqlite3_prepare_v2(
                self.as_ptr(),
                sql.as_ptr().cast(),
                len,
                &mut stmt,
                ptr::null_mut(),
            )
        };
        if rc != SQLITE_OK {
            if !stmt.is_null() {
                unsafe { sys::sqlite3_finalize(stmt) };
            }
            return Err(rc);
        }
        Ok(NonNull::new(stmt).map(|stmt| RawStmt { stmt }))
    }

    /// Number of rows changed by the most recent INSERT/UPDATE/DELETE.
    pub fn changes(&self) -> c_int {
        unsafe { sys::sqlite3_changes(self.as_ptr()) }
    }

    /// Rowid of the most recent successful INSERT.
    pub fn last_insert_rowid(&self) -> i64 {
        unsafe { sys::sqlite3_last_insert_rowid(self.as_ptr()) }
    }

    /// `1` read-only, `0` read-write, `-1` if `name` is not an attached database.
    pub fn db_readonly(&self, name: &CStr) -> c_int {
        unsafe { sys::sqlite3_db_readonly(self.as_ptr(), name.as_ptr()) }
    }

    /// Frees as much heap memory as possible from this connection.
    pub fn release_memory(&self) -> c_int {
        unsafe { sys::sqlite3_db_release_memory(self.as_ptr()) }
    }

    /// Installs a busy handler that sleeps up to `ms` milliseconds.
    pub fn busy_timeout(&self, ms: c_int) -> c_int {
        unsafe { sys::sqlite3_busy_timeout(self.as_ptr(), ms) }
    }

    /// Closes the handle with `sqlite3_close`, returning its status.
    ///
    /// Every `RawStmt` borrows its connection through `Statement<'conn>`, so
    /// all statements are finalized by the time the owner can call this.
    pub fn close(self) -> c_int {
        let db = self.as_ptr();
        std::mem::forget(self);
        // SAFETY: `self` was forgotten, so the handle is closed exactly once.
        unsafe { sys::sqlite3_close(db) }
    }
}

impl Drop for RawDb {
    fn drop(&mut self) {
        // SAFETY: we own the handle, and no statement outlives the
        // connection that prepared it.
        unsafe {
            sys::sqlite3_close(self.as_ptr());
        }
    }
}

// ── Statement handle ────────────────────────────────────────────────────

/// Exclusive owner of a `sqlite3_stmt*`. Finalized on drop.
///
/// Slices returned by the column readers borrow `self`; they are valid until
/// the next step, reset or conversion of the same column, which callers
/// prevent by holding the borrow.
pub struct RawStmt {
    stmt: NonNull<sys::sqlite3_stmt>,
}

impl RawStmt {
    const fn as_ptr(&self) -> *mut sys::sqlite3_stmt {
        self.stmt.as_ptr()
    }

    pub fn step(&self) -> c_int {
        unsafe { sys::sqlite3_step(self.as_ptr()) }
    }

    pub fn reset(&self) -> c_int {
        unsafe { sys::sqlite3_reset(self.as_ptr()) }
    }

    pub fn clear_bindings(&self) -> c_int {
        unsafe { sys::sqlite3_clear_bindings(self.as_ptr()) }
    }

    /// Original SQL text the statement was compiled from.
    pub fn sql(&self) -> Option<&str> {
        let ptr = unsafe { sys::sqlite3_sql(self.as_ptr()) };
        if ptr.is_null() {
            return None;
        }
        // SAFETY: the text lives as long as the statement.
        unsafe { CStr::from_ptr(ptr) }.to_str().ok()
    }

    // ── Parameter binding ───────────────────────────────────────────────

    pub fn bind_int(&self, index: c_int, value: i32) -> c_int {
        unsafe { sys::sqlite3_bind_int(self.as_ptr(), index, value) }
    }

    pub fn bind_int64(&self, index: c_int, value: i64) -> c_int {
        unsafe { sys::sqlite3_bind_int64(self.as_ptr(), index, value) }
    }

    pub fn bind_double(&self, index: c_int, value: f64) -> c_int {
        unsafe { sys::sqlite3_bind_double(self.as_ptr(), index, value) }
    }

    pub fn bind_null(&self, index: c_int) -> c_int {
        unsafe { sys::sqlite3_bind_null(self.as_ptr(), index) }
    }

    /// Binds UTF-8 bytes; the engine copies them (`SQLITE_TRANSIENT`).
    pub fn bind_text(&self, index: c_int, text: &[u8]) -> c_int {
        let Ok(len) = c_int::try_from(text.len()) else {
            return SQLITE_TOOBIG;
        };
        // A zero-length slice may dangle; the engine wants a real pointer to
        // store an empty string rather than NULL.
        let ptr: *const c_char = if text.is_empty() {
            c"".as_ptr()
        } else {
            text.as_ptr().cast()
        };
        unsafe {
            sys::sqlite3_bind_text(
                self.as_ptr(),
                index,
                ptr,
                len,
                sys::SQLITE_TRANSIENT(),
            )
        }
    }

    /// Binds UTF-16 code units, transcoded to UTF-8 first.
    ///
    /// Unpaired surrogates become U+FFFD.
    pub fn bind_text16(&self, index: c_int, text: &[u16]) -> c_int {
        self.bind_text(index, String::from_utf16_lossy(text).as_bytes())
    }

    pub fn parameter_count(&self) -> c_int {
        unsafe { sys::sqlite3_bind_parameter_count(self.as_ptr()) }
    }

    /// 1-based index of the named parameter, or `0` if there is none.
    pub fn parameter_index(&self, name: &CStr) -> c_int {
        unsafe { sys::sqlite3_bind_parameter_index(self.as_ptr(), name.as_ptr()) }
    }

    // ── Column reading ──────────────────────────────────────────────────

    pub fn column_count(&self) -> c_int {
        unsafe { sys::sqlite3_column_count(self.as_ptr()) }
    }

    /// Name of column `index`, copied out of the engine.
    pub fn column_name(&self, index: c_int) -> Option<String> {
        let ptr = unsafe { sys::sqlite3_column_name(self.as_ptr(), index) };
        if ptr.is_null() {
            return None;
        }
        Some(unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned())
    }

    pub fn column_type(&self, index: c_int) -> c_int {
        unsafe { sys::sqlite3_column_type(self.as_ptr(), index) }
    }

    pub fn column_int(&self, index: c_int) -> i32 {
        unsafe { sys::sqlite3_column_int(self.as_ptr(), index) }
    }

    pub fn column_int64(&self, index: c_int) -> i64 {
        unsafe { sys::sqlite3_column_int64(self.as_ptr(), index) }
    }

    pub fn column_double(&self, index: c_int) -> f64 {
        unsafe { sys::sqlite3_column_double(self.as_ptr(), index) }
    }

    /// UTF-8 text of column `index` as a NUL-terminated string.
    ///
    /// `None` for SQL NULL (or out-of-memory during conversion). A BLOB value
    /// yields the bytes before its first NUL, or `None` if it holds none.
    pub fn column_cstr(&self, index: c_int) -> Option<&CStr> {
        if self.column_type(index) == SQLITE_BLOB {
            return CStr::from_bytes_until_nul(self.column_blob(index)).ok();
        }
        let ptr = unsafe { sys::sqlite3_column_text(self.as_ptr(), index) };
        if ptr.is_null() {
            return None;
        }
        // SAFETY: column_text always returns a NUL-terminated buffer owned by
        // the statement; the borrow of `self` keeps it from being stepped.
        Some(unsafe { CStr::from_ptr(ptr.cast()) })
    }

    /// UTF-8 bytes of column `index`, honouring embedded NULs.
    ///
    /// Empty for SQL NULL; a zero byte count never dereferences the pointer.
    /// A BLOB value is returned as its raw bytes.
    pub fn column_text(&self, index: c_int) -> &[u8] {
        // sqlite3_column_text NUL-terminates a BLOB in place, which may move
        // the buffer out from under a slice from an earlier column_blob.
        if self.column_type(index) == SQLITE_BLOB {
            return self.column_blob(index);
        }
        // column_text must run before column_bytes so the byte count refers
        // to the converted UTF-8 representation.
        let ptr = unsafe { sys::sqlite3_column_text(self.as_ptr(), index) };
        let len = unsafe { sys::sqlite3_column_bytes(self.as_ptr(), index) };
        Self::slice(ptr.cast(), len)
    }

    /// Raw bytes of column `index`. Empty for SQL NULL or a zero-length blob.
    pub fn column_blob(&self, index: c_int) -> &[u8] {
        let ptr = unsafe { sys::sqlite3_column_blob(self.as_ptr(), index) };
        let len = unsafe { sys::sqlite3_column_bytes(self.as_ptr(), index) };
        Self::slice(ptr.cast(), len)
    }

    fn slice<'a>(ptr: *const u8, len: c_int) -> &'a [u8] {
        match usize::try_from(len) {
            Ok(len) if len > 0 && !ptr.is_null() => {
                // SAFETY: the engine guarantees `len` readable bytes at `ptr`.
                unsafe { std::slice::from_raw_parts(ptr, len) }
            }
            _ => &[],
        }
    }
}

impl Drop for RawStmt {
    fn drop(&mut self) {
        unsafe {
            sys::sqlite3_finalize(self.as_ptr());
        }
    }
}
