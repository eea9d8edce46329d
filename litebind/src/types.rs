//! Type dispatch between Rust values and the engine's bind/column calls.
//!
//! Binding goes through [`ToSql`], which lowers a value into the closed
//! [`ToSqlOutput`] union; each variant maps to exactly one `sqlite3_bind_*`
//! call. Extraction goes through [`FromColumn`], which picks exactly one
//! `sqlite3_column_*` call for the requested type. Both are resolved
//! statically: asking for a type without an impl does not compile.
//!
//! Integers narrower than eight bytes use the 32-bit engine calls
//! (`bind_int` / `column_int`); eight-byte integers use the 64-bit ones.

use std::ffi::{CStr, CString};
use std::mem::size_of;

use super::error::DbResult;
use super::row::Row;

/// A value lowered to one of the engine's bindable representations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ToSqlOutput<'a> {
    /// SQL NULL (`sqlite3_bind_null`).
    Null,
    /// Integer narrower than 64 bits (`sqlite3_bind_int`).
    Int(i32),
    /// 64-bit integer (`sqlite3_bind_int64`).
    Int64(i64),
    /// Floating point (`sqlite3_bind_double`).
    Double(f64),
    /// UTF-8 text (`sqlite3_bind_text`).
    Text(&'a [u8]),
    /// UTF-16 text in native byte order (`sqlite3_bind_text16`).
    Text16(&'a [u16]),
}

/// Types that can be bound as a statement parameter.
pub trait ToSql {
    /// Lowers `self` to its bind representation.
    fn to_sql(&self) -> ToSqlOutput<'_>;
}

/// Explicit SQL NULL parameter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Null;

impl ToSql for Null {
    fn to_sql(&self) -> ToSqlOutput<'_> {
        ToSqlOutput::Null
    }
}

impl ToSql for () {
    fn to_sql(&self) -> ToSqlOutput<'_> {
        ToSqlOutput::Null
    }
}

impl<T: ToSql + ?Sized> ToSql for &T {
    fn to_sql(&self) -> ToSqlOutput<'_> {
        (**self).to_sql()
    }
}

impl<T: ToSql> ToSql for Option<T> {
    fn to_sql(&self) -> ToSqlOutput<'_> {
        self.as_ref().map_or(ToSqlOutput::Null, ToSql::to_sql)
    }
}

macro_rules! integer_to_sql {
    ($($t:ty),* $(,)?) => {$(
        impl ToSql for $t {
            #[allow(
                clippy::cast_possible_truncation,
                clippy::cast_lossless,
                clippy::cast_possible_wrap,
                clippy::unnecessary_cast
            )]
            fn to_sql(&self) -> ToSqlOutput<'_> {
                if size_of::<$t>() < 8 {
                    ToSqlOutput::Int(*self as i32)
                } else {
                    ToSqlOutput::Int64(*self as i64)
                }
            }
        }
    )*};
}

integer_to_sql!(i8, i16, i32, i64, isize, u8, u16);

impl ToSql for bool {
    fn to_sql(&self) -> ToSqlOutput<'_> {
        ToSqlOutput::Int(i32::from(*self))
    }
}

impl ToSql for f64 {
    fn to_sql(&self) -> ToSqlOutput<'_> {
        ToSqlOutput::Double(*self)
    }
}

impl ToSql for f32 {
    fn to_sql(&self) -> ToSqlOutput<'_> {
        ToSqlOutput::Double(f64::from(*self))
    }
}

impl ToSql for str {
    fn to_sql(&self) -> ToSqlOutput<'_> {
        ToSqlOutput::Text(self.as_bytes())
    }
}

impl ToSql for String {
    fn to_sql(&self) -> ToSqlOutput<'_> {
        ToSqlOutput::Text(self.as_bytes())
    }
}

impl ToSql for CStr {
    fn to_sql(&self) -> ToSqlOutput<'_> {
        ToSqlOutput::Text(self.to_bytes())
    }
}

impl ToSql for CString {
    fn to_sql(&self) -> ToSqlOutput<'_> {
        ToSqlOutput::Text(self.as_bytes())
    }
}

impl ToSql for [u16] {
    fn to_sql(&self) -> ToSqlOutput<'_> {
        ToSqlOutput::Text16(self)
    }
}

impl<const N: usize> ToSql for [u16; N] {
    fn to_sql(&self) -> ToSqlOutput<'_> {
        ToSqlOutput::Text16(self)
    }
}

impl ToSql for Vec<u16> {
    fn to_sql(&self) -> ToSqlOutput<'_> {
        ToSqlOutput::Text16(self)
    }
}

// ── Extraction ──────────────────────────────────────────────────────────

/// Types that can be read out of a result column.
///
/// `'row` is the lifetime of the current row; borrowed results (`&CStr`,
/// `&str`, [`Blob`]) cannot outlive it. Out-of-range indices and
/// incompatible conversions follow the engine's own coercion rules.
pub trait FromColumn<'row>: Sized {
    /// Reads column `index` of `row`.
    fn from_column(row: &Row<'row>, index: usize) -> Self;
}

macro_rules! integer_from_column {
    ($($t:ty),* $(,)?) => {$(
        impl<'row> FromColumn<'row> for $t {
            #[allow(
                clippy::cast_possible_truncation,
                clippy::cast_sign_loss,
                clippy::cast_lossless,
                clippy::cast_possible_wrap,
                clippy::unnecessary_cast
            )]
            fn from_column(row: &Row<'row>, index: usize) -> Self {
                let index = Row::column_index(index);
                if size_of::<$t>() < 8 {
                    row.raw().column_int(index) as Self
                } else {
                    row.raw().column_int64(index) as Self
                }
            }
        }
    )*};
}

integer_from_column!(i8, i16, i32, i64, isize, u8, u16);

impl<'row> FromColumn<'row> for bool {
    fn from_column(row: &Row<'row>, index: usize) -> Self {
        row.raw().column_int(Row::column_index(index)) != 0
    }
}

impl<'row> FromColumn<'row> for f64 {
    fn from_column(row: &Row<'row>, index: usize) -> Self {
        row.raw().column_double(Row::column_index(index))
    }
}

impl<'row> FromColumn<'row> for f32 {
    #[allow(clippy::cast_possible_truncation)]
    fn from_column(row: &Row<'row>, index: usize) -> Self {
        row.raw().column_double(Row::column_index(index)) as Self
    }
}

/// Borrowed NUL-terminated text. SQL NULL reads as the empty string.
///
/// A BLOB reads up to its first NUL byte, or as the empty string when it has
/// none. Its buffer is never terminated in place.
impl<'row> FromColumn<'row> for &'row CStr {
    fn from_column(row: &Row<'row>, index: usize) -> Self {
        row.raw()
            .column_cstr(Row::column_index(index))
            .unwrap_or(c"")
    }
}

/// Borrowed UTF-8 text. SQL NULL and text that is not valid UTF-8 read as
/// the empty string; use `String` for a lossy copy instead. A BLOB reads as
/// its raw bytes.
impl<'row> FromColumn<'row> for &'row str {
    fn from_column(row: &Row<'row>, index: usize) -> Self {
        std::str::from_utf8(row.raw().column_text(Row::column_index(index))).unwrap_or("")
    }
}

impl<'row> FromColumn<'row> for String {
    fn from_column(row: &Row<'row>, index: usize) -> Self {
        Self::from_utf8_lossy(row.raw().column_text(Row::column_index(index))).into_owned()
    }
}

/// Owned UTF-16 text.
///
/// Converted from the engine's UTF-8 buffer rather than `column_text16`, so
/// a previously borrowed `&CStr`/`&str` of the same column stays valid.
impl<'row> FromColumn<'row> for Vec<u16> {
    fn from_column(row: &Row<'row>, index: usize) -> Self {
        String::from_utf8_lossy(row.raw().column_text(Row::column_index(index)))
            .encode_utf16()
            .collect()
    }
}

impl<'row, T: FromColumn<'row>> FromColumn<'row> for Option<T> {
    fn from_column(row: &Row<'row>, index: usize) -> Self {
        if row.is_null(index) {
            None
        } else {
            Some(T::from_column(row, index))
        }
    }
}

/// Borrowed blob contents of the current row.
///
/// Extraction only: blobs are not bindable. An empty slice stands for both
/// SQL NULL and a zero-length blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Blob<'row> {
    data: &'row [u8],
}

impl<'row> Blob<'row> {
    /// The blob bytes.
    #[must_use]
    pub const fn data(&self) -> &'row [u8] {
        self.data
    }

    /// Length in bytes.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the blob holds no bytes.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl<'row> FromColumn<'row> for Blob<'row> {
    fn from_column(row: &Row<'row>, index: usize) -> Self {
        Self {
            data: row.raw().column_blob(Row::column_index(index)),
        }
    }
}

// ── Whole-row decoding ──────────────────────────────────────────────────

/// Decodes a full row into a fixed-arity record.
///
/// Implemented for tuples of [`FromColumn`] types (column `i` feeds field
/// `i`); implement it on your own structs for named fields.
pub trait FromRow<'row>: Sized {
    /// Builds `Self` from `row`.
    ///
    /// # Errors
    ///
    /// Implementations report any decoding failure.
    fn from_row(row: &Row<'row>) -> DbResult<Self>;
}

macro_rules! tuple_from_row {
    ($($name:ident : $idx:tt),+) => {
        impl<'row, $($name: FromColumn<'row>),+> FromRow<'row> for ($($name,)+) {
            fn from_row(row: &Row<'row>) -> DbResult<Self> {
                Ok(($(row.get::<$name>($idx),)+))
            }
        }
    };
}

tuple_from_row!(A: 0);
tuple_from_row!(A: 0, B: 1);
tuple_from_row!(A: 0, B: 1, C: 2);
tuple_from_row!(A: 0, B: 1, C: 2, D: 3);
tuple_from_row!(A: 0, B: 1, C: 2, D: 3, E: 4);
tuple_from_row!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5);
tuple_from_row!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6);
tuple_from_row!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7);
tuple_from_row!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7, I: 8);
tuple_from_row!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7, I: 8, J: 9);
tuple_from_row!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7, I: 8, J: 9, K: 10);
tuple_from_row!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7, I: 8, J: 9, K: 10, L: 11);

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(&7_i8 => ToSqlOutput::Int(7) ; "i8")]
    #[test_case(&-3_i16 => ToSqlOutput::Int(-3) ; "i16")]
    #[test_case(&i32::MIN => ToSqlOutput::Int(i32::MIN) ; "i32")]
    #[test_case(&u16::MAX => ToSqlOutput::Int(65_535) ; "u16")]
    #[test_case(&i64::MAX => ToSqlOutput::Int64(i64::MAX) ; "i64")]
    #[test_case(&true => ToSqlOutput::Int(1) ; "bool")]
    fn integers_dispatch_by_width(value: &dyn ToSql) -> ToSqlOutput<'static> {
        match value.to_sql() {
            ToSqlOutput::Int(v) => ToSqlOutput::Int(v),
            ToSqlOutput::Int64(v) => ToSqlOutput::Int64(v),
            other => panic!("unexpected output {other:?}"),
        }
    }

    #[test]
    fn none_lowers_to_null() {
        let value: Option<i64> = None;
        assert_eq!(value.to_sql(), ToSqlOutput::Null);
        assert_eq!(Some(2.5_f64).to_sql(), ToSqlOutput::Double(2.5));
        assert_eq!(Null.to_sql(), ToSqlOutput::Null);
    }

    #[test]
    fn text_kinds_lower_to_their_encoding() {
        assert_eq!("abc".to_sql(), ToSqlOutput::Text(b"abc"));
        assert_eq!(c"abc".to_sql(), ToSqlOutput::Text(b"abc"));
        let wide: Vec<u16> = "hé".encode_utf16().collect();
        assert_eq!(wide.to_sql(), ToSqlOutput::Text16(&wide));
    }
}
