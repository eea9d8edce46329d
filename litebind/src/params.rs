//! Parameter lists accepted by [`Statement::bind`].
//!
//! A list is either entirely positional (bound 1-indexed, in order) or
//! entirely named (each name resolved with `sqlite3_bind_parameter_index`).
//! Which one applies is decided by the argument's type, so mixing the two in
//! one call does not compile.

use super::error::DbResult;
use super::statement::Statement;
use super::types::ToSql;

/// A set of parameters that can be bound to a [`Statement`].
pub trait Params {
    /// Binds every parameter in `self` to `stmt`.
    ///
    /// # Errors
    ///
    /// Fails on the first parameter the engine refuses to bind.
    fn bind_to(self, stmt: &mut Statement<'_>) -> DbResult<()>;
}

/// A parameter addressed by placeholder name (including its prefix, e.g.
/// `":id"`, `"@id"` or `"$id"`).
#[derive(Clone, Copy)]
pub struct Named<'a> {
    name: &'a str,
    value: &'a dyn ToSql,
}

impl<'a> Named<'a> {
    /// Pairs `name` with `value`.
    #[must_use]
    pub const fn new(name: &'a str, value: &'a dyn ToSql) -> Self {
        Self { name, value }
    }

    /// The placeholder name.
    #[must_use]
    pub const fn name(&self) -> &'a str {
        self.name
    }

    /// The bound value.
    #[must_use]
    pub const fn value(&self) -> &'a dyn ToSql {
        self.value
    }
}

impl std::fmt::Debug for Named<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Named")
            .field("name", &self.name)
            .field("value", &self.value.to_sql())
            .finish()
    }
}

/// Shorthand for [`Named::new`].
#[must_use]
pub const fn named<'a, T: ToSql>(name: &'a str, value: &'a T) -> Named<'a> {
    Named::new(name, value)
}

/// No parameters: nothing is bound.
impl Params for () {
    fn bind_to(self, _stmt: &mut Statement<'_>) -> DbResult<()> {
        Ok(())
    }
}

impl Params for &[&dyn ToSql] {
    fn bind_to(self, stmt: &mut Statement<'_>) -> DbResult<()> {
        for (i, value) in self.iter().enumerate() {
            stmt.bind_at(i + 1, *value)?;
        }
        Ok(())
    }
}

impl<const N: usize> Params for [&dyn ToSql; N] {
    fn bind_to(self, stmt: &mut Statement<'_>) -> DbResult<()> {
        self.as_slice().bind_to(stmt)
    }
}

/// Named parameters; a name the statement does not declare is skipped.
impl Params for &[Named<'_>] {
    fn bind_to(self, stmt: &mut Statement<'_>) -> DbResult<()> {
        for param in self {
            stmt.bind_named(param.name, param.value)?;
        }
        Ok(())
    }
}

impl<const N: usize> Params for [Named<'_>; N] {
    fn bind_to(self, stmt: &mut Statement<'_>) -> DbResult<()> {
        self.as_slice().bind_to(stmt)
    }
}

macro_rules! tuple_params {
    ($($name:ident : $idx:tt),+) => {
        impl<$($name: ToSql),+> Params for ($($name,)+) {
            fn bind_to(self, stmt: &mut Statement<'_>) -> DbResult<()> {
                $(stmt.bind_at($idx + 1, &self.$idx)?;)+
                Ok(())
            }
        }
    };
}

tuple_params!(A: 0);
tuple_params!(A: 0, B: 1);
tuple_params!(A: 0, B: 1, C: 2);
tuple_params!(A: 0, B: 1, C: 2, D: 3);
tuple_params!(A: 0, B: 1, C: 2, D: 3, E: 4);
tuple_params!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5);
tuple_params!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6);
tuple_params!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7);
tuple_params!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7, I: 8);
tuple_params!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7, I: 8, J: 9);
tuple_params!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7, I: 8, J: 9, K: 10);
tuple_params!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7, I: 8, J: 9, K: 10, L: 11);

/// Builds a positional parameter list.
///
/// Usage: `params![1_i64, "text", None::<f64>]`
#[macro_export]
macro_rules! params {
    ($($val:expr),* $(,)?) => {
        &[$(&$val as &dyn $crate::ToSql),*] as &[&dyn $crate::ToSql]
    };
}

/// Builds a named parameter list.
///
/// Usage: `named_params! { ":id" => 1_i64, ":name" => "x" }`
#[macro_export]
macro_rules! named_params {
    ($($name:expr => $val:expr),* $(,)?) => {
        &[$($crate::Named::new($name, &$val as &dyn $crate::ToSql)),*] as &[$crate::Named<'_>]
    };
}
