//! Entity trait and column descriptors.
//!
//! # Responsibility
//! - Express "embeds the base model" as a trait bound checked at compile time.
//! - Describe entity fields so the store can sync schema and bind values.
//!
//! # Invariants
//! - `COLUMNS` lists entity-owned fields only, in the order `field_values`
//!   returns them.
//! - `from_row` reads columns by name, so select order does not matter.

use crate::model::base::{BaseModel, ModelId};
use crate::model::naming;
use rusqlite::{Row, ToSql};

/// SQLite storage class used for a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    Integer,
    Real,
    Text,
    Blob,
}

impl ColumnKind {
    pub fn sql_type(self) -> &'static str {
        match self {
            Self::Integer => "INTEGER",
            Self::Real => "REAL",
            Self::Text => "TEXT",
            Self::Blob => "BLOB",
        }
    }

    /// Literal used as column default so `NOT NULL` columns can be added to
    /// tables that already hold rows.
    pub fn zero_literal(self) -> &'static str {
        match self {
            Self::Integer => "0",
            Self::Real => "0.0",
            Self::Text => "''",
            Self::Blob => "X''",
        }
    }
}

/// One entity-owned column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
    pub nullable: bool,
}

impl Column {
    /// Describes a column holding values of field type `F`.
    pub const fn of<F: FieldType>(name: &'static str) -> Self {
        Self {
            name,
            kind: F::KIND,
            nullable: F::NULLABLE,
        }
    }

    /// Column definition fragment for `CREATE TABLE` / `ALTER TABLE ADD COLUMN`.
    pub fn definition_sql(&self) -> String {
        let name = naming::quote_ident(self.name);
        if self.nullable {
            format!("{name} {}", self.kind.sql_type())
        } else {
            format!(
                "{name} {} NOT NULL DEFAULT {}",
                self.kind.sql_type(),
                self.kind.zero_literal()
            )
        }
    }
}

/// Rust field types that map onto a SQLite column.
pub trait FieldType {
    const KIND: ColumnKind;
    const NULLABLE: bool = false;
}

macro_rules! impl_field_type {
    ($kind:ident => $($ty:ty),* $(,)?) => {
        $(
            impl FieldType for $ty {
                const KIND: ColumnKind = ColumnKind::$kind;
            }
        )*
    };
}

impl_field_type!(Integer => bool, i8, i16, i32, i64, u8, u16, u32);
impl_field_type!(Real => f32, f64);
impl_field_type!(Text => String);
impl_field_type!(Blob => Vec<u8>);

impl<T: FieldType> FieldType for Option<T> {
    const KIND: ColumnKind = T::KIND;
    const NULLABLE: bool = true;
}

/// A record type persistable by the store.
///
/// Implementors embed a [`BaseModel`] and expose it through `base`/`base_mut`.
/// `Default` supplies the zero-valued prototype used for new entities.
/// Most types implement this through [`entity!`](crate::entity).
pub trait Entity: Default + Sized + 'static {
    /// Unique registry key, normally the bare type name.
    const TYPE_NAME: &'static str;
    /// Entity-owned columns, excluding the base columns.
    const COLUMNS: &'static [Column];

    fn base(&self) -> &BaseModel;
    fn base_mut(&mut self) -> &mut BaseModel;

    /// Values for `COLUMNS`, in the same order.
    fn field_values(&self) -> Vec<&dyn ToSql>;

    /// Decodes one row selected with base and entity columns.
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;

    fn table_name() -> String {
        naming::table_name(Self::TYPE_NAME)
    }

    fn id(&self) -> ModelId {
        self.base().id
    }

    fn is_new(&self) -> bool {
        self.base().is_new()
    }
}

/// Declares an entity struct with an embedded `base: BaseModel` field and
/// implements [`Entity`] for it.
///
/// The generated struct derives `Debug`, `Clone`, `Default` and `PartialEq`;
/// further attributes are passed through.
///
/// ```ignore
/// appbase_core::entity! {
///     pub struct Widget {
///         pub name: String,
///         pub weight: Option<f64>,
///     }
/// }
/// ```
#[macro_export]
macro_rules! entity {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                $field_vis:vis $field:ident : $field_ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq)]
        $vis struct $name {
            pub base: $crate::BaseModel,
            $(
                $(#[$field_meta])*
                $field_vis $field: $field_ty,
            )*
        }

        impl $crate::Entity for $name {
            const TYPE_NAME: &'static str = stringify!($name);
            const COLUMNS: &'static [$crate::Column] = &[
                $( $crate::Column::of::<$field_ty>(stringify!($field)), )*
            ];

            fn base(&self) -> &$crate::BaseModel {
                &self.base
            }

            fn base_mut(&mut self) -> &mut $crate::BaseModel {
                &mut self.base
            }

            fn field_values(&self) -> ::std::vec::Vec<&dyn $crate::rusqlite::ToSql> {
                ::std::vec![ $( &self.$field as &dyn $crate::rusqlite::ToSql ),* ]
            }

            fn from_row(
                row: &$crate::rusqlite::Row<'_>,
            ) -> $crate::rusqlite::Result<Self> {
                ::std::result::Result::Ok(Self {
                    base: $crate::BaseModel::from_row(row)?,
                    $( $field: row.get(stringify!($field))?, )*
                })
            }
        }
    };
}
