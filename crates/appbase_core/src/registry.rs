//! Catalogue of persistable entity types.
//!
//! # Responsibility
//! - Record every entity type the store may sync and query.
//! - Reject registrations that would produce an ambiguous or invalid schema.
//!
//! # Invariants
//! - One type name maps to exactly one Rust type.
//! - The registry is built before a store opens and is read-only afterwards;
//!   `Store::new` takes ownership of it.

use crate::model::base::BASE_COLUMNS;
use crate::model::entity::{Column, Entity};
use crate::model::naming;
use log::debug;
use std::any::TypeId;
use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Registration errors. All of them indicate a configuration bug.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A different Rust type is already registered under this name.
    NameConflict(&'static str),
    /// The derived table or a column name is not a plain lower-case identifier.
    InvalidIdentifier {
        type_name: &'static str,
        identifier: String,
    },
    /// A field reuses one of the base model column names.
    ReservedColumn {
        type_name: &'static str,
        column: &'static str,
    },
    DuplicateColumn {
        type_name: &'static str,
        column: &'static str,
    },
}

impl Display for RegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NameConflict(name) => {
                write!(f, "model name `{name}` is already registered for another type")
            }
            Self::InvalidIdentifier {
                type_name,
                identifier,
            } => write!(f, "model `{type_name}` uses invalid identifier `{identifier}`"),
            Self::ReservedColumn { type_name, column } => {
                write!(f, "model `{type_name}` redefines base column `{column}`")
            }
            Self::DuplicateColumn { type_name, column } => {
                write!(f, "model `{type_name}` declares column `{column}` twice")
            }
        }
    }
}

impl Error for RegistryError {}

/// Registered shape of one entity type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelDescriptor {
    type_name: &'static str,
    type_id: TypeId,
    table_name: String,
    columns: &'static [Column],
}

impl ModelDescriptor {
    fn of<T: Entity>() -> Self {
        Self {
            type_name: T::TYPE_NAME,
            type_id: TypeId::of::<T>(),
            table_name: T::table_name(),
            columns: T::COLUMNS,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Entity-owned columns, excluding the base columns.
    pub fn columns(&self) -> &'static [Column] {
        self.columns
    }

    fn describes<T: Entity>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    fn validate(&self) -> Result<(), RegistryError> {
        if !naming::is_valid_identifier(&self.table_name) {
            return Err(RegistryError::InvalidIdentifier {
                type_name: self.type_name,
                identifier: self.table_name.clone(),
            });
        }

        let mut seen = BTreeSet::new();
        for column in self.columns {
            if BASE_COLUMNS.contains(&column.name) {
                return Err(RegistryError::ReservedColumn {
                    type_name: self.type_name,
                    column: column.name,
                });
            }
            if !naming::is_valid_identifier(column.name) {
                return Err(RegistryError::InvalidIdentifier {
                    type_name: self.type_name,
                    identifier: column.name.to_string(),
                });
            }
            if !seen.insert(column.name) {
                return Err(RegistryError::DuplicateColumn {
                    type_name: self.type_name,
                    column: column.name,
                });
            }
        }

        Ok(())
    }
}

/// Startup-built catalogue of persistable entity types.
#[derive(Debug, Default)]
pub struct ModelRegistry {
    models: BTreeMap<&'static str, ModelDescriptor>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers entity type `T`.
    ///
    /// Registering the same type again is a no-op.
    pub fn register<T: Entity>(&mut self) -> Result<(), RegistryError> {
        if let Some(existing) = self.models.get(T::TYPE_NAME) {
            if existing.describes::<T>() {
                return Ok(());
            }
            return Err(RegistryError::NameConflict(T::TYPE_NAME));
        }

        let descriptor = ModelDescriptor::of::<T>();
        descriptor.validate()?;
        debug!(
            "event=model_register module=registry status=ok model={} table={} columns={}",
            descriptor.type_name,
            descriptor.table_name,
            descriptor.columns.len()
        );
        self.models.insert(T::TYPE_NAME, descriptor);
        Ok(())
    }

    /// Builder-style [`register`](Self::register).
    pub fn with<T: Entity>(mut self) -> Result<Self, RegistryError> {
        self.register::<T>()?;
        Ok(self)
    }

    pub fn is_registered<T: Entity>(&self) -> bool {
        self.descriptor_for::<T>().is_some()
    }

    /// Returns the descriptor for `T`, ignoring same-named foreign types.
    pub fn descriptor_for<T: Entity>(&self) -> Option<&ModelDescriptor> {
        self.models
            .get(T::TYPE_NAME)
            .filter(|descriptor| descriptor.describes::<T>())
    }

    pub fn descriptor(&self, type_name: &str) -> Option<&ModelDescriptor> {
        self.models.get(type_name)
    }

    /// Descriptors sorted by type name.
    pub fn descriptors(&self) -> impl Iterator<Item = &ModelDescriptor> {
        self.models.values()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{ModelRegistry, RegistryError};
    use crate::model::base::BaseModel;
    use crate::model::entity::{Column, Entity};
    use rusqlite::{Row, ToSql};

    crate::entity! {
        struct Note {
            title: String,
        }
    }

    mod shadow {
        crate::entity! {
            pub struct Note {
                pub body: String,
            }
        }
    }

    #[derive(Default)]
    struct Broken {
        base: BaseModel,
        id: i64,
    }

    impl Entity for Broken {
        const TYPE_NAME: &'static str = "Broken";
        const COLUMNS: &'static [Column] = &[Column::of::<i64>("id")];

        fn base(&self) -> &BaseModel {
            &self.base
        }

        fn base_mut(&mut self) -> &mut BaseModel {
            &mut self.base
        }

        fn field_values(&self) -> Vec<&dyn ToSql> {
            vec![&self.id]
        }

        fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
            Ok(Self {
                base: BaseModel::from_row(row)?,
                id: row.get("id")?,
            })
        }
    }

    #[test]
    fn register_is_idempotent_for_same_type() {
        let mut registry = ModelRegistry::new();
        registry.register::<Note>().unwrap();
        registry.register::<Note>().unwrap();

        assert_eq!(registry.len(), 1);
        assert!(registry.is_registered::<Note>());
        assert_eq!(registry.descriptor("Note").unwrap().table_name(), "note");
    }

    #[test]
    fn register_rejects_second_type_under_same_name() {
        let mut registry = ModelRegistry::new();
        registry.register::<Note>().unwrap();

        let err = registry.register::<shadow::Note>().unwrap_err();
        assert_eq!(err, RegistryError::NameConflict("Note"));
        assert!(!registry.is_registered::<shadow::Note>());
        assert!(registry.is_registered::<Note>());
    }

    #[test]
    fn register_rejects_base_column_reuse() {
        let mut registry = ModelRegistry::new();
        let err = registry.register::<Broken>().unwrap_err();
        assert!(matches!(
            err,
            RegistryError::ReservedColumn {
                type_name: "Broken",
                column: "id"
            }
        ));
        assert!(registry.is_empty());
    }
}
