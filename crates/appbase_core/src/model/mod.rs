//! Entity contract shared by every persisted type.
//!
//! # Responsibility
//! - Define the base columns (`id`, `created_at`, `updated_at`) every entity embeds.
//! - Describe entity fields as SQLite columns for schema sync and row mapping.
//!
//! # Invariants
//! - `id == 0` means the entity has never been persisted.
//! - Table and column names are lower-case snake_case identifiers.

pub mod base;
pub mod entity;
pub mod naming;
