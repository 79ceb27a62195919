//! Base model embedded by every entity.

use rusqlite::Row;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Store-assigned identity. `0` is reserved for unsaved entities.
pub type ModelId = i64;

pub const ID_COLUMN: &str = "id";
pub const CREATED_AT_COLUMN: &str = "created_at";
pub const UPDATED_AT_COLUMN: &str = "updated_at";

/// Columns owned by [`BaseModel`]; entity fields must not reuse these names.
pub const BASE_COLUMNS: &[&str] = &[ID_COLUMN, CREATED_AT_COLUMN, UPDATED_AT_COLUMN];

/// Identity and bookkeeping timestamps carried by every entity.
///
/// Timestamps are Unix epoch milliseconds assigned by the store on save.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BaseModel {
    pub id: ModelId,
    pub created_at: i64,
    pub updated_at: i64,
}

impl BaseModel {
    /// Returns whether this entity has never been persisted.
    pub fn is_new(&self) -> bool {
        self.id == 0
    }

    /// Reads the base columns from a row selected with the full column list.
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(ID_COLUMN)?,
            created_at: row.get(CREATED_AT_COLUMN)?,
            updated_at: row.get(UPDATED_AT_COLUMN)?,
        })
    }
}

/// Values accepted where an entity identity is expected.
///
/// Coercion yields `None` when the value has no numeric identity, e.g. a
/// non-decimal string or an integer outside the `i64` range.
pub trait IdLike {
    fn to_model_id(&self) -> Option<ModelId>;
}

macro_rules! impl_id_like_for_ints {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IdLike for $ty {
                fn to_model_id(&self) -> Option<ModelId> {
                    ModelId::try_from(*self).ok()
                }
            }
        )*
    };
}

impl_id_like_for_ints!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl IdLike for str {
    fn to_model_id(&self) -> Option<ModelId> {
        self.trim().parse::<ModelId>().ok()
    }
}

impl IdLike for String {
    fn to_model_id(&self) -> Option<ModelId> {
        self.as_str().to_model_id()
    }
}

impl<T: IdLike + ?Sized> IdLike for &T {
    fn to_model_id(&self) -> Option<ModelId> {
        (**self).to_model_id()
    }
}

impl<T: IdLike> IdLike for Option<T> {
    fn to_model_id(&self) -> Option<ModelId> {
        self.as_ref().and_then(IdLike::to_model_id)
    }
}

/// Current wall clock as Unix epoch milliseconds.
pub(crate) fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|elapsed| i64::try_from(elapsed.as_millis()).ok())
        .unwrap_or(0)
}
