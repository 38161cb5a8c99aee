//! DB rows for the saved-items cache.

use diesel::prelude::*;

use crate::schema::saved_items_cache;

/// One row per entity kind: the whole record list serialized as JSON.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = saved_items_cache)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SavedItemsCacheDB {
    pub entity_kind: String,
    pub payload: String,
    pub updated_at: String,
}
