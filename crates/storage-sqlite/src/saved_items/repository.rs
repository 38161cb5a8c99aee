//! SQLite-backed persistence for the saved-items cache.

use std::sync::Arc;

use chrono::Utc;
use diesel::prelude::*;

use studyshelf_core::saved_items::{CachePersistence, EntityKind, SavedItemRecord};
use studyshelf_core::Result as CoreResult;

use crate::db::{get_connection, DbPool};
use crate::errors::Result;
use crate::saved_items::model::SavedItemsCacheDB;
use crate::schema::saved_items_cache;
use crate::schema::saved_items_cache::dsl::*;

const CREATE_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS saved_items_cache (\
     entity_kind TEXT PRIMARY KEY NOT NULL,\
     payload TEXT NOT NULL,\
     updated_at TEXT NOT NULL\
 )";

/// Repository for the per-kind serialized saved-item lists.
pub struct SavedItemsCacheRepository {
    pool: Arc<DbPool>,
}

impl SavedItemsCacheRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        SavedItemsCacheRepository { pool }
    }

    /// Create the cache table when it does not exist yet. Called once at
    /// session construction.
    pub fn ensure_schema(&self) -> Result<()> {
        let mut conn = get_connection(&self.pool)?;
        diesel::sql_query(CREATE_TABLE_SQL).execute(&mut conn)?;
        Ok(())
    }

    fn load_impl(&self, kind: EntityKind) -> Result<Option<Vec<SavedItemRecord>>> {
        let mut conn = get_connection(&self.pool)?;
        let row = saved_items_cache
            .find(kind.as_str())
            .select(SavedItemsCacheDB::as_select())
            .first::<SavedItemsCacheDB>(&mut conn)
            .optional()?;

        match row {
            Some(row) => Ok(Some(serde_json::from_str(&row.payload)?)),
            None => Ok(None),
        }
    }

    fn store_impl(&self, kind: EntityKind, records: &[SavedItemRecord]) -> Result<()> {
        let row = SavedItemsCacheDB {
            entity_kind: kind.as_str().to_string(),
            payload: serde_json::to_string(records)?,
            updated_at: Utc::now().to_rfc3339(),
        };
        let mut conn = get_connection(&self.pool)?;
        diesel::replace_into(saved_items_cache::table)
            .values(&row)
            .execute(&mut conn)?;
        Ok(())
    }

    fn clear_impl(&self) -> Result<()> {
        let mut conn = get_connection(&self.pool)?;
        diesel::delete(saved_items_cache::table).execute(&mut conn)?;
        Ok(())
    }
}

impl CachePersistence for SavedItemsCacheRepository {
    fn load(&self, kind: EntityKind) -> CoreResult<Option<Vec<SavedItemRecord>>> {
        Ok(self.load_impl(kind)?)
    }

    fn store(&self, kind: EntityKind, records: &[SavedItemRecord]) -> CoreResult<()> {
        Ok(self.store_impl(kind, records)?)
    }

    fn clear(&self) -> CoreResult<()> {
        Ok(self.clear_impl()?)
    }
}
