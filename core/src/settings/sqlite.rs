//! `app_settings`-backed implementation of the settings capabilities.

use async_trait::async_trait;
use r2d2_sqlite::rusqlite::{params, Connection, OptionalExtension};
use time::OffsetDateTime;
use tokio::task::spawn_blocking;

use super::{preferences_key, KeyValueStore, PreferenceLoader, ProviderPreferences, USER_ID_KEY};
use crate::db::DbPool;
use crate::errors::{Result, StoryError};

#[derive(Clone)]
pub struct SqliteSettings {
    pool: DbPool,
}

impl SqliteSettings {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn put(&self, key: &str, value: &str) -> Result<()> {
        let pool = self.pool.clone();
        let key = key.to_string();
        let value = value.to_string();
        spawn_blocking(move || {
            let conn = pool.get()?;
            write_setting(&conn, &key, &value)
        })
        .await
        .map_err(|err| StoryError::Storage(err.to_string()))?
    }

    pub async fn set_user_id(&self, user_id: &str) -> Result<()> {
        self.put(USER_ID_KEY, user_id).await
    }

    pub async fn save_preferences(
        &self,
        user_id: &str,
        preferences: &ProviderPreferences,
    ) -> Result<()> {
        let payload = serde_json::to_string(preferences)?;
        self.put(&preferences_key(user_id), &payload).await
    }
}

#[async_trait]
impl KeyValueStore for SqliteSettings {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let pool = self.pool.clone();
        let key = key.to_string();
        spawn_blocking(move || {
            let conn = pool.get()?;
            read_setting(&conn, &key)
        })
        .await
        .map_err(|err| StoryError::Storage(err.to_string()))?
    }
}

#[async_trait]
impl PreferenceLoader for SqliteSettings {
    async fn load_preferences(&self, user_id: &str) -> Result<ProviderPreferences> {
        let raw = self
            .get(&preferences_key(user_id))
            .await?
            .ok_or_else(|| StoryError::PreferencesNotFound(user_id.to_string()))?;
        Ok(serde_json::from_str(&raw)?)
    }
}

pub fn read_setting(conn: &Connection, key: &str) -> Result<Option<String>> {
    let value = conn
        .query_row(
            "SELECT value FROM app_settings WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value)
}

pub fn write_setting(conn: &Connection, key: &str, value: &str) -> Result<()> {
    let now = OffsetDateTime::now_utc().unix_timestamp();
    conn.execute(
        "INSERT INTO app_settings (key, value, updated_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        params![key, value, now],
    )?;
    Ok(())
}
