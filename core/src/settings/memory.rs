use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use super::{preferences_key, KeyValueStore, PreferenceLoader, ProviderPreferences, USER_ID_KEY};
use crate::errors::{Result, StoryError};

/// Settings held in process memory.
#[derive(Default)]
pub struct MemorySettings {
    values: RwLock<HashMap<String, String>>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, key: impl Into<String>, value: impl Into<String>) -> Result<()> {
        let mut values = self
            .values
            .write()
            .map_err(|_| StoryError::Storage("settings lock poisoned".into()))?;
        values.insert(key.into(), value.into());
        Ok(())
    }

    pub fn set_user_id(&self, user_id: &str) -> Result<()> {
        self.put(USER_ID_KEY, user_id)
    }

    pub fn save_preferences(&self, user_id: &str, preferences: &ProviderPreferences) -> Result<()> {
        self.put(preferences_key(user_id), serde_json::to_string(preferences)?)
    }
}

#[async_trait]
impl KeyValueStore for MemorySettings {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let values = self
            .values
            .read()
            .map_err(|_| StoryError::Storage("settings lock poisoned".into()))?;
        Ok(values.get(key).cloned())
    }
}

#[async_trait]
impl PreferenceLoader for MemorySettings {
    async fn load_preferences(&self, user_id: &str) -> Result<ProviderPreferences> {
        let raw = self
            .get(&preferences_key(user_id))
            .await?
            .ok_or_else(|| StoryError::PreferencesNotFound(user_id.to_string()))?;
        Ok(serde_json::from_str(&raw)?)
    }
}
