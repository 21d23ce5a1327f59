//! Persisted user settings.
//!
//! The gateway only ever reads settings through the [`KeyValueStore`] and
//! [`PreferenceLoader`] capabilities so that the resolver can be exercised
//! without a real database.

pub mod memory;
pub mod preferences;
pub mod sqlite;

use async_trait::async_trait;

use crate::errors::Result;

pub use memory::MemorySettings;
pub use preferences::ProviderPreferences;
pub use sqlite::SqliteSettings;

/// Settings key holding the identifier of the signed-in user.
pub const USER_ID_KEY: &str = "auth.user_id";

/// Settings key under which a user's provider preferences are stored.
pub fn preferences_key(user_id: &str) -> String {
    format!("ai.preferences.{user_id}")
}

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
}

#[async_trait]
pub trait PreferenceLoader: Send + Sync {
    async fn load_preferences(&self, user_id: &str) -> Result<ProviderPreferences>;
}

/// Both capabilities the provider resolver needs.
pub trait SettingsStore: KeyValueStore + PreferenceLoader {}

impl<T: KeyValueStore + PreferenceLoader> SettingsStore for T {}
