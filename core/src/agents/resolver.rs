//! Per-call provider resolution.
//!
//! Stored user preferences win when they can be read and name an enabled
//! provider. Any failure along the way degrades to the environment defaults
//! with fallback enabled, so [`ProviderResolver::resolve`] never fails.

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::json;

use super::config::GatewayConfig;
use crate::errors::{Result, StoryError};
use crate::logging::{EventLevel, EventSink, LogEvent};
use crate::settings::{
    KeyValueStore, PreferenceLoader, ProviderPreferences, SettingsStore, USER_ID_KEY,
};

/// Provider order and tuning for a single gateway call.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub providers: Vec<String>,
    pub enable_fallback: bool,
    /// Model requested by the user for the first provider.
    pub selected_model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl ResolvedConfig {
    pub fn defaults(config: &GatewayConfig) -> Self {
        Self {
            providers: config.enabled_ids(),
            enable_fallback: true,
            selected_model: None,
            temperature: None,
            max_tokens: None,
        }
    }

    /// Providers the executor may attempt, honouring the fallback gate.
    pub fn candidates(&self) -> &[String] {
        if self.enable_fallback {
            &self.providers
        } else {
            &self.providers[..self.providers.len().min(1)]
        }
    }
}

#[derive(Clone)]
pub struct ProviderResolver {
    store: Arc<dyn SettingsStore>,
    config: Arc<GatewayConfig>,
    events: Arc<dyn EventSink>,
}

impl ProviderResolver {
    pub fn new(
        store: Arc<dyn SettingsStore>,
        config: Arc<GatewayConfig>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            store,
            config,
            events,
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn shared_config(&self) -> Arc<GatewayConfig> {
        self.config.clone()
    }

    pub async fn resolve(&self) -> ResolvedConfig {
        match self.from_preferences().await {
            Ok(resolved) => resolved,
            Err(err) => {
                let defaults = ResolvedConfig::defaults(&self.config);
                self.events.record(
                    LogEvent::new(
                        EventLevel::Warn,
                        "ai.resolver",
                        "Falling back to default AI providers",
                    )
                    .code("AI-0101")
                    .explain("User preferences could not be applied")
                    .data(json!({
                        "reason": err.to_string(),
                        "providers": defaults.providers,
                    })),
                );
                defaults
            }
        }
    }

    async fn from_preferences(&self) -> Result<ResolvedConfig> {
        let user_id = self
            .store
            .get(USER_ID_KEY)
            .await?
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| StoryError::Configuration("No signed-in user".into()))?;
        let prefs = self.store.load_preferences(&user_id).await?;
        self.apply(prefs)
    }

    fn apply(&self, prefs: ProviderPreferences) -> Result<ResolvedConfig> {
        let selected = prefs.selected_provider.trim().to_ascii_lowercase();
        if !self.config.is_enabled(&selected) {
            return Err(StoryError::Configuration(format!(
                "Selected AI provider `{selected}` is not enabled"
            )));
        }

        let mut seen = HashSet::from([selected.clone()]);
        let mut providers = vec![selected];
        for fallback in &prefs.fallback_providers {
            let id = fallback.trim().to_ascii_lowercase();
            if !self.config.is_enabled(&id) {
                log::debug!("skipping disabled fallback provider `{id}`");
                continue;
            }
            if seen.insert(id.clone()) {
                providers.push(id);
            }
        }

        Ok(ResolvedConfig {
            providers,
            enable_fallback: prefs.auto_fallback,
            selected_model: prefs.selected_model.filter(|m| !m.trim().is_empty()),
            temperature: Some(prefs.temperature),
            max_tokens: Some(prefs.max_tokens),
        })
    }
}
