//! Environment-derived gateway configuration.
//!
//! `STORYLOOM_AI_PROVIDERS` lists enabled providers in priority order. When it
//! is unset, every cloud provider with an API key present is enabled in seed
//! order, followed by Ollama when `OLLAMA_BASE_URL` is set.

use std::collections::HashSet;
use std::time::Duration;

use super::catalog::{Complexity, ModelCatalog};
use super::providers::{seed, ProviderSeed, PROVIDER_SEEDS};
use crate::errors::Result;

pub const ENV_PROVIDERS: &str = "STORYLOOM_AI_PROVIDERS";
pub const ENV_TIMEOUT_SECS: &str = "STORYLOOM_AI_TIMEOUT_SECS";
const DEFAULT_TIMEOUT_SECS: u64 = 45;

/// Runtime view of one enabled provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderEndpoint {
    pub id: String,
    pub kind: String,
    pub display_name: String,
    pub base_url: String,
    pub api_key: Option<String>,
}

impl ProviderEndpoint {
    fn from_seed(seed: &ProviderSeed, lookup: &impl Fn(&str) -> Option<String>) -> Self {
        let base_url = lookup(&base_url_env(seed.id)).unwrap_or_else(|| seed.base_url.to_string());
        Self {
            id: seed.id.to_string(),
            kind: seed.kind.to_string(),
            display_name: seed.display.to_string(),
            base_url,
            api_key: seed.api_key_env.and_then(|key| lookup(key)),
        }
    }

    pub fn is_local(&self) -> bool {
        self.kind == "local"
    }
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub providers: Vec<ProviderEndpoint>,
    pub attempt_timeout: Option<Duration>,
    pub catalog: ModelCatalog,
}

impl GatewayConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let providers = match lookup(ENV_PROVIDERS) {
            Some(list) => explicit_providers(&list, &lookup),
            None => detected_providers(&lookup),
        };

        let attempt_timeout = match lookup(ENV_TIMEOUT_SECS).map(|v| v.trim().parse::<u64>()) {
            Some(Ok(0)) => None,
            Some(Ok(secs)) => Some(Duration::from_secs(secs)),
            Some(Err(_)) => {
                log::warn!("ignoring invalid {ENV_TIMEOUT_SECS}; using {DEFAULT_TIMEOUT_SECS}s");
                Some(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            }
            None => Some(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
        };

        Self {
            providers,
            attempt_timeout,
            catalog: ModelCatalog::builtin(),
        }
    }

    /// Enabled provider ids in priority order.
    pub fn enabled_ids(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.id.clone()).collect()
    }

    pub fn is_enabled(&self, provider: &str) -> bool {
        self.providers.iter().any(|p| p.id == provider)
    }

    pub fn endpoint(&self, provider: &str) -> Option<&ProviderEndpoint> {
        self.providers.iter().find(|p| p.id == provider)
    }

    pub fn model_name(&self, provider: &str, complexity: Complexity) -> Result<String> {
        self.catalog
            .model_name(&self.enabled_ids(), provider, complexity)
    }
}

fn base_url_env(id: &str) -> String {
    format!("{}_BASE_URL", id.to_ascii_uppercase())
}

fn explicit_providers(
    list: &str,
    lookup: &impl Fn(&str) -> Option<String>,
) -> Vec<ProviderEndpoint> {
    let mut seen = HashSet::new();
    let mut providers = Vec::new();
    for id in list.split(',').map(|s| s.trim().to_ascii_lowercase()) {
        if id.is_empty() || !seen.insert(id.clone()) {
            continue;
        }
        match seed(&id) {
            Some(seed) => providers.push(ProviderEndpoint::from_seed(seed, lookup)),
            None => log::warn!("ignoring unknown AI provider `{id}` in {ENV_PROVIDERS}"),
        }
    }
    providers
}

fn detected_providers(lookup: &impl Fn(&str) -> Option<String>) -> Vec<ProviderEndpoint> {
    let mut providers: Vec<ProviderEndpoint> = PROVIDER_SEEDS
        .iter()
        .filter(|s| s.kind == "cloud")
        .filter(|s| s.api_key_env.and_then(|key| lookup(key)).is_some())
        .map(|s| ProviderEndpoint::from_seed(s, lookup))
        .collect();
    providers.extend(
        PROVIDER_SEEDS
            .iter()
            .filter(|s| s.kind == "local")
            .filter(|s| lookup(&base_url_env(s.id)).is_some())
            .map(|s| ProviderEndpoint::from_seed(s, lookup)),
    );
    providers
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn explicit_list_keeps_order_and_drops_unknown_ids() {
        let config = GatewayConfig::from_lookup(vars(&[
            (ENV_PROVIDERS, "Anthropic, mystery, openai, anthropic"),
            ("ANTHROPIC_API_KEY", "sk-ant"),
        ]));
        assert_eq!(config.enabled_ids(), vec!["anthropic", "openai"]);
        assert_eq!(
            config.endpoint("anthropic").unwrap().api_key.as_deref(),
            Some("sk-ant")
        );
        assert!(config.endpoint("openai").unwrap().api_key.is_none());
    }

    #[test]
    fn detection_enables_cloud_providers_with_keys_then_local() {
        let config = GatewayConfig::from_lookup(vars(&[
            ("GOOGLE_API_KEY", "g"),
            ("OPENAI_API_KEY", "o"),
            ("ANTHROPIC_API_KEY", "  "),
            ("OLLAMA_BASE_URL", "http://gpu-box:11434"),
        ]));
        assert_eq!(config.enabled_ids(), vec!["openai", "google", "ollama"]);
        let ollama = config.endpoint("ollama").unwrap();
        assert!(ollama.is_local());
        assert_eq!(ollama.base_url, "http://gpu-box:11434");
    }

    #[test]
    fn empty_environment_enables_nothing() {
        let config = GatewayConfig::from_lookup(vars(&[]));
        assert!(config.providers.is_empty());
        assert_eq!(config.attempt_timeout, Some(Duration::from_secs(45)));
    }

    #[test]
    fn timeout_zero_disables_and_garbage_falls_back() {
        let config = GatewayConfig::from_lookup(vars(&[(ENV_TIMEOUT_SECS, "0")]));
        assert_eq!(config.attempt_timeout, None);
        let config = GatewayConfig::from_lookup(vars(&[(ENV_TIMEOUT_SECS, "soon")]));
        assert_eq!(config.attempt_timeout, Some(Duration::from_secs(45)));
        let config = GatewayConfig::from_lookup(vars(&[(ENV_TIMEOUT_SECS, "5")]));
        assert_eq!(config.attempt_timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn model_name_respects_enabled_set() {
        let config = GatewayConfig::from_lookup(vars(&[(ENV_PROVIDERS, "anthropic")]));
        assert_eq!(
            config.model_name("anthropic", Complexity::Fast).unwrap(),
            "anthropic/claude-3-haiku-20240307"
        );
        assert!(config.model_name("openai", Complexity::Fast).is_err());
    }
}
