//! Model catalog: which concrete model a provider serves for each
//! complexity tier.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::providers::PROVIDER_SEEDS;
use crate::errors::{Result, StoryError};

/// Coarse request tier used to pick a model variant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Fast,
    #[default]
    Standard,
    Advanced,
}

impl Complexity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Standard => "standard",
            Self::Advanced => "advanced",
        }
    }
}

impl fmt::Display for Complexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Complexity {
    type Err = StoryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fast" => Ok(Self::Fast),
            "standard" => Ok(Self::Standard),
            "advanced" => Ok(Self::Advanced),
            other => Err(StoryError::Configuration(format!(
                "Unknown complexity tier: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
struct TierModels {
    fast: String,
    standard: String,
    advanced: String,
}

impl TierModels {
    fn get(&self, complexity: Complexity) -> &str {
        match complexity {
            Complexity::Fast => &self.fast,
            Complexity::Standard => &self.standard,
            Complexity::Advanced => &self.advanced,
        }
    }
}

/// Immutable `(provider, tier) -> model id` table.
#[derive(Debug, Clone)]
pub struct ModelCatalog {
    entries: HashMap<String, TierModels>,
}

impl ModelCatalog {
    pub fn builtin() -> Self {
        let entries = PROVIDER_SEEDS
            .iter()
            .map(|seed| {
                (
                    seed.id.to_string(),
                    TierModels {
                        fast: seed.fast.to_string(),
                        standard: seed.standard.to_string(),
                        advanced: seed.advanced.to_string(),
                    },
                )
            })
            .collect();
        Self { entries }
    }

    /// Bare model id, without the provider prefix.
    pub fn model_id(&self, provider: &str, complexity: Complexity) -> Option<&str> {
        self.entries.get(provider).map(|m| m.get(complexity))
    }

    /// Fully qualified `provider/model-id` for an enabled provider.
    pub fn model_name(
        &self,
        enabled: &[String],
        provider: &str,
        complexity: Complexity,
    ) -> Result<String> {
        if !enabled.iter().any(|p| p == provider) {
            return Err(StoryError::Configuration(format!(
                "AI provider `{provider}` is not enabled"
            )));
        }
        let model = self.model_id(provider, complexity).ok_or_else(|| {
            StoryError::Configuration(format!("No models catalogued for provider `{provider}`"))
        })?;
        Ok(format!("{provider}/{model}"))
    }
}

impl Default for ModelCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Split a `provider/model-id` name. Names without a prefix are returned
/// as-is with no provider.
pub fn split_model_name(name: &str) -> (Option<&str>, &str) {
    match name.split_once('/') {
        Some((provider, model)) => (Some(provider), model),
        None => (None, name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enabled(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn anthropic_fast_maps_to_haiku() {
        let catalog = ModelCatalog::builtin();
        let name = catalog
            .model_name(&enabled(&["anthropic"]), "anthropic", Complexity::Fast)
            .unwrap();
        assert_eq!(name, "anthropic/claude-3-haiku-20240307");
    }

    #[test]
    fn default_tier_is_standard() {
        let catalog = ModelCatalog::builtin();
        let name = catalog
            .model_name(&enabled(&["openai"]), "openai", Complexity::default())
            .unwrap();
        assert_eq!(name, "openai/gpt-4o");
    }

    #[test]
    fn disabled_provider_is_a_configuration_error() {
        let catalog = ModelCatalog::builtin();
        let err = catalog
            .model_name(&enabled(&["openai"]), "disabled_provider", Complexity::Fast)
            .unwrap_err();
        assert!(err.is_configuration());

        let err = catalog
            .model_name(&enabled(&["openai"]), "anthropic", Complexity::Fast)
            .unwrap_err();
        assert!(err.to_string().contains("anthropic"));
    }

    #[test]
    fn enabled_but_uncatalogued_provider_fails() {
        let catalog = ModelCatalog::builtin();
        let err = catalog
            .model_name(&enabled(&["lmstudio"]), "lmstudio", Complexity::Fast)
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn complexity_parses_case_insensitively() {
        assert_eq!("FAST".parse::<Complexity>().unwrap(), Complexity::Fast);
        assert_eq!(" advanced ".parse::<Complexity>().unwrap(), Complexity::Advanced);
        assert!("turbo".parse::<Complexity>().is_err());
    }

    #[test]
    fn split_keeps_colons_in_local_model_ids() {
        assert_eq!(
            split_model_name("ollama/llama3.1:8b"),
            (Some("ollama"), "llama3.1:8b")
        );
        assert_eq!(split_model_name("gpt-4o"), (None, "gpt-4o"));
    }
}
