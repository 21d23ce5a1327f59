use serde::{Deserialize, Serialize};

/// Per-user AI provider preferences as saved by the settings screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderPreferences {
    pub selected_provider: String,
    pub selected_model: Option<String>,
    pub fallback_providers: Vec<String>,
    pub auto_fallback: bool,
    pub temperature: f32,
    pub max_tokens: u32,
    pub monthly_budget: Option<f64>,
    pub cost_optimization: bool,
    pub auto_routing: bool,
}

impl Default for ProviderPreferences {
    fn default() -> Self {
        Self {
            selected_provider: String::new(),
            selected_model: None,
            fallback_providers: Vec::new(),
            auto_fallback: true,
            temperature: 0.7,
            max_tokens: 2000,
            monthly_budget: None,
            cost_optimization: false,
            auto_routing: false,
        }
    }
}
