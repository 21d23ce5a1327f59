//! Built-in provider seeds.

pub struct ProviderSeed {
    pub id: &'static str,
    pub kind: &'static str,
    pub display: &'static str,
    pub base_url: &'static str,
    pub api_key_env: Option<&'static str>,
    pub fast: &'static str,
    pub standard: &'static str,
    pub advanced: &'static str,
}

pub const PROVIDER_SEEDS: &[ProviderSeed] = &[
    ProviderSeed {
        id: "openai",
        kind: "cloud",
        display: "OpenAI",
        base_url: "https://api.openai.com",
        api_key_env: Some("OPENAI_API_KEY"),
        fast: "gpt-4o-mini",
        standard: "gpt-4o",
        advanced: "gpt-4-turbo",
    },
    ProviderSeed {
        id: "anthropic",
        kind: "cloud",
        display: "Anthropic",
        base_url: "https://api.anthropic.com",
        api_key_env: Some("ANTHROPIC_API_KEY"),
        fast: "claude-3-haiku-20240307",
        standard: "claude-3-5-sonnet-20241022",
        advanced: "claude-3-opus-20240229",
    },
    ProviderSeed {
        id: "google",
        kind: "cloud",
        display: "Google Gemini",
        base_url: "https://generativelanguage.googleapis.com/v1beta",
        api_key_env: Some("GOOGLE_API_KEY"),
        fast: "gemini-1.5-flash",
        standard: "gemini-1.5-pro",
        advanced: "gemini-1.5-pro",
    },
    ProviderSeed {
        id: "ollama",
        kind: "local",
        display: "Ollama",
        base_url: "http://127.0.0.1:11434",
        api_key_env: None,
        fast: "llama3.2:3b",
        standard: "llama3.1:8b",
        advanced: "llama3.1:70b",
    },
];

pub fn seed(id: &str) -> Option<&'static ProviderSeed> {
    PROVIDER_SEEDS.iter().find(|s| s.id == id)
}
