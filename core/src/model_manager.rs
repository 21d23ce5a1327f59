//! High level AI model manager that routes chat completions through the
//! configured providers with graceful fallbacks and structured logging.
//!
//! The manager hides preference lookup, model selection and fallback from
//! callers so that feature code can simply request a completion at a
//! complexity tier without caring which backend ultimately fulfils it.

use std::sync::Arc;

use anyhow::anyhow;

use crate::agents::catalog::split_model_name;
use crate::agents::{
    AiChatInput, AiChatResponse, ChatBackend, Complexity, FallbackExecutor, GatewayConfig,
    ResolvedConfig,
};
use crate::errors::Result;

/// Wrapper that owns the chat backend alongside provider resolution.
#[derive(Clone)]
pub struct ModelManager {
    config: Arc<GatewayConfig>,
    executor: FallbackExecutor,
    backend: Arc<dyn ChatBackend>,
}

impl ModelManager {
    pub fn new(executor: FallbackExecutor, backend: Arc<dyn ChatBackend>) -> Arc<Self> {
        let config = executor.resolver().shared_config();
        Arc::new(Self {
            config,
            executor,
            backend,
        })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Provider order and tuning that the next call would use.
    pub async fn resolve_providers(&self) -> ResolvedConfig {
        self.executor.resolver().resolve().await
    }

    /// Fully qualified `provider/model-id` for an enabled provider.
    pub fn model_name(&self, provider: &str, complexity: Complexity) -> Result<String> {
        self.config.model_name(provider, complexity)
    }

    /// Execute a chat completion, falling back across providers. The user's
    /// selected model only applies to their selected (first) provider, and
    /// only when its `provider/` prefix is absent or names that provider.
    /// Otherwise the provider gets its catalog model for `complexity`.
    pub async fn chat(&self, input: AiChatInput, complexity: Complexity) -> Result<AiChatResponse> {
        let resolved = self.resolve_providers().await;

        let mut input = input;
        input.temperature = input.temperature.or(resolved.temperature);
        input.max_tokens = input.max_tokens.or(resolved.max_tokens);
        let input = Arc::new(input);

        let primary = resolved.providers.first().cloned();
        let selected_model = resolved.selected_model.clone();

        let operation = |provider: String| {
            let config = self.config.clone();
            let backend = self.backend.clone();
            let input = input.clone();
            let preferred = selected_model
                .as_deref()
                .filter(|_| primary.as_deref() == Some(provider.as_str()))
                .and_then(|model| match split_model_name(model) {
                    (Some(owner), _) if owner != provider => {
                        log::debug!(
                            "ignoring selected model `{model}` for provider `{provider}`"
                        );
                        None
                    }
                    (_, id) => Some(id.to_string()),
                });
            async move {
                let model = match preferred {
                    Some(model) => model,
                    None => {
                        let name = config.model_name(&provider, complexity)?;
                        split_model_name(&name).1.to_string()
                    }
                };
                let endpoint = config
                    .endpoint(&provider)
                    .ok_or_else(|| anyhow!("AI provider `{provider}` is not enabled"))?;
                backend.chat(endpoint, &model, &input).await
            }
        };

        self.executor
            .execute_resolved(&resolved, operation, "chat")
            .await
    }
}
