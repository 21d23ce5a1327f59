//! Sequential provider fallback.
//!
//! Providers are attempted one at a time in resolved order. The first success
//! wins; each failure is logged and the loop advances while fallback is
//! enabled. Only exhausting the list is fatal.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use super::resolver::{ProviderResolver, ResolvedConfig};
use crate::errors::{ProviderFailure, Result, StoryError};
use crate::logging::{EventLevel, EventSink, LogEvent};

#[derive(Clone)]
pub struct FallbackExecutor {
    resolver: ProviderResolver,
    events: Arc<dyn EventSink>,
    attempt_timeout: Option<Duration>,
}

impl FallbackExecutor {
    pub fn new(resolver: ProviderResolver, events: Arc<dyn EventSink>) -> Self {
        let attempt_timeout = resolver.config().attempt_timeout;
        Self {
            resolver,
            events,
            attempt_timeout,
        }
    }

    /// Override the per-attempt deadline; `None` lets attempts run unbounded.
    pub fn with_attempt_timeout(mut self, attempt_timeout: Option<Duration>) -> Self {
        self.attempt_timeout = attempt_timeout;
        self
    }

    pub fn resolver(&self) -> &ProviderResolver {
        &self.resolver
    }

    /// Resolve the provider list for this call, then run `operation` against
    /// it until one provider succeeds.
    pub async fn execute_with_fallback<T, F, Fut>(
        &self,
        operation: F,
        operation_name: &str,
    ) -> Result<T>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let resolved = self.resolver.resolve().await;
        self.execute_resolved(&resolved, operation, operation_name)
            .await
    }

    pub async fn execute_resolved<T, F, Fut>(
        &self,
        resolved: &ResolvedConfig,
        mut operation: F,
        operation_name: &str,
    ) -> Result<T>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let candidates = resolved.candidates();
        if candidates.is_empty() {
            self.events.record(
                LogEvent::new(EventLevel::Error, "ai.runtime", "No AI providers configured")
                    .code("CFG-1001")
                    .data(json!({ "operation": operation_name })),
            );
            return Err(StoryError::Configuration(
                "No AI providers configured".into(),
            ));
        }

        let mut failures = Vec::with_capacity(candidates.len());
        for (index, provider) in candidates.iter().enumerate() {
            let attempt = index + 1;
            match self.attempt(provider, &mut operation).await {
                Ok(value) => {
                    self.events.record(
                        LogEvent::new(EventLevel::Info, "ai.runtime", "AI provider succeeded")
                            .code("AI-0200")
                            .data(json!({
                                "operation": operation_name,
                                "provider": provider,
                                "attempt": attempt,
                            })),
                    );
                    return Ok(value);
                }
                Err(message) => {
                    let remaining = candidates.len() - attempt;
                    let mut event =
                        LogEvent::new(EventLevel::Warn, "ai.runtime", "AI provider failed")
                            .code("AI-0201")
                            .data(json!({
                                "operation": operation_name,
                                "provider": provider,
                                "attempt": attempt,
                                "remaining": remaining,
                                "error": message,
                            }));
                    if remaining > 0 {
                        event = event.explain("Attempting fallback");
                    }
                    self.events.record(event);
                    failures.push(ProviderFailure {
                        provider: provider.clone(),
                        message,
                    });
                }
            }
        }

        self.events.record(
            LogEvent::new(EventLevel::Error, "ai.runtime", "All AI providers failed")
                .code("AI-0202")
                .data(json!({
                    "operation": operation_name,
                    "attempts": failures.len(),
                    "providers": failures.iter().map(|f| f.provider.as_str()).collect::<Vec<_>>(),
                })),
        );
        Err(StoryError::AllProvidersFailed {
            operation: operation_name.to_string(),
            failures,
        })
    }

    async fn attempt<T, F, Fut>(
        &self,
        provider: &str,
        operation: &mut F,
    ) -> std::result::Result<T, String>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let call = operation(provider.to_string());
        let outcome = match self.attempt_timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(outcome) => outcome,
                Err(_) => return Err(format!("timed out after {limit:?}")),
            },
            None => call.await,
        };
        outcome.map_err(|err| format!("{err:#}"))
    }
}
