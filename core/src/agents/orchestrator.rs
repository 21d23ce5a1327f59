use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::config::ProviderEndpoint;

const DEFAULT_TEMPERATURE: f32 = 0.7;
const DEFAULT_MAX_TOKENS: u32 = 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiChatMessage {
    pub role: String,
    pub content: String,
}

impl AiChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AiChatInput {
    pub messages: Vec<AiChatMessage>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiUsageMetrics {
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiChatResponse {
    pub provider_id: String,
    pub model: String,
    pub content: String,
    pub usage: Option<AiUsageMetrics>,
    pub raw: Value,
}

/// Something that can run one chat completion against one provider.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn chat(
        &self,
        endpoint: &ProviderEndpoint,
        model: &str,
        input: &AiChatInput,
    ) -> Result<AiChatResponse>;
}

fn missing_key(endpoint: &ProviderEndpoint) -> anyhow::Error {
    anyhow!("{} API key is not configured", endpoint.display_name)
}

/// HTTP client for the supported provider APIs.
pub struct AiOrchestrator {
    client: Client,
}

impl AiOrchestrator {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(45))
            .user_agent("Storyloom-Core/0.1")
            .build()
            .context("failed to construct HTTP client")?;
        Ok(Self { client })
    }

    async fn chat_openai(
        &self,
        endpoint: &ProviderEndpoint,
        model: &str,
        input: &AiChatInput,
    ) -> Result<AiChatResponse> {
        if endpoint.api_key.is_none() {
            return Err(missing_key(endpoint));
        }
        self.chat_openai_like(endpoint, model, input, true)
            .await
            .with_context(|| format!("{} request failed", endpoint.display_name))
    }

    async fn chat_openai_like(
        &self,
        endpoint: &ProviderEndpoint,
        model: &str,
        input: &AiChatInput,
        include_auth: bool,
    ) -> Result<AiChatResponse> {
        let url = format!(
            "{}/v1/chat/completions",
            endpoint.base_url.trim_end_matches('/')
        );
        let mut request = self.client.post(url);
        if include_auth {
            let secret = endpoint
                .api_key
                .as_ref()
                .ok_or_else(|| missing_key(endpoint))?;
            request = request.bearer_auth(secret);
        }

        let response = request
            .json(&openai_payload(model, input))
            .send()
            .await?
            .error_for_status()?;
        let body: Value = response.json().await?;

        let content = body
            .get("choices")
            .and_then(|choices| choices.get(0))
            .and_then(|choice| choice.get("message"))
            .and_then(|msg| msg.get("content"))
            .and_then(|val| val.as_str())
            .unwrap_or_default()
            .to_string();

        Ok(AiChatResponse {
            provider_id: endpoint.id.clone(),
            model: model.to_string(),
            usage: extract_openai_usage(&body),
            content,
            raw: body,
        })
    }

    async fn chat_anthropic(
        &self,
        endpoint: &ProviderEndpoint,
        model: &str,
        input: &AiChatInput,
    ) -> Result<AiChatResponse> {
        let secret = endpoint
            .api_key
            .as_ref()
            .ok_or_else(|| missing_key(endpoint))?;
        let url = format!("{}/v1/messages", endpoint.base_url.trim_end_matches('/'));

        let response = self
            .client
            .post(url)
            .header("x-api-key", secret)
            .header("anthropic-version", "2023-06-01")
            .json(&anthropic_payload(model, input))
            .send()
            .await?
            .error_for_status()?;
        let body: Value = response.json().await?;
        let content = body
            .get("content")
            .and_then(|c| c.get(0))
            .and_then(|part| part.get("text"))
            .and_then(|text| text.as_str())
            .unwrap_or_default()
            .to_string();
        Ok(AiChatResponse {
            provider_id: endpoint.id.clone(),
            model: model.to_string(),
            usage: extract_anthropic_usage(&body),
            content,
            raw: body,
        })
    }

    async fn chat_gemini(
        &self,
        endpoint: &ProviderEndpoint,
        model: &str,
        input: &AiChatInput,
    ) -> Result<AiChatResponse> {
        let secret = endpoint
            .api_key
            .as_ref()
            .ok_or_else(|| missing_key(endpoint))?;
        let url = format!(
            "{}/models/{}:generateContent",
            endpoint.base_url.trim_end_matches('/'),
            model
        );

        let response = self
            .client
            .post(url)
            .query(&[("key", secret)])
            .json(&gemini_payload(input))
            .send()
            .await?
            .error_for_status()?;
        let body: Value = response.json().await?;
        let content = body
            .get("candidates")
            .and_then(|c| c.get(0))
            .and_then(|cand| cand.get("content"))
            .and_then(|content| content.get("parts"))
            .and_then(|parts| parts.get(0))
            .and_then(|part| part.get("text"))
            .and_then(|text| text.as_str())
            .unwrap_or_default()
            .to_string();
        Ok(AiChatResponse {
            provider_id: endpoint.id.clone(),
            model: model.to_string(),
            usage: None,
            content,
            raw: body,
        })
    }

    async fn chat_ollama(
        &self,
        endpoint: &ProviderEndpoint,
        model: &str,
        input: &AiChatInput,
    ) -> Result<AiChatResponse> {
        let url = format!("{}/api/chat", endpoint.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(url)
            .json(&ollama_payload(model, input))
            .send()
            .await?
            .error_for_status()?;
        let body: Value = response.json().await?;
        let content = body
            .get("message")
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .unwrap_or_default()
            .to_string();
        Ok(AiChatResponse {
            provider_id: endpoint.id.clone(),
            model: model.to_string(),
            usage: None,
            content,
            raw: body,
        })
    }
}

#[async_trait]
impl ChatBackend for AiOrchestrator {
    async fn chat(
        &self,
        endpoint: &ProviderEndpoint,
        model: &str,
        input: &AiChatInput,
    ) -> Result<AiChatResponse> {
        match endpoint.id.as_str() {
            "openai" => self.chat_openai(endpoint, model, input).await,
            "anthropic" => self.chat_anthropic(endpoint, model, input).await,
            "google" => self.chat_gemini(endpoint, model, input).await,
            "ollama" => self.chat_ollama(endpoint, model, input).await,
            other if endpoint.is_local() => {
                self.chat_openai_like(endpoint, model, input, false)
                    .await
                    .with_context(|| format!("{other} request failed"))
            }
            other => Err(anyhow!("Unsupported AI provider: {other}")),
        }
    }
}

fn openai_payload(model: &str, input: &AiChatInput) -> Value {
    let mut payload = serde_json::json!({
        "model": model,
        "messages": normalise_messages(&input.messages),
        "temperature": input.temperature.unwrap_or(DEFAULT_TEMPERATURE),
    });
    if let Some(max_tokens) = input.max_tokens {
        payload["max_tokens"] = Value::from(max_tokens);
    }
    payload
}

fn anthropic_payload(model: &str, input: &AiChatInput) -> Value {
    let mut system_prompt = String::new();
    let mut messages = Vec::new();
    for msg in &input.messages {
        match msg.role.as_str() {
            "system" => {
                if !system_prompt.is_empty() {
                    system_prompt.push_str("\n\n");
                }
                system_prompt.push_str(&msg.content);
            }
            "assistant" | "user" => {
                messages.push(serde_json::json!({
                    "role": msg.role,
                    "content": [{"type": "text", "text": msg.content}],
                }));
            }
            _ => {}
        }
    }

    let mut payload = serde_json::json!({
        "model": model,
        "max_tokens": input.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        "messages": messages,
        "temperature": input.temperature.unwrap_or(DEFAULT_TEMPERATURE),
    });
    if !system_prompt.is_empty() {
        payload["system"] = Value::String(system_prompt);
    }
    payload
}

fn gemini_payload(input: &AiChatInput) -> Value {
    let mut generation = serde_json::json!({
        "temperature": input.temperature.unwrap_or(DEFAULT_TEMPERATURE),
    });
    if let Some(max_tokens) = input.max_tokens {
        generation["maxOutputTokens"] = Value::from(max_tokens);
    }
    serde_json::json!({
        "contents": [
            {
                "role": "user",
                "parts": [{"text": build_conversation_prompt(&input.messages)}]
            }
        ],
        "generationConfig": generation,
    })
}

fn ollama_payload(model: &str, input: &AiChatInput) -> Value {
    let mut options = serde_json::json!({
        "temperature": input.temperature.unwrap_or(DEFAULT_TEMPERATURE),
    });
    if let Some(max_tokens) = input.max_tokens {
        options["num_predict"] = Value::from(max_tokens);
    }
    serde_json::json!({
        "model": model,
        "messages": normalise_messages(&input.messages),
        "stream": false,
        "options": options,
    })
}

fn normalise_messages(messages: &[AiChatMessage]) -> Vec<Value> {
    messages
        .iter()
        .map(|m| {
            let role = match m.role.to_lowercase().as_str() {
                "system" => "system",
                "assistant" => "assistant",
                _ => "user",
            };
            serde_json::json!({
                "role": role,
                "content": m.content,
            })
        })
        .collect()
}

fn extract_openai_usage(body: &Value) -> Option<AiUsageMetrics> {
    body.get("usage").map(|usage| AiUsageMetrics {
        prompt_tokens: token_count(usage, "prompt_tokens"),
        completion_tokens: token_count(usage, "completion_tokens"),
        total_tokens: token_count(usage, "total_tokens"),
    })
}

fn extract_anthropic_usage(body: &Value) -> Option<AiUsageMetrics> {
    body.get("usage").map(|usage| {
        let prompt_tokens = token_count(usage, "input_tokens");
        let completion_tokens = token_count(usage, "output_tokens");
        AiUsageMetrics {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.zip(completion_tokens).map(|(p, c)| p + c),
        }
    })
}

fn token_count(usage: &Value, key: &str) -> Option<u32> {
    usage.get(key).and_then(|v| v.as_u64()).map(|v| v as u32)
}

fn build_conversation_prompt(messages: &[AiChatMessage]) -> String {
    let mut sections = Vec::new();
    for msg in messages {
        sections.push(format!(
            "{}: {}",
            msg.role.to_uppercase(),
            msg.content.trim()
        ));
    }
    sections.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn input() -> AiChatInput {
        AiChatInput {
            messages: vec![
                AiChatMessage::system("You are an editor."),
                AiChatMessage::system("Be brief."),
                AiChatMessage::user("Tighten this paragraph."),
                AiChatMessage {
                    role: "Tool".into(),
                    content: "ignored by anthropic".into(),
                },
            ],
            temperature: Some(0.3),
            max_tokens: Some(512),
        }
    }

    #[test]
    fn anthropic_hoists_system_prompts() {
        let payload = anthropic_payload("claude-3-haiku-20240307", &input());
        assert_eq!(payload["system"], "You are an editor.\n\nBe brief.");
        assert_eq!(payload["messages"].as_array().unwrap().len(), 1);
        assert_eq!(payload["messages"][0]["role"], "user");
        assert_eq!(payload["max_tokens"], 512);
    }

    #[test]
    fn anthropic_defaults_max_tokens_and_omits_empty_system() {
        let payload = anthropic_payload(
            "claude-3-haiku-20240307",
            &AiChatInput {
                messages: vec![AiChatMessage::user("hi")],
                ..Default::default()
            },
        );
        assert_eq!(payload["max_tokens"], DEFAULT_MAX_TOKENS);
        assert!(payload.get("system").is_none());
    }

    #[test]
    fn openai_normalises_unknown_roles_to_user() {
        let payload = openai_payload("gpt-4o", &input());
        let roles: Vec<_> = payload["messages"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["role"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(roles, vec!["system", "system", "user", "user"]);
        assert_eq!(payload["max_tokens"], 512);
    }

    #[test]
    fn ollama_disables_streaming() {
        let payload = ollama_payload("llama3.1:8b", &input());
        assert_eq!(payload["stream"], false);
        assert_eq!(payload["options"]["num_predict"], 512);
    }

    #[test]
    fn gemini_flattens_conversation() {
        let payload = gemini_payload(&input());
        let text = payload["contents"][0]["parts"][0]["text"].as_str().unwrap();
        assert!(text.starts_with("SYSTEM: You are an editor."));
        assert!(text.contains("USER: Tighten this paragraph."));
        assert_eq!(payload["generationConfig"]["maxOutputTokens"], 512);
    }

    #[test]
    fn anthropic_usage_sums_total() {
        let usage =
            extract_anthropic_usage(&json!({"usage": {"input_tokens": 10, "output_tokens": 5}}))
                .unwrap();
        assert_eq!(usage.total_tokens, Some(15));
        assert!(extract_openai_usage(&json!({})).is_none());
    }

    #[tokio::test]
    async fn missing_cloud_credentials_fail_before_any_request() {
        let orchestrator = AiOrchestrator::new().unwrap();
        let endpoint = ProviderEndpoint {
            id: "anthropic".into(),
            kind: "cloud".into(),
            display_name: "Anthropic".into(),
            base_url: "http://127.0.0.1:9".into(),
            api_key: None,
        };
        let err = orchestrator
            .chat(&endpoint, "claude-3-haiku-20240307", &input())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Anthropic API key is not configured");
    }

    #[tokio::test]
    async fn unknown_cloud_provider_is_rejected() {
        let orchestrator = AiOrchestrator::new().unwrap();
        let endpoint = ProviderEndpoint {
            id: "mystery".into(),
            kind: "cloud".into(),
            display_name: "Mystery".into(),
            base_url: "http://127.0.0.1:9".into(),
            api_key: Some("k".into()),
        };
        let err = orchestrator
            .chat(&endpoint, "m", &input())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Unsupported AI provider: mystery");
    }
}
