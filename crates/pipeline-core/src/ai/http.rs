use super::{AiProvider, ImageInput};
use crate::config::ProviderConfig;
use crate::error::{PipelineError, Result};
use base64::Engine;
use serde_json::{json, Value};
use std::time::Duration;

/// A provider reached through an OpenAI-compatible chat-completions endpoint.
pub struct HttpProvider {
    name: String,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    client: reqwest::blocking::Client,
}

impl HttpProvider {
    pub fn from_config(cfg: &ProviderConfig) -> Result<Self> {
        let api_key = std::env::var(&cfg.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty());
        if api_key.is_none() {
            tracing::warn!(
                provider = %cfg.provider,
                env = %cfg.api_key_env,
                "no API key in environment; requests will be unauthenticated"
            );
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_seconds))
            .build()
            .map_err(|e| request_err(&cfg.provider, e))?;
        Ok(Self {
            name: cfg.provider.clone(),
            endpoint: format!("{}/chat/completions", cfg.base_url.trim_end_matches('/')),
            model: cfg.model.clone(),
            api_key,
            client,
        })
    }

    fn chat(&self, content: Value) -> Result<String> {
        let body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": content }],
        });
        let mut req = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        tracing::debug!(provider = %self.name, endpoint = %self.endpoint, "calling AI provider");
        let resp = req.send().map_err(|e| request_err(&self.name, e))?;
        let status = resp.status();
        let text = resp.text().map_err(|e| request_err(&self.name, e))?;
        if !status.is_success() {
            return Err(request_err(&self.name, format!("{status}: {text}")));
        }

        let reply: Value = serde_json::from_str(&text).map_err(|e| PipelineError::AiFormat {
            reason: format!("provider response is not JSON: {e}"),
            raw: text.clone(),
        })?;
        match reply
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
        {
            Some(content) => Ok(content.to_string()),
            None => Err(PipelineError::AiFormat {
                reason: "provider response has no message content".to_string(),
                raw: text,
            }),
        }
    }
}

fn request_err(provider: &str, detail: impl ToString) -> PipelineError {
    PipelineError::AiRequest {
        provider: provider.to_string(),
        detail: detail.to_string(),
    }
}

impl AiProvider for HttpProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn extract(&self, prompt: &str, images: &[ImageInput]) -> Result<String> {
        if images.is_empty() {
            return self.chat(Value::String(prompt.to_string()));
        }
        let engine = base64::engine::general_purpose::STANDARD;
        let mut parts = vec![json!({ "type": "text", "text": prompt })];
        parts.extend(images.iter().map(|img| {
            let data = engine.encode(&img.bytes);
            json!({
                "type": "image_url",
                "image_url": {
                    "url": format!("data:{};base64,{data}", img.content_type),
                },
            })
        }));
        self.chat(Value::Array(parts))
    }

    fn generate(&self, prompt: &str) -> Result<String> {
        self.chat(Value::String(prompt.to_string()))
    }
}
