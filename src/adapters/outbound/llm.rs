use std::sync::Arc;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use rig::{
    client::CompletionClient,
    completion::Prompt,
    providers::{anthropic, gemini, openai, xai},
};

use crate::config::LlmProvider;
use crate::core::error::Error as CoreError;
use crate::core::ports::LlmClient;

/// [`LlmClient`] backed by `rig`, one provider per instance.
#[derive(Clone)]
pub struct RigLlmClient {
    inner: Arc<RigLlmClientInner>,
}

struct RigLlmClientInner {
    provider: LlmProvider,
    model: String,
    api_key: String,
    http_client: reqwest::Client,
}

impl RigLlmClient {
    pub fn new(
        provider: LlmProvider,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(anyhow!("API key may not be empty"));
        }

        let model = model.into();
        if model.trim().is_empty() {
            return Err(anyhow!("Model identifier may not be empty"));
        }

        Ok(Self {
            inner: Arc::new(RigLlmClientInner {
                provider,
                model,
                api_key,
                http_client: build_http_client()?,
            }),
        })
    }

    pub fn provider(&self) -> LlmProvider {
        self.inner.provider
    }

    pub fn model(&self) -> &str {
        &self.inner.model
    }
}

impl std::fmt::Debug for RigLlmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RigLlmClient")
            .field("provider", &self.inner.provider)
            .field("model", &self.inner.model)
            .finish()
    }
}

#[async_trait]
impl LlmClient for RigLlmClient {
    async fn complete(&self, prompt: &str) -> crate::core::Result<String> {
        tracing::debug!(
            provider = self.inner.provider.as_str(),
            model = %self.inner.model,
            "sending completion request"
        );
        self.prompt_once(prompt).await.map_err(|err| {
            CoreError::Execution(format!(
                "{} completion failed: {err}",
                self.inner.provider.as_str()
            ))
        })
    }
}

impl RigLlmClient {
    async fn prompt_once(&self, prompt: &str) -> Result<String> {
        let model = self.inner.model.as_str();
        match self.inner.provider {
            LlmProvider::Openai => {
                let client: openai::Client<reqwest::Client> =
                    openai::Client::<reqwest::Client>::builder()
                        .api_key(&self.inner.api_key)
                        .http_client(self.inner.http_client.clone())
                        .build()
                        .map_err(|err| anyhow!("Failed to create OpenAI client: {err}"))?;
                client
                    .agent(model)
                    .build()
                    .prompt(prompt)
                    .await
                    .map_err(|err| anyhow!("OpenAI prompt error: {err}"))
            }
            LlmProvider::Anthropic => {
                let client: anthropic::Client<reqwest::Client> =
                    anthropic::Client::<reqwest::Client>::builder()
                        .api_key(&self.inner.api_key)
                        .http_client(self.inner.http_client.clone())
                        .build()
                        .map_err(|err| anyhow!("Failed to create Anthropic client: {err}"))?;
                client
                    .agent(model)
                    .build()
                    .prompt(prompt)
                    .await
                    .map_err(|err| anyhow!("Anthropic prompt error: {err}"))
            }
            LlmProvider::Gemini => {
                let client: gemini::Client<reqwest::Client> =
                    gemini::Client::<reqwest::Client>::builder()
                        .api_key(&self.inner.api_key)
                        .http_client(self.inner.http_client.clone())
                        .build()
                        .map_err(|err| anyhow!("Failed to create Gemini client: {err}"))?;
                client
                    .agent(model)
                    .build()
                    .prompt(prompt)
                    .await
                    .map_err(|err| anyhow!("Gemini prompt error: {err}"))
            }
            LlmProvider::Grok => {
                let client: xai::Client<reqwest::Client> =
                    xai::Client::<reqwest::Client>::builder()
                        .api_key(&self.inner.api_key)
                        .http_client(self.inner.http_client.clone())
                        .build()
                        .map_err(|err| anyhow!("Failed to create xAI client: {err}"))?;
                client
                    .agent(model)
                    .build()
                    .prompt(prompt)
                    .await
                    .map_err(|err| anyhow!("xAI prompt error: {err}"))
            }
        }
    }
}

fn build_http_client() -> Result<reqwest::Client> {
    // OS proxy discovery is opt-in via FLOWVIZ_ENABLE_SYSTEM_PROXY=1.
    let mut builder = reqwest::Client::builder();
    if std::env::var_os("FLOWVIZ_ENABLE_SYSTEM_PROXY").is_none() {
        builder = builder.no_proxy();
    }
    builder
        .build()
        .map_err(|err| anyhow!("Failed to build HTTP client: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_api_key() {
        let err = RigLlmClient::new(LlmProvider::Openai, "   ", "model").unwrap_err();
        assert!(err.to_string().contains("API key"));
    }

    #[test]
    fn rejects_empty_model() {
        let err = RigLlmClient::new(LlmProvider::Anthropic, "key", "  ").unwrap_err();
        assert!(err.to_string().contains("Model"));
    }

    #[test]
    fn keeps_provider_and_model() {
        let client = RigLlmClient::new(LlmProvider::Grok, "key", "grok-4").unwrap();
        assert_eq!(client.provider(), LlmProvider::Grok);
        assert_eq!(client.model(), "grok-4");
        assert!(format!("{client:?}").contains("grok-4"));
        assert!(!format!("{client:?}").contains("key"));
    }
}
