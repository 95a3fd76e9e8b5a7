//! Blocking Messages API client.

use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, instrument};

use crate::io::config::Settings;
use crate::io::llm::{LlmClient, LlmRequestError, MessagesRequest, MessagesResponse};

pub struct AnthropicClient {
    http: reqwest::blocking::Client,
    url: String,
    api_key: String,
    version: String,
}

impl AnthropicClient {
    /// Build a client from settings.
    ///
    /// A missing API key is reported on the first request, so dry runs and
    /// commands without model steps work unconfigured.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()
            .context("build http client")?;
        Ok(Self {
            http,
            url: messages_url(&settings.base_url),
            api_key: settings.api_key.trim().to_string(),
            version: settings.anthropic_version.clone(),
        })
    }
}

fn messages_url(base_url: &str) -> String {
    format!("{}/v1/messages", base_url.trim().trim_end_matches('/'))
}

impl LlmClient for AnthropicClient {
    #[instrument(skip_all, fields(model = %request.model, max_tokens = request.max_tokens, tools = request.tools.len()))]
    fn send(&self, request: &MessagesRequest) -> Result<MessagesResponse> {
        if self.api_key.is_empty() {
            return Err(LlmRequestError::MissingApiKey.into());
        }

        debug!(messages = request.messages.len(), "sending messages request");
        let resp = self
            .http
            .post(&self.url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", &self.version)
            .json(request)
            .send()
            .map_err(|source| LlmRequestError::Transport {
                url: self.url.clone(),
                source,
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(LlmRequestError::Status {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let parsed: MessagesResponse = resp
            .json()
            .map_err(|source| LlmRequestError::Decode { source })?;
        debug!(
            stop_reason = ?parsed.stop_reason,
            input_tokens = parsed.usage.input_tokens,
            output_tokens = parsed.usage.output_tokens,
            "messages response received"
        );
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_url_normalizes_trailing_slash() {
        assert_eq!(
            messages_url("https://api.anthropic.com/"),
            "https://api.anthropic.com/v1/messages"
        );
        assert_eq!(
            messages_url("http://localhost:8080"),
            "http://localhost:8080/v1/messages"
        );
    }

    #[test]
    fn send_without_key_fails_before_network() {
        let client = AnthropicClient::from_settings(&Settings::default()).expect("client");
        let req = MessagesRequest::single_turn("m", 16, "", "hi");
        let err = client.send(&req).expect_err("missing key");
        assert!(matches!(
            err.downcast_ref::<LlmRequestError>(),
            Some(LlmRequestError::MissingApiKey)
        ));
    }
}
