use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::client::LlmClient;
use super::LlmError;

/// Ollama HTTP client for local LLM inference.
pub struct OllamaClient {
    base_url: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
    /// Ask Ollama to constrain output to JSON.
    json_mode: bool,
}

impl OllamaClient {
    /// Create a new OllamaClient pointing at an Ollama instance.
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, LlmError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| LlmError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            timeout_secs,
            json_mode: true,
        })
    }

    /// Plain-text generation instead of JSON-constrained output.
    pub fn without_json_mode(mut self) -> Self {
        self.json_mode = false;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn map_send_error(&self, e: reqwest::Error) -> LlmError {
        if e.is_connect() {
            LlmError::OllamaConnection(self.base_url.clone())
        } else if e.is_timeout() {
            LlmError::Timeout(self.timeout_secs)
        } else {
            LlmError::HttpClient(e.to_string())
        }
    }
}

/// Request body for Ollama /api/generate
#[derive(Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'a str>,
}

/// Response body from Ollama /api/generate
#[derive(Deserialize)]
struct OllamaGenerateResponse {
    response: String,
}

/// Response body from Ollama /api/tags
#[derive(Deserialize)]
struct OllamaTagsResponse {
    models: Vec<OllamaModel>,
}

#[derive(Deserialize)]
struct OllamaModel {
    name: String,
}

impl LlmClient for OllamaClient {
    fn generate(&self, model: &str, prompt: &str, system: &str) -> Result<String, LlmError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = OllamaGenerateRequest {
            model,
            prompt,
            system,
            stream: false,
            format: self.json_mode.then_some("json"),
        };

        tracing::debug!(model, prompt_chars = prompt.chars().count(), "Sending generate request");

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(LlmError::OllamaError {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: OllamaGenerateResponse = response
            .json()
            .map_err(|e| LlmError::MalformedResponse(e.to_string()))?;

        Ok(parsed.response)
    }

    fn is_model_available(&self, model: &str) -> Result<bool, LlmError> {
        let models = self.list_models()?;
        Ok(models.iter().any(|m| m.starts_with(model)))
    }

    fn list_models(&self) -> Result<Vec<String>, LlmError> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(LlmError::OllamaError {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: OllamaTagsResponse = response
            .json()
            .map_err(|e| LlmError::MalformedResponse(e.to_string()))?;

        Ok(parsed.models.into_iter().map(|m| m.name).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ollama_client_constructor() {
        let client = OllamaClient::new("http://localhost:11434", 120).unwrap();
        assert_eq!(client.base_url(), "http://localhost:11434");
        assert_eq!(client.timeout_secs, 120);
        assert!(client.json_mode);
    }

    #[test]
    fn ollama_client_trims_trailing_slash() {
        let client = OllamaClient::new("http://localhost:11434/", 60).unwrap();
        assert_eq!(client.base_url(), "http://localhost:11434");
    }

    #[test]
    fn request_body_carries_format_only_in_json_mode() {
        let body = OllamaGenerateRequest {
            model: "llama3.1",
            prompt: "p",
            system: "s",
            stream: false,
            format: Some("json"),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["format"], "json");

        let plain = OllamaGenerateRequest { format: None, ..body };
        let json = serde_json::to_value(&plain).unwrap();
        assert!(json.get("format").is_none());
        assert_eq!(json["stream"], false);
    }

    #[test]
    fn unreachable_server_is_a_connection_error() {
        // Port 9 (discard) is closed on test machines.
        let client = OllamaClient::new("http://127.0.0.1:9", 2).unwrap();
        let err = client.list_models().unwrap_err();
        assert!(matches!(err, LlmError::OllamaConnection(_) | LlmError::HttpClient(_)));
    }
}
