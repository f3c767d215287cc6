use std::sync::Mutex;
use std::time::Duration;

use super::LlmError;

/// Text-generation collaborator. Blocking; async callers run it on the
/// blocking pool.
pub trait LlmClient: Send + Sync {
    fn generate(&self, model: &str, prompt: &str, system: &str) -> Result<String, LlmError>;

    fn is_model_available(&self, model: &str) -> Result<bool, LlmError>;

    fn list_models(&self) -> Result<Vec<String>, LlmError>;
}

/// Mock LLM client for testing. Returns a configurable response and
/// records every prompt it was given.
pub struct MockLlmClient {
    response: Result<String, String>,
    delay: Option<Duration>,
    available_models: Vec<String>,
    prompts: Mutex<Vec<String>>,
}

impl MockLlmClient {
    pub fn new(response: &str) -> Self {
        Self {
            response: Ok(response.to_string()),
            delay: None,
            available_models: vec!["llama3.1:latest".to_string()],
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Every call fails with an HTTP client error carrying `message`.
    pub fn failing(message: &str) -> Self {
        Self {
            response: Err(message.to_string()),
            ..Self::new("")
        }
    }

    /// Sleep before answering, to exercise caller timeouts.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_models(mut self, models: Vec<String>) -> Self {
        self.available_models = models;
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

impl LlmClient for MockLlmClient {
    fn generate(&self, _model: &str, prompt: &str, _system: &str) -> Result<String, LlmError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        self.response.clone().map_err(LlmError::HttpClient)
    }

    fn is_model_available(&self, model: &str) -> Result<bool, LlmError> {
        Ok(self.available_models.iter().any(|m| m.starts_with(model)))
    }

    fn list_models(&self) -> Result<Vec<String>, LlmError> {
        Ok(self.available_models.clone())
    }
}
