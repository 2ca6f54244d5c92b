//! [`OllamaAssistant`]: blocking HTTP client for a local Ollama server.
//!
//! Endpoints used:
//!
//! * `GET /api/tags`: liveness check and list of installed models.
//! * `POST /api/pull {"name": model}`: download a missing model.
//! * `POST /api/generate {"model", "prompt", "stream": false}`: one answer,
//!   returned in the `response` field.

use crate::config::AssistantConfig;
use crate::traits::{Assistant, AssistantStatus};
use log::{debug, error, info, warn};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Returned when the server answers with a non-success status.
pub const TROUBLE_REPLY: &str =
    "I apologize, but I'm having trouble processing your request right now.";

/// Returned when the request could not be sent or the answer not decoded.
pub const ERROR_REPLY: &str = "I encountered an error while processing your request.";

/// Errors produced by the Ollama backend.
#[derive(Debug, thiserror::Error)]
pub enum OllamaError {
    #[error("http client error: {0}")]
    Client(String),
    #[error("ollama is not available at {url}: {reason}")]
    Unavailable { url: String, reason: String },
    #[error("could not pull model {model}: {reason}")]
    Pull { model: String, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => f.write_str("User"),
            Role::Assistant => f.write_str("Assistant"),
        }
    }
}

#[derive(Debug, Clone)]
struct Message {
    role: Role,
    content: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    name: String,
}

#[derive(Debug, Serialize)]
struct PullRequest<'a> {
    name: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Assistant that forwards each command, with a short trailing history, to
/// Ollama's generate endpoint.
pub struct OllamaAssistant {
    client: Client,
    base_url: String,
    model: String,
    history_limit: usize,
    history: Mutex<VecDeque<Message>>,
    busy: AtomicBool,
}

impl OllamaAssistant {
    /// Build the client without contacting the server.
    pub fn new(config: &AssistantConfig) -> Result<Self, OllamaError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| OllamaError::Client(e.to_string()))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            history_limit: config.history_limit,
            history: Mutex::new(VecDeque::new()),
            busy: AtomicBool::new(false),
        })
    }

    /// Build the client and make sure the server answers.
    pub fn connect(config: &AssistantConfig) -> Result<Self, OllamaError> {
        let assistant = Self::new(config)?;
        assistant.installed_models()?;
        info!("connected to ollama at {}", assistant.base_url);
        Ok(assistant)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Pull the configured model if the server does not list it.
    ///
    /// Returns `true` when a pull was requested.
    pub fn ensure_model(&self) -> Result<bool, OllamaError> {
        let models = self.installed_models()?;
        if models.iter().any(|name| self.is_configured_model(name)) {
            debug!("model {} is installed", self.model);
            return Ok(false);
        }

        info!("downloading model {}", self.model);
        let pull_err = |reason: String| OllamaError::Pull {
            model: self.model.clone(),
            reason,
        };
        let response = self
            .client
            .post(self.url("/api/pull"))
            .json(&PullRequest { name: &self.model })
            .send()
            .map_err(|e| pull_err(e.to_string()))?;
        if !response.status().is_success() {
            return Err(pull_err(format!("status {}", response.status())));
        }
        Ok(true)
    }

    fn installed_models(&self) -> Result<Vec<String>, OllamaError> {
        let unavailable = |reason: String| OllamaError::Unavailable {
            url: self.base_url.clone(),
            reason,
        };
        let response = self
            .client
            .get(self.url("/api/tags"))
            .send()
            .map_err(|e| unavailable(e.to_string()))?;
        if response.status() != StatusCode::OK {
            return Err(unavailable(format!("status {}", response.status())));
        }
        let tags: TagsResponse = response.json().map_err(|e| unavailable(e.to_string()))?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    /// Ollama reports untagged models as `name:latest`.
    fn is_configured_model(&self, name: &str) -> bool {
        name == self.model
            || (!self.model.contains(':')
                && name.strip_suffix(":latest") == Some(self.model.as_str()))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// The context block is the trailing history window, which already
    /// holds the current command.
    fn build_prompt(&self, command: &str) -> String {
        let history = self.history.lock().unwrap_or_else(|e| e.into_inner());
        let context = history
            .iter()
            .map(|m| format!("{}: {}", m.role, m.content))
            .collect::<Vec<_>>()
            .join("\n");
        format!(
            "Previous conversation:\n{}\n\nUser: {}\n\nAssistant:",
            context, command
        )
    }

    fn remember(&self, role: Role, content: &str) {
        let mut history = self.history.lock().unwrap_or_else(|e| e.into_inner());
        history.push_back(Message {
            role,
            content: content.to_string(),
        });
        while history.len() > self.history_limit {
            history.pop_front();
        }
    }

    fn generate(&self, prompt: &str) -> String {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };
        let response = match self.client.post(self.url("/api/generate")).json(&request).send() {
            Ok(r) => r,
            Err(e) => {
                error!("generate request failed: {}", e);
                return ERROR_REPLY.to_string();
            }
        };
        if response.status() != StatusCode::OK {
            warn!("generate answered {}", response.status());
            return TROUBLE_REPLY.to_string();
        }
        match response.json::<GenerateResponse>() {
            Ok(body) => {
                self.remember(Role::Assistant, &body.response);
                body.response
            }
            Err(e) => {
                error!("bad generate response: {}", e);
                ERROR_REPLY.to_string()
            }
        }
    }
}

impl Assistant for OllamaAssistant {
    type Error = OllamaError;

    /// Always answers; transport and server failures become fixed apology
    /// strings.
    fn process_command(&self, text: &str) -> Result<String, OllamaError> {
        self.busy.store(true, Ordering::SeqCst);
        self.remember(Role::User, text);
        let prompt = self.build_prompt(text);
        debug!("prompt: {:?}", prompt);
        let answer = self.generate(&prompt);
        self.busy.store(false, Ordering::SeqCst);
        Ok(answer)
    }

    fn clear_history(&self) {
        self.history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
        debug!("conversation history cleared");
    }

    fn status(&self) -> AssistantStatus {
        AssistantStatus {
            busy: self.busy.load(Ordering::SeqCst),
            model: self.model.clone(),
            history_length: self.history.lock().unwrap_or_else(|e| e.into_inner()).len(),
        }
    }
}

//  Tests
