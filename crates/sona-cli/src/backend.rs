use anyhow::{anyhow, Result};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    session_id: Option<&'a str>,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    language: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChatReply {
    pub session_id: String,
    pub response: String,
    #[serde(default)]
    pub media: Option<Media>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Media {
    pub video: Option<VideoSource>,
    pub audio: Option<AudioSource>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoSource {
    pub url: String,
    #[serde(rename = "type", default)]
    pub mime: String,
    pub poster: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioSource {
    pub url: String,
    #[serde(rename = "type", default)]
    pub mime: String,
}

#[derive(Debug, Error)]
pub enum AskError {
    #[error("chat server unreachable: {0}")]
    Unreachable(String),
    #[error("request timed out after {}s", .0.as_secs())]
    Timeout(Duration),
    #[error("chat server returned HTTP {code}")]
    Status { code: u16, detail: Option<String> },
    #[error("malformed response body: {0}")]
    MalformedBody(String),
}

impl AskError {
    /// Text shown in the conversation in place of a reply.
    pub fn user_message(&self) -> String {
        match self {
            AskError::Unreachable(_) => "I'm having trouble connecting right now. Please check your internet connection and try again.".to_string(),
            AskError::Timeout(_) => "The request timed out. Please try again, and check your connection if this keeps happening.".to_string(),
            AskError::Status { code, detail } => {
                let reason = detail
                    .clone()
                    .unwrap_or_else(|| format!("HTTP error! status: {code}"));
                format!("I apologize, but I encountered an error: {reason}. Please try again.")
            }
            AskError::MalformedBody(_) => "I apologize, but I encountered an error: the server sent a response I couldn't read. Please try again.".to_string(),
        }
    }
}

/// Session id issued by the chat server, echoed on every request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    id: Option<String>,
}

impl Session {
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Adopts the id carried by a successful reply. Returns true when it changed.
    pub fn absorb(&mut self, reply: &ChatReply) -> bool {
        if reply.session_id.is_empty() || self.id.as_deref() == Some(reply.session_id.as_str()) {
            return false;
        }
        log::info!("session id now {}", reply.session_id);
        self.id = Some(reply.session_id.clone());
        true
    }

    pub fn reset(&mut self) {
        self.id = None;
    }
}

pub struct BackendClient {
    http: Client,
    base_url: String,
    timeout: Duration,
    language: Option<String>,
}

impl BackendClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            language: None,
        })
    }

    pub fn with_language(mut self, language: Option<String>) -> Self {
        self.language = language;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn ask(&self, session_id: Option<&str>, message: &str) -> Result<ChatReply, AskError> {
        let url = format!("{}/chat", self.base_url);
        let body = ChatRequest {
            session_id,
            message,
            language: self.language.as_deref(),
        };
        log::debug!("POST {url} session={session_id:?} chars={}", message.chars().count());

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .map_err(|err| self.classify(err))?;
        let status = response.status();
        let text = response.text().map_err(|err| self.classify(err))?;

        if !status.is_success() {
            let detail = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|v| v.get("detail").and_then(Value::as_str).map(str::to_string))
                .filter(|detail| !detail.is_empty());
            log::warn!("chat request failed with {status}: {detail:?}");
            return Err(AskError::Status {
                code: status.as_u16(),
                detail,
            });
        }

        serde_json::from_str::<ChatReply>(&text).map_err(|err| {
            log::warn!("unreadable chat reply: {err}");
            AskError::MalformedBody(err.to_string())
        })
    }

    /// Calls `GET /health`; returns the reported status.
    pub fn health(&self) -> Result<String> {
        let url = format!("{}/health", self.base_url);
        let response = self.http.get(&url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("health check returned HTTP {status}"));
        }
        let value: Value = response.json()?;
        value
            .get("status")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| anyhow!("health response has no status field"))
    }

    fn classify(&self, err: reqwest::Error) -> AskError {
        if err.is_timeout() {
            log::warn!("chat request timed out after {:?}", self.timeout);
            AskError::Timeout(self.timeout)
        } else if err.is_decode() {
            AskError::MalformedBody(err.to_string())
        } else {
            log::warn!("chat server unreachable: {err}");
            AskError::Unreachable(err.to_string())
        }
    }
}
