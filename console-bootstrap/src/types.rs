use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use url::Url;
use uuid::Uuid;

/// Form fields the console requires before it will start a server, in submission order.
pub const EXPECTED_FIELDS: [&str; 10] = [
    "game_name",
    "admin_password",
    "game_password",
    "savegame",
    "server_port",
    "max_player",
    "mp_language",
    "auto_save_interval",
    "stats_interval",
    "pause_game_if_empty",
];

/// Prefix on a raw form value that makes the transport encode spaces as `+`.
pub const LITERAL_SPACE_MARKER: &str = "+%2B+";

/// Fields whose values never show up in logs.
pub const REDACTED_FIELDS: [&str; 3] = ["password", "admin_password", "game_password"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
        }
    }
}

/// Authenticated console session: the `SessionID=...` pair sent back as the `Cookie` header.
#[derive(Clone, PartialEq, Eq)]
pub struct Session(String);

impl Session {
    pub fn new(cookie: impl Into<String>) -> Self {
        Self(cookie.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Cookie with its value masked, for logs.
    pub fn redacted(&self) -> String {
        match self.0.split_once('=') {
            Some((name, _)) => format!("{}=***", name),
            None => "***".to_string(),
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Session").field(&self.redacted()).finish()
    }
}

/// A fully built HTTP call. Constructed once per request and never mutated.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl RequestSpec {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Outcome of the attempt that finally started the server.
#[derive(Debug, Clone, Serialize)]
pub struct AttemptReport {
    pub attempt: u32,
    pub attempt_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub submission_status: u16,
}

#[derive(Debug, Clone)]
pub struct BootstrapConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub retry_interval_seconds: u64,
    pub timeout_seconds: u64,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 7999,
            username: String::new(),
            password: String::new(),
            retry_interval_seconds: 30,
            timeout_seconds: 30,
        }
    }
}

impl BootstrapConfig {
    /// `host:port` of the console.
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(BootstrapError::Config("console host is empty".to_string()));
        }
        if self.username.is_empty() {
            return Err(BootstrapError::Config("console username is empty".to_string()));
        }
        if self.retry_interval_seconds == 0 {
            return Err(BootstrapError::Config(
                "retry interval must be at least one second".to_string(),
            ));
        }
        if self.timeout_seconds == 0 {
            return Err(BootstrapError::Config(
                "request timeout must be at least one second".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Missing key: {field}")]
    MissingField { field: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Shutdown requested before the server was started")]
    Shutdown,
}

pub type Result<T> = std::result::Result<T, BootstrapError>;
