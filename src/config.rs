//! Runtime settings.
//!
//! Settings are resolved once at startup and handed to component
//! constructors. Components never read the environment themselves.

use crate::error::{ResearchError, Result};
use crate::secrets::SecretStore;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Environment variable / secret name holding the completion API key
pub const API_KEY_VAR: &str = "GROQ_API_KEY";

/// Environment variable overriding the completion base URL
pub const BASE_URL_VAR: &str = "RESEARCHER_BASE_URL";

/// Environment variable overriding the completion model
pub const MODEL_VAR: &str = "RESEARCHER_MODEL";

/// Environment variable selecting the scholarly source
pub const SOURCE_VAR: &str = "RESEARCHER_SOURCE";

/// Groq OpenAI-compatible endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Hosted model used for classification and answers
pub const DEFAULT_MODEL: &str = "llama3-groq-70b-8192-tool-use-preview";

/// Host probed before every submission
pub const DEFAULT_PROBE_ADDR: &str = "www.google.com:80";

const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// API key wrapper that never prints its value
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wrap a key, rejecting blank values
    pub fn new(key: &str) -> Option<Self> {
        let key = key.trim();
        (!key.is_empty()).then(|| Self(key.to_string()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Scholarly search backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceKind {
    #[default]
    GoogleScholar,
    OpenAlex,
}

impl FromStr for SourceKind {
    type Err = ResearchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gscholar" | "scholar" | "google-scholar" => Ok(Self::GoogleScholar),
            "openalex" => Ok(Self::OpenAlex),
            other => Err(ResearchError::Config(format!(
                "Unknown source '{}', expected gscholar or openalex",
                other
            ))),
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GoogleScholar => f.write_str("gscholar"),
            Self::OpenAlex => f.write_str("openalex"),
        }
    }
}

/// All runtime settings
#[derive(Debug, Clone)]
pub struct Settings {
    /// Completion API key; `None` until configured
    pub api_key: Option<ApiKey>,
    /// OpenAI-compatible base URL (without `/chat/completions`)
    pub base_url: String,
    /// Completion model identifier
    pub model: String,
    /// `host:port` probed before each submission
    pub probe_addr: String,
    pub probe_timeout: Duration,
    /// Timeout applied to every outbound HTTP request
    pub request_timeout: Duration,
    pub source: SourceKind,
    /// Google Scholar mirror base URL
    pub scholar_url: Option<String>,
    /// OpenAlex API base URL override
    pub openalex_url: Option<String>,
    /// Proxy URL (e.g., "http://127.0.0.1:7890")
    pub proxy: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            probe_addr: DEFAULT_PROBE_ADDR.to_string(),
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            source: SourceKind::default(),
            scholar_url: None,
            openalex_url: None,
            proxy: None,
        }
    }
}

impl Settings {
    /// Resolve settings from the process environment, falling back to the
    /// secret store for the API key and to built-in defaults for the rest.
    pub fn from_env(store: &SecretStore) -> Result<Self> {
        Self::resolve(|name| std::env::var(name).ok(), store)
    }

    fn resolve(env: impl Fn(&str) -> Option<String>, store: &SecretStore) -> Result<Self> {
        let var = |name: &str| {
            env(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut settings = Self {
            api_key: var(API_KEY_VAR)
                .or_else(|| store.get(API_KEY_VAR))
                .and_then(|k| ApiKey::new(&k)),
            ..Self::default()
        };
        if let Some(url) = var(BASE_URL_VAR) {
            settings.base_url = url;
        }
        if let Some(model) = var(MODEL_VAR) {
            settings.model = model;
        }
        if let Some(source) = var(SOURCE_VAR) {
            settings.source = source.parse()?;
        }
        Ok(settings)
    }

    /// The API key, or a configuration error naming how to provide it
    pub fn require_api_key(&self) -> Result<&ApiKey> {
        self.api_key.as_ref().ok_or_else(|| {
            ResearchError::Config(format!(
                "{} not found. Please check your environment variables or run `rustresearcher secrets set {} <key>`.",
                API_KEY_VAR, API_KEY_VAR
            ))
        })
    }
}
