//! Language model backends that turn a prompt into persona text.
//!
//! Every backend implements [`ResponseProvider`]. The orchestrator owns at
//! most one provider, picked once at startup by [`select_provider`].

pub mod cohere;
pub mod gemini;
mod http;
pub mod openai;
pub mod scripted;

use async_trait::async_trait;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub use cohere::CohereProvider;
pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;
pub use scripted::ScriptedProvider;

/// Failure of a single provider call. The orchestrator absorbs these into
/// its retry and fallback handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("{backend} returned no text")]
    Empty { backend: String },
    #[error("no response within {0:?}")]
    Timeout(Duration),
}

impl ProviderError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ProviderError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub(crate) fn empty(backend: &str) -> Self {
        ProviderError::Empty {
            backend: backend.to_string(),
        }
    }
}

#[async_trait]
pub trait ResponseProvider: Send + Sync {
    /// Short backend name used in logs and reply metadata.
    fn name(&self) -> &str;

    async fn generate_response(&self, prompt: &str) -> Result<String, ProviderError>;
}

/// Sampling parameters sent with every request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationParams {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_tokens: 150,
            temperature: 0.8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    OpenAi,
    Gemini,
    Cohere,
}

impl BackendKind {
    /// Default priority order.
    pub const ALL: [BackendKind; 3] = [BackendKind::OpenAi, BackendKind::Gemini, BackendKind::Cohere];

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::OpenAi => "openai",
            BackendKind::Gemini => "gemini",
            BackendKind::Cohere => "cohere",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            BackendKind::OpenAi => openai::DEFAULT_MODEL,
            BackendKind::Gemini => gemini::DEFAULT_MODEL,
            BackendKind::Cohere => cohere::DEFAULT_MODEL,
        }
    }

    /// Credential variable names, most specific first.
    pub fn key_vars(&self) -> &'static [&'static str] {
        match self {
            BackendKind::OpenAi => &["OPENAI_API_KEY", "VITE_OPENAI_API_KEY"],
            BackendKind::Gemini => &["GEMINI_API_KEY", "VITE_GEMINI_API_KEY"],
            BackendKind::Cohere => &["COHERE_API_KEY", "VITE_COHERE_API_KEY"],
        }
    }

    pub fn model_var(&self) -> &'static str {
        match self {
            BackendKind::OpenAi => "OPENAI_MODEL_NAME",
            BackendKind::Gemini => "GEMINI_MODEL_NAME",
            BackendKind::Cohere => "COHERE_MODEL_NAME",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendSettings {
    pub kind: BackendKind,
    #[serde(default)]
    pub api_key: String,
    pub model: String,
}

impl BackendSettings {
    pub fn new(kind: BackendKind, api_key: impl Into<String>) -> Self {
        Self {
            kind,
            api_key: api_key.into(),
            model: kind.default_model().to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn has_credential(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    fn build(&self, params: GenerationParams) -> Arc<dyn ResponseProvider> {
        let key = self.api_key.trim();
        match self.kind {
            BackendKind::OpenAi => Arc::new(OpenAiProvider::new(key, &self.model, params)),
            BackendKind::Gemini => Arc::new(GeminiProvider::new(key, &self.model, params)),
            BackendKind::Cohere => Arc::new(CohereProvider::new(key, &self.model, params)),
        }
    }
}

// Keys stay out of logs.
impl fmt::Debug for BackendSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendSettings")
            .field("kind", &self.kind)
            .field("api_key", &if self.has_credential() { "<set>" } else { "<empty>" })
            .field("model", &self.model)
            .finish()
    }
}

/// Ordered backend candidates. The first one with a credential wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSettings {
    pub backends: Vec<BackendSettings>,
}

impl ProviderSettings {
    pub fn new(backends: Vec<BackendSettings>) -> Self {
        Self { backends }
    }

    /// Settings that select no backend, so every reply is scripted.
    pub fn offline() -> Self {
        Self::default()
    }

    /// Build settings from `(name, value)` pairs in the default priority
    /// order. Unprefixed names win over their `VITE_` aliases.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: FxHashMap<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();

        let backends = BackendKind::ALL
            .iter()
            .map(|kind| {
                let api_key = kind
                    .key_vars()
                    .iter()
                    .filter_map(|name| vars.get(*name))
                    .find(|value| !value.trim().is_empty())
                    .cloned()
                    .unwrap_or_default();
                let settings = BackendSettings::new(*kind, api_key);
                match vars.get(kind.model_var()) {
                    Some(model) if !model.trim().is_empty() => settings.with_model(model.trim()),
                    _ => settings,
                }
            })
            .collect();

        Self { backends }
    }

    pub fn from_env() -> Self {
        Self::from_vars(std::env::vars())
    }

    pub fn first_configured(&self) -> Option<&BackendSettings> {
        self.backends.iter().find(|b| b.has_credential())
    }
}

/// Pick the first backend with a non-empty credential. `None` means the
/// engine runs on scripted fallbacks only.
pub fn select_provider(
    settings: &ProviderSettings,
    params: GenerationParams,
) -> Option<Arc<dyn ResponseProvider>> {
    match settings.first_configured() {
        Some(backend) => {
            tracing::info!(backend = %backend.kind, model = %backend.model, "selected response provider");
            Some(backend.build(params))
        }
        None => {
            tracing::info!("no provider credentials configured, using scripted replies");
            None
        }
    }
}
