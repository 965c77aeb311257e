//! Cohere generate backend.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};

use super::http;
use super::{GenerationParams, ProviderError, ResponseProvider};

pub const DEFAULT_MODEL: &str = "command";
const BASE_URL: &str = "https://api.cohere.ai/v1/generate";
const NAME: &str = "cohere";
const STOP_SEQUENCES: &[&str] = &["\n\n"];

#[derive(Clone)]
pub struct CohereProvider {
    client: Client,
    api_key: String,
    model: String,
    params: GenerationParams,
}

impl CohereProvider {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, params: GenerationParams) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            params,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request_body<'a>(&'a self, prompt: &'a str) -> GenerateRequest<'a> {
        GenerateRequest {
            model: &self.model,
            prompt,
            max_tokens: self.params.max_tokens,
            temperature: self.params.temperature,
            stop_sequences: STOP_SEQUENCES,
        }
    }

    fn request(&self, prompt: &str) -> RequestBuilder {
        self.client
            .post(BASE_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&self.request_body(prompt))
    }
}

#[async_trait]
impl ResponseProvider for CohereProvider {
    fn name(&self) -> &str {
        NAME
    }

    async fn generate_response(&self, prompt: &str) -> Result<String, ProviderError> {
        let body = http::send(self.request(prompt), NAME).await?;
        extract_text(&body)
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    max_tokens: u32,
    temperature: f32,
    stop_sequences: &'a [&'a str],
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    generations: Vec<Generation>,
}

#[derive(Deserialize)]
struct Generation {
    text: Option<String>,
}

/// `generations[0].text`, trimmed.
pub(crate) fn extract_text(body: &str) -> Result<String, ProviderError> {
    let parsed: GenerateResponse = http::parse_body(body, NAME)?;
    let text = parsed.generations.into_iter().next().and_then(|g| g.text);
    http::non_empty(text, NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_and_trims_generation() {
        let body = r#"{"id": "g1", "generations": [{"id": "x", "text": "\n Well hello. \n"}]}"#;
        assert_eq!(extract_text(body).unwrap(), "Well hello.");
    }

    #[test]
    fn no_generations_is_empty() {
        assert_eq!(extract_text(r#"{"generations": []}"#), Err(ProviderError::empty(NAME)));
    }

    #[test]
    fn request_has_stop_sequence() {
        let provider = CohereProvider::new("key", DEFAULT_MODEL, GenerationParams::default());
        let json = serde_json::to_value(provider.request_body("hello")).unwrap();
        assert_eq!(json["model"], "command");
        assert_eq!(json["prompt"], "hello");
        assert_eq!(json["stop_sequences"][0], "\n\n");
        assert_eq!(json["max_tokens"], 150);
    }

    #[test]
    fn request_sets_content_type_once() {
        let provider = CohereProvider::new("key", DEFAULT_MODEL, GenerationParams::default());
        let request = provider.request("hello").build().unwrap();
        let content_types: Vec<&str> = request
            .headers()
            .get_all(reqwest::header::CONTENT_TYPE)
            .iter()
            .map(|value| value.to_str().unwrap())
            .collect();
        assert_eq!(content_types, vec!["application/json"]);
        assert_eq!(request.headers()["authorization"], "Bearer key");
    }
}
