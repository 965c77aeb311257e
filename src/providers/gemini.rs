//! Google Gemini `generateContent` backend.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};

use super::http;
use super::{GenerationParams, ProviderError, ResponseProvider};

pub const DEFAULT_MODEL: &str = "gemini-pro";
const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const NAME: &str = "gemini";

#[derive(Clone)]
pub struct GeminiProvider {
    client: Client,
    api_key: String,
    model: String,
    params: GenerationParams,
}

impl GeminiProvider {
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

    fn endpoint(&self) -> String {
        format!("{}/{}:generateContent", BASE_URL, self.model)
    }

    fn request_body<'a>(&self, prompt: &'a str) -> GenerateContentRequest<'a> {
        GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: self.params.max_tokens,
                temperature: self.params.temperature,
            },
        }
    }

    fn request(&self, prompt: &str) -> RequestBuilder {
        self.client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&self.request_body(prompt))
    }
}

#[async_trait]
impl ResponseProvider for GeminiProvider {
    fn name(&self) -> &str {
        NAME
    }

    async fn generate_response(&self, prompt: &str) -> Result<String, ProviderError> {
        let body = http::send(self.request(prompt), NAME).await?;
        extract_text(&body)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

/// `candidates[0].content.parts[0].text`
pub(crate) fn extract_text(body: &str) -> Result<String, ProviderError> {
    let parsed: GenerateContentResponse = http::parse_body(body, NAME)?;
    let text = parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .and_then(|content| content.parts.into_iter().next())
        .and_then(|part| part.text);
    http::non_empty(text, NAME)
}
