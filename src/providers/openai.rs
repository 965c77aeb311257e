//! OpenAI chat completions backend.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};

use super::http;
use super::{GenerationParams, ProviderError, ResponseProvider};

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
const BASE_URL: &str = "https://api.openai.com/v1/chat/completions";
const NAME: &str = "openai";

#[derive(Clone)]
pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    model: String,
    params: GenerationParams,
}

impl OpenAiProvider {
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

    fn request_body<'a>(&'a self, prompt: &'a str) -> ChatCompletionRequest<'a> {
        ChatCompletionRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: self.params.max_tokens,
            temperature: self.params.temperature,
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
impl ResponseProvider for OpenAiProvider {
    fn name(&self) -> &str {
        NAME
    }

    async fn generate_response(&self, prompt: &str) -> Result<String, ProviderError> {
        let body = http::send(self.request(prompt), NAME).await?;
        extract_text(&body)
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// `choices[0].message.content`
pub(crate) fn extract_text(body: &str) -> Result<String, ProviderError> {
    let parsed: ChatCompletionResponse = http::parse_body(body, NAME)?;
    let text = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content);
    http::non_empty(text, NAME)
}
