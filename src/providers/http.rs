//! Shared request plumbing for the HTTP backends.

use reqwest::{RequestBuilder, StatusCode};
use serde::Deserialize;

use super::ProviderError;

/// Send a prepared request and return the raw success body.
pub(crate) async fn send(request: RequestBuilder, backend: &str) -> Result<String, ProviderError> {
    let response = request
        .send()
        .await
        .map_err(|err| ProviderError::Transport(format!("{backend} request failed: {err}")))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|err| ProviderError::Transport(format!("failed to read {backend} body: {err}")))?;

    if !status.is_success() {
        tracing::debug!(backend, status = status.as_u16(), "provider returned error status");
        return Err(map_http_error(status, &body));
    }

    Ok(body)
}

/// Parse a success body into the backend's response type.
pub(crate) fn parse_body<'a, T: Deserialize<'a>>(
    body: &'a str,
    backend: &str,
) -> Result<T, ProviderError> {
    serde_json::from_str(body)
        .map_err(|err| ProviderError::Malformed(format!("failed to parse {backend} response: {err}")))
}

/// Trim extracted text, treating blank output as empty.
pub(crate) fn non_empty(text: Option<String>, backend: &str) -> Result<String, ProviderError> {
    match text.map(|t| t.trim().to_string()) {
        Some(t) if !t.is_empty() => Ok(t),
        _ => Err(ProviderError::empty(backend)),
    }
}

// OpenAI and Gemini nest the message under `error`, Cohere puts it at the top.
#[derive(Deserialize)]
struct ErrorResponse {
    error: Option<ErrorBody>,
    message: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

pub(crate) fn map_http_error(status: StatusCode, body: &str) -> ProviderError {
    let message = serde_json::from_str::<ErrorResponse>(body)
        .ok()
        .and_then(|parsed| parsed.error.map(|e| e.message).or(parsed.message))
        .unwrap_or_else(|| body.to_string());

    ProviderError::Http {
        status: status.as_u16(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_error_message() {
        let err = map_http_error(
            StatusCode::UNAUTHORIZED,
            r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error"}}"#,
        );
        assert_eq!(
            err,
            ProviderError::Http {
                status: 401,
                message: "Incorrect API key provided".to_string()
            }
        );
    }

    #[test]
    fn top_level_error_message() {
        let err = map_http_error(StatusCode::TOO_MANY_REQUESTS, r#"{"message":"too many requests"}"#);
        assert_eq!(err.status(), Some(429));
        assert!(err.to_string().contains("too many requests"));
    }

    #[test]
    fn raw_body_when_not_json() {
        let err = map_http_error(StatusCode::BAD_GATEWAY, "upstream down");
        assert_eq!(
            err,
            ProviderError::Http {
                status: 502,
                message: "upstream down".to_string()
            }
        );
    }

    #[test]
    fn blank_text_is_empty() {
        assert_eq!(non_empty(Some("  \n".into()), "x"), Err(ProviderError::empty("x")));
        assert_eq!(non_empty(None, "x"), Err(ProviderError::empty("x")));
        assert_eq!(non_empty(Some(" hi ".into()), "x"), Ok("hi".to_string()));
    }
}
