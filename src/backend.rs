use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::language::Language;

/// How a backend exchange can go wrong.
///
/// `Transport` is a failure to complete the exchange at all (connect error,
/// timeout, non-2xx status). `Protocol` is a 2xx reply whose body does not
/// match the contract in §6 of the backend docs: missing or empty field,
/// or a body that is not JSON.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("protocol violation: {0}")]
    Protocol(String),
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        BackendError::Transport(err.to_string())
    }
}

/// Chat request captured at send time. The language travels inside the
/// capture, so switching the selector afterwards cannot relabel it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatRequest {
    pub query: String,
    pub response_language: Language,
}

#[derive(Deserialize)]
struct ChatResponse {
    response: Option<String>,
}

#[derive(Deserialize)]
struct UploadResponse {
    file_name: Option<String>,
}

#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// One chat completion. Exactly one attempt, no retry.
    pub async fn chat(&self, request: &ChatRequest) -> Result<String, BackendError> {
        let url = format!("{}/chat", self.base_url);
        debug!(language = request.response_language.code(), "posting chat query");

        let response = self.client.post(&url).json(request).send().await?;

        if !response.status().is_success() {
            return Err(BackendError::Transport(format!(
                "chat request failed with status {}",
                response.status()
            )));
        }

        let payload: ChatResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Protocol(format!("chat reply was not valid JSON: {e}")))?;
        chat_reply(payload)
    }

    /// One document upload as a multipart `file` field. The backend stores
    /// the document and answers with the name it kept it under.
    pub async fn upload_document(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<String, BackendError> {
        let url = format!("{}/upload_pdf", self.base_url);
        debug!(file = file_name, size = bytes.len(), "posting document upload");

        let part = Part::bytes(bytes).file_name(file_name.to_string());
        let form = Form::new().part("file", part);

        let response = self.client.post(&url).multipart(form).send().await?;

        if !response.status().is_success() {
            return Err(BackendError::Transport(format!(
                "upload failed with status {}",
                response.status()
            )));
        }

        let payload: UploadResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Protocol(format!("upload reply was not valid JSON: {e}")))?;
        uploaded_name(payload)
    }
}

/// The chat contract is a non-empty `response` field. Anything else is a
/// protocol violation, never unchecked field access.
fn chat_reply(payload: ChatResponse) -> Result<String, BackendError> {
    match payload.response {
        Some(text) if !text.trim().is_empty() => Ok(text),
        Some(_) => Err(BackendError::Protocol("response field was empty".to_string())),
        None => Err(BackendError::Protocol("reply lacked a response field".to_string())),
    }
}

fn uploaded_name(payload: UploadResponse) -> Result<String, BackendError> {
    match payload.file_name {
        Some(name) if !name.is_empty() => Ok(name),
        _ => Err(BackendError::Protocol("reply lacked a file_name field".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_request_matches_wire_contract() {
        let request = ChatRequest {
            query: "what does the report say?".to_string(),
            response_language: Language::Ne,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "query": "what does the report say?",
                "response_language": "ne",
            })
        );
    }

    #[test]
    fn chat_reply_accepts_non_empty_response() {
        let payload: ChatResponse = serde_json::from_str(r#"{"response": "Hello"}"#).unwrap();
        assert_eq!(chat_reply(payload).unwrap(), "Hello");
    }

    #[test]
    fn chat_reply_rejects_missing_or_empty_field() {
        let missing: ChatResponse = serde_json::from_str("{}").unwrap();
        assert!(matches!(chat_reply(missing), Err(BackendError::Protocol(_))));

        let empty: ChatResponse = serde_json::from_str(r#"{"response": "  "}"#).unwrap();
        assert!(matches!(chat_reply(empty), Err(BackendError::Protocol(_))));

        // The backend reports its own failures as {"error": ...} with a 200
        let error: ChatResponse =
            serde_json::from_str(r#"{"error": "no relevant text found"}"#).unwrap();
        assert!(matches!(chat_reply(error), Err(BackendError::Protocol(_))));
    }

    #[test]
    fn upload_reply_extracts_file_name_and_ignores_extras() {
        let payload: UploadResponse = serde_json::from_str(
            r#"{"message": "PDF uploaded and processed successfully.", "file_name": "report.pdf"}"#,
        )
        .unwrap();
        assert_eq!(uploaded_name(payload).unwrap(), "report.pdf");
    }

    #[test]
    fn upload_reply_without_file_name_is_a_protocol_error() {
        let payload: UploadResponse =
            serde_json::from_str(r#"{"error": "Error processing PDF"}"#).unwrap();
        assert!(matches!(uploaded_name(payload), Err(BackendError::Protocol(_))));
    }

    #[test]
    fn base_url_is_normalized() {
        let client = BackendClient::new("http://127.0.0.1:8000/");
        assert_eq!(client.base_url(), "http://127.0.0.1:8000");
    }
}
