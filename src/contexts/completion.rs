use futures_util::StreamExt;
use serde_json::{json, Value};
use std::fmt;
use std::future::Future;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Errors that can occur while streaming a completion
#[derive(Debug)]
pub enum CompletionError {
    MissingApiKey,
    Configuration(String),
    Network(String),
    Status { status: u16, body: String },
    Stream(String),
}

impl fmt::Display for CompletionError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CompletionError::MissingApiKey => write!(f, "OPENAI_API_KEY is not set"),
            CompletionError::Configuration(details) => {
                write!(f, "Invalid client configuration: {}", details)
            }
            CompletionError::Network(details) => write!(f, "Request failed: {}", details),
            CompletionError::Status { status, body } => {
                write!(f, "Model API returned {}: {}", status, body)
            }
            CompletionError::Stream(details) => write!(f, "Response stream broke: {}", details),
        }
    }
}

impl std::error::Error for CompletionError {}

/// A populated prompt addressed to one model
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub system_prompt: String,
    pub user_prompt: String,
    pub temperature: Option<f64>,
}

impl CompletionRequest {
    fn to_body(&self) -> Value {
        let mut body = json!({
            "model": self.model,
            "stream": true,
            "messages": [
                {"role": "system", "content": self.system_prompt},
                {"role": "user", "content": self.user_prompt},
            ],
        });
        if let Some(temperature) = self.temperature {
            body["temperature"] = json!(temperature);
        }
        body
    }
}

/// Anything that can stream text for a prompt.
///
/// Chunks are handed to `on_chunk` in arrival order; the full text is
/// returned once the stream ends.
pub trait CompletionSource {
    fn stream(
        &self,
        request: &CompletionRequest,
        on_chunk: &mut dyn FnMut(&str),
    ) -> impl Future<Output = Result<String, CompletionError>>;
}

/// Splits a server-sent event byte stream into content deltas
#[derive(Debug, Default)]
pub struct SseDecoder {
    pending: Vec<u8>,
    done: bool,
}

impl SseDecoder {
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Feeds raw bytes and returns the content deltas of every complete line
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);

        let mut deltas = Vec::new();
        while let Some(newline) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=newline).collect();
            if self.done {
                continue;
            }
            if let Some(delta) = self.decode_line(&String::from_utf8_lossy(&line)) {
                deltas.push(delta);
            }
        }
        deltas
    }

    /// Decodes whatever is left once the connection closes
    pub fn flush(&mut self) -> Vec<String> {
        if self.pending.is_empty() || self.done {
            return Vec::new();
        }
        let rest = std::mem::take(&mut self.pending);
        self.decode_line(&String::from_utf8_lossy(&rest))
            .into_iter()
            .collect()
    }

    fn decode_line(&mut self, line: &str) -> Option<String> {
        let line = line.trim();
        if line.is_empty() || line.starts_with(':') {
            return None;
        }
        let data = line.strip_prefix("data:")?.trim_start();
        if data == "[DONE]" {
            self.done = true;
            return None;
        }

        match serde_json::from_str::<Value>(data) {
            Ok(event) => event
                .pointer("/choices/0/delta/content")
                .and_then(Value::as_str)
                .filter(|content| !content.is_empty())
                .map(str::to_string),
            Err(e) => {
                tracing::debug!(error = %e, "skipping undecodable event");
                None
            }
        }
    }
}

/// Chat-completions client for OpenAI-compatible endpoints
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl OpenAiClient {
    /// Creates a client
    ///
    /// # Arguments
    /// * `api_key` - Bearer token sent with every request
    /// * `base_url` - API root; defaults to the public OpenAI endpoint
    pub fn new(api_key: String, base_url: Option<String>) -> Result<Self, CompletionError> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| CompletionError::Configuration(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            api_key,
        })
    }

    /// Reads `OPENAI_API_KEY` and `FOLIO_BASE_URL`
    pub fn from_env() -> Result<Self, CompletionError> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or(CompletionError::MissingApiKey)?;
        let base_url = std::env::var("FOLIO_BASE_URL").ok();
        Self::new(api_key, base_url)
    }
}

impl CompletionSource for OpenAiClient {
    async fn stream(
        &self,
        request: &CompletionRequest,
        on_chunk: &mut dyn FnMut(&str),
    ) -> Result<String, CompletionError> {
        let url = format!("{}/chat/completions", self.base_url);
        tracing::debug!(model = %request.model, %url, "requesting completion");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request.to_body())
            .send()
            .await
            .map_err(|e| CompletionError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let mut decoder = SseDecoder::default();
        let mut text = String::new();
        let mut bytes = response.bytes_stream();

        while let Some(chunk) = bytes.next().await {
            let chunk = chunk.map_err(|e| CompletionError::Stream(e.to_string()))?;
            for delta in decoder.feed(&chunk) {
                on_chunk(&delta);
                text.push_str(&delta);
            }
            if decoder.is_done() {
                break;
            }
        }
        for delta in decoder.flush() {
            on_chunk(&delta);
            text.push_str(&delta);
        }

        tracing::debug!(chars = text.len(), "completion finished");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(content: &str) -> String {
        format!(
            "data: {}\n\n",
            json!({"choices": [{"delta": {"content": content}}]})
        )
    }

    #[test]
    fn test_decodes_deltas_in_order() {
        let mut decoder = SseDecoder::default();
        let input = format!("{}{}data: [DONE]\n\n", event("{\"type\""), event(":\"Card\"}"));
        let deltas = decoder.feed(input.as_bytes());
        assert_eq!(deltas, vec!["{\"type\"", ":\"Card\"}"]);
        assert!(decoder.is_done());
    }

    #[test]
    fn test_lines_split_across_reads() {
        let mut decoder = SseDecoder::default();
        let line = event("héllo");
        let bytes = line.as_bytes();
        // split inside the multi-byte character
        let cut = line.find('é').unwrap() + 1;

        assert!(decoder.feed(&bytes[..cut]).is_empty());
        assert_eq!(decoder.feed(&bytes[cut..]), vec!["héllo"]);
    }

    #[test]
    fn test_ignores_comments_roles_and_garbage() {
        let mut decoder = SseDecoder::default();
        let input = concat!(
            ": keep-alive\n",
            "event: message\n",
            "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n",
            "data: not json\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"\"}}]}\n",
        );
        assert!(decoder.feed(input.as_bytes()).is_empty());
        assert!(!decoder.is_done());
    }

    #[test]
    fn test_nothing_after_done() {
        let mut decoder = SseDecoder::default();
        let input = format!("data: [DONE]\n{}", event("late"));
        assert!(decoder.feed(input.as_bytes()).is_empty());
        assert!(decoder.flush().is_empty());
    }

    #[test]
    fn test_flush_decodes_unterminated_line() {
        let mut decoder = SseDecoder::default();
        let line = event("tail");
        assert!(decoder.feed(line.trim_end().as_bytes()).is_empty());
        assert_eq!(decoder.flush(), vec!["tail"]);
    }

    #[test]
    fn test_request_body() {
        let request = CompletionRequest {
            model: "gpt-4o-mini".to_string(),
            system_prompt: "sys".to_string(),
            user_prompt: "user".to_string(),
            temperature: Some(0.2),
        };
        let body = request.to_body();
        assert_eq!(body["stream"], true);
        assert_eq!(body["messages"][1]["content"], "user");
        assert_eq!(body["temperature"], 0.2);

        let without = CompletionRequest {
            temperature: None,
            ..request
        };
        assert!(without.to_body().get("temperature").is_none());
    }

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let client =
            OpenAiClient::new("key".to_string(), Some("http://localhost:8080/v1/".to_string()))
                .unwrap();
        assert_eq!(client.base_url, "http://localhost:8080/v1");
    }
}
