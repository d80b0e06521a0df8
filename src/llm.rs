use serde_json::{json, Value};
use thiserror::Error;

use crate::fields::LessonContent;
use crate::prompt::SYSTEM_PROMPT;

pub const DEFAULT_API_BASE: &str = "https://api.deepseek.com/v1";
const MODEL: &str = "deepseek-chat";
const TEMPERATURE: f64 = 0.7;
const MAX_TOKENS: u32 = 4000;

#[derive(Debug, Error)]
pub enum GenerateError {
    /// Network-level failure; the caller retries manually.
    #[error("生成服务无法连接，请稍后重试")]
    Transport(#[source] reqwest::Error),
    /// Non-success HTTP status from the completion endpoint.
    #[error("生成服务返回错误（HTTP {status}）")]
    Api { status: u16, body: Value },
    /// Response text was not valid JSON after fence-stripping. The raw text
    /// is kept for diagnostics only and is never surfaced verbatim.
    #[error("AI返回的内容格式不正确，请重试")]
    Parse { raw: String },
}

/// Chat-completion client. One awaited POST per generation; no retry, no
/// deadline of its own (the frontend keeps its trigger disabled while a call
/// is in flight).
pub struct ChatClient {
    http: reqwest::blocking::Client,
    api_base: String,
    api_key: String,
}

impl ChatClient {
    pub fn new(api_base: &str, api_key: &str) -> Result<Self, GenerateError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(None::<std::time::Duration>)
            .build()
            .map_err(GenerateError::Transport)?;
        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// Send the prompt and parse the first candidate message into
    /// `LessonContent`. Touches nothing but the network.
    pub fn generate(&self, prompt: &str) -> Result<LessonContent, GenerateError> {
        let url = format!("{}/chat/completions", self.api_base);
        let body = json!({
            "model": MODEL,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": prompt },
            ],
            "temperature": TEMPERATURE,
            "max_tokens": MAX_TOKENS,
        });

        let resp = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .map_err(GenerateError::Transport)?;

        let status = resp.status();
        let text = resp.text().map_err(GenerateError::Transport)?;

        if !status.is_success() {
            let body = serde_json::from_str(&text).unwrap_or(Value::Null);
            return Err(GenerateError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let content = extract_message_content(&text)
            .ok_or_else(|| GenerateError::Parse { raw: text.clone() })?;
        parse_lesson_content(&content)
    }
}

/// Pull `choices[0].message.content` out of a completion response body.
fn extract_message_content(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .get("choices")?
        .get(0)?
        .get("message")?
        .get("content")?
        .as_str()
        .map(|s| s.to_string())
}

/// Remove a leading ```json / ``` marker (plus one optional newline) and the
/// matching trailing marker, if present. Unfenced text passes through.
pub fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    let rest = if let Some(rest) = text.strip_prefix("```json") {
        rest
    } else if let Some(rest) = text.strip_prefix("```") {
        rest
    } else {
        return text;
    };
    let rest = rest.strip_prefix('\n').unwrap_or(rest);
    match rest.strip_suffix("```") {
        Some(inner) => inner.strip_suffix('\n').unwrap_or(inner),
        None => rest,
    }
}

/// Fence-strip and parse generated text into `LessonContent`.
pub fn parse_lesson_content(text: &str) -> Result<LessonContent, GenerateError> {
    let stripped = strip_code_fence(text);
    serde_json::from_str(stripped).map_err(|e| {
        tracing::warn!(error = %e, raw = %text, "generated content is not valid JSON");
        GenerateError::Parse {
            raw: text.to_string(),
        }
    })
}
