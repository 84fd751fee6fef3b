//! LibreTranslate-style HTTP client
//!
//! `POST {url}/translate` with `{q, source, target, format: "text"}`,
//! answered by `{translatedText}` or `{error}`.

use reflow_core::{TranslationError, Translator};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
    format: &'a str,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    #[serde(rename = "translatedText")]
    translated_text: Option<String>,
    error: Option<String>,
}

pub struct LibreTranslateClient {
    base_url: String,
    timeout: Duration,
}

impl LibreTranslateClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn endpoint(&self) -> String {
        format!("{}/translate", self.base_url)
    }
}

impl Translator for LibreTranslateClient {
    fn translate(&self, text: &str, source: &str, target: &str) -> Result<String, TranslationError> {
        let request = TranslateRequest {
            q: text,
            source,
            target,
            format: "text",
        };
        debug!("POST {} ({} chars, {} → {})", self.endpoint(), text.len(), source, target);

        let response = ureq::post(&self.endpoint())
            .set("content-type", "application/json")
            .timeout(self.timeout)
            .send_json(&request)
            .map_err(request_error)?;

        let body: TranslateResponse = response
            .into_json()
            .map_err(|e| TranslationError::MalformedResponse(e.to_string()))?;
        parse_response(body)
    }

    fn name(&self) -> &str {
        "libretranslate"
    }

    fn identity(&self) -> String {
        format!("{}@{}", self.name(), self.base_url)
    }
}

fn request_error(error: ureq::Error) -> TranslationError {
    match error {
        ureq::Error::Status(code, response) => {
            let detail = response
                .into_json::<TranslateResponse>()
                .ok()
                .and_then(|body| body.error)
                .unwrap_or_default();
            TranslationError::Request(format!("HTTP {} {}", code, detail).trim_end().to_string())
        }
        ureq::Error::Transport(transport) => {
            let message = transport.to_string();
            if message.contains("timed out") {
                TranslationError::Timeout
            } else {
                TranslationError::Request(message)
            }
        }
    }
}

fn parse_response(body: TranslateResponse) -> Result<String, TranslationError> {
    match (body.translated_text, body.error) {
        (Some(text), _) => Ok(text),
        (None, Some(error)) => Err(TranslationError::Request(error)),
        (None, None) => Err(TranslationError::MalformedResponse(
            "missing translatedText".to_string(),
        )),
    }
}
