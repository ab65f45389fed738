//! Best-effort label translation
//!
//! Report labels are Arabic; the translator turns them into the configured
//! target language for display. A failed call never reaches the caller, the
//! original text is shown instead.

use crate::config::TranslationConfig;
use reqwest::blocking::Client;
use std::time::Duration;
use tracing::{debug, warn};

/// Errors from a single translation request
#[derive(Debug, thiserror::Error)]
pub enum TranslateError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("translation service returned status {0}")]
    Status(u16),

    #[error("unexpected response shape")]
    MalformedResponse,

    #[error("empty translation")]
    Empty,
}

/// Translate a label; implementations must not fail
pub trait Translator {
    fn translate(&self, text: &str) -> String;
}

/// Returns labels unchanged (`--no-translate`, tests)
#[derive(Debug, Default, Clone, Copy)]
pub struct Passthrough;

impl Translator for Passthrough {
    fn translate(&self, text: &str) -> String {
        text.to_string()
    }
}

/// Google Translate web endpoint, auto-detected source language
#[derive(Debug)]
pub struct GoogleTranslator {
    client: Client,
    endpoint: String,
    source: String,
    target: String,
}

impl GoogleTranslator {
    pub fn new(config: &TranslationConfig) -> Result<Self, TranslateError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            source: config.source.clone(),
            target: config.target.clone(),
        })
    }

    fn try_translate(&self, text: &str) -> Result<String, TranslateError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("client", "gtx"),
                ("sl", self.source.as_str()),
                ("tl", self.target.as_str()),
                ("dt", "t"),
                ("q", text),
            ])
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(TranslateError::Status(status.as_u16()));
        }

        let body: serde_json::Value = response.json()?;
        parse_response(&body)
    }
}

impl Translator for GoogleTranslator {
    fn translate(&self, text: &str) -> String {
        match self.try_translate(text) {
            Ok(translated) => {
                debug!("Translated {:?} -> {:?}", text, translated);
                translated
            }
            Err(e) => {
                warn!("Translation error: {}", e);
                text.to_string()
            }
        }
    }
}

/// Response is `[[["translated", "original", ...], ...], ...]`; the first
/// element holds one segment per sentence.
fn parse_response(body: &serde_json::Value) -> Result<String, TranslateError> {
    let segments = body
        .get(0)
        .and_then(|v| v.as_array())
        .ok_or(TranslateError::MalformedResponse)?;

    let translated: String = segments
        .iter()
        .filter_map(|segment| segment.get(0).and_then(|s| s.as_str()))
        .collect();

    let translated = translated.trim();
    if translated.is_empty() {
        return Err(TranslateError::Empty);
    }

    Ok(translated.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_response_joins_segments() {
        let body = json!([[["Aleppo - ", "حلب - ", null], ["Al-Bab", "الباب", null]], null, "ar"]);
        assert_eq!(parse_response(&body).unwrap(), "Aleppo - Al-Bab");
    }

    #[test]
    fn test_parse_response_rejects_bad_shapes() {
        assert!(matches!(
            parse_response(&json!({"error": "nope"})),
            Err(TranslateError::MalformedResponse)
        ));
        assert!(matches!(parse_response(&json!([[]])), Err(TranslateError::Empty)));
    }

    #[test]
    fn test_unreachable_endpoint_falls_back_to_input() {
        let config = TranslationConfig {
            enabled: true,
            endpoint: "http://127.0.0.1:9/translate_a/single".to_string(),
            timeout_secs: 1,
            ..TranslationConfig::default()
        };
        let translator = GoogleTranslator::new(&config).unwrap();

        assert_eq!(translator.translate("حلب - حلب"), "حلب - حلب");
    }

    #[test]
    fn test_passthrough() {
        assert_eq!(Passthrough.translate("حلب"), "حلب");
    }
}
