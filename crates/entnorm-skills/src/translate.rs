//! LibreTranslate-compatible translation client.

use entnorm_core::{CollaboratorError, Translation, TranslationService};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const SERVICE_NAME: &str = "libretranslate";

#[derive(Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
    format: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranslateResponse {
    translated_text: String,
    #[serde(default)]
    detected_language: Option<DetectedLanguage>,
}

#[derive(Deserialize)]
struct DetectedLanguage {
    language: String,
}

/// `POST {endpoint}/translate` with automatic source detection.
pub struct HttpTranslator {
    http: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpTranslator {
    pub fn new(endpoint: &str, api_key: Option<String>) -> Result<Self, CollaboratorError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| CollaboratorError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

/// Decodes a translate response body.
pub fn parse_response(body: &str, original: &str) -> Result<Translation, CollaboratorError> {
    let parsed: TranslateResponse =
        serde_json::from_str(body).map_err(|e| CollaboratorError::Malformed(e.to_string()))?;
    Ok(Translation {
        translated_text: parsed.translated_text,
        source_language: parsed
            .detected_language
            .map(|d| d.language)
            .unwrap_or_else(|| "auto".to_string()),
        original: original.to_string(),
    })
}

#[async_trait::async_trait]
impl TranslationService for HttpTranslator {
    fn name(&self) -> &str {
        SERVICE_NAME
    }

    async fn translate(&self, text: &str, target: &str) -> Result<Translation, CollaboratorError> {
        let request = TranslateRequest {
            q: text,
            source: "auto",
            target,
            format: "text",
            api_key: self.api_key.as_deref(),
        };
        let response = self
            .http
            .post(format!("{}/translate", self.endpoint))
            .json(&request)
            .send()
            .await
            .map_err(|e| CollaboratorError::Transport(e.to_string()))?;

        let status = response.status();
        match status {
            StatusCode::TOO_MANY_REQUESTS | StatusCode::SERVICE_UNAVAILABLE => {
                return Err(CollaboratorError::Unavailable(format!("{SERVICE_NAME} {status}")));
            }
            s if !s.is_success() => {
                let body = response.text().await.unwrap_or_default();
                return Err(CollaboratorError::Transport(format!(
                    "{SERVICE_NAME} {status}: {}",
                    body.chars().take(200).collect::<String>()
                )));
            }
            _ => {}
        }

        let body = response
            .text()
            .await
            .map_err(|e| CollaboratorError::Malformed(e.to_string()))?;
        parse_response(&body, text)
    }
}
