//! HTTP implementation of the service gateway.
//!
//! One blocking `reqwest` client shared across endpoints. Connection and
//! timeout failures map to distinct `GatewayError` variants so callers can
//! log them apart; everything else that is not a 2xx-with-parseable-body
//! becomes `BadStatus` or `MalformedResponse`.

use std::collections::BTreeMap;
use std::time::Duration;

use base64::Engine as _;
use serde::{Deserialize, Serialize};

use super::{GatewayError, ServiceGateway, Transcription};
use crate::models::enums::Topic;

/// Default per-call timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Where each intake service lives.
///
/// Defaults mirror the original deployment layout: prediction, response
/// summarization, and clinic/document services on separate ports of one
/// host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceEndpoints {
    pub predict_url: String,
    pub summarize_url: String,
    pub clinic_url: String,
    pub translate_url: String,
    pub speech_url: String,
    pub upload_url: String,
}

impl ServiceEndpoints {
    /// All services on one host, original port layout.
    pub fn on_host(host: &str) -> Self {
        let host = host.trim_end_matches('/');
        Self {
            predict_url: format!("{host}:8080/predict"),
            summarize_url: format!("{host}:8090/process_responses"),
            clinic_url: format!("{host}:9070/nearest_clinic"),
            translate_url: format!("{host}:9060/translate_to_language"),
            speech_url: format!("{host}:9050/speech_to_text"),
            upload_url: format!("{host}:9070/pdf_summarizer"),
        }
    }
}

impl Default for ServiceEndpoints {
    fn default() -> Self {
        Self::on_host("http://localhost")
    }
}

/// Blocking HTTP gateway to the intake services.
pub struct HttpGateway {
    client: reqwest::blocking::Client,
    endpoints: ServiceEndpoints,
    timeout_secs: u64,
}

impl HttpGateway {
    pub fn new(endpoints: ServiceEndpoints, timeout_secs: u64) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            endpoints,
            timeout_secs,
        }
    }

    /// Default endpoints with the default timeout.
    pub fn default_local() -> Self {
        Self::new(ServiceEndpoints::default(), DEFAULT_TIMEOUT_SECS)
    }

    fn map_send_error(&self, e: reqwest::Error) -> GatewayError {
        if e.is_timeout() {
            GatewayError::Timeout(self.timeout_secs)
        } else {
            GatewayError::Transport(e.to_string())
        }
    }

    /// POST a JSON body and parse a JSON response.
    fn post_json<B: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<R, GatewayError> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(GatewayError::BadStatus {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .map_err(|e| GatewayError::MalformedResponse(e.to_string()))
    }
}

// ── Wire types ──────────────────────────────────────────────────────────

#[derive(Serialize)]
struct PredictRequest<'a> {
    question: &'a str,
    tag: &'a str,
    context: &'a str,
}

#[derive(Deserialize)]
struct PredictResponse {
    response: String,
}

#[derive(Serialize)]
struct SummarizeRequest<'a> {
    user_responses: BTreeMap<&'a str, &'a str>,
}

#[derive(Serialize)]
struct ClinicRequest<'a> {
    address: &'a str,
}

#[derive(Deserialize)]
struct ClinicResponse {
    nearest_clinic: Vec<String>,
}

#[derive(Serialize)]
struct TranslateRequest<'a> {
    text: &'a str,
    target_language: &'a str,
}

/// The translation service answers either `{translatedText}` or `{error}`.
#[derive(Deserialize)]
struct TranslateResponse {
    #[serde(rename = "translatedText")]
    translated_text: Option<String>,
    error: Option<String>,
}

#[derive(Serialize)]
struct SpeechRequest<'a> {
    audio: &'a str,
    language: &'a str,
}

#[derive(Deserialize)]
struct SpeechResponse {
    #[serde(rename = "transcribedText")]
    transcribed_text: String,
    #[serde(rename = "translatedText")]
    translated_text: String,
}

impl ServiceGateway for HttpGateway {
    fn predict(&self, question: &str, tag: &str, context: &str) -> Result<String, GatewayError> {
        let body = PredictRequest {
            question,
            tag,
            context,
        };
        let parsed: PredictResponse = self.post_json(&self.endpoints.predict_url, &body)?;
        Ok(parsed.response)
    }

    fn summarize_responses(
        &self,
        responses: &BTreeMap<Topic, String>,
    ) -> Result<String, GatewayError> {
        let user_responses: BTreeMap<&str, &str> = responses
            .iter()
            .map(|(topic, text)| (topic.as_str(), text.as_str()))
            .collect();
        let body = SummarizeRequest { user_responses };
        let parsed: PredictResponse = self.post_json(&self.endpoints.summarize_url, &body)?;
        Ok(parsed.response)
    }

    fn nearest_clinics(&self, address: &str) -> Result<Vec<String>, GatewayError> {
        let body = ClinicRequest { address };
        let parsed: ClinicResponse = self.post_json(&self.endpoints.clinic_url, &body)?;
        Ok(parsed.nearest_clinic)
    }

    fn translate(&self, text: &str, target_language: &str) -> Result<String, GatewayError> {
        let body = TranslateRequest {
            text,
            target_language,
        };
        let parsed: TranslateResponse = self.post_json(&self.endpoints.translate_url, &body)?;
        match (parsed.translated_text, parsed.error) {
            (Some(text), _) => Ok(text),
            (None, Some(error)) => Err(GatewayError::Service(error)),
            (None, None) => Err(GatewayError::MalformedResponse(
                "translation response had neither translatedText nor error".into(),
            )),
        }
    }

    fn transcribe(&self, audio: &[u8], language: &str) -> Result<Transcription, GatewayError> {
        // Audio travels base64-encoded in the JSON body.
        let encoded = base64::engine::general_purpose::STANDARD.encode(audio);
        let body = SpeechRequest {
            audio: &encoded,
            language,
        };
        let parsed: SpeechResponse = self.post_json(&self.endpoints.speech_url, &body)?;
        Ok(Transcription {
            raw: parsed.transcribed_text,
            translated: parsed.translated_text,
        })
    }

    fn upload_document(&self, file_name: &str, bytes: Vec<u8>) -> Result<String, GatewayError> {
        let part = reqwest::blocking::multipart::Part::bytes(bytes)
            .file_name(file_name.to_string());
        let form = reqwest::blocking::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(&self.endpoints.upload_url)
            .multipart(form)
            .send()
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(GatewayError::BadStatus {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: PredictResponse = response
            .json()
            .map_err(|e| GatewayError::MalformedResponse(e.to_string()))?;
        Ok(parsed.response)
    }
}
