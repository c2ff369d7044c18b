//! Uniform wrapper for all outbound service calls.
//!
//! The dialogue machine only sees the [`ServiceGateway`] trait; the HTTP
//! implementation lives in [`http`]. Every call maps transport and
//! non-success-status failures to a typed [`GatewayError`]; the machine
//! converts those to one fixed user-visible message and keeps moving. No
//! automatic retries. The gateway never touches conversation state.

pub mod http;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::enums::Topic;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("service returned status {status}: {body}")]
    BadStatus { status: u16, body: String },

    #[error("malformed response body: {0}")]
    MalformedResponse(String),

    #[error("service rejected the request: {0}")]
    Service(String),
}

/// Result of a completed speech transcription: the raw transcript is shown
/// to the user, the translated form is what gets stored and sent onward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcription {
    pub raw: String,
    pub translated: String,
}

/// All remote calls the dialogue core makes, one method per endpoint.
///
/// Implementations are fire-and-forget per call: one request, one response
/// or one typed failure. Calls block; the machine never has more than one
/// call in flight per session.
pub trait ServiceGateway {
    /// Ask the prediction service for the next question or the diagnosis.
    fn predict(&self, question: &str, tag: &str, context: &str) -> Result<String, GatewayError>;

    /// Summarize the per-topic answers into a context block for diagnosis.
    fn summarize_responses(
        &self,
        responses: &BTreeMap<Topic, String>,
    ) -> Result<String, GatewayError>;

    /// Names of clinics near the given address.
    fn nearest_clinics(&self, address: &str) -> Result<Vec<String>, GatewayError>;

    /// Translate text into the target 2-letter language code.
    fn translate(&self, text: &str, target_language: &str) -> Result<String, GatewayError>;

    /// Transcribe captured audio; returns both raw and translated text.
    fn transcribe(&self, audio: &[u8], language: &str) -> Result<Transcription, GatewayError>;

    /// Upload a medical report document; returns its summary text.
    fn upload_document(&self, file_name: &str, bytes: Vec<u8>) -> Result<String, GatewayError>;
}
