/// Application-level constants
pub const APP_NAME: &str = "SaathiCare";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default log filter when RUST_LOG is not set.
pub fn default_log_filter() -> String {
    "saathi_core=info".to_string()
}

/// Locale used when the host shell never selects one.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Pacing hint for the clinic-suggestion message that follows the
/// diagnosis. The core never sleeps; the render layer applies the delay.
pub const CLINIC_SUGGESTION_DELAY_MS: u64 = 2000;

/// Fixed user-visible message for any failed service call.
pub const SERVICE_ERROR_MESSAGE: &str = "There was an error processing your request.";

/// Fixed user-visible message when a report upload fails.
pub const UPLOAD_ERROR_MESSAGE: &str = "There was a problem analyzing the file.";

/// Fixed user-visible message when clinic lookup fails.
pub const CLINIC_ERROR_MESSAGE: &str = "Error fetching clinic suggestions";

/// Fixed user-visible message when a speech transcription fails.
pub const TRANSCRIPTION_ERROR_MESSAGE: &str =
    "Sorry, I could not process your audio. Please type your answer instead.";
