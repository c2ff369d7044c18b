//! Typed-versus-spoken input arbitration.
//!
//! Speech input is normalized before it reaches the prediction service:
//! the canonical answer for a spoken turn is the *translated* transcript,
//! while the raw transcript is what the user sees. Typed input is assumed
//! already in the submission language and passes through untranslated. Any
//! keystroke after a transcription reverts the turn to typed-canonical.

use crate::gateway::Transcription;
use crate::models::enums::InputSource;

/// The resolved answer for one turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalInput {
    /// What goes into the transcript (raw transcript for speech).
    pub display: String,
    /// What gets stored in history and sent onward (translated for speech).
    pub stored: String,
    pub source: InputSource,
}

/// Tracks the active listening session and the last completed
/// transcription for the current turn.
#[derive(Debug, Default)]
pub struct InputArbiter {
    last_transcription: Option<Transcription>,
    listening: bool,
}

impl InputArbiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Audio capture started.
    pub fn begin_listening(&mut self) {
        self.listening = true;
    }

    /// Audio capture was cancelled (e.g. mid-session language switch).
    pub fn cancel_listening(&mut self) {
        self.listening = false;
    }

    pub fn is_listening(&self) -> bool {
        self.listening
    }

    /// A transcription completed; speech becomes the pending input source.
    pub fn transcription_received(&mut self, transcription: Transcription) {
        self.listening = false;
        self.last_transcription = Some(transcription);
    }

    /// A keystroke invalidates the pending transcription.
    pub fn keystroke(&mut self) {
        self.last_transcription = None;
    }

    /// Resolve the canonical answer for the submitted turn and clear the
    /// per-turn speech flag.
    pub fn resolve(&mut self, typed: &str) -> CanonicalInput {
        match self.last_transcription.take() {
            Some(t) => CanonicalInput {
                display: t.raw,
                stored: t.translated,
                source: InputSource::Spoken,
            },
            None => CanonicalInput {
                display: typed.to_string(),
                stored: typed.to_string(),
                source: InputSource::Typed,
            },
        }
    }

    /// Full reset alongside the session.
    pub fn reset(&mut self) {
        self.last_transcription = None;
        self.listening = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transcription() -> Transcription {
        Transcription {
            raw: "mujhe bukhar hai".into(),
            translated: "I have a fever".into(),
        }
    }

    #[test]
    fn typed_input_passes_through_unchanged() {
        let mut arbiter = InputArbiter::new();
        let resolved = arbiter.resolve("fever since yesterday");
        assert_eq!(resolved.source, InputSource::Typed);
        assert_eq!(resolved.display, "fever since yesterday");
        assert_eq!(resolved.stored, "fever since yesterday");
    }

    #[test]
    fn spoken_turn_stores_translated_and_displays_raw() {
        let mut arbiter = InputArbiter::new();
        arbiter.begin_listening();
        arbiter.transcription_received(transcription());

        assert!(!arbiter.is_listening());
        let resolved = arbiter.resolve("mujhe bukhar hai");
        assert_eq!(resolved.source, InputSource::Spoken);
        assert_eq!(resolved.display, "mujhe bukhar hai");
        assert_eq!(resolved.stored, "I have a fever");
    }

    #[test]
    fn keystroke_reverts_to_typed_canonical() {
        let mut arbiter = InputArbiter::new();
        arbiter.transcription_received(transcription());
        arbiter.keystroke();

        let resolved = arbiter.resolve("mujhe bukhar hai, aur khansi");
        assert_eq!(resolved.source, InputSource::Typed);
        assert_eq!(resolved.stored, "mujhe bukhar hai, aur khansi");
    }

    #[test]
    fn resolve_consumes_the_transcription() {
        let mut arbiter = InputArbiter::new();
        arbiter.transcription_received(transcription());
        let _ = arbiter.resolve("");

        let second = arbiter.resolve("typed follow-up");
        assert_eq!(second.source, InputSource::Typed);
    }
}
