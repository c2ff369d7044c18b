//! Report-upload sub-flow: the nested yes/no decision before the terminal
//! topic, with localized option strings for non-English sessions.

use crate::config;
use crate::gateway::ServiceGateway;
use crate::models::enums::UploadDecision;

/// The two fixed strings the upload decision is restricted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOptions {
    pub yes: String,
    pub no: String,
}

impl UploadOptions {
    pub fn english() -> Self {
        Self {
            yes: "Yes".to_string(),
            no: "No".to_string(),
        }
    }
}

/// Localize the yes/no options through the translate service.
///
/// English sessions skip the call entirely; a failed translation falls
/// back to the English strings rather than blocking the decision.
pub fn decision_options<G: ServiceGateway>(gateway: &G, language: &str) -> UploadOptions {
    if language == config::DEFAULT_LANGUAGE {
        return UploadOptions::english();
    }

    let yes = gateway.translate("Yes", language);
    let no = gateway.translate("No", language);
    match (yes, no) {
        (Ok(yes), Ok(no)) => UploadOptions { yes, no },
        (yes, no) => {
            let error = yes.err().or(no.err());
            tracing::warn!(
                language,
                error = ?error,
                "falling back to English upload options"
            );
            UploadOptions::english()
        }
    }
}

/// The bot question asking for the upload decision.
pub fn upload_question(options: &UploadOptions) -> String {
    format!(
        "Do you have a recent medical report you would like me to analyze? ({}/{})",
        options.yes, options.no
    )
}

/// Map a user reply to a decision; `None` for anything else.
///
/// The localized strings and their English equivalents are both accepted,
/// case-insensitively.
pub fn parse_decision(input: &str, options: &UploadOptions) -> Option<UploadDecision> {
    let reply = input.trim();
    if reply.eq_ignore_ascii_case(&options.yes) || reply.eq_ignore_ascii_case("yes") {
        Some(UploadDecision::Accept)
    } else if reply.eq_ignore_ascii_case(&options.no) || reply.eq_ignore_ascii_case("no") {
        Some(UploadDecision::Decline)
    } else {
        None
    }
}
