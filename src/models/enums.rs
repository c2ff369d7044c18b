use serde::{Deserialize, Serialize};

/// Conversation phase. Exactly one is active at a time; transitions are
/// owned by the dialogue state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Session exists but the user has not pressed start.
    Idle,
    /// Walking through the fixed profile sub-steps (name, age, gender, address).
    CollectingProfile,
    /// Waiting for the user to answer the current topic question.
    AwaitingAnswer,
    /// One outstanding remote call for this session.
    CallingService,
    /// Waiting for the yes/no report-upload decision.
    AwaitingUploadDecision,
    /// Upload affordance is open; waiting for a document or a cancel.
    UploadingReport,
    /// Diagnosis delivered; waiting for the one yes/no feedback answer.
    CollectingFeedback,
    /// Terminal. Only an explicit reset leaves this phase.
    Ended,
}

impl Phase {
    /// Whether the machine expects a text submission in this phase.
    pub fn accepts_input(&self) -> bool {
        matches!(
            self,
            Self::CollectingProfile
                | Self::AwaitingAnswer
                | Self::AwaitingUploadDecision
                | Self::CollectingFeedback
        )
    }
}

/// A question-asking category. The four base topics are shuffled per
/// session; `Report` is the fixed terminal topic and is never shuffled.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    Symptom,
    Lifestyle,
    Genetic,
    OngoingMedications,
    Report,
}

impl Topic {
    /// The shuffleable base set, in canonical order.
    pub const BASE: [Topic; 4] = [
        Topic::Symptom,
        Topic::Lifestyle,
        Topic::Genetic,
        Topic::OngoingMedications,
    ];

    /// Wire-level tag sent to the prediction service.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Symptom => "symptom",
            Self::Lifestyle => "lifestyle",
            Self::Genetic => "genetic",
            Self::OngoingMedications => "ongoing_medications",
            Self::Report => "report",
        }
    }

    /// Capitalized label used in prompt format instructions.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Symptom => "Symptom",
            Self::Lifestyle => "Lifestyle",
            Self::Genetic => "Genetic",
            Self::OngoingMedications => "Ongoing medications",
            Self::Report => "Report",
        }
    }

    /// Human framing for the joined-answers lines of the diagnosis prompt.
    pub fn answers_heading(&self) -> &'static str {
        match self {
            Self::Symptom => "Patient symptoms",
            Self::Lifestyle => "Lifestyle and eating habits",
            Self::Genetic => "Family history of diseases",
            Self::OngoingMedications => "Ongoing medications",
            Self::Report => "Report",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Report)
    }
}

/// Profile collection sub-steps, in fixed order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileStep {
    Name,
    Age,
    Gender,
    Address,
}

impl ProfileStep {
    /// Fixed bot prompt asking for this field.
    pub fn prompt(&self) -> &'static str {
        match self {
            Self::Name => "Type your name",
            Self::Age => "Type your age",
            Self::Gender => "Type your gender",
            Self::Address => "Type your address",
        }
    }

    /// The following sub-step, or `None` after the last one.
    pub fn next(&self) -> Option<ProfileStep> {
        match self {
            Self::Name => Some(Self::Age),
            Self::Age => Some(Self::Gender),
            Self::Gender => Some(Self::Address),
            Self::Address => None,
        }
    }
}

/// Who produced a transcript message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    Bot,
    User,
}

/// Where the canonical answer for a turn came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputSource {
    Typed,
    Spoken,
}

/// The report-upload decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadDecision {
    Accept,
    Decline,
}

/// What the machine does when a service call fails mid-turn.
///
/// `Advance` preserves the original behavior: append one inline error
/// message and move on as if a degraded response had arrived. `Block`
/// rolls the turn back so the user can resubmit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    #[default]
    Advance,
    Block,
}
