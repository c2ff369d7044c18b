//! Data model for one intake session.

pub mod enums;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use self::enums::MessageRole;

/// Patient identity collected during the profile phase.
///
/// Fields fill in the fixed sub-order name, age, gender, address and are
/// never mutated once the profile phase completes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub age: String,
    pub gender: String,
    pub address: String,
}

/// One asked-question/user-answer pair for a topic.
///
/// `answer` is `None` while the question is outstanding; at most one
/// outstanding exchange exists per topic at any time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exchange {
    pub question: String,
    pub answer: Option<String>,
}

impl Exchange {
    pub fn open(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: None,
        }
    }
}

/// Append-only exchange log for one topic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicRecord {
    pub exchanges: Vec<Exchange>,
}

impl TopicRecord {
    /// Most recent completed question/answer pair, if any.
    pub fn last_completed(&self) -> Option<&Exchange> {
        self.exchanges.iter().rev().find(|e| e.answer.is_some())
    }

    /// The outstanding (unanswered) exchange, if any.
    pub fn outstanding_mut(&mut self) -> Option<&mut Exchange> {
        self.exchanges.last_mut().filter(|e| e.answer.is_none())
    }

    /// All answers for this topic, in order.
    pub fn answers(&self) -> Vec<&str> {
        self.exchanges
            .iter()
            .filter_map(|e| e.answer.as_deref())
            .collect()
    }
}

/// One user-visible transcript entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub text: String,
    /// Render pacing hint in milliseconds; 0 for immediate display.
    pub delay_ms: u64,
    pub timestamp: NaiveDateTime,
}

impl Message {
    pub fn bot(text: impl Into<String>) -> Self {
        Self::new(MessageRole::Bot, text, 0)
    }

    pub fn bot_delayed(text: impl Into<String>, delay_ms: u64) -> Self {
        Self::new(MessageRole::Bot, text, delay_ms)
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(MessageRole::User, text, 0)
    }

    fn new(role: MessageRole, text: impl Into<String>, delay_ms: u64) -> Self {
        Self {
            role,
            text: text.into(),
            delay_ms,
            timestamp: chrono::Local::now().naive_local(),
        }
    }
}
