//! The single mutable aggregate for one intake session.
//!
//! Only the dialogue machine writes this; every other component receives
//! `&ConversationState` or plain values copied out of it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config;
use crate::models::enums::{Phase, Topic};
use crate::models::{Message, Profile, TopicRecord};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    pub session_id: Uuid,
    pub phase: Phase,
    pub profile: Profile,
    /// Random permutation of the base topics with `Report` fixed last.
    /// Empty until profile collection completes.
    pub topic_order: Vec<Topic>,
    /// Cursor into `topic_order`; -1 before the first topic, monotonically
    /// incremented, reset only by a full reset.
    pub topic_index: isize,
    /// The user's reply to the fixed greeting (the index -1 turn).
    pub greeting_response: Option<String>,
    /// Per-topic question/answer log, keyed uniformly by topic.
    pub history: BTreeMap<Topic, TopicRecord>,
    /// Summary text from an uploaded report, merged into terminal-topic
    /// context once set.
    pub report_context: Option<String>,
    /// Selected locale code.
    pub language: String,
    /// True only while the machine waits on the yes/no upload decision.
    pub pending_upload_decision: bool,
    /// The one yes/no feedback answer collected before the session ends.
    pub feedback: Option<bool>,
    /// User-visible message log, in display order.
    pub transcript: Vec<Message>,
}

impl Default for ConversationState {
    fn default() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            phase: Phase::Idle,
            profile: Profile::default(),
            topic_order: Vec::new(),
            topic_index: -1,
            greeting_response: None,
            history: BTreeMap::new(),
            report_context: None,
            language: config::DEFAULT_LANGUAGE.to_string(),
            pending_upload_decision: false,
            feedback: None,
            transcript: Vec::new(),
        }
    }
}

impl ConversationState {
    /// The fixed greeting question, derived from the collected name.
    pub fn greeting_question(&self) -> String {
        format!(
            "Hi {}, I am your doctor. How can I help you today?",
            self.profile.name
        )
    }

    /// Topic at the current cursor, if the cursor is inside the order.
    pub fn current_topic(&self) -> Option<Topic> {
        usize::try_from(self.topic_index)
            .ok()
            .and_then(|i| self.topic_order.get(i))
            .copied()
    }

    /// Per-topic answers joined by ", ", for the summarize call and the
    /// diagnosis prompt. Terminal topic excluded.
    pub fn joined_answers(&self) -> BTreeMap<Topic, String> {
        self.history
            .iter()
            .filter(|(topic, _)| !topic.is_terminal())
            .map(|(topic, record)| (*topic, record.answers().join(", ")))
            .collect()
    }

    /// Append a transcript message.
    pub(crate) fn push_message(&mut self, message: Message) {
        self.transcript.push(message);
    }
}
