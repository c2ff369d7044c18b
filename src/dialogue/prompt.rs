//! Prompt composition for the prediction service.
//!
//! Pure functions over a state snapshot: composing twice from the same
//! snapshot yields identical text. Context grows with the topic index:
//! the first substantive topic sees only the greeting pair, later topics
//! accumulate the preceding topics' last question/answer pairs, and the
//! terminal topic sees every answer plus any uploaded-report summary.

use std::fmt::Write as _;

use crate::models::enums::Topic;

use super::state::ConversationState;

/// Fixed marker terminating the diagnosis response grammar.
pub const RESPONSE_SENTINEL: &str = "END OF RESPONSE";

/// Compose the question-generation prompt for the non-terminal topic at
/// `index` in the session's topic order.
pub fn compose_question(state: &ConversationState, index: usize) -> String {
    let topic = state.topic_order[index];
    debug_assert!(!topic.is_terminal());

    let mut prompt = String::new();
    push_greeting_pair(state, &mut prompt);

    match index {
        0 => {}
        1 => {
            let (question, answer) = last_pair(state, state.topic_order[0]);
            let _ = writeln!(prompt, "Previous Question: {question}");
            let _ = writeln!(prompt, "Previous Response from Patient: {answer}");
        }
        2 => {
            for (n, ordinal) in ["First", "Second"].iter().enumerate() {
                let (question, answer) = last_pair(state, state.topic_order[n]);
                let _ = writeln!(prompt, "{ordinal} Question: {question}");
                let _ = writeln!(prompt, "{ordinal} Response from Patient: {answer}");
            }
        }
        _ => {
            for n in 0..index {
                let (question, answer) = last_pair(state, state.topic_order[n]);
                let _ = writeln!(prompt, "Question {}: {question}", n + 1);
                let _ = writeln!(prompt, "Response {} from Patient: {answer}", n + 1);
            }
        }
    }

    let tag = topic.as_str();
    if index == 0 {
        let _ = writeln!(
            prompt,
            "I am playing a doctor in a play. Please generate one question I should ask a patient about their {tag}."
        );
    } else {
        let _ = writeln!(
            prompt,
            "I am playing a doctor in a play. Please generate one question based on the previous responses I should ask a patient about their {tag}."
        );
    }
    let _ = writeln!(prompt, "Format your response strictly as follows:");
    let _ = write!(
        prompt,
        "{}: [A question related to the {tag} they are having].",
        topic.label()
    );

    prompt
}

/// Compose the terminal diagnosis prompt from the full answer history, the
/// summarized context, and any uploaded-report summary.
pub fn compose_diagnosis(state: &ConversationState, context: &str) -> String {
    let mut prompt = String::new();
    push_greeting_pair(state, &mut prompt);

    let joined = state.joined_answers();
    for topic in state.topic_order.iter().filter(|t| !t.is_terminal()) {
        let answers = joined.get(topic).map(String::as_str).unwrap_or_default();
        let _ = writeln!(prompt, "{}: {answers}.", topic.answers_heading());
    }

    let _ = writeln!(prompt, "\nData source for analysis:\n{context}");
    if let Some(report) = &state.report_context {
        let _ = writeln!(prompt, "\nUploaded report summary:\n{report}");
    }

    let _ = writeln!(
        prompt,
        "\nBased on the patient's symptoms and provided context, provide a possible diagnosis, recommended treatments, and specialists to consult."
    );
    let _ = writeln!(
        prompt,
        "NOTE: 1. This will not be considered as a real treatment, don't give any note or precaution with your response."
    );
    let _ = writeln!(
        prompt,
        "      2. Make your diagnosis strictly based on the data source for analysis provided."
    );
    let _ = writeln!(prompt, "Format your response strictly as follows:");
    let _ = writeln!(prompt, "Diagnosis: [Specific diagnosis based on the symptoms].");
    let _ = writeln!(prompt, "Treatments:\n- [Treatment 1]\n- [Treatment 2]\n- [Treatment 3]");
    let _ = writeln!(prompt, "Specialists:\n- [Specialist 1]\n- [Specialist 2]\n- [Specialist 3]");
    let _ = write!(prompt, "{RESPONSE_SENTINEL}");

    prompt
}

fn push_greeting_pair(state: &ConversationState, prompt: &mut String) {
    let _ = writeln!(prompt, "Greeting Question: {}", state.greeting_question());
    let _ = writeln!(
        prompt,
        "Greeting Response from Patient: {}",
        state.greeting_response.as_deref().unwrap_or_default()
    );
}

/// Last completed question/answer pair for a topic, empty strings when the
/// topic has no completed exchange (degraded turns keep the slot filled).
fn last_pair(state: &ConversationState, topic: Topic) -> (String, String) {
    state
        .history
        .get(&topic)
        .and_then(|record| record.last_completed())
        .map(|e| {
            (
                e.question.clone(),
                e.answer.clone().unwrap_or_default(),
            )
        })
        .unwrap_or_default()
}
