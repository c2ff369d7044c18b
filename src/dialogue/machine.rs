//! The dialogue state machine: single authority for phase transitions and
//! the only writer of [`ConversationState`].
//!
//! The machine reacts to discrete external events (start, text submission,
//! completed transcription, upload result, language switch, reset) and
//! performs a bounded amount of synchronous mutation per event. The one
//! blocking gateway call inside a turn is the only suspension point, so at
//! most one service request is ever outstanding per session and history
//! entries are appended in strict request/response order.

use crate::config;
use crate::gateway::ServiceGateway;
use crate::models::enums::{FailurePolicy, Phase, ProfileStep, Topic, UploadDecision};
use crate::models::{Exchange, Message};

use super::input::{CanonicalInput, InputArbiter};
use super::report::{self, UploadOptions};
use super::{prompt, sequencer, DialogueError};
use super::state::ConversationState;

pub struct DialogueMachine<G: ServiceGateway> {
    state: ConversationState,
    gateway: G,
    arbiter: InputArbiter,
    failure_policy: FailurePolicy,
    profile_step: Option<ProfileStep>,
    upload_options: Option<UploadOptions>,
}

impl<G: ServiceGateway> DialogueMachine<G> {
    pub fn new(gateway: G) -> Self {
        Self::with_policy(gateway, FailurePolicy::default())
    }

    pub fn with_policy(gateway: G, failure_policy: FailurePolicy) -> Self {
        Self {
            state: ConversationState::default(),
            gateway,
            arbiter: InputArbiter::new(),
            failure_policy,
            profile_step: None,
            upload_options: None,
        }
    }

    /// Read-only snapshot for the render layer.
    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    /// Current profile sub-step, while collecting the profile.
    pub fn profile_step(&self) -> Option<ProfileStep> {
        self.profile_step
    }

    pub fn is_listening(&self) -> bool {
        self.arbiter.is_listening()
    }

    /// Start command: `Idle → CollectingProfile`.
    pub fn start(&mut self) -> Result<(), DialogueError> {
        if self.state.phase != Phase::Idle {
            return Err(DialogueError::AlreadyStarted);
        }
        self.state.phase = Phase::CollectingProfile;
        self.profile_step = Some(ProfileStep::Name);
        self.state.push_message(Message::bot(ProfileStep::Name.prompt()));
        tracing::info!(session = %self.state.session_id, "session started");
        Ok(())
    }

    /// A keystroke in the input field; invalidates any pending transcription.
    pub fn keystroke(&mut self) {
        self.arbiter.keystroke();
    }

    /// Audio capture started.
    pub fn begin_listening(&mut self) {
        self.arbiter.begin_listening();
    }

    /// Captured audio is ready: transcribe it and stage the result as the
    /// pending spoken input. A failed transcription surfaces one inline
    /// message and leaves the turn typed-canonical.
    pub fn audio_captured(&mut self, audio: &[u8]) {
        match self.gateway.transcribe(audio, &self.state.language) {
            Ok(transcription) => self.arbiter.transcription_received(transcription),
            Err(e) => {
                tracing::warn!(error = %e, "transcription failed");
                self.arbiter.cancel_listening();
                self.state
                    .push_message(Message::bot(config::TRANSCRIPTION_ERROR_MESSAGE));
            }
        }
    }

    /// Switch the session locale. Cancels any in-progress listening; never
    /// touches history.
    pub fn set_language(&mut self, language: &str) {
        if self.arbiter.is_listening() {
            tracing::debug!(language, "language switch cancelled active listening");
        }
        self.arbiter.cancel_listening();
        self.state.language = language.to_string();
    }

    /// Submit the current input-field text for the active turn.
    ///
    /// The input arbiter decides the canonical answer: the translated
    /// transcript when the last input event was speech, the typed text
    /// otherwise. Empty submissions are rejected before any dispatch.
    pub fn submit(&mut self, typed: &str) -> Result<(), DialogueError> {
        if !self.state.phase.accepts_input() {
            return Err(DialogueError::UnexpectedInput(self.state.phase));
        }
        let input = self.arbiter.resolve(typed);
        if input.stored.trim().is_empty() {
            return Err(DialogueError::EmptyInput);
        }

        match self.state.phase {
            Phase::CollectingProfile => self.handle_profile(input),
            Phase::AwaitingAnswer => self.handle_answer(input),
            Phase::AwaitingUploadDecision => self.handle_upload_decision(input),
            Phase::CollectingFeedback => self.handle_feedback(input),
            _ => unreachable!("accepts_input covers the input phases"),
        }
        Ok(())
    }

    /// Deliver the selected document for the open upload affordance.
    pub fn upload_report(
        &mut self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<(), DialogueError> {
        if self.state.phase != Phase::UploadingReport {
            return Err(DialogueError::NoUploadInProgress);
        }
        self.state.push_message(Message::user(file_name));
        match self.gateway.upload_document(file_name, bytes) {
            Ok(summary) => {
                tracing::info!("report uploaded and summarized");
                self.state.report_context = Some(summary);
            }
            Err(e) => {
                tracing::warn!(error = %e, "report upload failed");
                self.state
                    .push_message(Message::bot(config::UPLOAD_ERROR_MESSAGE));
            }
        }
        // With or without report context, the terminal topic runs now.
        self.run_terminal();
        Ok(())
    }

    /// Close the upload affordance without a document and re-ask the
    /// decision. Prior state is kept.
    pub fn cancel_upload(&mut self) -> Result<(), DialogueError> {
        if self.state.phase != Phase::UploadingReport {
            return Err(DialogueError::NoUploadInProgress);
        }
        let options = self
            .upload_options
            .clone()
            .unwrap_or_else(UploadOptions::english);
        let question = report::upload_question(&options);
        self.state
            .history
            .entry(Topic::Report)
            .or_default()
            .exchanges
            .push(Exchange::open(question.clone()));
        self.state.push_message(Message::bot(question));
        self.state.pending_upload_decision = true;
        self.state.phase = Phase::AwaitingUploadDecision;
        Ok(())
    }

    /// Explicit reset: discard all state and return to `Idle`.
    pub fn reset(&mut self) {
        tracing::info!(session = %self.state.session_id, "session reset");
        self.state = ConversationState::default();
        self.arbiter.reset();
        self.profile_step = None;
        self.upload_options = None;
    }

    // ── Per-phase handlers ──────────────────────────────────────────────

    fn handle_profile(&mut self, input: CanonicalInput) {
        self.state.push_message(Message::user(input.display));
        let step = self.profile_step.unwrap_or(ProfileStep::Name);
        match step {
            ProfileStep::Name => self.state.profile.name = input.stored,
            ProfileStep::Age => self.state.profile.age = input.stored,
            ProfileStep::Gender => self.state.profile.gender = input.stored,
            ProfileStep::Address => self.state.profile.address = input.stored,
        }

        match step.next() {
            Some(next) => {
                self.profile_step = Some(next);
                self.state.push_message(Message::bot(next.prompt()));
            }
            None => {
                // Profile complete: freeze it, draw the topic order, greet.
                self.profile_step = None;
                self.state.topic_order =
                    sequencer::shuffled_topic_order(&mut rand::thread_rng());
                self.state.topic_index = -1;
                let greeting = self.state.greeting_question();
                self.state.push_message(Message::bot(greeting));
                self.state.phase = Phase::AwaitingAnswer;
                tracing::info!(
                    order = ?self.state.topic_order,
                    "profile collected, topic order drawn"
                );
            }
        }
    }

    fn handle_answer(&mut self, input: CanonicalInput) {
        self.state.push_message(Message::user(input.display));

        if self.state.topic_index < 0 {
            self.state.greeting_response = Some(input.stored);
        } else if let Some(topic) = self.state.current_topic() {
            let record = self.state.history.entry(topic).or_default();
            match record.outstanding_mut() {
                Some(exchange) => exchange.answer = Some(input.stored),
                None => record.exchanges.push(Exchange {
                    question: String::new(),
                    answer: Some(input.stored),
                }),
            }
        }

        self.state.topic_index += 1;
        let Some(next_topic) = self.state.current_topic() else {
            self.state.phase = Phase::Ended;
            return;
        };

        if next_topic.is_terminal() {
            self.enter_upload_decision();
        } else {
            self.call_service(self.state.topic_index as usize);
        }
    }

    fn handle_upload_decision(&mut self, input: CanonicalInput) {
        self.state.push_message(Message::user(input.display.clone()));
        let options = self
            .upload_options
            .clone()
            .unwrap_or_else(UploadOptions::english);

        let Some(decision) = report::parse_decision(&input.stored, &options) else {
            self.state.push_message(Message::bot(format!(
                "Please answer {} or {}.",
                options.yes, options.no
            )));
            return;
        };

        if let Some(record) = self.state.history.get_mut(&Topic::Report) {
            if let Some(exchange) = record.outstanding_mut() {
                exchange.answer = Some(input.stored);
            }
        }
        self.state.pending_upload_decision = false;

        match decision {
            UploadDecision::Accept => {
                self.state.phase = Phase::UploadingReport;
                self.state
                    .push_message(Message::bot("Please upload your medical report."));
            }
            UploadDecision::Decline => {
                tracing::debug!("upload declined, diagnosing from history only");
                self.run_terminal();
            }
        }
    }

    fn handle_feedback(&mut self, input: CanonicalInput) {
        self.state.push_message(Message::user(input.display));
        let options = UploadOptions::english();
        let Some(decision) = report::parse_decision(&input.stored, &options) else {
            self.state
                .push_message(Message::bot("Please answer Yes or No."));
            return;
        };
        self.state.feedback = Some(decision == UploadDecision::Accept);
        self.state
            .push_message(Message::bot("Thank you for your feedback. Take care!"));
        self.state.phase = Phase::Ended;
        tracing::info!(session = %self.state.session_id, "session ended");
    }

    // ── Service turns ───────────────────────────────────────────────────

    /// Ask the prediction service for the question of the non-terminal
    /// topic at `index`. On failure, one inline error message is appended
    /// and the failure policy decides between advancing with a degraded
    /// slot and rolling the turn back.
    fn call_service(&mut self, index: usize) {
        self.state.phase = Phase::CallingService;
        let topic = self.state.topic_order[index];
        let question_prompt = prompt::compose_question(&self.state, index);
        tracing::debug!(topic = topic.as_str(), index, "requesting next question");

        match self.gateway.predict(&question_prompt, topic.as_str(), "") {
            Ok(question) => {
                self.state
                    .history
                    .entry(topic)
                    .or_default()
                    .exchanges
                    .push(Exchange::open(question.clone()));
                self.state.push_message(Message::bot(question));
                self.state.phase = Phase::AwaitingAnswer;
            }
            Err(e) => {
                tracing::warn!(error = %e, topic = topic.as_str(), "prediction failed");
                self.state
                    .push_message(Message::bot(config::SERVICE_ERROR_MESSAGE));
                match self.failure_policy {
                    FailurePolicy::Advance => {
                        // Keep the slot filled so the next answer has a
                        // question to attach to.
                        self.state
                            .history
                            .entry(topic)
                            .or_default()
                            .exchanges
                            .push(Exchange::open(config::SERVICE_ERROR_MESSAGE));
                        self.state.phase = Phase::AwaitingAnswer;
                    }
                    FailurePolicy::Block => self.rollback_turn(index),
                }
            }
        }
    }

    /// Undo the failed turn so the user can resubmit: cursor back, answer
    /// un-recorded. The inline error message stays in the transcript.
    fn rollback_turn(&mut self, failed_index: usize) {
        self.state.topic_index = failed_index as isize - 1;
        if self.state.topic_index < 0 {
            self.state.greeting_response = None;
        } else if let Some(topic) = self.state.current_topic() {
            if let Some(record) = self.state.history.get_mut(&topic) {
                if let Some(exchange) = record.exchanges.last_mut() {
                    exchange.answer = None;
                }
            }
        }
        self.state.phase = Phase::AwaitingAnswer;
    }

    fn enter_upload_decision(&mut self) {
        let options = report::decision_options(&self.gateway, &self.state.language);
        let question = report::upload_question(&options);
        self.state
            .history
            .entry(Topic::Report)
            .or_default()
            .exchanges
            .push(Exchange::open(question.clone()));
        self.state.push_message(Message::bot(question));
        self.upload_options = Some(options);
        self.state.pending_upload_decision = true;
        self.state.phase = Phase::AwaitingUploadDecision;
    }

    /// The terminal topic: summarize answers, request the diagnosis, then
    /// append the delayed clinic suggestion and move to feedback.
    ///
    /// Failures inside this turn degrade but never stall it: a failed
    /// summarize call yields an empty context, a failed diagnosis or clinic
    /// lookup yields its fixed inline message.
    fn run_terminal(&mut self) {
        self.state.phase = Phase::CallingService;
        let answers = self.state.joined_answers();
        let context = match self.gateway.summarize_responses(&answers) {
            Ok(context) => context,
            Err(e) => {
                tracing::warn!(error = %e, "summarization failed, diagnosing without context");
                String::new()
            }
        };

        let diagnosis_prompt = prompt::compose_diagnosis(&self.state, &context);
        match self
            .gateway
            .predict(&diagnosis_prompt, Topic::Report.as_str(), &context)
        {
            Ok(diagnosis) => self.state.push_message(Message::bot(diagnosis)),
            Err(e) => {
                tracing::warn!(error = %e, "diagnosis prediction failed");
                self.state
                    .push_message(Message::bot(config::SERVICE_ERROR_MESSAGE));
            }
        }

        match self.gateway.nearest_clinics(&self.state.profile.address) {
            Ok(clinics) => self.state.push_message(Message::bot_delayed(
                format!(
                    "You can visit any of the following clinics:\n{}",
                    clinics.join(",\n")
                ),
                config::CLINIC_SUGGESTION_DELAY_MS,
            )),
            Err(e) => {
                tracing::warn!(error = %e, "clinic lookup failed");
                self.state.push_message(Message::bot_delayed(
                    config::CLINIC_ERROR_MESSAGE,
                    config::CLINIC_SUGGESTION_DELAY_MS,
                ));
            }
        }

        self.state.topic_index = self.state.topic_order.len() as isize;
        self.state.phase = Phase::CollectingFeedback;
        self.state
            .push_message(Message::bot("Was this consultation helpful? (Yes/No)"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::{BTreeMap, VecDeque};

    use crate::gateway::{GatewayError, Transcription};
    use crate::models::enums::MessageRole;

    fn transport_err() -> GatewayError {
        GatewayError::Transport("connection refused".into())
    }

    #[derive(Debug)]
    struct PredictCall {
        question: String,
        tag: String,
        context: String,
    }

    /// Scripted gateway: queued predict results are consumed in order;
    /// once the queue is empty every call succeeds with a canned response.
    #[derive(Default)]
    struct MockGateway {
        predict_script: RefCell<VecDeque<Result<String, GatewayError>>>,
        predict_calls: RefCell<Vec<PredictCall>>,
        summarize_calls: RefCell<Vec<BTreeMap<Topic, String>>>,
        summarize_fails: bool,
        clinic_fails: bool,
        upload_fails: bool,
        upload_summary: Option<String>,
        transcribe_fails: bool,
    }

    impl MockGateway {
        fn scripted(results: Vec<Result<String, GatewayError>>) -> Self {
            Self {
                predict_script: RefCell::new(results.into()),
                ..Self::default()
            }
        }

        fn last_predict_question(&self) -> String {
            self.predict_calls
                .borrow()
                .last()
                .map(|c| c.question.clone())
                .unwrap_or_default()
        }
    }

    impl ServiceGateway for MockGateway {
        fn predict(
            &self,
            question: &str,
            tag: &str,
            context: &str,
        ) -> Result<String, GatewayError> {
            self.predict_calls.borrow_mut().push(PredictCall {
                question: question.to_string(),
                tag: tag.to_string(),
                context: context.to_string(),
            });
            self.predict_script
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Ok(format!("{tag}: generated question?")))
        }

        fn summarize_responses(
            &self,
            responses: &BTreeMap<Topic, String>,
        ) -> Result<String, GatewayError> {
            self.summarize_calls.borrow_mut().push(responses.clone());
            if self.summarize_fails {
                Err(transport_err())
            } else {
                Ok("summarized context".to_string())
            }
        }

        fn nearest_clinics(&self, _address: &str) -> Result<Vec<String>, GatewayError> {
            if self.clinic_fails {
                Err(transport_err())
            } else {
                Ok(vec!["City Care Clinic".to_string(), "Ruby Hall".to_string()])
            }
        }

        fn translate(&self, text: &str, _target: &str) -> Result<String, GatewayError> {
            Ok(text.to_string())
        }

        fn transcribe(&self, _: &[u8], _: &str) -> Result<Transcription, GatewayError> {
            if self.transcribe_fails {
                Err(transport_err())
            } else {
                Ok(Transcription {
                    raw: "mujhe bukhar hai".into(),
                    translated: "I have a fever".into(),
                })
            }
        }

        fn upload_document(&self, _: &str, _: Vec<u8>) -> Result<String, GatewayError> {
            if self.upload_fails {
                Err(transport_err())
            } else {
                Ok(self
                    .upload_summary
                    .clone()
                    .unwrap_or_else(|| "uploaded summary".to_string()))
            }
        }
    }

    /// Start a session and walk through the four profile sub-steps.
    fn started(gateway: MockGateway) -> DialogueMachine<MockGateway> {
        let mut machine = DialogueMachine::new(gateway);
        machine.start().unwrap();
        for field in ["Amit", "30", "male", "Pune"] {
            machine.submit(field).unwrap();
        }
        machine
    }

    /// Drive a started machine through all base topics to the upload
    /// decision.
    fn drive_to_upload_decision(machine: &mut DialogueMachine<MockGateway>) {
        machine.submit("I have been feeling unwell").unwrap();
        let mut guard = 0;
        while machine.state().phase == Phase::AwaitingAnswer {
            machine.submit("an answer").unwrap();
            guard += 1;
            assert!(guard < 10, "never reached the upload decision");
        }
        assert_eq!(machine.state().phase, Phase::AwaitingUploadDecision);
    }

    fn error_message_count(machine: &DialogueMachine<MockGateway>) -> usize {
        machine
            .state()
            .transcript
            .iter()
            .filter(|m| m.text == config::SERVICE_ERROR_MESSAGE)
            .count()
    }

    #[test]
    fn scenario_a_profile_collection_seeds_the_session() {
        let machine = started(MockGateway::default());
        let state = machine.state();

        assert_eq!(state.phase, Phase::AwaitingAnswer);
        assert_eq!(state.topic_index, -1);
        assert_eq!(state.topic_order.len(), Topic::BASE.len() + 1);
        assert_eq!(*state.topic_order.last().unwrap(), Topic::Report);
        assert_eq!(state.profile.name, "Amit");
        assert_eq!(state.profile.address, "Pune");
        let last_bot = state
            .transcript
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::Bot)
            .unwrap();
        assert_eq!(last_bot.text, "Hi Amit, I am your doctor. How can I help you today?");
    }

    #[test]
    fn start_twice_is_rejected() {
        let mut machine = DialogueMachine::new(MockGateway::default());
        machine.start().unwrap();
        assert!(matches!(machine.start(), Err(DialogueError::AlreadyStarted)));
    }

    #[test]
    fn scenario_b_answer_records_pair_and_advances() {
        let gateway = MockGateway::scripted(vec![
            Ok("Symptom: what symptoms are you having?".to_string()),
            Ok("Lifestyle: how is your diet?".to_string()),
        ]);
        let mut machine = started(gateway);

        machine.submit("I have been feeling unwell").unwrap();
        assert_eq!(machine.state().topic_index, 0);

        machine.submit("fever").unwrap();
        let state = machine.state();
        assert_eq!(state.topic_index, 1);
        assert_eq!(state.phase, Phase::AwaitingAnswer);

        let first_topic = state.topic_order[0];
        let record = &state.history[&first_topic];
        assert_eq!(record.exchanges.len(), 1);
        assert_eq!(record.exchanges[0].answer.as_deref(), Some("fever"));

        let second_topic = state.topic_order[1];
        let outstanding = &state.history[&second_topic].exchanges[0];
        assert_eq!(outstanding.question, "Lifestyle: how is your diet?");
        assert!(outstanding.answer.is_none());
    }

    #[test]
    fn greeting_reply_is_stored_separately() {
        let mut machine = started(MockGateway::default());
        machine.submit("I have been feeling unwell").unwrap();
        assert_eq!(
            machine.state().greeting_response.as_deref(),
            Some("I have been feeling unwell")
        );
    }

    #[test]
    fn scenario_c_failure_appends_one_message_and_still_advances() {
        let gateway = MockGateway::scripted(vec![
            Ok("Symptom: what symptoms are you having?".to_string()),
            Err(transport_err()),
        ]);
        let mut machine = started(gateway);
        machine.submit("I have been feeling unwell").unwrap();

        machine.submit("fever").unwrap();
        let state = machine.state();
        assert_eq!(error_message_count(&machine), 1);
        assert_eq!(state.topic_index, 1);
        assert_eq!(state.phase, Phase::AwaitingAnswer);
        // The degraded slot still accepts the next answer.
        let second_topic = state.topic_order[1];
        assert!(state.history[&second_topic].exchanges[0].answer.is_none());
    }

    #[test]
    fn block_policy_rolls_the_failed_turn_back() {
        let gateway = MockGateway::scripted(vec![
            Ok("Symptom: what symptoms are you having?".to_string()),
            Err(transport_err()),
            Ok("Lifestyle: how is your diet?".to_string()),
        ]);
        let mut machine = DialogueMachine::with_policy(gateway, FailurePolicy::Block);
        machine.start().unwrap();
        for field in ["Amit", "30", "male", "Pune"] {
            machine.submit(field).unwrap();
        }
        machine.submit("I have been feeling unwell").unwrap();

        machine.submit("fever").unwrap();
        {
            let state = machine.state();
            assert_eq!(state.topic_index, 0);
            assert_eq!(state.phase, Phase::AwaitingAnswer);
            let first_topic = state.topic_order[0];
            assert!(state.history[&first_topic].exchanges[0].answer.is_none());
            assert_eq!(error_message_count(&machine), 1);
        }

        // Resubmission completes the turn.
        machine.submit("fever").unwrap();
        let state = machine.state();
        assert_eq!(state.topic_index, 1);
        let first_topic = state.topic_order[0];
        assert_eq!(
            state.history[&first_topic].exchanges[0].answer.as_deref(),
            Some("fever")
        );
    }

    #[test]
    fn scenario_d_decline_diagnoses_from_history_only() {
        let mut machine = started(MockGateway::default());
        drive_to_upload_decision(&mut machine);

        machine.submit("No").unwrap();
        let state = machine.state();
        assert_eq!(state.phase, Phase::CollectingFeedback);
        assert!(state.report_context.is_none());

        let summarize_calls = machine.gateway.summarize_calls.borrow();
        assert_eq!(summarize_calls.len(), 1);
        assert!(!summarize_calls[0].contains_key(&Topic::Report));
        for topic in Topic::BASE {
            assert!(summarize_calls[0].contains_key(&topic));
        }
        drop(summarize_calls);

        let calls = machine.gateway.predict_calls.borrow();
        let diagnosis_call = calls.last().unwrap();
        assert_eq!(diagnosis_call.tag, "report");
        assert_eq!(diagnosis_call.context, "summarized context");
        assert!(!diagnosis_call.question.contains("Uploaded report summary"));
        assert!(diagnosis_call.question.contains("Data source for analysis"));
    }

    #[test]
    fn scenario_e_upload_summary_flows_into_the_diagnosis_prompt() {
        let gateway = MockGateway {
            upload_summary: Some("X".to_string()),
            ..MockGateway::default()
        };
        let mut machine = started(gateway);
        drive_to_upload_decision(&mut machine);

        machine.submit("Yes").unwrap();
        assert_eq!(machine.state().phase, Phase::UploadingReport);

        machine.upload_report("report.pdf", vec![1, 2, 3]).unwrap();
        let state = machine.state();
        assert_eq!(state.report_context.as_deref(), Some("X"));
        assert_eq!(state.phase, Phase::CollectingFeedback);
        assert!(machine
            .gateway
            .last_predict_question()
            .contains("Uploaded report summary:\nX"));
    }

    #[test]
    fn upload_failure_falls_through_without_context() {
        let gateway = MockGateway {
            upload_fails: true,
            ..MockGateway::default()
        };
        let mut machine = started(gateway);
        drive_to_upload_decision(&mut machine);
        machine.submit("Yes").unwrap();

        machine.upload_report("report.pdf", vec![1]).unwrap();
        let state = machine.state();
        assert!(state.report_context.is_none());
        assert_eq!(state.phase, Phase::CollectingFeedback);
        assert!(state
            .transcript
            .iter()
            .any(|m| m.text == config::UPLOAD_ERROR_MESSAGE));
    }

    #[test]
    fn cancel_upload_returns_to_the_decision_with_state_intact() {
        let mut machine = started(MockGateway::default());
        drive_to_upload_decision(&mut machine);
        let history_before = machine.state().history.clone();

        machine.submit("Yes").unwrap();
        machine.cancel_upload().unwrap();

        let state = machine.state();
        assert_eq!(state.phase, Phase::AwaitingUploadDecision);
        assert!(state.pending_upload_decision);
        // Prior topic history is untouched.
        for topic in Topic::BASE {
            assert_eq!(state.history.get(&topic), history_before.get(&topic));
        }

        machine.submit("No").unwrap();
        assert_eq!(machine.state().phase, Phase::CollectingFeedback);
    }

    #[test]
    fn unrecognized_upload_reply_reasks() {
        let mut machine = started(MockGateway::default());
        drive_to_upload_decision(&mut machine);

        machine.submit("maybe later").unwrap();
        let state = machine.state();
        assert_eq!(state.phase, Phase::AwaitingUploadDecision);
        assert!(state.pending_upload_decision);
        assert!(state
            .transcript
            .last()
            .unwrap()
            .text
            .starts_with("Please answer"));
    }

    #[test]
    fn terminal_failure_still_reaches_feedback() {
        let mut machine = started(MockGateway::default());
        drive_to_upload_decision(&mut machine);
        // Queue a failure for the diagnosis call only.
        machine
            .gateway
            .predict_script
            .borrow_mut()
            .push_back(Err(transport_err()));

        machine.submit("No").unwrap();
        let state = machine.state();
        assert_eq!(state.phase, Phase::CollectingFeedback);
        assert_eq!(error_message_count(&machine), 1);
        // Clinic suggestion still followed, with its render delay.
        let clinic = state
            .transcript
            .iter()
            .find(|m| m.text.starts_with("You can visit"))
            .unwrap();
        assert_eq!(clinic.delay_ms, config::CLINIC_SUGGESTION_DELAY_MS);
    }

    #[test]
    fn feedback_ends_the_session() {
        let mut machine = started(MockGateway::default());
        drive_to_upload_decision(&mut machine);
        machine.submit("No").unwrap();

        machine.submit("yes").unwrap();
        let state = machine.state();
        assert_eq!(state.phase, Phase::Ended);
        assert_eq!(state.feedback, Some(true));
        assert_eq!(state.topic_index as usize, state.topic_order.len());

        assert!(matches!(
            machine.submit("hello?"),
            Err(DialogueError::UnexpectedInput(Phase::Ended))
        ));
    }

    #[test]
    fn reset_restores_the_default_state() {
        let mut machine = started(MockGateway::default());
        drive_to_upload_decision(&mut machine);

        machine.reset();
        let mut expected = ConversationState::default();
        expected.session_id = machine.state().session_id;
        assert_eq!(machine.state(), &expected);
        assert!(machine.profile_step().is_none());

        // A fresh session can start again.
        machine.start().unwrap();
        assert_eq!(machine.state().phase, Phase::CollectingProfile);
    }

    #[test]
    fn empty_submission_is_rejected_before_dispatch() {
        let mut machine = started(MockGateway::default());
        machine.submit("hello doctor").unwrap();
        let calls_before = machine.gateway.predict_calls.borrow().len();

        assert!(matches!(machine.submit("   "), Err(DialogueError::EmptyInput)));
        assert_eq!(machine.gateway.predict_calls.borrow().len(), calls_before);
    }

    #[test]
    fn spoken_answer_stores_the_translation() {
        let mut machine = started(MockGateway::default());
        machine.submit("I have been feeling unwell").unwrap();

        machine.begin_listening();
        machine.audio_captured(b"audio bytes");
        machine.submit("mujhe bukhar hai").unwrap();

        let state = machine.state();
        let first_topic = state.topic_order[0];
        assert_eq!(
            state.history[&first_topic].exchanges[0].answer.as_deref(),
            Some("I have a fever")
        );
        // Raw transcript is what the user sees.
        let user_msg = state
            .transcript
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::User)
            .unwrap();
        assert_eq!(user_msg.text, "mujhe bukhar hai");
    }

    #[test]
    fn keystroke_after_transcription_makes_typed_canonical() {
        let mut machine = started(MockGateway::default());
        machine.submit("I have been feeling unwell").unwrap();

        machine.audio_captured(b"audio bytes");
        machine.keystroke();
        machine.submit("typed answer").unwrap();

        let state = machine.state();
        let first_topic = state.topic_order[0];
        assert_eq!(
            state.history[&first_topic].exchanges[0].answer.as_deref(),
            Some("typed answer")
        );
    }

    #[test]
    fn transcription_failure_surfaces_one_message() {
        let gateway = MockGateway {
            transcribe_fails: true,
            ..MockGateway::default()
        };
        let mut machine = started(gateway);
        machine.begin_listening();
        machine.audio_captured(b"audio bytes");

        assert!(!machine.is_listening());
        assert_eq!(
            machine.state().transcript.last().unwrap().text,
            config::TRANSCRIPTION_ERROR_MESSAGE
        );
    }

    #[test]
    fn language_switch_cancels_listening_but_keeps_history() {
        let mut machine = started(MockGateway::default());
        machine.submit("I have been feeling unwell").unwrap();
        machine.submit("fever").unwrap();
        let history_before = machine.state().history.clone();

        machine.begin_listening();
        machine.set_language("hi");

        assert!(!machine.is_listening());
        assert_eq!(machine.state().language, "hi");
        assert_eq!(machine.state().history, history_before);
    }
}
