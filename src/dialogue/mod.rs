//! Dialogue orchestration: state machine, topic sequencing, prompt
//! composition, and input arbitration for one intake session.

pub mod input;
pub mod machine;
pub mod prompt;
pub mod report;
pub mod sequencer;
pub mod state;

use thiserror::Error;

use crate::models::enums::Phase;

#[derive(Error, Debug)]
pub enum DialogueError {
    #[error("submission was empty")]
    EmptyInput,

    #[error("no input expected in phase {0:?}")]
    UnexpectedInput(Phase),

    #[error("session already started")]
    AlreadyStarted,

    #[error("no upload in progress")]
    NoUploadInProgress,
}
