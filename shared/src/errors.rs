//! Error types for answer validation

use crate::models::QuestionId;
use thiserror::Error;

/// Why an answer cannot be accepted for its question
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnswerError {
    #[error("This question is required")]
    Required { question_id: QuestionId },

    #[error("Answer must be at least {min} characters")]
    TooShort { question_id: QuestionId, min: usize },

    #[error("Answer must be at most {max} characters")]
    TooLong { question_id: QuestionId, max: usize },

    #[error("Value must be between {min} and {max}")]
    OutOfRange {
        question_id: QuestionId,
        min: String,
        max: String,
    },

    #[error("'{value}' is not one of the available options")]
    UnknownOption { question_id: QuestionId, value: String },

    #[error("'{value}' is not a valid date (expected YYYY-MM-DD)")]
    InvalidDate { question_id: QuestionId, value: String },

    #[error("Answer has the wrong shape for a {expected} question")]
    WrongShape {
        question_id: QuestionId,
        expected: &'static str,
    },
}

impl AnswerError {
    /// Question the error refers to
    pub fn question_id(&self) -> &QuestionId {
        match self {
            AnswerError::Required { question_id }
            | AnswerError::TooShort { question_id, .. }
            | AnswerError::TooLong { question_id, .. }
            | AnswerError::OutOfRange { question_id, .. }
            | AnswerError::UnknownOption { question_id, .. }
            | AnswerError::InvalidDate { question_id, .. }
            | AnswerError::WrongShape { question_id, .. } => question_id,
        }
    }
}
