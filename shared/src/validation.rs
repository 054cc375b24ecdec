//! Answer validation
//!
//! Two layers of checks gate wizard advancement:
//! 1. the "required answered" rule, applied to required questions only
//! 2. type-specific constraints (length, range, options, date format),
//!    applied to any answer that is present

use crate::errors::AnswerError;
use crate::models::{AnswerValue, FormQuestion, Question, QuestionKind};
use chrono::{DateTime, NaiveDate};

/// Expected date format for date answers
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Whether a stored value counts as an answer.
///
/// Empty strings, empty lists, null and absent values are unanswered;
/// any number or boolean is answered.
pub fn is_answered(value: Option<&AnswerValue>) -> bool {
    match value {
        None | Some(AnswerValue::Null) => false,
        Some(AnswerValue::Text(s)) => !s.is_empty(),
        Some(AnswerValue::List(items)) => !items.is_empty(),
        Some(AnswerValue::Number(_)) | Some(AnswerValue::Bool(_)) => true,
    }
}

/// Reject an unanswered required question
pub fn validate_required(
    question: &FormQuestion,
    value: Option<&AnswerValue>,
) -> Result<(), AnswerError> {
    if question.is_required() && !is_answered(value) {
        return Err(AnswerError::Required {
            question_id: question.question.id.clone(),
        });
    }
    Ok(())
}

/// Full check for one wizard step: required rule, then constraints
pub fn validate_step(
    question: &FormQuestion,
    value: Option<&AnswerValue>,
) -> Result<(), AnswerError> {
    validate_required(question, value)?;
    validate_answer(&question.question, value)
}

/// Type-specific constraints; unanswered values always pass
pub fn validate_answer(question: &Question, value: Option<&AnswerValue>) -> Result<(), AnswerError> {
    let value = match value {
        Some(v) if is_answered(Some(v)) => v,
        _ => return Ok(()),
    };
    let question_id = || question.id.clone();
    let wrong_shape = || AnswerError::WrongShape {
        question_id: question.id.clone(),
        expected: question.question_type().as_str(),
    };

    match &question.kind {
        QuestionKind::Text {
            min_length,
            max_length,
        } => {
            let AnswerValue::Text(text) = value else {
                return Err(wrong_shape());
            };
            let len = text.chars().count();
            if let Some(min) = *min_length {
                if len < min {
                    return Err(AnswerError::TooShort {
                        question_id: question_id(),
                        min,
                    });
                }
            }
            if let Some(max) = *max_length {
                if len > max {
                    return Err(AnswerError::TooLong {
                        question_id: question_id(),
                        max,
                    });
                }
            }
            Ok(())
        }
        QuestionKind::MultipleChoice { options } | QuestionKind::Dropdown { options } => {
            let raw = value.scalar_string().ok_or_else(wrong_shape)?;
            if !options.is_empty() && !options.iter().any(|o| o.matches(&raw)) {
                return Err(AnswerError::UnknownOption {
                    question_id: question_id(),
                    value: raw,
                });
            }
            Ok(())
        }
        QuestionKind::Checkbox { options } => {
            let AnswerValue::List(items) = value else {
                return Err(wrong_shape());
            };
            if options.is_empty() {
                return Ok(());
            }
            match items.iter().find(|item| !options.iter().any(|o| o.matches(item))) {
                Some(unknown) => Err(AnswerError::UnknownOption {
                    question_id: question_id(),
                    value: unknown.clone(),
                }),
                None => Ok(()),
            }
        }
        QuestionKind::Scale { min, max, options } => {
            let number = match value {
                AnswerValue::Number(n) => *n,
                AnswerValue::Text(s) => match s.trim().parse::<f64>() {
                    Ok(n) => n,
                    // Labelled scales may store the option label itself
                    Err(_) if options.iter().any(|o| o.matches(s)) => return Ok(()),
                    Err(_) => return Err(wrong_shape()),
                },
                _ => return Err(wrong_shape()),
            };
            let below = min.map_or(false, |m| number < m);
            let above = max.map_or(false, |m| number > m);
            if below || above {
                return Err(AnswerError::OutOfRange {
                    question_id: question_id(),
                    min: min.map(crate::models::format_number).unwrap_or_else(|| "-∞".to_string()),
                    max: max.map(crate::models::format_number).unwrap_or_else(|| "∞".to_string()),
                });
            }
            Ok(())
        }
        QuestionKind::Date => {
            let AnswerValue::Text(text) = value else {
                return Err(wrong_shape());
            };
            if parse_answer_date(text).is_none() {
                return Err(AnswerError::InvalidDate {
                    question_id: question_id(),
                    value: text.clone(),
                });
            }
            Ok(())
        }
    }
}

/// Parse a date answer: plain `YYYY-MM-DD` or a full RFC 3339 timestamp
pub fn parse_answer_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text, DATE_FORMAT)
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(text).ok().map(|dt| dt.date_naive()))
}
