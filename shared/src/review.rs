//! Review-step answer formatting
//!
//! Converts a stored answer plus its question into the label shown on the
//! review step. Pure: the same pair always formats to the same string.

use crate::models::{AnswerValue, Question};

/// Placeholder shown for questions without an answer
pub const NOT_ANSWERED: &str = "Not answered";

/// Separator between the items of a multi-select answer
pub const LIST_SEPARATOR: &str = ", ";

/// Human-readable label for a stored answer
pub fn format_answer(question: &Question, value: Option<&AnswerValue>) -> String {
    let value = match value {
        None | Some(AnswerValue::Null) => return NOT_ANSWERED.to_string(),
        Some(v) => v,
    };

    match value {
        AnswerValue::List(items) if items.is_empty() => NOT_ANSWERED.to_string(),
        AnswerValue::List(items) => items.join(LIST_SEPARATOR),
        AnswerValue::Text(text) if text.is_empty() => NOT_ANSWERED.to_string(),
        scalar => {
            // Only List and Null lack a scalar form, and both are handled above.
            let raw = scalar.scalar_string().unwrap_or_default();
            option_label(question, &raw).unwrap_or(raw)
        }
    }
}

/// Label of the option matching `raw` by value or label
fn option_label(question: &Question, raw: &str) -> Option<String> {
    question
        .kind
        .options()
        .iter()
        .find(|option| option.matches(raw))
        .map(|option| option.label.clone())
}

/// One row of the review step
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewRow {
    /// Wizard step that edits this answer
    pub step: usize,
    pub title: String,
    pub answer: String,
    pub required: bool,
    pub answered: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{QuestionKind, QuestionOption};
    use proptest::prelude::*;
    use rstest::rstest;

    fn dropdown() -> Question {
        Question::new(
            "country",
            "Country",
            QuestionKind::Dropdown {
                options: vec![
                    QuestionOption::new("Portugal", "pt"),
                    QuestionOption::new("Spain", "es"),
                ],
            },
        )
    }

    #[rstest]
    #[case(None, "Not answered")]
    #[case(Some(AnswerValue::Null), "Not answered")]
    #[case(Some(AnswerValue::text("")), "Not answered")]
    #[case(Some(AnswerValue::List(vec![])), "Not answered")]
    #[case(Some(AnswerValue::text("pt")), "Portugal")]
    #[case(Some(AnswerValue::text("Spain")), "Spain")]
    #[case(Some(AnswerValue::text("fr")), "fr")]
    #[case(Some(AnswerValue::list(["pt", "es"])), "pt, es")]
    #[case(Some(AnswerValue::Number(3.0)), "3")]
    #[case(Some(AnswerValue::Bool(true)), "true")]
    fn test_format_answer(#[case] value: Option<AnswerValue>, #[case] expected: &str) {
        assert_eq!(format_answer(&dropdown(), value.as_ref()), expected);
    }

    #[test]
    fn test_scale_option_labels() {
        let question = Question::new(
            "mood",
            "Mood",
            QuestionKind::Scale {
                min: Some(1.0),
                max: Some(3.0),
                options: vec![
                    QuestionOption::new("Bad", "1"),
                    QuestionOption::new("Okay", "2"),
                    QuestionOption::new("Great", "3"),
                ],
            },
        );
        assert_eq!(format_answer(&question, Some(&AnswerValue::Number(2.0))), "Okay");
        assert_eq!(format_answer(&question, Some(&AnswerValue::text("3"))), "Great");
    }

    #[test]
    fn test_free_text_is_shown_verbatim() {
        let question = Question::new(
            "notes",
            "Notes",
            QuestionKind::Text {
                min_length: None,
                max_length: None,
            },
        );
        assert_eq!(
            format_answer(&question, Some(&AnswerValue::text("  spaced  "))),
            "  spaced  "
        );
    }

    fn answer_strategy() -> impl Strategy<Value = Option<AnswerValue>> {
        prop_oneof![
            Just(None),
            Just(Some(AnswerValue::Null)),
            "[a-z]{0,8}".prop_map(|s| Some(AnswerValue::Text(s))),
            prop::collection::vec("[a-z]{1,5}", 0..4).prop_map(|v| Some(AnswerValue::List(v))),
            (-100i32..100).prop_map(|n| Some(AnswerValue::Number(f64::from(n)))),
            any::<bool>().prop_map(|b| Some(AnswerValue::Bool(b))),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_formatting_is_idempotent(value in answer_strategy()) {
            let question = dropdown();
            let first = format_answer(&question, value.as_ref());
            let second = format_answer(&question, value.as_ref());
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_formatting_never_returns_empty(value in answer_strategy()) {
            prop_assert!(!format_answer(&dropdown(), value.as_ref()).is_empty());
        }
    }
}
