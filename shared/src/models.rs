//! Data models for the survey platform
//!
//! Forms and questions are owned by the backend and cached read-only by the
//! client. The question type is a tagged enum so that each answer shape and
//! renderer is selected by an exhaustive match instead of string comparison.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }
    };
}

string_id!(
    /// Backend identity of a form
    FormId
);
string_id!(
    /// Backend identity of a question
    QuestionId
);
string_id!(
    /// Backend identity of a stored response
    ResponseId
);

// ============================================================================
// Questions
// ============================================================================

/// A selectable option of a choice or scale question
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionOption {
    pub label: String,
    pub value: String,
}

impl QuestionOption {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }

    /// True when the stored answer refers to this option by value or label
    pub fn matches(&self, raw: &str) -> bool {
        self.value == raw || self.label == raw
    }
}

impl<'de> Deserialize<'de> for QuestionOption {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Older forms store plain strings, newer ones label/value pairs.
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawOption {
            Plain(String),
            Pair {
                label: String,
                #[serde(default)]
                value: Option<String>,
            },
        }

        Ok(match RawOption::deserialize(deserializer)? {
            RawOption::Plain(text) => QuestionOption::new(text.clone(), text),
            RawOption::Pair { label, value } => {
                let value = value.unwrap_or_else(|| label.clone());
                QuestionOption::new(label, value)
            }
        })
    }
}

/// Payload-free question type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    Text,
    MultipleChoice,
    Checkbox,
    Dropdown,
    Scale,
    Date,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::Text => "text",
            QuestionType::MultipleChoice => "multiple_choice",
            QuestionType::Checkbox => "checkbox",
            QuestionType::Dropdown => "dropdown",
            QuestionType::Scale => "scale",
            QuestionType::Date => "date",
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Question type with its type-specific payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionKind {
    Text {
        #[serde(default, rename = "minLength", skip_serializing_if = "Option::is_none")]
        min_length: Option<usize>,
        #[serde(default, rename = "maxLength", skip_serializing_if = "Option::is_none")]
        max_length: Option<usize>,
    },
    MultipleChoice {
        #[serde(default)]
        options: Vec<QuestionOption>,
    },
    Checkbox {
        #[serde(default)]
        options: Vec<QuestionOption>,
    },
    Dropdown {
        #[serde(default)]
        options: Vec<QuestionOption>,
    },
    Scale {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
        #[serde(default)]
        options: Vec<QuestionOption>,
    },
    Date,
}

impl QuestionKind {
    pub fn question_type(&self) -> QuestionType {
        match self {
            QuestionKind::Text { .. } => QuestionType::Text,
            QuestionKind::MultipleChoice { .. } => QuestionType::MultipleChoice,
            QuestionKind::Checkbox { .. } => QuestionType::Checkbox,
            QuestionKind::Dropdown { .. } => QuestionType::Dropdown,
            QuestionKind::Scale { .. } => QuestionType::Scale,
            QuestionKind::Date => QuestionType::Date,
        }
    }

    /// Options list, empty for free-form types
    pub fn options(&self) -> &[QuestionOption] {
        match self {
            QuestionKind::MultipleChoice { options }
            | QuestionKind::Checkbox { options }
            | QuestionKind::Dropdown { options }
            | QuestionKind::Scale { options, .. } => options,
            QuestionKind::Text { .. } | QuestionKind::Date => &[],
        }
    }
}

/// A single prompt with a type-specific answer shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    #[serde(alias = "_id")]
    pub id: QuestionId,
    pub title: String,
    #[serde(flatten)]
    pub kind: QuestionKind,
    #[serde(default)]
    pub required: bool,
}

impl Question {
    pub fn new(id: impl Into<String>, title: impl Into<String>, kind: QuestionKind) -> Self {
        Self {
            id: QuestionId::new(id),
            title: title.into(),
            kind,
            required: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn question_type(&self) -> QuestionType {
        self.kind.question_type()
    }
}

// ============================================================================
// Forms
// ============================================================================

/// Reference from a form to one of its questions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormQuestion {
    #[serde(alias = "questionId")]
    pub question: Question,
    /// Form-level override of the question's own required flag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(default)]
    pub order: u32,
}

impl FormQuestion {
    pub fn is_required(&self) -> bool {
        self.required.unwrap_or(self.question.required)
    }
}

/// A named, ordered collection of questions assignable to users
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Form {
    #[serde(alias = "_id")]
    pub id: FormId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub questions: Vec<FormQuestion>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub has_responded: Option<bool>,
}

impl Form {
    /// Active and not yet answered by the current user
    pub fn is_available(&self) -> bool {
        self.is_active && self.has_responded != Some(true)
    }

    /// Questions in presentation order; ties keep backend order
    pub fn ordered_questions(&self) -> Vec<FormQuestion> {
        let mut questions = self.questions.clone();
        questions.sort_by_key(|q| q.order);
        questions
    }
}

// ============================================================================
// Answers
// ============================================================================

/// Stored answer; its shape follows the question type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum AnswerValue {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<String>),
}

impl AnswerValue {
    pub fn text(value: impl Into<String>) -> Self {
        AnswerValue::Text(value.into())
    }

    pub fn list<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AnswerValue::List(values.into_iter().map(Into::into).collect())
    }

    /// Scalar rendering used for labels and option lookup
    pub fn scalar_string(&self) -> Option<String> {
        match self {
            AnswerValue::Null | AnswerValue::List(_) => None,
            AnswerValue::Bool(b) => Some(b.to_string()),
            AnswerValue::Number(n) => Some(format_number(*n)),
            AnswerValue::Text(s) => Some(s.clone()),
        }
    }
}

impl From<&str> for AnswerValue {
    fn from(value: &str) -> Self {
        AnswerValue::Text(value.to_string())
    }
}

impl From<String> for AnswerValue {
    fn from(value: String) -> Self {
        AnswerValue::Text(value)
    }
}

impl From<f64> for AnswerValue {
    fn from(value: f64) -> Self {
        AnswerValue::Number(value)
    }
}

impl From<Vec<String>> for AnswerValue {
    fn from(values: Vec<String>) -> Self {
        AnswerValue::List(values)
    }
}

/// Answer map keyed by question identity
pub type Answers = BTreeMap<QuestionId, AnswerValue>;

/// Render a number without a trailing `.0` for integral values
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}
