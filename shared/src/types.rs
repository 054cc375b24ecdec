//! API request and response types
//!
//! These mirror the backend contract. Transport details live in the client
//! crate; here we only describe the payload shapes.

use crate::models::{AnswerValue, Answers, FormId, QuestionId, ResponseId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Common `{error, msg, data}` response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    /// Structured error code, when the backend provides one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub data: Option<T>,
}

impl<T> ApiEnvelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            error: None,
            msg: None,
            code: None,
            data: Some(data),
        }
    }

    /// True when `error` carries anything other than null or `false`
    pub fn is_error(&self) -> bool {
        !matches!(self.error, None | Some(Value::Null) | Some(Value::Bool(false)))
    }

    /// Best human-readable description of the failure
    pub fn error_message(&self) -> String {
        match (&self.error, &self.msg) {
            (Some(Value::String(e)), _) if !e.is_empty() => e.clone(),
            (_, Some(msg)) if !msg.is_empty() => msg.clone(),
            (Some(Value::Object(obj)), _) => obj
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| Value::Object(obj.clone()).to_string()),
            _ => "Unknown error".to_string(),
        }
    }
}

/// Payload that may be a single object or a list
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
        }
    }
}

// ============================================================================
// Responses
// ============================================================================

/// One answer in a submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseAnswer {
    pub question_id: QuestionId,
    pub answer: AnswerValue,
}

/// Body of a form or diary submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponseRequest {
    pub form_id: FormId,
    pub answers: Vec<ResponseAnswer>,
}

impl SubmitResponseRequest {
    /// Build a request from an answer map, following the given question order
    /// and dropping unanswered entries
    pub fn from_answers<'a>(
        form_id: FormId,
        order: impl IntoIterator<Item = &'a QuestionId>,
        answers: &Answers,
    ) -> Self {
        let answers = order
            .into_iter()
            .filter_map(|id| {
                answers
                    .get(id)
                    .filter(|value| crate::validation::is_answered(Some(*value)))
                    .map(|value| ResponseAnswer {
                        question_id: id.clone(),
                        answer: value.clone(),
                    })
            })
            .collect();
        Self { form_id, answers }
    }
}

/// Stored response returned by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedResponse {
    #[serde(alias = "_id")]
    pub id: ResponseId,
    #[serde(default = "Utc::now")]
    pub submitted_at: DateTime<Utc>,
}

/// Diary capability check result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiaryCapability {
    pub can_respond: bool,
}

// ============================================================================
// Export
// ============================================================================

/// Raw response rows for spreadsheet export
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormExport {
    pub form_title: String,
    #[serde(default)]
    pub data: Vec<Map<String, Value>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_error_detection() {
        let ok: ApiEnvelope<Value> = serde_json::from_value(json!({"error": null, "data": 1})).unwrap();
        assert!(!ok.is_error());

        let falsy: ApiEnvelope<Value> = serde_json::from_value(json!({"error": false})).unwrap();
        assert!(!falsy.is_error());

        let failed: ApiEnvelope<Value> =
            serde_json::from_value(json!({"error": true, "msg": "Form closed"})).unwrap();
        assert!(failed.is_error());
        assert_eq!(failed.error_message(), "Form closed");

        let text: ApiEnvelope<Value> =
            serde_json::from_value(json!({"error": "Server exploded"})).unwrap();
        assert_eq!(text.error_message(), "Server exploded");
    }

    fn decode<T: serde::de::DeserializeOwned>(value: Value) -> ApiEnvelope<T> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_envelope_without_data_for_any_payload() {
        let missing: ApiEnvelope<SubmittedResponse> = decode(json!({"error": true, "msg": "nope"}));
        assert!(missing.data.is_none());

        let present: ApiEnvelope<SubmittedResponse> = decode(json!({"data": {"_id": "r1"}}));
        assert_eq!(present.data.map(|r| r.id), Some(ResponseId::new("r1")));
    }

    #[test]
    fn test_one_or_many() {
        let one: OneOrMany<u32> = serde_json::from_value(json!(3)).unwrap();
        assert_eq!(one.into_vec(), vec![3]);
        let many: OneOrMany<u32> = serde_json::from_value(json!([1, 2])).unwrap();
        assert_eq!(many.into_vec(), vec![1, 2]);
    }

    #[test]
    fn test_request_follows_question_order() {
        let mut answers = Answers::new();
        answers.insert("b".into(), AnswerValue::text("second"));
        answers.insert("a".into(), AnswerValue::text("first"));
        answers.insert("c".into(), AnswerValue::text(""));

        let order: Vec<QuestionId> = vec!["a".into(), "b".into(), "c".into()];
        let request = SubmitResponseRequest::from_answers("f".into(), &order, &answers);

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "formId": "f",
                "answers": [
                    {"questionId": "a", "answer": "first"},
                    {"questionId": "b", "answer": "second"}
                ]
            })
        );
    }

    #[test]
    fn test_submitted_response_accepts_mongo_id() {
        let response: SubmittedResponse = serde_json::from_value(json!({
            "_id": "r1",
            "submittedAt": "2024-05-01T10:00:00Z"
        }))
        .unwrap();
        assert_eq!(response.id.as_str(), "r1");
    }
}
