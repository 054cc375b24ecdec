//! Survey Platform WASM Module
//!
//! This crate exposes the pure review-formatting and analytics functions
//! to the browser. Values cross the boundary as JSON strings.

use survey_shared::analytics::{self, FormAnalysis, QuestionAnalysis};
use survey_shared::models::{AnswerValue, Question};
use survey_shared::review;
use wasm_bindgen::prelude::*;

/// Format a stored answer for the review step
///
/// Returns the "not answered" placeholder when either input fails to parse.
#[wasm_bindgen]
pub fn format_answer(question_json: &str, answer_json: &str) -> String {
    let question: Question = match serde_json::from_str(question_json) {
        Ok(q) => q,
        Err(_) => return review::NOT_ANSWERED.to_string(),
    };
    let answer: Option<AnswerValue> = serde_json::from_str(answer_json).ok();
    review::format_answer(&question, answer.as_ref())
}

/// Whether a JSON answer value counts as answered
#[wasm_bindgen]
pub fn is_answered(answer_json: &str) -> bool {
    let answer: Option<AnswerValue> = serde_json::from_str(answer_json).ok();
    survey_shared::validation::is_answered(answer.as_ref())
}

/// Chart option object for one question analysis, or `null`
#[wasm_bindgen]
pub fn chart_option(analysis_json: &str) -> String {
    serde_json::from_str::<QuestionAnalysis>(analysis_json)
        .ok()
        .and_then(|a| analytics::chart_series(&a).map(|s| s.to_chart_option(&a.question_title)))
        .map(|option| option.to_string())
        .unwrap_or_else(|| "null".to_string())
}

/// Chart option objects for every charted question of a form analysis
#[wasm_bindgen]
pub fn chart_options(form_analysis_json: &str) -> String {
    let Ok(form) = serde_json::from_str::<FormAnalysis>(form_analysis_json) else {
        return "[]".to_string();
    };
    let options: Vec<serde_json::Value> = form
        .questions_analysis
        .iter()
        .filter_map(|a| analytics::chart_series(a).map(|s| s.to_chart_option(&a.question_title)))
        .collect();
    serde_json::Value::Array(options).to_string()
}
