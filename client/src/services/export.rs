//! Spreadsheet export
//!
//! Two CSV files per form: the raw response rows as the backend returns them,
//! and a per-question summary of the analysis.

use crate::api::SurveyApi;
use crate::error::{ClientError, ClientResult};
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use survey_shared::analytics::FormAnalysis;
use survey_shared::{format_number, FormId};
use tracing::info;

/// Separator for array values inside one cell
const CELL_LIST_SEPARATOR: &str = ", ";

/// Raw rows to CSV. The header comes from the keys of the first record.
pub fn records_to_csv(records: &[Map<String, Value>]) -> ClientResult<String> {
    let Some(first) = records.first() else {
        return Ok(String::new());
    };
    let header: Vec<&String> = first.keys().collect();

    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(&header)?;
    for record in records {
        wtr.write_record(
            header
                .iter()
                .map(|key| cell(record.get(key.as_str()).unwrap_or(&Value::Null))),
        )?;
    }
    finish(wtr)
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.as_f64().map_or_else(|| n.to_string(), format_number),
        Value::Bool(b) => b.to_string(),
        Value::Array(items) => items
            .iter()
            .map(cell)
            .collect::<Vec<_>>()
            .join(CELL_LIST_SEPARATOR),
        Value::Object(_) => value.to_string(),
    }
}

#[derive(Debug, Serialize)]
struct SummaryRow<'a> {
    question: &'a str,
    #[serde(rename = "type")]
    question_type: &'static str,
    total_answers: u64,
    value: Option<&'a str>,
    count: Option<u64>,
    average: Option<String>,
}

/// Aggregated rows: one per distribution entry, or one per question without
/// a distribution
pub fn analysis_to_csv(analysis: &FormAnalysis) -> ClientResult<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    for q in &analysis.questions_analysis {
        let average = q.average.map(format_number);
        let row = |value, count| SummaryRow {
            question: &q.question_title,
            question_type: q.question_type.as_str(),
            total_answers: q.total_answers,
            value,
            count,
            average: average.clone(),
        };

        match q.distribution.as_ref().filter(|d| !d.is_empty()) {
            Some(distribution) => {
                for entry in distribution.entries() {
                    wtr.serialize(row(Some(entry.value.as_str()), Some(entry.count)))?;
                }
            }
            None => wtr.serialize(row(None, None))?,
        }
    }
    finish(wtr)
}

fn finish(wtr: csv::Writer<Vec<u8>>) -> ClientResult<String> {
    let bytes = wtr
        .into_inner()
        .map_err(|e| ClientError::Internal(anyhow::anyhow!("CSV flush error: {}", e)))?;
    String::from_utf8(bytes)
        .map_err(|e| ClientError::Internal(anyhow::anyhow!("CSV encoding error: {}", e)))
}

/// File-name stem from a form title, e.g. `Team Survey 2024!` -> `team-survey-2024`
pub fn slugify(title: &str) -> String {
    let slug = title
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    if slug.is_empty() {
        "form".to_string()
    } else {
        slug
    }
}

pub fn responses_file_name(title: &str) -> String {
    format!("{}-responses.csv", slugify(title))
}

pub fn summary_file_name(title: &str) -> String {
    format!("{}-summary.csv", slugify(title))
}

/// Paths written by [`ExportService::export_form`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFiles {
    pub responses: PathBuf,
    pub summary: PathBuf,
}

/// Fetches a form's data and writes both CSV files
pub struct ExportService {
    api: Arc<dyn SurveyApi>,
    role: String,
}

impl ExportService {
    pub fn new(api: Arc<dyn SurveyApi>, role: impl Into<String>) -> Self {
        Self {
            api,
            role: role.into(),
        }
    }

    pub async fn export_form(&self, form_id: &FormId, out_dir: &Path) -> ClientResult<ExportedFiles> {
        let export = self.api.export_form_data(form_id, &self.role).await?;
        let analysis = self.api.get_full_analysis(form_id).await?;

        tokio::fs::create_dir_all(out_dir).await?;
        let responses = out_dir.join(responses_file_name(&export.form_title));
        let summary = out_dir.join(summary_file_name(&export.form_title));

        tokio::fs::write(&responses, records_to_csv(&export.data)?).await?;
        tokio::fs::write(&summary, analysis_to_csv(&analysis)?).await?;

        info!(
            form_id = %form_id,
            rows = export.data.len(),
            questions = analysis.questions_analysis.len(),
            dir = %out_dir.display(),
            "Form data exported"
        );
        Ok(ExportedFiles { responses, summary })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;
    use survey_shared::analytics::{Distribution, QuestionAnalysis};
    use survey_shared::{QuestionId, QuestionType};

    fn records(value: Value) -> Vec<Map<String, Value>> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_quotes_commas_and_quotes() {
        let csv = records_to_csv(&records(json!([{ "Comment": "Foo, \"bar\"" }]))).unwrap();
        assert_eq!(csv, "Comment\n\"Foo, \"\"bar\"\"\"\n");
    }

    #[test]
    fn test_header_from_first_record() {
        let csv = records_to_csv(&records(json!([
            { "Name": "Ann", "Score": 4, "Tags": ["a", "b"] },
            { "Score": 2.5, "Extra": "ignored", "Name": null },
        ])))
        .unwrap();
        assert_eq!(csv, "Name,Score,Tags\nAnn,4,\"a, b\"\n,2.5,\n");
    }

    #[test]
    fn test_empty_export() {
        assert_eq!(records_to_csv(&[]).unwrap(), "");
    }

    #[rstest]
    #[case("Team Survey 2024!", "team-survey-2024")]
    #[case("  Café -- feedback ", "café-feedback")]
    #[case("???", "form")]
    fn test_slugify(#[case] title: &str, #[case] expected: &str) {
        assert_eq!(slugify(title), expected);
    }

    #[test]
    fn test_file_names() {
        assert_eq!(responses_file_name("Weekly"), "weekly-responses.csv");
        assert_eq!(summary_file_name("Weekly"), "weekly-summary.csv");
    }

    #[test]
    fn test_analysis_summary() {
        let analysis = FormAnalysis {
            form_title: "F".into(),
            total_responses: 3,
            questions_analysis: vec![
                QuestionAnalysis {
                    question_id: QuestionId::new("s"),
                    question_title: "Rate, please".into(),
                    question_type: QuestionType::Scale,
                    total_answers: 3,
                    distribution: Some(Distribution::from_iter([("5", 2), ("1", 1)])),
                    sample_answers: None,
                    date_range: None,
                    average: Some(3.5),
                },
                QuestionAnalysis {
                    question_id: QuestionId::new("t"),
                    question_title: "Why".into(),
                    question_type: QuestionType::Text,
                    total_answers: 1,
                    distribution: None,
                    sample_answers: Some(vec!["because".into()]),
                    date_range: None,
                    average: None,
                },
            ],
        };
        let csv = analysis_to_csv(&analysis).unwrap();
        assert_eq!(
            csv,
            "question,type,total_answers,value,count,average\n\
             \"Rate, please\",scale,3,5,2,3.5\n\
             \"Rate, please\",scale,3,1,1,3.5\n\
             Why,text,1,,,\n"
        );
    }
}
