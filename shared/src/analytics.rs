//! Analytics aggregation for the dashboard
//!
//! The backend computes every count. This module only decides how each
//! question is presented: ordering of distribution entries and the shape of
//! the chart series handed to the chart library.
//!
//! # Ordering rules
//!
//! - scale: by numeric value ascending
//! - multiple choice / dropdown / checkbox: by count descending, ties keep
//!   backend order (stable sort)

use crate::models::{format_number, QuestionId, QuestionType};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Value};
use std::cmp::Ordering;
use std::fmt;

// ============================================================================
// Backend Analysis Types
// ============================================================================

/// One `value -> count` pair of a distribution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributionEntry {
    pub value: String,
    pub count: u64,
}

impl DistributionEntry {
    pub fn new(value: impl Into<String>, count: u64) -> Self {
        Self {
            value: value.into(),
            count,
        }
    }
}

/// Value -> count mapping that keeps the backend's key order
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Distribution(pub Vec<DistributionEntry>);

impl Distribution {
    pub fn entries(&self) -> &[DistributionEntry] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn total(&self) -> u64 {
        self.0.iter().map(|e| e.count).sum()
    }
}

impl<V: Into<String>> FromIterator<(V, u64)> for Distribution {
    fn from_iter<I: IntoIterator<Item = (V, u64)>>(iter: I) -> Self {
        Distribution(
            iter.into_iter()
                .map(|(value, count)| DistributionEntry::new(value, count))
                .collect(),
        )
    }
}

impl Serialize for Distribution {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for entry in &self.0 {
            map.serialize_entry(&entry.value, &entry.count)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Distribution {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct DistributionVisitor;

        impl<'de> Visitor<'de> for DistributionVisitor {
            type Value = Distribution;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of answer values to counts")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((value, count)) = access.next_entry::<String, u64>()? {
                    entries.push(DistributionEntry { value, count });
                }
                Ok(Distribution(entries))
            }
        }

        deserializer.deserialize_map(DistributionVisitor)
    }
}

/// Earliest/latest answers of a date question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    #[serde(default)]
    pub earliest: Option<String>,
    #[serde(default)]
    pub latest: Option<String>,
}

/// Backend aggregate for one question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionAnalysis {
    pub question_id: QuestionId,
    pub question_title: String,
    pub question_type: QuestionType,
    #[serde(default)]
    pub total_answers: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distribution: Option<Distribution>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_answers: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_range: Option<DateRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average: Option<f64>,
}

/// Full analysis of a form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormAnalysis {
    pub form_title: String,
    #[serde(default)]
    pub total_responses: u64,
    #[serde(default)]
    pub questions_analysis: Vec<QuestionAnalysis>,
}

// ============================================================================
// Chart Series
// ============================================================================

/// Chart style for a series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    /// Vertical bars, x = value
    Bar,
    /// Proportions of a single-select question
    Pie,
    /// One bar per option of a multi-select question
    HorizontalBar,
}

/// A single bar/slice
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeriesPoint {
    pub label: String,
    pub count: u64,
}

/// Chart-ready series for one question
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub kind: ChartKind,
    pub points: Vec<SeriesPoint>,
}

impl ChartSeries {
    pub fn labels(&self) -> Vec<&str> {
        self.points.iter().map(|p| p.label.as_str()).collect()
    }

    pub fn counts(&self) -> Vec<u64> {
        self.points.iter().map(|p| p.count).collect()
    }

    /// Share of each point in percent, rounded to one decimal
    pub fn percentages(&self) -> Vec<f64> {
        let total: u64 = self.points.iter().map(|p| p.count).sum();
        self.points
            .iter()
            .map(|p| {
                if total == 0 {
                    0.0
                } else {
                    (p.count as f64 / total as f64 * 1000.0).round() / 10.0
                }
            })
            .collect()
    }

    /// Option object consumed by the chart library
    pub fn to_chart_option(&self, title: &str) -> Value {
        let labels = self.labels();
        let counts = self.counts();
        match self.kind {
            ChartKind::Bar => json!({
                "title": { "text": title },
                "tooltip": { "trigger": "axis" },
                "xAxis": { "type": "category", "data": labels },
                "yAxis": { "type": "value", "minInterval": 1 },
                "series": [{ "type": "bar", "data": counts }]
            }),
            ChartKind::Pie => {
                let data: Vec<Value> = self
                    .points
                    .iter()
                    .map(|p| json!({ "name": p.label, "value": p.count }))
                    .collect();
                json!({
                    "title": { "text": title },
                    "tooltip": { "trigger": "item", "formatter": "{b}: {c} ({d}%)" },
                    "legend": { "orient": "vertical", "left": "left" },
                    "series": [{ "type": "pie", "radius": "60%", "data": data }]
                })
            }
            ChartKind::HorizontalBar => json!({
                "title": { "text": title },
                "tooltip": { "trigger": "axis" },
                "xAxis": { "type": "value", "minInterval": 1 },
                "yAxis": { "type": "category", "inverse": true, "data": labels },
                "series": [{ "type": "bar", "data": counts }]
            }),
        }
    }
}

/// Scale entries by numeric value ascending.
///
/// Keys that do not parse as numbers go last, in backend order.
pub fn sort_scale(distribution: &Distribution) -> Vec<SeriesPoint> {
    let mut entries: Vec<(Option<f64>, &DistributionEntry)> = distribution
        .entries()
        .iter()
        .map(|e| (e.value.trim().parse::<f64>().ok().filter(|n| !n.is_nan()), e))
        .collect();

    entries.sort_by(|(a, _), (b, _)| match (a, b) {
        (Some(a), Some(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });

    entries.into_iter().map(|(_, e)| to_point(e)).collect()
}

/// Entries by count descending; equal counts keep backend order
pub fn sort_by_count(distribution: &Distribution) -> Vec<SeriesPoint> {
    let mut points: Vec<SeriesPoint> = distribution.entries().iter().map(to_point).collect();
    // sort_by is stable
    points.sort_by(|a, b| b.count.cmp(&a.count));
    points
}

fn to_point(entry: &DistributionEntry) -> SeriesPoint {
    SeriesPoint {
        label: entry.value.clone(),
        count: entry.count,
    }
}

/// Chart series for a question, `None` when the type is not charted or the
/// distribution is missing
pub fn chart_series(analysis: &QuestionAnalysis) -> Option<ChartSeries> {
    let distribution = analysis.distribution.as_ref().filter(|d| !d.is_empty());
    match analysis.question_type {
        QuestionType::Scale => distribution.map(|d| ChartSeries {
            kind: ChartKind::Bar,
            points: sort_scale(d),
        }),
        QuestionType::MultipleChoice | QuestionType::Dropdown => distribution.map(|d| ChartSeries {
            kind: ChartKind::Pie,
            points: sort_by_count(d),
        }),
        QuestionType::Checkbox => distribution.map(|d| ChartSeries {
            kind: ChartKind::HorizontalBar,
            points: sort_by_count(d),
        }),
        QuestionType::Text | QuestionType::Date => None,
    }
}

// ============================================================================
// Presentation
// ============================================================================

/// How the dashboard shows one question
#[derive(Debug, Clone, PartialEq)]
pub enum Presentation {
    Chart {
        series: ChartSeries,
        /// Backend average, scale questions only
        average: Option<f64>,
    },
    Samples(Vec<String>),
    DateRange(DateRange),
    /// Nothing to show; not an error
    Skipped,
}

/// Decide the presentation of a question analysis
pub fn present(analysis: &QuestionAnalysis, sample_limit: usize) -> Presentation {
    match analysis.question_type {
        QuestionType::Text => match &analysis.sample_answers {
            Some(samples) if !samples.is_empty() => {
                Presentation::Samples(samples.iter().take(sample_limit).cloned().collect())
            }
            _ => Presentation::Skipped,
        },
        QuestionType::Date => match &analysis.date_range {
            Some(range) if range.earliest.is_some() || range.latest.is_some() => {
                Presentation::DateRange(range.clone())
            }
            _ => Presentation::Skipped,
        },
        QuestionType::Scale
        | QuestionType::MultipleChoice
        | QuestionType::Dropdown
        | QuestionType::Checkbox => match chart_series(analysis) {
            Some(series) => Presentation::Chart {
                average: analysis
                    .average
                    .filter(|_| analysis.question_type == QuestionType::Scale),
                series,
            },
            None => Presentation::Skipped,
        },
    }
}

/// Average rounded for display, e.g. `3.67`
pub fn format_average(average: f64) -> String {
    format_number((average * 100.0).round() / 100.0)
}
