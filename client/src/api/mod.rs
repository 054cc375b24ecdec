//! Backend contract
//!
//! The HTTP backend is an external collaborator reached only through
//! [`SurveyApi`]. Services depend on the trait so they can be driven by the
//! real [`HttpSurveyApi`] or by an in-memory double in tests.

use crate::error::ClientResult;
use async_trait::async_trait;
use survey_shared::analytics::FormAnalysis;
use survey_shared::{Form, FormExport, FormId, SubmitResponseRequest, SubmittedResponse};

mod http;

pub use http::HttpSurveyApi;

/// Operations consumed from the survey backend
#[async_trait]
pub trait SurveyApi: Send + Sync {
    /// Forms assigned to the current user. An empty list means "none available".
    async fn fetch_active_forms(&self) -> ClientResult<Vec<Form>>;

    /// Submit a completed form.
    ///
    /// Fails with [`ClientError::Conflict`](crate::error::ClientError::Conflict)
    /// when the user already responded.
    async fn submit_form_response(
        &self,
        request: &SubmitResponseRequest,
    ) -> ClientResult<SubmittedResponse>;

    /// Submit the diary entry for today
    async fn submit_diary_response(
        &self,
        request: &SubmitResponseRequest,
    ) -> ClientResult<SubmittedResponse>;

    /// Advisory check used to pick the diary call-to-action
    async fn can_respond_to_diary(&self, form_id: &FormId) -> ClientResult<bool>;

    /// Aggregates for the analytics dashboard
    async fn get_full_analysis(&self, form_id: &FormId) -> ClientResult<FormAnalysis>;

    /// Raw response rows for spreadsheet export
    async fn export_form_data(&self, form_id: &FormId, role: &str) -> ClientResult<FormExport>;
}
