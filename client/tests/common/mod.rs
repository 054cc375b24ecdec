//! Common test utilities for integration tests
//!
//! Provides a wiremock-backed HTTP client and a scripted in-memory
//! [`SurveyApi`] for driving the services.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use fake::faker::lorem::en::Sentence;
use fake::Fake;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use survey_client::api::{HttpSurveyApi, SurveyApi};
use survey_client::config::ClientConfig;
use survey_client::error::{ClientError, ClientResult};
use survey_shared::analytics::FormAnalysis;
use survey_shared::{
    Form, FormExport, FormId, FormQuestion, Question, QuestionKind, ResponseId,
    SubmitResponseRequest, SubmittedResponse,
};
use wiremock::MockServer;

/// HTTP client pointed at a mock backend
pub struct TestBackend {
    pub server: MockServer,
    pub api: HttpSurveyApi,
}

impl TestBackend {
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let api = HttpSurveyApi::new(&test_config(&server.uri()).api)
            .expect("Failed to build HTTP client");
        Self { server, api }
    }
}

/// Default configuration aimed at `base_url`
pub fn test_config(base_url: &str) -> ClientConfig {
    let mut config = ClientConfig::default();
    config.api.base_url = base_url.to_string();
    config.api.timeout_secs = 5;
    config
}

// ============================================================================
// Fixtures
// ============================================================================

pub fn text_question(id: &str, required: bool, order: u32) -> FormQuestion {
    FormQuestion {
        question: Question::new(
            id,
            Sentence(3..6).fake::<String>(),
            QuestionKind::Text {
                min_length: None,
                max_length: None,
            },
        ),
        required: Some(required),
        order,
    }
}

pub fn form(id: &str, questions: Vec<FormQuestion>) -> Form {
    Form {
        id: FormId::new(id),
        title: Sentence(2..4).fake(),
        description: String::new(),
        questions,
        is_active: true,
        has_responded: None,
    }
}

pub fn submitted(id: &str) -> SubmittedResponse {
    SubmittedResponse {
        id: ResponseId::new(id),
        submitted_at: Utc::now(),
    }
}

pub fn conflict() -> ClientError {
    ClientError::Conflict("You have already responded to this form".to_string())
}

pub fn server_error() -> ClientError {
    ClientError::Api {
        status: Some(500),
        code: None,
        message: "Internal server error".to_string(),
    }
}

// ============================================================================
// Scripted API
// ============================================================================

/// In-memory backend. Results are consumed in order; when a queue is empty
/// submissions succeed. `latency` delays every submission reply.
#[derive(Default)]
pub struct ScriptedApi {
    pub forms: Mutex<Vec<Form>>,
    pub form_results: Mutex<VecDeque<ClientResult<SubmittedResponse>>>,
    pub diary_results: Mutex<VecDeque<ClientResult<SubmittedResponse>>>,
    pub form_requests: Mutex<Vec<SubmitResponseRequest>>,
    pub diary_requests: Mutex<Vec<SubmitResponseRequest>>,
    pub can_respond: Mutex<bool>,
    pub latency: Mutex<Option<Duration>>,
    pub completed: AtomicUsize,
}

impl ScriptedApi {
    pub fn with_forms(forms: Vec<Form>) -> Self {
        let api = Self::default();
        *api.forms.lock().unwrap() = forms;
        api
    }

    pub fn push_form_result(&self, result: ClientResult<SubmittedResponse>) {
        self.form_results.lock().unwrap().push_back(result);
    }

    pub fn push_diary_result(&self, result: ClientResult<SubmittedResponse>) {
        self.diary_results.lock().unwrap().push_back(result);
    }

    pub fn form_requests(&self) -> Vec<SubmitResponseRequest> {
        self.form_requests.lock().unwrap().clone()
    }

    pub fn diary_requests(&self) -> Vec<SubmitResponseRequest> {
        self.diary_requests.lock().unwrap().clone()
    }

    pub fn set_latency(&self, delay: Duration) {
        *self.latency.lock().unwrap() = Some(delay);
    }

    /// Submissions whose reply has been produced
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    async fn reply(&self, result: ClientResult<SubmittedResponse>) -> ClientResult<SubmittedResponse> {
        let latency = *self.latency.lock().unwrap();
        if let Some(delay) = latency {
            tokio::time::sleep(delay).await;
        }
        self.completed.fetch_add(1, Ordering::SeqCst);
        result
    }
}

#[async_trait]
impl SurveyApi for ScriptedApi {
    async fn fetch_active_forms(&self) -> ClientResult<Vec<Form>> {
        Ok(self.forms.lock().unwrap().clone())
    }

    async fn submit_form_response(&self, request: &SubmitResponseRequest) -> ClientResult<SubmittedResponse> {
        let result = {
            let mut requests = self.form_requests.lock().unwrap();
            requests.push(request.clone());
            let n = requests.len();
            self.form_results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(submitted(&format!("response-{n}"))))
        };
        self.reply(result).await
    }

    async fn submit_diary_response(&self, request: &SubmitResponseRequest) -> ClientResult<SubmittedResponse> {
        let result = {
            let mut requests = self.diary_requests.lock().unwrap();
            requests.push(request.clone());
            let n = requests.len();
            self.diary_results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(submitted(&format!("diary-{n}"))))
        };
        self.reply(result).await
    }

    async fn can_respond_to_diary(&self, _form_id: &FormId) -> ClientResult<bool> {
        Ok(*self.can_respond.lock().unwrap())
    }

    async fn get_full_analysis(&self, _form_id: &FormId) -> ClientResult<FormAnalysis> {
        Err(server_error())
    }

    async fn export_form_data(&self, _form_id: &FormId, _role: &str) -> ClientResult<FormExport> {
        Err(server_error())
    }
}
