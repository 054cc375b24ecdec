//! HTTP implementation of the backend contract

use super::SurveyApi;
use crate::config::ApiConfig;
use crate::error::{ClientError, ClientResult};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde_json::Value;
use survey_shared::analytics::FormAnalysis;
use survey_shared::{
    ApiEnvelope, DiaryCapability, Form, FormExport, FormId, OneOrMany, SubmitResponseRequest,
    SubmittedResponse,
};
use tracing::{debug, warn};

/// Structured code the backend uses when nothing is assigned
const NO_ACTIVE_FORMS_CODE: &str = "NO_ACTIVE_FORMS";
/// Legacy message for the same condition, matched case-insensitively
const NO_ACTIVE_FORMS_MSG: &str = "no active forms";

/// reqwest-backed [`SurveyApi`]
#[derive(Clone)]
pub struct HttpSurveyApi {
    client: Client,
    base_url: String,
    conflict_code: String,
    token: Option<String>,
}

impl HttpSurveyApi {
    /// Build a client from configuration
    pub fn new(config: &ApiConfig) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("survey-client/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            conflict_code: config.conflict_code.clone(),
            token: config
                .auth_token
                .as_ref()
                .map(|t| t.expose_secret().to_string()),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Send a request and read the body as JSON.
    ///
    /// Error statuses are read too, since the backend reports conflicts
    /// through the body of a 4xx response.
    async fn send_raw(&self, request: RequestBuilder) -> ClientResult<(StatusCode, Value)> {
        let response = self.authorized(request).send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!(status = status.as_u16(), bytes = body.len(), "Backend response");

        if body.trim().is_empty() {
            return Ok((status, Value::Null));
        }
        match serde_json::from_str::<Value>(&body) {
            Ok(value) => Ok((status, value)),
            Err(_) if !status.is_success() => Err(ClientError::Api {
                status: Some(status.as_u16()),
                code: None,
                message: format!("Request failed with status {}", status),
            }),
            Err(err) => Err(ClientError::Decode(err)),
        }
    }

    /// Send a request and decode the body as an untyped envelope.
    ///
    /// `data` stays raw JSON until the envelope is known to be a success, so
    /// an error body carrying unexpected `data` still classifies correctly.
    async fn send(&self, request: RequestBuilder) -> ClientResult<(StatusCode, ApiEnvelope<Value>)> {
        let (status, value) = self.send_raw(request).await?;
        Ok((status, envelope_from(status, value)?))
    }

    /// Classify an envelope into typed data or an error
    fn check<T: DeserializeOwned>(
        &self,
        status: StatusCode,
        envelope: ApiEnvelope<Value>,
    ) -> ClientResult<Option<T>> {
        if envelope.is_error() || !status.is_success() {
            return Err(self.classify_error(status, envelope));
        }
        match envelope.data {
            None | Some(Value::Null) => Ok(None),
            Some(data) => Ok(Some(serde_json::from_value(data)?)),
        }
    }

    fn classify_error(&self, status: StatusCode, envelope: ApiEnvelope<Value>) -> ClientError {
        let message = envelope.error_message();
        if envelope.code.as_deref() == Some(self.conflict_code.as_str()) {
            return ClientError::Conflict(message);
        }
        warn!(status = status.as_u16(), code = ?envelope.code, %message, "Backend rejected request");
        ClientError::Api {
            status: Some(status.as_u16()),
            code: envelope.code,
            message,
        }
    }

    /// Fetch a payload that is either bare or wrapped in an envelope.
    ///
    /// `marker` is a field only the payload carries, used to tell the two apart.
    async fn get_payload<T: DeserializeOwned>(&self, request: RequestBuilder, marker: &str) -> ClientResult<T> {
        let (status, value) = self.send_raw(request).await?;

        if value.get(marker).is_some() && status.is_success() {
            return Ok(serde_json::from_value(value)?);
        }

        let envelope = envelope_from(status, value)?;
        match self.check::<Value>(status, envelope)? {
            Some(data) if data.get(marker).is_some() => Ok(serde_json::from_value(data)?),
            _ => Err(ClientError::Api {
                status: Some(status.as_u16()),
                code: None,
                message: "Response did not contain the expected payload".to_string(),
            }),
        }
    }

    async fn submit(&self, path: &str, request: &SubmitResponseRequest) -> ClientResult<SubmittedResponse> {
        let builder = self.client.post(self.url(path)).json(request);
        let (status, envelope) = self.send(builder).await?;
        self.check::<SubmittedResponse>(status, envelope)?.ok_or_else(|| ClientError::Api {
            status: Some(status.as_u16()),
            code: None,
            message: "Submission returned no response record".to_string(),
        })
    }
}

/// Read a JSON body as an envelope; an empty body only means success on 2xx
fn envelope_from(status: StatusCode, value: Value) -> ClientResult<ApiEnvelope<Value>> {
    match value {
        Value::Null => Ok(ApiEnvelope {
            error: (!status.is_success()).then(|| Value::String(status.to_string())),
            msg: None,
            code: None,
            data: None,
        }),
        value => match serde_json::from_value(value) {
            Ok(envelope) => Ok(envelope),
            Err(_) if !status.is_success() => Err(ClientError::Api {
                status: Some(status.as_u16()),
                code: None,
                message: format!("Request failed with status {}", status),
            }),
            Err(err) => Err(ClientError::Decode(err)),
        },
    }
}

#[async_trait]
impl SurveyApi for HttpSurveyApi {
    async fn fetch_active_forms(&self) -> ClientResult<Vec<Form>> {
        let builder = self.client.get(self.url("/forms/active"));
        let (status, envelope) = self.send(builder).await?;

        let none_active = envelope.code.as_deref() == Some(NO_ACTIVE_FORMS_CODE)
            || envelope
                .msg
                .as_deref()
                .map_or(false, |m| m.to_lowercase().contains(NO_ACTIVE_FORMS_MSG));
        if none_active {
            debug!("Backend reports no active forms");
            return Ok(Vec::new());
        }

        Ok(self
            .check::<OneOrMany<Form>>(status, envelope)?
            .map(OneOrMany::into_vec)
            .unwrap_or_default())
    }

    async fn submit_form_response(&self, request: &SubmitResponseRequest) -> ClientResult<SubmittedResponse> {
        self.submit("/responses", request).await
    }

    async fn submit_diary_response(&self, request: &SubmitResponseRequest) -> ClientResult<SubmittedResponse> {
        self.submit("/diary/responses", request).await
    }

    async fn can_respond_to_diary(&self, form_id: &FormId) -> ClientResult<bool> {
        let builder = self
            .client
            .get(self.url(&format!("/diary/{}/can-respond", form_id)));
        let (status, envelope) = self.send(builder).await?;
        Ok(self
            .check::<DiaryCapability>(status, envelope)?
            .map_or(false, |capability| capability.can_respond))
    }

    async fn get_full_analysis(&self, form_id: &FormId) -> ClientResult<FormAnalysis> {
        let builder = self
            .client
            .get(self.url(&format!("/analytics/forms/{}", form_id)));
        self.get_payload(builder, "questionsAnalysis").await
    }

    async fn export_form_data(&self, form_id: &FormId, role: &str) -> ClientResult<FormExport> {
        let builder = self
            .client
            .get(self.url(&format!("/export/forms/{}", form_id)))
            .query(&[("role", role)]);
        self.get_payload(builder, "formTitle").await
    }
}
