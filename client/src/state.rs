//! Client state
//!
//! Shared resources built once at startup and handed to the services.
//! All fields are `Arc`s, so cloning is cheap.

use crate::api::{HttpSurveyApi, SurveyApi};
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::services::diary::{Clock, DiaryEvent, DiaryScheduler, SystemClock};
use crate::services::{ExportService, FormWizard};
use crate::storage::{FileStore, KeyValueStore};
use std::sync::Arc;
use survey_shared::{FormId, QuestionId};
use tokio::sync::mpsc;

#[derive(Clone)]
pub struct ClientState {
    pub config: Arc<ClientConfig>,
    pub api: Arc<dyn SurveyApi>,
    pub store: Arc<dyn KeyValueStore>,
    pub clock: Arc<dyn Clock>,
}

impl ClientState {
    /// Wire the HTTP backend and the file cache from configuration
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        let api = HttpSurveyApi::new(&config.api)?;
        let store = FileStore::open(&config.storage.dir)?;
        Ok(Self::with_parts(config, Arc::new(api), Arc::new(store)))
    }

    pub fn with_parts(
        config: ClientConfig,
        api: Arc<dyn SurveyApi>,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            api,
            store,
            clock: Arc::new(SystemClock),
        }
    }

    #[inline]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn wizard(&self) -> FormWizard {
        FormWizard::new(self.api.clone(), self.store.clone())
    }

    pub fn exporter(&self) -> ExportService {
        ExportService::new(self.api.clone(), self.config.api.export_role.clone())
    }

    /// Diary scheduler for the configured diary form
    pub fn diary(&self) -> ClientResult<(DiaryScheduler, mpsc::UnboundedReceiver<DiaryEvent>)> {
        let diary = &self.config.diary;
        let (Some(form_id), Some(question_id)) = (&diary.form_id, &diary.question_id) else {
            return Err(ClientError::Config(
                "diary.form_id and diary.question_id must be set".to_string(),
            ));
        };
        Ok(DiaryScheduler::new(
            self.api.clone(),
            self.store.clone(),
            self.clock.clone(),
            FormId::new(form_id.as_str()),
            QuestionId::new(question_id.as_str()),
            diary.debounce(),
        ))
    }
}
