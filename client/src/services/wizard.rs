//! Multi-step form wizard
//!
//! A session walks through questions `0..N-1` and then a review step `N`.
//! Advancing out of a question is gated by validation; answers can be set
//! at any time. Submission is split into [`FormWizard::begin_submit`] and
//! [`FormWizard::finish_submit`] so that a response arriving after the
//! session was replaced is discarded instead of mutating the new session.
//!
//! # Submission outcomes
//!
//! - success: the form leaves the catalog and the session ends
//! - conflict ("already responded"): silent; same as success from the
//!   catalog's point of view, no error is surfaced
//! - any other failure: the error is surfaced and answers are kept for retry

use crate::api::SurveyApi;
use crate::error::{ClientError, ClientResult};
use crate::services::catalog::{CatalogMode, FormCatalog};
use crate::storage::{self, KeyValueStore};
use std::sync::{Arc, Weak};
use survey_shared::errors::AnswerError;
use survey_shared::review::{format_answer, ReviewRow};
use survey_shared::validation::{is_answered, validate_step};
use survey_shared::{
    AnswerValue, Answers, Form, FormId, FormQuestion, QuestionId, SubmitResponseRequest,
    SubmittedResponse,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Key prefix of persisted wizard drafts
pub const DRAFT_KEY_PREFIX: &str = "survey.draft.";

pub fn draft_key(form_id: &FormId) -> String {
    format!("{}{}", DRAFT_KEY_PREFIX, form_id)
}

// ============================================================================
// Session
// ============================================================================

/// Position inside the wizard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardStep {
    Question(usize),
    Review,
}

/// Submission lifecycle of a session
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SubmissionState {
    #[default]
    Editing,
    Submitting,
    Succeeded,
    /// Recoverable: answers are kept and submit can be retried
    Failed(String),
}

/// Result of moving forward
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    Moved(WizardStep),
    /// `Next` on the review step: the caller submits
    SubmitRequested,
}

/// Result of moving back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retreat {
    Moved(WizardStep),
    /// `Back` on the first question: the caller leaves the wizard
    ExitRequested,
}

/// Answer progress for the progress bar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub answered: usize,
    pub total: usize,
    pub required_answered: usize,
    pub required_total: usize,
}

impl Progress {
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        ((self.answered * 100) / self.total) as u8
    }
}

/// Transient state of one form-filling attempt
#[derive(Debug, Clone)]
pub struct WizardSession {
    id: Uuid,
    form: Form,
    questions: Vec<FormQuestion>,
    step: usize,
    answers: Answers,
    state: SubmissionState,
    has_visited_review: bool,
    validation_error: Option<AnswerError>,
}

impl WizardSession {
    pub fn new(form: Form) -> Self {
        Self::with_answers(form, Answers::new())
    }

    /// Start a session pre-filled with saved answers
    pub fn with_answers(form: Form, answers: Answers) -> Self {
        let questions = form.ordered_questions();
        // A form without questions opens directly on review
        let has_visited_review = questions.is_empty();
        Self {
            id: Uuid::new_v4(),
            form,
            questions,
            step: 0,
            answers,
            state: SubmissionState::Editing,
            has_visited_review,
            validation_error: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn form(&self) -> &Form {
        &self.form
    }

    pub fn questions(&self) -> &[FormQuestion] {
        &self.questions
    }

    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    /// Raw step index; `question_count()` is the review step
    pub fn step_index(&self) -> usize {
        self.step
    }

    pub fn step(&self) -> WizardStep {
        if self.step >= self.questions.len() {
            WizardStep::Review
        } else {
            WizardStep::Question(self.step)
        }
    }

    pub fn current_question(&self) -> Option<&FormQuestion> {
        self.questions.get(self.step)
    }

    pub fn answers(&self) -> &Answers {
        &self.answers
    }

    pub fn answer(&self, question_id: &QuestionId) -> Option<&AnswerValue> {
        self.answers.get(question_id)
    }

    pub fn state(&self) -> &SubmissionState {
        &self.state
    }

    pub fn is_submitting(&self) -> bool {
        self.state == SubmissionState::Submitting
    }

    pub fn is_submitted(&self) -> bool {
        self.state == SubmissionState::Succeeded
    }

    pub fn has_visited_review(&self) -> bool {
        self.has_visited_review
    }

    /// Error from the last rejected `next`, cleared on successful moves
    pub fn validation_error(&self) -> Option<&AnswerError> {
        self.validation_error.as_ref()
    }

    /// Store an answer. Always allowed, never validates.
    pub fn set_answer(&mut self, question_id: QuestionId, value: AnswerValue) {
        debug!(session = %self.id, question = %question_id, "Answer updated");
        self.answers.insert(question_id, value);
    }

    /// Move forward, validating the current question first
    pub fn next(&mut self) -> Result<Advance, AnswerError> {
        let Some(question) = self.questions.get(self.step) else {
            return Ok(Advance::SubmitRequested);
        };

        if let Err(err) = validate_step(question, self.answers.get(&question.question.id)) {
            debug!(session = %self.id, step = self.step, error = %err, "Step rejected");
            self.validation_error = Some(err.clone());
            return Err(err);
        }

        self.validation_error = None;
        self.step += 1;
        if self.step == self.questions.len() {
            self.has_visited_review = true;
        }
        Ok(Advance::Moved(self.step()))
    }

    /// Move back one question
    pub fn back(&mut self) -> Retreat {
        if self.step == 0 {
            return Retreat::ExitRequested;
        }
        self.validation_error = None;
        self.step -= 1;
        Retreat::Moved(self.step())
    }

    /// Jump from the review step straight to question `index`
    pub fn edit_question(&mut self, index: usize) -> ClientResult<()> {
        if self.step() != WizardStep::Review {
            return Err(ClientError::InvalidState(
                "questions can only be edited from the review step".to_string(),
            ));
        }
        if index >= self.questions.len() {
            return Err(ClientError::InvalidState(format!(
                "question {} does not exist",
                index
            )));
        }
        self.validation_error = None;
        self.step = index;
        Ok(())
    }

    /// Check every question; returns the first failing step
    pub fn validate_all(&self) -> Result<(), (usize, AnswerError)> {
        self.questions
            .iter()
            .enumerate()
            .try_for_each(|(i, q)| {
                validate_step(q, self.answers.get(&q.question.id)).map_err(|e| (i, e))
            })
    }

    pub fn progress(&self) -> Progress {
        let answered = |q: &&FormQuestion| is_answered(self.answers.get(&q.question.id));
        Progress {
            answered: self.questions.iter().filter(answered).count(),
            total: self.questions.len(),
            required_answered: self
                .questions
                .iter()
                .filter(|q| q.is_required())
                .filter(answered)
                .count(),
            required_total: self.questions.iter().filter(|q| q.is_required()).count(),
        }
    }

    /// Rows of the review step, in question order
    pub fn review_rows(&self) -> Vec<ReviewRow> {
        self.questions
            .iter()
            .enumerate()
            .map(|(step, q)| {
                let value = self.answers.get(&q.question.id);
                ReviewRow {
                    step,
                    title: q.question.title.clone(),
                    answer: format_answer(&q.question, value),
                    required: q.is_required(),
                    answered: is_answered(value),
                }
            })
            .collect()
    }

    /// Backend request for the current answers
    pub fn build_request(&self) -> SubmitResponseRequest {
        SubmitResponseRequest::from_answers(
            self.form.id.clone(),
            self.questions.iter().map(|q| &q.question.id),
            &self.answers,
        )
    }
}

// ============================================================================
// Controller
// ============================================================================

/// Pending submission, bound to the session generation that started it.
///
/// While any copy of the ticket is alive the submission counts as in flight.
/// Dropping every copy without [`FormWizard::finish_submit`] abandons it.
#[derive(Debug, Clone)]
pub struct SubmitTicket {
    generation: u64,
    pub form_id: FormId,
    pub request: SubmitResponseRequest,
    _lease: Arc<()>,
}

/// What happened to a submission
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Succeeded {
        form_id: FormId,
        response: SubmittedResponse,
        /// Forms still available afterwards
        remaining: usize,
        mode: CatalogMode,
    },
    /// Lost a race against an earlier submission; not an error for the user
    AlreadyResponded { form_id: FormId, mode: CatalogMode },
    /// Answers are kept; the user can retry
    Failed { message: String },
    /// The session changed while the request was in flight
    Discarded,
}

/// Ties the catalog, the active session and the backend together
pub struct FormWizard {
    api: Arc<dyn SurveyApi>,
    store: Arc<dyn KeyValueStore>,
    catalog: FormCatalog,
    session: Option<WizardSession>,
    generation: u64,
    in_flight: Weak<()>,
}

impl FormWizard {
    pub fn new(api: Arc<dyn SurveyApi>, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            api,
            store,
            catalog: FormCatalog::new(),
            session: None,
            generation: 0,
            in_flight: Weak::new(),
        }
    }

    pub fn catalog(&self) -> &FormCatalog {
        &self.catalog
    }

    pub fn session(&self) -> Option<&WizardSession> {
        self.session.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// A ticket for the current session is still outstanding
    pub fn is_submitting(&self) -> bool {
        self.session.as_ref().map_or(false, WizardSession::is_submitting)
            && self.in_flight.strong_count() > 0
    }

    /// Fetch the catalog and open the only form when there is exactly one
    pub async fn load(&mut self) -> CatalogMode {
        let mode = self.catalog.refresh(self.api.as_ref()).await;
        self.apply_mode(mode)
    }

    /// Open the form at `index` of the catalog
    pub fn select_form(&mut self, index: usize) -> ClientResult<&WizardSession> {
        let form = self
            .catalog
            .get(index)
            .cloned()
            .ok_or_else(|| ClientError::InvalidState(format!("no form at index {}", index)))?;

        let answers: Answers = storage::load_json(self.store.as_ref(), &draft_key(&form.id));
        let session = WizardSession::with_answers(form, answers);
        info!(
            session = %session.id(),
            form_id = %session.form().id,
            questions = session.question_count(),
            restored = session.answers().len(),
            "Wizard session started"
        );

        self.generation += 1;
        Ok(self.session.insert(session))
    }

    /// End the current session without submitting
    pub fn leave(&mut self) {
        if let Some(session) = self.session.take() {
            debug!(session = %session.id(), "Wizard session closed");
        }
        self.generation += 1;
    }

    /// Store an answer and autosave the draft
    pub fn set_answer(&mut self, question_id: QuestionId, value: AnswerValue) -> ClientResult<()> {
        let store = self.store.clone();
        let session = self.active_session_mut()?;
        session.set_answer(question_id, value);

        let key = draft_key(&session.form().id);
        if let Err(e) = storage::save_json(store.as_ref(), &key, session.answers()) {
            warn!(key = %key, error = %e, "Draft autosave failed");
        }
        Ok(())
    }

    /// `Next`: advance, or submit when on the review step
    pub async fn next(&mut self) -> ClientResult<WizardEvent> {
        let advance = self.active_session_mut()?.next()?;
        match advance {
            Advance::Moved(step) => Ok(WizardEvent::Moved(step)),
            Advance::SubmitRequested => Ok(WizardEvent::Submitted(self.submit().await?)),
        }
    }

    /// `Back`; leaving from the first question is up to the caller
    pub fn back(&mut self) -> ClientResult<Retreat> {
        Ok(self.active_session_mut()?.back())
    }

    pub fn edit_question(&mut self, index: usize) -> ClientResult<()> {
        self.active_session_mut()?.edit_question(index)
    }

    /// Validate everything and mark the session as submitting.
    ///
    /// On a validation failure the session jumps to the offending question.
    pub fn begin_submit(&mut self) -> ClientResult<SubmitTicket> {
        let generation = self.generation;
        let outstanding = self.in_flight.strong_count() > 0;
        let session = self.active_session_mut()?;

        if session.is_submitting() {
            if outstanding {
                return Err(ClientError::InvalidState(
                    "a submission is already in flight".to_string(),
                ));
            }
            warn!(session = %session.id(), "Previous submission was abandoned, starting over");
            session.state = SubmissionState::Editing;
        }
        if let Err((step, err)) = session.validate_all() {
            session.step = step;
            session.validation_error = Some(err.clone());
            return Err(err.into());
        }

        session.state = SubmissionState::Submitting;
        info!(session = %session.id(), form_id = %session.form().id, "Submitting form");
        let ticket = SubmitTicket {
            generation,
            form_id: session.form().id.clone(),
            request: session.build_request(),
            _lease: Arc::new(()),
        };
        self.in_flight = Arc::downgrade(&ticket._lease);
        Ok(ticket)
    }

    /// Apply the backend's answer to a ticket
    pub fn finish_submit(
        &mut self,
        ticket: SubmitTicket,
        result: ClientResult<SubmittedResponse>,
    ) -> SubmitOutcome {
        if ticket.generation != self.generation || self.session.is_none() {
            warn!(form_id = %ticket.form_id, "Discarding submission result for a closed session");
            return SubmitOutcome::Discarded;
        }

        match result {
            Ok(response) => {
                metrics::counter!("survey_submissions_total", "outcome" => "success").increment(1);
                self.clear_draft(&ticket.form_id);
                if let Some(session) = self.session.as_mut() {
                    session.state = SubmissionState::Succeeded;
                }
                let mode = self.catalog.remove(&ticket.form_id);
                self.leave();
                info!(form_id = %ticket.form_id, remaining = self.catalog.len(), "Form submitted");
                SubmitOutcome::Succeeded {
                    form_id: ticket.form_id,
                    response,
                    remaining: self.catalog.len(),
                    mode,
                }
            }
            Err(ClientError::Conflict(message)) => {
                metrics::counter!("survey_submissions_total", "outcome" => "conflict").increment(1);
                info!(form_id = %ticket.form_id, %message, "Form was already answered, resetting");
                self.clear_draft(&ticket.form_id);
                let mode = self.catalog.remove(&ticket.form_id);
                self.leave();
                let mode = self.apply_mode(mode);
                SubmitOutcome::AlreadyResponded {
                    form_id: ticket.form_id,
                    mode,
                }
            }
            Err(err) => {
                metrics::counter!("survey_submissions_total", "outcome" => "failure").increment(1);
                let message = err.user_message();
                warn!(form_id = %ticket.form_id, error = %err, "Submission failed");
                if let Some(session) = self.session.as_mut() {
                    session.state = SubmissionState::Failed(message.clone());
                }
                SubmitOutcome::Failed { message }
            }
        }
    }

    /// Submit the current session and apply the outcome
    pub async fn submit(&mut self) -> ClientResult<SubmitOutcome> {
        let ticket = self.begin_submit()?;
        let result = self.api.submit_form_response(&ticket.request).await;
        Ok(self.finish_submit(ticket, result))
    }

    fn active_session_mut(&mut self) -> ClientResult<&mut WizardSession> {
        self.session
            .as_mut()
            .ok_or_else(|| ClientError::InvalidState("no form selected".to_string()))
    }

    fn apply_mode(&mut self, mode: CatalogMode) -> CatalogMode {
        if mode == CatalogMode::SingleAutoSelected && self.session.is_none() {
            if let Err(e) = self.select_form(0) {
                warn!(error = %e, "Auto-select failed");
            }
        }
        mode
    }

    fn clear_draft(&self, form_id: &FormId) {
        if let Err(e) = self.store.remove(&draft_key(form_id)) {
            warn!(form_id = %form_id, error = %e, "Failed to clear draft");
        }
    }
}

/// Result of the wizard's `Next` action
#[derive(Debug, Clone, PartialEq)]
pub enum WizardEvent {
    Moved(WizardStep),
    Submitted(SubmitOutcome),
}
