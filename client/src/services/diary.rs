//! Diary scheduler
//!
//! A one-question wizard keyed by calendar date. Every edit lands in the
//! local draft cache immediately; edits to today's entry are also sent to
//! the backend after a quiet period. Past dates are local-only. Clearing
//! today's entry is synced as an empty answer once a remote copy exists.
//!
//! Sync results come back on a channel of [`DiaryEvent`]s. Results that
//! arrive after [`DiaryScheduler::teardown`] are dropped.

use crate::api::SurveyApi;
use crate::error::ClientResult;
use crate::services::timer::DebounceTimer;
use crate::storage::{self, KeyValueStore};
use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use survey_shared::{AnswerValue, FormId, QuestionId, ResponseAnswer, ResponseId, SubmitResponseRequest};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

pub const DRAFTS_KEY: &str = "survey.diary.drafts";
pub const SUBMITTED_KEY: &str = "survey.diary.submitted";

// ============================================================================
// Clock
// ============================================================================

/// Source of "today"
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Local calendar date of the host
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Settable clock for tests and replays
#[derive(Debug)]
pub struct FixedClock {
    today: Mutex<NaiveDate>,
}

impl FixedClock {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today: Mutex::new(today),
        }
    }

    pub fn set(&self, today: NaiveDate) {
        *self.today.lock().unwrap_or_else(|e| e.into_inner()) = today;
    }
}

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        *self.today.lock().unwrap_or_else(|e| e.into_inner())
    }
}

// ============================================================================
// Cache
// ============================================================================

/// Remote copy of an entry, recorded after a successful sync
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedEntry {
    pub response_id: ResponseId,
    pub submitted_at: DateTime<Utc>,
    pub text: String,
}

/// Per-date drafts and submitted entries, loaded once and written back on
/// every change
pub struct DiaryCache {
    store: Arc<dyn KeyValueStore>,
    drafts: BTreeMap<NaiveDate, String>,
    submitted: BTreeMap<NaiveDate, SubmittedEntry>,
}

impl DiaryCache {
    pub fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let drafts = storage::load_json(store.as_ref(), DRAFTS_KEY);
        let submitted = storage::load_json(store.as_ref(), SUBMITTED_KEY);
        Self {
            store,
            drafts,
            submitted,
        }
    }

    pub fn draft(&self, date: NaiveDate) -> Option<&str> {
        self.drafts.get(&date).map(String::as_str)
    }

    pub fn submitted(&self, date: NaiveDate) -> Option<&SubmittedEntry> {
        self.submitted.get(&date)
    }

    /// Draft wins over the submitted text since it is the newer edit
    pub fn text_for(&self, date: NaiveDate) -> String {
        self.draft(date)
            .or_else(|| self.submitted(date).map(|e| e.text.as_str()))
            .unwrap_or_default()
            .to_string()
    }

    pub fn set_draft(&mut self, date: NaiveDate, text: impl Into<String>) {
        self.drafts.insert(date, text.into());
        self.flush(DRAFTS_KEY, &self.drafts);
    }

    pub fn record_submitted(&mut self, date: NaiveDate, entry: SubmittedEntry) {
        self.submitted.insert(date, entry);
        self.flush(SUBMITTED_KEY, &self.submitted);
    }

    pub fn dates(&self) -> BTreeSet<NaiveDate> {
        self.drafts
            .keys()
            .chain(self.submitted.keys())
            .copied()
            .collect()
    }

    fn flush<T: Serialize>(&self, key: &str, value: &T) {
        if let Err(e) = storage::save_json(self.store.as_ref(), key, value) {
            warn!(key, error = %e, "Failed to persist diary cache");
        }
    }
}

// ============================================================================
// Scheduler
// ============================================================================

/// Transient notification about a remote sync
#[derive(Debug, Clone, PartialEq)]
pub enum DiaryEvent {
    Submitted {
        date: NaiveDate,
        response_id: ResponseId,
    },
    /// The draft is kept locally
    SubmitFailed { date: NaiveDate, message: String },
}

/// Call-to-action for the selected date
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiaryAffordance {
    StartNew,
    ContinueEditing,
}

/// One row of the diary history
#[derive(Debug, Clone, PartialEq)]
pub struct DiaryEntry {
    pub date: NaiveDate,
    pub text: String,
    pub synced: Option<SubmittedEntry>,
}

/// Everything a sync task needs, detached from the scheduler
#[derive(Clone)]
struct SyncContext {
    api: Arc<dyn SurveyApi>,
    cache: Arc<Mutex<DiaryCache>>,
    generation: Arc<AtomicU64>,
    events: mpsc::UnboundedSender<DiaryEvent>,
    form_id: FormId,
    question_id: QuestionId,
}

impl SyncContext {
    async fn submit(self, date: NaiveDate, text: String, started_at: u64) {
        let request = SubmitResponseRequest {
            form_id: self.form_id.clone(),
            answers: vec![ResponseAnswer {
                question_id: self.question_id.clone(),
                answer: AnswerValue::text(text.clone()),
            }],
        };

        let result = self.api.submit_diary_response(&request).await;

        if self.generation.load(Ordering::SeqCst) != started_at {
            warn!(%date, "Diary scheduler torn down, dropping sync result");
            return;
        }

        let event = match result {
            Ok(response) => {
                metrics::counter!("survey_diary_syncs_total", "outcome" => "success").increment(1);
                info!(%date, response_id = %response.id, "Diary entry synced");
                lock(&self.cache).record_submitted(
                    date,
                    SubmittedEntry {
                        response_id: response.id.clone(),
                        submitted_at: response.submitted_at,
                        text,
                    },
                );
                DiaryEvent::Submitted {
                    date,
                    response_id: response.id,
                }
            }
            Err(e) => {
                metrics::counter!("survey_diary_syncs_total", "outcome" => "failure").increment(1);
                warn!(%date, error = %e, "Diary sync failed, draft kept");
                DiaryEvent::SubmitFailed {
                    date,
                    message: e.user_message(),
                }
            }
        };
        // Receiver may be gone
        let _ = self.events.send(event);
    }
}

fn lock(cache: &Mutex<DiaryCache>) -> MutexGuard<'_, DiaryCache> {
    cache.lock().unwrap_or_else(|e| e.into_inner())
}

/// Diary controller for one diary form
pub struct DiaryScheduler {
    ctx: SyncContext,
    clock: Arc<dyn Clock>,
    debounce: Duration,
    timer: DebounceTimer,
    selected: NaiveDate,
    text: String,
}

impl DiaryScheduler {
    /// Load the cache and select today
    pub fn new(
        api: Arc<dyn SurveyApi>,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        form_id: FormId,
        question_id: QuestionId,
        debounce: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<DiaryEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let cache = DiaryCache::load(store);
        let today = clock.today();
        let text = cache.text_for(today);

        let scheduler = Self {
            ctx: SyncContext {
                api,
                cache: Arc::new(Mutex::new(cache)),
                generation: Arc::new(AtomicU64::new(0)),
                events,
                form_id,
                question_id,
            },
            clock,
            debounce,
            timer: DebounceTimer::new(),
            selected: today,
            text,
        };
        (scheduler, receiver)
    }

    pub fn selected_date(&self) -> NaiveDate {
        self.selected
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_today(&self) -> bool {
        self.selected == self.clock.today()
    }

    /// Switch dates; returns the text to display
    pub fn select_date(&mut self, date: NaiveDate) -> &str {
        self.selected = date;
        self.text = lock(&self.ctx.cache).text_for(date);
        debug!(%date, chars = self.text.len(), "Diary date selected");
        &self.text
    }

    /// Apply a keystroke
    pub fn edit(&mut self, text: impl Into<String>) {
        self.text = text.into();
        let date = self.selected;
        lock(&self.ctx.cache).set_draft(date, self.text.clone());

        let Some(payload) = self.sync_payload() else {
            self.timer.cancel();
            return;
        };
        let task = self
            .ctx
            .clone()
            .submit(date, payload, self.ctx.generation.load(Ordering::SeqCst));
        // The request outlives the timer once sent; teardown only drops its result
        self.timer.schedule_detached(self.debounce, task);
    }

    /// Send today's pending text without waiting for the debounce
    pub async fn flush_now(&mut self) {
        self.timer.cancel();
        let Some(payload) = self.sync_payload() else {
            return;
        };
        let started_at = self.ctx.generation.load(Ordering::SeqCst);
        self.ctx
            .clone()
            .submit(self.selected, payload, started_at)
            .await;
    }

    /// Text to send for the selected date, if it should be synced at all.
    ///
    /// Only today syncs. Blank text is sent as an empty answer when it clears
    /// a remote entry and skipped otherwise.
    fn sync_payload(&self) -> Option<String> {
        if self.selected != self.clock.today() {
            return None;
        }
        if !self.text.trim().is_empty() {
            return Some(self.text.clone());
        }
        let cache = lock(&self.ctx.cache);
        let remote = cache.submitted(self.selected)?;
        (!remote.text.trim().is_empty()).then(String::new)
    }

    pub fn has_pending_sync(&self) -> bool {
        self.timer.is_pending()
    }

    /// Which call-to-action to show for the selected date.
    ///
    /// Advisory only: editing is never blocked by it.
    pub async fn affordance(&self) -> ClientResult<DiaryAffordance> {
        if !self.text.trim().is_empty() {
            return Ok(DiaryAffordance::ContinueEditing);
        }
        let can_respond = self.ctx.api.can_respond_to_diary(&self.ctx.form_id).await?;
        Ok(if can_respond {
            DiaryAffordance::StartNew
        } else {
            DiaryAffordance::ContinueEditing
        })
    }

    /// Every known date, newest first
    pub fn entries(&self) -> Vec<DiaryEntry> {
        let cache = lock(&self.ctx.cache);
        cache
            .dates()
            .into_iter()
            .rev()
            .map(|date| DiaryEntry {
                date,
                text: cache.text_for(date),
                synced: cache.submitted(date).cloned(),
            })
            .collect()
    }

    /// Cancel the pending sync and ignore in-flight results
    pub fn teardown(&mut self) {
        self.timer.cancel();
        self.ctx.generation.fetch_add(1, Ordering::SeqCst);
    }
}

impl Drop for DiaryScheduler {
    fn drop(&mut self) {
        self.teardown();
    }
}
