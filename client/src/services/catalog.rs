//! Form catalog resolution
//!
//! Decides which of the backend's forms the user can still fill in, and
//! whether to open one directly or ask the user to pick.

use crate::api::SurveyApi;
use survey_shared::{Form, FormId};
use tracing::{info, warn};

/// What the catalog screen should show
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogMode {
    /// Nothing left to answer ("all done")
    NoneAvailable,
    /// Exactly one form; the wizard opens it directly
    SingleAutoSelected,
    /// The user picks a form first
    MultipleNeedSelection,
}

impl CatalogMode {
    pub fn for_count(count: usize) -> Self {
        match count {
            0 => CatalogMode::NoneAvailable,
            1 => CatalogMode::SingleAutoSelected,
            _ => CatalogMode::MultipleNeedSelection,
        }
    }
}

/// Result of resolving a raw form list
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogResolution {
    pub mode: CatalogMode,
    pub forms: Vec<Form>,
}

/// Keep active forms the user has not answered and pick the catalog mode
pub fn resolve(raw_forms: Vec<Form>) -> CatalogResolution {
    let forms: Vec<Form> = raw_forms.into_iter().filter(Form::is_available).collect();
    CatalogResolution {
        mode: CatalogMode::for_count(forms.len()),
        forms,
    }
}

/// In-memory set of forms still available to the user.
///
/// Shrinks only after a confirmed submission outcome.
#[derive(Debug, Clone, Default)]
pub struct FormCatalog {
    forms: Vec<Form>,
    last_error: Option<String>,
}

impl FormCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_forms(raw_forms: Vec<Form>) -> Self {
        Self {
            forms: resolve(raw_forms).forms,
            last_error: None,
        }
    }

    /// Fetch forms from the backend.
    ///
    /// A failure keeps the current set and records an opaque message; the
    /// caller offers an explicit retry.
    pub async fn refresh(&mut self, api: &dyn SurveyApi) -> CatalogMode {
        match api.fetch_active_forms().await {
            Ok(raw_forms) => {
                let fetched = raw_forms.len();
                let resolution = resolve(raw_forms);
                info!(
                    fetched,
                    available = resolution.forms.len(),
                    mode = ?resolution.mode,
                    "Resolved form catalog"
                );
                self.forms = resolution.forms;
                self.last_error = None;
                resolution.mode
            }
            Err(e) => {
                warn!(error = %e, "Failed to fetch active forms");
                self.last_error = Some(e.user_message());
                self.mode()
            }
        }
    }

    pub fn mode(&self) -> CatalogMode {
        CatalogMode::for_count(self.forms.len())
    }

    pub fn forms(&self) -> &[Form] {
        &self.forms
    }

    pub fn len(&self) -> usize {
        self.forms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forms.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Form> {
        self.forms.get(index)
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Drop a form after its submission outcome is known
    pub fn remove(&mut self, form_id: &FormId) -> CatalogMode {
        self.forms.retain(|f| &f.id != form_id);
        self.mode()
    }
}
