//! Client-side business logic
//!
//! Services own the interaction state (catalog, wizard, diary) and reach
//! the backend and local storage only through injected traits.

pub mod catalog;
pub mod dashboard;
pub mod diary;
pub mod export;
pub mod timer;
pub mod wizard;

pub use catalog::{CatalogMode, FormCatalog};
pub use dashboard::{build_dashboard, ChartRegistry, Dashboard};
pub use diary::{DiaryEvent, DiaryScheduler};
pub use export::ExportService;
pub use timer::DebounceTimer;
pub use wizard::{FormWizard, SubmitOutcome, WizardSession};
