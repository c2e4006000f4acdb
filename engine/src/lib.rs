//! Analysis pipeline for NutriLens.
//!
//! One request flows through:
//!
//! ```text
//! intake -> VisionClassifier -> fallback::resolve
//!     -> (PersistenceSink || FitnessSync) -> AnalysisResult
//! ```
//!
//! Collaborators are injected as trait objects; [`bootstrap`] builds them from
//! [`Settings`].

pub mod bootstrap;
pub mod fallback;
pub mod intake;
mod orchestrator;

pub use intake::{ImageUpload, InputError};
pub use orchestrator::{AnalysisOrchestrator, HistoryError};

pub use nutrilens_config::{Settings, Timeouts};
pub use nutrilens_store::PersistError;
pub use nutrilens_types::{AnalysisResult, HistoryEntry, NutritionRecord, SyncOutcome, SyncStatus};
