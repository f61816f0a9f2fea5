//! Template field authoring on top of an external rich-text editor
//!
//! [`TemplateBuilder`] watches document changes for the menu trigger,
//! filters the field catalog while the user types, keeps its field list in
//! step with the editor's structured-content registry and exposes the
//! insert / update / delete / navigate / export commands.

use stencil_core::StencilError;

pub mod builder;
pub mod catalog;
pub mod commands;
pub mod filter;
pub mod lifecycle;
pub mod list;
pub mod memory_editor;
pub mod menu;
pub mod reconciler;
pub mod trigger;

pub use builder::{FieldCreator, TemplateBuilder};
pub use catalog::{group_by_category, FieldCatalog, UNCATEGORIZED};
pub use commands::ExportResult;
pub use filter::{FilterEngine, FilterOutcome};
pub use lifecycle::{LifecycleState, PendingInitialization};
pub use list::{FieldListView, FieldRow};
pub use memory_editor::{CommandBehavior, MemoryEditor, MemoryEditorFactory};
pub use menu::{MenuGroup, MenuView, CREATE_ENTRY_LABEL};
pub use reconciler::FieldReconciler;
pub use trigger::{TriggerDetector, TriggerMatch, TriggerSession};

/// Builder-specific errors
#[derive(Debug, thiserror::Error)]
pub enum BuilderError {
    #[error("Creating fields is not enabled in the configuration")]
    CreateNotAllowed,

    #[error("Field label must not be empty")]
    EmptyLabel,
}

impl From<BuilderError> for StencilError {
    fn from(err: BuilderError) -> Self {
        match err {
            BuilderError::CreateNotAllowed => StencilError::Config(err.to_string()),
            BuilderError::EmptyLabel => StencilError::FieldCreation(err.to_string()),
        }
    }
}
