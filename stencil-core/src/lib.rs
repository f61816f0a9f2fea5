//! Stencil Core - foundational types for template field authoring
//!
//! This crate defines the field data model, the capability contract of the
//! external rich-text editor, host configuration, the error taxonomy, and
//! the event types the builder reports back to its host.

pub mod config;
pub mod editor;
pub mod error;
pub mod event;
pub mod field;

// Re-export commonly used types
pub use config::{
    BuilderConfig, DocumentConfig, FieldsConfig, ListConfig, ListPosition, MenuConfig,
    ToolbarConfig, ValidationResult, DEFAULT_TRIGGER,
};
pub use editor::{
    CommandStatus, DocumentEditor, DocumentMode, DocumentSource, EditorFactory, EditorOptions,
    ExportOptions, InsertRequest, MarkerAttrs, ScreenRect, StructuredContentMarker,
};
pub use error::{report_error, ErrorHandler, ErrorSeverity, Result, StencilError};
pub use event::{
    BuilderEvent, BuilderListener, ListenerRegistry, SubscriptionId, TriggerCleanup, TriggerEvent,
};
pub use field::{FieldDefinition, FieldKey, FieldMode, FieldSpec, FieldUpdate, TemplateField};
