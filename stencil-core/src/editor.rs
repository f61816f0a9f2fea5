//! Capability contract for the external rich-text editor
//!
//! The editor owns the document and is the single source of truth for
//! inserted markers. Everything in this crate talks to it through
//! [`DocumentEditor`]; command methods have default implementations that
//! report [`CommandStatus::Unsupported`] so older editors can leave them out.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;

use crate::error::{Result, StencilError};
use crate::field::{FieldMode, FieldUpdate};

/// Command names as the editor knows them, used in diagnostics
pub mod capability {
    pub const INSERT_INLINE: &str = "insertStructuredContentInline";
    pub const INSERT_BLOCK: &str = "insertStructuredContentBlock";
    pub const UPDATE_BY_ID: &str = "updateStructuredContentById";
    pub const DELETE_BY_ID: &str = "deleteStructuredContentById";
    pub const SELECT_BY_ID: &str = "selectStructuredContentById";
    pub const EXPORT: &str = "exportDocx";
}

/// Outcome of an editor command that did not raise
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    /// The editor applied the command
    Applied,
    /// The editor ran the command and reported failure
    Rejected,
    /// The editor has no such command
    Unsupported,
}

impl CommandStatus {
    pub fn succeeded(self) -> bool {
        matches!(self, CommandStatus::Applied)
    }
}

impl From<bool> for CommandStatus {
    fn from(applied: bool) -> Self {
        if applied {
            CommandStatus::Applied
        } else {
            CommandStatus::Rejected
        }
    }
}

/// Screen-space rectangle, used to anchor the field menu at the caret
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScreenRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl ScreenRect {
    /// Zero-sized rectangle at a point
    pub fn at(left: f64, top: f64) -> Self {
        Self {
            left,
            top,
            width: 0.0,
            height: 0.0,
        }
    }
}

/// Where the initial document comes from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum DocumentSource {
    Url(String),
    File(PathBuf),
    Bytes(Vec<u8>),
}

/// Edit or view-only mode for the editor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentMode {
    #[default]
    Editing,
    Viewing,
}

/// Construction parameters handed to an [`EditorFactory`]
#[derive(Debug, Clone, PartialEq)]
pub struct EditorOptions {
    /// Mount point selector for the document surface
    pub mount: String,
    pub source: Option<DocumentSource>,
    pub mode: DocumentMode,
    /// Toolbar mount selector; `None` hides the toolbar
    pub toolbar: Option<String>,
}

/// Attributes stored on a structured-content marker
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerAttrs {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
}

/// One entry of the editor's structured-content registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredContentMarker {
    pub attrs: MarkerAttrs,
    /// Node kind, when the editor reports it
    #[serde(default)]
    pub kind: Option<FieldMode>,
    /// Document offset of the node
    #[serde(default)]
    pub pos: Option<usize>,
}

/// Insert command payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertRequest {
    pub mode: FieldMode,
    pub attrs: MarkerAttrs,
    pub text: String,
}

impl InsertRequest {
    pub fn capability(&self) -> &'static str {
        match self.mode {
            FieldMode::Inline => capability::INSERT_INLINE,
            FieldMode::Block => capability::INSERT_BLOCK,
        }
    }
}

/// Export command parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportOptions {
    pub file_name: String,
    #[serde(default)]
    pub trigger_download: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            file_name: "document".to_string(),
            trigger_download: false,
        }
    }
}

/// Handle to a ready editor instance.
///
/// Methods take `&self`: the editor is an externally owned object that
/// serializes its own mutations.
#[async_trait]
pub trait DocumentEditor: Send + Sync {
    /// Current caret offset (selection head)
    fn selection_from(&self) -> usize;

    /// Plain text between two document offsets
    fn text_between(&self, from: usize, to: usize) -> String;

    /// Screen coordinates of a document offset
    fn coords_at_pos(&self, _pos: usize) -> Option<ScreenRect> {
        None
    }

    /// Delete a text range and dispatch the transaction
    fn delete_range(&self, from: usize, to: usize) -> Result<()>;

    /// All structured-content markers currently in the document
    fn structured_content(&self) -> Result<Vec<StructuredContentMarker>>;

    /// Document-change notifications. The value is a revision counter that
    /// the editor bumps after every transaction; dropping the receiver
    /// unsubscribes. Editors without an update stream return `None`.
    fn subscribe_updates(&self) -> Option<watch::Receiver<u64>> {
        None
    }

    fn insert_structured_content(&self, _request: &InsertRequest) -> Result<CommandStatus> {
        Ok(CommandStatus::Unsupported)
    }

    fn update_structured_content(&self, _id: &str, _update: &FieldUpdate) -> Result<CommandStatus> {
        Ok(CommandStatus::Unsupported)
    }

    fn delete_structured_content(&self, _id: &str) -> Result<CommandStatus> {
        Ok(CommandStatus::Unsupported)
    }

    fn select_structured_content(&self, _id: &str) -> Result<CommandStatus> {
        Ok(CommandStatus::Unsupported)
    }

    /// Serialize the document to its native container format
    async fn export_document(&self, _options: &ExportOptions) -> Result<Vec<u8>> {
        Err(StencilError::unsupported(capability::EXPORT))
    }

    /// Release every resource held by the editor
    fn destroy(&self) {}
}

/// Creates editor instances; resolves once the editor reports readiness.
#[async_trait]
pub trait EditorFactory: Send + Sync {
    async fn create(&self, options: &EditorOptions) -> Result<Arc<dyn DocumentEditor>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BareEditor;

    impl DocumentEditor for BareEditor {
        fn selection_from(&self) -> usize {
            0
        }

        fn text_between(&self, _from: usize, _to: usize) -> String {
            String::new()
        }

        fn delete_range(&self, _from: usize, _to: usize) -> Result<()> {
            Ok(())
        }

        fn structured_content(&self) -> Result<Vec<StructuredContentMarker>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_missing_commands_report_unsupported() {
        let editor = BareEditor;
        let request = InsertRequest {
            mode: FieldMode::Block,
            attrs: MarkerAttrs::default(),
            text: "x".to_string(),
        };

        assert_eq!(
            editor.insert_structured_content(&request).unwrap(),
            CommandStatus::Unsupported
        );
        assert_eq!(
            editor.select_structured_content("a").unwrap(),
            CommandStatus::Unsupported
        );
        assert_eq!(request.capability(), capability::INSERT_BLOCK);
        assert!(editor.coords_at_pos(3).is_none());
        assert!(editor.subscribe_updates().is_none());
    }

    #[test]
    fn test_command_status_from_bool() {
        assert!(CommandStatus::from(true).succeeded());
        assert!(!CommandStatus::from(false).succeeded());
        assert!(!CommandStatus::Unsupported.succeeded());
    }

    #[test]
    fn test_marker_deserializes_with_missing_attrs() {
        let marker: StructuredContentMarker =
            serde_json::from_str(r#"{"attrs":{"id":"f1","label":"Legacy"}}"#).unwrap();
        assert_eq!(marker.attrs.id.as_deref(), Some("f1"));
        assert_eq!(marker.attrs.alias, None);
        assert_eq!(marker.kind, None);
    }
}
