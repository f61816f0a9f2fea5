//! In-memory reference editor
//!
//! A plain-text document with structured-content markers, used by tests and
//! the walkthrough example. Each marker occupies one object-replacement
//! character in the text so offsets behave like a real editor's: the n-th
//! placeholder in the text is the n-th entry of the registry.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use stencil_core::editor::capability;
use stencil_core::{
    CommandStatus, DocumentEditor, EditorFactory, EditorOptions, ExportOptions, FieldMode,
    FieldUpdate, InsertRequest, MarkerAttrs, Result, ScreenRect, StencilError,
    StructuredContentMarker,
};
use tokio::sync::watch;

/// Character that stands in for a marker inside the text
pub const MARKER_CHAR: char = '\u{FFFC}';

/// Width of one character in the fake screen layout
const CHAR_WIDTH: f64 = 8.0;

/// How a command behaves when invoked, for simulating older or faulty editors
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CommandBehavior {
    #[default]
    Normal,
    /// Report failure without touching the document
    Reject,
    /// Apply the command but report failure anyway
    ApplyButReject,
    /// The command does not exist on this editor
    Missing,
    /// The command raises
    Fail(String),
}

#[derive(Debug, Clone)]
struct StoredMarker {
    attrs: MarkerAttrs,
    mode: FieldMode,
    text: String,
}

#[derive(Debug, Default)]
struct DocumentState {
    text: Vec<char>,
    caret: usize,
    markers: Vec<StoredMarker>,
    next_id: usize,
    behaviors: HashMap<&'static str, CommandBehavior>,
    registry_failure: bool,
    selected: Option<String>,
    destroyed: bool,
}

impl DocumentState {
    fn behavior(&self, capability: &str) -> CommandBehavior {
        self.behaviors.get(capability).cloned().unwrap_or_default()
    }

    /// Number of markers strictly before a text offset
    fn markers_before(&self, offset: usize) -> usize {
        self.text[..offset.min(self.text.len())]
            .iter()
            .filter(|c| **c == MARKER_CHAR)
            .count()
    }

    /// Text offset of the n-th marker
    fn marker_offset(&self, index: usize) -> Option<usize> {
        self.text
            .iter()
            .enumerate()
            .filter(|(_, c)| **c == MARKER_CHAR)
            .nth(index)
            .map(|(offset, _)| offset)
    }

    fn marker_index(&self, id: &str) -> Option<usize> {
        self.markers
            .iter()
            .position(|marker| marker.attrs.id.as_deref() == Some(id))
    }

    fn remove_range(&mut self, from: usize, to: usize) {
        let to = to.min(self.text.len());
        let from = from.min(to);

        let first = self.markers_before(from);
        let covered = self.markers_before(to) - first;
        self.markers.drain(first..first + covered);
        self.text.drain(from..to);

        if self.caret >= to {
            self.caret -= to - from;
        } else if self.caret > from {
            self.caret = from;
        }
    }
}

/// Thread-safe in-memory [`DocumentEditor`].
///
/// Every edit bumps the revision published through
/// [`DocumentEditor::subscribe_updates`].
#[derive(Debug)]
pub struct MemoryEditor {
    state: Mutex<DocumentState>,
    revision: watch::Sender<u64>,
}

impl Default for MemoryEditor {
    fn default() -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            state: Mutex::default(),
            revision,
        }
    }
}

impl MemoryEditor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Document with initial text and the caret at its end
    pub fn with_text(text: &str) -> Self {
        let editor = Self::new();
        editor.type_text(text);
        editor
    }

    fn lock(&self) -> MutexGuard<'_, DocumentState> {
        // Poisoning only follows a panicking test
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn notify(&self) {
        self.revision.send_modify(|revision| *revision += 1);
    }

    /// Insert text at the caret and move the caret past it
    pub fn type_text(&self, text: &str) {
        let mut state = self.lock();
        let caret = state.caret;
        let tail = state.text.split_off(caret);
        state.text.extend(text.chars());
        state.caret = state.text.len();
        state.text.extend(tail);
        drop(state);
        self.notify();
    }

    /// Move the caret, clamped to the document length
    pub fn set_caret(&self, offset: usize) {
        let mut state = self.lock();
        state.caret = offset.min(state.text.len());
        drop(state);
        self.notify();
    }

    /// Full document text, markers rendered as their display text
    pub fn text(&self) -> String {
        let state = self.lock();
        let mut markers = state.markers.iter();
        state
            .text
            .iter()
            .map(|c| match c {
                &MARKER_CHAR => markers
                    .next()
                    .map(|marker| marker.text.clone())
                    .unwrap_or_default(),
                other => other.to_string(),
            })
            .collect()
    }

    pub fn set_behavior(&self, capability: &'static str, behavior: CommandBehavior) {
        self.lock().behaviors.insert(capability, behavior);
    }

    /// Make registry queries fail until switched off again
    pub fn fail_registry(&self, fail: bool) {
        self.lock().registry_failure = fail;
    }

    /// Remove a marker the way a user would, by editing it away
    pub fn remove_marker_silently(&self, id: &str) -> bool {
        let mut state = self.lock();
        let Some(index) = state.marker_index(id) else {
            return false;
        };
        let Some(offset) = state.marker_offset(index) else {
            return false;
        };
        state.remove_range(offset, offset + 1);
        drop(state);
        self.notify();
        true
    }

    /// Id passed to the most recent successful select command
    pub fn selected_id(&self) -> Option<String> {
        self.lock().selected.clone()
    }

    pub fn is_destroyed(&self) -> bool {
        self.lock().destroyed
    }

    pub fn marker_count(&self) -> usize {
        self.lock().markers.len()
    }

    /// Number of live update subscriptions
    pub fn update_subscribers(&self) -> usize {
        self.revision.receiver_count()
    }
}

#[async_trait]
impl DocumentEditor for MemoryEditor {
    fn selection_from(&self) -> usize {
        self.lock().caret
    }

    fn text_between(&self, from: usize, to: usize) -> String {
        let state = self.lock();
        let to = to.min(state.text.len());
        let from = from.min(to);
        state.text[from..to].iter().collect()
    }

    fn coords_at_pos(&self, pos: usize) -> Option<ScreenRect> {
        Some(ScreenRect::at(pos as f64 * CHAR_WIDTH, 0.0))
    }

    fn delete_range(&self, from: usize, to: usize) -> Result<()> {
        let mut state = self.lock();
        if state.destroyed {
            return Err(StencilError::editor("editor destroyed"));
        }
        state.remove_range(from, to);
        drop(state);
        self.notify();
        Ok(())
    }

    fn structured_content(&self) -> Result<Vec<StructuredContentMarker>> {
        let state = self.lock();
        if state.registry_failure {
            return Err(StencilError::editor("structured content registry unavailable"));
        }

        let offsets = state
            .text
            .iter()
            .enumerate()
            .filter(|(_, c)| **c == MARKER_CHAR)
            .map(|(offset, _)| offset);

        Ok(state
            .markers
            .iter()
            .zip(offsets)
            .map(|(marker, offset)| StructuredContentMarker {
                attrs: marker.attrs.clone(),
                kind: Some(marker.mode),
                pos: Some(offset),
            })
            .collect())
    }

    fn subscribe_updates(&self) -> Option<watch::Receiver<u64>> {
        Some(self.revision.subscribe())
    }

    fn insert_structured_content(&self, request: &InsertRequest) -> Result<CommandStatus> {
        let mut state = self.lock();
        let reported = match state.behavior(request.capability()) {
            CommandBehavior::Missing => return Ok(CommandStatus::Unsupported),
            CommandBehavior::Reject => return Ok(CommandStatus::Rejected),
            CommandBehavior::Fail(message) => return Err(StencilError::editor(message)),
            CommandBehavior::ApplyButReject => CommandStatus::Rejected,
            CommandBehavior::Normal => CommandStatus::Applied,
        };

        let mut attrs = request.attrs.clone();
        if attrs.id.is_none() {
            state.next_id += 1;
            attrs.id = Some(format!("field_{}", state.next_id));
        }

        let caret = state.caret;
        let index = state.markers_before(caret);
        state.text.insert(caret, MARKER_CHAR);
        state.markers.insert(
            index,
            StoredMarker {
                attrs,
                mode: request.mode,
                text: request.text.clone(),
            },
        );
        state.caret = caret + 1;
        drop(state);
        self.notify();

        Ok(reported)
    }

    fn update_structured_content(&self, id: &str, update: &FieldUpdate) -> Result<CommandStatus> {
        let mut state = self.lock();
        let reported = match state.behavior(capability::UPDATE_BY_ID) {
            CommandBehavior::Missing => return Ok(CommandStatus::Unsupported),
            CommandBehavior::Reject => return Ok(CommandStatus::Rejected),
            CommandBehavior::Fail(message) => return Err(StencilError::editor(message)),
            CommandBehavior::ApplyButReject => CommandStatus::Rejected,
            CommandBehavior::Normal => CommandStatus::Applied,
        };

        let Some(index) = state.marker_index(id) else {
            return Ok(CommandStatus::Rejected);
        };

        let attrs = &mut state.markers[index].attrs;
        if let Some(alias) = &update.alias {
            attrs.alias = Some(alias.clone());
        }
        if let Some(tag) = &update.tag {
            attrs.tag = Some(tag.clone());
        }
        if let Some(group) = &update.group {
            attrs.group = group.clone();
        }
        drop(state);
        self.notify();

        Ok(reported)
    }

    fn delete_structured_content(&self, id: &str) -> Result<CommandStatus> {
        let mut state = self.lock();
        let reported = match state.behavior(capability::DELETE_BY_ID) {
            CommandBehavior::Missing => return Ok(CommandStatus::Unsupported),
            CommandBehavior::Reject => return Ok(CommandStatus::Rejected),
            CommandBehavior::Fail(message) => return Err(StencilError::editor(message)),
            CommandBehavior::ApplyButReject => CommandStatus::Rejected,
            CommandBehavior::Normal => CommandStatus::Applied,
        };

        let Some(offset) = state
            .marker_index(id)
            .and_then(|index| state.marker_offset(index))
        else {
            return Ok(CommandStatus::Rejected);
        };
        state.remove_range(offset, offset + 1);
        drop(state);
        self.notify();

        Ok(reported)
    }

    fn select_structured_content(&self, id: &str) -> Result<CommandStatus> {
        let mut state = self.lock();
        match state.behavior(capability::SELECT_BY_ID) {
            CommandBehavior::Missing => return Ok(CommandStatus::Unsupported),
            CommandBehavior::Reject => return Ok(CommandStatus::Rejected),
            CommandBehavior::Fail(message) => return Err(StencilError::editor(message)),
            CommandBehavior::ApplyButReject | CommandBehavior::Normal => {}
        }

        if state.marker_index(id).is_none() {
            return Ok(CommandStatus::Rejected);
        }
        state.selected = Some(id.to_string());
        Ok(CommandStatus::Applied)
    }

    async fn export_document(&self, options: &ExportOptions) -> Result<Vec<u8>> {
        let (behavior, text, markers) = {
            let state = self.lock();
            let markers: Vec<MarkerAttrs> = state
                .markers
                .iter()
                .map(|marker| marker.attrs.clone())
                .collect();
            (state.behavior(capability::EXPORT), state.text.len(), markers)
        };

        match behavior {
            CommandBehavior::Missing => Err(StencilError::unsupported(capability::EXPORT)),
            CommandBehavior::Fail(message) => Err(StencilError::editor(message)),
            CommandBehavior::Reject | CommandBehavior::ApplyButReject => {
                Err(StencilError::editor("export rejected"))
            }
            CommandBehavior::Normal => {
                let document = serde_json::json!({
                    "fileName": options.file_name,
                    "length": text,
                    "markers": markers,
                });
                Ok(serde_json::to_vec(&document)?)
            }
        }
    }

    fn destroy(&self) {
        let mut state = self.lock();
        if !state.destroyed {
            tracing::debug!("Destroying in-memory editor");
            state.destroyed = true;
        }
    }
}

/// Factory handing out a prepared editor, or failing on request
#[derive(Debug, Clone)]
pub struct MemoryEditorFactory {
    editor: Arc<MemoryEditor>,
    failure: Option<String>,
}

impl MemoryEditorFactory {
    pub fn new(editor: Arc<MemoryEditor>) -> Self {
        Self {
            editor,
            failure: None,
        }
    }

    /// Factory whose construction always fails
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            editor: Arc::new(MemoryEditor::new()),
            failure: Some(message.into()),
        }
    }

    pub fn editor(&self) -> Arc<MemoryEditor> {
        self.editor.clone()
    }
}

#[async_trait]
impl EditorFactory for MemoryEditorFactory {
    async fn create(&self, options: &EditorOptions) -> Result<Arc<dyn DocumentEditor>> {
        if let Some(message) = &self.failure {
            return Err(StencilError::initialization(message.clone()));
        }

        tracing::debug!("Creating in-memory editor for mount '{}'", options.mount);
        Ok(self.editor.clone())
    }
}
