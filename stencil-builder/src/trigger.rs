//! Trigger detection for the field insertion menu

use std::sync::Arc;
use stencil_core::{DocumentEditor, ScreenRect, TriggerCleanup, TriggerEvent, DEFAULT_TRIGGER};

/// Location of a trigger match, in document offsets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerMatch {
    pub start: usize,
    pub end: usize,
}

/// Watches the text right before the caret for the trigger string
#[derive(Debug, Clone)]
pub struct TriggerDetector {
    trigger: String,
    trigger_len: usize,
}

impl TriggerDetector {
    pub fn new(trigger: impl Into<String>) -> Self {
        let trigger = trigger.into();
        let trigger_len = trigger.chars().count();
        Self {
            trigger,
            trigger_len,
        }
    }

    /// Create with the default `{{` trigger
    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_TRIGGER)
    }

    pub fn trigger(&self) -> &str {
        &self.trigger
    }

    /// Exact match of the trigger against the text ending at the caret
    pub fn detect(&self, editor: &dyn DocumentEditor) -> Option<TriggerMatch> {
        if self.trigger_len == 0 {
            return None;
        }

        let from = editor.selection_from();
        if from < self.trigger_len {
            return None;
        }

        let start = from - self.trigger_len;
        if editor.text_between(start, from) != self.trigger {
            return None;
        }

        tracing::debug!("Trigger '{}' detected at [{}, {})", self.trigger, start, from);
        Some(TriggerMatch { start, end: from })
    }
}

/// State of an open trigger menu
#[derive(Debug, Clone)]
pub struct TriggerSession {
    pub trigger_start: usize,
    pub trigger_end: usize,
    /// Raw text typed after the trigger
    pub query: String,
    pub anchor: Option<ScreenRect>,
    cleanup: TriggerCleanup,
}

impl TriggerSession {
    /// Open a session for a match, anchoring the menu at the caret
    pub fn open(editor: Arc<dyn DocumentEditor>, found: TriggerMatch) -> Self {
        let anchor = editor.coords_at_pos(found.end);
        Self {
            trigger_start: found.start,
            trigger_end: found.end,
            query: String::new(),
            anchor,
            cleanup: TriggerCleanup::new(editor, found.start),
        }
    }

    pub fn cleanup(&self) -> &TriggerCleanup {
        &self.cleanup
    }

    /// Event handed to the host when the session opens
    pub fn to_event(&self) -> TriggerEvent {
        TriggerEvent {
            from: self.trigger_start,
            to: self.trigger_end,
            bounds: self.anchor,
            cleanup: self.cleanup.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_editor::MemoryEditor;

    #[test]
    fn test_detects_trigger_before_caret() {
        let editor = MemoryEditor::with_text("Dear {{");
        let detector = TriggerDetector::with_defaults();

        assert_eq!(
            detector.detect(&editor),
            Some(TriggerMatch { start: 5, end: 7 })
        );
    }

    #[test]
    fn test_no_match_without_enough_text() {
        let editor = MemoryEditor::with_text("{");
        let detector = TriggerDetector::with_defaults();
        assert_eq!(detector.detect(&editor), None);
    }

    #[test]
    fn test_match_is_exact_and_anchored_at_caret() {
        let detector = TriggerDetector::with_defaults();

        let editor = MemoryEditor::with_text("{{ name");
        assert_eq!(detector.detect(&editor), None);

        editor.set_caret(2);
        assert_eq!(
            detector.detect(&editor),
            Some(TriggerMatch { start: 0, end: 2 })
        );

        let editor = MemoryEditor::with_text("{ {");
        assert_eq!(detector.detect(&editor), None);
    }

    #[test]
    fn test_custom_multibyte_trigger() {
        let detector = TriggerDetector::new("§§");
        let editor = MemoryEditor::with_text("x§§");
        assert_eq!(
            detector.detect(&editor),
            Some(TriggerMatch { start: 1, end: 3 })
        );
    }

    #[test]
    fn test_session_cleanup_uses_current_caret() {
        let editor = Arc::new(MemoryEditor::with_text("Hi {{"));
        let detector = TriggerDetector::with_defaults();
        let found = detector.detect(editor.as_ref()).unwrap();

        let session = TriggerSession::open(editor.clone(), found);
        editor.type_text("inv");

        assert!(session.cleanup().run().unwrap());
        assert_eq!(editor.text(), "Hi ");
        assert!(!session.to_event().cleanup.run().unwrap());
    }
}
