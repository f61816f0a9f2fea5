//! Live filtering of the catalog while a trigger session is open

use stencil_core::{DocumentEditor, FieldDefinition, ScreenRect};

use crate::catalog::FieldCatalog;
use crate::trigger::TriggerSession;

/// Result of feeding a document change to the filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOutcome {
    /// No session is open
    Idle,
    /// Query and candidates were recomputed
    Filtered,
    /// The caret moved before the trigger; the session closed
    Closed,
}

/// Tracks the open session and the candidates matching its query
#[derive(Debug, Default)]
pub struct FilterEngine {
    catalog: FieldCatalog,
    session: Option<TriggerSession>,
    filtered: Vec<FieldDefinition>,
}

impl FilterEngine {
    pub fn new(catalog: FieldCatalog) -> Self {
        Self {
            catalog,
            session: None,
            filtered: Vec::new(),
        }
    }

    pub fn catalog(&self) -> &FieldCatalog {
        &self.catalog
    }

    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<&TriggerSession> {
        self.session.as_ref()
    }

    /// Raw text typed after the trigger (empty when closed)
    pub fn query(&self) -> &str {
        self.session.as_ref().map(|s| s.query.as_str()).unwrap_or("")
    }

    pub fn anchor(&self) -> Option<ScreenRect> {
        self.session.as_ref().and_then(|s| s.anchor)
    }

    /// Candidates for the current query; empty when closed
    pub fn filtered(&self) -> &[FieldDefinition] {
        &self.filtered
    }

    /// Start filtering for a freshly opened session
    pub fn open(&mut self, session: TriggerSession) {
        self.filtered = self.catalog.filter("");
        self.session = Some(session);
    }

    /// Close the session, returning it so the caller can run its cleanup
    pub fn close(&mut self) -> Option<TriggerSession> {
        self.filtered.clear();
        self.session.take()
    }

    /// Recompute the query from the text between the trigger and the caret
    pub fn update(&mut self, editor: &dyn DocumentEditor) -> FilterOutcome {
        let Some(session) = self.session.as_mut() else {
            return FilterOutcome::Idle;
        };

        let from = editor.selection_from();
        if from < session.trigger_start {
            tracing::debug!(
                "Caret {} moved before trigger start {}, closing menu",
                from,
                session.trigger_start
            );
            self.close();
            return FilterOutcome::Closed;
        }

        session.query = if from > session.trigger_end {
            editor.text_between(session.trigger_end, from)
        } else {
            String::new()
        };
        session.anchor = editor.coords_at_pos(from).or(session.anchor);

        self.filtered = self.catalog.filter(&session.query);
        tracing::debug!(
            "Filter query '{}' matched {} of {} fields",
            session.query,
            self.filtered.len(),
            self.catalog.len()
        );

        FilterOutcome::Filtered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_editor::MemoryEditor;
    use crate::trigger::TriggerDetector;
    use std::sync::Arc;

    fn engine() -> FilterEngine {
        FilterEngine::new(FieldCatalog::new(vec![
            FieldDefinition::new("a", "Name").with_category("Contact"),
            FieldDefinition::new("b", "Invoice Date").with_category("Invoice"),
        ]))
    }

    fn open_at_end(engine: &mut FilterEngine, editor: &Arc<MemoryEditor>) {
        let found = TriggerDetector::with_defaults()
            .detect(editor.as_ref())
            .unwrap();
        engine.open(TriggerSession::open(editor.clone(), found));
    }

    #[test]
    fn test_idle_without_session() {
        let editor = MemoryEditor::with_text("abc");
        assert_eq!(engine().update(&editor), FilterOutcome::Idle);
    }

    #[test]
    fn test_query_narrows_candidates() {
        let editor = Arc::new(MemoryEditor::with_text("12345678{{"));
        let mut engine = engine();
        open_at_end(&mut engine, &editor);
        assert_eq!(engine.filtered().len(), 2);

        editor.type_text("inv");
        assert_eq!(engine.update(editor.as_ref()), FilterOutcome::Filtered);
        assert_eq!(engine.query(), "inv");
        assert_eq!(engine.filtered().len(), 1);
        assert_eq!(engine.filtered()[0].label, "Invoice Date");
    }

    #[test]
    fn test_caret_before_trigger_closes() {
        let editor = Arc::new(MemoryEditor::with_text("12345678{{"));
        let mut engine = engine();
        open_at_end(&mut engine, &editor);

        editor.set_caret(7);
        assert_eq!(engine.update(editor.as_ref()), FilterOutcome::Closed);
        assert!(!engine.is_open());
        assert!(engine.filtered().is_empty());
        assert_eq!(engine.query(), "");
        assert_eq!(editor.text(), "12345678{{");
    }

    #[test]
    fn test_caret_inside_trigger_keeps_full_list() {
        let editor = Arc::new(MemoryEditor::with_text("ab{{"));
        let mut engine = engine();
        open_at_end(&mut engine, &editor);

        editor.set_caret(3);
        assert_eq!(engine.update(editor.as_ref()), FilterOutcome::Filtered);
        assert_eq!(engine.query(), "");
        assert_eq!(engine.filtered().len(), 2);
    }

    #[test]
    fn test_anchor_tracks_caret() {
        let editor = Arc::new(MemoryEditor::with_text("{{"));
        let mut engine = engine();
        open_at_end(&mut engine, &editor);
        let initial = engine.anchor();

        editor.type_text("na");
        engine.update(editor.as_ref());
        assert_ne!(engine.anchor(), initial);
        assert_eq!(engine.anchor(), editor.coords_at_pos(4));
    }
}
