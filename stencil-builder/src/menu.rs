//! View model for the field insertion menu

use serde::Serialize;
use stencil_core::{FieldDefinition, ScreenRect};

use crate::catalog::group_by_category;
use crate::filter::FilterEngine;

/// Label of the entry that creates an ad-hoc field
pub const CREATE_ENTRY_LABEL: &str = "+ Create New Field";

/// One category section of the menu
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MenuGroup {
    pub category: String,
    pub fields: Vec<FieldDefinition>,
    /// Only the first section starts expanded
    pub expanded: bool,
}

impl MenuGroup {
    /// Section heading, e.g. `Invoice (2)`
    pub fn header(&self) -> String {
        format!("{} ({})", self.category, self.fields.len())
    }
}

/// Everything a host needs to draw the menu
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MenuView {
    pub visible: bool,
    pub anchor: Option<ScreenRect>,
    pub query: String,
    pub groups: Vec<MenuGroup>,
    pub allow_create: bool,
}

impl MenuView {
    pub fn build(filter: &FilterEngine, allow_create: bool) -> Self {
        let groups = group_by_category(filter.filtered())
            .into_iter()
            .enumerate()
            .map(|(index, (category, fields))| MenuGroup {
                category,
                fields,
                expanded: index == 0,
            })
            .collect();

        Self {
            visible: filter.is_open(),
            anchor: filter.anchor(),
            query: filter.query().to_string(),
            groups,
            allow_create,
        }
    }

    /// Number of selectable catalog entries
    pub fn entry_count(&self) -> usize {
        self.groups.iter().map(|group| group.fields.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Label for the create entry, when creation is allowed
    pub fn create_entry(&self) -> Option<&'static str> {
        self.allow_create.then_some(CREATE_ENTRY_LABEL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{FieldCatalog, UNCATEGORIZED};
    use crate::memory_editor::MemoryEditor;
    use crate::trigger::{TriggerDetector, TriggerSession};
    use std::sync::Arc;

    fn open_engine(text: &str) -> (FilterEngine, Arc<MemoryEditor>) {
        let mut engine = FilterEngine::new(FieldCatalog::new(vec![
            FieldDefinition::new("a", "Name").with_category("Contact"),
            FieldDefinition::new("b", "Invoice Date").with_category("Invoice"),
            FieldDefinition::new("c", "Total").with_category("Invoice"),
            FieldDefinition::new("d", "Notes"),
        ]));
        let editor = Arc::new(MemoryEditor::with_text(text));
        let found = TriggerDetector::with_defaults()
            .detect(editor.as_ref())
            .unwrap();
        engine.open(TriggerSession::open(editor.clone(), found));
        (engine, editor)
    }

    #[test]
    fn test_closed_menu_is_hidden_and_empty() {
        let engine = FilterEngine::default();
        let view = MenuView::build(&engine, false);

        assert!(!view.visible);
        assert!(view.is_empty());
        assert_eq!(view.create_entry(), None);
    }

    #[test]
    fn test_groups_and_headers() {
        let (engine, _) = open_engine("{{");
        let view = MenuView::build(&engine, true);

        let headers: Vec<String> = view.groups.iter().map(MenuGroup::header).collect();
        assert_eq!(
            headers,
            vec![
                "Contact (1)".to_string(),
                "Invoice (2)".to_string(),
                format!("{} (1)", UNCATEGORIZED)
            ]
        );
        assert!(view.groups[0].expanded);
        assert!(!view.groups[1].expanded);
        assert_eq!(view.entry_count(), 4);
        assert_eq!(view.create_entry(), Some(CREATE_ENTRY_LABEL));
    }

    #[test]
    fn test_view_follows_query() {
        let (mut engine, editor) = open_engine("{{");
        editor.type_text("tot");
        engine.update(editor.as_ref());

        let view = MenuView::build(&engine, false);
        assert!(view.visible);
        assert_eq!(view.query, "tot");
        assert_eq!(view.groups.len(), 1);
        assert_eq!(view.groups[0].header(), "Invoice (1)");
        assert!(view.groups[0].expanded);
    }
}
