//! View model for the side panel listing inserted fields

use serde::Serialize;
use stencil_core::{ListPosition, TemplateField};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldRow {
    pub field: TemplateField,
    pub selected: bool,
}

/// Field list panel state; hidden when no position is configured
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldListView {
    pub position: Option<ListPosition>,
    pub title: String,
    pub rows: Vec<FieldRow>,
    /// Shown instead of rows when the document has no fields
    pub empty_hint: String,
}

impl FieldListView {
    pub fn build(
        fields: &[TemplateField],
        selected: Option<&str>,
        position: Option<ListPosition>,
        trigger: &str,
    ) -> Self {
        let rows = fields
            .iter()
            .map(|field| FieldRow {
                selected: selected == Some(field.id.as_str()),
                field: field.clone(),
            })
            .collect();

        Self {
            position,
            title: format!("Template Fields ({})", fields.len()),
            rows,
            empty_hint: format!("No fields yet. Type {} to add a field.", trigger),
        }
    }

    pub fn is_visible(&self) -> bool {
        self.position.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_mark_selection() {
        let fields = vec![
            TemplateField::new("f1", "Name"),
            TemplateField::new("f2", "Date"),
        ];
        let view = FieldListView::build(&fields, Some("f2"), Some(ListPosition::Right), "{{");

        assert!(view.is_visible());
        assert_eq!(view.title, "Template Fields (2)");
        assert!(!view.rows[0].selected);
        assert!(view.rows[1].selected);
    }

    #[test]
    fn test_empty_hint_names_trigger() {
        let view = FieldListView::build(&[], None, None, "@@");

        assert!(!view.is_visible());
        assert!(view.is_empty());
        assert_eq!(view.empty_hint, "No fields yet. Type @@ to add a field.");
    }
}
