//! Field catalog supplied by the host

use stencil_core::FieldDefinition;
use std::sync::Arc;

/// Heading used for entries without a category
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Immutable list of insertable fields
#[derive(Debug, Clone, Default)]
pub struct FieldCatalog {
    fields: Arc<[FieldDefinition]>,
}

impl FieldCatalog {
    pub fn new(fields: Vec<FieldDefinition>) -> Self {
        Self {
            fields: fields.into(),
        }
    }

    pub fn fields(&self) -> &[FieldDefinition] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Entries whose label or category contains the query, ignoring case.
    /// A blank query returns the whole catalog.
    pub fn filter(&self, query: &str) -> Vec<FieldDefinition> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return self.fields.to_vec();
        }

        self.fields
            .iter()
            .filter(|field| {
                field.label.to_lowercase().contains(&needle)
                    || field
                        .category
                        .as_ref()
                        .is_some_and(|category| category.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect()
    }
}

/// Group fields by category, keeping first-seen category order
pub fn group_by_category(fields: &[FieldDefinition]) -> Vec<(String, Vec<FieldDefinition>)> {
    let mut groups: Vec<(String, Vec<FieldDefinition>)> = Vec::new();

    for field in fields {
        let category = field.category.as_deref().unwrap_or(UNCATEGORIZED);
        match groups.iter_mut().find(|(name, _)| name == category) {
            Some((_, members)) => members.push(field.clone()),
            None => groups.push((category.to_string(), vec![field.clone()])),
        }
    }

    groups
}
