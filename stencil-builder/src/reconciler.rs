//! Field reconciliation against the editor's structured-content registry
//!
//! The editor is the source of truth. Every pass re-derives the whole field
//! list from its registry and swaps the cache only when the derived list
//! differs by value, so listeners hear about real changes only.

use std::sync::Arc;
use stencil_core::{
    BuilderEvent, DocumentEditor, ListenerRegistry, Result, StructuredContentMarker, TemplateField,
};

/// Cached field list plus the equality gate in front of it
#[derive(Debug, Default)]
pub struct FieldReconciler {
    cache: Arc<Vec<TemplateField>>,
}

impl FieldReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the cache with fields known before the editor is ready
    pub fn with_initial(fields: Vec<TemplateField>) -> Self {
        Self {
            cache: Arc::new(fields),
        }
    }

    /// Current cache; cheap to clone
    pub fn fields(&self) -> Arc<Vec<TemplateField>> {
        self.cache.clone()
    }

    /// Map registry entries to fields, in document order. Markers without
    /// an id are not template fields and are skipped.
    ///
    /// `position` is the field's index among the derived fields. The raw
    /// document offset moves with every edit before a marker and must not
    /// reach the compared value.
    pub fn derive(markers: Vec<StructuredContentMarker>) -> Vec<TemplateField> {
        markers
            .into_iter()
            .filter_map(|marker| {
                let attrs = marker.attrs;
                let id = attrs.id.clone().filter(|id| !id.is_empty())?;
                Some((id, attrs, marker.kind))
            })
            .enumerate()
            .map(|(index, (id, attrs, kind))| TemplateField {
                id,
                alias: attrs.alias.or(attrs.label).unwrap_or_default(),
                tag: attrs.tag,
                position: Some(index),
                mode: kind,
                group: attrs.group,
            })
            .collect()
    }

    /// Re-derive from the editor and swap the cache if it changed.
    ///
    /// Returns the previous `Arc` untouched when nothing changed.
    pub fn reconcile(
        &mut self,
        editor: &dyn DocumentEditor,
        listeners: &ListenerRegistry,
    ) -> Result<Arc<Vec<TemplateField>>> {
        let derived = Self::derive(editor.structured_content()?);
        Ok(self.replace(derived, listeners))
    }

    /// Install a new list if it differs from the cache, notifying listeners
    pub fn replace(
        &mut self,
        fields: Vec<TemplateField>,
        listeners: &ListenerRegistry,
    ) -> Arc<Vec<TemplateField>> {
        if *self.cache == fields {
            tracing::trace!("Field list unchanged ({} fields)", fields.len());
            return self.cache.clone();
        }

        tracing::debug!(
            "Field list changed: {} -> {} fields",
            self.cache.len(),
            fields.len()
        );
        self.cache = Arc::new(fields);
        listeners.emit(BuilderEvent::fields_changed(self.cache.as_ref().clone()));
        self.cache.clone()
    }
}
