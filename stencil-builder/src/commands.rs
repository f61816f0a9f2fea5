//! Imperative commands against the attached editor
//!
//! Synchronous commands report expected failures (no editor, rejected or
//! missing command) as `false`. Editor errors go through the error channel
//! and also yield `false`. Export is the one command that fails loudly.

use std::collections::HashSet;
use std::sync::Arc;
use stencil_core::editor::capability;
use stencil_core::{
    BuilderEvent, CommandStatus, ExportOptions, FieldMode, FieldSpec, FieldUpdate, InsertRequest,
    MarkerAttrs, Result, TemplateField,
};

use crate::builder::TemplateBuilder;

/// Serialized document plus the fields it contains
#[derive(Debug, Clone)]
pub struct ExportResult {
    pub fields: Vec<TemplateField>,
    pub document: Vec<u8>,
    pub file_name: String,
}

impl TemplateBuilder {
    /// Insert a marker for `spec` at the caret.
    ///
    /// The editor assigns the id, so the new field is found by diffing the
    /// reconciled list against the one from before the insert.
    pub fn insert_field(&mut self, mode: FieldMode, spec: FieldSpec) -> bool {
        let Some(editor) = self.state.editor() else {
            tracing::debug!("insertField ignored: no editor attached");
            return false;
        };

        if spec.alias.trim().is_empty() {
            tracing::warn!("insertField rejected: alias is required");
            return false;
        }

        let request = InsertRequest {
            mode,
            attrs: MarkerAttrs {
                alias: Some(spec.alias.clone()),
                tag: spec.tag(),
                group: spec.group(),
                ..Default::default()
            },
            text: spec.display_text().to_string(),
        };

        let before = self.reconciler.fields();
        match editor.insert_structured_content(&request) {
            Ok(CommandStatus::Applied) => {}
            Ok(status) => {
                tracing::warn!("{} did not apply: {:?}", request.capability(), status);
                // The editor may have applied it anyway
                self.reconcile();
                return false;
            }
            Err(error) => {
                self.report(&error, "insertField");
                return false;
            }
        }

        let after = self.reconcile();
        let known: HashSet<&str> = before.iter().map(|field| field.id.as_str()).collect();
        let inserted: Vec<TemplateField> = after
            .iter()
            .filter(|field| !known.contains(field.id.as_str()))
            .cloned()
            .collect();

        if inserted.is_empty() {
            tracing::warn!(
                "Inserted '{}' but no new field appeared in the registry",
                spec.alias
            );
        }
        for field in inserted {
            tracing::debug!("Inserted {} field {} ({})", mode, field.id, field.alias);
            self.listeners.emit(BuilderEvent::field_inserted(field));
        }
        true
    }

    /// Insert a block-level marker
    pub fn insert_block_field(&mut self, spec: FieldSpec) -> bool {
        self.insert_field(FieldMode::Block, spec)
    }

    /// Change attributes of an existing field
    pub fn update_field(&mut self, id: &str, update: FieldUpdate) -> bool {
        let Some(editor) = self.state.editor() else {
            tracing::debug!("updateField ignored: no editor attached");
            return false;
        };

        match editor.update_structured_content(id, &update) {
            Ok(CommandStatus::Applied) => {}
            Ok(status) => {
                tracing::warn!("{} for {} did not apply: {:?}", capability::UPDATE_BY_ID, id, status);
                return false;
            }
            Err(error) => {
                self.report(&error, "updateField");
                return false;
            }
        }

        let cached = self.reconciler.fields();
        let updated = match cached.iter().position(|field| field.id == id) {
            Some(index) => {
                let merged = update.apply_to(&cached[index]);
                let mut fields = cached.as_ref().clone();
                fields[index] = merged.clone();
                self.reconciler.replace(fields, &self.listeners);
                Some(merged)
            }
            None => self.reconcile().iter().find(|field| field.id == id).cloned(),
        };

        match updated {
            Some(field) => {
                self.listeners.emit(BuilderEvent::field_updated(field));
                true
            }
            None => {
                tracing::warn!("updateField applied but {} is not in the registry", id);
                false
            }
        }
    }

    /// Remove a field.
    ///
    /// Success is judged by re-reading the registry, not by the command's own
    /// status. Without an editor the field is dropped from the cache only.
    pub fn delete_field(&mut self, id: &str) -> bool {
        // Outer `None` means the id is not cached
        let known_group = self
            .reconciler
            .fields()
            .iter()
            .find(|field| field.id == id)
            .map(|field| field.group.clone());

        let Some(editor) = self.state.editor() else {
            return self.delete_offline(id, known_group);
        };

        let status = match editor.delete_structured_content(id) {
            Ok(status) => status,
            Err(error) => {
                self.report(&error, "deleteField");
                return false;
            }
        };

        let after = self.reconcile();
        if after.iter().any(|field| field.id == id) {
            tracing::warn!("deleteField: {} still present after {:?}", id, status);
            return false;
        }

        if known_group.is_none() && !status.succeeded() {
            tracing::debug!("deleteField: unknown id {} ({:?})", id, status);
            return false;
        }

        if !status.succeeded() {
            tracing::debug!("deleteField: {} reported {:?} but the field is gone", id, status);
        }

        self.finish_delete(id, known_group.flatten());
        true
    }

    /// Drop `id` from the cache while no editor is attached
    fn delete_offline(&mut self, id: &str, known_group: Option<Option<String>>) -> bool {
        let Some(group) = known_group else {
            tracing::debug!("deleteField ignored: no editor attached and {} unknown", id);
            return false;
        };

        tracing::warn!(
            "No editor attached; removing {} from the local field list only",
            id
        );

        let mut fields: Vec<TemplateField> = self
            .reconciler
            .fields()
            .iter()
            .filter(|field| field.id != id)
            .cloned()
            .collect();

        if let Some(group) = &group {
            let members: Vec<usize> = fields
                .iter()
                .enumerate()
                .filter(|(_, field)| field.group.as_ref() == Some(group))
                .map(|(index, _)| index)
                .collect();
            if let [last] = members[..] {
                fields[last].group = None;
            }
        }

        self.reconciler.replace(fields, &self.listeners);
        self.clear_selection_of(id);
        self.listeners.emit(BuilderEvent::field_deleted(id.to_string()));
        true
    }

    fn finish_delete(&mut self, id: &str, group: Option<String>) {
        self.clear_selection_of(id);
        self.listeners.emit(BuilderEvent::field_deleted(id.to_string()));

        let Some(group) = group else {
            return;
        };

        let remaining: Vec<String> = self
            .reconciler
            .fields()
            .iter()
            .filter(|field| field.group.as_deref() == Some(group.as_str()))
            .map(|field| field.id.clone())
            .collect();

        if let [last] = remaining.as_slice() {
            tracing::debug!("Group {} has one member left; ungrouping {}", group, last);
            self.update_field(last, FieldUpdate::clear_group());
        }
    }

    fn clear_selection_of(&mut self, id: &str) {
        if self.selected_field_id.as_deref() == Some(id) {
            self.selected_field_id = None;
        }
    }

    /// Select a field in the editor
    pub fn select_field(&mut self, id: &str) {
        let Some(editor) = self.state.editor() else {
            return;
        };

        match editor.select_structured_content(id) {
            Ok(CommandStatus::Applied) => {}
            Ok(status) => {
                tracing::warn!("{} for {} did not apply: {:?}", capability::SELECT_BY_ID, id, status);
            }
            Err(error) => {
                self.report(&error, "selectField");
                return;
            }
        }

        let field = self
            .reconciler
            .fields()
            .iter()
            .find(|field| field.id == id)
            .cloned();

        self.selected_field_id = Some(id.to_string());
        self.listeners.emit(BuilderEvent::field_selected(field));
    }

    /// Select the field after the current one, wrapping to the first
    pub fn next_field(&mut self) {
        if let Some(id) = self.neighbour(1) {
            self.select_field(&id);
        }
    }

    /// Select the field before the current one, wrapping to the last
    pub fn previous_field(&mut self) {
        if let Some(id) = self.neighbour(-1) {
            self.select_field(&id);
        }
    }

    fn neighbour(&self, step: isize) -> Option<String> {
        if !self.is_ready() {
            return None;
        }

        let fields = self.reconciler.fields();
        let count = fields.len();
        if count == 0 {
            return None;
        }

        let current = self
            .selected_field_id
            .as_deref()
            .and_then(|selected| fields.iter().position(|field| field.id == selected));

        let index = match (current, step >= 0) {
            (None, true) => 0,
            (None, false) => count - 1,
            (Some(index), true) => (index + 1) % count,
            (Some(index), false) => (index + count - 1) % count,
        };
        Some(fields[index].id.clone())
    }

    /// Serialize the document together with the current field list
    pub async fn export_template(&self, options: ExportOptions) -> Result<ExportResult> {
        let editor = self.require_editor()?;

        let document = match editor.export_document(&options).await {
            Ok(document) => document,
            Err(error) => {
                if !error.is_expected() {
                    self.report(&error, "exportTemplate");
                }
                return Err(error);
            }
        };

        let fields: Arc<Vec<TemplateField>> = self.reconciler.fields();
        tracing::info!(
            "Exported '{}' ({} bytes, {} fields)",
            options.file_name,
            document.len(),
            fields.len()
        );

        Ok(ExportResult {
            fields: fields.as_ref().clone(),
            document,
            file_name: options.file_name,
        })
    }
}
