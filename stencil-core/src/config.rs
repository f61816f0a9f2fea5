//! Configuration management for the template builder

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::editor::{DocumentMode, DocumentSource, EditorOptions};
use crate::error::{Result, StencilError};
use crate::field::{FieldDefinition, TemplateField};

/// Trigger string used when none is configured
pub const DEFAULT_TRIGGER: &str = "{{";

/// Toolbar mount selector used when the toolbar is shown without one
pub const DEFAULT_TOOLBAR_SELECTOR: &str = "#template-builder-toolbar";

/// Host configuration for a template builder instance
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderConfig {
    pub document: DocumentConfig,
    pub fields: FieldsConfig,
    pub menu: MenuConfig,
    pub list: ListConfig,
    pub toolbar: ToolbarConfig,
}

impl BuilderConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a JSON file
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| StencilError::Config(format!("Failed to read config file: {}", e)))?;

        let config: BuilderConfig = serde_json::from_str(&content)
            .map_err(|e| StencilError::Config(format!("Failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| StencilError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| StencilError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Validate the configuration, failing on the first batch of errors
    pub fn validate(&self) -> Result<ValidationResult> {
        let result = self.validation_report();

        if !result.is_valid {
            return Err(StencilError::Config(format!(
                "Configuration validation failed with {} errors: {}",
                result.errors.len(),
                result
                    .errors
                    .iter()
                    .map(|e| e.message.as_str())
                    .collect::<Vec<_>>()
                    .join("; ")
            )));
        }

        Ok(result)
    }

    /// Collect every validation error and warning without failing
    pub fn validation_report(&self) -> ValidationResult {
        let mut result = ValidationResult {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        };

        self.validate_trigger(&mut result);
        self.validate_catalog(&mut result);

        result.is_valid = result.errors.is_empty();
        result
    }

    fn validate_trigger(&self, result: &mut ValidationResult) {
        let trigger = &self.menu.trigger;

        if trigger.is_empty() {
            result.errors.push(ValidationError {
                field_path: "menu.trigger".to_string(),
                message: "Trigger must not be empty".to_string(),
                suggested_fix: Some(format!("Use the default '{}'", DEFAULT_TRIGGER)),
            });
        } else if trigger.chars().any(char::is_whitespace) {
            result.errors.push(ValidationError {
                field_path: "menu.trigger".to_string(),
                message: format!("Trigger '{}' contains whitespace", trigger),
                suggested_fix: Some("Remove spaces from the trigger".to_string()),
            });
        }
    }

    fn validate_catalog(&self, result: &mut ValidationResult) {
        let mut seen = HashSet::new();

        for (index, field) in self.fields.available.iter().enumerate() {
            let base_path = format!("fields.available[{}]", index);

            if !seen.insert(field.id.clone()) {
                result.errors.push(ValidationError {
                    field_path: format!("{}.id", base_path),
                    message: format!("Duplicate field id '{}'", field.id),
                    suggested_fix: Some("Give every catalog entry a unique id".to_string()),
                });
            }

            if field.label.trim().is_empty() {
                result.errors.push(ValidationError {
                    field_path: format!("{}.label", base_path),
                    message: format!("Field '{}' has an empty label", field.id),
                    suggested_fix: None,
                });
            }

            if field.category.is_none() {
                result.warnings.push(ValidationWarning {
                    field_path: format!("{}.category", base_path),
                    message: format!(
                        "Field '{}' has no category and will be listed as Uncategorized",
                        field.id
                    ),
                });
            }
        }
    }

    /// Construction options for the editor factory
    pub fn editor_options(&self, mount: impl Into<String>) -> EditorOptions {
        let toolbar = if self.toolbar.show {
            Some(
                self.toolbar
                    .selector
                    .clone()
                    .unwrap_or_else(|| DEFAULT_TOOLBAR_SELECTOR.to_string()),
            )
        } else {
            None
        };

        EditorOptions {
            mount: mount.into(),
            source: self.document.source.clone(),
            mode: self.document.mode,
            toolbar,
        }
    }
}

/// Initial document and mode
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentConfig {
    pub source: Option<DocumentSource>,
    pub mode: DocumentMode,
}

/// Field catalog and seed state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FieldsConfig {
    pub available: Vec<FieldDefinition>,
    pub initial: Vec<TemplateField>,
    pub allow_create: bool,
}

/// Field menu settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MenuConfig {
    pub trigger: String,
}

impl Default for MenuConfig {
    fn default() -> Self {
        Self {
            trigger: DEFAULT_TRIGGER.to_string(),
        }
    }
}

/// Which side of the document the field list sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListPosition {
    Left,
    Right,
}

/// Field list settings; no position means the list is not shown
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ListConfig {
    pub position: Option<ListPosition>,
}

/// Toolbar visibility and mount point
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolbarConfig {
    pub show: bool,
    pub selector: Option<String>,
}

impl Default for ToolbarConfig {
    fn default() -> Self {
        Self {
            show: true,
            selector: None,
        }
    }
}

/// Validation result with errors and warnings
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field_path: String,
    pub message: String,
    pub suggested_fix: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field_path: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn catalog() -> Vec<FieldDefinition> {
        vec![
            FieldDefinition::new("field1", "Customer Name").with_category("Contact"),
            FieldDefinition::new("field2", "Invoice Date").with_category("Invoice"),
        ]
    }

    #[test]
    fn test_defaults() {
        let config = BuilderConfig::new();
        assert_eq!(config.menu.trigger, "{{");
        assert!(config.toolbar.show);
        assert_eq!(config.document.mode, DocumentMode::Editing);
        assert!(config.list.position.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: BuilderConfig = serde_json::from_str(
            r#"{
                "fields": { "available": [{ "id": 1, "label": "Amount" }], "allowCreate": true },
                "list": { "position": "left" }
            }"#,
        )
        .unwrap();

        assert_eq!(config.menu.trigger, DEFAULT_TRIGGER);
        assert!(config.fields.allow_create);
        assert_eq!(config.list.position, Some(ListPosition::Left));
        assert_eq!(config.fields.available.len(), 1);
    }

    #[test]
    fn test_validation_errors() {
        let mut config = BuilderConfig::new();
        config.menu.trigger = String::new();
        config.fields.available = catalog();
        config.fields.available.push(FieldDefinition::new("field1", " "));

        let report = config.validation_report();
        assert!(!report.is_valid);
        assert_eq!(report.errors.len(), 3);
        assert_eq!(report.warnings.len(), 1);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_whitespace_trigger_rejected() {
        let mut config = BuilderConfig::new();
        config.menu.trigger = "{ {".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_editor_options_toolbar() {
        let mut config = BuilderConfig::new();
        let options = config.editor_options("#editor");
        assert_eq!(options.mount, "#editor");
        assert_eq!(options.toolbar.as_deref(), Some(DEFAULT_TOOLBAR_SELECTOR));

        config.toolbar.show = false;
        assert_eq!(config.editor_options("#editor").toolbar, None);
    }

    #[test]
    fn test_config_file_operations() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("builder.json");

        let mut config = BuilderConfig::new();
        config.fields.available = catalog();
        config.menu.trigger = "@@".to_string();
        config.save_to_file(&path).unwrap();

        let loaded = BuilderConfig::from_file(&path).unwrap();
        assert_eq!(loaded.menu.trigger, "@@");
        assert_eq!(loaded.fields.available, config.fields.available);

        let missing = BuilderConfig::from_file(&dir.path().join("missing.json"));
        assert!(matches!(missing, Err(StencilError::Config(_))));
    }
}
