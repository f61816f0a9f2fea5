//! Field data model: catalog definitions and materialized template fields

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Metadata key that carries a group correlation id.
pub const GROUP_METADATA_KEY: &str = "group";

/// Id prefix marking catalog entries that must go through the host's
/// field-creation hook before insertion.
pub const CUSTOM_FIELD_PREFIX: &str = "custom_";

/// Catalog identifier; hosts may use strings or numbers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldKey {
    Text(String),
    Number(i64),
}

impl FieldKey {
    /// Whether this entry is an ad-hoc field awaiting host creation
    pub fn is_custom(&self) -> bool {
        matches!(self, FieldKey::Text(id) if id.starts_with(CUSTOM_FIELD_PREFIX))
    }
}

impl std::fmt::Display for FieldKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldKey::Text(id) => write!(f, "{}", id),
            FieldKey::Number(id) => write!(f, "{}", id),
        }
    }
}

impl From<&str> for FieldKey {
    fn from(id: &str) -> Self {
        FieldKey::Text(id.to_string())
    }
}

impl From<String> for FieldKey {
    fn from(id: String) -> Self {
        FieldKey::Text(id)
    }
}

impl From<i64> for FieldKey {
    fn from(id: i64) -> Self {
        FieldKey::Number(id)
    }
}

/// An insertable field offered by the host's catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    pub id: FieldKey,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

impl FieldDefinition {
    /// Create a definition with just an id and label
    pub fn new(id: impl Into<FieldKey>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            category: None,
            default_value: None,
            metadata: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_default_value(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// How a marker sits in the document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldMode {
    Inline,
    Block,
}

impl std::fmt::Display for FieldMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldMode::Inline => write!(f, "inline"),
            FieldMode::Block => write!(f, "block"),
        }
    }
}

/// A marker that exists in the live document.
///
/// Equality covers every attribute; the reconciler relies on it to decide
/// whether a change notification is due.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateField {
    pub id: String,
    pub alias: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    /// Order hint: index in the registry, not a document offset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<FieldMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

impl TemplateField {
    pub fn new(id: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            alias: alias.into(),
            tag: None,
            position: None,
            mode: None,
            group: None,
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn with_mode(mut self, mode: FieldMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn with_position(mut self, position: usize) -> Self {
        self.position = Some(position);
        self
    }
}

/// What the command surface needs to insert a marker
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSpec {
    pub alias: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub default_value: Option<String>,
    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
}

impl FieldSpec {
    pub fn new(alias: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            ..Default::default()
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Marker tag: serialized metadata when present, otherwise the category
    pub fn tag(&self) -> Option<String> {
        match &self.metadata {
            Some(metadata) => serde_json::to_string(metadata).ok(),
            None => self.category.clone(),
        }
    }

    /// Text shown inside the marker
    pub fn display_text(&self) -> &str {
        self.default_value.as_deref().unwrap_or(&self.alias)
    }

    /// Group id carried in the metadata bag
    pub fn group(&self) -> Option<String> {
        self.metadata
            .as_ref()
            .and_then(|metadata| metadata.get(GROUP_METADATA_KEY))
            .and_then(Value::as_str)
            .map(str::to_string)
    }
}

impl From<&FieldDefinition> for FieldSpec {
    fn from(definition: &FieldDefinition) -> Self {
        Self {
            alias: definition.label.clone(),
            category: definition.category.clone(),
            default_value: definition.default_value.clone(),
            metadata: definition.metadata.clone(),
        }
    }
}

/// Partial attribute update for an existing field.
///
/// `group: Some(None)` clears the group; `None` leaves it unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldUpdate {
    pub alias: Option<String>,
    pub tag: Option<String>,
    pub group: Option<Option<String>>,
}

impl FieldUpdate {
    pub fn alias(alias: impl Into<String>) -> Self {
        Self {
            alias: Some(alias.into()),
            ..Default::default()
        }
    }

    pub fn tag(tag: impl Into<String>) -> Self {
        Self {
            tag: Some(tag.into()),
            ..Default::default()
        }
    }

    pub fn clear_group() -> Self {
        Self {
            group: Some(None),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.alias.is_none() && self.tag.is_none() && self.group.is_none()
    }

    /// Merge into a cached field, producing the replacement entry
    pub fn apply_to(&self, field: &TemplateField) -> TemplateField {
        let mut merged = field.clone();
        if let Some(alias) = &self.alias {
            merged.alias = alias.clone();
        }
        if let Some(tag) = &self.tag {
            merged.tag = Some(tag.clone());
        }
        if let Some(group) = &self.group {
            merged.group = group.clone();
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_key_accepts_strings_and_numbers() {
        let definitions: Vec<FieldDefinition> = serde_json::from_value(json!([
            { "id": "a", "label": "Name" },
            { "id": 7, "label": "Amount", "category": "Invoice" }
        ]))
        .unwrap();

        assert_eq!(definitions[0].id, FieldKey::Text("a".to_string()));
        assert_eq!(definitions[1].id, FieldKey::Number(7));
        assert_eq!(definitions[1].category.as_deref(), Some("Invoice"));
    }

    #[test]
    fn test_custom_prefix_detection() {
        assert!(FieldKey::from("custom_1700000000").is_custom());
        assert!(!FieldKey::from("field1").is_custom());
        assert!(!FieldKey::from(42).is_custom());
    }

    #[test]
    fn test_spec_tag_prefers_metadata() {
        let spec = FieldSpec::new("Signer").with_category("Signature");
        assert_eq!(spec.tag().as_deref(), Some("Signature"));

        let mut metadata = Map::new();
        metadata.insert("group".to_string(), json!("sig-1"));
        let spec = FieldSpec {
            metadata: Some(metadata),
            ..spec
        };
        assert_eq!(spec.tag().as_deref(), Some(r#"{"group":"sig-1"}"#));
        assert_eq!(spec.group().as_deref(), Some("sig-1"));
    }

    #[test]
    fn test_display_text_falls_back_to_alias() {
        let mut spec = FieldSpec::new("Customer Name");
        assert_eq!(spec.display_text(), "Customer Name");

        spec.default_value = Some("Jane Doe".to_string());
        assert_eq!(spec.display_text(), "Jane Doe");
    }

    #[test]
    fn test_update_merge() {
        let field = TemplateField::new("f1", "Name")
            .with_tag("contact")
            .with_group("g1");

        let merged = FieldUpdate::alias("Full Name").apply_to(&field);
        assert_eq!(merged.alias, "Full Name");
        assert_eq!(merged.tag.as_deref(), Some("contact"));
        assert_eq!(merged.group.as_deref(), Some("g1"));

        let cleared = FieldUpdate::clear_group().apply_to(&field);
        assert_eq!(cleared.group, None);
    }
}
