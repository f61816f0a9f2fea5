//! Builder events and the listener registry that delivers them to the host

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::SystemTime;
use uuid::Uuid;

use crate::editor::{DocumentEditor, ScreenRect};
use crate::error::Result;
use crate::field::TemplateField;

/// Removes the raw trigger text (plus any query typed after it) from the
/// document. The range end is the caret at call time, not at detection time.
#[derive(Clone)]
pub struct TriggerCleanup {
    editor: Arc<dyn DocumentEditor>,
    trigger_start: usize,
    used: Arc<AtomicBool>,
}

impl TriggerCleanup {
    pub fn new(editor: Arc<dyn DocumentEditor>, trigger_start: usize) -> Self {
        Self {
            editor,
            trigger_start,
            used: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn trigger_start(&self) -> usize {
        self.trigger_start
    }

    /// Whether the cleanup already ran (through any clone)
    pub fn is_spent(&self) -> bool {
        self.used.load(Ordering::SeqCst)
    }

    /// Delete `[trigger_start, caret)`. Returns `Ok(false)` when this cleanup
    /// (or a clone of it) already ran, or when the caret sits at or before
    /// the trigger start.
    pub fn run(&self) -> Result<bool> {
        if self.used.swap(true, Ordering::SeqCst) {
            return Ok(false);
        }

        let caret = self.editor.selection_from();
        if caret <= self.trigger_start {
            tracing::debug!(
                "Trigger cleanup skipped: caret {} is not past trigger start {}",
                caret,
                self.trigger_start
            );
            return Ok(false);
        }

        self.editor.delete_range(self.trigger_start, caret)?;
        tracing::debug!("Removed trigger text [{}, {})", self.trigger_start, caret);
        Ok(true)
    }
}

impl std::fmt::Debug for TriggerCleanup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TriggerCleanup")
            .field("trigger_start", &self.trigger_start)
            .field("spent", &self.is_spent())
            .finish()
    }
}

/// Payload of a trigger-opened notification
#[derive(Debug, Clone)]
pub struct TriggerEvent {
    /// Offset where the trigger text starts
    pub from: usize,
    /// Offset where the trigger text ends (the caret at detection time)
    pub to: usize,
    pub bounds: Option<ScreenRect>,
    pub cleanup: TriggerCleanup,
}

/// Notifications the builder emits to the host
#[derive(Debug, Clone)]
pub enum BuilderEvent {
    /// The editor is attached and listeners are live
    Ready { timestamp: SystemTime },
    /// The trigger was typed and the field menu opened
    TriggerOpened {
        trigger: TriggerEvent,
        timestamp: SystemTime,
    },
    /// The field menu closed without an insertion, or after one
    MenuClosed { timestamp: SystemTime },
    FieldInserted {
        field: TemplateField,
        timestamp: SystemTime,
    },
    FieldUpdated {
        field: TemplateField,
        timestamp: SystemTime,
    },
    FieldDeleted {
        field_id: String,
        timestamp: SystemTime,
    },
    FieldSelected {
        field: Option<TemplateField>,
        timestamp: SystemTime,
    },
    /// The reconciled field list differs from the previous one
    FieldsChanged {
        fields: Vec<TemplateField>,
        timestamp: SystemTime,
    },
}

impl BuilderEvent {
    pub fn ready() -> Self {
        Self::Ready {
            timestamp: SystemTime::now(),
        }
    }

    pub fn trigger_opened(trigger: TriggerEvent) -> Self {
        Self::TriggerOpened {
            trigger,
            timestamp: SystemTime::now(),
        }
    }

    pub fn menu_closed() -> Self {
        Self::MenuClosed {
            timestamp: SystemTime::now(),
        }
    }

    pub fn field_inserted(field: TemplateField) -> Self {
        Self::FieldInserted {
            field,
            timestamp: SystemTime::now(),
        }
    }

    pub fn field_updated(field: TemplateField) -> Self {
        Self::FieldUpdated {
            field,
            timestamp: SystemTime::now(),
        }
    }

    pub fn field_deleted(field_id: String) -> Self {
        Self::FieldDeleted {
            field_id,
            timestamp: SystemTime::now(),
        }
    }

    pub fn field_selected(field: Option<TemplateField>) -> Self {
        Self::FieldSelected {
            field,
            timestamp: SystemTime::now(),
        }
    }

    pub fn fields_changed(fields: Vec<TemplateField>) -> Self {
        Self::FieldsChanged {
            fields,
            timestamp: SystemTime::now(),
        }
    }

    /// Get the event type identifier
    pub fn event_type(&self) -> &str {
        match self {
            BuilderEvent::Ready { .. } => "ready",
            BuilderEvent::TriggerOpened { .. } => "trigger_opened",
            BuilderEvent::MenuClosed { .. } => "menu_closed",
            BuilderEvent::FieldInserted { .. } => "field_inserted",
            BuilderEvent::FieldUpdated { .. } => "field_updated",
            BuilderEvent::FieldDeleted { .. } => "field_deleted",
            BuilderEvent::FieldSelected { .. } => "field_selected",
            BuilderEvent::FieldsChanged { .. } => "fields_changed",
        }
    }

    pub fn timestamp(&self) -> SystemTime {
        match self {
            BuilderEvent::Ready { timestamp }
            | BuilderEvent::TriggerOpened { timestamp, .. }
            | BuilderEvent::MenuClosed { timestamp }
            | BuilderEvent::FieldInserted { timestamp, .. }
            | BuilderEvent::FieldUpdated { timestamp, .. }
            | BuilderEvent::FieldDeleted { timestamp, .. }
            | BuilderEvent::FieldSelected { timestamp, .. }
            | BuilderEvent::FieldsChanged { timestamp, .. } => *timestamp,
        }
    }

    /// Key/value details for structured logging
    pub fn metadata(&self) -> HashMap<String, String> {
        let mut metadata = HashMap::new();

        match self {
            BuilderEvent::Ready { .. } | BuilderEvent::MenuClosed { .. } => {}
            BuilderEvent::TriggerOpened { trigger, .. } => {
                metadata.insert("from".to_string(), trigger.from.to_string());
                metadata.insert("to".to_string(), trigger.to.to_string());
            }
            BuilderEvent::FieldInserted { field, .. } | BuilderEvent::FieldUpdated { field, .. } => {
                metadata.insert("field_id".to_string(), field.id.clone());
                metadata.insert("alias".to_string(), field.alias.clone());
            }
            BuilderEvent::FieldDeleted { field_id, .. } => {
                metadata.insert("field_id".to_string(), field_id.clone());
            }
            BuilderEvent::FieldSelected { field, .. } => {
                if let Some(field) = field {
                    metadata.insert("field_id".to_string(), field.id.clone());
                }
            }
            BuilderEvent::FieldsChanged { fields, .. } => {
                metadata.insert("count".to_string(), fields.len().to_string());
            }
        }

        metadata
    }

    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            BuilderEvent::Ready { .. } => "Editor ready".to_string(),
            BuilderEvent::TriggerOpened { trigger, .. } => {
                format!("Trigger opened at [{}, {})", trigger.from, trigger.to)
            }
            BuilderEvent::MenuClosed { .. } => "Field menu closed".to_string(),
            BuilderEvent::FieldInserted { field, .. } => {
                format!("Field {} ({}) inserted", field.id, field.alias)
            }
            BuilderEvent::FieldUpdated { field, .. } => {
                format!("Field {} ({}) updated", field.id, field.alias)
            }
            BuilderEvent::FieldDeleted { field_id, .. } => format!("Field {} deleted", field_id),
            BuilderEvent::FieldSelected { field, .. } => match field {
                Some(field) => format!("Field {} selected", field.id),
                None => "Selection cleared".to_string(),
            },
            BuilderEvent::FieldsChanged { fields, .. } => {
                format!("Field list changed ({} fields)", fields.len())
            }
        }
    }
}

/// Receives builder events. Called synchronously on the thread that drove
/// the command or document change.
pub trait BuilderListener: Send + Sync {
    fn handle_event(&self, event: &BuilderEvent);

    /// Get listener name for debugging
    fn listener_name(&self) -> &str {
        "UnnamedListener"
    }
}

impl<F> BuilderListener for F
where
    F: Fn(&BuilderEvent) + Send + Sync,
{
    fn handle_event(&self, event: &BuilderEvent) {
        self(event)
    }
}

/// Unique identifier for listener subscriptions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub Uuid);

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl SubscriptionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Ordered set of listeners; dispatch follows subscription order
#[derive(Default)]
pub struct ListenerRegistry {
    listeners: Vec<(SubscriptionId, Arc<dyn BuilderListener>)>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: Arc<dyn BuilderListener>) -> SubscriptionId {
        let id = SubscriptionId::new();
        tracing::debug!(
            "Created subscription {:?} for listener {}",
            id,
            listener.listener_name()
        );
        self.listeners.push((id, listener));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sub_id, _)| *sub_id != id);

        let removed = self.listeners.len() != before;
        if !removed {
            tracing::warn!("Attempted to remove non-existent subscription: {:?}", id);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Deliver an event to every listener
    pub fn emit(&self, event: BuilderEvent) {
        tracing::trace!("Dispatching {}", event.description());

        for (_, listener) in &self.listeners {
            listener.handle_event(&event);
        }

        tracing::debug!(
            "Routed event {} {:?} to {} listeners",
            event.event_type(),
            event.metadata(),
            self.listeners.len()
        );
    }
}
