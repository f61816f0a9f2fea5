//! The template builder: ties the detector, filter and reconciler to an
//! attached editor and exposes the handle the host drives.

use async_trait::async_trait;
use std::sync::Arc;
use stencil_core::{
    report_error, BuilderConfig, BuilderEvent, BuilderListener, DocumentEditor, ErrorHandler,
    FieldDefinition, FieldMode, FieldSpec, ListenerRegistry, Result, StencilError, SubscriptionId,
    TemplateField,
};
use tokio::sync::watch;
use uuid::Uuid;

use crate::catalog::FieldCatalog;
use crate::filter::{FilterEngine, FilterOutcome};
use crate::lifecycle::LifecycleState;
use crate::list::FieldListView;
use crate::menu::MenuView;
use crate::reconciler::FieldReconciler;
use crate::trigger::{TriggerDetector, TriggerSession};
use crate::BuilderError;

/// Host hook for catalog entries that must be created before insertion.
///
/// Returning `Ok(None)` keeps the draft as-is.
#[async_trait]
pub trait FieldCreator: Send + Sync {
    async fn create_field(&self, draft: FieldDefinition) -> Result<Option<FieldDefinition>>;
}

/// Template field authoring on top of an external editor
pub struct TemplateBuilder {
    pub(crate) config: BuilderConfig,
    pub(crate) detector: TriggerDetector,
    pub(crate) filter: FilterEngine,
    pub(crate) reconciler: FieldReconciler,
    pub(crate) state: LifecycleState,
    pub(crate) pending: Option<watch::Sender<bool>>,
    /// Document-change stream of the attached editor
    pub(crate) updates: Option<watch::Receiver<u64>>,
    pub(crate) listeners: ListenerRegistry,
    pub(crate) error_handler: Option<Arc<dyn ErrorHandler>>,
    pub(crate) field_creator: Option<Arc<dyn FieldCreator>>,
    pub(crate) selected_field_id: Option<String>,
}

impl TemplateBuilder {
    /// Create a builder; the cache starts from `fields.initial`
    pub fn new(config: BuilderConfig) -> Self {
        let catalog = FieldCatalog::new(config.fields.available.clone());
        let detector = TriggerDetector::new(config.menu.trigger.clone());
        let reconciler = FieldReconciler::with_initial(config.fields.initial.clone());

        Self {
            config,
            detector,
            filter: FilterEngine::new(catalog),
            reconciler,
            state: LifecycleState::Uninitialized,
            pending: None,
            updates: None,
            listeners: ListenerRegistry::new(),
            error_handler: None,
            field_creator: None,
            selected_field_id: None,
        }
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    pub fn subscribe(&mut self, listener: Arc<dyn BuilderListener>) -> SubscriptionId {
        self.listeners.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.listeners.unsubscribe(id)
    }

    pub fn set_error_handler(&mut self, handler: Arc<dyn ErrorHandler>) {
        self.error_handler = Some(handler);
    }

    pub fn set_field_creator(&mut self, creator: Arc<dyn FieldCreator>) {
        self.field_creator = Some(creator);
    }

    pub fn is_ready(&self) -> bool {
        self.state.is_ready()
    }

    /// The attached editor, if any
    pub fn editor(&self) -> Option<Arc<dyn DocumentEditor>> {
        self.state.editor()
    }

    /// Snapshot of the cached field list
    pub fn get_fields(&self) -> Arc<Vec<TemplateField>> {
        self.reconciler.fields()
    }

    pub fn selected_field_id(&self) -> Option<&str> {
        self.selected_field_id.as_deref()
    }

    pub fn is_menu_open(&self) -> bool {
        self.filter.is_open()
    }

    /// Candidates for the open menu
    pub fn filtered_fields(&self) -> &[FieldDefinition] {
        self.filter.filtered()
    }

    pub(crate) fn report(&self, error: &StencilError, operation: &str) {
        report_error(self.error_handler.as_deref(), error, operation);
    }

    /// Re-derive the cache from the editor. Registry failures are reported
    /// and leave the cache as it was.
    pub fn reconcile(&mut self) -> Arc<Vec<TemplateField>> {
        let Some(editor) = self.state.editor() else {
            return self.reconciler.fields();
        };

        match self.reconciler.reconcile(editor.as_ref(), &self.listeners) {
            Ok(fields) => fields,
            Err(error) => {
                self.report(&error, "reconcile");
                self.reconciler.fields()
            }
        }
    }

    /// Wait for the editor's next document change and process it.
    ///
    /// Returns `false` once no update stream is attached: before
    /// initialization, after teardown, or when the editor closed it.
    pub async fn next_update(&mut self) -> bool {
        let changed = match self.updates.as_mut() {
            Some(updates) => updates.changed().await,
            None => return false,
        };

        if changed.is_err() {
            tracing::debug!("Editor update stream closed");
            self.updates = None;
            return false;
        }

        self.handle_document_change();
        true
    }

    /// Process a document change the editor has published but the builder
    /// has not seen yet. Returns whether there was one.
    pub fn poll_updates(&mut self) -> bool {
        let pending = self
            .updates
            .as_ref()
            .is_some_and(|updates| updates.has_changed().unwrap_or(false));

        if pending {
            self.handle_document_change();
        }
        pending
    }

    /// Feed one document-change notification through detection, filtering
    /// and reconciliation. Does nothing until an editor is attached.
    pub fn handle_document_change(&mut self) {
        let Some(editor) = self.state.editor() else {
            tracing::trace!("Document change ignored: no editor attached");
            return;
        };

        if let Some(updates) = self.updates.as_mut() {
            updates.borrow_and_update();
        }

        if self.filter.is_open() {
            if self.filter.update(editor.as_ref()) == FilterOutcome::Closed {
                self.listeners.emit(BuilderEvent::menu_closed());
            }
        } else if let Some(found) = self.detector.detect(editor.as_ref()) {
            let session = TriggerSession::open(editor.clone(), found);
            let event = session.to_event();
            self.filter.open(session);
            self.listeners.emit(BuilderEvent::trigger_opened(event));
        }

        self.reconcile();
    }

    /// Close the menu, remove the trigger text and insert the chosen field
    /// inline. Custom entries go through the field creator first.
    pub async fn select_menu_field(&mut self, field: FieldDefinition) -> bool {
        let had_session = self.close_session();

        let definition = if field.id.is_custom() {
            self.create_through_host(field).await
        } else {
            field
        };

        let inserted = self.insert_field(FieldMode::Inline, FieldSpec::from(&definition));
        if had_session {
            self.listeners.emit(BuilderEvent::menu_closed());
        }
        inserted
    }

    /// Dismiss the menu without inserting; the trigger text is removed
    pub fn cancel_menu(&mut self) {
        if self.close_session() {
            self.listeners.emit(BuilderEvent::menu_closed());
        }
    }

    /// Insert an ad-hoc field typed into the menu.
    ///
    /// Fails with [`BuilderError::CreateNotAllowed`] unless the configuration
    /// allows creation.
    pub async fn create_custom_field(
        &mut self,
        label: &str,
        category: Option<&str>,
    ) -> std::result::Result<bool, BuilderError> {
        if !self.config.fields.allow_create {
            return Err(BuilderError::CreateNotAllowed);
        }

        let label = label.trim();
        if label.is_empty() {
            return Err(BuilderError::EmptyLabel);
        }

        let id = format!("{}{}", stencil_core::field::CUSTOM_FIELD_PREFIX, Uuid::new_v4().simple());
        let mut draft = FieldDefinition::new(id, label);
        draft.category = category.map(str::to_string);

        Ok(self.select_menu_field(draft).await)
    }

    /// Menu state for rendering
    pub fn menu_view(&self) -> MenuView {
        MenuView::build(&self.filter, self.config.fields.allow_create)
    }

    /// Field list state for rendering
    pub fn list_view(&self) -> FieldListView {
        FieldListView::build(
            &self.reconciler.fields(),
            self.selected_field_id(),
            self.config.list.position,
            self.detector.trigger(),
        )
    }

    /// Close any open session and run its cleanup. Returns whether one was open.
    fn close_session(&mut self) -> bool {
        let Some(session) = self.filter.close() else {
            return false;
        };

        if let Err(error) = session.cleanup().run() {
            self.report(&error, "triggerCleanup");
        }
        true
    }

    async fn create_through_host(&self, draft: FieldDefinition) -> FieldDefinition {
        let Some(creator) = self.field_creator.clone() else {
            return draft;
        };

        tracing::debug!("Requesting creation of custom field {}", draft.id);
        match creator.create_field(draft.clone()).await {
            Ok(Some(created)) => created,
            Ok(None) => draft,
            Err(error) => {
                let error = match error {
                    StencilError::FieldCreation(_) => error,
                    other => StencilError::field_creation(other.to_string()),
                };
                self.report(&error, "createField");
                draft
            }
        }
    }
}

impl std::fmt::Debug for TemplateBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateBuilder")
            .field("state", &self.state)
            .field("fields", &self.reconciler.fields().len())
            .field("menu_open", &self.filter.is_open())
            .field("selected_field_id", &self.selected_field_id)
            .field("subscribed", &self.updates.is_some())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Drop for TemplateBuilder {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_editor::{MemoryEditor, MemoryEditorFactory};
    use std::sync::Mutex;
    use stencil_core::FieldKey;

    fn config() -> BuilderConfig {
        let mut config = BuilderConfig::default();
        config.fields.available = vec![
            FieldDefinition::new("a", "Name").with_category("Contact"),
            FieldDefinition::new("b", "Invoice Date").with_category("Invoice"),
        ];
        config
    }

    async fn ready_builder(text: &str) -> (TemplateBuilder, Arc<MemoryEditor>, Arc<Mutex<Vec<String>>>) {
        let mut builder = TemplateBuilder::new(config());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        builder.subscribe(Arc::new(move |event: &BuilderEvent| {
            sink.lock().unwrap().push(event.event_type().to_string());
        }));

        let editor = Arc::new(MemoryEditor::with_text(text));
        assert!(
            builder
                .initialize(&MemoryEditorFactory::new(editor.clone()), "#editor")
                .await
        );
        seen.lock().unwrap().clear();
        (builder, editor, seen)
    }

    struct Renamer;

    #[async_trait]
    impl FieldCreator for Renamer {
        async fn create_field(&self, draft: FieldDefinition) -> Result<Option<FieldDefinition>> {
            Ok(Some(FieldDefinition::new(draft.id, format!("{} (custom)", draft.label))))
        }
    }

    struct Broken;

    #[async_trait]
    impl FieldCreator for Broken {
        async fn create_field(&self, _draft: FieldDefinition) -> Result<Option<FieldDefinition>> {
            Err(StencilError::generic("creator offline"))
        }
    }

    #[tokio::test]
    async fn test_changes_ignored_before_ready() {
        let mut builder = TemplateBuilder::new(config());
        builder.handle_document_change();
        assert!(!builder.is_menu_open());
    }

    #[tokio::test]
    async fn test_editor_updates_drive_the_menu() {
        let (mut builder, editor, seen) = ready_builder("Dear ").await;
        assert!(!builder.poll_updates());

        editor.type_text("{{");
        assert!(builder.next_update().await);
        assert!(builder.is_menu_open());

        editor.type_text("inv");
        assert!(builder.poll_updates());
        assert_eq!(builder.filtered_fields().len(), 1);
        assert!(!builder.poll_updates());

        assert_eq!(*seen.lock().unwrap(), vec!["trigger_opened"]);
    }

    #[tokio::test]
    async fn test_manual_change_consumes_pending_update() {
        let (mut builder, editor, _) = ready_builder("").await;

        editor.type_text("{{");
        builder.handle_document_change();
        assert!(builder.is_menu_open());
        assert!(!builder.poll_updates());
    }

        #[tokio::test]
    async fn test_trigger_opens_once_while_typing() {
        let (mut builder, editor, seen) = ready_builder("Dear ").await;

        editor.type_text("{{");
        builder.handle_document_change();
        editor.type_text("{{");
        builder.handle_document_change();

        assert!(builder.is_menu_open());
        assert_eq!(*seen.lock().unwrap(), vec!["trigger_opened"]);
    }

    #[tokio::test]
    async fn test_caret_before_trigger_closes_menu() {
        let (mut builder, editor, seen) = ready_builder("Dear {{").await;
        builder.handle_document_change();

        editor.set_caret(2);
        builder.handle_document_change();

        assert!(!builder.is_menu_open());
        assert_eq!(*seen.lock().unwrap(), vec!["trigger_opened", "menu_closed"]);
        assert_eq!(editor.text(), "Dear {{");
    }

    #[tokio::test]
    async fn test_cancel_removes_trigger_text() {
        let (mut builder, editor, _) = ready_builder("Hi {{").await;
        builder.handle_document_change();
        editor.type_text("na");
        builder.handle_document_change();

        builder.cancel_menu();
        assert!(!builder.is_menu_open());
        assert_eq!(editor.text(), "Hi ");
        assert!(builder.get_fields().is_empty());
    }

    #[tokio::test]
    async fn test_custom_entry_goes_through_creator() {
        let (mut builder, editor, _) = ready_builder("").await;
        builder.set_field_creator(Arc::new(Renamer));

        let draft = FieldDefinition::new(FieldKey::from("custom_1"), "Signer");
        assert!(builder.select_menu_field(draft).await);

        assert_eq!(builder.get_fields()[0].alias, "Signer (custom)");
        assert_eq!(editor.text(), "Signer (custom)");
    }

    #[tokio::test]
    async fn test_creator_failure_falls_back_to_draft() {
        let (mut builder, _, _) = ready_builder("").await;
        builder.set_field_creator(Arc::new(Broken));

        let draft = FieldDefinition::new("custom_2", "Witness");
        assert!(builder.select_menu_field(draft).await);
        assert_eq!(builder.get_fields()[0].alias, "Witness");
    }

    #[tokio::test]
    async fn test_create_custom_field_requires_permission() {
        let (mut builder, _, _) = ready_builder("").await;
        assert!(matches!(
            builder.create_custom_field("Notes", None).await,
            Err(BuilderError::CreateNotAllowed)
        ));

        builder.config.fields.allow_create = true;
        assert!(matches!(
            builder.create_custom_field("  ", None).await,
            Err(BuilderError::EmptyLabel)
        ));
        assert!(builder
            .create_custom_field("Notes", Some("Misc"))
            .await
            .unwrap());

        let fields = builder.get_fields();
        assert_eq!(fields[0].alias, "Notes");
        assert_eq!(fields[0].tag.as_deref(), Some("Misc"));
    }
}
