//! Editor lifecycle: asynchronous initialization and cancellation-safe teardown

use std::sync::Arc;
use stencil_core::{
    BuilderEvent, DocumentEditor, EditorFactory, EditorOptions, Result, StencilError,
};
use tokio::sync::watch;

use crate::builder::TemplateBuilder;

/// Whether an editor is attached
#[derive(Clone, Default)]
pub enum LifecycleState {
    #[default]
    Uninitialized,
    Ready(Arc<dyn DocumentEditor>),
}

impl LifecycleState {
    pub fn is_ready(&self) -> bool {
        matches!(self, LifecycleState::Ready(_))
    }

    pub fn editor(&self) -> Option<Arc<dyn DocumentEditor>> {
        match self {
            LifecycleState::Ready(editor) => Some(editor.clone()),
            LifecycleState::Uninitialized => None,
        }
    }
}

impl std::fmt::Debug for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LifecycleState::Uninitialized => write!(f, "Uninitialized"),
            LifecycleState::Ready(_) => write!(f, "Ready"),
        }
    }
}

/// An editor construction in flight.
///
/// Holds the receiving end of the cancellation signal the builder raises on
/// teardown or re-initialization.
#[derive(Debug)]
pub struct PendingInitialization {
    options: EditorOptions,
    cancelled: watch::Receiver<bool>,
}

impl PendingInitialization {
    pub fn options(&self) -> &EditorOptions {
        &self.options
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancelled.borrow()
    }

    /// Wait until the builder cancels this initialization
    pub async fn cancelled(&mut self) {
        // A dropped sender means the builder is gone, which also cancels.
        let _ = self.cancelled.wait_for(|cancelled| *cancelled).await;
    }

    /// Construct the editor. Returns `Ok(None)` when cancelled; an editor
    /// that finished constructing after cancellation is destroyed here.
    pub async fn resolve(
        &self,
        factory: &dyn EditorFactory,
    ) -> Result<Option<Arc<dyn DocumentEditor>>> {
        if self.is_cancelled() {
            tracing::debug!("Initialization cancelled before editor construction");
            return Ok(None);
        }

        let editor = factory.create(&self.options).await?;

        if self.is_cancelled() {
            tracing::info!("Initialization cancelled while pending, destroying new editor");
            editor.destroy();
            return Ok(None);
        }

        Ok(Some(editor))
    }
}

impl TemplateBuilder {
    /// Start initializing an editor at `mount`. Any attached editor or
    /// earlier pending initialization is torn down first.
    pub fn begin_initialization(&mut self, mount: impl Into<String>) -> PendingInitialization {
        self.teardown();

        let (sender, receiver) = watch::channel(false);
        self.pending = Some(sender);

        let options = self.config.editor_options(mount);
        tracing::info!("Initializing editor at '{}'", options.mount);

        PendingInitialization {
            options,
            cancelled: receiver,
        }
    }

    /// Attach the outcome of a pending initialization.
    ///
    /// Returns `true` when the editor is now attached. A cancelled pending
    /// initialization never attaches; its editor is destroyed instead.
    pub fn finish_initialization(
        &mut self,
        pending: &PendingInitialization,
        outcome: Result<Option<Arc<dyn DocumentEditor>>>,
    ) -> bool {
        let editor = match outcome {
            Ok(Some(editor)) => editor,
            Ok(None) => return false,
            Err(error) => {
                if pending.is_cancelled() {
                    tracing::debug!("Ignoring failure of cancelled initialization: {}", error);
                } else {
                    self.pending = None;
                    self.report(&error, "initialize");
                }
                return false;
            }
        };

        if pending.is_cancelled() {
            tracing::info!("Builder torn down during initialization, destroying editor");
            editor.destroy();
            return false;
        }

        self.pending = None;
        self.updates = editor.subscribe_updates();
        if self.updates.is_none() {
            tracing::warn!("Editor has no update stream; document changes must be fed by the host");
        }
        self.state = LifecycleState::Ready(editor);
        self.reconcile();
        tracing::info!("Editor ready with {} fields", self.get_fields().len());
        self.listeners.emit(BuilderEvent::ready());
        true
    }

    /// Construct and attach an editor in one step
    pub async fn initialize(&mut self, factory: &dyn EditorFactory, mount: impl Into<String>) -> bool {
        let pending = self.begin_initialization(mount);
        let outcome = pending.resolve(factory).await;
        self.finish_initialization(&pending, outcome)
    }

    /// Cancel any pending initialization and release the attached editor
    pub fn teardown(&mut self) {
        if let Some(sender) = self.pending.take() {
            if sender.send(true).is_err() {
                tracing::debug!("Pending initialization already dropped");
            }
            tracing::info!("Cancelled pending editor initialization");
        }

        if self.updates.take().is_some() {
            tracing::debug!("Released editor update subscription");
        }

        self.filter.close();
        self.selected_field_id = None;

        if let LifecycleState::Ready(editor) = std::mem::take(&mut self.state) {
            editor.destroy();
            tracing::info!("Editor destroyed");
        }
    }

    /// Fail with [`StencilError::EditorUnavailable`] unless an editor is attached
    pub(crate) fn require_editor(&self) -> Result<Arc<dyn DocumentEditor>> {
        self.state.editor().ok_or(StencilError::EditorUnavailable)
    }
}
