//! Error handling for the Stencil system

use thiserror::Error;

/// Result type alias for Stencil operations
pub type Result<T> = std::result::Result<T, StencilError>;

/// Main error type for the Stencil system
#[derive(Error, Debug)]
pub enum StencilError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// No editor is attached (not ready yet, or torn down)
    #[error("Editor is not available")]
    EditorUnavailable,

    /// The attached editor does not implement a command
    #[error("Editor does not support {capability}")]
    Unsupported { capability: String },

    /// The editor raised an error while executing a command
    #[error("Editor error: {0}")]
    Editor(String),

    /// Editor construction or readiness failed
    #[error("Initialization error: {0}")]
    Initialization(String),

    /// The host's field-creation hook failed
    #[error("Field creation error: {0}")]
    FieldCreation(String),

    /// No field with the given id exists
    #[error("Field not found: {0}")]
    FieldNotFound(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors
    #[error("Error: {0}")]
    Generic(String),
}

impl StencilError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new unsupported-capability error
    pub fn unsupported<S: Into<String>>(capability: S) -> Self {
        Self::Unsupported {
            capability: capability.into(),
        }
    }

    /// Create a new editor error
    pub fn editor<S: Into<String>>(msg: S) -> Self {
        Self::Editor(msg.into())
    }

    /// Create a new initialization error
    pub fn initialization<S: Into<String>>(msg: S) -> Self {
        Self::Initialization(msg.into())
    }

    /// Create a new field creation error
    pub fn field_creation<S: Into<String>>(msg: S) -> Self {
        Self::FieldCreation(msg.into())
    }

    /// Create a generic error
    pub fn generic<S: Into<String>>(msg: S) -> Self {
        Self::Generic(msg.into())
    }

    /// Whether this condition is part of normal operation (editor not ready,
    /// capability missing, unknown id) rather than a fault.
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            StencilError::EditorUnavailable
                | StencilError::Unsupported { .. }
                | StencilError::FieldNotFound(_)
        )
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            StencilError::Config(_) => ErrorSeverity::High,
            StencilError::EditorUnavailable => ErrorSeverity::Low,
            StencilError::Unsupported { .. } => ErrorSeverity::Low,
            StencilError::Editor(_) => ErrorSeverity::Medium,
            StencilError::Initialization(_) => ErrorSeverity::Critical,
            StencilError::FieldCreation(_) => ErrorSeverity::Medium,
            StencilError::FieldNotFound(_) => ErrorSeverity::Low,
            StencilError::Io(_) => ErrorSeverity::Medium,
            StencilError::Json(_) => ErrorSeverity::Medium,
            StencilError::Generic(_) => ErrorSeverity::Medium,
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Low => write!(f, "LOW"),
            ErrorSeverity::Medium => write!(f, "MEDIUM"),
            ErrorSeverity::High => write!(f, "HIGH"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Host-supplied sink for unexpected failures.
///
/// `operation` names the command that failed (`"insertField"`,
/// `"deleteField"`, `"initialize"`, ...).
pub trait ErrorHandler: Send + Sync {
    fn handle_error(&self, error: &StencilError, operation: &str);
}

/// Route an error through the host handler, or log it when no handler is set.
pub fn report_error(handler: Option<&dyn ErrorHandler>, error: &StencilError, operation: &str) {
    match handler {
        Some(handler) => handler.handle_error(error, operation),
        None if error.is_expected() => {
            tracing::warn!("{} failed: {}", operation, error);
        }
        None => {
            tracing::error!("{} failed ({}): {}", operation, error.severity(), error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<(String, String)>>,
    }

    impl ErrorHandler for Recorder {
        fn handle_error(&self, error: &StencilError, operation: &str) {
            self.seen
                .lock()
                .unwrap()
                .push((operation.to_string(), error.to_string()));
        }
    }

    #[test]
    fn test_expected_classification() {
        assert!(StencilError::EditorUnavailable.is_expected());
        assert!(StencilError::unsupported("selectStructuredContentById").is_expected());
        assert!(!StencilError::editor("boom").is_expected());
        assert!(!StencilError::initialization("load failed").is_expected());
    }

    #[test]
    fn test_severity_ordering() {
        assert!(
            StencilError::initialization("x").severity() > StencilError::editor("x").severity()
        );
        assert_eq!(ErrorSeverity::Critical.to_string(), "CRITICAL");
    }

    #[test]
    fn test_report_error_prefers_host_handler() {
        let recorder = Recorder::default();
        report_error(
            Some(&recorder),
            &StencilError::editor("delete threw"),
            "deleteField",
        );

        let seen = recorder.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, "deleteField");
        assert!(seen[0].1.contains("delete threw"));
    }
}
