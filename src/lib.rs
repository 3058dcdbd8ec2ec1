//! Vogue - production entity tracking for creative pipelines.
//!
//! This library provides the core functionality for the `vg` CLI tool:
//! the entity model and its snapshot persistence, version allocation and
//! the publish state machine, the task dependency graph, filesystem
//! reconciliation, and the validator/integrator publishing pipeline.

pub mod cli;
pub mod commands;
pub mod concurrency;
pub mod config;
pub mod dcc;
pub mod events;
pub mod hierarchy;
pub mod layout;
pub mod logging;
pub mod models;
pub mod publish;
pub mod session;
pub mod storage;
pub mod sync;
pub mod tasks;
pub mod versions;
pub mod worker;

pub use session::ProjectSession;


/// Coarse classification of errors, used by front ends to decide how to
/// render a failure and whether a retry is meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or schema-invalid entity, or a forbidden state transition
    Validation,
    /// Version allocation race lost; safe to retry
    ConcurrencyConflict,
    /// Filesystem or snapshot I/O failure
    Io,
    /// Hash mismatch on verification
    Integrity,
    /// Task graph edge rejected
    DependencyCycle,
    /// Validator or integrator failure
    Publish,
    /// Referenced entity does not exist
    NotFound,
    /// Operation aborted by its cancellation token
    Cancelled,
    /// Bad configuration value or file
    Config,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::ConcurrencyConflict => "concurrency_conflict",
            ErrorKind::Io => "io",
            ErrorKind::Integrity => "integrity",
            ErrorKind::DependencyCycle => "dependency_cycle",
            ErrorKind::Publish => "publish",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Config => "config",
        };
        write!(f, "{}", s)
    }
}

/// Library-level error type for Vogue operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("IO error at {path}: {source}")]
    IoAt {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Not initialized: run `vg project init` first")]
    NotInitialized,

    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Version {version_id} is {status} and cannot be modified; create a new version instead")]
    ImmutableVersion { version_id: String, status: String },

    #[error("Invalid transition for {entity_id}: {from} -> {to}")]
    InvalidTransition {
        entity_id: String,
        from: String,
        to: String,
    },

    #[error("Concurrency conflict on {entity_id}: {reason}")]
    ConcurrencyConflict { entity_id: String, reason: String },

    #[error("Integrity error: {path} (file {file_id}) expected {expected}, found {actual}")]
    Integrity {
        file_id: String,
        path: String,
        expected: String,
        actual: String,
    },

    #[error("Dependency cycle: {task_id} cannot depend on {depends_on_id}")]
    DependencyCycle {
        task_id: String,
        depends_on_id: String,
    },

    #[error("Publish of {version_id} failed at {stage}: {reason}")]
    Publish {
        version_id: String,
        stage: String,
        reason: String,
    },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("DCC bridge error ({app}): {reason}")]
    Dcc { app: String, reason: String },
}

impl Error {
    /// Map this error onto the coarse taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Io(_) | Error::IoAt { .. } | Error::Json(_) | Error::NotInitialized => {
                ErrorKind::Io
            }
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Validation(_)
            | Error::ImmutableVersion { .. }
            | Error::InvalidTransition { .. } => ErrorKind::Validation,
            Error::ConcurrencyConflict { .. } => ErrorKind::ConcurrencyConflict,
            Error::Integrity { .. } => ErrorKind::Integrity,
            Error::DependencyCycle { .. } => ErrorKind::DependencyCycle,
            Error::Publish { .. } | Error::Dcc { .. } => ErrorKind::Publish,
            Error::Cancelled => ErrorKind::Cancelled,
            Error::Config(_) => ErrorKind::Config,
        }
    }

    /// Attach a path to a bare I/O error.
    pub(crate) fn io_at(path: impl Into<std::path::PathBuf>, source: std::io::Error) -> Self {
        Error::IoAt {
            path: path.into(),
            source,
        }
    }

    /// The underlying I/O error, if this is one.
    pub fn as_io(&self) -> Option<&std::io::Error> {
        match self {
            Error::Io(e) => Some(e),
            Error::IoAt { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Result type alias for Vogue operations.
pub type Result<T> = std::result::Result<T, Error>;
