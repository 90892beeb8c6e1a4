use crate::backend::BackendError;
use crate::config::ConfigError;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised while replaying change events into the target repository.
///
/// None of these are retried. A failed commit cycle leaves the sandbox in
/// whatever state the failing step produced, and the caller is expected to
/// stop the run.
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    /// The repository root could not be opened or initialised.
    ///
    /// This is always fatal for the whole run.
    #[error("unable to initialize git repository at {path}: {source}")]
    Bootstrap {
        path: String,
        #[source]
        source: BackendError,
    },

    /// Reading, translating or writing an ignore/attribute file failed.
    ///
    /// The files involved are always rewritten in full, so no partial-write
    /// recovery is attempted.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// The working tree still had changes right after a commit cycle.
    #[error("status is not clean after commit: {}", .0.join(", "))]
    DirtyAfterCommit(Vec<String>),

    /// Creating a tag failed. Commits made before the tag are kept.
    #[error("unable to tag {name}: {source}")]
    Tag {
        name: String,
        #[source]
        source: BackendError,
    },

    /// Operation attempted before `Migrator::init` opened the repository.
    #[error("repository has not been initialized")]
    NotInitialized,

    #[error("backend: {0}")]
    Backend(#[from] BackendError),

    #[error("config: {0}")]
    Config(#[from] ConfigError),
}

impl MigrateError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

/// Result type alias for the commit-translation engine.
pub type Result<T> = std::result::Result<T, MigrateError>;
