//! Error types for the repository abstraction.

/// Errors that can occur during repository operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The requested entity was not found.
    #[error("Entity not found: {entity}/{id}")]
    NotFound {
        /// The kind of entity that was not found.
        entity: String,
        /// The id of the entity that was not found.
        id: String,
    },

    /// Attempted to create an entity that already exists.
    #[error("Entity already exists: {entity}/{id}")]
    AlreadyExists {
        /// The kind of entity that already exists.
        entity: String,
        /// The id of the entity that already exists.
        id: String,
    },

    /// Failed to reach the storage backend.
    #[error("Connection error: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// An internal storage error occurred.
    #[error("Internal storage error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl StorageError {
    /// Creates a new `NotFound` error.
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Creates a new `AlreadyExists` error.
    pub fn already_exists(entity: impl Into<String>, id: impl ToString) -> Self {
        Self::AlreadyExists {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Creates a new `Connection` error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl From<StorageError> for learnhub_core::Fault {
    fn from(err: StorageError) -> Self {
        use learnhub_core::Fault;
        match err {
            StorageError::NotFound { entity, id } => Fault::not_found(entity, id),
            duplicate @ StorageError::AlreadyExists { .. } => {
                Fault::validation(duplicate.to_string())
            }
            infrastructure => Fault::unexpected(infrastructure),
        }
    }
}
