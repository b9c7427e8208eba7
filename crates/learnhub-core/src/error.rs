use thiserror::Error;

/// Fault taxonomy for LearnHub request handling.
///
/// Every user-visible error is one of these variants; the problem mapper in
/// the server crate is the only place they become HTTP responses.
#[derive(Debug, Error)]
pub enum Fault {
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        /// Field-level errors, keyed by field name.
        errors: Vec<(String, String)>,
    },

    #[error("Permission denied: {0}")]
    Permission(String),

    #[error("Not found: {entity}/{id}")]
    NotFound { entity: String, id: String },

    #[error("Internal error: {0}")]
    Unexpected(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Fault {
    /// Create a new Validation fault without field detail
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            errors: Vec::new(),
        }
    }

    /// Create a new Validation fault with field-level errors
    pub fn validation_fields(
        message: impl Into<String>,
        errors: Vec<(String, String)>,
    ) -> Self {
        Self::Validation {
            message: message.into(),
            errors,
        }
    }

    /// Create a new Permission fault
    pub fn permission(message: impl Into<String>) -> Self {
        Self::Permission(message.into())
    }

    /// Create a new NotFound fault
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Wrap any error as an Unexpected fault
    pub fn unexpected(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Unexpected(Box::new(err))
    }

    /// HTTP status code this fault maps to
    pub fn status(&self) -> u16 {
        match self {
            Self::Validation { .. } => 422,
            Self::Permission(_) => 403,
            Self::NotFound { .. } => 404,
            Self::Unexpected(_) => 500,
        }
    }

    /// Check if this fault is expected (client-caused, 4xx category)
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            Self::Validation { .. } | Self::Permission(_) | Self::NotFound { .. }
        )
    }

    /// Get fault kind for logging/monitoring
    pub fn kind(&self) -> FaultKind {
        match self {
            Self::Validation { .. } => FaultKind::Validation,
            Self::Permission(_) => FaultKind::Permission,
            Self::NotFound { .. } => FaultKind::NotFound,
            Self::Unexpected(_) => FaultKind::Unexpected,
        }
    }
}

/// Fault kinds for monitoring and classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    Validation,
    Permission,
    NotFound,
    Unexpected,
}

impl std::fmt::Display for FaultKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::Permission => write!(f, "permission"),
            Self::NotFound => write!(f, "not_found"),
            Self::Unexpected => write!(f, "unexpected"),
        }
    }
}

/// Convenience result type for request handling
pub type Result<T> = std::result::Result<T, Fault>;
