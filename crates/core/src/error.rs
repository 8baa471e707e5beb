//! Unified error types for davenport.
//!
//! Backend failures are classified at the store boundary and translated at
//! the façade into the public taxonomy. Only the not-found / conflict /
//! gone classifications survive translation; everything else is wrapped as
//! a generic backend error with its classification stripped.

/// Status classification reported by store backends.
///
/// Concrete adapters map their transport's failure vocabulary (HTTP status
/// codes, driver error kinds) onto this set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// The requested document or database does not exist.
    NotFound,
    /// A write supplied a stale revision token.
    Conflict,
    /// The document was deleted and only a tombstone remains.
    Gone,
    /// Any other backend failure.
    Other,
}

/// Error raised by a [`DocumentStore`](crate::store::DocumentStore) implementation.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct StoreError {
    status: StatusClass,
    message: String,
}

impl StoreError {
    /// Create a store error with an explicit classification.
    pub fn new(status: StatusClass, message: impl Into<String>) -> Self {
        Self { status, message: message.into() }
    }

    /// Shorthand for a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusClass::NotFound, message)
    }

    /// Shorthand for a conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusClass::Conflict, message)
    }

    /// Shorthand for a gone error.
    pub fn gone(message: impl Into<String>) -> Self {
        Self::new(StatusClass::Gone, message)
    }

    /// Shorthand for an unclassified backend error.
    pub fn other(message: impl Into<String>) -> Self {
        Self::new(StatusClass::Other, message)
    }

    /// The backend's classification of this failure.
    pub fn status(&self) -> StatusClass {
        self.status
    }
}

/// Error raised by a [`DocumentCache`](crate::cache::DocumentCache) implementation.
///
/// Cache failures are always non-fatal to the façade; they degrade reads to
/// the store and are logged on the write path.
#[derive(Debug, Clone, thiserror::Error)]
#[error("cache error: {message}")]
pub struct CacheError {
    message: String,
}

impl CacheError {
    /// Create a cache error.
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// Public error taxonomy of the database façade.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Bad construction input: missing identifiers, invalid design-document
    /// templates, unknown query languages, unusable configuration.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Document or design document absent.
    #[error("not found: {0}")]
    NotFound(String),

    /// Stale revision token on a write or delete.
    #[error("update conflict: {0}")]
    Conflict(String),

    /// Deleted-tombstone access.
    #[error("gone: {0}")]
    Gone(String),

    /// Any other store failure, classification stripped.
    #[error("backend error: {0}")]
    Backend(String),
}

impl Error {
    /// The status classification, exposed only for the classes that are
    /// safe to show to external callers.
    pub fn status(&self) -> Option<StatusClass> {
        match self {
            Error::NotFound(_) => Some(StatusClass::NotFound),
            Error::Conflict(_) => Some(StatusClass::Conflict),
            Error::Gone(_) => Some(StatusClass::Gone),
            _ => None,
        }
    }

    /// Whether this error is a not-found.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    /// Whether this error is a revision conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict(_))
    }
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        match err.status {
            StatusClass::NotFound => Error::NotFound(err.message),
            StatusClass::Conflict => Error::Conflict(err.message),
            StatusClass::Gone => Error::Gone(err.message),
            StatusClass::Other => Error::Backend(err.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::NotFound("no such document: users:42".into());
        assert!(err.to_string().contains("not found"));
        assert!(err.to_string().contains("users:42"));
    }

    #[test]
    fn test_store_error_translation() {
        let err: Error = StoreError::not_found("missing").into();
        assert!(matches!(err, Error::NotFound(_)));

        let err: Error = StoreError::conflict("document update conflict").into();
        assert!(matches!(err, Error::Conflict(_)));

        let err: Error = StoreError::gone("tombstone").into();
        assert!(matches!(err, Error::Gone(_)));
    }

    #[test]
    fn test_unclassified_errors_are_sanitized() {
        let err: Error = StoreError::other("internal server error").into();
        assert!(matches!(err, Error::Backend(_)));
        assert!(err.status().is_none());
    }

    #[test]
    fn test_safe_statuses_are_exposed() {
        let err: Error = StoreError::conflict("stale rev").into();
        assert_eq!(err.status(), Some(StatusClass::Conflict));
        assert!(err.is_conflict());
        assert!(!err.is_not_found());
    }
}
