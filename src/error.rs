//! Error types and handling for vellum

/// Result type alias for vellum operations
pub type Result<T> = std::result::Result<T, VellumError>;

/// Every failure surfaced by storage, streams, the wire codec and record stores
#[derive(Debug, thiserror::Error)]
pub enum VellumError {
    /// I/O related errors (file copies, mmap, memfd)
    #[error("I/O error: {message}")]
    Io {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// Raw allocation failures
    #[error("Memory error: {message}")]
    Memory { message: String },

    /// Invalid parameters or configuration
    #[error("Invalid parameter: {parameter} - {message}")]
    InvalidParameter { parameter: String, message: String },

    /// Access outside the addressable range of a region or stream
    #[error("Out of bounds: offset {offset} + width {width} exceeds size {size}")]
    OutOfBounds {
        offset: usize,
        width: usize,
        size: usize,
    },

    /// Allocation above the safety ceiling without the override flag
    #[error("Allocation of {requested} bytes exceeds the safe limit of {limit} bytes")]
    AllocationLimit { requested: usize, limit: usize },

    /// Operation on a closed region, stream, store or pool
    #[error("{resource} is closed")]
    Closed { resource: String },

    /// The storage behind a handle no longer exists
    #[error("Backing storage was reclaimed")]
    Reclaimed,

    /// Corrupt, truncated or unresolvable wire data
    #[error("Deserialization failed: {message}")]
    Deserialization {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Type id binding conflicts and unregistered types
    #[error("Registry error: {message}")]
    Registry { message: String },

    /// Field name already present in a record store
    #[error("Duplicate field: {name}")]
    DuplicateField { name: String },

    /// Field id or name that does not resolve to a row
    #[error("Unknown field: {field}")]
    UnknownField { field: String },

    /// Reassignment of a field carrying the immutable modifier
    #[error("Field {name} is immutable")]
    ImmutableField { name: String },

    /// Name-based access to a field without the public modifier
    #[error("Inaccessible field: {name}")]
    AccessDenied { name: String },

    /// Pool has no free member and reached its capacity
    #[error("Capacity exceeded: pool holds at most {capacity} regions")]
    CapacityExceeded { capacity: usize },

    /// Operation not available on this kind of object
    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },
}

impl VellumError {
    /// Create an I/O error from a standard I/O error
    pub fn from_io(source: std::io::Error, context: &str) -> Self {
        Self::Io {
            message: format!("{}: {}", context, source),
            source: Some(source),
        }
    }

    /// Create a memory error
    pub fn memory(message: impl Into<String>) -> Self {
        Self::Memory {
            message: message.into(),
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            message: message.into(),
        }
    }

    /// Create an out of bounds error
    pub fn out_of_bounds(offset: usize, width: usize, size: usize) -> Self {
        Self::OutOfBounds {
            offset,
            width,
            size,
        }
    }

    /// Create an allocation limit error
    pub fn allocation_limit(requested: usize, limit: usize) -> Self {
        Self::AllocationLimit { requested, limit }
    }

    /// Create a closed-state error
    pub fn closed(resource: impl Into<String>) -> Self {
        Self::Closed {
            resource: resource.into(),
        }
    }

    /// Create a deserialization error without an underlying cause
    pub fn corrupt(message: impl Into<String>) -> Self {
        Self::Deserialization {
            message: message.into(),
            source: None,
        }
    }

    /// Create a deserialization error wrapping its cause
    pub fn decode<E>(message: impl Into<String>, cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Deserialization {
            message: message.into(),
            source: Some(Box::new(cause)),
        }
    }

    /// Create a registry error
    pub fn registry(message: impl Into<String>) -> Self {
        Self::Registry {
            message: message.into(),
        }
    }

    /// Create a duplicate field error
    pub fn duplicate_field(name: impl Into<String>) -> Self {
        Self::DuplicateField { name: name.into() }
    }

    /// Create an unknown field error
    pub fn unknown_field(field: impl ToString) -> Self {
        Self::UnknownField {
            field: field.to_string(),
        }
    }

    /// Create an immutable field error
    pub fn immutable_field(name: impl Into<String>) -> Self {
        Self::ImmutableField { name: name.into() }
    }

    /// Create an access denied error
    pub fn access_denied(name: impl Into<String>) -> Self {
        Self::AccessDenied { name: name.into() }
    }

    /// Create a capacity exceeded error
    pub fn capacity_exceeded(capacity: usize) -> Self {
        Self::CapacityExceeded { capacity }
    }

    /// Create an unsupported operation error
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported {
            message: message.into(),
        }
    }

    /// True for bounds and validation failures
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidParameter { .. }
                | Self::OutOfBounds { .. }
                | Self::AllocationLimit { .. }
                | Self::DuplicateField { .. }
                | Self::UnknownField { .. }
                | Self::ImmutableField { .. }
                | Self::AccessDenied { .. }
                | Self::Registry { .. }
                | Self::Unsupported { .. }
        )
    }

    /// True for closed or reclaimed state failures
    pub fn is_state(&self) -> bool {
        matches!(self, Self::Closed { .. } | Self::Reclaimed)
    }

    /// True for decode failures
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Deserialization { .. })
    }
}

impl From<std::io::Error> for VellumError {
    fn from(err: std::io::Error) -> Self {
        Self::from_io(err, "I/O operation failed")
    }
}

impl From<serde_json::Error> for VellumError {
    fn from(err: serde_json::Error) -> Self {
        Self::invalid_parameter("json", err.to_string())
    }
}

impl From<VellumError> for std::io::Error {
    fn from(err: VellumError) -> Self {
        let kind = match &err {
            VellumError::Io { source: Some(source), .. } => source.kind(),
            VellumError::OutOfBounds { .. } => std::io::ErrorKind::UnexpectedEof,
            VellumError::InvalidParameter { .. } => std::io::ErrorKind::InvalidInput,
            VellumError::Deserialization { .. } => std::io::ErrorKind::InvalidData,
            VellumError::Closed { .. } | VellumError::Reclaimed => std::io::ErrorKind::BrokenPipe,
            _ => std::io::ErrorKind::Other,
        };
        std::io::Error::new(kind, err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = VellumError::memory("Out of memory");
        assert!(matches!(err, VellumError::Memory { .. }));

        let err = VellumError::out_of_bounds(10, 8, 12);
        assert!(matches!(err, VellumError::OutOfBounds { .. }));
        assert!(err.is_validation());

        let err = VellumError::capacity_exceeded(1);
        assert!(matches!(err, VellumError::CapacityExceeded { capacity: 1 }));
    }

    #[test]
    fn test_error_display() {
        let err = VellumError::closed("storage");
        assert_eq!(format!("{}", err), "storage is closed");
        assert!(err.is_state());

        let err = VellumError::out_of_bounds(10, 8, 12);
        let display = format!("{}", err);
        assert!(display.contains("offset 10"));
        assert!(display.contains("size 12"));
    }

    #[test]
    fn test_decode_wraps_cause() {
        use std::error::Error;

        let cause = VellumError::out_of_bounds(4, 4, 6);
        let err = VellumError::decode("truncated record", cause);
        assert!(err.is_decode());
        let source = err.source().map(|s| s.to_string()).unwrap_or_default();
        assert!(source.contains("Out of bounds"));
    }
}
