// Physics error taxonomy

/// Errors reported by the physics world
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PhysicsError {
    /// Rejected input: bad material values, degenerate shapes, non-finite numbers
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A fixture with the same id already exists on the body
    #[error("Duplicate fixture id: {id}")]
    DuplicateFixtureId { id: String },

    /// Internal invariant violation, indicates solver corruption
    #[error("Invalid physics state: {0}")]
    InvalidState(String),

    #[error("Unknown or destroyed body handle")]
    UnknownBody,

    #[error("Unknown or destroyed fixture handle")]
    UnknownFixture,
}

pub type PhysicsResult<T> = Result<T, PhysicsError>;

/// Shorthand for building an `InvalidConfiguration` error
pub(crate) fn invalid(msg: impl Into<String>) -> PhysicsError {
    PhysicsError::InvalidConfiguration(msg.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PhysicsError::DuplicateFixtureId {
            id: "fix1".to_string(),
        };
        assert_eq!(err.to_string(), "Duplicate fixture id: fix1");

        let err = invalid("density must be positive");
        assert_eq!(
            err.to_string(),
            "Invalid configuration: density must be positive"
        );
    }
}
