use thiserror::Error;

/// Errors surfaced by the containers.
///
/// Looking up or removing an absent key is not an error; those operations
/// return `None` or `false`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RedwoodError {
    /// The operation is never supported by the receiver, e.g. inserting
    /// through a key view or removing through a cursor.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(&'static str),
    /// The container was structurally modified after the cursor was created.
    #[error("container modified during iteration (expected modification {expected}, found {found})")]
    ConcurrentModification { expected: u64, found: u64 },
    /// Input handed to a presorted constructor was not strictly ascending.
    #[error("input is not strictly ascending at position {position}")]
    NotPresorted { position: usize },
    /// Reported by `validate` when the tree breaks a red-black invariant.
    #[error("red-black invariant violated: {0}")]
    InvariantViolation(&'static str),
}

#[cfg(test)]
mod tests {
    use super::RedwoodError;

    #[test]
    fn messages() {
        assert_eq!(
            RedwoodError::UnsupportedOperation("add").to_string(),
            "unsupported operation: add"
        );
        assert_eq!(
            RedwoodError::NotPresorted { position: 3 }.to_string(),
            "input is not strictly ascending at position 3"
        );
        assert_eq!(
            RedwoodError::ConcurrentModification {
                expected: 1,
                found: 2
            }
            .to_string(),
            "container modified during iteration (expected modification 1, found 2)"
        );
    }
}
