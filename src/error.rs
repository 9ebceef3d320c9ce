/// Code reported when a group-wide operation is requested outside device execution.
pub const INVALID_DEVICE: i32 = -33;

/// Errors reported by the sorters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SortError {
    /// The calling group can not run the group-wide sort primitives, e.g. a host control path.
    #[error("{operation} is not supported on host device (code {code})")]
    UnsupportedContext { code: i32, operation: &'static str },
}

impl SortError {
    pub(crate) fn unsupported(operation: &'static str) -> Self {
        SortError::UnsupportedContext {
            code: INVALID_DEVICE,
            operation,
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            SortError::UnsupportedContext { code, .. } => *code,
        }
    }
}

/// Convenience alias for `Result<T, SortError>`.
pub type Result<T> = std::result::Result<T, SortError>;
