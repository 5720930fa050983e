//! Best-effort operations.
//!
//! Background conveniences such as auto-detection on document open must never
//! surface an error to the user. Their results are wrapped in [`BestEffort`],
//! which can only be built by logging and discarding the failure, so callers
//! cannot accidentally propagate it with `?`.

/// Outcome of an operation whose failure is logged and dropped.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct BestEffort<T> {
    value: Option<T>,
}

impl<T> BestEffort<T> {
    /// Wrap a result, logging an error at `warn` level.
    pub fn from_result(operation: &str, result: crate::Result<T>) -> Self {
        match result {
            Ok(value) => Self { value: Some(value) },
            Err(e) => {
                tracing::warn!(operation, error = %e, "best-effort operation failed");
                Self { value: None }
            }
        }
    }

    /// The operation was not attempted.
    pub fn skipped() -> Self {
        Self { value: None }
    }

    /// Whether a value was produced.
    pub fn is_available(&self) -> bool {
        self.value.is_some()
    }

    /// The value, if the operation ran and succeeded.
    pub fn into_option(self) -> Option<T> {
        self.value
    }
}
