//! Crate-wide error type
//!
//! Only the source, client and rule errors are allowed to stop the process.
//! Everything else is scoped to a single line.

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Failed to start the follow process for the watched files
    #[error("Failed to start line source: {0}")]
    SourceSpawn(String),

    /// Reading from the follow process failed
    #[error("Line source read failed: {0}")]
    SourceIo(String),

    /// The follow process closed its output
    #[error("Line source terminated unexpectedly")]
    SourceTerminated,

    /// Classification or formatting panicked on a single line
    #[error("Classification fault: {0}")]
    ClassificationFault(String),

    /// Network failure or timeout while delivering a notification
    #[error("Delivery failed: {0}")]
    DeliveryTransport(String),

    /// The endpoint answered with a non-success status
    #[error("Delivery rejected: {status} - {body}")]
    DeliveryRejected { status: u16, body: String },

    /// The HTTP client could not be constructed
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),

    /// A rule pattern failed to compile
    #[error("Invalid pattern rule: {0}")]
    InvalidRule(#[from] regex::Error),
}

impl AppError {
    pub fn source_io(msg: impl Into<String>) -> Self {
        AppError::SourceIo(msg.into())
    }

    pub fn delivery_transport(msg: impl Into<String>) -> Self {
        AppError::DeliveryTransport(msg.into())
    }

    pub fn classification_fault(msg: impl Into<String>) -> Self {
        AppError::ClassificationFault(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_render_rejected_status_and_body() {
        // Arrange
        let error = AppError::DeliveryRejected {
            status: 401,
            body: "Unauthorized".to_string(),
        };

        // Act
        let message = error.to_string();

        // Assert
        assert_eq!(message, "Delivery rejected: 401 - Unauthorized");
    }
}
