use uuid::Uuid;

/// Failures the core reports back to its callers.
///
/// Transient IO failures (gateway polling, transport errors) travel as
/// `anyhow::Error` and are recovered where they happen; only the outcomes a
/// route needs to map to a client-facing status live here.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Malformed input to a mutation. Rejected before any state change.
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },
}

impl ServiceError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
