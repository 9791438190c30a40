use thiserror::Error;

/// Errors surfaced by control-plane operations.
///
/// `Transient` marks 503/504 responses the caller should retry with bounded
/// backoff; `Api` is any other non-2xx and aborts the operation.
#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("transient service error ({status})")]
    Transient { status: u16 },

    #[error("{message}")]
    Api { status: u16, message: String },

    /// 409 carrying the `DeploymentOsTypeConflict` error code; callers may
    /// retry with the alternate OS type.
    #[error("cloud shell deployment conflicts with the requested OS type")]
    OsTypeConflict,

    #[error(
        "Sorry, your Cloud Shell failed to provision. Please retry later. \
         Request correlation id: {}",
        correlation_id.as_deref().unwrap_or("<none>")
    )]
    ProvisioningFailed { correlation_id: Option<String> },

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected response body: {0}")]
    Body(#[from] serde_json::Error),
}

impl ConsoleError {
    /// True for failures worth retrying (HTTP 503/504).
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}
