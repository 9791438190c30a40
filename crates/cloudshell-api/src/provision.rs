use crate::client::{ConsoleClient, DEPLOYMENT_OS_TYPE_CONFLICT};
use crate::error::ConsoleError;
use crate::models::{ConsoleResource, OsType, ProvisioningState, UserSettings};

/// Total responses inspected before provisioning is declared failed: the
/// initial PUT plus follow-up GET polls.
pub const PROVISION_ATTEMPTS: u32 = 10;

/// Provision a cloud shell console and return its session URI.
///
/// Sends the initial PUT, then polls with GET until the deployment reaches a
/// terminal state, up to [`PROVISION_ATTEMPTS`] responses in total. There is
/// no local delay between polls; the control plane paces the round trips.
///
/// - `Succeeded` returns the session URI immediately.
/// - `Failed`, or exhausting the attempts, fails with the routing
///   correlation id of the last response for support diagnostics.
/// - A 409 carrying `DeploymentOsTypeConflict` fails immediately with
///   [`ConsoleError::OsTypeConflict`] so the caller can retry with the
///   alternate OS type.
/// - 503/504 responses spend an attempt and poll again; any other non-2xx
///   aborts with the body-derived message.
pub async fn provision_console(
    client: &ConsoleClient,
    settings: &UserSettings,
    os_type: OsType,
) -> Result<String, ConsoleError> {
    let mut last_correlation_id = None;

    for attempt in 0..PROVISION_ATTEMPTS {
        let response = client.create_console(settings, os_type, attempt == 0).await?;
        last_correlation_id = response.correlation_id();

        if !response.is_success() {
            if response.is_transient() {
                continue;
            }
            if response.status.as_u16() == 409
                && response.error_code() == Some(DEPLOYMENT_OS_TYPE_CONFLICT)
            {
                return Err(ConsoleError::OsTypeConflict);
            }
            return Err(response.into_error());
        }

        let resource: ConsoleResource = serde_json::from_value(response.body)?;
        match resource.properties.provisioning_state {
            ProvisioningState::Succeeded => return Ok(resource.properties.uri),
            ProvisioningState::Failed => break,
            ProvisioningState::Pending => {}
        }
    }

    Err(ConsoleError::ProvisioningFailed {
        correlation_id: last_correlation_id,
    })
}
