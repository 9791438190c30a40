use serde::{Deserialize, Serialize};

/// Cloud shell settings stored for the user in the portal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    pub preferred_location: String,
    /// The last OS chosen in the portal.
    pub preferred_os_type: String,
    #[serde(default)]
    pub storage_profile: serde_json::Value,
}

/// OS flavor requested for the console deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsType {
    Linux,
    Windows,
}

impl OsType {
    /// Parse an OS type from a settings value or CLI argument
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "linux" => Some(Self::Linux),
            "windows" => Some(Self::Windows),
            _ => None,
        }
    }

    /// Wire representation expected by the control plane
    pub fn as_str(&self) -> &str {
        match self {
            Self::Linux => "Linux",
            Self::Windows => "Windows",
        }
    }

    /// The alternate OS type, for retrying after a deployment conflict
    pub fn toggled(&self) -> Self {
        match self {
            Self::Linux => Self::Windows,
            Self::Windows => Self::Linux,
        }
    }
}

impl std::fmt::Display for OsType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provisioning state reported by the control plane while a console deploys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum ProvisioningState {
    Succeeded,
    Failed,
    #[serde(other)]
    Pending,
}

/// Console resource body returned by create/poll requests.
#[derive(Debug, Clone, Deserialize)]
pub struct ConsoleResource {
    pub properties: ConsoleProperties,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsoleProperties {
    pub provisioning_state: ProvisioningState,
    /// Session URI; populated once provisioning has succeeded.
    #[serde(default)]
    pub uri: String,
}

/// Pseudo-terminal endpoint inside a provisioned session.
///
/// At most one handle exists per session; resize requests address the
/// terminal by `id`, the relay attaches to `socket_uri`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminalHandle {
    pub id: String,
    pub socket_uri: String,
    #[serde(default)]
    pub idle_timeout: Option<u32>,
}
