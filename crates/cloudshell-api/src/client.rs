use reqwest::header::HeaderMap;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde_json::{json, Value};

use crate::error::ConsoleError;
use crate::models::{OsType, UserSettings};

/// API version for console and user-settings operations.
pub const CONSOLE_API_VERSION: &str = "2017-08-01-preview";

/// API version for storage account key listing.
pub const STORAGE_API_VERSION: &str = "2017-06-01";

const PREFERRED_LOCATION_HEADER: &str = "x-ms-console-preferred-location";
const ROUTING_REQUEST_ID_HEADER: &str = "x-ms-routing-request-id";

/// Error code on a 409 that means the deployment exists with another OS type.
pub(crate) const DEPLOYMENT_OS_TYPE_CONFLICT: &str = "DeploymentOsTypeConflict";

/// A control-plane response, returned for any status code.
///
/// Requests never fail on non-2xx; callers inspect the status here and
/// decide between success, transient retry and abort.
#[derive(Debug)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// 503/504 signal the caller should retry.
    pub fn is_transient(&self) -> bool {
        matches!(self.status.as_u16(), 503 | 504)
    }

    /// Routing correlation header, kept for support diagnostics.
    pub fn correlation_id(&self) -> Option<String> {
        self.headers
            .get(ROUTING_REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    }

    /// Error code from the body's `error.code` field, if any.
    pub fn error_code(&self) -> Option<&str> {
        self.body["error"]["code"].as_str()
    }

    /// Message derived from the body's `error.message` field, falling back
    /// to a synthesized line carrying status, headers and body.
    pub fn error_message(&self) -> String {
        match self.body["error"]["message"].as_str() {
            Some(message) => format!("{} ({})", message, self.status.as_u16()),
            None => format!("{} {:?} {}", self.status.as_u16(), self.headers, self.body),
        }
    }

    /// Classify a non-2xx response as a typed error.
    pub fn into_error(self) -> ConsoleError {
        if self.is_transient() {
            ConsoleError::Transient {
                status: self.status.as_u16(),
            }
        } else {
            ConsoleError::Api {
                status: self.status.as_u16(),
                message: self.error_message(),
            }
        }
    }
}

/// Authenticated client for the cloud shell control plane.
///
/// Console and user-settings operations go against the management endpoint;
/// terminal operations go against the session URI returned by provisioning.
#[derive(Clone)]
pub struct ConsoleClient {
    access_token: String,
    endpoint: String,
    client: reqwest::Client,
}

impl ConsoleClient {
    pub fn new(access_token: String, endpoint: String) -> Self {
        let endpoint = endpoint.trim_end_matches('/').to_string();
        Self {
            access_token,
            endpoint,
            client: reqwest::Client::new(),
        }
    }

    fn console_url(&self) -> String {
        format!(
            "{}/providers/Microsoft.Portal/consoles/default?api-version={}",
            self.endpoint, CONSOLE_API_VERSION
        )
    }

    fn user_settings_url(&self) -> String {
        format!(
            "{}/providers/Microsoft.Portal/userSettings/cloudconsole?api-version={}",
            self.endpoint, CONSOLE_API_VERSION
        )
    }

    fn request(&self, method: Method, url: String) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("Accept", "application/json")
            .header("Content-Type", "application/json")
            .bearer_auth(&self.access_token)
    }

    async fn send(&self, builder: RequestBuilder) -> Result<ApiResponse, ConsoleError> {
        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let text = response.text().await?;
        let body = if text.is_empty() {
            Value::Null
        } else {
            // Some error responses are plain text; keep them verbatim.
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };
        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }

    /// Fetch the user's cloud shell settings, or `None` when the control
    /// plane has none for this account (any non-2xx response).
    pub async fn get_user_settings(&self) -> Result<Option<UserSettings>, ConsoleError> {
        let response = self
            .send(self.request(Method::GET, self.user_settings_url()))
            .await?;
        if !response.is_success() {
            return Ok(None);
        }
        let settings = serde_json::from_value(response.body["properties"].clone())?;
        Ok(Some(settings))
    }

    /// Create the console (`initial == true`, PUT with the requested OS
    /// type) or poll its state (GET). The preferred-location header routes
    /// the deployment.
    pub async fn create_console(
        &self,
        settings: &UserSettings,
        os_type: OsType,
        initial: bool,
    ) -> Result<ApiResponse, ConsoleError> {
        let method = if initial { Method::PUT } else { Method::GET };
        let mut builder = self
            .request(method, self.console_url())
            .header(PREFERRED_LOCATION_HEADER, &settings.preferred_location);
        if initial {
            builder = builder.json(&json!({
                "properties": { "osType": os_type.as_str() }
            }));
        }
        self.send(builder).await
    }

    /// Delete the active console so the next provision starts fresh.
    pub async fn reset_console(&self) -> Result<(), ConsoleError> {
        let response = self
            .send(self.request(Method::DELETE, self.console_url()))
            .await?;
        if !response.is_success() {
            return Err(response.into_error());
        }
        Ok(())
    }

    /// List keys for the storage account backing the cloud shell file share.
    pub async fn get_storage_account_key(
        &self,
        subscription_id: &str,
        resource_group: &str,
        storage_account_name: &str,
    ) -> Result<ApiResponse, ConsoleError> {
        let url = format!(
            "{}/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Storage/storageAccounts/{}/listKeys?api-version={}",
            self.endpoint, subscription_id, resource_group, storage_account_name, STORAGE_API_VERSION
        );
        self.send(self.request(Method::POST, url)).await
    }

    /// Create the pseudo-terminal inside a provisioned session with the
    /// given window geometry. The success body parses as a
    /// [`TerminalHandle`](crate::models::TerminalHandle).
    pub async fn initialize_terminal(
        &self,
        console_uri: &str,
        cols: u16,
        rows: u16,
    ) -> Result<ApiResponse, ConsoleError> {
        let url = format!("{}/terminals?cols={}&rows={}", console_uri, cols, rows);
        let builder = self
            .request(Method::POST, url)
            .json(&json!({ "tokens": [] }));
        self.send(builder).await
    }

    /// Notify the remote terminal of a new window geometry.
    pub async fn resize_terminal(
        &self,
        console_uri: &str,
        terminal_id: &str,
        cols: u16,
        rows: u16,
    ) -> Result<ApiResponse, ConsoleError> {
        let url = format!(
            "{}/terminals/{}/size?cols={}&rows={}",
            console_uri, terminal_id, cols, rows
        );
        self.send(self.request(Method::POST, url)).await
    }
}
