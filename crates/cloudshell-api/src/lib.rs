//! # cloudshell-api
//!
//! Client for the Cloud Shell control plane: the remote HTTP API that
//! provisions a cloud shell session and manages the pseudo-terminal inside
//! it.
//!
//! Every request is authenticated with a bearer token and returns an
//! [`ApiResponse`] instead of failing on non-2xx, so callers can tell apart:
//!
//! - success (2xx with parsed body),
//! - transient failure (503/504 — retry),
//! - terminal failure (anything else — abort with the body's error message).
//!
//! [`provision_console`] drives the create-then-poll loop until the console
//! reaches a terminal provisioning state.

pub mod client;
pub mod error;
pub mod models;
pub mod provision;

pub use client::{ApiResponse, ConsoleClient, CONSOLE_API_VERSION, STORAGE_API_VERSION};
pub use error::ConsoleError;
pub use models::{
    ConsoleProperties,
    ConsoleResource,
    OsType,
    ProvisioningState,
    TerminalHandle,
    UserSettings,
};
pub use provision::{provision_console, PROVISION_ATTEMPTS};
