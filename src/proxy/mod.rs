//! Proxy module for turning a credential list into forwarding configs
//!
//! This module provides functionality for:
//! - Loading `host:port:username:password` lines from a proxy list
//! - Assigning each credential a sequential local listen port
//! - Writing one forwarding config per credential and applying them

pub mod generator;
pub mod loader;
pub mod models;

pub use generator::{assign_port, ApplySummary, ConfigGenerator, ListedConfig};
pub use loader::{CredentialLoader, LineOutcome};
pub use models::{GeneratedConfig, ProxyCredential};
