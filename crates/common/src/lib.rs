//! Plant Shop Common Library
//!
//! Configuration loading, role credentials and the types shared by the
//! Plant Shop E2E harness.

pub mod config;
pub mod credentials;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::{AccountConfig, SuiteConfig};
pub use credentials::{CredentialStore, Credentials, Role};
pub use error::{Error, Result};
pub use types::*;

/// Harness version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
