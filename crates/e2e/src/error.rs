//! Error types for E2E testing

use thiserror::Error;

use plantshop_common::Role;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Configuration error: {0}")]
    Config(#[from] plantshop_common::Error),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Authentication setup failed for role '{role}': no session or token could be obtained")]
    AuthenticationSetup { role: Role },

    #[error("No credentials configured for role '{0}'")]
    UnknownRole(Role),

    #[error("Cookie '{cookie}' rejected: {reason}")]
    CookieDomain { cookie: String, reason: String },

    #[error("Driver error: {0}")]
    Driver(String),

    #[error("Playwright not found. Install with: npx playwright install")]
    PlaywrightNotFound,

    #[error("Playwright error: {0}")]
    Playwright(String),

    #[error("Unexpected status {status} from {url}")]
    UnexpectedStatus { url: String, status: u16 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type E2eResult<T> = Result<T, E2eError>;
