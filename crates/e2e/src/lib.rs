//! Plant Shop E2E Test Harness
//!
//! This crate keeps the expensive part of an end-to-end run, logging in,
//! out of the per-scenario path:
//! - Caches one API bearer token and one browser session per role
//! - Logs in at most once per role, even when scenarios start concurrently
//! - Restores cached browser sessions by cookie injection
//! - Wires all of it into before/after scenario hooks, with fixture cleanup
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  BDD runner (cucumber)                      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ScenarioHooks                                              │
//! │    ├── before_scenario(meta, driver)                        │
//! │    │     └── establish_session(role) per @admin/@nonadmin   │
//! │    └── after_scenario(meta, failed)                         │
//! │          └── FixtureCleanup::run() for @ui                  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  SessionStore                                               │
//! │    ├── tokens:   role -> bearer token                       │
//! │    ├── sessions: role -> [Cookie]                           │
//! │    └── locks:    (role, kind) -> single-flight mutex        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Authenticator                                              │
//! │    ├── api_login  POST {api}/auth/login -> token            │
//! │    └── ui_login   login form via BrowserDriver -> cookies   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  BrowserDriver: PlaywrightDriver | testing::RecordingDriver │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod auth;
pub mod cleanup;
pub mod driver;
pub mod error;
pub mod hooks;
pub mod logging;
pub mod playwright;
pub mod session;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use auth::{Authenticator, LoginForm};
pub use cleanup::{CleanupReport, FixtureCleanup};
pub use driver::BrowserDriver;
pub use error::{E2eError, E2eResult};
pub use hooks::{AfterScenario, HookState, ScenarioHooks, ScenarioMeta};
pub use session::{SessionStore, UiSession};
