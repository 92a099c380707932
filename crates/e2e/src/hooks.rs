//! Scenario lifecycle hooks
//!
//! The BDD runner calls `before_scenario` and `after_scenario` around every
//! scenario. Role tags (`@admin`, `@nonadmin`) put the scenario's browser into
//! a logged-in state, reusing cached sessions where possible. `@ui` scenarios
//! get fixture cleanup afterwards, whatever their result. API scenarios get
//! nothing eagerly: their steps fetch tokens from the store on demand.
//!
//! ```text
//! NeedsSession ──cached──▶ Injected ──▶ (scenario) ──▶ Done
//!      │                      ▲
//!      └──── Authenticating ──┘
//! ```

use std::sync::Arc;

use tracing::{debug, error, info};

use plantshop_common::Role;

use crate::cleanup::{CleanupReport, FixtureCleanup};
use crate::driver::BrowserDriver;
use crate::error::{E2eError, E2eResult};
use crate::session::SessionStore;

/// Page a cached session lands on after injection
pub const DEFAULT_LANDING_PATH: &str = "/ui/plants";

/// Where a scenario's session setup is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookState {
    NeedsSession,
    Authenticating,
    Injected,
    Done,
}

/// What the hooks need to know about a scenario
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioMeta {
    pub name: String,
    pub tags: Vec<String>,
}

impl ScenarioMeta {
    pub fn new<I, T>(name: impl Into<String>, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            name: name.into(),
            tags: tags.into_iter().map(Into::into).collect(),
        }
    }

    /// Case-insensitive tag check; `@` prefixes are ignored on both sides
    pub fn has_tag(&self, tag: &str) -> bool {
        let wanted = tag.trim_start_matches('@');
        self.tags
            .iter()
            .any(|t| t.trim_start_matches('@').eq_ignore_ascii_case(wanted))
    }
}

/// Result of the after-scenario hook
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AfterScenario {
    pub state: HookState,
    /// Present when the scenario was tagged `@ui`
    pub cleanup: Option<CleanupReport>,
}

/// Before/after hooks shared by every scenario in the run
pub struct ScenarioHooks {
    store: Arc<SessionStore>,
    cleanup: FixtureCleanup,
    role_tags: Vec<(String, Role)>,
    landing_path: String,
}

impl ScenarioHooks {
    pub fn new(store: Arc<SessionStore>, cleanup: FixtureCleanup) -> Self {
        Self {
            store,
            cleanup,
            role_tags: vec![
                ("admin".to_string(), Role::admin()),
                ("nonadmin".to_string(), Role::standard_user()),
            ],
            landing_path: DEFAULT_LANDING_PATH.to_string(),
        }
    }

    /// Map another tag to a role (replaces an existing mapping for the tag)
    pub fn with_role_tag(mut self, tag: &str, role: Role) -> Self {
        let tag = tag.trim_start_matches('@').to_ascii_lowercase();
        self.role_tags.retain(|(t, _)| *t != tag);
        self.role_tags.push((tag, role));
        self
    }

    pub fn with_landing_path(mut self, path: impl Into<String>) -> Self {
        self.landing_path = path.into();
        self
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn cleanup(&self) -> &FixtureCleanup {
        &self.cleanup
    }

    /// Roles the scenario's tags ask for
    pub fn roles_for(&self, meta: &ScenarioMeta) -> Vec<Role> {
        self.role_tags
            .iter()
            .filter(|(tag, _)| meta.has_tag(tag))
            .map(|(_, role)| role.clone())
            .collect()
    }

    /// Run before every scenario.
    ///
    /// Fails when a tagged role cannot be logged in, so the scenario stops
    /// here instead of on a login page later.
    pub async fn before_scenario(
        &self,
        meta: &ScenarioMeta,
        driver: &mut dyn BrowserDriver,
    ) -> E2eResult<Vec<(Role, HookState)>> {
        info!("Starting scenario: {}", meta.name);
        info!("Tags: {:?}", meta.tags);

        if meta.has_tag("api") {
            self.before_api_scenario(meta);
        }
        if meta.has_tag("ui") {
            self.before_ui_scenario(meta);
        }

        let mut states = Vec::new();
        for role in self.roles_for(meta) {
            let state = self.establish_session(driver, &role).await?;
            states.push((role, state));
        }
        Ok(states)
    }

    pub fn before_api_scenario(&self, meta: &ScenarioMeta) {
        // Tokens are fetched lazily by the steps that need them
        info!("Setting up API scenario: {}", meta.name);
    }

    pub fn before_ui_scenario(&self, meta: &ScenarioMeta) {
        info!("Setting up UI scenario: {}", meta.name);
    }

    /// Bring `driver` to a logged-in state for `role`
    pub async fn establish_session(&self, driver: &mut dyn BrowserDriver, role: &Role) -> E2eResult<HookState> {
        let mut state = HookState::NeedsSession;
        debug!(role = %role, ?state, "Setting up session");

        if self.store.has_active_session(role) {
            info!(role = %role, "Session already cached, injecting cookies");
            if self.store.inject_session(driver, role).await == 0 {
                return Err(E2eError::AuthenticationSetup { role: role.clone() });
            }
            let landing = format!("{}{}", self.store.credentials().base_url(), self.landing_path);
            driver.navigate(&landing).await?;
        } else {
            state = HookState::Authenticating;
            info!(role = %role, ?state, "Session not found, performing login");
            self.store.require_ui_session(driver, role).await?;
        }

        state = HookState::Injected;
        debug!(role = %role, ?state, "Session ready");
        Ok(state)
    }

    /// Run after every scenario. Never fails.
    pub async fn after_scenario(&self, meta: &ScenarioMeta, failed: bool) -> AfterScenario {
        let status = if failed { "FAILED" } else { "PASSED" };
        info!("Finished scenario: {} - Status: {}", meta.name, status);
        if failed {
            error!("Scenario failed: {}", meta.name);
        }

        let cleanup = if meta.has_tag("ui") {
            Some(self.after_ui_scenario(meta, failed).await)
        } else {
            None
        };

        AfterScenario {
            state: HookState::Done,
            cleanup,
        }
    }

    async fn after_ui_scenario(&self, meta: &ScenarioMeta, failed: bool) -> CleanupReport {
        let report = self.cleanup.run().await;
        info!(
            "Cleanup after '{}': {} deleted, {} failed",
            meta.name,
            report.deleted.len(),
            report.failed.len()
        );
        if failed {
            info!("UI scenario failed - check the report for the browser state");
        }
        report
    }
}
