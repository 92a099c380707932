//! Per-role session and token cache
//!
//! Logging in is the slowest part of most scenarios, so every role logs in at
//! most once per process for each protocol: once through the API for a bearer
//! token and once through the web form for session cookies. Later scenarios
//! reuse the cached values until they are cleared explicitly.
//!
//! Values are published by a single map insert of an immutable `Arc`, so a
//! reader sees either no entry or a complete one. First use of a role is
//! single-flight: concurrent callers for the same role and protocol wait on a
//! per-role lock and find the winner's result in the cache.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use plantshop_common::{Cookie, CredentialStore, Credentials, Role, SuiteConfig};

use crate::auth::Authenticator;
use crate::driver::BrowserDriver;
use crate::error::{E2eError, E2eResult};

/// Cookies captured from a successful UI login
pub type UiSession = Arc<[Cookie]>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum LoginKind {
    Api,
    Ui,
}

/// Process-wide cache of UI sessions and API tokens, keyed by role
pub struct SessionStore {
    credentials: Arc<CredentialStore>,
    authenticator: Authenticator,
    ui_sessions: DashMap<Role, UiSession>,
    api_tokens: DashMap<Role, Arc<str>>,
    /// Set once a UI login for the role has completed
    login_completed: DashMap<Role, bool>,
    login_locks: DashMap<(Role, LoginKind), Arc<Mutex<()>>>,
}

impl SessionStore {
    pub fn new(credentials: Arc<CredentialStore>, authenticator: Authenticator) -> Self {
        Self {
            credentials,
            authenticator,
            ui_sessions: DashMap::new(),
            api_tokens: DashMap::new(),
            login_completed: DashMap::new(),
            login_locks: DashMap::new(),
        }
    }

    /// Build a store, its credential store and authenticator from config
    pub fn from_config(config: &SuiteConfig) -> E2eResult<Self> {
        let credentials = Arc::new(CredentialStore::from_config(config));
        let authenticator =
            Authenticator::new(&credentials, Duration::from_secs(config.request_timeout_secs))?;
        Ok(Self::new(credentials, authenticator))
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    pub fn authenticator(&self) -> &Authenticator {
        &self.authenticator
    }

    // ========================================================================
    // API tokens
    // ========================================================================

    /// Cached token for `role`, logging in through the API on first use.
    ///
    /// A failed login is logged and reported as `None`; the cache is left as
    /// it was.
    pub async fn get_or_create_api_token(&self, role: &Role, credentials: &Credentials) -> Option<String> {
        if let Some(token) = self.cached_token(role) {
            info!(role = %role, "Using cached API token");
            return Some(token);
        }

        let lock = self.login_lock(role, LoginKind::Api);
        let _guard = lock.lock().await;

        if let Some(token) = self.cached_token(role) {
            debug!(role = %role, "API token cached while waiting for login lock");
            return Some(token);
        }

        info!(role = %role, "Authenticating via API");
        match self.authenticator.api_login(credentials).await {
            Ok(token) => {
                self.api_tokens.insert(role.clone(), Arc::from(token.as_str()));
                info!(role = %role, "Cached new API token");
                Some(token)
            }
            Err(e) => {
                error!(role = %role, username = credentials.username(), "API authentication failed: {}", e);
                None
            }
        }
    }

    /// Token for a role using its configured credentials
    pub async fn token_for(&self, role: &Role) -> Option<String> {
        let Some(credentials) = self.credentials.credentials(role) else {
            warn!(role = %role, "No credentials configured");
            return None;
        };
        self.get_or_create_api_token(role, credentials).await
    }

    pub async fn admin_token(&self) -> Option<String> {
        self.token_for(&Role::admin()).await
    }

    pub async fn standard_user_token(&self) -> Option<String> {
        self.token_for(&Role::standard_user()).await
    }

    /// Like `token_for`, but a missing token is an error
    pub async fn require_token(&self, role: &Role) -> E2eResult<String> {
        if self.credentials.credentials(role).is_none() {
            return Err(E2eError::UnknownRole(role.clone()));
        }
        self.token_for(role)
            .await
            .ok_or_else(|| E2eError::AuthenticationSetup { role: role.clone() })
    }

    // ========================================================================
    // UI sessions
    // ========================================================================

    /// Put `driver` into a logged-in state for `role`.
    ///
    /// With a completed session cached, its cookies are injected. Otherwise
    /// the login form is driven, and the resulting cookies are cached and the
    /// role marked as logged in. Failures are logged and reported as `None`.
    pub async fn get_or_create_ui_session(
        &self,
        driver: &mut dyn BrowserDriver,
        role: &Role,
        credentials: &Credentials,
    ) -> Option<UiSession> {
        if let Some(session) = self.active_session(role) {
            info!(role = %role, "Using cached UI session");
            return self.restore(driver, role, session).await;
        }

        let lock = self.login_lock(role, LoginKind::Ui);
        let _guard = lock.lock().await;

        if let Some(session) = self.active_session(role) {
            debug!(role = %role, "UI session cached while waiting for login lock");
            return self.restore(driver, role, session).await;
        }

        info!(role = %role, username = credentials.username(), "Performing UI login");
        match self.authenticator.ui_login(driver, credentials).await {
            Ok(cookies) => {
                let session: UiSession = cookies.into();
                // Session first, flag second: the flag never points at a missing session
                self.ui_sessions.insert(role.clone(), session.clone());
                self.login_completed.insert(role.clone(), true);
                info!(role = %role, "Logged in and cached UI session");
                Some(session)
            }
            Err(e) => {
                error!(role = %role, username = credentials.username(), "UI login failed: {}", e);
                None
            }
        }
    }

    /// UI session for a role using its configured credentials
    pub async fn login_as(&self, driver: &mut dyn BrowserDriver, role: &Role) -> Option<UiSession> {
        let Some(credentials) = self.credentials.credentials(role) else {
            warn!(role = %role, "No credentials configured");
            return None;
        };
        self.get_or_create_ui_session(driver, role, credentials).await
    }

    pub async fn login_as_admin(&self, driver: &mut dyn BrowserDriver) -> Option<UiSession> {
        self.login_as(driver, &Role::admin()).await
    }

    pub async fn login_as_standard_user(&self, driver: &mut dyn BrowserDriver) -> Option<UiSession> {
        self.login_as(driver, &Role::standard_user()).await
    }

    /// Like `login_as`, but a missing session is an error
    pub async fn require_ui_session(&self, driver: &mut dyn BrowserDriver, role: &Role) -> E2eResult<UiSession> {
        if self.credentials.credentials(role).is_none() {
            return Err(E2eError::UnknownRole(role.clone()));
        }
        self.login_as(driver, role)
            .await
            .ok_or_else(|| E2eError::AuthenticationSetup { role: role.clone() })
    }

    /// Copy the cached cookies of `role` into `driver`.
    ///
    /// Returns how many cookies were accepted. A cookie the driver rejects
    /// is logged and skipped.
    pub async fn inject_session(&self, driver: &mut dyn BrowserDriver, role: &Role) -> usize {
        let Some(session) = self.cached_session(role) else {
            warn!(role = %role, "No cached cookies found");
            return 0;
        };
        self.inject_cookies(driver, role, &session).await
    }

    /// Inject a cached session; a browser left without any of its cookies is not logged in
    async fn restore(&self, driver: &mut dyn BrowserDriver, role: &Role, session: UiSession) -> Option<UiSession> {
        if self.inject_cookies(driver, role, &session).await == 0 {
            error!(role = %role, "No cached cookies could be injected");
            return None;
        }
        Some(session)
    }

    async fn inject_cookies(&self, driver: &mut dyn BrowserDriver, role: &Role, cookies: &[Cookie]) -> usize {
        if cookies.is_empty() {
            warn!(role = %role, "Cached session has no cookies");
            return 0;
        }

        // Cookies bind to the domain of the page the driver is on
        if let Err(e) = driver.navigate(self.credentials.base_url()).await {
            error!(role = %role, "Error opening base URL for cookie injection: {}", e);
            return 0;
        }

        let mut injected = 0;
        for cookie in cookies {
            match driver.add_cookie(cookie).await {
                Ok(()) => {
                    debug!("Injected cookie: {}", cookie.name);
                    injected += 1;
                }
                Err(e) => {
                    warn!("Failed to inject cookie {}: {}", cookie.name, e);
                }
            }
        }

        info!(role = %role, "Injected {}/{} cached session cookie(s)", injected, cookies.len());
        injected
    }

    // ========================================================================
    // Introspection and invalidation
    // ========================================================================

    /// A UI login has completed for `role` and its cookies are cached
    pub fn has_active_session(&self, role: &Role) -> bool {
        self.active_session(role).is_some()
    }

    pub fn has_token(&self, role: &Role) -> bool {
        self.api_tokens.contains_key(role)
    }

    pub fn cached_token(&self, role: &Role) -> Option<String> {
        self.api_tokens.get(role).map(|token| token.value().to_string())
    }

    pub fn cached_session(&self, role: &Role) -> Option<UiSession> {
        self.ui_sessions.get(role).map(|session| Arc::clone(session.value()))
    }

    /// Roles with a cached token or session, sorted
    pub fn cached_roles(&self) -> Vec<Role> {
        let mut roles: Vec<Role> = self
            .api_tokens
            .iter()
            .map(|entry| entry.key().clone())
            .chain(self.ui_sessions.iter().map(|entry| entry.key().clone()))
            .collect();
        roles.sort();
        roles.dedup();
        roles
    }

    /// Forget the session, token and login flag of one role
    pub fn clear_session(&self, role: &Role) {
        self.login_completed.remove(role);
        self.ui_sessions.remove(role);
        self.api_tokens.remove(role);
        info!(role = %role, "Cleared cached session");
    }

    /// Forget every cached session and token
    pub fn clear_all(&self) {
        self.login_completed.clear();
        self.ui_sessions.clear();
        self.api_tokens.clear();
        info!("Cleared all cached sessions and tokens");
    }

    fn active_session(&self, role: &Role) -> Option<UiSession> {
        let completed = self.login_completed.get(role).map(|flag| *flag).unwrap_or(false);
        if !completed {
            return None;
        }
        self.cached_session(role)
    }

    fn login_lock(&self, role: &Role, kind: LoginKind) -> Arc<Mutex<()>> {
        self.login_locks
            .entry((role.clone(), kind))
            .or_default()
            .value()
            .clone()
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("base_url", &self.credentials.base_url())
            .field("cached_roles", &self.cached_roles())
            .finish()
    }
}
