//! Roles and the credentials resolved for them at start-up

use std::collections::HashMap;
use std::fmt;

use crate::config::{AccountConfig, SuiteConfig};

/// A named logical test actor
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Role(String);

impl Role {
    pub const ADMIN: &'static str = "admin";
    pub const STANDARD_USER: &'static str = "standard-user";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn admin() -> Self {
        Self::new(Self::ADMIN)
    }

    pub fn standard_user() -> Self {
        Self::new(Self::STANDARD_USER)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Role {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Username/password pair for a role
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl From<&AccountConfig> for Credentials {
    fn from(account: &AccountConfig) -> Self {
        Self::new(account.username.clone(), account.password.clone())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Base URLs and per-role credentials, fixed for the life of the process
#[derive(Debug, Clone)]
pub struct CredentialStore {
    base_url: String,
    api_base_url: String,
    accounts: HashMap<Role, Credentials>,
}

impl CredentialStore {
    pub fn from_config(config: &SuiteConfig) -> Self {
        let accounts = HashMap::from([
            (Role::admin(), Credentials::from(&config.admin)),
            (Role::standard_user(), Credentials::from(&config.standard_user)),
        ]);

        Self {
            base_url: config.base_url.clone(),
            api_base_url: config.api_base_url.clone(),
            accounts,
        }
    }

    /// Register an extra role beyond the two built-in ones
    pub fn with_role(mut self, role: Role, credentials: Credentials) -> Self {
        self.accounts.insert(role, credentials);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    pub fn credentials(&self, role: &Role) -> Option<&Credentials> {
        self.accounts.get(role)
    }

    pub fn admin(&self) -> &Credentials {
        &self.accounts[&Role::admin()]
    }

    pub fn standard_user(&self) -> &Credentials {
        &self.accounts[&Role::standard_user()]
    }

    /// Known roles, sorted by name
    pub fn roles(&self) -> Vec<Role> {
        let mut roles: Vec<Role> = self.accounts.keys().cloned().collect();
        roles.sort();
        roles
    }
}
