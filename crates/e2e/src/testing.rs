//! In-process test doubles for the browser side of the harness
//!
//! `FakeLoginSite` stands in for the Plant Shop web login: it knows the
//! configured accounts, counts form logins and issues session cookies.
//! `RecordingDriver` is a `BrowserDriver` that talks to a fake site and
//! records every navigation and cookie it is given.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use plantshop_common::{Cookie, SuiteConfig};

use crate::auth::LoginForm;
use crate::driver::{cookie_matches_host, host_of, BrowserDriver};
use crate::error::{E2eError, E2eResult};

/// Fake web login shared by any number of drivers
#[derive(Debug)]
pub struct FakeLoginSite {
    base_url: String,
    domain: String,
    accounts: HashMap<String, String>,
    cookie_count: usize,
    available: AtomicBool,
    logins: AtomicUsize,
    attempts: AtomicUsize,
}

impl FakeLoginSite {
    /// Site at the default base URL that accepts the default accounts
    pub fn plant_shop() -> Arc<Self> {
        Self::for_config(&SuiteConfig::default())
    }

    /// Site at `config.base_url` accepting the configured accounts
    pub fn for_config(config: &SuiteConfig) -> Arc<Self> {
        let accounts = HashMap::from([
            (config.admin.username.clone(), config.admin.password.clone()),
            (config.standard_user.username.clone(), config.standard_user.password.clone()),
        ]);
        Arc::new(Self {
            base_url: config.base_url.clone(),
            domain: host_of(&config.base_url).unwrap_or_else(|_| "localhost".to_string()),
            accounts,
            cookie_count: 2,
            available: AtomicBool::new(true),
            logins: AtomicUsize::new(0),
            attempts: AtomicUsize::new(0),
        })
    }

    /// Issue `count` cookies per login (at least one)
    pub fn with_cookie_count(self: Arc<Self>, count: usize) -> Arc<Self> {
        let mut site = Arc::try_unwrap(self).unwrap_or_else(|shared| shared.snapshot());
        site.cookie_count = count.max(1);
        Arc::new(site)
    }

    /// Make the site unreachable; form interactions fail while unavailable
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Successful form logins so far
    pub fn login_count(&self) -> usize {
        self.logins.load(Ordering::SeqCst)
    }

    /// Form submissions so far, successful or not
    pub fn attempt_count(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn ensure_available(&self) -> E2eResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(E2eError::Driver(format!("{} is unreachable", self.base_url)))
        }
    }

    /// Handle a form submission; wrong credentials issue no cookies
    fn submit(&self, username: &str, password: &str) -> E2eResult<Vec<Cookie>> {
        self.ensure_available()?;
        self.attempts.fetch_add(1, Ordering::SeqCst);

        if self.accounts.get(username).map(String::as_str) != Some(password) {
            return Ok(Vec::new());
        }

        let n = self.logins.fetch_add(1, Ordering::SeqCst) + 1;
        let mut cookies = vec![Cookie::new("JSESSIONID", format!("{}-{}", username, n))
            .with_domain(self.domain.clone())
            .with_path("/")
            .http_only()];
        for i in 1..self.cookie_count {
            cookies.push(
                Cookie::new(format!("pref-{}", i), format!("{}", i))
                    .with_domain(self.domain.clone())
                    .with_path("/"),
            );
        }
        Ok(cookies)
    }

    fn snapshot(&self) -> Self {
        Self {
            base_url: self.base_url.clone(),
            domain: self.domain.clone(),
            accounts: self.accounts.clone(),
            cookie_count: self.cookie_count,
            available: AtomicBool::new(self.available.load(Ordering::SeqCst)),
            logins: AtomicUsize::new(self.login_count()),
            attempts: AtomicUsize::new(self.attempt_count()),
        }
    }
}

/// Browser driver double that records what it is asked to do
#[derive(Debug, Default)]
pub struct RecordingDriver {
    site: Option<Arc<FakeLoginSite>>,
    login_form: LoginForm,
    rejected: HashSet<String>,
    current_url: Option<String>,
    form: HashMap<String, String>,
    jar: Vec<Cookie>,
    navigations: Vec<String>,
    attempted_cookies: Vec<String>,
}

impl RecordingDriver {
    /// Driver with no site behind it; form submissions do nothing
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_site(site: Arc<FakeLoginSite>) -> Self {
        Self {
            site: Some(site),
            ..Self::default()
        }
    }

    /// Fail `add_cookie` for cookies with this name
    pub fn rejecting(mut self, cookie_name: &str) -> Self {
        self.rejected.insert(cookie_name.to_string());
        self
    }

    pub fn current_url(&self) -> Option<&str> {
        self.current_url.as_deref()
    }

    pub fn navigations(&self) -> &[String] {
        &self.navigations
    }

    /// Names of every cookie passed to `add_cookie`, accepted or not
    pub fn attempted_cookies(&self) -> &[String] {
        &self.attempted_cookies
    }

    /// Names of the cookies currently held
    pub fn cookie_names(&self) -> Vec<String> {
        self.jar.iter().map(|c| c.name.clone()).collect()
    }

    pub fn has_cookie(&self, name: &str) -> bool {
        self.jar.iter().any(|c| c.name == name)
    }

    fn store_cookie(&mut self, cookie: Cookie) {
        self.jar.retain(|c| !c.same_slot(&cookie));
        self.jar.push(cookie);
    }
}

#[async_trait]
impl BrowserDriver for RecordingDriver {
    async fn navigate(&mut self, url: &str) -> E2eResult<()> {
        if let Some(site) = &self.site {
            site.ensure_available()?;
        }
        self.current_url = Some(url.to_string());
        self.navigations.push(url.to_string());
        self.form.clear();
        Ok(())
    }

    async fn fill(&mut self, selector: &str, value: &str) -> E2eResult<()> {
        if self.current_url.is_none() {
            return Err(E2eError::Driver(format!("no page loaded to fill {}", selector)));
        }
        self.form.insert(selector.to_string(), value.to_string());
        Ok(())
    }

    async fn click(&mut self, selector: &str) -> E2eResult<()> {
        let Some(site) = self.site.clone() else {
            return Ok(());
        };
        if selector != self.login_form.submit_selector {
            return Ok(());
        }

        let username = self.form.get(&self.login_form.username_selector).cloned().unwrap_or_default();
        let password = self.form.get(&self.login_form.password_selector).cloned().unwrap_or_default();

        let issued = site.submit(&username, &password)?;
        if !issued.is_empty() {
            self.current_url = Some(format!("{}/ui/dashboard", site.base_url()));
        }
        for cookie in issued {
            self.store_cookie(cookie);
        }
        Ok(())
    }

    async fn cookies(&mut self) -> E2eResult<Vec<Cookie>> {
        Ok(self.jar.clone())
    }

    async fn add_cookie(&mut self, cookie: &Cookie) -> E2eResult<()> {
        self.attempted_cookies.push(cookie.name.clone());

        if self.rejected.contains(&cookie.name) {
            return Err(E2eError::CookieDomain {
                cookie: cookie.name.clone(),
                reason: "rejected by test driver".to_string(),
            });
        }

        let page_url = self.current_url.as_deref().ok_or_else(|| E2eError::CookieDomain {
            cookie: cookie.name.clone(),
            reason: "no page loaded".to_string(),
        })?;
        if !cookie_matches_host(cookie, page_url)? {
            return Err(E2eError::CookieDomain {
                cookie: cookie.name.clone(),
                reason: format!("domain does not match {}", page_url),
            });
        }

        self.store_cookie(cookie.clone());
        Ok(())
    }
}
