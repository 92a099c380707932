//! Login protocols
//!
//! Two ways in: the REST login endpoint, which hands back a bearer token, and
//! the web login form, which leaves session cookies in the browser.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use plantshop_common::{Cookie, CredentialStore, Credentials};

use crate::driver::BrowserDriver;
use crate::error::{E2eError, E2eResult};

/// Body of `POST /auth/login`
#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(default)]
    token: Option<String>,
}

/// Location and element selectors of the web login form
#[derive(Debug, Clone, PartialEq)]
pub struct LoginForm {
    pub path: String,
    pub username_selector: String,
    pub password_selector: String,
    pub submit_selector: String,
}

impl Default for LoginForm {
    fn default() -> Self {
        Self {
            path: "/login".to_string(),
            username_selector: "#username".to_string(),
            password_selector: "#password".to_string(),
            submit_selector: "#login-button".to_string(),
        }
    }
}

/// Performs API and UI logins against one Plant Shop deployment
#[derive(Debug, Clone)]
pub struct Authenticator {
    client: reqwest::Client,
    base_url: String,
    api_base_url: String,
    login_form: LoginForm,
}

impl Authenticator {
    pub fn new(credentials: &CredentialStore, timeout: Duration) -> E2eResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: credentials.base_url().to_string(),
            api_base_url: credentials.api_base_url().to_string(),
            login_form: LoginForm::default(),
        })
    }

    pub fn with_login_form(mut self, login_form: LoginForm) -> Self {
        self.login_form = login_form;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    pub fn login_url(&self) -> String {
        format!("{}{}", self.base_url, self.login_form.path)
    }

    /// Exchange credentials for a bearer token.
    ///
    /// Only a 200 response carrying a non-empty `token` string counts as a
    /// successful login.
    pub async fn api_login(&self, credentials: &Credentials) -> E2eResult<String> {
        let url = format!("{}/auth/login", self.api_base_url);
        debug!("POST {} as {}", url, credentials.username());

        let response = self
            .client
            .post(&url)
            .json(&LoginRequest {
                username: credentials.username(),
                password: credentials.password(),
            })
            .send()
            .await?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(E2eError::AuthenticationFailed(format!(
                "login for '{}' returned {}",
                credentials.username(),
                status
            )));
        }

        let body: LoginResponse = response.json().await?;
        match body.token {
            Some(token) if !token.is_empty() => {
                info!("Obtained API token for username: {}", credentials.username());
                Ok(token)
            }
            _ => Err(E2eError::AuthenticationFailed(format!(
                "login response for '{}' missing token",
                credentials.username()
            ))),
        }
    }

    /// Log in through the web form and return the resulting cookies
    pub async fn ui_login(
        &self,
        driver: &mut dyn BrowserDriver,
        credentials: &Credentials,
    ) -> E2eResult<Vec<Cookie>> {
        let form = &self.login_form;

        driver.navigate(&self.login_url()).await?;
        driver.fill(&form.username_selector, credentials.username()).await?;
        driver.fill(&form.password_selector, credentials.password()).await?;
        driver.click(&form.submit_selector).await?;

        let cookies = driver.cookies().await?;
        if cookies.is_empty() {
            return Err(E2eError::AuthenticationFailed(format!(
                "UI login for '{}' left no session cookies",
                credentials.username()
            )));
        }

        info!(
            "UI login for username {} produced {} cookie(s)",
            credentials.username(),
            cookies.len()
        );
        Ok(cookies)
    }
}
