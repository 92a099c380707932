//! Playwright browser automation
//!
//! Each batch of queued actions runs as one generated Node script. The driver
//! carries the browser context between scripts itself: the cookie jar is
//! restored into every new context and the last page URL is reloaded when a
//! batch does not start with a navigation. Every script ends by printing the
//! page URL and the context cookies, which replace the driver's state.

use std::path::PathBuf;
use std::process::{Command, Stdio};

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tokio::process::Command as TokioCommand;
use tracing::{debug, warn};

use plantshop_common::Cookie;

use crate::driver::{cookie_matches_host, host_of, BrowserDriver};
use crate::error::{E2eError, E2eResult};

/// Marker prefix of the state line printed at the end of every script
const STATE_MARKER: &str = "__PLANTSHOP_STATE__";

static STATE_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?m)^{} (.+)$", STATE_MARKER)).expect("state line regex is valid")
});

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

impl std::str::FromStr for Browser {
    type Err = E2eError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chromium" | "chrome" => Ok(Browser::Chromium),
            "firefox" => Ok(Browser::Firefox),
            "webkit" | "safari" => Ok(Browser::Webkit),
            other => Err(E2eError::Driver(format!("unknown browser '{}'", other))),
        }
    }
}

/// Configuration for Playwright
#[derive(Debug, Clone)]
pub struct PlaywrightConfig {
    pub browser: Browser,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// Default timeout for every page action
    pub action_timeout_ms: u64,
    /// Node executable used to run the generated scripts
    pub node_binary: PathBuf,
    /// Directory holding `node_modules/playwright`, exported as `NODE_PATH`
    pub node_path: Option<PathBuf>,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            browser: Browser::Chromium,
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            action_timeout_ms: 5000,
            node_binary: PathBuf::from("node"),
            node_path: None,
        }
    }
}

/// A page action waiting for the next script run
#[derive(Debug, Clone, PartialEq)]
pub enum BrowserAction {
    Navigate { url: String },
    Fill { selector: String, value: String },
    Click { selector: String },
}

impl BrowserAction {
    fn name(&self) -> String {
        match self {
            BrowserAction::Navigate { url } => format!("navigate:{}", url),
            BrowserAction::Fill { selector, .. } => format!("fill:{}", selector),
            BrowserAction::Click { selector } => format!("click:{}", selector),
        }
    }
}

/// What a script reports back after running
#[derive(Debug, Deserialize)]
struct BrowserState {
    url: String,
    cookies: Vec<Cookie>,
}

/// Playwright-backed browser driver
pub struct PlaywrightDriver {
    config: PlaywrightConfig,

    /// URL of the page the context is on, including queued navigations
    current_url: Option<String>,

    /// URL the last executed script ended on
    loaded_url: Option<String>,

    /// Cookies of the browser context
    jar: Vec<Cookie>,

    /// Actions not yet executed
    pending: Vec<BrowserAction>,
}

impl PlaywrightDriver {
    /// Create a new driver after checking Playwright is available
    pub fn new(config: PlaywrightConfig) -> E2eResult<Self> {
        Self::check_playwright_installed()?;

        Ok(Self {
            config,
            current_url: None,
            loaded_url: None,
            jar: Vec::new(),
            pending: Vec::new(),
        })
    }

    /// Check if Playwright is installed
    fn check_playwright_installed() -> E2eResult<()> {
        let output = Command::new("npx")
            .args(["playwright", "--version"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match output {
            Ok(status) if status.success() => Ok(()),
            _ => Err(E2eError::PlaywrightNotFound),
        }
    }

    pub fn current_url(&self) -> Option<&str> {
        self.current_url.as_deref()
    }

    pub fn pending_actions(&self) -> &[BrowserAction] {
        &self.pending
    }

    /// Execute all queued actions in one browser run
    pub async fn flush(&mut self) -> E2eResult<()> {
        if self.pending.is_empty() {
            return Ok(());
        }

        let script = self.build_script()?;
        let actions = std::mem::take(&mut self.pending);
        debug!("Running {} queued browser action(s)", actions.len());

        let stdout = self.run_script(&script).await?;
        let state = parse_state(&stdout)?;

        if state.url != "about:blank" {
            self.current_url = Some(state.url.clone());
            self.loaded_url = Some(state.url);
        }
        self.jar = state.cookies;
        Ok(())
    }

    /// Build the Playwright script for the queued actions
    pub fn build_script(&self) -> E2eResult<String> {
        let mut script = String::new();
        let cookies = serde_json::to_string(&self.jar)?;

        // Header
        script.push_str(&format!(
            r#"
const {{ chromium, firefox, webkit }} = require('playwright');

(async () => {{
  const browser = await {browser}.launch({{ headless: {headless} }});
  const context = await browser.newContext({{
    viewport: {{ width: {width}, height: {height} }}
  }});
  const cookies = {cookies};
  if (cookies.length > 0) {{
    await context.addCookies(cookies);
  }}
  const page = await context.newPage();
  page.setDefaultTimeout({timeout});

  try {{
"#,
            browser = self.config.browser.as_str(),
            headless = self.config.headless,
            width = self.config.viewport_width,
            height = self.config.viewport_height,
            cookies = cookies,
            timeout = self.config.action_timeout_ms,
        ));

        // Reload the page the previous run ended on
        let starts_with_navigation = matches!(self.pending.first(), Some(BrowserAction::Navigate { .. }));
        if !starts_with_navigation {
            if let Some(url) = self.loaded_url.as_deref() {
                script.push_str("\n    // Resume previous page\n");
                script.push_str(&format!("    await page.goto({});\n", js_string(url)));
            }
        }

        for (i, action) in self.pending.iter().enumerate() {
            script.push_str(&format!("\n    // Step {}: {}\n", i + 1, action.name()));
            script.push_str(&action_to_js(action));
            script.push('\n');
        }

        // Footer
        script.push_str(&format!(
            r#"
    const state = {{ url: page.url(), cookies: await context.cookies() }};
    console.log('{marker} ' + JSON.stringify(state));
  }} catch (error) {{
    console.error(JSON.stringify({{ success: false, error: error.message, stack: error.stack }}));
    process.exit(1);
  }} finally {{
    await browser.close();
  }}
}})();
"#,
            marker = STATE_MARKER,
        ));

        Ok(script)
    }

    /// Run a script with node and return its stdout
    async fn run_script(&self, script: &str) -> E2eResult<String> {
        let temp_dir = tempfile::tempdir()?;
        let script_path = temp_dir.path().join("session.js");
        std::fs::write(&script_path, script)?;

        debug!("Running Playwright script: {}", script_path.display());

        let mut cmd = TokioCommand::new(&self.config.node_binary);
        cmd.arg(&script_path).current_dir(temp_dir.path());
        if let Some(node_path) = &self.config.node_path {
            cmd.env("NODE_PATH", node_path);
        }

        let output = cmd.output().await?;
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(E2eError::Playwright(format!(
                "Script failed:\nstdout: {}\nstderr: {}",
                stdout, stderr
            )));
        }

        Ok(stdout)
    }
}

#[async_trait]
impl BrowserDriver for PlaywrightDriver {
    async fn navigate(&mut self, url: &str) -> E2eResult<()> {
        self.pending.push(BrowserAction::Navigate { url: url.to_string() });
        self.current_url = Some(url.to_string());
        Ok(())
    }

    async fn fill(&mut self, selector: &str, value: &str) -> E2eResult<()> {
        self.pending.push(BrowserAction::Fill {
            selector: selector.to_string(),
            value: value.to_string(),
        });
        Ok(())
    }

    async fn click(&mut self, selector: &str) -> E2eResult<()> {
        self.pending.push(BrowserAction::Click { selector: selector.to_string() });
        Ok(())
    }

    async fn cookies(&mut self) -> E2eResult<Vec<Cookie>> {
        self.flush().await?;
        Ok(self.jar.clone())
    }

    async fn add_cookie(&mut self, cookie: &Cookie) -> E2eResult<()> {
        let page_url = self.current_url.as_deref().ok_or_else(|| E2eError::CookieDomain {
            cookie: cookie.name.clone(),
            reason: "no page loaded; navigate to the site first".to_string(),
        })?;

        if !cookie_matches_host(cookie, page_url)? {
            return Err(E2eError::CookieDomain {
                cookie: cookie.name.clone(),
                reason: format!(
                    "domain {} does not match page {}",
                    cookie.domain.as_deref().unwrap_or_default(),
                    page_url
                ),
            });
        }

        let mut cookie = cookie.clone();
        if cookie.domain.is_none() {
            cookie.domain = Some(host_of(page_url)?);
        }
        if cookie.path.is_none() {
            cookie.path = Some("/".to_string());
        }

        if let Some(existing) = self.jar.iter_mut().find(|c| c.same_slot(&cookie)) {
            *existing = cookie;
        } else {
            self.jar.push(cookie);
        }
        Ok(())
    }
}

impl Drop for PlaywrightDriver {
    fn drop(&mut self) {
        if !self.pending.is_empty() {
            warn!("Dropping browser driver with {} unexecuted action(s)", self.pending.len());
        }
    }
}

/// Convert an action to JavaScript
fn action_to_js(action: &BrowserAction) -> String {
    match action {
        BrowserAction::Navigate { url } => {
            format!("    await page.goto({});", js_string(url))
        }
        BrowserAction::Fill { selector, value } => {
            format!("    await page.fill({}, {});", js_string(selector), js_string(value))
        }
        BrowserAction::Click { selector } => {
            format!(
                "    await page.click({});\n    await page.waitForLoadState('networkidle');",
                js_string(selector)
            )
        }
    }
}

/// Quote a string as a JavaScript literal
fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

/// Extract the state line a script printed
fn parse_state(stdout: &str) -> E2eResult<BrowserState> {
    let captures = STATE_LINE
        .captures_iter(stdout)
        .last()
        .ok_or_else(|| E2eError::Playwright(format!("script printed no state line:\n{}", stdout)))?;
    Ok(serde_json::from_str(&captures[1])?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn driver() -> PlaywrightDriver {
        PlaywrightDriver {
            config: PlaywrightConfig::default(),
            current_url: None,
            loaded_url: None,
            jar: Vec::new(),
            pending: Vec::new(),
        }
    }

    #[test]
    fn test_playwright_config_default() {
        let config = PlaywrightConfig::default();
        assert_eq!(config.browser, Browser::Chromium);
        assert!(config.headless);
        assert_eq!(config.action_timeout_ms, 5000);
    }

    #[test]
    fn test_browser_from_str() {
        assert_eq!("Firefox".parse::<Browser>().unwrap(), Browser::Firefox);
        assert_eq!("chrome".parse::<Browser>().unwrap(), Browser::Chromium);
        assert!("lynx".parse::<Browser>().is_err());
    }

    #[tokio::test]
    async fn test_actions_are_queued_in_order() {
        let mut driver = driver();
        driver.navigate("http://localhost:8080/login").await.unwrap();
        driver.fill("#username", "admin").await.unwrap();
        driver.click("#login-button").await.unwrap();

        assert_eq!(driver.current_url(), Some("http://localhost:8080/login"));
        assert_eq!(
            driver.pending_actions(),
            &[
                BrowserAction::Navigate { url: "http://localhost:8080/login".to_string() },
                BrowserAction::Fill { selector: "#username".to_string(), value: "admin".to_string() },
                BrowserAction::Click { selector: "#login-button".to_string() },
            ]
        );
    }

    #[tokio::test]
    async fn test_script_escapes_values() {
        let mut driver = driver();
        driver.navigate("http://localhost:8080/login").await.unwrap();
        driver.fill("#password", "it's \"quoted\"").await.unwrap();

        let script = driver.build_script().unwrap();
        assert!(script.contains(r##"await page.fill("#password", "it's \"quoted\"");"##));
        assert!(script.contains("chromium.launch({ headless: true })"));
        assert!(script.contains(STATE_MARKER));
        assert!(!script.contains("Resume previous page"));
    }

    #[tokio::test]
    async fn test_script_restores_jar_and_page() {
        let mut driver = driver();
        driver.current_url = Some("http://localhost:8080/ui/plants".to_string());
        driver.loaded_url = driver.current_url.clone();
        driver.add_cookie(&Cookie::new("JSESSIONID", "abc")).await.unwrap();
        driver.click("#add-plant").await.unwrap();

        let script = driver.build_script().unwrap();
        assert!(script.contains(r#""name":"JSESSIONID""#));
        assert!(script.contains(r#""domain":"localhost""#));
        assert!(script.contains(r#"await page.goto("http://localhost:8080/ui/plants");"#));
    }

    #[tokio::test]
    async fn test_add_cookie_requires_page() {
        let mut driver = driver();
        let err = driver.add_cookie(&Cookie::new("sid", "1")).await.unwrap_err();
        assert!(matches!(err, E2eError::CookieDomain { .. }));
    }

    #[tokio::test]
    async fn test_add_cookie_rejects_foreign_domain() {
        let mut driver = driver();
        driver.navigate("http://localhost:8080").await.unwrap();
        let cookie = Cookie::new("sid", "1").with_domain("example.com");
        assert!(driver.add_cookie(&cookie).await.is_err());
    }

    #[tokio::test]
    async fn test_add_cookie_defaults_and_replaces() {
        let mut driver = driver();
        driver.navigate("http://localhost:8080").await.unwrap();
        driver.add_cookie(&Cookie::new("sid", "1")).await.unwrap();
        driver.add_cookie(&Cookie::new("sid", "2")).await.unwrap();

        assert_eq!(driver.jar.len(), 1);
        assert_eq!(driver.jar[0].value, "2");
        assert_eq!(driver.jar[0].domain.as_deref(), Some("localhost"));
        assert_eq!(driver.jar[0].path.as_deref(), Some("/"));
    }

    #[tokio::test]
    async fn test_flush_with_nothing_queued_runs_nothing() {
        let mut driver = driver();
        driver.current_url = Some("http://localhost:8080".to_string());
        driver.add_cookie(&Cookie::new("sid", "1")).await.unwrap();

        // No node process is needed when the queue is empty
        let cookies = driver.cookies().await.unwrap();
        assert_eq!(cookies.len(), 1);
    }

    #[test]
    fn test_parse_state_takes_last_line() {
        let stdout = format!(
            "noise\n{m} {{\"url\":\"about:blank\",\"cookies\":[]}}\n{m} {{\"url\":\"http://localhost:8080/ui\",\"cookies\":[{{\"name\":\"sid\",\"value\":\"x\",\"domain\":\"localhost\",\"path\":\"/\",\"expires\":-1,\"httpOnly\":true,\"secure\":false,\"sameSite\":\"Lax\"}}]}}\n",
            m = STATE_MARKER
        );
        let state = parse_state(&stdout).unwrap();
        assert_eq!(state.url, "http://localhost:8080/ui");
        assert_eq!(state.cookies.len(), 1);
        assert!(state.cookies[0].http_only);
    }

    #[test]
    fn test_parse_state_missing_line() {
        assert!(matches!(parse_state("hello"), Err(E2eError::Playwright(_))));
    }
}
