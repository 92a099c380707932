//! Browser driver capability
//!
//! The session store and authenticator only need a handful of browser
//! operations. Any automation backend (Playwright here, a test double in
//! `testing`) can satisfy them.

use async_trait::async_trait;
use reqwest::Url;

use plantshop_common::Cookie;

use crate::error::{E2eError, E2eResult};

/// Minimal browser surface used by login and session injection
#[async_trait]
pub trait BrowserDriver: Send {
    /// Load `url` in the current page
    async fn navigate(&mut self, url: &str) -> E2eResult<()>;

    /// Replace the value of the input matched by `selector`
    async fn fill(&mut self, selector: &str, value: &str) -> E2eResult<()>;

    /// Click the element matched by `selector`
    async fn click(&mut self, selector: &str) -> E2eResult<()>;

    /// All cookies the browser context currently holds
    async fn cookies(&mut self) -> E2eResult<Vec<Cookie>>;

    /// Add one cookie to the context. The page must already be on the
    /// cookie's domain.
    async fn add_cookie(&mut self, cookie: &Cookie) -> E2eResult<()>;
}

/// Host part of `url`
pub fn host_of(url: &str) -> E2eResult<String> {
    let parsed = Url::parse(url).map_err(|e| E2eError::Driver(format!("invalid URL '{}': {}", url, e)))?;
    parsed
        .host_str()
        .map(str::to_string)
        .ok_or_else(|| E2eError::Driver(format!("URL '{}' has no host", url)))
}

/// Whether a cookie may be set while the page is on `page_url`.
///
/// A cookie without a domain binds to the page host. A leading `.` also
/// matches subdomains.
pub fn cookie_matches_host(cookie: &Cookie, page_url: &str) -> E2eResult<bool> {
    let host = host_of(page_url)?;
    let Some(domain) = cookie.domain.as_deref() else {
        return Ok(true);
    };

    let bare = domain.trim_start_matches('.');
    Ok(host.eq_ignore_ascii_case(bare)
        || (domain.starts_with('.') && host.to_ascii_lowercase().ends_with(&format!(".{}", bare.to_ascii_lowercase()))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_of() {
        assert_eq!(host_of("http://localhost:8080/ui/plants").unwrap(), "localhost");
        assert!(host_of("not a url").is_err());
    }

    #[test]
    fn test_cookie_without_domain_matches() {
        let cookie = Cookie::new("sid", "1");
        assert!(cookie_matches_host(&cookie, "http://localhost:8080").unwrap());
    }

    #[test]
    fn test_cookie_domain_matching() {
        let exact = Cookie::new("sid", "1").with_domain("shop.example.com");
        let wildcard = Cookie::new("sid", "1").with_domain(".example.com");
        let other = Cookie::new("sid", "1").with_domain("evil.test");

        assert!(cookie_matches_host(&exact, "https://shop.example.com/login").unwrap());
        assert!(cookie_matches_host(&wildcard, "https://shop.example.com/login").unwrap());
        assert!(cookie_matches_host(&wildcard, "https://example.com/").unwrap());
        assert!(!cookie_matches_host(&exact, "https://example.com/").unwrap());
        assert!(!cookie_matches_host(&other, "https://shop.example.com/").unwrap());
    }
}
