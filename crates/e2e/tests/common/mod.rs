//! Shared wiremock fixtures for the Plant Shop API
//!
//! Mocks for:
//! - `POST /api/auth/login` per account
//! - `GET /api/plants` and `DELETE /api/plants/{id}`

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use plantshop_common::SuiteConfig;
use plantshop_e2e::{FixtureCleanup, ScenarioHooks, SessionStore};

pub const ADMIN_TOKEN: &str = "admin-token";
pub const USER_TOKEN: &str = "user-token";

/// Config whose UI and API both live on `server`
pub fn config_for(server: &MockServer) -> SuiteConfig {
    SuiteConfig {
        base_url: server.uri(),
        api_base_url: format!("{}/api", server.uri()),
        request_timeout_secs: 5,
        ..SuiteConfig::default()
    }
}

pub fn store_for(config: &SuiteConfig) -> Arc<SessionStore> {
    Arc::new(SessionStore::from_config(config).expect("session store"))
}

pub fn hooks_for(store: Arc<SessionStore>) -> ScenarioHooks {
    let cleanup = FixtureCleanup::new(store.clone(), Duration::from_secs(2)).expect("cleanup client");
    ScenarioHooks::new(store, cleanup)
}

fn login_body(username: &str, password: &str) -> Value {
    json!({ "username": username, "password": password })
}

/// Login mock for one account answering with `status` and `body`
pub fn login_mock(username: &str, password: &str, status: u16, body: Value) -> Mock {
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .and(body_json(login_body(username, password)))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
}

/// Successful login for the default admin account
pub fn admin_login(token: &str) -> Mock {
    login_mock("admin", "admin123", 200, json!({ "token": token }))
}

/// Successful login for the default standard user account
pub fn user_login(token: &str) -> Mock {
    login_mock("testuser", "password123", 200, json!({ "token": token }))
}

/// `GET /api/plants` for a bearer token
pub fn plant_listing(token: &str, plants: Value) -> Mock {
    Mock::given(method("GET"))
        .and(path("/api/plants"))
        .and(header("Authorization", format!("Bearer {}", token).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(plants))
}

/// `DELETE /api/plants/{id}` answering with `status`
pub fn plant_deletion(id: i64, status: u16) -> Mock {
    Mock::given(method("DELETE"))
        .and(path(format!("/api/plants/{}", id)))
        .respond_with(ResponseTemplate::new(status))
}
