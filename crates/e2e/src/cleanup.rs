//! Deletes plants created by UI scenarios
//!
//! Fixture plants are recognised by name: exactly `Orchid`, or anything
//! containing `test` in any case. Cleanup is best effort. Every failure is
//! logged and recorded in the report; nothing is returned as an error.

use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{error, info, warn};

use plantshop_common::Plant;

use crate::error::{E2eError, E2eResult};
use crate::session::SessionStore;

/// Name of the plant the UI scenarios create
pub const FIXTURE_PLANT_NAME: &str = "Orchid";

static FIXTURE_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)test").expect("fixture regex is valid"));

/// Whether a plant with this name was created by a test
pub fn is_fixture_name(name: &str) -> bool {
    name == FIXTURE_PLANT_NAME || FIXTURE_NAME.is_match(name)
}

/// Outcome of one cleanup pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Ids deleted (HTTP 204)
    pub deleted: Vec<i64>,
    /// Ids whose deletion failed
    pub failed: Vec<i64>,
    /// Why the pass stopped before deleting anything
    pub skipped_reason: Option<String>,
}

impl CleanupReport {
    fn skipped(reason: impl Into<String>) -> Self {
        Self {
            skipped_reason: Some(reason.into()),
            ..Self::default()
        }
    }
}

/// Removes fixture plants through the API using the cached admin token
pub struct FixtureCleanup {
    client: reqwest::Client,
    api_base_url: String,
    store: Arc<SessionStore>,
}

impl FixtureCleanup {
    pub fn new(store: Arc<SessionStore>, timeout: Duration) -> E2eResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_base_url: store.credentials().api_base_url().to_string(),
            store,
        })
    }

    /// Delete every fixture plant
    pub async fn run(&self) -> CleanupReport {
        info!("Running fixture cleanup against {}", self.api_base_url);

        match self.try_run().await {
            Ok(report) => report,
            Err(e) => {
                error!("Exception in fixture cleanup: {}", e);
                CleanupReport::skipped(e.to_string())
            }
        }
    }

    async fn try_run(&self) -> E2eResult<CleanupReport> {
        let Some(token) = self.store.admin_token().await else {
            warn!("No token available for cleanup; skipping cleanup");
            return Ok(CleanupReport::skipped("no admin token"));
        };

        let plants = self.list_plants(&token).await?;
        let ids: Vec<i64> = plants
            .iter()
            .filter(|plant| plant.name.as_deref().is_some_and(is_fixture_name))
            .map(|plant| plant.id)
            .collect();

        let mut report = CleanupReport::default();
        if ids.is_empty() {
            info!("No test plants found to delete");
            return Ok(report);
        }

        for id in ids {
            match self.delete_plant(&token, id).await {
                Ok(()) => {
                    info!("Deleted plant id={}", id);
                    report.deleted.push(id);
                }
                Err(e) => {
                    warn!("Failed to delete plant id={} : {}", id, e);
                    report.failed.push(id);
                }
            }
        }

        Ok(report)
    }

    async fn list_plants(&self, token: &str) -> E2eResult<Vec<Plant>> {
        let url = format!("{}/plants", self.api_base_url);
        let response = self.client.get(&url).bearer_auth(token).send().await?;

        if response.status() != reqwest::StatusCode::OK {
            return Err(E2eError::UnexpectedStatus {
                url,
                status: response.status().as_u16(),
            });
        }

        Ok(response.json().await?)
    }

    async fn delete_plant(&self, token: &str, id: i64) -> E2eResult<()> {
        let url = format!("{}/plants/{}", self.api_base_url, id);
        let response = self.client.delete(&url).bearer_auth(token).send().await?;

        if response.status() != reqwest::StatusCode::NO_CONTENT {
            return Err(E2eError::UnexpectedStatus {
                url,
                status: response.status().as_u16(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_names() {
        assert!(is_fixture_name("Orchid"));
        assert!(is_fixture_name("test plant"));
        assert!(is_fixture_name("My TEST Cactus"));
        assert!(is_fixture_name("Contest Winner"));
        assert!(!is_fixture_name("orchid"));
        assert!(!is_fixture_name("Orchids"));
        assert!(!is_fixture_name("Rose"));
    }

    #[test]
    fn test_skipped_report() {
        let report = CleanupReport::skipped("no admin token");
        assert!(report.deleted.is_empty());
        assert_eq!(report.skipped_reason.as_deref(), Some("no admin token"));
    }
}
