//! Fixture cleanup against a mocked plant API

mod common;

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{admin_login, config_for, login_mock, plant_deletion, plant_listing, store_for, ADMIN_TOKEN};
use plantshop_e2e::FixtureCleanup;

#[tokio::test]
async fn test_only_fixture_plants_are_deleted() {
    let server = MockServer::start().await;
    admin_login(ADMIN_TOKEN).expect(1).mount(&server).await;
    plant_listing(ADMIN_TOKEN, json!([{ "id": 5, "name": "Orchid" }, { "id": 6, "name": "Rose" }]))
        .expect(1)
        .mount(&server)
        .await;
    plant_deletion(5, 204).expect(1).mount(&server).await;
    plant_deletion(6, 204).expect(0).mount(&server).await;

    let store = store_for(&config_for(&server));
    let cleanup = FixtureCleanup::new(store, Duration::from_secs(2)).unwrap();

    let report = cleanup.run().await;

    assert_eq!(report.deleted, vec![5]);
    assert!(report.failed.is_empty());
    assert_eq!(report.skipped_reason, None);
}

#[tokio::test]
async fn test_names_containing_test_are_fixtures() {
    let server = MockServer::start().await;
    admin_login(ADMIN_TOKEN).mount(&server).await;
    plant_listing(
        ADMIN_TOKEN,
        json!([
            { "id": 1, "name": "Test Fern" },
            { "id": 2, "name": "Monstera" },
            { "id": 3, "name": "latest-test-cactus" },
        ]),
    )
    .mount(&server)
    .await;
    plant_deletion(1, 204).expect(1).mount(&server).await;
    plant_deletion(3, 204).expect(1).mount(&server).await;

    let store = store_for(&config_for(&server));
    let report = FixtureCleanup::new(store, Duration::from_secs(2)).unwrap().run().await;

    assert_eq!(report.deleted, vec![1, 3]);
}

#[tokio::test]
async fn test_unnamed_record_does_not_stop_cleanup() {
    let server = MockServer::start().await;
    admin_login(ADMIN_TOKEN).mount(&server).await;
    plant_listing(
        ADMIN_TOKEN,
        json!([{ "id": 5, "name": "Orchid" }, { "id": 9, "name": null }, { "id": 10 }]),
    )
    .mount(&server)
    .await;
    plant_deletion(5, 204).expect(1).mount(&server).await;
    plant_deletion(9, 204).expect(0).mount(&server).await;
    plant_deletion(10, 204).expect(0).mount(&server).await;

    let store = store_for(&config_for(&server));
    let report = FixtureCleanup::new(store, Duration::from_secs(2)).unwrap().run().await;

    assert_eq!(report.deleted, vec![5]);
    assert_eq!(report.skipped_reason, None);
}

#[tokio::test]
async fn test_failed_deletion_is_recorded_and_others_continue() {
    let server = MockServer::start().await;
    admin_login(ADMIN_TOKEN).mount(&server).await;
    plant_listing(ADMIN_TOKEN, json!([{ "id": 7, "name": "Orchid" }, { "id": 8, "name": "test rose" }]))
        .mount(&server)
        .await;
    plant_deletion(7, 500).expect(1).mount(&server).await;
    plant_deletion(8, 204).expect(1).mount(&server).await;

    let store = store_for(&config_for(&server));
    let report = FixtureCleanup::new(store, Duration::from_secs(2)).unwrap().run().await;

    assert_eq!(report.failed, vec![7]);
    assert_eq!(report.deleted, vec![8]);
}

#[tokio::test]
async fn test_no_token_skips_cleanup() {
    let server = MockServer::start().await;
    login_mock("admin", "admin123", 401, json!({})).mount(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/plants"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let store = store_for(&config_for(&server));
    let report = FixtureCleanup::new(store, Duration::from_secs(2)).unwrap().run().await;

    assert!(report.skipped_reason.is_some());
    assert!(report.deleted.is_empty());
}

#[tokio::test]
async fn test_listing_failure_skips_cleanup() {
    let server = MockServer::start().await;
    admin_login(ADMIN_TOKEN).mount(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/plants"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let store = store_for(&config_for(&server));
    let report = FixtureCleanup::new(store, Duration::from_secs(2)).unwrap().run().await;

    assert!(report.skipped_reason.is_some());
    assert!(report.deleted.is_empty() && report.failed.is_empty());
}
