//! API integration tests against a running server

use reqwest::Client;
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8080/api/v1";

/// Booking link seeded in the target database, if any
fn seeded_link() -> Option<String> {
    std::env::var("MEETLINK_TEST_LINK_ID").ok()
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_readiness_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/ready", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
#[ignore]
async fn test_unknown_booking_link() {
    let client = Client::new();

    let response = client
        .get(format!(
            "{}/booking-links/00000000-0000-0000-0000-000000000000/slots?date=2030-01-07&timezone=UTC",
            BASE_URL
        ))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 404);
}

#[tokio::test]
#[ignore]
async fn test_list_slots_and_calendar() {
    let Some(link_id) = seeded_link() else {
        return;
    };
    let client = Client::new();

    let response = client
        .get(format!("{}/booking-links/{}/slots", BASE_URL, link_id))
        .query(&[("date", "2030-01-07"), ("timezone", "Europe/Paris")])
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["slots"].is_array());
    assert_eq!(body["timezone"], "Europe/Paris");

    let response = client
        .get(format!("{}/booking-links/{}/calendar", BASE_URL, link_id))
        .query(&[("start_date", "2030-01-07"), ("timezone", "UTC"), ("days", "3")])
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body.as_array().map(Vec::len), Some(3));
}

#[tokio::test]
#[ignore]
async fn test_invalid_timezone_is_rejected() {
    let Some(link_id) = seeded_link() else {
        return;
    };
    let client = Client::new();

    let response = client
        .get(format!("{}/booking-links/{}/slots", BASE_URL, link_id))
        .query(&[("date", "2030-01-07"), ("timezone", "Mars/Olympus")])
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 400);
}

#[tokio::test]
#[ignore]
async fn test_submit_lead() {
    let Some(link_id) = seeded_link() else {
        return;
    };
    let client = Client::new();

    let response = client
        .post(format!("{}/booking-links/{}/leads", BASE_URL, link_id))
        .json(&json!({
            "name": "Integration Test",
            "email": "integration@example.org",
            "form_responses": {}
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["lead_id"].is_string());
    assert!(body["qualified"].is_boolean());
}

#[tokio::test]
#[ignore]
async fn test_openapi_document() {
    let client = Client::new();

    let response = client
        .get("http://localhost:8080/api-docs/openapi.json")
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["paths"]["/booking-links/{id}/slots"].is_object());
}
