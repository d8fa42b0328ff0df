//! HTTP routes driven in-process over the in-memory store

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use meetlink_server::{
    api,
    config::{AppConfig, DatabaseConfig, EmailConfig, LoggingConfig, SchedulingConfig, ServerConfig, StoreBackend},
    models::{
        booking_link::{AssignmentType, BookingLink, LinkHost},
        rule::{RoutingRule, RuleOperator},
    },
    repository::memory::MemoryStore,
    scheduling::StandardWorkingHours,
    services::{clock::FixedClock, notifications::LogNotifier, Collaborators, Services},
    AppState,
};

struct App {
    router: Router,
    store: Arc<MemoryStore>,
    clock: Arc<FixedClock>,
}

fn app() -> App {
    let config = AppConfig {
        server: ServerConfig::default(),
        database: DatabaseConfig {
            backend: StoreBackend::Memory,
            ..DatabaseConfig::default()
        },
        logging: LoggingConfig::default(),
        email: EmailConfig::default(),
        scheduling: SchedulingConfig::default(),
    };

    let store = Arc::new(MemoryStore::new());
    // Monday 2026-03-02 07:00 UTC
    let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2026, 3, 2, 7, 0, 0).unwrap()));
    let services = Services::new(
        Collaborators {
            store: store.clone(),
            working_hours: Arc::new(StandardWorkingHours::default()),
            notifier: Arc::new(LogNotifier),
            history: store.clone(),
            clock: clock.clone(),
        },
        &config.scheduling,
    );

    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };
    App {
        router: api::create_router(state),
        store,
        clock,
    }
}

async fn seeded_link(store: &MemoryStore) -> (BookingLink, Uuid) {
    let host = Uuid::new_v4();
    let link = BookingLink::new(Uuid::new_v4(), "product-demo", 30);
    store.insert_link(link.clone(), vec![LinkHost::active(host, 0)]).await;
    (link, host)
}

async fn send(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn booking_body(start: &str, email: &str) -> Value {
    json!({
        "start_time": start,
        "timezone": "UTC",
        "name": "Dorothy Vaughan",
        "email": email,
    })
}

#[tokio::test]
async fn test_health_and_readiness() {
    let app = app();

    let (status, body) = send(&app.router, Method::GET, "/api/v1/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = send(&app.router, Method::GET, "/api/v1/ready", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_slots_in_invitee_timezone() {
    let app = app();
    let (link, _) = seeded_link(&app.store).await;

    let uri = format!(
        "/api/v1/booking-links/{}/slots?date=2026-03-03&timezone=Europe/Paris",
        link.id
    );
    let (status, body) = send(&app.router, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["timezone"], "Europe/Paris");
    // 09:00 Paris is 08:00 UTC in winter
    assert_eq!(body["slots"][0]["start"], "2026-03-03T08:00:00Z");
    assert_eq!(body["slots"].as_array().unwrap().len(), 16);
}

#[tokio::test]
async fn test_input_errors_map_to_status_codes() {
    let app = app();
    let (link, _) = seeded_link(&app.store).await;

    let uri = format!("/api/v1/booking-links/{}/slots?date=03/03/2026&timezone=UTC", link.id);
    let (status, body) = send(&app.router, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "InvalidDate");

    let uri = format!("/api/v1/booking-links/{}/calendar?start_date=2026-03-03&timezone=UTC&days=0", link.id);
    let (status, _) = send(&app.router, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let uri = format!("/api/v1/booking-links/{}", Uuid::new_v4());
    let (status, _) = send(&app.router, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_calendar_and_slot_check() {
    let app = app();
    let (link, _) = seeded_link(&app.store).await;

    let uri = format!(
        "/api/v1/booking-links/{}/calendar?start_date=2026-03-06&timezone=UTC&days=3",
        link.id
    );
    let (status, body) = send(&app.router, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    let days = body.as_array().unwrap();
    assert_eq!(days.len(), 3);
    assert_eq!(days[0]["has_availability"], true);
    // Saturday and Sunday
    assert_eq!(days[1]["slots_available"], 0);
    assert_eq!(days[2]["slots_available"], 0);

    let uri = format!(
        "/api/v1/booking-links/{}/slots/check?start=2026-03-03T10:00:00Z&timezone=UTC",
        link.id
    );
    let (status, body) = send(&app.router, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["available"], true);
}

#[tokio::test]
async fn test_booking_lifecycle_over_http() {
    let app = app();
    let (link, host) = seeded_link(&app.store).await;

    let uri = format!("/api/v1/booking-links/{}/bookings", link.id);
    let (status, body) = send(
        &app.router,
        Method::POST,
        &uri,
        Some(booking_body("2026-03-03T10:00:00Z", "dorothy@langley.gov")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["booking"]["assigned_host_id"], host.to_string());
    assert_eq!(body["booking"]["status"], "scheduled");
    let booking_id = body["booking"]["id"].as_str().unwrap().to_string();

    // Second request for the same slot
    let (status, body) = send(
        &app.router,
        Method::POST,
        &uri,
        Some(booking_body("2026-03-03T10:00:00Z", "mary@langley.gov")),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "SlotNoLongerAvailable");

    let (status, body) = send(
        &app.router,
        Method::POST,
        &format!("/api/v1/bookings/{}/reschedule", booking_id),
        Some(json!({ "new_start": "2026-03-03T14:00:00Z", "timezone": "UTC" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["booking"]["status"], "rescheduled");
    assert_eq!(body["calendar_event"]["start_time"], "2026-03-03T14:00:00Z");

    // The outcome waits for the meeting
    let outcome_uri = format!("/api/v1/bookings/{}/outcome", booking_id);
    let (status, _) = send(
        &app.router,
        Method::POST,
        &outcome_uri,
        Some(json!({ "outcome": "completed", "closed_won": true })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    app.clock.set(Utc.with_ymd_and_hms(2026, 3, 3, 15, 0, 0).unwrap());
    let (status, body) = send(
        &app.router,
        Method::POST,
        &outcome_uri,
        Some(json!({ "outcome": "completed", "closed_won": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "completed");
    assert_eq!(body["closed_won"], true);

    let uri = format!(
        "/api/v1/booking-links/{}/analytics?from=2026-03-01T00:00:00Z&to=2026-03-31T00:00:00Z",
        link.id
    );
    let (status, body) = send(&app.router, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["completed"], 1);
}

#[tokio::test]
async fn test_booking_cannot_name_an_outside_host() {
    let app = app();
    let (link, _) = seeded_link(&app.store).await;

    let mut body = booking_body("2026-03-03T10:00:00Z", "grace@langley.gov");
    body["assigned_host_id"] = json!(Uuid::new_v4());
    let (status, body) = send(
        &app.router,
        Method::POST,
        &format!("/api/v1/booking-links/{}/bookings", link.id),
        Some(body),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BadValue");
}

#[tokio::test]
async fn test_cancel_twice_is_a_conflict() {
    let app = app();
    let (link, _) = seeded_link(&app.store).await;

    let (_, body) = send(
        &app.router,
        Method::POST,
        &format!("/api/v1/booking-links/{}/bookings", link.id),
        Some(booking_body("2026-03-04T09:00:00Z", "annie@langley.gov")),
    )
    .await;
    let cancel_uri = format!("/api/v1/bookings/{}/cancel", body["booking"]["id"].as_str().unwrap());
    let cancel = json!({ "reason": "Travel", "cancelled_by": "invitee" });

    let (status, body) = send(&app.router, Method::POST, &cancel_uri, Some(cancel.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "cancelled");
    assert_eq!(body["cancellation_reason"], "Travel");

    let (status, _) = send(&app.router, Method::POST, &cancel_uri, Some(cancel)).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_lead_submission_and_assignment_preview() {
    let app = app();
    let enterprise_rep = Uuid::new_v4();
    let mut link = BookingLink::new(Uuid::new_v4(), "sales", 30);
    link.assignment_type = AssignmentType::RoundRobin;
    link.qualification.require_business_email = true;
    link.routing_rules = vec![RoutingRule {
        question_ref: "company_size".to_string(),
        operator: RuleOperator::GreaterThan,
        value: "500".to_string(),
        outcome: enterprise_rep,
    }];
    app.store
        .insert_link(link.clone(), vec![LinkHost::active(Uuid::new_v4(), 0)])
        .await;

    let uri = format!("/api/v1/booking-links/{}/leads", link.id);
    let (status, body) = send(
        &app.router,
        Method::POST,
        &uri,
        Some(json!({ "name": "Mae", "email": "mae@gmail.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["qualified"], false);

    let (status, body) = send(
        &app.router,
        Method::POST,
        "/api/v1/assignments/preview",
        Some(json!({
            "booking_link_id": link.id,
            "form_responses": { "company_size": 2000 }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["host_id"], enterprise_rep.to_string());
    assert_eq!(body["strategy"], "round_robin");
}
