use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use chrono::{Days, NaiveDate};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;
use ulid::Ulid;

use innkeep::api::actor::{USER_ID_HEADER, USER_ROLE_HEADER};
use innkeep::api::{AppState, build_router};
use innkeep::engine::{Engine, today};
use innkeep::model::{OccupancyPolicy, RoomInfo};
use innkeep::rooms::InMemoryRooms;

// ── Test infrastructure ──────────────────────────────────────

struct TestApp {
    router: Router,
    owner_id: Ulid,
    room_id: Ulid,
}

fn start_test_app() -> TestApp {
    let dir = std::env::temp_dir().join(format!("innkeep_int_test_{}", Ulid::new()));
    std::fs::create_dir_all(&dir).unwrap();

    let rooms = Arc::new(InMemoryRooms::new());
    let owner_id = Ulid::new();
    let room_id = Ulid::new();
    rooms.upsert(RoomInfo {
        id: room_id,
        resort_id: Ulid::new(),
        owner_id,
        nightly_rate: 100,
        capacity: 2,
        deleted: false,
    });

    let engine = Engine::new(dir.join("reservations.wal"), rooms, OccupancyPolicy::ApprovedOnly)
        .unwrap();
    let router = build_router(AppState {
        engine: Arc::new(engine),
    });
    TestApp {
        router,
        owner_id,
        room_id,
    }
}

fn days_ahead(n: u64) -> NaiveDate {
    today() + Days::new(n)
}

enum As {
    Anonymous,
    Customer(Ulid),
    Owner(Ulid),
}

impl TestApp {
    async fn call(&self, method: Method, uri: &str, who: As, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        match who {
            As::Anonymous => {}
            As::Customer(id) => {
                builder = builder
                    .header(USER_ID_HEADER, id.to_string())
                    .header(USER_ROLE_HEADER, "customer");
            }
            As::Owner(id) => {
                builder = builder
                    .header(USER_ID_HEADER, id.to_string())
                    .header(USER_ROLE_HEADER, "owner");
            }
        }
        let request = match body {
            Some(v) => builder
                .header("content-type", "application/json")
                .body(Body::from(v.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn create(&self, customer: Ulid, start: NaiveDate, end: NaiveDate) -> (StatusCode, Value) {
        let body = json!({
            "room_id": self.room_id.to_string(),
            "start_date": start.to_string(),
            "end_date": end.to_string(),
        });
        self.call(Method::POST, "/", As::Customer(customer), Some(body)).await
    }

    async fn decide(&self, id: &str, status: &str) -> (StatusCode, Value) {
        self.call(
            Method::PUT,
            &format!("/{id}/status"),
            As::Owner(self.owner_id),
            Some(json!({ "status": status })),
        )
        .await
    }
}

fn reservation_id(body: &Value) -> String {
    body["reservation"]["id"].as_str().unwrap().to_string()
}

// ── Tests ────────────────────────────────────────────────────

#[tokio::test]
async fn health_is_public() {
    let app = start_test_app();
    let (status, body) = app.call(Method::GET, "/health", As::Anonymous, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn create_returns_pending_with_price() {
    let app = start_test_app();
    let customer = Ulid::new();
    let (start, end) = (days_ahead(10), days_ahead(13));

    let (status, body) = app.create(customer, start, end).await;
    assert_eq!(status, StatusCode::CREATED);
    let r = &body["reservation"];
    assert_eq!(r["status"], "pending");
    assert_eq!(r["total_price"], 300);
    assert_eq!(r["start_date"], start.to_string());
    assert_eq!(r["end_date"], end.to_string());
    assert_eq!(r["customer_id"], customer.to_string());
    assert_eq!(r["deleted"], false);
}

#[tokio::test]
async fn overlapping_create_after_approval_conflicts() {
    let app = start_test_app();
    let (_, body) = app.create(Ulid::new(), days_ahead(10), days_ahead(13)).await;
    let id = reservation_id(&body);
    let (status, body) = app.decide(&id, "approved").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reservation"]["status"], "approved");

    let (status, body) = app.create(Ulid::new(), days_ahead(11), days_ahead(12)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "CONFLICT");

    // Checkout day is free for the next guest.
    let (status, _) = app.create(Ulid::new(), days_ahead(13), days_ahead(15)).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn create_rejects_bad_dates() {
    let app = start_test_app();
    let customer = Ulid::new();

    let (status, body) = app.create(customer, days_ahead(5), days_ahead(5)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "INVALID_INTERVAL");

    let (status, _) = app.create(customer, days_ahead(5), days_ahead(3)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let yesterday = today() - Days::new(1);
    let (status, body) = app.create(customer, yesterday, days_ahead(2)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");

    let garbage = json!({
        "room_id": app.room_id.to_string(),
        "start_date": "next tuesday",
        "end_date": days_ahead(3).to_string(),
    });
    let (status, _) = app.call(Method::POST, "/", As::Customer(customer), Some(garbage)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn create_accepts_rfc3339_dates() {
    let app = start_test_app();
    let body = json!({
        "room_id": app.room_id.to_string(),
        "start_date": format!("{}T00:00:00Z", days_ahead(20)),
        "end_date": format!("{}T00:00:00Z", days_ahead(22)),
    });
    let (status, body) = app.call(Method::POST, "/", As::Customer(Ulid::new()), Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["reservation"]["total_price"], 200);
}

#[tokio::test]
async fn missing_identity_is_unauthenticated() {
    let app = start_test_app();
    let (status, body) = app.call(Method::GET, "/", As::Anonymous, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "UNAUTHENTICATED");
}

#[tokio::test]
async fn only_room_owner_can_decide() {
    let app = start_test_app();
    let (_, body) = app.create(Ulid::new(), days_ahead(10), days_ahead(12)).await;
    let id = reservation_id(&body);

    let stranger = Ulid::new();
    let (status, _) = app
        .call(
            Method::PUT,
            &format!("/{id}/status"),
            As::Owner(stranger),
            Some(json!({ "status": "approved" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.decide(&id, "rejected").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reservation"]["status"], "rejected");

    // Rejected is terminal.
    let (status, body) = app.decide(&id, "approved").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "INVALID_TRANSITION");
}

#[tokio::test]
async fn owners_cannot_create_reservations() {
    let app = start_test_app();
    let body = json!({
        "room_id": app.room_id.to_string(),
        "start_date": days_ahead(10).to_string(),
        "end_date": days_ahead(12).to_string(),
    });
    let (status, body) = app
        .call(Method::POST, "/", As::Owner(app.owner_id), Some(body))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "FORBIDDEN");

    let (_, body) = app.call(Method::GET, "/", As::Owner(app.owner_id), None).await;
    assert_eq!(body["reservations"], json!([]));
}

#[tokio::test]
async fn status_body_only_accepts_decisions() {
    let app = start_test_app();
    let (_, body) = app.create(Ulid::new(), days_ahead(10), days_ahead(12)).await;
    let id = reservation_id(&body);
    let (status, _) = app.decide(&id, "completed").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_room_and_reservation_are_not_found() {
    let app = start_test_app();
    let body = json!({
        "room_id": Ulid::new().to_string(),
        "start_date": days_ahead(3).to_string(),
        "end_date": days_ahead(4).to_string(),
    });
    let (status, _) = app.call(Method::POST, "/", As::Customer(Ulid::new()), Some(body)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .call(Method::GET, &format!("/{}", Ulid::new()), As::Customer(Ulid::new()), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .call(Method::GET, "/not-a-ulid", As::Customer(Ulid::new()), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn availability_reports_quote() {
    let app = start_test_app();
    let (start, end) = (days_ahead(30), days_ahead(33));
    let uri = format!("/availability/{}?start_date={start}&end_date={end}", app.room_id);

    let (status, body) = app.call(Method::GET, &uri, As::Anonymous, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["available"], true);
    assert_eq!(body["booking_details"]["nights"], 3);
    assert_eq!(body["booking_details"]["total_price"], 300);

    let (_, created) = app.create(Ulid::new(), start, end).await;
    app.decide(&reservation_id(&created), "approved").await;

    let (_, body) = app.call(Method::GET, &uri, As::Anonymous, None).await;
    assert_eq!(body["available"], false);

    let missing = format!("/availability/{}", app.room_id);
    let (status, _) = app.call(Method::GET, &missing, As::Anonymous, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn booked_dates_lists_occupied_nights() {
    let app = start_test_app();
    let (start, end) = (days_ahead(40), days_ahead(42));
    let uri = format!("/booked-dates/{}", app.room_id);

    let (_, created) = app.create(Ulid::new(), start, end).await;
    let (_, body) = app.call(Method::GET, &uri, As::Anonymous, None).await;
    assert_eq!(body["booked_dates"], json!([]), "pending does not occupy");

    app.decide(&reservation_id(&created), "approved").await;
    let (status, body) = app.call(Method::GET, &uri, As::Anonymous, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["booked_dates"][0]["start_date"], start.to_string());
    assert_eq!(body["booked_dates"][0]["status"], "approved");
    assert_eq!(
        body["dates"],
        json!([start.to_string(), days_ahead(41).to_string()])
    );
}

#[tokio::test]
async fn customer_cannot_cancel_once_approved() {
    let app = start_test_app();
    let customer = Ulid::new();

    let (_, pending) = app.create(customer, days_ahead(10), days_ahead(11)).await;
    let pending_id = reservation_id(&pending);
    let (status, body) = app
        .call(Method::DELETE, &format!("/{pending_id}"), As::Customer(customer), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reservation"]["status"], "cancelled");

    let (_, approved) = app.create(customer, days_ahead(20), days_ahead(21)).await;
    let approved_id = reservation_id(&approved);
    app.decide(&approved_id, "approved").await;
    let (status, body) = app
        .call(Method::DELETE, &format!("/{approved_id}"), As::Customer(customer), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "CANCEL_NOT_ALLOWED");

    // The owner still can.
    let (status, _) = app
        .call(Method::DELETE, &format!("/{approved_id}"), As::Owner(app.owner_id), None)
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn manual_complete_waits_for_start() {
    let app = start_test_app();
    let (_, created) = app.create(Ulid::new(), days_ahead(10), days_ahead(12)).await;
    let id = reservation_id(&created);

    let (status, body) = app
        .call(Method::PUT, &format!("/{id}/complete"), As::Owner(app.owner_id), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "pending cannot complete");
    assert_eq!(body["error"], "INVALID_TRANSITION");

    app.decide(&id, "approved").await;
    let (status, body) = app
        .call(Method::PUT, &format!("/{id}/complete"), As::Owner(app.owner_id), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "NOT_YET_STARTED");
}

#[tokio::test]
async fn listings_are_scoped_by_role() {
    let app = start_test_app();
    let alice = Ulid::new();
    let bob = Ulid::new();
    app.create(alice, days_ahead(10), days_ahead(11)).await;
    app.create(alice, days_ahead(12), days_ahead(13)).await;
    app.create(bob, days_ahead(14), days_ahead(15)).await;

    let (_, body) = app.call(Method::GET, "/", As::Customer(alice), None).await;
    assert_eq!(body["reservations"].as_array().unwrap().len(), 2);

    let (_, body) = app.call(Method::GET, "/", As::Owner(app.owner_id), None).await;
    assert_eq!(body["reservations"].as_array().unwrap().len(), 3);

    let (_, body) = app.call(Method::GET, "/", As::Owner(Ulid::new()), None).await;
    assert_eq!(body["reservations"], json!([]));
}

#[tokio::test]
async fn archive_hides_terminal_reservation() {
    let app = start_test_app();
    let customer = Ulid::new();
    let (_, created) = app.create(customer, days_ahead(10), days_ahead(11)).await;
    let id = reservation_id(&created);

    let (status, _) = app
        .call(Method::DELETE, &format!("/{id}/record"), As::Customer(customer), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT, "pending is not terminal");

    app.call(Method::DELETE, &format!("/{id}"), As::Customer(customer), None).await;
    let (status, body) = app
        .call(Method::DELETE, &format!("/{id}/record"), As::Customer(customer), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reservation"]["deleted"], true);

    let (status, _) = app
        .call(Method::GET, &format!("/{id}"), As::Customer(customer), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn auto_complete_reports_counts() {
    let app = start_test_app();
    app.create(Ulid::new(), days_ahead(10), days_ahead(11)).await;
    let (status, body) = app.call(Method::POST, "/auto-complete", As::Anonymous, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["completedCount"], 0);
    assert_eq!(body["failedCount"], 0);
}
