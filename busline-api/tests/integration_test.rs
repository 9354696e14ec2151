use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use busline_api::{app, AppState, AuthConfig};
use busline_catalog::Trip;
use busline_core::{LogPublisher, TripRepository};
use busline_store::app_config::BusinessRules;
use busline_store::seed::demo_trips;
use busline_store::InMemoryStore;
use chrono::Utc;
use serde_json::{json, Value};
use tower::ServiceExt;

struct TestApp {
    router: Router,
    trips: Vec<Trip>,
}

async fn setup() -> TestApp {
    let store = Arc::new(InMemoryStore::new());
    let trips = demo_trips(Utc::now());
    for trip in &trips {
        store.insert_trip(trip).await.unwrap();
    }
    let state = AppState::new(
        store.clone(),
        store,
        Arc::new(LogPublisher),
        AuthConfig { secret: "test-secret".into(), expiration: 3600 },
        BusinessRules::default(),
    );
    TestApp { router: app(state), trips }
}

impl TestApp {
    async fn call(&self, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            req = req.header("authorization", format!("Bearer {}", token));
        }
        let req = match body {
            Some(body) => req
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };

        let resp = self.router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn register(&self, name: &str, email: &str) -> String {
        let (status, body) = self
            .call(
                "POST",
                "/api/auth/register",
                None,
                Some(json!({"name": name, "email": email, "password": "secret1"})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["token"].as_str().unwrap().to_string()
    }
}

#[tokio::test]
async fn test_health() {
    let app = setup().await;
    let (status, body) = app.call("GET", "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "OK");
}

#[tokio::test]
async fn test_authentication_flow() {
    let app = setup().await;
    let token = app.register("Ravi Kumar", "Ravi@Example.com").await;

    let (status, body) = app.call("GET", "/api/auth/profile", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], "ravi@example.com");
    assert_eq!(
        body["user"]["avatarUrl"],
        "https://api.dicebear.com/8.x/initials/svg?seed=Ravi%20Kumar"
    );

    let dup = json!({"name": "Ravi", "email": "ravi@example.com", "password": "secret1"});
    let (status, body) = app.call("POST", "/api/auth/register", None, Some(dup)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "User already exists with this email");

    let short = json!({"name": "Asha", "email": "asha@example.com", "password": "123"});
    let (status, _) = app.call("POST", "/api/auth/register", None, Some(short)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let wrong = json!({"email": "ravi@example.com", "password": "nope123"});
    let (status, body) = app.call("POST", "/api/auth/login", None, Some(wrong)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid email or password");

    let right = json!({"email": "RAVI@example.com", "password": "secret1"});
    let (status, body) = app.call("POST", "/api/auth/login", None, Some(right)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["token"].as_str().is_some());
}

#[tokio::test]
async fn test_protected_routes_need_a_valid_token() {
    let app = setup().await;

    let (status, body) = app.call("GET", "/api/bookings/user", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "No token provided");

    let (status, body) = app.call("GET", "/api/auth/profile", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid token");
}

#[tokio::test]
async fn test_search_trips() {
    let app = setup().await;
    let date = Utc::now().date_naive().format("%Y-%m-%d");

    let uri = format!("/api/trips/search?from=hubli&to=BENGALURU&date={}", date);
    let (status, body) = app.call("GET", &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    let first = body["trips"][0]["startTime"].as_str().unwrap().to_string();
    let second = body["trips"][1]["startTime"].as_str().unwrap().to_string();
    assert!(first <= second);

    let (status, body) = app.call("GET", "/api/trips/search?from=Hubli", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "From, to, and date are required");
}

#[tokio::test]
async fn test_trip_and_seat_map() {
    let app = setup().await;
    let trip = &app.trips[2];

    let (status, body) = app.call("GET", &format!("/api/trips/{}", trip.id), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["trip"]["fare"], 550);
    assert_eq!(body["trip"]["bus"]["type"], "Non-AC Seater");

    let (status, body) = app.call("GET", &format!("/api/trips/{}/seat-map", trip.id), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["aisleColumn"], 2);
    assert_eq!(body["sleeper"], false);
    let grid = body["grid"].as_array().unwrap();
    assert_eq!(grid.len(), 13);
    assert_eq!(grid[0].as_array().unwrap().len(), 5);
    assert_eq!(grid[0][2]["kind"], "aisle");
    assert_eq!(grid[0][0]["id"], "A1");
    assert_eq!(grid[0][3]["id"], "A3");

    let missing = format!("/api/trips/{}", uuid::Uuid::new_v4());
    let (status, _) = app.call("GET", &missing, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_booking_lifecycle() {
    let app = setup().await;
    let trip = app.trips[2].clone();
    let token = app.register("Asha", "asha@example.com").await;

    let req = json!({"tripId": trip.id, "seats": ["A1", "A3"]});
    let (status, body) = app.call("POST", "/api/bookings", Some(&token), Some(req.clone())).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["booking"]["status"], "CONFIRMED");
    assert_eq!(body["booking"]["totalAmount"], 1100);
    assert_eq!(body["booking"]["trip"]["seatsAvailable"], trip.seats_available - 2);
    let booking_id = body["booking"]["id"].as_str().unwrap().to_string();

    // Same seats again.
    let (status, body) = app.call("POST", "/api/bookings", Some(&token), Some(req)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Seat A1 is already booked");

    let (status, body) = app.call("GET", "/api/bookings/user", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);

    let cancel = format!("/api/bookings/{}/cancel", booking_id);
    let (status, body) = app.call("PATCH", &cancel, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["booking"]["status"], "CANCELLED");
    assert_eq!(body["message"], "Booking cancelled successfully");

    let (status, _) = app.call("PATCH", &cancel, Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = app.call("GET", &format!("/api/trips/{}", trip.id), None, None).await;
    assert_eq!(body["trip"]["seatsAvailable"], trip.seats_available);
}

#[tokio::test]
async fn test_booking_validation() {
    let app = setup().await;
    let trip = app.trips[2].clone();
    let token = app.register("Asha", "asha@example.com").await;

    let (status, body) = app.call("POST", "/api/bookings", Some(&token), Some(json!({"seats": ["A1"]}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "tripId and seats array are required");

    let empty = json!({"tripId": trip.id, "seats": []});
    let (status, body) = app.call("POST", "/api/bookings", Some(&token), Some(empty)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No seats selected");

    let unknown = json!({"tripId": trip.id, "seats": ["Z9"]});
    let (status, _) = app.call("POST", "/api/bookings", Some(&token), Some(unknown)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let too_many = json!({"tripId": trip.id, "seats": ["A1", "A2", "A3", "A4", "A6", "A7", "A8"]});
    let (status, _) = app.call("POST", "/api/bookings", Some(&token), Some(too_many)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_bookings_are_private() {
    let app = setup().await;
    let trip = app.trips[2].clone();
    let owner = app.register("Asha", "asha@example.com").await;
    let other = app.register("Ravi", "ravi@example.com").await;

    let req = json!({"tripId": trip.id, "seats": ["A2"]});
    let (_, body) = app.call("POST", "/api/bookings", Some(&owner), Some(req)).await;
    let id = body["booking"]["id"].as_str().unwrap().to_string();

    let (status, _) = app.call("GET", &format!("/api/bookings/{}", id), Some(&other), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.call("PATCH", &format!("/api/bookings/{}/cancel", id), Some(&other), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app.call("GET", &format!("/api/bookings/{}", id), Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["booking"]["seats"][0]["seatId"], "A2");
}

#[tokio::test]
async fn test_hold_then_confirm() {
    let app = setup().await;
    let trip = app.trips[1].clone();
    let token = app.register("Asha", "asha@example.com").await;

    let req = json!({"tripId": trip.id, "seats": ["S2"], "hold": true});
    let (status, body) = app.call("POST", "/api/bookings", Some(&token), Some(req)).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["booking"]["status"], "HOLD");
    assert!(body["booking"]["expiresAt"].is_string());
    let id = body["booking"]["id"].as_str().unwrap().to_string();

    let confirm = format!("/api/bookings/{}/confirm", id);
    let (status, body) = app.call("POST", &confirm, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["booking"]["status"], "CONFIRMED");

    let (status, _) = app.call("POST", &confirm, Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_operator_trip_management() {
    let app = setup().await;
    let token = app.register("Operator", "ops@example.com").await;
    let template = serde_json::to_value(&app.trips[0]).unwrap();

    let mut draft = template.clone();
    draft["fare"] = json!(900);
    let (status, body) = app.call("POST", "/api/trips", Some(&token), Some(draft)).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["trip"]["fare"], 900);
    assert_eq!(body["trip"]["version"], 0);
    let id = body["trip"]["id"].as_str().unwrap().to_string();
    assert_ne!(id, app.trips[0].id.to_string());

    let mut bad = template;
    bad["fare"] = json!(-10);
    let (status, _) = app.call("POST", "/api/trips", Some(&token), Some(bad)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let seats = json!({"seatIds": ["A1"], "status": "booked"});
    let (status, body) = app.call("PATCH", &format!("/api/trips/{}/seats", id), Some(&token), Some(seats)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["trip"]["version"], 1);

    let selected = json!({"seatIds": ["A2"], "status": "selected"});
    let (status, _) = app.call("PATCH", &format!("/api/trips/{}/seats", id), Some(&token), Some(selected)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let update = json!({"status": "completed"});
    let (status, body) = app.call("PUT", &format!("/api/trips/{}", id), Some(&token), Some(update)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["trip"]["status"], "completed");

    let (status, _) = app.call("POST", "/api/trips", None, Some(json!({}))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
