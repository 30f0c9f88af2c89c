use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::{Path, Query};
use axum::http::{Request, StatusCode};
use axum::routing::get;
use axum::Json;
use eco_logistics::api::rest::router;
use eco_logistics::config::Config;
use eco_logistics::error::AppError;
use eco_logistics::models::emission::{EmissionInput, TransportMode};
use eco_logistics::models::pickup::{NewPickupRequest, PickupEvent, PickupStatus};
use eco_logistics::models::point::GeoPoint;
use eco_logistics::models::route::PathKind;
use eco_logistics::observability::metrics::Metrics;
use eco_logistics::optimizer::{self, OptimizerState};
use eco_logistics::outbound::Collaborators;
use eco_logistics::state::AppState;
use eco_logistics::store::PickupStore;
use eco_logistics::workflow::estimator::EstimateOutcome;
use eco_logistics::workflow::operator::Dashboard;
use eco_logistics::workflow::route::RouteUpdate;
use eco_logistics::workflow::verification::PickupForm;
use serde_json::{json, Value};
use tower::ServiceExt;

fn setup() -> axum::Router {
    router(Arc::new(AppState::new(1024)))
}

fn optimizer_app() -> axum::Router {
    optimizer::router(OptimizerState {
        metrics: Metrics::new(),
        default_weight_kg: 1_000.0,
    })
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn post_empty(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn pickup_body(name: &str) -> Value {
    json!({
        "sellerName": name,
        "phone": "9876543210",
        "email": "seller@example.com",
        "address": "Koramangala, Bengaluru 560034",
        "weight": 120.5,
        "type": "Electronics",
        "lat": 12.9352,
        "lng": 77.6245,
        "date": "2026-10-20"
    })
}

#[tokio::test]
async fn health_returns_ok() {
    let app = setup();
    let response = app.oneshot(get_request("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["requests"], 0);
    assert_eq!(body["pending"], 0);
}

#[tokio::test]
async fn metrics_returns_prometheus_format() {
    let app = setup();
    let response = app.oneshot(get_request("/metrics")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.contains("text/plain"));

    let body = body_string(response).await;
    assert!(body.contains("pending_requests"));
}

#[tokio::test]
async fn request_pickup_returns_pending_record() {
    let app = setup();
    let response = app
        .oneshot(json_request("POST", "/api/request-pickup", pickup_body("Asha")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["sellerName"], "Asha");
    assert_eq!(body["status"], "Pending");
    assert_eq!(body["type"], "Electronics");
    assert_eq!(body["lat"], 12.9352);
    assert_eq!(body["lng"], 77.6245);
    assert_eq!(body["date"], "2026-10-20");
    assert!(body["id"].as_i64().unwrap() > 0);
}

#[tokio::test]
async fn request_pickup_missing_fields_returns_400() {
    let state = Arc::new(AppState::new(1024));
    let app = router(state.clone());

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/request-pickup",
            json!({ "sellerName": "A", "address": "X", "weight": 10 }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "missing required fields: phone, email");

    let response = app.oneshot(get_request("/api/requests")).await.unwrap();
    let list = body_json(response).await;
    assert_eq!(list.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn request_pickup_accepts_unset_date_and_string_numbers() {
    let app = setup();
    let mut payload = pickup_body("Form");
    payload["date"] = json!("");
    payload["weight"] = json!("10");
    payload["phone"] = json!(9876543210_u64);

    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/request-pickup", payload))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["date"].is_null());
    assert_eq!(body["weight"], 10.0);
    assert_eq!(body["phone"], "9876543210");

    let response = app.oneshot(get_request("/api/requests")).await.unwrap();
    assert_eq!(body_json(response).await.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn undecodable_pickup_body_is_a_400_with_error_field() {
    let app = setup();
    let mut payload = pickup_body("Broken");
    payload["date"] = json!("next tuesday");

    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/request-pickup", payload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["error"].is_string());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/request-pickup")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["error"].is_string());
}

#[tokio::test]
async fn list_requests_in_creation_order() {
    let app = setup();
    for name in ["first", "second", "third"] {
        let response = app
            .clone()
            .oneshot(json_request("POST", "/api/request-pickup", pickup_body(name)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app.oneshot(get_request("/api/requests")).await.unwrap();
    let list = body_json(response).await;
    let names: Vec<&str> = list
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["sellerName"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["first", "second", "third"]);
}

#[tokio::test]
async fn accept_request_is_idempotent() {
    let state = Arc::new(AppState::new(1024));
    let mut events = state.pickup_events_tx.subscribe();
    let app = router(state.clone());

    let res = app
        .clone()
        .oneshot(json_request("POST", "/api/request-pickup", pickup_body("Ravi")))
        .await
        .unwrap();
    let created = body_json(res).await;
    let id = created["id"].as_i64().unwrap();

    for _ in 0..2 {
        let res = app
            .clone()
            .oneshot(post_empty(&format!("/api/accept-request/{id}")))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = body_json(res).await;
        assert_eq!(body["status"], "Accepted");
        assert_eq!(body["id"], id);
    }

    let res = app.oneshot(get_request("/health")).await.unwrap();
    let health = body_json(res).await;
    assert_eq!(health["requests"], 1);
    assert_eq!(health["pending"], 0);

    assert!(matches!(events.try_recv().unwrap(), PickupEvent::Created(_)));
    match events.try_recv().unwrap() {
        PickupEvent::Accepted(request) => assert_eq!(request.status, PickupStatus::Accepted),
        other => panic!("expected accepted event, got {other:?}"),
    }
}

#[tokio::test]
async fn accept_unknown_request_returns_404() {
    let app = setup();
    let response = app
        .clone()
        .oneshot(post_empty("/api/accept-request/7"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(post_empty("/api/accept-request/not-a-number"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn optimize_rejects_single_point() {
    let response = optimizer_app()
        .oneshot(json_request(
            "POST",
            "/optimize",
            json!({ "locations": [{ "id": "a", "label": "A", "lat": 1.0, "lng": 1.0 }] }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn optimize_orders_by_nearest_neighbour() {
    let response = optimizer_app()
        .oneshot(json_request(
            "POST",
            "/optimize",
            json!({ "locations": [
                { "id": "depot", "label": "Depot", "lat": 0.0, "lng": 0.0 },
                { "id": "far", "label": "Far", "lat": 0.0, "lng": 2.0 },
                { "id": "near", "label": "Near", "lat": 0.0, "lng": 1.0 }
            ] }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let order: Vec<&str> = body["optimized_route"]
        .as_array()
        .unwrap()
        .iter()
        .map(|stop| stop["id"].as_str().unwrap())
        .collect();
    assert_eq!(order, vec!["depot", "near", "far"]);

    let km = body["stats"]["total_distance_km"].as_f64().unwrap();
    assert!((km - 222.0).abs() < 1e-9);
    assert!(body["stats"]["percent"].as_f64().unwrap() > 30.0);
    assert_eq!(body["logs"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn calculate_manual_compares_against_air() {
    let response = optimizer_app()
        .oneshot(json_request(
            "POST",
            "/calculate-manual",
            json!({ "distance": 100.0, "weight": 2000.0, "mode": "rail" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!((body["emission_kg"].as_f64().unwrap() - 4.0).abs() < 1e-9);
    assert!((body["baseline_kg"].as_f64().unwrap() - 100.0).abs() < 1e-9);
    assert!((body["savings_kg"].as_f64().unwrap() - 96.0).abs() < 1e-9);
}

#[tokio::test]
async fn calculate_manual_accepts_form_strings() {
    let response = optimizer_app()
        .oneshot(json_request(
            "POST",
            "/calculate-manual",
            json!({ "distance": "100", "weight": "2000", "mode": "rail" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!((body["emission_kg"].as_f64().unwrap() - 4.0).abs() < 1e-9);
    assert!((body["savings_kg"].as_f64().unwrap() - 96.0).abs() < 1e-9);

    let response = optimizer_app()
        .oneshot(json_request("POST", "/calculate-manual", json!({ "mode": "air" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["emission_kg"], 0.0);
}

#[tokio::test]
async fn calculate_manual_rejects_non_numeric_distance_as_400() {
    let response = optimizer_app()
        .oneshot(json_request(
            "POST",
            "/calculate-manual",
            json!({ "distance": "far", "weight": 10 }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["error"].is_string());
}

#[tokio::test]
async fn optimize_accepts_numeric_ids_and_echoes_extra_fields() {
    let response = optimizer_app()
        .oneshot(json_request(
            "POST",
            "/optimize",
            json!({ "locations": [
                { "id": 1, "lat": 0, "lng": 0, "seller": "Kiran" },
                { "id": 1712345678901_i64, "lat": 0, "lng": 1 }
            ] }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let route = body["optimized_route"].as_array().unwrap();
    assert_eq!(route[0]["id"], "1");
    assert_eq!(route[0]["seller"], "Kiran");
    assert_eq!(route[1]["id"], "1712345678901");
}

async fn serve(app: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// OSRM stand-in answering with the waypoints themselves as geometry.
fn fake_osrm() -> axum::Router {
    axum::Router::new().route(
        "/route/v1/driving/:coords",
        get(|Path(coords): Path<String>| async move {
            let coordinates: Vec<[f64; 2]> = coords
                .split(';')
                .map(|pair| {
                    let (lng, lat) = pair.split_once(',').unwrap();
                    [lng.parse().unwrap(), lat.parse().unwrap()]
                })
                .collect();
            Json(json!({
                "code": "Ok",
                "routes": [{
                    "distance": 98_765.0,
                    "geometry": { "type": "LineString", "coordinates": coordinates }
                }]
            }))
        }),
    )
}

fn broken_osrm() -> axum::Router {
    axum::Router::new().route(
        "/route/v1/driving/:coords",
        get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "overloaded") }),
    )
}

fn fake_nominatim() -> axum::Router {
    axum::Router::new().route(
        "/search",
        get(|Query(params): Query<HashMap<String, String>>| async move {
            let places = match params.get("q").map(String::as_str) {
                Some("560034") => json!([
                    { "display_name": "Koramangala, Bengaluru", "lat": "12.9352", "lon": "77.6245" }
                ]),
                Some("Springfield") => json!([
                    { "display_name": "Springfield, IL", "lat": "39.78", "lon": "-89.65" },
                    { "display_name": "Springfield, MA", "lat": "42.10", "lon": "-72.59" }
                ]),
                _ => json!([]),
            };
            Json(places)
        }),
    )
}

fn config(store_url: String, optimizer_url: String, router_url: String, geocoder_url: String) -> Config {
    Config {
        http_port: 0,
        optimizer_port: 0,
        log_level: "info".to_string(),
        event_buffer_size: 64,
        store_url,
        optimizer_url,
        router_url,
        geocoder_url,
        http_timeout: Duration::from_secs(2),
        poll_interval: Duration::from_millis(25),
        debounce: Duration::from_millis(40),
        geocode_limit: 5,
        default_shipment_weight_kg: 1_000.0,
    }
}

#[tokio::test]
async fn seller_to_operator_flow_over_http() {
    let store_url = serve(setup()).await;
    let optimizer_url = serve(optimizer_app()).await;
    let router_url = serve(fake_osrm()).await;
    let geocoder_url = serve(fake_nominatim()).await;
    let config = config(store_url, optimizer_url, router_url, geocoder_url);
    let collaborators = Collaborators::from_config(&config).unwrap();

    let mut form = PickupForm::new("560034");
    form.seller_name = "Asha Electronics".to_string();
    form.phone = "9876543210".to_string();
    form.email = "asha@example.com".to_string();
    form.weight = Some(120.0);

    let blocked = form.submit(collaborators.store.as_ref()).await;
    assert_eq!(blocked.unwrap_err().to_string(), "verify location first");

    form.location_mut()
        .verify(collaborators.geocoder.as_ref(), config.http_timeout)
        .await
        .unwrap();
    let submitted = form.submit(collaborators.store.as_ref()).await.unwrap();
    assert_eq!(submitted.status, PickupStatus::Pending);

    let mut dashboard = Dashboard::connect(collaborators.clone(), &config);
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(dashboard.session.refresh_notifications());
    assert_eq!(dashboard.session.notifications().len(), 1);

    let point = dashboard
        .session
        .accept_notification(submitted.id)
        .await
        .unwrap();
    assert_eq!(point.position(), Some(GeoPoint { lat: 12.9352, lng: 77.6245 }));

    let requests = collaborators.store.list().await.unwrap();
    assert_eq!(requests[0].status, PickupStatus::Accepted);

    let route = dashboard.session.route().clone();
    route
        .add_map_click(GeoPoint { lat: 12.9716, lng: 77.5946 })
        .await;

    let result = match route.optimize().await.unwrap() {
        RouteUpdate::Applied(result) => result,
        RouteUpdate::Superseded => panic!("nothing else was optimizing"),
    };
    assert_eq!(result.path_kind, PathKind::Road);
    assert_eq!(result.distance_m, 98_765.0);
    assert_eq!(result.stops.len(), 2);
    assert_eq!(result.stops[0].id, point.id);
    assert!(result.stats.is_some());

    dashboard.estimator.update(EmissionInput {
        distance: 50.0,
        weight: 1_000.0,
        mode: TransportMode::Road,
    });
    tokio::time::sleep(Duration::from_millis(300)).await;
    match dashboard.estimator.latest() {
        Some(EstimateOutcome::Ready { estimate, .. }) => {
            assert!((estimate.emission_kg - 4.0).abs() < 1e-9);
        }
        other => panic!("expected an estimate, got {other:?}"),
    }

    dashboard.close().await;
}

#[tokio::test]
async fn unavailable_router_degrades_to_straight_line() {
    let store_url = serve(setup()).await;
    let optimizer_url = serve(optimizer_app()).await;
    let router_url = serve(broken_osrm()).await;
    let geocoder_url = serve(fake_nominatim()).await;
    let config = config(store_url, optimizer_url, router_url, geocoder_url);
    let collaborators = Collaborators::from_config(&config).unwrap();
    let dashboard = Dashboard::connect(collaborators, &config);

    let route = dashboard.session.route().clone();
    route.add_map_click(GeoPoint { lat: 0.0, lng: 0.0 }).await;
    route.add_map_click(GeoPoint { lat: 0.0, lng: 1.0 }).await;

    let result = match route.optimize().await.unwrap() {
        RouteUpdate::Applied(result) => result,
        RouteUpdate::Superseded => panic!("nothing else was optimizing"),
    };

    assert_eq!(result.path_kind, PathKind::StraightLine);
    assert_eq!(
        result.path,
        vec![GeoPoint { lat: 0.0, lng: 0.0 }, GeoPoint { lat: 0.0, lng: 1.0 }]
    );
    assert!((result.distance_m - 111_195.0).abs() < 10.0);

    dashboard.close().await;
}

#[tokio::test]
async fn unreachable_optimizer_fails_the_route() {
    let store_url = serve(setup()).await;
    let router_url = serve(fake_osrm()).await;
    let geocoder_url = serve(fake_nominatim()).await;
    let config = config(
        store_url,
        "http://127.0.0.1:1".to_string(),
        router_url,
        geocoder_url,
    );
    let dashboard = Dashboard::connect(Collaborators::from_config(&config).unwrap(), &config);

    let route = dashboard.session.route().clone();
    route.add_map_click(GeoPoint { lat: 0.0, lng: 0.0 }).await;
    route.add_map_click(GeoPoint { lat: 0.0, lng: 1.0 }).await;

    let err = route.optimize().await.unwrap_err();
    assert!(err.to_string().starts_with("route optimization unavailable"));
    assert!(route.current().await.is_none());

    dashboard.close().await;
}

#[tokio::test]
async fn ambiguous_address_over_http_requires_selection() {
    let geocoder_url = serve(fake_nominatim()).await;
    let config = config(
        "http://127.0.0.1:1".to_string(),
        "http://127.0.0.1:1".to_string(),
        "http://127.0.0.1:1".to_string(),
        geocoder_url,
    );
    let collaborators = Collaborators::from_config(&config).unwrap();

    let mut form = PickupForm::new("Springfield");
    let err = form
        .location_mut()
        .verify(collaborators.geocoder.as_ref(), config.http_timeout)
        .await
        .unwrap_err();
    assert!(err.to_string().starts_with("2 locations match"));
    assert!(form.to_request().is_err());

    form.location_mut().select(0).unwrap();
    let request = form.to_request().unwrap();
    assert_eq!(request.lat, Some(39.78));
}

#[tokio::test]
async fn remote_store_reports_missing_fields_like_the_local_one() {
    let store_url = serve(setup()).await;
    let config = config(
        store_url,
        "http://127.0.0.1:1".to_string(),
        "http://127.0.0.1:1".to_string(),
        "http://127.0.0.1:1".to_string(),
    );
    let collaborators = Collaborators::from_config(&config).unwrap();

    let payload = NewPickupRequest {
        seller_name: Some("A".to_string()),
        address: Some("X".to_string()),
        weight: Some(10.0),
        ..NewPickupRequest::default()
    };
    match collaborators.store.create(payload).await {
        Err(AppError::Validation(missing)) => assert_eq!(missing, vec!["phone", "email"]),
        other => panic!("expected a validation error, got {other:?}"),
    }
}

async fn read_text_frame(stream: &mut tokio::net::TcpStream) -> String {
    use tokio::io::AsyncReadExt;

    let opcode = stream.read_u8().await.unwrap();
    assert_eq!(opcode, 0x81, "expected a single unfragmented text frame");
    let len = match stream.read_u8().await.unwrap() & 0x7f {
        126 => stream.read_u16().await.unwrap() as usize,
        127 => stream.read_u64().await.unwrap() as usize,
        short => short as usize,
    };
    let mut payload = vec![0; len];
    stream.read_exact(&mut payload).await.unwrap();
    String::from_utf8(payload).unwrap()
}

#[tokio::test]
async fn websocket_pushes_created_requests() {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let store_url = serve(setup()).await;
    let addr = store_url.trim_start_matches("http://").to_string();

    let mut socket = tokio::net::TcpStream::connect(&addr).await.unwrap();
    let handshake = format!(
        "GET /ws HTTP/1.1\r\nHost: {addr}\r\nUpgrade: websocket\r\nConnection: Upgrade\r\n\
         Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\nSec-WebSocket-Version: 13\r\n\r\n"
    );
    socket.write_all(handshake.as_bytes()).await.unwrap();

    let mut head = Vec::new();
    while !head.ends_with(b"\r\n\r\n") {
        head.push(socket.read_u8().await.unwrap());
    }
    let head = String::from_utf8(head).unwrap();
    assert!(head.starts_with("HTTP/1.1 101"), "{head}");
    assert!(head.contains("s3pPLMBiTxaQ9kYGzzhZRbK+xOo="));

    // Give the socket task time to subscribe before the event fires.
    tokio::time::sleep(Duration::from_millis(100)).await;

    let config = config(
        store_url,
        "http://127.0.0.1:1".to_string(),
        "http://127.0.0.1:1".to_string(),
        "http://127.0.0.1:1".to_string(),
    );
    let collaborators = Collaborators::from_config(&config).unwrap();
    let payload: NewPickupRequest = serde_json::from_value(pickup_body("Socket Seller")).unwrap();
    let created = collaborators.store.create(payload).await.unwrap();

    let frame = tokio::time::timeout(Duration::from_secs(2), read_text_frame(&mut socket))
        .await
        .unwrap();
    let event: Value = serde_json::from_str(&frame).unwrap();
    assert_eq!(event["event"], "created");
    assert_eq!(event["request"]["id"], created.id);
    assert_eq!(event["request"]["sellerName"], "Socket Seller");
}
