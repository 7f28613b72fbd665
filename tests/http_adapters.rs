//! HTTP adapter tests against a loopback responder.

mod fixtures;

use collection_planner::error::{HouseListError, OptimizerError};
use collection_planner::house_list::{HouseListClient, HouseListConfig};
use collection_planner::model::{Location, OptimizeRequest};
use collection_planner::optimizer::{OptimizerClient, OptimizerConfig};
use collection_planner::session::Credentials;
use collection_planner::traits::RouteOptimizer;

use fixtures::*;

fn optimizer_at(base_url: &str) -> OptimizerClient {
    OptimizerClient::new(OptimizerConfig {
        base_url: format!("{}/", base_url),
        timeout_secs: 5,
    })
    .expect("build optimizer client")
}

fn sample_request() -> OptimizeRequest {
    OptimizeRequest {
        geofence: WARD_GEOFENCE.to_string(),
        houses: vec![Location::new(21.141, 79.081), Location::new(21.1415, 79.081)],
        start_location: DEPOT,
        dump_location: DUMP,
        batch_size: 2,
        nn_steps: 0,
        end_location: None,
    }
}

#[test]
fn optimizer_posts_json_and_reads_wrapped_batches() {
    let body = r#"{"batches": [{
        "stops": [{"stop": 1, "label": "House 1", "lat": 21.141, "lon": 79.081}],
        "route_path": [{"lat": 21.1458, "lon": 79.0882}, {"lat": 21.141, "lon": 79.081}],
        "speed_profiles": [{"speed_kmph": 20, "distance_km": 1.2, "time_minutes": 3.6}]
    }]}"#;
    let (base_url, server) = serve_once(200, body);

    let batch = optimizer_at(&base_url).optimize(&sample_request()).unwrap();
    let seen = server.join().expect("server thread");

    assert_eq!(seen.method, "POST");
    assert_eq!(seen.path, "/optimize_route");
    assert!(seen.header("content-type").unwrap().starts_with("application/json"));

    let sent: serde_json::Value = serde_json::from_str(&seen.body).unwrap();
    assert_eq!(sent["batch_size"], 2);
    assert_eq!(sent["nn_steps"], 0);
    assert_eq!(sent["houses"].as_array().unwrap().len(), 2);
    assert_eq!(sent["start_location"]["lat"], 21.1458);
    assert!(sent.get("end_location").is_none());

    assert_eq!(batch.stops.len(), 1);
    assert_eq!(batch.route_path.len(), 2);
    assert_eq!(batch.speed_profiles[0].distance_km, 1.2);
}

#[test]
fn optimizer_reads_single_batch_shape() {
    let body = r#"{"stops": [], "route_path": [{"lat": 1, "lon": 2}], "speed_profiles": []}"#;
    let (base_url, server) = serve_once(200, body);

    let batch = optimizer_at(&base_url).optimize(&sample_request()).unwrap();
    server.join().expect("server thread");
    assert_eq!(batch.route_path, vec![Location::new(1.0, 2.0)]);
}

#[test]
fn optimizer_non_success_status_is_an_error() {
    let (base_url, server) = serve_once(500, r#"{"detail": "solver exploded"}"#);

    let err = optimizer_at(&base_url).optimize(&sample_request()).unwrap_err();
    server.join().expect("server thread");
    match err {
        OptimizerError::Status { status, body } => {
            assert_eq!(status, 500);
            assert!(body.contains("solver exploded"));
        }
        other => panic!("expected status error, got {:?}", other),
    }
}

#[test]
fn optimizer_malformed_body_is_an_error() {
    let (base_url, server) = serve_once(200, "not json at all");
    let err = optimizer_at(&base_url).optimize(&sample_request()).unwrap_err();
    server.join().expect("server thread");
    assert!(matches!(err, OptimizerError::Malformed(_)));
}

#[test]
fn optimizer_empty_batches_is_an_error() {
    let (base_url, server) = serve_once(200, r#"{"batches": []}"#);
    let err = optimizer_at(&base_url).optimize(&sample_request()).unwrap_err();
    server.join().expect("server thread");
    assert!(matches!(err, OptimizerError::Malformed(_)));
}

#[test]
fn optimizer_unreachable_is_a_request_error() {
    // bind then drop to get a port nobody listens on
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .and_then(|l| l.local_addr())
        .expect("free port")
        .port();
    let err = optimizer_at(&format!("http://127.0.0.1:{}", port))
        .optimize(&sample_request())
        .unwrap_err();
    assert!(matches!(err, OptimizerError::Request(_)));
}

#[test]
fn house_list_sends_identity_headers() {
    let body = r#"{
        "geofence": "21.140,79.080;21.140,79.100;21.155,79.100",
        "houses": [{"lat": "21.141", "lon": "79.081"}, {"lat": 21.142, "lon": 79.082}],
        "dumpyards": [{"lat": 21.129, "lon": 79.142}]
    }"#;
    let (base_url, server) = serve_once(200, body);

    let client = HouseListClient::new(HouseListConfig {
        url: format!("{}/api/Get/GeoFencingWiseHouseList", base_url),
        timeout_secs: 5,
    })
    .unwrap();
    let listing = client
        .fetch(&Credentials { app_id: "3098".into(), user_id: "17".into() })
        .unwrap();
    let seen = server.join().expect("server thread");

    assert_eq!(seen.method, "GET");
    assert_eq!(seen.path, "/api/Get/GeoFencingWiseHouseList");
    assert_eq!(seen.header("AppId"), Some("3098"));
    assert_eq!(seen.header("userId"), Some("17"));

    assert!(listing.fence().is_polygon());
    assert_eq!(listing.houses.len(), 2);
    assert_eq!(listing.houses[0].house_id, "H1");
    assert_eq!(listing.dump_yards[0].location(), Location::new(21.129, 79.142));
}

#[test]
fn house_list_status_error() {
    let (base_url, server) = serve_once(401, "{}");
    let client = HouseListClient::new(HouseListConfig { url: base_url, timeout_secs: 5 }).unwrap();

    let err = client
        .fetch(&Credentials { app_id: "1".into(), user_id: "2".into() })
        .unwrap_err();
    server.join().expect("server thread");
    assert!(matches!(err, HouseListError::Status(401)));
}
