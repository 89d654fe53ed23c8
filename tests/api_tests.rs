use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use echodb::api::{self, paths, AboutResponse, AppState};
use echodb::settings::StoreSettings;
use echodb::storage::StorageEngine;
use echodb::version::VersionService;
use serde_json::{json, Value};
use tower::ServiceExt;

fn app_with(capacity: usize) -> Router {
    let settings = StoreSettings {
        capacity,
        ..StoreSettings::default()
    };
    api::api(AppState {
        store: StorageEngine::new(&settings).unwrap(),
        versions: VersionService::new("v1.0.0"),
    })
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Vec<u8>) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            builder = builder.header("content-type", "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    (status, bytes.to_vec())
}

async fn send_json(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let (status, bytes) = send(app, method, uri, body).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_base_routes() {
    let app = app_with(10);
    let (status, body) = send(&app, "GET", paths::base::HEALTH, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"OK");

    let (status, body) = send(&app, "GET", paths::base::ROOT, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(String::from_utf8(body).unwrap(), "Welcome to echodb");

    let (status, body) = send(&app, "GET", paths::base::ABOUT, None).await;
    assert_eq!(status, StatusCode::OK);
    let about: AboutResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(about.name, "echodb");
}

#[tokio::test]
async fn test_put_get_delete_key() {
    let app = app_with(10);
    let uri = paths::key_path("user-1");

    let (status, body) = send_json(&app, "PUT", &uri, Some(json!({"name": "ada"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"key": "user-1", "value": {"name": "ada"}}));

    let (status, body) = send_json(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["value"], json!({"name": "ada"}));

    let (status, _) = send(&app, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // deleting an absent key still succeeds
    let (status, _) = send(&app, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_range_endpoint() {
    let app = app_with(100);
    for key in ["b", "a", "d", "c", "e"] {
        let (status, _) = send(&app, "PUT", &paths::key_path(key), Some(json!(key))).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = send_json(&app, "GET", "/range?start=b&end=d", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"keys": ["b", "c", "d"]}));

    let (status, body) = send_json(&app, "GET", "/range?start=x&end=z", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"keys": []}));

    let (status, _) = send(&app, "GET", "/range?start=a", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_index_dump_and_maintenance() {
    let app = app_with(2);
    for key in ["a", "b", "c", "d"] {
        send(&app, "PUT", &paths::key_path(key), Some(json!(1))).await;
    }

    let (status, body) = send(&app, "GET", paths::store::INDEX, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(String::from_utf8(body).unwrap().starts_with("Level 0:"));

    let (status, body) = send_json(&app, "POST", paths::store::MAINTENANCE, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"expired": 0, "evicted": 0, "remaining": 2}));
}

#[tokio::test]
async fn test_check_update() {
    let app = app_with(10);

    let (status, body) = send_json(&app, "GET", "/check-update", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "code": "200",
            "message": "success",
            "data": {"current_version": "v1.0.0", "newest_version": "v1.0.0", "needs_update": false}
        })
    );

    let (_, body) = send_json(&app, "GET", "/check-update?current_version=v0.9.0", None).await;
    assert_eq!(body["data"]["needs_update"], json!(true));
}

#[tokio::test]
async fn test_update_version() {
    let app = app_with(10);

    let (status, body) = send_json(
        &app,
        "POST",
        paths::version::UPDATE_VERSION,
        Some(json!({"new_version": "v2.0.0"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"code": "200", "message": "Version updated successfully", "new_version": "v2.0.0"})
    );

    let (_, body) = send_json(&app, "GET", "/check-update?current_version=v1.0.0", None).await;
    assert_eq!(body["data"]["newest_version"], json!("v2.0.0"));
    assert_eq!(body["data"]["needs_update"], json!(true));

    for bad in [json!({}), json!({"new_version": ""}), json!({"new_version": 2})] {
        let (status, body) =
            send_json(&app, "POST", paths::version::UPDATE_VERSION, Some(bad)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"code": "400", "message": "Invalid input"}));
    }

    let (_, body) = send_json(&app, "GET", "/check-update", None).await;
    assert_eq!(body["data"]["newest_version"], json!("v2.0.0"));
}
