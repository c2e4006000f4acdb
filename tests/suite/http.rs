//! HTTP transport: the router served on an ephemeral port, driven with reqwest.

use axum::body::Body;
use axum::http::{Request, header};
use nutrilens_engine::bootstrap;
use nutrilens_server::{AppState, MAX_UPLOAD_BYTES, router};
use reqwest::StatusCode;
use tower::ServiceExt;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{
    DOCUMENTS_PATH, SALMON_JSON, mount_fitness, mount_gemini_reply, mount_store_write,
    orchestrator_for, red_png, settings_from, spawn_app,
};

fn image_form(bytes: Vec<u8>) -> Form {
    Form::new().part(
        "file",
        Part::bytes(bytes)
            .file_name("meal.png")
            .mime_str("image/png")
            .unwrap(),
    )
}

async fn unconfigured_app() -> std::net::SocketAddr {
    spawn_app(bootstrap::build_orchestrator(&settings_from(&[]))).await
}

#[tokio::test]
async fn root_reports_online() {
    let addr = unconfigured_app().await;
    let body: Value = reqwest::get(format!("http://{addr}/"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(
        body,
        serde_json::json!({"status": "online", "message": "NutriLens backend is running"})
    );
}

#[tokio::test]
async fn analyze_returns_fallback_when_unconfigured() {
    let addr = unconfigured_app().await;
    let response = reqwest::Client::new()
        .post(format!("http://{addr}/analyze"))
        .multipart(image_form(red_png(100, 100)))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Food analyzed successfully");
    assert_eq!(body["nutrition"]["calories"], 550.0);
    assert_eq!(body["nutrition"]["confidence"], 0.0);
    assert_eq!(body["sync_status"]["status"], "success");
    assert_eq!(
        body["sync_status"]["detail"]["synced_payload"]["user_id"],
        "demo_user"
    );
}

#[tokio::test]
async fn analyze_uses_query_user_id_over_form_field() {
    let addr = unconfigured_app().await;
    let form = image_form(red_png(10, 10)).text("user_id", "from-form");
    let body: Value = reqwest::Client::new()
        .post(format!("http://{addr}/analyze?user_id=from-query"))
        .multipart(form)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(
        body["sync_status"]["detail"]["synced_payload"]["user_id"],
        "from-query"
    );
}

#[tokio::test]
async fn analyze_uses_form_user_id() {
    let addr = unconfigured_app().await;
    let form = image_form(red_png(10, 10)).text("user_id", "bob");
    let body: Value = reqwest::Client::new()
        .post(format!("http://{addr}/analyze"))
        .multipart(form)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["sync_status"]["detail"]["synced_payload"]["user_id"], "bob");
}

#[tokio::test]
async fn classified_upload_round_trips_over_http() {
    let server = MockServer::start().await;
    mount_gemini_reply(&server, SALMON_JSON).await;
    mount_store_write(&server, 200).await;
    mount_fitness(&server, 200).await;

    let addr = spawn_app(orchestrator_for(&server)).await;
    let body: Value = reqwest::Client::new()
        .post(format!("http://{addr}/analyze?user_id=alice"))
        .multipart(image_form(red_png(50, 50)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["nutrition"]["food_name"], "Grilled salmon with rice");
    assert_eq!(body["nutrition"]["protein_g"], 41.5);
}

#[tokio::test]
async fn empty_file_is_bad_request() {
    let addr = unconfigured_app().await;
    let response = reqwest::Client::new()
        .post(format!("http://{addr}/analyze"))
        .multipart(image_form(Vec::new()))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "image is empty");
}

#[tokio::test]
async fn non_image_is_bad_request() {
    let addr = unconfigured_app().await;
    let response = reqwest::Client::new()
        .post(format!("http://{addr}/analyze"))
        .multipart(image_form(b"plain text, not a photo".to_vec()))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn missing_file_part_is_bad_request() {
    let addr = unconfigured_app().await;
    let response = reqwest::Client::new()
        .post(format!("http://{addr}/analyze"))
        .multipart(Form::new().text("user_id", "alice"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "missing multipart field 'file'");
}

#[tokio::test]
async fn non_multipart_body_is_json_bad_request() {
    let addr = unconfigured_app().await;
    let response = reqwest::Client::new()
        .post(format!("http://{addr}/analyze"))
        .header("content-type", "text/plain")
        .body("just some text")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("multipart"));
}

#[tokio::test]
async fn malformed_query_is_json_bad_request() {
    let addr = unconfigured_app().await;
    let response = reqwest::Client::new()
        .post(format!("http://{addr}/analyze?user_id=a&user_id=b"))
        .multipart(image_form(red_png(10, 10)))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn oversized_upload_is_payload_too_large() {
    const BOUNDARY: &str = "nutrilens-boundary";
    let mut payload = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"big.png\"\r\n\
         Content-Type: image/png\r\n\r\n"
    )
    .into_bytes();
    payload.extend(std::iter::repeat_n(0u8, MAX_UPLOAD_BYTES + 1024));
    payload.extend(format!("\r\n--{BOUNDARY}--\r\n").into_bytes());

    let app = router(AppState::new(
        bootstrap::build_orchestrator(&settings_from(&[])),
        "demo_user",
    ));
    let request = Request::builder()
        .method("POST")
        .uri("/analyze")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(payload))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn history_without_store_is_empty() {
    let addr = unconfigured_app().await;
    let body: Value = reqwest::get(format!("http://{addr}/history/alice"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body, serde_json::json!({"user_id": "alice", "history": []}));
}

#[tokio::test]
async fn history_rejects_blank_user_id() {
    let addr = unconfigured_app().await;
    let response = reqwest::get(format!("http://{addr}/history/%20"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn history_reads_from_store() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{DOCUMENTS_PATH}:runQuery")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{
            "document": {
                "name": "projects/nutrilens-test/databases/(default)/documents/food_logs/d1",
                "fields": {
                    "user_id": {"stringValue": "alice"},
                    "food_name": {"stringValue": "Oatmeal"},
                    "calories": {"doubleValue": 300.0},
                    "timestamp": {"timestampValue": "2024-06-01T07:30:00Z"},
                    "source": {"stringValue": "classifier"},
                    "nutrition": {"mapValue": {"fields": {
                        "food_name": {"stringValue": "Oatmeal"},
                        "calories": {"doubleValue": 300.0},
                        "protein_g": {"doubleValue": 10.0},
                        "carbs_g": {"doubleValue": 54.0},
                        "fats_g": {"doubleValue": 5.0},
                        "confidence": {"doubleValue": 0.8}
                    }}}
                }
            },
            "readTime": "2024-06-02T00:00:00Z"
        }])))
        .mount(&server)
        .await;

    let addr = spawn_app(orchestrator_for(&server)).await;
    let body: Value = reqwest::get(format!("http://{addr}/history/alice"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let history = body["history"].as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["id"], "d1");
    assert_eq!(history[0]["food_name"], "Oatmeal");
    assert_eq!(history[0]["source"], "classifier");
}

#[tokio::test]
async fn history_store_failure_yields_empty_list() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{DOCUMENTS_PATH}:runQuery")))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let addr = spawn_app(orchestrator_for(&server)).await;
    let response = reqwest::get(format!("http://{addr}/history/alice"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["history"], serde_json::json!([]));
}
