//! Shared test utilities and fixtures
//!
//! Mock collaborators (Gemini, Firestore, fitness endpoint) and helpers for
//! serving the router on an ephemeral port.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Cursor;
use std::net::SocketAddr;

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use nutrilens_config::{NutrilensConfig, Settings};
use nutrilens_engine::{AnalysisOrchestrator, bootstrap};
use nutrilens_server::{AppState, router};
use wiremock::matchers::{header, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const PROJECT_ID: &str = "nutrilens-test";
pub const GEMINI_PATH: &str = "/models/gemini-2.5-flash:generateContent";
pub const DOCUMENTS_PATH: &str = "/projects/nutrilens-test/databases/(default)/documents";

pub const SALMON_JSON: &str = r#"{"food_name":"Grilled salmon with rice","calories":612,"protein_g":41.5,"carbs_g":58,"fats_g":22,"confidence":0.86}"#;

/// Solid red PNG; no recognizable food.
pub fn red_png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([255, 0, 0]));
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}

/// Settings resolved from `pairs` only; the process environment is ignored.
pub fn settings_from(pairs: &[(&str, String)]) -> Settings {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), v.clone()))
        .collect();
    Settings::resolve_with(None::<NutrilensConfig>, &move |key: &str| map.get(key).cloned())
}

/// Every collaborator pointed at `server`.
pub fn settings_for(server: &MockServer) -> Settings {
    settings_from(&[
        ("GOOGLE_API_KEY", "test-key".to_string()),
        ("GEMINI_BASE_URL", server.uri()),
        (
            "FIREBASE_CREDENTIALS_JSON",
            format!(r#"{{"project_id":"{PROJECT_ID}"}}"#),
        ),
        ("FIRESTORE_BASE_URL", server.uri()),
        ("FITNESS_ENDPOINT", format!("{}/fitness/metrics", server.uri())),
    ])
}

pub fn orchestrator_for(server: &MockServer) -> AnalysisOrchestrator {
    bootstrap::build_orchestrator(&settings_for(server))
}

pub fn gemini_body(text: &str) -> serde_json::Value {
    serde_json::json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": text}]},
            "finishReason": "STOP"
        }]
    })
}

pub async fn mount_gemini_reply(server: &MockServer, text: &str) {
    Mock::given(method("POST"))
        .and(path(GEMINI_PATH))
        .and(header("x-goog-api-key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_body(text)))
        .mount(server)
        .await;
}

pub async fn mount_gemini_status(server: &MockServer, status: u16) {
    Mock::given(method("POST"))
        .and(path(GEMINI_PATH))
        .respond_with(ResponseTemplate::new(status).set_body_string("upstream unavailable"))
        .mount(server)
        .await;
}

pub async fn mount_store_write(server: &MockServer, status: u16) {
    Mock::given(method("POST"))
        .and(path(format!("{DOCUMENTS_PATH}/food_logs")))
        .respond_with(ResponseTemplate::new(status).set_body_json(serde_json::json!({})))
        .mount(server)
        .await;
}

pub async fn mount_fitness(server: &MockServer, status: u16) {
    Mock::given(method("POST"))
        .and(path_regex("^/fitness/metrics$"))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

/// Serve the router on `127.0.0.1:0` and return the bound address.
pub async fn spawn_app(orchestrator: AnalysisOrchestrator) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(AppState::new(orchestrator, "demo_user"));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}
