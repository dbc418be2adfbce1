//! 路由测试

use super::*;
use crate::config::{Config, WaitTimeouts};
use crate::infrastructure::{Script, ScriptedFactory};
use crate::models::{DocumentKind, TaskId};
use crate::orchestrator::{EmissionExecutor, TaskOrchestrator};
use crate::services::selectors;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use tower::ServiceExt;

fn test_state() -> Arc<ApiState> {
    let script = Script::new()
        .with_text(selectors::total_field(DocumentKind::Receipt), "S/ 10.00")
        .with_text(selectors::id(selectors::DOCUMENT_NUMBER), "449");
    let config = Config {
        timeouts: WaitTimeouts::immediate(),
        ..Config::default()
    };
    let executor = EmissionExecutor::new(Arc::new(ScriptedFactory::new(script)), &config);
    Arc::new(ApiState::new(Arc::new(TaskOrchestrator::new(executor, 2))))
}

fn receipt_body() -> Value {
    json!({
        "tipo_documento": "BOLETA",
        "cliente": { "nombre": "Cliente Test", "dni": "12345678" },
        "productos": [{
            "cantidad": 2,
            "descripcion": "PRODUCTO TEST",
            "unidad_medida": "KILOGRAMO",
            "precio_base": 5.0,
            "igv": 0,
            "precio_total": 10.0
        }],
        "resumen": { "serie": "B001", "numero": "00001", "sub_total": 10.0, "igv_total": 0.0, "total": 10.0 },
        "fecha": "15/10/2026",
        "id_remitente": "remitente-1",
        "credenciales": { "ruc": "10000000000", "usuario": "TESTUSER", "password": "test123" }
    })
}

fn post(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(body).unwrap()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(state: &Arc<ApiState>, request: Request<Body>) -> (StatusCode, Value) {
    let response = create_router(state.clone()).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

#[tokio::test]
async fn test_root_and_health() {
    let state = test_state();

    let (status, body) = send(&state, get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["version"].is_string());

    let (status, body) = send(&state, get("/api/v1/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["browser_ready"], true);
    assert_eq!(body["active_tasks"], 0);
}

#[tokio::test]
async fn test_emit_then_poll_status() {
    let state = test_state();

    let (status, body) = send(&state, post("/api/v1/emitir", &receipt_body())).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["status"], "pending");
    assert_eq!(body["message"], "Comprobante en cola para procesamiento");

    let task_id: TaskId = body["task_id"].as_str().unwrap().parse().unwrap();
    state.orchestrator.join(&task_id).await;

    let (status, body) = send(&state, get(&format!("/api/v1/status/{}", task_id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "completed");
    assert_eq!(body["result"]["outcome"], "success");
    assert_eq!(body["result"]["details"]["total"], 10.0);
    assert!(body["duration_seconds"].is_number());
}

#[tokio::test]
async fn test_shape_error_is_bad_request() {
    let state = test_state();
    let mut request = receipt_body();
    request["productos"] = json!([]);

    let (status, body) = send(&state, post("/api/v1/emitir", &request)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
    assert_eq!(state.orchestrator.counts().total(), 0);
}

#[tokio::test]
async fn test_unknown_task_is_not_found() {
    let state = test_state();
    let (status, _) = send(&state, get(&format!("/api/v1/status/{}", TaskId::new()))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&state, get("/api/v1/status/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_validate_reports_without_creating_task() {
    let state = test_state();
    let mut request = receipt_body();
    request["resumen"]["total"] = json!(12.0);

    let (status, body) = send(&state, post("/api/v1/validate", &request)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], false);
    assert_eq!(body["errors"].as_array().unwrap().len(), 1);
    assert_eq!(body["warnings"][0], "El producto 'PRODUCTO TEST' no tiene IGV");
    assert_eq!(state.orchestrator.counts().total(), 0);
}

#[tokio::test]
async fn test_credit_note_is_accepted() {
    let state = test_state();
    let body = json!({
        "fecha_emision": "15/10/2026",
        "numero_boleta": "EB01-448",
        "sustento": "Cliente solicitó anulación",
        "credenciales": { "ruc": "10000000000", "usuario": "TESTUSER", "password": "test123" }
    });

    let (status, response) = send(&state, post("/api/v1/nota-credito", &body)).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(response["message"], "Nota de crédito en cola para procesamiento");
    state.orchestrator.shutdown().await;
}
