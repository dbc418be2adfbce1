use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use emission_submit::config::{Config, WaitTimeouts};
use emission_submit::infrastructure::{Action, Script, ScriptedFactory};
use emission_submit::models::{BusinessOutcome, CreditNoteRequest, EmissionRequest};
use emission_submit::orchestrator::{EmissionExecutor, TaskOrchestrator};
use emission_submit::services::selectors;
use emission_submit::{App, DocumentKind, EmissionOutcome, ErrorCategory, OrchestratorError, TaskStatus};
use serde_json::{json, Value};
use tower::ServiceExt;

fn test_config() -> Config {
    Config {
        portal_url: "https://portal.test/menu".to_string(),
        timeouts: WaitTimeouts::immediate(),
        ..Config::default()
    }
}

fn orchestrator(script: Script) -> (TaskOrchestrator, Arc<ScriptedFactory>) {
    let factory = Arc::new(ScriptedFactory::new(script));
    let executor = EmissionExecutor::new(factory.clone(), &test_config());
    (TaskOrchestrator::new(executor, 2), factory)
}

fn credentials() -> serde_json::Value {
    json!({ "ruc": "10000000000", "usuario": "TESTUSER", "password": "test123" })
}

fn receipt_json() -> Value {
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
        "credenciales": credentials()
    })
}

fn receipt_request() -> EmissionRequest {
    serde_json::from_value(receipt_json()).unwrap()
}

fn credit_note_request(reference: &str) -> CreditNoteRequest {
    serde_json::from_value(json!({
        "fecha_emision": "15/10/2026",
        "tipo_nota": "01",
        "numero_boleta": reference,
        "sustento": "Cliente solicitó anulación de la compra",
        "credenciales": credentials()
    }))
    .unwrap()
}

fn receipt_script() -> Script {
    Script::new()
        .with_text(selectors::total_field(DocumentKind::Receipt), "S/ 10.00")
        .with_text(selectors::id(selectors::DOCUMENT_NUMBER), "449")
        .with_artifact("PDF-BOLETAEB01-44910000000000.pdf", b"%PDF-1.4 boleta".to_vec())
}

#[tokio::test]
async fn test_receipt_end_to_end() {
    let (orchestrator, factory) = orchestrator(receipt_script());

    let receipt = orchestrator.submit_emission(receipt_request()).await.unwrap();
    assert_eq!(receipt.status, TaskStatus::Pending);
    orchestrator.join(&receipt.task_id).await;

    let task = orchestrator.status(&receipt.task_id).unwrap();
    assert_eq!(task.status, TaskStatus::Completed);
    let Some(EmissionOutcome::Success(success)) = task.result else {
        panic!("expected success");
    };
    assert!(matches!(success.details, BusinessOutcome::Sale { total, .. } if (total - 10.0).abs() < 1e-9));
    let artifact = success.artifact.unwrap();
    assert_eq!(artifact.filename, "PDF-BOLETAEB01-44910000000000.pdf");
    assert_eq!(artifact.mime_type, "application/pdf");
    assert_eq!(success.warnings, vec!["El producto 'PRODUCTO TEST' no tiene IGV".to_string()]);

    let journal = factory.script().journal();
    assert_eq!(journal.first(), Some(&Action::Navigate("https://portal.test/menu".to_string())));
    assert_eq!(journal.last(), Some(&Action::Close));
    assert_eq!(factory.script().close_count(), 1);
}

#[tokio::test]
async fn test_total_mismatch_fails_the_task() {
    let script = receipt_script().with_text(selectors::total_field(DocumentKind::Receipt), "S/ 12.50");
    let (orchestrator, factory) = orchestrator(script);

    let receipt = orchestrator.submit_emission(receipt_request()).await.unwrap();
    orchestrator.join(&receipt.task_id).await;

    let task = orchestrator.status(&receipt.task_id).unwrap();
    assert_eq!(task.status, TaskStatus::Failed);
    let Some(EmissionOutcome::Failure(failure)) = task.result else {
        panic!("expected failure");
    };
    assert_eq!(failure.category, ErrorCategory::TotalMismatch);
    assert!(!factory.script().clicked(&selectors::id(selectors::FINAL_CONFIRM)));
    assert_eq!(factory.script().close_count(), 1);
}

#[tokio::test]
async fn test_missing_artifact_still_completes() {
    let script = Script::new()
        .with_text(selectors::total_field(DocumentKind::Receipt), "S/ 10.00")
        .with_text(selectors::id(selectors::DOCUMENT_NUMBER), "449");
    let (orchestrator, _) = orchestrator(script);

    let receipt = orchestrator.submit_emission(receipt_request()).await.unwrap();
    orchestrator.join(&receipt.task_id).await;

    let task = orchestrator.status(&receipt.task_id).unwrap();
    assert_eq!(task.status, TaskStatus::Completed);
    let Some(EmissionOutcome::Success(success)) = task.result else {
        panic!("expected success");
    };
    assert!(success.artifact.is_none());
    assert_eq!(success.document_number.as_deref(), Some("449"));
    assert_eq!(success.warnings.len(), 2);
}

#[tokio::test]
async fn test_credit_note_with_unseparated_reference() {
    let script = Script::new().with_text(selectors::id(selectors::DOCUMENT_NUMBER), "7");
    let (orchestrator, factory) = orchestrator(script);

    let receipt = orchestrator.submit_credit_note(credit_note_request("448")).await.unwrap();
    orchestrator.join(&receipt.task_id).await;

    let task = orchestrator.status(&receipt.task_id).unwrap();
    assert_eq!(task.kind, DocumentKind::CreditNote);
    assert_eq!(task.status, TaskStatus::Completed);
    let Some(EmissionOutcome::Success(success)) = task.result else {
        panic!("expected success");
    };
    assert!(success.warnings.iter().any(|w| w.contains("448")));
    assert_eq!(
        factory.script().typed_into(&selectors::id(selectors::credit_note::REFERENCE)),
        vec!["448".to_string()]
    );
}

#[tokio::test]
async fn test_reads_are_stable_and_timestamps_ordered() {
    let (orchestrator, _) = orchestrator(receipt_script().with_step_delay(Duration::from_millis(1)));

    let receipt = orchestrator.submit_emission(receipt_request()).await.unwrap();
    orchestrator.join(&receipt.task_id).await;

    let first = orchestrator.get_status(&receipt.task_id.to_string()).unwrap();
    let second = orchestrator.get_status(&receipt.task_id.to_string()).unwrap();
    assert_eq!(first.status, second.status);
    assert_eq!(first.completed_at, second.completed_at);
    assert_eq!(first.result, second.result);

    let started = first.started_at.unwrap();
    let completed = first.completed_at.unwrap();
    assert!(first.created_at <= started);
    assert!(started <= completed);
    assert!(first.duration_seconds().unwrap() >= 0.0);
}

#[tokio::test]
async fn test_failures_are_isolated_between_tasks() {
    let (orchestrator, _) = orchestrator(receipt_script());

    let mut broken = receipt_request();
    broken.client.name = None;
    broken.client.national_id = None;

    let failing = orchestrator.submit_emission(broken).await.unwrap();
    let passing = orchestrator.submit_emission(receipt_request()).await.unwrap();
    orchestrator.shutdown().await;

    let failed = orchestrator.status(&failing.task_id).unwrap();
    assert_eq!(failed.status, TaskStatus::Failed);
    assert!(matches!(
        failed.result,
        Some(EmissionOutcome::Failure(ref f)) if f.category == ErrorCategory::Validation
    ));
    assert_eq!(orchestrator.status(&passing.task_id).unwrap().status, TaskStatus::Completed);
}

#[tokio::test]
async fn test_rejected_submission_creates_no_task() {
    let (orchestrator, factory) = orchestrator(receipt_script());

    let mut request = receipt_request();
    request.emission_date = "2026-10-15".to_string();
    let err = orchestrator.submit_emission(request).await.unwrap_err();
    assert!(matches!(err, OrchestratorError::Rejected(_)));

    let err = orchestrator.submit_credit_note(credit_note_request("  ")).await.unwrap_err();
    assert!(matches!(err, OrchestratorError::Rejected(_)));

    assert_eq!(orchestrator.counts().total(), 0);
    assert_eq!(factory.opened(), 0);
}

#[tokio::test]
async fn test_summary_mismatch_submission_still_fails_task() {
    let (orchestrator, factory) = orchestrator(receipt_script());
    let mut request = receipt_request();
    request.summary.total = 12.0;

    let report = orchestrator.validate(&request);
    assert!(!report.valid);
    assert!(report.errors[0].starts_with("Total no coincide"));

    let receipt = orchestrator.submit_emission(request).await.unwrap();
    orchestrator.join(&receipt.task_id).await;

    let task = orchestrator.status(&receipt.task_id).unwrap();
    assert_eq!(task.status, TaskStatus::Failed);
    let Some(EmissionOutcome::Failure(failure)) = task.result else {
        panic!("expected failure");
    };
    assert_eq!(failure.category, ErrorCategory::Validation);
    assert!(failure.message.contains("Total no coincide"));
    assert_eq!(factory.opened(), 0);
}

#[tokio::test]
async fn test_status_moves_through_processing() {
    let (orchestrator, _) = orchestrator(receipt_script().with_step_delay(Duration::from_millis(5)));

    let receipt = orchestrator.submit_emission(receipt_request()).await.unwrap();
    let mut seen = Vec::new();
    for _ in 0..5_000 {
        let task = orchestrator.status(&receipt.task_id).unwrap();
        assert_eq!(task.result.is_some(), task.status.is_terminal());
        assert_eq!(task.completed_at.is_some(), task.status.is_terminal());
        assert_eq!(task.started_at.is_some(), task.status != TaskStatus::Pending);
        if seen.last() != Some(&task.status) {
            seen.push(task.status);
        }
        if task.status.is_terminal() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    assert_eq!(seen, vec![TaskStatus::Pending, TaskStatus::Processing, TaskStatus::Completed]);
}

#[tokio::test]
async fn test_app_router_serves_submitted_task() {
    let app = App::with_factory(test_config(), Arc::new(ScriptedFactory::new(receipt_script())));

    let body = receipt_json();
    let response = app
        .router()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/emitir")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let accepted: Value = serde_json::from_slice(&bytes).unwrap();
    let task_id = accepted["task_id"].as_str().unwrap().to_string();

    app.orchestrator().join(&task_id.parse().unwrap()).await;

    let response = app
        .router()
        .oneshot(
            Request::builder()
                .uri(format!("/api/v1/status/{}", task_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let status: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(status["status"], "completed");
    assert_eq!(status["result"]["artifact"]["filename"], "PDF-BOLETAEB01-44910000000000.pdf");
}

#[test]
fn test_config_file_overrides_defaults() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
portal_url = "https://portal.test/menu"
max_concurrent_emissions = 1
total_tolerance = 0.05

[timeouts]
standard_ms = 1000
"#
    )
    .unwrap();

    let config = Config::from_toml_file(file.path()).unwrap();
    assert_eq!(config.portal_url, "https://portal.test/menu");
    assert_eq!(config.max_concurrent_emissions, 1);
    assert!((config.total_tolerance - 0.05).abs() < f64::EPSILON);
    assert_eq!(config.timeouts.standard(), Duration::from_secs(1));
    assert_eq!(config.timeouts.long(), Duration::from_secs(30));
    assert_eq!(config.api_port, 8000);
}
