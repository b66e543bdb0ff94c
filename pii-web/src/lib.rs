//! Serviço HTTP Axum sobre o motor de PII.
//!
//! O motor (registro + modelo NLP) é montado uma vez na partida e
//! compartilhado por todas as requisições via `Arc`. A análise é síncrona e
//! roda em `spawn_blocking` para não travar o runtime.
//!
//! | Rota                   | Método | Descrição                               |
//! |------------------------|--------|-----------------------------------------|
//! | `/health`              | GET    | liveness, independe do motor            |
//! | `/analyze`             | POST   | entidades com tipo, score, start e end  |
//! | `/analyze/explain`     | POST   | rastro de decisões da análise           |

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use pii_core::{AnalysisEvent, AnalysisRequest, AnalyzerEngine, AnalyzerError, EntityFields};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tracing::{error, info};

/// Estado compartilhado da aplicação
pub struct AppState {
    pub engine: AnalyzerEngine,
}

impl AppState {
    pub fn new(engine: AnalyzerEngine) -> Arc<Self> {
        Arc::new(Self { engine })
    }
}

/// Corpo de `/analyze`.
///
/// `surface_entity_types` lista os tipos que o chamador quer ver no
/// resultado; o nome antigo `blocked_entity_types` continua aceito.
#[derive(Debug, Deserialize)]
pub struct AnalyzeBody {
    #[serde(default)]
    text: Option<String>,
    #[serde(default, alias = "blocked_entity_types")]
    surface_entity_types: Option<Vec<String>>,
    #[serde(default)]
    entity_types: Option<Vec<String>>,
    #[serde(default)]
    score_threshold: Option<f64>,
}

#[derive(Serialize)]
struct ExplainResponse {
    events: Vec<AnalysisEvent>,
}

/// Monta o roteador com CORS e limite de tempo por requisição.
pub fn app(state: Arc<AppState>, timeout: Duration) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/analyze", post(analyze_handler))
        .route("/analyze/explain", post(explain_handler))
        .layer(TimeoutLayer::new(timeout))
        .layer(cors)
        .with_state(state)
}

async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

/// Análise via HTTP POST
async fn analyze_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<AnalyzeBody>, JsonRejection>,
) -> Response {
    let request = match to_request(body) {
        Ok(r) => r,
        Err(resp) => return resp,
    };

    let chars = request.text.len();
    let outcome = tokio::task::spawn_blocking(move || state.engine.analyze(&request)).await;

    match outcome {
        Ok(Ok(result)) => {
            info!(chars, entities = result.len(), "Análise concluída");
            Json(result.report(EntityFields::Offsets)).into_response()
        }
        Ok(Err(err)) => engine_error(err),
        Err(join_err) => {
            error!(error = %join_err, "Tarefa de análise abortada");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Analysis failed")
        }
    }
}

/// Mesma entrada de `/analyze`; devolve todos os eventos da análise.
async fn explain_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<AnalyzeBody>, JsonRejection>,
) -> Response {
    let request = match to_request(body) {
        Ok(r) => r,
        Err(resp) => return resp,
    };

    let (tx, rx) = std::sync::mpsc::channel::<AnalysisEvent>();
    let outcome =
        tokio::task::spawn_blocking(move || state.engine.analyze_streaming(&request, tx)).await;

    match outcome {
        Ok(Ok(_)) => {
            let events: Vec<AnalysisEvent> = rx.try_iter().collect();
            Json(ExplainResponse { events }).into_response()
        }
        Ok(Err(err)) => engine_error(err),
        Err(join_err) => {
            error!(error = %join_err, "Tarefa de análise abortada");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Analysis failed")
        }
    }
}

fn to_request(body: Result<Json<AnalyzeBody>, JsonRejection>) -> Result<AnalysisRequest, Response> {
    let Json(body) = body.map_err(|rejection| {
        error_response(
            StatusCode::BAD_REQUEST,
            &format!("Malformed request body: {}", rejection.body_text()),
        )
    })?;

    let text = match body.text {
        Some(text) if !text.trim().is_empty() => text,
        Some(_) => return Err(error_response(StatusCode::BAD_REQUEST, "Empty text field")),
        None => return Err(error_response(StatusCode::BAD_REQUEST, "Missing text field")),
    };

    Ok(AnalysisRequest {
        text,
        language: None,
        entity_types: body.entity_types,
        score_threshold: body.score_threshold,
        surface_entity_types: body.surface_entity_types,
    })
}

fn engine_error(err: AnalyzerError) -> Response {
    if err.is_client_error() {
        error_response(StatusCode::BAD_REQUEST, &err.to_string())
    } else {
        error!(error = %err, "Falha na análise");
        error_response(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string())
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({"error": message}))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn router() -> Router {
        let engine = AnalyzerEngine::with_builtins("en").unwrap();
        app(AppState::new(engine), Duration::from_secs(5))
    }

    async fn post(uri: &str, body: &str) -> (StatusCode, Value) {
        let response = router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let response = router()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value, json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn test_analyze_returns_offsets() {
        let (status, value) = post("/analyze", r#"{"text": "SSN: 123-45-6789"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            value,
            json!({"has_pii": true, "entities": [{"type": "US_SSN", "score": 0.95, "start": 5, "end": 16}]})
        );
    }

    #[tokio::test]
    async fn test_missing_text_is_client_error() {
        let (status, value) = post("/analyze", r#"{"blocked_entity_types": ["US_SSN"]}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(value, json!({"error": "Missing text field"}));
    }

    #[tokio::test]
    async fn test_malformed_body_is_client_error() {
        let (status, value) = post("/analyze", "{not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(value["error"].as_str().unwrap().starts_with("Malformed request body"));
    }

    #[tokio::test]
    async fn test_legacy_blocked_entity_types_alias() {
        let body = r#"{"text": "alice@example.com 123-45-6789", "blocked_entity_types": ["EMAIL_ADDRESS"]}"#;
        let (status, value) = post("/analyze", body).await;
        assert_eq!(status, StatusCode::OK);
        let entities = value["entities"].as_array().unwrap();
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0]["type"], "EMAIL_ADDRESS");
    }

    #[tokio::test]
    async fn test_threshold_out_of_range() {
        let (status, value) =
            post("/analyze", r#"{"text": "123-45-6789", "score_threshold": 3.0}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(value["error"].as_str().unwrap().contains("score_threshold"));
    }

    #[tokio::test]
    async fn test_explain_ends_with_done() {
        let (status, value) = post("/analyze/explain", r#"{"text": "SSN: 123456789"}"#).await;
        assert_eq!(status, StatusCode::OK);
        let events = value["events"].as_array().unwrap();
        assert_eq!(events.last().unwrap()["type"], "Done");
        assert!(events.iter().any(|e| e["type"] == "CandidateSuppressed"));
    }
}
