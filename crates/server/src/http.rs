//! HTTP Endpoints
//!
//! REST API for the call lifecycle engine.

use axum::{
    extract::{Json, State},
    http::{HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use claimcall_core::ExtractedData;
use claimcall_engine::{EndCallTarget, SweepSummary};

use crate::metrics::{metrics_handler, record_operation, record_sweep};
use crate::state::AppState;
use crate::ServerError;

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let cors_layer = build_cors_layer(
        &state.settings.server.cors_origins,
        state.settings.server.cors_enabled,
    );

    Router::new()
        // Reconciliation trigger
        .route("/api/reconcile", post(run_reconciliation))
        // Single-target call operations
        .route("/api/calls/end", post(end_call))
        .route("/api/transcripts/process", post(process_transcript))
        // Voice toggle
        .route("/api/voice-settings", get(get_voice_settings))
        .route("/api/voice-settings", put(set_voice_settings))
        // Health and metrics
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
}

/// Build the CORS layer from configured origins. With CORS disabled a
/// permissive layer is returned, for development only.
fn build_cors_layer(origins: &[String], enabled: bool) -> CorsLayer {
    if !enabled {
        tracing::warn!("CORS is disabled - allowing all origins (NOT FOR PRODUCTION)");
        return CorsLayer::permissive();
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!("Invalid CORS origin: {}", origin);
                None
            })
        })
        .collect();

    if parsed.is_empty() {
        tracing::info!("No valid CORS origins configured, defaulting to localhost:3000");
        return CorsLayer::new()
            .allow_origin("http://localhost:3000".parse::<HeaderValue>().unwrap())
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
            .allow_headers(Any);
    }

    CorsLayer::new()
        .allow_origin(parsed)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers(Any)
}

/// Run one reconciliation sweep.
///
/// Always answers 200: per-candidate failures are conveyed in the
/// summary body, never in the status code.
async fn run_reconciliation(State(state): State<AppState>) -> Json<SweepSummary> {
    let summary = state.reconciler.run_sweep().await;
    record_sweep(&summary);
    Json(summary)
}

/// End-call request; one of the two identifiers must be set
#[derive(Debug, Deserialize)]
struct EndCallRequest {
    call_id: Option<Uuid>,
    conversation_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct EndCallResponse {
    call_id: Uuid,
    status: claimcall_core::CallStatus,
    ended_at: Option<chrono::DateTime<chrono::Utc>>,
}

async fn end_call(
    State(state): State<AppState>,
    Json(request): Json<EndCallRequest>,
) -> Result<Json<EndCallResponse>, StatusCode> {
    let target = match (request.call_id, request.conversation_id) {
        (Some(id), _) => EndCallTarget::CallId(id),
        (None, Some(conversation_id)) => EndCallTarget::ConversationId(conversation_id),
        (None, None) => {
            record_operation("end_call", false);
            let err = claimcall_core::Error::InvalidInput(
                "either call_id or conversation_id is required".to_string(),
            );
            return Err(ServerError::from(err).into());
        }
    };

    match state.reconciler.end_call(target).await {
        Ok(call) => {
            record_operation("end_call", true);
            Ok(Json(EndCallResponse {
                call_id: call.id,
                status: call.status,
                ended_at: call.ended_at,
            }))
        }
        Err(e) => {
            record_operation("end_call", false);
            tracing::warn!(error = %e, "end-call request failed");
            Err(ServerError::from(e).into())
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProcessTranscriptRequest {
    conversation_id: String,
    call_id: Option<Uuid>,
}

async fn process_transcript(
    State(state): State<AppState>,
    Json(request): Json<ProcessTranscriptRequest>,
) -> Result<Json<ExtractedData>, StatusCode> {
    match state
        .reconciler
        .process_transcript(&request.conversation_id, request.call_id)
        .await
    {
        Ok(extracted) => {
            record_operation("process_transcript", true);
            Ok(Json(extracted))
        }
        Err(e) => {
            record_operation("process_transcript", false);
            tracing::warn!(
                conversation_id = %request.conversation_id,
                error = %e,
                "transcript processing failed"
            );
            Err(ServerError::from(e).into())
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct VoiceSettingsBody {
    enabled: bool,
}

async fn get_voice_settings(
    State(state): State<AppState>,
) -> Result<Json<VoiceSettingsBody>, StatusCode> {
    let enabled = state
        .store
        .voice_enabled()
        .await
        .map_err(|e| StatusCode::from(ServerError::from(e)))?;
    Ok(Json(VoiceSettingsBody { enabled }))
}

async fn set_voice_settings(
    State(state): State<AppState>,
    Json(body): Json<VoiceSettingsBody>,
) -> Result<Json<VoiceSettingsBody>, StatusCode> {
    state
        .store
        .set_voice_enabled(body.enabled)
        .await
        .map_err(|e| StatusCode::from(ServerError::from(e)))?;
    tracing::info!(enabled = body.enabled, "voice toggle updated");
    Ok(Json(body))
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_error_status_mapping() {
        use claimcall_core::Error;

        let not_found: StatusCode = ServerError::from(Error::not_found("call", "x")).into();
        assert_eq!(not_found, StatusCode::NOT_FOUND);

        let remote: StatusCode =
            ServerError::from(Error::TransientRemote("502".to_string())).into();
        assert_eq!(remote, StatusCode::BAD_GATEWAY);

        let not_ready: StatusCode =
            ServerError::from(Error::TranscriptNotReady("c".to_string())).into();
        assert_eq!(not_ready, StatusCode::CONFLICT);

        let invalid: StatusCode =
            ServerError::from(Error::InvalidInput("missing id".to_string())).into();
        assert_eq!(invalid, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_end_call_request_accepts_either_identifier() {
        let by_conv: EndCallRequest =
            serde_json::from_str(r#"{"conversation_id": "conv-1"}"#).unwrap();
        assert!(by_conv.call_id.is_none());
        assert_eq!(by_conv.conversation_id.as_deref(), Some("conv-1"));

        let neither: EndCallRequest = serde_json::from_str("{}").unwrap();
        assert!(neither.call_id.is_none() && neither.conversation_id.is_none());
    }
}
