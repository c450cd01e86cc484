//! HTTP + WebSocket API
//!
//! Endpoints:
//! - GET /health - Health check
//! - POST /api/analyze - Score one biometric sample
//! - POST /api/personality - Trait profile from an emotion label
//! - GET /api/config - Active constant table and its fingerprint
//! - WS /ws/live - Live cycle outputs (when a loop feed is attached)

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use axum::{
    extract::{
        rejection::JsonRejection,
        ws::{rejection::WebSocketUpgradeRejection, Message, WebSocket},
        State, WebSocketUpgrade,
    },
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::broadcast;
use validator::Validate;

use crate::config::{Config, ScoringConfig};
use crate::core::{PersonalityInferencer, ScoringEngine};
use crate::error::{Error, Result};
use crate::types::{BioSignalSample, CycleOutput, Factor, Mode, PersonalityProfile, PulseStatus, RawEmotion, ScoreResult, Verdict};

// =============================================================================
// STATE
// =============================================================================

/// App state
pub struct AppState {
    pub engine: ScoringEngine,
    pub inferencer: PersonalityInferencer,
    pub fingerprint: String,
    pub live: Option<broadcast::Sender<CycleOutput>>,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        Self {
            engine: ScoringEngine::new(config.scoring.clone()),
            inferencer: PersonalityInferencer::new(),
            fingerprint: config.scoring.fingerprint(),
            live: None,
        }
    }

    /// Attach a live cycle feed for /ws/live
    pub fn with_live_feed(mut self, tx: broadcast::Sender<CycleOutput>) -> Self {
        self.live = Some(tx);
        self
    }
}

// =============================================================================
// REQUESTS / RESPONSES
// =============================================================================

/// Scoring request.
///
/// `mouth_tension` and `mode` belong to the extended schema: they are
/// required when the active table scores mouth tension and optional
/// otherwise. Everything else is always required.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct AnalyzeRequest {
    #[validate(range(min = 0.0))]
    pub baseline_jitter: f64,
    #[validate(range(min = 0.0))]
    pub current_jitter: f64,
    #[validate(range(min = 0.0, max = 1.0))]
    pub brow_dist: f64,
    #[validate(range(min = 0.0, max = 1.0))]
    pub eye_ratio: f64,
    #[serde(default)]
    #[validate(range(min = 0.0, max = 1.0))]
    pub mouth_tension: Option<f64>,
    #[validate(range(min = 0.0))]
    pub pulse_val: f64,
    pub is_triggered: bool,
    #[serde(default)]
    pub mode: Option<Mode>,
}

impl AnalyzeRequest {
    /// Validate once against the active table and produce the typed sample
    pub fn into_sample(self, config: &ScoringConfig) -> Result<(BioSignalSample, Option<Mode>)> {
        let mut fields = match self.validate() {
            Ok(()) => Vec::new(),
            Err(errors) => field_names(&errors),
        };
        if config.mouth_threshold.is_some() {
            if self.mode.is_none() {
                fields.push("mode".to_string());
            }
            if self.mouth_tension.is_none() {
                fields.push("mouth_tension".to_string());
            }
        }
        if !fields.is_empty() {
            fields.sort();
            return Err(Error::Validation { fields });
        }

        // Only reachable without a value when the table has no mouth flag,
        // so the value never reaches a scored term.
        let mouth_tension = self.mouth_tension.unwrap_or(0.0);
        let sample = BioSignalSample::new(
            self.baseline_jitter,
            self.current_jitter,
            self.brow_dist,
            self.eye_ratio,
            mouth_tension,
            self.pulse_val,
            self.is_triggered,
        )?;
        Ok((sample, self.mode))
    }
}

/// Scoring response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub score: f64,
    pub verdict: String,
    pub tier: Verdict,
    pub mind_state: String,
    pub scientific_feedback: String,
    pub pulse_status: PulseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode_active: Option<Mode>,
    pub contributing_factors: BTreeSet<Factor>,
    pub config_fingerprint: String,
}

impl AnalyzeResponse {
    pub fn new(result: ScoreResult, mode: Option<Mode>, config_fingerprint: impl Into<String>) -> Self {
        Self {
            score: result.rounded_score(),
            verdict: result.verdict.label().to_string(),
            tier: result.verdict,
            mind_state: result.mind_state().to_string(),
            scientific_feedback: result.scientific_feedback,
            pulse_status: result.pulse_status,
            mode_active: mode,
            contributing_factors: result.contributing_factors,
            config_fingerprint: config_fingerprint.into(),
        }
    }
}

/// Personality request
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct PersonalityRequest {
    pub dominant_emotion: String,
    #[serde(default)]
    pub emotion_scores: BTreeMap<String, f64>,
    #[validate(range(min = 0.0, max = 1.0))]
    pub gaze_score: f64,
    #[validate(range(min = 0.0, max = 1.0))]
    pub movement_score: f64,
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub profile: String,
    pub live_feed: bool,
}

/// Config response
#[derive(Debug, Serialize)]
pub struct ConfigResponse {
    pub scoring: ScoringConfig,
    pub fingerprint: String,
}

// =============================================================================
// ERRORS
// =============================================================================

/// Structured API error body
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    kind: &'static str,
    message: String,
    fields: Vec<String>,
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status = if err.is_client_error() {
            StatusCode::UNPROCESSABLE_ENTITY
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        let fields = match &err {
            Error::Validation { fields } => fields.clone(),
            Error::UnrecognizedEmotionLabel(_) => vec!["dominant_emotion".to_string()],
            _ => Vec::new(),
        };
        Self {
            status,
            kind: err.kind(),
            message: err.to_string(),
            fields,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        // Malformed, missing, mistyped: all the client's fault.
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            kind: "validation_error",
            message: rejection.body_text(),
            fields: vec!["body".to_string()],
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(kind = self.kind, message = %self.message, "request failed");
        } else {
            tracing::warn!(kind = self.kind, message = %self.message, "request rejected");
        }
        let body = Json(json!({
            "error": self.kind,
            "message": self.message,
            "fields": self.fields,
            "status": self.status.as_u16(),
        }));
        (self.status, body).into_response()
    }
}

fn field_names(errors: &validator::ValidationErrors) -> Vec<String> {
    let mut fields: Vec<String> = errors
        .field_errors()
        .into_keys()
        .map(|field| field.to_string())
        .collect();
    fields.sort();
    fields
}

fn validation_error(errors: validator::ValidationErrors) -> Error {
    Error::Validation {
        fields: field_names(&errors),
    }
}

// =============================================================================
// ROUTER
// =============================================================================

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/analyze", post(analyze))
        .route("/api/personality", post(personality))
        .route("/api/config", get(get_config))
        .route("/ws/live", get(websocket_handler))
        .with_state(Arc::new(state))
}

/// Health check endpoint
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: crate::VERSION.to_string(),
        profile: state.engine.config().profile.to_string(),
        live_feed: state.live.is_some(),
    })
}

/// Score one sample
async fn analyze(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<AnalyzeRequest>, JsonRejection>,
) -> std::result::Result<Json<AnalyzeResponse>, ApiError> {
    let Json(req) = payload?;
    let (sample, mode) = req.into_sample(state.engine.config())?;
    let result = state.engine.score(&sample);

    tracing::debug!(score = result.score, verdict = %result.verdict, ?mode, "scored request");

    Ok(Json(AnalyzeResponse::new(result, mode, state.fingerprint.as_str())))
}

/// Infer a trait profile
async fn personality(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<PersonalityRequest>, JsonRejection>,
) -> std::result::Result<Json<PersonalityProfile>, ApiError> {
    let Json(req) = payload?;
    req.validate().map_err(validation_error)?;

    let raw = RawEmotion {
        dominant_emotion: req.dominant_emotion,
        scores: req.emotion_scores,
    };
    let profile = state.inferencer.infer_raw(raw, req.gaze_score, req.movement_score)?;
    Ok(Json(profile))
}

/// Active constant table
async fn get_config(State(state): State<Arc<AppState>>) -> Json<ConfigResponse> {
    Json(ConfigResponse {
        scoring: state.engine.config().clone(),
        fingerprint: state.fingerprint.clone(),
    })
}

/// WebSocket handler for live cycle outputs
async fn websocket_handler(
    State(state): State<Arc<AppState>>,
    ws: std::result::Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let Some(tx) = state.live.as_ref() else {
        return StatusCode::NOT_FOUND.into_response();
    };
    match ws {
        Ok(ws) => {
            let rx = tx.subscribe();
            ws.on_upgrade(move |socket| handle_websocket(socket, rx))
        }
        Err(rejection) => rejection.into_response(),
    }
}

/// Forward cycle outputs until either side goes away
async fn handle_websocket(socket: WebSocket, mut rx: broadcast::Receiver<CycleOutput>) {
    let (mut sender, mut receiver) = socket.split();

    let mut forward = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(output) => {
                    let json = serde_json::to_string(&output).unwrap_or_default();
                    if sender.send(Message::Text(json)).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "live subscriber lagging");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let mut inbound = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if matches!(msg, Message::Close(_)) {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut forward => inbound.abort(),
        _ = &mut inbound => forward.abort(),
    }
}

/// Run the API server
pub async fn run_server(addr: &str, state: AppState) -> Result<()> {
    let router = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "psyscan API listening");
    tracing::info!("  POST /api/analyze     - Score a sample");
    tracing::info!("  POST /api/personality - Trait profile");
    tracing::info!("  GET  /api/config      - Constant table");
    tracing::info!("  WS   /ws/live         - Live cycle feed");
    tracing::info!("  GET  /health          - Health check");
    axum::serve(listener, router).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> AnalyzeRequest {
        AnalyzeRequest {
            baseline_jitter: 0.0,
            current_jitter: 0.0,
            brow_dist: 0.5,
            eye_ratio: 0.5,
            mouth_tension: Some(0.0),
            pulse_val: 0.0,
            is_triggered: false,
            mode: Some(Mode::Mouse),
        }
    }

    #[test]
    fn test_into_sample_accepts_valid() {
        let (sample, mode) = request().into_sample(&ScoringConfig::extended()).unwrap();
        assert_eq!(mode, Some(Mode::Mouse));
        assert_eq!(sample.brow_dist(), 0.5);
    }

    #[test]
    fn test_into_sample_lists_bad_fields() {
        let mut req = request();
        req.eye_ratio = 1.5;
        req.pulse_val = -2.0;
        match req.into_sample(&ScoringConfig::extended()).unwrap_err() {
            Error::Validation { fields } => {
                assert_eq!(fields, vec!["eye_ratio".to_string(), "pulse_val".to_string()]);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_extended_table_requires_mouth_and_mode() {
        let mut req = request();
        req.mouth_tension = None;
        req.mode = None;
        match req.into_sample(&ScoringConfig::extended()).unwrap_err() {
            Error::Validation { fields } => {
                assert_eq!(fields, vec!["mode".to_string(), "mouth_tension".to_string()]);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_compact_table_accepts_short_schema() {
        let mut req = request();
        req.mouth_tension = None;
        req.mode = None;
        let (sample, mode) = req.into_sample(&ScoringConfig::compact()).unwrap();
        assert_eq!(mode, None);
        assert_eq!(sample.mouth_tension(), 0.0);
    }

    #[test]
    fn test_missing_and_out_of_range_reported_together() {
        let mut req = request();
        req.mouth_tension = None;
        req.brow_dist = 2.0;
        match req.into_sample(&ScoringConfig::extended()).unwrap_err() {
            Error::Validation { fields } => {
                assert_eq!(fields, vec!["brow_dist".to_string(), "mouth_tension".to_string()]);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_api_error_status_mapping() {
        let client: ApiError = Error::UnrecognizedEmotionLabel("smug".into()).into();
        assert_eq!(client.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(client.fields, vec!["dominant_emotion".to_string()]);

        let server: ApiError = Error::Config("bad".into()).into();
        assert_eq!(server.status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
