// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Orchestrator HTTP API
 * Session lifecycle, approval gate, ledger queries and the engine
 * endpoints remote deployments call back into.
 *
 * © 2026 Bountyy Oy
 */

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::engine::remote::{
    AnalysisResponse, BatchAnalysisRequest, BatchAnalysisResponse, FinalReportResponse,
    PlaybookResponse, ScanJobResponse,
};
use crate::engine::{
    ApplyOutcome, ApplyRequest, EngineSet, JobHandle, ScanPollResponse, ScanRequest,
    SummaryRequest,
};
use crate::errors::OrchestratorError;
use crate::findings::Finding;
use crate::health::{HealthChecker, HealthStatus};
use crate::ledger::ComplianceLedger;
use crate::session::{new_session, Decision, SessionConfig, SessionRegistry};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub registry: Arc<SessionRegistry>,
    pub ledger: Arc<ComplianceLedger>,
    pub engines: EngineSet,
    pub health: Arc<HealthChecker>,
}

/// Error wrapper mapping the orchestrator taxonomy onto HTTP statuses.
struct ApiError(OrchestratorError);

impl From<OrchestratorError> for ApiError {
    fn from(err: OrchestratorError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            OrchestratorError::SessionNotFound(_) | OrchestratorError::ReportNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            OrchestratorError::InvalidDecision(_)
            | OrchestratorError::ConfirmationRequired
            | OrchestratorError::PendingMismatch { .. }
            | OrchestratorError::NoPendingApproval
            | OrchestratorError::DecisionAlreadySubmitted
            | OrchestratorError::NotAwaitingProceed
            | OrchestratorError::MalformedReport(_)
            | OrchestratorError::Configuration(_) => StatusCode::BAD_REQUEST,
            OrchestratorError::EngineUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
struct ApproveRequest {
    rule_id: String,
    decision: String,
}

#[derive(Debug, Deserialize)]
struct ProceedRequest {
    accept: bool,
}

#[derive(Debug, Serialize)]
struct StartSessionResponse {
    session_id: Uuid,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        // Session lifecycle
        .route("/session/start", post(start_session_handler))
        .route("/session/:id", get(get_session_handler))
        .route("/session/:id/pending", get(get_pending_handler))
        .route("/session/:id/approve", post(approve_handler))
        .route("/session/:id/proceed", post(proceed_handler))
        // Ledger
        .route("/ledger/history", get(ledger_history_handler))
        .route("/ledger/improvement", get(ledger_improvement_handler))
        .route("/ledger/latest", get(ledger_latest_handler))
        // Engine endpoints for remote deployments
        .route("/scan", post(start_scan_handler))
        .route("/scan/:job_id", get(poll_scan_handler))
        .route("/analyze", post(analyze_handler))
        .route("/analyze/batch", post(analyze_batch_handler))
        .route("/generate", post(generate_handler))
        .route("/report/final", post(final_report_handler))
        .route("/apply", post(apply_handler))
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn run_server(state: AppState) -> anyhow::Result<()> {
    let addr = format!("{}:{}", state.config.server.host, state.config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "Orchestrator API listening");
    axum::serve(listener, build_router(state)).await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let health = state.health.check_all().await;
    let status_code = match health.status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status_code, Json(health))
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

async fn start_session_handler(
    State(state): State<AppState>,
    Json(config): Json<SessionConfig>,
) -> Result<(StatusCode, Json<StartSessionResponse>), ApiError> {
    let (handle, driver) = new_session(
        config,
        state.engines.clone(),
        Arc::clone(&state.ledger),
        state.config.session_timing(),
        state.config.scanner.reports_dir.clone(),
    );

    let session_id = handle.id();
    state.registry.insert(handle).await;
    tokio::spawn(driver.run());

    info!(%session_id, "Session accepted");
    Ok((
        StatusCode::ACCEPTED,
        Json(StartSessionResponse { session_id }),
    ))
}

async fn get_session_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let handle = state.registry.get(id).await?;
    Ok(Json(handle.view().await))
}

async fn get_pending_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let handle = state.registry.get(id).await?;
    match handle.pending().await {
        Some(pending) => Ok(Json(pending).into_response()),
        None => Ok((
            StatusCode::NOT_FOUND,
            Json(json!({ "message": "no approval pending" })),
        )
            .into_response()),
    }
}

async fn approve_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ApproveRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let decision: Decision = request.decision.parse()?;
    let handle = state.registry.get(id).await?;
    handle.submit_decision(&request.rule_id, decision).await?;
    Ok(Json(json!({ "accepted": true })))
}

async fn proceed_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ProceedRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let handle = state.registry.get(id).await?;
    handle.confirm_proceed(request.accept).await?;
    Ok(Json(json!({ "accepted": true })))
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

async fn ledger_history_handler(State(state): State<AppState>) -> impl IntoResponse {
    let history = state.ledger.history().await;
    Json(json!({ "history": history }))
}

async fn ledger_improvement_handler(State(state): State<AppState>) -> impl IntoResponse {
    match state.ledger.improvement().await {
        Some(improvement) => Json(serde_json::to_value(improvement).unwrap_or_default()),
        None => Json(json!({
            "message": "Need at least 2 scans to show improvement",
            "history_count": state.ledger.history().await.len(),
        })),
    }
}

async fn ledger_latest_handler(State(state): State<AppState>) -> impl IntoResponse {
    match state.ledger.latest().await {
        Some(entry) => Json(serde_json::to_value(entry).unwrap_or_default()),
        None => Json(json!({ "message": "No scans recorded yet" })),
    }
}

// ---------------------------------------------------------------------------
// Engine endpoints
// ---------------------------------------------------------------------------

async fn start_scan_handler(
    State(state): State<AppState>,
    Json(request): Json<ScanRequest>,
) -> Result<(StatusCode, Json<ScanJobResponse>), ApiError> {
    let handle = state.engines.scanner.start_scan(request).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(ScanJobResponse {
            job_id: handle.job_id,
            status: "queued".to_string(),
            message: Some("Scan started".to_string()),
        }),
    ))
}

async fn poll_scan_handler(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<ScanPollResponse>, ApiError> {
    let status = state
        .engines
        .scanner
        .poll_scan(&JobHandle { job_id })
        .await?;
    Ok(Json(ScanPollResponse::from_status(job_id, &status)))
}

async fn analyze_handler(
    State(state): State<AppState>,
    Json(finding): Json<Finding>,
) -> Result<Json<AnalysisResponse>, ApiError> {
    let analysis = state.engines.reasoner.analyze(&finding).await?;
    Ok(Json(AnalysisResponse {
        rule_id: finding.rule_id,
        analysis,
    }))
}

async fn analyze_batch_handler(
    State(state): State<AppState>,
    Json(request): Json<BatchAnalysisRequest>,
) -> Result<Json<BatchAnalysisResponse>, ApiError> {
    let triage_report = state
        .engines
        .reasoner
        .analyze_batch(&request.findings)
        .await?;
    Ok(Json(BatchAnalysisResponse {
        triage_report,
        finding_count: request.findings.len(),
    }))
}

async fn generate_handler(
    State(state): State<AppState>,
    Json(finding): Json<Finding>,
) -> Result<Json<PlaybookResponse>, ApiError> {
    let playbook_yaml = state
        .engines
        .reasoner
        .propose_remediation(&finding)
        .await?;
    Ok(Json(PlaybookResponse {
        rule_id: finding.rule_id,
        playbook_yaml,
    }))
}

async fn final_report_handler(
    State(state): State<AppState>,
    Json(request): Json<SummaryRequest>,
) -> Result<Json<FinalReportResponse>, ApiError> {
    let report = state.engines.reasoner.summarize(&request).await?;
    Ok(Json(FinalReportResponse { report }))
}

async fn apply_handler(
    State(state): State<AppState>,
    Json(request): Json<ApplyRequest>,
) -> Result<Json<ApplyOutcome>, ApiError> {
    let outcome = state.engines.remediator.apply(request).await?;
    Ok(Json(outcome))
}
