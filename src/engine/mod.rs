// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Engine collaborator contracts.
//!
//! The orchestrator talks to three external engines — scan, reasoning,
//! remediation — through one uniform call-and-optionally-poll shape. Both
//! the in-process and the remote-HTTP deployments implement the same
//! traits, so the session state machine never branches on deployment mode.

pub mod local;
pub mod remote;

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::OrchestratorError;
use crate::findings::{ComplianceScore, Finding, SeverityFloor};
use crate::ledger::LedgerEntry;

/// Parameters for launching a scan. A pre-existing results file short-cuts
/// the live scan and goes straight to parsing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanRequest {
    #[serde(default)]
    pub profile: Option<String>,
    #[serde(default)]
    pub min_severity: Option<SeverityFloor>,
    #[serde(default)]
    pub results_xml: Option<PathBuf>,
}

/// Opaque handle to a running scan job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobHandle {
    pub job_id: Uuid,
}

/// Everything a completed scan yields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanOutcome {
    pub score: ComplianceScore,
    pub findings: Vec<Finding>,
    pub results_xml: PathBuf,
    #[serde(default)]
    pub report_html: Option<PathBuf>,
}

/// Poll result for a scan job.
#[derive(Debug, Clone)]
pub enum ScanJobStatus {
    Queued,
    Running,
    Complete(ScanOutcome),
    Error(String),
}

impl ScanJobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanJobStatus::Queued => "queued",
            ScanJobStatus::Running => "running",
            ScanJobStatus::Complete(_) => "complete",
            ScanJobStatus::Error(_) => "error",
        }
    }
}

/// Wire form of a scan poll, shared by the HTTP server and the remote
/// client so both sides agree on one schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanPollResponse {
    pub job_id: Uuid,
    pub status: String,
    #[serde(default)]
    pub score: Option<ComplianceScore>,
    #[serde(default)]
    pub findings: Vec<Finding>,
    #[serde(default)]
    pub results_xml: Option<PathBuf>,
    #[serde(default)]
    pub report_html: Option<PathBuf>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ScanPollResponse {
    pub fn from_status(job_id: Uuid, status: &ScanJobStatus) -> Self {
        match status {
            ScanJobStatus::Complete(outcome) => Self {
                job_id,
                status: status.as_str().to_string(),
                score: Some(outcome.score),
                findings: outcome.findings.clone(),
                results_xml: Some(outcome.results_xml.clone()),
                report_html: outcome.report_html.clone(),
                error: None,
            },
            ScanJobStatus::Error(message) => Self {
                job_id,
                status: status.as_str().to_string(),
                score: None,
                findings: Vec::new(),
                results_xml: None,
                report_html: None,
                error: Some(message.clone()),
            },
            other => Self {
                job_id,
                status: other.as_str().to_string(),
                score: None,
                findings: Vec::new(),
                results_xml: None,
                report_html: None,
                error: None,
            },
        }
    }

    pub fn into_status(self) -> ScanJobStatus {
        match self.status.as_str() {
            "complete" => match (self.score, self.results_xml) {
                (Some(score), Some(results_xml)) => ScanJobStatus::Complete(ScanOutcome {
                    score,
                    findings: self.findings,
                    results_xml,
                    report_html: self.report_html,
                }),
                _ => ScanJobStatus::Error(
                    "scan reported complete without score or results path".to_string(),
                ),
            },
            "error" => ScanJobStatus::Error(
                self.error
                    .unwrap_or_else(|| "scan failed without detail".to_string()),
            ),
            "running" => ScanJobStatus::Running,
            _ => ScanJobStatus::Queued,
        }
    }
}

/// Input for the executive summary narrative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryRequest {
    pub before: LedgerEntry,
    pub after: LedgerEntry,
    pub applied: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<String>,
    pub remaining: Vec<Finding>,
}

/// One remediation apply call. `confirmed` must be true or the engine
/// rejects the request before any system mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyRequest {
    pub finding: Finding,
    pub playbook_yaml: String,
    #[serde(default)]
    pub confirmed: bool,
    #[serde(default)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyOutcome {
    pub rule_id: String,
    pub success: bool,
    pub output: String,
    pub dry_run: bool,
}

/// Launch-and-poll scan collaborator.
#[async_trait::async_trait]
pub trait ScanEngine: Send + Sync {
    async fn start_scan(&self, request: ScanRequest) -> Result<JobHandle, OrchestratorError>;
    async fn poll_scan(&self, job: &JobHandle) -> Result<ScanJobStatus, OrchestratorError>;
}

/// Natural-language analysis collaborator. Failures surface as
/// `EngineUnavailable`; this layer never retries.
#[async_trait::async_trait]
pub trait ReasoningEngine: Send + Sync {
    async fn analyze(&self, finding: &Finding) -> Result<String, OrchestratorError>;
    async fn analyze_batch(&self, findings: &[Finding]) -> Result<String, OrchestratorError>;
    async fn propose_remediation(&self, finding: &Finding) -> Result<String, OrchestratorError>;
    async fn summarize(&self, request: &SummaryRequest) -> Result<String, OrchestratorError>;
}

/// Fix-application collaborator.
#[async_trait::async_trait]
pub trait RemediationEngine: Send + Sync {
    async fn apply(&self, request: ApplyRequest) -> Result<ApplyOutcome, OrchestratorError>;
}

/// The full set of collaborators one session needs.
#[derive(Clone)]
pub struct EngineSet {
    pub scanner: Arc<dyn ScanEngine>,
    pub reasoner: Arc<dyn ReasoningEngine>,
    pub remediator: Arc<dyn RemediationEngine>,
}
