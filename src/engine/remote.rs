// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Remote-HTTP engine implementations.
//!
//! Speak the same wire contract the orchestrator server exposes, so a
//! session can run against engines hosted on another machine without the
//! state machine noticing. Transport failures and non-success statuses
//! surface as `EngineUnavailable`; nothing is retried here.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{EngineKind, OrchestratorError};
use crate::findings::Finding;

use super::{
    ApplyOutcome, ApplyRequest, JobHandle, ReasoningEngine, RemediationEngine, ScanEngine,
    ScanJobStatus, ScanPollResponse, ScanRequest, SummaryRequest,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanJobResponse {
    pub job_id: Uuid,
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub rule_id: String,
    pub analysis: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchAnalysisRequest {
    pub findings: Vec<Finding>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchAnalysisResponse {
    pub triage_report: String,
    pub finding_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybookResponse {
    pub rule_id: String,
    pub playbook_yaml: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalReportResponse {
    pub report: String,
}

fn transport_error(engine: EngineKind, err: reqwest::Error) -> OrchestratorError {
    OrchestratorError::EngineUnavailable {
        engine,
        reason: err.to_string(),
    }
}

async fn check_status(
    engine: EngineKind,
    response: reqwest::Response,
) -> Result<reqwest::Response, OrchestratorError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(OrchestratorError::EngineUnavailable {
        engine,
        reason: format!("HTTP {}: {}", status, body),
    })
}

// ---------------------------------------------------------------------------
// Scan engine
// ---------------------------------------------------------------------------

pub struct RemoteScanEngine {
    base_url: String,
    client: reqwest::Client,
}

impl RemoteScanEngine {
    pub fn new(base_url: &str) -> Result<Self, OrchestratorError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| OrchestratorError::Configuration(e.to_string()))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[async_trait::async_trait]
impl ScanEngine for RemoteScanEngine {
    async fn start_scan(&self, request: ScanRequest) -> Result<JobHandle, OrchestratorError> {
        let response = self
            .client
            .post(format!("{}/scan", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(EngineKind::Scan, e))?;
        let response = check_status(EngineKind::Scan, response).await?;

        let job: ScanJobResponse = response
            .json()
            .await
            .map_err(|e| transport_error(EngineKind::Scan, e))?;
        Ok(JobHandle { job_id: job.job_id })
    }

    async fn poll_scan(&self, job: &JobHandle) -> Result<ScanJobStatus, OrchestratorError> {
        let response = self
            .client
            .get(format!("{}/scan/{}", self.base_url, job.job_id))
            .send()
            .await
            .map_err(|e| transport_error(EngineKind::Scan, e))?;
        let response = check_status(EngineKind::Scan, response).await?;

        let poll: ScanPollResponse = response
            .json()
            .await
            .map_err(|e| transport_error(EngineKind::Scan, e))?;
        Ok(poll.into_status())
    }
}

// ---------------------------------------------------------------------------
// Reasoning engine
// ---------------------------------------------------------------------------

pub struct RemoteReasoningEngine {
    base_url: String,
    client: reqwest::Client,
}

impl RemoteReasoningEngine {
    pub fn new(base_url: &str) -> Result<Self, OrchestratorError> {
        // Per-request deadlines below; the builder default only bounds
        // connection setup.
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| OrchestratorError::Configuration(e.to_string()))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    async fn post_json<Req: Serialize, Resp: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &Req,
        deadline: Duration,
    ) -> Result<Resp, OrchestratorError> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .timeout(deadline)
            .json(body)
            .send()
            .await
            .map_err(|e| transport_error(EngineKind::Reasoning, e))?;
        let response = check_status(EngineKind::Reasoning, response).await?;
        response
            .json()
            .await
            .map_err(|e| transport_error(EngineKind::Reasoning, e))
    }
}

#[async_trait::async_trait]
impl ReasoningEngine for RemoteReasoningEngine {
    async fn analyze(&self, finding: &Finding) -> Result<String, OrchestratorError> {
        let resp: AnalysisResponse = self
            .post_json("/analyze", finding, Duration::from_secs(120))
            .await?;
        Ok(resp.analysis)
    }

    async fn analyze_batch(&self, findings: &[Finding]) -> Result<String, OrchestratorError> {
        let request = BatchAnalysisRequest {
            findings: findings.to_vec(),
        };
        let resp: BatchAnalysisResponse = self
            .post_json("/analyze/batch", &request, Duration::from_secs(180))
            .await?;
        Ok(resp.triage_report)
    }

    async fn propose_remediation(&self, finding: &Finding) -> Result<String, OrchestratorError> {
        let resp: PlaybookResponse = self
            .post_json("/generate", finding, Duration::from_secs(120))
            .await?;
        Ok(resp.playbook_yaml)
    }

    async fn summarize(&self, request: &SummaryRequest) -> Result<String, OrchestratorError> {
        let resp: FinalReportResponse = self
            .post_json("/report/final", request, Duration::from_secs(120))
            .await?;
        Ok(resp.report)
    }
}

// ---------------------------------------------------------------------------
// Remediation engine
// ---------------------------------------------------------------------------

pub struct RemoteRemediationEngine {
    base_url: String,
    client: reqwest::Client,
}

impl RemoteRemediationEngine {
    pub fn new(base_url: &str) -> Result<Self, OrchestratorError> {
        // Apply runs up to two minutes server-side; leave headroom.
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(150))
            .build()
            .map_err(|e| OrchestratorError::Configuration(e.to_string()))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[async_trait::async_trait]
impl RemediationEngine for RemoteRemediationEngine {
    async fn apply(&self, request: ApplyRequest) -> Result<ApplyOutcome, OrchestratorError> {
        // Rejected before any bytes leave this process.
        if !request.confirmed {
            return Err(OrchestratorError::ConfirmationRequired);
        }

        let response = self
            .client
            .post(format!("{}/apply", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(EngineKind::Remediation, e))?;
        let response = check_status(EngineKind::Remediation, response).await?;

        response
            .json()
            .await
            .map_err(|e| transport_error(EngineKind::Remediation, e))
    }
}
