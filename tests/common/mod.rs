// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Scripted engine doubles for session workflow tests.

// Each integration test binary compiles this module; not every binary
// uses every helper.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use uuid::Uuid;

use panssari::engine::{
    ApplyOutcome, ApplyRequest, EngineSet, JobHandle, ReasoningEngine, RemediationEngine,
    ScanEngine, ScanJobStatus, ScanOutcome, ScanRequest, SummaryRequest,
};
use panssari::errors::{EngineKind, OrchestratorError};
use panssari::findings::{ComplianceScore, Finding, RuleResult, Severity};
use panssari::session::{Decision, Phase, SessionHandle, SessionTiming, SessionView};

pub fn finding(rule_id: &str, severity: Severity) -> Finding {
    Finding {
        rule_id: rule_id.to_string(),
        title: format!("Title for {}", rule_id),
        severity,
        result: RuleResult::Fail,
        description: "description".to_string(),
        fix_text: format!("fix for {}", rule_id),
        check_text: String::new(),
        references: Vec::new(),
    }
}

pub fn outcome(pass: u32, findings: Vec<Finding>) -> ScanOutcome {
    let fail = findings.len() as u32;
    ScanOutcome {
        score: ComplianceScore::from_counts(pass, fail, 0, 0),
        findings,
        results_xml: PathBuf::from("/reports/scan_results_test.xml"),
        report_html: None,
    }
}

pub fn test_timing() -> SessionTiming {
    SessionTiming {
        poll_interval: Duration::from_millis(10),
        scan_timeout: Duration::from_secs(5),
    }
}

/// Hands out one pre-scripted outcome per started scan job.
pub struct ScriptedScanEngine {
    outcomes: Mutex<VecDeque<ScanOutcome>>,
    jobs: Mutex<HashMap<Uuid, ScanOutcome>>,
    pub fail_start: bool,
}

impl ScriptedScanEngine {
    pub fn new(outcomes: Vec<ScanOutcome>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            jobs: Mutex::new(HashMap::new()),
            fail_start: false,
        }
    }
}

#[async_trait::async_trait]
impl ScanEngine for ScriptedScanEngine {
    async fn start_scan(&self, _request: ScanRequest) -> Result<JobHandle, OrchestratorError> {
        if self.fail_start {
            return Err(OrchestratorError::ScanFailed("scripted launch failure".into()));
        }
        let outcome = self
            .outcomes
            .lock()
            .await
            .pop_front()
            .ok_or_else(|| OrchestratorError::ScanFailed("no scripted outcome left".into()))?;
        let job_id = Uuid::new_v4();
        self.jobs.lock().await.insert(job_id, outcome);
        Ok(JobHandle { job_id })
    }

    async fn poll_scan(&self, job: &JobHandle) -> Result<ScanJobStatus, OrchestratorError> {
        let jobs = self.jobs.lock().await;
        let outcome = jobs
            .get(&job.job_id)
            .ok_or_else(|| OrchestratorError::ScanFailed("unknown scripted job".into()))?;
        Ok(ScanJobStatus::Complete(outcome.clone()))
    }
}

#[derive(Default)]
pub struct ScriptedReasoner {
    pub fail_batch: bool,
    pub fail_analysis: bool,
}

#[async_trait::async_trait]
impl ReasoningEngine for ScriptedReasoner {
    async fn analyze(&self, finding: &Finding) -> Result<String, OrchestratorError> {
        if self.fail_analysis {
            return Err(OrchestratorError::EngineUnavailable {
                engine: EngineKind::Reasoning,
                reason: "scripted analysis outage".into(),
            });
        }
        Ok(format!("analysis of {}", finding.rule_id))
    }

    async fn analyze_batch(&self, findings: &[Finding]) -> Result<String, OrchestratorError> {
        if self.fail_batch {
            return Err(OrchestratorError::EngineUnavailable {
                engine: EngineKind::Reasoning,
                reason: "scripted triage outage".into(),
            });
        }
        Ok(format!("triage of {} findings", findings.len()))
    }

    async fn propose_remediation(&self, finding: &Finding) -> Result<String, OrchestratorError> {
        Ok(format!(
            "- name: fix {}\n  shell: {}\n  become: true\n",
            finding.rule_id, finding.fix_text
        ))
    }

    async fn summarize(&self, request: &SummaryRequest) -> Result<String, OrchestratorError> {
        Ok(format!(
            "executive summary: {} applied, {} remaining",
            request.applied.len(),
            request.remaining.len()
        ))
    }
}

/// Succeeds by default; rules in `fail_rules` report non-success (as a
/// timed-out apply would), rules in `error_rules` error at the transport.
#[derive(Default)]
pub struct ScriptedRemediator {
    pub fail_rules: HashSet<String>,
    pub error_rules: HashSet<String>,
    pub applied_log: Mutex<Vec<String>>,
}

#[async_trait::async_trait]
impl RemediationEngine for ScriptedRemediator {
    async fn apply(&self, request: ApplyRequest) -> Result<ApplyOutcome, OrchestratorError> {
        assert!(
            request.confirmed,
            "orchestrator must always set the confirmation flag"
        );
        let rule_id = request.finding.rule_id.clone();

        if self.error_rules.contains(&rule_id) {
            return Err(OrchestratorError::RemediationApplyFailure {
                rule_id,
                output: "scripted transport error".into(),
            });
        }
        if self.fail_rules.contains(&rule_id) {
            return Ok(ApplyOutcome {
                rule_id,
                success: false,
                output: "Playbook execution timed out after 120 seconds".into(),
                dry_run: request.dry_run,
            });
        }

        self.applied_log.lock().await.push(rule_id.clone());
        Ok(ApplyOutcome {
            rule_id,
            success: true,
            output: "ok: [localhost]".into(),
            dry_run: request.dry_run,
        })
    }
}

pub fn engines(
    scanner: ScriptedScanEngine,
    reasoner: ScriptedReasoner,
    remediator: ScriptedRemediator,
) -> EngineSet {
    EngineSet {
        scanner: Arc::new(scanner),
        reasoner: Arc::new(reasoner),
        remediator: Arc::new(remediator),
    }
}

/// Answer gates as they open until the session reaches a terminal phase.
/// Decisions are looked up per rule id; unknown rules are skipped.
pub async fn drive(
    handle: &SessionHandle,
    proceed: bool,
    decisions: &HashMap<String, Decision>,
) -> SessionView {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    loop {
        let view = handle.view().await;
        if view.phase.is_terminal() {
            return view;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "session never reached a terminal phase (stuck in {:?})",
            view.phase
        );

        if view.awaiting_proceed {
            // A second send before the driver consumes the first is fine
            // to ignore here; the gate accepts exactly one answer.
            let _ = handle.confirm_proceed(proceed).await;
        }

        if view.phase == Phase::Remediating {
            if let Some(pending) = handle.pending().await {
                let decision = decisions
                    .get(&pending.finding.rule_id)
                    .copied()
                    .unwrap_or(Decision::Skip);
                let _ = handle.submit_decision(&pending.finding.rule_id, decision).await;
            }
        }

        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
