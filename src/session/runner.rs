// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! The session orchestrator core.
//!
//! Drives one hardening session through its phases, strictly sequentially:
//! no two findings are ever approved or applied concurrently, because
//! remediations can restart services and edit shared files. The approval
//! gate is an explicit state — the driver parks on a channel until a
//! decision arrives from whatever surface hosts the operator.
//!
//! Fatal failures (scan launch, report parse, reasoning engine during
//! triage or per-finding analysis) move the session to the absorbing
//! `Error` phase. Per-finding apply failures are recorded and the queue
//! keeps moving; one bad fix must not block assessment of the rest.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, RwLock};
use tokio::time::{sleep, Instant};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::engine::{
    ApplyRequest, EngineSet, JobHandle, ScanJobStatus, ScanOutcome, ScanRequest, SummaryRequest,
};
use crate::errors::OrchestratorError;
use crate::findings::Severity;
use crate::ledger::{ComplianceLedger, LedgerEntry};
use crate::remediation::RemediationTracker;

use super::state::{
    Decision, PendingApproval, Phase, SessionConfig, SessionState, SessionView,
};

/// Polling cadence and deadline for the asynchronous scan job.
#[derive(Debug, Clone, Copy)]
pub struct SessionTiming {
    pub poll_interval: Duration,
    pub scan_timeout: Duration,
}

impl Default for SessionTiming {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(3),
            scan_timeout: Duration::from_secs(600),
        }
    }
}

/// Shared handle to a running session. The driver owns the workflow; the
/// handle is how operators observe it and feed decisions in.
#[derive(Debug)]
pub struct SessionHandle {
    id: Uuid,
    config: SessionConfig,
    state: RwLock<SessionState>,
    decision_tx: mpsc::Sender<Decision>,
    proceed_tx: mpsc::Sender<bool>,
}

impl SessionHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub async fn view(&self) -> SessionView {
        let state = self.state.read().await;
        SessionView {
            session_id: self.id,
            phase: state.phase,
            profile: self.config.profile.clone(),
            min_severity: self.config.min_severity,
            dry_run: self.config.dry_run,
            total_findings: state.total_findings,
            remaining: state.remaining,
            findings_overview: state.findings_overview.clone(),
            applied: state.applied.clone(),
            skipped: state.skipped.clone(),
            failed: state.failed.clone(),
            score_before: state.before_score.map(|s| s.score),
            score_after: state.after_score.map(|s| s.score),
            triage_report: state.triage_report.clone(),
            final_report: state.final_report.clone(),
            awaiting_proceed: state.awaiting_proceed,
            has_pending: state.pending.is_some(),
            error: state.error.clone(),
        }
    }

    /// The approval currently blocking the session, if any.
    pub async fn pending(&self) -> Option<PendingApproval> {
        self.state.read().await.pending.clone()
    }

    /// Feed a decision to the approval gate. The rule id must match the
    /// pending record; exactly one decision is accepted per record.
    pub async fn submit_decision(
        &self,
        rule_id: &str,
        decision: Decision,
    ) -> Result<(), OrchestratorError> {
        {
            let state = self.state.read().await;
            let pending = state
                .pending
                .as_ref()
                .ok_or(OrchestratorError::NoPendingApproval)?;
            if pending.finding.rule_id != rule_id {
                return Err(OrchestratorError::PendingMismatch {
                    expected: pending.finding.rule_id.clone(),
                    got: rule_id.to_string(),
                });
            }
        }

        match self.decision_tx.try_send(decision) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                Err(OrchestratorError::DecisionAlreadySubmitted)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                Err(OrchestratorError::NoPendingApproval)
            }
        }
    }

    /// Answer the proceed/decline gate shown after batch triage.
    pub async fn confirm_proceed(&self, accept: bool) -> Result<(), OrchestratorError> {
        if !self.state.read().await.awaiting_proceed {
            return Err(OrchestratorError::NotAwaitingProceed);
        }
        match self.proceed_tx.try_send(accept) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                Err(OrchestratorError::DecisionAlreadySubmitted)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                Err(OrchestratorError::NotAwaitingProceed)
            }
        }
    }
}

/// Owns the workflow for one session. Consumed by [`SessionDriver::run`].
pub struct SessionDriver {
    handle: Arc<SessionHandle>,
    engines: EngineSet,
    ledger: Arc<ComplianceLedger>,
    tracker: RemediationTracker,
    decision_rx: mpsc::Receiver<Decision>,
    proceed_rx: mpsc::Receiver<bool>,
    timing: SessionTiming,
    reports_dir: PathBuf,
}

/// Build a session and its driver. The driver is spawned by the caller;
/// the handle goes to the registry / operator surface.
pub fn new_session(
    config: SessionConfig,
    engines: EngineSet,
    ledger: Arc<ComplianceLedger>,
    timing: SessionTiming,
    reports_dir: PathBuf,
) -> (Arc<SessionHandle>, SessionDriver) {
    // Capacity one: a second submission before the driver consumes the
    // first is a protocol error, not a queue.
    let (decision_tx, decision_rx) = mpsc::channel(1);
    let (proceed_tx, proceed_rx) = mpsc::channel(1);

    let handle = Arc::new(SessionHandle {
        id: Uuid::new_v4(),
        config,
        state: RwLock::new(SessionState::new()),
        decision_tx,
        proceed_tx,
    });

    let driver = SessionDriver {
        handle: Arc::clone(&handle),
        engines,
        ledger,
        tracker: RemediationTracker::new(),
        decision_rx,
        proceed_rx,
        timing,
        reports_dir,
    };

    (handle, driver)
}

impl SessionDriver {
    /// Run the session to a terminal phase. Never panics the host: every
    /// fatal error lands in the `Error` phase with its message preserved.
    pub async fn run(mut self) {
        let session_id = self.handle.id;
        info!(%session_id, profile = %self.handle.config.profile, "Hardening session started");

        if let Err(e) = self.drive().await {
            error!(%session_id, error = %e, "Session failed");
            let mut state = self.handle.state.write().await;
            state.phase = Phase::Error;
            state.error = Some(e.to_string());
            state.pending = None;
            state.awaiting_proceed = false;
        }
    }

    async fn drive(&mut self) -> Result<(), OrchestratorError> {
        let config = self.handle.config.clone();

        // ── Phase 1: scan ────────────────────────────────────────────────
        self.set_phase(Phase::Scanning).await;
        let outcome = self
            .run_scan(ScanRequest {
                profile: Some(config.profile.clone()),
                min_severity: Some(config.min_severity),
                results_xml: config.results_xml.clone(),
            })
            .await?;

        self.set_phase(Phase::Analyzing).await;
        {
            let mut state = self.handle.state.write().await;
            state.before_score = Some(outcome.score);
            state.total_findings = outcome.findings.len();
            state.remaining = outcome.findings.len();
            state.findings_overview = outcome.findings.iter().map(Into::into).collect();
        }
        let before_entry = self
            .ledger
            .record_scan(&outcome.score, &outcome.findings, &[])
            .await?;

        if outcome.findings.is_empty() {
            info!("No failures found at the configured severity level");
            self.finish().await?;
            return Ok(());
        }
        if config.scan_only {
            info!("Scan-only session, stopping after baseline record");
            self.finish().await?;
            return Ok(());
        }

        // ── Phase 2: batch triage + proceed gate ─────────────────────────
        let triage = self.engines.reasoner.analyze_batch(&outcome.findings).await?;
        {
            let mut state = self.handle.state.write().await;
            state.triage_report = Some(triage);
            state.awaiting_proceed = true;
        }
        let accept = self.proceed_rx.recv().await.unwrap_or(false);
        self.handle.state.write().await.awaiting_proceed = false;

        if !accept {
            info!("Operator declined remediation, no changes made");
            self.finish().await?;
            return Ok(());
        }

        // ── Phase 3: interactive remediation ─────────────────────────────
        self.set_phase(Phase::Remediating).await;
        self.remediation_loop(&outcome).await?;

        // ── Phase 4: validation re-scan + executive summary ──────────────
        let summary = self.tracker.summary();
        if !summary.applied.is_empty() && !config.dry_run {
            self.set_phase(Phase::Validating).await;
            self.validate(&config, &before_entry).await?;
        }

        self.finish().await?;
        Ok(())
    }

    /// Process the queue in severity order, one approval at a time.
    async fn remediation_loop(
        &mut self,
        outcome: &ScanOutcome,
    ) -> Result<(), OrchestratorError> {
        let config = self.handle.config.clone();
        let total = outcome.findings.len();

        for (index, finding) in outcome.findings.iter().enumerate() {
            // Analysis and the proposed fix are independent engine calls;
            // both must land before the gate opens.
            let (analysis, proposed) = tokio::try_join!(
                self.engines.reasoner.analyze(finding),
                self.engines.reasoner.propose_remediation(finding),
            )?;

            let decision = if config.auto_apply_low_severity
                && finding.severity == Severity::CatIII
            {
                info!(rule_id = %finding.rule_id, "Auto-applying CAT III fix");
                Decision::Apply
            } else {
                self.await_decision(PendingApproval {
                    finding: finding.clone(),
                    analysis,
                    playbook_yaml: proposed.clone(),
                    position: index + 1,
                    total,
                })
                .await
            };

            match decision {
                Decision::Quit => {
                    info!("Operator quit the remediation loop; remaining findings untouched");
                    break;
                }
                Decision::Skip => {
                    info!(rule_id = %finding.rule_id, "Skipped");
                    self.tracker.record_skipped(&finding.rule_id);
                }
                Decision::Apply => {
                    let request = ApplyRequest {
                        finding: finding.clone(),
                        playbook_yaml: proposed,
                        confirmed: true,
                        dry_run: config.dry_run,
                    };
                    match self.engines.remediator.apply(request).await {
                        Ok(applied) if applied.success => {
                            info!(rule_id = %finding.rule_id, "Applied");
                            self.tracker.record_applied(&finding.rule_id);
                        }
                        Ok(applied) => {
                            warn!(
                                rule_id = %finding.rule_id,
                                output = %applied.output,
                                "Remediation reported failure"
                            );
                            self.tracker.record_failed(&finding.rule_id);
                        }
                        Err(e) => {
                            warn!(rule_id = %finding.rule_id, error = %e, "Remediation apply errored");
                            self.tracker.record_failed(&finding.rule_id);
                        }
                    }
                }
            }

            let mut state = self.handle.state.write().await;
            state.remaining = total - (index + 1);
            state.applied = self.tracker.applied().to_vec();
            state.skipped = self.tracker.skipped().to_vec();
            state.failed = self.tracker.failed().to_vec();
        }

        Ok(())
    }

    /// Expose one pending approval and park until the decision arrives.
    async fn await_decision(&mut self, pending: PendingApproval) -> Decision {
        self.handle.state.write().await.pending = Some(pending);

        // A closed channel means the host dropped the handle; treat it as
        // a quit so the session still reaches a terminal phase.
        let decision = self.decision_rx.recv().await.unwrap_or(Decision::Quit);

        self.handle.state.write().await.pending = None;
        decision
    }

    /// Re-scan, record the after entry, and request the narrative summary.
    async fn validate(
        &mut self,
        config: &SessionConfig,
        before_entry: &LedgerEntry,
    ) -> Result<(), OrchestratorError> {
        let after = self
            .run_scan(ScanRequest {
                profile: Some(config.profile.clone()),
                min_severity: Some(config.min_severity),
                results_xml: None,
            })
            .await?;

        self.handle.state.write().await.after_score = Some(after.score);

        let summary = self.tracker.summary();
        let after_entry = self
            .ledger
            .record_scan(&after.score, &after.findings, &summary.applied)
            .await?;

        // The ledger rows are durable at this point; a missing narrative
        // must not throw the session into Error.
        let request = SummaryRequest {
            before: before_entry.clone(),
            after: after_entry,
            applied: summary.applied,
            skipped: summary.skipped,
            failed: summary.failed,
            remaining: after.findings,
        };
        match self.engines.reasoner.summarize(&request).await {
            Ok(report) => {
                self.handle.state.write().await.final_report = Some(report);
            }
            Err(e) => {
                warn!(error = %e, "Executive summary unavailable");
            }
        }

        Ok(())
    }

    /// Launch a scan job and poll it to completion within the deadline.
    async fn run_scan(&self, request: ScanRequest) -> Result<ScanOutcome, OrchestratorError> {
        let job = self.engines.scanner.start_scan(request).await?;
        self.poll_until_complete(&job).await
    }

    async fn poll_until_complete(
        &self,
        job: &JobHandle,
    ) -> Result<ScanOutcome, OrchestratorError> {
        let deadline = Instant::now() + self.timing.scan_timeout;
        loop {
            match self.engines.scanner.poll_scan(job).await? {
                ScanJobStatus::Complete(outcome) => return Ok(outcome),
                ScanJobStatus::Error(message) => {
                    return Err(OrchestratorError::ScanFailed(message))
                }
                ScanJobStatus::Queued | ScanJobStatus::Running => {}
            }
            if Instant::now() >= deadline {
                return Err(OrchestratorError::Timeout(self.timing.scan_timeout));
            }
            sleep(self.timing.poll_interval).await;
        }
    }

    async fn finish(&mut self) -> Result<(), OrchestratorError> {
        if let Err(e) = self.tracker.save_session_log(&self.reports_dir) {
            warn!(error = %e, "Could not write session log");
        }

        let summary = self.tracker.summary();
        let mut state = self.handle.state.write().await;
        state.applied = summary.applied;
        state.skipped = summary.skipped;
        state.failed = summary.failed;
        state.phase = Phase::Complete;
        info!(
            session_id = %self.handle.id,
            applied = state.applied.len(),
            skipped = state.skipped.len(),
            failed = state.failed.len(),
            "Session complete"
        );
        Ok(())
    }

    async fn set_phase(&self, phase: Phase) {
        self.handle.state.write().await.phase = phase;
        info!(session_id = %self.handle.id, phase = %phase, "Phase transition");
    }
}
