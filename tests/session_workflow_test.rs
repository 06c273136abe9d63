// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Session Workflow Tests
 * End-to-end state machine scenarios with scripted engines
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

mod common;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use common::{drive, engines, finding, outcome, test_timing};
use common::{ScriptedReasoner, ScriptedRemediator, ScriptedScanEngine};

use panssari::findings::{Severity, SeverityFloor};
use panssari::ledger::ComplianceLedger;
use panssari::session::{new_session, Decision, Phase, SessionConfig, SessionHandle};

fn config() -> SessionConfig {
    SessionConfig {
        min_severity: SeverityFloor::All,
        ..Default::default()
    }
}

fn start(
    session_config: SessionConfig,
    engine_set: panssari::engine::EngineSet,
    ledger: Arc<ComplianceLedger>,
    reports_dir: std::path::PathBuf,
) -> Arc<SessionHandle> {
    let (handle, driver) = new_session(
        session_config,
        engine_set,
        ledger,
        test_timing(),
        reports_dir,
    );
    tokio::spawn(driver.run());
    handle
}

fn decisions(pairs: &[(&str, Decision)]) -> HashMap<String, Decision> {
    pairs
        .iter()
        .map(|(rule, decision)| (rule.to_string(), *decision))
        .collect()
}

#[tokio::test]
async fn full_session_applies_and_validates() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = Arc::new(ComplianceLedger::load(dir.path()).unwrap());

    let findings = vec![
        finding("rule_cat1", Severity::CatI),
        finding("rule_cat2", Severity::CatII),
    ];
    let scanner = ScriptedScanEngine::new(vec![
        outcome(40, findings.clone()),
        outcome(42, vec![]), // validation re-scan: everything fixed
    ]);

    let handle = start(
        config(),
        engines(scanner, ScriptedReasoner::default(), ScriptedRemediator::default()),
        Arc::clone(&ledger),
        dir.path().to_path_buf(),
    );

    let view = drive(
        &handle,
        true,
        &decisions(&[("rule_cat1", Decision::Apply), ("rule_cat2", Decision::Apply)]),
    )
    .await;

    assert_eq!(view.phase, Phase::Complete);
    assert_eq!(view.applied, vec!["rule_cat1", "rule_cat2"]);
    assert!(view.skipped.is_empty());
    assert!(view.failed.is_empty());
    assert!(view.error.is_none());
    assert_eq!(view.score_after, Some(100.0));
    assert!(view.final_report.as_deref().unwrap().contains("2 applied"));

    // Two durable ledger rows: baseline with no applied fixes, then the
    // validation entry carrying the real applied list.
    let history = ledger.history().await;
    assert_eq!(history.len(), 2);
    assert!(history[0].applied_fixes.is_empty());
    assert_eq!(history[1].applied_fixes, vec!["rule_cat1", "rule_cat2"]);

    let improvement = ledger.improvement().await.unwrap();
    assert!(improvement.score_delta > 0.0);
    assert_eq!(improvement.failures_fixed, 2);
}

#[tokio::test]
async fn skipping_everything_never_validates() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = Arc::new(ComplianceLedger::load(dir.path()).unwrap());

    let findings = vec![
        finding("rule_a", Severity::CatI),
        finding("rule_b", Severity::CatII),
        finding("rule_c", Severity::CatIII),
    ];
    // Only one scripted outcome: a validation re-scan would fail the test
    // by exhausting the script.
    let scanner = ScriptedScanEngine::new(vec![outcome(10, findings)]);

    let handle = start(
        config(),
        engines(scanner, ScriptedReasoner::default(), ScriptedRemediator::default()),
        Arc::clone(&ledger),
        dir.path().to_path_buf(),
    );

    let view = drive(&handle, true, &HashMap::new()).await;

    assert_eq!(view.phase, Phase::Complete);
    assert!(view.applied.is_empty());
    assert_eq!(view.skipped.len(), 3);
    assert!(view.failed.is_empty());
    assert!(view.score_after.is_none());
    assert_eq!(ledger.history().await.len(), 1);
}

#[tokio::test]
async fn failed_apply_is_local_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = Arc::new(ComplianceLedger::load(dir.path()).unwrap());

    let findings = vec![
        finding("rule_times_out", Severity::CatI),
        finding("rule_fine", Severity::CatII),
    ];
    let scanner = ScriptedScanEngine::new(vec![
        outcome(40, findings),
        outcome(41, vec![finding("rule_times_out", Severity::CatI)]),
    ]);
    let remediator = ScriptedRemediator {
        fail_rules: HashSet::from(["rule_times_out".to_string()]),
        ..Default::default()
    };

    let handle = start(
        config(),
        engines(scanner, ScriptedReasoner::default(), remediator),
        Arc::clone(&ledger),
        dir.path().to_path_buf(),
    );

    let view = drive(
        &handle,
        true,
        &decisions(&[
            ("rule_times_out", Decision::Apply),
            ("rule_fine", Decision::Apply),
        ]),
    )
    .await;

    // The timed-out apply lands in failed and the loop keeps going.
    assert_eq!(view.phase, Phase::Complete);
    assert!(view.error.is_none());
    assert_eq!(view.failed, vec!["rule_times_out"]);
    assert_eq!(view.applied, vec!["rule_fine"]);
    // Validation still ran because one fix was applied.
    assert!(view.score_after.is_some());
}

#[tokio::test]
async fn transport_error_during_apply_is_recorded_as_failed() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = Arc::new(ComplianceLedger::load(dir.path()).unwrap());

    let scanner =
        ScriptedScanEngine::new(vec![outcome(40, vec![finding("rule_x", Severity::CatII)])]);
    let remediator = ScriptedRemediator {
        error_rules: HashSet::from(["rule_x".to_string()]),
        ..Default::default()
    };

    let handle = start(
        config(),
        engines(scanner, ScriptedReasoner::default(), remediator),
        Arc::clone(&ledger),
        dir.path().to_path_buf(),
    );

    let view = drive(&handle, true, &decisions(&[("rule_x", Decision::Apply)])).await;

    assert_eq!(view.phase, Phase::Complete);
    assert_eq!(view.failed, vec!["rule_x"]);
    assert!(view.applied.is_empty());
}

#[tokio::test]
async fn triage_outage_moves_session_to_error() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = Arc::new(ComplianceLedger::load(dir.path()).unwrap());

    let scanner =
        ScriptedScanEngine::new(vec![outcome(40, vec![finding("rule_x", Severity::CatI)])]);
    let reasoner = ScriptedReasoner {
        fail_batch: true,
        ..Default::default()
    };

    let handle = start(
        config(),
        engines(scanner, reasoner, ScriptedRemediator::default()),
        Arc::clone(&ledger),
        dir.path().to_path_buf(),
    );

    let view = drive(&handle, true, &HashMap::new()).await;

    assert_eq!(view.phase, Phase::Error);
    let error = view.error.expect("error message preserved");
    assert!(error.contains("reasoning engine unavailable"));
    // No findings were processed.
    assert!(view.applied.is_empty());
    assert!(view.skipped.is_empty());
    assert!(view.failed.is_empty());
}

#[tokio::test]
async fn per_finding_analysis_outage_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = Arc::new(ComplianceLedger::load(dir.path()).unwrap());

    let scanner =
        ScriptedScanEngine::new(vec![outcome(40, vec![finding("rule_x", Severity::CatI)])]);
    let reasoner = ScriptedReasoner {
        fail_analysis: true,
        ..Default::default()
    };

    let handle = start(
        config(),
        engines(scanner, reasoner, ScriptedRemediator::default()),
        Arc::clone(&ledger),
        dir.path().to_path_buf(),
    );

    let view = drive(&handle, true, &HashMap::new()).await;
    assert_eq!(view.phase, Phase::Error);
    assert!(view.error.is_some());
}

#[tokio::test]
async fn quit_leaves_remaining_findings_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = Arc::new(ComplianceLedger::load(dir.path()).unwrap());

    let findings = vec![
        finding("rule_1", Severity::CatI),
        finding("rule_2", Severity::CatI),
        finding("rule_3", Severity::CatII),
        finding("rule_4", Severity::CatII),
        finding("rule_5", Severity::CatIII),
    ];
    let scanner = ScriptedScanEngine::new(vec![
        outcome(40, findings),
        outcome(45, vec![finding("rule_3", Severity::CatII)]),
    ]);

    let handle = start(
        config(),
        engines(scanner, ScriptedReasoner::default(), ScriptedRemediator::default()),
        Arc::clone(&ledger),
        dir.path().to_path_buf(),
    );

    let view = drive(
        &handle,
        true,
        &decisions(&[
            ("rule_1", Decision::Apply),
            ("rule_2", Decision::Apply),
            ("rule_3", Decision::Quit),
        ]),
    )
    .await;

    assert_eq!(view.phase, Phase::Complete);
    assert_eq!(view.applied, vec!["rule_1", "rule_2"]);
    assert!(view.skipped.is_empty());
    assert!(view.failed.is_empty());

    // The abandoned findings are in none of the three sets.
    let all: Vec<&String> = view
        .applied
        .iter()
        .chain(view.skipped.iter())
        .chain(view.failed.iter())
        .collect();
    assert!(!all.iter().any(|r| *r == "rule_3" || *r == "rule_4" || *r == "rule_5"));

    // Validation still ran: two fixes were applied and this was no dry run.
    assert!(view.score_after.is_some());
    assert_eq!(ledger.history().await.len(), 2);
}

#[tokio::test]
async fn outcome_sets_stay_disjoint() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = Arc::new(ComplianceLedger::load(dir.path()).unwrap());

    let findings = vec![
        finding("rule_apply", Severity::CatI),
        finding("rule_skip", Severity::CatII),
        finding("rule_fail", Severity::CatII),
    ];
    let scanner = ScriptedScanEngine::new(vec![outcome(40, findings), outcome(41, vec![])]);
    let remediator = ScriptedRemediator {
        fail_rules: HashSet::from(["rule_fail".to_string()]),
        ..Default::default()
    };

    let handle = start(
        config(),
        engines(scanner, ScriptedReasoner::default(), remediator),
        Arc::clone(&ledger),
        dir.path().to_path_buf(),
    );

    let view = drive(
        &handle,
        true,
        &decisions(&[
            ("rule_apply", Decision::Apply),
            ("rule_skip", Decision::Skip),
            ("rule_fail", Decision::Apply),
        ]),
    )
    .await;

    let mut seen = HashSet::new();
    for rule in view
        .applied
        .iter()
        .chain(view.skipped.iter())
        .chain(view.failed.iter())
    {
        assert!(seen.insert(rule.clone()), "{} appears in two sets", rule);
    }
    assert_eq!(seen.len(), 3);
}

#[tokio::test]
async fn declined_triage_completes_without_processing() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = Arc::new(ComplianceLedger::load(dir.path()).unwrap());

    let scanner =
        ScriptedScanEngine::new(vec![outcome(40, vec![finding("rule_x", Severity::CatI)])]);

    let handle = start(
        config(),
        engines(scanner, ScriptedReasoner::default(), ScriptedRemediator::default()),
        Arc::clone(&ledger),
        dir.path().to_path_buf(),
    );

    let view = drive(&handle, false, &HashMap::new()).await;

    assert_eq!(view.phase, Phase::Complete);
    assert!(view.applied.is_empty());
    assert!(view.skipped.is_empty());
    assert!(view.failed.is_empty());
    assert!(view.score_after.is_none());
    assert!(view.triage_report.is_some());
}

#[tokio::test]
async fn dry_run_applies_but_never_validates() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = Arc::new(ComplianceLedger::load(dir.path()).unwrap());

    let scanner =
        ScriptedScanEngine::new(vec![outcome(40, vec![finding("rule_x", Severity::CatI)])]);

    let session_config = SessionConfig {
        dry_run: true,
        min_severity: SeverityFloor::All,
        ..Default::default()
    };
    let handle = start(
        session_config,
        engines(scanner, ScriptedReasoner::default(), ScriptedRemediator::default()),
        Arc::clone(&ledger),
        dir.path().to_path_buf(),
    );

    let view = drive(&handle, true, &decisions(&[("rule_x", Decision::Apply)])).await;

    assert_eq!(view.phase, Phase::Complete);
    assert_eq!(view.applied, vec!["rule_x"]);
    assert!(view.score_after.is_none());
    assert_eq!(ledger.history().await.len(), 1);
}

#[tokio::test]
async fn clean_scan_completes_immediately() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = Arc::new(ComplianceLedger::load(dir.path()).unwrap());

    let scanner = ScriptedScanEngine::new(vec![outcome(100, vec![])]);

    let handle = start(
        config(),
        engines(scanner, ScriptedReasoner::default(), ScriptedRemediator::default()),
        Arc::clone(&ledger),
        dir.path().to_path_buf(),
    );

    let view = drive(&handle, true, &HashMap::new()).await;

    assert_eq!(view.phase, Phase::Complete);
    assert_eq!(view.total_findings, 0);
    assert_eq!(view.score_before, Some(100.0));
    // Baseline is still recorded for the next run's comparison.
    assert_eq!(ledger.history().await.len(), 1);
}

#[tokio::test]
async fn scan_only_stops_after_baseline() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = Arc::new(ComplianceLedger::load(dir.path()).unwrap());

    let scanner =
        ScriptedScanEngine::new(vec![outcome(40, vec![finding("rule_x", Severity::CatI)])]);

    let session_config = SessionConfig {
        scan_only: true,
        min_severity: SeverityFloor::All,
        ..Default::default()
    };
    let handle = start(
        session_config,
        engines(scanner, ScriptedReasoner::default(), ScriptedRemediator::default()),
        Arc::clone(&ledger),
        dir.path().to_path_buf(),
    );

    let view = drive(&handle, true, &HashMap::new()).await;

    assert_eq!(view.phase, Phase::Complete);
    assert_eq!(view.total_findings, 1);
    assert!(view.triage_report.is_none());
    assert_eq!(ledger.history().await.len(), 1);
}

#[tokio::test]
async fn auto_apply_handles_cat3_without_gate() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = Arc::new(ComplianceLedger::load(dir.path()).unwrap());

    let findings = vec![
        finding("rule_cat1", Severity::CatI),
        finding("rule_cat3", Severity::CatIII),
    ];
    let scanner = ScriptedScanEngine::new(vec![outcome(40, findings), outcome(41, vec![])]);

    let session_config = SessionConfig {
        auto_apply_low_severity: true,
        min_severity: SeverityFloor::All,
        ..Default::default()
    };
    let handle = start(
        session_config,
        engines(scanner, ScriptedReasoner::default(), ScriptedRemediator::default()),
        Arc::clone(&ledger),
        dir.path().to_path_buf(),
    );

    // Only the CAT I finding gets a decision; the CAT III one must apply
    // on its own.
    let view = drive(&handle, true, &decisions(&[("rule_cat1", Decision::Skip)])).await;

    assert_eq!(view.phase, Phase::Complete);
    assert_eq!(view.applied, vec!["rule_cat3"]);
    assert_eq!(view.skipped, vec!["rule_cat1"]);
}

#[tokio::test]
async fn scan_launch_failure_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = Arc::new(ComplianceLedger::load(dir.path()).unwrap());

    let mut scanner = ScriptedScanEngine::new(vec![]);
    scanner.fail_start = true;

    let handle = start(
        config(),
        engines(scanner, ScriptedReasoner::default(), ScriptedRemediator::default()),
        Arc::clone(&ledger),
        dir.path().to_path_buf(),
    );

    let view = drive(&handle, true, &HashMap::new()).await;

    assert_eq!(view.phase, Phase::Error);
    assert!(view.error.unwrap().contains("Scan failed"));
    assert!(ledger.history().await.is_empty());
}

#[tokio::test]
async fn mismatched_decision_leaves_gate_intact() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = Arc::new(ComplianceLedger::load(dir.path()).unwrap());

    let scanner =
        ScriptedScanEngine::new(vec![outcome(40, vec![finding("rule_x", Severity::CatI)])]);

    let handle = start(
        config(),
        engines(scanner, ScriptedReasoner::default(), ScriptedRemediator::default()),
        Arc::clone(&ledger),
        dir.path().to_path_buf(),
    );

    // Wait for the gate to open.
    let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(5);
    loop {
        let view = handle.view().await;
        if view.awaiting_proceed {
            // Repeat sends before the driver consumes the first are
            // rejected; only the first answer matters.
            let _ = handle.confirm_proceed(true).await;
        }
        if handle.pending().await.is_some() {
            break;
        }
        assert!(tokio::time::Instant::now() < deadline, "gate never opened");
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }

    // Wrong rule id: rejected, the pending approval survives.
    let err = handle
        .submit_decision("rule_other", Decision::Apply)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        panssari::errors::OrchestratorError::PendingMismatch { .. }
    ));
    assert!(handle.pending().await.is_some());

    // The matching rule id resolves the gate and the session finishes.
    handle
        .submit_decision("rule_x", Decision::Skip)
        .await
        .unwrap();
    let view = drive(&handle, true, &HashMap::new()).await;
    assert_eq!(view.phase, Phase::Complete);
    assert_eq!(view.skipped, vec!["rule_x"]);
}
