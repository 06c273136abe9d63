// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Session data model: phases, operator decisions, the pending-approval
//! record and the externally visible session snapshot.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::OrchestratorError;
use crate::findings::{ComplianceScore, Finding, SeverityFloor};

/// Workflow phase. `Error` is absorbing and reachable from any
/// non-terminal phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Queued,
    Scanning,
    Analyzing,
    Remediating,
    Validating,
    Complete,
    Error,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Queued => "queued",
            Phase::Scanning => "scanning",
            Phase::Analyzing => "analyzing",
            Phase::Remediating => "remediating",
            Phase::Validating => "validating",
            Phase::Complete => "complete",
            Phase::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Complete | Phase::Error)
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Operator decision for one pending approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Apply,
    Skip,
    Quit,
}

impl std::str::FromStr for Decision {
    type Err = OrchestratorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "apply" | "a" => Ok(Decision::Apply),
            "skip" | "s" => Ok(Decision::Skip),
            "quit" | "q" => Ok(Decision::Quit),
            other => Err(OrchestratorError::InvalidDecision(other.to_string())),
        }
    }
}

/// Compact finding row for tables and progress displays.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindingSummary {
    pub rule_id: String,
    pub severity: crate::findings::Severity,
    pub title: String,
}

impl From<&Finding> for FindingSummary {
    fn from(finding: &Finding) -> Self {
        Self {
            rule_id: finding.rule_id.clone(),
            severity: finding.severity,
            title: finding.title.clone(),
        }
    }
}

/// Exactly one of these exists at a time while the session waits for an
/// operator decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingApproval {
    pub finding: Finding,
    pub analysis: String,
    pub playbook_yaml: String,
    /// 1-based position in the queue, for display.
    pub position: usize,
    pub total: usize,
}

/// Operator-supplied session configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_profile")]
    pub profile: String,
    #[serde(default)]
    pub min_severity: SeverityFloor,
    #[serde(default)]
    pub dry_run: bool,
    /// Auto-apply CAT III fixes without an approval gate.
    #[serde(default)]
    pub auto_apply_low_severity: bool,
    /// Parse this pre-existing results file instead of running a scan.
    #[serde(default)]
    pub results_xml: Option<PathBuf>,
    /// Stop after the baseline scan is recorded.
    #[serde(default)]
    pub scan_only: bool,
}

fn default_profile() -> String {
    "stig".to_string()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            profile: default_profile(),
            min_severity: SeverityFloor::default(),
            dry_run: false,
            auto_apply_low_severity: false,
            results_xml: None,
            scan_only: false,
        }
    }
}

/// The orchestrator's working memory for one run. Owned exclusively by the
/// session; everything external reads through `SessionView`.
#[derive(Debug)]
pub struct SessionState {
    pub phase: Phase,
    pub total_findings: usize,
    pub remaining: usize,
    pub findings_overview: Vec<FindingSummary>,
    pub applied: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<String>,
    pub before_score: Option<ComplianceScore>,
    pub after_score: Option<ComplianceScore>,
    pub pending: Option<PendingApproval>,
    pub awaiting_proceed: bool,
    pub triage_report: Option<String>,
    pub final_report: Option<String>,
    pub error: Option<String>,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            phase: Phase::Queued,
            total_findings: 0,
            remaining: 0,
            findings_overview: Vec::new(),
            applied: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
            before_score: None,
            after_score: None,
            pending: None,
            awaiting_proceed: false,
            triage_report: None,
            final_report: None,
            error: None,
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only snapshot handed to the API and the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionView {
    pub session_id: Uuid,
    pub phase: Phase,
    pub profile: String,
    pub min_severity: SeverityFloor,
    pub dry_run: bool,
    pub total_findings: usize,
    pub remaining: usize,
    #[serde(default)]
    pub findings_overview: Vec<FindingSummary>,
    pub applied: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<String>,
    #[serde(default)]
    pub score_before: Option<f64>,
    #[serde(default)]
    pub score_after: Option<f64>,
    #[serde(default)]
    pub triage_report: Option<String>,
    #[serde(default)]
    pub final_report: Option<String>,
    #[serde(default)]
    pub awaiting_proceed: bool,
    #[serde(default)]
    pub has_pending: bool,
    #[serde(default)]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_parsing() {
        assert_eq!("apply".parse::<Decision>().unwrap(), Decision::Apply);
        assert_eq!("A".parse::<Decision>().unwrap(), Decision::Apply);
        assert_eq!(" skip ".parse::<Decision>().unwrap(), Decision::Skip);
        assert_eq!("q".parse::<Decision>().unwrap(), Decision::Quit);

        let err = "approve".parse::<Decision>().unwrap_err();
        assert!(matches!(err, OrchestratorError::InvalidDecision(_)));
    }

    #[test]
    fn test_terminal_phases() {
        assert!(Phase::Complete.is_terminal());
        assert!(Phase::Error.is_terminal());
        assert!(!Phase::Remediating.is_terminal());
        assert!(!Phase::Queued.is_terminal());
    }

    #[test]
    fn test_phase_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Phase::Remediating).unwrap(),
            "\"remediating\""
        );
    }
}
