// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Orchestrator Error Types
 * Production-ready error handling with thiserror
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Which external engine a transport or availability failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineKind {
    Scan,
    Reasoning,
    Remediation,
}

impl std::fmt::Display for EngineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineKind::Scan => write!(f, "scan"),
            EngineKind::Reasoning => write!(f, "reasoning"),
            EngineKind::Remediation => write!(f, "remediation"),
        }
    }
}

/// Main orchestrator error type covering scan, analysis, remediation and
/// session protocol failures.
#[derive(Error, Debug)]
pub enum OrchestratorError {
    /// The referenced results artifact does not exist
    #[error("Results file not found: {0}")]
    ReportNotFound(PathBuf),

    /// The results artifact exists but cannot be parsed as XCCDF
    #[error("Malformed XCCDF report: {0}")]
    MalformedReport(String),

    /// An external engine is unreachable or timed out
    #[error("{engine} engine unavailable: {reason}")]
    EngineUnavailable { engine: EngineKind, reason: String },

    /// A remediation artifact executed but did not succeed
    #[error("Remediation failed for {rule_id}: {output}")]
    RemediationApplyFailure { rule_id: String, output: String },

    /// Scan tool launch or execution failure (anything but exit 0/2)
    #[error("Scan failed: {0}")]
    ScanFailed(String),

    /// A long-running operation exceeded its deadline
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// A decision value outside apply/skip/quit
    #[error("Invalid decision '{0}': expected apply, skip or quit")]
    InvalidDecision(String),

    /// An apply was attempted without the explicit confirmation flag
    #[error("confirmed must be true to apply remediations")]
    ConfirmationRequired,

    /// A decision was submitted while no approval was pending
    #[error("No pending approval awaiting a decision")]
    NoPendingApproval,

    /// A decision named a rule other than the one pending
    #[error("Pending approval is for {expected}, not {got}")]
    PendingMismatch { expected: String, got: String },

    /// A decision was submitted before the previous one was consumed
    #[error("A decision for the pending approval was already submitted")]
    DecisionAlreadySubmitted,

    /// No proceed/decline confirmation is currently awaited
    #[error("Session is not awaiting a proceed confirmation")]
    NotAwaitingProceed,

    /// Unknown session id
    #[error("Session not found: {0}")]
    SessionNotFound(uuid::Uuid),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Ledger persistence errors
    #[error("Ledger error: {0}")]
    Ledger(String),

    /// Artifact generation or filesystem errors
    #[error("Artifact error: {0}")]
    Artifact(String),
}

impl OrchestratorError {
    /// True for failures that are local to one finding and must not abort
    /// the session.
    pub fn is_finding_local(&self) -> bool {
        matches!(
            self,
            OrchestratorError::RemediationApplyFailure { .. }
                | OrchestratorError::ConfirmationRequired
        )
    }
}
