// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Compliance ledger: durable append-only history of scan snapshots.
//!
//! The ledger is the only state that outlives a session. It is loaded from
//! `compliance_history.json` at startup and every append is written through
//! to disk (temp file + rename) before the call returns. Entries are never
//! mutated or deleted; improvement is always last-entry minus first-entry.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::errors::OrchestratorError;
use crate::findings::{count_by_severity, ComplianceScore, Finding};

pub const HISTORY_FILE: &str = "compliance_history.json";

/// One row per scan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LedgerEntry {
    pub timestamp: String,
    pub score: f64,
    pub pass_count: u32,
    pub fail_count: u32,
    pub cat1_fails: usize,
    pub cat2_fails: usize,
    pub cat3_fails: usize,
    /// Rule ids applied since the previous entry.
    pub applied_fixes: Vec<String>,
}

/// Improvement between the first and the most recent scan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Improvement {
    pub score_delta: f64,
    pub failures_fixed: i64,
    pub first_score: f64,
    pub last_score: f64,
    pub scan_count: usize,
}

pub struct ComplianceLedger {
    history_path: PathBuf,
    history: Mutex<Vec<LedgerEntry>>,
}

impl ComplianceLedger {
    /// Load existing history from the reports directory, creating the
    /// directory if needed.
    pub fn load(reports_dir: &Path) -> Result<Self, OrchestratorError> {
        std::fs::create_dir_all(reports_dir)
            .map_err(|e| OrchestratorError::Ledger(format!("create {:?}: {}", reports_dir, e)))?;
        let history_path = reports_dir.join(HISTORY_FILE);

        let history = if history_path.exists() {
            let content = std::fs::read_to_string(&history_path)
                .map_err(|e| OrchestratorError::Ledger(format!("read {:?}: {}", history_path, e)))?;
            serde_json::from_str(&content)
                .map_err(|e| OrchestratorError::Ledger(format!("parse {:?}: {}", history_path, e)))?
        } else {
            Vec::new()
        };

        info!(
            path = ?history_path,
            entries = history.len(),
            "Compliance ledger loaded"
        );

        Ok(Self {
            history_path,
            history: Mutex::new(history),
        })
    }

    /// Append a scan snapshot. The per-severity fail counts come from the
    /// findings passed here, not from prior ledger state. Durable before
    /// this returns.
    pub async fn record_scan(
        &self,
        score: &ComplianceScore,
        findings: &[Finding],
        applied: &[String],
    ) -> Result<LedgerEntry, OrchestratorError> {
        let (cat1_fails, cat2_fails, cat3_fails) = count_by_severity(findings);

        let entry = LedgerEntry {
            timestamp: Utc::now().to_rfc3339(),
            score: score.score,
            pass_count: score.pass_count,
            fail_count: score.fail_count,
            cat1_fails,
            cat2_fails,
            cat3_fails,
            applied_fixes: applied.to_vec(),
        };

        let mut history = self.history.lock().await;
        history.push(entry.clone());
        self.persist(&history)?;

        debug!(
            score = entry.score,
            fails = entry.fail_count,
            applied = entry.applied_fixes.len(),
            "Ledger entry recorded"
        );
        Ok(entry)
    }

    /// Improvement between the first and last entry. `None` until at least
    /// two scans were recorded — not an error.
    pub async fn improvement(&self) -> Option<Improvement> {
        let history = self.history.lock().await;
        if history.len() < 2 {
            return None;
        }
        let first = &history[0];
        let last = &history[history.len() - 1];
        Some(Improvement {
            score_delta: ((last.score - first.score) * 10.0).round() / 10.0,
            failures_fixed: i64::from(first.fail_count) - i64::from(last.fail_count),
            first_score: first.score,
            last_score: last.score,
            scan_count: history.len(),
        })
    }

    /// Full history, ordered by append time.
    pub async fn history(&self) -> Vec<LedgerEntry> {
        self.history.lock().await.clone()
    }

    /// Most recent entry, if any scan has been recorded.
    pub async fn latest(&self) -> Option<LedgerEntry> {
        self.history.lock().await.last().cloned()
    }

    /// Write the full history to a temp file and rename it into place so a
    /// crash mid-write never truncates the ledger.
    fn persist(&self, history: &[LedgerEntry]) -> Result<(), OrchestratorError> {
        let json = serde_json::to_string_pretty(history)
            .map_err(|e| OrchestratorError::Ledger(format!("serialize history: {}", e)))?;

        let tmp_path = self.history_path.with_extension("json.tmp");
        std::fs::write(&tmp_path, json)
            .map_err(|e| OrchestratorError::Ledger(format!("write {:?}: {}", tmp_path, e)))?;
        std::fs::rename(&tmp_path, &self.history_path)
            .map_err(|e| OrchestratorError::Ledger(format!("rename {:?}: {}", tmp_path, e)))?;
        Ok(())
    }
}
