// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Session-scoped record of remediation outcomes.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::OrchestratorError;

/// Apply/skip/fail outcome lists for one session, in decision order.
#[derive(Debug, Default)]
pub struct RemediationTracker {
    applied: Vec<String>,
    skipped: Vec<String>,
    failed: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemediationSummary {
    pub applied: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<String>,
    pub total_applied: usize,
    pub total_skipped: usize,
    pub total_failed: usize,
}

impl RemediationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_applied(&mut self, rule_id: &str) {
        self.applied.push(rule_id.to_string());
    }

    pub fn record_skipped(&mut self, rule_id: &str) {
        self.skipped.push(rule_id.to_string());
    }

    pub fn record_failed(&mut self, rule_id: &str) {
        self.failed.push(rule_id.to_string());
    }

    pub fn applied(&self) -> &[String] {
        &self.applied
    }

    pub fn skipped(&self) -> &[String] {
        &self.skipped
    }

    pub fn failed(&self) -> &[String] {
        &self.failed
    }

    pub fn summary(&self) -> RemediationSummary {
        RemediationSummary {
            applied: self.applied.clone(),
            skipped: self.skipped.clone(),
            failed: self.failed.clone(),
            total_applied: self.applied.len(),
            total_skipped: self.skipped.len(),
            total_failed: self.failed.len(),
        }
    }

    /// Write a human-readable session summary artifact.
    pub fn save_session_log(&self, reports_dir: &Path) -> Result<PathBuf, OrchestratorError> {
        std::fs::create_dir_all(reports_dir).map_err(|e| {
            OrchestratorError::Artifact(format!("create {:?}: {}", reports_dir, e))
        })?;

        let stamp = Utc::now().format("%Y%m%d_%H%M%S");
        let path = reports_dir.join(format!("session_log_{}.txt", stamp));

        let join = |ids: &[String]| {
            if ids.is_empty() {
                "none".to_string()
            } else {
                ids.join(", ")
            }
        };

        let content = format!(
            "STIG Hardening Session — {}\n{}\n\n\
             Applied  ({}): {}\n\
             Skipped  ({}): {}\n\
             Failed   ({}): {}\n",
            Utc::now().to_rfc3339(),
            "=".repeat(60),
            self.applied.len(),
            join(&self.applied),
            self.skipped.len(),
            join(&self.skipped),
            self.failed.len(),
            join(&self.failed),
        );

        std::fs::write(&path, content)
            .map_err(|e| OrchestratorError::Artifact(format!("write {:?}: {}", path, e)))?;

        info!(path = ?path, "Session log saved");
        Ok(path)
    }
}
