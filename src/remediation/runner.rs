// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! ansible-playbook execution.
//!
//! Applies one playbook artifact at a time with a hard wall-clock timeout.
//! Dry-run adds `--check` so ansible reports what would change without
//! mutating the system. Output is captured and bounded; a timeout is a
//! failure with the reason as output, never a hung session.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::errors::OrchestratorError;

const DEFAULT_APPLY_TIMEOUT: Duration = Duration::from_secs(120);

/// Captured output is operational logging, not an unbounded buffer.
const MAX_OUTPUT_CHARS: usize = 2000;

#[derive(Debug)]
pub struct PlaybookRunner {
    binary: String,
    apply_timeout: Duration,
}

impl PlaybookRunner {
    /// Allowed ansible-playbook binary locations for security
    const ALLOWED_BINARY_PATHS: &'static [&'static str] = &[
        "ansible-playbook",
        "/usr/bin/ansible-playbook",
        "/usr/local/bin/ansible-playbook",
    ];

    pub fn new(binary: &str, apply_timeout: Option<Duration>) -> Result<Self, OrchestratorError> {
        if !Self::ALLOWED_BINARY_PATHS.contains(&binary) {
            return Err(OrchestratorError::Configuration(format!(
                "ansible-playbook binary path not allowed: {}",
                binary
            )));
        }
        Ok(Self {
            binary: binary.to_string(),
            apply_timeout: apply_timeout.unwrap_or(DEFAULT_APPLY_TIMEOUT),
        })
    }

    /// Verify ansible-playbook is runnable.
    pub async fn check_prerequisites(&self) -> Result<(), OrchestratorError> {
        let probe = Command::new(&self.binary)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status();
        match timeout(Duration::from_secs(10), probe).await {
            Ok(Ok(status)) if status.success() => Ok(()),
            Ok(Ok(status)) => Err(OrchestratorError::Configuration(format!(
                "ansible-playbook --version exited with {}",
                status
            ))),
            Ok(Err(e)) => Err(OrchestratorError::Configuration(format!(
                "ansible-playbook not found ({}). Install with: sudo dnf install ansible",
                e
            ))),
            Err(_) => Err(OrchestratorError::Configuration(
                "ansible-playbook --version did not respond".to_string(),
            )),
        }
    }

    /// Run the playbook. Returns (success, captured output). Never errors:
    /// launch failures and timeouts are reported as unsuccessful output so
    /// the finding queue keeps moving.
    pub async fn apply_playbook(&self, playbook: &Path, dry_run: bool) -> (bool, String) {
        let mut cmd = Command::new(&self.binary);
        cmd.arg(playbook).arg("-v");
        if dry_run {
            cmd.arg("--check");
            info!(playbook = ?playbook, "DRY RUN MODE — no changes will be applied");
        }

        let output = cmd
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        match timeout(self.apply_timeout, output).await {
            Ok(Ok(output)) => {
                let success = output.status.success();
                let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
                combined.push_str(&String::from_utf8_lossy(&output.stderr));
                if !success {
                    warn!(playbook = ?playbook, code = ?output.status.code(), "Playbook run failed");
                }
                (success, truncate_tail(&combined, MAX_OUTPUT_CHARS))
            }
            Ok(Err(e)) => (
                false,
                format!(
                    "ansible-playbook not found ({}). Install with: sudo dnf install ansible",
                    e
                ),
            ),
            Err(_) => {
                warn!(playbook = ?playbook, timeout = ?self.apply_timeout, "Playbook execution timed out");
                (
                    false,
                    format!(
                        "Playbook execution timed out after {} seconds",
                        self.apply_timeout.as_secs()
                    ),
                )
            }
        }
    }
}

/// Keep the tail of the output, respecting char boundaries.
fn truncate_tail(s: &str, max_chars: usize) -> String {
    let mut start = s.len().saturating_sub(max_chars);
    while start < s.len() && !s.is_char_boundary(start) {
        start += 1;
    }
    s[start..].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_unlisted_binary_path() {
        let err = PlaybookRunner::new("/opt/custom/ansible-playbook", None).unwrap_err();
        assert!(matches!(err, OrchestratorError::Configuration(_)));
    }

    #[test]
    fn test_truncate_keeps_tail() {
        let long = "x".repeat(5000);
        let truncated = truncate_tail(&long, MAX_OUTPUT_CHARS);
        assert_eq!(truncated.len(), MAX_OUTPUT_CHARS);

        let short = "all good";
        assert_eq!(truncate_tail(short, MAX_OUTPUT_CHARS), short);
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let s = format!("{}ä-tail", "y".repeat(10));
        // Cut would land mid-codepoint without the boundary walk.
        let out = truncate_tail(&s, 6);
        assert!(out.ends_with("-tail"));
    }
}
