// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * OpenSCAP Scan Executor
 * Runs `oscap xccdf eval` against a SCAP datastream and produces
 * timestamped results/report artifacts for the parser.
 *
 * © 2026 Bountyy Oy
 */

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use chrono::Utc;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::errors::OrchestratorError;

/// oscap exits 2 when the scan completed and produced failing rules.
/// That is a successful scan, not an error.
const EXIT_COMPLETED_WITH_FINDINGS: i32 = 2;

const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_secs(600);

#[derive(Debug)]
pub struct OscapScanner {
    binary: String,
    content_path: PathBuf,
    profile: String,
    reports_dir: PathBuf,
    scan_timeout: Duration,
}

impl OscapScanner {
    /// Allowed oscap binary locations for security
    const ALLOWED_BINARY_PATHS: &'static [&'static str] = &[
        "oscap",                 // Search in PATH
        "/usr/bin/oscap",        // Common Linux install
        "/usr/local/bin/oscap",  // Local install
    ];

    pub fn new(
        binary: &str,
        content_path: &Path,
        profile: &str,
        reports_dir: &Path,
        scan_timeout: Option<Duration>,
    ) -> Result<Self, OrchestratorError> {
        if !Self::ALLOWED_BINARY_PATHS.contains(&binary) {
            return Err(OrchestratorError::Configuration(format!(
                "oscap binary path not allowed: {}",
                binary
            )));
        }

        Ok(Self {
            binary: binary.to_string(),
            content_path: content_path.to_path_buf(),
            profile: Self::full_profile_id(profile),
            reports_dir: reports_dir.to_path_buf(),
            scan_timeout: scan_timeout.unwrap_or(DEFAULT_SCAN_TIMEOUT),
        })
    }

    /// Expand a short profile name to the full SSG profile id.
    fn full_profile_id(profile: &str) -> String {
        if profile.starts_with("xccdf_") {
            profile.to_string()
        } else {
            format!("xccdf_org.ssgproject.content_profile_{}", profile)
        }
    }

    pub fn profile(&self) -> &str {
        &self.profile
    }

    /// Verify oscap is runnable and the SCAP datastream exists.
    pub async fn check_prerequisites(&self) -> Result<(), OrchestratorError> {
        let probe = Command::new(&self.binary)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status();
        match timeout(Duration::from_secs(10), probe).await {
            Ok(Ok(status)) if status.success() => {}
            Ok(Ok(status)) => {
                return Err(OrchestratorError::ScanFailed(format!(
                    "oscap --version exited with {}",
                    status
                )))
            }
            Ok(Err(e)) => {
                return Err(OrchestratorError::ScanFailed(format!(
                    "oscap not found ({}). Install with: sudo dnf install openscap-scanner scap-security-guide",
                    e
                )))
            }
            Err(_) => {
                return Err(OrchestratorError::ScanFailed(
                    "oscap --version did not respond".to_string(),
                ))
            }
        }

        if !self.content_path.exists() {
            return Err(OrchestratorError::ScanFailed(format!(
                "SCAP content not found at {:?}. Install with: sudo dnf install scap-security-guide",
                self.content_path
            )));
        }
        Ok(())
    }

    /// Execute the scan. Returns (results_xml, report_html). Must run as
    /// root for accurate results.
    pub async fn run_scan(&self) -> Result<(PathBuf, PathBuf), OrchestratorError> {
        std::fs::create_dir_all(&self.reports_dir).map_err(|e| {
            OrchestratorError::ScanFailed(format!("create {:?}: {}", self.reports_dir, e))
        })?;

        let stamp = Utc::now().format("%Y%m%d_%H%M%S");
        let results_xml = self.reports_dir.join(format!("scan_results_{}.xml", stamp));
        let report_html = self.reports_dir.join(format!("scan_report_{}.html", stamp));

        info!(profile = %self.profile, "Running OpenSCAP scan, this may take several minutes");

        let output = Command::new(&self.binary)
            .arg("xccdf")
            .arg("eval")
            .arg("--profile")
            .arg(&self.profile)
            .arg("--results")
            .arg(&results_xml)
            .arg("--report")
            .arg(&report_html)
            .arg("--oval-results")
            .arg(&self.content_path)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = match timeout(self.scan_timeout, output).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(OrchestratorError::ScanFailed(format!(
                    "failed to launch oscap: {}",
                    e
                )))
            }
            Err(_) => {
                warn!(timeout = ?self.scan_timeout, "OpenSCAP scan timed out");
                return Err(OrchestratorError::Timeout(self.scan_timeout));
            }
        };

        match output.status.code() {
            Some(0) | Some(EXIT_COMPLETED_WITH_FINDINGS) => {
                info!(results = ?results_xml, report = ?report_html, "Scan complete");
                Ok((results_xml, report_html))
            }
            code => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Err(OrchestratorError::ScanFailed(format!(
                    "oscap exited with {:?}: {}",
                    code,
                    stderr.trim()
                )))
            }
        }
    }
}
