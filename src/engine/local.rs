// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! In-process engine implementations.
//!
//! The scan engine runs oscap in a background task and tracks job state in
//! a shared map, so callers get the same start/poll contract they would
//! get from a remote deployment. The remediation engine generates the
//! playbook artifact and shells out to ansible-playbook, refusing any
//! request without the explicit confirmation flag.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::{error, info};
use uuid::Uuid;

use crate::errors::OrchestratorError;
use crate::findings::SeverityFloor;
use crate::remediation::{generate_playbook, PlaybookRunner};
use crate::report;
use crate::scanner::OscapScanner;

use super::{
    ApplyOutcome, ApplyRequest, JobHandle, RemediationEngine, ScanEngine, ScanJobStatus,
    ScanOutcome, ScanRequest,
};

/// Settings the in-process scan engine needs for each job.
#[derive(Debug, Clone)]
pub struct LocalScanSettings {
    pub oscap_binary: String,
    pub content_path: PathBuf,
    pub default_profile: String,
    pub reports_dir: PathBuf,
    pub default_floor: SeverityFloor,
    pub scan_timeout: Duration,
}

pub struct LocalScanEngine {
    settings: LocalScanSettings,
    jobs: Arc<RwLock<HashMap<Uuid, ScanJobStatus>>>,
}

impl LocalScanEngine {
    pub fn new(settings: LocalScanSettings) -> Self {
        Self {
            settings,
            jobs: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    async fn execute(settings: LocalScanSettings, request: ScanRequest) -> ScanJobStatus {
        let floor = request.min_severity.unwrap_or(settings.default_floor);

        let (results_xml, report_html) = if let Some(existing) = request.results_xml {
            (existing, None)
        } else {
            let profile = request
                .profile
                .unwrap_or_else(|| settings.default_profile.clone());
            let scanner = match OscapScanner::new(
                &settings.oscap_binary,
                &settings.content_path,
                &profile,
                &settings.reports_dir,
                Some(settings.scan_timeout),
            ) {
                Ok(scanner) => scanner,
                Err(e) => return ScanJobStatus::Error(e.to_string()),
            };
            if let Err(e) = scanner.check_prerequisites().await {
                return ScanJobStatus::Error(e.to_string());
            }
            match scanner.run_scan().await {
                Ok((results, report)) => (results, Some(report)),
                Err(e) => return ScanJobStatus::Error(e.to_string()),
            }
        };

        let findings = match report::parse_results(&results_xml, floor) {
            Ok(findings) => findings,
            Err(e) => return ScanJobStatus::Error(e.to_string()),
        };
        let score = match report::compliance_score(&results_xml) {
            Ok(score) => score,
            Err(e) => return ScanJobStatus::Error(e.to_string()),
        };

        ScanJobStatus::Complete(ScanOutcome {
            score,
            findings,
            results_xml,
            report_html,
        })
    }
}

#[async_trait::async_trait]
impl ScanEngine for LocalScanEngine {
    async fn start_scan(&self, request: ScanRequest) -> Result<JobHandle, OrchestratorError> {
        let job_id = Uuid::new_v4();
        self.jobs
            .write()
            .await
            .insert(job_id, ScanJobStatus::Queued);

        let settings = self.settings.clone();
        let jobs = Arc::clone(&self.jobs);
        tokio::spawn(async move {
            jobs.write().await.insert(job_id, ScanJobStatus::Running);

            let status = Self::execute(settings, request).await;
            match &status {
                ScanJobStatus::Complete(outcome) => info!(
                    %job_id,
                    findings = outcome.findings.len(),
                    score = outcome.score.score,
                    "Scan job complete"
                ),
                ScanJobStatus::Error(message) => {
                    error!(%job_id, error = %message, "Scan job failed")
                }
                _ => {}
            }
            jobs.write().await.insert(job_id, status);
        });

        info!(%job_id, "Scan job started");
        Ok(JobHandle { job_id })
    }

    async fn poll_scan(&self, job: &JobHandle) -> Result<ScanJobStatus, OrchestratorError> {
        self.jobs
            .read()
            .await
            .get(&job.job_id)
            .cloned()
            .ok_or_else(|| {
                OrchestratorError::ScanFailed(format!("unknown scan job {}", job.job_id))
            })
    }
}

pub struct LocalRemediationEngine {
    playbooks_dir: PathBuf,
    runner: PlaybookRunner,
}

impl LocalRemediationEngine {
    pub fn new(playbooks_dir: PathBuf, runner: PlaybookRunner) -> Self {
        Self {
            playbooks_dir,
            runner,
        }
    }
}

#[async_trait::async_trait]
impl RemediationEngine for LocalRemediationEngine {
    async fn apply(&self, request: ApplyRequest) -> Result<ApplyOutcome, OrchestratorError> {
        if !request.confirmed {
            return Err(OrchestratorError::ConfirmationRequired);
        }

        let playbook_path = generate_playbook(
            &request.finding,
            &request.playbook_yaml,
            &self.playbooks_dir,
        )?;

        let (success, output) = self
            .runner
            .apply_playbook(&playbook_path, request.dry_run)
            .await;

        Ok(ApplyOutcome {
            rule_id: request.finding.rule_id,
            success,
            output,
            dry_run: request.dry_run,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::findings::{Finding, RuleResult, Severity};
    use std::io::Write;

    const SAMPLE: &str = r#"<Benchmark xmlns="http://checklists.nist.gov/xccdf/1.2">
      <Rule id="rule_a" severity="high"><title>Rule A</title></Rule>
      <TestResult id="t">
        <rule-result idref="rule_a" severity="high"><result>fail</result></rule-result>
        <rule-result idref="rule_b"><result>pass</result></rule-result>
      </TestResult>
    </Benchmark>"#;

    fn settings(reports_dir: PathBuf) -> LocalScanSettings {
        LocalScanSettings {
            oscap_binary: "oscap".to_string(),
            content_path: PathBuf::from("/nonexistent/ssg-rhel9-ds.xml"),
            default_profile: "stig".to_string(),
            reports_dir,
            default_floor: SeverityFloor::All,
            scan_timeout: Duration::from_secs(600),
        }
    }

    #[tokio::test]
    async fn test_scan_job_with_existing_results() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let engine = LocalScanEngine::new(settings(dir.path().to_path_buf()));
        let handle = engine
            .start_scan(ScanRequest {
                results_xml: Some(file.path().to_path_buf()),
                ..Default::default()
            })
            .await
            .unwrap();

        // Background job should finish quickly for a pre-existing report.
        let mut status = engine.poll_scan(&handle).await.unwrap();
        for _ in 0..50 {
            if matches!(
                status,
                ScanJobStatus::Complete(_) | ScanJobStatus::Error(_)
            ) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
            status = engine.poll_scan(&handle).await.unwrap();
        }

        match status {
            ScanJobStatus::Complete(outcome) => {
                assert_eq!(outcome.findings.len(), 1);
                assert_eq!(outcome.findings[0].rule_id, "rule_a");
                assert_eq!(outcome.score.pass_count, 1);
                assert_eq!(outcome.score.fail_count, 1);
            }
            other => panic!("expected completion, got {}", other.as_str()),
        }
    }

    #[tokio::test]
    async fn test_poll_unknown_job_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let engine = LocalScanEngine::new(settings(dir.path().to_path_buf()));
        let err = engine
            .poll_scan(&JobHandle {
                job_id: Uuid::new_v4(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::ScanFailed(_)));
    }

    #[tokio::test]
    async fn test_apply_requires_confirmation() {
        let dir = tempfile::tempdir().unwrap();
        let engine = LocalRemediationEngine::new(
            dir.path().to_path_buf(),
            PlaybookRunner::new("ansible-playbook", None).unwrap(),
        );

        let request = ApplyRequest {
            finding: Finding {
                rule_id: "rule_a".to_string(),
                title: "Rule A".to_string(),
                severity: Severity::CatII,
                result: RuleResult::Fail,
                description: String::new(),
                fix_text: "true".to_string(),
                check_text: String::new(),
                references: Vec::new(),
            },
            playbook_yaml: "- name: t\n  shell: true\n".to_string(),
            confirmed: false,
            dry_run: true,
        };

        let err = engine.apply(request).await.unwrap_err();
        assert!(matches!(err, OrchestratorError::ConfirmationRequired));
        // Nothing may be written before the confirmation check.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
