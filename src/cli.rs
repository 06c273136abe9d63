// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Interactive terminal surface.
//!
//! Drives a hardening session from the terminal — either against an
//! in-process session handle (local mode) or against a remote
//! orchestrator over HTTP. Both modes share one drive loop through the
//! `SessionSurface` seam, mirroring how the state machine itself never
//! branches on deployment mode.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::json;
use tokio::time::sleep;
use uuid::Uuid;

use crate::bootstrap;
use crate::config::AppConfig;
use crate::findings::Severity;
use crate::health::{HealthChecker, HealthStatus};
use crate::ledger::ComplianceLedger;
use crate::session::{
    new_session, Decision, FindingSummary, PendingApproval, Phase, SessionConfig,
    SessionHandle, SessionView,
};

// ANSI palette
const RED: &str = "\x1b[91m";
const GREEN: &str = "\x1b[92m";
const YELLOW: &str = "\x1b[93m";
const BLUE: &str = "\x1b[94m";
const CYAN: &str = "\x1b[96m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";

const POLL_DELAY: Duration = Duration::from_millis(500);

pub fn print_banner() {
    println!();
    println!("{BOLD}{CYAN}  ____                                      _ {RESET}");
    println!("{BOLD}{CYAN} |  _ \\ __ _ _ __  ___ ___  __ _ _ __ (_)   {RESET}");
    println!("{BOLD}{CYAN} | |_) / _` | '_ \\/ __/ __|/ _` | '__|| |   {RESET}");
    println!("{BOLD}{CYAN} |  __/ (_| | | | \\__ \\__ \\ (_| | |   | |   {RESET}");
    println!("{BOLD}{CYAN} |_|   \\__,_|_| |_|___/___/\\__,_|_|   |_|   {RESET}");
    println!();
    println!("{BOLD}        AI-Assisted STIG Hardening Orchestrator{RESET}");
    println!("{DIM}        v{} - (c) 2026 Bountyy Oy{RESET}", env!("CARGO_PKG_VERSION"));
    println!();
}

fn severity_color(severity: Severity) -> &'static str {
    match severity {
        Severity::CatI => RED,
        Severity::CatII => YELLOW,
        Severity::CatIII => BLUE,
    }
}

fn print_rule(title: &str) {
    println!("\n{BOLD}── {title} {}{RESET}", "─".repeat(60_usize.saturating_sub(title.len())));
}

fn print_panel(title: &str, body: &str, color: &str) {
    println!("\n{color}┌─ {BOLD}{title}{RESET}{color} {}{RESET}", "─".repeat(64_usize.saturating_sub(title.len())));
    for line in body.lines() {
        println!("{color}│{RESET} {line}");
    }
    println!("{color}└{}{RESET}", "─".repeat(67));
}

fn print_findings_table(findings: &[FindingSummary]) {
    println!(
        "\n{BOLD}Failed STIG Controls ({}){RESET}",
        findings.len()
    );
    println!("{DIM}{:<4} {:<44} {:<9} TITLE{RESET}", "#", "RULE ID", "SEV");
    for (i, f) in findings.iter().enumerate() {
        let color = severity_color(f.severity);
        let title: String = f.title.chars().take(50).collect();
        println!(
            "{:<4} {:<44} {color}{:<9}{RESET} {}",
            i + 1,
            truncate(&f.rule_id, 44),
            f.severity,
            title
        );
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max - 1).chain(std::iter::once('…')).collect()
    }
}

fn score_color(score: f64) -> &'static str {
    if score >= 70.0 {
        GREEN
    } else {
        RED
    }
}

async fn print_progress(ledger: &ComplianceLedger) {
    let Some(latest) = ledger.latest().await else {
        return;
    };

    let body = match ledger.improvement().await {
        Some(imp) => {
            let delta_color = if imp.score_delta >= 0.0 { GREEN } else { RED };
            format!(
                "Compliance Score: {}% ({delta_color}{:+}%{RESET} from baseline)\n\
                 Failures Remaining: {} ({GREEN}-{} fixed{RESET})\n\
                 CAT I Remaining: {}\nCAT II Remaining: {}\nCAT III Remaining: {}",
                latest.score,
                imp.score_delta,
                latest.fail_count,
                imp.failures_fixed,
                latest.cat1_fails,
                latest.cat2_fails,
                latest.cat3_fails,
            )
        }
        None => format!(
            "Compliance Score: {}%\nFailures: {}\nCAT I: {} | CAT II: {} | CAT III: {}",
            latest.score, latest.fail_count, latest.cat1_fails, latest.cat2_fails, latest.cat3_fails,
        ),
    };
    print_panel("Compliance Status", &body, CYAN);
}

// ---------------------------------------------------------------------------
// Prompts (blocking stdin moved off the runtime)
// ---------------------------------------------------------------------------

async fn prompt_line(prompt: String) -> Result<String> {
    tokio::task::spawn_blocking(move || {
        use std::io::Write;
        print!("{}", prompt);
        std::io::stdout().flush()?;
        let mut line = String::new();
        std::io::stdin().read_line(&mut line)?;
        Ok::<String, std::io::Error>(line.trim().to_string())
    })
    .await
    .context("stdin reader task failed")?
    .context("failed to read stdin")
}

async fn prompt_decision() -> Result<Decision> {
    loop {
        let line = prompt_line(format!(
            "\n{BOLD}Action{RESET} [apply/skip/quit] ({DIM}skip{RESET}): "
        ))
        .await?;
        if line.is_empty() {
            return Ok(Decision::Skip);
        }
        match line.parse::<Decision>() {
            Ok(decision) => return Ok(decision),
            Err(e) => println!("{RED}{e}{RESET}"),
        }
    }
}

async fn prompt_confirm(question: &str, default_yes: bool) -> Result<bool> {
    let hint = if default_yes { "Y/n" } else { "y/N" };
    let line = prompt_line(format!("\n{BOLD}{question}{RESET} [{hint}]: ")).await?;
    Ok(match line.to_ascii_lowercase().as_str() {
        "" => default_yes,
        "y" | "yes" => true,
        _ => false,
    })
}

// ---------------------------------------------------------------------------
// Session surface seam
// ---------------------------------------------------------------------------

#[async_trait::async_trait]
trait SessionSurface {
    async fn view(&self) -> Result<SessionView>;
    async fn pending(&self) -> Result<Option<PendingApproval>>;
    async fn approve(&self, rule_id: &str, decision: Decision) -> Result<()>;
    async fn proceed(&self, accept: bool) -> Result<()>;
}

struct LocalSession {
    handle: Arc<SessionHandle>,
}

#[async_trait::async_trait]
impl SessionSurface for LocalSession {
    async fn view(&self) -> Result<SessionView> {
        Ok(self.handle.view().await)
    }
    async fn pending(&self) -> Result<Option<PendingApproval>> {
        Ok(self.handle.pending().await)
    }
    async fn approve(&self, rule_id: &str, decision: Decision) -> Result<()> {
        self.handle.submit_decision(rule_id, decision).await?;
        Ok(())
    }
    async fn proceed(&self, accept: bool) -> Result<()> {
        self.handle.confirm_proceed(accept).await?;
        Ok(())
    }
}

/// HTTP client for a remote orchestrator.
pub struct OrchestratorClient {
    base_url: String,
    client: reqwest::Client,
}

impl OrchestratorClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub async fn health(&self) -> Result<serde_json::Value> {
        let response = self
            .client
            .get(format!("{}/health", self.base_url))
            .send()
            .await
            .with_context(|| format!("Cannot reach orchestrator at {}", self.base_url))?;
        Ok(response.json().await?)
    }

    pub async fn start_session(&self, config: &SessionConfig) -> Result<Uuid> {
        let response = self
            .client
            .post(format!("{}/session/start", self.base_url))
            .json(config)
            .send()
            .await?
            .error_for_status()?;
        let body: serde_json::Value = response.json().await?;
        let session_id = body["session_id"]
            .as_str()
            .context("missing session_id in response")?;
        Ok(session_id.parse()?)
    }
}

struct RemoteSession {
    client: OrchestratorClient,
    session_id: Uuid,
}

#[async_trait::async_trait]
impl SessionSurface for RemoteSession {
    async fn view(&self) -> Result<SessionView> {
        let response = self
            .client
            .client
            .get(format!(
                "{}/session/{}",
                self.client.base_url, self.session_id
            ))
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    async fn pending(&self) -> Result<Option<PendingApproval>> {
        let response = self
            .client
            .client
            .get(format!(
                "{}/session/{}/pending",
                self.client.base_url, self.session_id
            ))
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(response.error_for_status()?.json().await?))
    }

    async fn approve(&self, rule_id: &str, decision: Decision) -> Result<()> {
        self.client
            .client
            .post(format!(
                "{}/session/{}/approve",
                self.client.base_url, self.session_id
            ))
            .json(&json!({
                "rule_id": rule_id,
                "decision": match decision {
                    Decision::Apply => "apply",
                    Decision::Skip => "skip",
                    Decision::Quit => "quit",
                },
            }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn proceed(&self, accept: bool) -> Result<()> {
        self.client
            .client
            .post(format!(
                "{}/session/{}/proceed",
                self.client.base_url, self.session_id
            ))
            .json(&json!({ "accept": accept }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Drive loop
// ---------------------------------------------------------------------------

fn phase_label(phase: Phase) -> String {
    match phase {
        Phase::Queued => format!("{DIM}Queued...{RESET}"),
        Phase::Scanning => {
            format!("{CYAN}Phase 1: Running OpenSCAP scan...{RESET}\n{DIM}  This may take several minutes...{RESET}")
        }
        Phase::Analyzing => format!("{CYAN}Phase 2: AI triage analysis...{RESET}"),
        Phase::Remediating => format!("{CYAN}Phase 3: Interactive remediation...{RESET}"),
        Phase::Validating => format!("{CYAN}Phase 4: Post-remediation validation...{RESET}"),
        Phase::Complete => format!("{GREEN}Complete!{RESET}"),
        Phase::Error => format!("{RED}Error!{RESET}"),
    }
}

fn present_approval(pending: &PendingApproval) {
    let finding = &pending.finding;
    let color = severity_color(finding.severity);
    println!("\n{}", "═".repeat(68));
    println!(
        "{BOLD}Finding {}/{}{RESET}  {color}{}{RESET}  {}",
        pending.position, pending.total, finding.severity, finding.rule_id
    );
    println!("{BOLD}{CYAN}{}{RESET}", finding.title);
    print_panel("AI Analysis", &pending.analysis, BLUE);
    print_panel("Proposed Ansible Task", &pending.playbook_yaml, GREEN);
}

fn print_completion(view: &SessionView) {
    let score_after = view
        .score_after
        .map(|s| format!("{}%", s))
        .unwrap_or_else(|| "N/A".to_string());
    let body = format!(
        "Applied : {GREEN}{}{RESET}\nSkipped : {YELLOW}{}{RESET}\nFailed  : {RED}{}{RESET}\n\n\
         Score before : {BOLD}{}%{RESET}\nScore after  : {BOLD}{}{RESET}",
        view.applied.len(),
        view.skipped.len(),
        view.failed.len(),
        view.score_before.unwrap_or(0.0),
        score_after,
    );
    print_panel("Session Complete", &body, GREEN);

    if let Some(report) = &view.final_report {
        print_panel("Executive Summary", report, GREEN);
    }
}

/// Poll the session, answering gates as they open, until it terminates.
async fn drive_session(surface: &dyn SessionSurface) -> Result<SessionView> {
    let mut last_phase: Option<Phase> = None;
    let mut baseline_shown = false;
    let mut triage_answered = false;
    let mut last_pending: Option<String> = None;

    loop {
        let view = surface.view().await?;

        if last_phase != Some(view.phase) {
            println!("{}", phase_label(view.phase));
            last_phase = Some(view.phase);
        }

        if !baseline_shown {
            if let Some(score) = view.score_before {
                println!(
                    "  Baseline score: {}{}%{RESET} | Findings: {BOLD}{}{RESET}",
                    score_color(score),
                    score,
                    view.total_findings
                );
                if !view.findings_overview.is_empty() {
                    print_findings_table(&view.findings_overview);
                }
                baseline_shown = true;
            }
        }

        if view.awaiting_proceed && !triage_answered {
            if let Some(triage) = &view.triage_report {
                print_panel("AI Triage Report", triage, CYAN);
            }
            let accept = prompt_confirm("Proceed to remediation?", true).await?;
            surface.proceed(accept).await?;
            triage_answered = true;
            if !accept {
                println!("{YELLOW}Exiting. No changes made.{RESET}");
            }
        }

        if view.phase == Phase::Remediating {
            if let Some(pending) = surface.pending().await? {
                if last_pending.as_deref() != Some(pending.finding.rule_id.as_str()) {
                    present_approval(&pending);
                    let decision = prompt_decision().await?;
                    last_pending = Some(pending.finding.rule_id.clone());
                    surface.approve(&pending.finding.rule_id, decision).await?;
                    match decision {
                        Decision::Apply => {
                            println!("{DIM}Applying {}...{RESET}", pending.finding.rule_id)
                        }
                        Decision::Skip => {
                            println!("{DIM}Skipped {}{RESET}", pending.finding.rule_id)
                        }
                        Decision::Quit => {
                            println!("{YELLOW}Exiting remediation loop.{RESET}")
                        }
                    }
                }
            }
        }

        if view.phase.is_terminal() {
            if let Some(error) = &view.error {
                println!("{RED}Session error: {}{RESET}", error);
            } else {
                print_completion(&view);
            }
            return Ok(view);
        }

        sleep(POLL_DELAY).await;
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Run a session with in-process engines.
pub async fn run_local(config: AppConfig, session_config: SessionConfig) -> Result<()> {
    let config = Arc::new(config);

    println!(
        "{BOLD}Profile  : {}\nMin Sev  : {}\nDry Run  : {}{RESET}",
        session_config.profile, session_config.min_severity, session_config.dry_run
    );

    let analyst = bootstrap::build_analyst(&config)?;
    let health = HealthChecker::new(Arc::clone(&config), Arc::clone(&analyst));

    print_rule("Service Health");
    let report = health.check_all().await;
    for component in &report.components {
        let (icon, color) = match component.status {
            HealthStatus::Healthy => ("✓", GREEN),
            HealthStatus::Degraded => ("⚠", YELLOW),
            HealthStatus::Unhealthy => ("✗", RED),
        };
        let detail = component.message.as_deref().unwrap_or("ok");
        println!("  {color}{icon}{RESET} {}: {detail}", component.name);
    }
    if report.status == HealthStatus::Unhealthy
        && !prompt_confirm("Some collaborators are unavailable. Continue anyway?", false).await?
    {
        anyhow::bail!("aborted by operator");
    }

    let engines = bootstrap::build_local_engines(&config, analyst)?;
    let ledger = Arc::new(ComplianceLedger::load(&config.scanner.reports_dir)?);

    let (handle, driver) = new_session(
        session_config,
        engines,
        Arc::clone(&ledger),
        config.session_timing(),
        config.scanner.reports_dir.clone(),
    );
    tokio::spawn(driver.run());

    let surface = LocalSession { handle };
    let view = drive_session(&surface).await?;

    print_progress(&ledger).await;

    if view.phase == Phase::Error {
        anyhow::bail!("session ended in error");
    }
    Ok(())
}

/// Drive a session hosted by a remote orchestrator.
pub async fn run_remote(api_url: &str, session_config: SessionConfig) -> Result<()> {
    let client = OrchestratorClient::new(api_url)?;

    println!(
        "{BOLD}API      : {}\nProfile  : {}\nMin Sev  : {}\nDry Run  : {}{RESET}",
        api_url, session_config.profile, session_config.min_severity, session_config.dry_run
    );

    print_rule("Service Health");
    match client.health().await {
        Ok(health) => {
            let status = health["status"].as_str().unwrap_or("unknown");
            let color = if status == "HEALTHY" { GREEN } else { YELLOW };
            println!("  {color}{status}{RESET}");
        }
        Err(e) => {
            println!("{RED}{e:#}{RESET}");
            println!("{DIM}Tip: start the orchestrator with `panssari serve` first{RESET}");
            anyhow::bail!("orchestrator unreachable");
        }
    }

    let session_id = client.start_session(&session_config).await?;
    println!("{GREEN}Session ID: {}{RESET}", session_id);

    let surface = RemoteSession { client, session_id };
    let view = drive_session(&surface).await?;

    if view.phase == Phase::Error {
        anyhow::bail!("session ended in error");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_handles_long_ids() {
        let long = "x".repeat(80);
        let out = truncate(&long, 44);
        assert_eq!(out.chars().count(), 44);
        assert!(out.ends_with('…'));
        assert_eq!(truncate("short", 44), "short");
    }

    #[test]
    fn test_phase_labels_are_distinct() {
        let phases = [
            Phase::Queued,
            Phase::Scanning,
            Phase::Analyzing,
            Phase::Remediating,
            Phase::Validating,
            Phase::Complete,
            Phase::Error,
        ];
        let labels: std::collections::HashSet<String> =
            phases.iter().map(|p| phase_label(*p)).collect();
        assert_eq!(labels.len(), phases.len());
    }
}
