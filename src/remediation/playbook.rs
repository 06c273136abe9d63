// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Ansible playbook artifact generation.
//!
//! The reasoning engine claims to return a YAML task block, but that text
//! is untrusted: it may be a mapping instead of a list, a bare string, or
//! not YAML at all. Malformed engine output must never abort session
//! progress, so parsing falls back to wrapping the vendor fix guidance in
//! a raw shell task.
//!
//! Every generated playbook is self-contained: it targets localhost,
//! escalates privilege, and appends an audit line (rule id, severity,
//! timestamp) to the remediation log on successful application.

use std::path::{Path, PathBuf};

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::warn;

use crate::errors::OrchestratorError;
use crate::findings::Finding;

const AUDIT_LOG_PATH: &str = "/var/log/stig_remediation.log";

static RULE_ID_SANITIZER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-zA-Z0-9_-]").expect("static regex"));

#[derive(Serialize)]
struct PlaybookPlay {
    name: String,
    hosts: &'static str,
    #[serde(rename = "become")]
    become_root: bool,
    gather_facts: bool,
    vars: PlayVars,
    tasks: serde_yaml::Value,
    post_tasks: Vec<AuditTask>,
}

#[derive(Serialize)]
struct PlayVars {
    stig_rule_id: String,
    stig_severity: String,
}

#[derive(Serialize)]
struct AuditTask {
    name: &'static str,
    lineinfile: LineInFile,
}

#[derive(Serialize)]
struct LineInFile {
    path: &'static str,
    line: String,
    create: bool,
}

#[derive(Serialize)]
struct FallbackShellTask {
    name: String,
    shell: String,
    #[serde(rename = "become")]
    become_root: bool,
}

/// Render the full playbook YAML for one finding.
pub fn build_playbook_yaml(
    finding: &Finding,
    engine_yaml: &str,
) -> Result<String, OrchestratorError> {
    let tasks = parse_task_block(finding, engine_yaml)?;

    let play = PlaybookPlay {
        name: format!("STIG Remediation: {}", finding.rule_id),
        hosts: "localhost",
        become_root: true,
        gather_facts: true,
        vars: PlayVars {
            stig_rule_id: finding.rule_id.clone(),
            stig_severity: finding.severity.to_string(),
        },
        tasks,
        post_tasks: vec![AuditTask {
            name: "Log remediation",
            lineinfile: LineInFile {
                path: AUDIT_LOG_PATH,
                line: format!(
                    "{{{{ ansible_date_time.iso8601 }}}} APPLIED {} [{}]",
                    finding.rule_id, finding.severity
                ),
                create: true,
            },
        }],
    };

    serde_yaml::to_string(&vec![play])
        .map_err(|e| OrchestratorError::Artifact(format!("serialize playbook: {}", e)))
}

/// Write the playbook artifact to disk and return its path.
pub fn generate_playbook(
    finding: &Finding,
    engine_yaml: &str,
    playbooks_dir: &Path,
) -> Result<PathBuf, OrchestratorError> {
    std::fs::create_dir_all(playbooks_dir)
        .map_err(|e| OrchestratorError::Artifact(format!("create {:?}: {}", playbooks_dir, e)))?;

    let safe_id = RULE_ID_SANITIZER.replace_all(&finding.rule_id, "_");
    let stamp = Utc::now().format("%Y%m%d_%H%M%S");
    let path = playbooks_dir.join(format!("remediate_{}_{}.yml", safe_id, stamp));

    let yaml = build_playbook_yaml(finding, engine_yaml)?;
    std::fs::write(&path, yaml)
        .map_err(|e| OrchestratorError::Artifact(format!("write {:?}: {}", path, e)))?;

    Ok(path)
}

/// Best-effort parse of the engine's task block. A mapping becomes a
/// single-element list; anything that is not a task list falls back to a
/// shell task wrapping the vendor fix text.
fn parse_task_block(
    finding: &Finding,
    engine_yaml: &str,
) -> Result<serde_yaml::Value, OrchestratorError> {
    match serde_yaml::from_str::<serde_yaml::Value>(engine_yaml) {
        Ok(serde_yaml::Value::Sequence(seq)) if !seq.is_empty() => {
            Ok(serde_yaml::Value::Sequence(seq))
        }
        Ok(value @ serde_yaml::Value::Mapping(_)) => {
            Ok(serde_yaml::Value::Sequence(vec![value]))
        }
        Ok(_) | Err(_) => {
            warn!(
                rule_id = %finding.rule_id,
                "Engine output is not a usable task block, falling back to vendor fix text"
            );
            fallback_task(finding)
        }
    }
}

fn fallback_task(finding: &Finding) -> Result<serde_yaml::Value, OrchestratorError> {
    let task = FallbackShellTask {
        name: format!("Apply fix for {}", finding.rule_id),
        shell: finding.fix_text.clone(),
        become_root: true,
    };
    let value = serde_yaml::to_value(vec![task])
        .map_err(|e| OrchestratorError::Artifact(format!("serialize fallback task: {}", e)))?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::findings::{RuleResult, Severity};

    fn finding() -> Finding {
        Finding {
            rule_id: "xccdf_org.ssgproject.content_rule_sshd_disable_root_login".to_string(),
            title: "Disable SSH Root Login".to_string(),
            severity: Severity::CatI,
            result: RuleResult::Fail,
            description: String::new(),
            fix_text: "sed -i 's/^PermitRootLogin.*/PermitRootLogin no/' /etc/ssh/sshd_config"
                .to_string(),
            check_text: String::new(),
            references: Vec::new(),
        }
    }

    #[test]
    fn test_valid_task_list_is_kept() {
        let engine_yaml = "- name: \"V-255991 | Disable root SSH login\"\n  lineinfile:\n    path: /etc/ssh/sshd_config\n    regexp: '^PermitRootLogin'\n    line: 'PermitRootLogin no'\n  become: true\n";
        let yaml = build_playbook_yaml(&finding(), engine_yaml).unwrap();
        assert!(yaml.contains("Disable root SSH login"));
        assert!(yaml.contains("hosts: localhost"));
        assert!(yaml.contains("become: true"));
        assert!(yaml.contains("stig_rule_id"));
        // The fallback shell task must not appear.
        assert!(!yaml.contains("Apply fix for"));
    }

    #[test]
    fn test_single_mapping_is_wrapped_into_list() {
        let engine_yaml =
            "name: remove telnet\ndnf:\n  name: telnet\n  state: absent\nbecome: true\n";
        let yaml = build_playbook_yaml(&finding(), engine_yaml).unwrap();
        assert!(yaml.contains("remove telnet"));
        assert!(!yaml.contains("Apply fix for"));
    }

    #[test]
    fn test_prose_engine_output_falls_back_to_fix_text() {
        // Plain chatter parses as a YAML scalar, not a task list.
        let yaml = build_playbook_yaml(&finding(), "Sure, just edit the config file manually")
            .unwrap();
        assert!(yaml.contains("Apply fix for"));
        assert!(yaml.contains("PermitRootLogin no"));
    }

    #[test]
    fn test_unparsable_engine_output_falls_back() {
        let yaml = build_playbook_yaml(&finding(), "- [unclosed\n  : : broken").unwrap();
        assert!(yaml.contains("Apply fix for"));
    }

    #[test]
    fn test_empty_engine_output_falls_back() {
        let yaml = build_playbook_yaml(&finding(), "").unwrap();
        assert!(yaml.contains("Apply fix for"));
    }

    #[test]
    fn test_playbook_carries_audit_post_task() {
        let yaml = build_playbook_yaml(&finding(), "- name: t\n  shell: true\n").unwrap();
        assert!(yaml.contains("Log remediation"));
        assert!(yaml.contains("/var/log/stig_remediation.log"));
        assert!(yaml.contains("APPLIED xccdf_org.ssgproject.content_rule_sshd_disable_root_login [CAT I]"));
    }

    #[test]
    fn test_generate_writes_sanitized_filename() {
        let dir = tempfile::tempdir().unwrap();
        let mut f = finding();
        f.rule_id = "rule with spaces/and:symbols".to_string();
        let path = generate_playbook(&f, "- name: t\n  shell: true\n", dir.path()).unwrap();
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("remediate_rule_with_spaces_and_symbols_"));
        assert!(name.ends_with(".yml"));
        assert!(path.exists());
    }
}
