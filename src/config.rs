// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::errors::OrchestratorError;
use crate::findings::SeverityFloor;
use crate::session::SessionTiming;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default)]
pub struct AppConfig {
    #[serde(default)]
    #[validate(nested)]
    pub server: ServerConfig,

    #[serde(default)]
    #[validate(nested)]
    pub scanner: ScannerConfig,

    #[serde(default)]
    pub analyst: AnalystConfig,

    #[serde(default)]
    #[validate(nested)]
    pub remediation: RemediationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[validate(range(min = 1024, max = 65535))]
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ScannerConfig {
    #[serde(default = "default_oscap_binary")]
    pub oscap_binary: String,

    #[serde(default = "default_scap_content")]
    pub scap_content: PathBuf,

    #[serde(default = "default_profile")]
    pub profile: String,

    #[serde(default = "default_reports_dir")]
    pub reports_dir: PathBuf,

    #[serde(default)]
    pub min_severity: SeverityFloor,

    #[validate(range(min = 30, max = 7200))]
    #[serde(default = "default_scan_timeout")]
    pub scan_timeout_secs: u64,

    #[validate(range(min = 1, max = 60))]
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Ollama,
    Claude,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalystConfig {
    #[serde(default)]
    pub provider: ProviderKind,

    /// Model override; provider default applies when unset.
    #[serde(default)]
    pub model: Option<String>,

    #[serde(default = "default_ollama_url")]
    pub ollama_url: String,

    /// Environment variable holding the Claude API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_analysis_timeout")]
    pub analysis_timeout_secs: u64,

    #[serde(default = "default_triage_timeout")]
    pub triage_timeout_secs: u64,

    #[serde(default = "default_analysis_timeout")]
    pub remediation_timeout_secs: u64,

    #[serde(default = "default_analysis_timeout")]
    pub summary_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RemediationConfig {
    #[serde(default = "default_ansible_binary")]
    pub ansible_binary: String,

    #[serde(default = "default_playbooks_dir")]
    pub playbooks_dir: PathBuf,

    #[validate(range(min = 10, max = 600))]
    #[serde(default = "default_apply_timeout")]
    pub apply_timeout_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_oscap_binary() -> String {
    "oscap".to_string()
}
fn default_scap_content() -> PathBuf {
    PathBuf::from("/usr/share/xml/scap/ssg/content/ssg-rhel9-ds.xml")
}
fn default_profile() -> String {
    "stig".to_string()
}
fn default_reports_dir() -> PathBuf {
    PathBuf::from("./reports")
}
fn default_scan_timeout() -> u64 {
    600
}
fn default_poll_interval() -> u64 {
    3
}
fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}
fn default_api_key_env() -> String {
    "ANTHROPIC_API_KEY".to_string()
}
fn default_analysis_timeout() -> u64 {
    120
}
fn default_triage_timeout() -> u64 {
    180
}
fn default_ansible_binary() -> String {
    "ansible-playbook".to_string()
}
fn default_playbooks_dir() -> PathBuf {
    PathBuf::from("./playbooks")
}
fn default_apply_timeout() -> u64 {
    120
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            oscap_binary: default_oscap_binary(),
            scap_content: default_scap_content(),
            profile: default_profile(),
            reports_dir: default_reports_dir(),
            min_severity: SeverityFloor::default(),
            scan_timeout_secs: default_scan_timeout(),
            poll_interval_secs: default_poll_interval(),
        }
    }
}

impl Default for AnalystConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            model: None,
            ollama_url: default_ollama_url(),
            api_key_env: default_api_key_env(),
            analysis_timeout_secs: default_analysis_timeout(),
            triage_timeout_secs: default_triage_timeout(),
            remediation_timeout_secs: default_analysis_timeout(),
            summary_timeout_secs: default_analysis_timeout(),
        }
    }
}

impl Default for RemediationConfig {
    fn default() -> Self {
        Self {
            ansible_binary: default_ansible_binary(),
            playbooks_dir: default_playbooks_dir(),
            apply_timeout_secs: default_apply_timeout(),
        }
    }
}

impl AppConfig {
    /// Load configuration: optional YAML/JSON file, then environment
    /// overrides, then validation.
    pub fn load(path: Option<&Path>) -> Result<Self, OrchestratorError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides();
        config
            .validate()
            .map_err(|e| OrchestratorError::Configuration(e.to_string()))?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self, OrchestratorError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            OrchestratorError::Configuration(format!("read {:?}: {}", path, e))
        })?;

        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match extension {
            "yaml" | "yml" => serde_yaml::from_str(&content)
                .map_err(|e| OrchestratorError::Configuration(format!("parse YAML: {}", e))),
            "json" => serde_json::from_str(&content)
                .map_err(|e| OrchestratorError::Configuration(format!("parse JSON: {}", e))),
            other => Err(OrchestratorError::Configuration(format!(
                "unsupported config file format: {}",
                other
            ))),
        }
    }

    /// Environment variables win over file values. The names match the
    /// deployment contract of the containerized services.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("SCAP_CONTENT_PATH") {
            self.scanner.scap_content = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("STIG_PROFILE") {
            self.scanner.profile = v;
        }
        if let Ok(v) = std::env::var("REPORTS_DIR") {
            self.scanner.reports_dir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("MIN_SEVERITY") {
            if let Ok(floor) = v.parse() {
                self.scanner.min_severity = floor;
            }
        }
        if let Ok(v) = std::env::var("PLAYBOOKS_DIR") {
            self.remediation.playbooks_dir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("OLLAMA_MODEL") {
            self.analyst.model = Some(v);
        }
        if let Ok(v) = std::env::var("OLLAMA_BASE_URL") {
            self.analyst.ollama_url = v;
        }
    }

    pub fn session_timing(&self) -> SessionTiming {
        SessionTiming {
            poll_interval: Duration::from_secs(self.scanner.poll_interval_secs),
            scan_timeout: Duration::from_secs(self.scanner.scan_timeout_secs),
        }
    }
}
