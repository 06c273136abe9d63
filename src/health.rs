// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Health Check & Monitoring
 * Probes the external collaborators before a session starts so engine
 * failures are caught early instead of mid-workflow.
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

use crate::analyst::Analyst;
use crate::config::AppConfig;

/// Health status levels
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Component health information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub name: String,
    pub status: HealthStatus,
    pub message: Option<String>,
    pub last_check: String,
    pub response_time_ms: Option<u64>,
}

/// Overall health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResponse {
    pub status: HealthStatus,
    pub timestamp: String,
    pub version: String,
    pub components: Vec<ComponentHealth>,
}

pub struct HealthChecker {
    config: Arc<AppConfig>,
    analyst: Arc<Analyst>,
    version: String,
}

impl HealthChecker {
    pub fn new(config: Arc<AppConfig>, analyst: Arc<Analyst>) -> Self {
        Self {
            config,
            analyst,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Probe every collaborator and roll the results up.
    pub async fn check_all(&self) -> HealthCheckResponse {
        let components = vec![
            self.check_binary("oscap", &self.config.scanner.oscap_binary).await,
            self.check_scap_content(),
            self.check_binary("ansible", &self.config.remediation.ansible_binary).await,
            self.check_reasoning().await,
        ];

        let status = if components
            .iter()
            .any(|c| c.status == HealthStatus::Unhealthy)
        {
            HealthStatus::Unhealthy
        } else if components.iter().any(|c| c.status == HealthStatus::Degraded) {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };

        HealthCheckResponse {
            status,
            timestamp: chrono::Utc::now().to_rfc3339(),
            version: self.version.clone(),
            components,
        }
    }

    async fn check_binary(&self, name: &str, binary: &str) -> ComponentHealth {
        let start = Instant::now();
        let probe = Command::new(binary)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status();

        let (status, message) = match timeout(Duration::from_secs(5), probe).await {
            Ok(Ok(exit)) if exit.success() => (HealthStatus::Healthy, None),
            Ok(Ok(exit)) => (
                HealthStatus::Unhealthy,
                Some(format!("{} --version exited with {}", binary, exit)),
            ),
            Ok(Err(e)) => (
                HealthStatus::Unhealthy,
                Some(format!("{} not found: {}", binary, e)),
            ),
            Err(_) => (
                HealthStatus::Unhealthy,
                Some(format!("{} --version did not respond", binary)),
            ),
        };

        debug!(component = name, status = ?status, "Component probed");
        ComponentHealth {
            name: name.to_string(),
            status,
            message,
            last_check: chrono::Utc::now().to_rfc3339(),
            response_time_ms: Some(start.elapsed().as_millis() as u64),
        }
    }

    fn check_scap_content(&self) -> ComponentHealth {
        let exists = self.config.scanner.scap_content.exists();
        ComponentHealth {
            name: "scap_content".to_string(),
            status: if exists {
                HealthStatus::Healthy
            } else {
                HealthStatus::Unhealthy
            },
            message: (!exists).then(|| {
                format!(
                    "SCAP datastream not found at {:?}",
                    self.config.scanner.scap_content
                )
            }),
            last_check: chrono::Utc::now().to_rfc3339(),
            response_time_ms: None,
        }
    }

    async fn check_reasoning(&self) -> ComponentHealth {
        let start = Instant::now();
        let (status, message) = match self.analyst.ping().await {
            Ok(()) => (HealthStatus::Healthy, None),
            // The session can still scan and report without an LLM, so a
            // missing reasoning engine degrades instead of failing hard.
            Err(e) => (HealthStatus::Degraded, Some(e.to_string())),
        };

        ComponentHealth {
            name: format!("llm ({})", self.analyst.provider_name()),
            status,
            message,
            last_check: chrono::Utc::now().to_rfc3339(),
            response_time_ms: Some(start.elapsed().as_millis() as u64),
        }
    }
}
