// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Wiring: turn configuration into a concrete engine set.

use std::sync::Arc;
use std::time::Duration;

use crate::analyst::{Analyst, AnalystTimeouts, ClaudeProvider, LlmProvider, OllamaProvider};
use crate::config::{AppConfig, ProviderKind};
use crate::engine::local::{LocalRemediationEngine, LocalScanEngine, LocalScanSettings};
use crate::engine::remote::{RemoteReasoningEngine, RemoteRemediationEngine, RemoteScanEngine};
use crate::engine::EngineSet;
use crate::errors::OrchestratorError;
use crate::remediation::PlaybookRunner;

/// Build the reasoning engine from configuration.
pub fn build_analyst(config: &AppConfig) -> Result<Arc<Analyst>, OrchestratorError> {
    let provider: Box<dyn LlmProvider> = match config.analyst.provider {
        ProviderKind::Ollama => Box::new(
            OllamaProvider::new(
                config.analyst.model.clone(),
                Some(config.analyst.ollama_url.clone()),
            )
            .map_err(|e| OrchestratorError::Configuration(format!("{:#}", e)))?,
        ),
        ProviderKind::Claude => {
            let api_key = std::env::var(&config.analyst.api_key_env).map_err(|_| {
                OrchestratorError::Configuration(format!(
                    "missing {} for the Claude provider",
                    config.analyst.api_key_env
                ))
            })?;
            Box::new(
                ClaudeProvider::new(api_key, config.analyst.model.clone())
                    .map_err(|e| OrchestratorError::Configuration(format!("{:#}", e)))?,
            )
        }
    };

    let timeouts = AnalystTimeouts {
        analysis: Duration::from_secs(config.analyst.analysis_timeout_secs),
        triage: Duration::from_secs(config.analyst.triage_timeout_secs),
        remediation: Duration::from_secs(config.analyst.remediation_timeout_secs),
        summary: Duration::from_secs(config.analyst.summary_timeout_secs),
    };

    Ok(Arc::new(Analyst::new(provider, timeouts)))
}

/// In-process engines: oscap, the configured LLM provider, and
/// ansible-playbook all run on this host.
pub fn build_local_engines(
    config: &AppConfig,
    analyst: Arc<Analyst>,
) -> Result<EngineSet, OrchestratorError> {
    let scanner = LocalScanEngine::new(LocalScanSettings {
        oscap_binary: config.scanner.oscap_binary.clone(),
        content_path: config.scanner.scap_content.clone(),
        default_profile: config.scanner.profile.clone(),
        reports_dir: config.scanner.reports_dir.clone(),
        default_floor: config.scanner.min_severity,
        scan_timeout: Duration::from_secs(config.scanner.scan_timeout_secs),
    });

    let runner = PlaybookRunner::new(
        &config.remediation.ansible_binary,
        Some(Duration::from_secs(config.remediation.apply_timeout_secs)),
    )?;
    let remediator =
        LocalRemediationEngine::new(config.remediation.playbooks_dir.clone(), runner);

    Ok(EngineSet {
        scanner: Arc::new(scanner),
        reasoner: analyst,
        remediator: Arc::new(remediator),
    })
}

/// Remote engines: every collaborator lives behind the orchestrator API at
/// `base_url`.
pub fn build_remote_engines(base_url: &str) -> Result<EngineSet, OrchestratorError> {
    Ok(EngineSet {
        scanner: Arc::new(RemoteScanEngine::new(base_url)?),
        reasoner: Arc::new(RemoteReasoningEngine::new(base_url)?),
        remediator: Arc::new(RemoteRemediationEngine::new(base_url)?),
    })
}
