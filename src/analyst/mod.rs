// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Reasoning engine built on an LLM provider.
//!
//! Wraps a text-generation backend with per-call timeouts and maps every
//! transport failure or deadline overrun to `EngineUnavailable` — callers
//! decide whether that is fatal, this layer never retries.

pub mod prompts;
pub mod provider;

use std::time::Duration;

use tracing::debug;

use crate::engine::{ReasoningEngine, SummaryRequest};
use crate::errors::{EngineKind, OrchestratorError};
use crate::findings::Finding;

pub use provider::{ClaudeProvider, LlmProvider, OllamaProvider};

/// Per-call deadlines. Batch triage gets longer because the prompt carries
/// the whole finding list.
#[derive(Debug, Clone, Copy)]
pub struct AnalystTimeouts {
    pub analysis: Duration,
    pub triage: Duration,
    pub remediation: Duration,
    pub summary: Duration,
}

impl Default for AnalystTimeouts {
    fn default() -> Self {
        Self {
            analysis: Duration::from_secs(120),
            triage: Duration::from_secs(180),
            remediation: Duration::from_secs(120),
            summary: Duration::from_secs(120),
        }
    }
}

pub struct Analyst {
    provider: Box<dyn LlmProvider>,
    timeouts: AnalystTimeouts,
}

impl Analyst {
    pub fn new(provider: Box<dyn LlmProvider>, timeouts: AnalystTimeouts) -> Self {
        Self { provider, timeouts }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn model(&self) -> &str {
        self.provider.model()
    }

    /// Reachability probe for health checks.
    pub async fn ping(&self) -> Result<(), OrchestratorError> {
        self.provider.ping().await.map_err(|e| unavailable(&e))
    }

    async fn ask(
        &self,
        system: &str,
        prompt: String,
        deadline: Duration,
    ) -> Result<String, OrchestratorError> {
        let call = self.provider.complete(system, &prompt);
        match tokio::time::timeout(deadline, call).await {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => Err(unavailable(&e)),
            Err(_) => Err(OrchestratorError::EngineUnavailable {
                engine: EngineKind::Reasoning,
                reason: format!("timed out after {:?}", deadline),
            }),
        }
    }
}

fn unavailable(err: &anyhow::Error) -> OrchestratorError {
    OrchestratorError::EngineUnavailable {
        engine: EngineKind::Reasoning,
        reason: format!("{:#}", err),
    }
}

#[async_trait::async_trait]
impl ReasoningEngine for Analyst {
    async fn analyze(&self, finding: &Finding) -> Result<String, OrchestratorError> {
        debug!(rule_id = %finding.rule_id, "Requesting finding analysis");
        self.ask(
            prompts::ANALYST_SYSTEM,
            prompts::build_analysis_prompt(finding),
            self.timeouts.analysis,
        )
        .await
    }

    async fn analyze_batch(&self, findings: &[Finding]) -> Result<String, OrchestratorError> {
        debug!(count = findings.len(), "Requesting batch triage");
        self.ask(
            prompts::ANALYST_SYSTEM,
            prompts::build_batch_analysis_prompt(findings),
            self.timeouts.triage,
        )
        .await
    }

    async fn propose_remediation(&self, finding: &Finding) -> Result<String, OrchestratorError> {
        debug!(rule_id = %finding.rule_id, "Requesting remediation proposal");
        let raw = self
            .ask(
                "",
                prompts::build_remediation_prompt(finding),
                self.timeouts.remediation,
            )
            .await?;
        Ok(prompts::strip_code_fences(&raw))
    }

    async fn summarize(&self, request: &SummaryRequest) -> Result<String, OrchestratorError> {
        self.ask(
            prompts::REPORT_SYSTEM,
            prompts::build_final_report_prompt(
                &request.before,
                &request.after,
                &request.applied,
                &request.skipped,
                &request.failed,
                &request.remaining,
            ),
            self.timeouts.summary,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::findings::{RuleResult, Severity};
    use anyhow::Result;

    struct SlowProvider;

    #[async_trait::async_trait]
    impl LlmProvider for SlowProvider {
        async fn complete(&self, _system: &str, _prompt: &str) -> Result<String> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok("too late".to_string())
        }
        async fn ping(&self) -> Result<()> {
            Ok(())
        }
        fn name(&self) -> &str {
            "slow"
        }
        fn model(&self) -> &str {
            "slow-model"
        }
    }

    struct FencedProvider;

    #[async_trait::async_trait]
    impl LlmProvider for FencedProvider {
        async fn complete(&self, _system: &str, _prompt: &str) -> Result<String> {
            Ok("```yaml\n- name: fix\n  shell: echo fix\n```".to_string())
        }
        async fn ping(&self) -> Result<()> {
            Ok(())
        }
        fn name(&self) -> &str {
            "fenced"
        }
        fn model(&self) -> &str {
            "fenced-model"
        }
    }

    fn finding() -> Finding {
        Finding {
            rule_id: "rule_x".to_string(),
            title: "Rule X".to_string(),
            severity: Severity::CatII,
            result: RuleResult::Fail,
            description: String::new(),
            fix_text: String::new(),
            check_text: String::new(),
            references: Vec::new(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_maps_to_engine_unavailable() {
        let analyst = Analyst::new(
            Box::new(SlowProvider),
            AnalystTimeouts {
                analysis: Duration::from_secs(1),
                ..Default::default()
            },
        );
        let err = analyst.analyze(&finding()).await.unwrap_err();
        match err {
            OrchestratorError::EngineUnavailable { engine, reason } => {
                assert_eq!(engine, EngineKind::Reasoning);
                assert!(reason.contains("timed out"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_remediation_output_is_fence_stripped() {
        let analyst = Analyst::new(Box::new(FencedProvider), AnalystTimeouts::default());
        let yaml = analyst.propose_remediation(&finding()).await.unwrap();
        assert!(!yaml.contains("```"));
        assert!(yaml.starts_with("- name: fix"));
    }
}
