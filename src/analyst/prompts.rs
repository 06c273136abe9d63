// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Prompt builders for the reasoning engine.
//!
//! Each workflow step gets a purpose-built prompt: per-finding analysis,
//! batch triage, Ansible task generation, and the executive summary.

use crate::findings::Finding;
use crate::ledger::LedgerEntry;

pub const ANALYST_SYSTEM: &str =
    "You are a senior STIG security analyst. Be concise and direct.";
pub const REPORT_SYSTEM: &str =
    "You are a compliance officer writing for a security manager.";

/// Prompt for the analyst to evaluate a single failed control.
pub fn build_analysis_prompt(finding: &Finding) -> String {
    format!(
        "You are analyzing the following failed DISA STIG control on a RHEL 9 system.\n\
         \n\
         Rule ID    : {rule_id}\n\
         Severity   : {severity}\n\
         Title      : {title}\n\
         Description: {description}\n\
         Check Text : {check_text}\n\
         \n\
         Please provide:\n\
         1. PLAIN ENGLISH EXPLANATION (2-3 sentences): What does this control mean and why does it exist?\n\
         2. ATTACK SCENARIO (1-2 sentences): How could an attacker exploit this if left unfixed?\n\
         3. BUSINESS RISK: Rate as Critical / High / Medium / Low and explain why in one sentence.\n\
         4. SIDE EFFECTS: Are there any known side effects or caveats to fixing this on a production system?\n\
         \n\
         Be concise and practical. Avoid jargon where possible.\n",
        rule_id = finding.rule_id,
        severity = finding.severity,
        title = finding.title,
        description = finding.description,
        check_text = finding.check_text,
    )
}

/// Prompt to triage and prioritize a whole batch of findings.
pub fn build_batch_analysis_prompt(findings: &[Finding]) -> String {
    let finding_list = findings
        .iter()
        .map(|f| format!("- [{}] {}: {}", f.severity, f.rule_id, f.title))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are reviewing the following DISA STIG failures on a RHEL 9 system.\n\
         \n\
         FAILED CONTROLS:\n\
         {finding_list}\n\
         \n\
         Please:\n\
         1. Identify the TOP 5 most critical findings to address first and briefly explain why.\n\
         2. Flag any findings that commonly break system functionality if misapplied.\n\
         3. Suggest the best logical ORDER to apply remediations (dependencies, reboots required, etc.)\n\
         \n\
         Be direct and practical.\n"
    )
}

/// Prompt asking the engine to generate an Ansible task for a finding.
pub fn build_remediation_prompt(finding: &Finding) -> String {
    format!(
        "Generate an Ansible task (or small set of tasks) to remediate the following DISA STIG finding on RHEL 9.\n\
         \n\
         Rule ID    : {rule_id}\n\
         Severity   : {severity}\n\
         Title      : {title}\n\
         Description: {description}\n\
         DISA Fix Text:\n\
         {fix_text}\n\
         \n\
         REQUIREMENTS:\n\
         - Use proper Ansible modules (lineinfile, file, service, sysctl, user, etc.) — avoid shell/command modules unless absolutely necessary\n\
         - The task must be idempotent (safe to run multiple times)\n\
         - Include a 'name' field with a descriptive name referencing the rule ID\n\
         - Use 'become: true' where root is required\n\
         - If a service restart is needed, use a handler or notify pattern\n\
         - Handle RHEL 9 specifically (systemd, dnf, etc.)\n\
         \n\
         OUTPUT FORMAT:\n\
         Return ONLY valid YAML for the task(s). Do not include playbook wrapper, just the task dict(s).\n\
         Do not include any explanation text outside the YAML.\n",
        rule_id = finding.rule_id,
        severity = finding.severity,
        title = finding.title,
        description = finding.description,
        fix_text = finding.fix_text,
    )
}

/// Prompt to generate the executive summary of a hardening session.
pub fn build_final_report_prompt(
    before: &LedgerEntry,
    after: &LedgerEntry,
    applied: &[String],
    skipped: &[String],
    failed: &[String],
    remaining: &[Finding],
) -> String {
    let applied_preview = applied
        .iter()
        .take(5)
        .cloned()
        .collect::<Vec<_>>()
        .join(", ");
    let ellipsis = if applied.len() > 5 { "..." } else { "" };

    let remaining_list = remaining
        .iter()
        .take(10)
        .map(|f| format!("- [{}] {}: {}", f.severity, f.rule_id, f.title))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Generate a concise executive summary of a STIG hardening session on RHEL 9.\n\
         \n\
         BEFORE:\n\
         - Compliance Score  : {before_score}%\n\
         - Failed Controls   : {before_fail}\n\
         \n\
         AFTER:\n\
         - Compliance Score  : {after_score}%\n\
         - Failed Controls   : {after_fail}\n\
         \n\
         ACTIONS TAKEN:\n\
         - Applied  : {applied_count} fixes ({applied_preview}{ellipsis})\n\
         - Skipped  : {skipped_count} (user declined)\n\
         - Failed   : {failed_count} (errors during application)\n\
         \n\
         REMAINING HIGH-PRIORITY FINDINGS:\n\
         {remaining_list}\n\
         \n\
         Write a 3-4 paragraph executive summary suitable for a security manager or auditor.\n\
         Include: what was accomplished, what remains, and recommended next steps.\n",
        before_score = before.score,
        before_fail = before.fail_count,
        after_score = after.score,
        after_fail = after.fail_count,
        applied_count = applied.len(),
        skipped_count = skipped.len(),
        failed_count = failed.len(),
    )
}

/// Strip markdown code fences the engine tends to wrap YAML output in.
pub fn strip_code_fences(raw: &str) -> String {
    let trimmed = raw.trim();
    if !trimmed.starts_with("```") {
        return trimmed.to_string();
    }
    trimmed
        .lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}
