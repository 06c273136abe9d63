// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! XCCDF results parser.
//!
//! Reads the results XML produced by `oscap xccdf eval`, extracts rule
//! metadata from the benchmark section, and turns failed rule-results into
//! an ordered finding list. The compliance score is computed over every
//! rule-result in the document, independent of any severity filtering.

use std::collections::HashMap;
use std::path::Path;

use roxmltree::{Document, Node};
use tracing::debug;

use crate::errors::OrchestratorError;
use crate::findings::{ComplianceScore, Finding, RuleResult, Severity, SeverityFloor};

/// Rule metadata pulled from the benchmark `Rule` elements, keyed by rule id.
#[derive(Debug, Default, Clone)]
struct RuleDefinition {
    severity: Option<String>,
    title: Option<String>,
    description: Option<String>,
    fix_text: Option<String>,
    check_text: Option<String>,
    references: Vec<String>,
}

/// Parse the results document and return failed findings at or above the
/// severity floor, ordered CAT I first. Order within one category follows
/// the rule-result order in the document.
pub fn parse_results(
    path: &Path,
    floor: SeverityFloor,
) -> Result<Vec<Finding>, OrchestratorError> {
    let text = read_report(path)?;
    let doc = Document::parse(&text)
        .map_err(|e| OrchestratorError::MalformedReport(e.to_string()))?;

    let defs = extract_rule_definitions(&doc);

    let mut findings = Vec::new();
    for rr in doc
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "rule-result")
    {
        let result = child_text(&rr, "result");
        if result.as_deref() != Some("fail") {
            continue;
        }

        let rule_id = rr.attribute("idref").unwrap_or("unknown").to_string();
        let def = defs.get(&rule_id).cloned().unwrap_or_default();

        // Severity on the rule-result wins over the benchmark definition.
        let severity_raw = rr
            .attribute("severity")
            .map(str::to_string)
            .or_else(|| def.severity.clone())
            .unwrap_or_else(|| "medium".to_string());
        let severity = Severity::from_raw(&severity_raw);

        if !floor.admits(severity) {
            continue;
        }

        findings.push(Finding {
            title: def.title.unwrap_or_else(|| rule_id.clone()),
            rule_id,
            severity,
            result: RuleResult::Fail,
            description: def
                .description
                .unwrap_or_else(|| "No description available.".to_string()),
            fix_text: def
                .fix_text
                .unwrap_or_else(|| "No automated fix available.".to_string()),
            check_text: def.check_text.unwrap_or_default(),
            references: def.references,
        });
    }

    // CAT I first; stable sort keeps document order within a category.
    findings.sort_by_key(|f| std::cmp::Reverse(f.severity.rank()));

    debug!(
        total = findings.len(),
        floor = %floor,
        "Parsed failed findings from results document"
    );
    Ok(findings)
}

/// Compute the scan-wide compliance score by counting every rule-result
/// literally. Never filtered, never divides by zero.
pub fn compliance_score(path: &Path) -> Result<ComplianceScore, OrchestratorError> {
    let text = read_report(path)?;
    let doc = Document::parse(&text)
        .map_err(|e| OrchestratorError::MalformedReport(e.to_string()))?;

    let mut pass = 0u32;
    let mut fail = 0u32;
    let mut not_checked = 0u32;
    let mut not_applicable = 0u32;

    for rr in doc
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "rule-result")
    {
        match child_text(&rr, "result").as_deref().map(RuleResult::from_raw) {
            Some(RuleResult::Pass) => pass += 1,
            Some(RuleResult::Fail) => fail += 1,
            Some(RuleResult::NotChecked) => not_checked += 1,
            Some(RuleResult::NotApplicable) => not_applicable += 1,
            _ => {}
        }
    }

    Ok(ComplianceScore::from_counts(
        pass,
        fail,
        not_checked,
        not_applicable,
    ))
}

fn read_report(path: &Path) -> Result<String, OrchestratorError> {
    if !path.exists() {
        return Err(OrchestratorError::ReportNotFound(path.to_path_buf()));
    }
    std::fs::read_to_string(path)
        .map_err(|e| OrchestratorError::MalformedReport(format!("unreadable report: {}", e)))
}

/// Build a map of rule metadata from the benchmark section. Tag names are
/// matched by local name so both XCCDF 1.1 and 1.2 namespaces parse.
fn extract_rule_definitions(doc: &Document<'_>) -> HashMap<String, RuleDefinition> {
    let mut defs = HashMap::new();

    for rule in doc
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "Rule")
    {
        let Some(rule_id) = rule.attribute("id") else {
            continue;
        };

        let references = rule
            .children()
            .filter(|n| n.is_element() && n.tag_name().name() == "reference")
            .filter_map(|n| {
                let text = collect_text(&n);
                (!text.is_empty()).then_some(text)
            })
            .collect();

        defs.insert(
            rule_id.to_string(),
            RuleDefinition {
                severity: rule.attribute("severity").map(str::to_string),
                title: child_text(&rule, "title"),
                description: child_text(&rule, "description"),
                fix_text: child_text(&rule, "fixtext"),
                check_text: rule
                    .descendants()
                    .find(|n| n.is_element() && n.tag_name().name() == "check-content")
                    .map(|n| collect_text(&n))
                    .filter(|t| !t.is_empty()),
                references,
            },
        );
    }

    defs
}

/// Text of the first direct child element with the given local name.
fn child_text(node: &Node<'_, '_>, name: &str) -> Option<String> {
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == name)
        .map(|n| collect_text(&n))
        .filter(|t| !t.is_empty())
}

/// All descendant text, whitespace-trimmed. XCCDF descriptions embed HTML
/// fragments so a single text() call would drop everything after the first
/// nested element.
fn collect_text(node: &Node<'_, '_>) -> String {
    let mut out = String::new();
    for n in node.descendants().filter(|n| n.is_text()) {
        if let Some(t) = n.text() {
            out.push_str(t);
        }
    }
    out.trim().to_string()
}
