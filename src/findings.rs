// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! STIG finding model: severity categories, rule results and the
//! scan-wide compliance score.

use serde::{Deserialize, Serialize};

/// DISA severity category, CAT I highest.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Severity {
    #[serde(rename = "CAT I")]
    CatI,
    #[serde(rename = "CAT II")]
    CatII,
    #[serde(rename = "CAT III")]
    CatIII,
}

impl Severity {
    /// Numeric rank for ordering, higher is more severe.
    pub fn rank(&self) -> u8 {
        match self {
            Severity::CatI => 3,
            Severity::CatII => 2,
            Severity::CatIII => 1,
        }
    }

    /// Map the XCCDF severity vocabulary onto categories.
    /// Anything unrecognized defaults to CAT II.
    pub fn from_raw(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "high" => Severity::CatI,
            "medium" => Severity::CatII,
            "low" => Severity::CatIII,
            _ => Severity::CatII,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::CatI => "CAT I",
            Severity::CatII => "CAT II",
            Severity::CatIII => "CAT III",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Minimum severity a finding must have to enter the processing queue.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeverityFloor {
    CatI,
    #[default]
    CatII,
    CatIII,
    All,
}

impl SeverityFloor {
    fn threshold(&self) -> u8 {
        match self {
            SeverityFloor::CatI => 3,
            SeverityFloor::CatII => 2,
            SeverityFloor::CatIII => 1,
            SeverityFloor::All => 0,
        }
    }

    /// Whether a finding of the given severity passes this floor.
    pub fn admits(&self, severity: Severity) -> bool {
        severity.rank() >= self.threshold()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SeverityFloor::CatI => "CAT_I",
            SeverityFloor::CatII => "CAT_II",
            SeverityFloor::CatIII => "CAT_III",
            SeverityFloor::All => "ALL",
        }
    }
}

impl std::str::FromStr for SeverityFloor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().replace(' ', "_").as_str() {
            "CAT_I" | "CAT1" | "I" => Ok(SeverityFloor::CatI),
            "CAT_II" | "CAT2" | "II" => Ok(SeverityFloor::CatII),
            "CAT_III" | "CAT3" | "III" => Ok(SeverityFloor::CatIII),
            "ALL" => Ok(SeverityFloor::All),
            other => Err(format!(
                "unknown severity floor '{}': expected CAT_I, CAT_II, CAT_III or ALL",
                other
            )),
        }
    }
}

impl std::fmt::Display for SeverityFloor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Literal outcome of one rule check in the results document.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RuleResult {
    Pass,
    Fail,
    #[serde(rename = "notchecked")]
    NotChecked,
    #[serde(rename = "notapplicable")]
    NotApplicable,
    #[serde(other)]
    Other,
}

impl RuleResult {
    pub fn from_raw(raw: &str) -> Self {
        match raw {
            "pass" => RuleResult::Pass,
            "fail" => RuleResult::Fail,
            "notchecked" => RuleResult::NotChecked,
            "notapplicable" => RuleResult::NotApplicable,
            _ => RuleResult::Other,
        }
    }
}

/// One failed compliance rule instance, immutable after parse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub rule_id: String,
    pub title: String,
    pub severity: Severity,
    pub result: RuleResult,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub fix_text: String,
    #[serde(default)]
    pub check_text: String,
    #[serde(default)]
    pub references: Vec<String>,
}

impl std::fmt::Display for Finding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {} — {}", self.severity, self.rule_id, self.title)
    }
}

/// Scan-wide outcome snapshot, recomputed for each scan.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ComplianceScore {
    /// pass / (pass + fail) × 100, rounded to one decimal. 0.0 when no
    /// checks produced a pass or fail.
    pub score: f64,
    pub pass_count: u32,
    pub fail_count: u32,
    #[serde(default)]
    pub not_checked: u32,
    #[serde(default)]
    pub not_applicable: u32,
}

impl ComplianceScore {
    pub fn from_counts(
        pass_count: u32,
        fail_count: u32,
        not_checked: u32,
        not_applicable: u32,
    ) -> Self {
        let checked = pass_count + fail_count;
        let score = if checked > 0 {
            let raw = f64::from(pass_count) / f64::from(checked) * 100.0;
            (raw * 10.0).round() / 10.0
        } else {
            0.0
        };
        Self {
            score,
            pass_count,
            fail_count,
            not_checked,
            not_applicable,
        }
    }

    pub fn total_checked(&self) -> u32 {
        self.pass_count + self.fail_count
    }
}

/// Count findings per severity category. Used for ledger entries and
/// progress rendering.
pub fn count_by_severity(findings: &[Finding]) -> (usize, usize, usize) {
    let cat1 = findings.iter().filter(|f| f.severity == Severity::CatI).count();
    let cat2 = findings.iter().filter(|f| f.severity == Severity::CatII).count();
    let cat3 = findings.iter().filter(|f| f.severity == Severity::CatIII).count();
    (cat1, cat2, cat3)
}
