use serde_json::Value;
use serde_sarif::sarif::{Result as SarifResult, Run};

use crate::sarif::{find_rule, find_rule_property, rule_default_level};

const SECURITY_SEVERITY: &str = "security-severity";
const CODEQL_PROBLEM_SEVERITY: &str = "problem.severity";
const SNYK_CVSS_BASE_SCORE: &str = "cvssv3_baseScore";

/// Strategy for pulling score and level out of tool-specific rule metadata.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Extractor {
    Common,
    /// Rules carry a `problem.severity` level fallback.
    CodeQl,
    /// Rules carry a `cvssv3_baseScore` score.
    SnykOpenSource,
}

impl Extractor {
    /// Exact, case-sensitive match on the tool component name.
    pub(crate) fn for_tool(name: &str) -> Self {
        match name {
            "CodeQL" => Self::CodeQl,
            "Snyk Open Source" => Self::SnykOpenSource,
            _ => Self::Common,
        }
    }

    pub(crate) fn find_score(self, run: &Run, result: &SarifResult) -> Option<f64> {
        match self {
            Self::SnykOpenSource => score_property(run, result, SNYK_CVSS_BASE_SCORE)
                .or_else(|| common_score(run, result)),
            Self::Common | Self::CodeQl => common_score(run, result),
        }
    }

    /// `result_level` is the result's raw `level`, read before typed parsing.
    pub(crate) fn find_level(
        self,
        run: &Run,
        result: &SarifResult,
        result_level: Option<&str>,
    ) -> Option<String> {
        let level = common_level(run, result, result_level);
        match self {
            Self::CodeQl => level.or_else(|| {
                find_rule_property(run, result, CODEQL_PROBLEM_SEVERITY)
                    .and_then(Value::as_str)
                    .map(str::to_string)
            }),
            Self::Common | Self::SnykOpenSource => level,
        }
    }
}

fn common_score(run: &Run, result: &SarifResult) -> Option<f64> {
    score_property(run, result, SECURITY_SEVERITY)
}

fn common_level(run: &Run, result: &SarifResult, result_level: Option<&str>) -> Option<String> {
    result_level
        .map(str::to_string)
        .or_else(|| find_rule(run, result).and_then(rule_default_level))
}

// Producers disagree on whether scores are JSON numbers or numeric strings.
fn score_property(run: &Run, result: &SarifResult, key: &str) -> Option<f64> {
    match find_rule_property(run, result, key)? {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}
