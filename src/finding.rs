use std::cell::OnceCell;
use std::fmt;
use std::sync::Arc;

use serde_sarif::sarif::{Result as SarifResult, Run};
use tracing::debug;

use crate::extractor::Extractor;
use crate::sarif::{find_rule, find_tool_component};

/// Qualitative level of a finding, in ascending importance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) enum Level {
    Unknown,
    None,
    Note,
    Warning,
    Error,
}

impl Level {
    pub(crate) const ALL: [Level; 5] = [
        Level::Unknown,
        Level::None,
        Level::Note,
        Level::Warning,
        Level::Error,
    ];

    /// `Unknown` when nothing was found, `None` when something unrecognized was.
    pub(crate) fn from_raw(raw: Option<&str>) -> Self {
        match raw {
            None => Level::Unknown,
            Some("error") => Level::Error,
            Some("warning") => Level::Warning,
            Some("note") => Level::Note,
            Some(_) => Level::None,
        }
    }

    pub(crate) fn label(self) -> &'static str {
        match self {
            Level::Unknown => "Unknown",
            Level::None => "None",
            Level::Note => "Note",
            Level::Warning => "Warning",
            Level::Error => "Error",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Score-derived severity of a finding, in ascending importance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) enum Severity {
    Unknown,
    None,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub(crate) const ALL: [Severity; 6] = [
        Severity::Unknown,
        Severity::None,
        Severity::Low,
        Severity::Medium,
        Severity::High,
        Severity::Critical,
    ];

    /// Bands a CVSS-like score. Each band includes its lower edge.
    pub(crate) fn from_score(score: Option<f64>) -> Self {
        let Some(score) = score.filter(|score| (0.0..=10.0).contains(score)) else {
            return Severity::Unknown;
        };
        if score >= 9.0 {
            Severity::Critical
        } else if score >= 7.0 {
            Severity::High
        } else if score >= 4.0 {
            Severity::Medium
        } else if score >= 0.1 {
            Severity::Low
        } else {
            Severity::None
        }
    }

    pub(crate) fn label(self) -> &'static str {
        match self {
            Severity::Unknown => "Unknown",
            Severity::None => "None",
            Severity::Low => "Low",
            Severity::Medium => "Medium",
            Severity::High => "High",
            Severity::Critical => "Critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One classified result of a SARIF run.
///
/// Score and level are resolved on first access and cached. `clone()` builds
/// the finding again from its inputs, so the copy starts with empty caches.
///
/// `result_level` is the result's own `level` exactly as written in the
/// document, which may be a word the typed result cannot hold.
#[derive(Debug)]
pub(crate) struct Finding {
    sarif_path: Arc<str>,
    run_id: usize,
    run: Arc<Run>,
    result: Arc<SarifResult>,
    result_level: Option<String>,
    tool_name: String,
    extractor: Extractor,
    cvss_score: OnceCell<Option<f64>>,
    level: OnceCell<Level>,
}

impl Finding {
    pub(crate) fn new(
        sarif_path: Arc<str>,
        run_id: usize,
        run: Arc<Run>,
        result: Arc<SarifResult>,
        result_level: Option<String>,
    ) -> Self {
        let tool_name = find_tool_component(&run, &result).name.clone();
        let extractor = Extractor::for_tool(&tool_name);
        Self {
            sarif_path,
            run_id,
            run,
            result,
            result_level,
            tool_name,
            extractor,
            cvss_score: OnceCell::new(),
            level: OnceCell::new(),
        }
    }

    pub(crate) fn sarif_path(&self) -> &str {
        &self.sarif_path
    }

    pub(crate) fn run_id(&self) -> usize {
        self.run_id
    }

    pub(crate) fn tool_name(&self) -> &str {
        &self.tool_name
    }

    pub(crate) fn cvss_score(&self) -> Option<f64> {
        *self.cvss_score.get_or_init(|| {
            self.extractor.find_score(&self.run, &self.result)
        })
    }

    pub(crate) fn level(&self) -> Level {
        *self.level.get_or_init(|| {
            let raw = self.extractor.find_level(
                &self.run,
                &self.result,
                self.result_level.as_deref(),
            );
            if raw.is_none() {
                debug!("unknown level of {} rule", self.rule_id());
            }
            Level::from_raw(raw.as_deref())
        })
    }

    pub(crate) fn severity(&self) -> Severity {
        let score = self.cvss_score();
        let severity = Severity::from_score(score);
        if severity == Severity::Unknown {
            debug!("unsupported CVSS score {score:?} in {} rule", self.rule_id());
        }
        severity
    }

    fn rule_id(&self) -> &str {
        find_rule(&self.run, &self.result)
            .map(|rule| rule.id.as_str())
            .or(self.result.rule_id.as_deref())
            .unwrap_or("<unresolved>")
    }

    #[cfg(test)]
    fn is_cached(&self) -> bool {
        self.cvss_score.get().is_some() || self.level.get().is_some()
    }
}

impl Clone for Finding {
    fn clone(&self) -> Self {
        Self::new(
            Arc::clone(&self.sarif_path),
            self.run_id,
            Arc::clone(&self.run),
            Arc::clone(&self.result),
            self.result_level.clone(),
        )
    }
}

/// Field/value pair used to look findings up.
#[derive(Clone, Copy, Debug)]
pub(crate) enum FindingProperty<'a> {
    SarifPath(&'a str),
    RunId(usize),
    Level(Level),
    Severity(Severity),
}

impl FindingProperty<'_> {
    fn matches(&self, finding: &Finding) -> bool {
        match *self {
            FindingProperty::SarifPath(path) => finding.sarif_path() == path,
            FindingProperty::RunId(id) => finding.run_id() == id,
            FindingProperty::Level(level) => finding.level() == level,
            FindingProperty::Severity(severity) => finding.severity() == severity,
        }
    }
}

/// Ordered collection of findings.
#[derive(Clone, Debug, Default)]
pub(crate) struct FindingArray {
    findings: Vec<Finding>,
}

impl FindingArray {
    pub(crate) fn push(&mut self, finding: Finding) {
        self.findings.push(finding);
    }

    pub(crate) fn len(&self) -> usize {
        self.findings.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }

    pub(crate) fn iter(&self) -> std::slice::Iter<'_, Finding> {
        self.findings.iter()
    }

    /// First finding, in collection order, whose field equals the given value.
    pub(crate) fn find_by_property(&self, property: FindingProperty<'_>) -> Option<&Finding> {
        self.findings.iter().find(|finding| property.matches(finding))
    }

    /// Every finding, in collection order, whose field equals the given value.
    pub(crate) fn filter_by_property(&self, property: FindingProperty<'_>) -> Vec<&Finding> {
        self.findings
            .iter()
            .filter(|finding| property.matches(finding))
            .collect()
    }

    pub(crate) fn has_severity_or_higher(&self, threshold: Severity) -> bool {
        Severity::ALL
            .into_iter()
            .filter(|severity| *severity >= threshold)
            .any(|severity| self.find_by_property(FindingProperty::Severity(severity)).is_some())
    }

    pub(crate) fn has_level_or_higher(&self, threshold: Level) -> bool {
        Level::ALL
            .into_iter()
            .filter(|level| *level >= threshold)
            .any(|level| self.find_by_property(FindingProperty::Level(level)).is_some())
    }
}

impl FromIterator<Finding> for FindingArray {
    fn from_iter<I: IntoIterator<Item = Finding>>(iter: I) -> Self {
        Self {
            findings: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a FindingArray {
    type Item = &'a Finding;
    type IntoIter = std::slice::Iter<'a, Finding>;

    fn into_iter(self) -> Self::IntoIter {
        self.findings.iter()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::sarif::tests::run_from_json;
    use serde_json::{Value, json};

    /// Builds a single-run finding with the given rule properties and result level.
    pub(crate) fn finding_with(tool: &str, properties: Value, level: Option<&str>) -> Finding {
        let mut run = run_from_json(json!({
            "tool": { "driver": { "name": tool, "rules": [{ "id": "R", "properties": properties }] } },
            "results": [{ "message": { "text": "m" }, "ruleId": "R" }]
        }));
        let result = run.results.take().expect("results").remove(0);
        Finding::new(
            Arc::from("report.sarif"),
            1,
            Arc::new(run),
            Arc::new(result),
            level.map(str::to_string),
        )
    }

    pub(crate) fn finding_with_score(score: f64) -> Finding {
        finding_with("Tool", json!({ "security-severity": score }), None)
    }

    #[test]
    fn level_distinguishes_missing_from_unrecognized() {
        assert_eq!(Level::from_raw(None), Level::Unknown);
        assert_eq!(Level::from_raw(Some("bogus")), Level::None);
        assert_eq!(Level::from_raw(Some("none")), Level::None);
        assert_eq!(Level::from_raw(Some("note")), Level::Note);
        assert_eq!(Level::from_raw(Some("warning")), Level::Warning);
        assert_eq!(Level::from_raw(Some("error")), Level::Error);
    }

    #[test]
    fn severity_bands_include_lower_edges() {
        let cases = [
            (None, Severity::Unknown),
            (Some(-1.0), Severity::Unknown),
            (Some(11.0), Severity::Unknown),
            (Some(f64::NAN), Severity::Unknown),
            (Some(0.0), Severity::None),
            (Some(0.05), Severity::None),
            (Some(0.1), Severity::Low),
            (Some(3.9), Severity::Low),
            (Some(4.0), Severity::Medium),
            (Some(6.9), Severity::Medium),
            (Some(7.0), Severity::High),
            (Some(8.9), Severity::High),
            (Some(9.0), Severity::Critical),
            (Some(10.0), Severity::Critical),
        ];
        for (score, expected) in cases {
            assert_eq!(Severity::from_score(score), expected, "score {score:?}");
        }
    }

    #[test]
    fn severity_is_monotonic_over_valid_scores() {
        let mut previous = Severity::from_score(Some(0.0));
        for step in 1..=1000 {
            let current = Severity::from_score(Some(f64::from(step) / 100.0));
            assert!(previous <= current, "severity decreased at step {step}");
            previous = current;
        }
    }

    #[test]
    fn finding_resolves_score_level_and_tool() {
        let finding = finding_with("Trivy", json!({ "security-severity": 9.5 }), Some("error"));

        assert_eq!(finding.tool_name(), "Trivy");
        assert_eq!(finding.sarif_path(), "report.sarif");
        assert_eq!(finding.run_id(), 1);
        assert_eq!(finding.cvss_score(), Some(9.5));
        assert_eq!(finding.severity(), Severity::Critical);
        assert_eq!(finding.level(), Level::Error);
    }

    #[test]
    fn finding_without_signals_is_unknown() {
        let finding = finding_with("Trivy", json!({}), None);

        assert_eq!(finding.severity(), Severity::Unknown);
        assert_eq!(finding.level(), Level::Unknown);
    }

    #[test]
    fn unrecognized_result_level_is_none() {
        let finding = finding_with("Trivy", json!({}), Some("bogus"));

        assert_eq!(finding.level(), Level::None);
        assert_eq!(finding.clone().level(), Level::None);
    }

    #[test]
    fn clone_starts_with_empty_caches() {
        let finding = finding_with("Trivy", json!({ "security-severity": 5.0 }), Some("note"));
        assert!(!finding.is_cached());
        assert_eq!(finding.severity(), Severity::Medium);
        assert!(finding.is_cached());

        let copy = finding.clone();

        assert!(!copy.is_cached());
        assert_eq!(copy.severity(), Severity::Medium);
        assert_eq!(copy.level(), Level::Note);
    }

    #[test]
    fn find_by_property_returns_first_match() {
        let findings: FindingArray = [
            finding_with("A", json!({ "security-severity": 2.0 }), None),
            finding_with("B", json!({ "security-severity": 2.5 }), None),
        ]
        .into_iter()
        .collect();

        let found = findings
            .find_by_property(FindingProperty::Severity(Severity::Low))
            .expect("low finding");

        assert_eq!(found.tool_name(), "A");
        assert!(
            findings
                .find_by_property(FindingProperty::RunId(2))
                .is_none()
        );
    }

    #[test]
    fn filter_by_property_keeps_collection_order() {
        let findings: FindingArray = [
            finding_with("A", json!({ "security-severity": 9.0 }), None),
            finding_with("B", json!({ "security-severity": 1.0 }), None),
            finding_with("C", json!({ "security-severity": 9.9 }), None),
        ]
        .into_iter()
        .collect();

        let critical: Vec<&str> = findings
            .filter_by_property(FindingProperty::Severity(Severity::Critical))
            .into_iter()
            .map(Finding::tool_name)
            .collect();

        assert_eq!(critical, vec!["A", "C"]);
        assert_eq!(
            findings
                .filter_by_property(FindingProperty::SarifPath("report.sarif"))
                .len(),
            3
        );
    }

    #[test]
    fn has_severity_or_higher_checks_threshold() {
        let findings: FindingArray = [finding_with_score(2.0), finding_with_score(5.0)]
            .into_iter()
            .collect();

        assert!(findings.has_severity_or_higher(Severity::Medium));
        assert!(!findings.has_severity_or_higher(Severity::High));
        assert!(findings.has_severity_or_higher(Severity::Unknown));
    }

    #[test]
    fn has_level_or_higher_checks_threshold() {
        let findings: FindingArray = [
            finding_with("T", json!({}), Some("note")),
            finding_with("T", json!({}), Some("none")),
        ]
        .into_iter()
        .collect();

        assert!(findings.has_level_or_higher(Level::Note));
        assert!(findings.has_level_or_higher(Level::None));
        assert!(!findings.has_level_or_higher(Level::Warning));
    }

    #[test]
    fn empty_collection_has_nothing() {
        let findings = FindingArray::default();

        assert!(!findings.has_severity_or_higher(Severity::Unknown));
        assert!(!findings.has_level_or_higher(Level::Unknown));
    }
}
