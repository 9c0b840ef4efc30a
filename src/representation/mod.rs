mod table;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use tracing::trace;

use crate::error::SummaryError;
use crate::finding::{Finding, FindingArray, FindingProperty, Level, Severity};
use crate::model::Model;

use table::Table;

pub(crate) const NO_VULNS_FOUND_TEXT: &str = "No vulnerabilities found";

/// How findings are split into groups.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Grouping {
    Run,
    ToolName,
    SarifFile,
    Total,
}

/// Which classification findings are counted by.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Axis {
    Level,
    Severity,
}

impl Axis {
    /// Ordinal of the finding's value on this axis.
    fn rank(self, finding: &Finding) -> usize {
        match self {
            Axis::Level => finding.level() as usize,
            Axis::Severity => finding.severity() as usize,
        }
    }

    /// Labels in declaration order, indexed by rank.
    fn labels(self) -> Vec<&'static str> {
        match self {
            Axis::Level => Level::ALL.iter().map(|level| level.label()).collect(),
            Axis::Severity => Severity::ALL.iter().map(|severity| severity.label()).collect(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Style {
    Compact,
    Table,
}

/// Every supported combination of style, grouping and axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub(crate) enum RepresentationType {
    CompactGroupByRunPerLevel,
    CompactGroupByRunPerSeverity,
    CompactGroupByToolNamePerLevel,
    #[default]
    CompactGroupByToolNamePerSeverity,
    CompactGroupBySarifPerLevel,
    CompactGroupBySarifPerSeverity,
    CompactTotalPerLevel,
    CompactTotalPerSeverity,
    TableGroupByRunPerLevel,
    TableGroupByRunPerSeverity,
    TableGroupByToolNamePerLevel,
    TableGroupByToolNamePerSeverity,
    TableGroupBySarifPerLevel,
    TableGroupBySarifPerSeverity,
}

impl RepresentationType {
    pub(crate) const ALL: [RepresentationType; 14] = [
        RepresentationType::CompactGroupByRunPerLevel,
        RepresentationType::CompactGroupByRunPerSeverity,
        RepresentationType::CompactGroupByToolNamePerLevel,
        RepresentationType::CompactGroupByToolNamePerSeverity,
        RepresentationType::CompactGroupBySarifPerLevel,
        RepresentationType::CompactGroupBySarifPerSeverity,
        RepresentationType::CompactTotalPerLevel,
        RepresentationType::CompactTotalPerSeverity,
        RepresentationType::TableGroupByRunPerLevel,
        RepresentationType::TableGroupByRunPerSeverity,
        RepresentationType::TableGroupByToolNamePerLevel,
        RepresentationType::TableGroupByToolNamePerSeverity,
        RepresentationType::TableGroupBySarifPerLevel,
        RepresentationType::TableGroupBySarifPerSeverity,
    ];

    pub(crate) fn parts(self) -> (Style, Grouping, Axis) {
        use RepresentationType::*;
        match self {
            CompactGroupByRunPerLevel => (Style::Compact, Grouping::Run, Axis::Level),
            CompactGroupByRunPerSeverity => (Style::Compact, Grouping::Run, Axis::Severity),
            CompactGroupByToolNamePerLevel => (Style::Compact, Grouping::ToolName, Axis::Level),
            CompactGroupByToolNamePerSeverity => {
                (Style::Compact, Grouping::ToolName, Axis::Severity)
            }
            CompactGroupBySarifPerLevel => (Style::Compact, Grouping::SarifFile, Axis::Level),
            CompactGroupBySarifPerSeverity => (Style::Compact, Grouping::SarifFile, Axis::Severity),
            CompactTotalPerLevel => (Style::Compact, Grouping::Total, Axis::Level),
            CompactTotalPerSeverity => (Style::Compact, Grouping::Total, Axis::Severity),
            TableGroupByRunPerLevel => (Style::Table, Grouping::Run, Axis::Level),
            TableGroupByRunPerSeverity => (Style::Table, Grouping::Run, Axis::Severity),
            TableGroupByToolNamePerLevel => (Style::Table, Grouping::ToolName, Axis::Level),
            TableGroupByToolNamePerSeverity => (Style::Table, Grouping::ToolName, Axis::Severity),
            TableGroupBySarifPerLevel => (Style::Table, Grouping::SarifFile, Axis::Level),
            TableGroupBySarifPerSeverity => (Style::Table, Grouping::SarifFile, Axis::Severity),
        }
    }

    fn name(self) -> String {
        selector_key(&format!("{self:?}"))
    }
}

impl FromStr for RepresentationType {
    type Err = SummaryError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let key = selector_key(value);
        RepresentationType::ALL
            .into_iter()
            .find(|kind| kind.name() == key)
            .ok_or_else(|| SummaryError::UnknownSelector {
                kind: "representation type",
                value: value.to_string(),
            })
    }
}

impl fmt::Display for RepresentationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Normalizes `PascalCase` and `kebab-case` selector names to kebab-case.
pub(crate) fn selector_key(value: &str) -> String {
    let mut key = String::with_capacity(value.len() + 8);
    for (index, c) in value.trim().chars().enumerate() {
        if c.is_ascii_uppercase() {
            if index > 0 && !key.ends_with('-') {
                key.push('-');
            }
            key.push(c.to_ascii_lowercase());
        } else if c == '_' {
            key.push('-');
        } else {
            key.push(c);
        }
    }
    key
}

/// Findings of one group, plus how the group is titled.
struct Group<'a> {
    /// Compact title, with chat markup.
    title: String,
    /// Plain table row label.
    label: String,
    findings: Vec<&'a Finding>,
}

/// Renders a model as compact text or as a table.
///
/// Holds its own clones of the model's findings, sorted by the axis in
/// descending importance, so rendering never touches the model's order.
pub(crate) struct Representation<'a> {
    model: &'a Model,
    findings: FindingArray,
    style: Style,
    grouping: Grouping,
    axis: Axis,
}

impl<'a> Representation<'a> {
    pub(crate) fn new(model: &'a Model, kind: RepresentationType) -> Self {
        let (style, grouping, axis) = kind.parts();
        let mut findings: Vec<Finding> = model.findings.iter().cloned().collect();
        findings.sort_by_key(|finding| std::cmp::Reverse(axis.rank(finding)));
        Self {
            model,
            findings: findings.into_iter().collect(),
            style,
            grouping,
            axis,
        }
    }

    pub(crate) fn compose(&self) -> String {
        if self.is_empty() {
            return NO_VULNS_FOUND_TEXT.to_string();
        }
        let groups = self.groups();
        let composed = match self.style {
            Style::Compact => self.compose_compact(&groups),
            Style::Table => self.compose_table(&groups),
        };
        trace!("{composed}");
        composed
    }

    fn is_empty(&self) -> bool {
        self.findings.is_empty()
            || match self.grouping {
                Grouping::Run | Grouping::ToolName => self.model.runs.is_empty(),
                Grouping::SarifFile => self.model.sarif_files.is_empty(),
                Grouping::Total => false,
            }
    }

    fn groups(&self) -> Vec<Group<'_>> {
        match self.grouping {
            Grouping::Run => self
                .model
                .runs
                .iter()
                .map(|run| Group {
                    title: format!(
                        "{} {}",
                        italic(&format!("[Run {}]", run.id)),
                        bold(&run.tool_name)
                    ),
                    label: run.id.to_string(),
                    findings: self.findings.filter_by_property(FindingProperty::RunId(run.id)),
                })
                .collect(),
            Grouping::ToolName => {
                let mut groups: Vec<Group<'_>> = Vec::new();
                for run in &self.model.runs {
                    let findings = self.findings.filter_by_property(FindingProperty::RunId(run.id));
                    match groups.iter_mut().find(|group| group.label == run.tool_name) {
                        Some(group) => group.findings.extend(findings),
                        None => groups.push(Group {
                            title: bold(&run.tool_name),
                            label: run.tool_name.clone(),
                            findings,
                        }),
                    }
                }
                // Merging runs of one tool must keep the axis order within the group.
                for group in &mut groups {
                    group
                        .findings
                        .sort_by_key(|finding| std::cmp::Reverse(self.axis.rank(finding)));
                }
                groups
            }
            Grouping::SarifFile => {
                let mut seen: Vec<&str> = Vec::new();
                let mut groups = Vec::new();
                for path in &self.model.sarif_files {
                    if seen.contains(&path.as_str()) {
                        continue;
                    }
                    seen.push(path);
                    let number = seen.len();
                    groups.push(Group {
                        title: format!(
                            "{} {}",
                            italic(&format!("[File {number}]")),
                            bold(&base_name(path))
                        ),
                        label: number.to_string(),
                        findings: self
                            .findings
                            .filter_by_property(FindingProperty::SarifPath(path)),
                    });
                }
                groups
            }
            Grouping::Total => vec![Group {
                title: "Total".to_string(),
                label: "Total".to_string(),
                findings: self.findings.iter().collect(),
            }],
        }
    }

    fn counts(&self, findings: &[&Finding]) -> Vec<u64> {
        let mut counts = vec![0; self.axis.labels().len()];
        for finding in findings {
            counts[self.axis.rank(finding)] += 1;
        }
        counts
    }

    fn compose_compact(&self, groups: &[Group<'_>]) -> String {
        let labels = self.axis.labels();
        groups
            .iter()
            .map(|group| {
                if group.findings.is_empty() {
                    return format!("{}\n{NO_VULNS_FOUND_TEXT}", group.title);
                }
                let summary = self
                    .counts(&group.findings)
                    .into_iter()
                    .enumerate()
                    .rev()
                    .filter(|(_, count)| *count > 0)
                    .map(|(rank, count)| format!("{}: {count}", bold(labels[rank])))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{}\n{summary}", group.title)
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    fn compose_table(&self, groups: &[Group<'_>]) -> String {
        let rows: Vec<&str> = groups.iter().map(|group| group.label.as_str()).collect();
        let columns = self.axis.labels();
        let mut table = Table::new(self.table_header(), &rows, &columns);
        for (row, group) in groups.iter().enumerate() {
            for (column, count) in self.counts(&group.findings).into_iter().enumerate() {
                table.set(row, column, count);
            }
        }
        code_block(&table.to_string())
    }

    fn table_header(&self) -> &'static str {
        match self.grouping {
            Grouping::Run => "Run #",
            Grouping::ToolName => "Tool",
            Grouping::SarifFile => "File #",
            Grouping::Total => "",
        }
    }
}

fn bold(text: &str) -> String {
    format!("*{text}*")
}

fn italic(text: &str) -> String {
    format!("_{text}_")
}

fn code_block(text: &str) -> String {
    format!("```\n{text}\n```")
}

fn base_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}
