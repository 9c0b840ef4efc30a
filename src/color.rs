use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, trace};

use crate::error::SummaryError;
use crate::finding::{FindingArray, FindingProperty, Level, Severity};

static HEX_COLOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^#(?:[0-9A-Fa-f]{3}|[0-9A-Fa-f]{4}|[0-9A-Fa-f]{6}|[0-9A-Fa-f]{8})$")
        .expect("hex color pattern is valid")
});

/// Hex color, optionally given as a CI job status.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Color(String);

impl Color {
    pub(crate) fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Color {
    type Err = SummaryError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let mapped = match value {
            "success" => "#008000",
            "failure" => "#ff0000",
            "cancelled" => "#0047ab",
            "skipped" => "#808080",
            other => other,
        };
        if !HEX_COLOR.is_match(mapped) {
            return Err(SummaryError::InvalidColor {
                value: value.to_string(),
            });
        }
        Ok(Self(mapped.to_string()))
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, Default)]
pub(crate) struct SeverityColors {
    pub(crate) critical: Option<Color>,
    pub(crate) high: Option<Color>,
    pub(crate) medium: Option<Color>,
    pub(crate) low: Option<Color>,
    pub(crate) none: Option<Color>,
    pub(crate) unknown: Option<Color>,
}

#[derive(Clone, Debug, Default)]
pub(crate) struct LevelColors {
    pub(crate) error: Option<Color>,
    pub(crate) warning: Option<Color>,
    pub(crate) note: Option<Color>,
    pub(crate) none: Option<Color>,
    pub(crate) unknown: Option<Color>,
}

/// Message color configuration. `by_severity` takes precedence over `by_level`.
#[derive(Clone, Debug, Default)]
pub(crate) struct ColorPolicy {
    pub(crate) default: Option<Color>,
    pub(crate) empty: Option<Color>,
    pub(crate) by_level: Option<LevelColors>,
    pub(crate) by_severity: Option<SeverityColors>,
}

/// Picks the message color for the given findings.
///
/// Order: `by_severity` (critical down to unknown), `by_level` (error down to
/// unknown), `empty` when there are no findings, then `default`.
pub(crate) fn identify_color(findings: &FindingArray, policy: &ColorPolicy) -> Option<Color> {
    if let Some(colors) = &policy.by_severity {
        let candidates = [
            ("critical", Severity::Critical, &colors.critical),
            ("high", Severity::High, &colors.high),
            ("medium", Severity::Medium, &colors.medium),
            ("low", Severity::Low, &colors.low),
            ("none", Severity::None, &colors.none),
            ("unknown", Severity::Unknown, &colors.unknown),
        ];
        let found = candidates.into_iter().find_map(|(name, severity, color)| {
            first_present("bySeverity", name, color, || {
                findings
                    .find_by_property(FindingProperty::Severity(severity))
                    .is_some()
            })
        });
        if found.is_some() {
            return found;
        }
        trace!("none of the bySeverity colors is applicable");
    }

    if let Some(colors) = &policy.by_level {
        let candidates = [
            ("error", Level::Error, &colors.error),
            ("warning", Level::Warning, &colors.warning),
            ("note", Level::Note, &colors.note),
            ("none", Level::None, &colors.none),
            ("unknown", Level::Unknown, &colors.unknown),
        ];
        let found = candidates.into_iter().find_map(|(name, level, color)| {
            first_present("byLevel", name, color, || {
                findings
                    .find_by_property(FindingProperty::Level(level))
                    .is_some()
            })
        });
        if found.is_some() {
            return found;
        }
        trace!("none of the byLevel colors is applicable");
    }

    if findings.is_empty() {
        if let Some(empty) = &policy.empty {
            debug!("message has {empty} color taken from 'empty'");
            return Some(empty.clone());
        }
    }

    match &policy.default {
        Some(default) => debug!("message has {default} color taken from 'default'"),
        None => debug!("message has no color"),
    }
    policy.default.clone()
}

fn first_present(
    group: &str,
    name: &str,
    color: &Option<Color>,
    has_findings: impl FnOnce() -> bool,
) -> Option<Color> {
    let Some(color) = color else {
        trace!("'{group}.{name}' is not defined");
        return None;
    };
    if !has_findings() {
        trace!("'{group}.{name}' is defined but no such findings exist");
        return None;
    }
    debug!("message has {color} color taken from '{group}.{name}'");
    Some(color.clone())
}
