use std::fmt;
use std::str::FromStr;

use crate::error::SummaryError;
use crate::finding::{FindingArray, FindingProperty, Level, Severity};
use crate::representation::selector_key;

/// Condition the findings must meet for the message to be sent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub(crate) enum SendIf {
    SeverityCritical,
    SeverityHigh,
    SeverityHighOrHigher,
    SeverityMedium,
    SeverityMediumOrHigher,
    SeverityLow,
    SeverityLowOrHigher,
    SeverityNone,
    SeverityNoneOrHigher,
    SeverityUnknown,
    SeverityUnknownOrHigher,
    LevelError,
    LevelWarning,
    LevelWarningOrHigher,
    LevelNote,
    LevelNoteOrHigher,
    LevelNone,
    LevelNoneOrHigher,
    LevelUnknown,
    LevelUnknownOrHigher,
    #[default]
    Always,
    Some,
    Empty,
    Never,
}

/// What a condition checks, once the selector is taken apart.
enum Check {
    Severity { severity: Severity, or_higher: bool },
    Level { level: Level, or_higher: bool },
    Always,
    Some,
    Empty,
    Never,
}

impl SendIf {
    pub(crate) const ALL: [SendIf; 24] = [
        SendIf::SeverityCritical,
        SendIf::SeverityHigh,
        SendIf::SeverityHighOrHigher,
        SendIf::SeverityMedium,
        SendIf::SeverityMediumOrHigher,
        SendIf::SeverityLow,
        SendIf::SeverityLowOrHigher,
        SendIf::SeverityNone,
        SendIf::SeverityNoneOrHigher,
        SendIf::SeverityUnknown,
        SendIf::SeverityUnknownOrHigher,
        SendIf::LevelError,
        SendIf::LevelWarning,
        SendIf::LevelWarningOrHigher,
        SendIf::LevelNote,
        SendIf::LevelNoteOrHigher,
        SendIf::LevelNone,
        SendIf::LevelNoneOrHigher,
        SendIf::LevelUnknown,
        SendIf::LevelUnknownOrHigher,
        SendIf::Always,
        SendIf::Some,
        SendIf::Empty,
        SendIf::Never,
    ];

    fn check(self) -> Check {
        use SendIf::*;
        let severity = |severity, or_higher| Check::Severity { severity, or_higher };
        let level = |level, or_higher| Check::Level { level, or_higher };
        match self {
            SeverityCritical => severity(Severity::Critical, false),
            SeverityHigh => severity(Severity::High, false),
            SeverityHighOrHigher => severity(Severity::High, true),
            SeverityMedium => severity(Severity::Medium, false),
            SeverityMediumOrHigher => severity(Severity::Medium, true),
            SeverityLow => severity(Severity::Low, false),
            SeverityLowOrHigher => severity(Severity::Low, true),
            SeverityNone => severity(Severity::None, false),
            SeverityNoneOrHigher => severity(Severity::None, true),
            SeverityUnknown => severity(Severity::Unknown, false),
            SeverityUnknownOrHigher => severity(Severity::Unknown, true),
            LevelError => level(Level::Error, false),
            LevelWarning => level(Level::Warning, false),
            LevelWarningOrHigher => level(Level::Warning, true),
            LevelNote => level(Level::Note, false),
            LevelNoteOrHigher => level(Level::Note, true),
            LevelNone => level(Level::None, false),
            LevelNoneOrHigher => level(Level::None, true),
            LevelUnknown => level(Level::Unknown, false),
            LevelUnknownOrHigher => level(Level::Unknown, true),
            Always => Check::Always,
            Some => Check::Some,
            Empty => Check::Empty,
            Never => Check::Never,
        }
    }

    pub(crate) fn is_satisfied(self, findings: &FindingArray) -> bool {
        match self.check() {
            Check::Severity {
                severity,
                or_higher: false,
            } => findings
                .find_by_property(FindingProperty::Severity(severity))
                .is_some(),
            Check::Severity {
                severity,
                or_higher: true,
            } => findings.has_severity_or_higher(severity),
            Check::Level {
                level,
                or_higher: false,
            } => findings
                .find_by_property(FindingProperty::Level(level))
                .is_some(),
            Check::Level {
                level,
                or_higher: true,
            } => findings.has_level_or_higher(level),
            Check::Always => true,
            Check::Some => !findings.is_empty(),
            Check::Empty => findings.is_empty(),
            Check::Never => false,
        }
    }

    /// Log line for when the condition is not met.
    pub(crate) fn skip_reason(self) -> String {
        match self.check() {
            Check::Severity {
                severity,
                or_higher,
            } => format!(
                "No message sent: no findings with \"{severity}\"{} severity.",
                if or_higher { " or higher" } else { "" }
            ),
            Check::Level { level, or_higher } => format!(
                "No message sent: no findings with \"{level}\"{} level.",
                if or_higher { " or higher" } else { "" }
            ),
            Check::Always => "Message always sent.".to_string(),
            Check::Some => "No message sent: findings are not found.".to_string(),
            Check::Empty => "No message sent: some findings are found.".to_string(),
            Check::Never => "No message sent: sending is disabled.".to_string(),
        }
    }

    fn name(self) -> String {
        selector_key(&format!("{self:?}"))
    }
}

impl FromStr for SendIf {
    type Err = SummaryError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let key = selector_key(value);
        SendIf::ALL
            .into_iter()
            .find(|condition| condition.name() == key)
            .ok_or_else(|| SummaryError::UnknownSelector {
                kind: "send condition",
                value: value.to_string(),
            })
    }
}

impl fmt::Display for SendIf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}
