use std::io;
use std::path::PathBuf;

/// Errors raised while building the model or constructing its inputs.
#[derive(Debug, thiserror::Error)]
pub(crate) enum SummaryError {
    #[error("no SARIF files found: {reason}")]
    InputNotFound { reason: String },

    #[error("failed to read {}", path.display())]
    ReadInput {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse SARIF file {}", path.display())]
    MalformedInput {
        path: PathBuf,
        #[source]
        source: serde_path_to_error::Error<serde_json::Error>,
    },

    #[error("invalid hex color: \"{value}\"")]
    InvalidColor { value: String },

    #[error("unknown {kind}: {value}")]
    UnknownSelector { kind: &'static str, value: String },
}
