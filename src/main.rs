mod color;
mod error;
mod extractor;
mod finding;
mod inputs;
mod model;
mod representation;
mod sarif;
mod send_if;
mod slack;
mod telemetry;

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser};
use tracing::info;

use crate::color::{Color, ColorPolicy, LevelColors, SeverityColors, identify_color};
use crate::inputs::list_sarif_files;
use crate::model::Model;
use crate::representation::{Representation, RepresentationType};
use crate::send_if::SendIf;
use crate::slack::{CiRun, FooterType, SlackMessage};
use crate::telemetry::{LOG_ENV, init_logging, with_span};

/// CLI arguments for summarizing SARIF files into a Slack message.
#[derive(Parser, Debug)]
#[command(
    name = "sarif-to-slack",
    about = "Summarize SARIF findings and post them to a Slack incoming webhook.",
    version
)]
struct Cli {
    #[command(flatten)]
    input: InputArgs,
    #[command(flatten)]
    message: MessageArgs,
    #[command(flatten)]
    colors: ColorArgs,
    #[arg(
        long,
        value_name = "FILTER",
        help = "Log filter directives, e.g. `info` or `sarif_to_slack=debug`. Overrides SARIF_TO_SLACK_LOG."
    )]
    log_level: Option<String>,
}

/// Where SARIF files are read from.
#[derive(Args, Debug, Clone)]
struct InputArgs {
    #[arg(
        long,
        value_name = "PATH",
        env = "SARIF_TO_SLACK_SARIF_PATH",
        help = "SARIF file, or directory containing SARIF files."
    )]
    sarif_path: PathBuf,
    #[arg(
        long,
        env = "SARIF_TO_SLACK_RECURSIVE",
        help = "Descend into sub-directories of a directory input."
    )]
    recursive: bool,
    #[arg(
        long,
        value_name = "EXT",
        env = "SARIF_TO_SLACK_EXTENSION",
        default_value = "sarif"
    )]
    extension: String,
}

/// Content and delivery of the message.
#[derive(Args, Debug, Clone)]
struct MessageArgs {
    #[arg(
        long,
        value_name = "URL",
        env = "SARIF_TO_SLACK_WEBHOOK_URL",
        hide_env_values = true,
        help = "Slack incoming webhook URL. Without it the summary is printed to stdout."
    )]
    webhook_url: Option<String>,
    #[arg(long, value_name = "NAME", env = "SARIF_TO_SLACK_USERNAME")]
    username: Option<String>,
    #[arg(long, value_name = "URL", env = "SARIF_TO_SLACK_ICON_URL")]
    icon_url: Option<String>,
    #[arg(long, value_name = "TEXT", env = "SARIF_TO_SLACK_HEADER")]
    header: Option<String>,
    #[arg(
        long,
        env = "SARIF_TO_SLACK_NO_HEADER",
        conflicts_with = "header",
        help = "Leave the header block out."
    )]
    no_header: bool,
    #[arg(long, value_name = "TEXT", env = "SARIF_TO_SLACK_FOOTER")]
    footer: Option<String>,
    #[arg(
        long,
        value_enum,
        value_name = "TYPE",
        env = "SARIF_TO_SLACK_FOOTER_TYPE",
        default_value_t = FooterType::PlainText
    )]
    footer_type: FooterType,
    #[arg(
        long,
        env = "SARIF_TO_SLACK_NO_FOOTER",
        conflicts_with = "footer",
        help = "Leave the footer block out."
    )]
    no_footer: bool,
    #[arg(
        long,
        value_name = "NAME",
        env = "SARIF_TO_SLACK_ACTOR",
        help = "Actor shown in the message. Defaults to GITHUB_ACTOR."
    )]
    actor: Option<String>,
    #[arg(
        long,
        env = "SARIF_TO_SLACK_NO_ACTOR",
        conflicts_with = "actor",
        help = "Leave the actor block out."
    )]
    no_actor: bool,
    #[arg(
        long,
        env = "SARIF_TO_SLACK_INCLUDE_RUN",
        help = "Link the GitHub Actions run (GITHUB_SERVER_URL, GITHUB_REPOSITORY, GITHUB_RUN_ID)."
    )]
    include_run: bool,
    #[arg(
        long,
        value_name = "SELECTOR",
        env = "SARIF_TO_SLACK_REPRESENTATION",
        default_value_t = RepresentationType::default()
    )]
    representation: RepresentationType,
    #[arg(
        long,
        value_name = "CONDITION",
        env = "SARIF_TO_SLACK_SEND_IF",
        default_value_t = SendIf::default()
    )]
    send_if: SendIf,
}

/// Message color policy. Accepts hex colors or success/failure/cancelled/skipped.
#[derive(Args, Debug, Clone, Default)]
struct ColorArgs {
    #[arg(long, value_name = "COLOR", env = "SARIF_TO_SLACK_COLOR_DEFAULT")]
    color_default: Option<Color>,
    #[arg(long, value_name = "COLOR", env = "SARIF_TO_SLACK_COLOR_EMPTY")]
    color_empty: Option<Color>,
    #[arg(long, value_name = "COLOR", env = "SARIF_TO_SLACK_COLOR_SEVERITY_CRITICAL")]
    color_severity_critical: Option<Color>,
    #[arg(long, value_name = "COLOR", env = "SARIF_TO_SLACK_COLOR_SEVERITY_HIGH")]
    color_severity_high: Option<Color>,
    #[arg(long, value_name = "COLOR", env = "SARIF_TO_SLACK_COLOR_SEVERITY_MEDIUM")]
    color_severity_medium: Option<Color>,
    #[arg(long, value_name = "COLOR", env = "SARIF_TO_SLACK_COLOR_SEVERITY_LOW")]
    color_severity_low: Option<Color>,
    #[arg(long, value_name = "COLOR", env = "SARIF_TO_SLACK_COLOR_SEVERITY_NONE")]
    color_severity_none: Option<Color>,
    #[arg(long, value_name = "COLOR", env = "SARIF_TO_SLACK_COLOR_SEVERITY_UNKNOWN")]
    color_severity_unknown: Option<Color>,
    #[arg(long, value_name = "COLOR", env = "SARIF_TO_SLACK_COLOR_LEVEL_ERROR")]
    color_level_error: Option<Color>,
    #[arg(long, value_name = "COLOR", env = "SARIF_TO_SLACK_COLOR_LEVEL_WARNING")]
    color_level_warning: Option<Color>,
    #[arg(long, value_name = "COLOR", env = "SARIF_TO_SLACK_COLOR_LEVEL_NOTE")]
    color_level_note: Option<Color>,
    #[arg(long, value_name = "COLOR", env = "SARIF_TO_SLACK_COLOR_LEVEL_NONE")]
    color_level_none: Option<Color>,
    #[arg(long, value_name = "COLOR", env = "SARIF_TO_SLACK_COLOR_LEVEL_UNKNOWN")]
    color_level_unknown: Option<Color>,
}

impl ColorArgs {
    fn policy(&self) -> ColorPolicy {
        let severity = SeverityColors {
            critical: self.color_severity_critical.clone(),
            high: self.color_severity_high.clone(),
            medium: self.color_severity_medium.clone(),
            low: self.color_severity_low.clone(),
            none: self.color_severity_none.clone(),
            unknown: self.color_severity_unknown.clone(),
        };
        let level = LevelColors {
            error: self.color_level_error.clone(),
            warning: self.color_level_warning.clone(),
            note: self.color_level_note.clone(),
            none: self.color_level_none.clone(),
            unknown: self.color_level_unknown.clone(),
        };
        let any_severity = [
            &severity.critical,
            &severity.high,
            &severity.medium,
            &severity.low,
            &severity.none,
            &severity.unknown,
        ]
        .iter()
        .any(|color| color.is_some());
        let any_level = [
            &level.error,
            &level.warning,
            &level.note,
            &level.none,
            &level.unknown,
        ]
        .iter()
        .any(|color| color.is_some());
        ColorPolicy {
            default: self.color_default.clone(),
            empty: self.color_empty.clone(),
            by_severity: any_severity.then_some(severity),
            by_level: any_level.then_some(level),
        }
    }
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err:?}");
            std::process::ExitCode::from(1)
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    init_logging(cli.log_level.as_deref());
    info!(
        "{} {} (log filter from --log-level or {LOG_ENV})",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );

    let files = list_sarif_files(
        &cli.input.sarif_path,
        cli.input.recursive,
        &cli.input.extension,
    )
    .with_context(|| format!("resolve SARIF inputs at {}", cli.input.sarif_path.display()))?;
    let model = with_span("model", || Model::build(&files)).context("build SARIF model")?;

    let send_if = cli.message.send_if;
    if !send_if.is_satisfied(&model.findings) {
        info!("{}", send_if.skip_reason());
        return Ok(());
    }

    let text = with_span("representation", || {
        Representation::new(&model, cli.message.representation).compose()
    });
    let color = with_span("color", || identify_color(&model.findings, &cli.colors.policy()));

    let Some(webhook_url) = cli.message.webhook_url.clone() else {
        info!("no webhook URL configured, printing the summary");
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{text}").context("write summary to stdout")?;
        return Ok(());
    };
    let message = build_message(&cli.message, webhook_url, text).with_color(color);
    let body = with_span("send", || message.send())?;
    info!("Slack responded: {body}");
    Ok(())
}

fn build_message(args: &MessageArgs, webhook_url: String, text: String) -> SlackMessage {
    let mut message = SlackMessage::new(webhook_url, text)
        .with_username(args.username.clone())
        .with_icon_url(args.icon_url.clone());
    if !args.no_header {
        message = message.with_header(args.header.clone());
    }
    if !args.no_footer {
        message = message.with_footer(args.footer.clone(), args.footer_type);
    }
    if !args.no_actor {
        message = message.with_actor(args.actor.clone());
    }
    if args.include_run {
        message = message.with_run(CiRun::from_env());
    }
    message
}
