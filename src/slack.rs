use std::env;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::color::Color;

const DEFAULT_HEADER: &str = "SARIF Summary";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// How the footer text is rendered by Slack.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum FooterType {
    #[default]
    PlainText,
    Markdown,
}

impl FooterType {
    fn block_type(self) -> &'static str {
        match self {
            FooterType::PlainText => "plain_text",
            FooterType::Markdown => "mrkdwn",
        }
    }
}

/// Link to the CI run that produced the message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct CiRun {
    url: String,
    id: String,
}

impl CiRun {
    pub(crate) fn from_vars(server_url: &str, repository: &str, run_id: &str) -> Self {
        Self {
            url: format!(
                "{}/{repository}/actions/runs/{run_id}",
                server_url.trim_end_matches('/')
            ),
            id: run_id.to_string(),
        }
    }

    /// Reads the GitHub Actions environment. `None` unless every variable is set.
    pub(crate) fn from_env() -> Option<Self> {
        let var = |name: &str| env::var(name).ok().filter(|value: &String| !value.is_empty());
        Some(Self::from_vars(
            &var("GITHUB_SERVER_URL")?,
            &var("GITHUB_REPOSITORY")?,
            &var("GITHUB_RUN_ID")?,
        ))
    }
}

/// Incoming-webhook message carrying a rendered summary.
#[derive(Clone, Debug)]
pub(crate) struct SlackMessage {
    webhook_url: String,
    text: String,
    username: Option<String>,
    icon_url: Option<String>,
    color: Option<Color>,
    header: Option<String>,
    footer: Option<(String, FooterType)>,
    actor: Option<String>,
    run: Option<CiRun>,
}

impl SlackMessage {
    pub(crate) fn new(webhook_url: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            webhook_url: webhook_url.into(),
            text: text.into(),
            username: None,
            icon_url: None,
            color: None,
            header: None,
            footer: None,
            actor: None,
            run: None,
        }
    }

    pub(crate) fn with_username(mut self, username: Option<String>) -> Self {
        self.username = username;
        self
    }

    pub(crate) fn with_icon_url(mut self, icon_url: Option<String>) -> Self {
        self.icon_url = icon_url;
        self
    }

    pub(crate) fn with_color(mut self, color: Option<Color>) -> Self {
        self.color = color;
        self
    }

    pub(crate) fn with_header(mut self, header: Option<String>) -> Self {
        self.header = Some(header.unwrap_or_else(|| DEFAULT_HEADER.to_string()));
        self
    }

    pub(crate) fn with_footer(mut self, footer: Option<String>, footer_type: FooterType) -> Self {
        self.footer = Some(match footer {
            Some(text) => (text, footer_type),
            None => (
                format!(
                    "Generated by {} {}",
                    env!("CARGO_PKG_NAME"),
                    env!("CARGO_PKG_VERSION")
                ),
                FooterType::PlainText,
            ),
        });
        self
    }

    /// Falls back to `GITHUB_ACTOR`; without either the block is left out.
    pub(crate) fn with_actor(mut self, actor: Option<String>) -> Self {
        self.actor = actor.or_else(|| env::var("GITHUB_ACTOR").ok().filter(|a| !a.is_empty()));
        if self.actor.is_none() {
            debug!("actor is neither given nor set in GITHUB_ACTOR");
        }
        self
    }

    pub(crate) fn with_run(mut self, run: Option<CiRun>) -> Self {
        if run.is_none() {
            debug!("CI run link is not available");
        }
        self.run = run;
        self
    }

    pub(crate) fn payload(&self) -> Value {
        let mut blocks = Vec::new();
        if let Some(header) = &self.header {
            blocks.push(json!({
                "type": "header",
                "text": { "type": "plain_text", "text": header }
            }));
        }
        if let Some(actor) = &self.actor {
            blocks.push(context_block("mrkdwn", &format!("Triggered by *{actor}*")));
        }
        blocks.push(json!({
            "type": "section",
            "text": { "type": "mrkdwn", "text": self.text }
        }));
        if let Some(run) = &self.run {
            blocks.push(context_block("mrkdwn", &format!("Job <{}|#{}>", run.url, run.id)));
        }
        if let Some((footer, footer_type)) = &self.footer {
            blocks.push(context_block(footer_type.block_type(), footer));
        }

        let mut attachment = json!({ "blocks": blocks });
        if let Some(color) = &self.color {
            attachment["color"] = json!(color.as_str());
        }
        let mut payload = json!({ "attachments": [attachment] });
        if let Some(username) = &self.username {
            payload["username"] = json!(username);
        }
        if let Some(icon_url) = &self.icon_url {
            payload["icon_url"] = json!(icon_url);
        }
        payload
    }

    /// Posts the message once and returns the response body.
    pub(crate) fn send(&self) -> Result<String> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("create HTTP client")?;
        let response = client
            .post(self.webhook_url.as_str())
            .json(&self.payload())
            .send()
            .context("post message to Slack webhook")?;
        let status = response.status();
        let body = response.text().context("read Slack webhook response")?;
        if !status.is_success() {
            bail!("Slack webhook responded with {status}: {body}");
        }
        info!("message sent, status {status}");
        Ok(body)
    }
}

fn context_block(text_type: &str, text: &str) -> Value {
    json!({
        "type": "context",
        "elements": [{ "type": text_type, "text": text }]
    })
}
