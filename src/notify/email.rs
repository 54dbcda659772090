// src/notify/email.rs
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use lettre::message::{Mailbox, Message, MultiPart};
use lettre::transport::smtp::{authentication::Credentials, AsyncSmtpTransport};
use lettre::{Address, AsyncTransport, Tokio1Executor};

use super::{Notifier, Outgoing};
use crate::config::ChannelSettings;
use crate::html::{render_html_report, render_plain_text, subject_line};
use crate::render::Channel;

const SENDER_NAME: &str = "Trend Digest";

/// Where and how to reach the SMTP server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpTarget {
    pub host: String,
    pub port: u16,
    /// SMTPS from the first byte (port 465); STARTTLS otherwise.
    pub implicit_tls: bool,
}

/// Presets by sender domain: `(domain, host, port)`.
const PRESETS: &[(&str, &str, u16)] = &[
    ("gmail.com", "smtp.gmail.com", 587),
    ("qq.com", "smtp.qq.com", 465),
    ("outlook.com", "smtp-mail.outlook.com", 587),
    ("hotmail.com", "smtp-mail.outlook.com", 587),
    ("live.com", "smtp-mail.outlook.com", 587),
    ("163.com", "smtp.163.com", 465),
    ("126.com", "smtp.126.com", 465),
    ("sina.com", "smtp.sina.com", 465),
    ("sohu.com", "smtp.sohu.com", 465),
];

/// Explicit server and port win; else a preset for the sender's domain;
/// else `smtp.<domain>:587`.
pub fn resolve_smtp(from: &str, server: Option<&str>, port: Option<u16>) -> SmtpTarget {
    if let (Some(host), Some(port)) = (server.filter(|s| !s.is_empty()), port) {
        return SmtpTarget {
            host: host.to_string(),
            port,
            implicit_tls: port == 465,
        };
    }
    let domain = from
        .rsplit('@')
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    match PRESETS.iter().find(|(d, _, _)| *d == domain) {
        Some((_, host, port)) => SmtpTarget {
            host: host.to_string(),
            port: *port,
            implicit_tls: *port == 465,
        },
        None => SmtpTarget {
            host: format!("smtp.{domain}"),
            port: 587,
            implicit_tls: false,
        },
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailSettings {
    pub from: String,
    pub password: String,
    /// Comma-separated in configuration.
    pub to: Vec<String>,
    pub smtp_server: Option<String>,
    pub smtp_port: Option<u16>,
}

impl EmailSettings {
    /// `None` unless sender, password and at least one recipient are set.
    pub fn from_channels(c: &ChannelSettings) -> Option<Self> {
        let from = c.email_from.clone()?;
        let password = c.email_password.clone()?;
        let to: Vec<String> = c
            .email_to
            .as_deref()?
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        if to.is_empty() {
            return None;
        }
        Some(Self {
            from,
            password,
            to,
            smtp_server: c.email_smtp_server.clone(),
            smtp_port: c.email_smtp_port,
        })
    }
}

/// Sends the HTML report (with a plain-text alternative) over SMTP.
pub struct EmailNotifier {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Vec<Mailbox>,
}

impl EmailNotifier {
    pub fn new(settings: &EmailSettings) -> Result<Self> {
        let target = resolve_smtp(
            &settings.from,
            settings.smtp_server.as_deref(),
            settings.smtp_port,
        );
        let builder = if target.implicit_tls {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&target.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&target.host)
        }
        .with_context(|| format!("invalid SMTP host {}", target.host))?;
        let mailer = builder
            .port(target.port)
            .credentials(Credentials::new(
                settings.from.clone(),
                settings.password.clone(),
            ))
            .timeout(Some(Duration::from_secs(30)))
            .build();
        tracing::debug!(target: "notify", host = %target.host, port = target.port, implicit_tls = target.implicit_tls, "smtp configured");

        let from = Mailbox::new(Some(SENDER_NAME.to_string()), parse_address(&settings.from)?);
        let to = settings
            .to
            .iter()
            .map(|a| parse_address(a).map(|addr| Mailbox::new(None, addr)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { mailer, from, to })
    }

    pub fn build_message(&self, out: &Outgoing<'_>) -> Result<Message> {
        build_message(&self.from, &self.to, out)
    }
}

fn parse_address(s: &str) -> Result<Address> {
    s.trim()
        .parse::<Address>()
        .map_err(|e| anyhow!("invalid e-mail address {s:?}: {e}"))
}

fn build_message(from: &Mailbox, to: &[Mailbox], out: &Outgoing<'_>) -> Result<Message> {
    let html = render_html_report(out.report, out.ctx, out.is_summary);
    let text = render_plain_text(out.report, out.ctx, out.is_summary);
    let mut builder = Message::builder()
        .from(from.clone())
        .subject(subject_line(out.ctx.mode, out.is_summary, out.ctx));
    for m in to {
        builder = builder.to(m.clone());
    }
    builder
        .multipart(MultiPart::alternative_plain_html(text, html))
        .context("build email")
}

#[async_trait]
impl Notifier for EmailNotifier {
    fn channel(&self) -> Channel {
        Channel::Email
    }

    async fn deliver(&self, out: &Outgoing<'_>) -> Result<()> {
        let msg = self.build_message(out)?;
        self.mailer.send(msg).await.context("send email")?;
        Ok(())
    }
}
