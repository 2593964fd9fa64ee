//! Outbound email. Sends are side effects: callers use [`spawn_send`] and never
//! fail a request because a message could not be delivered.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::{MailBackend, MailConfig};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub text: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: Email) -> anyhow::Result<()>;
}

/// Writes messages to the log instead of delivering them.
#[derive(Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: Email) -> anyhow::Result<()> {
        info!(to = %email.to, subject = %email.subject, body = %email.text, "Email (log backend)");
        Ok(())
    }
}

/// Delivers through a Resend-style JSON API: `POST {from, to, subject, text}`
/// with a bearer key.
pub struct HttpMailer {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    from: String,
}

#[derive(Serialize)]
struct SendRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    text: &'a str,
}

impl HttpMailer {
    pub fn new(config: &MailConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            from: config.from.clone(),
        })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, email: Email) -> anyhow::Result<()> {
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&SendRequest {
                from: &self.from,
                to: [&email.to],
                subject: &email.subject,
                text: &email.text,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("mail API returned {status}: {body}");
        }
        Ok(())
    }
}

pub fn build_mailer(config: &MailConfig) -> anyhow::Result<Arc<dyn Mailer>> {
    Ok(match config.backend {
        MailBackend::Log => Arc::new(LogMailer),
        MailBackend::Http => Arc::new(HttpMailer::new(config)?),
    })
}

/// Send in the background; delivery failures are only logged.
pub fn spawn_send(mailer: Arc<dyn Mailer>, email: Email) {
    tokio::spawn(async move {
        let to = email.to.clone();
        let subject = email.subject.clone();
        if let Err(e) = mailer.send(email).await {
            warn!(to = %to, subject = %subject, error = %e, "Failed to send email");
        }
    });
}

// Message bodies. Presentation beyond plain text is left to the mail provider.

pub fn activation(to: &str, name: &str, link: &str) -> Email {
    Email {
        to: to.to_string(),
        subject: "Activate your Sandbox account".into(),
        text: format!("Hi {name},\n\nConfirm your email address to activate your account:\n{link}\n"),
    }
}

pub fn registration_received(to: &str, team_name: &str, competition: &str, amount_due: i64) -> Email {
    Email {
        to: to.to_string(),
        subject: format!("{competition} registration received"),
        text: format!(
            "Team {team_name} is registered for {competition}.\n\
             Amount due: Rp{amount_due}. Upload your payment proof to complete verification.\n"
        ),
    }
}

pub fn registration_approved(to: &str, team_name: &str, competition: &str) -> Email {
    Email {
        to: to.to_string(),
        subject: format!("{competition} registration approved"),
        text: format!("Team {team_name} has been verified for {competition}. Good luck!\n"),
    }
}

pub fn registration_rejected(to: &str, team_name: &str, competition: &str, reason: &str) -> Email {
    Email {
        to: to.to_string(),
        subject: format!("{competition} registration rejected"),
        text: format!("The registration of team {team_name} for {competition} was rejected.\nReason: {reason}\n"),
    }
}

pub fn ticket_issued(to: &str, event_title: &str, ticket_code: &str) -> Email {
    Email {
        to: to.to_string(),
        subject: format!("Your ticket for {event_title}"),
        text: format!("Your ticket code is {ticket_code}. Show it at the entrance to check in.\n"),
    }
}

pub fn ticket_rejected(to: &str, event_title: &str) -> Email {
    Email {
        to: to.to_string(),
        subject: format!("Ticket request for {event_title} rejected"),
        text: "Your payment could not be verified. Contact the committee if you think this is a mistake.\n"
            .into(),
    }
}
