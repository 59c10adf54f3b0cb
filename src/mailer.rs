// SPDX-License-Identifier: MIT
//! SMTP delivery for the generated report.
//!
//! One plain-text message per run, all recipients on the same envelope.
//! Implicit TLS on port 465 by default; STARTTLS when `SMTP_USE_SSL=false`.

use anyhow::{Context as _, Result};
use chrono::NaiveDate;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::info;

use crate::config::SmtpConfig;

pub struct EmailSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: String,
}

/// Subject line for a day's report.
pub fn report_subject(date: NaiveDate) -> String {
    format!("Щоденний звіт - {}", date.format("%Y-%m-%d"))
}

impl EmailSender {
    pub fn new(cfg: &SmtpConfig) -> Result<Self> {
        let credentials = Credentials::new(cfg.user.clone(), cfg.password.clone());

        let builder = if cfg.use_ssl {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&cfg.server)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&cfg.server)
        }
        .context("invalid SMTP server address")?;

        Ok(Self {
            transport: builder
                .port(cfg.port)
                .credentials(credentials)
                .build(),
            sender: cfg.sender.clone(),
        })
    }

    /// Send a plain-text email to every recipient on one message.
    pub async fn send(&self, recipients: &[String], subject: &str, body: &str) -> Result<()> {
        let mut builder = Message::builder()
            .from(self.sender.parse().context("invalid sender address")?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN);

        for recipient in recipients {
            builder = builder.to(recipient
                .parse()
                .with_context(|| format!("invalid recipient address: {recipient}"))?);
        }

        let message = builder
            .body(body.to_string())
            .context("failed to build email message")?;

        self.transport
            .send(message)
            .await
            .context("smtp send failed")?;

        info!(recipients = recipients.len(), "email sent successfully");
        Ok(())
    }

    /// Send the daily report with the standard subject line.
    pub async fn send_report(
        &self,
        recipients: &[String],
        report: &str,
        date: NaiveDate,
    ) -> Result<()> {
        self.send(recipients, &report_subject(date), report).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_carries_the_report_date() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 28).unwrap();
        assert_eq!(report_subject(date), "Щоденний звіт - 2026-08-28");
    }

    #[test]
    fn transport_builds_for_both_tls_modes() {
        let mut cfg = SmtpConfig {
            server: "smtp.gmail.com".to_string(),
            port: 465,
            user: "reports@acme.test".to_string(),
            password: "secret".to_string(),
            sender: "reports@acme.test".to_string(),
            use_ssl: true,
        };
        assert!(EmailSender::new(&cfg).is_ok());

        cfg.use_ssl = false;
        cfg.port = 587;
        assert!(EmailSender::new(&cfg).is_ok());
    }
}
