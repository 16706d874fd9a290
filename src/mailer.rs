use anyhow::Context;
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::info;

use crate::config::SmtpConfig;

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, text: &str) -> anyhow::Result<()>;
}

/// Outbound mail over SMTP. Built once at startup from `SmtpConfig`.
#[derive(Debug)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> anyhow::Result<Self> {
        // Port 465 means implicit TLS; everything else negotiates STARTTLS.
        let builder = if config.port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
        }
        .context("smtp transport")?;

        let transport = builder
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .port(config.port)
            .build();

        let from = config
            .from
            .parse::<Mailbox>()
            .context("parse smtp from address")?;

        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, text: &str) -> anyhow::Result<()> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(to.parse().context("parse recipient address")?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(text.to_string())
            .context("build email")?;

        let reachable = self
            .transport
            .test_connection()
            .await
            .context("smtp connect")?;
        if !reachable {
            anyhow::bail!("smtp relay refused connection");
        }

        self.transport.send(message).await.context("smtp send")?;
        info!(%to, "email sent");
        Ok(())
    }
}

/// Keeps sent mail in memory instead of delivering it. Test backend.
#[derive(Default)]
pub struct RecordingMailer {
    sent: std::sync::Mutex<Vec<SentEmail>>,
}

impl RecordingMailer {
    pub fn outbox(&self) -> Vec<SentEmail> {
        self.sent.lock().expect("mailer lock").clone()
    }
}

#[derive(Debug, Clone)]
pub struct SentEmail {
    pub to: String,
    pub subject: String,
    pub text: String,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, to: &str, subject: &str, text: &str) -> anyhow::Result<()> {
        self.sent.lock().expect("mailer lock").push(SentEmail {
            to: to.to_string(),
            subject: subject.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }
}
