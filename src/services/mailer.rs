// src/services/mailer.rs

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use crate::common::error::NotificationError;

// A capacidade de envio de e-mail. O resto do sistema só conhece este trait;
// os testes usam um dublê que registra os envios.
#[async_trait]
pub trait Mailer: Send + Sync {
    fn is_enabled(&self) -> bool {
        true
    }

    async fn send(&self, to: &str, subject: &str, html_body: &str)
        -> Result<(), NotificationError>;
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// `port = None` usa a porta padrão do relay (465, TLS implícito).
    /// Qualquer outra porta (587, 25, ...) negocia STARTTLS; TLS implícito
    /// nessas portas travaria na conexão.
    pub fn new(
        host: &str,
        port: Option<u16>,
        username: &str,
        password: &str,
        from_name: &str,
    ) -> anyhow::Result<Self> {
        let builder = match port {
            None | Some(465) => AsyncSmtpTransport::<Tokio1Executor>::relay(host)?,
            Some(port) => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)?.port(port),
        };
        let builder =
            builder.credentials(Credentials::new(username.to_string(), password.to_string()));

        let from: Mailbox = format!("\"{from_name}\" <{username}>")
            .parse()
            .map_err(|e| anyhow::anyhow!("Remetente inválido '{username}': {e}"))?;

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(
        &self,
        to: &str,
        subject: &str,
        html_body: &str,
    ) -> Result<(), NotificationError> {
        let to: Mailbox = to
            .parse()
            .map_err(|_| NotificationError::InvalidRecipient(to.to_string()))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html_body.to_string())?;

        self.transport.send(message).await?;
        Ok(())
    }
}

// Usado quando nenhuma credencial SMTP foi configurada: os envios são
// simplesmente pulados e as flags de idempotência ficam intactas.
pub struct DisabledMailer;

#[async_trait]
impl Mailer for DisabledMailer {
    fn is_enabled(&self) -> bool {
        false
    }

    async fn send(
        &self,
        to: &str,
        _subject: &str,
        _html_body: &str,
    ) -> Result<(), NotificationError> {
        tracing::warn!("Envio para {to} ignorado: e-mail não configurado");
        Ok(())
    }
}
