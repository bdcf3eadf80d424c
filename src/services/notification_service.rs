// src/services/notification_service.rs

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use validator::ValidateEmail;

use crate::{
    common::error::AppError,
    db::NotificationRepository,
    models::notification::{FlagTarget, NotificationJob},
    services::mailer::Mailer,
};

// Estado das flags de idempotência. Implementado pelo repositório real e,
// nos testes, por um mapa em memória.
#[async_trait]
pub trait FlagStore: Send + Sync {
    /// `Some(false)` = pendente; `Some(true)` = já enviado; `None` = registro sumiu.
    async fn flag_state(&self, target: &FlagTarget) -> Result<Option<bool>, AppError>;

    /// Vira a flag para true somente se ainda estiver false.
    async fn mark_sent(&self, target: &FlagTarget) -> Result<bool, AppError>;
}

#[async_trait]
impl FlagStore for NotificationRepository {
    async fn flag_state(&self, target: &FlagTarget) -> Result<Option<bool>, AppError> {
        NotificationRepository::flag_state(self, target).await
    }

    async fn mark_sent(&self, target: &FlagTarget) -> Result<bool, AppError> {
        NotificationRepository::mark_sent(self, target).await
    }
}

// O que a varredura precisa saber fazer com um candidato.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_once(&self, job: &NotificationJob) -> Result<bool, AppError>;
}

#[derive(Clone)]
pub struct NotificationService<S: FlagStore> {
    flags: S,
    mailer: Arc<dyn Mailer>,
}

impl<S: FlagStore> NotificationService<S> {
    pub fn new(flags: S, mailer: Arc<dyn Mailer>) -> Self {
        Self { flags, mailer }
    }

    /// Dispara o e-mail do job no máximo uma vez por (registro, flag).
    ///
    /// Retorna `Ok(true)` apenas quando o e-mail saiu e a flag foi marcada.
    /// Qualquer motivo de pulo (mailer desabilitado, destinatário inválido,
    /// flag já marcada, falha de envio) vira `Ok(false)` sem efeito colateral;
    /// só erro de banco ao consultar/marcar a flag é propagado.
    pub async fn notify_once(&self, job: &NotificationJob) -> Result<bool, AppError> {
        if !self.mailer.is_enabled() {
            tracing::debug!("E-mail desabilitado; pulando envio para {}", job.recipient);
            return Ok(false);
        }

        if !job.recipient.validate_email() {
            tracing::warn!("Destinatário inválido '{}'; envio pulado", job.recipient);
            return Ok(false);
        }

        if let Some(target) = &job.target {
            match self.flags.flag_state(target).await? {
                Some(false) => {}
                Some(true) => return Ok(false),
                None => {
                    tracing::warn!("Registro de {target:?} não existe mais; envio pulado");
                    return Ok(false);
                }
            }
        }

        if let Err(e) = self
            .mailer
            .send(&job.recipient, &job.subject, &job.html_body)
            .await
        {
            // A flag fica como estava: elegível para nova tentativa futura.
            tracing::warn!("Falha ao enviar e-mail para {}: {e}", job.recipient);
            return Ok(false);
        }

        if let Some(target) = &job.target {
            // Se a marcação condicional não pegou, alguém marcou (ou apagou o
            // registro) entre a leitura e o envio: o e-mail saiu sem rastro.
            if !self.flags.mark_sent(target).await? {
                tracing::warn!(
                    "E-mail para {} enviado, mas a flag de {target:?} não pôde ser marcada",
                    job.recipient
                );
            }
        }

        Ok(true)
    }
}

#[async_trait]
impl<S: FlagStore> Notifier for NotificationService<S> {
    async fn notify_once(&self, job: &NotificationJob) -> Result<bool, AppError> {
        NotificationService::notify_once(self, job).await
    }
}

/// Sobe o worker que drena a fila de notificações. O caminho HTTP apenas
/// enfileira, então um SMTP lento nunca segura a resposta da venda.
pub fn spawn_notification_worker<S>(service: NotificationService<S>) -> mpsc::Sender<NotificationJob>
where
    S: FlagStore + 'static,
{
    let (tx, mut rx) = mpsc::channel::<NotificationJob>(256);

    tokio::spawn(async move {
        while let Some(job) = rx.recv().await {
            match service.notify_once(&job).await {
                Ok(true) => tracing::info!("E-mail enviado para {}", job.recipient),
                Ok(false) => tracing::debug!("Envio pulado para {}", job.recipient),
                Err(e) => tracing::warn!("Erro ao processar notificação: {e}"),
            }
        }
    });

    tx
}

/// Enfileira sem bloquear; fila cheia ou worker morto só gera log.
pub fn enqueue(queue: &mpsc::Sender<NotificationJob>, job: NotificationJob) {
    if let Err(e) = queue.try_send(job) {
        tracing::warn!("Fila de notificações indisponível: {e}");
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        sync::{
            atomic::{AtomicUsize, Ordering},
            Mutex,
        },
    };

    use super::*;
    use crate::common::error::NotificationError;

    struct MemFlags {
        states: Mutex<HashMap<FlagTarget, bool>>,
    }

    impl MemFlags {
        fn with(target: FlagTarget, sent: bool) -> Self {
            Self {
                states: Mutex::new(HashMap::from([(target, sent)])),
            }
        }
    }

    #[async_trait]
    impl FlagStore for MemFlags {
        async fn flag_state(&self, target: &FlagTarget) -> Result<Option<bool>, AppError> {
            Ok(self.states.lock().unwrap().get(target).copied())
        }

        async fn mark_sent(&self, target: &FlagTarget) -> Result<bool, AppError> {
            let mut states = self.states.lock().unwrap();
            match states.get_mut(target) {
                Some(state) if !*state => {
                    *state = true;
                    Ok(true)
                }
                _ => Ok(false),
            }
        }
    }

    #[derive(Default)]
    struct CountingMailer {
        sends: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl Mailer for CountingMailer {
        async fn send(&self, _: &str, _: &str, _: &str) -> Result<(), NotificationError> {
            self.sends.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(NotificationError::InvalidRecipient("falha simulada".into()));
            }
            Ok(())
        }
    }

    fn job(target: Option<FlagTarget>, recipient: &str) -> NotificationJob {
        NotificationJob {
            target,
            recipient: recipient.to_string(),
            subject: "Teste".to_string(),
            html_body: "<p>corpo</p>".to_string(),
        }
    }

    #[tokio::test]
    async fn sends_exactly_once_per_flag() {
        let target = FlagTarget::SaleCompletion(1);
        let mailer = Arc::new(CountingMailer::default());
        let service = NotificationService::new(MemFlags::with(target, false), mailer.clone());

        let job = job(Some(target), "cliente@exemplo.com");
        assert!(service.notify_once(&job).await.unwrap());
        // Segunda chamada observa a flag já marcada: no-op.
        assert!(!service.notify_once(&job).await.unwrap());
        assert_eq!(mailer.sends.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn invalid_recipient_is_skipped_without_side_effects() {
        let target = FlagTarget::InstallmentPreDue(7);
        let mailer = Arc::new(CountingMailer::default());
        let flags = MemFlags::with(target, false);
        let service = NotificationService::new(flags, mailer.clone());

        assert!(!service.notify_once(&job(Some(target), "")).await.unwrap());
        assert!(!service
            .notify_once(&job(Some(target), "sem-arroba"))
            .await
            .unwrap());
        assert_eq!(mailer.sends.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn send_failure_leaves_flag_unset() {
        let target = FlagTarget::InstallmentDueDay(3);
        let mailer = Arc::new(CountingMailer {
            fail: true,
            ..Default::default()
        });
        let service = NotificationService::new(MemFlags::with(target, false), mailer);

        let job = job(Some(target), "cliente@exemplo.com");
        assert!(!service.notify_once(&job).await.unwrap());
        // Continua pendente: uma próxima tentativa ainda pode enviar.
        assert_eq!(
            service.flags.flag_state(&target).await.unwrap(),
            Some(false)
        );
    }

    #[tokio::test]
    async fn missing_record_is_skipped() {
        let mailer = Arc::new(CountingMailer::default());
        let service = NotificationService::new(
            MemFlags {
                states: Mutex::new(HashMap::new()),
            },
            mailer.clone(),
        );

        let job = job(Some(FlagTarget::SalePreDue(99)), "cliente@exemplo.com");
        assert!(!service.notify_once(&job).await.unwrap());
        assert_eq!(mailer.sends.load(Ordering::SeqCst), 0);
    }

    // Pendente na leitura, mas a marcação condicional nunca pega, como se
    // outro processo tivesse virado a flag entre a leitura e o envio.
    struct RacyFlags;

    #[async_trait]
    impl FlagStore for RacyFlags {
        async fn flag_state(&self, _: &FlagTarget) -> Result<Option<bool>, AppError> {
            Ok(Some(false))
        }

        async fn mark_sent(&self, _: &FlagTarget) -> Result<bool, AppError> {
            Ok(false)
        }
    }

    #[tokio::test]
    async fn lost_mark_race_still_reports_the_send() {
        let mailer = Arc::new(CountingMailer::default());
        let service = NotificationService::new(RacyFlags, mailer.clone());

        let job = job(Some(FlagTarget::SaleCompletion(5)), "cliente@exemplo.com");
        assert!(service.notify_once(&job).await.unwrap());
        assert_eq!(mailer.sends.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn flagless_job_always_sends() {
        let mailer = Arc::new(CountingMailer::default());
        let service = NotificationService::new(
            MemFlags {
                states: Mutex::new(HashMap::new()),
            },
            mailer.clone(),
        );

        let job = job(None, "lead@exemplo.com");
        assert!(service.notify_once(&job).await.unwrap());
        assert!(service.notify_once(&job).await.unwrap());
        assert_eq!(mailer.sends.load(Ordering::SeqCst), 2);
    }
}
