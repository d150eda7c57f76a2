use crate::core::archive::{collect_images, zip_images};
use crate::domain::environment::HostEnvironment;
use crate::domain::model::EmailSettings;
use crate::domain::ports::{MailTransport, SmtpLogin};
use crate::utils::error::{PipelineError, Result};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::path::PathBuf;

/// 以 SMTPS（隱式 TLS）送信，每次呼叫建立一條新連線
#[derive(Debug, Clone, Copy, Default)]
pub struct SmtpMailer;

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn send(&self, login: &SmtpLogin, message: Message) -> Result<()> {
        tracing::debug!("Connecting to {}:{} as {}", login.host, login.port, login.username);

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&login.host)?
            .port(login.port)
            .credentials(Credentials::new(
                login.username.clone(),
                login.password.clone(),
            ))
            .build();

        let response = transport.send(message).await?;
        tracing::debug!("SMTP server replied {}", response.code());
        Ok(())
    }
}

/// Resolve the SMTP credential: explicit password first, then `password_env`
/// from the host environment. Empty values count as missing.
pub fn resolve_credential(settings: &EmailSettings, host: &HostEnvironment) -> Result<String> {
    settings
        .password
        .as_deref()
        .filter(|pw| !pw.is_empty())
        .or_else(|| host.get(&settings.password_env).filter(|pw| !pw.is_empty()))
        .map(str::to_string)
        .ok_or_else(|| {
            PipelineError::config(format!(
                "Set `{}` in the environment or pass `--password`.",
                settings.password_env
            ))
        })
}

fn parse_mailbox(field: &str, address: &str) -> Result<Mailbox> {
    address
        .parse::<Mailbox>()
        .map_err(|e| PipelineError::InvalidConfigValueError {
            field: field.to_string(),
            value: address.to_string(),
            reason: e.to_string(),
        })
}

pub fn compose_message(
    sender: Mailbox,
    recipients: Vec<Mailbox>,
    settings: &EmailSettings,
    zip_bytes: Vec<u8>,
) -> Result<Message> {
    let content_type = ContentType::parse("application/zip").map_err(|e| {
        PipelineError::EmailComposeError {
            message: e.to_string(),
        }
    })?;
    let attachment = Attachment::new(settings.zip_name.clone()).body(zip_bytes, content_type);

    let mut builder = Message::builder().from(sender).subject(settings.subject.clone());
    for recipient in recipients {
        builder = builder.to(recipient);
    }

    builder
        .multipart(
            MultiPart::mixed()
                .singlepart(SinglePart::plain(settings.body.clone()))
                .singlepart(attachment),
        )
        .map_err(|e| PipelineError::EmailComposeError {
            message: e.to_string(),
        })
}

/// Bundles the rendered figures and sends them as one zip attachment.
#[derive(Debug, Clone)]
pub struct EmailDelivery {
    settings: EmailSettings,
    image_dir: PathBuf,
    host: HostEnvironment,
}

impl EmailDelivery {
    pub fn new(settings: EmailSettings, image_dir: impl Into<PathBuf>, host: HostEnvironment) -> Self {
        Self {
            settings,
            image_dir: image_dir.into(),
            host,
        }
    }

    pub fn settings(&self) -> &EmailSettings {
        &self.settings
    }

    /// 所有設定錯誤都在呼叫 transport 之前回報。回傳寄出的圖檔數量。
    pub async fn deliver<T: MailTransport + ?Sized>(&self, transport: &T) -> Result<usize> {
        let sender = self
            .settings
            .sender
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| PipelineError::MissingConfigError {
                field: "sender".to_string(),
            })?;
        if self.settings.recipients.is_empty() {
            return Err(PipelineError::MissingConfigError {
                field: "recipients".to_string(),
            });
        }

        let password = resolve_credential(&self.settings, &self.host)?;

        let from = parse_mailbox("sender", sender)?;
        let to = self
            .settings
            .recipients
            .iter()
            .map(|r| parse_mailbox("recipients", r))
            .collect::<Result<Vec<_>>>()?;

        let images = collect_images(&self.image_dir, &self.settings.image_extension)?;
        tracing::info!(
            "Sending {} images (zipped) to {} …",
            images.len(),
            self.settings.recipients.join(", ")
        );

        let zip_bytes = zip_images(&images)?;
        tracing::debug!("Archive {} is {} bytes", self.settings.zip_name, zip_bytes.len());
        let message = compose_message(from, to, &self.settings, zip_bytes)?;

        let login = SmtpLogin {
            host: self.settings.smtp_server.clone(),
            port: self.settings.port,
            username: sender.to_string(),
            password,
        };
        transport.send(&login, message).await?;

        tracing::info!("E-mail sent successfully.");
        Ok(images.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<(SmtpLogin, Vec<u8>)>>,
    }

    #[async_trait]
    impl MailTransport for RecordingTransport {
        async fn send(&self, login: &SmtpLogin, message: Message) -> Result<()> {
            self.sent
                .lock()
                .unwrap()
                .push((login.clone(), message.formatted()));
            Ok(())
        }
    }

    fn settings() -> EmailSettings {
        EmailSettings {
            sender: Some("wx@example.com".to_string()),
            recipients: vec!["ops@example.com".to_string()],
            password: Some("app-token".to_string()),
            ..EmailSettings::default()
        }
    }

    #[test]
    fn test_explicit_password_wins_over_env() {
        let host = HostEnvironment::from_pairs([("EMAIL_PASSWORD", "from-env")]);
        assert_eq!(resolve_credential(&settings(), &host).unwrap(), "app-token");

        let mut no_explicit = settings();
        no_explicit.password = None;
        assert_eq!(resolve_credential(&no_explicit, &host).unwrap(), "from-env");

        no_explicit.password = Some(String::new());
        assert_eq!(resolve_credential(&no_explicit, &host).unwrap(), "from-env");
    }

    #[test]
    fn test_custom_password_env_name() {
        let host = HostEnvironment::from_pairs([("SMTP_TOKEN", "tok")]);
        let mut s = settings();
        s.password = None;
        s.password_env = "SMTP_TOKEN".to_string();
        assert_eq!(resolve_credential(&s, &host).unwrap(), "tok");

        s.password_env = "EMAIL_PASSWORD".to_string();
        assert!(resolve_credential(&s, &host).is_err());
    }

    #[tokio::test]
    async fn test_missing_sender_fails_before_send() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.png"), b"a").unwrap();
        let mut s = settings();
        s.sender = None;

        let transport = RecordingTransport::default();
        let delivery = EmailDelivery::new(s, dir.path(), HostEnvironment::default());
        let err = delivery.deliver(&transport).await.unwrap_err();

        assert!(matches!(err, PipelineError::MissingConfigError { ref field } if field == "sender"));
        assert!(transport.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_address_is_config_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.png"), b"a").unwrap();
        let mut s = settings();
        s.recipients = vec!["not an address".to_string()];

        let transport = RecordingTransport::default();
        let delivery = EmailDelivery::new(s, dir.path(), HostEnvironment::default());
        let err = delivery.deliver(&transport).await.unwrap_err();

        assert!(matches!(err, PipelineError::InvalidConfigValueError { .. }));
        assert!(transport.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_deliver_sends_once_with_login() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("t2m_f000.png"), b"png").unwrap();

        let transport = RecordingTransport::default();
        let delivery = EmailDelivery::new(settings(), dir.path(), HostEnvironment::default());
        let count = delivery.deliver(&transport).await.unwrap();
        assert_eq!(count, 1);

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        let (login, raw) = &sent[0];
        assert_eq!(login.host, "smtp.gmail.com");
        assert_eq!(login.port, 465);
        assert_eq!(login.username, "wx@example.com");
        assert_eq!(login.password, "app-token");

        let raw = String::from_utf8_lossy(raw);
        assert!(raw.contains("Subject: GFS Forecast"));
        assert!(raw.contains("Forecast_Figures.zip"));
        assert!(raw.contains("application/zip"));
    }
}
