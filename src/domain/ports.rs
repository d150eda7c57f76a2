use crate::domain::model::{PipelineSettings, StageOutcome};
use crate::utils::error::Result;
use async_trait::async_trait;
use lettre::Message;

/// 管線中的一個階段（下載、繪圖、寄送）
#[async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> &str;

    /// 根據設定決定是否執行
    fn should_execute(&self) -> bool {
        true
    }

    async fn run(&self) -> Result<StageOutcome>;
}

/// SMTP 連線與登入資訊
#[derive(Clone)]
pub struct SmtpLogin {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for SmtpLogin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpLogin")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, login: &SmtpLogin, message: Message) -> Result<()>;
}

pub trait ConfigProvider {
    fn to_settings(&self) -> Result<PipelineSettings>;
}
