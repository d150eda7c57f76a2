use crate::domain::environment::EnvOverrides;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PYTHON: &str = "python3";
pub const DEFAULT_DATA_DIR: &str = "DATA";
pub const DEFAULT_FIG_DIR: &str = "FIGS";
pub const DEFAULT_GFS_SCRIPT: &str = "GFS.py";
pub const DEFAULT_FORECAST_SCRIPT: &str = "forecast.py";
pub const DEFAULT_MAX_AGE_HOURS: u64 = 6;

pub const DEFAULT_SUBJECT: &str = "GFS Forecast";
pub const DEFAULT_BODY: &str = "Good morning,\n\nAttached you will find the latest forecast figure set generated from GFS.\n\nKind regards,";
pub const DEFAULT_SMTP_SERVER: &str = "smtp.gmail.com";
pub const DEFAULT_SMTP_PORT: u16 = 465;
pub const DEFAULT_PASSWORD_ENV: &str = "EMAIL_PASSWORD";
pub const DEFAULT_ZIP_NAME: &str = "Forecast_Figures.zip";
pub const DEFAULT_IMAGE_EXTENSION: &str = "png";

/// 一次執行所需的完整設定（已驗證）
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub python: String,
    pub data_dir: PathBuf,
    pub fig_dir: PathBuf,
    pub download: DownloadSettings,
    pub render: RenderSettings,
    pub env_overrides: EnvOverrides,
    pub email: Option<EmailSettings>,
}

#[derive(Debug, Clone)]
pub struct DownloadSettings {
    pub script: PathBuf,
    pub max_age_hours: u64,
    pub force: bool,
}

#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub script: PathBuf,
}

#[derive(Debug, Clone)]
pub struct EmailSettings {
    pub sender: Option<String>,
    pub recipients: Vec<String>,
    pub subject: String,
    pub body: String,
    pub smtp_server: String,
    pub port: u16,
    pub password: Option<String>,
    pub password_env: String,
    pub zip_name: String,
    pub image_extension: String,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            python: DEFAULT_PYTHON.to_string(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            fig_dir: PathBuf::from(DEFAULT_FIG_DIR),
            download: DownloadSettings::default(),
            render: RenderSettings::default(),
            env_overrides: EnvOverrides::default(),
            email: None,
        }
    }
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            script: PathBuf::from(DEFAULT_GFS_SCRIPT),
            max_age_hours: DEFAULT_MAX_AGE_HOURS,
            force: false,
        }
    }
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            script: PathBuf::from(DEFAULT_FORECAST_SCRIPT),
        }
    }
}

impl Default for EmailSettings {
    fn default() -> Self {
        Self {
            sender: None,
            recipients: Vec::new(),
            subject: DEFAULT_SUBJECT.to_string(),
            body: DEFAULT_BODY.to_string(),
            smtp_server: DEFAULT_SMTP_SERVER.to_string(),
            port: DEFAULT_SMTP_PORT,
            password: None,
            password_env: DEFAULT_PASSWORD_ENV.to_string(),
            zip_name: DEFAULT_ZIP_NAME.to_string(),
            image_extension: DEFAULT_IMAGE_EXTENSION.to_string(),
        }
    }
}

/// Freshness Gate 的判斷結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Freshness {
    UpToDate { latest: DateTime<Utc> },
    RefreshNeeded(RefreshReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshReason {
    Forced,
    NoData,
    Stale { latest: DateTime<Utc> },
}

impl Freshness {
    pub fn should_skip(&self) -> bool {
        matches!(self, Freshness::UpToDate { .. })
    }
}

impl std::fmt::Display for Freshness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Freshness::UpToDate { latest } => write!(f, "up to date (newest GRIB {})", latest),
            Freshness::RefreshNeeded(RefreshReason::Forced) => write!(f, "refresh forced"),
            Freshness::RefreshNeeded(RefreshReason::NoData) => write!(f, "no GRIB files present"),
            Freshness::RefreshNeeded(RefreshReason::Stale { latest }) => {
                write!(f, "stale (newest GRIB {})", latest)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StageOutcome {
    Completed,
    Skipped { reason: String },
}

/// 單一階段的執行紀錄
#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
    pub name: String,
    pub outcome: StageOutcome,
    pub duration: Duration,
}
