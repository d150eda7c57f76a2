use crate::domain::environment::{EnvOverrides, HostEnvironment};
use crate::domain::model::*;
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{PipelineError, Result};
use crate::utils::validation::{
    validate_extension, validate_non_empty_string, validate_path, validate_positive_number,
    validate_range, validate_required_field, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub pipeline: PipelineSection,
    pub paths: PathsSection,
    pub download: DownloadSection,
    pub render: RenderSection,
    pub environment: BTreeMap<String, String>,
    pub email: Option<EmailSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSection {
    pub name: String,
    pub description: Option<String>,
    pub python: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsSection {
    pub data_dir: String,
    pub fig_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadSection {
    pub script: String,
    pub max_age_hours: u64,
    pub force: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSection {
    pub script: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailSection {
    pub enabled: bool,
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

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            name: "gfs-pipeline".to_string(),
            description: None,
            python: DEFAULT_PYTHON.to_string(),
        }
    }
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            data_dir: DEFAULT_DATA_DIR.to_string(),
            fig_dir: DEFAULT_FIG_DIR.to_string(),
        }
    }
}

impl Default for DownloadSection {
    fn default() -> Self {
        Self {
            script: DEFAULT_GFS_SCRIPT.to_string(),
            max_age_hours: DEFAULT_MAX_AGE_HOURS,
            force: false,
        }
    }
}

impl Default for RenderSection {
    fn default() -> Self {
        Self {
            script: DEFAULT_FORECAST_SCRIPT.to_string(),
        }
    }
}

impl Default for EmailSection {
    fn default() -> Self {
        Self {
            enabled: true,
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

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P, host: &HostEnvironment) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content, host)
    }

    /// 從 TOML 字串解析配置；`${VAR}` 只在字串值內替換，註解不受影響
    pub fn from_toml_str(content: &str, host: &HostEnvironment) -> Result<Self> {
        let table: toml::Table = toml::from_str(content).map_err(|e| PipelineError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })?;

        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| PipelineError::config(e.to_string()))?;
        let mut value = toml::Value::Table(table);
        Self::substitute_env_vars(&mut value, &re, host)?;

        value.try_into().map_err(|e| PipelineError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${EMAIL_PASSWORD})；未設定的變數視為設定錯誤
    fn substitute_env_vars(value: &mut toml::Value, re: &Regex, host: &HostEnvironment) -> Result<()> {
        match value {
            toml::Value::String(text) => {
                if let Some(missing) = re
                    .captures_iter(text.as_str())
                    .map(|caps| caps[1].to_string())
                    .find(|name| host.get(name).is_none())
                {
                    return Err(PipelineError::config(format!(
                        "Environment variable `{}` referenced in config is not set",
                        missing
                    )));
                }

                let replaced = re
                    .replace_all(text.as_str(), |caps: &regex::Captures| {
                        host.get(&caps[1]).unwrap_or_default().to_string()
                    })
                    .into_owned();
                *text = replaced;
            }
            toml::Value::Array(items) => {
                for item in items {
                    Self::substitute_env_vars(item, re, host)?;
                }
            }
            toml::Value::Table(table) => {
                for (_, item) in table.iter_mut() {
                    Self::substitute_env_vars(item, re, host)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    pub fn email_enabled(&self) -> bool {
        self.email.as_ref().map(|e| e.enabled).unwrap_or(false)
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("pipeline.python", &self.pipeline.python)?;
        validate_path("paths.data_dir", &self.paths.data_dir)?;
        validate_path("paths.fig_dir", &self.paths.fig_dir)?;
        validate_path("download.script", &self.download.script)?;
        validate_path("render.script", &self.render.script)?;
        validate_positive_number("download.max_age_hours", self.download.max_age_hours, 1)?;

        if let Some(email) = self.email.as_ref().filter(|e| e.enabled) {
            validate_required_field("email.sender", &email.sender)?;
            if email.recipients.is_empty() {
                return Err(PipelineError::MissingConfigError {
                    field: "email.recipients".to_string(),
                });
            }
            validate_non_empty_string("email.smtp_server", &email.smtp_server)?;
            validate_range("email.port", email.port, 1, u16::MAX)?;
            validate_non_empty_string("email.zip_name", &email.zip_name)?;
            validate_non_empty_string("email.password_env", &email.password_env)?;
            validate_extension("email.image_extension", &email.image_extension)?;
        }

        Ok(())
    }
}

impl ConfigProvider for TomlConfig {
    fn to_settings(&self) -> Result<PipelineSettings> {
        self.validate()?;

        let email = self
            .email
            .as_ref()
            .filter(|e| e.enabled)
            .map(|e| EmailSettings {
                sender: e.sender.clone(),
                recipients: e.recipients.clone(),
                subject: e.subject.clone(),
                body: e.body.clone(),
                smtp_server: e.smtp_server.clone(),
                port: e.port,
                password: e.password.clone(),
                password_env: e.password_env.clone(),
                zip_name: e.zip_name.clone(),
                image_extension: e.image_extension.clone(),
            });

        Ok(PipelineSettings {
            python: self.pipeline.python.clone(),
            data_dir: PathBuf::from(&self.paths.data_dir),
            fig_dir: PathBuf::from(&self.paths.fig_dir),
            download: DownloadSettings {
                script: PathBuf::from(&self.download.script),
                max_age_hours: self.download.max_age_hours,
                force: self.download.force,
            },
            render: RenderSettings {
                script: PathBuf::from(&self.render.script),
            },
            env_overrides: EnvOverrides::from_map(self.environment.clone())?,
            email,
        })
    }
}
