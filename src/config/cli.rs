use crate::domain::environment::EnvOverrides;
use crate::domain::model::*;
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{PipelineError, Result};
use crate::utils::validation::{
    validate_extension, validate_non_empty_string, validate_path, validate_positive_number,
    validate_range, validate_required_field, Validate,
};
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "gfs-pipeline")]
#[command(about = "GFS → forecast figures → e-mail pipeline: runs the download and plotting scripts, then sends the figures")]
pub struct CliConfig {
    /// Directory where GRIB2 files are saved by the download script
    #[arg(long, default_value = DEFAULT_DATA_DIR)]
    pub data_dir: String,

    /// Directory for generated figures
    #[arg(long, default_value = DEFAULT_FIG_DIR)]
    pub fig_dir: String,

    /// Path to the GFS download script
    #[arg(long, default_value = DEFAULT_GFS_SCRIPT)]
    pub gfs_script: String,

    /// Path to the plotting script
    #[arg(long, default_value = DEFAULT_FORECAST_SCRIPT)]
    pub forecast_script: String,

    /// Interpreter used to run both scripts
    #[arg(long, default_value = DEFAULT_PYTHON)]
    pub python: String,

    /// Extra environment variables for the subprocesses (KEY=value)
    #[arg(long = "env", value_name = "KEY=VALUE", num_args = 0..)]
    pub env: Vec<String>,

    /// Skip download if GRIB files are newer than this
    #[arg(long, default_value_t = DEFAULT_MAX_AGE_HOURS)]
    pub max_age_hours: u64,

    /// Always download even if fresh data exists
    #[arg(long)]
    pub force_download: bool,

    /// Send the images via e-mail after creation
    #[arg(long)]
    pub send_email: bool,

    /// Sender e-mail address (also the SMTP login)
    #[arg(long)]
    pub sender: Option<String>,

    /// Recipient address list
    #[arg(long, num_args = 1..)]
    pub recipients: Vec<String>,

    #[arg(long, default_value = DEFAULT_SUBJECT)]
    pub subject: String,

    #[arg(long, default_value = DEFAULT_BODY)]
    pub body: String,

    #[arg(long, default_value = DEFAULT_SMTP_SERVER)]
    pub smtp_server: String,

    /// SMTP port (implicit TLS)
    #[arg(long, default_value_t = DEFAULT_SMTP_PORT)]
    pub port: u16,

    /// Sender password/token; if omitted, read from --password-env
    #[arg(long)]
    pub password: Option<String>,

    /// Environment variable holding the SMTP password
    #[arg(long, default_value = DEFAULT_PASSWORD_ENV)]
    pub password_env: String,

    /// Filename for the attached ZIP archive
    #[arg(long, default_value = DEFAULT_ZIP_NAME)]
    pub zip_name: String,

    /// Extension of the rendered images to send
    #[arg(long = "image-ext", default_value = DEFAULT_IMAGE_EXTENSION)]
    pub image_ext: String,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_path("data_dir", &self.data_dir)?;
        validate_path("fig_dir", &self.fig_dir)?;
        validate_path("gfs_script", &self.gfs_script)?;
        validate_path("forecast_script", &self.forecast_script)?;
        validate_non_empty_string("python", &self.python)?;
        validate_positive_number("max_age_hours", self.max_age_hours, 1)?;
        EnvOverrides::parse(&self.env)?;

        if self.send_email {
            validate_required_field("sender", &self.sender)?;
            if self.recipients.is_empty() {
                return Err(PipelineError::MissingConfigError {
                    field: "recipients".to_string(),
                });
            }
            validate_non_empty_string("smtp_server", &self.smtp_server)?;
            validate_range("port", self.port, 1, u16::MAX)?;
            validate_non_empty_string("zip_name", &self.zip_name)?;
            validate_non_empty_string("password_env", &self.password_env)?;
            validate_extension("image_ext", &self.image_ext)?;
        }

        Ok(())
    }
}

impl ConfigProvider for CliConfig {
    fn to_settings(&self) -> Result<PipelineSettings> {
        self.validate()?;

        let email = self.send_email.then(|| EmailSettings {
            sender: self.sender.clone(),
            recipients: self.recipients.clone(),
            subject: self.subject.clone(),
            body: self.body.clone(),
            smtp_server: self.smtp_server.clone(),
            port: self.port,
            password: self.password.clone(),
            password_env: self.password_env.clone(),
            zip_name: self.zip_name.clone(),
            image_extension: self.image_ext.clone(),
        });

        Ok(PipelineSettings {
            python: self.python.clone(),
            data_dir: PathBuf::from(&self.data_dir),
            fig_dir: PathBuf::from(&self.fig_dir),
            download: DownloadSettings {
                script: PathBuf::from(&self.gfs_script),
                max_age_hours: self.max_age_hours,
                force: self.force_download,
            },
            render: RenderSettings {
                script: PathBuf::from(&self.forecast_script),
            },
            env_overrides: EnvOverrides::parse(&self.env)?,
            email,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CliConfig::parse_from(["gfs-pipeline"]);
        let settings = config.to_settings().unwrap();

        assert_eq!(settings.data_dir, PathBuf::from("DATA"));
        assert_eq!(settings.fig_dir, PathBuf::from("FIGS"));
        assert_eq!(settings.download.max_age_hours, 6);
        assert!(!settings.download.force);
        assert!(settings.env_overrides.is_empty());
        assert!(settings.email.is_none());
    }

    #[test]
    fn test_env_and_email_flags() {
        let config = CliConfig::parse_from([
            "gfs-pipeline",
            "--env",
            "GFS_RES=0p25",
            "FORECAST_HOURS=48",
            "--send-email",
            "--sender",
            "wx@example.com",
            "--recipients",
            "a@example.com",
            "b@example.com",
            "--force-download",
        ]);
        let settings = config.to_settings().unwrap();

        assert_eq!(settings.env_overrides.get("FORECAST_HOURS"), Some("48"));
        assert!(settings.download.force);
        let email = settings.email.unwrap();
        assert_eq!(email.recipients.len(), 2);
        assert_eq!(email.port, 465);
        assert_eq!(email.zip_name, "Forecast_Figures.zip");
    }

    #[test]
    fn test_malformed_env_rejected() {
        let config = CliConfig::parse_from(["gfs-pipeline", "--env", "BROKEN"]);
        assert!(matches!(
            config.to_settings().unwrap_err(),
            PipelineError::ConfigError { .. }
        ));
    }

    #[test]
    fn test_email_without_recipients_rejected() {
        let config = CliConfig::parse_from(["gfs-pipeline", "--send-email", "--sender", "wx@example.com"]);
        assert!(matches!(
            config.validate().unwrap_err(),
            PipelineError::MissingConfigError { .. }
        ));
    }

    #[test]
    fn test_zero_max_age_rejected() {
        let config = CliConfig::parse_from(["gfs-pipeline", "--max-age-hours", "0"]);
        assert!(config.validate().is_err());
    }
}
