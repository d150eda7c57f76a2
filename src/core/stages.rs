use crate::core::delivery::EmailDelivery;
use crate::core::freshness::FreshnessGate;
use crate::core::stage_runner::{resolve_dir, run_script, ScriptCommand, StageEnvironment};
use crate::domain::environment::{EnvOverrides, HostEnvironment};
use crate::domain::model::{PipelineSettings, StageOutcome};
use crate::domain::ports::{MailTransport, Stage};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;

pub const DOWNLOAD_STAGE: &str = "download";
pub const RENDER_STAGE: &str = "render";
pub const EMAIL_STAGE: &str = "email";

/// 下載 GFS GRIB2；資料仍新鮮時略過
pub struct DownloadStage {
    command: ScriptCommand,
    data_dir: PathBuf,
    gate: FreshnessGate,
    host: HostEnvironment,
    overrides: EnvOverrides,
}

impl DownloadStage {
    pub fn new(settings: &PipelineSettings, host: HostEnvironment) -> Self {
        Self {
            command: ScriptCommand::new(
                DOWNLOAD_STAGE,
                settings.python.clone(),
                settings.download.script.clone(),
            ),
            data_dir: settings.data_dir.clone(),
            gate: FreshnessGate::new(settings.download.max_age_hours, settings.download.force),
            host,
            overrides: settings.env_overrides.clone(),
        }
    }
}

#[async_trait]
impl Stage for DownloadStage {
    fn name(&self) -> &str {
        DOWNLOAD_STAGE
    }

    async fn run(&self) -> Result<StageOutcome> {
        std::fs::create_dir_all(&self.data_dir)?;

        let decision = self.gate.check(&self.data_dir, Utc::now())?;
        if decision.should_skip() {
            tracing::info!("GRIBs are up-to-date, skipping download ({}).", decision);
            return Ok(StageOutcome::Skipped {
                reason: decision.to_string(),
            });
        }

        tracing::info!("Downloading GFS data: {}", decision);
        let data_dir = resolve_dir(&self.data_dir)?;
        let env = StageEnvironment::merge(&self.host, &[("DATA_DIR", data_dir.as_path())], &self.overrides);
        run_script(&self.command, &env).await?;
        Ok(StageOutcome::Completed)
    }
}

/// 呼叫繪圖腳本產生各產品圖
pub struct RenderStage {
    command: ScriptCommand,
    input_dir: PathBuf,
    output_dir: PathBuf,
    host: HostEnvironment,
    overrides: EnvOverrides,
}

impl RenderStage {
    pub fn new(settings: &PipelineSettings, host: HostEnvironment) -> Self {
        Self {
            command: ScriptCommand::new(
                RENDER_STAGE,
                settings.python.clone(),
                settings.render.script.clone(),
            ),
            input_dir: settings.data_dir.clone(),
            output_dir: settings.fig_dir.clone(),
            host,
            overrides: settings.env_overrides.clone(),
        }
    }
}

#[async_trait]
impl Stage for RenderStage {
    fn name(&self) -> &str {
        RENDER_STAGE
    }

    async fn run(&self) -> Result<StageOutcome> {
        tracing::info!("Creating figures with {} …", self.command.script.display());
        std::fs::create_dir_all(&self.output_dir)?;

        let input_dir = resolve_dir(&self.input_dir)?;
        let output_dir = resolve_dir(&self.output_dir)?;
        let env = StageEnvironment::merge(
            &self.host,
            &[("INPUT_DIR", input_dir.as_path()), ("OUTPUT_DIR", output_dir.as_path())],
            &self.overrides,
        );
        run_script(&self.command, &env).await?;
        Ok(StageOutcome::Completed)
    }
}

pub struct EmailStage {
    delivery: Option<EmailDelivery>,
    transport: Arc<dyn MailTransport>,
}

impl EmailStage {
    pub fn new(settings: &PipelineSettings, host: HostEnvironment, transport: Arc<dyn MailTransport>) -> Self {
        Self {
            delivery: settings
                .email
                .clone()
                .map(|email| EmailDelivery::new(email, settings.fig_dir.clone(), host)),
            transport,
        }
    }
}

#[async_trait]
impl Stage for EmailStage {
    fn name(&self) -> &str {
        EMAIL_STAGE
    }

    fn should_execute(&self) -> bool {
        self.delivery.is_some()
    }

    async fn run(&self) -> Result<StageOutcome> {
        match &self.delivery {
            Some(delivery) => {
                delivery.deliver(self.transport.as_ref()).await?;
                Ok(StageOutcome::Completed)
            }
            None => Ok(StageOutcome::Skipped {
                reason: "e-mail delivery disabled".to_string(),
            }),
        }
    }
}
