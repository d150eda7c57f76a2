use crate::core::delivery::SmtpMailer;
use crate::core::stages::{DownloadStage, EmailStage, RenderStage};
use crate::domain::environment::HostEnvironment;
use crate::domain::model::{PipelineSettings, StageOutcome, StageReport};
use crate::domain::ports::{MailTransport, Stage};
use crate::utils::error::{PipelineError, Result};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::Instrument;

/// 依序執行各階段；任何一個失敗即中止，後續階段不會啟動
pub struct StageSequence {
    stages: Vec<Box<dyn Stage>>,
    run_id: String,
}

impl StageSequence {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            stages: Vec::new(),
            run_id: run_id.into(),
        }
    }

    pub fn add_stage(&mut self, stage: Box<dyn Stage>) {
        self.stages.push(stage);
    }

    pub fn with_stage(mut self, stage: Box<dyn Stage>) -> Self {
        self.add_stage(stage);
        self
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    pub async fn execute_all(&self) -> Result<Vec<StageReport>> {
        let span = tracing::info_span!("pipeline", run_id = %self.run_id);
        self.execute_stages().instrument(span).await
    }

    async fn execute_stages(&self) -> Result<Vec<StageReport>> {
        let total = self.stages.len();
        let mut reports = Vec::with_capacity(total);

        for (index, stage) in self.stages.iter().enumerate() {
            let step = format!("({}/{})", index + 1, total);

            if !stage.should_execute() {
                tracing::info!("⏭️ {} Skipping stage: {} (not enabled)", step, stage.name());
                reports.push(StageReport {
                    name: stage.name().to_string(),
                    outcome: StageOutcome::Skipped {
                        reason: "not enabled".to_string(),
                    },
                    duration: Duration::ZERO,
                });
                continue;
            }

            tracing::info!("▶️ {} Running stage: {}", step, stage.name());
            let started = Instant::now();

            match stage.run().await {
                Ok(outcome) => {
                    let report = StageReport {
                        name: stage.name().to_string(),
                        outcome,
                        duration: started.elapsed(),
                    };
                    tracing::info!(
                        "✅ {} Stage {} done ({:?}, {:.1}s)",
                        step,
                        report.name,
                        report.outcome,
                        report.duration.as_secs_f64()
                    );
                    reports.push(report);
                }
                Err(e) => {
                    tracing::error!("❌ {} Stage {} failed: {}", step, stage.name(), e);
                    return Err(PipelineError::StageFailed {
                        stage: stage.name().to_string(),
                        source: Box::new(e),
                    });
                }
            }
        }

        Ok(reports)
    }

    /// 執行摘要
    pub fn execution_summary(reports: &[StageReport]) -> serde_json::Value {
        let total_duration: Duration = reports.iter().map(|r| r.duration).sum();
        let completed: Vec<&str> = reports
            .iter()
            .filter(|r| r.outcome == StageOutcome::Completed)
            .map(|r| r.name.as_str())
            .collect();
        let skipped: Vec<serde_json::Value> = reports
            .iter()
            .filter_map(|r| match &r.outcome {
                StageOutcome::Skipped { reason } => Some(json!({ "stage": r.name, "reason": reason })),
                StageOutcome::Completed => None,
            })
            .collect();

        json!({
            "total_stages": reports.len(),
            "completed_stages": completed,
            "skipped_stages": skipped,
            "total_duration_ms": total_duration.as_millis() as u64,
        })
    }
}

/// Download, render, then (optionally) e-mail.
pub struct ForecastPipeline {
    sequence: StageSequence,
}

impl ForecastPipeline {
    pub fn from_settings(settings: &PipelineSettings, host: HostEnvironment) -> Self {
        Self::with_transport(settings, host, Arc::new(SmtpMailer))
    }

    pub fn with_transport(
        settings: &PipelineSettings,
        host: HostEnvironment,
        transport: Arc<dyn MailTransport>,
    ) -> Self {
        let run_id = Utc::now().format("%Y%m%dT%H%M%SZ").to_string();
        let sequence = StageSequence::new(run_id)
            .with_stage(Box::new(DownloadStage::new(settings, host.clone())))
            .with_stage(Box::new(RenderStage::new(settings, host.clone())))
            .with_stage(Box::new(EmailStage::new(settings, host, transport)));
        Self { sequence }
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.sequence.stage_names()
    }

    pub async fn run(&self) -> Result<Vec<StageReport>> {
        tracing::info!("Starting forecast pipeline run {}", self.sequence.run_id());
        self.sequence.execute_all().await
    }
}
