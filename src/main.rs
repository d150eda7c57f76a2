use clap::Parser;
use gfs_pipeline::core::pipeline::StageSequence;
use gfs_pipeline::utils::logger;
use gfs_pipeline::{CliConfig, ConfigProvider, ForecastPipeline, HostEnvironment, PipelineError};

#[tokio::main]
async fn main() {
    let config = CliConfig::parse();

    // 初始化日誌
    logger::init_cli_logger(config.verbose);
    tracing::info!("Starting gfs-pipeline");

    if let Err(e) = run(config).await {
        tracing::error!(
            "❌ Pipeline failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());
        std::process::exit(e.exit_code());
    }

    println!("✅ Pipeline finished.");
}

async fn run(config: CliConfig) -> Result<(), PipelineError> {
    let settings = config.to_settings()?;
    tracing::debug!(
        "Data dir: {}, figure dir: {}, max age: {}h, force: {}, e-mail: {}",
        settings.data_dir.display(),
        settings.fig_dir.display(),
        settings.download.max_age_hours,
        settings.download.force,
        settings.email.is_some()
    );

    let host = HostEnvironment::capture();
    let pipeline = ForecastPipeline::from_settings(&settings, host);
    let reports = pipeline.run().await?;

    tracing::info!(
        "📊 Summary: {}",
        StageSequence::execution_summary(&reports)
    );
    Ok(())
}
