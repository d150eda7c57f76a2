use chrono::Utc;
use clap::Parser;
use gfs_pipeline::core::pipeline::StageSequence;
use gfs_pipeline::core::stage_runner::resolve_dir;
use gfs_pipeline::utils::{logger, validation::Validate};
use gfs_pipeline::{
    ConfigProvider, ForecastPipeline, FreshnessGate, HostEnvironment, PipelineSettings, TomlConfig,
};

#[derive(Parser)]
#[command(name = "toml-pipeline")]
#[command(about = "GFS forecast pipeline driven by a TOML configuration file")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "gfs-pipeline.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON log lines (for cron / systemd journals)
    #[arg(long)]
    json_logs: bool,

    /// Override the download.force setting from config
    #[arg(long)]
    force_download: bool,

    /// Show what would run without executing anything
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("🚀 Starting TOML-based GFS pipeline");
    tracing::info!("📁 Loading configuration from: {}", args.config);

    let host = HostEnvironment::capture();
    let mut config = match TomlConfig::from_file(&args.config, &host) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    // 應用命令列覆蓋設定
    if args.force_download {
        config.download.force = true;
        tracing::info!("🔧 Forced download enabled from command line");
    }

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());
        std::process::exit(e.exit_code());
    }
    let settings = config.to_settings()?;

    tracing::info!(
        "✅ Configuration '{}' loaded (e-mail {})",
        config.pipeline.name,
        if config.email_enabled() { "on" } else { "off" }
    );

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No scripts will run and no mail will be sent");
        perform_dry_run(&settings)?;
        return Ok(());
    }

    let pipeline = ForecastPipeline::from_settings(&settings, host);
    match pipeline.run().await {
        Ok(reports) => {
            let summary = StageSequence::execution_summary(&reports);
            println!("{}", serde_json::to_string_pretty(&summary)?);
            println!("✅ Pipeline finished.");
            Ok(())
        }
        Err(e) => {
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(e.exit_code());
        }
    }
}

fn perform_dry_run(settings: &PipelineSettings) -> anyhow::Result<()> {
    let gate = FreshnessGate::new(settings.download.max_age_hours, settings.download.force);
    let decision = gate.check(&settings.data_dir, Utc::now())?;

    println!("Data directory:   {}", resolve_dir(&settings.data_dir)?.display());
    println!("Figure directory: {}", resolve_dir(&settings.fig_dir)?.display());
    println!(
        "(1/3) download: {} {} -> {}",
        settings.python,
        settings.download.script.display(),
        if decision.should_skip() { "skip" } else { "run" }
    );
    println!("      freshness: {}", decision);
    println!(
        "(2/3) render:   {} {}",
        settings.python,
        settings.render.script.display()
    );
    match &settings.email {
        Some(email) => println!(
            "(3/3) email:    {} via {}:{} as {}",
            email.recipients.join(", "),
            email.smtp_server,
            email.port,
            email.zip_name
        ),
        None => println!("(3/3) email:    disabled"),
    }

    for (key, value) in settings.env_overrides.iter() {
        println!("      env {}={}", key, value);
    }
    Ok(())
}
