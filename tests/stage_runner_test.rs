#![cfg(unix)]

mod common;

use common::{write_stub, RecordingTransport};
use gfs_pipeline::core::stage_runner::{run_script, ScriptCommand, StageEnvironment};
use gfs_pipeline::domain::model::{DownloadSettings, EmailSettings, PipelineSettings, RenderSettings};
use gfs_pipeline::{EnvOverrides, ForecastPipeline, HostEnvironment, PipelineError};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn settings_for(work: &Path, download_body: &str, render_body: &str) -> PipelineSettings {
    let log = work.join("invocations.log");
    let download = write_stub(work, "download.sh", download_body);
    let render = write_stub(work, "render.sh", render_body);

    PipelineSettings {
        python: "/bin/sh".to_string(),
        data_dir: work.join("DATA"),
        fig_dir: work.join("FIGS"),
        download: DownloadSettings {
            script: download,
            max_age_hours: 6,
            force: true,
        },
        render: RenderSettings { script: render },
        env_overrides: EnvOverrides::parse([format!("STUB_LOG={}", log.display())]).unwrap(),
        email: Some(EmailSettings {
            sender: Some("wx@example.com".to_string()),
            recipients: vec!["ops@example.com".to_string()],
            password: Some("token".to_string()),
            ..EmailSettings::default()
        }),
    }
}

fn invocations(work: &Path) -> Vec<String> {
    std::fs::read_to_string(work.join("invocations.log"))
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn test_failed_download_stops_render_and_email() {
    let work = TempDir::new().unwrap();
    let settings = settings_for(
        work.path(),
        r#"echo download >> "$STUB_LOG"; exit 4"#,
        r#"echo render >> "$STUB_LOG"; touch "$OUTPUT_DIR/t2m.png""#,
    );

    let transport = Arc::new(RecordingTransport::default());
    let pipeline = ForecastPipeline::with_transport(&settings, HostEnvironment::capture(), transport.clone());
    let err = pipeline.run().await.unwrap_err();

    assert!(matches!(err, PipelineError::StageFailed { ref stage, .. } if stage == "download"));
    assert!(matches!(err.root(), PipelineError::ScriptFailed { .. }));
    assert_eq!(invocations(work.path()), vec!["download"]);
    assert_eq!(transport.send_count(), 0);
}

#[tokio::test]
async fn test_failed_render_stops_email() {
    let work = TempDir::new().unwrap();
    let settings = settings_for(
        work.path(),
        r#"echo download >> "$STUB_LOG""#,
        r#"echo render >> "$STUB_LOG"; touch "$OUTPUT_DIR/t2m.png"; exit 1"#,
    );

    let transport = Arc::new(RecordingTransport::default());
    let pipeline = ForecastPipeline::with_transport(&settings, HostEnvironment::capture(), transport.clone());
    let err = pipeline.run().await.unwrap_err();

    assert!(matches!(err, PipelineError::StageFailed { ref stage, .. } if stage == "render"));
    assert_eq!(invocations(work.path()), vec!["download", "render"]);
    assert_eq!(transport.send_count(), 0);
}

#[tokio::test]
async fn test_stages_run_in_order() {
    let work = TempDir::new().unwrap();
    let settings = settings_for(
        work.path(),
        r#"echo download >> "$STUB_LOG""#,
        r#"echo render >> "$STUB_LOG"; touch "$OUTPUT_DIR/t2m.png""#,
    );

    let transport = Arc::new(RecordingTransport::default());
    let pipeline = ForecastPipeline::with_transport(&settings, HostEnvironment::capture(), transport.clone());
    let reports = pipeline.run().await.unwrap();

    assert_eq!(reports.len(), 3);
    assert_eq!(invocations(work.path()), vec!["download", "render"]);
    assert_eq!(transport.send_count(), 1);
}

#[tokio::test]
async fn test_script_sees_merged_environment_only() {
    let work = TempDir::new().unwrap();
    let out = work.path().join("env.txt");
    let script = write_stub(
        work.path(),
        "env.sh",
        r#"printf '%s|%s|%s' "$FROM_HOST" "$DATA_DIR" "${NOT_PASSED:-unset}" > "$ENV_OUT""#,
    );

    let host = HostEnvironment::from_pairs([("FROM_HOST", "host-value")]);
    let overrides = EnvOverrides::parse([format!("ENV_OUT={}", out.display())]).unwrap();
    let env = StageEnvironment::merge(&host, &[("DATA_DIR", Path::new("/srv/gfs"))], &overrides);

    let command = ScriptCommand::new("download", "/bin/sh", script);
    run_script(&command, &env).await.unwrap();

    assert_eq!(
        std::fs::read_to_string(out).unwrap(),
        "host-value|/srv/gfs|unset"
    );
}
