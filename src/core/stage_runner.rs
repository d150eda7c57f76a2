use crate::domain::environment::{EnvOverrides, HostEnvironment};
use crate::utils::error::{PipelineError, Result};
use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::process::Command;

/// 外部腳本呼叫：`executable script`
#[derive(Debug, Clone)]
pub struct ScriptCommand {
    pub stage: String,
    pub executable: String,
    pub script: PathBuf,
}

impl ScriptCommand {
    pub fn new(stage: impl Into<String>, executable: impl Into<String>, script: impl Into<PathBuf>) -> Self {
        Self {
            stage: stage.into(),
            executable: executable.into(),
            script: script.into(),
        }
    }

    pub fn describe(&self) -> String {
        format!("{} {}", self.executable, self.script.display())
    }
}

/// The complete environment handed to one stage script.
///
/// Layering order: host snapshot, then stage path variables, then user
/// overrides (so an override may replace e.g. `DATA_DIR`).
#[derive(Debug, Clone, Default)]
pub struct StageEnvironment {
    vars: BTreeMap<OsString, OsString>,
}

impl StageEnvironment {
    pub fn merge(host: &HostEnvironment, stage_vars: &[(&str, &Path)], overrides: &EnvOverrides) -> Self {
        let mut vars: BTreeMap<OsString, OsString> = host
            .iter()
            .map(|(k, v)| (k.to_os_string(), v.to_os_string()))
            .collect();

        for &(key, path) in stage_vars {
            vars.insert(OsString::from(key), path.as_os_str().to_os_string());
        }
        for (key, value) in overrides.iter() {
            vars.insert(OsString::from(key), OsString::from(value));
        }

        Self { vars }
    }

    pub fn get(&self, key: &str) -> Option<&OsStr> {
        self.vars.get(OsStr::new(key)).map(OsString::as_os_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&OsStr, &OsStr)> {
        self.vars.iter().map(|(k, v)| (k.as_os_str(), v.as_os_str()))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

/// 執行腳本並等待結束；非零結束碼即視為整條管線失敗，不重試。
pub async fn run_script(command: &ScriptCommand, env: &StageEnvironment) -> Result<()> {
    tracing::debug!(
        "Running `{}` for stage '{}' with {} environment variables",
        command.describe(),
        command.stage,
        env.len()
    );

    let started = Instant::now();
    let status = Command::new(&command.executable)
        .arg(&command.script)
        .env_clear()
        .envs(env.iter())
        .status()
        .await
        .map_err(|source| PipelineError::ScriptLaunchError {
            stage: command.stage.clone(),
            program: command.executable.clone(),
            source,
        })?;

    if !status.success() {
        return Err(PipelineError::ScriptFailed {
            stage: command.stage.clone(),
            script: command.script.display().to_string(),
            status: status.to_string(),
        });
    }

    tracing::info!(
        "{} finished in {:.1}s.",
        command.script.display(),
        started.elapsed().as_secs_f64()
    );
    Ok(())
}

/// 絕對路徑；目錄存在時一併解析符號連結
pub fn resolve_dir(path: &Path) -> Result<PathBuf> {
    match std::fs::canonicalize(path) {
        Ok(resolved) => Ok(resolved),
        Err(_) => Ok(std::path::absolute(path)?),
    }
}
