pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use config::toml_config::TomlConfig;
pub use crate::core::{
    delivery::{EmailDelivery, SmtpMailer},
    freshness::FreshnessGate,
    pipeline::{ForecastPipeline, StageSequence},
};
pub use domain::environment::{EnvOverrides, HostEnvironment};
pub use domain::model::PipelineSettings;
pub use domain::ports::ConfigProvider;
pub use utils::error::{PipelineError, Result};
