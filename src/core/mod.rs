pub mod archive;
pub mod delivery;
pub mod freshness;
pub mod pipeline;
pub mod stage_runner;
pub mod stages;

pub use crate::domain::environment::{EnvOverrides, HostEnvironment};
pub use crate::domain::model::{Freshness, PipelineSettings, StageOutcome, StageReport};
pub use crate::domain::ports::{ConfigProvider, MailTransport, SmtpLogin, Stage};
pub use crate::utils::error::Result;
