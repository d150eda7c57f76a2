// Domain layer: settings, outcomes and ports. No process or network access here.

pub mod environment;
pub mod model;
pub mod ports;
