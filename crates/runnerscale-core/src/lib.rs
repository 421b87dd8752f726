//! runnerscale-core: fleet, policy, and queue types plus config parsing.
//!
//! Everything here is plain data: the decision engine lives in
//! `runnerscale-autoscale`, provider access in `runnerscale-provider`.

pub mod config;
pub mod types;

pub use config::RunnerscaleConfig;
pub use types::*;
