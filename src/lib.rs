pub mod analyzers;
pub mod blockchain;
pub mod config;
pub mod contracts;
pub mod core;
pub mod models;
pub mod sandbox;
pub mod utils;

pub use crate::core::{Evaluator, ResultChannel, RouterAdapter, SimulationRunner};
pub use crate::models::{
    CheckKind, CheckReport, ExecutionMode, ProbePolicy, SimulationOutcome, ToleranceParameter, Verdict,
};
pub use crate::utils::{Result, RouterError, ScreenerError};
