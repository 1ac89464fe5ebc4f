//! Error types for simulation operations.

use thiserror::Error;

use crate::config::ConfigError;
use crate::faults::{Component, FaultKind};

/// Errors surfaced by the simulation engine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Engine halted at tick {tick}: {component} tripped {kind} on {count} consecutive ticks")]
    Halted {
        tick: u64,
        component: Component,
        kind: FaultKind,
        count: u32,
    },

    #[error("Core error: {0}")]
    Core(#[from] hl_core::CoreError),

    #[error("Control block error: {0}")]
    Control(#[from] hl_controls::ControlError),
}

pub type SimResult<T> = Result<T, SimError>;
