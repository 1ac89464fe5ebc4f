//! Fixed-tick simulation of a buoyancy-driven floater machine.
//!
//! Provides:
//! - Chain force balance with semi-implicit Euler integration
//! - Floater fill/vent state machine
//! - Compressor hysteresis, generator PID and clutch pulse-and-coast control
//! - Tick orchestrator with fault budget, event dispatch and snapshots
//! - Grid-service extension point

pub mod clutch;
pub mod commands;
pub mod compressor;
pub mod config;
pub mod cycle;
pub mod dispatch;
pub mod drivetrain;
pub mod engine;
pub mod error;
pub mod extension;
pub mod faults;
pub mod floater;
pub mod generator;
pub mod physics;
pub mod plant;
pub mod sensors;
pub mod snapshot;
pub mod tank;
pub mod timestep;
pub mod update;

pub use commands::{ActuatorCommand, StagedCommands};
pub use config::{
    ClutchMode, ConfigError, ConfigResult, EngineConfig, GeneratorSetpoint,
};
pub use dispatch::{EventCategory, EventDispatcher, EventHandler, SimEvent};
pub use engine::{Engine, SimClock, SnapshotSink};
pub use error::{SimError, SimResult};
pub use extension::{GridService, SyntheticInertia};
pub use faults::{Component, Fault, FaultKind};
pub use floater::{Floater, FloaterState};
pub use snapshot::{EnergyLedger, EngineStatus, FloaterSnapshot, TickSnapshot};
pub use update::ParameterUpdate;
