//! Control primitives for hydrolift.
//!
//! The plant controllers (generator, clutch, compressor, floater cycle) in
//! `hl-sim` are built from the small, stateless-configuration / explicit-state
//! blocks defined here:
//!
//! - **PID**: discrete PID with direct/reverse action, output clamping and an
//!   explicit integral hold
//! - **Slew actuator**: rate-limited approach to a commanded position
//! - **Hysteresis switch**: on/off control with a dead band and minimum dwell
//! - **Duty cycle**: fixed on/off timing
//!
//! Every block keeps its configuration and its memory in separate types so the
//! owner decides when state is committed.

pub mod actuator;
pub mod controller;
pub mod duty;
pub mod error;
pub mod hysteresis;

pub use actuator::{ActuatorState, SlewActuator};
pub use controller::{ControlAction, PidController, PidState};
pub use duty::DutyCycle;
pub use error::{ControlError, ControlResult};
pub use hysteresis::{HysteresisSwitch, SwitchState};
