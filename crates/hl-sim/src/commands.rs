//! Actuator commands and the per-tick staging buffer.
//!
//! Controllers emit [`ActuatorCommand`]s during the decide phase. They are
//! folded into [`StagedCommands`], which the physics phase reads on the
//! following tick; nothing a controller decides affects the current tick.

use hl_core::{CoreError, CoreResult, FloaterId};
use serde::{Deserialize, Serialize};

use crate::faults::Component;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ActuatorCommand {
    OpenInjectionValve(FloaterId),
    CloseInjectionValve(FloaterId),
    OpenVentValve(FloaterId),
    CloseVentValve(FloaterId),
    SetGeneratorTorque(f64),
    SetClutchEngagement(f64),
    CompressorOn,
    CompressorOff,
}

impl ActuatorCommand {
    /// Component the command drives.
    pub fn component(&self) -> Component {
        match *self {
            Self::OpenInjectionValve(id)
            | Self::CloseInjectionValve(id)
            | Self::OpenVentValve(id)
            | Self::CloseVentValve(id) => Component::Floater(id),
            Self::SetGeneratorTorque(_) => Component::Generator,
            Self::SetClutchEngagement(_) => Component::Clutch,
            Self::CompressorOn | Self::CompressorOff => Component::Compressor,
        }
    }
}

/// Commands in force for one physics step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StagedCommands {
    pub generator_torque_nm: f64,
    pub clutch_engagement: f64,
    pub compressor_on: bool,
    injection_open: Vec<bool>,
    vent_open: Vec<bool>,
}

impl StagedCommands {
    pub fn new(floater_count: usize, clutch_engagement: f64, compressor_on: bool) -> Self {
        Self {
            generator_torque_nm: 0.0,
            clutch_engagement,
            compressor_on,
            injection_open: vec![false; floater_count],
            vent_open: vec![false; floater_count],
        }
    }

    fn slot(&self, id: FloaterId) -> CoreResult<usize> {
        let index = id.slot();
        if index < self.injection_open.len() {
            Ok(index)
        } else {
            Err(CoreError::IndexOob {
                what: "floater valve",
                index,
                len: self.injection_open.len(),
            })
        }
    }

    /// Fold one command into the buffer.
    pub fn apply(&mut self, command: ActuatorCommand) -> CoreResult<()> {
        match command {
            ActuatorCommand::OpenInjectionValve(id) => {
                let i = self.slot(id)?;
                self.injection_open[i] = true;
            }
            ActuatorCommand::CloseInjectionValve(id) => {
                let i = self.slot(id)?;
                self.injection_open[i] = false;
            }
            ActuatorCommand::OpenVentValve(id) => {
                let i = self.slot(id)?;
                self.vent_open[i] = true;
            }
            ActuatorCommand::CloseVentValve(id) => {
                let i = self.slot(id)?;
                self.vent_open[i] = false;
            }
            ActuatorCommand::SetGeneratorTorque(torque) => self.generator_torque_nm = torque,
            ActuatorCommand::SetClutchEngagement(level) => {
                self.clutch_engagement = level.clamp(0.0, 1.0)
            }
            ActuatorCommand::CompressorOn => self.compressor_on = true,
            ActuatorCommand::CompressorOff => self.compressor_on = false,
        }
        Ok(())
    }

    pub fn injection_open(&self, id: FloaterId) -> bool {
        self.injection_open.get(id.slot()).copied().unwrap_or(false)
    }

    pub fn vent_open(&self, id: FloaterId) -> bool {
        self.vent_open.get(id.slot()).copied().unwrap_or(false)
    }

    pub fn any_injection_open(&self) -> bool {
        self.injection_open.iter().any(|&open| open)
    }

    pub fn open_injection_count(&self) -> usize {
        self.injection_open.iter().filter(|&&open| open).count()
    }

    /// Generator torque actually transmitted through the clutch.
    pub fn effective_torque_nm(&self) -> f64 {
        self.generator_torque_nm * self.clutch_engagement
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valve_commands_toggle_slots() {
        let mut staged = StagedCommands::new(3, 1.0, false);
        let id = FloaterId::from_index(1);
        staged.apply(ActuatorCommand::OpenInjectionValve(id)).unwrap();
        assert!(staged.injection_open(id));
        assert!(staged.any_injection_open());
        assert_eq!(staged.open_injection_count(), 1);
        staged.apply(ActuatorCommand::CloseInjectionValve(id)).unwrap();
        assert!(!staged.any_injection_open());
        staged.apply(ActuatorCommand::OpenVentValve(id)).unwrap();
        assert!(staged.vent_open(id));
    }

    #[test]
    fn unknown_floater_is_rejected() {
        let mut staged = StagedCommands::new(2, 1.0, false);
        let err = staged
            .apply(ActuatorCommand::OpenVentValve(FloaterId::from_index(5)))
            .unwrap_err();
        assert!(matches!(err, CoreError::IndexOob { index: 5, len: 2, .. }));
    }

    #[test]
    fn effective_torque_scales_with_engagement() {
        let mut staged = StagedCommands::new(0, 1.0, false);
        staged.apply(ActuatorCommand::SetGeneratorTorque(1000.0)).unwrap();
        staged.apply(ActuatorCommand::SetClutchEngagement(0.25)).unwrap();
        assert_eq!(staged.effective_torque_nm(), 250.0);
        staged.apply(ActuatorCommand::SetClutchEngagement(3.0)).unwrap();
        assert_eq!(staged.clutch_engagement, 1.0);
    }
}
