//! Floater fill/vent state machine.
//!
//! ```text
//! Empty ──bottom zone, tank ≥ P_min──▶ Filling ──volume/time/pressure──▶ Full
//!   ▲                                                                    │
//!   └──────────time/pressure decayed────── Venting ◀───────top zone──────┘
//! ```
//!
//! Evaluation is read-decide-act: every floater decides from the same
//! [`SensorFrame`] and the decisions are applied together afterwards, so no
//! floater observes another's transition within a tick.

use hl_core::FloaterId;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::commands::ActuatorCommand;
use crate::config::{EnvironmentParams, FloaterParams};
use crate::faults::{Component, Fault, FaultKind};
use crate::floater::{Floater, FloaterState, mass_for_fill};
use crate::sensors::{FloaterReading, SensorFrame};

/// One state change, for event dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub floater: FloaterId,
    pub from: FloaterState,
    pub to: FloaterState,
    pub time_s: f64,
}

/// Decided next values for one floater.
#[derive(Debug, Clone, PartialEq)]
pub struct FloaterUpdate {
    pub slot: usize,
    pub state: FloaterState,
    pub air_fill_level: f64,
    pub internal_pressure_pa: f64,
    pub fill_started_s: Option<f64>,
    pub vent_started_s: Option<f64>,
    pub vent_start_pressure_pa: f64,
    pub injected_volume_m3: f64,
    pub vented_volume_m3: f64,
    pub injection_work_j: f64,
    pub vent_loss_j: f64,
    pub commands: Vec<ActuatorCommand>,
    pub transitions: Vec<Transition>,
}

impl FloaterUpdate {
    fn unchanged(slot: usize, f: &Floater) -> Self {
        Self {
            slot,
            state: f.state,
            air_fill_level: f.air_fill_level,
            internal_pressure_pa: f.internal_pressure_pa,
            fill_started_s: f.fill_started_s,
            vent_started_s: f.vent_started_s,
            vent_start_pressure_pa: f.vent_start_pressure_pa,
            injected_volume_m3: f.injected_volume_m3,
            vented_volume_m3: f.vented_volume_m3,
            injection_work_j: 0.0,
            vent_loss_j: 0.0,
            commands: Vec::new(),
            transitions: Vec::new(),
        }
    }

    fn enter(&mut self, id: FloaterId, to: FloaterState, time_s: f64) {
        self.transitions.push(Transition {
            floater: id,
            from: self.state,
            to,
            time_s,
        });
        self.state = to;
    }
}

/// Aggregate result of one cycle evaluation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleOutcome {
    pub commands: Vec<ActuatorCommand>,
    pub transitions: Vec<Transition>,
    pub injection_work_j: f64,
    pub vent_loss_j: f64,
}

/// Configuration of the fill/vent cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct FloaterCycle {
    pub params: FloaterParams,
    pub environment: EnvironmentParams,
    /// Minimum tank pressure to begin a fill.
    pub p_min_pa: f64,
}

impl FloaterCycle {
    pub fn new(params: FloaterParams, environment: EnvironmentParams, p_min_pa: f64) -> Self {
        Self {
            params,
            environment,
            p_min_pa,
        }
    }

    /// Resynchronise any floater whose mass disagrees with its state.
    ///
    /// Returns one fault per corrected floater.
    pub fn verify(&self, floaters: &mut [Floater]) -> Vec<Fault> {
        floaters
            .iter_mut()
            .filter(|f| !f.is_consistent(&self.params, &self.environment))
            .map(|f| {
                let previous = f.resync(&self.params, &self.environment);
                Fault::new(
                    FaultKind::SensorInconsistency,
                    Component::Floater(f.id),
                    format!(
                        "{} floater mass {previous:.3} kg resynced to {:.3} kg",
                        f.state.as_str(),
                        f.mass_kg
                    ),
                )
            })
            .collect()
    }

    /// Decide the next values for one floater. Pure.
    pub fn decide(
        &self,
        slot: usize,
        floater: &Floater,
        reading: &FloaterReading,
        frame: &SensorFrame,
    ) -> FloaterUpdate {
        let mut next = FloaterUpdate::unchanged(slot, floater);
        let now = frame.time_s;
        let local = reading.hydrostatic_pressure_pa;

        match floater.state {
            FloaterState::Empty => {
                next.internal_pressure_pa = local;
                if reading.in_bottom_zone && frame.tank_pressure_pa >= self.p_min_pa {
                    next.enter(floater.id, FloaterState::Filling, now);
                    next.fill_started_s = Some(now - frame.dt_s);
                    next.commands.push(ActuatorCommand::OpenInjectionValve(floater.id));
                    self.fill_step(&mut next, floater, 0.0, local, frame);
                }
            }
            FloaterState::Filling => {
                let fill = floater.air_fill_level;
                self.fill_step(&mut next, floater, fill, local, frame);
            }
            FloaterState::Full => {
                if reading.in_top_zone {
                    next.enter(floater.id, FloaterState::Venting, now);
                    next.vent_started_s = Some(now - frame.dt_s);
                    next.vent_start_pressure_pa = floater.internal_pressure_pa;
                    next.commands.push(ActuatorCommand::OpenVentValve(floater.id));
                    self.vent_step(&mut next, floater, local, frame);
                }
            }
            FloaterState::Venting => self.vent_step(&mut next, floater, local, frame),
        }
        next
    }

    /// Inject for one step from `fill`, completing the fill when any
    /// criterion is met.
    fn fill_step(
        &self,
        next: &mut FloaterUpdate,
        floater: &Floater,
        fill: f64,
        local_pa: f64,
        frame: &SensorFrame,
    ) {
        let p = &self.params;
        let now = frame.time_s;
        let elapsed = now - next.fill_started_s.unwrap_or(now - frame.dt_s);

        let filled = (fill + frame.dt_s / p.fill_duration_s).min(1.0);
        let drive = (frame.tank_pressure_pa - local_pa).max(0.0);
        next.internal_pressure_pa = local_pa + drive * filled;

        let done = elapsed >= p.fill_duration_s
            || filled >= p.fill_target_fraction
            || next.internal_pressure_pa >= p.fill_target_pressure_pa;
        // A completed fill is booked up to the full volume.
        let level = if done { 1.0 } else { filled };
        let dv = (level - fill) * p.volume_m3;
        next.air_fill_level = level;
        next.injected_volume_m3 += dv;
        next.injection_work_j = frame.tank_pressure_pa * dv;

        if done {
            next.enter(floater.id, FloaterState::Full, now);
            next.fill_started_s = None;
            next.commands.push(ActuatorCommand::CloseInjectionValve(floater.id));
        }
    }

    /// Vent for one step, completing when time is up or the internal
    /// pressure has decayed to ambient.
    fn vent_step(
        &self,
        next: &mut FloaterUpdate,
        floater: &Floater,
        local_pa: f64,
        frame: &SensorFrame,
    ) {
        let p = &self.params;
        let now = frame.time_s;
        let elapsed = now - next.vent_started_s.unwrap_or(now - frame.dt_s);

        let decay = (-elapsed / p.vent_time_constant_s).exp();
        let internal = local_pa + (next.vent_start_pressure_pa - local_pa) * decay;
        let decayed = internal - local_pa <= p.vent_pressure_tolerance_pa;
        let done = elapsed >= p.vent_duration_s || decayed;

        let fill = if done {
            0.0
        } else {
            (1.0 - elapsed / p.vent_duration_s)
                .clamp(0.0, 1.0)
                .min(floater.air_fill_level)
        };
        let dv = (floater.air_fill_level - fill) * p.volume_m3;
        next.air_fill_level = fill;
        next.vented_volume_m3 += dv;
        next.vent_loss_j = (internal - local_pa).max(0.0) * dv;
        next.internal_pressure_pa = internal;

        if done {
            next.enter(floater.id, FloaterState::Empty, now);
            next.vent_started_s = None;
            next.internal_pressure_pa = local_pa;
            next.commands.push(ActuatorCommand::CloseVentValve(floater.id));
        }
    }

    /// Decide for every floater from `frame`, then apply all decisions.
    pub fn update(&self, floaters: &mut [Floater], frame: &SensorFrame) -> CycleOutcome {
        let updates: Vec<FloaterUpdate> = floaters
            .iter()
            .zip(&frame.floaters)
            .enumerate()
            .map(|(slot, (floater, reading))| self.decide(slot, floater, reading, frame))
            .collect();

        let mut outcome = CycleOutcome::default();
        for update in updates {
            let Some(floater) = floaters.get_mut(update.slot) else {
                continue;
            };
            floater.state = update.state;
            floater.air_fill_level = update.air_fill_level;
            floater.mass_kg = mass_for_fill(update.air_fill_level, &self.params, &self.environment);
            floater.internal_pressure_pa = update.internal_pressure_pa;
            floater.fill_started_s = update.fill_started_s;
            floater.vent_started_s = update.vent_started_s;
            floater.vent_start_pressure_pa = update.vent_start_pressure_pa;
            floater.injected_volume_m3 = update.injected_volume_m3;
            floater.vented_volume_m3 = update.vented_volume_m3;

            outcome.injection_work_j += update.injection_work_j;
            outcome.vent_loss_j += update.vent_loss_j;
            outcome.commands.extend(update.commands);
            for t in update.transitions {
                debug!(
                    floater = %t.floater,
                    from = t.from.as_str(),
                    to = t.to.as_str(),
                    time_s = t.time_s,
                    "floater transition"
                );
                outcome.transitions.push(t);
            }
        }
        outcome
    }
}
