//! Tick orchestration.
//!
//! One [`Engine`] owns the whole plant. Each call to [`Engine::step`] runs
//! the fixed sequence:
//!
//! 0. apply queued parameter updates
//! 1. physics, using the commands staged by the previous tick
//! 2. sample sensors
//! 3. floater cycle, compressor, generator, clutch (in that order)
//! 4. stage commands for the next tick
//! 5. grid services, event dispatch, snapshot publication

use std::collections::VecDeque;
use std::mem::discriminant;
use std::sync::Arc;

use hl_core::timing::{AccumulatingTimer, Timer};
use tracing::{debug, error, info, warn};

use crate::clutch::{ClutchController, ClutchState};
use crate::commands::{ActuatorCommand, StagedCommands};
use crate::compressor::{CompressorController, CompressorState};
use crate::config::EngineConfig;
use crate::cycle::FloaterCycle;
use crate::dispatch::{EventCategory, EventDispatcher, EventHandler, SimEvent};
use crate::error::{SimError, SimResult};
use crate::extension::GridService;
use crate::faults::{Fault, FaultKind, FaultTracker};
use crate::floater::FloaterState;
use crate::generator::{GeneratorController, GeneratorState};
use crate::physics::PhysicsEngine;
use crate::plant::PlantState;
use crate::sensors::SensorFrame;
use crate::snapshot::{EnergyLedger, EngineStatus, FloaterSnapshot, TickSnapshot};
use crate::timestep::TimestepPolicy;
use crate::update::ParameterUpdate;

/// Receives every published snapshot. Must not block.
pub trait SnapshotSink: Send {
    fn publish(&self, snapshot: Arc<TickSnapshot>);
}

/// Simulated time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimClock {
    pub tick: u64,
    pub time_s: f64,
    /// Length of the next tick.
    pub dt_s: f64,
}

impl SimClock {
    pub fn new(dt_s: f64) -> Self {
        Self {
            tick: 0,
            time_s: 0.0,
            dt_s,
        }
    }

    fn advance(&mut self, dt: f64) {
        self.tick += 1;
        self.time_s += dt;
    }
}

/// Mutable state of one run; rebuilt by `reset`.
#[derive(Debug)]
struct RunState {
    plant: PlantState,
    clock: SimClock,
    staged: StagedCommands,
    compressor: CompressorState,
    generator: GeneratorState,
    clutch: ClutchState,
    faults: FaultTracker,
    ledger: EnergyLedger,
    status: EngineStatus,
    halt: Option<SimError>,
    latest: Option<Arc<TickSnapshot>>,
    tick_time: AccumulatingTimer,
}

impl RunState {
    fn new(config: &EngineConfig, physics: &PhysicsEngine) -> Self {
        let plant = PlantState::new(config);
        let clutch = ClutchState::default();
        let compressor = CompressorState::new(config.compressor.initially_active);
        let staged = StagedCommands::new(
            config.floater_count(),
            clutch.engagement(),
            compressor.is_on(),
        );
        let ledger = EnergyLedger::new(physics.kinetic_energy(&plant));
        Self {
            plant,
            clock: SimClock::new(config.timestep.dt_s),
            staged,
            compressor,
            generator: GeneratorState::default(),
            clutch,
            faults: FaultTracker::new(config.stability.max_consecutive_faults),
            ledger,
            status: EngineStatus::Running,
            halt: None,
            latest: None,
            tick_time: AccumulatingTimer::new(),
        }
    }
}

pub struct Engine {
    config: EngineConfig,
    physics: PhysicsEngine,
    cycle: FloaterCycle,
    compressor: CompressorController,
    generator: GeneratorController,
    clutch: ClutchController,
    timestep: TimestepPolicy,
    run: RunState,
    pending: VecDeque<ParameterUpdate>,
    dispatcher: EventDispatcher,
    services: Vec<Box<dyn GridService>>,
    sink: Option<Box<dyn SnapshotSink>>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("clock", &self.run.clock)
            .field("status", &self.run.status)
            .field("pending", &self.pending.len())
            .field("services", &self.services.len())
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Build an engine from a configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the configuration fails validation.
    pub fn new(config: EngineConfig) -> SimResult<Self> {
        config.validate()?;
        for warning in config.warnings() {
            warn!(%warning, "configuration warning");
        }

        let physics = PhysicsEngine::new(&config)?;
        let cycle = FloaterCycle::new(
            config.floaters.clone(),
            config.environment.clone(),
            config.compressor.p_min_pa,
        );
        let compressor = CompressorController::new(&config.compressor)?;
        let generator = GeneratorController::new(&config.generator)?;
        let clutch = ClutchController::new(&config.clutch)?;
        let timestep = TimestepPolicy::new(&config.timestep);
        let run = RunState::new(&config, &physics);

        info!(
            floaters = config.floater_count(),
            dt_s = config.timestep.dt_s,
            "engine initialised"
        );

        Ok(Self {
            config,
            physics,
            cycle,
            compressor,
            generator,
            clutch,
            timestep,
            run,
            pending: VecDeque::new(),
            dispatcher: EventDispatcher::new(),
            services: Vec::new(),
            sink: None,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn status(&self) -> EngineStatus {
        self.run.status
    }

    pub fn clock(&self) -> SimClock {
        self.run.clock
    }

    pub fn plant(&self) -> &PlantState {
        &self.run.plant
    }

    pub fn staged(&self) -> &StagedCommands {
        &self.run.staged
    }

    pub fn ledger(&self) -> &EnergyLedger {
        &self.run.ledger
    }

    pub fn generator_state(&self) -> &GeneratorState {
        &self.run.generator
    }

    pub fn clutch_state(&self) -> &ClutchState {
        &self.run.clutch
    }

    pub fn compressor_state(&self) -> &CompressorState {
        &self.run.compressor
    }

    /// Wall-clock cost of the ticks run since the last reset.
    pub fn tick_timing(&self) -> &AccumulatingTimer {
        &self.run.tick_time
    }

    pub fn kinetic_energy(&self) -> f64 {
        self.physics.kinetic_energy(&self.run.plant)
    }

    /// Most recent snapshot, if any tick has run.
    pub fn latest(&self) -> Option<Arc<TickSnapshot>> {
        self.run.latest.clone()
    }

    /// Queue a parameter change for the next tick boundary.
    pub fn queue_update(&mut self, update: ParameterUpdate) {
        self.pending.push_back(update);
    }

    pub fn register_handler(&mut self, category: EventCategory, handler: EventHandler) {
        self.dispatcher.register(category, handler);
    }

    pub fn add_service(&mut self, service: Box<dyn GridService>) {
        info!(service = service.name(), "grid service registered");
        self.services.push(service);
    }

    pub fn set_sink(&mut self, sink: Box<dyn SnapshotSink>) {
        self.sink = Some(sink);
    }

    /// Return to the initial state of the current configuration.
    ///
    /// Handlers, services, the sink and queued updates are kept.
    pub fn reset(&mut self) {
        self.run = RunState::new(&self.config, &self.physics);
        for service in &mut self.services {
            service.reset();
        }
        info!("engine reset");
    }

    /// Run one tick.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Halted`] on the tick that exhausts the fault
    /// budget (its snapshot is still published) and on every later call until
    /// [`Engine::reset`].
    pub fn step(&mut self) -> SimResult<Arc<TickSnapshot>> {
        if let Some(err) = &self.run.halt {
            return Err(err.clone());
        }
        let timer = Timer::start("tick");
        let tick = self.run.clock.tick + 1;
        let mut events = Vec::new();

        self.apply_pending(tick, &mut events);

        // Physics
        let dt = self.run.clock.dt_s;
        let applied_torque_nm = self.run.staged.effective_torque_nm();
        let report = self.physics.advance(&mut self.run.plant, &self.run.staged, dt);
        self.run.clock.advance(dt);
        let now = self.run.clock.time_s;
        self.run.ledger.record_step(&report.work, self.generator.efficiency);
        self.run.ledger.compressor_input_j += report.compressor_energy_j;
        let mut faults = report.faults;

        // Sensors
        let frame = SensorFrame::sample(&self.run.plant, &self.physics, now, dt);

        // Floater cycle
        let mass_before = self.run.plant.floater_mass();
        faults.extend(self.cycle.verify(&mut self.run.plant.floaters));
        let outcome = self.cycle.update(&mut self.run.plant.floaters, &frame);
        let mass_after = self.run.plant.floater_mass();
        let v = self.run.plant.chain.velocity_m_s;
        self.run.ledger.mass_exchange_j += 0.5 * (mass_after - mass_before) * v * v;
        self.run.ledger.injection_work_j += outcome.injection_work_j;
        self.run.ledger.vent_loss_j += outcome.vent_loss_j;
        events.extend(
            outcome
                .transitions
                .iter()
                .map(|&transition| SimEvent::FloaterTransition { tick, transition }),
        );

        // Compressor
        let any_filling = self.run.plant.any_in_state(FloaterState::Filling);
        let compressor = self.compressor.update(
            &self.run.compressor,
            frame.tank_pressure_pa,
            any_filling,
            now,
            dt,
        );
        if compressor.is_on() != self.run.compressor.is_on() {
            events.push(SimEvent::CompressorSwitched {
                tick,
                on: compressor.is_on(),
            });
        }

        // Generator
        let mechanical_w = report.work.generator_j / dt;
        let power_w = self.generator.electrical_power(mechanical_w);
        let (generator, generator_out) = self.generator.update(
            &self.run.generator,
            frame.omega_rad_s,
            power_w,
            self.run.clutch.is_disengaged(),
            dt,
        );
        faults.extend(generator_out.faults);

        // Clutch
        let clutch = self
            .clutch
            .update(&self.run.clutch, frame.net_drive_torque_nm, now, dt);
        if clutch.target_engaged != self.run.clutch.target_engaged {
            events.push(SimEvent::ClutchSwitched {
                tick,
                engaged: clutch.target_engaged,
            });
        }

        // Stage
        let mut commands = outcome.commands;
        commands.push(ActuatorCommand::SetGeneratorTorque(generator_out.command_nm));
        commands.push(ActuatorCommand::SetClutchEngagement(clutch.engagement()));
        commands.push(if compressor.is_on() {
            ActuatorCommand::CompressorOn
        } else {
            ActuatorCommand::CompressorOff
        });
        stage_commands(&mut self.run.staged, commands, &mut faults);
        self.run.compressor = compressor;
        self.run.generator = generator;
        self.run.clutch = clutch;

        // Faults
        for fault in &faults {
            if fault.kind.counts_toward_budget() {
                warn!(
                    tick,
                    component = %fault.component,
                    kind = %fault.kind,
                    detail = %fault.detail,
                    "recovered from fault"
                );
            }
            events.push(SimEvent::Fault {
                tick,
                fault: fault.clone(),
            });
        }
        let cutback = faults.iter().any(|f| f.kind.requires_cutback());
        let halt = self.run.faults.observe(&faults).map(|exceeded| {
            error!(
                tick,
                component = %exceeded.component,
                kind = %exceeded.kind,
                count = exceeded.count,
                "fault budget exhausted; engine halted"
            );
            self.run.status = EngineStatus::Halted {
                tick,
                component: exceeded.component,
                kind: exceeded.kind,
            };
            events.push(SimEvent::Halted {
                tick,
                component: exceeded.component,
                kind: exceeded.kind,
                count: exceeded.count,
            });
            SimError::Halted {
                tick,
                component: exceeded.component,
                kind: exceeded.kind,
                count: exceeded.count,
            }
        });

        let mut snapshot = self.build_snapshot(
            report.acceleration_m_s2,
            applied_torque_nm,
            power_w,
            faults,
        );

        // Grid services; stall and overspeed overrides take precedence
        if halt.is_none() && !self.services.is_empty() {
            let adjustment: f64 = self
                .services
                .iter_mut()
                .map(|s| s.torque_adjustment(&snapshot))
                .sum();
            let overridden = self.run.generator.stalled || self.run.generator.overspeeding;
            if adjustment != 0.0 && !overridden {
                let base = self.run.staged.generator_torque_nm;
                let torque = self.generator.pid.clamp_output(base + adjustment, base);
                self.run.staged.generator_torque_nm = torque;
                snapshot.generator_command_nm = torque;
            }
        }

        // Next tick length
        let compute_s = timer.stop();
        self.run.tick_time.record(compute_s);
        let next_dt = self.timestep.next(dt, compute_s, cutback);
        if next_dt != dt {
            debug!(tick, from_s = dt, to_s = next_dt, cutback, "tick length changed");
            events.push(SimEvent::TimestepChanged {
                tick,
                from_s: dt,
                to_s: next_dt,
            });
        }
        self.run.clock.dt_s = next_dt;

        events.push(SimEvent::TickCompleted { tick, time_s: now });
        events.push(SimEvent::TickTiming { tick, compute_s });
        self.dispatcher.dispatch(&events);

        let snapshot = Arc::new(snapshot);
        if let Some(sink) = &self.sink {
            sink.publish(Arc::clone(&snapshot));
        }
        self.run.latest = Some(Arc::clone(&snapshot));

        match halt {
            Some(err) => {
                self.run.halt = Some(err.clone());
                Err(err)
            }
            None => Ok(snapshot),
        }
    }

    /// Step until simulated time reaches `t_end_s`.
    ///
    /// Returns the last snapshot, or the initial one if no tick was needed.
    pub fn run_until(&mut self, t_end_s: f64) -> SimResult<Arc<TickSnapshot>> {
        let mut last = None;
        while self.run.clock.time_s + 1e-9 < t_end_s {
            last = Some(self.step()?);
        }
        Ok(last.unwrap_or_else(|| Arc::new(self.initial_snapshot())))
    }

    /// Snapshot of the current state without stepping.
    pub fn initial_snapshot(&self) -> TickSnapshot {
        self.build_snapshot(0.0, self.run.staged.effective_torque_nm(), 0.0, Vec::new())
    }

    fn build_snapshot(
        &self,
        acceleration_m_s2: f64,
        applied_torque_nm: f64,
        power_w: f64,
        faults: Vec<Fault>,
    ) -> TickSnapshot {
        let run = &self.run;
        let radius = self.physics.drivetrain.sprocket_radius_m;
        let v = run.plant.chain.velocity_m_s;
        TickSnapshot {
            tick: run.clock.tick,
            time_s: run.clock.time_s,
            dt_s: run.clock.dt_s,
            status: run.status,
            chain_velocity_m_s: v,
            omega_rad_s: run.plant.chain.omega_rad_s(radius),
            acceleration_m_s2,
            generator_torque_nm: applied_torque_nm,
            generator_command_nm: run.staged.generator_torque_nm,
            generator_power_w: power_w,
            clutch_engagement: run.clutch.engagement(),
            clutch_target_engaged: run.clutch.target_engaged,
            flywheel_energy_j: self.physics.drivetrain.rotational_energy(v),
            kinetic_energy_j: self.physics.kinetic_energy(&run.plant),
            tank_pressure_pa: run.plant.tank.pressure_pa,
            compressor_active: run.compressor.is_on(),
            floaters: run
                .plant
                .floaters
                .iter()
                .map(|f| FloaterSnapshot {
                    id: f.id,
                    state: f.state,
                    air_fill_level: f.air_fill_level,
                    position_m: f.position_m,
                    phase_rad: f.phase_rad,
                    mass_kg: f.mass_kg,
                })
                .collect(),
            energy: run.ledger,
            faults,
        }
    }

    fn apply_pending(&mut self, tick: u64, events: &mut Vec<SimEvent>) {
        while let Some(update) = self.pending.pop_front() {
            match self.apply_update(&update) {
                Ok(()) => {
                    info!(tick, update = update.label(), "parameter update applied");
                    events.push(SimEvent::ParameterApplied { tick, update });
                }
                Err(err) => {
                    warn!(tick, update = update.label(), %err, "parameter update rejected");
                    events.push(SimEvent::ParameterRejected {
                        tick,
                        update,
                        reason: err.to_string(),
                    });
                }
            }
        }
    }

    fn apply_update(&mut self, update: &ParameterUpdate) -> SimResult<()> {
        let next = update.applied_to(&self.config)?;
        match update {
            ParameterUpdate::GeneratorSetpoint { .. }
            | ParameterUpdate::GeneratorGains { .. }
            | ParameterUpdate::TorqueLimits { .. } => {
                let generator = GeneratorController::new(&next.generator)?;
                if discriminant(&generator.setpoint) != discriminant(&self.generator.setpoint) {
                    self.run.generator.pid = Default::default();
                }
                self.generator = generator;
            }
            ParameterUpdate::PressureBand { .. } => {
                self.compressor = CompressorController::new(&next.compressor)?;
                self.cycle.p_min_pa = next.compressor.p_min_pa;
                self.physics.compressor = next.compressor.clone();
            }
            ParameterUpdate::ClutchMode { .. } => {
                self.clutch = ClutchController::new(&next.clutch)?;
                self.run.clutch.restart_cycle(self.run.clock.time_s);
            }
            ParameterUpdate::Timestep { .. } => {
                self.timestep = TimestepPolicy::new(&next.timestep);
                self.run.clock.dt_s = next.timestep.dt_s;
            }
        }
        self.config = next;
        Ok(())
    }
}

/// Fold `commands` into the staging buffer. A command the buffer rejects is
/// dropped and reported as an `InvalidState` fault.
fn stage_commands(
    staged: &mut StagedCommands,
    commands: Vec<ActuatorCommand>,
    faults: &mut Vec<Fault>,
) {
    for command in commands {
        if let Err(err) = staged.apply(command) {
            faults.push(Fault::new(
                FaultKind::InvalidState,
                command.component(),
                format!("command {command:?} rejected: {err}"),
            ));
        }
    }
}
