//! Threaded live runtime.
//!
//! The engine lives on one worker thread. Front ends talk to it through a
//! command channel that is drained only between ticks, and read results from
//! a [`LatestSlot`].

use std::sync::mpsc::{Receiver, Sender, TryRecvError, channel};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use hl_sim::config::EngineConfig;
use hl_sim::{Engine, ParameterUpdate, SimError, TickSnapshot};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::slot::LatestSlot;

#[derive(Debug, Clone, PartialEq)]
pub enum ServiceCommand {
    Start,
    Stop,
    Reset,
    Update(ParameterUpdate),
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    /// Waiting for `Start`.
    Paused,
    Running,
    /// Fault budget exhausted; only `Reset` or `Shutdown` are useful.
    Halted,
    Stopped,
}

/// Handle to a simulation running on its own thread.
pub struct SimulationService {
    session_id: Uuid,
    commands: Sender<ServiceCommand>,
    slot: LatestSlot,
    state: Arc<Mutex<ServiceState>>,
    handle: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for SimulationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationService")
            .field("session_id", &self.session_id)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl SimulationService {
    /// Build the engine and spawn its thread, paused.
    ///
    /// `real_time_factor` paces simulated time against wall time (2.0 runs
    /// twice as fast as real time); `None` runs unpaced.
    ///
    /// # Errors
    ///
    /// Returns error if the configuration is rejected.
    pub fn spawn(config: EngineConfig, real_time_factor: Option<f64>) -> AppResult<Self> {
        if let Some(rtf) = real_time_factor
            && !(rtf.is_finite() && rtf > 0.0)
        {
            return Err(AppError::InvalidInput(format!(
                "real-time factor must be positive, got {rtf}"
            )));
        }

        let mut engine = Engine::new(config)?;
        let slot = LatestSlot::new();
        slot.publish(Arc::new(engine.initial_snapshot()));
        engine.set_sink(Box::new(slot.clone()));

        let session_id = Uuid::new_v4();
        let state = Arc::new(Mutex::new(ServiceState::Paused));
        let (tx, rx) = channel();

        let worker = Worker {
            engine,
            commands: rx,
            slot: slot.clone(),
            state: Arc::clone(&state),
            pacing: real_time_factor,
        };
        let handle = thread::Builder::new()
            .name(format!("hl-sim-{session_id}"))
            .spawn(move || worker.run())?;

        info!(%session_id, ?real_time_factor, "simulation service started");
        Ok(Self {
            session_id,
            commands: tx,
            slot,
            state,
            handle: Some(handle),
        })
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn state(&self) -> ServiceState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn slot(&self) -> &LatestSlot {
        &self.slot
    }

    pub fn latest(&self) -> Option<Arc<TickSnapshot>> {
        self.slot.latest()
    }

    /// # Errors
    ///
    /// Returns [`AppError::ServiceStopped`] once the worker has exited.
    pub fn send(&self, command: ServiceCommand) -> AppResult<()> {
        self.commands
            .send(command)
            .map_err(|_| AppError::ServiceStopped)
    }

    pub fn start(&self) -> AppResult<()> {
        self.send(ServiceCommand::Start)
    }

    pub fn stop(&self) -> AppResult<()> {
        self.send(ServiceCommand::Stop)
    }

    pub fn reset(&self) -> AppResult<()> {
        self.send(ServiceCommand::Reset)
    }

    pub fn update(&self, update: ParameterUpdate) -> AppResult<()> {
        self.send(ServiceCommand::Update(update))
    }

    /// Stop the worker and wait for it to exit.
    pub fn shutdown(mut self) -> AppResult<()> {
        self.join()
    }

    fn join(&mut self) -> AppResult<()> {
        let _ = self.commands.send(ServiceCommand::Shutdown);
        if let Some(handle) = self.handle.take() {
            handle
                .join()
                .map_err(|_| AppError::Simulation("simulation thread panicked".to_string()))?;
        }
        Ok(())
    }
}

impl Drop for SimulationService {
    fn drop(&mut self) {
        if let Err(err) = self.join() {
            error!(%err, "simulation service did not shut down cleanly");
        }
    }
}

struct Worker {
    engine: Engine,
    commands: Receiver<ServiceCommand>,
    slot: LatestSlot,
    state: Arc<Mutex<ServiceState>>,
    pacing: Option<f64>,
}

/// Wall/simulated time pair that pacing measures from.
#[derive(Clone, Copy)]
struct PaceAnchor {
    wall: Instant,
    sim_s: f64,
}

impl Worker {
    fn set_state(&self, next: ServiceState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = next;
    }

    fn state(&self) -> ServiceState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn run(mut self) {
        let mut anchor = None;
        loop {
            if !self.drain_commands(&mut anchor) {
                break;
            }
            if self.state() != ServiceState::Running {
                continue;
            }

            match self.engine.step() {
                Ok(_) => {}
                Err(err @ SimError::Halted { .. }) => {
                    warn!(%err, "live simulation halted");
                    self.set_state(ServiceState::Halted);
                    continue;
                }
                Err(err) => {
                    error!(%err, "live simulation failed");
                    break;
                }
            }

            if let (Some(rtf), Some(a)) = (self.pacing, anchor) {
                let sim_elapsed = self.engine.clock().time_s - a.sim_s;
                let due = Duration::from_secs_f64((sim_elapsed / rtf).max(0.0));
                if let Some(wait) = due.checked_sub(a.wall.elapsed()) {
                    thread::sleep(wait);
                }
            }
        }
        self.set_state(ServiceState::Stopped);
        debug!("simulation worker exited");
    }

    /// Apply pending commands. Blocks while not running.
    ///
    /// Returns false when the worker should exit.
    fn drain_commands(&mut self, anchor: &mut Option<PaceAnchor>) -> bool {
        loop {
            let command = if self.state() == ServiceState::Running {
                match self.commands.try_recv() {
                    Ok(command) => command,
                    Err(TryRecvError::Empty) => return true,
                    Err(TryRecvError::Disconnected) => return false,
                }
            } else {
                match self.commands.recv() {
                    Ok(command) => command,
                    Err(_) => return false,
                }
            };

            match command {
                ServiceCommand::Start => {
                    if self.state() == ServiceState::Paused {
                        self.set_state(ServiceState::Running);
                        *anchor = Some(self.anchor());
                    }
                }
                ServiceCommand::Stop => {
                    if self.state() == ServiceState::Running {
                        self.set_state(ServiceState::Paused);
                    }
                }
                ServiceCommand::Reset => {
                    self.engine.reset();
                    self.slot.publish(Arc::new(self.engine.initial_snapshot()));
                    if self.state() == ServiceState::Halted {
                        self.set_state(ServiceState::Paused);
                    }
                    *anchor = Some(self.anchor());
                }
                ServiceCommand::Update(update) => {
                    debug!(update = update.label(), "parameter update queued");
                    self.engine.queue_update(update);
                }
                ServiceCommand::Shutdown => return false,
            }
        }
    }

    fn anchor(&self) -> PaceAnchor {
        PaceAnchor {
            wall: Instant::now(),
            sim_s: self.engine.clock().time_s,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wait_for(service: &SimulationService, pred: impl Fn(&SimulationService) -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(10);
        while Instant::now() < deadline {
            if pred(service) {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        false
    }

    #[test]
    fn starts_paused_with_initial_snapshot() {
        let service = SimulationService::spawn(EngineConfig::default(), None).unwrap();
        assert_eq!(service.state(), ServiceState::Paused);
        assert_eq!(service.latest().unwrap().tick, 0);
        service.shutdown().unwrap();
    }

    #[test]
    fn start_stop_reset() {
        let service = SimulationService::spawn(EngineConfig::default(), None).unwrap();
        service.start().unwrap();
        assert!(wait_for(&service, |s| s.slot().published() > 20));
        service.stop().unwrap();
        assert!(wait_for(&service, |s| s.state() == ServiceState::Paused));

        let paused_at = service.latest().unwrap().tick;
        thread::sleep(Duration::from_millis(20));
        assert_eq!(service.latest().unwrap().tick, paused_at);

        service.reset().unwrap();
        assert!(wait_for(&service, |s| s.latest().is_some_and(|l| l.tick == 0)));
        service.shutdown().unwrap();
    }

    #[test]
    fn updates_apply_between_ticks() {
        let service = SimulationService::spawn(EngineConfig::default(), None).unwrap();
        service
            .update(ParameterUpdate::Timestep { dt_s: 0.05 })
            .unwrap();
        service.start().unwrap();
        assert!(wait_for(&service, |s| {
            s.latest().is_some_and(|l| l.tick > 0 && (l.dt_s - 0.05).abs() < 1e-12)
        }));
        service.shutdown().unwrap();
    }

    #[test]
    fn halt_is_reported_and_reset_recovers() {
        let mut config = EngineConfig::default();
        config.stability.v_max_m_s = 1e-3;
        config.stability.max_consecutive_faults = 2;
        let service = SimulationService::spawn(config, None).unwrap();
        service.start().unwrap();
        assert!(wait_for(&service, |s| s.state() == ServiceState::Halted));
        assert!(service.latest().unwrap().status.is_halted());

        service.reset().unwrap();
        assert!(wait_for(&service, |s| s.state() == ServiceState::Paused));
        assert!(!service.latest().unwrap().status.is_halted());
        service.shutdown().unwrap();
    }

    #[test]
    fn paced_run_tracks_wall_clock() {
        let service = SimulationService::spawn(EngineConfig::default(), Some(10.0)).unwrap();
        let started = Instant::now();
        service.start().unwrap();
        assert!(wait_for(&service, |s| s.latest().is_some_and(|l| l.time_s >= 1.0)));
        // one simulated second at 10x takes about 100 ms
        assert!(started.elapsed() >= Duration::from_millis(80));
        service.shutdown().unwrap();
    }

    #[test]
    fn rejects_bad_pacing() {
        assert!(matches!(
            SimulationService::spawn(EngineConfig::default(), Some(0.0)),
            Err(AppError::InvalidInput(_))
        ));
    }
}
