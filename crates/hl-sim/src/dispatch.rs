//! Typed event dispatch.
//!
//! Handlers register against one [`EventCategory`]. At the end of each tick
//! the engine hands the tick's events to [`EventDispatcher::dispatch`], which
//! walks the categories in a fixed order (emergency first) and calls each
//! handler synchronously.

use serde::{Deserialize, Serialize};

use crate::cycle::Transition;
use crate::faults::{Component, Fault, FaultKind};
use crate::update::ParameterUpdate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    Emergency,
    Transient,
    Config,
    Simulation,
    Performance,
}

impl EventCategory {
    /// Dispatch order.
    pub const ALL: [EventCategory; 5] = [
        Self::Emergency,
        Self::Transient,
        Self::Config,
        Self::Simulation,
        Self::Performance,
    ];

    fn slot(self) -> usize {
        match self {
            Self::Emergency => 0,
            Self::Transient => 1,
            Self::Config => 2,
            Self::Simulation => 3,
            Self::Performance => 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SimEvent {
    Halted {
        tick: u64,
        component: Component,
        kind: FaultKind,
        count: u32,
    },
    Fault {
        tick: u64,
        fault: Fault,
    },
    FloaterTransition {
        tick: u64,
        transition: Transition,
    },
    ClutchSwitched {
        tick: u64,
        engaged: bool,
    },
    CompressorSwitched {
        tick: u64,
        on: bool,
    },
    ParameterApplied {
        tick: u64,
        update: ParameterUpdate,
    },
    ParameterRejected {
        tick: u64,
        update: ParameterUpdate,
        reason: String,
    },
    TickCompleted {
        tick: u64,
        time_s: f64,
    },
    TimestepChanged {
        tick: u64,
        from_s: f64,
        to_s: f64,
    },
    TickTiming {
        tick: u64,
        compute_s: f64,
    },
}

impl SimEvent {
    pub fn category(&self) -> EventCategory {
        match self {
            Self::Halted { .. } => EventCategory::Emergency,
            Self::Fault { fault, .. } if fault.kind.requires_cutback() => EventCategory::Emergency,
            Self::Fault { .. }
            | Self::FloaterTransition { .. }
            | Self::ClutchSwitched { .. }
            | Self::CompressorSwitched { .. } => EventCategory::Transient,
            Self::ParameterApplied { .. } | Self::ParameterRejected { .. } => {
                EventCategory::Config
            }
            Self::TickCompleted { .. } => EventCategory::Simulation,
            Self::TimestepChanged { .. } | Self::TickTiming { .. } => EventCategory::Performance,
        }
    }
}

pub type EventHandler = Box<dyn FnMut(&SimEvent) + Send>;

/// Fixed table of handlers, one list per category.
#[derive(Default)]
pub struct EventDispatcher {
    handlers: [Vec<EventHandler>; 5],
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counts: Vec<usize> = self.handlers.iter().map(Vec::len).collect();
        f.debug_struct("EventDispatcher")
            .field("handlers", &counts)
            .finish()
    }
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, category: EventCategory, handler: EventHandler) {
        self.handlers[category.slot()].push(handler);
    }

    /// Deliver `events` category by category, in registration order within
    /// each category.
    pub fn dispatch(&mut self, events: &[SimEvent]) {
        for category in EventCategory::ALL {
            let handlers = &mut self.handlers[category.slot()];
            if handlers.is_empty() {
                continue;
            }
            for event in events.iter().filter(|e| e.category() == category) {
                for handler in handlers.iter_mut() {
                    handler(event);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn categories_run_in_fixed_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut dispatcher = EventDispatcher::new();
        for category in [EventCategory::Performance, EventCategory::Emergency, EventCategory::Simulation] {
            let seen = Arc::clone(&seen);
            dispatcher.register(
                category,
                Box::new(move |e: &SimEvent| seen.lock().unwrap().push(e.category())),
            );
        }

        let events = vec![
            SimEvent::TickTiming {
                tick: 1,
                compute_s: 0.001,
            },
            SimEvent::TickCompleted {
                tick: 1,
                time_s: 0.1,
            },
            SimEvent::Halted {
                tick: 1,
                component: Component::Physics,
                kind: FaultKind::InvalidState,
                count: 11,
            },
        ];
        dispatcher.dispatch(&events);

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                EventCategory::Emergency,
                EventCategory::Simulation,
                EventCategory::Performance
            ]
        );
    }

    #[test]
    fn stall_faults_are_transient() {
        let event = SimEvent::Fault {
            tick: 0,
            fault: Fault::new(FaultKind::StallCondition, Component::Generator, "slow"),
        };
        assert_eq!(event.category(), EventCategory::Transient);
        let event = SimEvent::Fault {
            tick: 0,
            fault: Fault::new(FaultKind::OutOfBounds, Component::Tank, "high"),
        };
        assert_eq!(event.category(), EventCategory::Emergency);
    }
}
