//! Change-notification signals emitted by motor adapters.
//!
//! Each motor owns a [`SignalRegistry`]: an explicit mapping from signal
//! kind to an ordered list of callback handles, dispatched synchronously in
//! registration order. There is no global event bus; consumers connect to
//! the specific motor they observe.
//!
//! Handlers run on the emitter's task and are expected to be quick (the
//! adapters only do trigonometric arithmetic in theirs). A handler must not
//! block; anything slow should forward the event into a channel.
//!
//! # Example
//!
//! ```rust,ignore
//! motor.signals().connect(MotorSignal::ValueChanged, |event| {
//!     if let MotorEvent::ValueChanged(value) = event {
//!         println!("value is now {value:?}");
//!     }
//! });
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::motor::state::MotorState;

/// The signal kinds a motor emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MotorSignal {
    /// The motor state changed.
    StateChanged,
    /// The motor position changed.
    PositionChanged,
    /// The motor value changed (same payload as position for plain motors;
    /// derived motors may eventually diverge).
    ValueChanged,
}

/// A signal together with its payload.
///
/// Position/value payloads are `Option<f64>`: derived motors such as the
/// resolution motor can legitimately have no current value (wavelength
/// unavailable, conversion domain error), and `None` means exactly that.
#[derive(Debug, Clone, PartialEq)]
pub enum MotorEvent {
    StateChanged(MotorState),
    PositionChanged(Option<f64>),
    ValueChanged(Option<f64>),
}

impl MotorEvent {
    /// The signal kind this event carries.
    pub fn signal(&self) -> MotorSignal {
        match self {
            MotorEvent::StateChanged(_) => MotorSignal::StateChanged,
            MotorEvent::PositionChanged(_) => MotorSignal::PositionChanged,
            MotorEvent::ValueChanged(_) => MotorSignal::ValueChanged,
        }
    }
}

/// Callback handle stored in a registry.
pub type SignalHandler = Arc<dyn Fn(&MotorEvent) + Send + Sync>;

/// Observer registry for one motor.
///
/// Handlers are invoked synchronously, in the order they were connected.
/// The handler list is snapshotted before dispatch, so a handler may
/// connect further handlers without deadlocking (they take effect from the
/// next emission).
#[derive(Default)]
pub struct SignalRegistry {
    handlers: RwLock<HashMap<MotorSignal, Vec<SignalHandler>>>,
}

impl SignalRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect a handler to a signal.
    pub fn connect<F>(&self, signal: MotorSignal, handler: F)
    where
        F: Fn(&MotorEvent) + Send + Sync + 'static,
    {
        self.handlers
            .write()
            .entry(signal)
            .or_default()
            .push(Arc::new(handler));
    }

    /// Emit an event to every handler connected to its signal.
    pub fn emit(&self, event: &MotorEvent) {
        let snapshot: Vec<SignalHandler> = match self.handlers.read().get(&event.signal()) {
            Some(handlers) => handlers.clone(),
            None => return,
        };
        for handler in snapshot {
            handler(event);
        }
    }

    /// Number of handlers connected to a signal.
    pub fn handler_count(&self, signal: MotorSignal) -> usize {
        self.handlers
            .read()
            .get(&signal)
            .map_or(0, |handlers| handlers.len())
    }
}

impl std::fmt::Debug for SignalRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let handlers = self.handlers.read();
        let mut map = f.debug_map();
        for (signal, list) in handlers.iter() {
            map.entry(signal, &list.len());
        }
        map.finish()
    }
}
