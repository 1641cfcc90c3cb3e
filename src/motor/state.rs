//! Motor state enumeration and backend state-name mapping.

use serde::{Deserialize, Serialize};

/// State of a motorized axis as seen through the generic motor contract.
///
/// Backends report their state as free-form name strings; [`MotorState`]
/// is the common vocabulary the rest of the station works with. Names
/// that do not map onto a variant degrade to [`MotorState::Unknown`]
/// rather than failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MotorState {
    Initializing,
    On,
    Off,
    Ready,
    Busy,
    Moving,
    Standby,
    Disabled,
    Unknown,
    Alarm,
    Fault,
    Invalid,
    Offline,
    LowLimit,
    HighLimit,
}

impl MotorState {
    /// Map a backend state name onto a variant.
    ///
    /// Matching is case-insensitive against an explicit table; anything
    /// unlisted returns `None` (callers fall back to `Unknown`).
    pub fn from_name(name: &str) -> Option<Self> {
        let state = match name.to_ascii_uppercase().as_str() {
            "INITIALIZING" => MotorState::Initializing,
            "ON" => MotorState::On,
            "OFF" => MotorState::Off,
            "READY" => MotorState::Ready,
            "BUSY" => MotorState::Busy,
            "MOVING" => MotorState::Moving,
            "STANDBY" => MotorState::Standby,
            "DISABLED" => MotorState::Disabled,
            "UNKNOWN" => MotorState::Unknown,
            "ALARM" => MotorState::Alarm,
            "FAULT" => MotorState::Fault,
            "INVALID" => MotorState::Invalid,
            "OFFLINE" => MotorState::Offline,
            "LOWLIMIT" => MotorState::LowLimit,
            "HIGHLIMIT" => MotorState::HighLimit,
            _ => return None,
        };
        Some(state)
    }

    /// Collapse a set of backend state names into a single state.
    ///
    /// A backend can report several concurrent states (e.g. `READY` plus a
    /// limit flag). The most severe recognized state wins, so a limit or
    /// fault is never masked by an accompanying `READY`. No recognized
    /// name at all yields [`MotorState::Unknown`].
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names
            .into_iter()
            .filter_map(|name| Self::from_name(name.as_ref()))
            .max_by_key(|state| state.severity())
            .unwrap_or(MotorState::Unknown)
    }

    /// Relative severity used to pick a single state out of a set.
    fn severity(self) -> u8 {
        match self {
            MotorState::Ready => 0,
            MotorState::On => 1,
            MotorState::Off => 2,
            MotorState::Standby => 3,
            MotorState::Initializing => 4,
            MotorState::Busy => 5,
            MotorState::Moving => 6,
            MotorState::HighLimit => 7,
            MotorState::LowLimit => 8,
            MotorState::Disabled => 9,
            MotorState::Offline => 10,
            MotorState::Invalid => 11,
            MotorState::Alarm => 12,
            MotorState::Fault => 13,
            MotorState::Unknown => 14,
        }
    }
}
