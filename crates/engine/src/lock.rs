use flowsync_core::FlowRecord;
use tracing::warn;

use crate::error::EngineError;

/// Record-level write lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    Unlocked,
    Locked,
}

impl LockState {
    pub fn of(record: &FlowRecord) -> Self {
        if record.locked { Self::Locked } else { Self::Unlocked }
    }

    pub fn is_locked(self) -> bool {
        self == Self::Locked
    }

    /// Target state for a requested flag, or `None` when already there.
    pub fn transition(self, desired: bool) -> Option<LockState> {
        match (self, desired) {
            (Self::Unlocked, true) => Some(Self::Locked),
            (Self::Locked, false) => Some(Self::Unlocked),
            _ => None,
        }
    }
}

/// First step of every mutating operation. Rejects locked records before any
/// value is compared or written.
pub fn enforce(record: &FlowRecord) -> Result<(), EngineError> {
    if LockState::of(record).is_locked() {
        warn!(flow_id = %record.identifier, "write rejected: record is locked");
        return Err(EngineError::LockedRecord(record.identifier.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowsync_core::FlowId;

    #[test]
    fn only_two_transitions() {
        assert_eq!(LockState::Unlocked.transition(true), Some(LockState::Locked));
        assert_eq!(LockState::Locked.transition(false), Some(LockState::Unlocked));
        assert_eq!(LockState::Locked.transition(true), None);
        assert_eq!(LockState::Unlocked.transition(false), None);
    }

    #[test]
    fn enforce_rejects_locked() {
        let mut record = FlowRecord::new(FlowId::parse("cam-1").unwrap());
        assert!(enforce(&record).is_ok());
        record.locked = true;
        assert!(matches!(enforce(&record), Err(EngineError::LockedRecord(id)) if id == "cam-1"));
    }
}
