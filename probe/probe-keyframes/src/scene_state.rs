//! Named snapshots of an accepted scene.

use probe_types::{ProbeError, Result};
use tracing::debug;

use crate::{KeyframeStore, Snapshot};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Which named snapshot to address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Slot {
    /// Edited trajectories of the test objects.
    Violation,
    /// Physically faithful trajectories of the test objects.
    NonViolation,
    /// Background dynamic objects shielded from a re-simulation.
    Background,
}

impl Slot {
    /// Slot name, also used as the output directory name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Violation => "violation",
            Self::NonViolation => "non_violation",
            Self::Background => "background",
        }
    }
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The violation / non-violation pair of one scene.
///
/// Slots are only ever replaced wholesale.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SceneState {
    violation: Option<Snapshot>,
    non_violation: Option<Snapshot>,
    background: Option<Snapshot>,
}

impl SceneState {
    /// Create an empty scene state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `snapshot` in `slot`, replacing whatever was there.
    pub fn save(&mut self, slot: Slot, snapshot: Snapshot) {
        debug!(%slot, objects = snapshot.len(), "saving scene state");
        *self.slot_mut(slot) = Some(snapshot);
    }

    /// Snapshot held in `slot`.
    #[must_use]
    pub fn get(&self, slot: Slot) -> Option<&Snapshot> {
        match slot {
            Slot::Violation => self.violation.as_ref(),
            Slot::NonViolation => self.non_violation.as_ref(),
            Slot::Background => self.background.as_ref(),
        }
    }

    /// Restore the snapshot in `slot` into `store`.
    pub fn load(&self, slot: Slot, store: &mut KeyframeStore) -> Result<()> {
        let snapshot = self
            .get(slot)
            .ok_or_else(|| ProbeError::SlotEmpty(slot.as_str().to_string()))?;
        store.restore_all(snapshot)
    }

    /// Whether both the violation and non-violation slots are filled.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.violation.is_some() && self.non_violation.is_some()
    }

    fn slot_mut(&mut self, slot: Slot) -> &mut Option<Snapshot> {
        match slot {
            Slot::Violation => &mut self.violation,
            Slot::NonViolation => &mut self.non_violation,
            Slot::Background => &mut self.background,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use probe_types::{ObjectId, ObjectState, Point3};

    #[test]
    fn test_save_load_switches_trajectories() {
        let id = ObjectId(0);
        let mut store = KeyframeStore::new(2);
        for f in 0..=2 {
            store
                .record(id, f, ObjectState::at_rest(Point3::new(0.0, 0.0, 1.0)))
                .unwrap();
        }
        let mut state = SceneState::new();
        state.save(Slot::NonViolation, store.snapshot(&[id]));

        store
            .record(id, 2, ObjectState::at_rest(Point3::new(0.0, 0.0, -1.0)))
            .unwrap();
        state.save(Slot::Violation, store.snapshot(&[id]));
        assert!(state.is_complete());

        state.load(Slot::NonViolation, &mut store).unwrap();
        assert_eq!(store.read(id, 2).unwrap().position.z, 1.0);
        state.load(Slot::Violation, &mut store).unwrap();
        assert_eq!(store.read(id, 2).unwrap().position.z, -1.0);
    }

    #[test]
    fn test_load_empty_slot_fails() {
        let mut store = KeyframeStore::new(2);
        let err = SceneState::new()
            .load(Slot::Background, &mut store)
            .unwrap_err();
        assert_eq!(err, ProbeError::SlotEmpty("background".to_string()));
    }

    #[test]
    fn test_save_replaces_wholesale() {
        let mut state = SceneState::new();
        let mut first = Snapshot::new();
        first.insert(ObjectId(1), Default::default());
        first.insert(ObjectId(2), Default::default());
        state.save(Slot::Violation, first);
        let mut second = Snapshot::new();
        second.insert(ObjectId(3), Default::default());
        state.save(Slot::Violation, second);

        let ids: Vec<_> = state.get(Slot::Violation).unwrap().objects().collect();
        assert_eq!(ids, vec![ObjectId(3)]);
    }
}
