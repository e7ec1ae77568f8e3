//! Frame-indexed state records.

use std::collections::BTreeMap;

use probe_types::{Frame, ObjectId, ObjectState};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Ordered per-frame states of one object.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Timeline {
    frames: BTreeMap<Frame, ObjectState>,
}

impl Timeline {
    /// Create an empty timeline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the state at `frame`.
    pub fn insert(&mut self, frame: Frame, state: ObjectState) {
        self.frames.insert(frame, state);
    }

    /// State at `frame`, if recorded.
    #[must_use]
    pub fn get(&self, frame: Frame) -> Option<&ObjectState> {
        self.frames.get(&frame)
    }

    /// Number of recorded frames.
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Recorded frames in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = (Frame, &ObjectState)> {
        self.frames.iter().map(|(f, s)| (*f, s))
    }

    /// First and last recorded frame.
    #[must_use]
    pub fn span(&self) -> Option<(Frame, Frame)> {
        let first = self.frames.keys().next()?;
        let last = self.frames.keys().next_back()?;
        Some((*first, *last))
    }

    /// Whether every frame in `0..=frame_end` has a record.
    #[must_use]
    pub fn is_complete(&self, frame_end: Frame) -> bool {
        (0..=frame_end).all(|f| self.frames.contains_key(&f))
    }

    /// Drop every record after `frame`.
    pub fn truncate_after(&mut self, frame: Frame) {
        self.frames.retain(|f, _| *f <= frame);
    }
}

impl FromIterator<(Frame, ObjectState)> for Timeline {
    fn from_iter<I: IntoIterator<Item = (Frame, ObjectState)>>(iter: I) -> Self {
        Self {
            frames: iter.into_iter().collect(),
        }
    }
}

/// Deep copy of a set of timelines, keyed by object.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Snapshot {
    timelines: BTreeMap<ObjectId, Timeline>,
}

impl Snapshot {
    /// Create an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an object's timeline, replacing any previous one.
    pub fn insert(&mut self, id: ObjectId, timeline: Timeline) {
        self.timelines.insert(id, timeline);
    }

    /// Timeline captured for `id`.
    #[must_use]
    pub fn get(&self, id: ObjectId) -> Option<&Timeline> {
        self.timelines.get(&id)
    }

    /// Objects contained in the snapshot, ascending.
    pub fn objects(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.timelines.keys().copied()
    }

    /// All captured timelines.
    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &Timeline)> {
        self.timelines.iter().map(|(id, t)| (*id, t))
    }

    /// Number of objects captured.
    #[must_use]
    pub fn len(&self) -> usize {
        self.timelines.len()
    }

    /// Whether no object was captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.timelines.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use probe_types::Point3;

    fn state(z: f64) -> ObjectState {
        ObjectState::at_rest(Point3::new(0.0, 0.0, z))
    }

    #[test]
    fn test_insert_overwrites() {
        let mut t = Timeline::new();
        t.insert(3, state(1.0));
        t.insert(3, state(2.0));
        assert_eq!(t.len(), 1);
        assert_eq!(t.get(3).unwrap().position.z, 2.0);
    }

    #[test]
    fn test_span_and_completeness() {
        let t: Timeline = (0..=4).map(|f| (f, state(f64::from(f)))).collect();
        assert_eq!(t.span(), Some((0, 4)));
        assert!(t.is_complete(4));
        assert!(!t.is_complete(5));
    }

    #[test]
    fn test_truncate_after() {
        let mut t: Timeline = (0..=9).map(|f| (f, state(0.0))).collect();
        t.truncate_after(4);
        assert_eq!(t.span(), Some((0, 4)));
    }

    #[test]
    fn test_snapshot_objects_sorted() {
        let mut s = Snapshot::new();
        s.insert(ObjectId(5), Timeline::new());
        s.insert(ObjectId(2), Timeline::new());
        let ids: Vec<_> = s.objects().collect();
        assert_eq!(ids, vec![ObjectId(2), ObjectId(5)]);
    }
}
