//! The keyframe store.

use hashbrown::HashMap;
use probe_types::{Frame, ObjectId, ObjectState, ProbeError, Result};
use tracing::trace;

use crate::{Snapshot, Timeline};

/// Receiver of interpolation control points.
///
/// A renderer that keeps its own animation curves implements this to learn
/// about every keyframe written. The store notifies the sink on every
/// [`KeyframeStore::record`], including the writes a restore performs.
pub trait KeyframeSink: std::fmt::Debug {
    /// A control point now exists for `object` at `frame`.
    fn control_point(&mut self, object: ObjectId, frame: Frame);

    /// Every control point of `object` was dropped.
    fn cleared(&mut self, _object: ObjectId) {}
}

/// Sink that ignores every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl KeyframeSink for NullSink {
    fn control_point(&mut self, _object: ObjectId, _frame: Frame) {}
}

/// Per-object timelines for one scene.
#[derive(Debug)]
pub struct KeyframeStore {
    frame_end: Frame,
    timelines: HashMap<ObjectId, Timeline>,
    sink: Box<dyn KeyframeSink>,
    write_count: u64,
}

impl KeyframeStore {
    /// Create an empty store for frames `0..=frame_end`.
    #[must_use]
    pub fn new(frame_end: Frame) -> Self {
        Self::with_sink(frame_end, Box::new(NullSink))
    }

    /// Create an empty store that forwards control points to `sink`.
    #[must_use]
    pub fn with_sink(frame_end: Frame, sink: Box<dyn KeyframeSink>) -> Self {
        Self {
            frame_end,
            timelines: HashMap::new(),
            sink,
            write_count: 0,
        }
    }

    /// Last valid frame.
    #[must_use]
    pub fn frame_end(&self) -> Frame {
        self.frame_end
    }

    /// Total number of records written, restores included.
    #[must_use]
    pub fn write_count(&self) -> u64 {
        self.write_count
    }

    /// Write one state record, overwriting any previous one at `frame`.
    pub fn record(&mut self, object: ObjectId, frame: Frame, state: ObjectState) -> Result<()> {
        if frame > self.frame_end {
            return Err(ProbeError::FrameNotFound {
                object,
                frame,
                frame_end: self.frame_end,
            });
        }
        self.timelines.entry(object).or_default().insert(frame, state);
        self.sink.control_point(object, frame);
        self.write_count += 1;
        Ok(())
    }

    /// Read the state of `object` at `frame`.
    pub fn read(&self, object: ObjectId, frame: Frame) -> Result<ObjectState> {
        self.timelines
            .get(&object)
            .filter(|_| frame <= self.frame_end)
            .and_then(|t| t.get(frame))
            .copied()
            .ok_or(ProbeError::FrameNotFound {
                object,
                frame,
                frame_end: self.frame_end,
            })
    }

    /// Read the state at `frame` if one was recorded.
    #[must_use]
    pub fn try_read(&self, object: ObjectId, frame: Frame) -> Option<ObjectState> {
        self.timelines.get(&object).and_then(|t| t.get(frame)).copied()
    }

    /// The full timeline of `object`.
    #[must_use]
    pub fn timeline(&self, object: ObjectId) -> Option<&Timeline> {
        self.timelines.get(&object)
    }

    /// Whether `object` has any record.
    #[must_use]
    pub fn contains(&self, object: ObjectId) -> bool {
        self.timelines.get(&object).is_some_and(|t| !t.is_empty())
    }

    /// Deep copy of the given objects' timelines.
    ///
    /// Objects with no records are captured as empty timelines, so restoring
    /// them later clears whatever was written in between.
    #[must_use]
    pub fn snapshot(&self, objects: &[ObjectId]) -> Snapshot {
        let mut snapshot = Snapshot::new();
        for &id in objects {
            let timeline = self.timelines.get(&id).cloned().unwrap_or_default();
            snapshot.insert(id, timeline);
        }
        snapshot
    }

    /// Replace the given objects' timelines with the snapshot's.
    ///
    /// Each object's timeline is cleared and then every captured frame is
    /// recorded again, so sinks rebuild their curves from scratch.
    pub fn restore(&mut self, objects: &[ObjectId], snapshot: &Snapshot) -> Result<()> {
        // Validate first so a failed restore leaves the store untouched.
        if let Some(missing) = objects.iter().find(|id| snapshot.get(**id).is_none()) {
            return Err(ProbeError::SnapshotMissing(*missing));
        }
        for &id in objects {
            let Some(timeline) = snapshot.get(id) else {
                continue;
            };
            self.remove(id);
            for (frame, state) in timeline.iter() {
                self.record(id, frame, *state)?;
            }
            trace!(object = %id, frames = timeline.len(), "restored timeline");
        }
        Ok(())
    }

    /// Restore every object contained in the snapshot.
    pub fn restore_all(&mut self, snapshot: &Snapshot) -> Result<()> {
        let objects: Vec<ObjectId> = snapshot.objects().collect();
        self.restore(&objects, snapshot)
    }

    /// Drop every record of `object`.
    pub fn remove(&mut self, object: ObjectId) -> Option<Timeline> {
        let removed = self.timelines.remove(&object);
        if removed.is_some() {
            self.sink.cleared(object);
        }
        removed
    }

    /// Drop records of `object` after `frame`.
    pub fn truncate_after(&mut self, object: ObjectId, frame: Frame) {
        if let Some(t) = self.timelines.get_mut(&object) {
            t.truncate_after(frame);
        }
    }

    /// Objects with at least one record.
    pub fn objects(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.timelines
            .iter()
            .filter(|(_, t)| !t.is_empty())
            .map(|(id, _)| *id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use probe_types::{Point3, UnitQuaternion, Vector3};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Default)]
    struct RecordingSink {
        points: Rc<RefCell<Vec<(ObjectId, Frame)>>>,
    }

    impl KeyframeSink for RecordingSink {
        fn control_point(&mut self, object: ObjectId, frame: Frame) {
            self.points.borrow_mut().push((object, frame));
        }
    }

    fn moving_state(f: Frame) -> ObjectState {
        let t = f64::from(f);
        ObjectState::at_rest(Point3::new(0.1 * t, -0.3 * t, 1.0 - 0.01 * t * t))
            .with_velocity(Vector3::new(0.1, -0.3, -0.02 * t))
            .with_orientation(UnitQuaternion::from_euler_angles(0.1 * t, 0.0, 0.2))
            .with_angular_velocity(Vector3::new(0.1, 0.0, 0.0))
    }

    fn filled(frame_end: Frame, ids: &[ObjectId]) -> KeyframeStore {
        let mut store = KeyframeStore::new(frame_end);
        for &id in ids {
            for f in 0..=frame_end {
                store.record(id, f, moving_state(f + id.raw())).unwrap();
            }
        }
        store
    }

    #[test]
    fn test_record_is_idempotent() {
        let mut store = KeyframeStore::new(5);
        let id = ObjectId(0);
        store.record(id, 2, moving_state(2)).unwrap();
        store.record(id, 2, moving_state(2)).unwrap();
        assert_eq!(store.timeline(id).unwrap().len(), 1);
        assert_eq!(store.read(id, 2).unwrap(), moving_state(2));
    }

    #[test]
    fn test_out_of_range_frames() {
        let mut store = KeyframeStore::new(5);
        let id = ObjectId(1);
        let err = store.record(id, 6, ObjectState::default()).unwrap_err();
        assert!(matches!(err, ProbeError::FrameNotFound { frame: 6, .. }));

        store.record(id, 0, ObjectState::default()).unwrap();
        assert!(store.read(id, 6).is_err());
        // In range but never written.
        assert!(store.read(id, 3).is_err());
    }

    #[test]
    fn test_snapshot_round_trip_is_bit_identical() {
        let ids = [ObjectId(0), ObjectId(1)];
        let mut store = filled(12, &ids);
        let before = store.snapshot(&ids);

        for f in 4..=12 {
            store.record(ids[0], f, ObjectState::default()).unwrap();
        }
        store.remove(ids[1]);
        store.restore(&ids, &before).unwrap();

        assert_eq!(store.snapshot(&ids), before);
        for f in 0..=12 {
            assert_eq!(store.read(ids[0], f).unwrap(), moving_state(f));
        }
    }

    #[test]
    fn test_restore_drops_frames_absent_from_snapshot() {
        let id = ObjectId(0);
        let mut store = KeyframeStore::new(10);
        for f in 0..=4 {
            store.record(id, f, moving_state(f)).unwrap();
        }
        let snap = store.snapshot(&[id]);
        store.record(id, 9, ObjectState::default()).unwrap();
        store.restore(&[id], &snap).unwrap();
        assert!(store.read(id, 9).is_err());
        assert_eq!(store.timeline(id).unwrap().span(), Some((0, 4)));
    }

    #[test]
    fn test_restore_renotifies_every_frame() {
        let points = Rc::new(RefCell::new(Vec::new()));
        let sink = RecordingSink {
            points: Rc::clone(&points),
        };
        let id = ObjectId(3);
        let mut store = KeyframeStore::with_sink(8, Box::new(sink));
        for f in 0..=8 {
            store.record(id, f, moving_state(f)).unwrap();
        }
        let snap = store.snapshot(&[id]);
        // Change a single frame; the restore must still replay all nine.
        store.record(id, 4, ObjectState::default()).unwrap();
        points.borrow_mut().clear();

        store.restore(&[id], &snap).unwrap();

        let replayed: Vec<Frame> = points.borrow().iter().map(|(_, f)| *f).collect();
        assert_eq!(replayed, (0..=8).collect::<Vec<_>>());
        assert_eq!(store.write_count(), 9 + 1 + 9);
    }

    #[test]
    fn test_restore_missing_object_leaves_store_untouched() {
        let ids = [ObjectId(0), ObjectId(1)];
        let mut store = filled(3, &ids);
        let snap = store.snapshot(&ids[..1]);
        let writes = store.write_count();

        let err = store.restore(&ids, &snap).unwrap_err();
        assert_eq!(err, ProbeError::SnapshotMissing(ObjectId(1)));
        assert_eq!(store.write_count(), writes);
    }

    #[test]
    fn test_snapshot_of_unrecorded_object_clears_on_restore() {
        let id = ObjectId(9);
        let mut store = KeyframeStore::new(3);
        let snap = store.snapshot(&[id]);
        store.record(id, 1, ObjectState::default()).unwrap();
        store.restore_all(&snap).unwrap();
        assert!(!store.contains(id));
    }
}
