//! Collision events reported by a simulator run.

use crate::{Frame, ObjectId, ProbeError, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Contact between two objects during one frame of a simulator run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CollisionEvent {
    /// Frame at which the contact was observed.
    pub frame: Frame,
    /// The two participants, stored in ascending id order.
    pub participants: [ObjectId; 2],
}

impl CollisionEvent {
    /// Create an event. Participant order is normalized.
    #[must_use]
    pub fn new(frame: Frame, a: ObjectId, b: ObjectId) -> Self {
        let participants = if a <= b { [a, b] } else { [b, a] };
        Self {
            frame,
            participants,
        }
    }

    /// Check whether this event is a contact between exactly `a` and `b`.
    #[must_use]
    pub fn involves_pair(&self, a: ObjectId, b: ObjectId) -> bool {
        let pair = if a <= b { [a, b] } else { [b, a] };
        self.participants == pair
    }

    /// Check whether `id` took part in this contact.
    #[must_use]
    pub fn involves(&self, id: ObjectId) -> bool {
        self.participants.contains(&id)
    }
}

/// Find the first frame after 0 at which `a` and `b` collide.
///
/// A contact at frame 0 means the objects were placed interpenetrating, which
/// is not the triggering collision a test design assumes.
///
/// # Errors
///
/// Returns [`ProbeError::NoCollisionDetected`] when no qualifying event exists.
pub fn first_collision_between(
    events: &[CollisionEvent],
    a: ObjectId,
    b: ObjectId,
) -> Result<Frame> {
    events
        .iter()
        .filter(|e| e.frame > 0 && e.involves_pair(a, b))
        .map(|e| e.frame)
        .min()
        .ok_or(ProbeError::NoCollisionDetected {
            first: a,
            second: b,
        })
}
