//! Camera rigs and camera-path templates.
//!
//! A [`CameraRig`] always looks at a fixed target. Its position is either
//! fixed, interpolated along a straight segment, or carried along a tilted
//! circular orbit whose azimuth is keyframed by a [`CameraPath`].
//!
//! Camera paths are the unit of configuration the scene controller retires
//! when they keep producing invalid scenes.

use nalgebra::{Rotation3, Unit};
use probe_types::{Frame, Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Camera position and look-at target at one frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraPose {
    /// Camera center.
    pub position: Point3<f64>,
    /// Point the camera looks at.
    pub target: Point3<f64>,
}

impl CameraPose {
    /// Unit vector from the camera toward its target.
    #[must_use]
    pub fn forward(&self) -> Vector3<f64> {
        let dir = self.target - self.position;
        let norm = dir.norm();
        if norm > 1e-12 {
            dir / norm
        } else {
            Vector3::y()
        }
    }

    /// Right, up, and forward axes of the camera (Z-up world).
    #[must_use]
    pub fn basis(&self) -> (Vector3<f64>, Vector3<f64>, Vector3<f64>) {
        let forward = self.forward();
        let mut right = forward.cross(&Vector3::z());
        if right.norm() < 1e-9 {
            // Looking straight up or down.
            right = Vector3::x();
        }
        let right = right.normalize();
        let up = right.cross(&forward);
        (right, up, forward)
    }

    /// Angle in degrees between the forward axis and the direction to `point`.
    #[must_use]
    pub fn angle_to(&self, point: &Point3<f64>) -> f64 {
        let dir = point - self.position;
        let norm = dir.norm();
        if norm < 1e-12 {
            return 0.0;
        }
        let cos = (self.forward().dot(&dir) / norm).clamp(-1.0, 1.0);
        cos.acos().to_degrees()
    }
}

/// Keyframed azimuth along a tilted circular orbit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraPath {
    /// Name used for rejection statistics and metadata.
    pub name: String,
    /// Tilt of the orbit plane as XYZ Euler angles (degrees).
    pub euler_xyz_deg: [f64; 3],
    /// `(frame, azimuth_deg)` pairs, ascending by frame.
    pub keys: Vec<(Frame, f64)>,
}

impl CameraPath {
    /// Create a path. Keys are sorted by frame.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        euler_xyz_deg: [f64; 3],
        mut keys: Vec<(Frame, f64)>,
    ) -> Self {
        keys.sort_by_key(|(f, _)| *f);
        Self {
            name: name.into(),
            euler_xyz_deg,
            keys,
        }
    }

    /// A path that never moves.
    #[must_use]
    pub fn stationary(name: impl Into<String>) -> Self {
        Self::new(name, [0.0; 3], Vec::new())
    }

    /// Azimuth at `frame`, linearly interpolated and held constant outside
    /// the keyed range.
    #[must_use]
    pub fn azimuth_at(&self, frame: Frame) -> f64 {
        let Some(&(first_frame, first_val)) = self.keys.first() else {
            return 0.0;
        };
        if frame <= first_frame {
            return first_val;
        }
        for pair in self.keys.windows(2) {
            let (f0, v0) = pair[0];
            let (f1, v1) = pair[1];
            if frame <= f1 {
                if f1 == f0 {
                    return v1;
                }
                let t = f64::from(frame - f0) / f64::from(f1 - f0);
                return v0 + t * (v1 - v0);
            }
        }
        self.keys.last().map_or(first_val, |(_, v)| *v)
    }

    /// Rotation of the orbit plane.
    #[must_use]
    pub fn tilt(&self) -> Rotation3<f64> {
        let [x, y, z] = self.euler_xyz_deg;
        Rotation3::from_euler_angles(x.to_radians(), y.to_radians(), z.to_radians())
    }

    /// The eleven orbit templates used for continuity scenes.
    ///
    /// Two-key paths sweep from frame 0 to `frame_end`; three-key paths turn
    /// around at the middle frame.
    #[must_use]
    pub fn continuity_templates(frame_end: Frame) -> Vec<Self> {
        let mid = frame_end / 2;
        let sweep = |a: f64, b: f64| vec![(0, a), (frame_end, b)];
        let turn = |a: f64, b: f64, c: f64| vec![(0, a), (mid, b), (frame_end, c)];
        let specs: [([f64; 3], Vec<(Frame, f64)>); 11] = [
            ([0.0, 0.0, 0.0], sweep(-20.0, 20.0)),
            ([-25.0, 0.0, 0.0], sweep(-20.0, 20.0)),
            ([0.0, -20.0, 0.0], sweep(-20.0, 20.0)),
            ([0.0, -40.0, 0.0], sweep(0.0, 20.0)),
            ([0.0, -60.0, 0.0], sweep(0.0, 15.0)),
            ([0.0, 20.0, 0.0], sweep(20.0, -20.0)),
            ([0.0, 40.0, 0.0], sweep(0.0, -20.0)),
            ([0.0, 60.0, 0.0], sweep(0.0, -15.0)),
            ([0.0, 0.0, 0.0], turn(-20.0, 10.0, -20.0)),
            ([0.0, 0.0, 0.0], turn(20.0, -10.0, 20.0)),
            ([0.0, -90.0, 0.0], turn(20.0, 5.0, 20.0)),
        ];
        specs
            .into_iter()
            .enumerate()
            .map(|(i, (euler, keys))| Self::new(format!("orbit_{i:02}"), euler, keys))
            .collect()
    }
}

/// How a rig's position evolves over the clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CameraMotion {
    /// Never moves.
    Fixed {
        /// Camera center.
        position: Point3<f64>,
    },
    /// Straight segment from `start` at `frames.0` to `end` at `frames.1`.
    Linear {
        /// Position at the first frame.
        start: Point3<f64>,
        /// Position at the last frame.
        end: Point3<f64>,
        /// First and last frame of the move.
        frames: (Frame, Frame),
    },
    /// Circle around the target.
    Orbit {
        /// Azimuth keys and orbit tilt.
        path: CameraPath,
        /// Horizontal distance from the target (m).
        radius: f64,
        /// Height above the target before tilting (m).
        height: f64,
    },
}

/// A named camera.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraRig {
    /// Position over time.
    pub motion: CameraMotion,
    /// Look-at target.
    pub target: Point3<f64>,
    /// Full vertical field of view used for rendering (degrees).
    pub fov_deg: f64,
}

impl CameraRig {
    /// Default vertical field of view (degrees).
    pub const DEFAULT_FOV_DEG: f64 = 50.0;

    /// A camera fixed at `position`.
    #[must_use]
    pub fn fixed(position: Point3<f64>, target: Point3<f64>) -> Self {
        Self {
            motion: CameraMotion::Fixed { position },
            target,
            fov_deg: Self::DEFAULT_FOV_DEG,
        }
    }

    /// A camera moving on a straight segment between two frames.
    #[must_use]
    pub fn linear(
        start: Point3<f64>,
        end: Point3<f64>,
        frames: (Frame, Frame),
        target: Point3<f64>,
    ) -> Self {
        Self {
            motion: CameraMotion::Linear { start, end, frames },
            target,
            fov_deg: Self::DEFAULT_FOV_DEG,
        }
    }

    /// A camera orbiting `target`.
    #[must_use]
    pub fn orbit(path: CameraPath, target: Point3<f64>, radius: f64, height: f64) -> Self {
        Self {
            motion: CameraMotion::Orbit {
                path,
                radius,
                height,
            },
            target,
            fov_deg: Self::DEFAULT_FOV_DEG,
        }
    }

    /// Set the rendering field of view.
    #[must_use]
    pub fn with_fov(mut self, fov_deg: f64) -> Self {
        self.fov_deg = fov_deg;
        self
    }

    /// Name of the driving camera path, if any.
    #[must_use]
    pub fn path_name(&self) -> Option<&str> {
        match &self.motion {
            CameraMotion::Orbit { path, .. } => Some(&path.name),
            _ => None,
        }
    }

    /// Camera pose at `frame`.
    #[must_use]
    pub fn pose_at(&self, frame: Frame) -> CameraPose {
        let position = match &self.motion {
            CameraMotion::Fixed { position } => *position,
            CameraMotion::Linear { start, end, frames } => {
                let (f0, f1) = *frames;
                let t = if f1 > f0 {
                    f64::from(frame.clamp(f0, f1) - f0) / f64::from(f1 - f0)
                } else {
                    0.0
                };
                start + (end - start) * t
            }
            CameraMotion::Orbit {
                path,
                radius,
                height,
            } => {
                let az = path.azimuth_at(frame).to_radians();
                let local = Vector3::new(radius * az.sin(), -radius * az.cos(), *height);
                self.target + path.tilt() * local
            }
        };
        CameraPose {
            position,
            target: self.target,
        }
    }

    /// Translate the rig and its target.
    pub fn shift(&mut self, offset: &Vector3<f64>) {
        self.target += offset;
        match &mut self.motion {
            CameraMotion::Fixed { position } => *position += offset,
            CameraMotion::Linear { start, end, .. } => {
                *start += offset;
                *end += offset;
            }
            CameraMotion::Orbit { .. } => {}
        }
    }

    /// Unit direction of the ray through normalized image coordinates
    /// `(u, v)` in `[-1, 1]`, `v` pointing up.
    #[must_use]
    pub fn pixel_ray(&self, pose: &CameraPose, u: f64, v: f64, aspect: f64) -> Unit<Vector3<f64>> {
        let (right, up, forward) = pose.basis();
        let half = (self.fov_deg.to_radians() / 2.0).tan();
        Unit::new_normalize(forward + right * (u * half * aspect) + up * (v * half))
    }
}
