/// Interaction probe — picks which partner the player is addressing.
///
/// A candidate qualifies when it is within range, inside the view cone
/// around the camera's forward vector, and not hidden behind geometry.
/// The engine has no physics, so occlusion is answered by the caller.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn sub(self, other: Vec3) -> Vec3 {
        Vec3::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }

    pub fn dot(self, other: Vec3) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn length(self) -> f32 {
        self.dot(self).sqrt()
    }

    /// Angle between two vectors in degrees. Zero-length input yields 0.
    pub fn angle_to(self, other: Vec3) -> f32 {
        let denom = self.length() * other.length();
        if denom <= f32::EPSILON {
            return 0.0;
        }
        (self.dot(other) / denom).clamp(-1.0, 1.0).acos().to_degrees()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionProbe {
    pub range: f32,
    /// Full cone width in degrees.
    pub view_angle: f32,
}

impl Default for InteractionProbe {
    fn default() -> Self {
        Self {
            range: 3.0,
            view_angle: 60.0,
        }
    }
}

impl InteractionProbe {
    /// Index of the closest qualifying candidate, if any.
    ///
    /// `line_of_sight(from, to)` must return true when nothing blocks the
    /// segment between the two points.
    pub fn select<F>(
        &self,
        eye: Vec3,
        forward: Vec3,
        candidates: &[Vec3],
        mut line_of_sight: F,
    ) -> Option<usize>
    where
        F: FnMut(Vec3, Vec3) -> bool,
    {
        let half_cone = self.view_angle / 2.0;
        let mut best: Option<(usize, f32)> = None;

        for (i, &target) in candidates.iter().enumerate() {
            let offset = target.sub(eye);
            let distance = offset.length();
            if distance > self.range {
                continue;
            }
            if forward.angle_to(offset) >= half_cone {
                continue;
            }
            if best.is_some_and(|(_, d)| d <= distance) {
                continue;
            }
            if line_of_sight(eye, target) {
                best = Some((i, distance));
            }
        }

        best.map(|(i, _)| i)
    }
}
