/// Motion handoff — taking player control away for a conversation and
/// giving it back without a camera snap.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Camera orientation in degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Orientation {
    pub pitch: f32,
    pub yaw: f32,
}

impl Orientation {
    pub fn new(pitch: f32, yaw: f32) -> Self {
        Self { pitch, yaw }
    }

    /// Map an angle reported in `[0, 360)` into `(-180, 180]`.
    pub fn signed_degrees(angle: f32) -> f32 {
        let wrapped = angle.rem_euclid(360.0);
        if wrapped > 180.0 {
            wrapped - 360.0
        } else {
            wrapped
        }
    }

    /// Signed angles, with pitch clamped to `±look_limit`.
    pub fn as_baseline(&self, look_limit: f32) -> Orientation {
        let limit = look_limit.abs();
        Orientation {
            pitch: Self::signed_degrees(self.pitch).clamp(-limit, limit),
            yaw: Self::signed_degrees(self.yaw),
        }
    }
}

/// The player's movement/look controller.
pub trait MotionController {
    fn set_enabled(&mut self, enabled: bool);
    fn is_enabled(&self) -> bool;

    /// Replace the controller's cached look angles.
    fn resync_orientation(&mut self, baseline: Orientation);
}

/// Read access to the camera that dialogue may have turned.
pub trait CameraRig {
    fn orientation(&self) -> Orientation;
}

/// Pointer/UI focus owner: shows and frees the cursor while talking.
pub trait FocusHost {
    fn set_dialogue_focus(&mut self, focused: bool);
}

/// Collaborators for hosts without a movement controller.
#[derive(Debug, Default)]
pub struct Detached {
    enabled: bool,
    baseline: Orientation,
}

impl MotionController for Detached {
    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn resync_orientation(&mut self, baseline: Orientation) {
        self.baseline = baseline;
    }
}

impl CameraRig for Detached {
    fn orientation(&self) -> Orientation {
        self.baseline
    }
}

impl FocusHost for Detached {
    fn set_dialogue_focus(&mut self, _focused: bool) {}
}

/// Disables movement on entry; re-enables it on exit with the camera's
/// current orientation as the new look baseline.
pub struct MotionHandoff {
    controller: Box<dyn MotionController>,
    camera: Box<dyn CameraRig>,
    focus: Box<dyn FocusHost>,
    look_limit: f32,
}

impl MotionHandoff {
    pub fn new(
        controller: Box<dyn MotionController>,
        camera: Box<dyn CameraRig>,
        focus: Box<dyn FocusHost>,
        look_limit: f32,
    ) -> Self {
        Self {
            controller,
            camera,
            focus,
            look_limit,
        }
    }

    pub fn take_control(&mut self) {
        self.controller.set_enabled(false);
        self.focus.set_dialogue_focus(true);
    }

    pub fn release_control(&mut self) {
        let baseline = self.camera.orientation().as_baseline(self.look_limit);
        debug!(pitch = baseline.pitch, yaw = baseline.yaw, "resyncing motion baseline");
        self.focus.set_dialogue_focus(false);
        // Resync first: enabling must never observe the stale angles.
        self.controller.resync_orientation(baseline);
        self.controller.set_enabled(true);
    }

    pub fn controller_enabled(&self) -> bool {
        self.controller.is_enabled()
    }
}
