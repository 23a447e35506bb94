use glam::{DQuat, DVec3};

bitflags::bitflags! {
    /// Motion intents requested by the live input source.
    ///
    /// Flags come in opposite pairs on adjacent bits (forward/backward,
    /// left/right, up/down). `ControlState` never holds both halves of a pair.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[repr(C)]
    pub struct Intent: u8 {
        const PITCH_FORWARD  = 1 << 0;
        const PITCH_BACKWARD = 1 << 1;
        const ROLL_LEFT      = 1 << 2;
        const ROLL_RIGHT     = 1 << 3;
        const YAW_LEFT       = 1 << 4;
        const YAW_RIGHT      = 1 << 5;
        const THROTTLE_UP    = 1 << 6;
        const THROTTLE_DOWN  = 1 << 7;
    }
}

impl Intent {
    /// Swap every flag for its partner on the same axis.
    pub fn opposite(self) -> Intent {
        let bits = self.bits();
        Intent::from_bits_retain(((bits & 0x55) << 1) | ((bits & 0xAA) >> 1))
    }
}

bitflags::bitflags! {
    /// Discrete camera-view toggle events collected during one poll.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[repr(C)]
    pub struct ViewToggles: u8 {
        const POV    = 1 << 0;
        const BOTTOM = 1 << 1;
        const FIXED  = 1 << 2;
    }
}

/// Canonical control snapshot produced by exactly one input adapter per frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControlState {
    intents: Intent,
}

impl ControlState {
    /// No intent active.
    pub const NEUTRAL: ControlState = ControlState {
        intents: Intent::empty(),
    };

    /// Build a state from a set of intents. Where both halves of an axis are
    /// given, the earlier flag (forward, left, up) wins.
    pub fn from_intents(intents: Intent) -> ControlState {
        let conflicts = intents & intents.opposite();
        ControlState {
            intents: intents - (conflicts & Intent::from_bits_retain(0xAA)),
        }
    }

    /// Activate an intent, clearing its opposite on the same axis.
    pub fn engage(&mut self, intent: Intent) {
        self.intents.remove(intent.opposite());
        self.intents.insert(intent);
    }

    pub fn release(&mut self, intent: Intent) {
        self.intents.remove(intent);
    }

    pub fn set(&mut self, intent: Intent, active: bool) {
        if active {
            self.engage(intent);
        } else {
            self.release(intent);
        }
    }

    pub fn is_active(&self, intent: Intent) -> bool {
        self.intents.contains(intent)
    }

    pub fn intents(&self) -> Intent {
        self.intents
    }

    pub fn is_neutral(&self) -> bool {
        self.intents.is_empty()
    }

    /// Signed unit value for one axis: -1 when `negative` is active, +1 when
    /// `positive` is active, otherwise 0.
    pub fn axis(&self, negative: Intent, positive: Intent) -> f64 {
        if self.is_active(negative) {
            -1.0
        } else if self.is_active(positive) {
            1.0
        } else {
            0.0
        }
    }
}

/// Which adapter currently owns the control state.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum InputSource {
    #[default]
    Keyboard = 0,
    Gamepad = 1,
    Gesture = 2,
}

impl InputSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Keyboard => "keyboard",
            Self::Gamepad => "gamepad",
            Self::Gesture => "gesture",
        }
    }
}

/// Active camera view. Exactly one is selected at a time.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CameraMode {
    /// Smoothed chase camera looking at the drone.
    #[default]
    Follow = 0,
    /// Rigidly attached to the drone, facing back along its heading.
    DronePov = 1,
    /// Rigidly attached under the drone, looking straight down.
    BottomPov = 2,
    /// Fixed world position looking at the drone.
    Fixed = 3,
}

impl CameraMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Follow => "follow",
            Self::DronePov => "drone-pov",
            Self::BottomPov => "bottom-pov",
            Self::Fixed => "fixed",
        }
    }
}

/// Kinematic drone state, advanced once per frame by [`crate::flight::step`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DroneState {
    /// World position. `y` is altitude and never negative after a step.
    pub position: DVec3,
    /// Orientation composed from (pitch, accumulated_yaw, roll) in YXZ order.
    pub orientation: DQuat,
    /// Instantaneous pitch of the last step (radians). Does not accumulate.
    pub pitch: f64,
    /// Instantaneous roll of the last step (radians). Does not accumulate.
    pub roll: f64,
    /// Integrated heading in radians, never wrapped.
    pub accumulated_yaw: f64,
    /// Last horizontal position known to be at or above the ground plane.
    pub last_grounded_x: f64,
    pub last_grounded_z: f64,
    /// Drone rests on the ground plane.
    pub grounded: bool,
}

impl Default for DroneState {
    fn default() -> Self {
        Self::at(DVec3::ZERO)
    }
}

impl DroneState {
    /// A level, stationary drone at `position` (altitude clamped to the ground).
    pub fn at(position: DVec3) -> Self {
        let position = DVec3::new(position.x, position.y.max(0.0), position.z);
        Self {
            position,
            orientation: DQuat::IDENTITY,
            pitch: 0.0,
            roll: 0.0,
            accumulated_yaw: 0.0,
            last_grounded_x: position.x,
            last_grounded_z: position.z,
            grounded: position.y <= 0.0,
        }
    }

    pub fn altitude(&self) -> f64 {
        self.position.y
    }

    /// Euler angles [roll, pitch, yaw] in degrees (YXZ order, Three.js convention).
    pub fn euler_deg(&self) -> [f64; 3] {
        [
            self.roll.to_degrees(),
            self.pitch.to_degrees(),
            self.accumulated_yaw.to_degrees(),
        ]
    }
}

/// Camera pose handed to the renderer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraTransform {
    pub position: DVec3,
    pub orientation: DQuat,
}

impl CameraTransform {
    pub fn new(position: DVec3, orientation: DQuat) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// Direction the camera looks along (its local -Z axis).
    pub fn forward(&self) -> DVec3 {
        self.orientation * DVec3::NEG_Z
    }
}

/// Rotation from Euler angles applied in Y, X, Z order, equivalent to
/// `new THREE.Euler(pitch, yaw, roll, 'YXZ')`.
pub fn euler_yxz(pitch: f64, yaw: f64, roll: f64) -> DQuat {
    DQuat::from_rotation_y(yaw) * DQuat::from_rotation_x(pitch) * DQuat::from_rotation_z(roll)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_opposite() {
        assert_eq!(Intent::PITCH_FORWARD.opposite(), Intent::PITCH_BACKWARD);
        assert_eq!(Intent::ROLL_RIGHT.opposite(), Intent::ROLL_LEFT);
        assert_eq!(
            (Intent::YAW_LEFT | Intent::THROTTLE_DOWN).opposite(),
            Intent::YAW_RIGHT | Intent::THROTTLE_UP
        );
    }

    #[test]
    fn test_engage_clears_opposite() {
        let mut control = ControlState::NEUTRAL;
        control.engage(Intent::THROTTLE_UP);
        control.engage(Intent::ROLL_LEFT);
        control.engage(Intent::THROTTLE_DOWN);
        assert!(control.is_active(Intent::THROTTLE_DOWN));
        assert!(!control.is_active(Intent::THROTTLE_UP));
        assert!(control.is_active(Intent::ROLL_LEFT));
    }

    #[test]
    fn test_from_intents_resolves_conflicts() {
        let control = ControlState::from_intents(
            Intent::PITCH_FORWARD | Intent::PITCH_BACKWARD | Intent::YAW_RIGHT,
        );
        assert_eq!(control.intents(), Intent::PITCH_FORWARD | Intent::YAW_RIGHT);
    }

    #[test]
    fn test_axis_sign() {
        let control = ControlState::from_intents(Intent::ROLL_RIGHT);
        assert_eq!(control.axis(Intent::ROLL_LEFT, Intent::ROLL_RIGHT), 1.0);
        assert_eq!(control.axis(Intent::YAW_RIGHT, Intent::YAW_LEFT), 0.0);
    }

    #[test]
    fn test_euler_yxz_yaw_only() {
        let q = euler_yxz(0.0, std::f64::consts::FRAC_PI_2, 0.0);
        let v = q * DVec3::Z;
        assert!((v.x - 1.0).abs() < 1e-12);
        assert!(v.z.abs() < 1e-12);
    }

    #[test]
    fn test_default_drone_is_grounded() {
        let drone = DroneState::default();
        assert!(drone.grounded);
        assert_eq!(drone.altitude(), 0.0);
    }
}
