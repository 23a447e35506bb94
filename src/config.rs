//! Tunable constants and environment overrides.

use glam::DVec3;
use std::time::Duration;

/// Step magnitudes used by flight dynamics. Each input technology flies with
/// its own profile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlightProfile {
    /// Displacement per step for pitch, roll and throttle (also used as the
    /// tilt angle in radians).
    pub deflection: f64,
    /// Yaw rate in arbitrary units.
    pub yaw_speed: f64,
    /// Scale applied to `yaw_speed` per step.
    pub yaw_scale: f64,
}

impl FlightProfile {
    pub const KEYBOARD: FlightProfile = FlightProfile {
        deflection: 0.2,
        yaw_speed: 7.0,
        yaw_scale: 0.01,
    };

    pub const GAMEPAD: FlightProfile = FlightProfile {
        deflection: 0.15,
        yaw_speed: 7.0,
        yaw_scale: 0.01,
    };

    /// Yaw increment applied per step while a yaw intent is held.
    pub fn yaw_step(&self) -> f64 {
        self.yaw_speed * self.yaw_scale
    }
}

impl Default for FlightProfile {
    fn default() -> Self {
        Self::KEYBOARD
    }
}

/// Gamepad axis and toggle handling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GamepadConfig {
    /// Minimum absolute axis value (after clamping to ±1) that counts as an intent.
    pub axis_threshold: f64,
    /// Flip the view on every poll while a toggle button is held instead of
    /// once per press.
    pub hold_toggles: bool,
}

impl Default for GamepadConfig {
    fn default() -> Self {
        Self {
            axis_threshold: 0.5,
            hold_toggles: false,
        }
    }
}

/// Camera rig offsets and smoothing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraConfig {
    /// Offset from the drone the follow camera converges to.
    pub follow_offset: DVec3,
    /// Fraction of the remaining distance covered per frame in follow mode.
    pub follow_lerp: f64,
    /// Offset in drone-local space for the POV camera.
    pub pov_offset: DVec3,
    /// World-space offset subtracted from the drone position for the bottom camera.
    pub bottom_offset: DVec3,
    /// World position of the fixed camera (also the initial camera position).
    pub fixed_position: DVec3,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            follow_offset: DVec3::new(6.0, 10.0, -10.0),
            follow_lerp: 0.05,
            pov_offset: DVec3::new(0.0, -0.3, 0.8),
            bottom_offset: DVec3::new(0.0, 0.2, 0.2),
            fixed_position: DVec3::new(0.0, 5.0, -10.0),
        }
    }
}

/// Input ranges for the animation remap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationConfig {
    pub in_min: f64,
    pub in_mid: f64,
    pub in_max: f64,
    pub out_min: f64,
    pub out_mid: f64,
    pub out_max: f64,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            in_min: -1.0,
            in_mid: 0.0,
            in_max: 1.0,
            out_min: 0.0,
            out_mid: 0.5,
            out_max: 5.0,
        }
    }
}

/// Full simulation configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    pub keyboard_profile: FlightProfile,
    pub gamepad_profile: FlightProfile,
    /// Profile used while the gesture adapter is live.
    pub gesture_profile: FlightProfile,
    pub gamepad: GamepadConfig,
    pub camera: CameraConfig,
    pub animation: AnimationConfig,
    /// Gesture labels drive the control state (otherwise display only).
    pub gesture_drives_flight: bool,
    /// Cadence of the gesture detector.
    pub gesture_interval: Duration,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            keyboard_profile: FlightProfile::KEYBOARD,
            gamepad_profile: FlightProfile::GAMEPAD,
            gesture_profile: FlightProfile::KEYBOARD,
            gamepad: GamepadConfig::default(),
            camera: CameraConfig::default(),
            animation: AnimationConfig::default(),
            gesture_drives_flight: true,
            gesture_interval: Duration::from_millis(100),
        }
    }
}

impl SimConfig {
    /// Defaults with overrides from `DRONESIM_*` environment variables.
    /// Unparseable values fall back to the default silently.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let gesture_profile = match read_env_string("DRONESIM_PROFILE", "keyboard").as_str() {
            "keyboard" => FlightProfile::KEYBOARD,
            "gamepad" => FlightProfile::GAMEPAD,
            other => {
                log::warn!(
                    "Unknown DRONESIM_PROFILE='{}', using keyboard (supported: keyboard|gamepad)",
                    other
                );
                FlightProfile::KEYBOARD
            }
        };

        Self {
            gesture_profile,
            gamepad: GamepadConfig {
                axis_threshold: read_env_f64(
                    "DRONESIM_AXIS_THRESHOLD",
                    defaults.gamepad.axis_threshold,
                )
                .clamp(0.0, 1.0),
                hold_toggles: read_env_bool(
                    "DRONESIM_GAMEPAD_HOLD_TOGGLES",
                    defaults.gamepad.hold_toggles,
                ),
            },
            gesture_drives_flight: read_env_bool(
                "DRONESIM_GESTURE_FLIGHT",
                defaults.gesture_drives_flight,
            ),
            gesture_interval: Duration::from_millis(read_env_u64(
                "DRONESIM_GESTURE_INTERVAL_MS",
                defaults.gesture_interval.as_millis() as u64,
            )),
            ..defaults
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn read_env_bool(name: &str, default: bool) -> bool {
    std::env::var(name)
        .ok()
        .and_then(|v| parse_bool(&v))
        .unwrap_or(default)
}

fn read_env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

fn read_env_f64(name: &str, default: f64) -> f64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(default)
}

fn read_env_string(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_ascii_lowercase())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}
