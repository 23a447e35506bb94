//! Camera view state machine.
//!
//! ```text
//!            toggle POV            toggle bottom
//!   DronePov <---------> Follow <---------------> BottomPov
//!                          ^
//!             toggle fixed |
//!                          v
//!                        Fixed
//! ```
//!
//! Any toggle from a mode other than `Follow` switches straight to the
//! requested mode, or back to `Follow` if that mode is already active.

use crate::config::CameraConfig;
use crate::types::{euler_yxz, CameraMode, CameraTransform, DroneState, ViewToggles};
use crate::{Result, SimError};
use glam::{DMat3, DQuat, DVec3};
use std::f64::consts::{FRAC_PI_2, PI};

/// Orientation that points a camera's -Z axis from `eye` at `target` with +Y up.
pub fn look_at(eye: DVec3, target: DVec3) -> Result<DQuat> {
    let forward = (target - eye)
        .try_normalize()
        .ok_or(SimError::DegenerateLookAt)?;
    let z_axis = -forward;
    let x_axis = DVec3::Y
        .cross(z_axis)
        .try_normalize()
        .ok_or(SimError::DegenerateLookAt)?;
    let y_axis = z_axis.cross(x_axis);
    Ok(DQuat::from_mat3(&DMat3::from_cols(x_axis, y_axis, z_axis)))
}

/// Selects the active camera mode and computes its transform every frame.
#[derive(Debug, Clone)]
pub struct CameraDirector {
    mode: CameraMode,
    config: CameraConfig,
    /// Smoothed follow-camera position, kept across mode changes.
    follow_position: DVec3,
    transform: CameraTransform,
}

impl CameraDirector {
    pub fn new(config: CameraConfig) -> Self {
        let start = config.fixed_position;
        Self {
            mode: CameraMode::Follow,
            config,
            follow_position: start,
            transform: CameraTransform::new(start, DQuat::IDENTITY),
        }
    }

    pub fn mode(&self) -> CameraMode {
        self.mode
    }

    /// Last computed transform.
    pub fn transform(&self) -> CameraTransform {
        self.transform
    }

    /// Apply the toggles collected this frame, POV first, then bottom, then fixed.
    pub fn apply(&mut self, toggles: ViewToggles) {
        if toggles.contains(ViewToggles::POV) {
            self.toggle(CameraMode::DronePov);
        }
        if toggles.contains(ViewToggles::BOTTOM) {
            self.toggle(CameraMode::BottomPov);
        }
        if toggles.contains(ViewToggles::FIXED) {
            self.toggle(CameraMode::Fixed);
        }
    }

    /// Enter `mode`, or fall back to `Follow` if it is already active.
    pub fn toggle(&mut self, mode: CameraMode) {
        let next = if self.mode == mode {
            CameraMode::Follow
        } else {
            mode
        };
        if next != self.mode {
            log::debug!("Camera mode {} -> {}", self.mode.as_str(), next.as_str());
        }
        self.mode = next;
    }

    /// Compute this frame's transform. Without a drone (asset still loading)
    /// the previous transform is kept.
    pub fn update(&mut self, drone: Option<&DroneState>) -> CameraTransform {
        let Some(drone) = drone else {
            return self.transform;
        };

        self.transform = match self.mode {
            CameraMode::Follow => {
                let target = drone.position + self.config.follow_offset;
                self.follow_position = self
                    .follow_position
                    .lerp(target, self.config.follow_lerp);
                self.aimed_at(self.follow_position, drone.position)
            }
            CameraMode::DronePov => CameraTransform::new(
                drone.position + drone.orientation * self.config.pov_offset,
                euler_yxz(0.0, drone.accumulated_yaw + PI, 0.0),
            ),
            CameraMode::BottomPov => CameraTransform::new(
                drone.position - self.config.bottom_offset,
                euler_yxz(-FRAC_PI_2, drone.accumulated_yaw + PI, 0.0),
            ),
            CameraMode::Fixed => self.aimed_at(self.config.fixed_position, drone.position),
        };
        self.transform
    }

    /// Camera at `eye` looking at `target`, keeping the last valid
    /// orientation when the direction is degenerate.
    fn aimed_at(&self, eye: DVec3, target: DVec3) -> CameraTransform {
        let orientation = match look_at(eye, target) {
            Ok(q) => q,
            Err(e) => {
                log::warn!("Camera look-at skipped: {}", e);
                self.transform.orientation
            }
        };
        CameraTransform::new(eye, orientation)
    }
}

impl Default for CameraDirector {
    fn default() -> Self {
        Self::new(CameraConfig::default())
    }
}
