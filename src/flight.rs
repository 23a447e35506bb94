//! Simplified kinematic flight model.
//!
//! Pitch, roll and throttle are instantaneous displacements along the drone's
//! local axes; only yaw is integrated. Nothing here can fail: going below the
//! ground plane is clamped, never reported.

use crate::config::FlightProfile;
use crate::types::{euler_yxz, ControlState, DroneState, Intent};
use glam::DVec3;

/// Local axis the drone moves along when pitching.
pub const FORWARD: DVec3 = DVec3::new(0.0, 0.0, 1.0);
/// Local axis the drone moves along when rolling.
pub const RIGHT: DVec3 = DVec3::new(-1.0, 0.0, 0.0);
/// Local axis the drone moves along under throttle.
pub const UP: DVec3 = DVec3::new(0.0, 1.0, 0.0);

/// Advance the drone by one fixed step.
///
/// Axes are not normalized against each other, so combined pitch and roll
/// moves faster than either alone.
pub fn step(control: &ControlState, prev: &DroneState, profile: &FlightProfile) -> DroneState {
    let d = profile.deflection;
    let pitch = control.axis(Intent::PITCH_FORWARD, Intent::PITCH_BACKWARD) * d;
    let roll = control.axis(Intent::ROLL_LEFT, Intent::ROLL_RIGHT) * d;
    let throttle = control.axis(Intent::THROTTLE_DOWN, Intent::THROTTLE_UP) * d;
    let yaw = control.axis(Intent::YAW_RIGHT, Intent::YAW_LEFT) * profile.yaw_step();

    let accumulated_yaw = prev.accumulated_yaw + yaw;
    let orientation = euler_yxz(pitch, accumulated_yaw, roll);

    let position = prev.position
        + orientation * FORWARD * pitch
        + orientation * RIGHT * roll
        + orientation * UP * throttle;

    if position.y < 0.0 {
        return DroneState {
            position: DVec3::new(prev.last_grounded_x, 0.0, prev.last_grounded_z),
            orientation: euler_yxz(0.0, accumulated_yaw, 0.0),
            pitch: 0.0,
            roll: 0.0,
            accumulated_yaw,
            last_grounded_x: prev.last_grounded_x,
            last_grounded_z: prev.last_grounded_z,
            grounded: true,
        };
    }

    DroneState {
        position,
        orientation,
        pitch,
        roll,
        accumulated_yaw,
        last_grounded_x: position.x,
        last_grounded_z: position.z,
        grounded: position.y == 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn control(intents: Intent) -> ControlState {
        ControlState::from_intents(intents)
    }

    #[test]
    fn test_idle_on_ground_stays_grounded() {
        let mut drone = DroneState::default();
        for _ in 0..50 {
            drone = step(&ControlState::NEUTRAL, &drone, &FlightProfile::KEYBOARD);
            assert_eq!(drone.position.y, 0.0);
            assert!(drone.grounded);
        }
    }

    #[test]
    fn test_throttle_up_leaves_ground() {
        let drone = step(
            &control(Intent::THROTTLE_UP),
            &DroneState::default(),
            &FlightProfile::KEYBOARD,
        );
        assert!(drone.position.y > 0.0);
        assert!((drone.position.y - 0.2).abs() < EPS);
        assert!(!drone.grounded);
    }

    #[test]
    fn test_descent_clamps_to_last_safe_position() {
        let profile = FlightProfile::KEYBOARD;
        let mut drone = DroneState::default();
        for _ in 0..3 {
            drone = step(&control(Intent::THROTTLE_UP), &drone, &profile);
        }

        // Drift sideways while descending so x changes every step.
        let descend = control(Intent::THROTTLE_DOWN | Intent::ROLL_RIGHT);
        let descent_start_x = drone.position.x;
        let mut landed = false;
        for _ in 0..20 {
            let next = step(&descend, &drone, &profile);
            if next.grounded {
                assert_eq!(next.position.y, 0.0);
                assert_eq!(next.position.x, drone.position.x);
                assert_eq!(next.position.z, drone.position.z);
                assert_eq!(next.pitch, 0.0);
                assert_eq!(next.roll, 0.0);
                // Restored to the last in-air position, which has drifted
                // away from where the descent started.
                assert!((next.position.x - descent_start_x).abs() > 0.1);
                landed = true;
                break;
            }
            assert!(next.position.y > 0.0);
            drone = next;
        }
        assert!(landed);
    }

    #[test]
    fn test_yaw_accumulates_independent_of_tilt() {
        let profile = FlightProfile::KEYBOARD;
        let mut yaw_only = DroneState::at(DVec3::new(0.0, 10.0, 0.0));
        let mut yaw_and_tilt = yaw_only;
        let mut last = yaw_only.accumulated_yaw;

        for _ in 0..10 {
            yaw_only = step(&control(Intent::YAW_LEFT), &yaw_only, &profile);
            yaw_and_tilt = step(
                &control(Intent::YAW_LEFT | Intent::PITCH_FORWARD | Intent::ROLL_LEFT),
                &yaw_and_tilt,
                &profile,
            );
            assert!(yaw_only.accumulated_yaw > last);
            assert_eq!(yaw_only.accumulated_yaw, yaw_and_tilt.accumulated_yaw);
            last = yaw_only.accumulated_yaw;
        }
        assert!((last - 0.7).abs() < EPS);
    }

    #[test]
    fn test_yaw_right_decreases_heading() {
        let drone = step(
            &control(Intent::YAW_RIGHT),
            &DroneState::default(),
            &FlightProfile::KEYBOARD,
        );
        assert!((drone.accumulated_yaw + 0.07).abs() < EPS);
    }

    #[test]
    fn test_tilt_does_not_accumulate() {
        let profile = FlightProfile::KEYBOARD;
        let start = DroneState::at(DVec3::new(0.0, 10.0, 0.0));
        let tilted = step(&control(Intent::PITCH_BACKWARD), &start, &profile);
        assert!((tilted.pitch - 0.2).abs() < EPS);
        let level = step(&ControlState::NEUTRAL, &tilted, &profile);
        assert_eq!(level.pitch, 0.0);
        assert_eq!(level.position, tilted.position);
    }

    #[test]
    fn test_movement_is_local_space() {
        let mut start = DroneState::at(DVec3::new(0.0, 5.0, 0.0));
        start.accumulated_yaw = std::f64::consts::FRAC_PI_2;
        let moved = step(&control(Intent::PITCH_FORWARD), &start, &FlightProfile::KEYBOARD);
        let delta = moved.position - start.position;
        assert!(delta.x < -0.19);
        assert!(delta.z.abs() < EPS);
    }

    #[test]
    fn test_diagonal_is_faster() {
        let profile = FlightProfile::GAMEPAD;
        let start = DroneState::at(DVec3::new(0.0, 5.0, 0.0));
        let straight = step(&control(Intent::PITCH_BACKWARD), &start, &profile);
        let diagonal = step(
            &control(Intent::PITCH_BACKWARD | Intent::ROLL_RIGHT),
            &start,
            &profile,
        );
        let straight_len = (straight.position - start.position).length();
        let diagonal_len = (diagonal.position - start.position).length();
        assert!(diagonal_len > straight_len * 1.3);
    }

    #[test]
    fn test_yaw_uses_profile_step() {
        let profile = FlightProfile {
            deflection: 0.2,
            yaw_speed: 2.0,
            yaw_scale: 0.25,
        };
        let drone = step(&control(Intent::YAW_LEFT), &DroneState::default(), &profile);
        assert!((drone.accumulated_yaw - profile.yaw_step()).abs() < EPS);
        assert!((drone.accumulated_yaw - 0.5).abs() < EPS);
    }
}
