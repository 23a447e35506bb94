//! C FFI layer for dronesim.
//!
//! Provides an opaque handle-based API so a non-Rust host (a browser shell,
//! a game engine) can drive the simulation and render the result itself.
//! The generated C header is written to `include/dronesim.h` by cbindgen.

use crate::error::LastError;
use crate::gesture::Gesture;
use crate::input::GamepadSnapshot;
use crate::sim::{FrameOutput, SimulationContext};
use crate::types::{CameraMode, InputSource};
use crate::{SimConfig, SimError};
use glam::DVec3;
use std::ffi::{c_char, c_int, CStr};

/// Last error message for C consumers.
static LAST_ERROR: LastError = LastError::new();

/// Opaque simulation handle for C consumers.
pub struct DsSim(SimulationContext);

/// One simulated frame in C-compatible layout.
#[repr(C)]
pub struct DsFrame {
    /// Frame counter, 1 for the first tick.
    pub frame: u64,
    /// False until the drone asset has loaded; drone fields are zero then.
    pub has_drone: bool,
    /// Drone position [x, y, z].
    pub position: [f64; 3],
    /// Drone orientation quaternion [qx, qy, qz, qw].
    pub quaternion: [f64; 4],
    /// Drone Euler angles [roll, pitch, yaw] in degrees (YXZ order).
    pub euler_deg: [f64; 3],
    /// Drone rests on the ground.
    pub grounded: bool,
    /// Camera position [x, y, z].
    pub camera_position: [f64; 3],
    /// Camera orientation quaternion [qx, qy, qz, qw].
    pub camera_quaternion: [f64; 4],
    pub camera_mode: CameraMode,
    pub source: InputSource,
    /// Animation mixer delta; 0 when `has_drone` is false.
    pub animation_delta: f64,
}

impl From<&FrameOutput> for DsFrame {
    fn from(frame: &FrameOutput) -> Self {
        let drone = frame.drone.unwrap_or_default();
        DsFrame {
            frame: frame.frame,
            has_drone: frame.drone.is_some(),
            position: drone.position.to_array(),
            quaternion: drone.orientation.to_array(),
            euler_deg: drone.euler_deg(),
            grounded: frame.grounded,
            camera_position: frame.camera.position.to_array(),
            camera_quaternion: frame.camera.orientation.to_array(),
            camera_mode: frame.mode,
            source: frame.source,
            animation_delta: frame.animation_delta.unwrap_or(0.0),
        }
    }
}

unsafe fn sim_mut<'a>(sim: *mut DsSim) -> Option<&'a mut SimulationContext> {
    if sim.is_null() {
        LAST_ERROR.set(&SimError::NullHandle);
        return None;
    }
    Some(&mut (*sim).0)
}

unsafe fn read_str<'a>(s: *const c_char) -> Option<&'a str> {
    if s.is_null() {
        LAST_ERROR.set(&SimError::InvalidArgument("null string".into()));
        return None;
    }
    match CStr::from_ptr(s).to_str() {
        Ok(s) => Some(s),
        Err(_) => {
            LAST_ERROR.set(&SimError::InvalidArgument("string is not UTF-8".into()));
            None
        }
    }
}

/// Create a simulation configured from `DRONESIM_*` environment variables.
/// Returns NULL on error (check ds_last_error()).
#[no_mangle]
pub extern "C" fn ds_sim_new() -> *mut DsSim {
    match SimulationContext::new(SimConfig::from_env()) {
        Ok(sim) => {
            LAST_ERROR.clear();
            Box::into_raw(Box::new(DsSim(sim)))
        }
        Err(e) => {
            LAST_ERROR.set(&e);
            std::ptr::null_mut()
        }
    }
}

/// Shut down a simulation and free it. Stops any gesture detector.
///
/// # Safety
/// `sim` must be a pointer returned by `ds_sim_new`, or null.
#[no_mangle]
pub unsafe extern "C" fn ds_sim_free(sim: *mut DsSim) {
    if !sim.is_null() {
        drop(Box::from_raw(sim));
    }
}

/// Report that the drone model has loaded at the given position.
///
/// # Safety
/// `sim` must be a valid simulation pointer, or null.
#[no_mangle]
pub unsafe extern "C" fn ds_drone_loaded(sim: *mut DsSim, x: f64, y: f64, z: f64) {
    if let Some(sim) = sim_mut(sim) {
        sim.drone_loaded_at(DVec3::new(x, y, z));
    }
}

/// Report an asset that failed to load. Logged only.
///
/// # Safety
/// `sim` must be a valid simulation pointer, or null. `path` and `reason`
/// must be null-terminated strings, or null.
#[no_mangle]
pub unsafe extern "C" fn ds_asset_failed(
    sim: *mut DsSim,
    path: *const c_char,
    reason: *const c_char,
) {
    let Some(sim) = sim_mut(sim) else {
        return;
    };
    let path = read_str(path).unwrap_or("<unknown>");
    let reason = read_str(reason).unwrap_or("<unknown>");
    let err = sim.asset_failed(path, reason);
    LAST_ERROR.set(&err);
}

/// Forward a key-down event (DOM key identifier, e.g. "ArrowUp", "w").
/// Returns 0 on success, -1 on invalid arguments.
///
/// # Safety
/// `sim` must be a valid simulation pointer, or null. `key` must be a
/// null-terminated string, or null.
#[no_mangle]
pub unsafe extern "C" fn ds_key_down(sim: *mut DsSim, key: *const c_char) -> c_int {
    match (sim_mut(sim), read_str(key)) {
        (Some(sim), Some(key)) => {
            sim.key_down(key);
            0
        }
        _ => -1,
    }
}

/// Forward a key-up event. Returns 0 on success, -1 on invalid arguments.
///
/// # Safety
/// Same as `ds_key_down`.
#[no_mangle]
pub unsafe extern "C" fn ds_key_up(sim: *mut DsSim, key: *const c_char) -> c_int {
    match (sim_mut(sim), read_str(key)) {
        (Some(sim), Some(key)) => {
            sim.key_up(key);
            0
        }
        _ => -1,
    }
}

/// A gamepad was connected. Polls are accepted from now on.
///
/// # Safety
/// `sim` must be a valid simulation pointer, or null. `id` must be a
/// null-terminated string, or null.
#[no_mangle]
pub unsafe extern "C" fn ds_gamepad_connected(sim: *mut DsSim, id: *const c_char) {
    if let Some(sim) = sim_mut(sim) {
        let id = if id.is_null() { "" } else { read_str(id).unwrap_or("") };
        sim.gamepad_connected(id);
    }
}

/// The gamepad was disconnected.
///
/// # Safety
/// `sim` must be a valid simulation pointer, or null.
#[no_mangle]
pub unsafe extern "C" fn ds_gamepad_disconnected(sim: *mut DsSim) {
    if let Some(sim) = sim_mut(sim) {
        sim.gamepad_disconnected();
    }
}

/// Feed one gamepad poll. Returns 0 on success, -1 on invalid arguments.
///
/// # Safety
/// `sim` must be a valid simulation pointer, or null. `buttons` must point to
/// `button_count` bools and `axes` to `axis_count` doubles; either may be
/// null when its count is 0.
#[no_mangle]
pub unsafe extern "C" fn ds_gamepad_poll(
    sim: *mut DsSim,
    buttons: *const bool,
    button_count: usize,
    axes: *const f64,
    axis_count: usize,
) -> c_int {
    let Some(sim) = sim_mut(sim) else {
        return -1;
    };
    if (buttons.is_null() && button_count > 0) || (axes.is_null() && axis_count > 0) {
        LAST_ERROR.set(&SimError::InvalidArgument("null gamepad buffer".into()));
        return -1;
    }
    let buttons = if button_count == 0 {
        Vec::new()
    } else {
        std::slice::from_raw_parts(buttons, button_count).to_vec()
    };
    let axes = if axis_count == 0 {
        Vec::new()
    } else {
        std::slice::from_raw_parts(axes, axis_count).to_vec()
    };
    sim.gamepad_poll(GamepadSnapshot::new(buttons, axes));
    0
}

/// Feed a gesture label ("stop", "up", ..., "none") classified by the host.
/// Returns 0 on success, -1 for an unknown label.
///
/// # Safety
/// `sim` must be a valid simulation pointer, or null. `label` must be a
/// null-terminated string, or null.
#[no_mangle]
pub unsafe extern "C" fn ds_gesture(sim: *mut DsSim, label: *const c_char) -> c_int {
    let (Some(sim), Some(label)) = (sim_mut(sim), read_str(label)) else {
        return -1;
    };
    match Gesture::from_label(label) {
        Some(gesture) => {
            sim.set_gesture_loading(false);
            sim.feed_gesture(gesture);
            0
        }
        None => {
            LAST_ERROR.set(&SimError::InvalidArgument(format!(
                "unknown gesture '{}'",
                label
            )));
            -1
        }
    }
}

/// Advance one frame and write the result to `out`.
/// Returns 0 on success, -1 on invalid arguments.
///
/// # Safety
/// `sim` and `out` must be valid pointers, or null.
#[no_mangle]
pub unsafe extern "C" fn ds_tick(sim: *mut DsSim, out: *mut DsFrame) -> c_int {
    if out.is_null() {
        LAST_ERROR.set(&SimError::InvalidArgument("null frame".into()));
        return -1;
    }
    let Some(sim) = sim_mut(sim) else {
        return -1;
    };
    let frame = sim.tick();
    out.write(DsFrame::from(&frame));
    0
}

/// Get the last error message. Returns NULL if no error.
/// The returned pointer is valid until the next dronesim API call.
#[no_mangle]
pub extern "C" fn ds_last_error() -> *const c_char {
    LAST_ERROR.as_ptr()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_through_c_api() {
        unsafe {
            let sim = ds_sim_new();
            assert!(!sim.is_null());
            ds_drone_loaded(sim, 1.0, 0.0, 2.0);
            assert_eq!(ds_key_down(sim, c"w".as_ptr()), 0);

            let mut frame = std::mem::MaybeUninit::<DsFrame>::uninit();
            assert_eq!(ds_tick(sim, frame.as_mut_ptr()), 0);
            let frame = frame.assume_init();
            assert_eq!(frame.frame, 1);
            assert!(frame.has_drone);
            assert_eq!(frame.position[0], 1.0);
            assert!(frame.position[1] > 0.0);
            assert!(!frame.grounded);
            assert_eq!(frame.camera_mode, CameraMode::Follow);

            ds_sim_free(sim);
        }
    }

    #[test]
    fn test_gamepad_poll_through_c_api() {
        unsafe {
            let sim = ds_sim_new();
            ds_drone_loaded(sim, 0.0, 0.0, 0.0);
            ds_gamepad_connected(sim, c"pad".as_ptr());
            let buttons = [false, false, false, false, true];
            let axes = [0.0, 0.0, 0.0, -1.0];
            assert_eq!(
                ds_gamepad_poll(sim, buttons.as_ptr(), buttons.len(), axes.as_ptr(), axes.len()),
                0
            );

            let mut frame = std::mem::MaybeUninit::<DsFrame>::uninit();
            assert_eq!(ds_tick(sim, frame.as_mut_ptr()), 0);
            let frame = frame.assume_init();
            assert_eq!(frame.source, InputSource::Gamepad);
            assert_eq!(frame.camera_mode, CameraMode::DronePov);
            assert!((frame.position[1] - 0.15).abs() < 1e-12);

            ds_sim_free(sim);
        }
    }

    #[test]
    fn test_invalid_arguments() {
        unsafe {
            // LAST_ERROR is shared with tests running in parallel, so only
            // return codes are checked here.
            assert_eq!(ds_key_down(std::ptr::null_mut(), c"w".as_ptr()), -1);
            assert_eq!(ds_key_up(std::ptr::null_mut(), c"w".as_ptr()), -1);

            let sim = ds_sim_new();
            assert_eq!(ds_gesture(sim, c"wave".as_ptr()), -1);
            assert_eq!(ds_gesture(sim, c"up".as_ptr()), 0);
            assert_eq!(ds_tick(sim, std::ptr::null_mut()), -1);
            ds_sim_free(sim);
        }
    }
}
