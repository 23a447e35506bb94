//! # dronesim - core of an interactive drone flight simulator
//!
//! Turns keyboard, gamepad and hand-gesture input into drone motion and a
//! camera view, leaving rendering and asset loading to the host. Provides:
//! - Gesture classification from 21 hand landmarks
//! - Keyboard, gamepad and gesture adapters behind one control state
//! - Flight dynamics with a ground clamp
//! - A camera director with follow, drone POV, bottom POV and fixed views
//! - A piecewise-linear animation remap
//! - C FFI for driving the simulation from a non-Rust host
//!
//! ## Quick Start
//! ```no_run
//! use dronesim::{SimConfig, SimulationContext};
//!
//! let mut sim = SimulationContext::new(SimConfig::from_env()).unwrap();
//! sim.drone_loaded();
//! sim.key_down("w");
//! for _ in 0..60 {
//!     let frame = sim.tick();
//!     println!("drone: {:?} camera: {:?}", frame.drone, frame.camera.position);
//! }
//! ```

pub mod error;
pub mod types;
pub mod config;
pub mod gesture;
pub mod input;
pub mod detector;
pub mod flight;
pub mod camera;
pub mod animation;
pub mod sim;
pub mod ffi;

pub use error::SimError;
pub use types::*;
pub use config::{AnimationConfig, CameraConfig, FlightProfile, GamepadConfig, SimConfig};
pub use gesture::{Gesture, HandSample};
pub use input::{GamepadSnapshot, InputRouter};
pub use camera::CameraDirector;
pub use animation::AnimationDriver;
pub use detector::GestureStream;
pub use sim::{FrameOutput, Renderer, SimulationContext, UiStatus};

/// Result type alias for dronesim operations.
pub type Result<T> = std::result::Result<T, SimError>;
