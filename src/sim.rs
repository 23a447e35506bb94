//! The per-frame simulation loop.
//!
//! [`SimulationContext`] owns every piece of mutable simulation state. The
//! host calls [`SimulationContext::tick`] once per rendered frame from a
//! single thread and forwards platform events (keys, gamepad polls, asset
//! arrival) between ticks.

use crate::animation::{AnimationDriver, RemapRange};
use crate::camera::CameraDirector;
use crate::config::{FlightProfile, SimConfig};
use crate::detector::{DetectorEvent, FrameSource, GestureStream, HandDetector};
use crate::flight;
use crate::gesture::Gesture;
use crate::input::{GamepadSnapshot, InputRouter};
use crate::types::{CameraMode, CameraTransform, DroneState, InputSource};
use crate::{Result, SimError};
use glam::DVec3;

/// External renderer. Receives the frame after simulation and camera update.
pub trait Renderer {
    fn render(&mut self, frame: &FrameOutput);
}

/// Everything the renderer needs for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameOutput {
    /// Frame counter, starting at 1 for the first tick.
    pub frame: u64,
    /// `None` until the drone asset has loaded.
    pub drone: Option<DroneState>,
    pub camera: CameraTransform,
    pub mode: CameraMode,
    pub source: InputSource,
    /// Drone rests on the ground (renderer recolors the model).
    pub grounded: bool,
    /// Time delta for the animation mixer, once the drone exists.
    pub animation_delta: Option<f64>,
}

/// Display-only state for the UI panels.
#[derive(Debug, Clone, PartialEq)]
pub struct UiStatus {
    pub gamepad_status: String,
    pub buttons: Vec<bool>,
    pub axes: Vec<f64>,
    pub gesture_label: Gesture,
    /// Gesture model still loading.
    pub loading: bool,
    pub source: InputSource,
    pub mode: CameraMode,
}

/// Single owner of the simulation state.
pub struct SimulationContext {
    config: SimConfig,
    input: InputRouter,
    camera: CameraDirector,
    animation: AnimationDriver,
    drone: Option<DroneState>,
    gesture_stream: Option<GestureStream>,
    last: FrameOutput,
    cancelled: bool,
}

impl SimulationContext {
    pub fn new(config: SimConfig) -> Result<Self> {
        let range = RemapRange::from_config(&config.animation)?;
        let camera = CameraDirector::new(config.camera);
        let last = FrameOutput {
            frame: 0,
            drone: None,
            camera: camera.transform(),
            mode: camera.mode(),
            source: InputSource::Keyboard,
            grounded: false,
            animation_delta: None,
        };

        Ok(Self {
            input: InputRouter::new(config.gamepad, config.gesture_drives_flight),
            camera,
            animation: AnimationDriver::new(range),
            drone: None,
            gesture_stream: None,
            last,
            cancelled: false,
            config,
        })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn input(&self) -> &InputRouter {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut InputRouter {
        &mut self.input
    }

    pub fn camera(&self) -> &CameraDirector {
        &self.camera
    }

    pub fn drone(&self) -> Option<&DroneState> {
        self.drone.as_ref()
    }

    pub fn key_down(&mut self, key: &str) {
        self.input.keyboard.key_down(key);
    }

    pub fn key_up(&mut self, key: &str) {
        self.input.keyboard.key_up(key);
    }

    pub fn gamepad_connected(&mut self, id: &str) {
        self.input.gamepad.connect(id);
    }

    pub fn gamepad_disconnected(&mut self) {
        self.input.gamepad.disconnect();
    }

    /// Feed this frame's gamepad poll.
    pub fn gamepad_poll(&mut self, snapshot: GamepadSnapshot) {
        self.input.gamepad.update(snapshot);
    }

    /// Feed a gesture classified outside of an attached stream.
    pub fn feed_gesture(&mut self, gesture: Gesture) {
        self.input.gesture.feed(gesture);
    }

    pub fn set_gesture_loading(&mut self, loading: bool) {
        self.input.gesture.set_loading(loading);
    }

    /// Run `detector` on its own thread at the configured gesture interval.
    pub fn start_gesture_stream<D, F>(&mut self, detector: D, frames: F) -> Result<()>
    where
        D: HandDetector + 'static,
        F: FrameSource + 'static,
    {
        let stream = GestureStream::start(detector, frames, self.config.gesture_interval)?;
        log::info!(
            "Gesture stream started (every {:?})",
            self.config.gesture_interval
        );
        self.input.gesture.set_loading(true);
        self.attach_gesture_stream(stream);
        Ok(())
    }

    /// Take ownership of a running detector; it is stopped on shutdown.
    pub fn attach_gesture_stream(&mut self, stream: GestureStream) {
        if let Some(old) = self.gesture_stream.replace(stream) {
            old.stop();
        }
    }

    /// The drone asset has arrived; flight starts on the next tick.
    pub fn drone_loaded(&mut self) {
        self.drone_loaded_at(DVec3::ZERO);
    }

    pub fn drone_loaded_at(&mut self, position: DVec3) {
        log::info!("Drone loaded at {:?}", position);
        self.drone = Some(DroneState::at(position));
    }

    /// Report an asset that failed to load. Logged only; nothing is retried.
    pub fn asset_failed(&mut self, path: &str, reason: &str) -> SimError {
        let err = SimError::AssetLoad {
            path: path.to_string(),
            reason: reason.to_string(),
        };
        log::warn!("{}", err);
        err
    }

    /// Cosmetic animation input (desired altitude).
    pub fn set_animation_input(&mut self, value: f64) {
        self.animation.set_input(value);
    }

    fn profile_for(&self, source: InputSource) -> FlightProfile {
        match source {
            InputSource::Keyboard => self.config.keyboard_profile,
            InputSource::Gamepad => self.config.gamepad_profile,
            InputSource::Gesture => self.config.gesture_profile,
        }
    }

    fn drain_gestures(&mut self) {
        let Some(stream) = &self.gesture_stream else {
            return;
        };
        for event in stream.drain() {
            match event {
                DetectorEvent::Ready => self.input.gesture.set_loading(false),
                DetectorEvent::Gesture(gesture) => self.input.gesture.feed(gesture),
            }
        }
    }

    /// Advance one frame: sample input, step the drone, update the camera.
    ///
    /// Never fails. Before the drone has loaded only the camera mode can
    /// change; after shutdown the last frame is returned unchanged.
    pub fn tick(&mut self) -> FrameOutput {
        if self.cancelled {
            return self.last;
        }

        self.drain_gestures();
        let input = self.input.poll();
        self.camera.apply(input.toggles);

        let profile = self.profile_for(input.source);
        if let Some(drone) = self.drone.as_mut() {
            *drone = flight::step(&input.control, drone, &profile);
        }

        let camera = self.camera.update(self.drone.as_ref());
        let animation_delta = self.drone.map(|_| self.animation.advance());

        self.last = FrameOutput {
            frame: self.last.frame + 1,
            drone: self.drone,
            camera,
            mode: self.camera.mode(),
            source: input.source,
            grounded: self.drone.map(|d| d.grounded).unwrap_or(false),
            animation_delta,
        };
        self.last
    }

    /// Tick and hand the result to the renderer.
    pub fn tick_and_render(&mut self, renderer: &mut dyn Renderer) -> FrameOutput {
        let frame = self.tick();
        if !self.cancelled {
            renderer.render(&frame);
        }
        frame
    }

    pub fn last_frame(&self) -> FrameOutput {
        self.last
    }

    pub fn status(&self) -> UiStatus {
        let gamepad = &self.input.gamepad;
        let (buttons, axes) = match gamepad.last_snapshot() {
            Some(s) => (s.buttons.clone(), s.axes.clone()),
            None => (Vec::new(), Vec::new()),
        };
        UiStatus {
            gamepad_status: gamepad.status(),
            buttons,
            axes,
            gesture_label: self.input.gesture.label(),
            loading: self.input.gesture.is_loading(),
            source: self.input.live(),
            mode: self.camera.mode(),
        }
    }

    /// Stop the gesture detector, drop the gamepad and halt ticking.
    pub fn shutdown(&mut self) {
        if self.cancelled {
            return;
        }
        self.cancelled = true;
        if let Some(stream) = self.gesture_stream.take() {
            stream.stop();
        }
        self.input.gamepad.disconnect();
        self.input.keyboard.release_all();
        log::info!("Simulation shut down after {} frames", self.last.frame);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}

impl Drop for SimulationContext {
    fn drop(&mut self) {
        self.shutdown();
    }
}
