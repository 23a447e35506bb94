//! Input adapters.
//!
//! Each adapter reduces one raw source (keyboard events, gamepad polls,
//! gesture labels) to the same [`ControlState`] plus edge-triggered view
//! toggles. [`InputRouter`] decides which adapter is live; only the live
//! adapter's state reaches flight dynamics.

use crate::config::GamepadConfig;
use crate::gesture::Gesture;
use crate::types::{ControlState, InputSource, Intent, ViewToggles};

/// A source of control snapshots.
pub trait InputAdapter {
    fn source(&self) -> InputSource;

    /// Control state for the current frame.
    fn poll(&mut self) -> ControlState;

    /// View toggles fired since the previous call.
    fn take_toggles(&mut self) -> ViewToggles;

    /// Whether real input arrived since the previous call.
    fn take_activity(&mut self) -> bool;
}

// -- Keyboard --

/// What a key does when pressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Move(Intent),
    Toggle(ViewToggles),
}

/// Map a DOM-style key identifier to its action. Letter keys are
/// case-insensitive.
pub fn key_binding(key: &str) -> Option<KeyAction> {
    let action = match key {
        "ArrowUp" => KeyAction::Move(Intent::PITCH_BACKWARD),
        "ArrowDown" => KeyAction::Move(Intent::PITCH_FORWARD),
        "ArrowLeft" => KeyAction::Move(Intent::ROLL_LEFT),
        "ArrowRight" => KeyAction::Move(Intent::ROLL_RIGHT),
        _ => {
            let mut chars = key.chars();
            let (Some(c), None) = (chars.next(), chars.next()) else {
                return None;
            };
            match c.to_ascii_lowercase() {
                'a' => KeyAction::Move(Intent::YAW_LEFT),
                'd' => KeyAction::Move(Intent::YAW_RIGHT),
                'w' => KeyAction::Move(Intent::THROTTLE_UP),
                's' => KeyAction::Move(Intent::THROTTLE_DOWN),
                'c' => KeyAction::Toggle(ViewToggles::POV),
                'm' => KeyAction::Toggle(ViewToggles::BOTTOM),
                'f' => KeyAction::Toggle(ViewToggles::FIXED),
                _ => return None,
            }
        }
    };
    Some(action)
}

/// Event-driven keyboard state.
///
/// Movement keys are level-triggered. Toggle keys fire once per physical
/// press; auto-repeat key-downs are ignored until the key is released.
#[derive(Debug, Default)]
pub struct KeyboardAdapter {
    /// Held movement intents in press order.
    held: Vec<Intent>,
    held_toggles: ViewToggles,
    pending: ViewToggles,
    activity: bool,
}

impl KeyboardAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key_down(&mut self, key: &str) {
        match key_binding(key) {
            Some(KeyAction::Move(intent)) => {
                if !self.held.contains(&intent) {
                    self.held.push(intent);
                }
                self.activity = true;
            }
            Some(KeyAction::Toggle(toggle)) => {
                if !self.held_toggles.contains(toggle) {
                    self.held_toggles.insert(toggle);
                    self.pending.insert(toggle);
                }
                self.activity = true;
            }
            None => {}
        }
    }

    pub fn key_up(&mut self, key: &str) {
        match key_binding(key) {
            Some(KeyAction::Move(intent)) => self.held.retain(|i| *i != intent),
            Some(KeyAction::Toggle(toggle)) => self.held_toggles.remove(toggle),
            None => {}
        }
    }

    /// Forget all held keys (focus loss, teardown).
    pub fn release_all(&mut self) {
        self.held.clear();
        self.held_toggles = ViewToggles::empty();
        self.pending = ViewToggles::empty();
    }

    /// Current state without consuming anything.
    pub fn state(&self) -> ControlState {
        // Later presses override earlier ones on the same axis.
        self.held.iter().fold(ControlState::NEUTRAL, |mut control, intent| {
            control.engage(*intent);
            control
        })
    }
}

impl InputAdapter for KeyboardAdapter {
    fn source(&self) -> InputSource {
        InputSource::Keyboard
    }

    fn poll(&mut self) -> ControlState {
        self.state()
    }

    fn take_toggles(&mut self) -> ViewToggles {
        std::mem::take(&mut self.pending)
    }

    fn take_activity(&mut self) -> bool {
        // Held movement keys keep the keyboard live.
        std::mem::take(&mut self.activity) || !self.held.is_empty()
    }
}

// -- Gamepad --

/// Standard-layout button indices.
pub mod button {
    pub const THROTTLE_UP: usize = 0;
    pub const THROTTLE_DOWN: usize = 1;
    pub const TOGGLE_FIXED: usize = 3;
    pub const TOGGLE_POV: usize = 4;
    pub const TOGGLE_BOTTOM: usize = 5;
    pub const PITCH_BACKWARD: usize = 12;
    pub const PITCH_FORWARD: usize = 13;
    pub const ROLL_LEFT: usize = 14;
    pub const ROLL_RIGHT: usize = 15;
}

/// Standard-layout axis indices.
pub mod axis {
    /// Negative is left.
    pub const ROLL: usize = 0;
    /// Positive is forward.
    pub const PITCH: usize = 1;
    /// Negative is left.
    pub const YAW: usize = 2;
    /// Negative is up.
    pub const THROTTLE: usize = 3;
}

/// One poll of the connected gamepad.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GamepadSnapshot {
    pub buttons: Vec<bool>,
    pub axes: Vec<f64>,
}

impl GamepadSnapshot {
    pub fn new(buttons: Vec<bool>, axes: Vec<f64>) -> Self {
        Self { buttons, axes }
    }

    /// Missing buttons read as released.
    pub fn button(&self, index: usize) -> bool {
        self.buttons.get(index).copied().unwrap_or(false)
    }

    /// Axis value clamped to ±1. Missing or NaN axes read as 0.
    pub fn axis(&self, index: usize) -> f64 {
        match self.axes.get(index) {
            Some(v) if !v.is_nan() => v.clamp(-1.0, 1.0),
            _ => 0.0,
        }
    }
}

#[derive(Debug)]
struct GamepadSession {
    id: String,
    /// Toggle buttons held at the previous poll.
    previous: ViewToggles,
    last: Option<GamepadSnapshot>,
}

/// Polled gamepad state.
///
/// Polling only happens between `connect` and `disconnect`; a disconnect
/// drops the session so no state leaks into a later connection.
#[derive(Debug, Default)]
pub struct GamepadAdapter {
    config: GamepadConfig,
    session: Option<GamepadSession>,
    control: ControlState,
    pending: ViewToggles,
    activity: bool,
}

impl GamepadAdapter {
    pub fn new(config: GamepadConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn connect(&mut self, id: &str) {
        log::info!("Gamepad connected: {}", id);
        self.session = Some(GamepadSession {
            id: id.to_string(),
            previous: ViewToggles::empty(),
            last: None,
        });
        self.control = ControlState::NEUTRAL;
    }

    pub fn disconnect(&mut self) {
        if let Some(session) = self.session.take() {
            log::info!("Gamepad disconnected: {}", session.id);
        }
        self.control = ControlState::NEUTRAL;
        self.pending = ViewToggles::empty();
        self.activity = false;
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    /// Connection status string for display.
    pub fn status(&self) -> String {
        match &self.session {
            Some(session) => format!("Connected {}", session.id),
            None => "Disconnected".to_string(),
        }
    }

    /// Most recent snapshot, for the per-button and per-axis readout.
    pub fn last_snapshot(&self) -> Option<&GamepadSnapshot> {
        self.session.as_ref().and_then(|s| s.last.as_ref())
    }

    /// Feed one poll. Ignored while disconnected.
    pub fn update(&mut self, snapshot: GamepadSnapshot) {
        let Some(session) = self.session.as_mut() else {
            log::trace!("Gamepad poll without a connected device");
            return;
        };

        let threshold = self.config.axis_threshold;
        let low = |i: usize| {
            let v = snapshot.axis(i);
            v < 0.0 && v <= -threshold
        };
        let high = |i: usize| {
            let v = snapshot.axis(i);
            v > 0.0 && v >= threshold
        };

        let mut intents = Intent::empty();
        if low(axis::ROLL) || snapshot.button(button::ROLL_LEFT) {
            intents |= Intent::ROLL_LEFT;
        } else if high(axis::ROLL) || snapshot.button(button::ROLL_RIGHT) {
            intents |= Intent::ROLL_RIGHT;
        }
        if high(axis::PITCH) || snapshot.button(button::PITCH_FORWARD) {
            intents |= Intent::PITCH_FORWARD;
        } else if low(axis::PITCH) || snapshot.button(button::PITCH_BACKWARD) {
            intents |= Intent::PITCH_BACKWARD;
        }
        if low(axis::YAW) {
            intents |= Intent::YAW_LEFT;
        } else if high(axis::YAW) {
            intents |= Intent::YAW_RIGHT;
        }
        if low(axis::THROTTLE) || snapshot.button(button::THROTTLE_UP) {
            intents |= Intent::THROTTLE_UP;
        } else if high(axis::THROTTLE) || snapshot.button(button::THROTTLE_DOWN) {
            intents |= Intent::THROTTLE_DOWN;
        }

        let mut held = ViewToggles::empty();
        held.set(ViewToggles::POV, snapshot.button(button::TOGGLE_POV));
        held.set(ViewToggles::BOTTOM, snapshot.button(button::TOGGLE_BOTTOM));
        held.set(ViewToggles::FIXED, snapshot.button(button::TOGGLE_FIXED));
        let fired = if self.config.hold_toggles {
            held
        } else {
            held - session.previous
        };
        session.previous = held;
        session.last = Some(snapshot);

        self.control = ControlState::from_intents(intents);
        self.pending |= fired;
        self.activity |= !intents.is_empty() || !fired.is_empty();
    }
}

impl InputAdapter for GamepadAdapter {
    fn source(&self) -> InputSource {
        InputSource::Gamepad
    }

    fn poll(&mut self) -> ControlState {
        self.control
    }

    fn take_toggles(&mut self) -> ViewToggles {
        std::mem::take(&mut self.pending)
    }

    fn take_activity(&mut self) -> bool {
        std::mem::take(&mut self.activity)
    }
}

// -- Gesture --

/// Flight intents a gesture asks for. `stop` and `none` hover.
pub fn gesture_intents(gesture: Gesture) -> Intent {
    match gesture {
        Gesture::Up => Intent::THROTTLE_UP,
        Gesture::Down => Intent::THROTTLE_DOWN,
        Gesture::Forward => Intent::PITCH_FORWARD,
        Gesture::Backward => Intent::PITCH_BACKWARD,
        Gesture::Left => Intent::ROLL_LEFT,
        Gesture::Right => Intent::ROLL_RIGHT,
        Gesture::Stop | Gesture::None => Intent::empty(),
    }
}

/// Holds the most recent gesture classification.
///
/// When `drives_flight` is false the gesture is display-only and the adapter
/// never becomes live.
#[derive(Debug)]
pub struct GestureAdapter {
    drives_flight: bool,
    current: Gesture,
    /// Last recognized (non-`none`) gesture, for display.
    label: Gesture,
    loading: bool,
    activity: bool,
}

impl GestureAdapter {
    pub fn new(drives_flight: bool) -> Self {
        Self {
            drives_flight,
            current: Gesture::None,
            label: Gesture::None,
            loading: true,
            activity: false,
        }
    }

    /// Record the latest classification.
    pub fn feed(&mut self, gesture: Gesture) {
        if gesture != self.current {
            log::debug!("Gesture {} -> {}", self.current.as_str(), gesture.as_str());
        }
        self.current = gesture;
        if !gesture.is_none() {
            self.label = gesture;
            self.activity |= self.drives_flight;
        }
    }

    pub fn current(&self) -> Gesture {
        self.current
    }

    pub fn label(&self) -> Gesture {
        self.label
    }

    pub fn drives_flight(&self) -> bool {
        self.drives_flight
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }
}

impl InputAdapter for GestureAdapter {
    fn source(&self) -> InputSource {
        InputSource::Gesture
    }

    fn poll(&mut self) -> ControlState {
        if self.drives_flight {
            ControlState::from_intents(gesture_intents(self.current))
        } else {
            ControlState::NEUTRAL
        }
    }

    fn take_toggles(&mut self) -> ViewToggles {
        ViewToggles::empty()
    }

    fn take_activity(&mut self) -> bool {
        std::mem::take(&mut self.activity)
    }
}

// -- Routing --

/// Output of one routing pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputFrame {
    pub source: InputSource,
    pub control: ControlState,
    pub toggles: ViewToggles,
}

/// Owns the three adapters and picks the live one.
///
/// The live adapter changes only when another adapter produces real input
/// during a frame in which the live one stays quiet; ties go to keyboard,
/// then gamepad, then gesture.
#[derive(Debug)]
pub struct InputRouter {
    pub keyboard: KeyboardAdapter,
    pub gamepad: GamepadAdapter,
    pub gesture: GestureAdapter,
    live: InputSource,
}

impl InputRouter {
    pub fn new(gamepad: GamepadConfig, gesture_drives_flight: bool) -> Self {
        Self {
            keyboard: KeyboardAdapter::new(),
            gamepad: GamepadAdapter::new(gamepad),
            gesture: GestureAdapter::new(gesture_drives_flight),
            live: InputSource::Keyboard,
        }
    }

    pub fn live(&self) -> InputSource {
        self.live
    }

    pub fn adapter_mut(&mut self, source: InputSource) -> &mut dyn InputAdapter {
        match source {
            InputSource::Keyboard => &mut self.keyboard,
            InputSource::Gamepad => &mut self.gamepad,
            InputSource::Gesture => &mut self.gesture,
        }
    }

    /// Sample every adapter and return the live one's state.
    pub fn poll(&mut self) -> InputFrame {
        const ORDER: [InputSource; 3] = [
            InputSource::Keyboard,
            InputSource::Gamepad,
            InputSource::Gesture,
        ];

        let mut active = [false; 3];
        let mut toggles = [ViewToggles::empty(); 3];
        for (i, source) in ORDER.iter().enumerate() {
            let adapter = self.adapter_mut(*source);
            active[i] = adapter.take_activity();
            toggles[i] = adapter.take_toggles();
        }

        let live_index = ORDER.iter().position(|s| *s == self.live).unwrap_or(0);
        if !active[live_index] {
            if let Some(i) = active.iter().position(|a| *a) {
                log::debug!(
                    "Input source {} -> {}",
                    self.live.as_str(),
                    ORDER[i].as_str()
                );
                self.live = ORDER[i];
            }
        }

        let live = self.live;
        let live_index = ORDER.iter().position(|s| *s == live).unwrap_or(0);
        InputFrame {
            source: live,
            control: self.adapter_mut(live).poll(),
            toggles: toggles[live_index],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pad(buttons: &[usize], axes: [f64; 4]) -> GamepadSnapshot {
        let mut pressed = vec![false; 17];
        for b in buttons {
            pressed[*b] = true;
        }
        GamepadSnapshot::new(pressed, axes.to_vec())
    }

    #[test]
    fn test_keyboard_level_triggered() {
        let mut kb = KeyboardAdapter::new();
        kb.key_down("w");
        assert!(kb.poll().is_active(Intent::THROTTLE_UP));
        assert!(kb.poll().is_active(Intent::THROTTLE_UP));
        kb.key_up("w");
        assert!(kb.poll().is_neutral());
    }

    #[test]
    fn test_keyboard_arrow_mapping() {
        let mut kb = KeyboardAdapter::new();
        kb.key_down("ArrowUp");
        kb.key_down("ArrowLeft");
        kb.key_down("D");
        let control = kb.poll();
        assert_eq!(
            control.intents(),
            Intent::PITCH_BACKWARD | Intent::ROLL_LEFT | Intent::YAW_RIGHT
        );
    }

    #[test]
    fn test_keyboard_opposites_latest_wins() {
        let mut kb = KeyboardAdapter::new();
        kb.key_down("w");
        kb.key_down("s");
        assert_eq!(kb.poll().intents(), Intent::THROTTLE_DOWN);
        kb.key_up("s");
        assert_eq!(kb.poll().intents(), Intent::THROTTLE_UP);
    }

    #[test]
    fn test_keyboard_toggle_once_per_press() {
        let mut kb = KeyboardAdapter::new();
        kb.key_down("c");
        kb.key_down("c"); // auto-repeat
        assert_eq!(kb.take_toggles(), ViewToggles::POV);
        kb.key_down("C");
        assert_eq!(kb.take_toggles(), ViewToggles::empty());
        kb.key_up("c");
        kb.key_down("c");
        assert_eq!(kb.take_toggles(), ViewToggles::POV);
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let mut kb = KeyboardAdapter::new();
        kb.key_down("Shift");
        kb.key_down("x");
        assert!(kb.poll().is_neutral());
        assert!(!kb.take_activity());
    }

    #[test]
    fn test_gamepad_ignored_until_connected() {
        let mut gp = GamepadAdapter::new(GamepadConfig::default());
        gp.update(pad(&[button::THROTTLE_UP], [0.0; 4]));
        assert!(gp.poll().is_neutral());
        assert_eq!(gp.status(), "Disconnected");

        gp.connect("pad-0");
        assert_eq!(gp.status(), "Connected pad-0");
        gp.update(pad(&[button::THROTTLE_UP], [0.0; 4]));
        assert!(gp.poll().is_active(Intent::THROTTLE_UP));

        gp.disconnect();
        assert!(gp.poll().is_neutral());
        assert!(gp.last_snapshot().is_none());
    }

    #[test]
    fn test_gamepad_axes() {
        let mut gp = GamepadAdapter::new(GamepadConfig::default());
        gp.connect("pad");
        gp.update(pad(&[], [-1.0, 1.0, 1.5, -1.0]));
        assert_eq!(
            gp.poll().intents(),
            Intent::ROLL_LEFT | Intent::PITCH_FORWARD | Intent::YAW_RIGHT | Intent::THROTTLE_UP
        );

        // Inside the dead zone nothing is requested.
        gp.update(pad(&[], [0.1, -0.2, 0.05, 0.3]));
        assert!(gp.poll().is_neutral());
    }

    #[test]
    fn test_gamepad_buttons() {
        let mut gp = GamepadAdapter::new(GamepadConfig::default());
        gp.connect("pad");
        gp.update(pad(
            &[button::PITCH_BACKWARD, button::ROLL_RIGHT, button::THROTTLE_DOWN],
            [0.0; 4],
        ));
        assert_eq!(
            gp.poll().intents(),
            Intent::PITCH_BACKWARD | Intent::ROLL_RIGHT | Intent::THROTTLE_DOWN
        );
    }

    #[test]
    fn test_gamepad_toggle_edge_detected() {
        let mut gp = GamepadAdapter::new(GamepadConfig::default());
        gp.connect("pad");
        gp.update(pad(&[button::TOGGLE_POV], [0.0; 4]));
        gp.update(pad(&[button::TOGGLE_POV], [0.0; 4]));
        assert_eq!(gp.take_toggles(), ViewToggles::POV);
        gp.update(pad(&[button::TOGGLE_POV], [0.0; 4]));
        assert_eq!(gp.take_toggles(), ViewToggles::empty());
        gp.update(pad(&[], [0.0; 4]));
        gp.update(pad(&[button::TOGGLE_BOTTOM], [0.0; 4]));
        assert_eq!(gp.take_toggles(), ViewToggles::BOTTOM);
    }

    #[test]
    fn test_gamepad_hold_toggles_fire_every_poll() {
        let mut gp = GamepadAdapter::new(GamepadConfig {
            hold_toggles: true,
            ..GamepadConfig::default()
        });
        gp.connect("pad");
        gp.update(pad(&[button::TOGGLE_POV], [0.0; 4]));
        assert_eq!(gp.take_toggles(), ViewToggles::POV);
        gp.update(pad(&[button::TOGGLE_POV], [0.0; 4]));
        assert_eq!(gp.take_toggles(), ViewToggles::POV);
    }

    #[test]
    fn test_gamepad_short_snapshot() {
        let mut gp = GamepadAdapter::new(GamepadConfig::default());
        gp.connect("pad");
        gp.update(GamepadSnapshot::new(vec![true], vec![f64::NAN]));
        assert_eq!(gp.poll().intents(), Intent::THROTTLE_UP);
    }

    #[test]
    fn test_gesture_adapter() {
        let mut g = GestureAdapter::new(true);
        assert!(g.is_loading());
        g.feed(Gesture::Up);
        assert_eq!(g.poll().intents(), Intent::THROTTLE_UP);
        g.feed(Gesture::None);
        assert!(g.poll().is_neutral());
        assert_eq!(g.label(), Gesture::Up);

        let mut display = GestureAdapter::new(false);
        display.feed(Gesture::Forward);
        assert!(display.poll().is_neutral());
        assert!(!display.take_activity());
        assert_eq!(display.label(), Gesture::Forward);
    }

    #[test]
    fn test_router_last_active_source_wins() {
        let mut router = InputRouter::new(GamepadConfig::default(), true);
        router.keyboard.key_down("w");
        let frame = router.poll();
        assert_eq!(frame.source, InputSource::Keyboard);
        assert!(frame.control.is_active(Intent::THROTTLE_UP));

        router.keyboard.key_up("w");
        router.gamepad.connect("pad");
        router.gamepad.update(pad(&[button::ROLL_LEFT], [0.0; 4]));
        let frame = router.poll();
        assert_eq!(frame.source, InputSource::Gamepad);
        assert_eq!(frame.control.intents(), Intent::ROLL_LEFT);

        // A quiet gamepad keeps ownership; gesture input takes over.
        router.gamepad.update(pad(&[], [0.0; 4]));
        router.gesture.feed(Gesture::Down);
        let frame = router.poll();
        assert_eq!(frame.source, InputSource::Gesture);
        assert_eq!(frame.control.intents(), Intent::THROTTLE_DOWN);
    }

    #[test]
    fn test_router_keeps_busy_live_source() {
        let mut router = InputRouter::new(GamepadConfig::default(), true);
        router.keyboard.key_down("a");
        router.poll();
        router.gesture.feed(Gesture::Up);
        let frame = router.poll();
        assert_eq!(frame.source, InputSource::Keyboard);
        assert_eq!(frame.control.intents(), Intent::YAW_LEFT);
    }

    #[test]
    fn test_router_toggle_switches_source() {
        let mut router = InputRouter::new(GamepadConfig::default(), true);
        router.gamepad.connect("pad");
        router.gamepad.update(pad(&[button::TOGGLE_BOTTOM], [0.0; 4]));
        let frame = router.poll();
        assert_eq!(frame.source, InputSource::Gamepad);
        assert_eq!(frame.toggles, ViewToggles::BOTTOM);
        assert!(frame.control.is_neutral());
    }
}
