//! Static hand-gesture classification from a single landmark sample.
//!
//! Landmarks use the 21-point hand model: index 0 is the wrist, then four
//! points per finger from the base out to the tip. Coordinates are in image
//! space, so `y` grows downward and "above" means numerically smaller.

use crate::{Result, SimError};
use glam::DVec3;

/// Number of landmarks in one hand sample.
pub const LANDMARK_COUNT: usize = 21;

/// A single landmark (x, y, z). `z` is 0 when the detector reports 2D points.
pub type Landmark = DVec3;

/// The five fingers, each with a tip landmark and the joint it is compared to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Finger {
    Thumb,
    Index,
    Middle,
    Ring,
    Pinky,
}

impl Finger {
    pub const ALL: [Finger; 5] = [
        Finger::Thumb,
        Finger::Index,
        Finger::Middle,
        Finger::Ring,
        Finger::Pinky,
    ];

    pub fn tip(self) -> usize {
        match self {
            Self::Thumb => 4,
            Self::Index => 8,
            Self::Middle => 12,
            Self::Ring => 16,
            Self::Pinky => 20,
        }
    }

    /// Reference joint: the IP joint for the thumb, the PIP joint otherwise.
    pub fn joint(self) -> usize {
        match self {
            Self::Thumb => 3,
            Self::Index => 6,
            Self::Middle => 10,
            Self::Ring => 14,
            Self::Pinky => 18,
        }
    }

    pub fn flag(self) -> FingerSet {
        match self {
            Self::Thumb => FingerSet::THUMB,
            Self::Index => FingerSet::INDEX,
            Self::Middle => FingerSet::MIDDLE,
            Self::Ring => FingerSet::RING,
            Self::Pinky => FingerSet::PINKY,
        }
    }
}

bitflags::bitflags! {
    /// Set of fingers, used for the open/closed state of a hand.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FingerSet: u8 {
        const THUMB  = 1 << 0;
        const INDEX  = 1 << 1;
        const MIDDLE = 1 << 2;
        const RING   = 1 << 3;
        const PINKY  = 1 << 4;
    }
}

/// Recognized gesture label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Gesture {
    Stop,
    Up,
    Down,
    Forward,
    Left,
    Right,
    Backward,
    #[default]
    None,
}

impl Gesture {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stop => "stop",
            Self::Up => "up",
            Self::Down => "down",
            Self::Forward => "forward",
            Self::Left => "left",
            Self::Right => "right",
            Self::Backward => "backward",
            Self::None => "none",
        }
    }

    /// Parse a label as produced by [`Gesture::as_str`]. Empty input is `None`.
    pub fn from_label(label: &str) -> Option<Gesture> {
        let gesture = match label.trim().to_ascii_lowercase().as_str() {
            "stop" => Self::Stop,
            "up" => Self::Up,
            "down" => Self::Down,
            "forward" => Self::Forward,
            "left" => Self::Left,
            "right" => Self::Right,
            "backward" => Self::Backward,
            "none" | "" => Self::None,
            _ => return None,
        };
        Some(gesture)
    }

    pub fn is_none(&self) -> bool {
        *self == Self::None
    }
}

/// One detected hand with exactly 21 landmarks.
#[derive(Debug, Clone, PartialEq)]
pub struct HandSample {
    landmarks: [Landmark; LANDMARK_COUNT],
}

impl HandSample {
    pub fn new(landmarks: [Landmark; LANDMARK_COUNT]) -> Self {
        Self { landmarks }
    }

    /// Build from raw detector points `[x, y]` or `[x, y, z]`.
    pub fn from_points(points: &[Vec<f64>]) -> Result<Self> {
        if points.len() != LANDMARK_COUNT {
            return Err(SimError::LandmarkCount(points.len()));
        }
        let mut landmarks = [DVec3::ZERO; LANDMARK_COUNT];
        for (slot, point) in landmarks.iter_mut().zip(points) {
            *slot = match point.as_slice() {
                [x, y] => DVec3::new(*x, *y, 0.0),
                [x, y, z, ..] => DVec3::new(*x, *y, *z),
                _ => {
                    return Err(SimError::InvalidArgument(format!(
                        "landmark has {} coordinates",
                        point.len()
                    )))
                }
            };
        }
        Ok(Self { landmarks })
    }

    pub fn landmark(&self, index: usize) -> Landmark {
        self.landmarks[index]
    }

    pub fn tip(&self, finger: Finger) -> Landmark {
        self.landmarks[finger.tip()]
    }

    pub fn joint(&self, finger: Finger) -> Landmark {
        self.landmarks[finger.joint()]
    }

    /// Fingers whose tip is above their joint.
    pub fn open_fingers(&self) -> FingerSet {
        Finger::ALL
            .iter()
            .filter(|f| self.tip(**f).y < self.joint(**f).y)
            .fold(FingerSet::empty(), |set, f| set | f.flag())
    }

    /// Every tip strictly below its joint.
    pub fn is_half_curled(&self) -> bool {
        Finger::ALL
            .iter()
            .all(|f| self.tip(*f).y > self.joint(*f).y)
    }

    /// Thumb tip lies left of the thumb joint in the image.
    pub fn thumb_points_left(&self) -> bool {
        self.tip(Finger::Thumb).x < self.joint(Finger::Thumb).x
    }
}

/// Apply the gesture rules in priority order; the first match wins.
///
/// The rules overlap (a half-curled hand is also a closed fist), so the
/// order decides the outcome and must stay fixed.
pub fn match_gesture(open: FingerSet, thumb_left: bool, half_curled: bool) -> Gesture {
    let others = open - FingerSet::THUMB;

    if open == FingerSet::all() {
        Gesture::Stop
    } else if others == FingerSet::INDEX {
        Gesture::Up
    } else if others == FingerSet::INDEX | FingerSet::MIDDLE {
        Gesture::Down
    } else if open.is_empty() {
        Gesture::Forward
    } else if open == FingerSet::PINKY {
        Gesture::Right
    } else if open == FingerSet::THUMB && thumb_left {
        Gesture::Left
    } else if half_curled {
        Gesture::Backward
    } else {
        Gesture::None
    }
}

/// Classify a single hand.
pub fn classify(hand: &HandSample) -> Gesture {
    match_gesture(
        hand.open_fingers(),
        hand.thumb_points_left(),
        hand.is_half_curled(),
    )
}

/// Classify the first detected hand; no hand yields [`Gesture::None`].
pub fn classify_first(hands: &[HandSample]) -> Gesture {
    hands.first().map(classify).unwrap_or(Gesture::None)
}
