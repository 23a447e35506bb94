use std::fmt;

/// Errors surfaced by the simulation core.
///
/// None of these are fatal to the render loop: the tick logs them and keeps
/// going with the last good state.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error("Failed to load asset {path}: {reason}")]
    AssetLoad { path: String, reason: String },

    #[error("Camera look-at target is degenerate")]
    DegenerateLookAt,

    #[error("Degenerate remap segment: input range [{from}, {to}] has zero width")]
    DegenerateRange { from: f64, to: f64 },

    #[error("Hand sample has {0} landmarks, expected 21")]
    LandmarkCount(usize),

    #[error("Hand detector failed: {0}")]
    Detector(String),

    #[error("Gesture stream stopped")]
    StreamStopped,

    #[error("Timeout waiting for gesture data")]
    Timeout,

    #[error("Channel disconnected")]
    ChannelDisconnected,

    #[error("Null simulation handle")]
    NullHandle,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Thread-safe last-error storage for the C FFI layer.
pub(crate) struct LastError {
    message: std::sync::Mutex<String>,
}

impl LastError {
    pub const fn new() -> Self {
        Self {
            message: std::sync::Mutex::new(String::new()),
        }
    }

    pub fn set(&self, err: &SimError) {
        if let Ok(mut msg) = self.message.lock() {
            *msg = fmt::format(format_args!("{}\0", err));
        }
    }

    pub fn clear(&self) {
        if let Ok(mut msg) = self.message.lock() {
            msg.clear();
        }
    }

    pub fn as_ptr(&self) -> *const std::ffi::c_char {
        match self.message.lock() {
            Ok(msg) if !msg.is_empty() => msg.as_ptr() as *const std::ffi::c_char,
            _ => std::ptr::null(),
        }
    }
}
