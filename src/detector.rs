//! Background hand-gesture detection.
//!
//! The landmark detector is an external, potentially slow capability. It runs
//! on its own thread at a fixed cadence and hands classified gestures to the
//! render tick through a bounded channel, so the tick never blocks on it.

use crate::gesture::{classify_first, Gesture, HandSample};
use crate::{Result, SimError};
use crossbeam_channel::{Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Longest the worker sleeps before re-checking the stop flag.
const STOP_POLL: Duration = Duration::from_millis(10);

/// One captured webcam frame.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    /// Packed RGB8 pixels.
    pub data: Vec<u8>,
}

/// Supplies webcam frames.
pub trait FrameSource: Send {
    /// Most recent frame, or `None` while the camera is not ready.
    fn latest_frame(&mut self) -> Option<VideoFrame>;
}

/// External hand-landmark detector.
pub trait HandDetector: Send {
    /// Prepare the model. Runs once on the worker thread before any frame.
    fn load(&mut self) -> Result<()> {
        Ok(())
    }

    /// Detect hands in a frame. An empty result means no hand.
    fn estimate(&mut self, frame: &VideoFrame) -> Result<Vec<HandSample>>;
}

/// Messages from the detector thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorEvent {
    /// The model finished loading.
    Ready,
    /// Classification of the first detected hand in a frame.
    Gesture(Gesture),
}

/// Handle to a running detector thread.
pub struct GestureStream {
    receiver: Receiver<DetectorEvent>,
    stop_flag: Arc<AtomicBool>,
    interval: Duration,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl GestureStream {
    /// Spawn the detector thread, sampling `frames` every `interval`.
    pub fn start<D, F>(detector: D, frames: F, interval: Duration) -> Result<GestureStream>
    where
        D: HandDetector + 'static,
        F: FrameSource + 'static,
    {
        let (sender, receiver) = crossbeam_channel::bounded(32);
        let stop_flag = Arc::new(AtomicBool::new(false));
        let stop_clone = stop_flag.clone();

        let thread = std::thread::Builder::new()
            .name("dronesim-gesture".into())
            .spawn(move || {
                detector_loop(detector, frames, sender, stop_clone, interval);
            })
            .map_err(|e| SimError::Detector(format!("Failed to spawn gesture thread: {}", e)))?;

        Ok(GestureStream {
            receiver,
            stop_flag,
            interval,
            thread: Some(thread),
        })
    }

    /// Sampling cadence of the detector thread.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Try to receive an event without blocking.
    pub fn try_recv(&self) -> Option<DetectorEvent> {
        self.receiver.try_recv().ok()
    }

    /// Receive an event with a timeout.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<DetectorEvent> {
        self.receiver.recv_timeout(timeout).map_err(|e| match e {
            crossbeam_channel::RecvTimeoutError::Timeout => SimError::Timeout,
            crossbeam_channel::RecvTimeoutError::Disconnected => SimError::StreamStopped,
        })
    }

    /// Every event queued since the last call, oldest first.
    pub fn drain(&self) -> Vec<DetectorEvent> {
        self.receiver.try_iter().collect()
    }

    pub fn is_active(&self) -> bool {
        !self.stop_flag.load(Ordering::Relaxed)
    }

    /// Stop the detector and wait for its thread to finish.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop_flag.store(true, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for GestureStream {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn detector_loop<D: HandDetector, F: FrameSource>(
    mut detector: D,
    mut frames: F,
    sender: Sender<DetectorEvent>,
    stop_flag: Arc<AtomicBool>,
    interval: Duration,
) {
    log::info!("Gesture detector loading");
    if let Err(e) = detector.load() {
        log::warn!("Gesture detector failed to load: {}", e);
        return;
    }
    if sender.try_send(DetectorEvent::Ready).is_err() {
        return;
    }
    log::info!("Gesture detector ready (every {:?})", interval);

    let mut next = Instant::now();
    loop {
        if stop_flag.load(Ordering::Relaxed) {
            log::info!("Gesture detector stopping (stop flag set)");
            break;
        }

        let now = Instant::now();
        if now < next {
            std::thread::sleep((next - now).min(STOP_POLL));
            continue;
        }
        // Skip missed ticks rather than bursting to catch up.
        next = (next + interval).max(now);

        let Some(frame) = frames.latest_frame() else {
            continue;
        };

        let gesture = match detector.estimate(&frame) {
            Ok(hands) => classify_first(&hands),
            Err(e) => {
                log::warn!("Gesture detection failed: {}", e);
                continue;
            }
        };

        if let Err(e) = sender.try_send(DetectorEvent::Gesture(gesture)) {
            match e {
                crossbeam_channel::TrySendError::Full(_) => {
                    log::trace!("Gesture channel full, dropping sample");
                }
                crossbeam_channel::TrySendError::Disconnected(_) => {
                    log::info!("Gesture channel disconnected, stopping detector");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gesture::tests::hand;
    use crate::gesture::FingerSet;
    use std::sync::atomic::AtomicUsize;

    struct FakeFrames {
        warmup: usize,
    }

    impl FrameSource for FakeFrames {
        fn latest_frame(&mut self) -> Option<VideoFrame> {
            if self.warmup > 0 {
                self.warmup -= 1;
                return None;
            }
            Some(VideoFrame {
                width: 2,
                height: 2,
                data: vec![0; 12],
            })
        }
    }

    struct FakeDetector {
        open: FingerSet,
        calls: Arc<AtomicUsize>,
    }

    impl HandDetector for FakeDetector {
        fn estimate(&mut self, _frame: &VideoFrame) -> Result<Vec<HandSample>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![hand(self.open, false)])
        }
    }

    struct BrokenDetector;

    impl HandDetector for BrokenDetector {
        fn load(&mut self) -> Result<()> {
            Err(SimError::Detector("model missing".into()))
        }

        fn estimate(&mut self, _frame: &VideoFrame) -> Result<Vec<HandSample>> {
            unreachable!()
        }
    }

    fn detector(open: FingerSet) -> (FakeDetector, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            FakeDetector {
                open,
                calls: calls.clone(),
            },
            calls,
        )
    }

    #[test]
    fn test_stream_reports_ready_then_gestures() {
        let (det, _) = detector(FingerSet::INDEX);
        let stream =
            GestureStream::start(det, FakeFrames { warmup: 2 }, Duration::from_millis(2)).unwrap();
        let timeout = Duration::from_secs(2);
        assert_eq!(stream.recv_timeout(timeout).unwrap(), DetectorEvent::Ready);
        assert_eq!(
            stream.recv_timeout(timeout).unwrap(),
            DetectorEvent::Gesture(Gesture::Up)
        );
        stream.stop();
    }

    #[test]
    fn test_frames_not_ready_yield_nothing() {
        let (det, calls) = detector(FingerSet::all());
        let stream = GestureStream::start(
            det,
            FakeFrames { warmup: usize::MAX },
            Duration::from_millis(1),
        )
        .unwrap();
        assert_eq!(
            stream.recv_timeout(Duration::from_secs(2)).unwrap(),
            DetectorEvent::Ready
        );
        assert!(matches!(
            stream.recv_timeout(Duration::from_millis(50)),
            Err(SimError::Timeout)
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_drop_stops_worker() {
        let (det, calls) = detector(FingerSet::empty());
        let stream =
            GestureStream::start(det, FakeFrames { warmup: 0 }, Duration::from_millis(1)).unwrap();
        assert!(stream.is_active());
        std::thread::sleep(Duration::from_millis(20));
        drop(stream);

        let after_drop = calls.load(Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(calls.load(Ordering::SeqCst), after_drop);
    }

    #[test]
    fn test_failed_load_ends_stream() {
        let stream =
            GestureStream::start(BrokenDetector, FakeFrames { warmup: 0 }, Duration::from_millis(1))
                .unwrap();
        assert!(matches!(
            stream.recv_timeout(Duration::from_secs(2)),
            Err(SimError::StreamStopped)
        ));
    }
}
