//! Tracking sessions
//!
//! A `TrackingSession` pairs a landmark detector with a `FrameTracker` and exposes
//! an awaitable request/response interface: submit one frame, get back its
//! metrics. Only one frame may be in flight per session. `submit_frame` takes
//! `&mut self`, so overlapping submissions are impossible on a plain session;
//! `SharedSession` enforces the same rule at runtime for callers that share a
//! session across tasks.
//!
//! Frames are taken by value. Whatever the outcome (dropped, failed, or
//! processed) the frame is released when `submit_frame` returns.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::ComputeError;
use crate::frame::FrameTracker;
use crate::types::{FaceObservation, FrameMetrics, SessionSummary};

/// External face-landmark estimator
///
/// Implementations wrap whatever model produces the keypoint mesh. `estimate_faces`
/// may return zero faces; only the first face is used.
pub trait LandmarkDetector {
    /// Per-frame input, typically an image buffer
    type Frame;

    /// Prepare the model. Called once before any frame is accepted.
    fn initialize(&mut self) -> impl Future<Output = Result<(), ComputeError>> + Send;

    /// Estimate face landmarks for one frame
    fn estimate_faces(
        &mut self,
        frame: &Self::Frame,
    ) -> impl Future<Output = Result<Vec<FaceObservation>, ComputeError>> + Send;
}

/// One tracking session: a detector plus per-session tracker state
pub struct TrackingSession<D: LandmarkDetector> {
    detector: D,
    tracker: FrameTracker,
    initialized: bool,
}

impl<D: LandmarkDetector> TrackingSession<D> {
    pub fn new(detector: D) -> Self {
        Self::with_config(detector, EngineConfig::default())
    }

    pub fn with_config(detector: D, config: EngineConfig) -> Self {
        Self {
            detector,
            tracker: FrameTracker::new(config),
            initialized: false,
        }
    }

    /// Initialize the detector
    ///
    /// Failure is reported as `DetectorUnavailable`; the session stays
    /// uninitialized and keeps dropping frames.
    pub async fn initialize(&mut self) -> Result<(), ComputeError> {
        match self.detector.initialize().await {
            Ok(()) => {
                self.initialized = true;
                info!(session_id = %self.tracker.summary().session_id, "tracking session initialized");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "landmark detector failed to initialize");
                Err(match e {
                    ComputeError::DetectorUnavailable(_) => e,
                    other => ComputeError::DetectorUnavailable(other.to_string()),
                })
            }
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Run one frame through detection and the per-frame pipeline
    ///
    /// Returns `Ok(None)` when the frame was dropped because the detector is not
    /// initialized. Detection failures and malformed observations are logged and
    /// returned as errors; tracker state is left as it was before the frame.
    pub async fn submit_frame(
        &mut self,
        frame: D::Frame,
        now_ms: i64,
    ) -> Result<Option<FrameMetrics>, ComputeError> {
        if !self.initialized {
            debug!("frame dropped: detector not initialized");
            return Ok(None);
        }

        let faces = match self.detector.estimate_faces(&frame).await {
            Ok(faces) => faces,
            Err(e) => {
                warn!(error = %e, "landmark detection failed");
                return Err(match e {
                    ComputeError::DetectionFailed(_) => e,
                    other => ComputeError::DetectionFailed(other.to_string()),
                });
            }
        };
        drop(frame);

        match self.tracker.process(faces.first(), now_ms) {
            Ok(metrics) => Ok(Some(metrics)),
            Err(e) => {
                warn!(error = %e, "frame rejected");
                Err(e)
            }
        }
    }

    pub fn summary(&self) -> &SessionSummary {
        self.tracker.summary()
    }

    pub fn needs_intervention(&self) -> bool {
        self.tracker.needs_intervention()
    }

    /// End the session, discarding all accumulated state, and return its summary.
    /// The detector stays initialized, so tracking can restart immediately.
    pub fn stop(&mut self) -> SessionSummary {
        let summary = self.tracker.summary().clone();
        info!(
            session_id = %summary.session_id,
            frames = summary.frames_processed,
            peak_stress = summary.peak_stress,
            "tracking session stopped"
        );
        self.tracker.reset();
        summary
    }
}

/// A session shared across tasks
///
/// Frame gating is kept apart from the state lock. A frame submitted while
/// another frame is still being processed is rejected with `FrameInFlight`;
/// a frame submitted before initialization has succeeded is dropped. Readers
/// such as `summary` only delay a frame, they never cause a rejection. In every
/// case the frame is released before `submit_frame` returns.
pub struct SharedSession<D: LandmarkDetector> {
    inner: Arc<Mutex<TrackingSession<D>>>,
    initialized: Arc<AtomicBool>,
    in_flight: Arc<AtomicBool>,
}

impl<D: LandmarkDetector> Clone for SharedSession<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            initialized: Arc::clone(&self.initialized),
            in_flight: Arc::clone(&self.in_flight),
        }
    }
}

/// Clears the in-flight flag when the submission ends, including on cancellation
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<D: LandmarkDetector> SharedSession<D> {
    pub fn new(session: TrackingSession<D>) -> Self {
        let initialized = session.is_initialized();
        Self {
            inner: Arc::new(Mutex::new(session)),
            initialized: Arc::new(AtomicBool::new(initialized)),
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub async fn initialize(&self) -> Result<(), ComputeError> {
        let mut session = self.inner.lock().await;
        session.initialize().await?;
        self.initialized.store(true, Ordering::Release);
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    pub async fn submit_frame(
        &self,
        frame: D::Frame,
        now_ms: i64,
    ) -> Result<Option<FrameMetrics>, ComputeError> {
        if !self.is_initialized() {
            debug!("frame dropped: detector not initialized");
            return Ok(None);
        }
        if self.in_flight.swap(true, Ordering::AcqRel) {
            debug!("frame rejected: another frame is in flight");
            return Err(ComputeError::FrameInFlight);
        }
        let _guard = InFlightGuard(&self.in_flight);

        let mut session = self.inner.lock().await;
        session.submit_frame(frame, now_ms).await
    }

    pub async fn summary(&self) -> SessionSummary {
        self.inner.lock().await.summary().clone()
    }

    pub async fn stop(&self) -> SessionSummary {
        self.inner.lock().await.stop()
    }
}
