//! Capture orchestrator: the polling loop of one verification session
//!
//! Each tick reads one frame, runs the detector once, gates the result and
//! feeds the sample buffer. When the buffer fills, the finalizer hands the
//! payload to the caller and the verdict decides between completion, a
//! login retry and failure.
//!
//! The orchestrator owns its [`CaptureSession`] and runs as a single tokio
//! task, so ticks never overlap and no detector call starts while another
//! is in flight. A call that outlives its timeout keeps the detector busy
//! until it returns; its result is dropped.
//!
//! ```rust,ignore
//! let handle = facegate::orchestrator::start(source, detector, settings, callbacks).await?;
//! // ... later, from anywhere
//! handle.stop();
//! let report = handle.wait().await?;
//! ```

use crate::assert_invariant;
use crate::callbacks::CaptureCallbacks;
use crate::config::SessionSettings;
use crate::detector::Detector;
use crate::errors::CaptureError;
use crate::finalize::{FinalizeOutcome, Finalizer};
use crate::invariants::NO_DETECTION_WHILE_PROCESSING;
use crate::quality::{GateDecision, RejectReason};
use crate::scheduler::{IntervalTicker, StopListener, StopSignal, Ticker};
use crate::session::{CaptureSession, Phase, Transition};
use crate::source::VideoSource;
use crate::status::{
    StatusKind, StatusUpdate, EXHAUSTED_MESSAGE, INIT_FAILURE_MESSAGE,
    REGISTRATION_FAILED_MESSAGE,
};
use crate::types::{DetectionResult, Frame, Sample, Variant};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Why a tick did nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Session is complete or failed
    Inactive,
    NotInitialized,
    /// Finalization owns the session
    Processing,
    /// A timed-out detector call has not returned yet
    DetectorBusy,
    SourceNotReady,
}

/// What a single tick did
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    Skipped(SkipReason),
    NoFace,
    Rejected(RejectReason),
    Accepted { captured: usize, required: usize },
    /// Frame or detector error, swallowed
    TransientError(CaptureError),
    Completed,
    Retrying { attempt: u32, max_attempts: u32 },
    Failed(CaptureError),
    Cancelled,
}

/// Per-session counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub ticks: u64,
    pub detector_calls: u64,
    pub misses: u64,
    pub rejections: u64,
    pub accepted: u64,
    pub transient_errors: u64,
    pub timeouts: u64,
}

/// Summary returned when a session's loop ends
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaptureReport {
    pub session_id: String,
    pub variant: Variant,
    pub final_phase: Phase,
    pub samples_accepted: u64,
    pub attempts: u32,
    pub cancelled: bool,
    pub stats: SessionStats,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

type DetectTask = JoinHandle<Result<Option<DetectionResult>, CaptureError>>;

pub struct CaptureOrchestrator {
    session: CaptureSession,
    settings: SessionSettings,
    source: Arc<dyn VideoSource>,
    detector: Arc<dyn Detector>,
    callbacks: Arc<dyn CaptureCallbacks>,
    finalizer: Finalizer,
    stop: StopSignal,
    listener: StopListener,
    stalled: Option<DetectTask>,
    stats: SessionStats,
    started_at: DateTime<Utc>,
}

impl CaptureOrchestrator {
    pub fn new(
        source: Arc<dyn VideoSource>,
        detector: Arc<dyn Detector>,
        settings: SessionSettings,
        callbacks: Arc<dyn CaptureCallbacks>,
    ) -> Self {
        let session = CaptureSession::new(
            settings.variant,
            settings.required_samples,
            settings.max_attempts,
        );
        let finalizer = Finalizer::new(settings.stages.clone(), settings.close_delay);
        let stop = StopSignal::new();
        let listener = stop.listener();

        Self {
            session,
            settings,
            source,
            detector,
            callbacks,
            finalizer,
            stop,
            listener,
            stalled: None,
            stats: SessionStats::default(),
            started_at: Utc::now(),
        }
    }

    pub fn id(&self) -> &str {
        self.session.id()
    }

    pub fn session(&self) -> &CaptureSession {
        &self.session
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    /// Load the detector model. On failure the session is terminal and the
    /// caller sees the failure status; there is no retry.
    pub async fn initialize(&mut self) -> Result<(), CaptureError> {
        log::info!(
            "Starting {} session {} with detector {}",
            self.session.variant(),
            self.session.id(),
            self.detector.name()
        );
        self.emit(StatusKind::Loading);

        match self.detector.initialize().await {
            Ok(()) => {
                self.advance(Transition::InitSucceeded);
                self.emit(StatusKind::Ready);
                Ok(())
            }
            Err(e) => {
                let err = match e {
                    CaptureError::InitError(_) => e,
                    other => CaptureError::InitError(other.to_string()),
                };
                log::error!("Session {} failed to initialize: {}", self.session.id(), err);
                self.advance(Transition::InitFailed);
                self.emit(StatusKind::Failed {
                    message: INIT_FAILURE_MESSAGE.to_string(),
                });
                Err(err)
            }
        }
    }

    /// Run one poll tick.
    pub async fn on_tick(&mut self) -> TickOutcome {
        self.stats.ticks += 1;

        if self.listener.is_stopped() {
            return self.cancel();
        }
        if !self.session.is_active() {
            return TickOutcome::Skipped(SkipReason::Inactive);
        }
        if self.session.phase() == Phase::Initializing {
            return TickOutcome::Skipped(SkipReason::NotInitialized);
        }
        if self.session.is_processing() {
            return TickOutcome::Skipped(SkipReason::Processing);
        }
        if self.detector_busy() {
            log::debug!("Session {}: detector still busy", self.session.id());
            return TickOutcome::Skipped(SkipReason::DetectorBusy);
        }
        if !self.source.is_ready() {
            log::debug!("Session {}: source not ready", self.session.id());
            return TickOutcome::Skipped(SkipReason::SourceNotReady);
        }

        assert_invariant!(
            !self.session.is_processing(),
            NO_DETECTION_WHILE_PROCESSING,
            self.session.id()
        );

        let detection = match self.detect_once().await {
            Ok(detection) => detection,
            Err(e) => {
                if self.listener.is_stopped() {
                    return self.cancel();
                }
                if let CaptureError::DetectTimeout(_) = e {
                    self.stats.timeouts += 1;
                }
                self.stats.transient_errors += 1;
                log::warn!("Session {}: {}", self.session.id(), e);
                return TickOutcome::TransientError(e);
            }
        };

        // A result that arrives after stop() is discarded
        if self.listener.is_stopped() {
            return self.cancel();
        }

        match detection {
            Some(detection) if detection.is_usable() => self.handle_face(detection).await,
            _ => {
                self.stats.misses += 1;
                self.advance(Transition::NoFace);
                self.emit(StatusKind::NoFace);
                TickOutcome::NoFace
            }
        }
    }

    async fn detect_once(&mut self) -> Result<Option<DetectionResult>, CaptureError> {
        let frame = self.capture_frame()?;
        self.stats.detector_calls += 1;

        let detector = Arc::clone(&self.detector);
        let mut task = tokio::spawn(async move { detector.detect(&frame).await });

        let joined = match self.settings.detect_timeout {
            Some(limit) => match tokio::time::timeout(limit, &mut task).await {
                Ok(joined) => joined,
                Err(_) => {
                    self.stalled = Some(task);
                    return Err(CaptureError::DetectTimeout(limit.as_millis() as u64));
                }
            },
            None => task.await,
        };

        joined.map_err(|e| CaptureError::TransientCapture(format!("Task join error: {}", e)))?
    }

    fn detector_busy(&mut self) -> bool {
        let finished = match &self.stalled {
            Some(task) => task.is_finished(),
            None => return false,
        };
        if !finished {
            return true;
        }

        log::debug!("Session {}: late detector result discarded", self.session.id());
        self.stalled = None;
        false
    }

    fn capture_frame(&self) -> Result<Frame, CaptureError> {
        catch_unwind(AssertUnwindSafe(|| self.source.capture_frame())).unwrap_or_else(|_| {
            Err(CaptureError::TransientCapture(
                "video source panicked while reading a frame".to_string(),
            ))
        })
    }

    async fn handle_face(&mut self, detection: DetectionResult) -> TickOutcome {
        match self.settings.gate.evaluate(&detection) {
            GateDecision::Reject(reason) => {
                self.stats.rejections += 1;
                log::debug!("Session {}: face rejected, {}", self.session.id(), reason);
                self.advance(Transition::FaceRejected);
                self.emit(StatusKind::FaceNotAcceptable { reason });
                TickOutcome::Rejected(reason)
            }
            GateDecision::Accept => {
                let sample = Sample::from_detection(&detection);
                if let Err(e) = self.try_advance(Transition::SampleAccepted(sample)) {
                    log::warn!("Session {}: sample dropped, {}", self.session.id(), e);
                    return TickOutcome::TransientError(e);
                }
                self.stats.accepted += 1;

                let captured = self.session.sample_count();
                let required = self.session.required_samples();
                log::debug!(
                    "Session {}: sample {}/{} accepted",
                    self.session.id(),
                    captured,
                    required
                );
                self.emit(StatusKind::Progress { captured, required });

                if self.session.phase() == Phase::Finalizing {
                    self.finalize().await
                } else {
                    TickOutcome::Accepted { captured, required }
                }
            }
        }
    }

    async fn finalize(&mut self) -> TickOutcome {
        log::info!(
            "Session {} finalizing {} sample(s)",
            self.session.id(),
            self.session.sample_count()
        );

        let outcome = self
            .finalizer
            .run(&self.session, self.callbacks.as_ref(), &mut self.listener)
            .await;

        match outcome {
            FinalizeOutcome::Cancelled => self.cancel(),
            FinalizeOutcome::Accepted => {
                self.advance(Transition::FinalizeSucceeded);
                log::info!("Session {} complete", self.session.id());
                self.emit(StatusKind::Success {
                    variant: self.session.variant(),
                });
                self.finalizer
                    .close(self.session.id(), self.callbacks.as_ref(), &mut self.listener)
                    .await;
                TickOutcome::Completed
            }
            FinalizeOutcome::Rejected(err) => self.handle_rejection(err).await,
        }
    }

    async fn handle_rejection(&mut self, err: CaptureError) -> TickOutcome {
        log::warn!("Session {}: payload rejected, {}", self.session.id(), err);
        self.advance(Transition::FinalizeFailed);

        if self.session.phase() == Phase::Failed {
            let (message, error) = match self.session.max_attempts() {
                Some(max_attempts) => (
                    EXHAUSTED_MESSAGE,
                    CaptureError::AttemptsExhausted {
                        attempts: self.session.attempt_count(),
                        max_attempts,
                    },
                ),
                None => (REGISTRATION_FAILED_MESSAGE, err),
            };
            log::error!("Session {} failed: {}", self.session.id(), error);
            self.emit(StatusKind::Failed {
                message: message.to_string(),
            });
            self.callbacks.on_failure(self.session.id(), message);
            return TickOutcome::Failed(error);
        }

        let attempt = self.session.attempt_count();
        let max_attempts = self.session.max_attempts().unwrap_or(attempt);
        self.emit(StatusKind::Retry {
            attempt,
            max_attempts,
        });

        if !self.settings.retry_delay.is_zero() {
            let stopped = tokio::select! {
                biased;
                _ = self.listener.stopped() => true,
                _ = tokio::time::sleep(self.settings.retry_delay) => false,
            };
            if stopped {
                return self.cancel();
            }
        }

        TickOutcome::Retrying {
            attempt,
            max_attempts,
        }
    }

    /// Drive ticks until the session ends, the stop signal fires or the
    /// ticker runs dry.
    pub async fn run<T: Ticker>(mut self, mut ticker: T) -> CaptureReport {
        while self.session.is_active() {
            let halted = tokio::select! {
                biased;
                _ = self.listener.stopped() => true,
                more = ticker.tick() => !more,
            };
            if halted {
                break;
            }
            self.on_tick().await;
        }

        if self.session.is_active() {
            self.cancel();
        }
        if let Some(task) = self.stalled.take() {
            task.abort();
        }
        self.report()
    }

    pub fn spawn<T: Ticker + 'static>(self, ticker: T) -> SessionHandle {
        let id = self.session.id().to_string();
        let variant = self.session.variant();
        let stop = self.stop.clone();
        let task = tokio::spawn(self.run(ticker));
        SessionHandle {
            id,
            variant,
            stop,
            task: Some(task),
        }
    }

    pub fn report(&self) -> CaptureReport {
        CaptureReport {
            session_id: self.session.id().to_string(),
            variant: self.session.variant(),
            final_phase: self.session.phase(),
            samples_accepted: self.stats.accepted,
            attempts: self.session.attempt_count(),
            cancelled: self.session.is_cancelled(),
            stats: self.stats.clone(),
            started_at: self.started_at,
            finished_at: Utc::now(),
        }
    }

    fn cancel(&mut self) -> TickOutcome {
        if !self.session.is_cancelled() {
            log::info!("Session {} stopped in phase {:?}", self.session.id(), self.session.phase());
        }
        self.advance(Transition::Cancelled);
        TickOutcome::Cancelled
    }

    fn try_advance(&mut self, transition: Transition) -> Result<(), CaptureError> {
        self.session = self.session.clone().apply(transition)?;
        Ok(())
    }

    fn advance(&mut self, transition: Transition) {
        if let Err(e) = self.try_advance(transition) {
            log::warn!("Session {}: transition refused, {}", self.session.id(), e);
        }
    }

    fn emit(&self, kind: StatusKind) {
        if self.listener.is_stopped() {
            return;
        }
        self.callbacks
            .on_status(&StatusUpdate::new(&self.session, kind));
    }
}

/// Initialize the detector, then poll at the configured interval on a new
/// tokio task.
pub async fn start(
    source: Arc<dyn VideoSource>,
    detector: Arc<dyn Detector>,
    settings: SessionSettings,
    callbacks: Arc<dyn CaptureCallbacks>,
) -> Result<SessionHandle, CaptureError> {
    let period = settings.poll_interval;
    let mut orchestrator = CaptureOrchestrator::new(source, detector, settings, callbacks);
    orchestrator.initialize().await?;
    Ok(orchestrator.spawn(IntervalTicker::new(period)))
}

/// Owner of a running session. Dropping the handle stops the session.
pub struct SessionHandle {
    id: String,
    variant: Variant,
    stop: StopSignal,
    task: Option<JoinHandle<CaptureReport>>,
}

impl SessionHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    /// Stop the session. Safe in any phase, and more than once.
    pub fn stop(&self) {
        if self.stop.stop() {
            log::info!("Stop requested for session {}", self.id);
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.is_stopped()
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// A cloneable stop-only view of this session.
    pub fn controller(&self) -> SessionController {
        SessionController {
            id: self.id.clone(),
            stop: self.stop.clone(),
        }
    }

    /// Wait for the loop to end and collect its report.
    pub async fn wait(mut self) -> Result<CaptureReport, CaptureError> {
        let task = self.task.take().ok_or_else(|| {
            CaptureError::SessionNotFound(format!("session {} already joined", self.id))
        })?;
        task.await
            .map_err(|e| CaptureError::TransientCapture(format!("Task join error: {}", e)))
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        if self.task.is_some() {
            self.stop();
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionController {
    id: String,
    stop: StopSignal,
}

impl SessionController {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn stop(&self) -> bool {
        let raised = self.stop.stop();
        if raised {
            log::info!("Stop requested for session {}", self.id);
        }
        raised
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.is_stopped()
    }
}
