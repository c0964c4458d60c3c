//! Recording session state machine.
//!
//! Wraps a live capture stream in a platform recorder buffering
//! timestamped segments, and produces the final encoded blob on stop.

use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use derive_more::Display;
use futures::stream::LocalBoxStream;
use medea_reactive::ObservableCell;
use tracerr::Traced;

use crate::{
    conf,
    media::{AcquireError, AcquireSource, MediaManager},
    platform,
    utils::Caused,
};

/// State of a [`RecordingSession`].
///
/// `Idle -> Initializing -> Recording <-> Paused -> Stopped`, where
/// `Idle` and `Stopped` are the resting states and `Initializing` exists
/// only while the acquisition is pending.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum SessionState {
    /// Nothing acquired, nothing recorded.
    Idle,

    /// Acquisition is in flight.
    Initializing,

    /// Segments are being captured.
    Recording,

    /// Capture is suspended; the segment sequence and the elapsed time
    /// are preserved.
    Paused,

    /// The take is finalized into the result blob.
    Stopped,
}

/// Errors occurring in a [`RecordingSession`].
#[derive(Clone, Debug, Display)]
pub enum SessionError {
    /// The requested action is not legal in the current state.
    #[display(fmt = "Cannot {} while the session is {}", action, state)]
    InvalidTransition {
        /// Action that was requested.
        action: &'static str,

        /// State the session was in.
        state: SessionState,
    },

    /// Stream acquisition failed.
    #[display(fmt = "{}", _0)]
    Acquire(AcquireError),

    /// The platform recorder refused to operate.
    #[display(fmt = "Recorder failure: {}", _0)]
    Recorder(platform::Error),
}

impl From<AcquireError> for SessionError {
    #[inline]
    fn from(err: AcquireError) -> Self {
        Self::Acquire(err)
    }
}

impl From<platform::Error> for SessionError {
    #[inline]
    fn from(err: platform::Error) -> Self {
        Self::Recorder(err)
    }
}

impl Caused for SessionError {
    type Error = platform::Error;

    fn name(&self) -> &'static str {
        match self {
            Self::InvalidTransition { .. } => "InvalidSessionState",
            Self::Acquire(err) => err.name(),
            Self::Recorder(_) => "RecorderFailure",
        }
    }

    fn cause(self) -> Option<Self::Error> {
        match self {
            Self::InvalidTransition { .. } => None,
            Self::Acquire(err) => err.cause(),
            Self::Recorder(err) => Some(err),
        }
    }
}

/// Actual data of a [`RecordingSession`].
struct InnerSession {
    /// Recorder settings.
    conf: conf::Recorder,

    /// Owner of the capture stream being recorded.
    manager: Rc<MediaManager>,

    /// Current state of the session.
    state: ObservableCell<SessionState>,

    /// Seconds spent recording. Does not advance while paused.
    elapsed_secs: ObservableCell<u64>,

    /// Captured segments, in capture order.
    segments: RefCell<Vec<platform::Blob>>,

    /// The finalized take. Produced exactly once per session run.
    result: RefCell<Option<platform::Blob>>,

    /// The running platform recorder, while there is one.
    recorder: RefCell<Option<platform::Recorder>>,

    /// Generation counter invalidating the ticker and the recorder
    /// handlers of previous runs.
    epoch: Cell<u64>,
}

impl InnerSession {
    /// Appends a captured segment.
    ///
    /// Segments are accepted while recording and during the stop flush;
    /// empty flushes are dropped.
    fn push_segment(&self, epoch: u64, chunk: platform::Blob) {
        if self.epoch.get() != epoch
            || self.result.borrow().is_some()
            || chunk.size() == 0
        {
            return;
        }
        match self.state.get() {
            SessionState::Recording | SessionState::Stopped => {
                self.segments.borrow_mut().push(chunk);
            }
            SessionState::Idle
            | SessionState::Initializing
            | SessionState::Paused => {}
        }
    }

    /// Finalizes the segment sequence into the result blob (exactly
    /// once) and releases the capture stream.
    fn seal(&self) {
        let mut result = self.result.borrow_mut();
        if result.is_some() {
            return;
        }
        let segments = self.segments.borrow();
        log::info!(
            "Recording finalized: {} segment(s), {} second(s)",
            segments.len(),
            self.elapsed_secs.get(),
        );
        *result = Some(platform::Blob::concat(
            &segments,
            self.conf.mime_type.as_str(),
        ));
        drop(segments);
        self.manager.release();
    }

    /// Handles a fatal failure of the platform recorder.
    ///
    /// The session transitions to [`SessionState::Stopped`] keeping the
    /// segments captured so far: a partial recording beats data loss.
    fn on_recorder_failure(&self, epoch: u64, err: platform::Error) {
        if self.epoch.get() != epoch {
            return;
        }
        match self.state.get() {
            SessionState::Recording | SessionState::Paused => {
                log::error!(
                    "Recorder failed mid-session, keeping {} captured \
                     segment(s): {}",
                    self.segments.borrow().len(),
                    err,
                );
                self.state.set(SessionState::Stopped);
                drop(self.recorder.borrow_mut().take());
                self.seal();
            }
            SessionState::Idle
            | SessionState::Initializing
            | SessionState::Stopped => {}
        }
    }
}

/// Recording session over the [`MediaManager`]'s capture stream.
#[derive(Clone)]
pub struct RecordingSession(Rc<InnerSession>);

impl RecordingSession {
    /// Creates a new idle [`RecordingSession`].
    #[must_use]
    pub fn new(conf: conf::Recorder, manager: Rc<MediaManager>) -> Self {
        Self(Rc::new(InnerSession {
            conf,
            manager,
            state: ObservableCell::new(SessionState::Idle),
            elapsed_secs: ObservableCell::new(0),
            segments: RefCell::new(Vec::new()),
            result: RefCell::new(None),
            recorder: RefCell::new(None),
            epoch: Cell::new(0),
        }))
    }

    /// Acquires a capture stream from the given `source` and starts
    /// recording it.
    ///
    /// # Errors
    ///
    /// With [`SessionError::InvalidTransition`] unless the session is
    /// idle, [`SessionError::Acquire`] if the whole acquisition ladder
    /// fails, or [`SessionError::Recorder`] if the platform recorder
    /// refuses the stream. The session is back to idle on any failure.
    pub async fn start(
        &self,
        source: AcquireSource,
        preferred_device: Option<String>,
    ) -> Result<(), Traced<SessionError>> {
        let inner = &self.0;
        if inner.state.get() != SessionState::Idle {
            return Err(tracerr::new!(SessionError::InvalidTransition {
                action: "start",
                state: inner.state.get(),
            }));
        }
        inner.state.set(SessionState::Initializing);

        let stream = match inner
            .manager
            .acquire(source, preferred_device)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> SessionError))
        {
            Ok(stream) => stream,
            Err(e) => {
                inner.state.set(SessionState::Idle);
                return Err(e);
            }
        };

        let recorder = match platform::Recorder::new(
            stream.tracks(),
            &inner.conf.mime_type,
        )
        .map_err(tracerr::map_from_and_wrap!(=> SessionError))
        {
            Ok(recorder) => recorder,
            Err(e) => {
                inner.manager.release();
                inner.state.set(SessionState::Idle);
                return Err(e);
            }
        };

        let epoch = inner.epoch.get();
        let weak = Rc::downgrade(inner);
        recorder.set_on_chunk(move |chunk| {
            if let Some(inner) = weak.upgrade() {
                inner.push_segment(epoch, chunk);
            }
        });
        let weak = Rc::downgrade(inner);
        recorder.set_on_error(move |err| {
            if let Some(inner) = weak.upgrade() {
                inner.on_recorder_failure(epoch, err);
            }
        });

        if let Err(e) = recorder
            .start(inner.conf.timeslice)
            .map_err(tracerr::map_from_and_wrap!(=> SessionError))
        {
            inner.manager.release();
            inner.state.set(SessionState::Idle);
            return Err(e);
        }

        *inner.recorder.borrow_mut() = Some(recorder);
        inner.state.set(SessionState::Recording);

        let weak = Rc::downgrade(inner);
        platform::spawn(async move {
            loop {
                platform::delay_for(std::time::Duration::from_secs(1)).await;
                let inner = match weak.upgrade() {
                    Some(inner) => inner,
                    None => break,
                };
                if inner.epoch.get() != epoch {
                    break;
                }
                match inner.state.get() {
                    SessionState::Recording => {
                        inner
                            .elapsed_secs
                            .set(inner.elapsed_secs.get() + 1);
                    }
                    SessionState::Paused => {}
                    SessionState::Idle
                    | SessionState::Initializing
                    | SessionState::Stopped => break,
                }
            }
        });

        Ok(())
    }

    /// Suspends the capture, preserving the segment sequence and the
    /// elapsed time.
    ///
    /// # Errors
    ///
    /// With [`SessionError`] unless the session is recording.
    pub fn pause(&self) -> Result<(), Traced<SessionError>> {
        let inner = &self.0;
        if inner.state.get() != SessionState::Recording {
            return Err(tracerr::new!(SessionError::InvalidTransition {
                action: "pause",
                state: inner.state.get(),
            }));
        }
        if let Some(recorder) = inner.recorder.borrow().as_ref() {
            recorder
                .pause()
                .map_err(tracerr::map_from_and_wrap!(=> SessionError))?;
        }
        inner.state.set(SessionState::Paused);
        Ok(())
    }

    /// Resumes a paused capture.
    ///
    /// # Errors
    ///
    /// With [`SessionError`] unless the session is paused.
    pub fn resume(&self) -> Result<(), Traced<SessionError>> {
        let inner = &self.0;
        if inner.state.get() != SessionState::Paused {
            return Err(tracerr::new!(SessionError::InvalidTransition {
                action: "resume",
                state: inner.state.get(),
            }));
        }
        if let Some(recorder) = inner.recorder.borrow().as_ref() {
            recorder
                .resume()
                .map_err(tracerr::map_from_and_wrap!(=> SessionError))?;
        }
        inner.state.set(SessionState::Recording);
        Ok(())
    }

    /// Stops the capture, finalizing all buffered segments into one
    /// immutable blob, exactly once.
    ///
    /// Legal from recording or paused only. Any further [`start()`]
    /// requires an explicit [`reset()`] first.
    ///
    /// [`start()`]: RecordingSession::start
    /// [`reset()`]: RecordingSession::reset
    ///
    /// # Errors
    ///
    /// With [`SessionError`] unless the session is recording or paused.
    pub async fn stop(
        &self,
    ) -> Result<platform::Blob, Traced<SessionError>> {
        let inner = &self.0;
        match inner.state.get() {
            SessionState::Recording | SessionState::Paused => {}
            state => {
                return Err(tracerr::new!(
                    SessionError::InvalidTransition {
                        action: "stop",
                        state,
                    }
                ));
            }
        }

        inner.state.set(SessionState::Stopped);
        let recorder = inner.recorder.borrow_mut().take();
        if let Some(recorder) = recorder {
            if let Err(e) = recorder.stop().await {
                log::warn!(
                    "Recorder finalization failed, keeping captured \
                     segments: {}",
                    e.as_ref(),
                );
            }
        }
        inner.seal();

        let result = inner.result.borrow().clone();
        result.ok_or_else(|| {
            tracerr::new!(SessionError::Recorder(platform::Error::new(
                "InvalidStateError",
                "Recording produced no result blob",
            )))
        })
    }

    /// Resets a finished session back to idle, releasing the capture
    /// stream and discarding the result blob and the segment buffer.
    ///
    /// # Errors
    ///
    /// With [`SessionError`] if the session is recording or paused (an
    /// active take must be stopped first).
    pub fn reset(&self) -> Result<(), Traced<SessionError>> {
        let inner = &self.0;
        match inner.state.get() {
            SessionState::Idle | SessionState::Stopped => {}
            state => {
                return Err(tracerr::new!(
                    SessionError::InvalidTransition {
                        action: "reset",
                        state,
                    }
                ));
            }
        }

        inner.epoch.set(inner.epoch.get() + 1);
        drop(inner.recorder.borrow_mut().take());
        inner.segments.borrow_mut().clear();
        *inner.result.borrow_mut() = None;
        inner.elapsed_secs.set(0);
        inner.manager.release();
        inner.state.set(SessionState::Idle);
        Ok(())
    }

    /// Returns the current state of this session.
    #[inline]
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.0.state.get()
    }

    /// Returns a [`LocalBoxStream`] of this session's state updates.
    ///
    /// The current state is emitted first.
    #[must_use]
    pub fn observe_state(&self) -> LocalBoxStream<'static, SessionState> {
        self.0.state.subscribe()
    }

    /// Returns the seconds spent recording so far.
    #[inline]
    #[must_use]
    pub fn elapsed_secs(&self) -> u64 {
        self.0.elapsed_secs.get()
    }

    /// Returns a [`LocalBoxStream`] of the elapsed seconds updates.
    #[must_use]
    pub fn observe_elapsed(&self) -> LocalBoxStream<'static, u64> {
        self.0.elapsed_secs.subscribe()
    }

    /// Returns the number of segments captured so far.
    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.0.segments.borrow().len()
    }

    /// Returns the finalized take, once the session was stopped.
    #[must_use]
    pub fn result_blob(&self) -> Option<platform::Blob> {
        self.0.result.borrow().clone()
    }
}
