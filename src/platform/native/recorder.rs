//! Simulated media recorder of the native adapter.
//!
//! Emits one deterministic segment per timeslice while recording: four
//! big-endian bytes of the segment's sequence number, so tests can assert
//! capture order in the concatenated result.

use std::{
    cell::{Cell, RefCell},
    rc::Rc,
    time::Duration,
};

use tracerr::Traced;

use super::{
    blob::Blob, delay_for, error::Error, media_track::MediaStreamTrack, rig,
    spawn,
};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum RecState {
    Inactive,
    Recording,
    Paused,
}

struct Inner {
    state: Cell<RecState>,
    epoch: Cell<u64>,
    seq: Cell<u32>,
    mime_type: String,
    on_chunk: RefCell<Option<Rc<dyn Fn(Blob)>>>,
    on_error: RefCell<Option<Rc<dyn Fn(Error)>>>,
}

/// Wrapper around a platform media recorder.
///
/// Handlers are invoked synchronously with the emission, mirroring the
/// event-handler model of the browser recorder.
pub struct Recorder(Rc<Inner>);

impl Recorder {
    /// Creates a new inactive [`Recorder`] over the given `tracks`.
    ///
    /// # Errors
    ///
    /// With [`Error`] if there is nothing to record.
    pub fn new(
        tracks: &[MediaStreamTrack],
        mime_type: &str,
    ) -> Result<Self, Traced<Error>> {
        if tracks.is_empty() {
            return Err(tracerr::new!(Error::new(
                "InvalidStateError",
                "No tracks to record",
            )));
        }
        Ok(Self(Rc::new(Inner {
            state: Cell::new(RecState::Inactive),
            epoch: Cell::new(0),
            seq: Cell::new(0),
            mime_type: String::from(mime_type),
            on_chunk: RefCell::new(None),
            on_error: RefCell::new(None),
        })))
    }

    /// Sets the handler invoked with every emitted segment.
    pub fn set_on_chunk<F: Fn(Blob) + 'static>(&self, f: F) {
        *self.0.on_chunk.borrow_mut() = Some(Rc::new(f));
    }

    /// Sets the handler invoked on a fatal recorder failure.
    pub fn set_on_error<F: Fn(Error) + 'static>(&self, f: F) {
        *self.0.on_error.borrow_mut() = Some(Rc::new(f));
    }

    /// Starts recording, emitting a segment every `timeslice`.
    ///
    /// # Errors
    ///
    /// With [`Error`] if the recorder is not inactive.
    pub fn start(&self, timeslice: Duration) -> Result<(), Traced<Error>> {
        if self.0.state.get() != RecState::Inactive {
            return Err(tracerr::new!(Error::new(
                "InvalidStateError",
                "Recorder is already started",
            )));
        }
        self.0.state.set(RecState::Recording);

        let inner = Rc::clone(&self.0);
        let epoch = inner.epoch.get();
        spawn(async move {
            loop {
                delay_for(timeslice).await;
                if inner.epoch.get() != epoch {
                    break;
                }
                match inner.state.get() {
                    RecState::Inactive => break,
                    RecState::Paused => continue,
                    RecState::Recording => {}
                }

                let seq = inner.seq.get() + 1;
                inner.seq.set(seq);
                let chunk = Blob::from_bytes(
                    seq.to_be_bytes().to_vec(),
                    inner.mime_type.clone(),
                );
                let on_chunk = inner.on_chunk.borrow().clone();
                if let Some(handler) = on_chunk {
                    handler(chunk);
                }

                if let Some(after) = rig::current().recorder_fail_after() {
                    if seq >= after {
                        inner.state.set(RecState::Inactive);
                        let on_error = inner.on_error.borrow().clone();
                        if let Some(handler) = on_error {
                            handler(Error::new(
                                "UnknownError",
                                "Recorder failure injected by the rig",
                            ));
                        }
                        break;
                    }
                }
            }
        });
        Ok(())
    }

    /// Pauses the emission of segments.
    ///
    /// # Errors
    ///
    /// With [`Error`] if the recorder is not recording.
    pub fn pause(&self) -> Result<(), Traced<Error>> {
        if self.0.state.get() != RecState::Recording {
            return Err(tracerr::new!(Error::new(
                "InvalidStateError",
                "Recorder is not recording",
            )));
        }
        self.0.state.set(RecState::Paused);
        Ok(())
    }

    /// Resumes the emission of segments.
    ///
    /// # Errors
    ///
    /// With [`Error`] if the recorder is not paused.
    pub fn resume(&self) -> Result<(), Traced<Error>> {
        if self.0.state.get() != RecState::Paused {
            return Err(tracerr::new!(Error::new(
                "InvalidStateError",
                "Recorder is not paused",
            )));
        }
        self.0.state.set(RecState::Recording);
        Ok(())
    }

    /// Stops recording.
    ///
    /// Resolves once the platform recorder has finished finalizing; every
    /// buffered segment has been handed to the chunk handler by then.
    ///
    /// # Errors
    ///
    /// Never on this platform; the signature matches the browser adapter,
    /// where stopping the underlying recorder may raise.
    pub async fn stop(&self) -> Result<(), Traced<Error>> {
        self.0.state.set(RecState::Inactive);
        self.0.epoch.set(self.0.epoch.get() + 1);
        Ok(())
    }
}
