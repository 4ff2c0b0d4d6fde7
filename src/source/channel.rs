//! Channel-backed frame source.
//!
//! The perception collaborator runs on its own thread (or inside a host
//! runtime) and pushes [`PerceptionFrame`]s through a [`FrameSender`]. The
//! frame loop drains the receiving side at its own cadence.

use crate::source::types::PerceptionFrame;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur while starting or feeding a source.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Frame source is already running")]
    AlreadyRunning,

    #[error("Perception pipeline unavailable: {0}")]
    Unavailable(String),

    #[error("Frame source no longer hands out senders")]
    Closed,
}

/// Producer handle given to the perception pipeline.
#[derive(Debug, Clone)]
pub struct FrameSender {
    sender: Sender<PerceptionFrame>,
    running: Arc<AtomicBool>,
}

impl FrameSender {
    /// Offer a frame without blocking.
    ///
    /// Returns `false` if the source is stopped, full, or has been dropped.
    /// A dropped frame simply means the loop sees no result for that tick.
    pub fn send(&self, frame: PerceptionFrame) -> bool {
        if !self.running.load(Ordering::SeqCst) {
            return false;
        }
        match self.sender.try_send(frame) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::debug!("frame queue full, dropping frame");
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

/// Bounded queue between the perception pipeline and the frame loop.
pub struct ChannelSource {
    sender: Option<Sender<PerceptionFrame>>,
    receiver: Receiver<PerceptionFrame>,
    running: Arc<AtomicBool>,
}

impl ChannelSource {
    /// Create a new source holding at most `capacity` pending frames.
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity.max(1));
        Self {
            sender: Some(sender),
            receiver,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start accepting frames.
    pub fn start(&mut self) -> Result<(), SourceError> {
        if self.running.load(Ordering::SeqCst) {
            return Err(SourceError::AlreadyRunning);
        }
        self.running.store(true, Ordering::SeqCst);
        tracing::info!("frame source started");
        Ok(())
    }

    /// Stop accepting frames. Frames already queued stay readable.
    pub fn stop(&mut self) {
        if self.running.swap(false, Ordering::SeqCst) {
            tracing::info!("frame source stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Handle for the perception pipeline to push frames through.
    pub fn sender(&self) -> Result<FrameSender, SourceError> {
        let sender = self.sender.as_ref().ok_or(SourceError::Closed)?;
        Ok(FrameSender {
            sender: sender.clone(),
            running: Arc::clone(&self.running),
        })
    }

    /// Give up the source's own sending half.
    ///
    /// Once every [`FrameSender`] handed out is dropped the receiver reports
    /// a disconnect, which the frame loop treats as the end of the session.
    pub fn close(&mut self) {
        self.sender = None;
    }

    /// Get the receiver for frames.
    pub fn receiver(&self) -> &Receiver<PerceptionFrame> {
        &self.receiver
    }

    /// Take the next pending frame without blocking.
    pub fn try_recv(&self) -> Option<PerceptionFrame> {
        self.receiver.try_recv().ok()
    }

    /// Discard every queued frame.
    pub fn drain(&self) -> usize {
        self.receiver.try_iter().count()
    }
}
