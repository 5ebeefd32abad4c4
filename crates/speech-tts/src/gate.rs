//! Utterance completion gate: turns progress callbacks into one awaited result.
//!
//! Native engines report utterance progress through callbacks fired on their
//! own threads. The [`ProgressListener`] half forwards every transition into
//! an unbounded channel; the [`CompletionGate`] half waits on that channel
//! for the terminal event of one specific utterance.
//!
//! ```text
//!   native thread ──on_start/on_done/on_error──▶ channel ──▶ wait_for(id)
//! ```
//!
//! The gate is a filtering wait, not a demultiplexing registry: events for
//! other utterances are discarded while waiting. Waiters are serialized, so a
//! caller must not wait on an utterance whose terminal event another waiter
//! may already have consumed.

use std::time::Duration;

use tokio::sync::{Mutex, mpsc};

use crate::error::TtsError;

/// One progress transition of an utterance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UtteranceStatus {
    /// Playback of the utterance began.
    Started(String),

    /// The utterance played to completion.
    Done(String),

    /// The utterance failed or was discarded.
    Error(String),
}

impl UtteranceStatus {
    /// Identifier of the utterance this status belongs to.
    #[must_use]
    pub fn utterance_id(&self) -> &str {
        match self {
            Self::Started(id) | Self::Done(id) | Self::Error(id) => id,
        }
    }

    /// Whether the utterance finished successfully.
    #[must_use]
    pub const fn is_done(&self) -> bool {
        matches!(self, Self::Done(_))
    }

    /// `Done` and `Error` end an utterance; `Started` does not.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Started(_))
    }
}

/// Create a connected listener/gate pair.
#[must_use]
pub fn progress_channel() -> (ProgressListener, CompletionGate) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        ProgressListener { tx },
        CompletionGate {
            rx: Mutex::new(rx),
        },
    )
}

// ── Producer side ──────────────────────────────────────────────────

/// Sender half handed to the native engine.
///
/// Cheap to clone and safe to call from any thread. Sends never block; once
/// the gate is gone the events are dropped.
#[derive(Debug, Clone)]
pub struct ProgressListener {
    tx: mpsc::UnboundedSender<UtteranceStatus>,
}

impl ProgressListener {
    pub fn on_start(&self, utterance_id: &str) {
        self.send(UtteranceStatus::Started(utterance_id.to_string()));
    }

    pub fn on_done(&self, utterance_id: &str) {
        self.send(UtteranceStatus::Done(utterance_id.to_string()));
    }

    pub fn on_error(&self, utterance_id: &str) {
        self.send(UtteranceStatus::Error(utterance_id.to_string()));
    }

    /// Forward an already-built status.
    pub fn send(&self, status: UtteranceStatus) {
        if let Err(e) = self.tx.send(status) {
            tracing::trace!(status = ?e.0, "Progress gate dropped, discarding event");
        }
    }
}

// ── Consumer side ──────────────────────────────────────────────────

/// Single-consumer wait over the progress channel.
#[derive(Debug)]
pub struct CompletionGate {
    rx: Mutex<mpsc::UnboundedReceiver<UtteranceStatus>>,
}

impl CompletionGate {
    /// Wait for the terminal status of `utterance_id`.
    ///
    /// Returns `true` for `Done`, `false` for `Error`. `Started` events and
    /// events for other utterances are consumed and discarded. Blocks until a
    /// matching terminal event arrives.
    pub async fn wait_for(&self, utterance_id: &str) -> Result<bool, TtsError> {
        let mut rx = self.rx.lock().await;

        loop {
            let Some(status) = rx.recv().await else {
                return Err(TtsError::ProgressChannelClosed);
            };

            if status.is_terminal() && status.utterance_id() == utterance_id {
                tracing::debug!(utterance_id, done = status.is_done(), "Utterance finished");
                return Ok(status.is_done());
            }

            tracing::trace!(waiting_for = utterance_id, ?status, "Skipping progress event");
        }
    }

    /// Like [`wait_for`](Self::wait_for), bounded by `timeout` when one is given.
    pub async fn wait_for_within(
        &self,
        utterance_id: &str,
        timeout: Option<Duration>,
    ) -> Result<bool, TtsError> {
        let Some(timeout) = timeout else {
            return self.wait_for(utterance_id).await;
        };

        tokio::time::timeout(timeout, self.wait_for(utterance_id))
            .await
            .map_err(|_| TtsError::UtteranceTimeout {
                utterance_id: utterance_id.to_string(),
                timeout,
            })?
    }
}
