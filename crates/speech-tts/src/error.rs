//! Text-to-speech error types.

use std::time::Duration;

use crate::platform::NativeError;

/// Errors surfaced by the [`TextToSpeechEngine`](crate::TextToSpeechEngine).
///
/// Per-call rejections by the native engine are *not* errors: those come back
/// as `Ok(false)`. This enum covers lifecycle failures, invalid input and
/// broken notification plumbing.
#[derive(Debug, thiserror::Error)]
pub enum TtsError {
    /// The native speech service refused to start.
    #[error("Speech engine failed to initialize: {0}")]
    InitFailed(NativeError),

    /// The native engine dropped its init callback without reporting a status.
    #[error("Speech engine initialization was aborted before reporting a status")]
    InitAborted,

    /// The user-supplied initializer hook failed.
    #[error("Speech engine initializer failed: {0}")]
    Initializer(#[source] anyhow::Error),

    /// The engine was shut down; it cannot be used again.
    #[error("Speech engine has been shut down")]
    ShutDown,

    /// Earcon names must contain at least one non-whitespace character.
    #[error("You cannot use an empty or blank earcon")]
    BlankEarcon,

    /// The progress notification channel closed while waiting for an utterance.
    #[error("Utterance progress channel closed")]
    ProgressChannelClosed,

    /// No terminal status arrived for the utterance within the configured timeout.
    #[error("Utterance '{utterance_id}' did not complete within {timeout:?}")]
    UtteranceTimeout {
        utterance_id: String,
        timeout: Duration,
    },

    /// A speech rate string could not be parsed.
    #[error("Invalid speech rate: {0}")]
    InvalidSpeechRate(String),

    /// A locale tag could not be parsed.
    #[error("Invalid locale tag: {0}")]
    InvalidLocale(String),
}
