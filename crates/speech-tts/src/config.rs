//! Engine configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::locale::Locale;
use crate::rate::SpeechRate;

/// Settings applied by the [`TextToSpeechEngine`](crate::TextToSpeechEngine).
///
/// The optional voice parameters are pushed to the native engine once, right
/// after it initializes; a rejected default is logged and otherwise ignored.
/// All fields are optional so partial config files deserialize cleanly.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Language selected at startup.
    pub language: Option<Locale>,

    /// Pitch multiplier selected at startup (1.0 = natural pitch).
    pub pitch: Option<f32>,

    /// Speech rate selected at startup.
    pub speech_rate: Option<SpeechRate>,

    /// Name of the voice selected at startup. Unknown names are ignored.
    pub voice: Option<String>,

    /// Upper bound on how long an awaited utterance may take, in milliseconds.
    ///
    /// `None` waits indefinitely for the native engine's terminal event.
    pub utterance_timeout_ms: Option<u64>,
}

impl EngineConfig {
    /// Effective utterance timeout.
    #[must_use]
    pub fn utterance_timeout(&self) -> Option<Duration> {
        self.utterance_timeout_ms.map(Duration::from_millis)
    }

    #[must_use]
    pub fn with_utterance_timeout(mut self, timeout: Duration) -> Self {
        self.utterance_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// Whether any startup default needs to be pushed to the native engine.
    #[must_use]
    pub const fn has_voice_defaults(&self) -> bool {
        self.language.is_some()
            || self.pitch.is_some()
            || self.speech_rate.is_some()
            || self.voice.is_some()
    }
}
