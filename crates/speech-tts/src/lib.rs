//! Awaitable text-to-speech.
//!
//! `speech-tts` wraps a callback-driven speech service in an async API:
//! [`TextToSpeechEngine::speak`] submits an utterance and resolves once the
//! service reports it finished. The native service is created lazily on
//! first use and released by [`TextToSpeechEngine::shutdown`].
//!
//! ```no_run
//! use speech_tts::{CommandPlatform, TextToSpeechEngine, UtteranceOptions};
//!
//! # async fn demo() -> Result<(), speech_tts::TtsError> {
//! let engine = TextToSpeechEngine::new(CommandPlatform::default());
//! let done = engine.speak("Hello there", UtteranceOptions::new()).await?;
//! assert!(done);
//! engine.shutdown();
//! # Ok(())
//! # }
//! ```
#![deny(unused_crate_dependencies)]

pub mod backend;
pub mod config;
pub mod earcon;
pub mod engine;
pub mod error;
pub mod gate;
pub mod locale;
pub mod platform;
pub mod rate;
pub mod voice;

// Re-export key types for convenience
pub use backend::{CommandConfig, CommandPlatform, CommandTts, SynthFlavor};
pub use config::EngineConfig;
pub use earcon::normalize_earcon;
pub use engine::{Controls, EngineState, Initializer, TextToSpeechEngine, UtteranceOptions};
pub use error::TtsError;
pub use gate::{CompletionGate, ProgressListener, UtteranceStatus, progress_channel};
pub use locale::Locale;
pub use platform::{
    AudioAttributes, AudioContentType, AudioStream, AudioUsage, EarconSource, InitCallback,
    NativeError, NativeResult, NativeTts, QueueMode, SpeakParams, SpeechPlatform,
};
pub use rate::SpeechRate;
pub use voice::{Configuration, Voice, VoiceQuality, filter_locales_by_language, filter_voices_by_language};
