//! Native speech service seam: the traits a host TTS binding implements.
//!
//! The [`TextToSpeechEngine`](crate::TextToSpeechEngine) never talks to an
//! operating system API directly. It drives a [`SpeechPlatform`] (factory)
//! which hands out a [`NativeTts`] (handle). Both mirror the shape of the
//! typical mobile TTS service:
//!
//! - construction returns immediately and reports readiness later through a
//!   callback, possibly from another thread;
//! - submissions are accepted or rejected synchronously, and complete
//!   asynchronously through a [`ProgressListener`];
//! - every mutation returns a status code.
//!
//! ## Implementations
//!
//! | Module                         | Host service                          |
//! |--------------------------------|---------------------------------------|
//! | [`command`](crate::backend::command) | `espeak-ng` / `espeak` / macOS `say` |

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::gate::ProgressListener;
use crate::locale::Locale;
use crate::voice::Voice;

// ── Status codes ───────────────────────────────────────────────────

/// Failure status code returned by a native speech call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeError(pub i32);

impl NativeError {
    /// Generic failure.
    pub const ERROR: Self = Self(-1);
    /// The requested language is not available.
    pub const LANG_NOT_SUPPORTED: Self = Self(-2);
    /// Synthesis of the utterance failed.
    pub const SYNTHESIS: Self = Self(-3);
    /// The speech service is unreachable or crashed.
    pub const SERVICE: Self = Self(-4);
    /// The audio output failed.
    pub const OUTPUT: Self = Self(-5);
    /// The request is malformed or unsupported by this engine.
    pub const INVALID_REQUEST: Self = Self(-8);
    /// The engine (or a resource it needs) is not installed.
    pub const NOT_INSTALLED: Self = Self(-9);

    /// Status code as reported by the native layer.
    #[must_use]
    pub const fn code(self) -> i32 {
        self.0
    }

    const fn name(self) -> Option<&'static str> {
        match self.0 {
            -1 => Some("error"),
            -2 => Some("language not supported"),
            -3 => Some("synthesis error"),
            -4 => Some("service error"),
            -5 => Some("output error"),
            -8 => Some("invalid request"),
            -9 => Some("not installed"),
            _ => None,
        }
    }
}

impl fmt::Display for NativeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name} (status {})", self.0),
            None => write!(f, "status {}", self.0),
        }
    }
}

impl std::error::Error for NativeError {}

/// Result of a synchronous native call.
pub type NativeResult = Result<(), NativeError>;

/// Callback the native handle invokes once it is ready (or failed to start).
pub type InitCallback = Box<dyn FnOnce(NativeResult) + Send + 'static>;

// ── Submission parameters ──────────────────────────────────────────

/// How a new utterance interacts with the native playback queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum QueueMode {
    /// Append after everything already queued.
    #[default]
    Add,

    /// Drop pending utterances, interrupt the current one, then play this one.
    Flush,
}

impl QueueMode {
    /// Map the `flush_queue` flag used by the engine API to a queue mode.
    #[must_use]
    pub const fn from_flush(flush_queue: bool) -> Self {
        if flush_queue { Self::Flush } else { Self::Add }
    }
}

/// Audio stream an utterance is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum AudioStream {
    /// The speech service's default stream.
    #[default]
    Default,
    Music,
    Notification,
    Alarm,
    Ring,
    VoiceCall,
    System,
    Accessibility,
}

/// Per-utterance parameters handed to the native engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpeakParams {
    /// Destination stream.
    pub stream: AudioStream,
}

/// What the audio is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum AudioUsage {
    #[default]
    Unknown,
    Media,
    Alarm,
    Notification,
    Assistant,
    Accessibility,
    NavigationGuidance,
}

/// What kind of content the audio carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum AudioContentType {
    #[default]
    Unknown,
    Speech,
    Music,
    Sonification,
}

/// Audio routing attributes applied to all subsequent utterances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AudioAttributes {
    pub usage: AudioUsage,
    pub content_type: AudioContentType,
}

/// Where the audio for an earcon comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EarconSource {
    /// A sound file on disk.
    File(PathBuf),

    /// A resource bundled with an installed package.
    Resource { package: String, resource_id: i32 },
}

// ── Native handle ──────────────────────────────────────────────────

/// A live instance of the host speech service.
///
/// All methods take `&self`: native handles are shared by every caller of the
/// engine behind an `Arc`, so implementations use interior mutability.
/// Earcon names arrive already normalized (`[name]`).
#[cfg_attr(test, mockall::automock)]
pub trait NativeTts: Send + Sync {
    /// Route utterance progress notifications to `listener`.
    fn set_progress_listener(&self, listener: ProgressListener) -> NativeResult;

    /// Submit `text` for playback under `utterance_id`.
    fn speak(
        &self,
        text: &str,
        mode: QueueMode,
        params: &SpeakParams,
        utterance_id: &str,
    ) -> NativeResult;

    /// Submit a registered earcon for playback under `utterance_id`.
    fn play_earcon(
        &self,
        earcon: &str,
        mode: QueueMode,
        params: &SpeakParams,
        utterance_id: &str,
    ) -> NativeResult;

    /// Register a sound under an earcon name.
    fn add_earcon(&self, earcon: &str, source: &EarconSource) -> NativeResult;

    /// Whether the engine is currently playing anything.
    fn is_speaking(&self) -> bool;

    /// Interrupt the current utterance and drop everything queued.
    fn stop(&self) -> NativeResult;

    /// Release the native instance. The handle must not be used afterwards.
    fn shutdown(&self);

    fn available_languages(&self) -> BTreeSet<Locale>;

    fn voices(&self) -> Vec<Voice>;

    /// Currently selected voice, if the engine reports one.
    fn voice(&self) -> Option<Voice>;

    fn default_voice(&self) -> Option<Voice>;

    /// Pitch multiplier, `1.0` is the voice's natural pitch.
    fn set_pitch(&self, pitch: f32) -> NativeResult;

    /// Rate multiplier, `1.0` is the normal speaking rate.
    fn set_speech_rate(&self, rate: f32) -> NativeResult;

    fn set_audio_attributes(&self, attributes: &AudioAttributes) -> NativeResult;

    fn set_voice(&self, voice: &Voice) -> NativeResult;

    fn set_language(&self, locale: &Locale) -> NativeResult;
}

/// Factory for native speech handles.
pub trait SpeechPlatform: Send + Sync {
    /// The handle type this platform produces.
    type Handle: NativeTts + 'static;

    /// Start a new native instance.
    ///
    /// Must return without waiting for the service to come up. The platform
    /// calls `on_init` exactly once when the instance is ready or has failed;
    /// dropping it uncalled is treated as an aborted initialization.
    fn open(&self, on_init: InitCallback) -> Self::Handle;
}
