//! Awaitable text-to-speech engine over a callback-driven native service.
//!
//! The engine is a small state machine:
//!
//! ```text
//!   Uninitialized ──first use──▶ Ready ──shutdown()──▶ ShutDown
//!         ▲                        │
//!         └──── init failed ◀──────┘ (never published)
//! ```
//!
//! The native instance is created lazily by the first operation that needs
//! it. Concurrent first callers queue on an async lock, so exactly one
//! instance is built and every caller receives the same handle.
//! Initialization is two-phase: the handle is created, its init callback
//! resolves a one-shot, then the progress listener is attached and startup
//! settings are applied before the handle is published.
//!
//! Speaking is submit-then-wait: the native engine accepts or rejects the
//! utterance synchronously, and the [`CompletionGate`] waits for the
//! matching `Done`/`Error` notification.

use std::mem;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, oneshot};

use crate::config::EngineConfig;
use crate::earcon::checked_earcon;
use crate::error::TtsError;
use crate::gate::{CompletionGate, ProgressListener, progress_channel};
use crate::locale::Locale;
use crate::platform::{
    AudioAttributes, AudioStream, EarconSource, NativeResult, NativeTts, QueueMode, SpeakParams,
    SpeechPlatform,
};
use crate::rate::SpeechRate;
use crate::voice::{Configuration, Voice};

// ── Lifecycle ──────────────────────────────────────────────────────

/// Observable lifecycle state of a [`TextToSpeechEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineState {
    /// No native instance yet; the next operation creates one.
    Uninitialized,

    /// A native instance is live.
    Ready,

    /// Shut down for good. Every operation except `is_speaking`/`stop` fails.
    ShutDown,
}

enum Slot<H> {
    Uninitialized,
    Ready(Arc<H>),
    ShutDown,
}

// ── Utterance options ──────────────────────────────────────────────

/// Per-call options for [`speak`](TextToSpeechEngine::speak) and
/// [`play_earcon`](TextToSpeechEngine::play_earcon).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UtteranceOptions {
    /// Identifier reported back by progress events. A random UUID when `None`.
    pub utterance_id: Option<String>,

    /// Drop everything queued before playing this utterance.
    pub flush_queue: bool,

    /// Destination audio stream.
    pub stream: AudioStream,
}

impl UtteranceOptions {
    /// Queued after whatever is playing, on the default stream, with a
    /// generated id.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `utterance_id` instead of a generated one.
    #[must_use]
    pub fn with_id(mut self, utterance_id: impl Into<String>) -> Self {
        self.utterance_id = Some(utterance_id.into());
        self
    }

    /// Drop queued utterances and interrupt the current one.
    #[must_use]
    pub const fn flushing(mut self) -> Self {
        self.flush_queue = true;
        self
    }

    /// Play on `stream` instead of the default one.
    #[must_use]
    pub const fn on_stream(mut self, stream: AudioStream) -> Self {
        self.stream = stream;
        self
    }
}

fn new_utterance_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

// ── Controls ───────────────────────────────────────────────────────

/// Synchronous settings and query calls on a ready native instance.
///
/// Handed to [`Initializer`] hooks, and used by the engine for its own
/// configuration methods. Rejections are logged and reported as `false`.
pub struct Controls<'a, H: ?Sized> {
    native: &'a H,
}

impl<'a, H: NativeTts + ?Sized> Controls<'a, H> {
    pub const fn new(native: &'a H) -> Self {
        Self { native }
    }

    pub fn set_pitch(&self, pitch: f32) -> bool {
        accepted("set_pitch", self.native.set_pitch(pitch))
    }

    pub fn set_speech_rate(&self, rate: SpeechRate) -> bool {
        accepted("set_speech_rate", self.native.set_speech_rate(rate.value()))
    }

    pub fn set_audio_attributes(&self, attributes: &AudioAttributes) -> bool {
        accepted(
            "set_audio_attributes",
            self.native.set_audio_attributes(attributes),
        )
    }

    pub fn set_voice(&self, voice: &Voice) -> bool {
        accepted("set_voice", self.native.set_voice(voice))
    }

    pub fn set_language(&self, locale: &Locale) -> bool {
        accepted("set_language", self.native.set_language(locale))
    }

    /// Register a sound under `earcon` (normalized to `[earcon]`).
    pub fn add_earcon(&self, earcon: &str, source: &EarconSource) -> Result<bool, TtsError> {
        let earcon = checked_earcon(earcon)?;
        Ok(accepted("add_earcon", self.native.add_earcon(&earcon, source)))
    }

    pub fn voices(&self) -> Vec<Voice> {
        self.native.voices()
    }

    /// Fresh snapshot of languages and voices.
    pub fn configuration(&self) -> Configuration {
        Configuration {
            available_languages: self.native.available_languages(),
            available_voices: self.native.voices(),
            current_voice: self.native.voice(),
            default_voice: self.native.default_voice(),
        }
    }
}

fn accepted(op: &'static str, result: NativeResult) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(op, error = %e, "Native speech call rejected");
            false
        }
    }
}

// ── Initializer hook ───────────────────────────────────────────────

/// Hook run once, right after the native engine becomes ready and before
/// any caller can use it.
///
/// A failing hook aborts initialization: the native instance is released
/// and the triggering call returns [`TtsError::Initializer`].
#[async_trait::async_trait]
pub trait Initializer<H: NativeTts + 'static>: Send + Sync {
    async fn initialize(&self, controls: &Controls<'_, H>) -> anyhow::Result<()>;
}

// ── Engine ─────────────────────────────────────────────────────────

/// Awaitable wrapper over a native text-to-speech service.
pub struct TextToSpeechEngine<P: SpeechPlatform> {
    platform: P,
    config: EngineConfig,
    initializer: Option<Box<dyn Initializer<P::Handle>>>,

    /// Handed to every native instance this engine creates.
    listener: ProgressListener,
    gate: CompletionGate,

    slot: RwLock<Slot<P::Handle>>,

    /// Serializes lazy initialization.
    init_lock: Mutex<()>,
}

impl<P: SpeechPlatform> TextToSpeechEngine<P> {
    /// Create an engine with default configuration. Nothing native starts yet.
    pub fn new(platform: P) -> Self {
        Self::with_config(platform, EngineConfig::default())
    }

    pub fn with_config(platform: P, config: EngineConfig) -> Self {
        let (listener, gate) = progress_channel();
        Self {
            platform,
            config,
            initializer: None,
            listener,
            gate,
            slot: RwLock::new(Slot::Uninitialized),
            init_lock: Mutex::new(()),
        }
    }

    /// Run `initializer` once the native engine is up.
    #[must_use]
    pub fn with_initializer(mut self, initializer: impl Initializer<P::Handle> + 'static) -> Self {
        self.initializer = Some(Box::new(initializer));
        self
    }

    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> EngineState {
        match &*self.read_slot() {
            Slot::Uninitialized => EngineState::Uninitialized,
            Slot::Ready(_) => EngineState::Ready,
            Slot::ShutDown => EngineState::ShutDown,
        }
    }

    // ── Utterances ─────────────────────────────────────────────────

    /// Speak `text` and wait until the native engine finishes it.
    ///
    /// Returns `Ok(true)` when the utterance completed, `Ok(false)` when the
    /// native engine rejected the submission or reported an error.
    pub async fn speak(&self, text: &str, options: UtteranceOptions) -> Result<bool, TtsError> {
        let native = self.native().await?;
        let (utterance_id, mode, params) = Self::submission(options);

        tracing::debug!(
            utterance_id = %utterance_id,
            ?mode,
            chars = text.chars().count(),
            "Submitting utterance"
        );

        if !accepted("speak", native.speak(text, mode, &params, &utterance_id)) {
            return Ok(false);
        }

        self.wait_for(&utterance_id).await
    }

    /// Play a registered earcon and wait until it finishes.
    pub async fn play_earcon(
        &self,
        earcon: &str,
        options: UtteranceOptions,
    ) -> Result<bool, TtsError> {
        let earcon = checked_earcon(earcon)?;
        let native = self.native().await?;
        let (utterance_id, mode, params) = Self::submission(options);

        tracing::debug!(utterance_id = %utterance_id, %earcon, ?mode, "Submitting earcon");

        if !accepted(
            "play_earcon",
            native.play_earcon(&earcon, mode, &params, &utterance_id),
        ) {
            return Ok(false);
        }

        self.wait_for(&utterance_id).await
    }

    fn submission(options: UtteranceOptions) -> (String, QueueMode, SpeakParams) {
        let utterance_id = options.utterance_id.unwrap_or_else(new_utterance_id);
        let mode = QueueMode::from_flush(options.flush_queue);
        let params = SpeakParams {
            stream: options.stream,
        };
        (utterance_id, mode, params)
    }

    async fn wait_for(&self, utterance_id: &str) -> Result<bool, TtsError> {
        self.gate
            .wait_for_within(utterance_id, self.config.utterance_timeout())
            .await
    }

    /// Whether the native engine is playing. `false` when not initialized
    /// or shut down.
    pub fn is_speaking(&self) -> bool {
        match &*self.read_slot() {
            Slot::Ready(native) => native.is_speaking(),
            Slot::Uninitialized | Slot::ShutDown => false,
        }
    }

    /// Interrupt playback and drop queued utterances. No-op unless ready.
    pub fn stop(&self) {
        if let Slot::Ready(native) = &*self.read_slot() {
            accepted("stop", native.stop());
        }
    }

    /// Release the native engine. Terminal: the engine cannot be restarted.
    pub fn shutdown(&self) {
        let previous = mem::replace(&mut *self.write_slot(), Slot::ShutDown);
        if let Slot::Ready(native) = previous {
            native.shutdown();
            tracing::info!("Speech engine shut down");
        }
    }

    // ── Earcons ────────────────────────────────────────────────────

    /// Register `source` under the earcon name `earcon`.
    ///
    /// Blank names are rejected before the native engine is touched.
    pub async fn add_earcon(&self, earcon: &str, source: EarconSource) -> Result<bool, TtsError> {
        checked_earcon(earcon)?;
        self.with_controls(|controls| controls.add_earcon(earcon, &source))
            .await?
    }

    pub async fn add_earcon_file(
        &self,
        earcon: &str,
        file: impl Into<PathBuf>,
    ) -> Result<bool, TtsError> {
        self.add_earcon(earcon, EarconSource::File(file.into()))
            .await
    }

    pub async fn add_earcon_resource(
        &self,
        earcon: &str,
        package: impl Into<String>,
        resource_id: i32,
    ) -> Result<bool, TtsError> {
        self.add_earcon(
            earcon,
            EarconSource::Resource {
                package: package.into(),
                resource_id,
            },
        )
        .await
    }

    // ── Configuration ──────────────────────────────────────────────

    pub async fn configuration(&self) -> Result<Configuration, TtsError> {
        self.with_controls(|controls| controls.configuration())
            .await
    }

    pub async fn set_pitch(&self, pitch: f32) -> Result<bool, TtsError> {
        self.with_controls(|controls| controls.set_pitch(pitch)).await
    }

    pub async fn set_speech_rate(&self, rate: SpeechRate) -> Result<bool, TtsError> {
        self.with_controls(|controls| controls.set_speech_rate(rate))
            .await
    }

    pub async fn set_audio_attributes(
        &self,
        attributes: &AudioAttributes,
    ) -> Result<bool, TtsError> {
        self.with_controls(|controls| controls.set_audio_attributes(attributes))
            .await
    }

    pub async fn set_voice(&self, voice: &Voice) -> Result<bool, TtsError> {
        self.with_controls(|controls| controls.set_voice(voice))
            .await
    }

    pub async fn set_language(&self, locale: &Locale) -> Result<bool, TtsError> {
        self.with_controls(|controls| controls.set_language(locale))
            .await
    }

    async fn with_controls<T>(
        &self,
        op: impl FnOnce(&Controls<'_, P::Handle>) -> T,
    ) -> Result<T, TtsError> {
        let native = self.native().await?;
        Ok(op(&Controls::new(native.as_ref())))
    }

    // ── Lazy initialization ────────────────────────────────────────

    /// The ready native handle, creating it on first use.
    async fn native(&self) -> Result<Arc<P::Handle>, TtsError> {
        if let Some(native) = self.ready_handle()? {
            return Ok(native);
        }

        let _init = self.init_lock.lock().await;

        // Another caller may have finished initializing while we waited.
        if let Some(native) = self.ready_handle()? {
            return Ok(native);
        }

        let native = Arc::new(self.start_native().await?);
        if let Err(e) = self.prepare(&native).await {
            native.shutdown();
            return Err(e);
        }

        let mut slot = self.write_slot();
        if matches!(*slot, Slot::ShutDown) {
            drop(slot);
            native.shutdown();
            tracing::debug!("Engine shut down during initialization, releasing new instance");
            return Err(TtsError::ShutDown);
        }
        *slot = Slot::Ready(Arc::clone(&native));
        drop(slot);

        tracing::info!("Speech engine ready");
        Ok(native)
    }

    fn ready_handle(&self) -> Result<Option<Arc<P::Handle>>, TtsError> {
        match &*self.read_slot() {
            Slot::Ready(native) => Ok(Some(Arc::clone(native))),
            Slot::Uninitialized => Ok(None),
            Slot::ShutDown => Err(TtsError::ShutDown),
        }
    }

    /// Open a native instance and wait for its init callback.
    async fn start_native(&self) -> Result<P::Handle, TtsError> {
        tracing::debug!("Starting native speech engine");

        let (init_tx, init_rx) = oneshot::channel();
        let native = self.platform.open(Box::new(move |status| {
            let _ = init_tx.send(status);
        }));

        let failure = match init_rx.await {
            Ok(Ok(())) => None,
            Ok(Err(code)) => Some(TtsError::InitFailed(code)),
            Err(_) => Some(TtsError::InitAborted),
        };
        if let Some(err) = failure {
            tracing::warn!(error = %err, "Native speech engine failed to start");
            native.shutdown();
            return Err(err);
        }

        if let Err(code) = native.set_progress_listener(self.listener.clone()) {
            tracing::warn!(error = %code, "Native speech engine refused the progress listener");
            native.shutdown();
            return Err(TtsError::InitFailed(code));
        }

        Ok(native)
    }

    /// Push startup settings, then run the user hook.
    async fn prepare(&self, native: &P::Handle) -> Result<(), TtsError> {
        let controls = Controls::new(native);
        self.apply_defaults(&controls);

        if let Some(initializer) = &self.initializer {
            initializer
                .initialize(&controls)
                .await
                .map_err(TtsError::Initializer)?;
        }
        Ok(())
    }

    fn apply_defaults(&self, controls: &Controls<'_, P::Handle>) {
        if !self.config.has_voice_defaults() {
            return;
        }

        if let Some(language) = &self.config.language {
            controls.set_language(language);
        }
        if let Some(pitch) = self.config.pitch {
            controls.set_pitch(pitch);
        }
        if let Some(rate) = self.config.speech_rate {
            controls.set_speech_rate(rate);
        }
        if let Some(name) = &self.config.voice {
            match controls.voices().into_iter().find(|v| &v.name == name) {
                Some(voice) => {
                    controls.set_voice(&voice);
                }
                None => {
                    tracing::warn!(voice = %name, "Configured voice not offered by the engine");
                }
            }
        }
    }

    fn read_slot(&self) -> RwLockReadGuard<'_, Slot<P::Handle>> {
        self.slot.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_slot(&self) -> RwLockWriteGuard<'_, Slot<P::Handle>> {
        self.slot.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<P: SpeechPlatform> Drop for TextToSpeechEngine<P> {
    fn drop(&mut self) {
        // Best-effort release of a live native instance.
        self.shutdown();
    }
}
