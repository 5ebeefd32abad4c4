//! Integration tests for the `TextToSpeechEngine` lifecycle.
//!
//! A fake native service records every call it receives and answers
//! utterances through the progress listener, the way a platform speech
//! service would. No synthesizer or audio device is needed.
//!
//! # What is tested
//!
//! - `speak` resolves from the matching terminal event
//! - Queue mode and utterance ids reach the native service
//! - Exactly one native instance under concurrent first use
//! - Shutdown is terminal, and wins over an initialization in flight
//! - Failed initialization releases the instance and is retried
//! - Startup defaults and the initializer hook run once
//! - Earcon names are normalized, blank names never reach the service

use std::collections::{BTreeSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use speech_tts::{
    AudioAttributes, Controls, EarconSource, EngineConfig, EngineState, InitCallback, Initializer,
    Locale, NativeError, NativeResult, NativeTts, ProgressListener, QueueMode, SpeakParams,
    SpeechPlatform, SpeechRate, TextToSpeechEngine, TtsError, UtteranceOptions, Voice,
};

// ── Fake native service ────────────────────────────────────────────

/// How the fake answers an utterance.
#[derive(Debug, Clone, Copy)]
enum Outcome {
    Done,
    Error,
    Reject,
    /// Starts but never finishes.
    Hang,
}

/// Everything the fake services saw, shared across instances.
#[derive(Default)]
struct Log {
    opens: AtomicUsize,
    shutdowns: AtomicUsize,
    submissions: Mutex<Vec<(String, QueueMode, String)>>,
    settings: Mutex<Vec<String>>,
    earcons: Mutex<Vec<String>>,
}

impl Log {
    fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    fn shutdowns(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }

    fn settings(&self) -> Vec<String> {
        self.settings.lock().unwrap().clone()
    }

    fn record(&self, setting: String) {
        self.settings.lock().unwrap().push(setting);
    }
}

struct FakeNative {
    log: Arc<Log>,
    outcome: Outcome,
    listener: Mutex<Option<ProgressListener>>,
}

impl FakeNative {
    fn answer(&self, utterance_id: &str) -> NativeResult {
        let listener = self.listener.lock().unwrap().clone();
        let Some(listener) = listener else {
            return Err(NativeError::SERVICE);
        };
        match self.outcome {
            Outcome::Reject => return Err(NativeError::SYNTHESIS),
            Outcome::Done => {
                listener.on_start(utterance_id);
                listener.on_done(utterance_id);
            }
            Outcome::Error => {
                listener.on_start(utterance_id);
                listener.on_error(utterance_id);
            }
            Outcome::Hang => listener.on_start(utterance_id),
        }
        Ok(())
    }
}

fn bob() -> Voice {
    Voice::new("bob", Locale::new("en").with_country("US"))
}

impl NativeTts for FakeNative {
    fn set_progress_listener(&self, listener: ProgressListener) -> NativeResult {
        *self.listener.lock().unwrap() = Some(listener);
        Ok(())
    }

    fn speak(
        &self,
        text: &str,
        mode: QueueMode,
        _params: &SpeakParams,
        utterance_id: &str,
    ) -> NativeResult {
        self.log.submissions.lock().unwrap().push((
            text.to_string(),
            mode,
            utterance_id.to_string(),
        ));
        self.answer(utterance_id)
    }

    fn play_earcon(
        &self,
        earcon: &str,
        _mode: QueueMode,
        _params: &SpeakParams,
        utterance_id: &str,
    ) -> NativeResult {
        self.log.earcons.lock().unwrap().push(earcon.to_string());
        self.answer(utterance_id)
    }

    fn add_earcon(&self, earcon: &str, _source: &EarconSource) -> NativeResult {
        self.log.earcons.lock().unwrap().push(earcon.to_string());
        Ok(())
    }

    fn is_speaking(&self) -> bool {
        true
    }

    fn stop(&self) -> NativeResult {
        Ok(())
    }

    fn shutdown(&self) {
        self.log.shutdowns.fetch_add(1, Ordering::SeqCst);
    }

    fn available_languages(&self) -> BTreeSet<Locale> {
        BTreeSet::from([bob().locale])
    }

    fn voices(&self) -> Vec<Voice> {
        vec![bob()]
    }

    fn voice(&self) -> Option<Voice> {
        Some(bob())
    }

    fn default_voice(&self) -> Option<Voice> {
        Some(bob())
    }

    fn set_pitch(&self, pitch: f32) -> NativeResult {
        self.log.record(format!("pitch:{pitch}"));
        Ok(())
    }

    fn set_speech_rate(&self, rate: f32) -> NativeResult {
        self.log.record(format!("rate:{rate}"));
        Ok(())
    }

    fn set_audio_attributes(&self, _attributes: &AudioAttributes) -> NativeResult {
        Ok(())
    }

    fn set_voice(&self, voice: &Voice) -> NativeResult {
        self.log.record(format!("voice:{}", voice.name));
        Ok(())
    }

    fn set_language(&self, locale: &Locale) -> NativeResult {
        if locale.language() != "en" {
            return Err(NativeError::LANG_NOT_SUPPORTED);
        }
        self.log.record(format!("language:{locale}"));
        Ok(())
    }
}

struct FakePlatform {
    log: Arc<Log>,
    outcome: Outcome,
    /// Init statuses handed out in order; `Ok` once exhausted.
    init_script: Mutex<VecDeque<NativeResult>>,
    /// Report readiness from another thread after this delay.
    init_delay: Option<Duration>,
}

impl FakePlatform {
    fn new(outcome: Outcome) -> (Self, Arc<Log>) {
        let log = Arc::new(Log::default());
        let platform = Self {
            log: Arc::clone(&log),
            outcome,
            init_script: Mutex::new(VecDeque::new()),
            init_delay: None,
        };
        (platform, log)
    }

    fn failing_first(self, status: NativeError) -> Self {
        self.init_script.lock().unwrap().push_back(Err(status));
        self
    }

    fn slow(mut self, delay: Duration) -> Self {
        self.init_delay = Some(delay);
        self
    }
}

impl SpeechPlatform for FakePlatform {
    type Handle = FakeNative;

    fn open(&self, on_init: InitCallback) -> FakeNative {
        self.log.opens.fetch_add(1, Ordering::SeqCst);
        let status = self.init_script.lock().unwrap().pop_front().unwrap_or(Ok(()));

        match self.init_delay {
            Some(delay) => {
                std::thread::spawn(move || {
                    std::thread::sleep(delay);
                    on_init(status);
                });
            }
            None => on_init(status),
        }

        FakeNative {
            log: Arc::clone(&self.log),
            outcome: self.outcome,
            listener: Mutex::new(None),
        }
    }
}

// ── Utterances ─────────────────────────────────────────────────────

#[tokio::test]
async fn speak_resolves_true_when_done() {
    let (platform, log) = FakePlatform::new(Outcome::Done);
    let engine = TextToSpeechEngine::new(platform);

    assert_eq!(engine.state(), EngineState::Uninitialized);
    assert!(engine.speak("hello", UtteranceOptions::new()).await.unwrap());
    assert_eq!(engine.state(), EngineState::Ready);
    assert_eq!(log.opens(), 1);
}

#[tokio::test]
async fn speak_resolves_false_on_error() {
    let (platform, _log) = FakePlatform::new(Outcome::Error);
    let engine = TextToSpeechEngine::new(platform);

    assert!(!engine.speak("hello", UtteranceOptions::new()).await.unwrap());
}

#[tokio::test]
async fn rejected_submission_is_false_without_waiting() {
    let (platform, _log) = FakePlatform::new(Outcome::Reject);
    let engine = TextToSpeechEngine::new(platform);

    assert!(!engine.speak("hello", UtteranceOptions::new()).await.unwrap());
}

#[tokio::test]
async fn queue_mode_and_ids_reach_the_service() {
    let (platform, log) = FakePlatform::new(Outcome::Done);
    let engine = TextToSpeechEngine::new(platform);

    engine
        .speak("first", UtteranceOptions::new().with_id("greeting"))
        .await
        .unwrap();
    engine
        .speak("second", UtteranceOptions::new().flushing())
        .await
        .unwrap();
    engine.speak("third", UtteranceOptions::new()).await.unwrap();

    let submissions = log.submissions.lock().unwrap().clone();
    assert_eq!(submissions[0], ("first".into(), QueueMode::Add, "greeting".into()));
    assert_eq!(submissions[1].1, QueueMode::Flush);
    assert_eq!(submissions[2].1, QueueMode::Add);
    assert_ne!(submissions[1].2, submissions[2].2);
}

#[tokio::test]
async fn utterance_timeout_is_reported() {
    let (platform, _log) = FakePlatform::new(Outcome::Hang);
    let config = EngineConfig::default().with_utterance_timeout(Duration::from_millis(50));
    let engine = TextToSpeechEngine::with_config(platform, config);

    let err = engine
        .speak("never ends", UtteranceOptions::new().with_id("stuck"))
        .await
        .unwrap_err();
    assert!(matches!(err, TtsError::UtteranceTimeout { ref utterance_id, .. } if utterance_id == "stuck"));
}

// ── Lazy initialization ────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_first_use_opens_one_instance() {
    let (platform, log) = FakePlatform::new(Outcome::Done);
    let engine = Arc::new(TextToSpeechEngine::new(
        platform.slow(Duration::from_millis(50)),
    ));

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { engine.configuration().await })
        })
        .collect();

    for task in tasks {
        let configuration = task.await.unwrap().unwrap();
        assert_eq!(configuration.current_voice, Some(bob()));
    }
    assert_eq!(log.opens(), 1);
    assert_eq!(engine.state(), EngineState::Ready);
}

#[tokio::test]
async fn failed_init_releases_instance_and_retries() {
    let (platform, log) = FakePlatform::new(Outcome::Done);
    let engine = TextToSpeechEngine::new(platform.failing_first(NativeError::SERVICE));

    let err = engine
        .speak("hello", UtteranceOptions::new())
        .await
        .unwrap_err();
    assert!(matches!(err, TtsError::InitFailed(NativeError::SERVICE)));
    assert_eq!(engine.state(), EngineState::Uninitialized);
    assert_eq!(log.shutdowns(), 1);

    assert!(engine.speak("hello", UtteranceOptions::new()).await.unwrap());
    assert_eq!(log.opens(), 2);
}

// ── Shutdown ───────────────────────────────────────────────────────

#[tokio::test]
async fn shutdown_is_terminal() {
    let (platform, log) = FakePlatform::new(Outcome::Done);
    let engine = TextToSpeechEngine::new(platform);

    engine.speak("hello", UtteranceOptions::new()).await.unwrap();
    assert!(engine.is_speaking());

    engine.shutdown();
    engine.shutdown();
    assert_eq!(engine.state(), EngineState::ShutDown);
    assert_eq!(log.shutdowns(), 1);
    assert!(!engine.is_speaking());
    engine.stop();

    let err = engine
        .speak("again", UtteranceOptions::new())
        .await
        .unwrap_err();
    assert!(matches!(err, TtsError::ShutDown));
    assert!(matches!(engine.set_pitch(1.0).await, Err(TtsError::ShutDown)));
    assert_eq!(log.opens(), 1);
}

#[tokio::test]
async fn shutdown_before_first_use_never_opens() {
    let (platform, log) = FakePlatform::new(Outcome::Done);
    let engine = TextToSpeechEngine::new(platform);

    assert!(!engine.is_speaking());
    engine.shutdown();

    assert!(matches!(
        engine.speak("hello", UtteranceOptions::new()).await,
        Err(TtsError::ShutDown)
    ));
    assert_eq!(log.opens(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn shutdown_during_initialization_releases_the_new_instance() {
    let (platform, log) = FakePlatform::new(Outcome::Done);
    let engine = Arc::new(TextToSpeechEngine::new(
        platform.slow(Duration::from_millis(200)),
    ));

    let first_use = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move { engine.speak("hello", UtteranceOptions::new()).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(log.opens(), 1);
    assert_eq!(engine.state(), EngineState::Uninitialized);

    engine.shutdown();

    assert!(matches!(first_use.await.unwrap(), Err(TtsError::ShutDown)));
    assert_eq!(engine.state(), EngineState::ShutDown);
    assert_eq!(log.opens(), 1);
    assert_eq!(log.shutdowns(), 1);
}

#[tokio::test]
async fn dropping_the_engine_releases_the_service() {
    let (platform, log) = FakePlatform::new(Outcome::Done);
    {
        let engine = TextToSpeechEngine::new(platform);
        engine.speak("hello", UtteranceOptions::new()).await.unwrap();
    }
    assert_eq!(log.shutdowns(), 1);
}

// ── Startup settings ───────────────────────────────────────────────

struct CountingInitializer {
    runs: Arc<AtomicUsize>,
}

#[async_trait]
impl Initializer<FakeNative> for CountingInitializer {
    async fn initialize(&self, controls: &Controls<'_, FakeNative>) -> anyhow::Result<()> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        controls.set_pitch(1.25);
        Ok(())
    }
}

struct FailingInitializer;

#[async_trait]
impl Initializer<FakeNative> for FailingInitializer {
    async fn initialize(&self, _controls: &Controls<'_, FakeNative>) -> anyhow::Result<()> {
        anyhow::bail!("warm-up utterance failed")
    }
}

#[tokio::test]
async fn defaults_and_initializer_run_once() {
    let (platform, log) = FakePlatform::new(Outcome::Done);
    let runs = Arc::new(AtomicUsize::new(0));
    let config = EngineConfig {
        language: Some(Locale::new("en").with_country("US")),
        pitch: Some(1.5),
        speech_rate: Some(SpeechRate::Half),
        voice: Some("bob".into()),
        utterance_timeout_ms: None,
    };
    let engine = TextToSpeechEngine::with_config(platform, config).with_initializer(
        CountingInitializer {
            runs: Arc::clone(&runs),
        },
    );

    engine.speak("one", UtteranceOptions::new()).await.unwrap();
    engine.speak("two", UtteranceOptions::new()).await.unwrap();

    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert_eq!(
        log.settings(),
        ["language:en-US", "pitch:1.5", "rate:0.5", "voice:bob", "pitch:1.25"]
    );
}

#[tokio::test]
async fn unknown_default_voice_is_skipped() {
    let (platform, log) = FakePlatform::new(Outcome::Done);
    let config = EngineConfig {
        voice: Some("nobody".into()),
        ..EngineConfig::default()
    };
    let engine = TextToSpeechEngine::with_config(platform, config);

    assert!(engine.speak("hi", UtteranceOptions::new()).await.unwrap());
    assert!(log.settings().is_empty());
}

#[tokio::test]
async fn failing_initializer_aborts_startup() {
    let (platform, log) = FakePlatform::new(Outcome::Done);
    let engine = TextToSpeechEngine::new(platform).with_initializer(FailingInitializer);

    let err = engine
        .speak("hello", UtteranceOptions::new())
        .await
        .unwrap_err();
    assert!(matches!(err, TtsError::Initializer(_)));
    assert_eq!(engine.state(), EngineState::Uninitialized);
    assert_eq!(log.shutdowns(), 1);
}

#[tokio::test]
async fn unsupported_language_returns_false() {
    let (platform, _log) = FakePlatform::new(Outcome::Done);
    let engine = TextToSpeechEngine::new(platform);

    assert!(engine.set_language(&Locale::new("en")).await.unwrap());
    assert!(!engine.set_language(&Locale::new("xx")).await.unwrap());
}

// ── Earcons ────────────────────────────────────────────────────────

#[tokio::test]
async fn earcon_names_are_normalized() {
    let (platform, log) = FakePlatform::new(Outcome::Done);
    let engine = TextToSpeechEngine::new(platform);

    assert!(engine.add_earcon_file("tick", "/sounds/tick.wav").await.unwrap());
    assert!(engine.play_earcon("[tick", UtteranceOptions::new()).await.unwrap());
    assert!(engine.play_earcon("[tick]", UtteranceOptions::new()).await.unwrap());

    assert_eq!(*log.earcons.lock().unwrap(), ["[tick]", "[tick]", "[tick]"]);
}

#[tokio::test]
async fn blank_earcon_never_starts_the_service() {
    let (platform, log) = FakePlatform::new(Outcome::Done);
    let engine = TextToSpeechEngine::new(platform);

    assert!(matches!(
        engine.play_earcon("   ", UtteranceOptions::new()).await,
        Err(TtsError::BlankEarcon)
    ));
    assert!(matches!(
        engine.add_earcon_file("", "/sounds/tick.wav").await,
        Err(TtsError::BlankEarcon)
    ));
    assert_eq!(log.opens(), 0);
    assert_eq!(engine.state(), EngineState::Uninitialized);
}
