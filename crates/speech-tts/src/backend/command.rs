//! Command-line synthesizer backend. Implements [`NativeTts`] over
//! `espeak-ng`, `espeak` or macOS `say`.
//!
//! Each utterance is one synthesizer process. Processes are run one at a
//! time by a dedicated worker thread that owns the playback queue, so the
//! async runtime never waits on a child process:
//!
//! ```text
//!   speak()/play_earcon() ──push──▶ queue ──▶ worker thread ──spawn──▶ espeak-ng …
//!                                                  │
//!                              on_start / on_done / on_error ──▶ ProgressListener
//! ```
//!
//! The worker also performs initialization (program discovery and the voice
//! listing) so that [`SpeechPlatform::open`] returns immediately and readiness
//! is reported through the init callback, like a platform speech service.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::backend::voices::{parse_espeak_voices, parse_say_voices};
use crate::gate::ProgressListener;
use crate::locale::Locale;
use crate::platform::{
    AudioAttributes, EarconSource, InitCallback, NativeError, NativeResult, NativeTts, QueueMode,
    SpeakParams, SpeechPlatform,
};
use crate::voice::Voice;

/// Speaking rate of the synthesizer at `rate == 1.0`, in words per minute.
pub const DEFAULT_WORDS_PER_MINUTE: u32 = 175;

/// Synthesizers tried, in order, when none is configured.
const SYNTH_CANDIDATES: &[&str] = &["espeak-ng", "espeak", "say"];

/// Audio players tried, in order, for earcons when none is configured.
const PLAYER_CANDIDATES: &[&str] = &["paplay", "aplay", "afplay"];

/// How often the worker checks whether the running process has exited.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

const MIN_WORDS_PER_MINUTE: f32 = 80.0;
const MAX_WORDS_PER_MINUTE: f32 = 450.0;

// ── Configuration ──────────────────────────────────────────────────

/// Configuration for the command-line backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CommandConfig {
    /// Synthesizer program (path or name on `PATH`). Discovered when `None`.
    pub program: Option<PathBuf>,

    /// Audio player used for earcons. Discovered when `None`.
    pub player: Option<PathBuf>,

    /// Words per minute at the normal speech rate.
    pub words_per_minute: u32,
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            program: None,
            player: None,
            words_per_minute: DEFAULT_WORDS_PER_MINUTE,
        }
    }
}

/// Command-line dialect of the synthesizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SynthFlavor {
    /// `espeak-ng` / `espeak`: `-v voice -s wpm -p pitch text`.
    Espeak,

    /// macOS `say`: `-v voice -r wpm text`. No pitch control.
    Say,
}

impl SynthFlavor {
    /// Guess the dialect from the program's file name.
    #[must_use]
    pub fn detect(program: &Path) -> Self {
        match program.file_stem().and_then(|stem| stem.to_str()) {
            Some("say") => Self::Say,
            _ => Self::Espeak,
        }
    }

    const fn voice_listing_args(self) -> &'static [&'static str] {
        match self {
            Self::Espeak => &["--voices"],
            Self::Say => &["-v", "?"],
        }
    }

    fn parse_voices(self, output: &str) -> Vec<Voice> {
        match self {
            Self::Espeak => parse_espeak_voices(output),
            Self::Say => parse_say_voices(output),
        }
    }
}

// ── Platform ───────────────────────────────────────────────────────

/// [`SpeechPlatform`] backed by the host's command-line synthesizer.
#[derive(Debug, Clone, Default)]
pub struct CommandPlatform {
    config: CommandConfig,
}

impl CommandPlatform {
    #[must_use]
    pub const fn new(config: CommandConfig) -> Self {
        Self { config }
    }

    pub const fn config(&self) -> &CommandConfig {
        &self.config
    }
}

impl SpeechPlatform for CommandPlatform {
    type Handle = CommandTts;

    fn open(&self, on_init: InitCallback) -> CommandTts {
        CommandTts::spawn(self.config.clone(), on_init)
    }
}

// ── Prosody → arguments ────────────────────────────────────────────

/// Voice parameters that turn into synthesizer arguments.
#[derive(Debug, Clone, PartialEq)]
struct Prosody {
    voice: Option<String>,
    words_per_minute: u32,
    rate: f32,
    pitch: f32,
}

impl Prosody {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    fn effective_words_per_minute(&self) -> u32 {
        (self.words_per_minute as f32 * self.rate)
            .round()
            .clamp(MIN_WORDS_PER_MINUTE, MAX_WORDS_PER_MINUTE) as u32
    }

    /// espeak pitch scale: 0–99, 50 is the voice's natural pitch.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn espeak_pitch(&self) -> u32 {
        (50.0 * self.pitch).round().clamp(0.0, 99.0) as u32
    }

    fn args(&self, flavor: SynthFlavor, text: &str) -> Vec<String> {
        let mut args = Vec::with_capacity(7);
        if let Some(voice) = &self.voice {
            args.push("-v".to_string());
            args.push(voice.clone());
        }
        match flavor {
            SynthFlavor::Espeak => {
                args.push("-s".to_string());
                args.push(self.effective_words_per_minute().to_string());
                args.push("-p".to_string());
                args.push(self.espeak_pitch().to_string());
            }
            SynthFlavor::Say => {
                args.push("-r".to_string());
                args.push(self.effective_words_per_minute().to_string());
            }
        }
        args.push(text_argument(text));
        args
    }
}

/// Keep text that starts with `-` from being read as an option.
fn text_argument(text: &str) -> String {
    if text.starts_with('-') {
        format!(" {text}")
    } else {
        text.to_string()
    }
}

/// Find a program: a configured path is used as-is when it exists, otherwise
/// looked up on `PATH`; without configuration the first candidate found wins.
fn resolve_program(configured: Option<&Path>, candidates: &[&str]) -> Option<PathBuf> {
    match configured {
        Some(path) if path.is_file() => Some(path.to_path_buf()),
        Some(path) => which::which(path).ok(),
        None => candidates
            .iter()
            .find_map(|candidate| which::which(candidate).ok()),
    }
}

// ── Shared state ───────────────────────────────────────────────────

enum JobKind {
    Text(String),
    Earcon(PathBuf),
}

struct Job {
    utterance_id: String,
    kind: JobKind,
}

#[derive(Default)]
struct Queue {
    jobs: VecDeque<Job>,
    closed: bool,
}

struct SynthState {
    program: Option<PathBuf>,
    flavor: SynthFlavor,
    player: Option<PathBuf>,
    listener: Option<ProgressListener>,
    voices: Vec<Voice>,
    voice: Option<Voice>,
    pitch: f32,
    rate: f32,
    words_per_minute: u32,
    earcons: HashMap<String, PathBuf>,
}

impl SynthState {
    fn new(words_per_minute: u32) -> Self {
        Self {
            program: None,
            flavor: SynthFlavor::Espeak,
            player: None,
            listener: None,
            voices: Vec::new(),
            voice: None,
            pitch: 1.0,
            rate: 1.0,
            words_per_minute,
            earcons: HashMap::new(),
        }
    }

    fn prosody(&self) -> Prosody {
        Prosody {
            voice: self.voice.as_ref().map(|voice| voice.name.clone()),
            words_per_minute: self.words_per_minute,
            rate: self.rate,
            pitch: self.pitch,
        }
    }

    fn command_for(&self, kind: &JobKind) -> Option<Command> {
        let mut command = match kind {
            JobKind::Text(text) => {
                let mut command = Command::new(self.program.as_ref()?);
                command.args(self.prosody().args(self.flavor, text));
                command
            }
            JobKind::Earcon(path) => {
                let mut command = Command::new(self.player.as_ref()?);
                command.arg(path);
                command
            }
        };
        command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        Some(command)
    }

    /// Exact locale match first, then any voice of the same language.
    fn voice_for(&self, locale: &Locale) -> Option<&Voice> {
        self.voices
            .iter()
            .find(|voice| &voice.locale == locale)
            .or_else(|| {
                self.voices
                    .iter()
                    .find(|voice| voice.locale.same_language(locale))
            })
    }

    fn default_voice(&self) -> Option<&Voice> {
        self.voice_for(&Locale::system_default())
            .or_else(|| self.voices.first())
    }
}

struct Shared {
    state: Mutex<SynthState>,
    queue: Mutex<Queue>,
    wake: Condvar,
    current: Mutex<Option<Child>>,
    /// Set by a flush or stop; the playing job is killed once it has a process.
    interrupted: AtomicBool,
    /// Set when the playing job's process was killed while still running.
    killed: AtomicBool,
    speaking: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Shared {
    fn new(words_per_minute: u32) -> Self {
        Self {
            state: Mutex::new(SynthState::new(words_per_minute)),
            queue: Mutex::new(Queue::default()),
            wake: Condvar::new(),
            current: Mutex::new(None),
            interrupted: AtomicBool::new(false),
            killed: AtomicBool::new(false),
            speaking: AtomicBool::new(false),
        }
    }

    fn listener(&self) -> Option<ProgressListener> {
        lock(&self.state).listener.clone()
    }

    /// Resolve the programs and load the voice list.
    fn start(&self, config: &CommandConfig) -> NativeResult {
        let Some(program) = resolve_program(config.program.as_deref(), SYNTH_CANDIDATES) else {
            tracing::warn!(configured = ?config.program, "No command-line speech synthesizer found");
            return Err(NativeError::NOT_INSTALLED);
        };
        let flavor = SynthFlavor::detect(&program);

        let output = Command::new(&program)
            .args(flavor.voice_listing_args())
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                tracing::warn!(program = %program.display(), error = %e, "Failed to run synthesizer");
                NativeError::SERVICE
            })?;
        if !output.status.success() {
            tracing::warn!(
                program = %program.display(),
                status = %output.status,
                "Synthesizer voice listing failed"
            );
            return Err(NativeError::SERVICE);
        }
        let voices = flavor.parse_voices(&String::from_utf8_lossy(&output.stdout));

        let player = resolve_program(config.player.as_deref(), PLAYER_CANDIDATES);
        if player.is_none() {
            tracing::debug!("No audio player found, earcons are unavailable");
        }

        tracing::info!(
            program = %program.display(),
            ?flavor,
            voices = voices.len(),
            "Command-line synthesizer ready"
        );

        let mut state = lock(&self.state);
        state.program = Some(program);
        state.flavor = flavor;
        state.player = player;
        state.voices = voices;
        Ok(())
    }

    // ── Queue ──────────────────────────────────────────────────────

    fn enqueue(&self, job: Job, mode: QueueMode) -> NativeResult {
        let mut queue = lock(&self.queue);
        if queue.closed {
            return Err(NativeError::SERVICE);
        }
        if mode == QueueMode::Flush {
            self.interrupt(&mut queue);
        }
        queue.jobs.push_back(job);
        drop(queue);

        self.wake.notify_one();
        Ok(())
    }

    /// Fail every queued job and mark the playing one as interrupted.
    fn discard_pending(&self, queue: &mut Queue) {
        self.interrupted.store(true, Ordering::SeqCst);
        if queue.jobs.is_empty() {
            return;
        }

        let listener = self.listener();
        for job in queue.jobs.drain(..) {
            tracing::debug!(utterance_id = %job.utterance_id, "Discarding queued utterance");
            if let Some(listener) = &listener {
                listener.on_error(&job.utterance_id);
            }
        }
    }

    /// Drop the backlog and end the playing job. Holding the queue lock keeps
    /// the worker from starting the next job in between.
    fn interrupt(&self, queue: &mut Queue) {
        self.discard_pending(queue);
        self.kill_current();
    }

    /// Kill the playing process if it is still running. A process that has
    /// already exited keeps its own status.
    fn kill_current(&self) {
        let mut current = lock(&self.current);
        let Some(child) = current.as_mut() else {
            return;
        };
        match child.try_wait() {
            Ok(None) => match child.kill() {
                Ok(()) => self.killed.store(true, Ordering::SeqCst),
                Err(e) => tracing::trace!(error = %e, "Synthesizer process already exited"),
            },
            Ok(Some(_)) => tracing::trace!("Synthesizer process already exited"),
            Err(e) => tracing::debug!(error = %e, "Could not poll synthesizer process"),
        }
    }

    fn next_job(&self) -> Option<Job> {
        let mut queue = lock(&self.queue);
        loop {
            if queue.closed {
                return None;
            }
            if let Some(job) = queue.jobs.pop_front() {
                self.interrupted.store(false, Ordering::SeqCst);
                self.killed.store(false, Ordering::SeqCst);
                self.speaking.store(true, Ordering::SeqCst);
                return Some(job);
            }
            queue = self
                .wake
                .wait(queue)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn has_pending(&self) -> bool {
        !lock(&self.queue).jobs.is_empty()
    }

    // ── Worker ─────────────────────────────────────────────────────

    fn run(&self) {
        while let Some(job) = self.next_job() {
            let listener = self.listener();
            if let Some(listener) = &listener {
                listener.on_start(&job.utterance_id);
            }

            let done = self.play(&job);
            self.speaking.store(false, Ordering::SeqCst);

            if let Some(listener) = &listener {
                if done {
                    listener.on_done(&job.utterance_id);
                } else {
                    listener.on_error(&job.utterance_id);
                }
            }
        }
        tracing::debug!("Synthesizer worker shutting down");
    }

    /// Run one job to completion. `true` when it exited cleanly and was not
    /// killed.
    fn play(&self, job: &Job) -> bool {
        let Some(mut command) = lock(&self.state).command_for(&job.kind) else {
            tracing::warn!(utterance_id = %job.utterance_id, "No program available for utterance");
            return false;
        };

        let child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                tracing::warn!(utterance_id = %job.utterance_id, error = %e, "Failed to spawn synthesizer");
                return false;
            }
        };
        *lock(&self.current) = Some(child);

        // A flush may have landed between dequeue and spawn.
        if self.interrupted.load(Ordering::SeqCst) {
            self.kill_current();
        }

        let exited_cleanly = loop {
            let polled = lock(&self.current).as_mut().map(Child::try_wait);
            match polled {
                Some(Ok(Some(status))) => break status.success(),
                Some(Ok(None)) => thread::sleep(POLL_INTERVAL),
                Some(Err(e)) => {
                    tracing::warn!(utterance_id = %job.utterance_id, error = %e, "Lost track of synthesizer");
                    break false;
                }
                None => break false,
            }
        };
        *lock(&self.current) = None;

        exited_cleanly && !self.killed.load(Ordering::SeqCst)
    }
}

// ── Handle ─────────────────────────────────────────────────────────

/// Native handle for the command-line backend.
///
/// Owns the worker thread; [`shutdown`](NativeTts::shutdown) (or drop)
/// fails queued utterances, kills the running process and joins the worker.
pub struct CommandTts {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl CommandTts {
    fn spawn(config: CommandConfig, on_init: InitCallback) -> Self {
        let shared = Arc::new(Shared::new(config.words_per_minute));
        let worker_shared = Arc::clone(&shared);

        let spawned = thread::Builder::new()
            .name("speech-tts".into())
            .spawn(move || {
                let status = worker_shared.start(&config);
                let ready = status.is_ok();
                on_init(status);
                if ready {
                    worker_shared.run();
                }
            });

        let worker = match spawned {
            Ok(handle) => Some(handle),
            Err(e) => {
                // The init callback was dropped with the closure.
                tracing::error!(error = %e, "Failed to spawn synthesizer worker thread");
                None
            }
        };

        Self {
            shared,
            worker: Mutex::new(worker),
        }
    }

    fn state(&self) -> MutexGuard<'_, SynthState> {
        lock(&self.shared.state)
    }
}

impl NativeTts for CommandTts {
    fn set_progress_listener(&self, listener: ProgressListener) -> NativeResult {
        self.state().listener = Some(listener);
        Ok(())
    }

    fn speak(
        &self,
        text: &str,
        mode: QueueMode,
        _params: &SpeakParams,
        utterance_id: &str,
    ) -> NativeResult {
        if self.state().program.is_none() {
            return Err(NativeError::NOT_INSTALLED);
        }
        self.shared.enqueue(
            Job {
                utterance_id: utterance_id.to_string(),
                kind: JobKind::Text(text.to_string()),
            },
            mode,
        )
    }

    fn play_earcon(
        &self,
        earcon: &str,
        mode: QueueMode,
        _params: &SpeakParams,
        utterance_id: &str,
    ) -> NativeResult {
        let path = {
            let state = self.state();
            if state.player.is_none() {
                return Err(NativeError::NOT_INSTALLED);
            }
            state
                .earcons
                .get(earcon)
                .cloned()
                .ok_or(NativeError::INVALID_REQUEST)?
        };
        self.shared.enqueue(
            Job {
                utterance_id: utterance_id.to_string(),
                kind: JobKind::Earcon(path),
            },
            mode,
        )
    }

    fn add_earcon(&self, earcon: &str, source: &EarconSource) -> NativeResult {
        match source {
            EarconSource::File(path) if path.is_file() => {
                self.state().earcons.insert(earcon.to_string(), path.clone());
                tracing::debug!(%earcon, path = %path.display(), "Earcon registered");
                Ok(())
            }
            EarconSource::File(_) => Err(NativeError::ERROR),
            EarconSource::Resource { .. } => Err(NativeError::INVALID_REQUEST),
        }
    }

    fn is_speaking(&self) -> bool {
        self.shared.speaking.load(Ordering::SeqCst) || self.shared.has_pending()
    }

    fn stop(&self) -> NativeResult {
        self.shared.interrupt(&mut lock(&self.shared.queue));
        Ok(())
    }

    fn shutdown(&self) {
        {
            let mut queue = lock(&self.shared.queue);
            queue.closed = true;
            self.shared.interrupt(&mut queue);
        }
        self.shared.wake.notify_all();

        if let Some(worker) = lock(&self.worker).take() {
            if worker.join().is_err() {
                tracing::warn!("Synthesizer worker panicked");
            }
        }
    }

    fn available_languages(&self) -> BTreeSet<Locale> {
        self.state()
            .voices
            .iter()
            .map(|voice| voice.locale.clone())
            .collect()
    }

    fn voices(&self) -> Vec<Voice> {
        self.state().voices.clone()
    }

    fn voice(&self) -> Option<Voice> {
        let state = self.state();
        state.voice.clone().or_else(|| state.default_voice().cloned())
    }

    fn default_voice(&self) -> Option<Voice> {
        self.state().default_voice().cloned()
    }

    fn set_pitch(&self, pitch: f32) -> NativeResult {
        let mut state = self.state();
        if state.flavor == SynthFlavor::Say || !pitch.is_finite() || pitch <= 0.0 {
            return Err(NativeError::INVALID_REQUEST);
        }
        state.pitch = pitch;
        Ok(())
    }

    fn set_speech_rate(&self, rate: f32) -> NativeResult {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(NativeError::INVALID_REQUEST);
        }
        self.state().rate = rate;
        Ok(())
    }

    fn set_audio_attributes(&self, attributes: &AudioAttributes) -> NativeResult {
        // Output routing belongs to the player process; accepted and ignored.
        tracing::debug!(?attributes, "Audio attributes have no effect on command playback");
        Ok(())
    }

    fn set_voice(&self, voice: &Voice) -> NativeResult {
        let mut state = self.state();
        let known = state
            .voices
            .iter()
            .find(|candidate| candidate.name == voice.name)
            .cloned()
            .ok_or(NativeError::ERROR)?;
        state.voice = Some(known);
        Ok(())
    }

    fn set_language(&self, locale: &Locale) -> NativeResult {
        let mut state = self.state();
        let voice = state
            .voice_for(locale)
            .cloned()
            .ok_or(NativeError::LANG_NOT_SUPPORTED)?;
        state.voice = Some(voice);
        Ok(())
    }
}

impl Drop for CommandTts {
    fn drop(&mut self) {
        // Best-effort; shutdown may already have happened.
        self.shutdown();
    }
}
