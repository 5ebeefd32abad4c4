//! Command-line definition for the `speech` tool.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use speech_tts::{CommandConfig, EngineConfig, Locale, SpeechRate};

/// Speak text through the host's speech synthesizer.
#[derive(Parser, Debug)]
#[command(name = "speech")]
#[command(about = "Speak text through the host speech synthesizer")]
#[command(version)]
pub struct Cli {
    /// Synthesizer program (espeak-ng, espeak or say). Discovered on PATH when unset
    #[arg(long, env = "SPEECH_PROGRAM", global = true)]
    pub program: Option<PathBuf>,

    /// Audio player used for earcons. Discovered on PATH when unset
    #[arg(long, env = "SPEECH_PLAYER", global = true)]
    pub player: Option<PathBuf>,

    /// Give up on an utterance after this many seconds
    #[arg(long = "timeout-secs", env = "SPEECH_TIMEOUT_SECS", global = true)]
    pub timeout_secs: Option<u64>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Speak TEXT and wait until it has been spoken
    Say {
        /// Text to speak
        text: String,

        /// Interrupt anything already playing
        #[arg(long)]
        flush: bool,

        /// Speech rate: a preset (slowest, half, slower, normal, faster, double) or a multiplier
        #[arg(short, long)]
        rate: Option<SpeechRate>,

        /// Pitch multiplier (1.0 = natural)
        #[arg(short, long)]
        pitch: Option<f32>,

        /// Voice name as listed by `speech voices`
        #[arg(long)]
        voice: Option<String>,

        /// Language tag, e.g. en-US
        #[arg(short, long)]
        language: Option<Locale>,
    },

    /// List the synthesizer's voices
    Voices {
        /// Only voices for this language
        #[arg(short, long)]
        language: Option<Locale>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Register FILE as earcon NAME and play it
    Earcon {
        /// Earcon name; brackets are added when missing
        name: String,

        /// Sound file to play
        file: PathBuf,
    },
}

impl Cli {
    /// Backend settings from the global options.
    pub fn backend_config(&self) -> CommandConfig {
        CommandConfig {
            program: self.program.clone(),
            player: self.player.clone(),
            ..CommandConfig::default()
        }
    }

    /// Engine settings: the timeout plus any voice options given to `say`.
    pub fn engine_config(&self) -> EngineConfig {
        let mut config = EngineConfig::default();
        if let Some(secs) = self.timeout_secs {
            config = config.with_utterance_timeout(Duration::from_secs(secs));
        }
        if let Commands::Say {
            rate,
            pitch,
            voice,
            language,
            ..
        } = &self.command
        {
            config.speech_rate = *rate;
            config.pitch = *pitch;
            config.voice.clone_from(voice);
            config.language.clone_from(language);
        }
        config
    }
}
