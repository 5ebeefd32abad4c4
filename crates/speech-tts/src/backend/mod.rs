//! Native backends shipped with the crate.
//!
//! [`CommandPlatform`] drives a command-line synthesizer (`espeak-ng`,
//! `espeak` or macOS `say`). Other hosts plug in by implementing
//! [`SpeechPlatform`](crate::SpeechPlatform) and [`NativeTts`](crate::NativeTts).

pub mod command;
pub mod voices;

pub use command::{CommandConfig, CommandPlatform, CommandTts, DEFAULT_WORDS_PER_MINUTE, SynthFlavor};
pub use voices::{parse_espeak_voices, parse_say_voices};
