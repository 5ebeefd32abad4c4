//! Subcommand handlers.

use std::path::Path;

use anyhow::Context;
use speech_tts::{
    Locale, SpeechPlatform, TextToSpeechEngine, UtteranceOptions, Voice,
    filter_voices_by_language,
};

/// Speak `text`. `Ok(false)` when the synthesizer reported a failure.
pub async fn say<P: SpeechPlatform>(
    engine: &TextToSpeechEngine<P>,
    text: &str,
    flush: bool,
) -> anyhow::Result<bool> {
    let options = if flush {
        UtteranceOptions::new().flushing()
    } else {
        UtteranceOptions::new()
    };
    engine
        .speak(text, options)
        .await
        .context("Failed to speak text")
}

/// Print the voices, optionally restricted to one language.
pub async fn voices<P: SpeechPlatform>(
    engine: &TextToSpeechEngine<P>,
    language: Option<&Locale>,
    json: bool,
) -> anyhow::Result<()> {
    let configuration = engine
        .configuration()
        .await
        .context("Failed to query voices")?;

    let voices: Vec<&Voice> = match language {
        Some(locale) => filter_voices_by_language(&configuration.available_voices, locale),
        None => configuration.available_voices.iter().collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&voices)?);
        return Ok(());
    }

    let current = configuration.current_voice.as_ref().map(|v| v.name.as_str());
    for voice in voices {
        let marker = if Some(voice.name.as_str()) == current { "*" } else { " " };
        println!("{marker} {:<24} {}", voice.name, voice.locale);
    }
    Ok(())
}

/// Register `file` as earcon `name` and play it.
pub async fn earcon<P: SpeechPlatform>(
    engine: &TextToSpeechEngine<P>,
    name: &str,
    file: &Path,
) -> anyhow::Result<bool> {
    if !engine.add_earcon_file(name, file).await? {
        anyhow::bail!("Synthesizer refused earcon file {}", file.display());
    }
    tracing::debug!(%name, file = %file.display(), "Earcon registered");

    engine
        .play_earcon(name, UtteranceOptions::new())
        .await
        .context("Failed to play earcon")
}
