//! Voices and the engine configuration snapshot.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::locale::Locale;

/// Synthesis quality advertised by a voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum VoiceQuality {
    VeryLow,
    Low,
    #[default]
    Normal,
    High,
    VeryHigh,
}

/// A voice offered by the native engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Voice {
    /// Engine-specific identifier, unique within one engine.
    pub name: String,

    pub locale: Locale,

    pub quality: VoiceQuality,

    /// Whether synthesis goes over the network.
    pub requires_network: bool,

    /// Free-form engine features (gender, variant names, ...).
    pub features: BTreeSet<String>,
}

impl Voice {
    /// A local, normal-quality voice with no extra features.
    #[must_use]
    pub fn new(name: impl Into<String>, locale: Locale) -> Self {
        Self {
            name: name.into(),
            locale,
            quality: VoiceQuality::Normal,
            requires_network: false,
            features: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn with_feature(mut self, feature: impl Into<String>) -> Self {
        self.features.insert(feature.into());
        self
    }
}

/// Read-only snapshot of the engine's language and voice state.
///
/// Pulled from the native engine on each query; never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    pub available_languages: BTreeSet<Locale>,
    pub available_voices: Vec<Voice>,
    pub current_voice: Option<Voice>,
    pub default_voice: Option<Voice>,
}

impl Configuration {
    /// Languages matching `locale`'s language.
    #[must_use]
    pub fn languages_for(&self, locale: &Locale) -> Vec<&Locale> {
        filter_locales_by_language(&self.available_languages, locale)
    }

    /// Voices matching `locale`'s language.
    #[must_use]
    pub fn voices_for(&self, locale: &Locale) -> Vec<&Voice> {
        filter_voices_by_language(&self.available_voices, locale)
    }
}

/// Keep the locales that share `locale`'s language, regardless of country.
pub fn filter_locales_by_language<'a>(
    locales: impl IntoIterator<Item = &'a Locale>,
    locale: &Locale,
) -> Vec<&'a Locale> {
    locales
        .into_iter()
        .filter(|candidate| candidate.same_language(locale))
        .collect()
}

/// Keep the voices whose locale shares `locale`'s language.
pub fn filter_voices_by_language<'a>(
    voices: impl IntoIterator<Item = &'a Voice>,
    locale: &Locale,
) -> Vec<&'a Voice> {
    voices
        .into_iter()
        .filter(|voice| voice.locale.same_language(locale))
        .collect()
}
