//! Speech rate presets.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TtsError;

/// Speaking rate as a multiplier of the engine's normal rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum SpeechRate {
    Slowest,
    Half,
    Slower,
    #[default]
    Normal,
    Faster,
    Double,
    Custom(f32),
}

impl SpeechRate {
    /// The multiplier handed to the native engine.
    #[must_use]
    pub const fn value(self) -> f32 {
        match self {
            Self::Slowest => 0.1,
            Self::Half => 0.5,
            Self::Slower => 0.75,
            Self::Normal => 1.0,
            Self::Faster => 1.5,
            Self::Double => 2.0,
            Self::Custom(value) => value,
        }
    }
}

impl From<f32> for SpeechRate {
    fn from(value: f32) -> Self {
        Self::Custom(value)
    }
}

impl fmt::Display for SpeechRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Slowest => f.write_str("slowest"),
            Self::Half => f.write_str("half"),
            Self::Slower => f.write_str("slower"),
            Self::Normal => f.write_str("normal"),
            Self::Faster => f.write_str("faster"),
            Self::Double => f.write_str("double"),
            Self::Custom(value) => write!(f, "{value}"),
        }
    }
}

/// Accepts preset names (case-insensitive) or a positive multiplier.
impl FromStr for SpeechRate {
    type Err = TtsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "slowest" => Ok(Self::Slowest),
            "half" => Ok(Self::Half),
            "slower" => Ok(Self::Slower),
            "normal" => Ok(Self::Normal),
            "faster" => Ok(Self::Faster),
            "double" => Ok(Self::Double),
            other => match other.parse::<f32>() {
                Ok(value) if value.is_finite() && value > 0.0 => Ok(Self::Custom(value)),
                _ => Err(TtsError::InvalidSpeechRate(trimmed.to_string())),
            },
        }
    }
}
