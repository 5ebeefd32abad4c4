//! Parsers for the voice listings printed by command-line synthesizers.

use std::collections::HashSet;

use crate::locale::Locale;
use crate::voice::Voice;

/// Parse `espeak-ng --voices` (or `espeak --voices`) output.
///
/// ```text
/// Pty Language       Age/Gender VoiceName          File                 Other Languages
///  5  af              --/M      Afrikaans          gmw/af
///  2  en-us           --/M      English_(America)  gmw/en-US            (en 3)
/// ```
///
/// The language column doubles as the voice name, since that is what `-v`
/// accepts. Rows with unparsable languages are skipped, as are repeats.
#[must_use]
pub fn parse_espeak_voices(output: &str) -> Vec<Voice> {
    let mut seen = HashSet::new();

    output
        .lines()
        .filter(|line| !line.trim_start().starts_with("Pty"))
        .filter_map(|line| {
            let mut columns = line.split_whitespace();
            let _priority = columns.next()?;
            let language = columns.next()?;
            let age_gender = columns.next()?;
            let display_name = columns.next()?;

            let locale = Locale::parse(language).ok()?;
            let mut voice = Voice::new(language, locale).with_feature(format!("name:{display_name}"));
            if let Some(gender) = gender_feature(age_gender) {
                voice = voice.with_feature(gender);
            }
            Some(voice)
        })
        .filter(|voice| seen.insert(voice.name.clone()))
        .collect()
}

fn gender_feature(age_gender: &str) -> Option<&'static str> {
    match age_gender.rsplit('/').next()? {
        "M" => Some("male"),
        "F" => Some("female"),
        _ => None,
    }
}

/// Parse macOS `say -v ?` output.
///
/// ```text
/// Alex                en_US    # Most people recognize me by my voice.
/// Bad News            en_US    # The light you see at the end of the tunnel...
/// ```
///
/// Voice names may contain spaces; the locale is the last token before `#`.
#[must_use]
pub fn parse_say_voices(output: &str) -> Vec<Voice> {
    let mut seen = HashSet::new();

    output
        .lines()
        .filter_map(|line| {
            let head = line.split_once('#').map_or(line, |(head, _)| head).trim();
            let (name, locale) = head.rsplit_once(char::is_whitespace)?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            let locale = Locale::parse(locale).ok()?;
            Some(Voice::new(name, locale))
        })
        .filter(|voice| seen.insert(voice.name.clone()))
        .collect()
}
