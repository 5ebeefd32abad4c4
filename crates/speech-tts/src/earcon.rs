//! Earcon naming.
//!
//! An earcon is an audible icon: a short sound that marks an event or
//! structure in the text (a bullet list starting, a page turn) rather than
//! representing words. By convention earcon names are enclosed in square
//! brackets, e.g. `[tick]`.

use std::borrow::Cow;

use crate::error::TtsError;

/// Wrap an earcon name in square brackets, adding only the missing side.
///
/// Idempotent: `"[tick]"` is returned unchanged, `"tick"` becomes `"[tick]"`.
#[must_use]
pub fn normalize_earcon(earcon: &str) -> Cow<'_, str> {
    let opens = earcon.starts_with('[');
    let closes = earcon.ends_with(']');

    match (opens, closes) {
        (true, true) => Cow::Borrowed(earcon),
        (true, false) => Cow::Owned(format!("{earcon}]")),
        (false, true) => Cow::Owned(format!("[{earcon}")),
        (false, false) => Cow::Owned(format!("[{earcon}]")),
    }
}

/// Reject blank names, then normalize.
pub(crate) fn checked_earcon(earcon: &str) -> Result<Cow<'_, str>, TtsError> {
    if earcon.trim().is_empty() {
        return Err(TtsError::BlankEarcon);
    }
    Ok(normalize_earcon(earcon))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_bare_name() {
        assert_eq!(normalize_earcon("tick"), "[tick]");
    }

    #[test]
    fn bracketed_name_is_unchanged() {
        assert!(matches!(normalize_earcon("[tick]"), Cow::Borrowed("[tick]")));
    }

    #[test]
    fn normalization_is_idempotent() {
        for name in ["tick", "[tick", "tick]", "[tick]", "page turn"] {
            let once = normalize_earcon(name).into_owned();
            assert_eq!(normalize_earcon(&once), once);
        }
    }

    #[test]
    fn adds_only_the_missing_bracket() {
        assert_eq!(normalize_earcon("[tick"), "[tick]");
        assert_eq!(normalize_earcon("tick]"), "[tick]");
    }

    #[test]
    fn blank_names_are_rejected() {
        for name in ["", " ", "\t\n"] {
            assert!(matches!(checked_earcon(name), Err(TtsError::BlankEarcon)));
        }
        assert_eq!(checked_earcon("tick").unwrap(), "[tick]");
    }
}
