//! Language identification at the request boundary

use crate::types::Lang;

pub trait LanguageDetector: Send + Sync {
    /// Detected language, or None when the text gives no signal
    fn detect(&self, text: &str) -> Option<Lang>;
}

/// Majority vote between Arabic-script and Latin letters
#[derive(Debug, Default, Clone, Copy)]
pub struct ScriptLanguageDetector;

fn is_arabic(c: char) -> bool {
    matches!(c, '\u{0600}'..='\u{06FF}' | '\u{0750}'..='\u{077F}' | '\u{FB50}'..='\u{FDFF}' | '\u{FE70}'..='\u{FEFF}')
}

impl LanguageDetector for ScriptLanguageDetector {
    fn detect(&self, text: &str) -> Option<Lang> {
        let (arabic, latin) = text.chars().fold((0usize, 0usize), |(ar, en), c| {
            if is_arabic(c) && c.is_alphabetic() {
                (ar + 1, en)
            } else if c.is_ascii_alphabetic() {
                (ar, en + 1)
            } else {
                (ar, en)
            }
        });

        match (arabic, latin) {
            (0, 0) => None,
            (ar, en) if ar >= en => Some(Lang::Ar),
            _ => Some(Lang::En),
        }
    }
}
