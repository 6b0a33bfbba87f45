//! Episode metadata and title slugs
//!
//! Field limits live in the validator, not here: the type accepts what
//! the form holds so the UI can validate on every keystroke.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Maximum length of a derived slug, in characters
pub const MAX_SLUG_CHARS: usize = 40;

/// Fallback slug for a title with no usable characters
const FALLBACK_SLUG: &str = "episodio";

/// Metadata for one sermon episode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SermonMetadata {
    pub title: String,
    pub speaker: String,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl SermonMetadata {
    /// Filesystem-safe slug of the episode title
    pub fn slug(&self) -> String {
        slug(&self.title)
    }
}

/// Derive a filesystem-safe slug from a human-readable title
///
/// Lowercased, Spanish accents stripped, every non-alphanumeric run
/// collapsed to a single underscore, bounded to [`MAX_SLUG_CHARS`].
pub fn slug(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    let mut pending_separator = false;

    for ch in title.chars() {
        for lowered in ch.to_lowercase() {
            let mapped = strip_accent(lowered);
            if mapped.is_ascii_alphanumeric() {
                if pending_separator && !out.is_empty() {
                    out.push('_');
                }
                pending_separator = false;
                out.push(mapped);
            } else {
                pending_separator = true;
            }
        }
    }

    // Slugs are pure ASCII at this point, so byte truncation is safe.
    if out.len() > MAX_SLUG_CHARS {
        out.truncate(MAX_SLUG_CHARS);
    }
    while out.ends_with('_') {
        out.pop();
    }

    if out.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        out
    }
}

/// Map accented characters common in Spanish titles to their base letter
fn strip_accent(c: char) -> char {
    match c {
        'á' | 'à' | 'ä' | 'â' => 'a',
        'é' | 'è' | 'ë' | 'ê' => 'e',
        'í' | 'ì' | 'ï' | 'î' => 'i',
        'ó' | 'ò' | 'ö' | 'ô' => 'o',
        'ú' | 'ù' | 'ü' | 'û' => 'u',
        'ñ' => 'n',
        'ç' => 'c',
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_slug_strips_punctuation_and_lowercases() {
        assert_eq!(slug("¡Hola, Mundo!"), "hola_mundo");
    }

    #[test]
    fn test_slug_strips_spanish_accents() {
        assert_eq!(slug("Sermón de Ángel"), "sermon_de_angel");
        assert_eq!(slug("El Niño y la Fe"), "el_nino_y_la_fe");
    }

    #[test]
    fn test_slug_collapses_separator_runs() {
        assert_eq!(slug("Fe -- y \t esperanza"), "fe_y_esperanza");
    }

    #[test]
    fn test_slug_empty_title_falls_back() {
        assert_eq!(slug(""), "episodio");
        assert_eq!(slug("¿¡!?"), "episodio");
    }

    #[test]
    fn test_slug_is_length_bounded() {
        let long = "palabra ".repeat(20);
        let s = slug(&long);
        assert!(s.len() <= MAX_SLUG_CHARS);
        assert!(!s.ends_with('_'));
    }

    #[test]
    fn test_metadata_round_trips_through_json() {
        let metadata = SermonMetadata {
            title: "La Roca".to_string(),
            speaker: "Pastor Gómez".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            series: Some("Fundamentos".to_string()),
            description: None,
        };

        let json = serde_json::to_string(&metadata).unwrap();
        let restored: SermonMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, metadata);
        // Absent options are omitted entirely
        assert!(!json.contains("description"));
    }
}
