//! Platform Validator
//!
//! Checks the finished episode against the podcast platform's hard
//! limits. The rules are one data table so changing a limit or adding a
//! platform is a data change, not new control flow. Messages are the
//! Spanish strings shown directly in the app.
//!
//! The validator is pure and cheap: the UI calls it on every metadata
//! keystroke for inline feedback, and the orchestrator calls it once
//! more as the gate before assembly.

use serde::Serialize;

use crate::artwork::MAX_COVER_BYTES;
use crate::metadata::SermonMetadata;

/// Maximum encoded audio size accepted by the platform
pub const MAX_AUDIO_BYTES: u64 = 200 * 1024 * 1024;

/// Minimum episode duration in seconds
pub const MIN_DURATION_SECS: f64 = 10.0;

/// Maximum episode duration in seconds (12 hours)
pub const MAX_DURATION_SECS: f64 = 12.0 * 3600.0;

/// Maximum title length in characters
pub const MAX_TITLE_CHARS: usize = 200;

/// Maximum description length in characters
pub const MAX_DESCRIPTION_CHARS: usize = 4000;

/// Descriptions shorter than this draw an advisory warning
pub const SHORT_DESCRIPTION_CHARS: usize = 50;

/// Severity of a rule: errors block assembly, warnings are advisory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// Everything the rule table looks at
#[derive(Debug, Clone, Copy)]
pub struct ValidationInput<'a> {
    /// Final encoded audio size, tag block included
    pub audio_bytes: u64,
    /// Episode duration in seconds
    pub duration_secs: f64,
    /// Encoded cover art size
    pub cover_bytes: u64,
    pub metadata: &'a SermonMetadata,
}

/// Outcome of a validation pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    /// True when no blocking error was found; warnings do not block
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

struct Rule {
    severity: Severity,
    check: fn(&ValidationInput) -> Option<String>,
}

/// The platform's rule table
const RULES: &[Rule] = &[
    Rule {
        severity: Severity::Error,
        check: check_audio_size,
    },
    Rule {
        severity: Severity::Error,
        check: check_duration_floor,
    },
    Rule {
        severity: Severity::Error,
        check: check_duration_ceiling,
    },
    Rule {
        severity: Severity::Error,
        check: check_cover_size,
    },
    Rule {
        severity: Severity::Error,
        check: check_title,
    },
    Rule {
        severity: Severity::Error,
        check: check_speaker,
    },
    Rule {
        severity: Severity::Error,
        check: check_description_length,
    },
    Rule {
        severity: Severity::Warning,
        check: check_description_brevity,
    },
];

/// Run the rule table over an episode
pub fn validate(input: &ValidationInput) -> ValidationReport {
    let mut report = ValidationReport::default();

    for rule in RULES {
        if let Some(message) = (rule.check)(input) {
            match rule.severity {
                Severity::Error => report.errors.push(message),
                Severity::Warning => report.warnings.push(message),
            }
        }
    }

    report
}

fn check_audio_size(input: &ValidationInput) -> Option<String> {
    (input.audio_bytes > MAX_AUDIO_BYTES).then(|| {
        format!(
            "El audio pesa {:.1} MB y supera el límite de 200 MB",
            input.audio_bytes as f64 / (1024.0 * 1024.0)
        )
    })
}

fn check_duration_floor(input: &ValidationInput) -> Option<String> {
    (input.duration_secs < MIN_DURATION_SECS).then(|| {
        format!(
            "El audio es muy corto: {:.0} s (mínimo {:.0} s)",
            input.duration_secs, MIN_DURATION_SECS
        )
    })
}

fn check_duration_ceiling(input: &ValidationInput) -> Option<String> {
    (input.duration_secs > MAX_DURATION_SECS).then(|| {
        format!(
            "El audio es muy largo: {:.1} h (máximo 12 h)",
            input.duration_secs / 3600.0
        )
    })
}

fn check_cover_size(input: &ValidationInput) -> Option<String> {
    (input.cover_bytes > MAX_COVER_BYTES as u64).then(|| {
        format!(
            "La portada pesa {:.0} KB y supera el límite de 2 MB",
            input.cover_bytes as f64 / 1024.0
        )
    })
}

fn check_title(input: &ValidationInput) -> Option<String> {
    let title = input.metadata.title.trim();
    if title.is_empty() {
        return Some("El título no puede estar vacío".to_string());
    }
    let chars = title.chars().count();
    (chars > MAX_TITLE_CHARS).then(|| {
        format!(
            "El título tiene {} caracteres (máximo {})",
            chars, MAX_TITLE_CHARS
        )
    })
}

fn check_speaker(input: &ValidationInput) -> Option<String> {
    input
        .metadata
        .speaker
        .trim()
        .is_empty()
        .then(|| "El predicador no puede estar vacío".to_string())
}

fn check_description_length(input: &ValidationInput) -> Option<String> {
    let chars = description_chars(input.metadata);
    (chars > MAX_DESCRIPTION_CHARS).then(|| {
        format!(
            "La descripción tiene {} caracteres (máximo {})",
            chars, MAX_DESCRIPTION_CHARS
        )
    })
}

fn check_description_brevity(input: &ValidationInput) -> Option<String> {
    let chars = description_chars(input.metadata);
    (chars < SHORT_DESCRIPTION_CHARS).then(|| {
        format!(
            "La descripción es breve ({} caracteres); se recomiendan al menos {}",
            chars, SHORT_DESCRIPTION_CHARS
        )
    })
}

fn description_chars(metadata: &SermonMetadata) -> usize {
    metadata
        .description
        .as_deref()
        .map(|d| d.chars().count())
        .unwrap_or(0)
}
