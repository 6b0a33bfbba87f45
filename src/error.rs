//! Error handling for the export pipeline
//!
//! One taxonomy for every stage: each variant maps to a short
//! user-facing message, and blocking validation errors carry the
//! individual messages so the UI can list them one by one.

use thiserror::Error;

/// Result type alias for export operations
pub type Result<T> = std::result::Result<T, ExportError>;

/// Main error type for the export pipeline
#[derive(Error, Debug)]
pub enum ExportError {
    // Stage errors
    #[error("Invalid trim range: {reason}")]
    TrimRange { reason: String },

    #[error("MP3 encoding failed: {reason}")]
    Encode { reason: String },

    #[error("Cover art cannot meet the platform size limit: {reason}")]
    Artwork { reason: String },

    #[error("Metadata embedding failed: {reason}")]
    Metadata { reason: String },

    #[error("Validation reported blocking errors: {}", errors.join("; "))]
    ValidationBlocked { errors: Vec<String> },

    // Job lifecycle
    #[error("An export is already in progress")]
    Busy,

    #[error("Export cancelled")]
    Cancelled,

    #[error("Export pipeline failure: {reason}")]
    Internal { reason: String },

    // Input decoding (CLI front-end)
    #[error("Invalid audio file: {reason}")]
    InvalidAudio { reason: String },

    #[error("Unsupported audio format: {format}")]
    UnsupportedFormat { format: String },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ExportError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            ExportError::TrimRange { .. } => "TRIM_RANGE",
            ExportError::Encode { .. } => "ENCODE",
            ExportError::Artwork { .. } => "ARTWORK",
            ExportError::Metadata { .. } => "METADATA",
            ExportError::ValidationBlocked { .. } => "VALIDATION_BLOCKED",
            ExportError::Busy => "BUSY",
            ExportError::Cancelled => "CANCELLED",
            ExportError::Internal { .. } => "INTERNAL",
            ExportError::InvalidAudio { .. } => "INVALID_AUDIO",
            ExportError::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            ExportError::Io(_) => "IO_ERROR",
            ExportError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Cancellation is a normal terminal outcome, not a failure
    pub fn is_cancellation(&self) -> bool {
        matches!(self, ExportError::Cancelled)
    }

    /// Get a short Spanish message for display in the congregation app
    pub fn user_message(&self) -> String {
        match self {
            ExportError::TrimRange { .. } => "El rango de recorte no es válido.".to_string(),
            ExportError::Encode { .. } => "No se pudo codificar el audio.".to_string(),
            ExportError::Artwork { .. } => {
                "La portada no cumple los requisitos de la plataforma.".to_string()
            }
            ExportError::Metadata { .. } => {
                "No se pudieron incrustar los metadatos en el audio.".to_string()
            }
            ExportError::ValidationBlocked { errors } => {
                format!(
                    "Corrige los errores antes de exportar:\n- {}",
                    errors.join("\n- ")
                )
            }
            ExportError::Busy => "Ya hay una exportación en curso.".to_string(),
            ExportError::Cancelled => "Exportación cancelada.".to_string(),
            ExportError::InvalidAudio { .. } => "El archivo de audio no es válido.".to_string(),
            ExportError::UnsupportedFormat { .. } => {
                "El formato de audio no es compatible.".to_string()
            }
            _ => "La exportación falló por un error interno.".to_string(),
        }
    }
}
