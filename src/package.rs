//! Package Assembler
//!
//! Bundles the tagged audio, the cover, and a human-readable
//! METADATOS.txt into one zip archive ready for manual upload. Assembly
//! refuses to run while the validation report holds a blocking error;
//! warnings pass through.

use std::io::{Cursor, Write};

use chrono::Local;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::artwork::CoverArt;
use crate::error::{ExportError, Result};
use crate::metadata::SermonMetadata;
use crate::validation::ValidationReport;

/// Fixed name of the instructions document inside the archive
pub const INSTRUCTIONS_FILE_NAME: &str = "METADATOS.txt";

/// Everything needed to build the distributable archive
///
/// Transient value: produced after a successful encode, consumed here,
/// never persisted.
#[derive(Debug, Clone)]
pub struct DistributionPackage {
    pub audio: Vec<u8>,
    pub cover: CoverArt,
    pub metadata: SermonMetadata,
    pub validation: ValidationReport,
}

/// Archive entry name for the episode audio: `<slug>_<YYYY-MM-DD>.mp3`
pub fn audio_file_name(metadata: &SermonMetadata) -> String {
    format!(
        "{}_{}.mp3",
        metadata.slug(),
        metadata.date.format("%Y-%m-%d")
    )
}

/// Archive entry name for the cover image: `portada_<slug>.jpg`
pub fn cover_file_name(metadata: &SermonMetadata) -> String {
    format!("portada_{}.jpg", metadata.slug())
}

/// Assemble the distribution archive
///
/// Output is deterministic for identical inputs except for the
/// generation timestamp line inside METADATOS.txt.
pub fn assemble(package: &DistributionPackage) -> Result<Vec<u8>> {
    if !package.validation.is_valid() {
        return Err(ExportError::ValidationBlocked {
            errors: package.validation.errors.clone(),
        });
    }

    let generated_at = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    let document = instructions_document(&package.metadata, &generated_at);

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

    // MP3 and JPEG are already compressed; deflating them again buys
    // nothing and slows the export down.
    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    writer
        .start_file(audio_file_name(&package.metadata), stored)
        .map_err(archive_error)?;
    writer.write_all(&package.audio)?;

    writer
        .start_file(cover_file_name(&package.metadata), stored)
        .map_err(archive_error)?;
    writer.write_all(&package.cover.jpeg)?;

    writer
        .start_file(INSTRUCTIONS_FILE_NAME, deflated)
        .map_err(archive_error)?;
    writer.write_all(document.as_bytes())?;

    let cursor = writer.finish().map_err(archive_error)?;

    log::info!(
        "assembled archive: {} ({} bytes)",
        audio_file_name(&package.metadata),
        cursor.get_ref().len()
    );

    Ok(cursor.into_inner())
}

fn archive_error(e: zip::result::ZipError) -> ExportError {
    ExportError::Io(std::io::Error::new(
        std::io::ErrorKind::Other,
        e.to_string(),
    ))
}

/// Render METADATOS.txt
///
/// Field order and labels are fixed; podcast admins copy them into the
/// upload form in this order.
fn instructions_document(metadata: &SermonMetadata, generated_at: &str) -> String {
    let mut doc = String::new();

    doc.push_str("METADATOS DEL EPISODIO\n");
    doc.push_str("======================\n\n");
    doc.push_str(&format!("Título: {}\n", metadata.title));
    doc.push_str(&format!("Predicador: {}\n", metadata.speaker));
    doc.push_str(&format!("Fecha: {}\n", metadata.date.format("%Y-%m-%d")));
    if let Some(series) = &metadata.series {
        doc.push_str(&format!("Serie: {}\n", series));
    }
    doc.push_str(&format!(
        "Descripción: {}\n",
        metadata.description.as_deref().unwrap_or("(sin descripción)")
    ));

    doc.push_str("\nPASOS PARA SUBIR EL EPISODIO\n");
    doc.push_str("----------------------------\n");
    doc.push_str(&format!(
        "1. Inicia sesión en el panel de podcasts de la plataforma.\n\
         2. Selecciona \"Nuevo episodio\" y sube el archivo {}.\n\
         3. Copia el título y la descripción de este documento en el formulario.\n\
         4. Sube la imagen {} como portada del episodio.\n\
         5. Verifica la fecha de publicación: {}.\n\
         6. Revisa la vista previa y confirma que el audio se reproduce.\n\
         7. Publica el episodio y comprueba que aparece en el canal.\n",
        audio_file_name(metadata),
        cover_file_name(metadata),
        metadata.date.format("%Y-%m-%d")
    ));

    doc.push_str(&format!("\nGenerado: {}\n", generated_at));

    doc
}
