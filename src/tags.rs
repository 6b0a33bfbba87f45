//! Metadata Embedder
//!
//! Prepends an ID3v2.4 tag block to the encoded MP3 stream so podcast
//! players can show the episode fields and cover. The audio payload
//! bytes are appended untouched after the tag.
//!
//! Frame mapping: title -> TIT2, speaker -> TPE1 (artist), date -> TDRC,
//! series -> TIT1 (content group), description -> COMM, cover -> APIC.

use id3::frame::{Comment, Picture, PictureType};
use id3::{Frame, Tag, TagLike, Timestamp, Version};

use crate::artwork::{CoverArt, MAX_COVER_BYTES};
use crate::error::{ExportError, Result};
use crate::metadata::SermonMetadata;

/// Embed episode metadata and cover art into an encoded MP3 stream
///
/// Returns a new byte stream: tag block first, then the unmodified audio
/// payload. Fails with `MetadataError` if the cover exceeds the
/// embeddable ceiling.
pub fn embed_tags(audio: &[u8], metadata: &SermonMetadata, cover: &CoverArt) -> Result<Vec<u8>> {
    if cover.jpeg.len() > MAX_COVER_BYTES {
        return Err(ExportError::Metadata {
            reason: format!(
                "cover art is {} bytes, embeddable limit is {}",
                cover.jpeg.len(),
                MAX_COVER_BYTES
            ),
        });
    }

    let mut tag = Tag::new();
    tag.set_title(metadata.title.clone());
    tag.set_artist(metadata.speaker.clone());
    tag.set_date_recorded(Timestamp {
        year: chrono::Datelike::year(&metadata.date),
        month: Some(chrono::Datelike::month(&metadata.date) as u8),
        day: Some(chrono::Datelike::day(&metadata.date) as u8),
        hour: None,
        minute: None,
        second: None,
    });

    if let Some(series) = &metadata.series {
        tag.add_frame(Frame::text("TIT1", series.clone()));
    }

    if let Some(description) = &metadata.description {
        tag.add_frame(Comment {
            lang: "spa".to_string(),
            description: String::new(),
            text: description.clone(),
        });
    }

    tag.add_frame(Picture {
        mime_type: "image/jpeg".to_string(),
        picture_type: PictureType::CoverFront,
        description: "portada".to_string(),
        data: cover.jpeg.clone(),
    });

    let mut output = Vec::with_capacity(audio.len() + cover.jpeg.len() + 1024);
    tag.write_to(&mut output, Version::Id3v24)
        .map_err(|e| ExportError::Metadata {
            reason: format!("failed to write tag block: {}", e),
        })?;
    output.extend_from_slice(audio);

    Ok(output)
}
