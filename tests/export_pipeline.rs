//! Integration Tests
//!
//! End-to-end tests for the sermon export pipeline: a synthetic
//! recording goes in, a podcast-ready archive comes out.

use std::io::{Cursor, Read};

use chrono::NaiveDate;
use image::{DynamicImage, Rgb, RgbImage};

use casa_podcast::audio::buffer::{generate_test_tone, ChannelLayout};
use casa_podcast::audio::{EnhancementSettings, TrimRange};
use casa_podcast::export::{ExportOrchestrator, ExportRequest, ExportState};
use casa_podcast::metadata::SermonMetadata;
use casa_podcast::ExportError;

fn sample_metadata() -> SermonMetadata {
    SermonMetadata {
        title: "¡Hola, Mundo!".to_string(),
        speaker: "Pastor Gómez".to_string(),
        date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
        series: Some("Fundamentos".to_string()),
        description: Some(
            "Una reflexión extensa sobre la fe y la esperanza en tiempos difíciles.".to_string(),
        ),
    }
}

fn sample_request(duration_secs: f32) -> ExportRequest {
    let source = generate_test_tone(440.0, duration_secs, 22050, ChannelLayout::Mono);
    let end = source.duration_secs();
    ExportRequest {
        source,
        trim: TrimRange::new(0.0, end).unwrap(),
        enhancement: EnhancementSettings {
            gain_db: -3.0,
            normalize: true,
            fade_in_secs: 0.5,
            fade_out_secs: 0.5,
        },
        metadata: sample_metadata(),
        artwork: DynamicImage::ImageRgb8(RgbImage::from_pixel(640, 480, Rgb([120, 90, 40]))),
    }
}

#[test]
fn test_full_export_produces_named_archive_entries() {
    let orchestrator = ExportOrchestrator::new();
    let handle = orchestrator.start(sample_request(15.0)).unwrap();
    let bytes = handle.join().unwrap();

    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    assert_eq!(archive.len(), 3);

    let names: Vec<String> = (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect();
    assert_eq!(
        names,
        vec![
            "hola_mundo_2025-03-01.mp3",
            "portada_hola_mundo.jpg",
            "METADATOS.txt",
        ]
    );

    // The audio entry carries the tag block followed by MP3 data, and is
    // roughly the size a 15 s episode at 128 kbps should be.
    let mut audio = Vec::new();
    archive
        .by_name("hola_mundo_2025-03-01.mp3")
        .unwrap()
        .read_to_end(&mut audio)
        .unwrap();
    assert_eq!(&audio[..3], b"ID3");
    assert!(audio.len() > 100_000);
    assert!(audio.len() < 500_000);

    // The cover entry is a JPEG within the platform ceiling.
    let mut cover = Vec::new();
    archive
        .by_name("portada_hola_mundo.jpg")
        .unwrap()
        .read_to_end(&mut cover)
        .unwrap();
    assert_eq!(&cover[..2], [0xFF, 0xD8]);
    assert!(cover.len() <= 2 * 1024 * 1024);

    // The instructions document lists the fields in order.
    let mut document = String::new();
    archive
        .by_name("METADATOS.txt")
        .unwrap()
        .read_to_string(&mut document)
        .unwrap();
    assert!(document.contains("Título: ¡Hola, Mundo!"));
    assert!(document.contains("Predicador: Pastor Gómez"));
    assert!(document.contains("Fecha: 2025-03-01"));
    assert!(document.contains("Serie: Fundamentos"));
    assert!(document.contains("Generado:"));
}

#[test]
fn test_trim_is_honored_end_to_end() {
    let mut request = sample_request(30.0);
    request.trim = TrimRange::new(5.0, 17.0).unwrap(); // 12 s selection

    let orchestrator = ExportOrchestrator::new();
    let handle = orchestrator.start(request).unwrap();
    let bytes = handle.join().unwrap();

    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let audio_len = archive.by_index(0).unwrap().size();

    // 12 s at 128 kbps is ~192 KB of MP3 payload plus the tag block.
    let expected = 12.0 * 16_000.0;
    assert!((audio_len as f64) > expected * 0.7);
    assert!((audio_len as f64) < expected * 1.5);
}

#[test]
fn test_cancel_mid_encode_yields_no_archive() {
    let orchestrator = ExportOrchestrator::new();
    let handle = orchestrator.start(sample_request(120.0)).unwrap();

    // Wait for the fine-grained encoding phase, then pull the plug.
    for update in handle.progress().iter() {
        if update.state == ExportState::Encoding {
            handle.cancel();
            break;
        }
    }

    let outcome = handle.join();
    assert!(matches!(outcome, Err(ExportError::Cancelled)));
    assert_eq!(orchestrator.state(), ExportState::Cancelled);
}

#[test]
fn test_concurrent_export_is_rejected() {
    let orchestrator = ExportOrchestrator::new();
    let first = orchestrator.start(sample_request(60.0)).unwrap();

    match orchestrator.start(sample_request(15.0)) {
        Err(ExportError::Busy) => {}
        _ => panic!("expected BusyError for a concurrent start"),
    }

    first.cancel();
    let _ = first.join();
}

#[test]
fn test_blocking_validation_surfaces_each_error() {
    let mut request = sample_request(5.0); // under the 10 s floor
    request.metadata.title = String::new(); // and an empty title

    let orchestrator = ExportOrchestrator::new();
    let handle = orchestrator.start(request).unwrap();

    match handle.join() {
        Err(ExportError::ValidationBlocked { errors }) => {
            assert_eq!(errors.len(), 2);
            assert!(errors.iter().any(|e| e.contains("muy corto")));
            assert!(errors.iter().any(|e| e.contains("título")));
        }
        _ => panic!("expected ValidationBlocked"),
    }
    assert_eq!(orchestrator.state(), ExportState::Errored);
}
