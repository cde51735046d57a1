//! Whole report runs: dump, thumbnails, injection and diagrams.

use std::path::Path;
use std::sync::atomic::Ordering;

use serde_json::Value as JsonValue;

use tiff_uml::error::ReportError;
use tiff_uml::format::tiff::TiffFile;
use tiff_uml::io::MemoryReader;
use tiff_uml::report::{
    generate_report, render_diagram, NativeDumper, OverlaySelection, ReportAssembler, PLACEHOLDER,
};
use tiff_uml::thumbnail::{NoopOptimizer, ThumbnailFetcher};

use super::test_utils::*;

const MARKER_PREFIX: &str = "<img:data:image/png;base64,";

fn all_images() -> OverlaySelection {
    OverlaySelection {
        thumb: true,
        structure: true,
        order: true,
    }
}

/// A strip image with two reduced SubIFDs and a second top-level image.
fn pyramid() -> Vec<u8> {
    let mut main = IfdBuilder::rgb_strips(128, 96, 32, [200, 40, 40]);
    main.with_write_order(vec![2, 0, 1]);
    main.add_sub_ifd(IfdBuilder::rgb_strips(64, 48, 16, [40, 200, 40]))
        .add_sub_ifd(IfdBuilder::rgb_strips(32, 24, 8, [40, 40, 200]));

    TiffBuilder::new()
        .add_ifd(main)
        .add_ifd(IfdBuilder::rgb_strips(16, 12, 4, [90, 90, 90]))
        .build()
}

async fn report(data: Vec<u8>, assembler: &ReportAssembler) -> Result<String, ReportError> {
    let reader = MemoryReader::new(data, "pyramid.tif");
    generate_report(
        Path::new("pyramid.tif"),
        &reader,
        &NativeDumper::default(),
        assembler,
    )
    .await
}

/// `(ImageLength indent, thumbnail key line, value line)` for each entry.
fn entries(text: &str) -> Vec<(usize, String, String)> {
    let lines: Vec<&str> = text.lines().collect();
    let mut found = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        if line.trim_start().starts_with("ImageLength:") && i + 2 < lines.len() {
            let indent = line.len() - line.trim_start().len();
            found.push((indent, lines[i + 1].to_string(), lines[i + 2].to_string()));
        }
    }
    found
}

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

// =============================================================================
// Reports
// =============================================================================

#[tokio::test]
async fn test_no_selection_returns_plain_dump() {
    let data = pyramid();
    let assembler = ReportAssembler::with_selection(OverlaySelection::default());
    let text = report(data.clone(), &assembler).await.unwrap();

    let file = TiffFile::read(&MemoryReader::new(data, "pyramid.tif"))
        .await
        .unwrap();
    assert_eq!(text, NativeDumper::default().render("pyramid.tif", &file));
    assert!(!text.contains("Image Thumbnail"));
}

#[tokio::test]
async fn test_every_directory_gets_all_images() {
    let text = report(pyramid(), &ReportAssembler::with_selection(all_images()))
        .await
        .unwrap();

    let found = entries(&text);
    assert_eq!(found.len(), 4);
    for (indent, key, value) in &found {
        assert_eq!(indent_of(key), *indent);
        assert_eq!(key.trim(), "\"Image Thumbnail\":");
        assert_eq!(indent_of(value), indent + 2);
        assert!(value.trim_start().starts_with("\"Image | Structure | Order\": \""));
        assert_eq!(value.matches(MARKER_PREFIX).count(), 3);
    }
    assert_eq!(text.matches("\"Image Thumbnail\":").count(), 4);
}

#[tokio::test]
async fn test_report_stays_valid_yaml() {
    let text = report(pyramid(), &ReportAssembler::with_selection(all_images()))
        .await
        .unwrap();

    let yaml: serde_yaml::Value = serde_yaml::from_str(&text).unwrap();
    let ifds = &yaml["pyramid.tif"]["ifds"];
    let thumbnail = &ifds["Directory 1"]["Image Thumbnail"]["Image | Structure | Order"];
    assert!(thumbnail.as_str().unwrap().starts_with(MARKER_PREFIX));

    let sub = &ifds["Directory 0"]["SubIFD"]["SubIFD 1"]["Directory 0,1"];
    assert!(sub["Image Thumbnail"].is_mapping());
}

#[tokio::test]
async fn test_untiled_structure_is_plain_thumbnail() {
    let mut ifd = IfdBuilder::rgb_strips(40, 30, 30, [120, 60, 30]);
    ifd.remove_entry(278);
    let data = TiffBuilder::new().add_ifd(ifd).build();

    let assembler = ReportAssembler::with_selection(OverlaySelection {
        thumb: true,
        structure: true,
        order: false,
    });
    let text = report(data, &assembler).await.unwrap();

    let found = entries(&text);
    assert_eq!(found.len(), 1);
    let value = found[0].2.trim_start();
    assert!(value.starts_with("\"Image | Structure\": \""));

    let markers: Vec<&str> = value
        .split('"')
        .nth(3)
        .unwrap()
        .split(' ')
        .collect();
    assert_eq!(markers.len(), 2);
    assert_eq!(markers[0], markers[1]);
}

#[tokio::test]
async fn test_undecodable_directories_get_placeholder() {
    // Raw pixels labelled as JPEG
    let mut broken = IfdBuilder::rgb_strips(16, 16, 16, [1, 2, 3]);
    broken.add_entry(259, SHORT, vec![7]);
    let data = TiffBuilder::new()
        .add_ifd(IfdBuilder::rgb_strips(32, 32, 16, [50, 50, 50]))
        .add_ifd(broken)
        .add_ifd(IfdBuilder::new(64, 64))
        .build();

    let text = report(data, &ReportAssembler::with_selection(all_images()))
        .await
        .unwrap();
    let found = entries(&text);
    assert_eq!(found.len(), 3);
    assert!(found[0].2.contains(MARKER_PREFIX));
    for (_, _, value) in &found[1..] {
        assert_eq!(
            value.trim_start(),
            format!("\"Image\": \"{}\"", PLACEHOLDER)
        );
    }
}

#[tokio::test]
async fn test_directories_without_image_length_are_skipped() {
    let mut no_length = IfdBuilder::empty();
    no_length.add_entry(256, LONG, vec![10]);
    let data = TiffBuilder::new()
        .add_ifd(IfdBuilder::rgb_strips(16, 16, 8, [0, 0, 0]))
        .add_ifd(no_length)
        .build();

    let text = report(data, &ReportAssembler::with_selection(all_images()))
        .await
        .unwrap();
    assert_eq!(text.matches("\"Image Thumbnail\":").count(), 1);
}

#[tokio::test]
async fn test_failing_optimizer_keeps_images() {
    let optimizer = FailingOptimizer::default();
    let calls = optimizer.calls.clone();
    let assembler = ReportAssembler::new(
        ThumbnailFetcher::with_default_decoders(),
        Box::new(optimizer),
        OverlaySelection {
            thumb: true,
            structure: false,
            order: true,
        },
    );

    let text = report(pyramid(), &assembler).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 8);
    assert_eq!(text.matches(MARKER_PREFIX).count(), 8);
}

#[tokio::test]
async fn test_thumb_range_sizes_images() {
    let assembler = ReportAssembler::with_selection(OverlaySelection {
        thumb: true,
        ..Default::default()
    })
    .with_thumb_range(8, 64);
    let text = report(pyramid(), &assembler).await.unwrap();

    let yaml: serde_yaml::Value = serde_yaml::from_str(&text).unwrap();
    let marker = yaml["pyramid.tif"]["ifds"]["Directory 0"]["Image Thumbnail"]["Image"]
        .as_str()
        .unwrap();
    let encoded = marker
        .trim_start_matches(MARKER_PREFIX)
        .trim_end_matches('>');
    let png = base64_decode(encoded);
    assert_eq!(decode_png(&png).dimensions(), (64, 48));
}

/// The first thumbnail in `text`, decoded.
fn first_thumbnail(text: &str) -> image::RgbImage {
    let start = text.find(MARKER_PREFIX).unwrap() + MARKER_PREFIX.len();
    let end = start + text[start..].find('>').unwrap();
    decode_png(&base64_decode(&text[start..end]))
}

fn near(pixel: [u8; 3], color: [u8; 3]) -> bool {
    pixel.iter().zip(color).all(|(&p, c)| p.abs_diff(c) < 24)
}

#[tokio::test]
async fn test_directories_over_chunk_limit_are_sampled() {
    let thumb_only = OverlaySelection {
        thumb: true,
        ..Default::default()
    };
    let color = [200, 40, 40];

    // 64 strips and 64 JPEG tiles against a limit of 8 chunks
    let strips = TiffBuilder::new()
        .add_ifd(IfdBuilder::rgb_strips(64, 64, 1, color))
        .build();
    let tiles = TiffBuilder::new()
        .add_ifd(IfdBuilder::tiled_jpeg(64, 64, 8, 8, &[color; 64]))
        .build();

    for data in [strips, tiles] {
        let assembler = ReportAssembler::new(
            ThumbnailFetcher::with_chunk_limit(8),
            Box::new(NoopOptimizer),
            thumb_only,
        );
        let text = report(data, &assembler).await.unwrap();
        assert!(!text.contains(PLACEHOLDER));
        assert_eq!(text.matches(MARKER_PREFIX).count(), 1);

        let thumbnail = first_thumbnail(&text);
        for (x, y) in [(0, 0), (thumbnail.width() / 2, thumbnail.height() / 2)] {
            let pixel = thumbnail.get_pixel(x, y).0;
            assert!(near(pixel, color), "got {:?} at ({}, {})", pixel, x, y);
        }
        let corner = thumbnail.get_pixel(thumbnail.width() - 1, thumbnail.height() - 1).0;
        assert!(near(corner, color), "got {:?}", corner);
    }
}

#[tokio::test]
async fn test_not_a_tiff() {
    let err = report(b"GIF89a not a tiff".to_vec(), &ReportAssembler::with_selection(all_images()))
        .await
        .unwrap_err();
    assert!(matches!(err, ReportError::Tiff(_)));
}

fn base64_decode(text: &str) -> Vec<u8> {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD
        .decode(text)
        .unwrap()
}

// =============================================================================
// Diagrams
// =============================================================================

#[tokio::test]
async fn test_diagram_from_report() {
    let text = report(pyramid(), &ReportAssembler::with_selection(all_images()))
        .await
        .unwrap();
    let renderer = RecordingRenderer::default();

    let diagram = render_diagram(&text, &renderer, false).await.unwrap();
    assert_eq!(diagram.rendered, b"<svg/>");
    assert_eq!(renderer.documents.lock().unwrap().as_slice(), [diagram.document.clone()]);

    let body = diagram
        .document
        .strip_prefix("@startjson\n")
        .and_then(|d| d.strip_suffix("\n@endjson\n"))
        .unwrap();
    assert!(!body.contains('\n'));

    let json: JsonValue = serde_json::from_str(body).unwrap();
    let keys: Vec<&String> = json.as_object().unwrap().keys().collect();
    assert_eq!(keys, ["header", "size", "ifds"]);
    assert!(json["ifds"]["Directory 1"]["Image Thumbnail"].is_object());
}

#[tokio::test]
async fn test_pretty_diagram_document() {
    let text = report(pyramid(), &ReportAssembler::with_selection(OverlaySelection::default()))
        .await
        .unwrap();
    let diagram = render_diagram(&text, &RecordingRenderer::default(), true)
        .await
        .unwrap();
    assert!(diagram.document.starts_with("@startjson\n{\n \"header\": "));
}

#[tokio::test]
async fn test_missing_renderer() {
    let err = render_diagram("a: 1\n", &MissingRenderer, false)
        .await
        .unwrap_err();
    assert!(matches!(err, ReportError::External(_)));
}
