//! Chunk layouts, thumbnail sizing and overlays on built files.

use tiff_uml::annotate::{render_overlay, ChunkKind, ChunkLayout, OverlayMode, ScalePlan};
use tiff_uml::format::tiff::TiffFile;
use tiff_uml::io::MemoryReader;

use super::test_utils::*;

async fn read(data: Vec<u8>) -> TiffFile {
    TiffFile::read(&MemoryReader::new(data, "test.tif"))
        .await
        .unwrap()
}

fn luma(pixel: [u8; 3]) -> u32 {
    pixel.iter().map(|&c| c as u32).sum::<u32>() / 3
}

// =============================================================================
// Layouts
// =============================================================================

#[tokio::test]
async fn test_tiled_layout_has_one_entry_per_tile() {
    let colors = vec![[128, 128, 128]; 6];
    let file = read(
        TiffBuilder::new()
            .add_ifd(IfdBuilder::tiled_jpeg(48, 32, 16, 16, &colors))
            .build(),
    )
    .await;

    let layout = ChunkLayout::resolve(&file.directories[0]);
    assert_eq!(layout.kind, ChunkKind::Tiled);
    assert_eq!(layout.chunk_order.len(), 6);
    assert_eq!(layout.expected_chunk_count(48, 32), Some(6));
}

#[tokio::test]
async fn test_strip_layout_follows_write_order() {
    let mut ifd = IfdBuilder::rgb_strips(10, 40, 10, [9, 9, 9]);
    ifd.with_write_order(vec![2, 0, 3, 1]);
    let file = read(TiffBuilder::new().add_ifd(ifd).build()).await;

    let layout = ChunkLayout::resolve(&file.directories[0]);
    assert_eq!(layout.kind, ChunkKind::Strip);
    assert_eq!((layout.chunk_width, layout.chunk_height), (Some(10), Some(10)));
    let order = &layout.chunk_order;
    assert!(order[2] < order[0] && order[0] < order[3] && order[3] < order[1]);
}

#[tokio::test]
async fn test_macroblock_layout() {
    let mut ifd = IfdBuilder::new(64, 32);
    ifd.add_entry(530, SHORT, vec![2, 2])
        .add_entry(65426, LONG, vec![100, 200, 300, 400]);
    let file = read(TiffBuilder::new().add_ifd(ifd).build()).await;

    let layout = ChunkLayout::resolve(&file.directories[0]);
    assert_eq!(layout.kind, ChunkKind::Macroblock);
    assert_eq!((layout.chunk_width, layout.chunk_height), (Some(16), Some(32)));
    assert_eq!(layout.chunk_order, vec![100, 200, 300, 400]);
}

#[tokio::test]
async fn test_untiled_without_rows_per_strip_has_no_layout() {
    let mut ifd = IfdBuilder::rgb_strips(16, 16, 16, [0, 0, 0]);
    ifd.remove_entry(278);
    let file = read(TiffBuilder::new().add_ifd(ifd).build()).await;
    assert!(ChunkLayout::resolve(&file.directories[0]).is_none());
}

// =============================================================================
// Thumbnail Sizes
// =============================================================================

#[tokio::test]
async fn test_plan_spans_thumb_range() {
    let file = read(
        TiffBuilder::new()
            .add_ifd(IfdBuilder::new(4096, 2048))
            .add_ifd(IfdBuilder::new(256, 128))
            .build(),
    )
    .await;

    let plan = ScalePlan::for_file(&file, 64, 512).unwrap();
    assert_eq!(plan.target_edge(4096), 512);
    assert_eq!(plan.target_edge(256), 64);

    let middle = plan.target_edge(1024);
    assert!(middle > 64 && middle < 512);
}

#[tokio::test]
async fn test_plan_counts_subifds() {
    let mut main = IfdBuilder::new(2048, 2048);
    main.add_sub_ifd(IfdBuilder::new(128, 128));
    let file = read(TiffBuilder::new().add_ifd(main).build()).await;

    let plan = ScalePlan::for_file(&file, 64, 512).unwrap();
    assert_eq!(plan.target_edge(2048), 512);
    assert_eq!(plan.target_edge(128), 64);
}

#[tokio::test]
async fn test_plan_ignores_dimensionless_directories() {
    let file = read(
        TiffBuilder::new()
            .add_ifd(IfdBuilder::new(1000, 1000))
            .add_ifd(IfdBuilder::empty().add_entry(254, LONG, vec![1]).build_ifd())
            .build(),
    )
    .await;

    let plan = ScalePlan::for_file(&file, 64, 512).unwrap();
    assert_eq!(plan.max_dim, 1000.0);
    assert_eq!(plan.min_max_dim, 500.0);
}

// =============================================================================
// Overlays
// =============================================================================

#[test]
fn test_no_layout_leaves_thumbnail_alone() {
    let thumb = solid_png(40, 30, [90, 120, 150]);
    for mode in [OverlayMode::Grid, OverlayMode::Order] {
        let out = render_overlay(&thumb, 400, 300, &ChunkLayout::none(), 0.1, mode).unwrap();
        assert_eq!(out, thumb);
    }
}

#[tokio::test]
async fn test_grid_on_quarter_scale_tiles() {
    let colors = vec![[255, 255, 255]; 16];
    let file = read(
        TiffBuilder::new()
            .add_ifd(IfdBuilder::tiled_jpeg(512, 512, 128, 128, &colors))
            .build(),
    )
    .await;
    let layout = ChunkLayout::resolve(&file.directories[0]);
    assert_eq!(layout.chunk_order.len(), 16);

    let thumb = solid_png(128, 128, [255, 255, 255]);
    let out = render_overlay(&thumb, 512, 512, &layout, 0.25, OverlayMode::Grid).unwrap();
    let pixels = decode_png(&out);
    assert_eq!(pixels.dimensions(), (128, 128));

    // Tile boundaries sit on thumbnail rows and columns 31/32, 63/64, 95/96
    let column = |x: u32| (0..128).map(|y| luma(pixels.get_pixel(x, y).0)).min().unwrap();
    let row = |y: u32| (0..128).map(|x| luma(pixels.get_pixel(x, y).0)).min().unwrap();
    for boundary in [32, 64, 96] {
        let darkest_row = (boundary - 1..=boundary).map(row).min().unwrap();
        let darkest_column = (boundary - 1..=boundary).map(column).min().unwrap();
        assert!(darkest_row < 220, "row {} not drawn", boundary);
        assert!(darkest_column < 220, "column {} not drawn", boundary);
    }

    // Interiors and the image edges stay white
    let interior = pixels.get_pixel(16, 16).0;
    assert!(luma(interior) > 240, "got {:?}", interior);
    assert!(luma(pixels.get_pixel(16, 127).0) > 240);
    assert!(luma(pixels.get_pixel(127, 16).0) > 240);
}

#[tokio::test]
async fn test_order_shades_follow_disk_position() {
    // Strips written bottom to top
    let mut ifd = IfdBuilder::rgb_strips(64, 64, 16, [0, 0, 0]);
    ifd.with_write_order(vec![3, 2, 1, 0]);
    let file = read(TiffBuilder::new().add_ifd(ifd).build()).await;
    let layout = ChunkLayout::resolve(&file.directories[0]);

    let thumb = solid_png(64, 64, [0, 0, 0]);
    let out = render_overlay(&thumb, 64, 64, &layout, 1.0, OverlayMode::Order).unwrap();
    let pixels = decode_png(&out);

    let top = luma(pixels.get_pixel(32, 8).0);
    let bottom = luma(pixels.get_pixel(32, 56).0);
    assert!(top > 240, "top strip was written last, got {}", top);
    assert!(bottom < 15, "bottom strip was written first, got {}", bottom);
}

#[tokio::test]
async fn test_order_marks_missing_chunks() {
    let mut ifd = IfdBuilder::rgb_strips(64, 64, 32, [0, 0, 0]);
    ifd.with_missing_chunk(0);
    let file = read(TiffBuilder::new().add_ifd(ifd).build()).await;
    let layout = ChunkLayout::resolve(&file.directories[0]);

    let thumb = solid_png(64, 64, [0, 0, 0]);
    let out = render_overlay(&thumb, 64, 64, &layout, 1.0, OverlayMode::Order).unwrap();
    let top = decode_png(&out).get_pixel(32, 8).0;
    assert!(top[0] > 240 && top[1] > 240 && top[2] < 15, "got {:?}", top);
}
