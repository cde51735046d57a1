//! Directory tree reading and isolation on built files.

use tiff_uml::format::tiff::{isolate_directory, ByteOrder, TagValue, TiffFile, TiffTag};
use tiff_uml::io::MemoryReader;
use tiff_uml::thumbnail::ThumbnailFetcher;

use super::test_utils::*;

async fn read(data: Vec<u8>) -> (MemoryReader, TiffFile) {
    let reader = MemoryReader::new(data, "test.tif");
    let file = TiffFile::read(&reader).await.unwrap();
    (reader, file)
}

fn tree_with_subifds(order: ByteOrderType, bigtiff: bool) -> Vec<u8> {
    let mut main = IfdBuilder::rgb_strips(64, 48, 16, [200, 10, 10]);
    main.add_sub_ifd(IfdBuilder::rgb_strips(32, 24, 8, [10, 200, 10]))
        .add_sub_ifd(IfdBuilder::rgb_strips(16, 12, 12, [10, 10, 200]));

    TiffBuilder::new()
        .with_byte_order(order)
        .with_bigtiff(bigtiff)
        .add_ifd(main)
        .add_ifd(IfdBuilder::rgb_strips(8, 6, 6, [0, 0, 0]))
        .build()
}

#[tokio::test]
async fn test_preorder_labels_every_variant() {
    for order in [ByteOrderType::LittleEndian, ByteOrderType::BigEndian] {
        for bigtiff in [false, true] {
            let (_, file) = read(tree_with_subifds(order, bigtiff)).await;
            assert_eq!(file.header.is_bigtiff, bigtiff);

            let labels: Vec<_> = file.iter().map(|d| d.label()).collect();
            assert_eq!(
                labels,
                vec!["Directory 0", "Directory 0,0", "Directory 0,1", "Directory 1"],
                "order {:?}, bigtiff {}",
                order,
                bigtiff
            );
            assert_eq!(
                file.dimensions(),
                vec![(64, 48), (32, 24), (16, 12), (8, 6)]
            );
        }
    }
}

#[tokio::test]
async fn test_ascii_and_offsets_read_back() {
    let mut ifd = IfdBuilder::rgb_strips(16, 16, 4, [1, 2, 3]);
    ifd.add_ascii(270, "Aperio Image Library v12.0.5");
    ifd.with_write_order(vec![3, 1, 0, 2]);
    let data = TiffBuilder::new().add_ifd(ifd).build();
    let (_, file) = read(data).await;

    let dir = &file.directories[0];
    assert_eq!(
        dir.ascii(TiffTag::ImageDescription),
        Some("Aperio Image Library v12.0.5")
    );
    let offsets = dir.u64_values(TiffTag::StripOffsets).unwrap();
    assert_eq!(offsets.len(), 4);
    assert!(offsets[3] < offsets[1]);
    assert!(offsets[1] < offsets[0]);
    assert!(offsets[0] < offsets[2]);
}

#[tokio::test]
async fn test_isolation_keeps_variant() {
    let (reader, file) = read(tree_with_subifds(ByteOrderType::BigEndian, true)).await;
    let sub = file.iter().nth(1).unwrap();

    let isolated = isolate_directory(&reader, &file.header, sub).await.unwrap();
    assert!(isolated.header.is_bigtiff);
    assert_eq!(isolated.header.byte_order, ByteOrder::BigEndian);
    assert!(!isolated.directory.has_tag(TiffTag::SubIfds));

    let (_, standalone) = read(isolated.data.to_vec()).await;
    assert_eq!(standalone.directories.len(), 1);
    assert_eq!(standalone.dimensions(), vec![(32, 24)]);
}

#[tokio::test]
async fn test_isolation_drops_subifd_pointer_of_parent() {
    let (reader, file) = read(tree_with_subifds(ByteOrderType::LittleEndian, false)).await;
    let isolated = isolate_directory(&reader, &file.header, &file.directories[0])
        .await
        .unwrap();
    assert!(is_tiff_magic(&isolated.data));

    let (_, standalone) = read(isolated.data.to_vec()).await;
    assert_eq!(standalone.iter().count(), 1);
    assert!(standalone.directories[0].sub_directories.is_empty());
}

#[tokio::test]
async fn test_isolated_strips_decode() {
    let (reader, file) = read(tree_with_subifds(ByteOrderType::BigEndian, false)).await;
    let sub = file.iter().nth(2).unwrap();
    let isolated = isolate_directory(&reader, &file.header, sub).await.unwrap();

    let thumb = ThumbnailFetcher::with_default_decoders()
        .fetch(&isolated, 8)
        .unwrap();
    assert_eq!((thumb.width, thumb.height), (8, 6));

    let pixels = decode_png(&thumb.data);
    let center = pixels.get_pixel(4, 3).0;
    assert!(center[2] > 150 && center[0] < 60, "got {:?}", center);
}

#[tokio::test]
async fn test_isolated_jpeg_tiles_decode() {
    let colors = [[250, 0, 0], [0, 250, 0], [0, 0, 250], [250, 250, 250]];
    let data = TiffBuilder::new()
        .add_ifd(IfdBuilder::tiled_jpeg(32, 32, 16, 16, &colors))
        .build();
    let (reader, file) = read(data).await;
    let isolated = isolate_directory(&reader, &file.header, &file.directories[0])
        .await
        .unwrap();

    let thumb = ThumbnailFetcher::with_default_decoders()
        .fetch(&isolated, 32)
        .unwrap();
    let pixels = decode_png(&thumb.data);
    let top_left = pixels.get_pixel(4, 4).0;
    let bottom_right = pixels.get_pixel(28, 28).0;
    assert!(top_left[0] > 200 && top_left[1] < 60, "got {:?}", top_left);
    assert!(bottom_right.iter().all(|&c| c > 200), "got {:?}", bottom_right);
}

#[tokio::test]
async fn test_missing_chunk_reads_as_zero_offset() {
    let mut ifd = IfdBuilder::rgb_strips(8, 8, 2, [5, 5, 5]);
    ifd.with_missing_chunk(1);
    let (_, file) = read(TiffBuilder::new().add_ifd(ifd).build()).await;

    let counts = file.directories[0]
        .get(TiffTag::StripByteCounts)
        .map(|t| t.value.clone())
        .unwrap();
    assert_eq!(counts, TagValue::Unsigned(vec![48, 0, 48, 48]));
    assert_eq!(
        file.directories[0].u64_values(TiffTag::StripOffsets).unwrap()[1],
        0
    );
}
