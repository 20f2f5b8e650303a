// tests/roi_tests.rs

//! Region-of-interest machinery: tile index descent, tile-block payload
//! framing and windowed decoding.

use pgf_codec::{Coeff, Header, ImageMode, PgfError, PgfImage, Rect, PGF_ROI};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::io::Cursor;

fn encode_roi(
    planes: &[Vec<Coeff>],
    width: u32,
    height: u32,
    n_levels: u8,
    channels: u8,
) -> Cursor<Vec<u8>> {
    let mut pgf = PgfImage::new();
    let header = Header {
        width,
        height,
        n_levels,
        channels,
        mode: if channels == 3 {
            ImageMode::RgbColor
        } else {
            ImageMode::GrayScale
        },
        ..Header::default()
    };
    pgf.set_header(header, PGF_ROI, Vec::new()).unwrap();
    let refs: Vec<&[Coeff]> = planes.iter().map(|p| p.as_slice()).collect();
    pgf.import_channels(&refs, None).unwrap();
    let mut stream = Cursor::new(Vec::new());
    pgf.write(&mut stream, None).unwrap();
    stream.set_position(0);
    stream
}

#[test]
fn test_roi_flag_is_recorded() {
    let mut stream = encode_roi(&[vec![0; 64]], 8, 8, 1, 1);
    let mut pgf = PgfImage::new();
    pgf.open(&mut stream).unwrap();
    assert_ne!(pgf.version() & PGF_ROI, 0);
}

/// S5, index part: on a 16x16 image with three levels, the ROI
/// (4,4)-(12,12) covers the tile containing (4,4) through the tile
/// containing (12,12) plus one, at every level simultaneously.
#[test]
fn test_tile_indices_of_the_descent() {
    let mut stream = encode_roi(&[vec![96; 256]], 16, 16, 3, 1);
    let mut pgf = PgfImage::new();
    pgf.open(&mut stream).unwrap();
    pgf.read_roi(&mut stream, Rect::new(4, 4, 8, 8), 0, None)
        .unwrap();

    assert_eq!(
        pgf.tile_indices(0).unwrap(),
        Rect { left: 2, top: 2, right: 7, bottom: 7 }
    );
    assert_eq!(
        pgf.tile_indices(1).unwrap(),
        Rect { left: 1, top: 1, right: 4, bottom: 4 }
    );
    assert_eq!(
        pgf.tile_indices(2).unwrap(),
        Rect { left: 0, top: 0, right: 2, bottom: 2 }
    );
    assert_eq!(
        pgf.tile_indices(3).unwrap(),
        Rect { left: 0, top: 0, right: 1, bottom: 1 }
    );
}

/// S5, pixel part: decoding only the covered tiles reproduces the full
/// decode inside the ROI.
#[test]
fn test_roi_decode_matches_full_decode_inside_the_roi() {
    let value: Coeff = 96;
    let planes = vec![vec![value; 256]; 3];

    // full decode reference
    let mut stream = encode_roi(&planes, 16, 16, 3, 3);
    let mut full = PgfImage::new();
    full.open(&mut stream).unwrap();
    full.read(&mut stream, 0, None).unwrap();
    let full_planes = full.export_channels(None).unwrap();
    assert!(full_planes.iter().all(|p| p.iter().all(|&c| c == value)));

    // windowed decode of the same file
    stream.set_position(0);
    let mut pgf = PgfImage::new();
    pgf.open(&mut stream).unwrap();
    let roi = Rect::new(4, 4, 8, 8);
    pgf.read_roi(&mut stream, roi, 0, None).unwrap();

    // the decoded window is the tile cover of the ROI: pixels [4,14)^2
    let window = Rect { left: 4, top: 4, right: 14, bottom: 14 };
    assert_eq!(pgf.channel_width(0), window.width());
    assert_eq!(pgf.channel_height(0), window.height());

    for c in 0..3 {
        let decoded = pgf.channel(c).unwrap();
        let reference = &full_planes[c];
        for y in roi.top..roi.bottom {
            for x in roi.left..roi.right {
                let win_idx =
                    ((y - window.top) * window.width() + (x - window.left)) as usize;
                let full_idx = (y * 16 + x) as usize;
                assert_eq!(
                    decoded[win_idx], reference[full_idx],
                    "channel {c} pixel ({x},{y})"
                );
            }
        }
    }
}

/// A full-frame read of an ROI-coded file walks every tile block and must
/// reproduce the input bit-for-bit at q=0.
#[test]
fn test_roi_scheme_full_decode_is_lossless() {
    let mut rng = StdRng::seed_from_u64(0xB10C);
    for &(w, h, levels) in &[(16u32, 16u32, 3u8), (33, 21, 2), (100, 100, 4), (7, 5, 1)] {
        let planes: Vec<Vec<Coeff>> = (0..1)
            .map(|_| (0..w * h).map(|_| rng.gen_range(-128..=127)).collect())
            .collect();
        let mut stream = encode_roi(&planes, w, h, levels, 1);
        let mut pgf = PgfImage::new();
        pgf.open(&mut stream).unwrap();
        pgf.read(&mut stream, 0, None).unwrap();
        assert_eq!(
            pgf.export_channels(None).unwrap(),
            planes,
            "{w}x{h} at {levels} levels"
        );
    }
}

/// The ROI payload differs from the plain scheme only by its framing; a
/// partial read of an ROI file still honors level dimensions.
#[test]
fn test_roi_partial_read_dimensions() {
    let mut rng = StdRng::seed_from_u64(5);
    let planes: Vec<Vec<Coeff>> =
        vec![(0..64 * 64).map(|_| rng.gen_range(-100..=100)).collect()];
    let mut stream = encode_roi(&planes, 64, 64, 3, 1);
    let mut pgf = PgfImage::new();
    pgf.open(&mut stream).unwrap();
    pgf.read(&mut stream, 1, None).unwrap();
    assert_eq!(pgf.channel_width(0), 32);
    assert_eq!(pgf.channel_height(0), 32);
}

#[test]
fn test_read_roi_requires_the_roi_scheme() {
    // encoded WITHOUT the ROI flag
    let mut pgf = PgfImage::new();
    let header = Header {
        width: 16,
        height: 16,
        mode: ImageMode::GrayScale,
        ..Header::default()
    };
    pgf.set_header(header, 0, Vec::new()).unwrap();
    pgf.import_channels(&[&[0; 256][..]], None).unwrap();
    let mut stream = Cursor::new(Vec::new());
    pgf.write(&mut stream, None).unwrap();
    stream.set_position(0);

    let mut pgf = PgfImage::new();
    pgf.open(&mut stream).unwrap();
    assert!(matches!(
        pgf.read_roi(&mut stream, Rect::new(0, 0, 8, 8), 0, None),
        Err(PgfError::InvalidArg(_))
    ));
}

#[test]
fn test_read_roi_rejects_rects_outside_the_image() {
    let mut stream = encode_roi(&[vec![0; 256]], 16, 16, 2, 1);
    let mut pgf = PgfImage::new();
    pgf.open(&mut stream).unwrap();
    assert!(matches!(
        pgf.read_roi(&mut stream, Rect::new(20, 0, 4, 4), 0, None),
        Err(PgfError::InvalidArg(_))
    ));

    // a rect poking over the edge is clipped, not rejected
    pgf.read_roi(&mut stream, Rect::new(8, 8, 100, 100), 0, None)
        .unwrap();
    assert!(pgf.channel_width(0) >= 8);
}

/// The window chosen before the first read is binding: switching regions
/// mid-stream is rejected.
#[test]
fn test_roi_must_be_chosen_before_the_first_read() {
    let mut stream = encode_roi(&[vec![0; 256]], 16, 16, 2, 1);
    let mut pgf = PgfImage::new();
    pgf.open(&mut stream).unwrap();
    pgf.read(&mut stream, 1, None).unwrap();
    assert!(matches!(
        pgf.read_roi(&mut stream, Rect::new(0, 0, 4, 4), 0, None),
        Err(PgfError::InvalidArg(_))
    ));
}
