use image::GrayImage;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Pixel-difference counts for one frame, two columns per ROI.
///
/// Column `2i` holds ROI `i`'s difference count against the background
/// frame; column `2i+1` holds its count against the frame `delta` steps
/// earlier, or [`NO_PREVIOUS_FRAME`] near the start of the video.
pub type Row = Vec<i64>;

/// Sentinel emitted in previous-frame columns when `frame_index <= delta`,
/// i.e. there is no frame `delta` steps earlier to compare against.
pub const NO_PREVIOUS_FRAME: i64 = -1;

#[derive(Debug, thiserror::Error)]
pub enum CompareError {
    #[error("failed to load image {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error(
        "dimension mismatch: ROI mask is {mask_width}x{mask_height} but {path} is {width}x{height}"
    )]
    DimensionMismatch {
        path: PathBuf,
        mask_width: u32,
        mask_height: u32,
        width: u32,
        height: u32,
    },
}

fn load_gray(path: &Path) -> Result<GrayImage, CompareError> {
    let img = image::open(path).map_err(|source| CompareError::Image {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(img.to_luma8())
}

/// PIL-style multiply: `a * b / 255`. A full-white mask pixel keeps the
/// source value, a black pixel zeroes it.
fn mask_pixel(mask: u8, value: u8) -> u8 {
    ((mask as u16 * value as u16) / 255) as u8
}

/// Counts the pixels inside a region of interest that differ between two
/// frames by at least `threshold` gray levels.
///
/// All three images are converted to 8-bit grayscale. Both frames are
/// masked by the ROI image, the masked frames are differenced pixel-wise,
/// and the count is taken from the tail of the difference histogram
/// (buckets `threshold..=255`). Symmetric in `image_a` / `image_b`.
pub fn region_pixel_diff(
    roi_mask: &Path,
    image_a: &Path,
    image_b: &Path,
    threshold: u8,
) -> Result<i64, CompareError> {
    let mask = load_gray(roi_mask)?;
    let frame_a = load_gray(image_a)?;
    let frame_b = load_gray(image_b)?;
    for (frame, path) in [(&frame_a, image_a), (&frame_b, image_b)] {
        if frame.dimensions() != mask.dimensions() {
            return Err(CompareError::DimensionMismatch {
                path: path.to_path_buf(),
                mask_width: mask.width(),
                mask_height: mask.height(),
                width: frame.width(),
                height: frame.height(),
            });
        }
    }

    let mut histogram = [0u64; 256];
    for ((m, a), b) in mask.pixels().zip(frame_a.pixels()).zip(frame_b.pixels()) {
        let masked_a = mask_pixel(m.0[0], a.0[0]);
        let masked_b = mask_pixel(m.0[0], b.0[0]);
        histogram[masked_a.abs_diff(masked_b) as usize] += 1;
    }
    let count: u64 = histogram[threshold as usize..].iter().sum();

    debug!(
        mask = %roi_mask.display(),
        threshold,
        count,
        "region pixel diff"
    );
    Ok(count as i64)
}

/// Compares frame `frame_index` against the background frame and against
/// the frame `delta` steps earlier, once per ROI, and assembles the counts
/// into one [`Row`].
///
/// `frame_path` and `roi_path` map a frame index / ROI index to the file
/// written by the video capture tool. The column layout is fixed, ROI-major
/// with background before previous:
///
/// `[roi0_vs_background, roi0_vs_previous, roi1_vs_background, roi1_vs_previous, ...]`
///
/// When `frame_index <= delta` the previous-frame comparison is skipped and
/// [`NO_PREVIOUS_FRAME`] is emitted in its place.
pub fn compare_frames(
    frame_index: u32,
    delta: u32,
    number_rois: usize,
    frame_path: impl Fn(u32) -> PathBuf,
    roi_path: impl Fn(usize) -> PathBuf,
    background_path: &Path,
    threshold: u8,
) -> Result<Row, CompareError> {
    let current = frame_path(frame_index);
    let previous = if frame_index > delta {
        Some(frame_path(frame_index - delta))
    } else {
        None
    };

    let mut row = Row::with_capacity(2 * number_rois);
    for roi_index in 0..number_rois {
        let mask = roi_path(roi_index);
        row.push(region_pixel_diff(&mask, &current, background_path, threshold)?);
        match &previous {
            Some(previous) => {
                row.push(region_pixel_diff(&mask, &current, previous, threshold)?)
            }
            None => row.push(NO_PREVIOUS_FRAME),
        }
    }
    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    static TEST_DIR_SEQ: AtomicU32 = AtomicU32::new(0);

    /// Per-test scratch directory under the system temp dir.
    fn test_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "casu_score_test_{}_{}",
            std::process::id(),
            TEST_DIR_SEQ.fetch_add(1, Ordering::Relaxed)
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn save_gray(dir: &Path, name: &str, width: u32, height: u32, pixel: impl Fn(u32, u32) -> u8) -> PathBuf {
        let img = GrayImage::from_fn(width, height, |x, y| image::Luma([pixel(x, y)]));
        let path = dir.join(name);
        img.save(&path).unwrap();
        path
    }

    #[test]
    fn counts_pixels_at_or_above_threshold() {
        let dir = test_dir();
        let mask = save_gray(&dir, "mask.png", 4, 4, |_, _| 255);
        let a = save_gray(&dir, "a.png", 4, 4, |_, _| 0);
        let b = save_gray(&dir, "b.png", 4, 4, |_, _| 10);

        // every pixel differs by 10
        assert_eq!(region_pixel_diff(&mask, &a, &b, 5).unwrap(), 16);
        assert_eq!(region_pixel_diff(&mask, &a, &b, 10).unwrap(), 16);
        assert_eq!(region_pixel_diff(&mask, &a, &b, 11).unwrap(), 0);
    }

    #[test]
    fn diff_is_symmetric() {
        let dir = test_dir();
        let mask = save_gray(&dir, "mask.png", 8, 8, |_, _| 255);
        let a = save_gray(&dir, "a.png", 8, 8, |x, y| (x * 8 + y) as u8);
        let b = save_gray(&dir, "b.png", 8, 8, |x, _| (x * 20) as u8);

        assert_eq!(
            region_pixel_diff(&mask, &a, &b, 3).unwrap(),
            region_pixel_diff(&mask, &b, &a, 3).unwrap()
        );
    }

    #[test]
    fn mask_zeroes_pixels_outside_roi() {
        let dir = test_dir();
        // left half inside the ROI, right half outside
        let mask = save_gray(&dir, "mask.png", 4, 4, |x, _| if x < 2 { 255 } else { 0 });
        let a = save_gray(&dir, "a.png", 4, 4, |_, _| 0);
        let b = save_gray(&dir, "b.png", 4, 4, |_, _| 200);

        assert_eq!(region_pixel_diff(&mask, &a, &b, 100).unwrap(), 8);
    }

    #[test]
    fn dimension_mismatch_is_an_error() {
        let dir = test_dir();
        let mask = save_gray(&dir, "mask.png", 4, 4, |_, _| 255);
        let a = save_gray(&dir, "a.png", 4, 4, |_, _| 0);
        let b = save_gray(&dir, "b.png", 8, 8, |_, _| 0);

        let result = region_pixel_diff(&mask, &a, &b, 5);
        assert!(matches!(result, Err(CompareError::DimensionMismatch { .. })));
    }

    #[test]
    fn missing_image_is_an_error() {
        let dir = test_dir();
        let mask = save_gray(&dir, "mask.png", 4, 4, |_, _| 255);
        let a = save_gray(&dir, "a.png", 4, 4, |_, _| 0);

        let result = region_pixel_diff(&mask, &a, &dir.join("missing.png"), 5);
        assert!(matches!(result, Err(CompareError::Image { .. })));
    }

    #[test]
    fn sentinel_when_too_close_to_video_start() {
        let dir = test_dir();
        let background = save_gray(&dir, "background.png", 4, 4, |_, _| 0);
        save_gray(&dir, "frame_0002.png", 4, 4, |_, _| 50);
        save_gray(&dir, "roi_0000.png", 4, 4, |_, _| 255);
        save_gray(&dir, "roi_0001.png", 4, 4, |_, _| 255);

        // frame 2 with delta 5: no frame -3 exists, previous columns get -1
        let row = compare_frames(
            2,
            5,
            2,
            |i| dir.join(format!("frame_{i:04}.png")),
            |r| dir.join(format!("roi_{r:04}.png")),
            &background,
            10,
        )
        .unwrap();
        assert_eq!(row, vec![16, NO_PREVIOUS_FRAME, 16, NO_PREVIOUS_FRAME]);
    }

    #[test]
    fn row_is_roi_major_background_first() {
        let dir = test_dir();
        let background = save_gray(&dir, "background.png", 4, 4, |_, _| 0);
        // frame 1 is identical to frame 6, so previous-frame diffs are zero
        save_gray(&dir, "frame_0001.png", 4, 4, |_, _| 50);
        save_gray(&dir, "frame_0006.png", 4, 4, |_, _| 50);
        // ROI 0 covers the left half, ROI 1 the right half
        let left = |x: u32| u8::from(x < 2) * 255;
        save_gray(&dir, "roi_0000.png", 4, 4, |x, _| left(x));
        save_gray(&dir, "roi_0001.png", 4, 4, |x, _| 255 - left(x));

        let row = compare_frames(
            6,
            5,
            2,
            |i| dir.join(format!("frame_{i:04}.png")),
            |r| dir.join(format!("roi_{r:04}.png")),
            &background,
            10,
        )
        .unwrap();
        // 8 pixels per ROI differ from the background, none from frame 1
        assert_eq!(row, vec![8, 0, 8, 0]);
    }
}
