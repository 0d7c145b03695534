//! 影格差異（動作量）
//!
//! 模糊 → 與上一張取樣影格相減 → 二值化 → 膨脹兩次 → 計算前景面積。

use super::frame_reader::GrayFrame;
use super::samples::SignalSample;
use image::{GrayImage, imageops};

/// 分析解析度下的高斯模糊 sigma
const BLUR_SIGMA: f32 = 2.0;

/// 差異大於此值才算前景
pub const DIFF_THRESHOLD: u8 = 25;

const DILATE_ITERATIONS: usize = 2;

/// 逐格累積動作量
#[derive(Debug, Default)]
pub struct MotionAnalyzer {
    previous: Option<GrayImage>,
}

impl MotionAnalyzer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// 加入一張影格；第一張影格沒有可比較的對象，不產生取樣
    pub fn push(&mut self, frame: &GrayFrame) -> Option<SignalSample> {
        let blurred = imageops::blur(&frame.image, BLUR_SIGMA);
        let sample = self
            .previous
            .as_ref()
            .and_then(|previous| motion_area(previous, &blurred))
            .map(|area| SignalSample::new(frame.timestamp, area));
        self.previous = Some(blurred);
        sample
    }
}

/// 兩張（已模糊）影格之間的前景像素數；尺寸不同時回傳 `None`
#[must_use]
pub fn motion_area(previous: &GrayImage, current: &GrayImage) -> Option<f64> {
    if previous.dimensions() != current.dimensions() {
        return None;
    }
    let (width, height) = current.dimensions();

    let mut mask: Vec<bool> = previous
        .as_raw()
        .iter()
        .zip(current.as_raw())
        .map(|(&a, &b)| a.abs_diff(b) > DIFF_THRESHOLD)
        .collect();

    for _ in 0..DILATE_ITERATIONS {
        mask = dilate(&mask, width as usize, height as usize);
    }

    Some(mask.iter().filter(|&&on| on).count() as f64)
}

/// 3×3 方形結構元素的膨脹
fn dilate(mask: &[bool], width: usize, height: usize) -> Vec<bool> {
    let mut output = vec![false; mask.len()];
    for y in 0..height {
        for x in 0..width {
            if !mask[y * width + x] {
                continue;
            }
            for ny in y.saturating_sub(1)..=(y + 1).min(height - 1) {
                for nx in x.saturating_sub(1)..=(x + 1).min(width - 1) {
                    output[ny * width + nx] = true;
                }
            }
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn frame(timestamp: f64, image: GrayImage) -> GrayFrame {
        GrayFrame { timestamp, image }
    }

    #[test]
    fn test_identical_frames_have_no_motion() {
        let image = GrayImage::from_pixel(64, 48, Luma([90]));
        assert_eq!(motion_area(&image, &image), Some(0.0));
    }

    #[test]
    fn test_single_pixel_dilates_to_5x5() {
        let previous = GrayImage::from_pixel(20, 20, Luma([0]));
        let mut current = previous.clone();
        current.put_pixel(10, 10, Luma([200]));

        assert_eq!(motion_area(&previous, &current), Some(25.0));
    }

    #[test]
    fn test_dilate_clips_at_border() {
        let mut mask = vec![false; 16];
        mask[0] = true;
        let once = dilate(&mask, 4, 4);
        assert_eq!(once.iter().filter(|&&on| on).count(), 4);
    }

    #[test]
    fn test_small_differences_are_ignored() {
        let previous = GrayImage::from_pixel(16, 16, Luma([100]));
        let current = GrayImage::from_pixel(16, 16, Luma([125]));
        assert_eq!(motion_area(&previous, &current), Some(0.0));
    }

    #[test]
    fn test_analyzer_skips_first_frame() {
        let mut analyzer = MotionAnalyzer::new();
        let dark = GrayImage::from_pixel(32, 32, Luma([0]));
        let bright = GrayImage::from_pixel(32, 32, Luma([255]));

        assert!(analyzer.push(&frame(0.0, dark)).is_none());
        let sample = analyzer.push(&frame(0.5, bright)).unwrap();
        assert!((sample.timestamp - 0.5).abs() < 1e-9);
        assert!((sample.value - 1024.0).abs() < 1e-9);
    }

    #[test]
    fn test_mismatched_sizes() {
        let a = GrayImage::new(10, 10);
        let b = GrayImage::new(12, 10);
        assert!(motion_area(&a, &b).is_none());
    }
}
