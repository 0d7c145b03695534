//! 直式畫面的濾鏡圖
//!
//! 三種樣式都輸出到 `[vout]`：
//! - `none`：置中裁成 9:16 再縮放
//! - `solid`：等比縮放放進畫布，四周補純色
//! - `blur`：同一段影片放大裁切並模糊當背景，前景與 `solid` 相同

use crate::config::BorderStyle;
use crate::tools::HexColor;

/// 濾鏡圖的輸出標籤
pub const OUTPUT_LABEL: &str = "[vout]";

/// 模糊核大小的預設值與上限
const DEFAULT_BLUR_KERNEL: u32 = 51;
const MAX_BLUR_KERNEL: u32 = 99;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

/// 直式輸出設定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerticalLayout {
    pub canvas: Canvas,
    pub style: BorderStyle,
    pub color: HexColor,
    /// 前景與畫布邊緣的最小距離
    pub border_width: u32,
    /// 已修正過的奇數模糊核
    pub blur_kernel: u32,
}

/// 裁切區域
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRegion {
    pub width: u32,
    pub height: u32,
    pub x: u32,
    pub y: u32,
}

fn even(value: f64) -> u32 {
    ((value / 2.0).round() as u32 * 2).max(2)
}

/// 置中裁出 9:16 的區域
#[must_use]
pub fn center_crop(source_width: u32, source_height: u32, canvas: Canvas) -> CropRegion {
    let target_ratio = f64::from(canvas.width) / f64::from(canvas.height);
    let source_ratio = f64::from(source_width) / f64::from(source_height.max(1));

    let (width, height) = if source_ratio > target_ratio {
        (
            even(f64::from(source_height) * target_ratio).min(source_width),
            source_height,
        )
    } else {
        (
            source_width,
            even(f64::from(source_width) / target_ratio).min(source_height),
        )
    };

    CropRegion {
        width,
        height,
        x: (source_width - width) / 2,
        y: (source_height - height) / 2,
    }
}

/// 等比縮放到 `box_width × box_height` 以內
#[must_use]
pub fn fit_inside(source_width: u32, source_height: u32, box_width: u32, box_height: u32) -> (u32, u32) {
    let scale = (f64::from(box_width) / f64::from(source_width.max(1)))
        .min(f64::from(box_height) / f64::from(source_height.max(1)));
    (
        even(f64::from(source_width) * scale).min(box_width.max(2)),
        even(f64::from(source_height) * scale).min(box_height.max(2)),
    )
}

/// 修正模糊核：≤ 0 用預設值，偶數加一，最大 99
#[must_use]
pub fn normalize_blur_kernel(kernel: i32) -> u32 {
    if kernel <= 0 {
        return DEFAULT_BLUR_KERNEL;
    }
    let kernel = kernel.unsigned_abs();
    let odd = if kernel % 2 == 0 { kernel + 1 } else { kernel };
    odd.min(MAX_BLUR_KERNEL)
}

/// 由核大小推算高斯 sigma
#[must_use]
pub fn kernel_sigma(kernel: u32) -> f64 {
    0.3 * ((f64::from(kernel) - 1.0) * 0.5 - 1.0) + 0.8
}

impl VerticalLayout {
    /// 前景可用的區域（扣掉邊框）
    fn foreground_box(&self) -> (u32, u32) {
        let inset = self.border_width.saturating_mul(2);
        (
            self.canvas.width.saturating_sub(inset).max(2),
            self.canvas.height.saturating_sub(inset).max(2),
        )
    }

    /// 依樣式產生 `-filter_complex` 字串
    #[must_use]
    pub fn filter_graph(&self, source_width: u32, source_height: u32) -> String {
        let Canvas { width, height } = self.canvas;
        match self.style {
            BorderStyle::None => {
                let crop = center_crop(source_width, source_height, self.canvas);
                format!(
                    "[0:v]crop={}:{}:{}:{},scale={width}:{height},setsar=1{OUTPUT_LABEL}",
                    crop.width, crop.height, crop.x, crop.y
                )
            }
            BorderStyle::Solid => {
                let (box_width, box_height) = self.foreground_box();
                let (fg_width, fg_height) =
                    fit_inside(source_width, source_height, box_width, box_height);
                format!(
                    "[0:v]scale={fg_width}:{fg_height},pad={width}:{height}:{}:{}:color={},setsar=1{OUTPUT_LABEL}",
                    (width - fg_width) / 2,
                    (height - fg_height) / 2,
                    self.color.to_ffmpeg()
                )
            }
            BorderStyle::Blur => {
                let (box_width, box_height) = self.foreground_box();
                let (fg_width, fg_height) =
                    fit_inside(source_width, source_height, box_width, box_height);
                format!(
                    "[0:v]split=2[bgsrc][fgsrc];\
                     [bgsrc]scale={width}:{height}:force_original_aspect_ratio=increase,\
                     crop={width}:{height},gblur=sigma={sigma:.2}[bg];\
                     [fgsrc]scale={fg_width}:{fg_height}[fg];\
                     [bg][fg]overlay={x}:{y},setsar=1{OUTPUT_LABEL}",
                    sigma = kernel_sigma(self.blur_kernel),
                    x = (width - fg_width) / 2,
                    y = (height - fg_height) / 2,
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CANVAS: Canvas = Canvas {
        width: 1080,
        height: 1920,
    };

    fn layout(style: BorderStyle) -> VerticalLayout {
        VerticalLayout {
            canvas: CANVAS,
            style,
            color: HexColor::BLACK,
            border_width: 0,
            blur_kernel: 51,
        }
    }

    #[test]
    fn test_center_crop_landscape() {
        let crop = center_crop(1920, 1080, CANVAS);
        assert_eq!(crop.height, 1080);
        assert_eq!(crop.width, 608);
        assert_eq!(crop.x, (1920 - 608) / 2);
        assert_eq!(crop.y, 0);
    }

    #[test]
    fn test_center_crop_tall_source() {
        let crop = center_crop(1080, 2400, CANVAS);
        assert_eq!(crop.width, 1080);
        assert_eq!(crop.height, 1920);
        assert_eq!(crop.y, 240);
    }

    #[test]
    fn test_fit_inside_landscape() {
        assert_eq!(fit_inside(1920, 1080, 1080, 1920), (1080, 608));
        assert_eq!(fit_inside(1080, 1920, 1080, 1920), (1080, 1920));
    }

    #[test]
    fn test_normalize_blur_kernel() {
        assert_eq!(normalize_blur_kernel(0), 51);
        assert_eq!(normalize_blur_kernel(-3), 51);
        assert_eq!(normalize_blur_kernel(20), 21);
        assert_eq!(normalize_blur_kernel(21), 21);
        assert_eq!(normalize_blur_kernel(150), 99);
        assert_eq!(normalize_blur_kernel(1), 1);
    }

    #[test]
    fn test_kernel_sigma() {
        assert!((kernel_sigma(51) - 8.0).abs() < 1e-9);
        assert!((kernel_sigma(3) - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_solid_filter_pads_with_color() {
        let mut solid = layout(BorderStyle::Solid);
        solid.color = HexColor {
            r: 0x12,
            g: 0x34,
            b: 0x56,
        };
        let graph = solid.filter_graph(1920, 1080);
        assert_eq!(
            graph,
            "[0:v]scale=1080:608,pad=1080:1920:0:656:color=0x123456,setsar=1[vout]"
        );
    }

    #[test]
    fn test_solid_filter_respects_border_width() {
        let mut solid = layout(BorderStyle::Solid);
        solid.border_width = 40;
        let graph = solid.filter_graph(1920, 1080);
        assert!(graph.starts_with("[0:v]scale=1000:562,pad=1080:1920:40:679"));
    }

    #[test]
    fn test_blur_filter_layers() {
        let graph = layout(BorderStyle::Blur).filter_graph(1920, 1080);
        assert!(graph.contains("force_original_aspect_ratio=increase"));
        assert!(graph.contains("crop=1080:1920"));
        assert!(graph.contains("gblur=sigma=8.00[bg]"));
        assert!(graph.contains("[fgsrc]scale=1080:608[fg]"));
        assert!(graph.contains("overlay=0:656"));
        assert!(graph.ends_with(OUTPUT_LABEL));
    }

    #[test]
    fn test_none_filter_crops() {
        let graph = layout(BorderStyle::None).filter_graph(1920, 1080);
        assert_eq!(graph, "[0:v]crop=608:1080:656:0,scale=1080:1920,setsar=1[vout]");
    }
}
