//! 稀疏光流
//!
//! 在上一張取樣影格找 Shi-Tomasi 角點，再以金字塔 Lucas-Kanade
//! 追蹤到目前影格，取成功追蹤點的平均位移量作為該時間點的光流強度。

use super::frame_reader::GrayFrame;
use super::samples::SignalSample;
use image::GrayImage;
use std::cmp::Ordering;

/// 角點偵測參數
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureParams {
    pub max_corners: usize,
    /// 相對於最強角點的最低品質
    pub quality_level: f32,
    pub min_distance: f32,
    pub block_size: usize,
}

impl Default for FeatureParams {
    fn default() -> Self {
        Self {
            max_corners: 100,
            quality_level: 0.3,
            min_distance: 7.0,
            block_size: 7,
        }
    }
}

/// Lucas-Kanade 追蹤參數
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackerParams {
    pub pyramid_levels: usize,
    /// 視窗半徑；10 表示 21×21
    pub window_radius: i32,
    pub max_iterations: usize,
    pub epsilon: f32,
    /// 結構張量最小特徵值（除以視窗面積後）的下限
    pub min_eigen_threshold: f32,
}

impl Default for TrackerParams {
    fn default() -> Self {
        Self {
            pyramid_levels: 3,
            window_radius: 10,
            max_iterations: 20,
            epsilon: 0.03,
            min_eigen_threshold: 1e-4,
        }
    }
}

/// 浮點灰階平面，數值範圍 0..=1
#[derive(Debug, Clone)]
struct Plane {
    width: usize,
    height: usize,
    data: Vec<f32>,
}

impl Plane {
    fn from_gray(image: &GrayImage) -> Self {
        Self {
            width: image.width() as usize,
            height: image.height() as usize,
            data: image.as_raw().iter().map(|&v| f32::from(v) / 255.0).collect(),
        }
    }

    fn at(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.width + x]
    }

    fn sample(&self, x: f32, y: f32) -> f32 {
        bilinear(&self.data, self.width, self.height, x, y)
    }

    /// 2×2 平均縮小一半；太小時回傳 `None`
    fn downsample(&self) -> Option<Self> {
        let width = self.width / 2;
        let height = self.height / 2;
        if width < 8 || height < 8 {
            return None;
        }
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                let sum = self.at(2 * x, 2 * y)
                    + self.at(2 * x + 1, 2 * y)
                    + self.at(2 * x, 2 * y + 1)
                    + self.at(2 * x + 1, 2 * y + 1);
                data.push(sum / 4.0);
            }
        }
        Some(Self {
            width,
            height,
            data,
        })
    }

    /// 中央差分梯度
    fn gradients(&self) -> (Vec<f32>, Vec<f32>) {
        let mut gx = vec![0.0; self.data.len()];
        let mut gy = vec![0.0; self.data.len()];
        for y in 0..self.height {
            let up = y.saturating_sub(1);
            let down = (y + 1).min(self.height - 1);
            for x in 0..self.width {
                let left = x.saturating_sub(1);
                let right = (x + 1).min(self.width - 1);
                let index = y * self.width + x;
                gx[index] = (self.at(right, y) - self.at(left, y)) / 2.0;
                gy[index] = (self.at(x, down) - self.at(x, up)) / 2.0;
            }
        }
        (gx, gy)
    }
}

/// 2×2 對稱矩陣的最小特徵值
fn min_eigenvalue(a: f32, b: f32, c: f32) -> f32 {
    let half_trace = (a + c) / 2.0;
    let half_diff = (a - c) / 2.0;
    half_trace - (half_diff * half_diff + b * b).sqrt()
}

/// 積分影像，方便計算區塊總和
struct Integral {
    width: usize,
    sums: Vec<f64>,
}

impl Integral {
    fn new(values: &[f32], width: usize, height: usize) -> Self {
        let stride = width + 1;
        let mut sums = vec![0.0; stride * (height + 1)];
        for y in 0..height {
            let mut row = 0.0;
            for x in 0..width {
                row += f64::from(values[y * width + x]);
                sums[(y + 1) * stride + x + 1] = sums[y * stride + x + 1] + row;
            }
        }
        Self { width, sums }
    }

    /// `[x0, x1) × [y0, y1)` 的總和
    fn sum(&self, x0: usize, y0: usize, x1: usize, y1: usize) -> f32 {
        let stride = self.width + 1;
        (self.sums[y1 * stride + x1] - self.sums[y0 * stride + x1] - self.sums[y1 * stride + x0]
            + self.sums[y0 * stride + x0]) as f32
    }
}

/// Shi-Tomasi 角點
///
/// 依強度由大到小排列，強度相同時依 (y, x) 排序，結果完全可重現。
#[must_use]
pub fn detect_features(image: &GrayImage, params: &FeatureParams) -> Vec<(f32, f32)> {
    let plane = Plane::from_gray(image);
    let (width, height) = (plane.width, plane.height);
    let radius = params.block_size / 2;
    if width <= 2 * radius + 2 || height <= 2 * radius + 2 || params.max_corners == 0 {
        return Vec::new();
    }

    let (gx, gy) = plane.gradients();
    let xx: Vec<f32> = gx.iter().map(|g| g * g).collect();
    let xy: Vec<f32> = gx.iter().zip(&gy).map(|(a, b)| a * b).collect();
    let yy: Vec<f32> = gy.iter().map(|g| g * g).collect();
    let ixx = Integral::new(&xx, width, height);
    let ixy = Integral::new(&xy, width, height);
    let iyy = Integral::new(&yy, width, height);

    let margin = radius + 1;
    let mut response = vec![0.0_f32; width * height];
    let mut strongest = 0.0_f32;
    for y in margin..height - margin {
        for x in margin..width - margin {
            let (x0, y0, x1, y1) = (x - radius, y - radius, x + radius + 1, y + radius + 1);
            let eigen = min_eigenvalue(
                ixx.sum(x0, y0, x1, y1),
                ixy.sum(x0, y0, x1, y1),
                iyy.sum(x0, y0, x1, y1),
            )
            .max(0.0);
            response[y * width + x] = eigen;
            strongest = strongest.max(eigen);
        }
    }

    if strongest <= f32::EPSILON {
        return Vec::new();
    }
    let threshold = strongest * params.quality_level;

    let mut candidates = Vec::new();
    for y in margin..height - margin {
        for x in margin..width - margin {
            let value = response[y * width + x];
            if value < threshold {
                continue;
            }
            let is_local_max = (y - 1..=y + 1)
                .flat_map(|ny| (x - 1..=x + 1).map(move |nx| (nx, ny)))
                .all(|(nx, ny)| response[ny * width + nx] <= value);
            if is_local_max {
                candidates.push((value, x, y));
            }
        }
    }

    candidates.sort_by(|a, b| {
        b.0.partial_cmp(&a.0)
            .unwrap_or(Ordering::Equal)
            .then(a.2.cmp(&b.2))
            .then(a.1.cmp(&b.1))
    });

    let min_distance_sq = params.min_distance * params.min_distance;
    let mut corners: Vec<(f32, f32)> = Vec::new();
    for (_, x, y) in candidates {
        let point = (x as f32, y as f32);
        let too_close = corners.iter().any(|&(cx, cy)| {
            let dx = cx - point.0;
            let dy = cy - point.1;
            dx * dx + dy * dy < min_distance_sq
        });
        if !too_close {
            corners.push(point);
            if corners.len() >= params.max_corners {
                break;
            }
        }
    }
    corners
}

/// 單一金字塔層：影像與其梯度
struct Level {
    plane: Plane,
    gx: Vec<f32>,
    gy: Vec<f32>,
}

fn build_pyramid(image: &GrayImage, levels: usize) -> Vec<Level> {
    let mut planes = vec![Plane::from_gray(image)];
    while planes.len() < levels.max(1) {
        let Some(next) = planes.last().and_then(Plane::downsample) else {
            break;
        };
        planes.push(next);
    }
    planes
        .into_iter()
        .map(|plane| {
            let (gx, gy) = plane.gradients();
            Level { plane, gx, gy }
        })
        .collect()
}

/// 在單一層上迭代求位移；`guess` 為上層傳下來的初始估計
fn track_level(
    previous: &Level,
    current: &Plane,
    point: (f32, f32),
    guess: (f32, f32),
    params: &TrackerParams,
) -> Option<(f32, f32)> {
    let radius = params.window_radius;
    let plane = &previous.plane;

    let mut template = Vec::new();
    let (mut a, mut b, mut c) = (0.0_f32, 0.0_f32, 0.0_f32);
    for wy in -radius..=radius {
        for wx in -radius..=radius {
            let x = point.0 + wx as f32;
            let y = point.1 + wy as f32;
            let ix = bilinear(&previous.gx, plane.width, plane.height, x, y);
            let iy = bilinear(&previous.gy, plane.width, plane.height, x, y);
            a += ix * ix;
            b += ix * iy;
            c += iy * iy;
            template.push((wx, wy, plane.sample(x, y), ix, iy));
        }
    }

    let area = template.len() as f32;
    if min_eigenvalue(a, b, c) / area < params.min_eigen_threshold {
        return None;
    }
    let determinant = a * c - b * b;
    if determinant.abs() <= f32::EPSILON {
        return None;
    }

    let mut flow = guess;
    for _ in 0..params.max_iterations {
        let (mut bx, mut by) = (0.0_f32, 0.0_f32);
        for &(wx, wy, value, ix, iy) in &template {
            let moved = current.sample(
                point.0 + wx as f32 + flow.0,
                point.1 + wy as f32 + flow.1,
            );
            let diff = value - moved;
            bx += diff * ix;
            by += diff * iy;
        }
        let step_x = (c * bx - b * by) / determinant;
        let step_y = (a * by - b * bx) / determinant;
        flow.0 += step_x;
        flow.1 += step_y;
        if step_x * step_x + step_y * step_y < params.epsilon * params.epsilon {
            break;
        }
    }

    (flow.0.is_finite() && flow.1.is_finite()).then_some(flow)
}

/// 雙線性取樣，超出範圍時取邊緣值
fn bilinear(data: &[f32], width: usize, height: usize, x: f32, y: f32) -> f32 {
    let x = x.clamp(0.0, (width - 1) as f32);
    let y = y.clamp(0.0, (height - 1) as f32);
    let x0 = x.floor() as usize;
    let y0 = y.floor() as usize;
    let x1 = (x0 + 1).min(width - 1);
    let y1 = (y0 + 1).min(height - 1);
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let at = |px: usize, py: usize| data[py * width + px];
    let top = at(x0, y0) * (1.0 - fx) + at(x1, y0) * fx;
    let bottom = at(x0, y1) * (1.0 - fx) + at(x1, y1) * fx;
    top * (1.0 - fy) + bottom * fy
}

/// 追蹤每個角點；追蹤失敗或移出畫面的點回傳 `None`
#[must_use]
pub fn track_features(
    previous: &GrayImage,
    current: &GrayImage,
    points: &[(f32, f32)],
    params: &TrackerParams,
) -> Vec<Option<(f32, f32)>> {
    if previous.dimensions() != current.dimensions() || previous.width() < 2 || previous.height() < 2
    {
        return vec![None; points.len()];
    }

    let previous_pyramid = build_pyramid(previous, params.pyramid_levels);
    let current_pyramid = build_pyramid(current, previous_pyramid.len());
    let levels = previous_pyramid.len().min(current_pyramid.len());
    let (width, height) = (previous.width() as f32, previous.height() as f32);

    points
        .iter()
        .map(|&point| {
            let mut guess = (0.0_f32, 0.0_f32);
            for level in (0..levels).rev() {
                let scale = (1_u32 << level) as f32;
                let scaled = (point.0 / scale, point.1 / scale);
                let flow = track_level(
                    &previous_pyramid[level],
                    &current_pyramid[level].plane,
                    scaled,
                    guess,
                    params,
                )?;
                guess = if level > 0 {
                    (flow.0 * 2.0, flow.1 * 2.0)
                } else {
                    flow
                };
            }

            let target = (point.0 + guess.0, point.1 + guess.1);
            let inside =
                target.0 >= 0.0 && target.1 >= 0.0 && target.0 < width && target.1 < height;
            inside.then_some(guess)
        })
        .collect()
}

/// 兩張影格之間成功追蹤點的平均位移量
///
/// 沒有角點或沒有任何點追蹤成功時回傳 `None`。
#[must_use]
pub fn mean_flow(
    previous: &GrayImage,
    current: &GrayImage,
    features: &FeatureParams,
    tracker: &TrackerParams,
) -> Option<f64> {
    let points = detect_features(previous, features);
    if points.is_empty() {
        return None;
    }

    let magnitudes: Vec<f64> = track_features(previous, current, &points, tracker)
        .into_iter()
        .flatten()
        .map(|(dx, dy)| f64::from(dx.hypot(dy)))
        .collect();

    if magnitudes.is_empty() {
        return None;
    }
    Some(magnitudes.iter().sum::<f64>() / magnitudes.len() as f64)
}

/// 逐格累積光流強度；每張取樣影格都重新找角點
#[derive(Debug, Default)]
pub struct FlowAnalyzer {
    previous: Option<GrayImage>,
    features: FeatureParams,
    tracker: TrackerParams,
}

impl FlowAnalyzer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, frame: &GrayFrame) -> Option<SignalSample> {
        let sample = self
            .previous
            .as_ref()
            .and_then(|previous| mean_flow(previous, &frame.image, &self.features, &self.tracker))
            .map(|magnitude| SignalSample::new(frame.timestamp, magnitude));
        self.previous = Some(frame.image.clone());
        sample
    }
}
