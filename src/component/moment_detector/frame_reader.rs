//! 取樣影格讀取
//!
//! ffmpeg 以 `select` 濾鏡每隔固定幀數取一格，縮小並轉成灰階後
//! 以 rawvideo 寫到 stdout，這裡逐格讀回。

use super::error::DetectError;
use crate::tools::VideoInfo;
use image::GrayImage;
use log::{debug, warn};
use std::io::{ErrorKind, Read};
use std::path::Path;
use std::process::{Child, ChildStdout, Command, Stdio};

/// 分析用影格的最大寬度
pub const ANALYSIS_MAX_WIDTH: u32 = 320;

/// 一張取樣後的灰階影格
#[derive(Debug, Clone)]
pub struct GrayFrame {
    /// 在原影片中的時間點（秒）
    pub timestamp: f64,
    pub image: GrayImage,
}

/// 依序提供取樣影格
pub trait FrameSource: Send {
    /// 讀取下一張影格；`Ok(None)` 表示已經讀完
    fn next_frame(&mut self) -> Result<Option<GrayFrame>, DetectError>;
}

/// 影格取樣計畫
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameSamplingPlan {
    /// 每隔幾幀取一格（至少 1）
    pub frame_step: u64,
    pub frame_rate: f64,
    /// 只讀取開頭這麼多秒
    pub analysis_seconds: f64,
    pub width: u32,
    pub height: u32,
}

impl FrameSamplingPlan {
    /// 取樣間隔為 `max(1, floor(fps / 2))` 幀，約每秒兩格
    #[must_use]
    pub fn new(info: &VideoInfo, analysis_budget: f64, max_width: u32) -> Self {
        let frame_rate = if info.frame_rate.is_finite() && info.frame_rate > 0.0 {
            info.frame_rate
        } else {
            30.0
        };
        let frame_step = ((frame_rate / 2.0).floor() as u64).max(1);
        let analysis_seconds = info.duration_seconds.min(analysis_budget).max(0.0);
        let (width, height) = scaled_dimensions(info.width, info.height, max_width);

        Self {
            frame_step,
            frame_rate,
            analysis_seconds,
            width,
            height,
        }
    }

    /// 第 `index` 張取樣影格的時間點
    #[must_use]
    pub fn timestamp_of(&self, index: u64) -> f64 {
        (index * self.frame_step) as f64 / self.frame_rate
    }

    /// 預期的取樣影格數（進度顯示用）
    #[must_use]
    pub fn expected_frames(&self) -> u64 {
        let total_frames = (self.analysis_seconds * self.frame_rate).ceil() as u64;
        total_frames.div_ceil(self.frame_step).max(1)
    }

    #[must_use]
    pub const fn frame_bytes(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// 等比縮小到 `max_width` 以內，長寬都取偶數
fn scaled_dimensions(width: u32, height: u32, max_width: u32) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (max_width.max(2) & !1, max_width.max(2) & !1);
    }
    let target_width = width.min(max_width).max(2) & !1;
    let target_height =
        ((f64::from(height) * f64::from(target_width) / f64::from(width)).round() as u32).max(2)
            & !1;
    (target_width, target_height)
}

/// 由 ffmpeg 子行程提供影格
///
/// 子行程在 drop 時會被終止。
pub struct FfmpegFrameSource {
    child: Child,
    stdout: ChildStdout,
    plan: FrameSamplingPlan,
    index: u64,
    finished: bool,
}

impl FfmpegFrameSource {
    pub fn spawn(video_path: &Path, plan: FrameSamplingPlan) -> Result<Self, DetectError> {
        let filter = format!(
            "select=not(mod(n\\,{})),scale={}:{},format=gray",
            plan.frame_step, plan.width, plan.height
        );
        debug!("影格取樣濾鏡: {filter}");

        let mut child = Command::new("ffmpeg")
            .args(["-hide_banner", "-nostdin", "-loglevel", "error", "-t"])
            .arg(format!("{:.3}", plan.analysis_seconds))
            .arg("-i")
            .arg(video_path)
            .args(["-an", "-sn", "-dn", "-vf", &filter])
            .args(["-fps_mode", "vfr", "-f", "rawvideo", "-pix_fmt", "gray", "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| DetectError::FrameDecode(format!("無法執行 ffmpeg: {e}")))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DetectError::FrameDecode("無法取得 ffmpeg 輸出".to_string()))?;

        Ok(Self {
            child,
            stdout,
            plan,
            index: 0,
            finished: false,
        })
    }

    fn finish(&mut self) -> Result<Option<GrayFrame>, DetectError> {
        self.finished = true;
        let status = self
            .child
            .wait()
            .map_err(|e| DetectError::FrameDecode(e.to_string()))?;
        if !status.success() && self.index == 0 {
            return Err(DetectError::FrameDecode(format!(
                "ffmpeg 結束代碼 {status}"
            )));
        }
        if !status.success() {
            warn!("ffmpeg 影格讀取提前結束 ({status})，已讀取 {} 格", self.index);
        }
        Ok(None)
    }
}

impl FrameSource for FfmpegFrameSource {
    fn next_frame(&mut self) -> Result<Option<GrayFrame>, DetectError> {
        if self.finished {
            return Ok(None);
        }

        let mut buffer = vec![0_u8; self.plan.frame_bytes()];
        match self.stdout.read_exact(&mut buffer) {
            Ok(()) => {}
            // 結尾不完整的影格直接捨棄
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => return self.finish(),
            Err(e) => return Err(DetectError::FrameDecode(e.to_string())),
        }

        let image = GrayImage::from_raw(self.plan.width, self.plan.height, buffer)
            .ok_or_else(|| DetectError::FrameDecode("影格大小不符".to_string()))?;
        let frame = GrayFrame {
            timestamp: self.plan.timestamp_of(self.index),
            image,
        };
        self.index += 1;
        Ok(Some(frame))
    }
}

impl Drop for FfmpegFrameSource {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(width: u32, height: u32, frame_rate: f64, duration: f64) -> VideoInfo {
        VideoInfo {
            duration_seconds: duration,
            width,
            height,
            frame_rate,
            frame_count: None,
            has_audio: true,
        }
    }

    #[test]
    fn test_sampling_plan_step() {
        let plan = FrameSamplingPlan::new(&info(1920, 1080, 30.0, 120.0), 600.0, 320);
        assert_eq!(plan.frame_step, 15);
        assert!((plan.timestamp_of(4) - 2.0).abs() < 1e-9);
        assert_eq!(plan.expected_frames(), 240);
        assert_eq!((plan.width, plan.height), (320, 180));

        let slow = FrameSamplingPlan::new(&info(640, 480, 1.0, 10.0), 600.0, 320);
        assert_eq!(slow.frame_step, 1);
    }

    #[test]
    fn test_sampling_plan_respects_budget() {
        let plan = FrameSamplingPlan::new(&info(1280, 720, 24.0, 3600.0), 600.0, 320);
        assert!((plan.analysis_seconds - 600.0).abs() < 1e-9);
        assert_eq!(plan.frame_step, 12);
        assert_eq!(plan.expected_frames(), 1200);
    }

    #[test]
    fn test_scaled_dimensions_keep_small_frames() {
        assert_eq!(scaled_dimensions(200, 100, 320), (200, 100));
        assert_eq!(scaled_dimensions(1080, 1920, 320), (320, 568));
        assert_eq!(scaled_dimensions(321, 241, 320), (320, 240));
    }

    #[test]
    fn test_invalid_frame_rate_falls_back() {
        let plan = FrameSamplingPlan::new(&info(640, 360, 0.0, 10.0), 600.0, 320);
        assert_eq!(plan.frame_step, 15);
    }
}
