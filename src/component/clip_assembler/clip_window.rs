/// 片段在原影片中的時間區間 `[start, end)`（秒）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipWindow {
    pub start: f64,
    pub end: f64,
}

impl ClipWindow {
    #[must_use]
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// 片段長度限制
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowLimits {
    pub target_duration: f64,
    pub min_duration: f64,
    pub max_duration: f64,
    /// 直式輸出時的平台長度上限
    pub duration_cap: Option<f64>,
}

impl WindowLimits {
    /// 目標長度限制在 `[min, max]` 之間
    #[must_use]
    pub fn effective_duration(&self) -> f64 {
        self.target_duration
            .max(self.min_duration)
            .min(self.max_duration)
    }
}

/// 以時刻為中心計算片段區間，並限制在影片範圍內
///
/// 超過長度上限時以時刻為中心重新取窗。區間為空時回傳 `None`。
#[must_use]
pub fn compute_window(moment: f64, video_duration: f64, limits: &WindowLimits) -> Option<ClipWindow> {
    let half = limits.effective_duration() / 2.0;
    let mut start = (moment - half).max(0.0);
    let mut end = (moment + half).min(video_duration);

    if let Some(cap) = limits.duration_cap.filter(|&cap| end - start > cap) {
        start = (moment - cap / 2.0).max(0.0);
        end = (start + cap).min(video_duration);
    }

    (end > start).then_some(ClipWindow { start, end })
}

/// `{prefix}_{ordinal:02}_{start}s-{end}s.mp4`，秒數無條件捨去
#[must_use]
pub fn clip_file_name(prefix: &str, ordinal: usize, window: &ClipWindow) -> String {
    format!(
        "{prefix}_{ordinal:02}_{}s-{}s.mp4",
        window.start.trunc() as u64,
        window.end.trunc() as u64
    )
}
