use super::audio_energy::{ENERGY_WINDOW_SECONDS, compute_energy};
use super::backend::MediaBackend;
use super::error::DetectError;
use super::frame_reader::{ANALYSIS_MAX_WIDTH, FrameSamplingPlan};
use super::motion::MotionAnalyzer;
use super::optical_flow::FlowAnalyzer;
use super::peak_grouping::{MAX_PEAK_GAP_SECONDS, group_peaks, pool_peaks, rank_candidates};
use super::samples::{SignalSample, find_peaks};
use super::selection::{Moment, SelectionMode, SelectionPolicy, clamp_moments, select_moments};
use crate::config::ClipSettings;
use crate::tools::{LogLevel, PhaseProgress, ProgressSink, RunControl, RunStage, VideoInfo};
use std::path::Path;
use std::sync::Arc;

/// 每隔幾張取樣影格回報一次進度
const PROGRESS_EVERY_FRAMES: u64 = 10;

/// 偵測器設定
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorConfig {
    /// 只分析影片開頭這麼多秒的畫面
    pub analysis_duration: f64,
    pub selection: SelectionPolicy,
    pub audio_percentile: f64,
    pub motion_percentile: f64,
    pub flow_percentile: f64,
    pub max_peak_gap: f64,
    pub energy_window: f64,
    pub max_frame_width: u32,
}

impl DetectorConfig {
    #[must_use]
    pub fn from_settings(clip: &ClipSettings) -> Self {
        let mode = if clip.create_all_clips {
            SelectionMode::All
        } else {
            SelectionMode::Count(clip.clip_count)
        };

        Self {
            analysis_duration: clip.analysis_duration,
            selection: SelectionPolicy {
                mode,
                target_duration: clip.clip_duration,
                min_clip_duration: clip.min_clip_duration,
            },
            audio_percentile: 90.0,
            motion_percentile: 85.0,
            flow_percentile: 85.0,
            max_peak_gap: MAX_PEAK_GAP_SECONDS,
            energy_window: ENERGY_WINDOW_SECONDS,
            max_frame_width: ANALYSIS_MAX_WIDTH,
        }
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self::from_settings(&ClipSettings::default())
    }
}

/// 畫面走訪得到的兩種訊號
#[derive(Debug, Default)]
struct VisualSignals {
    motion: Vec<SignalSample>,
    flow: Vec<SignalSample>,
    stopped: bool,
}

/// 精彩時刻偵測器
///
/// 流程：
/// 1. 讀取影片資訊
/// 2. 音訊 RMS 能量
/// 3. 取樣影格的動作量與光流
/// 4. 各訊號取百分位門檻找峰值
/// 5. 合併峰值、分組、排序、選取、限制範圍
pub struct MomentDetector {
    backend: Arc<dyn MediaBackend>,
    config: DetectorConfig,
}

impl MomentDetector {
    pub fn new(backend: Arc<dyn MediaBackend>, config: DetectorConfig) -> Self {
        Self { backend, config }
    }

    #[must_use]
    pub const fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// 讀取並驗證影片資訊
    pub fn probe(&self, video_path: &Path) -> Result<VideoInfo, DetectError> {
        let info = self.backend.probe(video_path)?;
        if !info.duration_seconds.is_finite() || info.duration_seconds <= 0.0 {
            return Err(DetectError::InvalidDuration {
                path: video_path.to_path_buf(),
                duration: info.duration_seconds,
            });
        }
        Ok(info)
    }

    /// 偵測精彩時刻
    ///
    /// 收到停止要求時回傳空序列。暫存音訊寫在 `scratch_dir`，
    /// 目錄本身由呼叫端負責清理。
    pub fn detect(
        &self,
        video_path: &Path,
        scratch_dir: &Path,
        control: &RunControl,
        sink: &dyn ProgressSink,
    ) -> Result<Vec<Moment>, DetectError> {
        let phase = PhaseProgress::new(RunStage::Detecting);
        sink.progress(phase.percent(0.0), "讀取影片資訊");
        let info = self.probe(video_path)?;
        self.detect_probed(video_path, &info, scratch_dir, control, sink)
    }

    /// 與 [`MomentDetector::detect`] 相同，但使用已讀取的影片資訊
    pub fn detect_probed(
        &self,
        video_path: &Path,
        info: &VideoInfo,
        scratch_dir: &Path,
        control: &RunControl,
        sink: &dyn ProgressSink,
    ) -> Result<Vec<Moment>, DetectError> {
        let phase = PhaseProgress::new(RunStage::Detecting);
        sink.log(
            LogLevel::Info,
            &format!(
                "影片長度 {:.1}s，{}x{} @ {:.2} fps",
                info.duration_seconds, info.width, info.height, info.frame_rate
            ),
        );

        if control.checkpoint() {
            return Ok(Vec::new());
        }

        sink.progress(phase.percent(0.05), "分析音訊能量");
        let energy = self.audio_energy(video_path, scratch_dir, info, sink);

        if control.checkpoint() {
            return Ok(Vec::new());
        }

        let visual = self.visual_signals(video_path, info, control, sink, &phase);
        if visual.stopped {
            sink.log(LogLevel::Info, "偵測已停止");
            return Ok(Vec::new());
        }

        let audio_peaks = find_peaks(&energy, self.config.audio_percentile);
        let motion_peaks = find_peaks(&visual.motion, self.config.motion_percentile);
        let flow_peaks = find_peaks(&visual.flow, self.config.flow_percentile);
        sink.log(
            LogLevel::Debug,
            &format!(
                "峰值數量：音訊 {}、動作 {}、光流 {}",
                audio_peaks.len(),
                motion_peaks.len(),
                flow_peaks.len()
            ),
        );

        let pooled = pool_peaks(&[audio_peaks, motion_peaks, flow_peaks]);
        let groups = group_peaks(&pooled, self.config.max_peak_gap);
        let ranked = rank_candidates(groups);
        let selected = select_moments(&ranked, &self.config.selection, info.duration_seconds);
        let moments = clamp_moments(
            selected,
            info.duration_seconds,
            self.config.selection.target_duration,
        );

        sink.log(
            LogLevel::Info,
            &format!("候選群組 {} 個，選出 {} 個精彩時刻", ranked.len(), moments.len()),
        );
        sink.progress(phase.percent(1.0), "偵測完成");

        Ok(moments)
    }

    /// 音訊能量；擷取失敗只會降級為沒有音訊訊號
    fn audio_energy(
        &self,
        video_path: &Path,
        scratch_dir: &Path,
        info: &VideoInfo,
        sink: &dyn ProgressSink,
    ) -> Vec<SignalSample> {
        if !info.has_audio {
            sink.log(LogLevel::Info, "影片沒有音軌，只使用畫面訊號");
            return Vec::new();
        }

        match self.backend.extract_audio(video_path, scratch_dir) {
            Ok(audio) => compute_energy(&audio, self.config.energy_window),
            Err(e) => {
                sink.log(LogLevel::Warning, &format!("{e}，只使用畫面訊號"));
                Vec::new()
            }
        }
    }

    fn visual_signals(
        &self,
        video_path: &Path,
        info: &VideoInfo,
        control: &RunControl,
        sink: &dyn ProgressSink,
        phase: &PhaseProgress,
    ) -> VisualSignals {
        let plan = FrameSamplingPlan::new(
            info,
            self.config.analysis_duration,
            self.config.max_frame_width,
        );
        let expected = plan.expected_frames();
        let mut signals = VisualSignals::default();

        let mut frames = match self.backend.open_frames(video_path, plan) {
            Ok(frames) => frames,
            Err(e) => {
                sink.log(LogLevel::Warning, &format!("{e}，只使用音訊訊號"));
                return signals;
            }
        };

        let mut motion = MotionAnalyzer::new();
        let mut flow = FlowAnalyzer::new();
        let mut processed: u64 = 0;

        loop {
            if control.checkpoint() {
                signals.stopped = true;
                return signals;
            }

            let frame = match frames.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(e) => {
                    sink.log(LogLevel::Warning, &format!("{e}，畫面分析提前結束"));
                    break;
                }
            };

            if let Some(sample) = motion.push(&frame) {
                signals.motion.push(sample);
            }
            if let Some(sample) = flow.push(&frame) {
                signals.flow.push(sample);
            }

            processed += 1;
            if processed % PROGRESS_EVERY_FRAMES == 0 {
                let fraction = 0.1 + 0.85 * (processed as f64 / expected as f64).min(1.0);
                sink.progress(
                    phase.percent(fraction),
                    &format!("分析畫面 {:.0}s", frame.timestamp),
                );
            }
        }

        sink.log(
            LogLevel::Debug,
            &format!("已分析 {processed} 張取樣影格"),
        );
        signals
    }
}
