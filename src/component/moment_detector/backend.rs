use super::audio_energy::{ANALYSIS_SAMPLE_RATE, AudioBuffer, extract_audio_track, read_wav_mono};
use super::error::DetectError;
use super::frame_reader::{FfmpegFrameSource, FrameSamplingPlan, FrameSource};
use crate::tools::{VideoInfo, get_video_info};
use log::debug;
use std::fs;
use std::path::Path;

/// 偵測器取得媒體資料的介面
///
/// 正式環境使用 [`FfmpegBackend`]；測試可以換成合成資料。
pub trait MediaBackend: Send + Sync {
    fn probe(&self, video_path: &Path) -> Result<VideoInfo, DetectError>;

    /// 擷取整段音軌並轉為單聲道
    fn extract_audio(&self, video_path: &Path, scratch_dir: &Path)
    -> Result<AudioBuffer, DetectError>;

    fn open_frames(
        &self,
        video_path: &Path,
        plan: FrameSamplingPlan,
    ) -> Result<Box<dyn FrameSource>, DetectError>;
}

/// 透過 ffprobe / ffmpeg 子行程存取媒體
#[derive(Debug, Default, Clone, Copy)]
pub struct FfmpegBackend;

impl MediaBackend for FfmpegBackend {
    fn probe(&self, video_path: &Path) -> Result<VideoInfo, DetectError> {
        get_video_info(video_path).map_err(|e| DetectError::MediaOpen {
            path: video_path.to_path_buf(),
            reason: format!("{e:#}"),
        })
    }

    fn extract_audio(
        &self,
        video_path: &Path,
        scratch_dir: &Path,
    ) -> Result<AudioBuffer, DetectError> {
        let stem = video_path
            .file_stem()
            .map_or_else(|| "video".into(), |s| s.to_string_lossy());
        let wav_path = scratch_dir.join(format!("{stem}_analysis.wav"));

        extract_audio_track(video_path, &wav_path, ANALYSIS_SAMPLE_RATE)?;
        let audio = read_wav_mono(&wav_path);

        if let Err(e) = fs::remove_file(&wav_path) {
            debug!("無法刪除暫存音訊 {}: {e}", wav_path.display());
        }

        audio
    }

    fn open_frames(
        &self,
        video_path: &Path,
        plan: FrameSamplingPlan,
    ) -> Result<Box<dyn FrameSource>, DetectError> {
        let source = FfmpegFrameSource::spawn(video_path, plan)?;
        Ok(Box::new(source))
    }
}
