use super::srt::to_srt;
use super::text_cleanup::prepare_entries;
use super::transcriber::Transcriber;
use crate::component::clip_assembler::remove_partial_output;
use crate::component::moment_detector::extract_audio_track;
use crate::config::{CaptionSettings, EncoderSettings};
use crate::tools::{HexColor, get_video_info, parse_hex_color};
use anyhow::{Context, Result, bail};
use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

/// whisper 需要的取樣率
const SPEECH_SAMPLE_RATE: u32 = 16_000;

/// libass 對 SRT 使用的預設畫布高度
const ASS_PLAY_RES_Y: f64 = 288.0;

/// 字幕燒入器
///
/// 辨識語音 → 整理字幕 → 以 ffmpeg `subtitles` 濾鏡燒入，
/// 成功後以 `{stem}_with_subs.mp4` 取代原片段。
pub struct CaptionBurner {
    transcriber: Arc<dyn Transcriber>,
    settings: CaptionSettings,
    encoder: EncoderSettings,
}

impl CaptionBurner {
    pub fn new(
        transcriber: Arc<dyn Transcriber>,
        settings: CaptionSettings,
        encoder: EncoderSettings,
    ) -> Self {
        Self {
            transcriber,
            settings,
            encoder,
        }
    }

    /// 輸出路徑：與原片段同資料夾
    #[must_use]
    pub fn captioned_path(clip_path: &Path) -> PathBuf {
        let stem = clip_path
            .file_stem()
            .map_or_else(|| "clip".into(), |s| s.to_string_lossy());
        clip_path
            .parent()
            .unwrap_or(Path::new("."))
            .join(format!("{stem}_with_subs.mp4"))
    }

    /// 為單一片段加上字幕，回傳新檔案路徑
    pub fn burn(&self, clip_path: &Path, scratch_dir: &Path) -> Result<PathBuf> {
        let stem = clip_path
            .file_stem()
            .map_or_else(|| "clip".to_string(), |s| s.to_string_lossy().to_string());

        let wav_path = scratch_dir.join(format!("{stem}_speech.wav"));
        extract_audio_track(clip_path, &wav_path, SPEECH_SAMPLE_RATE)
            .context("無法擷取片段音訊")?;

        let raw = self
            .transcriber
            .transcribe(&wav_path, &scratch_dir.join(format!("{stem}_speech")))?;
        let entries = prepare_entries(&raw, &self.settings);
        debug!("辨識出 {} 段，整理後剩 {} 段", raw.len(), entries.len());
        if entries.is_empty() {
            bail!("沒有可用的字幕");
        }

        let srt_path = scratch_dir.join(format!("{stem}.srt"));
        fs::write(&srt_path, to_srt(&entries))
            .with_context(|| format!("無法寫入字幕檔: {}", srt_path.display()))?;

        let video_height = get_video_info(clip_path).map_or(1920, |info| info.height);
        let output_path = Self::captioned_path(clip_path);
        let filter = format!(
            "subtitles=filename='{}':force_style='{}'",
            escape_filter_path(&srt_path),
            self.force_style(video_height)
        );

        let output = self
            .build_command(clip_path, &filter, &output_path)
            .output()
            .context("無法執行 ffmpeg 燒入字幕")?;

        if !output.status.success() {
            remove_partial_output(&output_path);
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("字幕燒入失敗 ({}): {}", output.status, stderr.trim());
        }

        if let Err(e) = fs::remove_file(clip_path) {
            warn!("無法刪除原片段 {}: {e}", clip_path.display());
        }
        info!(
            "已加上 {} 段字幕: {}",
            entries.len(),
            output_path.display()
        );

        Ok(output_path)
    }

    fn build_command(&self, clip_path: &Path, filter: &str, output_path: &Path) -> Command {
        let mut cmd = Command::new("ffmpeg");
        cmd.args(["-hide_banner", "-nostdin", "-loglevel", "error", "-y", "-i"]);
        cmd.arg(clip_path);
        cmd.args([
            "-vf", filter,
            "-c:v", "libx264",
            "-preset", &self.encoder.preset,
            "-crf", &self.encoder.crf.to_string(),
            "-pix_fmt", "yuv420p",
            "-c:a", "copy",
            "-threads", &self.encoder.threads.to_string(),
            "-movflags", "+faststart",
        ]);
        cmd.arg(output_path);
        cmd
    }

    /// libass 樣式；字級與邊距依影片高度換算
    fn force_style(&self, video_height: u32) -> String {
        let scale = ASS_PLAY_RES_Y / f64::from(video_height.max(1));
        let color = |raw: &str, fallback: HexColor| {
            parse_hex_color(raw).unwrap_or_else(|e| {
                warn!("{e}，使用預設字幕顏色");
                fallback
            })
        };
        let primary = color(&self.settings.font_color, HexColor { r: 255, g: 255, b: 255 });
        let outline = color(&self.settings.stroke_color, HexColor::BLACK);

        format!(
            "FontName={},FontSize={:.0},PrimaryColour={},OutlineColour={},BorderStyle=1,Outline={},Shadow=0,Alignment=2,MarginV={:.0}",
            self.settings.font,
            (f64::from(self.settings.font_size) * scale).max(1.0),
            primary.to_ass(),
            outline.to_ass(),
            self.settings.stroke_width,
            f64::from(self.settings.margin) * scale
        )
    }
}

/// 濾鏡參數中的路徑跳脫
fn escape_filter_path(path: &Path) -> String {
    path.to_string_lossy()
        .replace('\\', "/")
        .replace(':', "\\:")
        .replace('\'', "'\\''")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::caption_burner::SubtitleEntry;

    struct NoSpeech;

    impl Transcriber for NoSpeech {
        fn transcribe(&self, _audio: &Path, _base: &Path) -> Result<Vec<SubtitleEntry>> {
            Ok(Vec::new())
        }
    }

    fn burner() -> CaptionBurner {
        CaptionBurner::new(
            Arc::new(NoSpeech),
            CaptionSettings::default(),
            EncoderSettings::default(),
        )
    }

    #[test]
    fn test_captioned_path() {
        assert_eq!(
            CaptionBurner::captioned_path(Path::new("/out/shorts_clip_01_49s-69s.mp4")),
            Path::new("/out/shorts_clip_01_49s-69s_with_subs.mp4")
        );
    }

    #[test]
    fn test_escape_filter_path() {
        assert_eq!(
            escape_filter_path(Path::new("C:\\tmp\\it's.srt")),
            "C\\:/tmp/it'\\''s.srt"
        );
        assert_eq!(escape_filter_path(Path::new("/tmp/a.srt")), "/tmp/a.srt");
    }

    #[test]
    fn test_force_style_scales_to_video_height() {
        let style = burner().force_style(1920);
        assert!(style.contains("FontName=Arial"));
        assert!(style.contains("FontSize=8,"));
        assert!(style.contains("PrimaryColour=&H00FFFFFF"));
        assert!(style.contains("OutlineColour=&H00000000"));
        assert!(style.contains("MarginV=18"));
    }

    #[test]
    fn test_burn_fails_without_audio_source() {
        let dir = tempfile::tempdir().unwrap();
        let result = burner().burn(&dir.path().join("missing.mp4"), dir.path());
        assert!(result.is_err());
    }
}
