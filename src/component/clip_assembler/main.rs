use super::clip_window::{ClipWindow, WindowLimits, clip_file_name, compute_window};
use super::reframe::{Canvas, VerticalLayout, normalize_blur_kernel};
use super::renderer::{ClipRenderer, RenderRequest};
use crate::component::moment_detector::{Moment, SelectionMode};
use crate::config::{EncoderSettings, UserSettings};
use crate::tools::{
    HexColor, LogLevel, PhaseProgress, ProgressSink, RunControl, RunStage, VideoInfo,
    parse_hex_color,
};
use log::warn;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// 視為同一時刻的誤差
const SAME_MOMENT_EPSILON: f64 = 1e-6;

/// 片段組裝設定（執行開始時由使用者設定建立）
#[derive(Debug, Clone, PartialEq)]
pub struct AssemblySettings {
    pub mode: SelectionMode,
    pub limits: WindowLimits,
    /// `None` 表示保留原始比例
    pub vertical: Option<VerticalLayout>,
    pub encoder: EncoderSettings,
}

impl AssemblySettings {
    #[must_use]
    pub fn from_settings(settings: &UserSettings) -> Self {
        let clip = &settings.clip;
        let frame = &settings.frame;

        let mode = if clip.create_all_clips {
            SelectionMode::All
        } else {
            SelectionMode::Count(clip.clip_count)
        };

        let color = parse_hex_color(&frame.border_color).unwrap_or_else(|e| {
            warn!("{e}，改用黑色邊框");
            HexColor::BLACK
        });

        let vertical = clip.vertical.then(|| VerticalLayout {
            canvas: Canvas {
                width: frame.canvas_width,
                height: frame.canvas_height,
            },
            style: frame.border_style,
            color,
            border_width: frame.border_width,
            blur_kernel: normalize_blur_kernel(frame.blur_strength),
        });

        Self {
            mode,
            limits: WindowLimits {
                target_duration: clip.clip_duration,
                min_duration: clip.min_clip_duration,
                max_duration: clip.max_clip_duration,
                duration_cap: clip.vertical.then_some(clip.vertical_duration_cap),
            },
            vertical,
            encoder: settings.encoder.clone(),
        }
    }
}

/// 已寫出的片段
#[derive(Debug, Clone, PartialEq)]
pub struct Clip {
    pub ordinal: usize,
    /// 來源時刻（秒）
    pub moment: f64,
    pub window: ClipWindow,
    pub path: PathBuf,
}

/// 片段組裝器
///
/// 依輸入順序處理每個時刻：計算區間 → 產生濾鏡 → 輸出檔案。
/// 單一片段失敗只記錄並跳過。
pub struct ClipAssembler {
    renderer: Arc<dyn ClipRenderer>,
    settings: AssemblySettings,
}

impl ClipAssembler {
    pub fn new(renderer: Arc<dyn ClipRenderer>, settings: AssemblySettings) -> Self {
        Self { renderer, settings }
    }

    /// 組裝所有片段；收到停止要求時回傳已完成的部分
    pub fn assemble(
        &self,
        video_path: &Path,
        info: &VideoInfo,
        moments: &[Moment],
        output_dir: &Path,
        control: &RunControl,
        sink: &dyn ProgressSink,
    ) -> Vec<Clip> {
        let phase = PhaseProgress::new(RunStage::Assembling);
        let prefix = self.settings.mode.file_prefix();
        let filter_graph = self
            .settings
            .vertical
            .map(|layout| layout.filter_graph(info.width, info.height));

        let total = moments.len();
        let mut clips = Vec::with_capacity(total);
        let mut used: Vec<f64> = Vec::with_capacity(total);

        for (index, moment) in moments.iter().enumerate() {
            if control.checkpoint() {
                sink.log(LogLevel::Info, "片段輸出已停止");
                break;
            }

            let ordinal = index + 1;
            let fraction = ordinal as f64 / total as f64;

            if used
                .iter()
                .any(|&t| (t - moment.timestamp).abs() < SAME_MOMENT_EPSILON)
            {
                sink.log(
                    LogLevel::Debug,
                    &format!("略過重複時刻 {:.2}s", moment.timestamp),
                );
                sink.progress(phase.percent(fraction), "略過重複片段");
                continue;
            }
            used.push(moment.timestamp);

            let Some(window) =
                compute_window(moment.timestamp, info.duration_seconds, &self.settings.limits)
            else {
                sink.log(
                    LogLevel::Warning,
                    &format!("時刻 {:.2}s 的片段區間為空，略過", moment.timestamp),
                );
                sink.progress(phase.percent(fraction), "略過空白片段");
                continue;
            };

            let path = output_dir.join(clip_file_name(prefix, ordinal, &window));
            let request = RenderRequest {
                source: video_path.to_path_buf(),
                destination: path.clone(),
                window,
                filter_graph: filter_graph.clone(),
                encoder: self.settings.encoder.clone(),
            };

            match self.renderer.render(&request) {
                Ok(()) => {
                    sink.log(
                        LogLevel::Info,
                        &format!(
                            "已建立片段 {ordinal}/{total}: {:.1}s - {:.1}s",
                            window.start, window.end
                        ),
                    );
                    clips.push(Clip {
                        ordinal,
                        moment: moment.timestamp,
                        window,
                        path,
                    });
                }
                Err(e) => {
                    sink.log(
                        LogLevel::Error,
                        &format!("片段 {ordinal}/{total} 輸出失敗: {e:#}"),
                    );
                }
            }

            sink.progress(
                phase.percent(fraction),
                &format!("片段 {ordinal}/{total}"),
            );
        }

        clips
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BorderStyle;
    use crate::tools::LogSink;
    use anyhow::bail;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingRenderer {
        requests: Mutex<Vec<RenderRequest>>,
        fail_ordinals: Vec<usize>,
    }

    impl ClipRenderer for RecordingRenderer {
        fn render(&self, request: &RenderRequest) -> anyhow::Result<()> {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request.clone());
            if self.fail_ordinals.contains(&requests.len()) {
                bail!("encoder crashed");
            }
            Ok(())
        }
    }

    fn info(duration: f64) -> VideoInfo {
        VideoInfo {
            duration_seconds: duration,
            width: 1920,
            height: 1080,
            frame_rate: 30.0,
            frame_count: None,
            has_audio: true,
        }
    }

    fn moment(timestamp: f64) -> Moment {
        Moment {
            timestamp,
            intensity: 3,
            span: 3.0,
        }
    }

    fn settings(vertical: bool) -> AssemblySettings {
        let mut user = UserSettings::default();
        user.clip.clip_duration = 20.0;
        user.clip.vertical = vertical;
        AssemblySettings::from_settings(&user)
    }

    #[test]
    fn test_assembles_in_input_order() {
        let renderer = Arc::new(RecordingRenderer::default());
        let assembler = ClipAssembler::new(renderer.clone(), settings(false));

        let clips = assembler.assemble(
            Path::new("/v/in.mp4"),
            &info(300.0),
            &[moment(200.0), moment(59.75)],
            Path::new("/out"),
            &RunControl::default(),
            &LogSink,
        );

        assert_eq!(clips.len(), 2);
        assert_eq!(clips[0].path, Path::new("/out/shorts_clip_01_190s-210s.mp4"));
        assert_eq!(clips[1].path, Path::new("/out/shorts_clip_02_49s-69s.mp4"));
        let requests = renderer.requests.lock().unwrap();
        assert!(requests.iter().all(|r| r.filter_graph.is_none()));
    }

    #[test]
    fn test_vertical_uses_filter_graph() {
        let renderer = Arc::new(RecordingRenderer::default());
        let assembler = ClipAssembler::new(renderer.clone(), settings(true));
        assembler.assemble(
            Path::new("in.mp4"),
            &info(120.0),
            &[moment(60.0)],
            Path::new("out"),
            &RunControl::default(),
            &LogSink,
        );

        let requests = renderer.requests.lock().unwrap();
        let graph = requests[0].filter_graph.as_deref().unwrap();
        assert!(graph.contains("pad=1080:1920"));
    }

    #[test]
    fn test_duplicate_moments_are_skipped() {
        let renderer = Arc::new(RecordingRenderer::default());
        let assembler = ClipAssembler::new(renderer.clone(), settings(false));
        let clips = assembler.assemble(
            Path::new("in.mp4"),
            &info(120.0),
            &[moment(30.0), moment(30.0), moment(90.0)],
            Path::new("out"),
            &RunControl::default(),
            &LogSink,
        );

        assert_eq!(clips.len(), 2);
        assert_eq!(renderer.requests.lock().unwrap().len(), 2);
        assert_eq!(clips[1].ordinal, 3);
    }

    #[test]
    fn test_failed_clip_is_skipped() {
        let renderer = Arc::new(RecordingRenderer {
            fail_ordinals: vec![1],
            ..RecordingRenderer::default()
        });
        let assembler = ClipAssembler::new(renderer, settings(false));
        let clips = assembler.assemble(
            Path::new("in.mp4"),
            &info(120.0),
            &[moment(20.0), moment(80.0)],
            Path::new("out"),
            &RunControl::default(),
            &LogSink,
        );

        assert_eq!(clips.len(), 1);
        assert!((clips[0].moment - 80.0).abs() < 1e-9);
    }

    #[test]
    fn test_stop_returns_partial() {
        let renderer = Arc::new(RecordingRenderer::default());
        let assembler = ClipAssembler::new(renderer.clone(), settings(false));
        let control = RunControl::default();
        control.request_stop();

        let clips = assembler.assemble(
            Path::new("in.mp4"),
            &info(120.0),
            &[moment(20.0), moment(80.0)],
            Path::new("out"),
            &control,
            &LogSink,
        );
        assert!(clips.is_empty());
        assert!(renderer.requests.lock().unwrap().is_empty());
    }

    #[test]
    fn test_settings_from_user_settings() {
        let mut user = UserSettings::default();
        user.clip.create_all_clips = true;
        user.frame.border_style = BorderStyle::Blur;
        user.frame.border_color = "not a color".to_string();
        user.frame.blur_strength = 40;

        let settings = AssemblySettings::from_settings(&user);
        assert_eq!(settings.mode, SelectionMode::All);
        let layout = settings.vertical.unwrap();
        assert_eq!(layout.color, HexColor::BLACK);
        assert_eq!(layout.blur_kernel, 41);
        assert_eq!(settings.limits.duration_cap, Some(59.0));
    }
}
