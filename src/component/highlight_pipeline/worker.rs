//! 背景執行
//!
//! 一次執行只有一條工作執行緒，依序跑「偵測 → 剪輯 → 字幕」。
//! 進度與日誌透過 channel 送回介面端；停止與暫停只透過原子旗標傳遞。

use crate::component::caption_burner::{CaptionBurner, Transcriber, WhisperCliTranscriber};
use crate::component::clip_assembler::{
    AssemblySettings, Clip, ClipAssembler, ClipRenderer, FfmpegClipRenderer,
};
use crate::component::moment_detector::{
    DetectorConfig, FfmpegBackend, MediaBackend, MomentDetector,
};
use crate::config::UserSettings;
use crate::tools::{
    ChannelSink, LogLevel, PhaseProgress, ProgressSink, RunControl, RunEvent, RunStage,
};
use anyhow::{Context, Result};
use log::{debug, error, warn};
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};
use uuid::Uuid;

/// 一次處理的輸入；設定在開始時複製一份
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub video_path: PathBuf,
    pub output_dir: PathBuf,
    pub settings: UserSettings,
}

/// 執行結果
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Completed { clips: Vec<Clip> },
    /// 影片可以讀取，但沒有找到任何精彩時刻
    NothingFound,
    Stopped { clips: Vec<Clip> },
    Failed { error: String },
}

impl RunOutcome {
    #[must_use]
    pub fn clips(&self) -> &[Clip] {
        match self {
            Self::Completed { clips } | Self::Stopped { clips } => clips,
            Self::NothingFound | Self::Failed { .. } => &[],
        }
    }
}

/// 執行所需的外部協作者
#[derive(Clone)]
pub struct RunServices {
    pub backend: Arc<dyn MediaBackend>,
    pub renderer: Arc<dyn ClipRenderer>,
    /// `None` 時略過字幕階段
    pub transcriber: Option<Arc<dyn Transcriber>>,
}

impl RunServices {
    /// 以 ffmpeg / whisper.cpp 建立
    #[must_use]
    pub fn ffmpeg(settings: &UserSettings) -> Self {
        let transcriber: Option<Arc<dyn Transcriber>> = settings
            .caption
            .enabled
            .then(|| Arc::new(WhisperCliTranscriber::new(&settings.caption)) as Arc<dyn Transcriber>);

        Self {
            backend: Arc::new(FfmpegBackend),
            renderer: Arc::new(FfmpegClipRenderer),
            transcriber,
        }
    }
}

/// 每次執行專用的暫存目錄，drop 時刪除
struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    fn create(output_dir: &Path) -> Result<Self> {
        let path = output_dir.join(format!(".tmp_{}", Uuid::new_v4()));
        fs::create_dir_all(&path)
            .with_context(|| format!("無法建立暫存目錄: {}", path.display()))?;
        Ok(Self { path })
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if self.path.exists() && fs::remove_dir_all(&self.path).is_err() {
            warn!("無法清理暫存目錄: {}", self.path.display());
        }
    }
}

/// 在目前執行緒完成一次處理
pub fn execute_run(
    request: &RunRequest,
    services: &RunServices,
    control: &RunControl,
    sink: &dyn ProgressSink,
) -> RunOutcome {
    sink.stage(RunStage::Detecting);

    let scratch = match ScratchDir::create(&request.output_dir) {
        Ok(scratch) => scratch,
        Err(e) => {
            sink.log(LogLevel::Error, &format!("{e:#}"));
            return RunOutcome::Failed {
                error: format!("{e:#}"),
            };
        }
    };
    debug!("暫存目錄: {}", scratch.path.display());

    let outcome = run_stages(request, services, control, sink, &scratch.path);
    drop(scratch);

    sink.stage(RunStage::Finished);
    if matches!(outcome, RunOutcome::Completed { .. }) {
        sink.progress(100.0, "完成");
    }
    outcome
}

fn run_stages(
    request: &RunRequest,
    services: &RunServices,
    control: &RunControl,
    sink: &dyn ProgressSink,
    scratch_dir: &Path,
) -> RunOutcome {
    let settings = &request.settings;
    let video_path = request.video_path.as_path();

    let detector = MomentDetector::new(
        Arc::clone(&services.backend),
        DetectorConfig::from_settings(&settings.clip),
    );

    let detected = detector
        .probe(video_path)
        .and_then(|info| {
            detector
                .detect_probed(video_path, &info, scratch_dir, control, sink)
                .map(|moments| (info, moments))
        });
    let (info, moments) = match detected {
        Ok(result) => result,
        Err(e) => {
            sink.log(LogLevel::Error, &e.to_string());
            return RunOutcome::Failed {
                error: e.to_string(),
            };
        }
    };

    if control.is_stop_requested() {
        return RunOutcome::Stopped { clips: Vec::new() };
    }
    if moments.is_empty() {
        sink.log(LogLevel::Warning, "沒有找到精彩時刻");
        return RunOutcome::NothingFound;
    }

    sink.stage(RunStage::Assembling);
    let assembler = ClipAssembler::new(
        Arc::clone(&services.renderer),
        AssemblySettings::from_settings(settings),
    );
    let mut clips = assembler.assemble(
        video_path,
        &info,
        &moments,
        &request.output_dir,
        control,
        sink,
    );

    if control.is_stop_requested() {
        return RunOutcome::Stopped { clips };
    }
    if clips.is_empty() {
        return RunOutcome::Failed {
            error: "所有片段都輸出失敗".to_string(),
        };
    }

    if let Some(transcriber) = services.transcriber.as_ref().filter(|_| settings.caption.enabled) {
        sink.stage(RunStage::Captioning);
        let burner = CaptionBurner::new(
            Arc::clone(transcriber),
            settings.caption.clone(),
            settings.encoder.clone(),
        );
        caption_clips(&burner, &mut clips, scratch_dir, control, sink);

        if control.is_stop_requested() {
            return RunOutcome::Stopped { clips };
        }
    }

    RunOutcome::Completed { clips }
}

/// 逐一加上字幕；失敗時保留原片段
fn caption_clips(
    burner: &CaptionBurner,
    clips: &mut [Clip],
    scratch_dir: &Path,
    control: &RunControl,
    sink: &dyn ProgressSink,
) {
    let phase = PhaseProgress::new(RunStage::Captioning);
    let total = clips.len();

    for (index, clip) in clips.iter_mut().enumerate() {
        if control.checkpoint() {
            sink.log(LogLevel::Info, "字幕處理已停止");
            return;
        }

        match burner.burn(&clip.path, scratch_dir) {
            Ok(path) => {
                sink.log(
                    LogLevel::Info,
                    &format!("已加上字幕: {}", path.display()),
                );
                clip.path = path;
            }
            Err(e) => {
                sink.log(
                    LogLevel::Warning,
                    &format!("字幕失敗，保留原片段 {}: {e:#}", clip.path.display()),
                );
            }
        }

        sink.progress(
            phase.percent((index + 1) as f64 / total as f64),
            &format!("字幕 {}/{total}", index + 1),
        );
    }
}

/// 執行中的背景工作
pub struct RunHandle {
    events: Receiver<RunEvent>,
    control: RunControl,
    join: JoinHandle<RunOutcome>,
}

impl RunHandle {
    #[must_use]
    pub const fn events(&self) -> &Receiver<RunEvent> {
        &self.events
    }

    #[must_use]
    pub const fn control(&self) -> &RunControl {
        &self.control
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// 等待結束；工作執行緒 panic 時回傳 `Failed`
    pub fn wait(self) -> RunOutcome {
        self.join.join().unwrap_or_else(|_| {
            error!("工作執行緒異常結束");
            RunOutcome::Failed {
                error: "工作執行緒異常結束".to_string(),
            }
        })
    }
}

/// 在背景執行緒啟動一次處理
pub fn spawn_run(request: RunRequest, services: RunServices, control: RunControl) -> RunHandle {
    let (sender, events) = mpsc::channel();
    let worker_control = control.clone();

    let join = thread::spawn(move || {
        let sink = ChannelSink::new(sender);
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            execute_run(&request, &services, &worker_control, &sink)
        }));
        result.unwrap_or_else(|_| {
            sink.log(LogLevel::Error, "處理過程發生未預期的錯誤");
            RunOutcome::Failed {
                error: "處理過程發生未預期的錯誤".to_string(),
            }
        })
    });

    RunHandle {
        events,
        control,
        join,
    }
}
