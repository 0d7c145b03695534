use super::clip_window::ClipWindow;
use super::ffmpeg_command::ClipEncodeCommand;
use crate::config::EncoderSettings;
use anyhow::{Context, Result, bail};
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};

/// 一個片段的輸出請求
#[derive(Debug, Clone, PartialEq)]
pub struct RenderRequest {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub window: ClipWindow,
    /// `None` 表示保留原始畫面
    pub filter_graph: Option<String>,
    pub encoder: EncoderSettings,
}

/// 片段輸出器
pub trait ClipRenderer: Send + Sync {
    /// 寫出片段；失敗時不得留下不完整的檔案
    fn render(&self, request: &RenderRequest) -> Result<()>;
}

/// 以 ffmpeg 子行程輸出 H.264/AAC MP4
#[derive(Debug, Default, Clone, Copy)]
pub struct FfmpegClipRenderer;

impl ClipRenderer for FfmpegClipRenderer {
    fn render(&self, request: &RenderRequest) -> Result<()> {
        let command = ClipEncodeCommand::new(
            &request.source,
            &request.destination,
            request.window,
            request.filter_graph.clone(),
            request.encoder.clone(),
        );
        debug!("輸出片段: {}", command.destination_path().display());

        let output = command
            .build_command()
            .output()
            .with_context(|| format!("無法執行 ffmpeg: {}", request.source.display()))?;

        if !output.status.success() {
            remove_partial_output(&request.destination);
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("ffmpeg 輸出失敗 ({}): {}", output.status, stderr.trim());
        }

        if !request.destination.exists() {
            bail!("輸出檔案未建立: {}", request.destination.display());
        }

        Ok(())
    }
}

/// 刪除失敗時留下的輸出檔
pub fn remove_partial_output(path: &Path) {
    if !path.exists() {
        return;
    }
    if let Err(e) = fs::remove_file(path) {
        warn!("無法刪除失敗的輸出檔 {}: {e}", path.display());
    }
}
