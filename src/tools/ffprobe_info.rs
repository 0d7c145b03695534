use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::path::Path;
use std::process::Command;

/// 影片基本資訊
#[derive(Debug, Clone, PartialEq)]
pub struct VideoInfo {
    pub duration_seconds: f64,
    pub width: u32,
    pub height: u32,
    pub frame_rate: f64,
    /// 容器回報的總幀數（部分格式沒有）
    pub frame_count: Option<u64>,
    pub has_audio: bool,
}

impl VideoInfo {
    /// 總幀數；容器沒有提供時以長度與幀率推算
    #[must_use]
    pub fn estimated_frame_count(&self) -> u64 {
        self.frame_count
            .unwrap_or_else(|| (self.duration_seconds * self.frame_rate).round().max(0.0) as u64)
    }
}

#[derive(Deserialize)]
struct FfprobeOutput {
    format: Option<FormatInfo>,
    streams: Option<Vec<StreamInfo>>,
}

#[derive(Deserialize)]
struct FormatInfo {
    duration: Option<String>,
}

#[derive(Deserialize)]
struct StreamInfo {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    nb_frames: Option<String>,
    duration: Option<String>,
}

/// 使用 ffprobe 取得影片資訊
pub fn get_video_info(path: &Path) -> Result<VideoInfo> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .output()
        .with_context(|| format!("無法執行 ffprobe: {}", path.display()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("ffprobe 執行失敗: {stderr}");
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    parse_ffprobe_output(&stdout).with_context(|| format!("無法解析影片資訊: {}", path.display()))
}

fn parse_ffprobe_output(json: &str) -> Result<VideoInfo> {
    let probe: FfprobeOutput =
        serde_json::from_str(json).with_context(|| "無法解析 ffprobe 輸出")?;

    let streams = probe.streams.unwrap_or_default();

    let video_stream = streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| anyhow::anyhow!("找不到視訊串流"))?;

    let has_audio = streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));

    let width = video_stream
        .width
        .ok_or_else(|| anyhow::anyhow!("無法取得影片寬度"))?;
    let height = video_stream
        .height
        .ok_or_else(|| anyhow::anyhow!("無法取得影片高度"))?;

    // 影片長度優先從 format 取得，其次從 stream
    let duration_seconds = probe
        .format
        .as_ref()
        .and_then(|f| f.duration.as_ref())
        .or(video_stream.duration.as_ref())
        .and_then(|d| d.parse::<f64>().ok())
        .ok_or_else(|| anyhow::anyhow!("無法取得影片長度"))?;

    // r_frame_rate 可能是 "0/0"，改用 avg_frame_rate
    let frame_rate = video_stream
        .r_frame_rate
        .as_ref()
        .and_then(|r| parse_frame_rate(r))
        .or_else(|| {
            video_stream
                .avg_frame_rate
                .as_ref()
                .and_then(|r| parse_frame_rate(r))
        })
        .unwrap_or(30.0);

    let frame_count = video_stream
        .nb_frames
        .as_ref()
        .and_then(|n| n.parse::<u64>().ok())
        .filter(|&n| n > 0);

    Ok(VideoInfo {
        duration_seconds,
        width,
        height,
        frame_rate,
        frame_count,
        has_audio,
    })
}

/// 解析幀率字串（例如 "30/1" 或 "30000/1001"）
fn parse_frame_rate(rate: &str) -> Option<f64> {
    if let Some((num_str, den_str)) = rate.split_once('/') {
        let num: f64 = num_str.parse().ok()?;
        let den: f64 = den_str.parse().ok()?;
        if den > 0.0 && num > 0.0 {
            return Some(num / den);
        }
        return None;
    }
    rate.parse().ok().filter(|&r: &f64| r > 0.0)
}
