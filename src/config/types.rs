use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

/// 最近使用路徑的保留數量
pub const MAX_RECENT_PATHS: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoExtensionTable {
    #[serde(rename = "VIDEO_FILE")]
    pub video_file: Vec<String>,
}

impl VideoExtensionTable {
    #[must_use]
    pub fn video_extensions_set(&self) -> HashSet<String> {
        self.video_file
            .iter()
            .map(|ext| ext.to_lowercase())
            .collect()
    }

    #[must_use]
    pub fn is_video_file(&self, path: &Path) -> bool {
        let video_extensions = self.video_extensions_set();
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| video_extensions.contains(&format!(".{}", ext.to_lowercase())))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Language {
    #[default]
    #[serde(rename = "en-US")]
    EnUs,
    #[serde(rename = "zh-TW")]
    ZhTw,
}

impl Language {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::EnUs => "en-US",
            Self::ZhTw => "zh-TW",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EnUs => write!(f, "English"),
            Self::ZhTw => write!(f, "繁體中文"),
        }
    }
}

/// 直式畫面的邊框樣式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BorderStyle {
    /// 置中裁切成 9:16
    None,
    /// 等比縮放後以純色補邊
    #[default]
    Solid,
    /// 等比縮放後以模糊的同一段影片當背景
    Blur,
}

impl fmt::Display for BorderStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Solid => write!(f, "solid"),
            Self::Blur => write!(f, "blur"),
        }
    }
}

/// 片段選取與長度設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipSettings {
    /// 要產生的片段數（`create_all_clips` 為 true 時忽略）
    pub clip_count: usize,
    /// 產生所有合格片段
    pub create_all_clips: bool,
    /// 目標片段長度（秒）
    pub clip_duration: f64,
    /// 最短片段長度；同時是峰值群組的最小跨度
    pub min_clip_duration: f64,
    pub max_clip_duration: f64,
    /// 只分析影片開頭這麼多秒
    pub analysis_duration: f64,
    /// 轉成直式畫面
    pub vertical: bool,
    /// 直式短影音平台的長度上限（秒）
    pub vertical_duration_cap: f64,
}

impl Default for ClipSettings {
    fn default() -> Self {
        Self {
            clip_count: 5,
            create_all_clips: false,
            clip_duration: 25.0,
            min_clip_duration: 3.0,
            max_clip_duration: 45.0,
            analysis_duration: 600.0,
            vertical: true,
            vertical_duration_cap: 59.0,
        }
    }
}

/// 直式畫面邊框設定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameSettings {
    pub border_style: BorderStyle,
    /// `#RRGGBB`
    pub border_color: String,
    /// 前景與畫布邊緣的最小距離（像素）
    pub border_width: u32,
    /// 高斯模糊核大小，會被修正為 1..=99 的奇數
    pub blur_strength: i32,
    pub canvas_width: u32,
    pub canvas_height: u32,
}

impl Default for FrameSettings {
    fn default() -> Self {
        Self {
            border_style: BorderStyle::Solid,
            border_color: "#000000".to_string(),
            border_width: 0,
            blur_strength: 51,
            canvas_width: 1080,
            canvas_height: 1920,
        }
    }
}

/// 輸出編碼設定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderSettings {
    pub threads: usize,
    /// x264 CRF（越小品質越高）
    pub crf: u8,
    pub preset: String,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            threads: 4,
            crf: 23,
            preset: "medium".to_string(),
        }
    }
}

/// 字幕設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptionSettings {
    pub enabled: bool,
    /// whisper.cpp 執行檔
    pub whisper_binary: String,
    /// 放置 `ggml-<model>.bin` 的資料夾
    pub model_dir: PathBuf,
    pub model: String,
    /// 語言代碼，`auto` 表示自動偵測
    pub language: String,
    pub font: String,
    pub font_size: u32,
    pub font_color: String,
    pub stroke_color: String,
    pub stroke_width: u32,
    /// 字幕與底部的距離
    pub margin: u32,
    pub max_chars_per_line: usize,
    pub max_lines: usize,
    pub min_segment_duration: f64,
    pub max_segment_duration: f64,
}

impl Default for CaptionSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            whisper_binary: "whisper-cli".to_string(),
            model_dir: PathBuf::from("models"),
            model: "base".to_string(),
            language: "auto".to_string(),
            font: "Arial".to_string(),
            font_size: 52,
            font_color: "#FFFFFF".to_string(),
            stroke_color: "#000000".to_string(),
            stroke_width: 3,
            margin: 120,
            max_chars_per_line: 30,
            max_lines: 2,
            min_segment_duration: 0.3,
            max_segment_duration: 15.0,
        }
    }
}

/// 使用者設定（settings.json）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct UserSettings {
    pub language: Language,
    pub output_directory: Option<PathBuf>,
    pub clip: ClipSettings,
    pub frame: FrameSettings,
    pub encoder: EncoderSettings,
    pub caption: CaptionSettings,
    pub recent_paths: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub extension_table: VideoExtensionTable,
    pub settings: UserSettings,
}
