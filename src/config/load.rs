use crate::config::types::{Config, UserSettings, VideoExtensionTable};
use anyhow::{Context, Result};
use log::warn;
use std::fs;
use std::path::Path;

/// 編譯時嵌入的影片副檔名表（不需要外部檔案）
const VIDEO_EXTENSIONS_JSON: &str = include_str!("../data/video_extensions.json");

/// 設定檔位置（目前工作目錄）
pub const SETTINGS_FILE: &str = "settings.json";

impl Config {
    pub fn new() -> Result<Self> {
        let extension_table = Self::embedded_extension_table()?;
        let settings = match Self::load_settings(Path::new(SETTINGS_FILE)) {
            Ok(settings) => settings,
            Err(e) => {
                warn!("設定檔讀取失敗，改用預設值: {e:#}");
                UserSettings::default()
            }
        };

        Ok(Self {
            extension_table,
            settings,
        })
    }

    pub fn load_settings(path: &Path) -> Result<UserSettings> {
        if !path.exists() {
            return Ok(UserSettings::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse settings from {}", path.display()))
    }

    /// 從編譯時嵌入的 JSON 載入影片副檔名表
    pub fn embedded_extension_table() -> Result<VideoExtensionTable> {
        serde_json::from_str(VIDEO_EXTENSIONS_JSON).context("無法解析嵌入的影片副檔名設定")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_extension_table() {
        let table = Config::embedded_extension_table().unwrap();
        assert!(table.is_video_file(Path::new("movie.mp4")));
        assert!(table.is_video_file(Path::new("movie.webm")));
    }

    #[test]
    fn test_load_settings_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Config::load_settings(&dir.path().join("settings.json")).unwrap();
        assert_eq!(settings, UserSettings::default());
    }

    #[test]
    fn test_load_settings_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(Config::load_settings(&path).is_err());
    }
}
