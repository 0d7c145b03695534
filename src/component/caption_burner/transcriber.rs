use super::srt::{SubtitleEntry, parse_srt};
use crate::config::CaptionSettings;
use anyhow::{Context, Result, bail};
use log::debug;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Mutex;

/// 語音轉字幕
pub trait Transcriber: Send + Sync {
    /// `audio_path` 為 16 kHz WAV；`output_base` 為暫存輸出路徑（不含副檔名）
    fn transcribe(&self, audio_path: &Path, output_base: &Path) -> Result<Vec<SubtitleEntry>>;
}

/// 模型路徑快取，以 (模型, 語言) 為鍵
///
/// 鍵的數量受設定限制，因此不做淘汰。
#[derive(Debug)]
pub struct ModelCache {
    model_dir: PathBuf,
    entries: Mutex<HashMap<(String, String), PathBuf>>,
}

impl ModelCache {
    #[must_use]
    pub fn new(model_dir: &Path) -> Self {
        Self {
            model_dir: model_dir.to_path_buf(),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// 取得模型檔路徑；第一次查詢時檢查檔案是否存在
    pub fn resolve(&self, model: &str, language: &str) -> Result<PathBuf> {
        let key = (model.to_string(), language.to_string());
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| anyhow::anyhow!("模型快取鎖定失敗"))?;

        if let Some(path) = entries.get(&key) {
            return Ok(path.clone());
        }

        let path = self.model_dir.join(format!("ggml-{model}.bin"));
        if !path.is_file() {
            bail!("找不到 Whisper 模型: {}", path.display());
        }
        debug!("載入 Whisper 模型 {model} ({language}): {}", path.display());
        entries.insert(key, path.clone());
        Ok(path)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().map_or(0, |entries| entries.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 呼叫 whisper.cpp 命令列工具
#[derive(Debug)]
pub struct WhisperCliTranscriber {
    binary: String,
    model: String,
    language: String,
    cache: ModelCache,
}

impl WhisperCliTranscriber {
    #[must_use]
    pub fn new(settings: &CaptionSettings) -> Self {
        Self {
            binary: settings.whisper_binary.clone(),
            model: settings.model.clone(),
            language: settings.language.clone(),
            cache: ModelCache::new(&settings.model_dir),
        }
    }

    #[must_use]
    pub const fn cache(&self) -> &ModelCache {
        &self.cache
    }

    fn build_command(&self, model_path: &Path, audio_path: &Path, output_base: &Path) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("-m")
            .arg(model_path)
            .args(["-l", &self.language, "-osrt", "-np", "-of"])
            .arg(output_base)
            .arg("-f")
            .arg(audio_path);
        cmd
    }
}

impl Transcriber for WhisperCliTranscriber {
    fn transcribe(&self, audio_path: &Path, output_base: &Path) -> Result<Vec<SubtitleEntry>> {
        let model_path = self.cache.resolve(&self.model, &self.language)?;

        let output = self
            .build_command(&model_path, audio_path, output_base)
            .output()
            .with_context(|| format!("無法執行 {}", self.binary))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("語音辨識失敗 ({}): {}", output.status, stderr.trim());
        }

        let mut srt_path = output_base.as_os_str().to_owned();
        srt_path.push(".srt");
        let srt_path = PathBuf::from(srt_path);
        let content = fs::read_to_string(&srt_path)
            .with_context(|| format!("無法讀取字幕檔: {}", srt_path.display()))?;
        Ok(parse_srt(&content))
    }
}
