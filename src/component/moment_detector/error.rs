use std::path::PathBuf;
use thiserror::Error;

/// 偵測階段的錯誤
///
/// `MediaOpen` 與 `InvalidDuration` 會中止整次執行；
/// `AudioExtraction` 與 `FrameDecode` 只會降級為較少訊號的偵測。
#[derive(Debug, Error)]
pub enum DetectError {
    #[error("無法開啟影片 {}: {reason}", .path.display())]
    MediaOpen { path: PathBuf, reason: String },

    #[error("影片長度無效 ({duration}s): {}", .path.display())]
    InvalidDuration { path: PathBuf, duration: f64 },

    #[error("音訊擷取失敗: {0}")]
    AudioExtraction(String),

    #[error("影格解碼失敗: {0}")]
    FrameDecode(String),
}

impl DetectError {
    /// 是否應中止整次執行
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::MediaOpen { .. } | Self::InvalidDuration { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        let open = DetectError::MediaOpen {
            path: PathBuf::from("/v.mp4"),
            reason: "no video stream".to_string(),
        };
        assert!(open.is_fatal());
        assert!(open.to_string().contains("/v.mp4"));

        assert!(!DetectError::AudioExtraction("ffmpeg exited 1".to_string()).is_fatal());
        assert!(!DetectError::FrameDecode("broken pipe".to_string()).is_fatal());
    }
}
