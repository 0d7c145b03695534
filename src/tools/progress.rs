//! 進度與日誌回報
//!
//! 工作執行緒透過 [`ProgressSink`] 同步回報；介面端只讀取 channel，
//! 不與工作執行緒共用可變狀態。

use log::{debug, error, info, warn};
use std::fmt;
use std::sync::Mutex;
use std::sync::mpsc::Sender;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        };
        write!(f, "{label}")
    }
}

/// 處理階段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    Detecting,
    Assembling,
    Captioning,
    Finished,
}

impl RunStage {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Detecting => "detecting",
            Self::Assembling => "assembling",
            Self::Captioning => "captioning",
            Self::Finished => "finished",
        }
    }

    /// 該階段在整體進度中佔用的區間（百分比）
    #[must_use]
    pub const fn band(&self) -> (f64, f64) {
        match self {
            Self::Detecting => (0.0, 33.33),
            Self::Assembling => (33.33, 66.66),
            Self::Captioning => (66.66, 100.0),
            Self::Finished => (100.0, 100.0),
        }
    }
}

/// 工作執行緒送往介面的事件
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    Stage(RunStage),
    Progress { percent: f64, message: String },
    Log { level: LogLevel, message: String },
}

/// 進度與日誌接收端
///
/// 實作必須快速返回，否則會拖慢整條處理流程。
pub trait ProgressSink: Send + Sync {
    fn stage(&self, stage: RunStage);
    fn progress(&self, percent: f64, message: &str);
    fn log(&self, level: LogLevel, message: &str);
}

fn forward_to_logger(level: LogLevel, message: &str) {
    match level {
        LogLevel::Debug => debug!("{message}"),
        LogLevel::Info => info!("{message}"),
        LogLevel::Warning => warn!("{message}"),
        LogLevel::Error => error!("{message}"),
    }
}

/// 只寫入 `log` 的接收端
#[derive(Debug, Default)]
pub struct LogSink;

impl ProgressSink for LogSink {
    fn stage(&self, stage: RunStage) {
        debug!("進入階段: {}", stage.as_str());
    }

    fn progress(&self, percent: f64, message: &str) {
        debug!("[{percent:5.1}%] {message}");
    }

    fn log(&self, level: LogLevel, message: &str) {
        forward_to_logger(level, message);
    }
}

/// 透過 channel 將事件送到介面端，同時寫入 `log`
///
/// 進度在同一階段內保證不遞減。
pub struct ChannelSink {
    sender: Sender<RunEvent>,
    last_percent: Mutex<f64>,
}

impl ChannelSink {
    #[must_use]
    pub const fn new(sender: Sender<RunEvent>) -> Self {
        Self {
            sender,
            last_percent: Mutex::new(0.0),
        }
    }
}

impl ProgressSink for ChannelSink {
    fn stage(&self, stage: RunStage) {
        let _ = self.sender.send(RunEvent::Stage(stage));
    }

    fn progress(&self, percent: f64, message: &str) {
        let percent = percent.clamp(0.0, 100.0);
        let percent = match self.last_percent.lock() {
            Ok(mut last) => {
                let monotonic = percent.max(*last);
                *last = monotonic;
                monotonic
            }
            Err(_) => percent,
        };

        let _ = self.sender.send(RunEvent::Progress {
            percent,
            message: message.to_string(),
        });
    }

    fn log(&self, level: LogLevel, message: &str) {
        forward_to_logger(level, message);
        let _ = self.sender.send(RunEvent::Log {
            level,
            message: message.to_string(),
        });
    }
}

/// 將階段內的完成比例換算為整體百分比
#[derive(Debug, Clone, Copy)]
pub struct PhaseProgress {
    start: f64,
    end: f64,
}

impl PhaseProgress {
    #[must_use]
    pub const fn new(stage: RunStage) -> Self {
        let (start, end) = stage.band();
        Self { start, end }
    }

    /// `fraction` 會被限制在 0..=1
    #[must_use]
    pub fn percent(&self, fraction: f64) -> f64 {
        self.start + (self.end - self.start) * fraction.clamp(0.0, 1.0)
    }
}
