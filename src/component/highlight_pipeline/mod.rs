//! 精彩片段處理流程
//!
//! 背景執行「偵測 → 剪輯 → 字幕」，並在終端機顯示進度；
//! 處理中可用鍵盤暫停或停止。

mod controls;
mod main;
mod worker;

pub use controls::{KeyAction, KeyControls, handle_key};
pub use main::HighlightClipper;
pub use worker::{RunHandle, RunOutcome, RunRequest, RunServices, execute_run, spawn_run};
