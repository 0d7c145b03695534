//! 字幕燒入元件
//!
//! 以 whisper.cpp 辨識片段語音，整理文字後燒入畫面。

mod main;
mod srt;
mod text_cleanup;
mod transcriber;

pub use main::CaptionBurner;
pub use srt::{SubtitleEntry, parse_srt, to_srt};
pub use text_cleanup::{correct_text, merge_entries, prepare_entries, wrap_lines};
pub use transcriber::{ModelCache, Transcriber, WhisperCliTranscriber};
