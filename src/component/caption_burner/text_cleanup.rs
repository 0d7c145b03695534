//! 字幕文字整理
//!
//! 語音辨識的輸出常有多餘空白與過短的片段，燒入前先整理：
//! 修正標點空白 → 合併相鄰短句 → 過濾長度不合理的段落 → 斷行。

use super::srt::SubtitleEntry;
use crate::config::CaptionSettings;
use regex::Regex;
use std::sync::LazyLock;

/// 兩段之間的間隔小於此值才合併
const MERGE_MAX_GAP_SECONDS: f64 = 0.5;

/// 合併後的文字長度上限（不含）
const MERGE_MAX_CHARS: usize = 60;

const ELLIPSIS: &str = "...";

static REGEX_WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("Invalid regex"));

static REGEX_SPACE_BEFORE_PUNCT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+([.,!?])").expect("Invalid regex"));

static REGEX_PUNCT_BEFORE_CAPITAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([.,!?])(\p{Lu})").expect("Invalid regex"));

/// 收斂空白並修正標點前後的空格
#[must_use]
pub fn correct_text(text: &str) -> String {
    let text = REGEX_WHITESPACE.replace_all(text, " ");
    let text = text.trim();
    let text = REGEX_SPACE_BEFORE_PUNCT.replace_all(text, "$1");
    REGEX_PUNCT_BEFORE_CAPITAL
        .replace_all(&text, "$1 $2")
        .into_owned()
}

fn ends_sentence(text: &str) -> bool {
    text.ends_with(['.', '!', '?'])
}

fn should_merge(previous: &SubtitleEntry, current: &SubtitleEntry) -> bool {
    let gap = current.start - previous.end;
    let combined = previous.text.chars().count() + 1 + current.text.chars().count();
    gap < MERGE_MAX_GAP_SECONDS && combined < MERGE_MAX_CHARS && !ends_sentence(&previous.text)
}

/// 修正文字並合併相鄰的短句
#[must_use]
pub fn merge_entries(entries: &[SubtitleEntry]) -> Vec<SubtitleEntry> {
    let mut merged: Vec<SubtitleEntry> = Vec::with_capacity(entries.len());

    for entry in entries {
        let current = SubtitleEntry {
            text: correct_text(&entry.text),
            ..entry.clone()
        };
        if current.text.is_empty() {
            continue;
        }

        match merged.last_mut() {
            Some(previous) if should_merge(previous, &current) => {
                previous.text = format!("{} {}", previous.text, current.text);
                previous.end = current.end;
            }
            _ => merged.push(current),
        }
    }

    merged
}

fn truncate_with_ellipsis(line: &str, max_chars: usize) -> String {
    let keep = max_chars.saturating_sub(ELLIPSIS.len());
    let mut cut: String = line.chars().take(keep).collect();
    cut.push_str(ELLIPSIS);
    cut
}

/// 以字為單位斷行
///
/// 超過 `max_lines` 行時，最後一行以 `...` 結尾。
#[must_use]
pub fn wrap_lines(text: &str, max_chars_per_line: usize, max_lines: usize) -> String {
    let max_chars = max_chars_per_line.max(ELLIPSIS.len() + 1);
    let max_lines = max_lines.max(1);
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let candidate_len = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if candidate_len <= max_chars || current.is_empty() {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }

    let overflow = lines.len() > max_lines;
    lines.truncate(max_lines);
    for line in &mut lines {
        if line.chars().count() > max_chars {
            *line = truncate_with_ellipsis(line, max_chars);
        }
    }
    if let Some(last) = lines.last_mut().filter(|_| overflow) {
        if last.chars().count() + ELLIPSIS.len() > max_chars {
            *last = truncate_with_ellipsis(last, max_chars);
        } else if !last.ends_with(ELLIPSIS) {
            last.push_str(ELLIPSIS);
        }
    }

    lines.join("\n")
}

/// 燒入前的完整整理流程
#[must_use]
pub fn prepare_entries(entries: &[SubtitleEntry], settings: &CaptionSettings) -> Vec<SubtitleEntry> {
    merge_entries(entries)
        .into_iter()
        .filter(|entry| {
            let duration = entry.duration();
            duration >= settings.min_segment_duration && duration <= settings.max_segment_duration
        })
        .map(|entry| SubtitleEntry {
            text: wrap_lines(&entry.text, settings.max_chars_per_line, settings.max_lines),
            ..entry
        })
        .collect()
}
