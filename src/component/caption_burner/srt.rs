use regex::Regex;
use std::fmt::Write as _;
use std::sync::LazyLock;

/// 一段字幕
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleEntry {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl SubtitleEntry {
    #[must_use]
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

static REGEX_TIMING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(\d+):(\d{2}):(\d{2})[,.](\d{1,3})\s*-->\s*(\d+):(\d{2}):(\d{2})[,.](\d{1,3})",
    )
    .expect("Invalid regex")
});

fn seconds_from(caps: &regex::Captures<'_>, offset: usize) -> Option<f64> {
    let field = |i: usize| caps.get(offset + i).map(|m| m.as_str());
    let hours: f64 = field(1)?.parse().ok()?;
    let minutes: f64 = field(2)?.parse().ok()?;
    let seconds: f64 = field(3)?.parse().ok()?;
    let fraction = field(4)?;
    let millis: f64 = format!("{fraction:0<3}").parse().ok()?;
    Some(hours * 3600.0 + minutes * 60.0 + seconds + millis / 1000.0)
}

/// 解析 SRT 內容；格式錯誤的區塊直接略過
#[must_use]
pub fn parse_srt(content: &str) -> Vec<SubtitleEntry> {
    let normalized = content.replace("\r\n", "\n");
    let mut entries = Vec::new();

    for block in normalized.split("\n\n") {
        let mut lines = block.lines().skip_while(|line| line.trim().is_empty());
        let mut timing = None;
        let mut text_lines = Vec::new();

        for line in lines.by_ref() {
            if timing.is_none() {
                if let Some(caps) = REGEX_TIMING.captures(line) {
                    timing = seconds_from(&caps, 0).zip(seconds_from(&caps, 4));
                }
                continue;
            }
            let trimmed = line.trim();
            if !trimmed.is_empty() {
                text_lines.push(trimmed);
            }
        }

        if let Some((start, end)) = timing {
            let text = text_lines.join(" ");
            if !text.is_empty() && end > start {
                entries.push(SubtitleEntry { start, end, text });
            }
        }
    }

    entries
}

fn format_timestamp(seconds: f64) -> String {
    let total_millis = (seconds.max(0.0) * 1000.0).round() as u64;
    let millis = total_millis % 1000;
    let total_seconds = total_millis / 1000;
    format!(
        "{:02}:{:02}:{:02},{millis:03}",
        total_seconds / 3600,
        (total_seconds % 3600) / 60,
        total_seconds % 60
    )
}

/// 輸出 SRT，序號從 1 開始
#[must_use]
pub fn to_srt(entries: &[SubtitleEntry]) -> String {
    let mut output = String::new();
    for (index, entry) in entries.iter().enumerate() {
        let _ = write!(
            output,
            "{}\n{} --> {}\n{}\n\n",
            index + 1,
            format_timestamp(entry.start),
            format_timestamp(entry.end),
            entry.text
        );
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "1\r\n00:00:00,000 --> 00:00:02,500\r\n Hello there \r\n\r\n\
2\r\n00:00:02,700 --> 00:00:05,000\r\ngeneral\r\nkenobi\r\n\r\n\
3\r\nbroken timing\r\ntext\r\n";

    #[test]
    fn test_parse_srt() {
        let entries = parse_srt(SAMPLE);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].text, "Hello there");
        assert!((entries[0].end - 2.5).abs() < 1e-9);
        assert_eq!(entries[1].text, "general kenobi");
        assert!((entries[1].start - 2.7).abs() < 1e-9);
    }

    #[test]
    fn test_parse_srt_dot_separator() {
        let entries = parse_srt("1\n00:01:02.5 --> 00:01:03.250\nok\n");
        assert_eq!(entries.len(), 1);
        assert!((entries[0].start - 62.5).abs() < 1e-9);
        assert!((entries[0].end - 63.25).abs() < 1e-9);
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0.0), "00:00:00,000");
        assert_eq!(format_timestamp(3725.042), "01:02:05,042");
    }

    #[test]
    fn test_to_srt_then_parse() {
        let entries = vec![SubtitleEntry {
            start: 1.0,
            end: 2.25,
            text: "line one\nline two".to_string(),
        }];
        let srt = to_srt(&entries);
        assert!(srt.starts_with("1\n00:00:01,000 --> 00:00:02,250\nline one\nline two\n\n"));
        assert_eq!(parse_srt(&srt)[0].text, "line one line two");
    }
}
