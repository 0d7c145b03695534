use anyhow::{Result, bail};

/// RGB 顏色
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HexColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl HexColor {
    pub const BLACK: Self = Self { r: 0, g: 0, b: 0 };

    /// ffmpeg 顏色語法，例如 `0xFF8800`
    #[must_use]
    pub fn to_ffmpeg(&self) -> String {
        format!("0x{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    /// ASS 字幕樣式的顏色語法（BGR 順序），例如 `&H000088FF`
    #[must_use]
    pub fn to_ass(&self) -> String {
        format!("&H00{:02X}{:02X}{:02X}", self.b, self.g, self.r)
    }
}

/// 解析 `#RRGGBB`（`#` 可省略）
pub fn parse_hex_color(raw: &str) -> Result<HexColor> {
    let hex = raw.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        bail!("無效的顏色格式: {raw}");
    }

    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16);
    Ok(HexColor {
        r: channel(0..2)?,
        g: channel(2..4)?,
        b: channel(4..6)?,
    })
}
