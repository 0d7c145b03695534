use anyhow::{Context, Result, bail};
use std::path::Path;

pub fn validate_directory_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        bail!("路徑不存在: {}", path.display());
    }
    if !path.is_dir() {
        bail!("路徑不是資料夾: {}", path.display());
    }
    Ok(())
}

pub fn ensure_directory_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)
            .with_context(|| format!("無法建立資料夾: {}", path.display()))?;
    }
    Ok(())
}

/// 清理使用者貼上的路徑（去除前後空白與成對引號）
#[must_use]
pub fn normalize_input_path(raw: &str) -> String {
    let trimmed = raw.trim();
    let unquoted = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .or_else(|| {
            trimmed
                .strip_prefix('\'')
                .and_then(|s| s.strip_suffix('\''))
        })
        .unwrap_or(trimmed);
    unquoted.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_input_path() {
        assert_eq!(normalize_input_path("  /a/b.mp4 "), "/a/b.mp4");
        assert_eq!(normalize_input_path("\"/a b/c.mp4\""), "/a b/c.mp4");
        assert_eq!(normalize_input_path("'/x.mkv'"), "/x.mkv");
        assert_eq!(normalize_input_path("\"unbalanced"), "\"unbalanced");
    }

    #[test]
    fn test_validate_directory_exists() {
        let dir = tempfile::tempdir().unwrap();
        assert!(validate_directory_exists(dir.path()).is_ok());

        let file = dir.path().join("f.txt");
        std::fs::write(&file, b"x").unwrap();
        assert!(validate_directory_exists(&file).is_err());
        assert!(validate_directory_exists(&dir.path().join("missing")).is_err());
    }

    #[test]
    fn test_ensure_directory_exists_creates_nested() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b/c");
        ensure_directory_exists(&nested).unwrap();
        assert!(nested.is_dir());
    }
}
