use crate::config::VideoExtensionTable;
use anyhow::{Result, bail};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFileInfo {
    pub path: PathBuf,
    pub size: u64,
}

/// 遞迴掃描資料夾中的影片檔，依檔案大小由小到大排序
pub fn scan_video_files(
    directory: &Path,
    extension_table: &VideoExtensionTable,
) -> Result<Vec<VideoFileInfo>> {
    let mut video_files: Vec<VideoFileInfo> = WalkDir::new(directory)
        .follow_links(false)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| extension_table.is_video_file(entry.path()))
        // 略過本工具自己產生的暫存資料夾
        .filter(|entry| !is_inside_scratch_dir(entry.path()))
        .filter_map(|entry| {
            let metadata = entry.metadata().ok()?;
            Some(VideoFileInfo {
                path: entry.into_path(),
                size: metadata.len(),
            })
        })
        .collect();

    video_files.sort_by_key(|file| file.size);
    Ok(video_files)
}

/// 解析使用者輸入：單一影片檔或影片資料夾
pub fn collect_input_videos(
    input: &Path,
    extension_table: &VideoExtensionTable,
) -> Result<Vec<VideoFileInfo>> {
    if !input.exists() {
        bail!("路徑不存在: {}", input.display());
    }

    if input.is_dir() {
        return scan_video_files(input, extension_table);
    }

    if !extension_table.is_video_file(input) {
        bail!("不是支援的影片格式: {}", input.display());
    }

    let size = std::fs::metadata(input)?.len();
    Ok(vec![VideoFileInfo {
        path: input.to_path_buf(),
        size,
    }])
}

fn is_inside_scratch_dir(path: &Path) -> bool {
    path.components().any(|component| {
        component
            .as_os_str()
            .to_str()
            .is_some_and(|name| name.starts_with(".tmp_"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::fs;

    #[test]
    fn test_scan_video_files_sorted_by_size() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("big.mp4"), vec![0u8; 300]).unwrap();
        fs::write(dir.path().join("small.MKV"), vec![0u8; 10]).unwrap();
        fs::write(dir.path().join("notes.txt"), b"hello").unwrap();
        fs::create_dir_all(dir.path().join(".tmp_run")).unwrap();
        fs::write(dir.path().join(".tmp_run/partial.mp4"), vec![0u8; 5]).unwrap();

        let table = Config::embedded_extension_table().unwrap();
        let files = scan_video_files(dir.path(), &table).unwrap();

        assert_eq!(files.len(), 2);
        assert_eq!(files[0].size, 10);
        assert_eq!(files[1].size, 300);
    }

    #[test]
    fn test_collect_input_videos_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("clip.mov");
        fs::write(&video, vec![0u8; 42]).unwrap();

        let table = Config::embedded_extension_table().unwrap();
        let files = collect_input_videos(&video, &table).unwrap();
        assert_eq!(files, vec![VideoFileInfo { path: video, size: 42 }]);
    }

    #[test]
    fn test_collect_input_videos_rejects_missing_and_non_video() {
        let dir = tempfile::tempdir().unwrap();
        let table = Config::embedded_extension_table().unwrap();

        assert!(collect_input_videos(&dir.path().join("missing.mp4"), &table).is_err());

        let text = dir.path().join("readme.txt");
        fs::write(&text, b"x").unwrap();
        assert!(collect_input_videos(&text, &table).is_err());
    }
}
