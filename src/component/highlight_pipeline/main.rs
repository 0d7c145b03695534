use super::controls::KeyControls;
use super::worker::{RunOutcome, RunRequest, RunServices, spawn_run};
use crate::config::{Config, UserSettings};
use crate::config::save::{add_recent_path, save_settings};
use crate::tools::{
    LogLevel, RunControl, RunEvent, RunStage, VideoFileInfo, collect_input_videos,
    ensure_directory_exists, normalize_input_path,
};
use anyhow::Result;
use console::{Term, style};
use dialoguer::Input;
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::RecvTimeoutError;
use std::time::Duration;

/// 預設輸出資料夾名稱（位於輸入影片旁）
const DEFAULT_OUTPUT_DIR_NAME: &str = "highlights";

/// 進度條的百分比解析度
const PROGRESS_SCALE: f64 = 10.0;

/// 等待事件時順便檢查暫停狀態的間隔
const EVENT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// 精彩片段產生器
pub struct HighlightClipper {
    config: Config,
    shutdown_signal: Arc<AtomicBool>,
}

/// 每部影片的處理結果
struct VideoResult {
    path: PathBuf,
    outcome: RunOutcome,
}

impl HighlightClipper {
    pub const fn new(config: Config, shutdown_signal: Arc<AtomicBool>) -> Self {
        Self {
            config,
            shutdown_signal,
        }
    }

    #[must_use]
    pub const fn settings(&self) -> &UserSettings {
        &self.config.settings
    }

    /// 互動式執行一批影片
    ///
    /// 正常結束前會等待使用者按鍵，呼叫端只需在錯誤時暫停。
    pub fn run(&mut self) -> Result<()> {
        println!("{}", style("=== 精彩片段產生 ===").cyan().bold());

        // 上一次 Ctrl-C 留下的旗標
        self.shutdown_signal.store(false, Ordering::SeqCst);

        let input_path = PathBuf::from(self.prompt_input_path()?);
        let video_files = match collect_input_videos(&input_path, &self.config.extension_table) {
            Ok(files) => files,
            Err(e) => {
                println!("{} {e}", style("無效的路徑:").red().bold());
                warn!("無效的輸入路徑 {}: {e}", input_path.display());
                return crate::pause(&Term::stdout());
            }
        };

        if video_files.is_empty() {
            println!("{}", style("找不到任何影片檔案").yellow());
            return crate::pause(&Term::stdout());
        }

        self.print_video_list(&video_files);

        let output_dir = PathBuf::from(self.prompt_output_dir(&input_path)?);
        ensure_directory_exists(&output_dir)?;

        add_recent_path(
            &mut self.config.settings,
            &input_path.to_string_lossy(),
        );
        self.config.settings.output_directory = Some(output_dir.clone());
        if let Err(e) = save_settings(&self.config.settings) {
            warn!("無法儲存設定: {e:#}");
        }

        self.print_run_settings();

        let batch_control = RunControl::new(Arc::clone(&self.shutdown_signal));
        let controls = KeyControls::spawn(batch_control.clone());
        if controls.is_active() {
            println!("{}", style("處理中按 p 暫停/繼續，按 q 停止").dim());
        }

        let mut results = Vec::with_capacity(video_files.len());
        for (index, file) in video_files.iter().enumerate() {
            if self.shutdown_signal.load(Ordering::SeqCst) {
                println!("{}", style("已中斷，略過剩餘影片").yellow());
                break;
            }

            println!(
                "\n{} {}",
                style(format!("[{}/{}]", index + 1, video_files.len())).cyan(),
                file.path.display()
            );
            let outcome = self.process_video(&file.path, &output_dir, batch_control.restarted());
            Self::print_outcome(&outcome);
            results.push(VideoResult {
                path: file.path.clone(),
                outcome,
            });
        }

        Self::print_summary(&results, &output_dir);

        if controls.finish() {
            Ok(())
        } else {
            crate::pause(&Term::stdout())
        }
    }

    fn prompt_input_path(&self) -> Result<String> {
        let mut input = Input::<String>::new().with_prompt("請輸入影片檔案或資料夾路徑");
        if let Some(recent) = self.config.settings.recent_paths.first() {
            input = input.default(recent.clone());
        }
        let path: String = input.interact_text()?;
        Ok(normalize_input_path(&path))
    }

    fn prompt_output_dir(&self, input_path: &Path) -> Result<String> {
        let default_dir = self.config.settings.output_directory.clone().unwrap_or_else(|| {
            let base = if input_path.is_dir() {
                input_path
            } else {
                input_path.parent().unwrap_or(Path::new("."))
            };
            base.join(DEFAULT_OUTPUT_DIR_NAME)
        });

        let path: String = Input::new()
            .with_prompt("請輸入輸出資料夾")
            .default(default_dir.to_string_lossy().to_string())
            .interact_text()?;
        Ok(normalize_input_path(&path))
    }

    fn print_video_list(&self, video_files: &[VideoFileInfo]) {
        println!(
            "{}",
            style(format!(
                "找到 {} 個影片檔案，依檔案大小排序（由小到大）：",
                video_files.len()
            ))
            .green()
        );

        for (index, file) in video_files.iter().enumerate() {
            let size_mb = file.size as f64 / 1024.0 / 1024.0;
            println!(
                "  {}. {} ({:.2} MB)",
                index + 1,
                file.path.file_name().unwrap_or_default().to_string_lossy(),
                size_mb
            );
        }
        println!();
    }

    fn print_run_settings(&self) {
        let clip = &self.config.settings.clip;
        let count = if clip.create_all_clips {
            "全部".to_string()
        } else {
            clip.clip_count.to_string()
        };
        println!(
            "{}",
            style(format!(
                "片段數: {count}，長度: {:.0}s ({:.0}-{:.0}s)，直式: {}，字幕: {}",
                clip.clip_duration,
                clip.min_clip_duration,
                clip.max_clip_duration,
                if clip.vertical { "是" } else { "否" },
                if self.config.settings.caption.enabled { "是" } else { "否" },
            ))
            .dim()
        );
    }

    /// 啟動背景執行並轉播事件到進度條
    fn process_video(&self, video_path: &Path, output_dir: &Path, control: RunControl) -> RunOutcome {
        let settings = self.config.settings.clone();
        let services = RunServices::ffmpeg(&settings);
        let request = RunRequest {
            video_path: video_path.to_path_buf(),
            output_dir: output_dir.to_path_buf(),
            settings,
        };
        let handle = spawn_run(request, services, control);

        let progress_bar = ProgressBar::new((100.0 * PROGRESS_SCALE) as u64);
        progress_bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] {prefix:>10.bold} [{bar:40.cyan/blue}] {percent}% {msg}")
                .expect("Invalid progress bar template")
                .progress_chars("#>-"),
        );
        progress_bar.set_prefix(RunStage::Detecting.as_str());

        // 工作執行緒結束時 sender 被丟棄
        let mut paused = false;
        loop {
            match handle.events().recv_timeout(EVENT_POLL_INTERVAL) {
                Ok(event) => Self::show_event(&progress_bar, event),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }

            let control = handle.control();
            let now_paused = control.is_paused() && !control.is_stop_requested();
            if now_paused != paused {
                paused = now_paused;
                let status = if paused {
                    style("已暫停，按 p 繼續").yellow()
                } else {
                    style("繼續處理").green()
                };
                progress_bar.println(format!("  {status}"));
            }
        }

        let outcome = handle.wait();
        if matches!(outcome, RunOutcome::Completed { .. }) {
            progress_bar.finish_with_message("完成");
        } else {
            progress_bar.abandon();
        }
        outcome
    }

    fn show_event(progress_bar: &ProgressBar, event: RunEvent) {
        match event {
            RunEvent::Stage(stage) => progress_bar.set_prefix(stage.as_str()),
            RunEvent::Progress { percent, message } => {
                progress_bar.set_position((percent * PROGRESS_SCALE) as u64);
                progress_bar.set_message(message);
            }
            RunEvent::Log { level, message } => {
                if level >= LogLevel::Info {
                    progress_bar.println(format_log_line(level, &message));
                }
            }
        }
    }

    fn print_outcome(outcome: &RunOutcome) {
        match outcome {
            RunOutcome::Completed { clips } => {
                for clip in clips {
                    println!(
                        "  {} {} ({:.1}s-{:.1}s)",
                        style("✓").green(),
                        clip.path.display(),
                        clip.window.start,
                        clip.window.end
                    );
                }
            }
            RunOutcome::NothingFound => {
                println!("  {}", style("沒有找到精彩時刻").yellow());
            }
            RunOutcome::Stopped { clips } => {
                println!(
                    "  {}",
                    style(format!("已停止，保留 {} 個已完成的片段", clips.len())).yellow()
                );
            }
            RunOutcome::Failed { error } => {
                println!("  {} {error}", style("處理失敗:").red().bold());
            }
        }
    }

    fn print_summary(results: &[VideoResult], output_dir: &Path) {
        let clip_count: usize = results.iter().map(|r| r.outcome.clips().len()).sum();
        let completed = results
            .iter()
            .filter(|r| matches!(r.outcome, RunOutcome::Completed { .. }))
            .count();
        let nothing_found = results
            .iter()
            .filter(|r| r.outcome == RunOutcome::NothingFound)
            .count();
        let stopped = results
            .iter()
            .filter(|r| matches!(r.outcome, RunOutcome::Stopped { .. }))
            .count();
        let failed: Vec<&VideoResult> = results
            .iter()
            .filter(|r| matches!(r.outcome, RunOutcome::Failed { .. }))
            .collect();

        println!();
        println!("{}", style("=== 精彩片段摘要 ===").cyan().bold());
        println!("  處理影片: {} 個", results.len());
        println!("  輸出片段: {} 個", style(clip_count).green());
        println!("  成功: {} 個", style(completed).green());
        if nothing_found > 0 {
            println!("  沒有精彩時刻: {} 個", style(nothing_found).yellow());
        }
        if stopped > 0 {
            println!("  已停止: {} 個", style(stopped).yellow());
        }
        if !failed.is_empty() {
            println!("  失敗: {} 個", style(failed.len()).red());
            for result in &failed {
                println!("    - {}", result.path.display());
            }
        }
        println!("  輸出資料夾: {}", output_dir.display());

        if failed.is_empty() {
            info!(
                "精彩片段完成 - 影片: {}, 片段: {clip_count}, 無精彩時刻: {nothing_found}, 停止: {stopped}",
                results.len()
            );
        } else {
            error!(
                "精彩片段完成但有失敗 - 影片: {}, 片段: {clip_count}, 失敗: {}",
                results.len(),
                failed.len()
            );
        }
    }
}

fn format_log_line(level: LogLevel, message: &str) -> String {
    let label = format!("[{level}]");
    let label = match level {
        LogLevel::Debug => style(label).dim(),
        LogLevel::Info => style(label).cyan(),
        LogLevel::Warning => style(label).yellow(),
        LogLevel::Error => style(label).red().bold(),
    };
    format!("  {label} {message}")
}
