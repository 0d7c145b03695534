use crate::component::HighlightClipper;
use crate::config::Config;
use crate::pause;
use anyhow::Result;
use console::{Term, style};
use rust_i18n::t;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

pub fn run_highlight_clipper(
    term: &Term,
    shutdown_signal: &Arc<AtomicBool>,
    config: &mut Config,
) -> Result<()> {
    let mut clipper = HighlightClipper::new(config.clone(), Arc::clone(shutdown_signal));

    let result = clipper.run();

    // 最近路徑與輸出資料夾在執行中更新
    config.settings = clipper.settings().clone();

    // 正常結束時 run() 已經等待過按鍵
    if let Err(e) = result {
        eprintln!("{} {}", style(t!("main_menu.error_prefix")).red().bold(), e);
        pause(term)?;
    }
    Ok(())
}
