use log::error;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// 建立與 Ctrl-C 共用的停止旗標
///
/// 處理中的工作會在下一個檢查點結束並保留已完成的片段。
#[must_use]
pub fn setup_shutdown_signal() -> Arc<AtomicBool> {
    let shutdown_signal = Arc::new(AtomicBool::new(false));
    let signal_clone = Arc::clone(&shutdown_signal);

    if let Err(e) = ctrlc::set_handler(move || {
        signal_clone.store(true, Ordering::SeqCst);
        eprintln!("\n收到中斷信號，完成目前的步驟後停止...");
    }) {
        error!("無法設定 Ctrl-C 處理器: {e}");
    }

    shutdown_signal
}
