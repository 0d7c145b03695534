use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// 暫停時的輪詢間隔
const PAUSE_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// 執行控制
///
/// 停止與暫停都是協作式的：工作執行緒只在單位工作邊界
/// （每個取樣影格、每個片段、每個字幕）呼叫 [`RunControl::checkpoint`]。
#[derive(Debug, Clone)]
pub struct RunControl {
    stop: Arc<AtomicBool>,
    pause: Arc<AtomicBool>,
    started_at: Instant,
}

impl Default for RunControl {
    fn default() -> Self {
        Self::new(Arc::new(AtomicBool::new(false)))
    }
}

impl RunControl {
    /// 以既有的停止旗標建立（通常是 Ctrl-C 處理器共用的旗標）
    #[must_use]
    pub fn new(stop: Arc<AtomicBool>) -> Self {
        Self {
            stop,
            pause: Arc::new(AtomicBool::new(false)),
            started_at: Instant::now(),
        }
    }

    /// 共用停止與暫停旗標，但重新計時（同一批次的下一部影片）
    #[must_use]
    pub fn restarted(&self) -> Self {
        Self {
            stop: Arc::clone(&self.stop),
            pause: Arc::clone(&self.pause),
            started_at: Instant::now(),
        }
    }

    #[must_use]
    pub fn is_stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.pause.load(Ordering::SeqCst)
    }

    pub fn pause(&self) {
        self.pause.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.pause.store(false, Ordering::SeqCst);
    }

    #[must_use]
    pub const fn started_at(&self) -> Instant {
        self.started_at
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// 單位工作邊界
    ///
    /// 暫停中會阻塞直到恢復或收到停止要求。
    ///
    /// # Returns
    /// `true` 表示應該停止
    #[must_use]
    pub fn checkpoint(&self) -> bool {
        while self.is_paused() && !self.is_stop_requested() {
            thread::sleep(PAUSE_POLL_INTERVAL);
        }
        self.is_stop_requested()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkpoint_reports_stop() {
        let control = RunControl::default();
        assert!(!control.checkpoint());

        control.request_stop();
        assert!(control.checkpoint());
    }

    #[test]
    fn test_shared_stop_flag() {
        let flag = Arc::new(AtomicBool::new(false));
        let control = RunControl::new(Arc::clone(&flag));

        flag.store(true, Ordering::SeqCst);
        assert!(control.is_stop_requested());
    }

    #[test]
    fn test_checkpoint_blocks_while_paused() {
        let control = RunControl::default();
        control.pause();

        let resumer = control.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(250));
            resumer.resume();
        });

        let started = Instant::now();
        assert!(!control.checkpoint());
        assert!(started.elapsed() >= Duration::from_millis(200));
        handle.join().unwrap();
    }

    #[test]
    fn test_restarted_shares_flags() {
        let control = RunControl::default();
        thread::sleep(Duration::from_millis(20));
        let next = control.restarted();

        assert!(next.started_at() > control.started_at());
        next.pause();
        assert!(control.is_paused());
        control.request_stop();
        assert!(next.is_stop_requested());
    }

    #[test]
    fn test_stop_overrides_pause() {
        let control = RunControl::default();
        control.pause();
        control.request_stop();
        assert!(control.checkpoint());
    }
}
