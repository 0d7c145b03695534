//! 處理中的鍵盤控制
//!
//! `p`／空白鍵切換暫停，`q`／Esc 要求停止。只在互動式終端機啟用。

use crate::tools::RunControl;
use console::{Key, Term, style};
use log::{debug, info};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

/// 按鍵對應的動作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    TogglePause,
    Stop,
    Ignored,
}

/// 套用單一按鍵到執行控制
pub fn handle_key(key: &Key, control: &RunControl) -> KeyAction {
    match key {
        Key::Char('p' | 'P' | ' ') => {
            if control.is_paused() {
                control.resume();
                info!("使用者恢復處理");
            } else {
                control.pause();
                info!("使用者暫停處理");
            }
            KeyAction::TogglePause
        }
        Key::Char('q' | 'Q') | Key::Escape | Key::CtrlC => {
            // 停止要求會解除暫停中的阻塞
            control.request_stop();
            info!("使用者要求停止");
            KeyAction::Stop
        }
        _ => KeyAction::Ignored,
    }
}

/// 背景讀取按鍵的執行緒
pub struct KeyControls {
    control: RunControl,
    done: Arc<AtomicBool>,
    reader: Option<JoinHandle<()>>,
}

impl KeyControls {
    /// 非互動式終端機時不啟動讀取執行緒
    #[must_use]
    pub fn spawn(control: RunControl) -> Self {
        let done = Arc::new(AtomicBool::new(false));
        let term = Term::stdout();
        if !term.is_term() {
            debug!("非互動式終端機，停用鍵盤控制");
            return Self {
                control,
                done,
                reader: None,
            };
        }

        let reader = {
            let control = control.clone();
            let done = Arc::clone(&done);
            thread::spawn(move || {
                while !done.load(Ordering::SeqCst) {
                    let Ok(key) = term.read_key() else {
                        break;
                    };
                    if done.load(Ordering::SeqCst) {
                        break;
                    }
                    if handle_key(&key, &control) == KeyAction::Stop {
                        break;
                    }
                }
            })
        };

        Self {
            control,
            done,
            reader: Some(reader),
        }
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.reader.is_some()
    }

    /// 結束鍵盤控制並解除暫停
    ///
    /// 讀取執行緒仍在等待按鍵時，以「按任意鍵」提示收尾。
    ///
    /// # Returns
    /// `true` 表示已經等待過使用者按鍵
    pub fn finish(mut self) -> bool {
        self.done.store(true, Ordering::SeqCst);
        self.control.resume();

        let Some(reader) = self.reader.take() else {
            return false;
        };
        if reader.is_finished() {
            let _ = reader.join();
            return false;
        }

        println!("\n{}", style("按任意鍵返回選單...").dim());
        let _ = reader.join();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pause_key_toggles() {
        let control = RunControl::default();

        assert_eq!(handle_key(&Key::Char('p'), &control), KeyAction::TogglePause);
        assert!(control.is_paused());

        assert_eq!(handle_key(&Key::Char(' '), &control), KeyAction::TogglePause);
        assert!(!control.is_paused());
        assert!(!control.is_stop_requested());
    }

    #[test]
    fn test_stop_keys_request_stop() {
        for key in [Key::Char('q'), Key::Char('Q'), Key::Escape, Key::CtrlC] {
            let control = RunControl::default();
            control.pause();

            assert_eq!(handle_key(&key, &control), KeyAction::Stop);
            assert!(control.is_stop_requested());
            assert!(control.checkpoint());
        }
    }

    #[test]
    fn test_other_keys_are_ignored() {
        let control = RunControl::default();
        assert_eq!(handle_key(&Key::Char('x'), &control), KeyAction::Ignored);
        assert_eq!(handle_key(&Key::Enter, &control), KeyAction::Ignored);
        assert!(!control.is_paused());
        assert!(!control.is_stop_requested());
    }

    #[test]
    fn test_finish_without_terminal_resumes() {
        let control = RunControl::default();
        let controls = KeyControls {
            control: control.clone(),
            done: Arc::new(AtomicBool::new(false)),
            reader: None,
        };
        control.pause();

        assert!(!controls.finish());
        assert!(!control.is_paused());
    }
}
