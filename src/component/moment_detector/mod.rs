//! 精彩時刻偵測元件
//!
//! 結合三種訊號：
//! A. 音訊 RMS 能量（每 0.5 秒）
//! B. 影格差異面積
//! C. 稀疏光流位移量
//!
//! 各訊號以百分位門檻找峰值，合併後依時間分組，再挑出片段中心。

mod audio_energy;
mod backend;
mod error;
mod frame_reader;
mod main;
mod motion;
mod optical_flow;
mod peak_grouping;
mod samples;
mod selection;

pub use audio_energy::{
    ANALYSIS_SAMPLE_RATE, AudioBuffer, ENERGY_WINDOW_SECONDS, compute_energy,
    extract_audio_track, read_wav_mono,
};
pub use backend::{FfmpegBackend, MediaBackend};
pub use error::DetectError;
pub use frame_reader::{
    ANALYSIS_MAX_WIDTH, FfmpegFrameSource, FrameSamplingPlan, FrameSource, GrayFrame,
};
pub use main::{DetectorConfig, MomentDetector};
pub use motion::{MotionAnalyzer, motion_area};
pub use optical_flow::{
    FeatureParams, FlowAnalyzer, TrackerParams, detect_features, mean_flow, track_features,
};
pub use peak_grouping::{
    MAX_PEAK_GAP_SECONDS, PeakGroup, group_peaks, pool_peaks, rank_candidates,
};
pub use samples::{SignalSample, find_peaks};
pub use selection::{
    Moment, SPACING_FACTOR, SelectionMode, SelectionPolicy, clamp_moments, select_moments,
};
