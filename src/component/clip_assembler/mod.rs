//! 片段組裝元件
//!
//! 以每個精彩時刻為中心剪出片段，可選擇轉成 9:16 直式畫面
//! （置中裁切、純色邊框、模糊背景），再以 H.264/AAC 輸出。

mod clip_window;
mod ffmpeg_command;
mod main;
mod reframe;
mod renderer;

pub use clip_window::{ClipWindow, WindowLimits, clip_file_name, compute_window};
pub use ffmpeg_command::ClipEncodeCommand;
pub use main::{AssemblySettings, Clip, ClipAssembler};
pub use reframe::{
    Canvas, CropRegion, OUTPUT_LABEL, VerticalLayout, center_crop, fit_inside, kernel_sigma,
    normalize_blur_kernel,
};
pub use renderer::{ClipRenderer, FfmpegClipRenderer, RenderRequest, remove_partial_output};
