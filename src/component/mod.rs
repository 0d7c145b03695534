//! 功能元件模組
//!
//! 每個子模組實現一個獨立的功能，包含主要邏輯和專用工具

pub mod caption_burner;
pub mod clip_assembler;
pub mod highlight_pipeline;
pub mod moment_detector;

pub use caption_burner::CaptionBurner;
pub use clip_assembler::ClipAssembler;
pub use highlight_pipeline::HighlightClipper;
pub use moment_detector::MomentDetector;
