mod color;
mod ffprobe_info;
mod path_validator;
mod percentile;
mod progress;
mod run_control;
mod video_scanner;

pub use color::{HexColor, parse_hex_color};
pub use ffprobe_info::{VideoInfo, get_video_info};
pub use path_validator::{ensure_directory_exists, normalize_input_path, validate_directory_exists};
pub use percentile::percentile;
pub use progress::{
    ChannelSink, LogLevel, LogSink, PhaseProgress, ProgressSink, RunEvent, RunStage,
};
pub use run_control::RunControl;
pub use video_scanner::{VideoFileInfo, collect_input_videos, scan_video_files};
