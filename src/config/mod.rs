pub mod load;
pub mod save;
pub mod types;

pub use types::{
    BorderStyle, CaptionSettings, ClipSettings, Config, EncoderSettings, FrameSettings, Language,
    MAX_RECENT_PATHS, UserSettings, VideoExtensionTable,
};
