use super::clip_window::ClipWindow;
use super::reframe::OUTPUT_LABEL;
use crate::config::EncoderSettings;
use std::path::{Path, PathBuf};
use std::process::Command;

/// 剪出單一片段的 ffmpeg 命令
pub struct ClipEncodeCommand {
    source_path: PathBuf,
    destination_path: PathBuf,
    window: ClipWindow,
    filter_graph: Option<String>,
    encoder: EncoderSettings,
}

impl ClipEncodeCommand {
    #[must_use]
    pub fn new(
        source_path: &Path,
        destination_path: &Path,
        window: ClipWindow,
        filter_graph: Option<String>,
        encoder: EncoderSettings,
    ) -> Self {
        Self {
            source_path: source_path.to_path_buf(),
            destination_path: destination_path.to_path_buf(),
            window,
            filter_graph,
            encoder,
        }
    }

    #[must_use]
    pub fn destination_path(&self) -> &Path {
        &self.destination_path
    }

    #[must_use]
    pub fn build_command(&self) -> Command {
        let mut cmd = Command::new("ffmpeg");

        // -ss 放在 -i 前面做快速定位
        cmd.args(["-hide_banner", "-nostdin", "-loglevel", "error", "-y"]);
        cmd.args(["-ss", &format!("{:.3}", self.window.start)]);
        cmd.arg("-i").arg(&self.source_path);
        cmd.args(["-t", &format!("{:.3}", self.window.duration())]);

        match &self.filter_graph {
            Some(graph) => {
                cmd.args(["-filter_complex", graph, "-map", OUTPUT_LABEL]);
            }
            None => {
                cmd.args(["-map", "0:v:0"]);
            }
        }

        cmd.args([
            "-map", "0:a:0?",
            "-sn", "-dn",
            "-map_metadata", "-1",
            "-c:v", "libx264",
            "-preset", &self.encoder.preset,
            "-crf", &self.encoder.crf.to_string(),
            "-pix_fmt", "yuv420p",
            "-c:a", "aac",
            "-b:a", "192k",
            "-threads", &self.encoder.threads.to_string(),
            "-movflags", "+faststart",
            "-avoid_negative_ts", "make_zero",
        ]);
        cmd.arg(&self.destination_path);

        cmd
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args_of(command: &Command) -> Vec<String> {
        command
            .get_args()
            .map(|a| a.to_string_lossy().to_string())
            .collect()
    }

    fn window() -> ClipWindow {
        ClipWindow {
            start: 49.75,
            end: 69.75,
        }
    }

    #[test]
    fn test_command_seeks_and_limits_duration() {
        let cmd = ClipEncodeCommand::new(
            Path::new("/videos/in.mp4"),
            Path::new("/out/shorts_clip_01_49s-69s.mp4"),
            window(),
            None,
            EncoderSettings::default(),
        );
        let args = args_of(&cmd.build_command());

        let ss = args.iter().position(|a| a == "-ss").unwrap();
        let input = args.iter().position(|a| a == "-i").unwrap();
        assert!(ss < input);
        assert_eq!(args[ss + 1], "49.750");
        let t = args.iter().position(|a| a == "-t").unwrap();
        assert_eq!(args[t + 1], "20.000");
        assert!(args.contains(&"0:v:0".to_string()));
        assert!(args.contains(&"libx264".to_string()));
        assert_eq!(args.last().unwrap(), "/out/shorts_clip_01_49s-69s.mp4");
    }

    #[test]
    fn test_command_uses_filter_graph() {
        let cmd = ClipEncodeCommand::new(
            Path::new("in.mp4"),
            Path::new("out.mp4"),
            window(),
            Some("[0:v]scale=1080:1920[vout]".to_string()),
            EncoderSettings {
                threads: 2,
                crf: 20,
                preset: "fast".to_string(),
            },
        );
        let args = args_of(&cmd.build_command());

        let fc = args.iter().position(|a| a == "-filter_complex").unwrap();
        assert_eq!(args[fc + 1], "[0:v]scale=1080:1920[vout]");
        assert_eq!(args[fc + 3], "[vout]");
        assert!(!args.contains(&"0:v:0".to_string()));

        let threads = args.iter().position(|a| a == "-threads").unwrap();
        assert_eq!(args[threads + 1], "2");
        let crf = args.iter().position(|a| a == "-crf").unwrap();
        assert_eq!(args[crf + 1], "20");
        assert_eq!(cmd.destination_path(), Path::new("out.mp4"));
    }
}
