//! 音訊能量分析
//!
//! 以 ffmpeg 把音軌擷取成 WAV，讀回後轉為單聲道，
//! 再以固定長度的視窗計算 RMS 能量。

use super::error::DetectError;
use super::samples::SignalSample;
use hound::{SampleFormat, WavReader};
use log::debug;
use rayon::prelude::*;
use std::path::Path;
use std::process::Command;

/// 擷取音訊使用的取樣率
pub const ANALYSIS_SAMPLE_RATE: u32 = 22_050;

/// RMS 視窗長度（秒）
pub const ENERGY_WINDOW_SECONDS: f64 = 0.5;

/// 單聲道音訊樣本（-1.0..=1.0）
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    pub sample_rate: u32,
    pub samples: Vec<f32>,
}

impl AudioBuffer {
    #[must_use]
    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / f64::from(self.sample_rate)
    }
}

/// 擷取音軌為 16-bit PCM WAV
pub fn extract_audio_track(
    video_path: &Path,
    output_path: &Path,
    sample_rate: u32,
) -> Result<(), DetectError> {
    debug!(
        "擷取音軌: {} -> {}",
        video_path.display(),
        output_path.display()
    );

    let output = Command::new("ffmpeg")
        .args(["-hide_banner", "-nostdin", "-loglevel", "error", "-y", "-i"])
        .arg(video_path)
        .args(["-vn", "-sn", "-dn", "-acodec", "pcm_s16le", "-ar"])
        .arg(sample_rate.to_string())
        .arg(output_path)
        .output()
        .map_err(|e| DetectError::AudioExtraction(format!("無法執行 ffmpeg: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(DetectError::AudioExtraction(stderr.trim().to_string()));
    }

    if !output_path.exists() {
        return Err(DetectError::AudioExtraction(format!(
            "音訊檔案未建立: {}",
            output_path.display()
        )));
    }

    Ok(())
}

/// 讀取 WAV 並把所有聲道平均成單聲道
pub fn read_wav_mono(path: &Path) -> Result<AudioBuffer, DetectError> {
    let mut reader = WavReader::open(path)
        .map_err(|e| DetectError::AudioExtraction(format!("無法開啟 WAV {}: {e}", path.display())))?;
    let spec = reader.spec();
    let channels = usize::from(spec.channels.max(1));

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(|e| DetectError::AudioExtraction(format!("WAV 讀取失敗: {e}")))?,
        SampleFormat::Int => {
            let scale = (1_i64 << (spec.bits_per_sample.clamp(1, 32) - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()
                .map_err(|e| DetectError::AudioExtraction(format!("WAV 讀取失敗: {e}")))?
        }
    };

    Ok(AudioBuffer {
        sample_rate: spec.sample_rate,
        samples: fold_to_mono(&interleaved, channels),
    })
}

fn fold_to_mono(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// 計算每個完整視窗的 RMS 能量，時間點為視窗起點
///
/// 結尾不足一個視窗的樣本不計入。
#[must_use]
pub fn compute_energy(audio: &AudioBuffer, window_seconds: f64) -> Vec<SignalSample> {
    let window = (f64::from(audio.sample_rate) * window_seconds).round() as usize;
    if window == 0 {
        return Vec::new();
    }

    let sample_rate = f64::from(audio.sample_rate);
    audio
        .samples
        .par_chunks_exact(window)
        .enumerate()
        .map(|(index, chunk)| {
            let sum_squares: f64 = chunk.iter().map(|&s| f64::from(s).powi(2)).sum();
            let rms = (sum_squares / chunk.len() as f64).sqrt();
            SignalSample::new((index * window) as f64 / sample_rate, rms)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::{WavSpec, WavWriter};

    #[test]
    fn test_compute_energy_windows() {
        let audio = AudioBuffer {
            sample_rate: 1000,
            samples: [vec![0.0; 500], vec![0.5; 500], vec![0.1; 200]].concat(),
        };

        let energy = compute_energy(&audio, 0.5);

        assert_eq!(energy.len(), 2);
        assert!((energy[0].timestamp - 0.0).abs() < 1e-9);
        assert!(energy[0].value.abs() < 1e-9);
        assert!((energy[1].timestamp - 0.5).abs() < 1e-9);
        assert!((energy[1].value - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_compute_energy_rms_of_square_wave() {
        let samples: Vec<f32> = (0..2000)
            .map(|i| if i % 2 == 0 { 0.8 } else { -0.8 })
            .collect();
        let audio = AudioBuffer {
            sample_rate: 2000,
            samples,
        };
        let energy = compute_energy(&audio, 0.5);
        assert_eq!(energy.len(), 2);
        assert!(energy.iter().all(|e| (e.value - 0.8).abs() < 1e-6));
    }

    #[test]
    fn test_fold_to_mono() {
        let stereo = [1.0, 0.0, 0.5, 0.5, -1.0, 1.0];
        assert_eq!(fold_to_mono(&stereo, 2), vec![0.5, 0.5, 0.0]);
        assert_eq!(fold_to_mono(&stereo, 1), stereo.to_vec());
    }

    #[test]
    fn test_read_wav_mono_from_stereo_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");

        let spec = WavSpec {
            channels: 2,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(&path, spec).unwrap();
        for _ in 0..8000 {
            writer.write_sample(16384_i16).unwrap();
            writer.write_sample(0_i16).unwrap();
        }
        writer.finalize().unwrap();

        let audio = read_wav_mono(&path).unwrap();
        assert_eq!(audio.sample_rate, 8000);
        assert_eq!(audio.samples.len(), 8000);
        assert!((audio.samples[0] - 0.25).abs() < 1e-4);
        assert!((audio.duration_seconds() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_read_wav_mono_missing_file() {
        let err = read_wav_mono(Path::new("/definitely/missing.wav")).unwrap_err();
        assert!(matches!(err, DetectError::AudioExtraction(_)));
    }
}
