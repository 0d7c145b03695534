use crate::tools::percentile;

/// 訊號取樣點：音訊能量、影格差異或光流強度
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalSample {
    pub timestamp: f64,
    pub value: f64,
}

impl SignalSample {
    #[must_use]
    pub const fn new(timestamp: f64, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// 找出訊號峰值的時間點
///
/// 取樣值必須不低於百分位門檻，且嚴格高於整段訊號的最低值；
/// 完全平坦的訊號不會產生峰值。
#[must_use]
pub fn find_peaks(samples: &[SignalSample], percentile_rank: f64) -> Vec<f64> {
    let values: Vec<f64> = samples.iter().map(|s| s.value).collect();
    let Some(threshold) = percentile(&values, percentile_rank) else {
        return Vec::new();
    };
    let floor = values.iter().copied().fold(f64::INFINITY, f64::min);

    samples
        .iter()
        .filter(|s| s.value >= threshold && s.value > floor)
        .map(|s| s.timestamp)
        .collect()
}
