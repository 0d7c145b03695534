use super::peak_grouping::PeakGroup;

/// 全選模式下，相鄰片段中心至少相隔目標長度的倍數
pub const SPACING_FACTOR: f64 = 1.5;

/// 選出的精彩時刻
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Moment {
    /// 片段中心（秒）
    pub timestamp: f64,
    /// 群組的峰值數
    pub intensity: usize,
    pub span: f64,
}

impl Moment {
    #[must_use]
    pub fn from_group(group: &PeakGroup) -> Self {
        Self {
            timestamp: group.center(),
            intensity: group.intensity(),
            span: group.span(),
        }
    }
}

/// 選取模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    /// 所有符合長度且彼此間隔足夠的候選
    All,
    /// 最多 n 個，依強度排序
    Count(usize),
}

impl SelectionMode {
    /// 輸出檔名前綴
    #[must_use]
    pub const fn file_prefix(&self) -> &'static str {
        match self {
            Self::All => "viral_clip",
            Self::Count(_) => "shorts_clip",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionPolicy {
    pub mode: SelectionMode,
    pub target_duration: f64,
    pub min_clip_duration: f64,
}

/// 從已依強度排序的候選中選出時刻
///
/// - `All`：依強度順序走訪，跨度足夠且與所有已選時刻相距至少
///   `1.5 × target` 才保留；間距以限制在影片範圍後的中心計算。
///   最後依時間排序輸出。
/// - `Count(n)`：只看前 `min(2n, len)` 個候選，跨度足夠就保留，
///   滿 `n` 個為止；維持強度順序輸出。
#[must_use]
pub fn select_moments(
    ranked: &[PeakGroup],
    policy: &SelectionPolicy,
    video_duration: f64,
) -> Vec<Moment> {
    let long_enough = |group: &&PeakGroup| group.span() >= policy.min_clip_duration;

    match policy.mode {
        SelectionMode::All => {
            let spacing = SPACING_FACTOR * policy.target_duration;
            let mut kept: Vec<Moment> = Vec::new();
            for group in ranked.iter().filter(long_enough) {
                let center =
                    clamp_timestamp(group.center(), video_duration, policy.target_duration);
                if kept.iter().all(|m| (m.timestamp - center).abs() >= spacing) {
                    kept.push(Moment {
                        timestamp: center,
                        ..Moment::from_group(group)
                    });
                }
            }
            kept.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
            kept
        }
        SelectionMode::Count(count) => {
            let pool = (2 * count).min(ranked.len());
            ranked[..pool]
                .iter()
                .filter(long_enough)
                .take(count)
                .map(Moment::from_group)
                .collect()
        }
    }
}

/// 把時刻限制在 `[0, max(0, duration − target/2)]`
#[must_use]
pub fn clamp_timestamp(timestamp: f64, duration: f64, target_duration: f64) -> f64 {
    let upper = (duration - target_duration / 2.0).max(0.0);
    timestamp.clamp(0.0, upper)
}

#[must_use]
pub fn clamp_moments(moments: Vec<Moment>, duration: f64, target_duration: f64) -> Vec<Moment> {
    moments
        .into_iter()
        .map(|moment| Moment {
            timestamp: clamp_timestamp(moment.timestamp, duration, target_duration),
            ..moment
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 以中心點、成員數、跨度建立群組
    fn group_at(center: f64, members: usize, span: f64) -> PeakGroup {
        let step = span / (members - 1) as f64;
        let first = center - span / 2.0;
        PeakGroup::new((0..members).map(|i| first + step * i as f64).collect())
    }

    fn policy(mode: SelectionMode, target: f64) -> SelectionPolicy {
        SelectionPolicy {
            mode,
            target_duration: target,
            min_clip_duration: 3.0,
        }
    }

    #[test]
    fn test_select_all_spacing() {
        // 強度順序：60, 10, 200, 70
        let ranked = vec![
            group_at(60.0, 6, 4.0),
            group_at(10.0, 5, 4.0),
            group_at(200.0, 4, 4.0),
            group_at(70.0, 3, 4.0),
        ];
        let moments = select_moments(&ranked, &policy(SelectionMode::All, 20.0), 1000.0);

        let centers: Vec<f64> = moments.iter().map(|m| m.timestamp).collect();
        assert_eq!(centers.len(), 3);
        for (got, want) in centers.iter().zip([10.0, 60.0, 200.0]) {
            assert!((got - want).abs() < 1e-9);
        }
        for pair in centers.windows(2) {
            assert!(pair[1] - pair[0] >= 30.0);
        }
    }

    #[test]
    fn test_select_all_spacing_uses_clamped_centers() {
        // 40 秒影片：37.75 會被拉回 30，與 4.75 只差 25.25
        let ranked = vec![group_at(4.75, 8, 3.5), group_at(37.75, 8, 3.5)];
        let moments = select_moments(&ranked, &policy(SelectionMode::All, 20.0), 40.0);

        assert_eq!(moments.len(), 1);
        assert!((moments[0].timestamp - 4.75).abs() < 1e-9);
    }

    #[test]
    fn test_select_all_keeps_clamped_center() {
        let ranked = vec![group_at(4.75, 8, 3.5), group_at(57.75, 8, 3.5)];
        let moments = select_moments(&ranked, &policy(SelectionMode::All, 20.0), 60.0);

        let centers: Vec<f64> = moments.iter().map(|m| m.timestamp).collect();
        assert_eq!(centers.len(), 2);
        assert!((centers[1] - 50.0).abs() < 1e-9);
        assert!(centers[1] - centers[0] >= 30.0);
    }

    #[test]
    fn test_select_all_requires_span() {
        let ranked = vec![group_at(40.0, 4, 1.0), group_at(100.0, 3, 5.0)];
        let moments = select_moments(&ranked, &policy(SelectionMode::All, 20.0), 1000.0);
        assert_eq!(moments.len(), 1);
        assert!((moments[0].timestamp - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_bounded_mode_looks_at_top_2n() {
        // n = 1：只看前兩個候選，兩個跨度都太短
        let ranked = vec![
            group_at(10.0, 9, 1.0),
            group_at(50.0, 8, 2.0),
            group_at(90.0, 7, 6.0),
        ];
        let none = select_moments(&ranked, &policy(SelectionMode::Count(1), 20.0), 1000.0);
        assert!(none.is_empty());

        let two = select_moments(&ranked, &policy(SelectionMode::Count(2), 20.0), 1000.0);
        assert_eq!(two.len(), 1);
        assert!((two[0].timestamp - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_bounded_mode_keeps_rank_order_without_spacing() {
        let ranked = vec![
            group_at(80.0, 6, 4.0),
            group_at(82.0, 5, 4.0),
            group_at(20.0, 4, 4.0),
        ];
        let moments = select_moments(&ranked, &policy(SelectionMode::Count(2), 20.0), 1000.0);
        assert_eq!(moments.len(), 2);
        assert!((moments[0].timestamp - 80.0).abs() < 1e-9);
        assert!((moments[1].timestamp - 82.0).abs() < 1e-9);
    }

    #[test]
    fn test_clamp_moments() {
        let moments = vec![
            Moment {
                timestamp: 118.0,
                intensity: 3,
                span: 4.0,
            },
            Moment {
                timestamp: -1.0,
                intensity: 3,
                span: 4.0,
            },
        ];
        let clamped = clamp_moments(moments, 120.0, 20.0);
        assert!((clamped[0].timestamp - 110.0).abs() < 1e-9);
        assert!(clamped[1].timestamp.abs() < 1e-9);
    }

    #[test]
    fn test_clamp_short_video_pins_to_zero() {
        let moments = vec![Moment {
            timestamp: 4.0,
            intensity: 3,
            span: 3.0,
        }];
        let clamped = clamp_moments(moments, 8.0, 25.0);
        assert!(clamped[0].timestamp.abs() < 1e-9);
    }

    #[test]
    fn test_file_prefix() {
        assert_eq!(SelectionMode::All.file_prefix(), "viral_clip");
        assert_eq!(SelectionMode::Count(5).file_prefix(), "shorts_clip");
    }
}
