/// 群組內相鄰峰值的最大間隔（秒）
pub const MAX_PEAK_GAP_SECONDS: f64 = 5.0;

/// 成為群組所需的最少峰值數
pub const MIN_GROUP_SIZE: usize = 2;

/// 成為候選片段所需的最少峰值數
pub const MIN_CANDIDATE_SIZE: usize = 3;

/// 時間上相鄰的一組峰值
#[derive(Debug, Clone, PartialEq)]
pub struct PeakGroup {
    members: Vec<f64>,
}

impl PeakGroup {
    /// `members` 必須已排序
    #[must_use]
    pub const fn new(members: Vec<f64>) -> Self {
        Self { members }
    }

    #[must_use]
    pub fn members(&self) -> &[f64] {
        &self.members
    }

    /// 成員時間點的平均值
    #[must_use]
    pub fn center(&self) -> f64 {
        if self.members.is_empty() {
            return 0.0;
        }
        self.members.iter().sum::<f64>() / self.members.len() as f64
    }

    #[must_use]
    pub fn intensity(&self) -> usize {
        self.members.len()
    }

    #[must_use]
    pub fn span(&self) -> f64 {
        match (self.members.first(), self.members.last()) {
            (Some(first), Some(last)) => last - first,
            _ => 0.0,
        }
    }
}

/// 合併各訊號的峰值並排序，完全相同的時間點只保留一個
#[must_use]
pub fn pool_peaks(signals: &[Vec<f64>]) -> Vec<f64> {
    let mut pooled: Vec<f64> = signals
        .iter()
        .flatten()
        .copied()
        .filter(|t| t.is_finite())
        .collect();
    pooled.sort_by(f64::total_cmp);
    pooled.dedup();
    pooled
}

/// 將排序後的峰值切成相鄰間隔不超過 `max_gap` 的群組
///
/// 少於 [`MIN_GROUP_SIZE`] 個成員的群組會被丟棄。
#[must_use]
pub fn group_peaks(peaks: &[f64], max_gap: f64) -> Vec<PeakGroup> {
    let mut groups = Vec::new();
    let mut current: Vec<f64> = Vec::new();

    for &peak in peaks {
        if current.last().is_some_and(|&last| peak - last > max_gap) {
            groups.push(std::mem::take(&mut current));
        }
        current.push(peak);
    }
    if !current.is_empty() {
        groups.push(current);
    }

    groups
        .into_iter()
        .filter(|members| members.len() >= MIN_GROUP_SIZE)
        .map(PeakGroup::new)
        .collect()
}

/// 篩出候選群組並依強度由高到低排序
///
/// 排序是穩定的：強度相同時維持時間順序。
#[must_use]
pub fn rank_candidates(groups: Vec<PeakGroup>) -> Vec<PeakGroup> {
    let mut candidates: Vec<PeakGroup> = groups
        .into_iter()
        .filter(|group| group.intensity() >= MIN_CANDIDATE_SIZE)
        .collect();
    candidates.sort_by(|a, b| b.intensity().cmp(&a.intensity()));
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_peaks_sorts_and_dedups() {
        let pooled = pool_peaks(&[vec![10.0, 2.0], vec![2.0, 7.5], vec![]]);
        assert_eq!(pooled, vec![2.0, 7.5, 10.0]);
    }

    #[test]
    fn test_group_gap_rule() {
        let peaks = [1.0, 2.0, 7.0, 12.5, 13.0, 30.0];
        let groups = group_peaks(&peaks, MAX_PEAK_GAP_SECONDS);

        // 1,2,7 間隔都 ≤ 5；12.5 與 7 差 5.5 另起一組；30 單獨被丟棄
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].members(), &[1.0, 2.0, 7.0]);
        assert_eq!(groups[1].members(), &[12.5, 13.0]);
    }

    #[test]
    fn test_gap_exactly_at_limit_joins() {
        let groups = group_peaks(&[0.0, 5.0], MAX_PEAK_GAP_SECONDS);
        assert_eq!(groups.len(), 1);
    }

    #[test]
    fn test_group_attributes() {
        let group = PeakGroup::new(vec![59.0, 59.5, 60.0, 60.5]);
        assert!((group.center() - 59.75).abs() < 1e-9);
        assert_eq!(group.intensity(), 4);
        assert!((group.span() - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_groups_cover_every_kept_peak() {
        let peaks = [0.0, 0.5, 1.0, 20.0, 21.0, 22.0, 23.0, 60.0];
        let groups = group_peaks(&peaks, MAX_PEAK_GAP_SECONDS);
        let covered: Vec<f64> = groups.iter().flat_map(|g| g.members().to_vec()).collect();
        assert_eq!(covered, vec![0.0, 0.5, 1.0, 20.0, 21.0, 22.0, 23.0]);
        for group in &groups {
            for pair in group.members().windows(2) {
                assert!(pair[1] - pair[0] <= MAX_PEAK_GAP_SECONDS);
            }
        }
    }

    #[test]
    fn test_rank_candidates_is_stable() {
        let groups = vec![
            PeakGroup::new(vec![1.0, 2.0]),
            PeakGroup::new(vec![10.0, 11.0, 12.0]),
            PeakGroup::new(vec![30.0, 31.0, 32.0, 33.0]),
            PeakGroup::new(vec![50.0, 51.0, 52.0]),
        ];
        let ranked = rank_candidates(groups);

        let centers: Vec<f64> = ranked.iter().map(PeakGroup::center).collect();
        assert_eq!(centers, vec![31.5, 11.0, 51.0]);
    }
}
