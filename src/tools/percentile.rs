//! 百分位數計算
//!
//! 採用線性內插（與常見數值函式庫的預設行為相同），
//! 每次執行都以完整樣本重新計算，不做串流估計。

/// 計算百分位數
///
/// # Arguments
/// * `values` - 樣本值（不需預先排序）
/// * `percentile` - 0 到 100 之間的百分位
///
/// # Returns
/// 樣本為空時回傳 `None`
#[must_use]
pub fn percentile(values: &[f64], percentile: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);

    let p = percentile.clamp(0.0, 100.0) / 100.0;
    let rank = p * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;

    if lower == upper {
        return Some(sorted[lower]);
    }

    let weight = rank - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * weight)
}
