//! NaN-aware numeric helpers shared by the estimator, comparison and
//! aggregation stages.
//!
//! Every statistic in this crate uses `NaN` for "undefined" (no samples,
//! zero spread). Aggregates skip `NaN`s instead of treating them as zero.

use serde::{Deserialize, Deserializer};
use statrs::statistics::Statistics;

/// Number of hour slots in a day.
pub const HOURS: usize = 24;

/// Linear-interpolated percentile of ascending sorted values.
///
/// `p` is in percent (0–100). With `rank = p/100 * (n - 1)` the result is
/// `x[floor(rank)] + (x[ceil(rank)] - x[floor(rank)]) * frac(rank)`, the
/// conventional definition (numpy's `linear` method). Returns `NaN` for an
/// empty slice or a `p` outside 0–100.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() || !(0.0..=100.0).contains(&p) {
        return f64::NAN;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Mean of the non-NaN values, `NaN` if there are none.
pub fn nan_mean(values: &[f64]) -> f64 {
    let defined: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if defined.is_empty() {
        return f64::NAN;
    }
    defined.mean()
}

/// Mean of the absolute non-NaN values, `NaN` if there are none.
pub fn nan_mean_abs(values: &[f64]) -> f64 {
    let abs: Vec<f64> = values.iter().map(|v| v.abs()).collect();
    nan_mean(&abs)
}

/// Count of non-NaN values.
pub fn count_defined(values: &[f64]) -> usize {
    values.iter().filter(|v| !v.is_nan()).count()
}

/// Deserialize a float that may have been written as JSON `null` (NaN).
pub fn f64_or_nan<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}

/// Deserialize a float list whose undefined entries were written as `null`.
pub fn vec_f64_or_nan<'de, D>(deserializer: D) -> Result<Vec<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<Option<f64>>::deserialize(deserializer)?;
    Ok(raw.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
}
