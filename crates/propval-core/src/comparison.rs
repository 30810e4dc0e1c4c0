//! Hour-by-hour agreement metrics between a predicted and an observed
//! split-normal fit.
//!
//! Sign conventions: `delta_*` fields are observed − predicted, Cohen's d
//! is predicted − observed. Undefined inputs give `NaN` outputs, with one
//! exception: the empirical reliability of an hour without samples is 0.

use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};

use crate::distribution::SplitNormalParams;
use crate::observation::HourlySamples;
use crate::stats::{HOURS, count_defined, f64_or_nan, nan_mean, nan_mean_abs};

/// Comparison of one hour.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRecord {
    pub hour: u32,
    #[serde(deserialize_with = "f64_or_nan")]
    pub delta_median: f64,
    #[serde(deserialize_with = "f64_or_nan")]
    pub delta_sigma_upper: f64,
    #[serde(deserialize_with = "f64_or_nan")]
    pub delta_sigma_lower: f64,
    #[serde(deserialize_with = "f64_or_nan")]
    pub cohens_d: f64,
    #[serde(deserialize_with = "f64_or_nan")]
    pub log_variance_ratio_upper: f64,
    #[serde(deserialize_with = "f64_or_nan")]
    pub log_variance_ratio_lower: f64,
    /// Fraction of observed samples at or above the threshold.
    #[serde(deserialize_with = "f64_or_nan")]
    pub reliability_observed: f64,
    /// Reliability implied by the observed split-normal fit.
    #[serde(deserialize_with = "f64_or_nan")]
    pub reliability_observed_fit: f64,
    /// Reliability implied by the predicted split-normal fit.
    #[serde(deserialize_with = "f64_or_nan")]
    pub reliability_predicted: f64,
}

/// Standard normal CDF.
pub fn standard_normal_cdf(z: f64) -> f64 {
    Normal::standard().cdf(z)
}

/// Pooled-spread standardized median difference between two split-normal
/// fits, (predicted − observed) / sqrt(mean of the four squared sigmas).
pub fn cohens_d(observed: &SplitNormalParams, predicted: &SplitNormalParams) -> f64 {
    let pooled = ((observed.sigma_upper.powi(2)
        + observed.sigma_lower.powi(2)
        + predicted.sigma_upper.powi(2)
        + predicted.sigma_lower.powi(2))
        / 4.0)
        .sqrt();
    if pooled == 0.0 {
        return f64::NAN;
    }
    (predicted.median - observed.median) / pooled
}

/// `ln(numerator / denominator)`; `NaN` if either spread is 0 or undefined.
pub fn log_variance_ratio(numerator: f64, denominator: f64) -> f64 {
    if numerator == 0.0 || denominator == 0.0 || numerator.is_nan() || denominator.is_nan() {
        return f64::NAN;
    }
    (numerator / denominator).ln()
}

/// Probability that SNR meets or exceeds `threshold` under a split-normal
/// fit. The lower sigma is used for thresholds above the median, the upper
/// sigma otherwise. `NaN` if that sigma is 0 or any input is undefined.
pub fn reliability(params: &SplitNormalParams, threshold: f64) -> f64 {
    let side = if threshold > params.median {
        params.sigma_lower
    } else {
        params.sigma_upper
    };
    if side == 0.0 || side.is_nan() || params.median.is_nan() || threshold.is_nan() {
        return f64::NAN;
    }
    standard_normal_cdf((params.median - threshold) / side)
}

/// Fraction of `samples` at or above `threshold`. An empty hour counts as 0.
pub fn empirical_reliability(samples: &[f64], threshold: f64) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    if threshold.is_nan() {
        return f64::NAN;
    }
    samples.iter().filter(|&&s| s >= threshold).count() as f64 / samples.len() as f64
}

/// Compare one hour.
pub fn compare_hour(
    hour: u32,
    observed: &SplitNormalParams,
    predicted: &SplitNormalParams,
    samples: &[f64],
    threshold: f64,
) -> ComparisonRecord {
    ComparisonRecord {
        hour,
        delta_median: observed.median - predicted.median,
        delta_sigma_upper: observed.sigma_upper - predicted.sigma_upper,
        delta_sigma_lower: observed.sigma_lower - predicted.sigma_lower,
        cohens_d: cohens_d(observed, predicted),
        log_variance_ratio_upper: log_variance_ratio(predicted.sigma_upper, observed.sigma_upper),
        log_variance_ratio_lower: log_variance_ratio(predicted.sigma_lower, observed.sigma_lower),
        reliability_observed: empirical_reliability(samples, threshold),
        reliability_observed_fit: reliability(observed, threshold),
        reliability_predicted: reliability(predicted, threshold),
    }
}

/// Compare all 24 hours of one band.
pub fn compare(
    observed: &[SplitNormalParams; HOURS],
    predicted: &[SplitNormalParams; HOURS],
    samples: &HourlySamples,
    threshold: f64,
) -> Vec<ComparisonRecord> {
    (0..HOURS)
        .map(|h| compare_hour(h as u32, &observed[h], &predicted[h], samples.hour(h), threshold))
        .collect()
}

/// NaN-skipping daily averages of a band's comparison.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComparisonSummary {
    /// Hours whose Cohen's d is defined.
    pub hours_compared: usize,
    #[serde(deserialize_with = "f64_or_nan")]
    pub mean_abs_delta_median: f64,
    #[serde(deserialize_with = "f64_or_nan")]
    pub mean_abs_delta_sigma_upper: f64,
    #[serde(deserialize_with = "f64_or_nan")]
    pub mean_abs_delta_sigma_lower: f64,
    #[serde(deserialize_with = "f64_or_nan")]
    pub mean_cohens_d: f64,
    #[serde(deserialize_with = "f64_or_nan")]
    pub mean_log_variance_ratio_upper: f64,
    #[serde(deserialize_with = "f64_or_nan")]
    pub mean_log_variance_ratio_lower: f64,
    #[serde(deserialize_with = "f64_or_nan")]
    pub mean_reliability_observed: f64,
    #[serde(deserialize_with = "f64_or_nan")]
    pub mean_reliability_observed_fit: f64,
    #[serde(deserialize_with = "f64_or_nan")]
    pub mean_reliability_predicted: f64,
}

impl ComparisonSummary {
    pub fn from_records(records: &[ComparisonRecord]) -> Self {
        let col = |f: fn(&ComparisonRecord) -> f64| -> Vec<f64> { records.iter().map(f).collect() };
        let cohens = col(|r| r.cohens_d);
        Self {
            hours_compared: count_defined(&cohens),
            mean_abs_delta_median: nan_mean_abs(&col(|r| r.delta_median)),
            mean_abs_delta_sigma_upper: nan_mean_abs(&col(|r| r.delta_sigma_upper)),
            mean_abs_delta_sigma_lower: nan_mean_abs(&col(|r| r.delta_sigma_lower)),
            mean_cohens_d: nan_mean(&cohens),
            mean_log_variance_ratio_upper: nan_mean(&col(|r| r.log_variance_ratio_upper)),
            mean_log_variance_ratio_lower: nan_mean(&col(|r| r.log_variance_ratio_lower)),
            mean_reliability_observed: nan_mean(&col(|r| r.reliability_observed)),
            mean_reliability_observed_fit: nan_mean(&col(|r| r.reliability_observed_fit)),
            mean_reliability_predicted: nan_mean(&col(|r| r.reliability_predicted)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(m: f64, up: f64, lw: f64) -> SplitNormalParams {
        SplitNormalParams::new(m, up, lw)
    }

    #[test]
    fn test_deltas_are_observed_minus_predicted() {
        let r = compare_hour(7, &p(-12.0, 4.0, 6.0), &p(-15.0, 5.0, 3.0), &[-12.0], -20.0);
        assert_eq!(r.hour, 7);
        assert_eq!(r.delta_median, 3.0);
        assert_eq!(r.delta_sigma_upper, -1.0);
        assert_eq!(r.delta_sigma_lower, 3.0);
    }

    #[test]
    fn test_cohens_d_is_predicted_minus_observed_over_pooled() {
        let obs = p(-10.0, 2.0, 2.0);
        let pred = p(-6.0, 2.0, 2.0);
        assert!((cohens_d(&obs, &pred) - 2.0).abs() < 1e-12);
        assert!((cohens_d(&pred, &obs) + 2.0).abs() < 1e-12);
        assert!(cohens_d(&p(1.0, 0.0, 0.0), &p(2.0, 0.0, 0.0)).is_nan());
    }

    #[test]
    fn test_log_variance_ratio_is_antisymmetric() {
        for (a, b) in [(1.0, 2.0), (0.3, 7.5), (4.0, 4.0), (12.5, 0.01)] {
            let ab = log_variance_ratio(a, b);
            let ba = log_variance_ratio(b, a);
            assert!((ab + ba).abs() < 1e-12, "{a} {b}");
        }
        assert!((log_variance_ratio(2.0, 1.0) - 2f64.ln()).abs() < 1e-12);
        assert!(log_variance_ratio(0.0, 1.0).is_nan());
        assert!(log_variance_ratio(1.0, 0.0).is_nan());
        assert!(log_variance_ratio(f64::NAN, 1.0).is_nan());
    }

    #[test]
    fn test_reliability_is_bounded_and_centered() {
        let fit = p(-14.0, 3.0, 5.0);
        for t in [-60.0, -30.0, -20.0, -14.0, -10.0, 0.0, 40.0] {
            let r = reliability(&fit, t);
            assert!((0.0..=1.0).contains(&r), "threshold {t} gave {r}");
        }
        let sym = p(-14.0, 4.0, 4.0);
        assert!((reliability(&sym, -14.0) - 0.5).abs() < 1e-12);
        // Lower thresholds are easier to meet.
        assert!(reliability(&fit, -30.0) > reliability(&fit, -20.0));
    }

    #[test]
    fn test_reliability_side_selection() {
        let fit = p(0.0, 1.0, 2.0);
        // Above the median the lower sigma applies.
        assert!((reliability(&fit, 2.0) - standard_normal_cdf(-1.0)).abs() < 1e-12);
        // At or below it the upper sigma applies.
        assert!((reliability(&fit, -1.0) - standard_normal_cdf(1.0)).abs() < 1e-12);
        assert!(reliability(&p(0.0, 0.0, 2.0), -1.0).is_nan());
        assert!(reliability(&SplitNormalParams::undefined(), 0.0).is_nan());
    }

    #[test]
    fn test_empirical_reliability_counts_at_or_above() {
        assert_eq!(empirical_reliability(&[-20.0, -10.0, -5.0, 0.0], -10.0), 0.75);
        assert_eq!(empirical_reliability(&[], -10.0), 0.0);
        assert!(empirical_reliability(&[1.0], f64::NAN).is_nan());
    }

    #[test]
    fn test_standard_normal_cdf_reference_points() {
        assert!((standard_normal_cdf(0.0) - 0.5).abs() < 1e-15);
        assert!((standard_normal_cdf(1.28) - 0.899_727_4).abs() < 1e-6);
        assert!((standard_normal_cdf(-1.96) - 0.024_997_9).abs() < 1e-6);
    }

    #[test]
    fn test_empty_hour_propagates_nan_except_empirical_reliability() {
        let mut observed = [p(-10.0, 3.0, 4.0); HOURS];
        observed[6] = SplitNormalParams::undefined();
        let predicted = [p(-12.0, 2.0, 5.0); HOURS];
        let mut raw = vec![vec![-10, -9, -11]; HOURS];
        raw[6].clear();
        let samples = HourlySamples::from_hours(raw);

        let records = compare(&observed, &predicted, &samples, -15.0);
        assert_eq!(records.len(), HOURS);
        let empty = &records[6];
        assert!(empty.delta_median.is_nan());
        assert!(empty.cohens_d.is_nan());
        assert!(empty.log_variance_ratio_upper.is_nan());
        assert!(empty.log_variance_ratio_lower.is_nan());
        assert!(empty.reliability_observed_fit.is_nan());
        assert_eq!(empty.reliability_observed, 0.0);
        assert!(!empty.reliability_predicted.is_nan());

        let summary = ComparisonSummary::from_records(&records);
        assert_eq!(summary.hours_compared, 23);
        assert!((summary.mean_abs_delta_median - 2.0).abs() < 1e-12);
        assert!((summary.mean_cohens_d - records[0].cohens_d).abs() < 1e-12);
    }
}
