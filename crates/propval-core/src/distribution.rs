//! Split-normal fits and empirical distributions of hourly SNR.
//!
//! Observed SNR is skewed around its median: fades pull the lower tail
//! further than enhancements push the upper one. Each side therefore gets
//! its own spread, derived from the 10th/90th percentiles and scaled by the
//! standard-normal z-score of the 90th percentile (1.28) into an equivalent
//! Gaussian sigma. The prediction report publishes its decile offsets the
//! same way, so both sides reduce to the same three numbers.

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::observation::HourlySamples;
use crate::report::{PredictionTable, ReportField};
use crate::stats::{HOURS, f64_or_nan, percentile};

/// z-score separating the 10th/90th percentile from the median.
pub const DECILE_Z: f64 = 1.28;

/// Percentile used as the per-hour "required SNR".
pub const REQUIRED_SNR_PERCENTILE: f64 = 1.0;

/// Median plus independent upper/lower spreads. All `NaN` when undefined.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplitNormalParams {
    #[serde(deserialize_with = "f64_or_nan")]
    pub median: f64,
    #[serde(deserialize_with = "f64_or_nan")]
    pub sigma_upper: f64,
    #[serde(deserialize_with = "f64_or_nan")]
    pub sigma_lower: f64,
}

impl Default for SplitNormalParams {
    fn default() -> Self {
        Self::undefined()
    }
}

impl SplitNormalParams {
    pub fn new(median: f64, sigma_upper: f64, sigma_lower: f64) -> Self {
        Self {
            median,
            sigma_upper,
            sigma_lower,
        }
    }

    pub fn undefined() -> Self {
        Self::new(f64::NAN, f64::NAN, f64::NAN)
    }

    /// True when all three parameters are numbers.
    pub fn is_defined(&self) -> bool {
        !(self.median.is_nan() || self.sigma_upper.is_nan() || self.sigma_lower.is_nan())
    }

    /// Fit from ascending sorted samples: p50 and the p10/p90 offsets.
    /// Undefined for an empty slice.
    pub fn from_sorted(sorted: &[f64]) -> Self {
        if sorted.is_empty() {
            return Self::undefined();
        }
        let median = percentile(sorted, 50.0);
        let p90 = percentile(sorted, 90.0);
        let p10 = percentile(sorted, 10.0);
        Self::new(
            median,
            (median - p90).abs() / DECILE_Z,
            (median - p10).abs() / DECILE_Z,
        )
    }

    /// Predicted fit from the report's SNR and its decile offsets.
    /// `snr_offset` converts the model's 1 Hz reference bandwidth to the
    /// observed reporting bandwidth.
    pub fn from_prediction(snr: f64, snr_up: f64, snr_lw: f64, snr_offset: f64) -> Self {
        Self::new(
            snr - snr_offset,
            snr_up.abs() / DECILE_Z,
            snr_lw.abs() / DECILE_Z,
        )
    }
}

/// Distinct SNR values and their relative frequency for one hour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmpiricalDistribution {
    pub support: Vec<i32>,
    pub probability: Vec<f64>,
    pub sample_size: usize,
}

impl EmpiricalDistribution {
    /// Build from ascending sorted samples. `None` when there are none.
    pub fn from_sorted(sorted: &[f64]) -> Option<Self> {
        if sorted.is_empty() {
            return None;
        }
        let n = sorted.len();
        let mut support = Vec::new();
        let mut counts: Vec<usize> = Vec::new();
        for &v in sorted {
            let v = v as i32;
            match support.last() {
                Some(&last) if last == v => {
                    if let Some(c) = counts.last_mut() {
                        *c += 1;
                    }
                }
                _ => {
                    support.push(v);
                    counts.push(1);
                }
            }
        }
        let probability = counts.iter().map(|&c| c as f64 / n as f64).collect();
        Some(Self {
            support,
            probability,
            sample_size: n,
        })
    }

    /// Probability mass at `snr`, 0 outside the support.
    pub fn pmf(&self, snr: i32) -> f64 {
        self.support
            .binary_search(&snr)
            .map(|i| self.probability[i])
            .unwrap_or(0.0)
    }

    /// Probability of a value at or above `threshold`.
    pub fn survival(&self, threshold: f64) -> f64 {
        self.support
            .iter()
            .zip(&self.probability)
            .filter(|(v, _)| f64::from(**v) >= threshold)
            .map(|(_, p)| p)
            .sum()
    }
}

/// Symmetric Gaussian fit of the per-hour required SNR across the day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RequiredSnr {
    #[serde(deserialize_with = "f64_or_nan")]
    pub mu: f64,
    #[serde(deserialize_with = "f64_or_nan")]
    pub sigma: f64,
    /// Hours that contributed.
    pub n: usize,
}

impl RequiredSnr {
    /// Maximum-likelihood normal fit (mean, population deviation) of the
    /// defined values. `NaN` location and spread when none are defined.
    pub fn fit(per_hour: &[f64]) -> Self {
        let values: Vec<f64> = per_hour.iter().copied().filter(|v| !v.is_nan()).collect();
        if values.is_empty() {
            return Self {
                mu: f64::NAN,
                sigma: f64::NAN,
                n: 0,
            };
        }
        Self {
            mu: values.iter().mean(),
            sigma: values.iter().population_std_dev(),
            n: values.len(),
        }
    }
}

/// Observed-side output for one band: per-hour fits and distributions.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservedFit {
    pub params: [SplitNormalParams; HOURS],
    pub distributions: Vec<Option<EmpiricalDistribution>>,
    pub sample_counts: [usize; HOURS],
    /// 1st percentile per hour, `NaN` for hours without data.
    pub required_snr_hourly: [f64; HOURS],
    pub required_snr: RequiredSnr,
}

impl ObservedFit {
    /// Fit every hour. Hours with fewer than `min_samples` samples get an
    /// undefined split-normal fit but keep their empirical distribution.
    pub fn estimate(samples: &HourlySamples, min_samples: usize) -> Self {
        let mut params = [SplitNormalParams::undefined(); HOURS];
        let mut required_snr_hourly = [f64::NAN; HOURS];
        let mut distributions = Vec::with_capacity(HOURS);
        let min_samples = min_samples.max(1);

        for h in 0..HOURS {
            let sorted = samples.hour(h);
            if sorted.len() >= min_samples {
                params[h] = SplitNormalParams::from_sorted(sorted);
            }
            required_snr_hourly[h] = percentile(sorted, REQUIRED_SNR_PERCENTILE);
            distributions.push(EmpiricalDistribution::from_sorted(sorted));
        }

        Self {
            params,
            distributions,
            sample_counts: samples.counts(),
            required_snr: RequiredSnr::fit(&required_snr_hourly),
            required_snr_hourly,
        }
    }

    /// Hours with at least one sample.
    pub fn hours_with_data(&self) -> usize {
        self.sample_counts.iter().filter(|&&c| c > 0).count()
    }
}

/// Predicted split-normal per hour at `frequency`, from the report's
/// SNR / SNR UP / SNR LW tables.
pub fn predicted_params(
    snr: &PredictionTable,
    snr_up: &PredictionTable,
    snr_lw: &PredictionTable,
    frequency: u32,
    snr_offset: f64,
) -> [SplitNormalParams; HOURS] {
    debug_assert_eq!(snr.field(), ReportField::Snr);
    debug_assert_eq!(snr_up.field(), ReportField::SnrUp);
    debug_assert_eq!(snr_lw.field(), ReportField::SnrLw);

    let median = snr.hourly(frequency);
    let up = snr_up.hourly(frequency);
    let lw = snr_lw.hourly(frequency);
    let mut out = [SplitNormalParams::undefined(); HOURS];
    for h in 0..HOURS {
        out[h] = SplitNormalParams::from_prediction(median[h], up[h], lw[h], snr_offset);
    }
    out
}
