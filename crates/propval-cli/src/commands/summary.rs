//! `propval summary` — per-band averages and circuit-wide score histogram.

use propval_core::{BucketCount, CircuitAggregate, ComparisonSummary, RequiredSnr};
use serde::Serialize;

use super::fmt_num;

#[derive(Serialize)]
struct BandSummary {
    band: u32,
    samples: usize,
    required_snr: RequiredSnr,
    reliability_observed: f64,
    reliability_predicted: f64,
    comparison: ComparisonSummary,
}

#[derive(Serialize)]
struct CircuitSummary {
    bands: Vec<BandSummary>,
    cohens_d: Vec<BucketCount>,
    lvr_up: Vec<BucketCount>,
    lvr_lw: Vec<BucketCount>,
}

fn summarize(aggregate: &CircuitAggregate) -> CircuitSummary {
    let bands = aggregate
        .bands()
        .map(|(band, entry)| BandSummary {
            band,
            samples: entry.total_samples(),
            required_snr: entry.required_snr,
            reliability_observed: entry.reliability.observed.avg,
            reliability_predicted: entry.reliability.predicted.avg,
            comparison: entry.summary(),
        })
        .collect();
    let total = aggregate.score_total();
    CircuitSummary {
        bands,
        cohens_d: total.cohens_d.to_rows(),
        lvr_up: total.lvr_upper.to_rows(),
        lvr_lw: total.lvr_lower.to_rows(),
    }
}

pub fn run(path: &str, json: bool) {
    let aggregate = match CircuitAggregate::load(path) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };
    if aggregate.is_empty() {
        println!("No bands in {path}");
        return;
    }

    let summary = summarize(&aggregate);

    if json {
        match serde_json::to_string_pretty(&summary) {
            Ok(s) => println!("{s}"),
            Err(e) => {
                eprintln!("Failed to serialize summary: {e}");
                std::process::exit(1);
            }
        }
        return;
    }

    println!(
        "{:>5} {:>7} {:>6} {:>8} {:>7} {:>8} {:>8} {:>8}",
        "Band", "Samples", "Hours", "|ΔSNR|", "d", "REL obs", "REL pred", "REQ_SNR"
    );
    println!("{}", "-".repeat(64));
    for b in &summary.bands {
        println!(
            "{:>5} {:>7} {:>6} {} {} {} {} {}",
            b.band,
            b.samples,
            b.comparison.hours_compared,
            fmt_num(b.comparison.mean_abs_delta_median, 8, 2),
            fmt_num(b.comparison.mean_cohens_d, 7, 2),
            fmt_num(b.reliability_observed, 8, 2),
            fmt_num(b.reliability_predicted, 8, 2),
            fmt_num(b.required_snr.mu, 8, 1),
        );
    }

    println!();
    println!(
        "{:<12} {:>11} {:>11} {:>11}",
        "Score", "d (+/-)", "lvr up", "lvr lw"
    );
    println!("{}", "-".repeat(48));
    for ((d, up), lw) in summary.cohens_d.iter().zip(&summary.lvr_up).zip(&summary.lvr_lw) {
        println!(
            "{:<12} {:>11} {:>11} {:>11}",
            d.label,
            format!("{}/{}", d.positive, d.negative),
            format!("{}/{}", up.positive, up.negative),
            format!("{}/{}", lw.positive, lw.negative),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use propval_core::{
        BandEntry, ComparisonRecord, HOURS, SplitNormalParams, classify_records, compare_hour,
    };

    fn entry(observed_median: f64) -> BandEntry {
        let obs = SplitNormalParams::new(observed_median, 3.0, 4.0);
        let pred = SplitNormalParams::new(-20.0, 3.0, 4.0);
        let records: Vec<ComparisonRecord> = (0..HOURS as u32)
            .map(|h| compare_hour(h, &obs, &pred, &[observed_median], -25.0))
            .collect();
        let required = RequiredSnr {
            mu: -25.0,
            sigma: 1.0,
            n: 24,
        };
        BandEntry::new(required, records.clone(), &[1; HOURS], &classify_records(&records))
    }

    #[test]
    fn test_summarize_orders_bands_and_sums_scores() {
        let mut agg = CircuitAggregate::new();
        agg.merge(14, entry(-20.0));
        agg.merge(7, entry(-40.0));

        let summary = summarize(&agg);
        let bands: Vec<u32> = summary.bands.iter().map(|b| b.band).collect();
        assert_eq!(bands, vec![7, 14]);
        assert_eq!(summary.bands[0].samples, HOURS);
        assert_eq!(summary.bands[1].comparison.mean_abs_delta_median, 0.0);

        let d_total: u32 = summary.cohens_d.iter().map(|r| r.positive + r.negative).sum();
        assert_eq!(d_total, 2 * HOURS as u32);
        // Band 7 sits 20 dB below the prediction: d = 20 / sqrt(12.5) ≈ 5.7.
        assert_eq!(summary.cohens_d[2].label, "Medium");
        assert_eq!(summary.cohens_d[2].positive, HOURS as u32);
    }
}
