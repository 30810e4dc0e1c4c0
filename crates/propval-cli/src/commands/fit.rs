//! `propval fit` — observed split-normal per hour from one sample file.

use propval_core::{HOURS, HourlySamples, ObservedFit, load_samples};
use serde::Serialize;

use super::fmt_num;

#[derive(Serialize)]
struct FitReport<'a> {
    samples: usize,
    hours: Vec<HourFit>,
    required_snr: &'a propval_core::RequiredSnr,
}

#[derive(Serialize)]
struct HourFit {
    hour: usize,
    n: usize,
    median: f64,
    sigma_upper: f64,
    sigma_lower: f64,
    required_snr: f64,
}

pub fn run(path: &str, min_samples: usize, json: bool) {
    let samples = match load_samples(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };
    if samples.is_empty() {
        println!("No samples in {path}");
        return;
    }

    let hourly = HourlySamples::partition(&samples);
    let fit = ObservedFit::estimate(&hourly, min_samples);

    let hours: Vec<HourFit> = (0..HOURS)
        .map(|h| HourFit {
            hour: h,
            n: fit.sample_counts[h],
            median: fit.params[h].median,
            sigma_upper: fit.params[h].sigma_upper,
            sigma_lower: fit.params[h].sigma_lower,
            required_snr: fit.required_snr_hourly[h],
        })
        .collect();

    if json {
        let report = FitReport {
            samples: samples.len(),
            hours,
            required_snr: &fit.required_snr,
        };
        match serde_json::to_string_pretty(&report) {
            Ok(s) => println!("{s}"),
            Err(e) => {
                eprintln!("Failed to serialize fit: {e}");
                std::process::exit(1);
            }
        }
        return;
    }

    println!(
        "{} samples, {}/{} hours with data\n",
        samples.len(),
        fit.hours_with_data(),
        HOURS
    );
    println!(
        "{:>4} {:>6} {:>8} {:>8} {:>8} {:>8}",
        "Hour", "N", "Median", "σ up", "σ lw", "p1"
    );
    println!("{}", "-".repeat(47));
    for h in &hours {
        println!(
            "{:>4} {:>6} {} {} {} {}",
            h.hour,
            h.n,
            fmt_num(h.median, 8, 1),
            fmt_num(h.sigma_upper, 8, 2),
            fmt_num(h.sigma_lower, 8, 2),
            fmt_num(h.required_snr, 8, 1),
        );
    }
    println!(
        "\nREQ_SNR: mu {} dB, sigma {} dB over {} hours",
        fmt_num(fit.required_snr.mu, 0, 1),
        fmt_num(fit.required_snr.sigma, 0, 2),
        fit.required_snr.n
    );
}
