//! `propval compare` — one band into one aggregate file.

use propval_core::report::read_report;
use propval_core::{BandStatus, CircuitConfig, CircuitSession, PredictedReport, load_samples};

use super::{fmt_num, load_config};

pub fn run(
    report_path: &str,
    samples_path: &str,
    band: u32,
    output: &str,
    config_path: Option<&str>,
    circuit: &str,
) {
    let config = load_config(config_path);
    let circuit = match parse_circuit(circuit) {
        Some(c) => c,
        None => {
            eprintln!("Invalid circuit '{circuit}', expected TX_RX");
            std::process::exit(1);
        }
    };

    let report = match read_report(report_path) {
        Ok(doc) => PredictedReport::parse(&doc),
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };
    let samples = match load_samples(samples_path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    let mut session = CircuitSession::new(circuit, config, output);
    let outcome = match session.process_band(&report, band, &samples) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    match (outcome.status, outcome.summary) {
        (BandStatus::Compared, Some(s)) => {
            println!("Band {band} MHz → {output}");
            println!("  samples          {}", outcome.samples);
            println!("  hours compared   {}", s.hours_compared);
            println!("  mean |ΔSNR|      {} dB", fmt_num(s.mean_abs_delta_median, 0, 2));
            println!("  mean Cohen's d   {}", fmt_num(s.mean_cohens_d, 0, 2));
            println!(
                "  mean lvr up/lw   {} / {}",
                fmt_num(s.mean_log_variance_ratio_upper, 0, 2),
                fmt_num(s.mean_log_variance_ratio_lower, 0, 2)
            );
            println!(
                "  reliability      observed {} / fit {} / predicted {}",
                fmt_num(s.mean_reliability_observed, 0, 2),
                fmt_num(s.mean_reliability_observed_fit, 0, 2),
                fmt_num(s.mean_reliability_predicted, 0, 2)
            );
        }
        _ => println!("Band {band} MHz: no samples in {samples_path}, nothing written"),
    }
}

/// `TX_RX` circuit id; `None` unless both callsigns are present.
fn parse_circuit(id: &str) -> Option<CircuitConfig> {
    CircuitConfig::from_id(id.trim())
}
