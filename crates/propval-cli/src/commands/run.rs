//! `propval run` — every circuit and month under a data directory.
//!
//! Layout: `<data-dir>/<TX>_<RX>/<month>/` with the prediction report and
//! one sample file per band inside each month directory. Each month gets
//! its own aggregate next to its inputs.

use std::path::{Path, PathBuf};

use log::warn;
use propval_core::{BandStatus, CircuitConfig, CircuitSession, DirectoryStore, ValidationConfig};

use super::{fmt_score_rows, load_config, parse_bands};

pub fn run(data_dir: &str, config_path: Option<&str>, bands: Option<&str>) {
    let mut config = load_config(config_path);
    if let Some(list) = bands {
        match parse_bands(list) {
            Some(b) => config.bands = b,
            None => {
                eprintln!("Invalid band list '{list}'");
                std::process::exit(1);
            }
        }
    }

    let data_dir = PathBuf::from(data_dir);
    if !data_dir.is_dir() {
        eprintln!("No data directory at {}", data_dir.display());
        std::process::exit(1);
    }

    let circuits = circuit_dirs(&data_dir, &config);
    if circuits.is_empty() {
        println!("No TX_RX circuit directories in {}", data_dir.display());
        return;
    }

    let mut failed = 0usize;
    for (circuit, dir) in circuits {
        let months = month_dirs(&dir, &config.report_file);
        if months.is_empty() {
            warn!("{}: no month directory with {}", circuit.id(), config.report_file);
            continue;
        }

        // One session per circuit and month: each month has its own aggregate.
        for month in months {
            let label = month
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let mut session = CircuitSession::new(
                circuit.clone(),
                config.clone(),
                month.join(&config.output_file),
            );
            let store = DirectoryStore::new(&month);
            let summary = match session.run(&month.join(&config.report_file), &store) {
                Ok(s) => s,
                Err(e) => {
                    eprintln!("{} {label}: {e}", circuit.id());
                    failed += 1;
                    continue;
                }
            };

            let skipped = summary
                .bands
                .iter()
                .filter(|b| b.status == BandStatus::NoSamples)
                .count();
            let band_failures = summary
                .bands
                .iter()
                .filter(|b| b.status == BandStatus::Failed)
                .count();
            failed += band_failures;
            println!(
                "{:<24} {:<10} {} compared, {} without samples, {} failed",
                circuit.id(),
                label,
                summary.compared(),
                skipped,
                band_failures
            );
            println!("{:<24} cohen's d  {}", "", fmt_score_rows(&summary.score.cohens_d));
            println!("{:<24} lvr up     {}", "", fmt_score_rows(&summary.score.lvr_up));
            println!("{:<24} lvr lw     {}", "", fmt_score_rows(&summary.score.lvr_lw));
        }
    }

    if failed > 0 {
        eprintln!("{failed} band(s) failed, see log output");
        std::process::exit(1);
    }
}

/// Circuit directories to process: the configured circuits, or every
/// `TX_RX` directory when none are configured.
fn circuit_dirs(data_dir: &Path, config: &ValidationConfig) -> Vec<(CircuitConfig, PathBuf)> {
    if !config.circuits.is_empty() {
        return config
            .circuits
            .iter()
            .map(|c| (c.clone(), data_dir.join(c.id())))
            .filter(|(c, dir)| {
                let exists = dir.is_dir();
                if !exists {
                    warn!("{}: no directory at {}", c.id(), dir.display());
                }
                exists
            })
            .collect();
    }

    let mut found: Vec<(CircuitConfig, PathBuf)> = subdirs(data_dir)
        .into_iter()
        .filter_map(|dir| {
            let name = dir.file_name()?.to_str()?.to_string();
            CircuitConfig::from_id(&name).map(|c| (c, dir))
        })
        .collect();
    found.sort_by(|a, b| a.1.cmp(&b.1));
    found
}

/// Month directories of one circuit that hold a report, in name order.
fn month_dirs(circuit_dir: &Path, report_file: &str) -> Vec<PathBuf> {
    let mut months: Vec<PathBuf> = subdirs(circuit_dir)
        .into_iter()
        .filter(|d| d.join(report_file).is_file())
        .collect();
    months.sort();
    months
}

fn subdirs(dir: &Path) -> Vec<PathBuf> {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.is_dir())
            .collect(),
        Err(e) => {
            warn!("Failed to read {}: {e}", dir.display());
            Vec::new()
        }
    }
}
