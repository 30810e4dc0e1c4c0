pub mod compare;
pub mod extract;
pub mod fit;
pub mod run;
pub mod summary;

use propval_core::{BucketCount, ValidationConfig};

/// Start `env_logger` at `info`, or `debug` with `-v`. `RUST_LOG` wins.
pub fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .init();
}

/// Load the config file, or defaults when none is given. Exits on error.
pub fn load_config(path: Option<&str>) -> ValidationConfig {
    let Some(path) = path else {
        return ValidationConfig::default();
    };
    match ValidationConfig::load(path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}

/// Parse a comma-separated band list ("7, 14,21").
pub fn parse_bands(s: &str) -> Option<Vec<u32>> {
    let bands: Option<Vec<u32>> = s
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| t.parse().ok())
        .collect();
    bands.filter(|b| !b.is_empty())
}

/// Fixed-width number, `-` for `NaN`.
pub fn fmt_num(value: f64, width: usize, precision: usize) -> String {
    if value.is_nan() {
        format!("{:>width$}", "-")
    } else {
        format!("{value:>width$.precision$}")
    }
}

/// Non-empty histogram rows as `label +pos/-neg`, `-` when all are empty.
pub fn fmt_score_rows(rows: &[BucketCount]) -> String {
    let parts: Vec<String> = rows
        .iter()
        .filter(|r| r.positive + r.negative > 0)
        .map(|r| format!("{} +{}/-{}", r.label, r.positive, r.negative))
        .collect();
    if parts.is_empty() {
        "-".to_string()
    } else {
        parts.join(", ")
    }
}
