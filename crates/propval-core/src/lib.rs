//! # propval-core
//!
//! **Does the propagation model agree with what was actually received?**
//!
//! `propval-core` compares an ionospheric propagation prediction for an HF
//! circuit against the SNR reports collected on that circuit, hour by hour
//! and band by band.
//!
//! ## Quick Start
//!
//! ```no_run
//! use propval_core::{CircuitConfig, CircuitSession, DirectoryStore, ValidationConfig};
//!
//! let config = ValidationConfig::default();
//! let month = std::path::Path::new("data/K1ABC_G4XYZ/2025_01.00");
//! let mut session = CircuitSession::new(
//!     CircuitConfig::new("K1ABC", "G4XYZ"),
//!     config,
//!     month.join("comparison.json"),
//! );
//! let summary = session
//!     .run(&month.join("voacapx.out"), &DirectoryStore::new(month))
//!     .unwrap();
//! println!("{} bands compared", summary.compared());
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Report  → predicted split-normal ┐
//!                                  ├→ Comparison → Score buckets → Aggregate (JSON)
//! Samples → observed split-normal  ┘
//! ```
//!
//! Both sides are reduced to the same three numbers per hour: a median and
//! independent upper/lower spreads. The comparison reports their
//! differences, standardized effect sizes and the probability of meeting a
//! required SNR. Undefined hours stay `NaN` throughout and are written as
//! `null`.

pub mod aggregate;
pub mod comparison;
pub mod config;
pub mod distribution;
pub mod error;
pub mod observation;
pub mod report;
pub mod score;
pub mod session;
pub mod stats;

pub use aggregate::{
    BandEntry, CircuitAggregate, ReliabilitySection, ReliabilitySeries, ScoreSection,
};
pub use comparison::{
    ComparisonRecord, ComparisonSummary, cohens_d, compare, compare_hour, empirical_reliability,
    log_variance_ratio, reliability, standard_normal_cdf,
};
pub use config::{CircuitConfig, DEFAULT_BANDS, DEFAULT_SNR_OFFSET, ValidationConfig};
pub use distribution::{
    DECILE_Z, EmpiricalDistribution, ObservedFit, RequiredSnr, SplitNormalParams, predicted_params,
};
pub use error::{Error, Result};
pub use observation::{
    DirectoryStore, HourlySamples, ObservationSample, ObservationStore, load_samples,
    parse_samples,
};
pub use report::{PredictionRecord, PredictionTable, ReportField, frequencies, read_report};
pub use score::{
    BucketCount, LOCATION_THRESHOLDS, SPREAD_THRESHOLDS, ScoreBucket, ScoreClassifier,
    ScoreHistogram, SignedHistogram, classify, classify_records,
};
pub use session::{
    BandEvaluation, BandOutcome, BandStatus, CircuitSession, PredictedReport, SessionSummary,
    evaluate_band,
};
pub use stats::{HOURS, percentile};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
