//! Run configuration, loaded from JSON with every field defaulted.
//!
//! ```json
//! {
//!   "snr_offset": 34.0,
//!   "min_samples": 30,
//!   "bands": [7, 10, 14],
//!   "circuits": [{"tx": "WW0WWV", "rx": "EA8BFK"}]
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Bandwidth correction between the model's 1 Hz SNR and observed reports.
pub const DEFAULT_SNR_OFFSET: f64 = 34.0;

/// HF bands (MHz, truncated) present in the model's frequency list.
pub const DEFAULT_BANDS: [u32; 9] = [3, 5, 7, 10, 14, 18, 21, 24, 28];

pub const DEFAULT_REPORT_FILE: &str = "voacapx.out";
pub const DEFAULT_OUTPUT_FILE: &str = "comparison.json";

/// A transmitter/receiver pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitConfig {
    pub tx: String,
    pub rx: String,
}

impl CircuitConfig {
    pub fn new(tx: impl Into<String>, rx: impl Into<String>) -> Self {
        Self {
            tx: tx.into(),
            rx: rx.into(),
        }
    }

    /// Directory-style identifier, `TX_RX`.
    pub fn id(&self) -> String {
        format!("{}_{}", self.tx, self.rx)
    }

    /// Parse a `TX_RX` identifier.
    pub fn from_id(id: &str) -> Option<Self> {
        let (tx, rx) = id.split_once('_')?;
        if tx.is_empty() || rx.is_empty() {
            return None;
        }
        Some(Self::new(tx, rx))
    }
}

/// Settings shared by every circuit processed in one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub snr_offset: f64,
    /// Minimum samples an hour needs for an observed split-normal fit.
    pub min_samples: usize,
    /// Fixed reliability threshold in dB. Unset uses the observed REQ_SNR mu.
    pub required_snr: Option<f64>,
    pub bands: Vec<u32>,
    pub report_file: String,
    pub output_file: String,
    pub circuits: Vec<CircuitConfig>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            snr_offset: DEFAULT_SNR_OFFSET,
            min_samples: 1,
            required_snr: None,
            bands: DEFAULT_BANDS.to_vec(),
            report_file: DEFAULT_REPORT_FILE.to_string(),
            output_file: DEFAULT_OUTPUT_FILE.to_string(),
            circuits: Vec::new(),
        }
    }
}

impl ValidationConfig {
    /// Load and validate a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let config: Self = serde_json::from_str(&json).map_err(|e| Error::json(path, e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.snr_offset.is_finite() {
            return Err(Error::Config("snr_offset must be finite".into()));
        }
        if self.min_samples == 0 {
            return Err(Error::Config("min_samples must be at least 1".into()));
        }
        if self.required_snr.is_some_and(|t| !t.is_finite()) {
            return Err(Error::Config("required_snr must be finite".into()));
        }
        if self.bands.is_empty() {
            return Err(Error::Config("at least one band is required".into()));
        }
        Ok(())
    }
}
