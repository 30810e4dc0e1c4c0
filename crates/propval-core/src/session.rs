//! Per-circuit validation session.
//!
//! A session owns everything that accumulates while the bands of one
//! circuit are processed: the score classifier and the path of the
//! persisted aggregate. Circuits never share a session, and a session
//! processes its bands one at a time, so the read-modify-write of the
//! aggregate has a single writer.
//!
//! Per band: report → predicted fit, samples → observed fit, compare,
//! classify, then merge into the aggregate. The aggregate is only rewritten
//! after the band's comparison is complete.

use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::Serialize;

use crate::aggregate::{BandEntry, CircuitAggregate, ScoreSection};
use crate::comparison::{ComparisonRecord, ComparisonSummary, compare};
use crate::config::{CircuitConfig, ValidationConfig};
use crate::distribution::{ObservedFit, SplitNormalParams, predicted_params};
use crate::error::{Error, Result};
use crate::observation::{HourlySamples, ObservationSample, ObservationStore};
use crate::report::{PredictionTable, ReportField, read_report};
use crate::score::{ScoreClassifier, ScoreHistogram};
use crate::stats::HOURS;

// ---------------------------------------------------------------------------
// Band evaluation (pure)
// ---------------------------------------------------------------------------

/// Predicted SNR, SNR UP and SNR LW tables of one report.
#[derive(Debug, Clone)]
pub struct PredictedReport {
    pub snr: PredictionTable,
    pub snr_up: PredictionTable,
    pub snr_lw: PredictionTable,
}

impl PredictedReport {
    pub fn parse(document: &str) -> Self {
        Self {
            snr: PredictionTable::parse(document, ReportField::Snr),
            snr_up: PredictionTable::parse(document, ReportField::SnrUp),
            snr_lw: PredictionTable::parse(document, ReportField::SnrLw),
        }
    }

    /// Predicted split-normal per hour on `band` MHz.
    pub fn params(&self, band: u32, snr_offset: f64) -> [SplitNormalParams; HOURS] {
        predicted_params(&self.snr, &self.snr_up, &self.snr_lw, band, snr_offset)
    }

    pub fn has_band(&self, band: u32) -> bool {
        self.snr.frequencies().contains(&band)
    }
}

/// Full result of comparing one band, before persistence.
#[derive(Debug, Clone)]
pub struct BandEvaluation {
    pub band: u32,
    pub observed: ObservedFit,
    pub predicted: [SplitNormalParams; HOURS],
    /// Reliability threshold actually used.
    pub threshold: f64,
    pub records: Vec<ComparisonRecord>,
}

impl BandEvaluation {
    pub fn summary(&self) -> ComparisonSummary {
        ComparisonSummary::from_records(&self.records)
    }

    /// Persisted entry of this band, with its score histogram.
    pub fn to_entry(&self, histogram: &ScoreHistogram) -> BandEntry {
        BandEntry::new(
            self.observed.required_snr,
            self.records.clone(),
            &self.observed.sample_counts,
            histogram,
        )
    }
}

/// Compare one band of a parsed report against its observed samples.
/// Scoring is left to the session's [`ScoreClassifier`].
pub fn evaluate_band(
    report: &PredictedReport,
    band: u32,
    samples: &[ObservationSample],
    config: &ValidationConfig,
) -> BandEvaluation {
    let hourly = HourlySamples::partition(samples);
    let observed = ObservedFit::estimate(&hourly, config.min_samples);
    let predicted = report.params(band, config.snr_offset);
    let threshold = config.required_snr.unwrap_or(observed.required_snr.mu);
    let records = compare(&observed.params, &predicted, &hourly, threshold);
    BandEvaluation {
        band,
        observed,
        predicted,
        threshold,
        records,
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// What happened to one band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BandStatus {
    /// Compared and written to the aggregate.
    Compared,
    /// No observed samples; nothing written.
    NoSamples,
    /// Reading samples or persisting failed.
    Failed,
}

/// Outcome of one band in a session.
#[derive(Debug, Clone, Serialize)]
pub struct BandOutcome {
    pub band: u32,
    pub status: BandStatus,
    pub samples: usize,
    pub summary: Option<ComparisonSummary>,
    pub error: Option<String>,
}

/// Outcome of a whole session run.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub circuit: String,
    pub output: PathBuf,
    pub bands: Vec<BandOutcome>,
    /// Score histogram accumulated over the bands compared in this run.
    pub score: ScoreSection,
}

impl BandOutcome {
    fn failed(band: u32, error: &Error) -> Self {
        Self {
            band,
            status: BandStatus::Failed,
            samples: 0,
            summary: None,
            error: Some(error.to_string()),
        }
    }
}

impl SessionSummary {
    pub fn compared(&self) -> usize {
        self.bands
            .iter()
            .filter(|b| b.status == BandStatus::Compared)
            .count()
    }
}

/// Validation session for one circuit.
pub struct CircuitSession {
    circuit: CircuitConfig,
    config: ValidationConfig,
    output_path: PathBuf,
    classifier: ScoreClassifier,
}

impl CircuitSession {
    pub fn new(
        circuit: CircuitConfig,
        config: ValidationConfig,
        output_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            circuit,
            config,
            output_path: output_path.into(),
            classifier: ScoreClassifier::new(),
        }
    }

    pub fn circuit(&self) -> &CircuitConfig {
        &self.circuit
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Per-band histograms of the bands compared by this session.
    pub fn classifier(&self) -> &ScoreClassifier {
        &self.classifier
    }

    /// Circuit-wide score histogram over the bands compared so far.
    pub fn score_total(&self) -> ScoreHistogram {
        self.classifier.total()
    }

    /// Compare one band and merge it into the persisted aggregate.
    ///
    /// A band without samples is reported as [`BandStatus::NoSamples`]
    /// and leaves the aggregate untouched.
    pub fn process_band(
        &mut self,
        report: &PredictedReport,
        band: u32,
        samples: &[ObservationSample],
    ) -> Result<BandOutcome> {
        if samples.is_empty() {
            warn!("{} band {band}: no observed samples, skipping", self.circuit.id());
            return Ok(BandOutcome {
                band,
                status: BandStatus::NoSamples,
                samples: 0,
                summary: None,
                error: None,
            });
        }
        if !report.has_band(band) {
            warn!(
                "{} band {band}: not in the prediction report, predicted side is undefined",
                self.circuit.id()
            );
        }

        let eval = evaluate_band(report, band, samples, &self.config);
        let summary = eval.summary();
        let empty_hours = HOURS - eval.observed.hours_with_data();
        if empty_hours > 0 {
            warn!(
                "{} band {band}: {empty_hours} hour(s) without samples",
                self.circuit.id()
            );
        }

        let histogram = self.classifier.add_band(band, &eval.records);
        if let Err(e) = self.persist(band, eval.to_entry(&histogram)) {
            self.classifier.remove_band(band);
            return Err(e);
        }

        info!(
            "{} band {band}: {} samples, {}/{} hours compared, |dSNR| {:.2} dB, d {:.2}, threshold {:.1} dB",
            self.circuit.id(),
            samples.len(),
            summary.hours_compared,
            HOURS,
            summary.mean_abs_delta_median,
            summary.mean_cohens_d,
            eval.threshold
        );

        Ok(BandOutcome {
            band,
            status: BandStatus::Compared,
            samples: samples.len(),
            summary: Some(summary),
            error: None,
        })
    }

    /// Process every configured band in order. A band whose report, samples
    /// or aggregate cannot be read or written is logged and recorded as
    /// failed, and the remaining bands still run. Only non-I/O errors abort.
    pub fn run(
        &mut self,
        report_path: &Path,
        store: &dyn ObservationStore,
    ) -> Result<SessionSummary> {
        let bands = self.config.bands.clone();
        let mut outcomes = Vec::with_capacity(bands.len());

        let report = match read_report(report_path) {
            Ok(document) => PredictedReport::parse(&document),
            Err(e) => {
                warn!("{}: {e}", self.circuit.id());
                outcomes.extend(bands.iter().map(|&band| BandOutcome::failed(band, &e)));
                return Ok(self.summary(outcomes));
            }
        };

        for band in bands {
            let outcome = store
                .samples(band)
                .and_then(|samples| self.process_band(&report, band, &samples));
            match outcome {
                Ok(o) => outcomes.push(o),
                Err(e) if !e.is_band_local() => return Err(e),
                Err(e) => {
                    warn!("{} band {band}: {e}", self.circuit.id());
                    outcomes.push(BandOutcome::failed(band, &e));
                }
            }
        }

        Ok(self.summary(outcomes))
    }

    /// Read-modify-write of the aggregate for one band.
    fn persist(&self, band: u32, entry: BandEntry) -> Result<()> {
        let mut aggregate = CircuitAggregate::load(&self.output_path)?;
        aggregate.merge(band, entry);
        aggregate.save(&self.output_path)
    }

    fn summary(&self, bands: Vec<BandOutcome>) -> SessionSummary {
        SessionSummary {
            circuit: self.circuit.id(),
            output: self.output_path.clone(),
            bands,
            score: ScoreSection::from_histogram(&self.classifier.total()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    const REPORT: &str = "\
  3.0  9.0  7.1 14.1  0.0 FREQ
   20   18   22   SNR
    9    9    9   SNR LW
    9    9    9   SNR UP
  4.0  9.0  7.1 14.1  0.0 FREQ
   20   16   20   SNR
    9    6.4  12.8   SNR LW
    9    6.4  12.8   SNR UP
";

    fn samples_at(hour: u32, snrs: &[i32]) -> Vec<ObservationSample> {
        snrs.iter()
            .enumerate()
            .map(|(i, &snr)| {
                let ts = Utc
                    .with_ymd_and_hms(2025, 1, 1 + (i % 28) as u32, hour, 2 * (i % 30) as u32, 0)
                    .unwrap();
                ObservationSample::new(ts, snr)
            })
            .collect()
    }

    struct MemoryStore(Vec<(u32, Vec<ObservationSample>)>);

    impl ObservationStore for MemoryStore {
        fn samples(&self, band: u32) -> Result<Vec<ObservationSample>> {
            if band == 99 {
                return Err(Error::io(
                    "99.json",
                    std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
                ));
            }
            Ok(self
                .0
                .iter()
                .find(|(b, _)| *b == band)
                .map(|(_, s)| s.clone())
                .unwrap_or_default())
        }
    }

    #[test]
    fn test_evaluate_band_uses_offset_and_required_snr() {
        let report = PredictedReport::parse(REPORT);
        let mut samples = samples_at(4, &[-20, -18, -16, -14, -12]);
        samples.extend(samples_at(3, &[-10, -10, -10]));
        let config = ValidationConfig::default();

        let eval = evaluate_band(&report, 7, &samples, &config);
        assert_eq!(eval.predicted[4].median, 16.0 - 34.0);
        assert!((eval.predicted[4].sigma_upper - 5.0).abs() < 1e-12);
        assert_eq!(eval.observed.params[4].median, -16.0);
        assert_eq!(eval.records[4].delta_median, -16.0 - (16.0 - 34.0));
        assert!(eval.records[0].cohens_d.is_nan());
        // REQ_SNR mu is the mean of the hourly 1st percentiles.
        assert_eq!(eval.observed.required_snr.n, 2);
        assert!((eval.threshold - eval.observed.required_snr.mu).abs() < 1e-12);

        let fixed = ValidationConfig {
            required_snr: Some(-15.0),
            ..Default::default()
        };
        let eval = evaluate_band(&report, 7, &samples, &fixed);
        assert_eq!(eval.threshold, -15.0);
        assert_eq!(eval.records[4].reliability_observed, 2.0 / 5.0);
        assert_eq!(eval.records[3].reliability_observed, 1.0);
        assert_eq!(eval.records[10].reliability_observed, 0.0);
    }

    #[test]
    fn test_session_persists_each_band_and_skips_empty_ones() {
        let tmp = tempfile::tempdir().unwrap();
        let report_path = tmp.path().join("voacapx.out");
        std::fs::write(&report_path, REPORT).unwrap();
        let output = tmp.path().join("comparison.json");

        let store = MemoryStore(vec![
            (7, samples_at(4, &[-20, -18, -16, -14, -12])),
            (14, samples_at(3, &[-25, -21, -19])),
        ]);
        let config = ValidationConfig {
            bands: vec![7, 10, 14, 99],
            ..Default::default()
        };
        let mut session = CircuitSession::new(CircuitConfig::new("K1ABC", "G4XYZ"), config, &output);
        let summary = session.run(&report_path, &store).unwrap();

        let statuses: Vec<BandStatus> = summary.bands.iter().map(|b| b.status).collect();
        assert_eq!(
            statuses,
            vec![
                BandStatus::Compared,
                BandStatus::NoSamples,
                BandStatus::Compared,
                BandStatus::Failed
            ]
        );
        assert_eq!(summary.compared(), 2);
        assert_eq!(session.classifier().bands(), 2);

        let agg = CircuitAggregate::load(&output).unwrap();
        assert_eq!(agg.len(), 2);
        assert!(agg.get(10).is_none());
        assert_eq!(agg.get(14).unwrap().sample_counts[3], 3);
    }

    #[test]
    fn test_session_total_matches_persisted_scores() {
        let tmp = tempfile::tempdir().unwrap();
        let report_path = tmp.path().join("voacapx.out");
        std::fs::write(&report_path, REPORT).unwrap();
        let output = tmp.path().join("comparison.json");

        let store = MemoryStore(vec![
            (7, samples_at(4, &[-40, -38, -35, -30, -28])),
            (14, samples_at(3, &[-25, -21, -19, -2])),
        ]);
        let config = ValidationConfig {
            bands: vec![7, 14],
            ..Default::default()
        };
        let mut session = CircuitSession::new(CircuitConfig::new("K1ABC", "G4XYZ"), config, &output);
        let summary = session.run(&report_path, &store).unwrap();

        let agg = CircuitAggregate::load(&output).unwrap();
        let mut persisted = agg.get(7).unwrap().score.to_histogram();
        persisted.merge(&agg.get(14).unwrap().score.to_histogram());

        assert_eq!(session.score_total(), persisted);
        assert_eq!(session.score_total(), agg.score_total());
        assert_eq!(summary.score, ScoreSection::from_histogram(&persisted));
        let band7 = agg.get(7).unwrap().score.to_histogram();
        assert_eq!(session.classifier().band(7), Some(&band7));
        assert!(persisted.cohens_d.total() >= 2);
    }

    #[test]
    fn test_failed_save_leaves_total_untouched() {
        let tmp = tempfile::tempdir().unwrap();
        // A directory where the aggregate file should be makes every save fail.
        let output = tmp.path().join("comparison.json");
        std::fs::create_dir_all(&output).unwrap();

        let report = PredictedReport::parse(REPORT);
        let mut session =
            CircuitSession::new(CircuitConfig::new("A", "B"), ValidationConfig::default(), &output);
        let samples = samples_at(4, &[-20, -18, -16]);
        assert!(session.process_band(&report, 7, &samples).is_err());
        assert_eq!(session.classifier().bands(), 0);
        assert_eq!(session.score_total(), ScoreHistogram::default());
    }

    #[test]
    fn test_unreadable_report_fails_every_band() {
        let tmp = tempfile::tempdir().unwrap();
        let output = tmp.path().join("out.json");
        let config = ValidationConfig {
            bands: vec![7, 14],
            ..Default::default()
        };
        let mut session = CircuitSession::new(CircuitConfig::new("A", "B"), config, &output);
        let summary = session
            .run(&tmp.path().join("missing.out"), &MemoryStore(Vec::new()))
            .unwrap();
        assert!(summary.bands.iter().all(|b| b.status == BandStatus::Failed));
        assert!(summary.bands[0].error.as_deref().unwrap().contains("missing.out"));
        assert_eq!(summary.compared(), 0);
        assert!(!output.exists());
    }
}
