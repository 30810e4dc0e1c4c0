//! Parser for the prediction model's fixed-format text report.
//!
//! The report repeats one block per hour. Each block starts with a header
//! line whose last token is `FREQ`:
//!
//! ```text
//!  12.0  16.3  3.6  5.3  7.1 10.1 14.1 18.1 21.1 24.9 28.2  0.0 FREQ
//! ```
//!
//! The first column is the hour, the second a reference value (the circuit
//! MUF) and the rest are the block's frequencies in MHz, `0.0` marking an
//! unused slot. Data rows follow, each ending with its field name:
//!
//! ```text
//!        24   -    -   19   31   38   34   28   21    -   SNR
//! ```
//!
//! The first column again belongs to the reference value and is dropped.
//! `-` means "no value" for that slot. Fields are matched on trailing
//! tokens, so `SNR` never matches a `SNR UP` row.
//!
//! The scan is forward-only: find a header, then the requested row, repeat.
//! A block without the requested row contributes nothing.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::stats::HOURS;

/// Trailing token of every block header line.
pub const HEADER_TOKEN: &str = "FREQ";

/// Placeholder for a slot without a value.
pub const MISSING_TOKEN: &str = "-";

/// Data rows of the method-30 report. Only these names are accepted as
/// field selectors since the report itself carries no schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ReportField {
    Mode,
    Tangle,
    Delay,
    VHite,
    MufDay,
    Loss,
    Dbu,
    SDbw,
    NDbw,
    Snr,
    Rpwrg,
    Rel,
    Mprob,
    SPrb,
    SigLw,
    SigUp,
    SnrLw,
    SnrUp,
    Tgain,
    Rgain,
    SnrXx,
}

impl ReportField {
    pub const ALL: [ReportField; 21] = [
        ReportField::Mode,
        ReportField::Tangle,
        ReportField::Delay,
        ReportField::VHite,
        ReportField::MufDay,
        ReportField::Loss,
        ReportField::Dbu,
        ReportField::SDbw,
        ReportField::NDbw,
        ReportField::Snr,
        ReportField::Rpwrg,
        ReportField::Rel,
        ReportField::Mprob,
        ReportField::SPrb,
        ReportField::SigLw,
        ReportField::SigUp,
        ReportField::SnrLw,
        ReportField::SnrUp,
        ReportField::Tgain,
        ReportField::Rgain,
        ReportField::SnrXx,
    ];

    /// Row label exactly as printed in the report.
    pub fn label(self) -> &'static str {
        match self {
            ReportField::Mode => "MODE",
            ReportField::Tangle => "TANGLE",
            ReportField::Delay => "DELAY",
            ReportField::VHite => "V HITE",
            ReportField::MufDay => "MUFday",
            ReportField::Loss => "LOSS",
            ReportField::Dbu => "DBU",
            ReportField::SDbw => "S DBW",
            ReportField::NDbw => "N DBW",
            ReportField::Snr => "SNR",
            ReportField::Rpwrg => "RPWRG",
            ReportField::Rel => "REL",
            ReportField::Mprob => "MPROB",
            ReportField::SPrb => "S PRB",
            ReportField::SigLw => "SIG LW",
            ReportField::SigUp => "SIG UP",
            ReportField::SnrLw => "SNR LW",
            ReportField::SnrUp => "SNR UP",
            ReportField::Tgain => "TGAIN",
            ReportField::Rgain => "RGAIN",
            ReportField::SnrXx => "SNRxx",
        }
    }

    fn label_tokens(self) -> Vec<&'static str> {
        self.label().split_whitespace().collect()
    }
}

impl fmt::Display for ReportField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ReportField {
    type Err = Error;

    /// Accepts the printed label with any spacing and case ("snr up",
    /// "SNR  UP", "snrup").
    fn from_str(s: &str) -> Result<Self> {
        let wanted: String = s
            .split_whitespace()
            .collect::<String>()
            .to_ascii_uppercase();
        ReportField::ALL
            .iter()
            .copied()
            .find(|f| {
                f.label()
                    .split_whitespace()
                    .collect::<String>()
                    .to_ascii_uppercase()
                    == wanted
            })
            .ok_or_else(|| Error::UnknownField(s.to_string()))
    }
}

/// One parsed value: `field` at `hour` on `frequency` MHz.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub hour: u32,
    pub frequency: u32,
    pub value: f64,
}

/// Read a report document from disk.
pub fn read_report(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    std::fs::read_to_string(path).map_err(|e| Error::io(path, e))
}

/// Extract every value of `field` from `document`, optionally restricted to
/// one hour and/or one frequency.
pub fn parse(
    document: &str,
    field: ReportField,
    hour: Option<u32>,
    frequency: Option<u32>,
) -> Vec<PredictionRecord> {
    let wanted = field.label_tokens();
    let mut records = Vec::new();
    let mut lines = document.lines();
    let mut pending: Option<BlockHeader> = None;

    loop {
        // Phase 1: the next header, unless phase 2 already ran into one.
        let header = match pending.take() {
            Some(h) => h,
            None => match lines.by_ref().find_map(parse_header) {
                Some(h) => h,
                None => break,
            },
        };

        // Phase 2: the requested row inside this block.
        let mut row = None;
        for line in lines.by_ref() {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.ends_with(&wanted) {
                row = Some(tokens[..tokens.len() - wanted.len()].to_vec());
                break;
            }
            if let Some(next) = parse_header(line) {
                debug!(
                    "field {} absent from block at hour {}, moving on",
                    field, header.hour
                );
                pending = Some(next);
                break;
            }
        }

        let Some(values) = row else {
            if pending.is_some() {
                continue;
            }
            break;
        };

        let values: Vec<f64> = values
            .iter()
            .skip(1)
            .filter(|t| **t != MISSING_TOKEN)
            .filter_map(|t| match t.parse::<f64>() {
                Ok(v) => Some(v),
                Err(_) => {
                    debug!("skipping non-numeric token '{t}' in {field} row");
                    None
                }
            })
            .collect();

        records.extend(
            header
                .frequencies
                .iter()
                .zip(values)
                .map(|(&f, v)| PredictionRecord {
                    hour: header.hour,
                    frequency: f,
                    value: v,
                }),
        );
    }

    records
        .into_iter()
        .filter(|r| hour.is_none_or(|h| r.hour == h))
        .filter(|r| frequency.is_none_or(|f| r.frequency == f))
        .collect()
}

/// Active frequencies of the first block, in report order.
pub fn frequencies(document: &str) -> Vec<u32> {
    document
        .lines()
        .find_map(parse_header)
        .map(|h| h.frequencies)
        .unwrap_or_default()
}

struct BlockHeader {
    hour: u32,
    frequencies: Vec<u32>,
}

fn parse_header(line: &str) -> Option<BlockHeader> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.last() != Some(&HEADER_TOKEN) || tokens.len() < 2 {
        return None;
    }
    let hour = tokens[0].parse::<f64>().ok().filter(|h| *h >= 0.0)?.trunc() as u32;
    let frequencies = tokens[2.min(tokens.len() - 1)..tokens.len() - 1]
        .iter()
        .filter_map(|t| t.parse::<f64>().ok())
        .map(|f| f.trunc())
        .filter(|f| *f > 0.0)
        .map(|f| f as u32)
        .collect();
    Some(BlockHeader { hour, frequencies })
}

// ---------------------------------------------------------------------------
// Prediction table
// ---------------------------------------------------------------------------

/// Immutable (hour, frequency) → value table for one field of one report.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionTable {
    field: ReportField,
    values: BTreeMap<(u32, u32), f64>,
}

impl PredictionTable {
    /// Parse `field` out of `document` into a table.
    pub fn parse(document: &str, field: ReportField) -> Self {
        Self::from_records(field, &parse(document, field, None, None))
    }

    /// Build a table from parsed records. Hour 24 (end of day) is folded
    /// onto hour 0; a repeated (hour, frequency) keeps its first value.
    pub fn from_records(field: ReportField, records: &[PredictionRecord]) -> Self {
        let mut values = BTreeMap::new();
        for r in records {
            values
                .entry((r.hour % HOURS as u32, r.frequency))
                .or_insert(r.value);
        }
        Self { field, values }
    }

    pub fn field(&self) -> ReportField {
        self.field
    }

    pub fn get(&self, hour: u32, frequency: u32) -> Option<f64> {
        self.values.get(&(hour, frequency)).copied()
    }

    /// Distinct frequencies present in the table, ascending.
    pub fn frequencies(&self) -> Vec<u32> {
        self.values
            .keys()
            .map(|&(_, f)| f)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// 24 hourly values at `frequency`, `NaN` where the report has none.
    pub fn hourly(&self, frequency: u32) -> [f64; HOURS] {
        let mut out = [f64::NAN; HOURS];
        for (h, slot) in out.iter_mut().enumerate() {
            if let Some(v) = self.get(h as u32, frequency) {
                *slot = v;
            }
        }
        out
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONE_BLOCK: &str = "\
 12.0  15.2  7.0 14.0 21.0  0.0 FREQ
      -    E    E    F   MODE
     11   10   -5    3   SNR
      9    8    6    4   SNR UP
";

    fn two_blocks() -> String {
        let mut doc = String::new();
        doc.push_str("   header junk\n  MONTH 2025 01\n");
        doc.push_str("  1.0  9.3  3.6  5.3  7.1 10.1 14.1 18.1 21.1 24.9 28.2  0.0 FREQ\n");
        doc.push_str("   22   -   12   18   24   19    -    -    -    -   SNR\n");
        doc.push_str("   11   -    9    8    7    6    -    -    -    -   SNR LW\n");
        doc.push_str("   13   -   10   11   12   13    -    -    -    -   SNR UP\n");
        doc.push_str("  0.50 - 0.12 0.40 0.77 0.61 - - - -  REL\n");
        doc.push_str("  2.0  9.1  3.6  5.3  7.1 10.1 14.1 18.1 21.1 24.9 28.2  0.0 FREQ\n");
        doc.push_str("   21   -   11   17   23   20   15    -    -    -   SNR\n");
        doc.push_str("   13   -   10   11   12   13   14    -    -    -   SNR UP\n");
        doc
    }

    #[test]
    fn test_parses_single_block() {
        let records = parse(ONE_BLOCK, ReportField::Snr, None, None);
        assert_eq!(
            records,
            vec![
                PredictionRecord { hour: 12, frequency: 7, value: 10.0 },
                PredictionRecord { hour: 12, frequency: 14, value: -5.0 },
                PredictionRecord { hour: 12, frequency: 21, value: 3.0 },
            ]
        );
    }

    #[test]
    fn test_multiword_field_does_not_match_prefix() {
        let up = parse(ONE_BLOCK, ReportField::SnrUp, None, None);
        assert_eq!(up.iter().map(|r| r.value).collect::<Vec<_>>(), vec![8.0, 6.0, 4.0]);
    }

    #[test]
    fn test_placeholders_are_dropped_and_frequencies_truncated() {
        let doc = two_blocks();
        assert_eq!(frequencies(&doc), vec![3, 5, 7, 10, 14, 18, 21, 24, 28]);
        let hour1 = parse(&doc, ReportField::Snr, Some(1), None);
        assert_eq!(
            hour1.iter().map(|r| r.frequency).collect::<Vec<_>>(),
            vec![3, 5, 7, 10]
        );
        // Values shift left past the placeholder, as the report aligns them.
        assert_eq!(hour1[0].value, 12.0);
        assert_eq!(hour1[3].value, 19.0);
        assert_eq!(hour1.len(), 4);
    }

    #[test]
    fn test_filters_by_hour_and_frequency() {
        let doc = two_blocks();
        let r = parse(&doc, ReportField::Snr, Some(2), Some(5));
        assert_eq!(r, vec![PredictionRecord { hour: 2, frequency: 5, value: 17.0 }]);
        assert!(parse(&doc, ReportField::Snr, Some(7), None).is_empty());
        assert!(parse(&doc, ReportField::Snr, None, Some(50)).is_empty());
    }

    #[test]
    fn test_field_absent_from_a_block_yields_nothing_for_it() {
        let doc = two_blocks();
        // SNR LW only exists in the hour 1 block; hour 2's SNR must not leak in.
        let lw = parse(&doc, ReportField::SnrLw, None, None);
        assert!(lw.iter().all(|r| r.hour == 1));
        assert_eq!(lw.len(), 4);

        let rel = parse(&doc, ReportField::Rel, None, None);
        assert_eq!(rel.len(), 4);
        assert!((rel[2].value - 0.77).abs() < 1e-12);
    }

    #[test]
    fn test_unknown_content_yields_empty() {
        assert!(parse("", ReportField::Snr, None, None).is_empty());
        assert!(parse("no blocks here\nSNR\n", ReportField::Snr, None, None).is_empty());
        let header_only = " 3.0 9.0 7.0 FREQ\n";
        assert!(parse(header_only, ReportField::Snr, None, None).is_empty());
    }

    #[test]
    fn test_field_names_parse_loosely() {
        assert_eq!("SNR".parse::<ReportField>().unwrap(), ReportField::Snr);
        assert_eq!("snr up".parse::<ReportField>().unwrap(), ReportField::SnrUp);
        assert_eq!("SNRLW".parse::<ReportField>().unwrap(), ReportField::SnrLw);
        assert_eq!("MUFday".parse::<ReportField>().unwrap(), ReportField::MufDay);
        assert!(matches!(
            "BOGUS".parse::<ReportField>(),
            Err(Error::UnknownField(_))
        ));
    }

    #[test]
    fn test_band_discovery_uses_first_header() {
        assert_eq!(frequencies(ONE_BLOCK), vec![7, 14, 21]);
        assert!(frequencies("nothing").is_empty());
    }

    #[test]
    fn test_table_folds_hour_24_and_fills_nan() {
        let records = [
            PredictionRecord { hour: 24, frequency: 14, value: -3.0 },
            PredictionRecord { hour: 5, frequency: 14, value: 8.0 },
            PredictionRecord { hour: 5, frequency: 7, value: 1.0 },
        ];
        let table = PredictionTable::from_records(ReportField::Snr, &records);
        assert_eq!(table.get(0, 14), Some(-3.0));
        assert_eq!(table.frequencies(), vec![7, 14]);
        let col = table.hourly(14);
        assert_eq!(col[0], -3.0);
        assert_eq!(col[5], 8.0);
        assert!(col[1].is_nan());
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_read_report_missing_file_is_io_error() {
        let err = read_report("/nonexistent/propval/voacapx.out").unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
