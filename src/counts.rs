use std::fs::File;
use std::io::{BufRead, BufReader};

use camino::Utf8Path;
use serde::Serialize;
use tracing::debug;

use crate::domain::CountConvention;

/// Value written to records when counts could not be loaded.
pub const UNAVAILABLE: i64 = -1;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CountOptions {
    pub convention: CountConvention,
    pub report_bases: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Counts {
    pub reads: u64,
    pub bases: Option<u64>,
}

/// Result of reading the count sidecars of one sample. Missing or malformed
/// sidecars are an expected state, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountOutcome {
    Available(Counts),
    Unavailable,
}

impl CountOutcome {
    pub fn is_available(&self) -> bool {
        matches!(self, CountOutcome::Available(_))
    }

    pub fn read_count(&self) -> i64 {
        match self {
            CountOutcome::Available(counts) => to_signed(counts.reads),
            CountOutcome::Unavailable => UNAVAILABLE,
        }
    }

    pub fn base_count(&self, report_bases: bool) -> Option<i64> {
        match self {
            CountOutcome::Available(counts) => counts.bases.map(to_signed),
            CountOutcome::Unavailable => report_bases.then_some(UNAVAILABLE),
        }
    }
}

fn to_signed(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

pub fn load_counts(strand1: &Utf8Path, strand2: &Utf8Path, options: CountOptions) -> CountOutcome {
    let first = match read_count_line(strand1, options.report_bases) {
        Ok(value) => value,
        Err(reason) => {
            debug!(path = %strand1, %reason, "counts unavailable");
            return CountOutcome::Unavailable;
        }
    };
    let second = match read_count_line(strand2, options.report_bases) {
        Ok(value) => value,
        Err(reason) => {
            debug!(path = %strand2, %reason, "counts unavailable");
            return CountOutcome::Unavailable;
        }
    };

    let offset = match options.convention {
        CountConvention::Corrected => 0,
        CountConvention::PreOffset => 1,
    };
    let Some(reads) = checked_total(&[first.0, offset, second.0]) else {
        debug!(path = %strand1, "read count overflows, treating counts as unavailable");
        return CountOutcome::Unavailable;
    };
    let bases = match (first.1, second.1) {
        (Some(a), Some(b)) => match checked_total(&[a, b]) {
            Some(total) => Some(total),
            None => {
                debug!(path = %strand1, "base count overflows, treating counts as unavailable");
                return CountOutcome::Unavailable;
            }
        },
        _ => None,
    };
    CountOutcome::Available(Counts { reads, bases })
}

// Totals must stay representable next to the signed `-1` sentinel.
fn checked_total(values: &[u64]) -> Option<u64> {
    values
        .iter()
        .try_fold(0u64, |acc, value| acc.checked_add(*value))
        .filter(|total| i64::try_from(*total).is_ok())
}

fn read_count_line(path: &Utf8Path, report_bases: bool) -> Result<(u64, Option<u64>), String> {
    let file = File::open(path.as_std_path()).map_err(|err| err.to_string())?;
    let mut line = String::new();
    BufReader::new(file)
        .read_line(&mut line)
        .map_err(|err| err.to_string())?;

    let mut tokens = line.split_whitespace();
    let reads = tokens
        .next()
        .ok_or_else(|| "empty count file".to_string())?
        .parse::<u64>()
        .map_err(|err| format!("read count: {err}"))?;
    if !report_bases {
        return Ok((reads, None));
    }
    let bases = tokens
        .next()
        .ok_or_else(|| "missing base count".to_string())?
        .parse::<u64>()
        .map_err(|err| format!("base count: {err}"))?;
    Ok((reads, Some(bases)))
}
