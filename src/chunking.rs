//! Splitting of long time intervals into requests of bounded size.

use std::sync::OnceLock;

use chrono::{DateTime, TimeDelta, Utc};
use regex::Regex;

use crate::error::{Error, Result};

/// Maximum number of records the server accepts in one request
/// (50 days of 1 Hz data).
pub const NRECORDS_LIMIT: u64 = 4_320_000;

/// Sampling step assumed when the collection's own step is unknown.
pub const DEFAULT_SAMPLING_STEP: &str = "PT1S";

/// Upper bound on a single chunk, roughly 25 years.
pub fn max_chunk_duration() -> TimeDelta {
    // 25 * 365.25 days
    TimeDelta::hours(219_150)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeInterval {
    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }
}

/// Ordered, contiguous chunks covering one requested interval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkPlan {
    chunks: Vec<TimeInterval>,
}

impl ChunkPlan {
    /// Splits `[start, end)` so that no chunk spans more than
    /// `nrecords_limit` samples of `sampling_step`, nor more than
    /// [`max_chunk_duration`].
    ///
    /// `start == end` gives a single empty chunk.
    pub fn new(
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        sampling_step: TimeDelta,
        nrecords_limit: u64,
    ) -> Result<Self> {
        if end < start {
            return Err(Error::InvalidInput(format!(
                "invalid time selection: end {} is before start {}",
                end, start
            )));
        }
        if sampling_step <= TimeDelta::zero() {
            return Err(Error::InvalidInput(format!(
                "sampling step must be positive, got {}",
                sampling_step
            )));
        }
        if nrecords_limit == 0 {
            return Err(Error::InvalidInput("record limit must be positive".into()));
        }

        let chunk_duration = chunk_duration(sampling_step, nrecords_limit);

        let mut chunks = Vec::new();
        let mut cursor = start;
        loop {
            let next = cursor
                .checked_add_signed(chunk_duration)
                .map_or(end, |next| next.min(end));
            chunks.push(TimeInterval { start: cursor, end: next });
            if next >= end {
                break;
            }
            cursor = next;
        }

        Ok(Self { chunks })
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TimeInterval> {
        self.chunks.iter()
    }

    pub fn as_slice(&self) -> &[TimeInterval] {
        &self.chunks
    }
}

fn chunk_duration(sampling_step: TimeDelta, nrecords_limit: u64) -> TimeDelta {
    let ceiling = max_chunk_duration();
    let ceiling_us = ceiling.num_microseconds().unwrap_or(i64::MAX) as i128;
    let step_us = sampling_step.num_microseconds().unwrap_or(i64::MAX) as i128;
    let wanted_us = step_us.saturating_mul(nrecords_limit as i128);
    if wanted_us >= ceiling_us {
        ceiling
    } else {
        TimeDelta::microseconds(wanted_us as i64)
    }
}

fn duration_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(concat!(
            r"^(?P<sign>[+-])?P",
            r"(?:(?P<years>\d+(?:\.\d+)?)Y)?",
            r"(?:(?P<months>\d+(?:\.\d+)?)M)?",
            r"(?:(?P<days>\d+(?:\.\d+)?)D)?",
            r"(?:T",
            r"(?:(?P<hours>\d+(?:\.\d+)?)H)?",
            r"(?:(?P<minutes>\d+(?:\.\d+)?)M)?",
            r"(?:(?P<seconds>\d+(?:\.\d+)?)S)?",
            r")?$",
        ))
        .expect("duration pattern is valid")
    })
}

/// Parses an ISO 8601 duration such as `PT1S` or `P1DT12H`.
///
/// Years count as 365 days and months as 30 days. Negative durations are
/// rejected.
pub fn parse_duration(value: &str) -> Result<TimeDelta> {
    let invalid = || Error::InvalidInput(format!("could not parse ISO 8601 duration from {:?}", value));
    let caps = duration_pattern().captures(value.trim()).ok_or_else(invalid)?;

    if caps.name("sign").is_some_and(|s| s.as_str() == "-") {
        return Err(Error::InvalidInput(format!(
            "duration {} must not be negative",
            value
        )));
    }

    let field = |name: &str| -> f64 {
        caps.name(name)
            .and_then(|m| m.as_str().parse::<f64>().ok())
            .unwrap_or(0.0)
    };
    let days = field("days") + field("months") * 30.0 + field("years") * 365.0;
    let seconds = days * 86_400.0 + field("hours") * 3600.0 + field("minutes") * 60.0 + field("seconds");

    let micros = (seconds * 1e6).round();
    if !micros.is_finite() || micros > i64::MAX as f64 {
        return Err(invalid());
    }
    Ok(TimeDelta::microseconds(micros as i64))
}
