//! CSV event file adapter.
//!
//! Reads `timestamp,side,price` rows (with a header) for offline trade
//! reconstruction. Rows are returned in file order.

use crate::domain::error::StratbenchError;
use crate::domain::trade::{RawEvent, Side, parse_timestamp};
use std::fs;
use std::path::PathBuf;

pub struct CsvEventAdapter {
    path: PathBuf,
}

impl CsvEventAdapter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn read_events(&self) -> Result<Vec<RawEvent>, StratbenchError> {
        let content = fs::read_to_string(&self.path)?;
        parse_events(&content)
    }
}

fn column<'r>(record: &'r csv::StringRecord, index: usize, name: &str, line: usize) -> Result<&'r str, StratbenchError> {
    record
        .get(index)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| StratbenchError::EventParse {
            line,
            reason: format!("missing {} column", name),
        })
}

pub fn parse_events(content: &str) -> Result<Vec<RawEvent>, StratbenchError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());
    let mut events = Vec::new();

    for result in rdr.records() {
        let record = result.map_err(|e| StratbenchError::EventParse {
            line: e.position().map(|p| p.line() as usize).unwrap_or(0),
            reason: e.to_string(),
        })?;
        let line = record.position().map(|p| p.line() as usize).unwrap_or(0);

        let raw_ts = column(&record, 0, "timestamp", line)?;
        let timestamp = parse_timestamp(raw_ts).ok_or_else(|| StratbenchError::EventParse {
            line,
            reason: format!("invalid timestamp '{}'", raw_ts),
        })?;

        let side: Side = column(&record, 1, "side", line)?
            .parse()
            .map_err(|reason| StratbenchError::EventParse { line, reason })?;

        let raw_price = column(&record, 2, "price", line)?;
        let price: f64 = raw_price
            .parse()
            .ok()
            .filter(|p: &f64| p.is_finite() && *p > 0.0)
            .ok_or_else(|| StratbenchError::EventParse {
                line,
                reason: format!("invalid price '{}'", raw_price),
            })?;

        events.push(RawEvent {
            timestamp,
            side,
            price,
        });
    }

    Ok(events)
}
