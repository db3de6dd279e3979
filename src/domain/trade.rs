//! Trade records and round-trip reconstruction.
//!
//! - `RawEvent`: one buy or sell tick from the backtest service
//! - `RoundTripTrade`: a matched entry and exit
//! - `reconstruct`: single pass over an ordered event stream, at most one open
//!   position at a time

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl std::str::FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "buy" => Ok(Side::Buy),
            "sell" => Ok(Side::Sell),
            other => Err(format!("unknown side '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawEvent {
    pub timestamp: NaiveDateTime,
    pub side: Side,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundTripTrade {
    pub entry_timestamp: NaiveDateTime,
    pub entry_price: f64,
    pub exit_timestamp: NaiveDateTime,
    pub exit_price: f64,
    pub pnl_absolute: f64,
    pub pnl_percent: f64,
}

impl RoundTripTrade {
    pub fn new(
        entry_timestamp: NaiveDateTime,
        entry_price: f64,
        exit_timestamp: NaiveDateTime,
        exit_price: f64,
    ) -> Self {
        let pnl_absolute = exit_price - entry_price;
        Self {
            entry_timestamp,
            entry_price,
            exit_timestamp,
            exit_price,
            pnl_absolute,
            pnl_percent: pnl_absolute / entry_price,
        }
    }

}

/// Parse a service timestamp. Accepts `YYYY-MM-DD` (midnight) and ISO-like
/// date-times with a `T` or space separator.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

struct OpenPosition {
    timestamp: NaiveDateTime,
    price: f64,
}

/// Pair buys with the next sell. Extra buys while a position is open are
/// ignored, sells with nothing open are discarded, and a position still open at
/// the end of the stream is dropped. Service dates are day-level, so a sell
/// stamped the same day as its entry closes the position.
pub fn reconstruct(events: &[RawEvent]) -> Vec<RoundTripTrade> {
    let mut open: Option<OpenPosition> = None;
    let mut trades = Vec::new();

    for event in events {
        match event.side {
            Side::Buy => {
                if let Some(ref position) = open {
                    debug!(
                        at = %event.timestamp,
                        open_since = %position.timestamp,
                        "ignoring buy while a position is open"
                    );
                    continue;
                }
                open = Some(OpenPosition {
                    timestamp: event.timestamp,
                    price: event.price,
                });
            }
            Side::Sell => match open.take() {
                Some(position) if event.timestamp >= position.timestamp => {
                    trades.push(RoundTripTrade::new(
                        position.timestamp,
                        position.price,
                        event.timestamp,
                        event.price,
                    ));
                }
                Some(position) => {
                    warn!(
                        at = %event.timestamp,
                        "discarding sell earlier than its entry at {}", position.timestamp
                    );
                    open = Some(position);
                }
                None => {
                    debug!(at = %event.timestamp, "discarding sell with no open position");
                }
            },
        }
    }

    if let Some(position) = open {
        debug!(open_since = %position.timestamp, "dropping unmatched open position");
    }

    trades
}
