//! Condition grammar: lenient parsing of raw condition cards and deterministic
//! rendering of condition lists.
//!
//! Raw cards are loosely typed JSON objects produced by whatever front end
//! assembled the strategy. Parsing never fails: cards that do not match one of
//! the two known shapes are dropped (with a diagnostic) and numeric fields that
//! cannot be read fall back to `0`.

use crate::domain::condition::{Condition, Operator};
use crate::domain::indicator::display_name;
use serde_json::Value;
use tracing::warn;

pub const CLAUSE_SEPARATOR: &str = "\nAND\n";

const INDICATOR_COMPARE: &str = "indicator-compare";
const PRICE_LEVEL: &str = "price-level";

/// Scanner for the leading numeric prefix of a string (`"12.5abc"` reads as `12.5`).
struct NumberScanner<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> NumberScanner<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn consume_digits(&mut self) -> usize {
        let mut digits = 0;
        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                digits += 1;
                self.advance();
            } else {
                break;
            }
        }
        digits
    }

    fn scan(mut self) -> Option<f64> {
        self.skip_whitespace();
        let start = self.pos;

        if matches!(self.peek(), Some('-') | Some('+')) {
            self.advance();
        }

        let mut digits = self.consume_digits();
        if self.peek() == Some('.') {
            self.advance();
            digits += self.consume_digits();
        }
        if digits == 0 {
            return None;
        }
        let mantissa_end = self.pos;

        if matches!(self.peek(), Some('e') | Some('E')) {
            self.advance();
            if matches!(self.peek(), Some('-') | Some('+')) {
                self.advance();
            }
            if self.consume_digits() == 0 {
                self.pos = mantissa_end;
            }
        }

        self.input[start..self.pos].parse::<f64>().ok()
    }
}

/// Read a numeric field the lenient way: unparsable, missing or non-finite values become `0`.
pub fn lenient_number(value: Option<&Value>) -> f64 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => NumberScanner::new(s).scan(),
        _ => None,
    };
    match parsed {
        Some(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

fn parse_operator(card: &Value) -> Option<Operator> {
    let raw = card.get("condition").and_then(Value::as_str)?;
    match raw.parse::<Operator>() {
        Ok(op) => Some(op),
        Err(e) => {
            warn!(operator = raw, "dropping condition card: {}", e);
            None
        }
    }
}

/// Parse a single raw card. Returns `None` for anything that is not one of the
/// two recognized shapes.
pub fn parse(card: &Value) -> Option<Condition> {
    let kind = card.get("type").and_then(Value::as_str)?;
    match kind {
        INDICATOR_COMPARE => {
            let indicator_type = card
                .get("indicator")
                .and_then(Value::as_str)
                .filter(|s| !s.trim().is_empty())?;
            let operator = parse_operator(card)?;
            Some(Condition::IndicatorCompare {
                indicator_type: indicator_type.to_string(),
                operator,
                threshold: lenient_number(card.get("value")),
            })
        }
        PRICE_LEVEL => {
            let operator = parse_operator(card)?;
            Some(Condition::PriceLevel {
                operator,
                threshold: lenient_number(card.get("price")),
            })
        }
        _ => None,
    }
}

/// Parse a list of raw cards, filtering out the unrecognized ones.
pub fn parse_all(cards: &[Value]) -> Vec<Condition> {
    cards
        .iter()
        .enumerate()
        .filter_map(|(index, card)| {
            let parsed = parse(card);
            if parsed.is_none() {
                warn!(index, "dropping unrecognized condition card: {}", card);
            }
            parsed
        })
        .collect()
}

pub fn render_clause(condition: &Condition) -> String {
    match condition {
        Condition::IndicatorCompare {
            indicator_type,
            operator,
            threshold,
        } => format!("{} {} {}", display_name(indicator_type), operator, threshold),
        Condition::PriceLevel {
            operator,
            threshold,
        } => format!("Price {} ${}", operator, threshold),
    }
}

/// Render conditions as a human-readable rule, one clause per line joined by `AND`.
pub fn render(conditions: &[Condition]) -> String {
    conditions
        .iter()
        .map(render_clause)
        .collect::<Vec<_>>()
        .join(CLAUSE_SEPARATOR)
}
