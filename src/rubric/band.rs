//! Score range parsing.
//!
//! Rubric authors write bands as free text ("0–4", "5-7", "9 — 10").
//! A [`ScoreRange`] is the closed interval that text stands for.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Separators accepted between the bounds: hyphen, en-dash, em-dash.
const SEPARATORS: [char; 3] = ['-', '\u{2013}', '\u{2014}'];

/// Closed score interval `[low, high]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreRange {
    pub low: f64,
    pub high: f64,
}

impl ScoreRange {
    pub fn new(low: f64, high: f64) -> Option<Self> {
        (low.is_finite() && high.is_finite() && low <= high).then_some(Self { low, high })
    }

    /// Parse range text. The error is a short reason suitable for reporting.
    pub fn parse(text: &str) -> Result<Self, String> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err("range is empty".to_string());
        }

        let (low, high) = match trimmed.find(|c: char| SEPARATORS.contains(&c)) {
            Some(0) => return Err("range starts with a separator".to_string()),
            Some(at) => {
                let sep_len = trimmed[at..].chars().next().map_or(1, char::len_utf8);
                (&trimmed[..at], &trimmed[at + sep_len..])
            }
            None => (trimmed, trimmed),
        };

        let low = parse_bound(low)?;
        let high = parse_bound(high)?;
        ScoreRange::new(low, high)
            .ok_or_else(|| format!("lower bound {} exceeds upper bound {}", low, high))
    }

    pub fn contains(&self, score: f64) -> bool {
        score >= self.low && score <= self.high
    }

    pub fn overlaps(&self, other: &ScoreRange) -> bool {
        self.low <= other.high && other.low <= self.high
    }
}

fn parse_bound(text: &str) -> Result<f64, String> {
    let text = text.trim();
    if text.is_empty() {
        return Err("missing bound".to_string());
    }
    let value: f64 = text
        .parse()
        .map_err(|_| format!("'{}' is not a number", text))?;
    if !value.is_finite() || value < 0.0 {
        return Err(format!("'{}' is not a valid score", text));
    }
    Ok(value)
}

impl FromStr for ScoreRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ScoreRange::parse(s)
    }
}

impl fmt::Display for ScoreRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.low == self.high {
            write!(f, "{}", self.low)
        } else {
            write!(f, "{}\u{2013}{}", self.low, self.high)
        }
    }
}
