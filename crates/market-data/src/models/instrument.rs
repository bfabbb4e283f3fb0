use std::fmt;

use serde::{Deserialize, Serialize};

/// Instrument classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstrumentKind {
    /// Open-end fund, valued by intraday estimate
    Fund,
    /// Market index
    Index,
}

/// Parsed instrument code.
///
/// Funds are six digits (`161725`). Indices carry a one-digit market prefix
/// in front of their six digits, optionally separated by a dot (`1.000001`,
/// `0399001`).
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum InstrumentCode {
    Fund { code: String },
    Index { market: u8, code: String },
}

fn is_six_digits(s: &str) -> bool {
    s.len() == 6 && s.bytes().all(|b| b.is_ascii_digit())
}

impl InstrumentCode {
    /// Parse a raw code, returning `None` for anything that is neither a fund
    /// nor an index code.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();

        if is_six_digits(raw) {
            return Some(Self::Fund {
                code: raw.to_string(),
            });
        }

        let (market, code) = match raw.split_once('.') {
            Some((market, code)) => (market, code),
            None if raw.is_ascii() && raw.len() == 7 => raw.split_at(1),
            None => return None,
        };

        if market.len() != 1 || !is_six_digits(code) {
            return None;
        }
        let market = market.parse::<u8>().ok()?;

        Some(Self::Index {
            market,
            code: code.to_string(),
        })
    }

    /// Returns the instrument kind for this code
    pub fn kind(&self) -> InstrumentKind {
        match self {
            Self::Fund { .. } => InstrumentKind::Fund,
            Self::Index { .. } => InstrumentKind::Index,
        }
    }

    /// The six-digit numeric part of the code.
    pub fn digits(&self) -> &str {
        match self {
            Self::Fund { code } | Self::Index { code, .. } => code,
        }
    }
}

impl fmt::Display for InstrumentCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fund { code } => write!(f, "{}", code),
            Self::Index { market, code } => write!(f, "{}.{}", market, code),
        }
    }
}
