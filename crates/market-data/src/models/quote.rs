use serde::{Deserialize, Serialize};

/// Canonical valuation record for one instrument.
///
/// Every numeric field is kept as a decimal string so that callers re-parsing
/// it never see binary float drift. A record is always fully populated; when a
/// provider cannot fill every field the quote is reported as absent instead.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundQuote {
    /// Instrument code, echoed from the request
    pub code: String,

    /// Display name
    pub name: String,

    /// Date the last confirmed net value applies to
    pub valuation_date: String,

    /// Provider-local date and time the estimate was computed
    pub valuation_timestamp: String,

    /// Previous confirmed net asset value
    pub last_confirmed_value: String,

    /// Current intraday estimate
    pub estimated_value: String,

    /// Signed change of the estimate against the confirmed value, two decimals
    pub estimated_change_percent: String,

    /// Provider that produced the record (EASTMONEY, SINA, etc.)
    pub source: String,
}
