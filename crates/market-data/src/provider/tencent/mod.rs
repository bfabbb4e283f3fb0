//! Tencent (腾讯证券) fund valuation provider.
//!
//! - `GET https://web.ifzq.gtimg.cn/fund/newfund/fundSsgz/getSsgz?app=web&symbol=jj{code}`
//!   returns the previous confirmed value and the intraday series of
//!   `[HHMM, estimate]` pairs. `data.code == -1` means no valuation.
//! - `GET https://gu.qq.com/jj{code}` supplies name, valuation date and,
//!   when present, a fresher estimate than the series tail.
//!
//! The change percentage is not published and is computed locally.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::errors::MarketDataError;
use crate::models::{FundQuote, InstrumentKind};
use crate::normalize::{decimal_string, percent_change};
use crate::provider::extract::{extract, FieldRule};
use crate::provider::{
    fund_code, required, HttpFetch, HttpRequest, ProviderCapabilities, ProviderKind,
    QuoteProvider,
};

const PROVIDER_ID: &str = "TENCENT";
const API_URL: &str = "https://web.ifzq.gtimg.cn/fund/newfund/fundSsgz/getSsgz";
const PAGE_URL: &str = "https://gu.qq.com";

/// Status value meaning "no valuation for this fund".
const NO_DATA_STATUS: i64 = -1;

const PAGE_RULES: &[FieldRule] = &[
    FieldRule::text("name", ".title .col_1"),
    FieldRule::text("jzrq", "#main3"),
    FieldRule::text("gsz", "#main5").optional(),
];

#[derive(Debug, Deserialize)]
struct SsgzResponse {
    data: Option<SsgzData>,
}

/// Numbers in this payload show up both as JSON numbers and as strings, so
/// everything is read as a raw value first.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SsgzData {
    code: Option<Value>,
    yesterday_dwjz: Option<Value>,
    date: Option<String>,
    /// Intraday series, only looked at once `code` says there is data
    data: Option<Value>,
}

/// Latest point of the intraday series.
#[derive(Debug, PartialEq)]
struct SeriesPoint {
    /// `HH:MM`
    time: String,
    estimate: String,
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn status_code(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// `"1500"` or `1500` becomes `"15:00"`; `930` becomes `"09:30"`.
fn format_time(value: &Value) -> Option<String> {
    let raw = match value {
        Value::Number(n) => format!("{:04}", n.as_u64()?),
        Value::String(s) => {
            let s = s.trim();
            if !(3..=4).contains(&s.len()) || !s.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            format!("{:0>4}", s)
        }
        _ => return None,
    };
    let (hours, minutes) = raw.split_at(2);
    Some(format!("{}:{}", hours, minutes))
}

fn last_point(series: &Value) -> Result<SeriesPoint, MarketDataError> {
    let last = series
        .as_array()
        .ok_or_else(|| MarketDataError::decode(PROVIDER_ID, "series is not an array"))?
        .last()
        .ok_or_else(|| MarketDataError::missing(PROVIDER_ID, "data.data"))?;

    let pair = last
        .as_array()
        .filter(|pair| pair.len() >= 2)
        .ok_or_else(|| MarketDataError::decode(PROVIDER_ID, "series point is not a pair"))?;

    Ok(SeriesPoint {
        time: format_time(&pair[0])
            .ok_or_else(|| MarketDataError::decode(PROVIDER_ID, "bad series time"))?,
        estimate: scalar_string(&pair[1])
            .ok_or_else(|| MarketDataError::decode(PROVIDER_ID, "bad series value"))?,
    })
}

/// Valuation part of the API response.
#[derive(Debug)]
struct Valuation {
    last_confirmed: String,
    date: String,
    point: SeriesPoint,
}

fn parse_valuation(code: &str, body: &[u8]) -> Result<Valuation, MarketDataError> {
    let response: SsgzResponse = serde_json::from_slice(body)?;
    let data = response
        .data
        .ok_or_else(|| MarketDataError::missing(PROVIDER_ID, "data"))?;

    if data.code.as_ref().and_then(status_code) == Some(NO_DATA_STATUS) {
        return Err(MarketDataError::NoData {
            provider: PROVIDER_ID.to_string(),
            code: code.to_string(),
        });
    }

    let series = data
        .data
        .as_ref()
        .ok_or_else(|| MarketDataError::missing(PROVIDER_ID, "data.data"))?;

    Ok(Valuation {
        last_confirmed: data
            .yesterday_dwjz
            .as_ref()
            .and_then(scalar_string)
            .ok_or_else(|| MarketDataError::missing(PROVIDER_ID, "yesterdayDwjz"))?,
        date: data
            .date
            .ok_or_else(|| MarketDataError::missing(PROVIDER_ID, "date"))?,
        point: last_point(series)?,
    })
}

/// Tencent fund valuation provider.
pub struct TencentProvider {
    http: Arc<dyn HttpFetch>,
}

impl TencentProvider {
    pub fn new(http: Arc<dyn HttpFetch>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl QuoteProvider for TencentProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Tencent
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            instrument_kinds: &[InstrumentKind::Fund],
        }
    }

    async fn fetch_quote(&self, code: &str) -> Result<FundQuote, MarketDataError> {
        let code = fund_code(PROVIDER_ID, code)?;
        let code = code.as_str();
        debug!("Fetching {} from Tencent", code);

        let body = self
            .http
            .execute(
                HttpRequest::get(PROVIDER_ID, API_URL)
                    .query("app", "web")
                    .query("symbol", format!("jj{}", code)),
            )
            .await?;
        let valuation = parse_valuation(code, &body)?;

        let page = self
            .http
            .execute_text(HttpRequest::get(
                PROVIDER_ID,
                format!("{}/jj{}", PAGE_URL, code),
            ))
            .await?;
        let mut fields = extract(PROVIDER_ID, &page, PAGE_RULES)?;

        let estimate = fields
            .get("gsz")
            .map(str::to_string)
            .unwrap_or(valuation.point.estimate);
        let last_confirmed = decimal_string(&valuation.last_confirmed)?;
        let estimated_change_percent = percent_change(&estimate, &last_confirmed)?;
        let date = required(PROVIDER_ID, "date", &valuation.date)?;

        Ok(FundQuote {
            code: code.to_string(),
            name: fields.take(PROVIDER_ID, "name")?,
            valuation_date: fields.take(PROVIDER_ID, "jzrq")?,
            valuation_timestamp: format!("{} {}", date, valuation.point.time),
            last_confirmed_value: last_confirmed,
            estimated_value: decimal_string(&estimate)?,
            estimated_change_percent,
            source: PROVIDER_ID.to_string(),
        })
    }
}
