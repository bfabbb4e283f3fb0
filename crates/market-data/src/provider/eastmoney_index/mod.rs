//! Eastmoney market index provider.
//!
//! `GET https://push2.eastmoney.com/api/qt/stock/get?secid={market}.{code}&fltt=2&fields=...`
//!
//! With `fltt=2` prices arrive as plain decimals. Field map:
//! - `f43` latest value
//! - `f58` display name
//! - `f60` previous close
//! - `f86` quote time, unix seconds
//! - `f170` change percent
//!
//! Suspended or unknown indices come back with `rc != 0`, a null `data`, or
//! `"-"` placeholders.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::DateTime;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::errors::MarketDataError;
use crate::models::{FundQuote, InstrumentCode, InstrumentKind};
use crate::normalize::{decimal_string, fixed2};
use crate::provider::headers::EASTMONEY_REFERER;
use crate::provider::{
    china_offset, required, HttpFetch, HttpRequest, ProviderCapabilities, ProviderKind,
    QuoteProvider,
};

const PROVIDER_ID: &str = "EASTMONEY_INDEX";
const API_URL: &str = "https://push2.eastmoney.com/api/qt/stock/get";
const FIELDS: &str = "f43,f57,f58,f60,f86,f170";

#[derive(Debug, Deserialize)]
struct StockGetResponse {
    rc: i64,
    data: Option<IndexData>,
}

#[derive(Debug, Deserialize)]
struct IndexData {
    f43: Option<Value>,
    f58: Option<String>,
    f60: Option<Value>,
    f86: Option<i64>,
    f170: Option<Value>,
}

fn number_field(value: Option<&Value>, field: &str) -> Result<String, MarketDataError> {
    let raw = match value {
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) => s.clone(),
        _ => return Err(MarketDataError::missing(PROVIDER_ID, field)),
    };
    decimal_string(&raw)
}

/// Market index provider backed by Eastmoney's quote API.
pub struct EastmoneyIndexProvider {
    http: Arc<dyn HttpFetch>,
}

impl EastmoneyIndexProvider {
    pub fn new(http: Arc<dyn HttpFetch>) -> Self {
        Self { http }
    }

    fn sec_id(code: &str) -> Result<String, MarketDataError> {
        match InstrumentCode::parse(code) {
            Some(index @ InstrumentCode::Index { .. }) => Ok(index.to_string()),
            _ => Err(MarketDataError::UnsupportedCode {
                provider: PROVIDER_ID.to_string(),
                code: code.to_string(),
            }),
        }
    }
}

fn to_quote(code: &str, body: &[u8]) -> Result<FundQuote, MarketDataError> {
    let response: StockGetResponse = serde_json::from_slice(body)?;

    let data = match response.data {
        Some(data) if response.rc == 0 => data,
        _ => {
            return Err(MarketDataError::NoData {
                provider: PROVIDER_ID.to_string(),
                code: code.to_string(),
            })
        }
    };

    let seconds = data
        .f86
        .ok_or_else(|| MarketDataError::missing(PROVIDER_ID, "f86"))?;
    let quoted_at = DateTime::from_timestamp(seconds, 0)
        .ok_or_else(|| MarketDataError::decode(PROVIDER_ID, "f86 out of range"))?
        .with_timezone(&china_offset());

    let percent = number_field(data.f170.as_ref(), "f170")?;

    Ok(FundQuote {
        code: code.to_string(),
        name: required(PROVIDER_ID, "f58", data.f58.as_deref().unwrap_or_default())?,
        valuation_date: quoted_at.format("%Y-%m-%d").to_string(),
        valuation_timestamp: quoted_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        last_confirmed_value: number_field(data.f60.as_ref(), "f60")?,
        estimated_value: number_field(data.f43.as_ref(), "f43")?,
        estimated_change_percent: fixed2(&percent)?,
        source: PROVIDER_ID.to_string(),
    })
}

#[async_trait]
impl QuoteProvider for EastmoneyIndexProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::EastmoneyIndex
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            instrument_kinds: &[InstrumentKind::Index],
        }
    }

    async fn fetch_quote(&self, code: &str) -> Result<FundQuote, MarketDataError> {
        let sec_id = Self::sec_id(code)?;
        debug!("Fetching index {} from Eastmoney", sec_id);

        let body = self
            .http
            .execute(
                HttpRequest::get(PROVIDER_ID, API_URL)
                    .query("secid", sec_id)
                    .query("fltt", "2")
                    .query("invt", "2")
                    .query("fields", FIELDS)
                    .header("Referer", EASTMONEY_REFERER),
            )
            .await?;

        to_quote(code, &body)
    }
}
