//! Eastmoney (天天基金) fund valuation provider.
//!
//! `GET http://fundgz.1234567.com.cn/js/{code}.js` answers with a JSONP
//! statement:
//!
//! ```text
//! jsonpgz({"fundcode":"161725","name":"...","jzrq":"2021-01-29","dwjz":"1.3000",
//!          "gsz":"1.3100","gszzl":"0.77","gztime":"2021-02-01 15:00"});
//! ```
//!
//! The body is never evaluated. We check the `jsonpgz` prefix, cut out the
//! argument list and parse it against a fixed schema.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::errors::MarketDataError;
use crate::models::{FundQuote, InstrumentKind};
use crate::normalize::{decimal_string, fixed2};
use crate::provider::{
    fund_code, required, HttpFetch, HttpRequest, ProviderCapabilities, ProviderKind,
    QuoteProvider,
};

const PROVIDER_ID: &str = "EASTMONEY";
const BASE_URL: &str = "http://fundgz.1234567.com.cn/js";
const JSONP_PREFIX: &str = "jsonpgz";

/// Payload inside the `jsonpgz(...)` call
#[derive(Debug, Deserialize)]
struct JsonpPayload {
    name: String,
    /// Valuation date of the confirmed value
    jzrq: String,
    /// Last confirmed net value
    dwjz: String,
    /// Intraday estimate
    gsz: String,
    /// Estimate change, percent
    gszzl: String,
    /// Estimate timestamp
    gztime: String,
}

/// Eastmoney fund valuation provider.
pub struct EastmoneyProvider {
    http: Arc<dyn HttpFetch>,
}

impl EastmoneyProvider {
    pub fn new(http: Arc<dyn HttpFetch>) -> Self {
        Self { http }
    }
}

/// Extract the JSON argument of a `jsonpgz(...)` statement.
fn parse_jsonp(code: &str, body: &str) -> Result<JsonpPayload, MarketDataError> {
    let body = body.trim();
    if !body.starts_with(JSONP_PREFIX) {
        return Err(MarketDataError::decode(PROVIDER_ID, "missing jsonpgz prefix"));
    }

    let open = body
        .find('(')
        .ok_or_else(|| MarketDataError::decode(PROVIDER_ID, "missing '('"))?;
    let close = body
        .rfind(')')
        .filter(|close| *close > open)
        .ok_or_else(|| MarketDataError::decode(PROVIDER_ID, "missing ')'"))?;

    let inner = body[open + 1..close].trim();
    if inner.is_empty() {
        return Err(MarketDataError::NoData {
            provider: PROVIDER_ID.to_string(),
            code: code.to_string(),
        });
    }

    Ok(serde_json::from_str(inner)?)
}

#[async_trait]
impl QuoteProvider for EastmoneyProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Eastmoney
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            instrument_kinds: &[InstrumentKind::Fund],
        }
    }

    async fn fetch_quote(&self, code: &str) -> Result<FundQuote, MarketDataError> {
        let code = fund_code(PROVIDER_ID, code)?;
        let code = code.as_str();
        debug!("Fetching {} from Eastmoney", code);

        let body = self
            .http
            .execute_text(HttpRequest::get(PROVIDER_ID, format!("{}/{}.js", BASE_URL, code)))
            .await?;

        let payload = parse_jsonp(code, &body)?;

        Ok(FundQuote {
            code: code.to_string(),
            name: required(PROVIDER_ID, "name", &payload.name)?,
            valuation_date: required(PROVIDER_ID, "jzrq", &payload.jzrq)?,
            valuation_timestamp: required(PROVIDER_ID, "gztime", &payload.gztime)?,
            last_confirmed_value: decimal_string(&payload.dwjz)?,
            estimated_value: decimal_string(&payload.gsz)?,
            estimated_change_percent: fixed2(&payload.gszzl)?,
            source: PROVIDER_ID.to_string(),
        })
    }
}
