//! Howbuy (好买基金) fund valuation provider.
//!
//! Scrapes two pages, both requested with `POST`:
//! - `/fund/ajax/gmfund/valuation/valuationnav.htm?jjdm={code}` returns a small
//!   fragment of `<span>`s: estimate, change, change percent, `[MM-DD HH:MM]`.
//! - `/fund/{code}/` is the full product page with name, confirmed value and
//!   its date.
//!
//! The fragment carries no year, so the estimate timestamp is completed with
//! the current year in China time.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Datelike;
use tracing::debug;

use crate::errors::MarketDataError;
use crate::models::{FundQuote, InstrumentKind};
use crate::normalize::{decimal_string, fixed2};
use crate::provider::extract::{extract, FieldRule, Transform};
use crate::provider::{
    fund_code, provider_local_now, HttpFetch, HttpRequest, ProviderCapabilities, ProviderKind,
    QuoteProvider,
};

const PROVIDER_ID: &str = "HOWBUY";
const VALUATION_URL: &str = "https://www.howbuy.com/fund/ajax/gmfund/valuation/valuationnav.htm";
const PAGE_URL: &str = "https://www.howbuy.com/fund";

/// Shown when the product page has no recognizable valuation date.
pub const UNKNOWN_DATE: &str = "无法获取";

const FRAGMENT_RULES: &[FieldRule] = &[
    FieldRule::text("gsz", "span").nth(0),
    FieldRule::text("gszzl", "span")
        .nth(2)
        .with(&[Transform::RemoveAll("%"), Transform::Trim]),
    FieldRule::text("time", "span")
        .nth(3)
        .with(&[Transform::RemoveAll(r"[\[\]]"), Transform::Trim]),
];

const PAGE_RULES: &[FieldRule] = &[
    FieldRule::text("name", ".gmfund_title .lt h1")
        .with(&[Transform::RemoveAll(r"[()\d]"), Transform::Trim]),
    FieldRule::text("dwjz", ".dRate > div"),
    FieldRule::text("jzrq", ".dRate + *")
        .with(&[Transform::FirstMatch(r"\d{2}-\d{2}")])
        .or(UNKNOWN_DATE),
];

/// Howbuy fund valuation provider.
pub struct HowbuyProvider {
    http: Arc<dyn HttpFetch>,
}

impl HowbuyProvider {
    pub fn new(http: Arc<dyn HttpFetch>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl QuoteProvider for HowbuyProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Howbuy
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            instrument_kinds: &[InstrumentKind::Fund],
        }
    }

    async fn fetch_quote(&self, code: &str) -> Result<FundQuote, MarketDataError> {
        let code = fund_code(PROVIDER_ID, code)?;
        let code = code.as_str();
        debug!("Fetching {} from Howbuy", code);

        let fragment = self
            .http
            .execute_text(HttpRequest::post(PROVIDER_ID, VALUATION_URL).query("jjdm", code))
            .await?;
        if fragment.trim().is_empty() {
            return Err(MarketDataError::NoData {
                provider: PROVIDER_ID.to_string(),
                code: code.to_string(),
            });
        }
        let mut valuation = extract(PROVIDER_ID, &fragment, FRAGMENT_RULES)?;

        let page = self
            .http
            .execute_text(HttpRequest::post(
                PROVIDER_ID,
                format!("{}/{}/", PAGE_URL, code),
            ))
            .await?;
        let mut fields = extract(PROVIDER_ID, &page, PAGE_RULES)?;

        let year = provider_local_now().year();
        let time = valuation.take(PROVIDER_ID, "time")?;

        Ok(FundQuote {
            code: code.to_string(),
            name: fields.take(PROVIDER_ID, "name")?,
            valuation_date: fields.take(PROVIDER_ID, "jzrq")?,
            valuation_timestamp: format!("{}-{}", year, time),
            last_confirmed_value: decimal_string(&fields.take(PROVIDER_ID, "dwjz")?)?,
            estimated_value: decimal_string(&valuation.take(PROVIDER_ID, "gsz")?)?,
            estimated_change_percent: fixed2(&valuation.take(PROVIDER_ID, "gszzl")?)?,
            source: PROVIDER_ID.to_string(),
        })
    }
}
