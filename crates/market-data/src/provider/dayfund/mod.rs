//! DayFund (基金速查网) fund valuation provider.
//!
//! Two requests per quote:
//! - `GET /ajs/ajaxdata.shtml?showtype=getfundvalue&fundcode={code}` returns a
//!   pipe-delimited line
//!   (`2021-01-29|1.8040|2.2490|-0.0440|-2.3800%|-1.8652%|-0.0345|1.8135|1.8480|2021-01-29|15:35:00`)
//! - `GET /fundinfo/{code}.html` supplies the display name via its keywords meta tag.
//!
//! An all-placeholder line means the fund is unknown; in that case the page is
//! never requested.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::errors::MarketDataError;
use crate::models::{FundQuote, InstrumentKind};
use crate::normalize::{decimal_string, fixed2};
use crate::provider::extract::{extract, FieldRule, Transform};
use crate::provider::{
    fund_code, required, HttpFetch, HttpRequest, ProviderCapabilities, ProviderKind,
    QuoteProvider,
};

const PROVIDER_ID: &str = "DAYFUND";
const VALUE_URL: &str = "https://www.dayfund.cn/ajs/ajaxdata.shtml";
const PAGE_URL: &str = "https://www.dayfund.cn/fundinfo";

/// Body returned for codes DayFund knows nothing about.
const EMPTY_SENTINEL: &str = "||||%|%|||||";

const FIELD_COUNT: usize = 11;

const PAGE_RULES: &[FieldRule] = &[FieldRule::attr("name", "meta[name=keywords]", "content")
    .with(&[Transform::FirstItem(','), Transform::Trim])];

/// Fields of the value line, in upstream order.
#[derive(Debug)]
struct ValueLine<'a> {
    /// Valuation date of the confirmed value
    jzrq: &'a str,
    /// Estimate change, percent with a trailing `%`
    gsbjl: &'a str,
    /// Intraday estimate
    gsz: &'a str,
    /// Last confirmed net value
    dwjz: &'a str,
    /// Estimate date
    gzrq: &'a str,
    /// Estimate time
    gztime: &'a str,
}

fn parse_value_line<'a>(code: &str, body: &'a str) -> Result<ValueLine<'a>, MarketDataError> {
    let body = body.trim();
    if body == EMPTY_SENTINEL {
        return Err(MarketDataError::NoData {
            provider: PROVIDER_ID.to_string(),
            code: code.to_string(),
        });
    }

    let fields: Vec<&str> = body.split('|').collect();
    if fields.len() < FIELD_COUNT {
        return Err(MarketDataError::decode(
            PROVIDER_ID,
            format!("expected {} fields, got {}", FIELD_COUNT, fields.len()),
        ));
    }

    // jzrq|zxjz|ljjz|sjbjz|sjzzl|gsbjl|gsbjz|gsz|dwjz|gzrq|gztime
    Ok(ValueLine {
        jzrq: fields[0],
        gsbjl: fields[5],
        gsz: fields[7],
        dwjz: fields[8],
        gzrq: fields[9],
        gztime: fields[10],
    })
}

/// DayFund fund valuation provider.
pub struct DayFundProvider {
    http: Arc<dyn HttpFetch>,
}

impl DayFundProvider {
    pub fn new(http: Arc<dyn HttpFetch>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl QuoteProvider for DayFundProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::DayFund
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            instrument_kinds: &[InstrumentKind::Fund],
        }
    }

    async fn fetch_quote(&self, code: &str) -> Result<FundQuote, MarketDataError> {
        let code = fund_code(PROVIDER_ID, code)?;
        let code = code.as_str();
        debug!("Fetching {} from DayFund", code);

        let body = self
            .http
            .execute_text(
                HttpRequest::get(PROVIDER_ID, VALUE_URL)
                    .query("showtype", "getfundvalue")
                    .query("fundcode", code),
            )
            .await?;
        let line = parse_value_line(code, &body)?;

        let page = self
            .http
            .execute_text(HttpRequest::get(
                PROVIDER_ID,
                format!("{}/{}.html", PAGE_URL, code),
            ))
            .await?;
        let mut fields = extract(PROVIDER_ID, &page, PAGE_RULES)?;

        let gzrq = required(PROVIDER_ID, "gzrq", line.gzrq)?;
        let gztime = required(PROVIDER_ID, "gztime", line.gztime)?;

        Ok(FundQuote {
            code: code.to_string(),
            name: fields.take(PROVIDER_ID, "name")?,
            valuation_date: required(PROVIDER_ID, "jzrq", line.jzrq)?,
            valuation_timestamp: format!("{} {}", gzrq, gztime),
            last_confirmed_value: decimal_string(line.dwjz)?,
            estimated_value: decimal_string(line.gsz)?,
            estimated_change_percent: fixed2(line.gsbjl)?,
            source: PROVIDER_ID.to_string(),
        })
    }
}
