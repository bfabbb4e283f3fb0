//! Sina (新浪基金) fund valuation provider.
//!
//! `GET https://hq.sinajs.cn/list=fu_{code}` answers with a legacy quote line
//! encoded in GB18030:
//!
//! ```text
//! var hq_str_fu_161725="招商中证白酒指数,15:00:00,1.3100,1.3000,3.1000,0.0000,0.7692,2021-02-01";
//! ```
//!
//! Fields: name, time, estimate, confirmed value, accumulated value, unused,
//! change percent, estimate date. An empty string between the quotes means
//! the fund is unknown. The valuation date comes from the fund's `bc.shtml`
//! page.

use std::sync::Arc;

use async_trait::async_trait;
use encoding_rs::GB18030;
use tracing::debug;

use crate::errors::MarketDataError;
use crate::models::{FundQuote, InstrumentKind};
use crate::normalize::{decimal_string, fixed2};
use crate::provider::extract::{extract, FieldRule, Transform};
use crate::provider::headers::SINA_REFERER;
use crate::provider::{
    fund_code, required, HttpFetch, HttpRequest, ProviderCapabilities, ProviderKind,
    QuoteProvider,
};

const PROVIDER_ID: &str = "SINA";
const LIST_URL: &str = "https://hq.sinajs.cn/list=fu_";
const PAGE_URL: &str = "https://finance.sina.com.cn/fund/quotes";

const FIELD_COUNT: usize = 8;

/// The date element reads `净值日期：2021-01-29`; the label is five characters.
const PAGE_RULES: &[FieldRule] = &[FieldRule::text("jzrq", "#fund_info_blk2 > .fund_data_date")
    .with(&[Transform::Trim, Transform::SkipChars(5), Transform::Trim])];

/// Decode the raw response bytes from GB18030.
fn decode_gb18030(bytes: &[u8]) -> Result<String, MarketDataError> {
    let (text, _, had_errors) = GB18030.decode(bytes);
    if had_errors {
        return Err(MarketDataError::decode(PROVIDER_ID, "invalid GB18030 sequence"));
    }
    Ok(text.into_owned())
}

/// Fields of the quote line, in upstream order.
#[derive(Debug, PartialEq)]
struct QuoteLine {
    name: String,
    time: String,
    gsz: String,
    dwjz: String,
    gszzl: String,
    gzrq: String,
}

fn parse_quote_line(code: &str, text: &str) -> Result<QuoteLine, MarketDataError> {
    let (_, content) = text
        .split_once('=')
        .ok_or_else(|| MarketDataError::decode(PROVIDER_ID, "missing '=' in quote line"))?;

    let data: String = content
        .chars()
        .filter(|c| *c != '"' && *c != ';' && !c.is_whitespace())
        .collect();
    if data.is_empty() {
        return Err(MarketDataError::NoData {
            provider: PROVIDER_ID.to_string(),
            code: code.to_string(),
        });
    }

    let fields: Vec<&str> = data.split(',').collect();
    if fields.len() < FIELD_COUNT {
        return Err(MarketDataError::decode(
            PROVIDER_ID,
            format!("expected {} fields, got {}", FIELD_COUNT, fields.len()),
        ));
    }

    // name,time,gsz,dwjz,zjz,_,gszzl,gzrq
    Ok(QuoteLine {
        name: fields[0].to_string(),
        time: fields[1].to_string(),
        gsz: fields[2].to_string(),
        dwjz: fields[3].to_string(),
        gszzl: fields[6].to_string(),
        gzrq: fields[7].to_string(),
    })
}

/// Sina fund valuation provider.
pub struct SinaProvider {
    http: Arc<dyn HttpFetch>,
}

impl SinaProvider {
    pub fn new(http: Arc<dyn HttpFetch>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl QuoteProvider for SinaProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Sina
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            instrument_kinds: &[InstrumentKind::Fund],
        }
    }

    async fn fetch_quote(&self, code: &str) -> Result<FundQuote, MarketDataError> {
        let code = fund_code(PROVIDER_ID, code)?;
        let code = code.as_str();
        debug!("Fetching {} from Sina", code);

        let raw = self
            .http
            .execute(
                HttpRequest::get(PROVIDER_ID, format!("{}{}", LIST_URL, code))
                    .header("Referer", SINA_REFERER),
            )
            .await?;
        let line = parse_quote_line(code, &decode_gb18030(&raw)?)?;

        let page = self
            .http
            .execute_text(HttpRequest::get(
                PROVIDER_ID,
                format!("{}/{}/bc.shtml", PAGE_URL, code),
            ))
            .await?;
        let mut fields = extract(PROVIDER_ID, &page, PAGE_RULES)?;

        let gzrq = required(PROVIDER_ID, "gzrq", &line.gzrq)?;
        let time = required(PROVIDER_ID, "time", &line.time)?;

        Ok(FundQuote {
            code: code.to_string(),
            name: required(PROVIDER_ID, "name", &line.name)?,
            valuation_date: fields.take(PROVIDER_ID, "jzrq")?,
            valuation_timestamp: format!("{} {}", gzrq, time),
            last_confirmed_value: decimal_string(&line.dwjz)?,
            estimated_value: decimal_string(&line.gsz)?,
            estimated_change_percent: fixed2(&line.gszzl)?,
            source: PROVIDER_ID.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedFetch;

    const LINE: &str =
        "var hq_str_fu_161725=\"招商中证白酒指数,15:00:00,1.3100,1.3000,3.1000,0.0000,0.7692,2021-02-01\";\n";

    const PAGE: &str = r#"<html><body><div id="fund_info_blk2">
        <span class="fund_data_date">净值日期：2021-01-29</span>
        </div></body></html>"#;

    fn encoded(text: &str) -> Vec<u8> {
        let (bytes, _, _) = GB18030.encode(text);
        bytes.into_owned()
    }

    #[tokio::test]
    async fn test_fetch_decodes_gb18030() {
        let fetch = ScriptedFetch::new()
            .route("list=fu_161725", encoded(LINE))
            .route("/161725/bc.shtml", PAGE)
            .shared();
        let quote = SinaProvider::new(fetch.clone())
            .fetch("161725")
            .await
            .unwrap();

        assert_eq!(quote.name, "招商中证白酒指数");
        assert_eq!(quote.valuation_date, "2021-01-29");
        assert_eq!(quote.valuation_timestamp, "2021-02-01 15:00:00");
        assert_eq!(quote.estimated_value, "1.3100");
        assert_eq!(quote.last_confirmed_value, "1.3000");
        assert_eq!(quote.estimated_change_percent, "0.77");

        let first = &fetch.requests()[0];
        assert!(first.headers.iter().any(|(name, _)| *name == "Referer"));
    }

    #[tokio::test]
    async fn test_empty_line_skips_page() {
        let fetch = ScriptedFetch::new()
            .route("list=fu_", encoded("var hq_str_fu_000000=\"\";\n"))
            .route("bc.shtml", PAGE)
            .shared();
        let err = SinaProvider::new(fetch.clone())
            .fetch_quote("000000")
            .await
            .unwrap_err();

        assert!(matches!(err, MarketDataError::NoData { .. }));
        assert_eq!(fetch.request_count(), 1);
    }

    #[tokio::test]
    async fn test_utf8_body_does_not_yield_original_name() {
        let fetch = ScriptedFetch::new()
            .route("list=fu_", LINE.as_bytes().to_vec())
            .route("bc.shtml", PAGE)
            .shared();
        let name = SinaProvider::new(fetch)
            .fetch("161725")
            .await
            .map(|quote| quote.name);
        assert_ne!(name.as_deref(), Some("招商中证白酒指数"));
    }

    #[test]
    fn test_decode_rejects_invalid_bytes() {
        assert!(decode_gb18030(&[0x81, 0x20]).is_err());
    }

    #[test]
    fn test_parse_quote_line_needs_all_fields() {
        let err = parse_quote_line("161725", "var x=\"a,b,c\";").unwrap_err();
        assert!(matches!(err, MarketDataError::Decode { .. }));
    }

    #[test]
    fn test_parse_quote_line_needs_assignment() {
        assert!(parse_quote_line("161725", "garbage").is_err());
    }
}
