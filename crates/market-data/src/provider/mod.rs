//! Quote provider abstractions and implementations.
//!
//! This module contains:
//! - The `QuoteProvider` trait that all providers implement
//! - The `HttpFetch` transport seam and its reqwest implementation
//! - Declarative HTML extraction rules shared by the scraping providers
//! - Concrete providers, one per upstream source
//!
//! # Architecture
//!
//! Every provider owns exactly one upstream protocol: request shape, transport
//! encoding, payload format and mapping onto [`FundQuote`](crate::models::FundQuote).
//! Providers share nothing but an immutable transport handle, and they are
//! selected by [`ProviderKind`] tag, never by looking at a response.

mod capabilities;
pub mod extract;
mod headers;
mod http;
mod kind;
mod traits;

pub mod dayfund;
pub mod eastmoney;
pub mod eastmoney_index;
pub mod howbuy;
pub mod sina;
pub mod tencent;

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Utc};

use crate::errors::MarketDataError;
use crate::models::InstrumentCode;

// Re-exports
pub use capabilities::ProviderCapabilities;
pub use headers::DEFAULT_USER_AGENT;
pub use http::{HttpFetch, HttpRequest, Method, ReqwestFetcher};
pub use kind::ProviderKind;
pub use traits::QuoteProvider;

use dayfund::DayFundProvider;
use eastmoney::EastmoneyProvider;
use eastmoney_index::EastmoneyIndexProvider;
use howbuy::HowbuyProvider;
use sina::SinaProvider;
use tencent::TencentProvider;

/// Build the provider for `kind` on top of a shared transport.
pub fn build_provider(kind: ProviderKind, http: Arc<dyn HttpFetch>) -> Arc<dyn QuoteProvider> {
    match kind {
        ProviderKind::Eastmoney => Arc::new(EastmoneyProvider::new(http)),
        ProviderKind::DayFund => Arc::new(DayFundProvider::new(http)),
        ProviderKind::Tencent => Arc::new(TencentProvider::new(http)),
        ProviderKind::Sina => Arc::new(SinaProvider::new(http)),
        ProviderKind::Howbuy => Arc::new(HowbuyProvider::new(http)),
        ProviderKind::EastmoneyIndex => Arc::new(EastmoneyIndexProvider::new(http)),
    }
}

/// Build every known provider, in [`ProviderKind::ALL`] order.
pub fn all_providers(http: Arc<dyn HttpFetch>) -> Vec<Arc<dyn QuoteProvider>> {
    ProviderKind::ALL
        .into_iter()
        .map(|kind| build_provider(kind, http.clone()))
        .collect()
}

/// Trimmed, non-empty value of a field that must be present.
pub(crate) fn required(
    provider: &str,
    field: &str,
    value: &str,
) -> Result<String, MarketDataError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(MarketDataError::missing(provider, field));
    }
    Ok(value.to_string())
}

/// The six digits of a fund code, or [`MarketDataError::UnsupportedCode`].
///
/// Fund providers splice the code into URLs, so anything else is refused
/// before a request is built.
pub(crate) fn fund_code(provider: &str, code: &str) -> Result<String, MarketDataError> {
    match InstrumentCode::parse(code) {
        Some(fund @ InstrumentCode::Fund { .. }) => Ok(fund.digits().to_string()),
        _ => Err(MarketDataError::UnsupportedCode {
            provider: provider.to_string(),
            code: code.to_string(),
        }),
    }
}

/// Every upstream source publishes in China Standard Time.
const CHINA_UTC_OFFSET_SECS: i32 = 8 * 3600;

pub(crate) fn china_offset() -> FixedOffset {
    FixedOffset::east_opt(CHINA_UTC_OFFSET_SECS).expect("UTC+8 is a valid offset")
}

pub(crate) fn provider_local_now() -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&china_offset())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedFetch;

    #[test]
    fn test_build_provider_matches_kind() {
        let http: Arc<dyn HttpFetch> = ScriptedFetch::new().shared();
        for kind in ProviderKind::ALL {
            let provider = build_provider(kind, http.clone());
            assert_eq!(provider.kind(), kind);
            assert_eq!(provider.id(), kind.id());
        }
    }

    #[test]
    fn test_only_index_provider_handles_indices() {
        let http: Arc<dyn HttpFetch> = ScriptedFetch::new().shared();
        for provider in all_providers(http) {
            let handles_index = provider.capabilities().supports("1.000001");
            assert_eq!(handles_index, provider.kind() == ProviderKind::EastmoneyIndex);
            assert_eq!(
                provider.capabilities().supports("161725"),
                provider.kind() != ProviderKind::EastmoneyIndex
            );
        }
    }

    #[test]
    fn test_required_trims_and_rejects_blank() {
        assert_eq!(required("X", "f", " a ").unwrap(), "a");
        assert!(matches!(
            required("X", "f", "   "),
            Err(MarketDataError::MissingField { .. })
        ));
    }

    #[test]
    fn test_fund_code_accepts_only_funds() {
        assert_eq!(fund_code("SINA", " 161725 ").unwrap(), "161725");
        for code in ["1.000001", "../../evil?x=", "16172", ""] {
            assert!(matches!(
                fund_code("SINA", code),
                Err(MarketDataError::UnsupportedCode { .. })
            ));
        }
    }

    #[tokio::test]
    async fn test_fund_providers_reject_bad_codes_without_requests() {
        for kind in ProviderKind::ALL {
            if kind == ProviderKind::EastmoneyIndex {
                continue;
            }
            let fetch = ScriptedFetch::new().shared();
            let provider = build_provider(kind, fetch.clone());

            for code in ["1.000001", "../../evil?x="] {
                let err = provider.fetch_quote(code).await.unwrap_err();
                assert!(
                    matches!(err, MarketDataError::UnsupportedCode { .. }),
                    "{} accepted {:?}: {:?}",
                    kind,
                    code,
                    err
                );
            }
            assert_eq!(fetch.request_count(), 0, "{} issued a request", kind);
        }
    }

    #[test]
    fn test_china_offset() {
        assert_eq!(china_offset().local_minus_utc(), 8 * 3600);
    }
}
