//! Quote provider trait definitions.
//!
//! This module defines the core `QuoteProvider` trait that all
//! valuation sources implement.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::errors::{ErrorKind, MarketDataError};
use crate::models::FundQuote;

use super::capabilities::ProviderCapabilities;
use super::kind::ProviderKind;

/// Trait for quote providers.
///
/// Implement this trait to add support for a new valuation source.
/// Providers only implement [`fetch_quote`](Self::fetch_quote); callers go
/// through [`fetch`](Self::fetch), which is where every error stops.
///
/// # Example
///
/// ```ignore
/// use async_trait::async_trait;
/// use fundwatch_market_data::provider::{ProviderCapabilities, ProviderKind, QuoteProvider};
///
/// struct MyProvider;
///
/// #[async_trait]
/// impl QuoteProvider for MyProvider {
///     fn kind(&self) -> ProviderKind {
///         ProviderKind::Eastmoney
///     }
///
///     fn capabilities(&self) -> ProviderCapabilities {
///         ProviderCapabilities {
///             instrument_kinds: &[InstrumentKind::Fund],
///         }
///     }
///
///     async fn fetch_quote(&self, code: &str) -> Result<FundQuote, MarketDataError> {
///         // ... talk to the upstream source
///     }
/// }
/// ```
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    /// Which source this provider talks to.
    fn kind(&self) -> ProviderKind;

    /// Unique identifier for this provider.
    ///
    /// Used for logging and as the `source` of produced quotes.
    fn id(&self) -> &'static str {
        self.kind().id()
    }

    /// Describes what this provider can value.
    fn capabilities(&self) -> ProviderCapabilities;

    /// Fetch and normalize the quote for one instrument.
    ///
    /// # Returns
    ///
    /// A fully populated quote, or a `MarketDataError` describing why none
    /// could be produced.
    async fn fetch_quote(&self, code: &str) -> Result<FundQuote, MarketDataError>;

    /// Fetch the quote for one instrument, or `None` if it is unavailable.
    ///
    /// Never fails: transport, payload and decode errors are logged and
    /// turned into `None`.
    async fn fetch(&self, code: &str) -> Option<FundQuote> {
        match self.fetch_quote(code).await {
            Ok(quote) => Some(quote),
            Err(e) => {
                match e.kind() {
                    ErrorKind::Transport => {
                        warn!("{} unavailable for {}: {}", self.id(), code, e)
                    }
                    ErrorKind::Payload | ErrorKind::Decode => {
                        debug!("{} has no quote for {}: {}", self.id(), code, e)
                    }
                }
                None
            }
        }
    }
}
