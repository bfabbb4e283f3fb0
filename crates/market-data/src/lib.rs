//! Fundwatch Market Data Crate
//!
//! Near-real-time valuation of Chinese open-end funds and market indices,
//! gathered from several independent public sources.
//!
//! # Overview
//!
//! The market data crate supports:
//! - Multiple upstream formats: JSONP, pipe-delimited text, JSON with an
//!   intraday series, GB18030 quote lines and plain HTML pages
//! - Bounded concurrent batches where one failing code never affects another
//! - Fallback chains that try sources in order until one answers
//! - Decimal-safe normalization of every value into one record shape
//!
//! # Architecture
//!
//! ```text
//! +------------------+
//! |  Instrument code |  ("161725", "1.000001")
//! +------------------+
//!          |
//!          v
//! +------------------+     +------------------+
//! |  QuoteAggregator | --> | BoundedExecutor  |  (ordered fan-out)
//! +------------------+     +------------------+
//!                                  |
//!                                  v
//!                          +------------------+
//!                          |  QuoteProvider   |  (Eastmoney, Sina, etc.)
//!                          +------------------+
//!                                  |
//!                                  v
//!                          +------------------+
//!                          |    HttpFetch     |  (reqwest transport)
//!                          +------------------+
//!                                  |
//!                                  v
//!                          +------------------+
//!                          | Option<FundQuote>|  (normalized record)
//!                          +------------------+
//! ```
//!
//! # Core Types
//!
//! - [`QuoteAggregator`] - Batch, fallback and keyed fetching
//! - [`BoundedExecutor`] - Ordered, bounded, cancellable task runner
//! - [`QuoteProvider`] - One upstream source
//! - [`FundQuote`] - Canonical valuation record
//! - [`InstrumentCode`] - Parsed fund or index code
//! - [`EngineConfig`] - Tunables, loadable from `FUNDWATCH_*` variables
//!
//! # Example
//!
//! ```no_run
//! use fundwatch_market_data::{EngineConfig, ProviderKind, QuoteAggregator};
//!
//! # async fn run() -> Result<(), fundwatch_market_data::ConfigError> {
//! let aggregator = QuoteAggregator::new(EngineConfig::from_env()?)?;
//! let codes = vec!["161725".to_string(), "110011".to_string()];
//!
//! for quote in aggregator.fetch_batch(&codes, ProviderKind::Eastmoney).await {
//!     match quote {
//!         Some(q) => println!("{} {} {}%", q.name, q.estimated_value, q.estimated_change_percent),
//!         None => println!("unavailable"),
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod aggregator;
pub mod config;
pub mod errors;
pub mod executor;
pub mod models;
pub mod normalize;
pub mod provider;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use aggregator::{QuoteAggregator, DEFAULT_INDEX_CODES};
pub use config::EngineConfig;
pub use errors::{ConfigError, ErrorKind, MarketDataError};
pub use executor::BoundedExecutor;
pub use models::{FundQuote, InstrumentCode, InstrumentKind};
pub use provider::{HttpFetch, ProviderKind, QuoteProvider, ReqwestFetcher};

pub use tokio_util::sync::CancellationToken;
