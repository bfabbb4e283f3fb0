//! Integration tests for the quote aggregator.
//!
//! Real providers run against an in-memory transport, so every path from
//! code list to normalized record is exercised without the network.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use fundwatch_market_data::provider::{build_provider, HttpRequest, ProviderCapabilities};
use fundwatch_market_data::{
    EngineConfig, FundQuote, HttpFetch, InstrumentKind, MarketDataError, ProviderKind,
    QuoteAggregator, QuoteProvider,
};

// =============================================================================
// Fixtures
// =============================================================================

/// Serves canned bodies keyed by the exact request URL; anything else is a 500.
#[derive(Default)]
struct CannedTransport {
    bodies: HashMap<String, (Duration, Vec<u8>)>,
    seen: Mutex<Vec<String>>,
}

impl CannedTransport {
    fn with(mut self, url: &str, delay_ms: u64, body: &str) -> Self {
        self.bodies.insert(
            url.to_string(),
            (Duration::from_millis(delay_ms), body.as_bytes().to_vec()),
        );
        self
    }

    fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpFetch for CannedTransport {
    async fn execute(&self, request: HttpRequest) -> Result<Vec<u8>, MarketDataError> {
        self.seen.lock().unwrap().push(request.url.clone());
        match self.bodies.get(&request.url) {
            Some((delay, body)) => {
                tokio::time::sleep(*delay).await;
                Ok(body.clone())
            }
            None => Err(MarketDataError::HttpStatus {
                provider: request.provider.to_string(),
                status: 500,
            }),
        }
    }
}

fn eastmoney_url(code: &str) -> String {
    format!("http://fundgz.1234567.com.cn/js/{}.js", code)
}

fn eastmoney_body(code: &str, gszzl: &str) -> String {
    format!(
        r#"jsonpgz({{"fundcode":"{}","name":"Fund {}","jzrq":"2021-01-29","dwjz":"1.3000","gsz":"1.3100","gszzl":"{}","gztime":"2021-02-01 15:00"}});"#,
        code, code, gszzl
    )
}

/// Values every fund code, counting how often it is asked.
struct BackupProvider {
    calls: AtomicUsize,
}

#[async_trait]
impl QuoteProvider for BackupProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Howbuy
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            instrument_kinds: &[InstrumentKind::Fund],
        }
    }

    async fn fetch_quote(&self, code: &str) -> Result<FundQuote, MarketDataError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(FundQuote {
            code: code.to_string(),
            name: "Backup".to_string(),
            valuation_date: "2021-01-29".to_string(),
            valuation_timestamp: "2021-02-01 15:00".to_string(),
            last_confirmed_value: "1.0000".to_string(),
            estimated_value: "1.0000".to_string(),
            estimated_change_percent: "0.00".to_string(),
            source: self.id().to_string(),
        })
    }
}

fn config() -> EngineConfig {
    EngineConfig::default().with_batch_delay(Duration::ZERO)
}

fn codes(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|c| c.to_string()).collect()
}

// =============================================================================
// Batch mode
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_batch_through_real_provider_keeps_input_order() {
    // First code answers last, third code has no canned body.
    let transport = Arc::new(
        CannedTransport::default()
            .with(&eastmoney_url("000001"), 300, &eastmoney_body("000001", "1.234"))
            .with(&eastmoney_url("000002"), 10, &eastmoney_body("000002", "-0.5"))
            .with(&eastmoney_url("000004"), 100, &eastmoney_body("000004", "0")),
    );
    let aggregator = QuoteAggregator::with_providers(
        vec![build_provider(ProviderKind::Eastmoney, transport.clone())],
        config(),
    );

    let outcomes = aggregator
        .fetch_batch(
            &codes(&["000001", "000002", "000003", "000004"]),
            ProviderKind::Eastmoney,
        )
        .await;

    let percents: Vec<Option<&str>> = outcomes
        .iter()
        .map(|o| o.as_ref().map(|q| q.estimated_change_percent.as_str()))
        .collect();
    assert_eq!(percents, vec![Some("1.23"), Some("-0.50"), None, Some("0.00")]);
    assert_eq!(outcomes[1].as_ref().unwrap().code, "000002");
    assert_eq!(transport.seen().len(), 4);
}

#[tokio::test]
async fn test_malformed_codes_never_reach_the_network() {
    let transport = Arc::new(CannedTransport::default());
    let aggregator = QuoteAggregator::with_providers(
        vec![
            build_provider(ProviderKind::Eastmoney, transport.clone()),
            build_provider(ProviderKind::Sina, transport.clone()),
        ],
        config(),
    );

    let wanted = codes(&["1.000001", "../../evil?x="]);
    for kind in [ProviderKind::Eastmoney, ProviderKind::Sina] {
        let outcomes = aggregator.fetch_batch(&wanted, kind).await;
        assert_eq!(outcomes, vec![None, None]);
    }
    assert!(transport.seen().is_empty());
}

#[tokio::test]
async fn test_identical_responses_give_identical_records() {
    let transport = Arc::new(CannedTransport::default().with(
        &eastmoney_url("161725"),
        0,
        &eastmoney_body("161725", "0.77"),
    ));
    let aggregator = QuoteAggregator::with_providers(
        vec![build_provider(ProviderKind::Eastmoney, transport)],
        config(),
    );

    let wanted = codes(&["161725"]);
    let first = aggregator.fetch_batch(&wanted, ProviderKind::Eastmoney).await;
    let second = aggregator.fetch_batch(&wanted, ProviderKind::Eastmoney).await;
    assert!(first[0].is_some());
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_records_serialize_with_camel_case_fields() {
    let transport = Arc::new(CannedTransport::default().with(
        &eastmoney_url("161725"),
        0,
        &eastmoney_body("161725", "0.77"),
    ));
    let aggregator = QuoteAggregator::with_providers(
        vec![build_provider(ProviderKind::Eastmoney, transport)],
        config(),
    );

    let map = aggregator
        .fetch_map(&codes(&["161725"]), ProviderKind::Eastmoney)
        .await;
    let json = serde_json::to_value(&map["161725"]).unwrap();
    assert_eq!(json["estimatedChangePercent"], "0.77");
    assert_eq!(json["lastConfirmedValue"], "1.3000");
    assert_eq!(json["source"], "EASTMONEY");
}

// =============================================================================
// Fallback mode
// =============================================================================

#[tokio::test]
async fn test_fallback_moves_on_after_upstream_failure() {
    let transport = Arc::new(CannedTransport::default());
    let backup = Arc::new(BackupProvider {
        calls: AtomicUsize::new(0),
    });
    let aggregator = QuoteAggregator::with_providers(
        vec![
            build_provider(ProviderKind::Eastmoney, transport.clone()),
            backup.clone(),
        ],
        config(),
    );

    let quote = aggregator
        .fetch_with_fallback("161725", &[ProviderKind::Eastmoney, ProviderKind::Howbuy])
        .await
        .unwrap();

    assert_eq!(quote.source, "HOWBUY");
    assert_eq!(transport.seen(), vec![eastmoney_url("161725")]);
    assert_eq!(backup.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_fallback_first_success_skips_the_rest() {
    let transport = Arc::new(CannedTransport::default().with(
        &eastmoney_url("161725"),
        0,
        &eastmoney_body("161725", "0.77"),
    ));
    let backup = Arc::new(BackupProvider {
        calls: AtomicUsize::new(0),
    });
    let aggregator = QuoteAggregator::with_providers(
        vec![build_provider(ProviderKind::Eastmoney, transport), backup.clone()],
        config().with_fallback_chain(vec![ProviderKind::Eastmoney, ProviderKind::Howbuy]),
    );

    let quote = aggregator.fetch_with_default_chain("161725").await.unwrap();
    assert_eq!(quote.source, "EASTMONEY");
    assert_eq!(backup.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_batch_fallback_survives_stalled_upstream() {
    let transport = Arc::new(CannedTransport::default().with(
        &eastmoney_url("161725"),
        60_000,
        &eastmoney_body("161725", "0.77"),
    ));
    let backup = Arc::new(BackupProvider {
        calls: AtomicUsize::new(0),
    });
    let aggregator = QuoteAggregator::with_providers(
        vec![build_provider(ProviderKind::Eastmoney, transport), backup.clone()],
        config(),
    );

    let outcomes = aggregator
        .fetch_batch_with_fallback(
            &codes(&["161725"]),
            &[ProviderKind::Eastmoney, ProviderKind::Howbuy],
        )
        .await;

    assert_eq!(outcomes[0].as_ref().map(|q| q.source.as_str()), Some("HOWBUY"));
    assert_eq!(backup.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_index_codes_only_reach_the_index_provider() {
    let transport = Arc::new(CannedTransport::default());
    let aggregator = QuoteAggregator::with_providers(
        vec![
            build_provider(ProviderKind::Eastmoney, transport.clone()),
            build_provider(ProviderKind::EastmoneyIndex, transport.clone()),
        ],
        config(),
    );

    let quote = aggregator
        .fetch_with_fallback(
            "1.000001",
            &[ProviderKind::Eastmoney, ProviderKind::EastmoneyIndex],
        )
        .await;

    assert!(quote.is_none());
    let seen = transport.seen();
    assert_eq!(seen.len(), 1);
    assert!(seen[0].contains("push2.eastmoney.com"));
}

// =============================================================================
// Cancellation
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_cancel_mid_batch_keeps_length() {
    let transport = Arc::new(
        CannedTransport::default()
            .with(&eastmoney_url("000001"), 10, &eastmoney_body("000001", "1"))
            .with(&eastmoney_url("000002"), 60_000, &eastmoney_body("000002", "1")),
    );
    let aggregator = Arc::new(QuoteAggregator::with_providers(
        vec![build_provider(ProviderKind::Eastmoney, transport)],
        config().with_task_timeout(None),
    ));

    let token = aggregator.cancellation_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        token.cancel();
    });

    let outcomes = aggregator
        .fetch_batch(&codes(&["000001", "000002"]), ProviderKind::Eastmoney)
        .await;

    assert_eq!(outcomes.len(), 2);
    assert!(outcomes[0].is_some());
    assert!(outcomes[1].is_none());

    let next = aggregator
        .fetch_batch(&codes(&["000001"]), ProviderKind::Eastmoney)
        .await;
    assert!(next[0].is_some());
}

// =============================================================================
// Live
// =============================================================================

#[tokio::test]
#[ignore] // Requires network access
async fn test_live_default_indices() {
    let aggregator = QuoteAggregator::new(EngineConfig::default()).unwrap();
    let outcomes = aggregator.fetch_default_indices().await;
    assert_eq!(outcomes.len(), fundwatch_market_data::DEFAULT_INDEX_CODES.len());
    for quote in outcomes.iter().flatten() {
        println!(
            "{} {} {}%",
            quote.name, quote.estimated_value, quote.estimated_change_percent
        );
    }
}
