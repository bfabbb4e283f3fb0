//! Quote aggregator for orchestrating valuation providers.
//!
//! The aggregator owns one provider per [`ProviderKind`] and offers:
//! - Batch mode: every code from one chosen provider
//! - Fallback-chain mode: one code, trying providers in order
//! - Keyed results for callers that look quotes up by code
//!
//! Every fetch returns one `Option<FundQuote>` per requested code, in
//! request order. No fetch returns an error.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use log::{debug, info, warn};
use tokio_util::sync::CancellationToken;

use crate::config::EngineConfig;
use crate::errors::ConfigError;
use crate::executor::BoundedExecutor;
use crate::models::FundQuote;
use crate::provider::{all_providers, HttpFetch, ProviderKind, QuoteProvider, ReqwestFetcher};

/// Market indices shown by default.
pub const DEFAULT_INDEX_CODES: [&str; 7] = [
    "1.000001", // 上证指数
    "0.399001", // 深证成指
    "0.399006", // 创业板指
    "1.000300", // 沪深300
    "0.399005", // 中小板指
    "1.000016", // 上证50
    "1.000905", // 中证500
];

pub struct QuoteAggregator {
    providers: HashMap<ProviderKind, Arc<dyn QuoteProvider>>,
    executor: BoundedExecutor,
    config: EngineConfig,
    /// Token handed to the next batch. Replaced once cancelled.
    cancel: Mutex<CancellationToken>,
}

impl QuoteAggregator {
    /// Create an aggregator with every built-in provider on a shared HTTP
    /// client.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        let http: Arc<dyn HttpFetch> =
            Arc::new(ReqwestFetcher::new(&config.user_agent, config.request_timeout)?);
        Ok(Self::with_providers(all_providers(http), config))
    }

    /// Create an aggregator over an explicit provider set.
    ///
    /// A later provider replaces an earlier one of the same kind.
    pub fn with_providers(providers: Vec<Arc<dyn QuoteProvider>>, config: EngineConfig) -> Self {
        let providers = providers
            .into_iter()
            .map(|provider| (provider.kind(), provider))
            .collect();
        let executor =
            BoundedExecutor::new(config.concurrency).with_task_timeout(config.task_timeout);

        Self {
            providers,
            executor,
            config,
            cancel: Mutex::new(CancellationToken::new()),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Token that aborts the batches currently running on this aggregator.
    ///
    /// Unfinished codes come back as `None`. A batch started after the token
    /// was cancelled runs on a fresh token, so one cancel never disables the
    /// aggregator.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.batch_token()
    }

    /// Fetch every code from the provider of `kind`.
    ///
    /// Waits the configured batch delay first, then fans out through the
    /// executor. `result[i]` is the outcome for `codes[i]`.
    pub async fn fetch_batch(
        &self,
        codes: &[String],
        kind: ProviderKind,
    ) -> Vec<Option<FundQuote>> {
        self.fetch_batch_with_cancel(codes, kind, self.batch_token()).await
    }

    /// [`fetch_batch`](Self::fetch_batch) stopped by a caller owned token.
    pub async fn fetch_batch_with_cancel(
        &self,
        codes: &[String],
        kind: ProviderKind,
        cancel: CancellationToken,
    ) -> Vec<Option<FundQuote>> {
        let Some(provider) = self.providers.get(&kind).cloned() else {
            warn!(
                "No provider registered for '{}', {} codes unavailable",
                kind,
                codes.len()
            );
            return vec![None; codes.len()];
        };

        self.pause_before_batch().await;

        info!("Fetching {} codes from '{}'", codes.len(), kind);

        let tasks: Vec<_> = codes
            .iter()
            .map(|code| {
                let provider = provider.clone();
                let code = code.clone();
                move || async move { provider.fetch(&code).await }
            })
            .collect();

        let outcomes = self.executor.run_with_cancel(tasks, cancel).await;
        log_summary(kind.id(), &outcomes);
        outcomes
    }

    /// Fetch one code, trying the providers of `chain` in order.
    ///
    /// Returns the first quote produced. Providers that are not registered or
    /// cannot value the code are skipped without a request. Each attempt is
    /// bounded by the task timeout, so a stalled provider falls through to the
    /// next one.
    pub async fn fetch_with_fallback(
        &self,
        code: &str,
        chain: &[ProviderKind],
    ) -> Option<FundQuote> {
        let providers = self.chain_providers(chain);
        fallback(&providers, code, self.config.task_timeout).await
    }

    /// [`fetch_with_fallback`](Self::fetch_with_fallback) over the configured
    /// chain.
    pub async fn fetch_with_default_chain(&self, code: &str) -> Option<FundQuote> {
        self.fetch_with_fallback(code, &self.config.fallback_chain).await
    }

    /// Fetch every code, each one running the fallback chain on its own.
    ///
    /// Attempts are bounded as in
    /// [`fetch_with_fallback`](Self::fetch_with_fallback). The task as a whole
    /// gets one task timeout per provider in the chain.
    pub async fn fetch_batch_with_fallback(
        &self,
        codes: &[String],
        chain: &[ProviderKind],
    ) -> Vec<Option<FundQuote>> {
        let providers = Arc::new(self.chain_providers(chain));
        if providers.is_empty() {
            warn!("Fallback chain {:?} has no registered providers", chain);
            return vec![None; codes.len()];
        }

        let cancel = self.batch_token();
        let attempt_timeout = self.config.task_timeout;
        let executor = self
            .executor
            .with_task_timeout(attempt_timeout.map(|limit| chain_budget(limit, providers.len())));

        self.pause_before_batch().await;

        info!(
            "Fetching {} codes through chain of {} providers",
            codes.len(),
            providers.len()
        );

        let tasks: Vec<_> = codes
            .iter()
            .map(|code| {
                let providers = providers.clone();
                let code = code.clone();
                move || async move { fallback(&providers, &code, attempt_timeout).await }
            })
            .collect();

        let outcomes = executor.run_with_cancel(tasks, cancel).await;
        log_summary("fallback chain", &outcomes);
        outcomes
    }

    /// [`fetch_batch`](Self::fetch_batch) keyed by instrument code.
    ///
    /// A code requested twice appears once.
    pub async fn fetch_map(
        &self,
        codes: &[String],
        kind: ProviderKind,
    ) -> HashMap<String, Option<FundQuote>> {
        let outcomes = self.fetch_batch(codes, kind).await;
        codes.iter().cloned().zip(outcomes).collect()
    }

    /// Fetch market indices from the index provider.
    pub async fn fetch_indices(&self, codes: &[String]) -> Vec<Option<FundQuote>> {
        self.fetch_batch(codes, ProviderKind::EastmoneyIndex).await
    }

    /// Fetch [`DEFAULT_INDEX_CODES`].
    pub async fn fetch_default_indices(&self) -> Vec<Option<FundQuote>> {
        let codes: Vec<String> = DEFAULT_INDEX_CODES.iter().map(|c| c.to_string()).collect();
        self.fetch_indices(&codes).await
    }

    fn chain_providers(&self, chain: &[ProviderKind]) -> Vec<Arc<dyn QuoteProvider>> {
        chain
            .iter()
            .filter_map(|kind| {
                let provider = self.providers.get(kind).cloned();
                if provider.is_none() {
                    debug!("Provider '{}' not registered, skipping", kind);
                }
                provider
            })
            .collect()
    }

    async fn pause_before_batch(&self) {
        if !self.config.batch_delay.is_zero() {
            tokio::time::sleep(self.config.batch_delay).await;
        }
    }

    /// The shared token, replaced first if an earlier cancel consumed it.
    fn batch_token(&self) -> CancellationToken {
        let mut current = self.cancel.lock().unwrap_or_else(PoisonError::into_inner);
        if current.is_cancelled() {
            debug!("Previous batch was cancelled, starting on a fresh token");
            *current = CancellationToken::new();
        }
        current.clone()
    }
}

fn chain_budget(attempt: Duration, providers: usize) -> Duration {
    attempt.saturating_mul(u32::try_from(providers).unwrap_or(u32::MAX))
}

async fn fallback(
    providers: &[Arc<dyn QuoteProvider>],
    code: &str,
    attempt_timeout: Option<Duration>,
) -> Option<FundQuote> {
    for provider in providers {
        if !provider.capabilities().supports(code) {
            debug!("Provider '{}' cannot value '{}', skipping", provider.id(), code);
            continue;
        }

        let attempt = provider.fetch(code);
        let outcome = match attempt_timeout {
            Some(limit) => match tokio::time::timeout(limit, attempt).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    warn!(
                        "Provider '{}' timed out after {:?} on '{}', trying next",
                        provider.id(),
                        limit,
                        code
                    );
                    continue;
                }
            },
            None => attempt.await,
        };

        if let Some(quote) = outcome {
            debug!("'{}' valued by '{}'", code, provider.id());
            return Some(quote);
        }

        debug!("Provider '{}' has no quote for '{}', trying next", provider.id(), code);
    }

    debug!("No provider could value '{}'", code);
    None
}

fn log_summary(source: &str, outcomes: &[Option<FundQuote>]) {
    let found = outcomes.iter().filter(|o| o.is_some()).count();
    if found < outcomes.len() {
        warn!(
            "'{}' valued {} of {} codes",
            source,
            found,
            outcomes.len()
        );
    } else {
        debug!("'{}' valued all {} codes", source, found);
    }
}
