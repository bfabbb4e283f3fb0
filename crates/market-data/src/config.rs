//! Engine configuration.
//!
//! Every setting has a default and can be overridden from `FUNDWATCH_*`
//! environment variables:
//!
//! | Variable                        | Meaning                                  | Default |
//! |---------------------------------|------------------------------------------|---------|
//! | `FUNDWATCH_CONCURRENCY`         | Tasks in flight per batch                | 5       |
//! | `FUNDWATCH_TASK_TIMEOUT_MS`     | Per-task timeout, `0` disables           | 10000   |
//! | `FUNDWATCH_BATCH_DELAY_MS`      | Pause before a batch starts, `0` skips   | 1000    |
//! | `FUNDWATCH_REQUEST_TIMEOUT_MS`  | HTTP request timeout                     | 8000    |
//! | `FUNDWATCH_USER_AGENT`          | `User-Agent` sent upstream               | desktop |
//! | `FUNDWATCH_FALLBACK_CHAIN`      | Comma separated provider ids             | see below |
//!
//! The default fallback chain is `EASTMONEY,TENCENT,SINA,DAYFUND,HOWBUY`.

use std::str::FromStr;
use std::time::Duration;

use crate::errors::ConfigError;
use crate::executor::{DEFAULT_CONCURRENCY, DEFAULT_TASK_TIMEOUT};
use crate::provider::{ProviderKind, DEFAULT_USER_AGENT};

pub const ENV_CONCURRENCY: &str = "FUNDWATCH_CONCURRENCY";
pub const ENV_TASK_TIMEOUT_MS: &str = "FUNDWATCH_TASK_TIMEOUT_MS";
pub const ENV_BATCH_DELAY_MS: &str = "FUNDWATCH_BATCH_DELAY_MS";
pub const ENV_REQUEST_TIMEOUT_MS: &str = "FUNDWATCH_REQUEST_TIMEOUT_MS";
pub const ENV_USER_AGENT: &str = "FUNDWATCH_USER_AGENT";
pub const ENV_FALLBACK_CHAIN: &str = "FUNDWATCH_FALLBACK_CHAIN";

pub const DEFAULT_BATCH_DELAY: Duration = Duration::from_secs(1);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(8);

/// Fund providers tried in order when no chain is given.
pub const DEFAULT_FALLBACK_CHAIN: [ProviderKind; 5] = [
    ProviderKind::Eastmoney,
    ProviderKind::Tencent,
    ProviderKind::Sina,
    ProviderKind::DayFund,
    ProviderKind::Howbuy,
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    pub concurrency: usize,
    pub task_timeout: Option<Duration>,
    pub batch_delay: Duration,
    pub request_timeout: Duration,
    pub user_agent: String,
    pub fallback_chain: Vec<ProviderKind>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            task_timeout: Some(DEFAULT_TASK_TIMEOUT),
            batch_delay: DEFAULT_BATCH_DELAY,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            fallback_chain: DEFAULT_FALLBACK_CHAIN.to_vec(),
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by whatever `FUNDWATCH_*` variables are set.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable lookup.
    pub fn from_env_map<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_CONCURRENCY) {
            let concurrency: usize = parse_number(ENV_CONCURRENCY, &raw)?;
            if concurrency == 0 {
                return Err(invalid(ENV_CONCURRENCY, &raw));
            }
            config.concurrency = concurrency;
        }
        if let Some(raw) = lookup(ENV_TASK_TIMEOUT_MS) {
            config.task_timeout = match parse_number(ENV_TASK_TIMEOUT_MS, &raw)? {
                0 => None,
                ms => Some(Duration::from_millis(ms)),
            };
        }
        if let Some(raw) = lookup(ENV_BATCH_DELAY_MS) {
            config.batch_delay = Duration::from_millis(parse_number(ENV_BATCH_DELAY_MS, &raw)?);
        }
        if let Some(raw) = lookup(ENV_REQUEST_TIMEOUT_MS) {
            let ms: u64 = parse_number(ENV_REQUEST_TIMEOUT_MS, &raw)?;
            if ms == 0 {
                return Err(invalid(ENV_REQUEST_TIMEOUT_MS, &raw));
            }
            config.request_timeout = Duration::from_millis(ms);
        }
        if let Some(raw) = lookup(ENV_USER_AGENT) {
            let agent = raw.trim();
            if !agent.is_empty() {
                config.user_agent = agent.to_string();
            }
        }
        if let Some(raw) = lookup(ENV_FALLBACK_CHAIN) {
            config.fallback_chain = parse_chain(&raw)?;
        }

        Ok(config)
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_task_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.task_timeout = timeout;
        self
    }

    pub fn with_batch_delay(mut self, delay: Duration) -> Self {
        self.batch_delay = delay;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_fallback_chain(mut self, chain: Vec<ProviderKind>) -> Self {
        self.fallback_chain = chain;
        self
    }
}

/// Parse a comma separated list of provider ids. Blank entries are ignored.
pub fn parse_chain(raw: &str) -> Result<Vec<ProviderKind>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ProviderKind::from_str)
        .collect()
}

fn parse_number<T: FromStr>(key: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| invalid(key, raw))
}

fn invalid(key: &str, raw: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: raw.to_string(),
    }
}
