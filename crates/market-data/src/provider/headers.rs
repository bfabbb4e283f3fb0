//! HTTP headers for the valuation sources

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 Chrome/120.0.0.0 Safari/537.36";

/// Sina refuses quote-list requests without one of its own pages as referer.
pub const SINA_REFERER: &str = "https://finance.sina.com.cn";

pub const EASTMONEY_REFERER: &str = "https://fund.eastmoney.com/";

/// Headers sent with every request, whatever the provider.
pub fn default_headers(user_agent: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
    let agent = HeaderValue::from_str(user_agent)
        .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_USER_AGENT));
    headers.insert(USER_AGENT, agent);
    headers
}
