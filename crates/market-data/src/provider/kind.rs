use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// Tag identifying one upstream valuation source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProviderKind {
    /// fundgz.1234567.com.cn, JSONP
    Eastmoney,
    /// dayfund.cn, pipe-delimited text
    DayFund,
    /// gtimg.cn JSON API with an intraday series
    Tencent,
    /// hq.sinajs.cn, GB18030 quote line
    Sina,
    /// howbuy.com, HTML only
    Howbuy,
    /// push2.eastmoney.com, market indices
    EastmoneyIndex,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 6] = [
        Self::Eastmoney,
        Self::DayFund,
        Self::Tencent,
        Self::Sina,
        Self::Howbuy,
        Self::EastmoneyIndex,
    ];

    /// Stable identifier, also used as the `source` of produced quotes.
    pub fn id(&self) -> &'static str {
        match self {
            Self::Eastmoney => "EASTMONEY",
            Self::DayFund => "DAYFUND",
            Self::Tencent => "TENCENT",
            Self::Sina => "SINA",
            Self::Howbuy => "HOWBUY",
            Self::EastmoneyIndex => "EASTMONEY_INDEX",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.id().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ConfigError::UnknownProvider(wanted.to_string()))
    }
}
