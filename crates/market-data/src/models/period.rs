//! Backfill periods and the resolutions they map to.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Chart period requested by callers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "1D")]
    OneDay,
    #[serde(rename = "1M")]
    OneMonth,
    #[serde(rename = "3M")]
    ThreeMonths,
    #[serde(rename = "1Y")]
    OneYear,
    #[serde(rename = "5Y")]
    FiveYears,
    #[serde(rename = "MAX")]
    Max,
}

/// Candle resolution supported by the providers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolution {
    FiveMinute,
    Daily,
}

impl Period {
    /// The resolution to request for this period.
    pub fn resolution(&self) -> Resolution {
        match self {
            Period::OneDay => Resolution::FiveMinute,
            _ => Resolution::Daily,
        }
    }

    /// Lookback window in days; `None` means unbounded (MAX).
    pub fn lookback_days(&self) -> Option<i64> {
        match self {
            Period::OneDay => Some(1),
            Period::OneMonth => Some(30),
            Period::ThreeMonths => Some(90),
            Period::OneYear => Some(365),
            Period::FiveYears => Some(1825),
            Period::Max => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Period::OneDay => "1D",
            Period::OneMonth => "1M",
            Period::ThreeMonths => "3M",
            Period::OneYear => "1Y",
            Period::FiveYears => "5Y",
            Period::Max => "MAX",
        }
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_uppercase().as_str() {
            "1D" => Ok(Period::OneDay),
            "1M" => Ok(Period::OneMonth),
            "3M" => Ok(Period::ThreeMonths),
            "1Y" => Ok(Period::OneYear),
            "5Y" => Ok(Period::FiveYears),
            "MAX" => Ok(Period::Max),
            other => Err(format!("unknown period: {}", other)),
        }
    }
}
