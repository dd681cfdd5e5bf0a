//! HTTP fetcher for live place odds
//!
//! Pulls the latest odds for one race from the racing odds API and keeps the
//! place category only.
//!
//! # Example
//!
//! ```no_run
//! use dutching::fetcher::{FetcherConfig, OddsFetcher};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let fetcher = OddsFetcher::new(FetcherConfig::default())?;
//!
//!     let odds = fetcher.fetch_place_odds(3).await?;
//!     println!("{} horses priced", odds.len());
//!
//!     Ok(())
//! }
//! ```

mod client;
mod parser;

pub use client::{FetchError, FetcherConfig, OddsFetcher, DEFAULT_ODDS_URL};
pub use parser::{extract_place_odds, parse_place_odds};

use serde::de::IgnoredAny;
use serde::Deserialize;

/// Top level of the `raceOdds/latest` response
#[derive(Debug, Default, Deserialize)]
pub struct RaceOddsResponse {
    #[serde(default)]
    pub data: Option<RaceOddsData>,
}

/// Odds grouped by pool. Pools other than place are not read.
#[derive(Debug, Default, Deserialize)]
pub struct RaceOddsData {
    #[serde(default)]
    pub place: Option<OddsPool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct OddsPool {
    #[serde(default, rename = "raceOddsList")]
    pub race_odds_list: Vec<RaceOddsEntry>,
}

/// One row of a pool's odds list
#[derive(Debug, Default, Deserialize)]
pub struct RaceOddsEntry {
    #[serde(default, rename = "horseNo1")]
    pub horse_no: Option<FeedNumber>,
    #[serde(default)]
    pub value: Option<FeedNumber>,
}

/// Numeric field as sent by the feed: a JSON number, a numeric string, or
/// something unusable
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum FeedNumber {
    Number(f64),
    Text(String),
    Other(IgnoredAny),
}

impl FeedNumber {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FeedNumber::Number(n) => Some(*n),
            FeedNumber::Text(s) => s.trim().parse::<f64>().ok(),
            FeedNumber::Other(_) => None,
        }
    }

    /// Interpret as a positive whole number (horse numbers)
    pub fn as_positive_int(&self) -> Option<u32> {
        let n = self.as_f64()?;
        if n.is_finite() && n >= 1.0 && n.fract() == 0.0 && n <= u32::MAX as f64 {
            Some(n as u32)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_number_variants() {
        let n: FeedNumber = serde_json::from_str("3.5").unwrap();
        assert_eq!(n.as_f64(), Some(3.5));

        let n: FeedNumber = serde_json::from_str("\" 2.1 \"").unwrap();
        assert_eq!(n.as_f64(), Some(2.1));

        let n: FeedNumber = serde_json::from_str("\"SCR\"").unwrap();
        assert_eq!(n.as_f64(), None);

        let n: FeedNumber = serde_json::from_str("true").unwrap();
        assert_eq!(n.as_f64(), None);
    }

    #[test]
    fn test_feed_number_as_positive_int() {
        let n: FeedNumber = serde_json::from_str("7").unwrap();
        assert_eq!(n.as_positive_int(), Some(7));

        let n: FeedNumber = serde_json::from_str("\"12\"").unwrap();
        assert_eq!(n.as_positive_int(), Some(12));

        let n: FeedNumber = serde_json::from_str("0").unwrap();
        assert_eq!(n.as_positive_int(), None);

        let n: FeedNumber = serde_json::from_str("2.5").unwrap();
        assert_eq!(n.as_positive_int(), None);

        let n: FeedNumber = serde_json::from_str("-3").unwrap();
        assert_eq!(n.as_positive_int(), None);
    }

    #[test]
    fn test_response_without_place_pool() {
        let response: RaceOddsResponse =
            serde_json::from_str(r#"{"data": {"win": {"raceOddsList": []}}}"#).unwrap();
        assert!(response.data.unwrap().place.is_none());
    }
}
