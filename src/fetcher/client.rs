//! HTTP client for the racing odds API

use super::parse_place_odds;
use crate::error::validate_timeout;
use crate::models::{OddsSnapshot, PlaceOdds, RaceNo};
use chrono::Utc;
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;

/// Latest race odds endpoint
pub const DEFAULT_ODDS_URL: &str = "https://racing.stheadline.com/api/raceOdds/latest";

/// Pools requested from the endpoint; only place is read back
const DEFAULT_ODDS_TYPES: &str = "win,place,quin,place-quin";

/// Fetch errors
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Odds API returned HTTP {0}")]
    HttpStatus(StatusCode),

    #[error("Failed to parse odds response: {0}")]
    ParseError(String),

    #[error("Race number must be positive, got {0}")]
    InvalidRaceNo(RaceNo),

    #[error("Failed to create HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
}

/// Fetcher configuration
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Odds endpoint, without query string
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// User agent string
    pub user_agent: String,
    /// Comma separated pool list sent as `type`
    pub odds_types: String,
    /// API revision sent as `rev`
    pub revision: u32,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_ODDS_URL.to_string(),
            timeout_secs: 5,
            user_agent: "Mozilla/5.0".to_string(),
            odds_types: DEFAULT_ODDS_TYPES.to_string(),
            revision: 2,
        }
    }
}

impl FetcherConfig {
    /// Defaults overridden by `ODDS_API_URL` and `ODDS_TIMEOUT_SECS`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("ODDS_API_URL") {
            config.base_url = url;
        }
        if let Some(secs) = lookup("ODDS_TIMEOUT_SECS") {
            match secs.parse::<u64>() {
                Ok(s) if validate_timeout(s).is_ok() => config.timeout_secs = s,
                _ => tracing::warn!("Ignoring invalid ODDS_TIMEOUT_SECS: {}", secs),
            }
        }

        config
    }
}

/// Place odds fetcher.
///
/// Each call issues exactly one request; failures are returned, never
/// retried.
pub struct OddsFetcher {
    client: reqwest::Client,
    config: FetcherConfig,
}

impl OddsFetcher {
    /// Create a new fetcher with the given configuration
    pub fn new(config: FetcherConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(&config.user_agent)
            .build()
            .map_err(FetchError::ClientBuild)?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    /// Build URL for a race's odds
    fn build_url(&self, race_no: RaceNo) -> String {
        format!(
            "{}?raceNo={}&type={}&rev={}",
            self.config.base_url, race_no, self.config.odds_types, self.config.revision
        )
    }

    fn classify(&self, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout(self.config.timeout_secs)
        } else {
            FetchError::RequestFailed(err)
        }
    }

    /// Fetch place odds for a race.
    ///
    /// An empty map means the request succeeded but no horse had usable odds.
    pub async fn fetch_place_odds(&self, race_no: RaceNo) -> Result<PlaceOdds, FetchError> {
        if race_no == 0 {
            return Err(FetchError::InvalidRaceNo(race_no));
        }

        let url = self.build_url(race_no);
        tracing::info!("Fetching place odds: {}", url);

        let response = self
            .client
            .get(&url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!("Odds request for race {} failed with status {}", race_no, status);
            return Err(FetchError::HttpStatus(status));
        }

        let body = response.text().await.map_err(|e| self.classify(e))?;
        let odds = parse_place_odds(&body)?;

        if odds.is_empty() {
            tracing::warn!("No place odds available for race {}", race_no);
        }

        Ok(odds)
    }

    /// Fetch place odds and stamp them with the fetch time
    pub async fn fetch_snapshot(&self, race_no: RaceNo) -> Result<OddsSnapshot, FetchError> {
        let odds = self.fetch_place_odds(race_no).await?;

        Ok(OddsSnapshot {
            race_no,
            fetched_at: Utc::now(),
            odds,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher_for(server: &MockServer, timeout_secs: u64) -> OddsFetcher {
        let config = FetcherConfig {
            base_url: format!("{}/api/raceOdds/latest", server.uri()),
            timeout_secs,
            ..Default::default()
        };
        OddsFetcher::new(config).unwrap()
    }

    fn place_body() -> serde_json::Value {
        serde_json::json!({
            "data": {
                "win": {"raceOddsList": [{"horseNo1": 1, "value": 3.1}]},
                "place": {
                    "raceOddsList": [
                        {"horseNo1": 1, "value": 1.4},
                        {"horseNo1": 2, "value": 2.9},
                        {"horseNo1": 3, "value": 0}
                    ]
                }
            }
        })
    }

    #[test]
    fn test_config_default() {
        let config = FetcherConfig::default();
        assert_eq!(config.base_url, DEFAULT_ODDS_URL);
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.user_agent, "Mozilla/5.0");
        assert_eq!(config.revision, 2);
    }

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_config_from_lookup_overrides() {
        let config = FetcherConfig::from_lookup(lookup_from(&[
            ("ODDS_API_URL", "http://localhost:9000/odds"),
            ("ODDS_TIMEOUT_SECS", "12"),
        ]));
        assert_eq!(config.base_url, "http://localhost:9000/odds");
        assert_eq!(config.timeout_secs, 12);
        assert_eq!(config.revision, 2);
    }

    #[test]
    fn test_config_from_lookup_ignores_bad_timeout() {
        for bad in ["0", "abc", "-3", ""] {
            let config =
                FetcherConfig::from_lookup(lookup_from(&[("ODDS_TIMEOUT_SECS", bad)]));
            assert_eq!(config.timeout_secs, 5, "value {:?}", bad);
            assert_eq!(config.base_url, DEFAULT_ODDS_URL);
        }
    }

    #[test]
    fn test_config_from_empty_lookup_is_default() {
        let config = FetcherConfig::from_lookup(lookup_from(&[]));
        let default = FetcherConfig::default();
        assert_eq!(config.base_url, default.base_url);
        assert_eq!(config.timeout_secs, default.timeout_secs);
    }

    #[test]
    fn test_build_url() {
        let fetcher = OddsFetcher::new(FetcherConfig::default()).unwrap();
        assert_eq!(
            fetcher.build_url(4),
            "https://racing.stheadline.com/api/raceOdds/latest?raceNo=4&type=win,place,quin,place-quin&rev=2"
        );
    }

    #[tokio::test]
    async fn test_fetch_place_odds_success() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/raceOdds/latest"))
            .and(query_param("raceNo", "3"))
            .and(query_param("type", "win,place,quin,place-quin"))
            .and(query_param("rev", "2"))
            .and(header("user-agent", "Mozilla/5.0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(place_body()))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = fetcher_for(&server, 5);
        let odds = fetcher.fetch_place_odds(3).await.unwrap();

        assert_eq!(odds.len(), 2);
        assert_eq!(odds.get(1), Some(1.4));
        assert_eq!(odds.get(2), Some(2.9));
        assert!(!odds.contains(3));
    }

    #[tokio::test]
    async fn test_fetch_empty_list_is_success() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {"place": {"raceOddsList": []}}
            })))
            .mount(&server)
            .await;

        let odds = fetcher_for(&server, 5).fetch_place_odds(1).await.unwrap();
        assert!(odds.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_http_error_status() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = fetcher_for(&server, 5).fetch_place_odds(1).await.unwrap_err();
        assert!(matches!(err, FetchError::HttpStatus(s) if s == StatusCode::SERVICE_UNAVAILABLE));
    }

    #[tokio::test]
    async fn test_fetch_malformed_body() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = fetcher_for(&server, 5).fetch_place_odds(1).await.unwrap_err();
        assert!(matches!(err, FetchError::ParseError(_)));
    }

    #[tokio::test]
    async fn test_fetch_timeout() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(place_body())
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let err = fetcher_for(&server, 1).fetch_place_odds(1).await.unwrap_err();
        assert!(matches!(err, FetchError::Timeout(1)));
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn test_fetch_connection_refused() {
        let config = FetcherConfig {
            base_url: "http://127.0.0.1:1/api".to_string(),
            ..Default::default()
        };
        let err = OddsFetcher::new(config)
            .unwrap()
            .fetch_place_odds(1)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::RequestFailed(_)));
    }

    #[tokio::test]
    async fn test_fetch_rejects_race_zero() {
        let fetcher = OddsFetcher::new(FetcherConfig::default()).unwrap();
        let err = fetcher.fetch_place_odds(0).await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidRaceNo(0)));
    }

    #[tokio::test]
    async fn test_fetch_snapshot() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(place_body()))
            .mount(&server)
            .await;

        let snapshot = fetcher_for(&server, 5).fetch_snapshot(7).await.unwrap();
        assert_eq!(snapshot.race_no, 7);
        assert_eq!(snapshot.odds.len(), 2);
    }
}
