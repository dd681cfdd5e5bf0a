//! Place odds JSON parser

use super::{FetchError, RaceOddsResponse};
use crate::models::PlaceOdds;

/// Parse place odds from a response body.
///
/// Fails only when the body is not valid JSON of the expected shape. A body
/// with no place pool, or no usable rows, yields an empty map.
pub fn parse_place_odds(body: &str) -> Result<PlaceOdds, FetchError> {
    let response: RaceOddsResponse =
        serde_json::from_str(body).map_err(|e| FetchError::ParseError(e.to_string()))?;

    Ok(extract_place_odds(&response))
}

/// Keep rows that carry a horse number and odds above zero.
/// Later rows for the same horse replace earlier ones.
pub fn extract_place_odds(response: &RaceOddsResponse) -> PlaceOdds {
    let entries = response
        .data
        .as_ref()
        .and_then(|d| d.place.as_ref())
        .map(|p| p.race_odds_list.as_slice())
        .unwrap_or_default();

    let mut odds = PlaceOdds::new();
    let mut skipped = 0usize;

    for entry in entries {
        let horse_no = entry.horse_no.as_ref().and_then(|h| h.as_positive_int());
        let value = entry.value.as_ref().and_then(|v| v.as_f64());

        let kept = match (horse_no, value) {
            (Some(h), Some(v)) => odds.insert(h, v),
            _ => false,
        };
        if !kept {
            skipped += 1;
        }
    }

    tracing::debug!(
        "Place odds: kept {} horses, skipped {} of {} rows",
        odds.len(),
        skipped,
        entries.len()
    );

    odds
}
