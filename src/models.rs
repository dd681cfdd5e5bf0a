use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Race number within a meeting card
pub type RaceNo = u32;

/// Horse (saddle cloth) number, unique within a race
pub type HorseNo = u32;

/// Place odds for a single race, keyed by horse number.
///
/// Every stored value is a finite decimal multiplier strictly greater than
/// zero. Entries that do not satisfy this are refused at insertion, so code
/// holding a `PlaceOdds` never has to re-check positivity.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PlaceOdds {
    odds: BTreeMap<HorseNo, f64>,
}

impl PlaceOdds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(horse, odds)` pairs, skipping invalid ones.
    /// A later pair for the same horse replaces an earlier one.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (HorseNo, f64)>,
    {
        let mut odds = Self::new();
        for (horse_no, value) in pairs {
            odds.insert(horse_no, value);
        }
        odds
    }

    /// Insert odds for a horse. Returns `false` (and leaves the map
    /// untouched) when the horse number is zero or the odds are not a
    /// positive finite number.
    pub fn insert(&mut self, horse_no: HorseNo, value: f64) -> bool {
        if horse_no == 0 || !is_valid_odds(value) {
            return false;
        }
        self.odds.insert(horse_no, value);
        true
    }

    pub fn get(&self, horse_no: HorseNo) -> Option<f64> {
        self.odds.get(&horse_no).copied()
    }

    pub fn contains(&self, horse_no: HorseNo) -> bool {
        self.odds.contains_key(&horse_no)
    }

    pub fn len(&self) -> usize {
        self.odds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.odds.is_empty()
    }

    /// Horse numbers in ascending order
    pub fn horses(&self) -> impl Iterator<Item = HorseNo> + '_ {
        self.odds.keys().copied()
    }

    /// `(horse, odds)` rows in ascending horse order
    pub fn iter(&self) -> impl Iterator<Item = (HorseNo, f64)> + '_ {
        self.odds.iter().map(|(&h, &o)| (h, o))
    }
}

/// Odds are usable only when strictly positive and finite, with a finite
/// reciprocal (tiny subnormal values overflow `1 / odds`)
pub fn is_valid_odds(value: f64) -> bool {
    value.is_finite() && value > 0.0 && value.recip().is_finite()
}

/// Horses chosen for a single dutching computation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Selection {
    horses: BTreeSet<HorseNo>,
}

impl Selection {
    pub fn new<I>(horses: I) -> Self
    where
        I: IntoIterator<Item = HorseNo>,
    {
        Self {
            horses: horses.into_iter().collect(),
        }
    }

    pub fn contains(&self, horse_no: HorseNo) -> bool {
        self.horses.contains(&horse_no)
    }

    pub fn len(&self) -> usize {
        self.horses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.horses.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = HorseNo> + '_ {
        self.horses.iter().copied()
    }

    /// Drop horses that no longer have odds in `odds`.
    ///
    /// Returns the removed horse numbers in ascending order.
    pub fn reconcile(&mut self, odds: &PlaceOdds) -> Vec<HorseNo> {
        let dropped: Vec<HorseNo> = self
            .horses
            .iter()
            .copied()
            .filter(|h| !odds.contains(*h))
            .collect();

        for horse_no in &dropped {
            self.horses.remove(horse_no);
        }

        dropped
    }
}

impl FromIterator<HorseNo> for Selection {
    fn from_iter<I: IntoIterator<Item = HorseNo>>(iter: I) -> Self {
        Self::new(iter)
    }
}

/// Place odds for one race as returned by a single fetch
#[derive(Debug, Clone, Serialize)]
pub struct OddsSnapshot {
    pub race_no: RaceNo,
    pub fetched_at: DateTime<Utc>,
    pub odds: PlaceOdds,
}
