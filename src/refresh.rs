//! Periodic odds refresh for a single session
//!
//! A session owns the race being watched, the last odds snapshot and the
//! active selection. Refreshes are awaited one at a time, so a session never
//! has two requests in flight.

use std::ops::ControlFlow;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

use crate::core::dutching::{compute_allocation, DutchingResult};
use crate::error::{DutchingError, ValidationError};
use crate::fetcher::{FetchError, OddsFetcher};
use crate::models::{HorseNo, OddsSnapshot, RaceNo, Selection};

/// Default auto-refresh interval
pub const DEFAULT_REFRESH_SECS: u64 = 15;

/// What a single refresh produced
#[derive(Debug)]
pub enum RefreshOutcome {
    /// New odds are available. `dropped` lists selected horses that lost
    /// their odds and were removed from the selection.
    Updated { dropped: Vec<HorseNo> },
    /// The request succeeded but carried no usable odds
    Empty,
    /// The request failed
    Failed(FetchError),
}

impl RefreshOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, RefreshOutcome::Failed(_))
    }

    /// Forget the dropped horses once they have been reported
    pub fn clear_dropped(&mut self) {
        if let RefreshOutcome::Updated { dropped } = self {
            dropped.clear();
        }
    }
}

/// Odds refresh state for one user session
pub struct RefreshSession {
    fetcher: OddsFetcher,
    race_no: RaceNo,
    snapshot: Option<OddsSnapshot>,
    selection: Selection,
}

impl RefreshSession {
    pub fn new(fetcher: OddsFetcher, race_no: RaceNo) -> Self {
        Self {
            fetcher,
            race_no,
            snapshot: None,
            selection: Selection::default(),
        }
    }

    #[must_use]
    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.selection = selection;
        self
    }

    pub fn race_no(&self) -> RaceNo {
        self.race_no
    }

    /// Odds from the last successful, non-empty refresh
    pub fn snapshot(&self) -> Option<&OddsSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Switch to another race. Odds and selection belong to a race, so both
    /// are cleared.
    pub fn set_race(&mut self, race_no: RaceNo) {
        if race_no != self.race_no {
            self.race_no = race_no;
            self.snapshot = None;
            self.selection = Selection::default();
        }
    }

    /// Replace the selection, keeping only horses priced in the current
    /// snapshot (if any). Returns the horses that were left out.
    pub fn set_selection(&mut self, mut selection: Selection) -> Vec<HorseNo> {
        let dropped = match &self.snapshot {
            Some(snapshot) => selection.reconcile(&snapshot.odds),
            None => Vec::new(),
        };
        self.selection = selection;
        dropped
    }

    /// Fetch fresh odds for the current race.
    ///
    /// The previous snapshot is always discarded; on failure or empty odds
    /// the session has no odds until the next successful refresh.
    pub async fn refresh(&mut self) -> RefreshOutcome {
        self.snapshot = None;

        match self.fetcher.fetch_snapshot(self.race_no).await {
            Ok(snapshot) if snapshot.odds.is_empty() => RefreshOutcome::Empty,
            Ok(snapshot) => {
                let dropped = self.selection.reconcile(&snapshot.odds);
                if !dropped.is_empty() {
                    tracing::info!("Dropped horses without odds from selection: {:?}", dropped);
                }
                self.snapshot = Some(snapshot);
                RefreshOutcome::Updated { dropped }
            }
            Err(e) => {
                tracing::warn!("Odds refresh for race {} failed: {}", self.race_no, e);
                RefreshOutcome::Failed(e)
            }
        }
    }

    /// Dutch `total_stake` across the current selection.
    ///
    /// `None` when there are no odds or nothing is selected.
    pub fn allocate(&self, total_stake: f64) -> Option<Result<DutchingResult, DutchingError>> {
        let snapshot = self.snapshot.as_ref()?;
        if self.selection.is_empty() {
            return None;
        }
        Some(compute_allocation(&self.selection, &snapshot.odds, total_stake))
    }

    /// Refresh every `interval` until `on_tick` breaks.
    ///
    /// The first refresh happens immediately. Each refresh completes before
    /// the next tick is awaited, and ticks missed during a slow request are
    /// delayed rather than fired back to back.
    ///
    /// Fails without fetching when `interval` is zero.
    pub async fn run<F>(
        &mut self,
        interval: Duration,
        mut on_tick: F,
    ) -> Result<(), ValidationError>
    where
        F: FnMut(&RefreshSession, &RefreshOutcome) -> ControlFlow<()>,
    {
        if interval.is_zero() {
            return Err(ValidationError::ZeroRefreshPeriod);
        }

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let outcome = self.refresh().await;
            if on_tick(&*self, &outcome).is_break() {
                return Ok(());
            }
        }
    }
}
