//! Dutching Stake Allocation
//!
//! Splits a total stake across several runners so that the return is the
//! same whichever selected runner lands the bet.
//!
//! For a selection with decimal odds o_1..o_n:
//!     S   = Σ 1/o_i            (inverse sum)
//!     s_i = T / (o_i * S)      (stake on runner i)
//!     R   = s_i * o_i = T / S  (return, identical for every i)
//!
//! Where:
//!     T = total stake
//!     S < 1 means the selection pays a profit whichever runner wins
//!
//! No rounding is applied here. Use [`round_currency`] when displaying.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::DutchingError;
use crate::models::{is_valid_odds, HorseNo, PlaceOdds, Selection};

/// Relative tolerance used when checking that returns are equal
pub const RETURN_TOLERANCE: f64 = 1e-9;

/// Stake and return for one selected horse
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub horse_no: HorseNo,
    pub odds: f64,
    pub stake: f64,
    pub potential_return: f64,
}

/// Result of a dutching computation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DutchingResult {
    pub total_stake: f64,
    pub inverse_sum: f64,
    /// Ordered by horse number
    pub allocations: Vec<Allocation>,
}

impl DutchingResult {
    pub fn get(&self, horse_no: HorseNo) -> Option<&Allocation> {
        self.allocations.iter().find(|a| a.horse_no == horse_no)
    }

    /// Sum of the individual stakes
    pub fn staked(&self) -> f64 {
        self.allocations.iter().map(|a| a.stake).sum()
    }

    /// Return paid whichever selected horse places.
    ///
    /// Fails with [`DutchingError::UnequalReturns`] if the per-horse returns
    /// disagree beyond [`RETURN_TOLERANCE`].
    pub fn guaranteed_return(&self) -> Result<f64, DutchingError> {
        let first = self
            .allocations
            .first()
            .map(|a| a.potential_return)
            .ok_or(DutchingError::EmptySelection)?;

        let (min, max) = self
            .allocations
            .iter()
            .map(|a| a.potential_return)
            .fold((first, first), |(lo, hi), r| (lo.min(r), hi.max(r)));

        if max - min > RETURN_TOLERANCE * max.abs().max(1.0) {
            return Err(DutchingError::UnequalReturns { min, max });
        }

        Ok(first)
    }

    /// Guaranteed return minus the total stake
    pub fn expected_profit(&self) -> Result<f64, DutchingError> {
        Ok(self.guaranteed_return()? - self.total_stake)
    }

    /// Profit as a fraction of the total stake (0 when nothing is staked)
    pub fn roi(&self) -> Result<f64, DutchingError> {
        let profit = self.expected_profit()?;
        if self.total_stake == 0.0 {
            return Ok(0.0);
        }
        Ok(profit / self.total_stake)
    }

    /// Inverse sum expressed as a percentage (book percentage of the selection)
    pub fn book_percentage(&self) -> f64 {
        self.inverse_sum * 100.0
    }
}

/// Dutch a total stake across `(horse, odds)` legs.
///
/// # Arguments
/// * `legs` - Selected horses with their decimal odds
/// * `total_stake` - Amount to distribute (>= 0)
///
/// # Returns
/// One allocation per leg, in the order given
///
/// # Examples
/// ```
/// use dutching::core::dutching::dutch_stakes;
/// let allocs = dutch_stakes(&[(1, 2.0), (2, 4.0)], 100.0).unwrap();
/// assert!((allocs[0].stake - 66.6667).abs() < 0.001);
/// assert!((allocs[1].stake - 33.3333).abs() < 0.001);
/// ```
pub fn dutch_stakes(
    legs: &[(HorseNo, f64)],
    total_stake: f64,
) -> Result<Vec<Allocation>, DutchingError> {
    allocate_legs(legs, total_stake).map(|(_, allocations)| allocations)
}

/// Validate the legs, then split the stake. Returns the inverse sum the
/// stakes were computed with alongside the allocations.
fn allocate_legs(
    legs: &[(HorseNo, f64)],
    total_stake: f64,
) -> Result<(f64, Vec<Allocation>), DutchingError> {
    if !total_stake.is_finite() || total_stake < 0.0 {
        return Err(DutchingError::InvalidStake(total_stake));
    }
    if legs.is_empty() {
        return Err(DutchingError::EmptySelection);
    }

    let mut seen = HashSet::with_capacity(legs.len());
    for &(horse_no, odds) in legs {
        if !seen.insert(horse_no) {
            return Err(DutchingError::DuplicateHorse(horse_no));
        }
        if !is_valid_odds(odds) {
            return Err(DutchingError::InvalidOdds { horse_no, odds });
        }
    }

    let inverse_sum = inverse_sum(legs.iter().map(|&(_, o)| o));

    // Individually finite reciprocals can still overflow when summed
    if !inverse_sum.is_finite() {
        let (horse_no, odds) = legs
            .iter()
            .copied()
            .fold(legs[0], |low, leg| if leg.1 < low.1 { leg } else { low });
        return Err(DutchingError::InvalidOdds { horse_no, odds });
    }

    let allocations = legs
        .iter()
        .map(|&(horse_no, odds)| {
            let stake = total_stake / (odds * inverse_sum);
            Allocation {
                horse_no,
                odds,
                stake,
                potential_return: stake * odds,
            }
        })
        .collect();

    Ok((inverse_sum, allocations))
}

/// Σ 1/odds
pub fn inverse_sum<I>(odds: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    odds.into_iter().map(|o| 1.0 / o).sum()
}

/// Compute the dutching allocation for `selection` against current `odds`.
///
/// Every selected horse must be present in `odds`; a horse missing from the
/// map fails the whole computation with no partial result.
pub fn compute_allocation(
    selection: &Selection,
    odds: &PlaceOdds,
    total_stake: f64,
) -> Result<DutchingResult, DutchingError> {
    if selection.is_empty() {
        return Err(DutchingError::EmptySelection);
    }

    let legs = selection
        .iter()
        .map(|horse_no| {
            odds.get(horse_no)
                .map(|o| (horse_no, o))
                .ok_or(DutchingError::UnknownHorse(horse_no))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let (inverse_sum, allocations) = allocate_legs(&legs, total_stake)?;

    Ok(DutchingResult {
        total_stake,
        inverse_sum,
        allocations,
    })
}

/// Round a currency amount to 2 decimal places for display
pub fn round_currency(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Dutching calculator holding the stake to distribute
#[derive(Debug, Clone)]
pub struct DutchingCalculator {
    pub total_stake: f64,
}

impl DutchingCalculator {
    /// Create a calculator for a non-negative total stake
    pub fn new(total_stake: f64) -> Result<Self, DutchingError> {
        if !total_stake.is_finite() || total_stake < 0.0 {
            return Err(DutchingError::InvalidStake(total_stake));
        }
        Ok(Self { total_stake })
    }

    /// Allocate the stake across `selection`
    pub fn allocate(
        &self,
        selection: &Selection,
        odds: &PlaceOdds,
    ) -> Result<DutchingResult, DutchingError> {
        compute_allocation(selection, odds, self.total_stake)
    }
}

impl Default for DutchingCalculator {
    fn default() -> Self {
        Self { total_stake: 100.0 }
    }
}
