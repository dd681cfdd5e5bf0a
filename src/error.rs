use thiserror::Error;

use crate::models::{HorseNo, RaceNo};

/// Races on a card run from 1 up to this number
pub const MAX_RACE_NO: RaceNo = 12;

/// Dutching calculation errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DutchingError {
    #[error("Invalid selection: no horses selected")]
    EmptySelection,

    #[error("Invalid selection: horse {0} has no current odds")]
    UnknownHorse(HorseNo),

    #[error("Invalid selection: horse {0} selected more than once")]
    DuplicateHorse(HorseNo),

    #[error("Invalid selection: horse {horse_no} has unusable odds {odds}")]
    InvalidOdds { horse_no: HorseNo, odds: f64 },

    #[error("Total stake must be a non-negative number, got {0}")]
    InvalidStake(f64),

    #[error("Potential returns differ across selection: {min} vs {max}")]
    UnequalReturns { min: f64, max: f64 },
}

impl DutchingError {
    /// True for errors caused by a selection that does not match the odds
    pub fn is_invalid_selection(&self) -> bool {
        matches!(
            self,
            DutchingError::EmptySelection
                | DutchingError::UnknownHorse(_)
                | DutchingError::DuplicateHorse(_)
                | DutchingError::InvalidOdds { .. }
        )
    }
}

/// Caller input errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Race number must be between 1 and {max}, got {value}")]
    RaceNo { value: RaceNo, max: RaceNo },

    #[error("Stake must be a non-negative number, got {0}")]
    Stake(f64),

    #[error("Refresh interval must be at least 1 second, got {0}")]
    RefreshInterval(u64),

    #[error("Refresh period must be non-zero")]
    ZeroRefreshPeriod,

    #[error("Request timeout must be at least 1 second, got {0}")]
    Timeout(u64),
}

/// Validation functions
pub fn validate_race_no(race_no: RaceNo) -> Result<(), ValidationError> {
    if !(1..=MAX_RACE_NO).contains(&race_no) {
        return Err(ValidationError::RaceNo {
            value: race_no,
            max: MAX_RACE_NO,
        });
    }
    Ok(())
}

pub fn validate_stake(stake: f64) -> Result<(), ValidationError> {
    if !stake.is_finite() || stake < 0.0 {
        return Err(ValidationError::Stake(stake));
    }
    Ok(())
}

pub fn validate_refresh_interval(secs: u64) -> Result<(), ValidationError> {
    if secs == 0 {
        return Err(ValidationError::RefreshInterval(secs));
    }
    Ok(())
}

pub fn validate_timeout(secs: u64) -> Result<(), ValidationError> {
    if secs == 0 {
        return Err(ValidationError::Timeout(secs));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_race_no_valid() {
        for race_no in 1..=12 {
            assert!(validate_race_no(race_no).is_ok());
        }
    }

    #[test]
    fn test_validate_race_no_invalid() {
        assert!(validate_race_no(0).is_err());
        assert!(validate_race_no(13).is_err());
    }

    #[test]
    fn test_validate_stake() {
        assert!(validate_stake(0.0).is_ok());
        assert!(validate_stake(100.0).is_ok());
        assert!(validate_stake(-0.01).is_err());
        assert!(validate_stake(f64::NAN).is_err());
        assert!(validate_stake(f64::INFINITY).is_err());
    }

    #[test]
    fn test_validate_refresh_interval() {
        assert!(validate_refresh_interval(15).is_ok());
        assert!(validate_refresh_interval(0).is_err());
    }

    #[test]
    fn test_validate_timeout() {
        assert!(validate_timeout(5).is_ok());
        assert_eq!(validate_timeout(0), Err(ValidationError::Timeout(0)));
    }

    #[test]
    fn test_invalid_selection_classification() {
        assert!(DutchingError::EmptySelection.is_invalid_selection());
        assert!(DutchingError::UnknownHorse(4).is_invalid_selection());
        assert!(DutchingError::InvalidOdds {
            horse_no: 2,
            odds: 0.0
        }
        .is_invalid_selection());
        assert!(!DutchingError::InvalidStake(-1.0).is_invalid_selection());
    }

    #[test]
    fn test_error_display() {
        let err = DutchingError::UnknownHorse(7);
        assert!(err.to_string().contains("horse 7"));

        let err = ValidationError::RaceNo { value: 14, max: 12 };
        assert_eq!(err.to_string(), "Race number must be between 1 and 12, got 14");
    }
}
