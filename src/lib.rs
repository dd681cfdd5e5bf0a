//! Place odds & dutching calculator
//!
//! This library provides:
//! - Live place odds fetching for a single race over HTTP
//! - Dutching stake allocation (equal return across selected horses)
//! - A refresh session that polls odds and keeps a selection in sync
//!
//! # Example
//!
//! ```
//! use dutching::core::dutching::compute_allocation;
//! use dutching::{PlaceOdds, Selection};
//!
//! let odds = PlaceOdds::from_pairs(vec![(1, 2.0), (2, 4.0)]);
//! let selection = Selection::new(vec![1, 2]);
//!
//! let result = compute_allocation(&selection, &odds, 100.0).unwrap();
//! println!("Profit if any selected horse places: {:.2}", result.expected_profit().unwrap());
//! ```

pub mod core;
pub mod error;
pub mod fetcher;
pub mod models;
pub mod refresh;

// Re-export commonly used types
pub use crate::core::{compute_allocation, DutchingCalculator, DutchingResult};
pub use error::{DutchingError, ValidationError};
pub use fetcher::{FetchError, FetcherConfig, OddsFetcher};
pub use models::{HorseNo, OddsSnapshot, PlaceOdds, RaceNo, Selection};
pub use refresh::{RefreshOutcome, RefreshSession};
