//! Core business logic modules

pub mod dutching;

// Re-export commonly used types
pub use dutching::{
    compute_allocation, dutch_stakes, round_currency, Allocation, DutchingCalculator,
    DutchingResult,
};
