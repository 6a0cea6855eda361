//! # calibra-algo - skill calibration algorithms
//!
//! Pure Rust building blocks for the calibration engine. Nothing in here
//! touches storage or the network.
//!
//! ## Modules
//!
//! - [`rating`] - ELO-style rating model (expected score, bounded delta)
//! - [`selection`] - difficulty band and uniform candidate picking
//! - [`tier`] - display tier for a rating
//! - [`types`] - shared constants
//!
//! ## Example
//!
//! ```rust
//! use calibra_algo::rating::compute_delta;
//!
//! assert_eq!(compute_delta(200, 200, true), 16);
//! assert_eq!(compute_delta(1000, 1000, false), -16);
//! ```

pub mod rating;
pub mod selection;
pub mod tier;
pub mod types;

pub use rating::{compute_delta, expected_score, RatingUpdate};
pub use selection::{pick_candidate, Candidate, DifficultyBand, Pick, PickTier};
pub use tier::{calculate_tier, RatingTier};
pub use types::*;
