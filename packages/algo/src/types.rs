//! Common Constants
//!
//! Values shared by the rating model, the selection policy and the service.

/// Rating given to a learner on first contact with a skill unit
pub const INITIAL_RATING: i32 = 200;

/// Half-width of the selection band around the learner's rating
pub const BAND_RADIUS: i32 = 200;

/// Step size of a single rating update
pub const K_FACTOR: f64 = 32.0;

/// Logistic scale; a gap of this many points means 10:1 odds
pub const LOGISTIC_SCALE: f64 = 400.0;
