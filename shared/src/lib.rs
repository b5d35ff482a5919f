//! Shared domain vocabulary for the Roast Tracker engine
//!
//! This crate contains the lot-code vocabulary and pure validation helpers
//! shared between the backend and other components of the system. No I/O,
//! no database.

pub mod lot;
pub mod validation;

pub use lot::*;
pub use validation::*;
