//! HTTP handlers for the Roast Tracker engine

pub mod catalog;
pub mod health;
pub mod market;
pub mod production;
pub mod roast;
pub mod roast_import;
pub mod traceability;

pub use catalog::*;
pub use health::*;
pub use market::*;
pub use production::*;
pub use roast::*;
pub use roast_import::*;
pub use traceability::*;
