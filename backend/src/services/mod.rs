//! Business logic services for the Roast Tracker engine

pub mod catalog;
pub mod lot;
pub mod market;
pub mod production;
pub mod roast;
pub mod roast_import;
pub mod traceability;

pub use catalog::CatalogService;
pub use lot::LotSequencer;
pub use market::MarketService;
pub use production::ProductionService;
pub use roast::RoastService;
pub use roast_import::RoastImportService;
pub use traceability::TraceabilityService;
