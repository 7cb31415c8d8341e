pub mod area;
pub mod batch;
pub mod calculations;
pub mod drying_curve;
pub mod forecast_timeline;
pub mod pool;
pub mod rock_catalog;
pub mod status;

#[cfg(test)]
mod test_support;

pub use area::AreaAggregator;
pub use batch::{BatchCoordinator, BatchResult};
pub use forecast_timeline::ForecastTimelineBuilder;
pub use pool::{CancelSignal, WorkerPool};
pub use rock_catalog::RockTypeCatalog;
pub use status::DryingStatusCalculator;
