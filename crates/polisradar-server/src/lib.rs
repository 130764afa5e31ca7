//! Aggregation, refresh scheduling and presentation for the polisen.se
//! events feed.
//!
//! One refresh cycle fetches each configured area concurrently, windows
//! and ranks the events, enriches the survivors from their detail pages
//! and publishes an atomic snapshot that the presentation adapters project
//! into per-area readings.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use polisradar_feed::{DetailEnricher, PolisenClient};
//! use polisradar_server::{Aggregator, RadarConfig, RefreshCoordinator};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = RadarConfig::new("Malmö / Eslöv");
//!     let client = PolisenClient::new();
//!     let enricher = Arc::new(DetailEnricher::new(client.clone()));
//!     let aggregator = Aggregator::new(config.clone(), Arc::new(client), enricher);
//!
//!     let coordinator = RefreshCoordinator::new(config.update_interval());
//!     let handle = coordinator.handle();
//!     tokio::spawn(coordinator.run(aggregator));
//!
//!     // handle.subscribe() yields every published snapshot...
//!     let _ = handle;
//! }
//! ```

pub mod aggregator;
pub mod config;
pub mod coordinator;
pub mod present;

pub use aggregator::{Aggregator, sort_ranked, trim_ranked};
pub use config::{
    ConfigError, DEFAULT_HOURS, DEFAULT_MAX_ITEMS, DEFAULT_UPDATE_INTERVAL_MINUTES, RadarConfig,
};
pub use coordinator::{
    CoordinatorCommand, CoordinatorHandle, CoordinatorState, RefreshCoordinator, RefreshPhase,
    SharedCoordinatorState,
};
pub use present::{AreaAdapter, AreaAttributes, AreaReading, CombinedAdapter};
