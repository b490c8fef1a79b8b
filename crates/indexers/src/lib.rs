//! Arenarr indexers
//!
//! Torznab and Newznab wire adapters, per-indexer rate limiting and health
//! tracking, and the search orchestrator that fans queries out across every
//! healthy indexer under a bounded semaphore.

pub mod rate_limit;
pub mod search;
pub mod status;
pub mod torznab;

pub use rate_limit::RequestPacer;
pub use search::{
    current_search_status, ActiveSearchStatus, SearchOrchestrator, SearchOrchestratorConfig,
};
pub use status::IndexerStatusTracker;
pub use torznab::{IndexerClient, TorznabClient};
