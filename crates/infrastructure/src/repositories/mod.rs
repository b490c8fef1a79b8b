//! PostgreSQL repository implementations

pub mod blocklist;
pub mod event;
pub mod history;
pub mod indexer;
pub mod profiles;
pub mod queue;
pub mod release_cache;
pub mod settings;

pub use blocklist::PostgresBlocklistRepository;
pub use event::{PostgresEventFileRepository, PostgresEventRepository};
pub use history::PostgresHistoryRepository;
pub use indexer::PostgresIndexerRepository;
pub use profiles::{
    PostgresCustomFormatRepository, PostgresDelayProfileRepository,
    PostgresQualityProfileRepository,
};
pub use queue::PostgresQueueRepository;
pub use release_cache::PostgresReleaseCacheRepository;
pub use settings::{PostgresDownloadClientRepository, PostgresMediaManagementRepository};
