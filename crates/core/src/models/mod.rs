//! Domain models

pub mod blocklist;
pub mod custom_format;
pub mod delay_profile;
pub mod download_client;
pub mod event;
pub mod indexer;
pub mod library;
pub mod parsed;
pub mod quality;
pub mod queue;
pub mod release;

pub use blocklist::BlocklistItem;
pub use custom_format::{CustomFormat, FormatCondition, FormatSpecification};
pub use delay_profile::DelayProfile;
pub use download_client::{DownloadClientConfig, DownloadClientKind};
pub use event::{Event, EventFile, Sport};
pub use indexer::{failure_backoff, Indexer, IndexerProtocol, IndexerStatusRecord};
pub use library::{ImportHistory, RemotePathMapping, RootFolder};
pub use parsed::{EventType, ParsedRelease, Part, SessionType};
pub use quality::{
    Codec, FormatItem, QualityDefinition, QualityProfile, QualityProfileItem, QualitySelector,
    Resolution, Source, QUALITY_DEFINITIONS,
};
pub use queue::{
    grab_retry_backoff, DownloadQueueItem, QueueStatus, ReleaseSnapshot,
};
pub use release::{CachedRelease, ReleaseProtocol, ReleaseSearchResult};
