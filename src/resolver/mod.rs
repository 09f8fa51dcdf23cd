// Stream resolution: provider record -> one relayable audio stream + metadata

pub mod catalog;
pub mod errors;
pub mod extractors;
pub mod format_selector;
pub mod metadata;
pub mod models;
pub mod orchestrator;
pub mod record;
pub mod relay;
pub mod tools;
pub mod utils;

pub use catalog::FormatCatalog;
pub use errors::{ExtractError, ResolveError};
pub use format_selector::FormatSelector;
pub use metadata::MetadataProjector;
pub use models::{
    Candidate, Protocol, ResolutionResult, ResolvedStream, SelectionConstraints, SelectionSource,
    TrackMetadata,
};
pub use orchestrator::StreamResolver;
pub use relay::RelayServer;
