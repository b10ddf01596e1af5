// Bilijean Provider Clients
//
// Pure HTTP plumbing for the Bilibili web API: typed view/play/card/myinfo
// responses, the shared client error type and the resumable media downloader.
// The streaming core (bilijean-core) consumes these through `BilibiliInterface`.

// Shared error types
pub mod error;

// HTTP client and wire types
pub mod bilibili;

// Media download to disk
pub mod download;

// Re-export client types for convenience
pub use bilibili::{BilibiliClient, BilibiliInterface};
pub use download::PageDownloader;
pub use error::ProviderClientError;
