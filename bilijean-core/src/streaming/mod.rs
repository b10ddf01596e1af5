//! Streaming resolution
//!
//! Browsing flow: URL → [`ResourceLocator`] → normalized [`Page`]s.
//! Playback flow: [`Page`] → [`PlayRequest`] → negotiated [`StreamSource`].

pub mod components;
pub mod constants;
pub mod error;
pub mod locator;
pub mod negotiator;
pub mod page;
pub mod service;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use components::{ComponentContext, ComponentRegistry, StreamingComponent, ViewResponse};
pub use constants::{AudioBitRateId, StreamingCategory, VideoCodecId};
pub use error::{Result, StreamingError};
pub use locator::{match_url, ResourceId, ResourceLocator};
pub use negotiator::{negotiate, AudioSourceMeta, PlayRequest, SourcePreferences, StreamSource, VideoSourceMeta};
pub use page::{CollectionMeta, Page, ViewMeta};
pub use service::StreamingService;
