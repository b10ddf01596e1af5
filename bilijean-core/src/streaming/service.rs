//! Streaming service
//!
//! Entry point for both flows: URL → pages (browsing) and
//! page → stream source (playback). Holds no mutable state.

use std::sync::Arc;
use std::time::Duration;

use bilijean_providers::bilibili::types::PlayResponse;
use bilijean_providers::{BilibiliClient, BilibiliInterface};
use tracing::{debug, info};

use super::components::{ComponentContext, ComponentRegistry, ViewResponse};
use super::constants::StreamingCategory;
use super::error::{Result, StreamingError};
use super::locator::{self, ResourceId, ResourceLocator};
use super::negotiator::{PlayRequest, SourcePreferences, StreamSource};
use super::page::Page;
use crate::config::BilibiliConfig;

pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(1);
pub const DEFAULT_ENRICHMENT_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Clone)]
pub struct StreamingService {
    api: Arc<dyn BilibiliInterface>,
    registry: ComponentRegistry,
    probe_timeout: Duration,
    enrichment_timeout: Duration,
}

impl StreamingService {
    /// Service over `api` with the standard component registry.
    #[must_use]
    pub fn new(api: Arc<dyn BilibiliInterface>) -> Self {
        Self {
            api,
            registry: ComponentRegistry::standard(),
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            enrichment_timeout: DEFAULT_ENRICHMENT_TIMEOUT,
        }
    }

    /// Service backed by an HTTP client built from configuration.
    #[must_use]
    pub fn from_config(config: &BilibiliConfig) -> Self {
        let client = BilibiliClient::new()
            .with_api_base(config.api_base.clone())
            .with_sess_data(config.sess_data.clone())
            .with_request_timeout(Duration::from_secs(config.request_timeout_seconds));
        info!(api_base = %config.api_base, logged_in = client.has_session(), "Streaming service configured");
        Self::new(Arc::new(client))
            .with_probe_timeout(Duration::from_secs(config.probe_timeout_seconds))
            .with_enrichment_timeout(Duration::from_secs(config.enrichment_timeout_seconds))
    }

    #[must_use]
    pub fn with_registry(mut self, registry: ComponentRegistry) -> Self {
        self.registry = registry;
        self
    }

    #[must_use]
    pub const fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn with_enrichment_timeout(mut self, timeout: Duration) -> Self {
        self.enrichment_timeout = timeout;
        self
    }

    #[must_use]
    pub fn api(&self) -> &Arc<dyn BilibiliInterface> {
        &self.api
    }

    #[must_use]
    pub const fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    /// Route a web URL to a category and identifier; `None` when no rule matches.
    pub async fn classify(&self, url: &str) -> Option<ResourceLocator> {
        locator::classify(self.api.as_ref(), url, self.probe_timeout).await
    }

    /// Normalize an already fetched view payload with `category`'s component.
    pub async fn normalize(
        &self,
        category: StreamingCategory,
        view: &ViewResponse,
        identifier: Option<&ResourceId>,
    ) -> Result<Option<Vec<Page>>> {
        let component = self.registry.get(category)?;
        let ctx = ComponentContext {
            api: self.api.as_ref(),
            enrichment_timeout: self.enrichment_timeout,
        };
        component.normalize(&ctx, view, identifier).await
    }

    /// Negotiate renditions from an already fetched play payload.
    pub fn negotiate(
        &self,
        category: StreamingCategory,
        play: &PlayResponse,
        request: &PlayRequest,
        prefs: &SourcePreferences,
    ) -> Result<StreamSource> {
        self.registry.get(category)?.negotiate(play, request, prefs)
    }

    /// Fetch and normalize the pages of a classified resource.
    ///
    /// `Ok(None)` when the platform reports the resource as missing.
    pub async fn get_pages(&self, locator: &ResourceLocator) -> Result<Option<Vec<Page>>> {
        let category = locator.category();
        let component = self.registry.get(category)?;
        let view = component.fetch_view(self.api.as_ref(), locator.id()).await?;
        let pages = self.normalize(category, &view, Some(locator.id())).await?;
        match &pages {
            Some(pages) => debug!(%category, id = ?locator.id(), count = pages.len(), "Pages normalized"),
            None => debug!(%category, id = ?locator.id(), "Resource not found"),
        }
        Ok(pages)
    }

    /// Validate `request`, fetch play data and negotiate renditions.
    pub async fn get_stream_source(
        &self,
        category: StreamingCategory,
        request: &PlayRequest,
        prefs: &SourcePreferences,
    ) -> Result<StreamSource> {
        let component = self.registry.get(category)?;
        component.validate_play_request(request)?;
        let play = component.fetch_play(self.api.as_ref(), request).await?;
        component.negotiate(&play, request, prefs)
    }

    /// Classify `url` and fetch its pages.
    ///
    /// An unmatched URL is `InvalidArgument`; a missing resource is `NotFound`.
    pub async fn pages_for_url(&self, url: &str) -> Result<(ResourceLocator, Vec<Page>)> {
        let Some(locator) = self.classify(url).await else {
            return Err(StreamingError::InvalidArgument(format!("unsupported URL: {url}")));
        };
        let pages = self
            .get_pages(&locator)
            .await?
            .ok_or(StreamingError::NotFound {
                category: locator.category(),
            })?;
        Ok((locator, pages))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streaming::testing::FakeApi;
    use serde_json::json;

    fn service(api: FakeApi) -> (Arc<FakeApi>, StreamingService) {
        let api = Arc::new(api);
        let service = StreamingService::new(api.clone());
        (api, service)
    }

    #[tokio::test]
    async fn test_classify_follows_redirect() {
        let (api, service) = service(FakeApi {
            location: Some("https://www.bilibili.com/bangumi/play/ep374717?from=video".to_string()),
            ..FakeApi::default()
        });
        let locator = service.classify("https://www.bilibili.com/video/BV1nx4y1o7Rz").await.unwrap();
        assert_eq!(locator.category(), StreamingCategory::Series);
        assert_eq!(locator.id(), &ResourceId::EpId(374_717));
        assert_eq!(api.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_classify_resolves_relative_location() {
        let (_, service) = service(FakeApi {
            location: Some("/cheese/play/ss27".to_string()),
            ..FakeApi::default()
        });
        let locator = service.classify("https://b23.tv/abc").await.unwrap();
        assert_eq!(locator.category(), StreamingCategory::Course);
    }

    #[tokio::test]
    async fn test_classify_survives_probe_failure() {
        let (_, service) = service(FakeApi {
            probe_fails: true,
            ..FakeApi::default()
        });
        let locator = service.classify("https://www.bilibili.com/video/av170001").await.unwrap();
        assert_eq!(locator.id(), &ResourceId::Aid(170_001));
        assert!(service.classify("https://www.bilibili.com/read/cv1").await.is_none());
    }

    #[tokio::test]
    async fn test_get_stream_source_rejects_missing_ids_before_io() {
        let (api, service) = service(FakeApi::default());
        let err = service
            .get_stream_source(StreamingCategory::Ugc, &PlayRequest::default(), &SourcePreferences::default())
            .await
            .unwrap_err();
        assert!(err.is_caller_error());
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_get_pages_not_found() {
        let (_, service) = service(FakeApi {
            pugv_view: Some(json!({"code": 404, "message": "not found", "data": null})),
            ..FakeApi::default()
        });
        let locator = ResourceLocator::new(StreamingCategory::Course, ResourceId::SeasonId(1)).unwrap();
        assert!(service.get_pages(&locator).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upstream_failure_propagates() {
        // no canned view: the fake fails like a refused connection
        let (_, service) = service(FakeApi::default());
        let locator = ResourceLocator::new(StreamingCategory::Series, ResourceId::EpId(1)).unwrap();
        let err = service.get_pages(&locator).await.unwrap_err();
        assert!(matches!(err, StreamingError::Upstream(_)));
        assert!(!err.is_caller_error());
    }

    #[test]
    fn test_from_config() {
        let config = BilibiliConfig {
            probe_timeout_seconds: 3,
            ..BilibiliConfig::default()
        };
        let service = StreamingService::from_config(&config);
        assert_eq!(service.probe_timeout, Duration::from_secs(3));
        assert_eq!(service.registry().categories().len(), 3);
    }
}
