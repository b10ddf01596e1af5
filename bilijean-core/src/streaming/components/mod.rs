// Streaming Components
//
// One component per category. Each owns the mapping from its raw view payload
// to the shared `Page` shape and knows which play endpoint serves it.

pub mod pgc;
pub mod pugv;
pub mod ugc;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bilijean_providers::bilibili::types::{
    PgcViewResponse, PlayResponse, PugvViewResponse, SeasonQuery, UgcViewResponse,
};
use bilijean_providers::BilibiliInterface;

use super::constants::StreamingCategory;
use super::error::{Result, StreamingError};
use super::locator::ResourceId;
use super::negotiator::{self, PlayRequest, SourcePreferences, StreamSource};
use super::page::Page;

pub use pgc::SeriesComponent;
pub use pugv::CourseComponent;
pub use ugc::UgcComponent;

/// Raw view payload, one variant per category
#[derive(Debug, Clone)]
pub enum ViewResponse {
    Ugc(UgcViewResponse),
    Series(PgcViewResponse),
    Course(PugvViewResponse),
}

impl ViewResponse {
    #[must_use]
    pub const fn category(&self) -> StreamingCategory {
        match self {
            Self::Ugc(_) => StreamingCategory::Ugc,
            Self::Series(_) => StreamingCategory::Series,
            Self::Course(_) => StreamingCategory::Course,
        }
    }

    fn mismatch(&self, expected: StreamingCategory) -> StreamingError {
        StreamingError::CategoryMismatch {
            expected,
            actual: self.category(),
        }
    }
}

/// What a component may use while normalizing
#[derive(Clone, Copy)]
pub struct ComponentContext<'a> {
    pub api: &'a dyn BilibiliInterface,
    /// bound for the optional owner profile lookup
    pub enrichment_timeout: Duration,
}

/// Season query for series and course views; `ep_id` beats `season_id`.
fn season_query(category: StreamingCategory, id: &ResourceId) -> Result<SeasonQuery> {
    match id {
        ResourceId::EpId(ep_id) => Ok(SeasonQuery {
            ep_id: Some(*ep_id),
            season_id: None,
        }),
        ResourceId::SeasonId(season_id) => Ok(SeasonQuery {
            ep_id: None,
            season_id: Some(*season_id),
        }),
        other => Err(StreamingError::InvalidArgument(format!(
            "{other:?} cannot identify a {category} season"
        ))),
    }
}

/// Category-specific normalizer and negotiator
#[async_trait]
pub trait StreamingComponent: Send + Sync {
    fn category(&self) -> StreamingCategory;

    /// Fetch the raw view payload for `id`.
    async fn fetch_view(&self, api: &dyn BilibiliInterface, id: &ResourceId) -> Result<ViewResponse>;

    /// Turn a view payload into pages.
    ///
    /// `Ok(None)` means the platform reported the resource as missing.
    async fn normalize(
        &self,
        ctx: &ComponentContext<'_>,
        view: &ViewResponse,
        requested: Option<&ResourceId>,
    ) -> Result<Option<Vec<Page>>>;

    /// Fetch the raw play payload; `request` must already be valid.
    async fn fetch_play(&self, api: &dyn BilibiliInterface, request: &PlayRequest) -> Result<PlayResponse>;

    fn validate_play_request(&self, request: &PlayRequest) -> Result<()> {
        request.validate(self.category())
    }

    fn negotiate(
        &self,
        play: &PlayResponse,
        request: &PlayRequest,
        prefs: &SourcePreferences,
    ) -> Result<StreamSource> {
        self.validate_play_request(request)?;
        negotiator::negotiate(self.category(), play, prefs)
    }
}

/// Immutable category → component mapping
#[derive(Clone)]
pub struct ComponentRegistry {
    components: HashMap<StreamingCategory, Arc<dyn StreamingComponent>>,
}

impl ComponentRegistry {
    #[must_use]
    pub fn builder() -> ComponentRegistryBuilder {
        ComponentRegistryBuilder::default()
    }

    /// Registry holding the UGC, series and course components
    #[must_use]
    pub fn standard() -> Self {
        let components: [Arc<dyn StreamingComponent>; 3] = [
            Arc::new(UgcComponent),
            Arc::new(SeriesComponent),
            Arc::new(CourseComponent),
        ];
        Self {
            components: components.into_iter().map(|c| (c.category(), c)).collect(),
        }
    }

    pub fn get(&self, category: StreamingCategory) -> Result<&dyn StreamingComponent> {
        self.components
            .get(&category)
            .map(Arc::as_ref)
            .ok_or(StreamingError::UnregisteredCategory(category))
    }

    /// Registered categories in a stable order
    #[must_use]
    pub fn categories(&self) -> Vec<StreamingCategory> {
        let mut categories: Vec<_> = self.components.keys().copied().collect();
        categories.sort_unstable();
        categories
    }
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

/// Collects components before the registry is frozen
#[derive(Default)]
pub struct ComponentRegistryBuilder {
    components: HashMap<StreamingCategory, Arc<dyn StreamingComponent>>,
}

impl ComponentRegistryBuilder {
    /// Add a component; a second component for the same category is rejected.
    pub fn register(mut self, component: Arc<dyn StreamingComponent>) -> Result<Self> {
        let category = component.category();
        if self.components.contains_key(&category) {
            return Err(StreamingError::InvalidArgument(format!(
                "a component for {category} is already registered"
            )));
        }
        self.components.insert(category, component);
        Ok(self)
    }

    #[must_use]
    pub fn build(self) -> ComponentRegistry {
        ComponentRegistry {
            components: self.components,
        }
    }
}
