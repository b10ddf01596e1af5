//! Series (PGC) component
//!
//! Main episodes come first, followed by the true episodes of the side-story
//! sections. Section entries that merely link to a UGC video are left out.

use async_trait::async_trait;
use bilijean_providers::bilibili::types::{PgcUpInfo, PgcViewResponse, PlayQuery, PlayResponse};
use bilijean_providers::BilibiliInterface;

use super::{season_query, ComponentContext, StreamingComponent, ViewResponse};
use crate::streaming::constants::StreamingCategory;
use crate::streaming::error::Result;
use crate::streaming::locator::ResourceId;
use crate::streaming::negotiator::PlayRequest;
use crate::streaming::page::{ms_to_seconds, non_empty, CollectionMeta, Page, ViewMeta};

pub struct SeriesComponent;

struct Owner {
    id: Option<u64>,
    name: Option<String>,
    avatar_url: Option<String>,
}

impl From<Option<&PgcUpInfo>> for Owner {
    fn from(up: Option<&PgcUpInfo>) -> Self {
        Self {
            id: up.map(|u| u.mid),
            name: up.map(|u| u.uname.clone()),
            avatar_url: up.map(|u| u.avatar.clone()),
        }
    }
}

/// Normalize a series view payload.
///
/// Only an episode id selects a page; with none, the first main episode is selected.
#[must_use]
pub fn parse_view(resp: &PgcViewResponse, requested: Option<&ResourceId>) -> Option<Vec<Page>> {
    let result = resp.payload()?;
    let ep_id = requested.and_then(ResourceId::ep_id);
    let owner = Owner::from(result.up_info.as_ref());

    let collection = CollectionMeta {
        id: (result.series.series_id != 0).then_some(result.series.series_id),
        title: non_empty(&result.series.series_title),
        desc: None,
        cover_url: None,
        owner_id: owner.id,
        owner_name: owner.name.clone(),
        owner_avatar_url: owner.avatar_url.clone(),
        sect_id: Some(result.season_id),
        sect_title: Some(result.season_title.clone()),
    };

    let mut pages = Vec::with_capacity(result.episodes.len());
    for (idx, episode) in result.episodes.iter().enumerate() {
        let duration = ms_to_seconds(episode.duration);
        let is_selected = match ep_id {
            None => idx == 0,
            Some(id) => id == episode.ep_id,
        };
        pages.push(Page {
            category: StreamingCategory::Series,
            index: u32::try_from(idx + 1).unwrap_or(u32::MAX),
            cid: episode.cid,
            title: episode.title.clone(),
            duration,
            view: ViewMeta {
                aid: Some(episode.aid),
                bvid: non_empty(&episode.bvid),
                ep_id: Some(episode.ep_id),
                season_id: Some(result.season_id),
                title: Some(episode.long_title.clone()),
                desc: None,
                cover_url: Some(episode.cover.clone()),
                pub_time: Some(episode.pub_time),
                duration: Some(duration),
                owner_id: owner.id,
                owner_name: owner.name.clone(),
                owner_avatar_url: owner.avatar_url.clone(),
            },
            collection: collection.clone(),
            is_selected,
        });
    }

    for section in result.section.iter().flatten() {
        let extras = section.episodes.iter().filter(|e| !e.is_ugc_pointer());
        for (idx, episode) in extras.enumerate() {
            let duration = episode.duration.map(ms_to_seconds);
            pages.push(Page {
                category: StreamingCategory::Series,
                index: u32::try_from(idx + 1).unwrap_or(u32::MAX),
                cid: episode.cid,
                title: episode.title.clone(),
                duration: duration.unwrap_or_default(),
                view: ViewMeta {
                    aid: Some(episode.aid),
                    bvid: episode.bvid.as_deref().and_then(non_empty),
                    ep_id: Some(episode.ep_id),
                    season_id: Some(result.season_id),
                    title: episode.long_title.clone(),
                    desc: None,
                    cover_url: Some(episode.cover.clone()),
                    pub_time: Some(episode.pub_time),
                    duration,
                    owner_id: owner.id,
                    owner_name: owner.name.clone(),
                    owner_avatar_url: owner.avatar_url.clone(),
                },
                collection: collection.clone(),
                is_selected: ep_id == Some(episode.ep_id),
            });
        }
    }
    Some(pages)
}

#[async_trait]
impl StreamingComponent for SeriesComponent {
    fn category(&self) -> StreamingCategory {
        StreamingCategory::Series
    }

    async fn fetch_view(&self, api: &dyn BilibiliInterface, id: &ResourceId) -> Result<ViewResponse> {
        let resp = api.get_pgc_view(season_query(self.category(), id)?).await?;
        Ok(ViewResponse::Series(resp))
    }

    async fn normalize(
        &self,
        _ctx: &ComponentContext<'_>,
        view: &ViewResponse,
        requested: Option<&ResourceId>,
    ) -> Result<Option<Vec<Page>>> {
        match view {
            ViewResponse::Series(resp) => Ok(parse_view(resp, requested)),
            other => Err(other.mismatch(StreamingCategory::Series)),
        }
    }

    async fn fetch_play(&self, api: &dyn BilibiliInterface, request: &PlayRequest) -> Result<PlayResponse> {
        Ok(api.get_pgc_play(PlayQuery::from(request)).await?)
    }
}
