//! UGC (user uploaded video) component
//!
//! A video carries its own segments and, optionally, a season grouping that
//! lists sibling videos. With a displayed season the whole season is walked;
//! the requested video's own segments are recognised by cid.

use async_trait::async_trait;
use bilijean_providers::bilibili::types::{
    PlayQuery, PlayResponse, UgcSeasonEpisode, UgcViewData, UgcViewQuery, UgcViewResponse,
};
use bilijean_providers::BilibiliInterface;
use indexmap::IndexMap;
use tracing::{debug, warn};

use super::{ComponentContext, StreamingComponent, ViewResponse};
use crate::streaming::constants::StreamingCategory;
use crate::streaming::error::{Result, StreamingError};
use crate::streaming::locator::ResourceId;
use crate::streaming::negotiator::PlayRequest;
use crate::streaming::page::{non_empty, CollectionMeta, Page, ViewMeta};

/// Public profile of a season owner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerProfile {
    pub name: String,
    pub avatar_url: String,
}

pub struct UgcComponent;

fn ugc_query(id: &ResourceId) -> Result<UgcViewQuery> {
    match id {
        ResourceId::Bvid(bvid) => Ok(UgcViewQuery {
            bvid: Some(bvid.clone()),
            aid: None,
        }),
        ResourceId::Aid(aid) => Ok(UgcViewQuery {
            bvid: None,
            aid: Some(*aid),
        }),
        other => Err(StreamingError::InvalidArgument(format!("{other:?} cannot identify a ugc video"))),
    }
}

/// Whether `requested` names this video. No identifier selects it by default.
fn is_requested(data: &UgcViewData, requested: Option<&ResourceId>) -> bool {
    match requested {
        None => true,
        Some(ResourceId::Bvid(bvid)) => *bvid == data.bvid,
        Some(ResourceId::Aid(aid)) => *aid == data.aid,
        Some(_) => false,
    }
}

fn own_view(data: &UgcViewData) -> ViewMeta {
    ViewMeta {
        aid: Some(data.aid),
        bvid: Some(data.bvid.clone()),
        title: Some(data.title.clone()),
        desc: Some(data.desc.clone()),
        cover_url: Some(data.pic.clone()),
        pub_time: Some(data.pubdate),
        duration: Some(data.duration),
        owner_id: Some(data.owner.mid),
        owner_name: Some(data.owner.name.clone()),
        owner_avatar_url: Some(data.owner.face.clone()),
        ..ViewMeta::default()
    }
}

/// Sibling videos keep their archive metadata; their owner is unknown.
fn sibling_view(episode: &UgcSeasonEpisode) -> ViewMeta {
    ViewMeta {
        aid: Some(episode.aid),
        bvid: Some(episode.bvid.clone()),
        title: Some(episode.arc.title.clone()),
        desc: Some(episode.arc.desc.clone()),
        cover_url: Some(episode.arc.pic.clone()),
        pub_time: Some(episode.arc.pubdate),
        duration: Some(episode.arc.duration),
        ..ViewMeta::default()
    }
}

/// Normalize a UGC view payload.
///
/// `season_owner` fills the collection owner name and avatar when the season
/// owner lookup succeeded.
#[must_use]
pub fn parse_view(
    resp: &UgcViewResponse,
    requested: Option<&ResourceId>,
    season_owner: Option<&OwnerProfile>,
) -> Option<Vec<Page>> {
    let data = resp.payload()?;
    let selected = is_requested(data, requested);

    let mut own: IndexMap<u64, Page> = IndexMap::with_capacity(data.pages.len());
    for page in &data.pages {
        own.insert(
            page.cid,
            Page {
                category: StreamingCategory::Ugc,
                index: page.page,
                cid: page.cid,
                title: page.part.clone(),
                duration: page.duration,
                view: own_view(data),
                collection: CollectionMeta::default(),
                is_selected: selected,
            },
        );
    }

    let Some(season) = data.displayed_season() else {
        return Some(own.into_values().collect());
    };

    let mut pages = Vec::new();
    for section in &season.sections {
        let collection = CollectionMeta {
            id: Some(season.id),
            title: Some(season.title.clone()),
            desc: non_empty(&season.intro),
            cover_url: non_empty(&season.cover),
            owner_id: Some(season.mid),
            owner_name: season_owner.map(|o| o.name.clone()),
            owner_avatar_url: season_owner.map(|o| o.avatar_url.clone()),
            sect_id: Some(section.id),
            sect_title: Some(section.title.clone()),
        };
        for episode in &section.episodes {
            for page in &episode.pages {
                let (view, is_selected) = match own.get(&page.cid) {
                    Some(own_page) => (own_page.view.clone(), own_page.is_selected),
                    None => (sibling_view(episode), false),
                };
                pages.push(Page {
                    category: StreamingCategory::Ugc,
                    index: page.page,
                    cid: page.cid,
                    title: page.part.clone(),
                    duration: page.duration,
                    view,
                    collection: collection.clone(),
                    is_selected,
                });
            }
        }
    }
    debug!(season_id = season.id, pages = pages.len(), "UGC season expanded");
    Some(pages)
}

/// Best-effort lookup of the season owner's card, bounded by the context timeout.
async fn lookup_owner(ctx: &ComponentContext<'_>, mid: u64) -> Option<OwnerProfile> {
    let lookup = ctx.api.get_card(mid, ctx.enrichment_timeout);
    match tokio::time::timeout(ctx.enrichment_timeout, lookup).await {
        Ok(Ok(resp)) => match resp.payload() {
            Some(data) => Some(OwnerProfile {
                name: data.card.name.clone(),
                avatar_url: data.card.face.clone(),
            }),
            None => {
                warn!(mid, code = resp.code, message = %resp.message, "Season owner card unavailable");
                None
            }
        },
        Ok(Err(e)) => {
            warn!(mid, error = %e, "Season owner lookup failed");
            None
        }
        Err(_) => {
            warn!(mid, timeout = ?ctx.enrichment_timeout, "Season owner lookup timed out");
            None
        }
    }
}

#[async_trait]
impl StreamingComponent for UgcComponent {
    fn category(&self) -> StreamingCategory {
        StreamingCategory::Ugc
    }

    async fn fetch_view(&self, api: &dyn BilibiliInterface, id: &ResourceId) -> Result<ViewResponse> {
        let resp = api.get_ugc_view(ugc_query(id)?).await?;
        Ok(ViewResponse::Ugc(resp))
    }

    async fn normalize(
        &self,
        ctx: &ComponentContext<'_>,
        view: &ViewResponse,
        requested: Option<&ResourceId>,
    ) -> Result<Option<Vec<Page>>> {
        let ViewResponse::Ugc(resp) = view else {
            return Err(view.mismatch(StreamingCategory::Ugc));
        };
        let owner = match resp.payload().and_then(UgcViewData::displayed_season) {
            Some(season) => lookup_owner(ctx, season.mid).await,
            None => None,
        };
        Ok(parse_view(resp, requested, owner.as_ref()))
    }

    async fn fetch_play(&self, api: &dyn BilibiliInterface, request: &PlayRequest) -> Result<PlayResponse> {
        Ok(api.get_ugc_play(PlayQuery::from(request)).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streaming::testing::FakeApi;
    use serde_json::{json, Value};
    use std::time::Duration;

    fn page(cid: u64, index: u32, part: &str) -> Value {
        json!({"cid": cid, "page": index, "part": part, "duration": 100 + cid})
    }

    fn episode(aid: u64, bvid: &str, pages: Vec<Value>) -> Value {
        json!({
            "id": aid * 10,
            "aid": aid,
            "bvid": bvid,
            "cid": pages[0]["cid"],
            "title": format!("episode {aid}"),
            "arc": {
                "aid": aid,
                "title": format!("arc {aid}"),
                "desc": "arc desc",
                "pic": format!("https://i0.hdslb.com/{aid}.jpg"),
                "pubdate": 1_700_000_000,
                "duration": 300
            },
            "pages": pages
        })
    }

    fn view(season: Option<Value>) -> UgcViewResponse {
        serde_json::from_value(json!({
            "code": 0,
            "message": "0",
            "ttl": 1,
            "data": {
                "aid": 2,
                "bvid": "BV1xx411c7mD",
                "title": "own video",
                "desc": "own desc",
                "pic": "https://i0.hdslb.com/own.jpg",
                "pubdate": 1_600_000_000,
                "duration": 303,
                "owner": {"mid": 7, "name": "owner", "face": "https://i0.hdslb.com/face.jpg"},
                "pages": [page(11, 1, "P1"), page(12, 2, "P2"), page(13, 3, "P3")],
                "is_season_display": season.is_some(),
                "ugc_season": season
            }
        }))
        .unwrap()
    }

    fn season() -> Value {
        json!({
            "id": 500,
            "title": "season",
            "intro": "",
            "cover": "https://i0.hdslb.com/season.jpg",
            "mid": 99,
            "sections": [{
                "id": 600,
                "season_id": 500,
                "title": "正片",
                "episodes": [
                    episode(1, "BV1aa411c7mD", vec![page(21, 1, "sibling")]),
                    episode(2, "BV1xx411c7mD", vec![page(11, 1, "P1"), page(12, 2, "P2"), page(13, 3, "P3")]),
                ]
            }]
        })
    }

    #[test]
    fn test_plain_video_pages_all_selected() {
        let pages = parse_view(&view(None), None, None).unwrap();
        assert_eq!(pages.len(), 3);
        assert!(pages.iter().all(|p| p.is_selected));
        assert!(pages.iter().all(|p| p.collection.is_empty()));
        assert_eq!(pages[1].index, 2);
        assert_eq!(pages[1].title, "P2");
        assert_eq!(pages[1].view.owner_name.as_deref(), Some("owner"));
    }

    #[test]
    fn test_season_expands_to_siblings() {
        let owner = OwnerProfile {
            name: "season owner".to_string(),
            avatar_url: "https://i0.hdslb.com/owner.jpg".to_string(),
        };
        let pages = parse_view(&view(Some(season())), None, Some(&owner)).unwrap();
        assert_eq!(pages.len(), 4);

        let sibling = &pages[0];
        assert!(!sibling.is_selected);
        assert_eq!(sibling.view.aid, Some(1));
        assert_eq!(sibling.view.title.as_deref(), Some("arc 1"));
        assert!(sibling.view.owner_id.is_none());
        assert!(sibling.view.owner_name.is_none());

        for own in &pages[1..] {
            assert!(own.is_selected);
            assert_eq!(own.view.title.as_deref(), Some("own video"));
            assert_eq!(own.view.owner_id, Some(7));
            assert_eq!(own.collection.id, Some(500));
            assert_eq!(own.collection.sect_id, Some(600));
            assert_eq!(own.collection.owner_id, Some(99));
            assert_eq!(own.collection.owner_name.as_deref(), Some("season owner"));
            assert!(own.collection.desc.is_none());
        }
    }

    #[test]
    fn test_explicit_identifier() {
        let resp = view(None);
        let by_bvid = parse_view(&resp, Some(&ResourceId::Bvid("BV1xx411c7mD".to_string())), None).unwrap();
        assert!(by_bvid.iter().all(|p| p.is_selected));

        let by_aid = parse_view(&resp, Some(&ResourceId::Aid(2)), None).unwrap();
        assert!(by_aid.iter().all(|p| p.is_selected));

        let other = parse_view(&resp, Some(&ResourceId::Aid(3)), None).unwrap();
        assert_eq!(other.len(), 3);
        assert!(other.iter().all(|p| !p.is_selected));
    }

    #[test]
    fn test_not_found() {
        let resp: UgcViewResponse =
            serde_json::from_value(json!({"code": -404, "message": "啥都木有", "ttl": 1, "data": null})).unwrap();
        assert!(parse_view(&resp, None, None).is_none());
    }

    #[test]
    fn test_idempotent() {
        let resp = view(Some(season()));
        assert_eq!(parse_view(&resp, None, None), parse_view(&resp, None, None));
    }

    #[tokio::test]
    async fn test_normalize_enriches_season_owner() {
        let api = FakeApi {
            card: Some(json!({
                "code": 0,
                "message": "0",
                "data": {"card": {"mid": "99", "name": "season owner", "face": "https://i0.hdslb.com/99.jpg"}}
            })),
            ..FakeApi::default()
        };
        let ctx = ComponentContext {
            api: &api,
            enrichment_timeout: Duration::from_secs(2),
        };
        let pages = UgcComponent
            .normalize(&ctx, &ViewResponse::Ugc(view(Some(season()))), None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(api.calls(), vec!["card 99".to_string()]);
        assert!(pages
            .iter()
            .all(|p| p.collection.owner_avatar_url.as_deref() == Some("https://i0.hdslb.com/99.jpg")));
    }

    #[tokio::test]
    async fn test_normalize_without_season_skips_lookup() {
        let api = FakeApi::default();
        let ctx = ComponentContext {
            api: &api,
            enrichment_timeout: Duration::from_secs(2),
        };
        let pages = UgcComponent
            .normalize(&ctx, &ViewResponse::Ugc(view(None)), None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(pages.len(), 3);
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_owner_lookup_failure_is_swallowed() {
        // no canned card: the fake fails like a refused connection
        let api = FakeApi::default();
        let ctx = ComponentContext {
            api: &api,
            enrichment_timeout: Duration::from_secs(2),
        };
        let pages = UgcComponent
            .normalize(&ctx, &ViewResponse::Ugc(view(Some(season()))), None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(pages.len(), 4);
        assert!(pages.iter().all(|p| p.collection.owner_name.is_none()));
        assert!(pages.iter().all(|p| p.collection.owner_avatar_url.is_none()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_owner_lookup_timeout_is_swallowed() {
        let api = FakeApi {
            card: Some(json!({
                "code": 0,
                "message": "0",
                "data": {"card": {"mid": "99", "name": "late", "face": ""}}
            })),
            card_delay: Some(Duration::from_secs(30)),
            ..FakeApi::default()
        };
        let ctx = ComponentContext {
            api: &api,
            enrichment_timeout: Duration::from_secs(1),
        };
        let pages = UgcComponent
            .normalize(&ctx, &ViewResponse::Ugc(view(Some(season()))), None)
            .await
            .unwrap()
            .unwrap();
        assert!(pages.iter().all(|p| p.collection.owner_name.is_none()));
    }

    #[tokio::test]
    async fn test_wrong_variant_is_mismatch() {
        let api = FakeApi::default();
        let ctx = ComponentContext {
            api: &api,
            enrichment_timeout: Duration::from_secs(1),
        };
        let course: bilijean_providers::bilibili::types::PugvViewResponse =
            serde_json::from_value(json!({"code": -404, "message": "", "data": null})).unwrap();
        let err = UgcComponent
            .normalize(&ctx, &ViewResponse::Course(course), None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StreamingError::CategoryMismatch {
                expected: StreamingCategory::Ugc,
                actual: StreamingCategory::Course
            }
        ));
    }

    #[test]
    fn test_ugc_query() {
        assert_eq!(ugc_query(&ResourceId::Aid(2)).unwrap().aid, Some(2));
        assert!(ugc_query(&ResourceId::EpId(2)).is_err());
    }
}
