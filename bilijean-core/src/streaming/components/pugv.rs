//! Course (PUGV) component

use async_trait::async_trait;
use bilijean_providers::bilibili::types::{PlayQuery, PlayResponse, PugvViewResponse};
use bilijean_providers::BilibiliInterface;

use super::{season_query, ComponentContext, StreamingComponent, ViewResponse};
use crate::streaming::constants::StreamingCategory;
use crate::streaming::error::Result;
use crate::streaming::locator::ResourceId;
use crate::streaming::negotiator::PlayRequest;
use crate::streaming::page::{non_empty, CollectionMeta, Page, ViewMeta};

pub struct CourseComponent;

/// Normalize a course view payload: one page per episode.
#[must_use]
pub fn parse_view(resp: &PugvViewResponse, requested: Option<&ResourceId>) -> Option<Vec<Page>> {
    let data = resp.payload()?;
    let ep_id = requested.and_then(ResourceId::ep_id);
    let up = &data.up_info;

    let collection = CollectionMeta {
        id: Some(data.season_id),
        title: Some(data.title.clone()),
        desc: non_empty(&data.subtitle),
        cover_url: non_empty(&data.cover),
        owner_id: Some(up.mid),
        owner_name: Some(up.uname.clone()),
        owner_avatar_url: Some(up.avatar.clone()),
        sect_id: None,
        sect_title: None,
    };

    let pages = data
        .episodes
        .iter()
        .enumerate()
        .map(|(idx, episode)| Page {
            category: StreamingCategory::Course,
            index: u32::try_from(idx + 1).unwrap_or(u32::MAX),
            cid: episode.cid,
            title: episode.title.clone(),
            duration: episode.duration,
            view: ViewMeta {
                aid: Some(episode.aid),
                bvid: None,
                ep_id: Some(episode.id),
                season_id: Some(data.season_id),
                title: Some(episode.title.clone()),
                desc: None,
                cover_url: Some(episode.cover.clone()),
                pub_time: Some(episode.release_date),
                duration: Some(episode.duration),
                owner_id: Some(up.mid),
                owner_name: Some(up.uname.clone()),
                owner_avatar_url: Some(up.avatar.clone()),
            },
            collection: collection.clone(),
            is_selected: match ep_id {
                None => idx == 0,
                Some(id) => id == episode.id,
            },
        })
        .collect();
    Some(pages)
}

#[async_trait]
impl StreamingComponent for CourseComponent {
    fn category(&self) -> StreamingCategory {
        StreamingCategory::Course
    }

    async fn fetch_view(&self, api: &dyn BilibiliInterface, id: &ResourceId) -> Result<ViewResponse> {
        let resp = api.get_pugv_view(season_query(self.category(), id)?).await?;
        Ok(ViewResponse::Course(resp))
    }

    async fn normalize(
        &self,
        _ctx: &ComponentContext<'_>,
        view: &ViewResponse,
        requested: Option<&ResourceId>,
    ) -> Result<Option<Vec<Page>>> {
        match view {
            ViewResponse::Course(resp) => Ok(parse_view(resp, requested)),
            other => Err(other.mismatch(StreamingCategory::Course)),
        }
    }

    async fn fetch_play(&self, api: &dyn BilibiliInterface, request: &PlayRequest) -> Result<PlayResponse> {
        Ok(api.get_pugv_play(PlayQuery::from(request)).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn view() -> PugvViewResponse {
        serde_json::from_value(json!({
            "code": 0,
            "message": "success",
            "data": {
                "season_id": 27,
                "title": "course",
                "subtitle": "learn things",
                "cover": "https://i0.hdslb.com/course.jpg",
                "brief": {},
                "up_info": {"mid": 5, "uname": "teacher", "avatar": "https://i0.hdslb.com/5.jpg"},
                "episodes": [
                    {"id": 1027, "aid": 1, "cid": 11, "index": 1, "title": "intro", "cover": "", "duration": 600, "release_date": 1},
                    {"id": 1028, "aid": 2, "cid": 12, "index": 2, "title": "basics", "cover": "", "duration": 900, "release_date": 2},
                    {"id": 1029, "aid": 3, "cid": 13, "index": 3, "title": "advanced", "cover": "", "duration": 1200, "release_date": 3}
                ]
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_default_selects_first() {
        let pages = parse_view(&view(), None).unwrap();
        assert_eq!(pages.len(), 3);
        assert!(pages[0].is_selected);
        assert_eq!(pages.iter().filter(|p| p.is_selected).count(), 1);
    }

    #[test]
    fn test_requested_episode() {
        let pages = parse_view(&view(), Some(&ResourceId::EpId(1028))).unwrap();
        let selected: Vec<_> = pages.iter().filter(|p| p.is_selected).map(|p| p.cid).collect();
        assert_eq!(selected, vec![12]);
        assert_eq!(pages[1].index, 2);
        assert_eq!(pages[1].duration, 900);
    }

    #[test]
    fn test_collection_is_the_course() {
        let pages = parse_view(&view(), None).unwrap();
        let collection = &pages[2].collection;
        assert_eq!(collection.id, Some(27));
        assert_eq!(collection.title.as_deref(), Some("course"));
        assert_eq!(collection.desc.as_deref(), Some("learn things"));
        assert_eq!(collection.owner_name.as_deref(), Some("teacher"));
        assert!(collection.sect_id.is_none());
        assert_eq!(pages[2].view.ep_id, Some(1029));
        assert_eq!(pages[2].view.owner_id, Some(5));
    }

    #[test]
    fn test_not_found() {
        let resp: PugvViewResponse =
            serde_json::from_value(json!({"code": 404, "message": "not found", "data": null})).unwrap();
        assert!(parse_view(&resp, Some(&ResourceId::EpId(1))).is_none());
    }
}
