//! Normalized page model
//!
//! A page is the finest browsable unit: one segment of a UGC video, one series
//! episode or one course episode. Sibling pages of the same season are listed
//! alongside the requested one with `is_selected == false`.

use serde::Serialize;

use super::constants::StreamingCategory;

/// Metadata of the video or episode a page belongs to
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ViewMeta {
    pub aid: Option<u64>,
    pub bvid: Option<String>,
    pub ep_id: Option<u64>,
    pub season_id: Option<u64>,
    pub title: Option<String>,
    pub desc: Option<String>,
    pub cover_url: Option<String>,
    pub pub_time: Option<i64>,
    /// seconds
    pub duration: Option<u64>,
    pub owner_id: Option<u64>,
    pub owner_name: Option<String>,
    pub owner_avatar_url: Option<String>,
}

/// Metadata of the season, series or course a view belongs to
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CollectionMeta {
    pub id: Option<u64>,
    pub title: Option<String>,
    pub desc: Option<String>,
    pub cover_url: Option<String>,
    pub owner_id: Option<u64>,
    pub owner_name: Option<String>,
    pub owner_avatar_url: Option<String>,
    pub sect_id: Option<u64>,
    pub sect_title: Option<String>,
}

impl CollectionMeta {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    pub category: StreamingCategory,
    /// 1-based position within its immediate container
    pub index: u32,
    /// platform id of the media segment
    pub cid: u64,
    pub title: String,
    /// seconds
    pub duration: u64,
    pub view: ViewMeta,
    pub collection: CollectionMeta,
    pub is_selected: bool,
}

/// Whole seconds from a millisecond duration, rounding half up.
#[must_use]
pub const fn ms_to_seconds(ms: u64) -> u64 {
    ms.saturating_add(500) / 1000
}

/// Empty strings carry no information on the wire.
pub(crate) fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}
