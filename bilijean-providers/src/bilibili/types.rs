//! Bilibili API wire types
//!
//! Only the fields the streaming core reads are declared; everything else the
//! platform sends is ignored by serde.

use serde::{Deserialize, Deserializer};

/// Common response envelope.
///
/// `code` is the business status (0 on success). The payload is `null` whenever
/// `code` is non-zero. Series (PGC) endpoints name the payload `result` instead of `data`.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope<T> {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub ttl: Option<i64>,
    #[serde(alias = "result")]
    pub data: Option<T>,
}

impl<T> ApiEnvelope<T> {
    /// Whether the platform reported success.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.code == 0
    }

    /// The payload, only when the business status is success.
    #[must_use]
    pub fn payload(&self) -> Option<&T> {
        if self.is_ok() {
            self.data.as_ref()
        } else {
            None
        }
    }
}

/// Accept an id that the platform sometimes encodes as a JSON string.
fn u64_from_str_or_int<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StrOrInt {
        Int(u64),
        Str(String),
    }

    match StrOrInt::deserialize(deserializer)? {
        StrOrInt::Int(v) => Ok(v),
        StrOrInt::Str(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

// ========== Queries ==========

/// Identifier of a UGC video. `bvid` wins when both are set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UgcViewQuery {
    pub bvid: Option<String>,
    pub aid: Option<u64>,
}

/// Identifier of a series or course season. `ep_id` wins when both are set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeasonQuery {
    pub ep_id: Option<u64>,
    pub season_id: Option<u64>,
}

/// Identifiers accepted by the play URL endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayQuery {
    pub cid: Option<u64>,
    pub bvid: Option<String>,
    pub aid: Option<u64>,
    pub ep_id: Option<u64>,
}

// ========== UGC view (/x/web-interface/view) ==========

#[derive(Debug, Clone, Deserialize)]
pub struct UgcOwner {
    pub mid: u64,
    pub name: String,
    pub face: String,
}

/// One segment ("P") of a UGC video
#[derive(Debug, Clone, Deserialize)]
pub struct UgcPage {
    pub cid: u64,
    pub page: u32,
    pub part: String,
    /// seconds
    pub duration: u64,
}

/// Archive metadata of a season episode
#[derive(Debug, Clone, Deserialize)]
pub struct UgcEpisodeArc {
    pub aid: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub pic: String,
    #[serde(default)]
    pub pubdate: i64,
    #[serde(default)]
    pub duration: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UgcSeasonEpisode {
    pub id: u64,
    pub aid: u64,
    pub bvid: String,
    pub cid: u64,
    #[serde(default)]
    pub title: String,
    pub arc: UgcEpisodeArc,
    #[serde(default)]
    pub pages: Vec<UgcPage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UgcSeasonSection {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub episodes: Vec<UgcSeasonEpisode>,
}

/// A season grouping sibling videos, possibly from different owners
#[derive(Debug, Clone, Deserialize)]
pub struct UgcSeason {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub intro: String,
    #[serde(default)]
    pub cover: String,
    /// user id of the season owner
    pub mid: u64,
    #[serde(default)]
    pub sections: Vec<UgcSeasonSection>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UgcViewData {
    pub aid: u64,
    pub bvid: String,
    pub title: String,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub pic: String,
    #[serde(default)]
    pub pubdate: i64,
    #[serde(default)]
    pub duration: u64,
    pub owner: UgcOwner,
    #[serde(default)]
    pub pages: Vec<UgcPage>,
    #[serde(default)]
    pub is_season_display: bool,
    #[serde(default)]
    pub ugc_season: Option<UgcSeason>,
}

impl UgcViewData {
    /// The season grouping, only when the platform asks for it to be displayed.
    #[must_use]
    pub fn displayed_season(&self) -> Option<&UgcSeason> {
        if self.is_season_display {
            self.ugc_season.as_ref()
        } else {
            None
        }
    }
}

pub type UgcViewResponse = ApiEnvelope<UgcViewData>;

// ========== Series view (/pgc/view/web/season) ==========

#[derive(Debug, Clone, Deserialize)]
pub struct PgcUpInfo {
    pub mid: u64,
    pub uname: String,
    #[serde(default)]
    pub avatar: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PgcSeries {
    /// 0 when the season belongs to no series
    #[serde(default)]
    pub series_id: u64,
    #[serde(default)]
    pub series_title: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PgcEpisode {
    pub ep_id: u64,
    pub aid: u64,
    #[serde(default)]
    pub bvid: String,
    pub cid: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub long_title: String,
    #[serde(default)]
    pub cover: String,
    #[serde(default)]
    pub pub_time: i64,
    /// milliseconds
    #[serde(default)]
    pub duration: u64,
}

/// Episode of a side-story section; may merely point into the UGC namespace
#[derive(Debug, Clone, Deserialize)]
pub struct PgcSectionEpisode {
    pub ep_id: u64,
    #[serde(default)]
    pub aid: u64,
    #[serde(default)]
    pub bvid: Option<String>,
    #[serde(default)]
    pub cid: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub long_title: Option<String>,
    #[serde(default)]
    pub cover: String,
    #[serde(default)]
    pub pub_time: i64,
    /// milliseconds
    #[serde(default)]
    pub duration: Option<u64>,
    /// present when the entry links to a UGC video
    #[serde(default)]
    pub link_type: Option<String>,
}

impl PgcSectionEpisode {
    #[must_use]
    pub const fn is_ugc_pointer(&self) -> bool {
        self.link_type.is_some()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PgcSection {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub episodes: Vec<PgcSectionEpisode>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PgcViewResult {
    pub season_id: u64,
    #[serde(default)]
    pub season_title: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub cover: String,
    #[serde(default)]
    pub evaluate: String,
    #[serde(default)]
    pub episodes: Vec<PgcEpisode>,
    #[serde(default)]
    pub section: Option<Vec<PgcSection>>,
    #[serde(default)]
    pub series: PgcSeries,
    #[serde(default)]
    pub up_info: Option<PgcUpInfo>,
}

pub type PgcViewResponse = ApiEnvelope<PgcViewResult>;

// ========== Course view (/pugv/view/web/season) ==========

#[derive(Debug, Clone, Deserialize)]
pub struct PugvEpisode {
    /// ep_id
    pub id: u64,
    pub aid: u64,
    pub cid: u64,
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub cover: String,
    /// seconds
    #[serde(default)]
    pub duration: u64,
    #[serde(default)]
    pub release_date: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PugvViewData {
    pub season_id: u64,
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub cover: String,
    #[serde(default)]
    pub episodes: Vec<PugvEpisode>,
    pub up_info: PgcUpInfo,
}

pub type PugvViewResponse = ApiEnvelope<PugvViewData>;

// ========== Play URL (UGC, PGC and PUGV share the DASH shape) ==========

/// One encoded rendition
#[derive(Debug, Clone, Deserialize)]
pub struct DashMediaItem {
    pub id: u32,
    #[serde(alias = "baseUrl")]
    pub base_url: String,
    #[serde(default, alias = "backupUrl")]
    pub backup_url: Option<Vec<String>>,
    #[serde(default)]
    pub bandwidth: u64,
    #[serde(alias = "mimeType")]
    pub mime_type: String,
    #[serde(default)]
    pub codecid: u32,
    #[serde(default)]
    pub codecs: String,
    /// 0 for audio
    #[serde(default)]
    pub width: u32,
    /// 0 for audio
    #[serde(default)]
    pub height: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DashDolby {
    /// 1 normal, 2 panoramic; the course endpoint sends the string "NONE"
    #[serde(default, rename = "type")]
    pub kind: serde_json::Value,
    #[serde(default)]
    pub audio: Option<Vec<DashMediaItem>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DashFlac {
    #[serde(default)]
    pub display: bool,
    #[serde(default)]
    pub audio: Option<DashMediaItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DashInfo {
    #[serde(default)]
    pub duration: u64,
    #[serde(default)]
    pub video: Vec<DashMediaItem>,
    /// null when the resource has no audio
    #[serde(default)]
    pub audio: Option<Vec<DashMediaItem>>,
    #[serde(default)]
    pub dolby: Option<DashDolby>,
    #[serde(default)]
    pub flac: Option<DashFlac>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SupportFormat {
    pub quality: u32,
    #[serde(default)]
    pub new_description: String,
    #[serde(default)]
    pub codecs: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlayData {
    #[serde(default)]
    pub quality: u32,
    #[serde(default)]
    pub dash: Option<DashInfo>,
    #[serde(default)]
    pub support_formats: Vec<SupportFormat>,
}

pub type PlayResponse = ApiEnvelope<PlayData>;

// ========== User card (/x/web-interface/card) ==========

#[derive(Debug, Clone, Deserialize)]
pub struct Card {
    #[serde(deserialize_with = "u64_from_str_or_int")]
    pub mid: u64,
    pub name: String,
    #[serde(default)]
    pub face: String,
    #[serde(default)]
    pub sign: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CardData {
    pub card: Card,
    #[serde(default)]
    pub follower: u64,
}

pub type CardResponse = ApiEnvelope<CardData>;

// ========== Logged-in account (/x/space/myinfo) ==========

#[derive(Debug, Clone, Deserialize)]
pub struct MyInfoData {
    pub mid: u64,
    pub name: String,
    #[serde(default)]
    pub face: String,
    #[serde(default)]
    pub sign: String,
}

pub type MyInfoResponse = ApiEnvelope<MyInfoData>;
