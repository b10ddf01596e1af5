//! Stream source negotiation
//!
//! Picks one video rendition and one audio rendition out of a play response.
//! Every choice is a single-dimension reduction over distinct values:
//! order by preference, then, when a cap leaves at least one value, take the
//! highest value under the cap. A cap that excludes everything falls back to
//! the plain preference order.

use bilijean_providers::bilibili::types::{DashInfo, DashMediaItem, PlayQuery, PlayResponse};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::constants::{AudioBitRateId, StreamingCategory};
use super::error::{Result, StreamingError};
use super::page::Page;

/// Selection preferences for [`negotiate`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcePreferences {
    pub prefer_high_quality_video: bool,
    /// highest acceptable video quality id (`qn`)
    pub max_video_quality: Option<u32>,
    pub prefer_efficient_codec: bool,
    /// highest acceptable codec id
    pub max_codec: Option<u32>,
    pub prefer_high_quality_audio: bool,
    /// highest acceptable audio id; must be a known [`AudioBitRateId`]
    pub max_audio_quality: Option<u32>,
}

impl Default for SourcePreferences {
    fn default() -> Self {
        Self {
            prefer_high_quality_video: true,
            max_video_quality: None,
            prefer_efficient_codec: true,
            max_codec: None,
            prefer_high_quality_audio: true,
            max_audio_quality: None,
        }
    }
}

/// Identifiers needed to request play data for one page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayRequest {
    pub cid: Option<u64>,
    pub bvid: Option<String>,
    pub aid: Option<u64>,
    pub ep_id: Option<u64>,
}

impl PlayRequest {
    /// Play identifiers of a normalized page.
    #[must_use]
    pub fn from_page(page: &Page) -> Self {
        Self {
            cid: Some(page.cid),
            bvid: page.view.bvid.clone(),
            aid: page.view.aid,
            ep_id: page.view.ep_id,
        }
    }

    /// Check that `category`'s play endpoint can be called with these ids.
    pub fn validate(&self, category: StreamingCategory) -> Result<()> {
        match category {
            StreamingCategory::Ugc => {
                if self.cid.is_none() {
                    return Err(StreamingError::InvalidArgument("cid is required for ugc play data".to_string()));
                }
                if self.bvid.is_none() && self.aid.is_none() {
                    return Err(StreamingError::InvalidArgument(
                        "one of bvid and aid is required for ugc play data".to_string(),
                    ));
                }
            }
            StreamingCategory::Series | StreamingCategory::Course => {
                if self.ep_id.is_none() && self.cid.is_none() {
                    return Err(StreamingError::InvalidArgument(format!(
                        "one of ep_id and cid is required for {category} play data"
                    )));
                }
            }
        }
        Ok(())
    }
}

impl From<&PlayRequest> for PlayQuery {
    fn from(request: &PlayRequest) -> Self {
        Self {
            cid: request.cid,
            bvid: request.bvid.clone(),
            aid: request.aid,
            ep_id: request.ep_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoSourceMeta {
    pub url: String,
    pub backup_urls: Vec<String>,
    pub mime_type: String,
    pub codecs: String,
    pub codec_id: u32,
    pub quality_id: u32,
    pub width: u32,
    pub height: u32,
}

impl From<&DashMediaItem> for VideoSourceMeta {
    fn from(item: &DashMediaItem) -> Self {
        Self {
            url: item.base_url.clone(),
            backup_urls: item.backup_url.clone().unwrap_or_default(),
            mime_type: item.mime_type.clone(),
            codecs: item.codecs.clone(),
            codec_id: item.codecid,
            quality_id: item.id,
            width: item.width,
            height: item.height,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AudioSourceMeta {
    pub url: String,
    pub backup_urls: Vec<String>,
    pub mime_type: String,
    pub codecs: String,
    /// raw bitrate id
    pub quality_id: u32,
}

impl From<&DashMediaItem> for AudioSourceMeta {
    fn from(item: &DashMediaItem) -> Self {
        Self {
            url: item.base_url.clone(),
            backup_urls: item.backup_url.clone().unwrap_or_default(),
            mime_type: item.mime_type.clone(),
            codecs: item.codecs.clone(),
            quality_id: item.id,
        }
    }
}

/// Negotiated pair of renditions
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamSource {
    pub video: VideoSourceMeta,
    /// `None` only when the resource has no audio rendition at all
    pub audio: Option<AudioSourceMeta>,
}

/// Choose one of `values` by preference direction and optional cap.
fn pick_preferred(values: impl IntoIterator<Item = u32>, prefer_high: bool, cap: Option<u32>, what: &str) -> Option<u32> {
    let mut ordered: Vec<u32> = values.into_iter().collect();
    ordered.sort_unstable();
    ordered.dedup();
    if prefer_high {
        ordered.reverse();
    }

    if let Some(cap) = cap {
        if let Some(closest) = ordered.iter().copied().filter(|v| *v <= cap).max() {
            return Some(closest);
        }
        debug!(what, cap, candidates = ?ordered, "Cap excludes every candidate, using preference order");
    }
    ordered.first().copied()
}

fn select_video<'a>(pool: &'a [DashMediaItem], prefs: &SourcePreferences) -> Result<&'a DashMediaItem> {
    let quality = pick_preferred(
        pool.iter().map(|c| c.id),
        prefs.prefer_high_quality_video,
        prefs.max_video_quality,
        "video quality",
    )
    .ok_or_else(|| StreamingError::NoMatchingCandidate("no video rendition".to_string()))?;
    let narrowed: Vec<&DashMediaItem> = pool.iter().filter(|c| c.id == quality).collect();

    let codec = pick_preferred(
        narrowed.iter().map(|c| c.codecid),
        prefs.prefer_efficient_codec,
        prefs.max_codec,
        "video codec",
    )
    .ok_or_else(|| StreamingError::NoMatchingCandidate(format!("no video rendition at quality {quality}")))?;

    let chosen = narrowed
        .into_iter()
        .find(|c| c.codecid == codec)
        .ok_or_else(|| StreamingError::NoMatchingCandidate(format!("no video rendition with codec {codec}")))?;
    debug!(quality, codec, "Video rendition selected");
    Ok(chosen)
}

/// Rank of an audio id on the cross-tier scale; unknown ids rank lowest.
fn audio_ordinal(id: u32) -> u32 {
    AudioBitRateId::try_from(id).map_or(0, AudioBitRateId::quality_ordinal)
}

/// Surround first, then Hi-Res, then ordinary bitrates.
fn audio_pool(dash: &DashInfo) -> Vec<&DashMediaItem> {
    let mut pool = Vec::new();
    if let Some(dolby) = dash.dolby.as_ref().and_then(|d| d.audio.as_ref()) {
        pool.extend(dolby.iter());
    }
    if let Some(hi_res) = dash.flac.as_ref().and_then(|f| f.audio.as_ref()) {
        pool.push(hi_res);
    }
    if let Some(audio) = dash.audio.as_ref() {
        pool.extend(audio.iter());
    }
    pool
}

fn select_audio<'a>(pool: &[&'a DashMediaItem], prefs: &SourcePreferences) -> Result<Option<&'a DashMediaItem>> {
    let cap = prefs
        .max_audio_quality
        .map(|id| AudioBitRateId::try_from(id).map(AudioBitRateId::quality_ordinal))
        .transpose()?;

    let Some(ordinal) = pick_preferred(
        pool.iter().map(|c| audio_ordinal(c.id)),
        prefs.prefer_high_quality_audio,
        cap,
        "audio quality",
    ) else {
        return Ok(None);
    };

    let chosen = pool.iter().copied().find(|c| audio_ordinal(c.id) == ordinal);
    debug!(ordinal, id = ?chosen.map(|c| c.id), "Audio rendition selected");
    Ok(chosen)
}

/// Pick a video and an audio rendition from `play`.
///
/// A non-zero business code is reported as `NotFound` for `category`.
pub fn negotiate(category: StreamingCategory, play: &PlayResponse, prefs: &SourcePreferences) -> Result<StreamSource> {
    let Some(data) = play.payload() else {
        return Err(StreamingError::NotFound { category });
    };
    let dash = data
        .dash
        .as_ref()
        .ok_or_else(|| StreamingError::NoMatchingCandidate("play data carries no DASH streams".to_string()))?;

    let video = select_video(&dash.video, prefs)?;
    let audio = select_audio(&audio_pool(dash), prefs)?;

    Ok(StreamSource {
        video: video.into(),
        audio: audio.map(Into::into),
    })
}
