//! URL classification
//!
//! Maps a web link to the category and identifier the view API needs.

use std::sync::LazyLock;
use std::time::Duration;

use bilijean_providers::BilibiliInterface;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use super::constants::StreamingCategory;
use super::error::{Result, StreamingError};

const WEB_BASE: &str = "https://www.bilibili.com";

// These patterns are compile-time constants; Regex::new cannot fail on them.
static RE_UGC_BVID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/video/(BV1[a-zA-Z0-9]{9})").expect("invalid BVID regex"));
static RE_UGC_AID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/video/av(\d+)").expect("invalid AID regex"));
static RE_SERIES_EP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/bangumi/play/ep(\d+)").expect("invalid series EPID regex"));
static RE_SERIES_SS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/bangumi/play/ss(\d+)").expect("invalid series SSID regex"));
static RE_COURSE_EP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/cheese/play/ep(\d+)").expect("invalid course EPID regex"));
static RE_COURSE_SS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/cheese/play/ss(\d+)").expect("invalid course SSID regex"));

#[derive(Clone, Copy)]
enum IdKind {
    Bvid,
    Aid,
    EpId,
    SeasonId,
}

/// Ordered rule set; the first matching rule wins.
static RULES: [(&LazyLock<Regex>, StreamingCategory, IdKind); 6] = [
    (&RE_UGC_BVID, StreamingCategory::Ugc, IdKind::Bvid),
    (&RE_UGC_AID, StreamingCategory::Ugc, IdKind::Aid),
    (&RE_SERIES_EP, StreamingCategory::Series, IdKind::EpId),
    (&RE_SERIES_SS, StreamingCategory::Series, IdKind::SeasonId),
    (&RE_COURSE_EP, StreamingCategory::Course, IdKind::EpId),
    (&RE_COURSE_SS, StreamingCategory::Course, IdKind::SeasonId),
];

/// The single identifier carried by a [`ResourceLocator`]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceId {
    /// Numeric video id (`av...`)
    Aid(u64),
    /// Short code (`BV1...`)
    Bvid(String),
    EpId(u64),
    SeasonId(u64),
}

impl ResourceId {
    #[must_use]
    pub const fn aid(&self) -> Option<u64> {
        match self {
            Self::Aid(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn bvid(&self) -> Option<&str> {
        match self {
            Self::Bvid(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub const fn ep_id(&self) -> Option<u64> {
        match self {
            Self::EpId(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub const fn season_id(&self) -> Option<u64> {
        match self {
            Self::SeasonId(v) => Some(*v),
            _ => None,
        }
    }
}

/// Result of classifying a URL: a category plus the identifier valid for it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceLocator {
    category: StreamingCategory,
    id: ResourceId,
}

impl ResourceLocator {
    /// UGC takes `aid`/`bvid`; series and courses take `ep_id`/`season_id`.
    pub fn new(category: StreamingCategory, id: ResourceId) -> Result<Self> {
        let valid = match category {
            StreamingCategory::Ugc => matches!(id, ResourceId::Aid(_) | ResourceId::Bvid(_)),
            StreamingCategory::Series | StreamingCategory::Course => {
                matches!(id, ResourceId::EpId(_) | ResourceId::SeasonId(_))
            }
        };
        if !valid {
            return Err(StreamingError::InvalidArgument(format!(
                "{id:?} is not an identifier of a {category} resource"
            )));
        }
        Ok(Self { category, id })
    }

    #[must_use]
    pub const fn category(&self) -> StreamingCategory {
        self.category
    }

    #[must_use]
    pub const fn id(&self) -> &ResourceId {
        &self.id
    }

    /// Canonical web URL of the resource; classifying it yields `self` again.
    #[must_use]
    pub fn canonical_url(&self) -> String {
        match (&self.category, &self.id) {
            (StreamingCategory::Ugc, ResourceId::Bvid(bvid)) => format!("{WEB_BASE}/video/{bvid}"),
            (StreamingCategory::Ugc, ResourceId::Aid(aid)) => format!("{WEB_BASE}/video/av{aid}"),
            (StreamingCategory::Series, ResourceId::EpId(id)) => format!("{WEB_BASE}/bangumi/play/ep{id}"),
            (StreamingCategory::Series, ResourceId::SeasonId(id)) => format!("{WEB_BASE}/bangumi/play/ss{id}"),
            (StreamingCategory::Course, ResourceId::EpId(id)) => format!("{WEB_BASE}/cheese/play/ep{id}"),
            (StreamingCategory::Course, ResourceId::SeasonId(id)) => format!("{WEB_BASE}/cheese/play/ss{id}"),
            // `new` rejects every other pairing
            (category, id) => format!("{WEB_BASE}/{category}/{id:?}"),
        }
    }
}

/// Path component of `url`; unparsable input is treated as a bare path.
fn url_path(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.split(['?', '#']).next().unwrap_or_default().to_string(),
    }
}

/// Classify a URL without any network access.
#[must_use]
pub fn match_url(url: &str) -> Option<ResourceLocator> {
    let path = url_path(url);
    for (pattern, category, kind) in &RULES {
        let Some(token) = pattern.captures(&path).and_then(|c| c.get(1)) else {
            continue;
        };
        let token = token.as_str();
        let id = match kind {
            IdKind::Bvid => Some(ResourceId::Bvid(token.to_string())),
            IdKind::Aid => token.parse().ok().map(ResourceId::Aid),
            IdKind::EpId => token.parse().ok().map(ResourceId::EpId),
            IdKind::SeasonId => token.parse().ok().map(ResourceId::SeasonId),
        };
        // An id that overflows u64 makes this rule not match.
        if let Some(id) = id {
            return Some(ResourceLocator {
                category: *category,
                id,
            });
        }
    }
    None
}

/// Resolve a `Location` header against the URL it was returned for.
fn resolve_location(url: &str, location: &str) -> String {
    if Url::parse(location).is_ok() {
        return location.to_string();
    }
    Url::parse(url)
        .and_then(|base| base.join(location))
        .map_or_else(|_| location.to_string(), |joined| joined.to_string())
}

/// Classify a URL, first following one platform redirect hop when available.
///
/// Short links (`b23.tv`) and some video links redirect to their canonical form,
/// e.g. a series episode served under `/video/BV...`. The probe is optional:
/// any failure falls back to classifying `url` as given.
pub async fn classify(api: &dyn BilibiliInterface, url: &str, probe_timeout: Duration) -> Option<ResourceLocator> {
    let target = match api.probe_redirect(url, probe_timeout).await {
        Ok(Some(location)) => resolve_location(url, &location),
        Ok(None) => url.to_string(),
        Err(e) => {
            warn!(url, error = %e, "Redirect probe failed, classifying URL as given");
            url.to_string()
        }
    };
    let locator = match_url(&target);
    debug!(url, target = %target, ?locator, "URL classified");
    locator
}
