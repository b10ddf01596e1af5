//! Bilibili HTTP Client

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{self, HeaderValue};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::format::FormatNumberValue;
use super::service::BilibiliInterface;
use super::types::{
    CardResponse, MyInfoResponse, PgcViewResponse, PlayQuery, PlayResponse, PugvViewResponse,
    SeasonQuery, UgcViewQuery, UgcViewResponse,
};
use crate::error::{check_response, json_with_limit, ProviderClientError};

pub const DEFAULT_API_BASE: &str = "https://api.bilibili.com";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";
const ORIGIN: &str = "https://www.bilibili.com";
const REFERER: &str = "https://www.bilibili.com/";
const ACCEPT: &str = "application/json, text/plain, */*";

const UGC_VIEW_PATH: &str = "/x/web-interface/view";
const PGC_VIEW_PATH: &str = "/pgc/view/web/season";
const PUGV_VIEW_PATH: &str = "/pugv/view/web/season";
const UGC_PLAY_PATH: &str = "/x/player/wbi/playurl";
const PGC_PLAY_PATH: &str = "/pgc/player/web/playurl";
const PUGV_PLAY_PATH: &str = "/pugv/player/web/playurl";
const CARD_PATH: &str = "/x/web-interface/card";
const MY_INFO_PATH: &str = "/x/space/myinfo";

/// Shared HTTP client for all Bilibili requests (connection pooling)
/// Redirects are disabled: the redirect probe reads `Location` itself.
static SHARED_CLIENT: LazyLock<Client> = LazyLock::new(|| {
    Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(10))
        .pool_max_idle_per_host(10)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("Failed to build Bilibili shared HTTP client")
});

/// Bilibili HTTP Client
#[derive(Clone)]
pub struct BilibiliClient {
    client: Client,
    api_base: String,
    sess_data: Option<String>,
    request_timeout: Duration,
}

impl BilibiliClient {
    /// Create a new anonymous client against the public API (reuses shared connection pool)
    #[must_use]
    pub fn new() -> Self {
        Self {
            client: SHARED_CLIENT.clone(),
            api_base: DEFAULT_API_BASE.to_string(),
            sess_data: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Point the client at another API host (trailing slashes are dropped)
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Attach the `SESSDATA` cookie of a logged-in account; empty values are ignored
    #[must_use]
    pub fn with_sess_data(mut self, sess_data: Option<String>) -> Self {
        self.sess_data = sess_data.filter(|s| !s.is_empty());
        self
    }

    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    #[must_use]
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    #[must_use]
    pub const fn has_session(&self) -> bool {
        self.sess_data.is_some()
    }

    /// Browser-like header set shared by every request
    fn browser_headers(req: RequestBuilder) -> RequestBuilder {
        req.header(header::ORIGIN, ORIGIN)
            .header(header::REFERER, REFERER)
            .header(header::ACCEPT, ACCEPT)
    }

    /// Browser headers plus the session cookie; API requests only
    fn decorate(&self, req: RequestBuilder) -> Result<RequestBuilder, ProviderClientError> {
        let req = Self::browser_headers(req);
        match &self.sess_data {
            Some(sess) => {
                let cookie = HeaderValue::from_str(&format!("SESSDATA={sess}"))?;
                Ok(req.header(header::COOKIE, cookie))
            }
            None => Ok(req),
        }
    }

    /// GET an API path and decode the JSON envelope.
    ///
    /// Only the HTTP status is checked here; the business `code` is left to the caller.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
        timeout: Duration,
    ) -> Result<T, ProviderClientError> {
        let url = format!("{}{path}", self.api_base);
        debug!(url = %url, ?params, "Bilibili API request");
        let req = self.decorate(self.client.get(&url).query(params).timeout(timeout))?;
        let resp = check_response(req.send().await?)?;
        json_with_limit(resp).await
    }

    fn season_params(query: &SeasonQuery) -> Result<Vec<(&'static str, String)>, ProviderClientError> {
        if let Some(ep_id) = query.ep_id {
            Ok(vec![("ep_id", ep_id.to_string())])
        } else if let Some(season_id) = query.season_id {
            Ok(vec![("season_id", season_id.to_string())])
        } else {
            Err(ProviderClientError::InvalidArgument(
                "at least one of ep_id and season_id is necessary".to_string(),
            ))
        }
    }

    fn format_params(params: &mut Vec<(&'static str, String)>) {
        params.push(("fnval", FormatNumberValue::full_format().bits().to_string()));
        params.push(("fourk", "1".to_string()));
    }

    fn ugc_play_params(query: &PlayQuery) -> Result<Vec<(&'static str, String)>, ProviderClientError> {
        let cid = query
            .cid
            .ok_or_else(|| ProviderClientError::InvalidArgument("cid is necessary".to_string()))?;
        let mut params = if let Some(bvid) = &query.bvid {
            vec![("bvid", bvid.clone())]
        } else if let Some(aid) = query.aid {
            vec![("avid", aid.to_string())]
        } else {
            return Err(ProviderClientError::InvalidArgument(
                "at least one of bvid and aid is necessary".to_string(),
            ));
        };
        params.push(("cid", cid.to_string()));
        Self::format_params(&mut params);
        Ok(params)
    }

    fn episode_play_params(
        query: &PlayQuery,
        with_avid: bool,
    ) -> Result<Vec<(&'static str, String)>, ProviderClientError> {
        if query.ep_id.is_none() && query.cid.is_none() {
            return Err(ProviderClientError::InvalidArgument(
                "at least one of ep_id and cid is necessary".to_string(),
            ));
        }
        let mut params = Vec::new();
        if let Some(ep_id) = query.ep_id {
            params.push(("ep_id", ep_id.to_string()));
        }
        if let Some(cid) = query.cid {
            params.push(("cid", cid.to_string()));
        }
        if with_avid {
            if let Some(aid) = query.aid {
                params.push(("avid", aid.to_string()));
            }
        }
        Self::format_params(&mut params);
        Ok(params)
    }
}

impl Default for BilibiliClient {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BilibiliClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BilibiliClient")
            .field("api_base", &self.api_base)
            .field("has_session", &self.sess_data.is_some())
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl BilibiliInterface for BilibiliClient {
    /// Short links may point anywhere, so the session cookie is never sent here.
    async fn probe_redirect(&self, url: &str, timeout: Duration) -> Result<Option<String>, ProviderClientError> {
        let resp = Self::browser_headers(self.client.get(url).timeout(timeout)).send().await?;
        let location = resp
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);
        debug!(url, status = %resp.status(), ?location, "redirect probe");
        Ok(location)
    }

    async fn get_ugc_view(&self, query: UgcViewQuery) -> Result<UgcViewResponse, ProviderClientError> {
        let params = if let Some(bvid) = query.bvid {
            vec![("bvid", bvid)]
        } else if let Some(aid) = query.aid {
            vec![("aid", aid.to_string())]
        } else {
            return Err(ProviderClientError::InvalidArgument(
                "at least one of bvid and aid is necessary".to_string(),
            ));
        };
        self.get_json(UGC_VIEW_PATH, &params, self.request_timeout).await
    }

    async fn get_pgc_view(&self, query: SeasonQuery) -> Result<PgcViewResponse, ProviderClientError> {
        let params = Self::season_params(&query)?;
        self.get_json(PGC_VIEW_PATH, &params, self.request_timeout).await
    }

    async fn get_pugv_view(&self, query: SeasonQuery) -> Result<PugvViewResponse, ProviderClientError> {
        let params = Self::season_params(&query)?;
        self.get_json(PUGV_VIEW_PATH, &params, self.request_timeout).await
    }

    async fn get_ugc_play(&self, query: PlayQuery) -> Result<PlayResponse, ProviderClientError> {
        let params = Self::ugc_play_params(&query)?;
        self.get_json(UGC_PLAY_PATH, &params, self.request_timeout).await
    }

    async fn get_pgc_play(&self, query: PlayQuery) -> Result<PlayResponse, ProviderClientError> {
        let params = Self::episode_play_params(&query, false)?;
        self.get_json(PGC_PLAY_PATH, &params, self.request_timeout).await
    }

    async fn get_pugv_play(&self, query: PlayQuery) -> Result<PlayResponse, ProviderClientError> {
        let params = Self::episode_play_params(&query, true)?;
        self.get_json(PUGV_PLAY_PATH, &params, self.request_timeout).await
    }

    async fn get_card(&self, mid: u64, timeout: Duration) -> Result<CardResponse, ProviderClientError> {
        let params = [("mid", mid.to_string()), ("photo", "false".to_string())];
        self.get_json(CARD_PATH, &params, timeout).await
    }

    async fn get_my_info(&self) -> Result<MyInfoResponse, ProviderClientError> {
        self.get_json(MY_INFO_PATH, &[], self.request_timeout).await
    }
}
