//! Bilibili service interface
//!
//! The streaming core only talks to the platform through this trait, so tests
//! can substitute canned responses for the HTTP client.

use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use super::types::{
    CardResponse, MyInfoResponse, PgcViewResponse, PlayQuery, PlayResponse, PugvViewResponse,
    SeasonQuery, UgcViewQuery, UgcViewResponse,
};
use crate::error::ProviderClientError;

/// Business code the platform returns when the session cookie is missing or expired.
pub const NOT_LOGGED_IN_CODE: i64 = -101;

/// Unified Bilibili API interface
///
/// View and play calls return the raw envelope: a non-zero `code` is not an
/// error at this layer, callers decide what it means.
#[async_trait]
pub trait BilibiliInterface: Send + Sync {
    /// Issue a single GET against `url` without following redirects and
    /// return the raw `Location` header, if any.
    async fn probe_redirect(&self, url: &str, timeout: Duration) -> Result<Option<String>, ProviderClientError>;

    async fn get_ugc_view(&self, query: UgcViewQuery) -> Result<UgcViewResponse, ProviderClientError>;

    async fn get_pgc_view(&self, query: SeasonQuery) -> Result<PgcViewResponse, ProviderClientError>;

    async fn get_pugv_view(&self, query: SeasonQuery) -> Result<PugvViewResponse, ProviderClientError>;

    async fn get_ugc_play(&self, query: PlayQuery) -> Result<PlayResponse, ProviderClientError>;

    async fn get_pgc_play(&self, query: PlayQuery) -> Result<PlayResponse, ProviderClientError>;

    async fn get_pugv_play(&self, query: PlayQuery) -> Result<PlayResponse, ProviderClientError>;

    /// Public profile card of a user, bounded by `timeout`.
    async fn get_card(&self, mid: u64, timeout: Duration) -> Result<CardResponse, ProviderClientError>;

    /// Profile of the account the session cookie belongs to.
    async fn get_my_info(&self) -> Result<MyInfoResponse, ProviderClientError>;

    /// Whether the configured session cookie is accepted by the platform.
    async fn validate_session(&self) -> Result<bool, ProviderClientError> {
        let resp = self.get_my_info().await?;
        if resp.is_ok() {
            return Ok(true);
        }
        if resp.code == NOT_LOGGED_IN_CODE {
            warn!(message = %resp.message, "Bilibili session is not logged in");
        } else {
            warn!(code = resp.code, message = %resp.message, "Bilibili session validation failed");
        }
        Ok(false)
    }
}
