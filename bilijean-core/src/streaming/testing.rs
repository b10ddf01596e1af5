//! Canned `BilibiliInterface` for tests
//!
//! Compiled for this crate's unit tests and, behind the `test-util` feature, for integration tests.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use bilijean_providers::bilibili::types::{
    CardResponse, MyInfoResponse, PgcViewResponse, PlayQuery, PlayResponse, PugvViewResponse,
    SeasonQuery, UgcViewQuery, UgcViewResponse,
};
use bilijean_providers::{BilibiliInterface, ProviderClientError};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Serves fixed JSON bodies and records which endpoints were hit.
#[derive(Default)]
pub struct FakeApi {
    pub location: Option<String>,
    pub probe_fails: bool,
    pub ugc_view: Option<Value>,
    pub pgc_view: Option<Value>,
    pub pugv_view: Option<Value>,
    pub play: Option<Value>,
    pub card: Option<Value>,
    pub card_delay: Option<Duration>,
    pub calls: Mutex<Vec<String>>,
    pub play_queries: Mutex<Vec<PlayQuery>>,
}

impl FakeApi {
    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).push(call.into());
    }

    fn record_play(&self, endpoint: &str, query: PlayQuery) {
        self.record(format!("{endpoint} {query:?}"));
        self.play_queries.lock().unwrap_or_else(PoisonError::into_inner).push(query);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Play queries in arrival order, across all three categories
    pub fn play_queries(&self) -> Vec<PlayQuery> {
        self.play_queries.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn canned<T: DeserializeOwned>(body: Option<&Value>) -> Result<T, ProviderClientError> {
        let body = body.ok_or_else(|| ProviderClientError::Network("connection refused".to_string()))?;
        Ok(serde_json::from_value(body.clone())?)
    }
}

#[async_trait]
impl BilibiliInterface for FakeApi {
    async fn probe_redirect(&self, url: &str, _timeout: Duration) -> Result<Option<String>, ProviderClientError> {
        self.record(format!("probe {url}"));
        if self.probe_fails {
            return Err(ProviderClientError::Network("operation timed out".to_string()));
        }
        Ok(self.location.clone())
    }

    async fn get_ugc_view(&self, query: UgcViewQuery) -> Result<UgcViewResponse, ProviderClientError> {
        self.record(format!("ugc_view {query:?}"));
        Self::canned(self.ugc_view.as_ref())
    }

    async fn get_pgc_view(&self, query: SeasonQuery) -> Result<PgcViewResponse, ProviderClientError> {
        self.record(format!("pgc_view {query:?}"));
        Self::canned(self.pgc_view.as_ref())
    }

    async fn get_pugv_view(&self, query: SeasonQuery) -> Result<PugvViewResponse, ProviderClientError> {
        self.record(format!("pugv_view {query:?}"));
        Self::canned(self.pugv_view.as_ref())
    }

    async fn get_ugc_play(&self, query: PlayQuery) -> Result<PlayResponse, ProviderClientError> {
        self.record_play("ugc_play", query);
        Self::canned(self.play.as_ref())
    }

    async fn get_pgc_play(&self, query: PlayQuery) -> Result<PlayResponse, ProviderClientError> {
        self.record_play("pgc_play", query);
        Self::canned(self.play.as_ref())
    }

    async fn get_pugv_play(&self, query: PlayQuery) -> Result<PlayResponse, ProviderClientError> {
        self.record_play("pugv_play", query);
        Self::canned(self.play.as_ref())
    }

    async fn get_card(&self, mid: u64, _timeout: Duration) -> Result<CardResponse, ProviderClientError> {
        self.record(format!("card {mid}"));
        if let Some(delay) = self.card_delay {
            tokio::time::sleep(delay).await;
        }
        Self::canned(self.card.as_ref())
    }

    async fn get_my_info(&self) -> Result<MyInfoResponse, ProviderClientError> {
        self.record("my_info");
        Err(ProviderClientError::Network("connection refused".to_string()))
    }
}
