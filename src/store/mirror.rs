//! Remote mirror of the published ranking.
//!
//! The mirror is best-effort. Pushes run detached after the local publish
//! and their failures never touch the local record.

use std::time::Duration;

use async_trait::async_trait;

use super::record::RankingRecord;
use crate::config::MirrorConfig;
use crate::error::{PriorityError, Result};

/// A remote document store holding one copy of the ranking.
#[async_trait]
pub trait RemoteMirror: Send + Sync {
    /// Replace the remote copy with `record`.
    async fn push(&self, record: &RankingRecord) -> Result<()>;

    /// The remote copy, or `None` if nothing has been mirrored yet.
    async fn fetch(&self) -> Result<Option<RankingRecord>>;
}

/// Mirrors the record as a JSON document at a single URL.
///
/// `PUT` replaces it, `GET` reads it back and `404` means empty.
#[derive(Debug, Clone)]
pub struct HttpMirror {
    client: reqwest::Client,
    endpoint: String,
    auth_token: Option<String>,
}

impl HttpMirror {
    /// Build a mirror for `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`PriorityError::Mirror`] if the HTTP client cannot be built.
    pub fn new(
        endpoint: impl Into<String>,
        auth_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PriorityError::Mirror(format!("cannot build HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            auth_token,
        })
    }

    /// The configured mirror, or `None` when mirroring is disabled.
    ///
    /// # Errors
    ///
    /// Returns [`PriorityError::Config`] if enabled without an endpoint.
    pub fn from_config(config: &MirrorConfig) -> Result<Option<Self>> {
        if !config.enabled {
            return Ok(None);
        }
        let endpoint = config
            .endpoint
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .ok_or_else(|| {
                PriorityError::Config("mirror.endpoint is required when enabled".into())
            })?;
        Self::new(
            endpoint,
            config.auth_token.clone(),
            Duration::from_secs(config.timeout_secs),
        )
        .map(Some)
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl RemoteMirror for HttpMirror {
    async fn push(&self, record: &RankingRecord) -> Result<()> {
        let response = self
            .authorize(self.client.put(&self.endpoint))
            .json(record)
            .send()
            .await
            .map_err(|e| PriorityError::Mirror(format!("push failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PriorityError::Mirror(format!("push rejected: HTTP {status}")));
        }
        tracing::debug!(version = record.version, endpoint = %self.endpoint, "ranking mirrored");
        Ok(())
    }

    async fn fetch(&self) -> Result<Option<RankingRecord>> {
        let response = self
            .authorize(self.client.get(&self.endpoint))
            .send()
            .await
            .map_err(|e| PriorityError::Mirror(format!("fetch failed: {e}")))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(PriorityError::Mirror(format!("fetch rejected: HTTP {status}")));
        }
        response
            .json::<RankingRecord>()
            .await
            .map(Some)
            .map_err(|e| PriorityError::Mirror(format!("cannot parse mirrored record: {e}")))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn disabled_config_builds_nothing() {
        let config = MirrorConfig::default();
        assert!(HttpMirror::from_config(&config).unwrap().is_none());
    }

    #[test]
    fn enabled_config_needs_endpoint() {
        let config = MirrorConfig {
            enabled: true,
            endpoint: Some("   ".into()),
            ..MirrorConfig::default()
        };
        assert!(matches!(
            HttpMirror::from_config(&config),
            Err(PriorityError::Config(_))
        ));
    }

    #[test]
    fn enabled_config_builds_mirror() {
        let config = MirrorConfig {
            enabled: true,
            endpoint: Some("http://127.0.0.1:9/rankings".into()),
            ..MirrorConfig::default()
        };
        let mirror = HttpMirror::from_config(&config).unwrap().unwrap();
        assert_eq!(mirror.endpoint(), "http://127.0.0.1:9/rankings");
    }
}
