//! Engine configuration.
//!
//! Gathers the handful of values a client needs to assemble the engine:
//! where the local database lives, how to reach the remote content API, and
//! who the content belongs to.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::remote::{HttpContentService, StaticIdentity};
use crate::store::LocalStore;
use crate::sync::SyncEngine;
use crate::util::{is_http_url, normalize_text_option};

/// Configuration for building a [`SyncEngine`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EngineConfig {
    /// Local database file path
    pub db_path: PathBuf,
    /// Remote content API base URL (e.g. `https://api.example.com`)
    #[serde(default)]
    pub api_base_url: Option<String>,
    /// Bearer token for the remote content API
    #[serde(default)]
    pub api_token: Option<String>,
    /// Stable id of the signed-in user
    #[serde(default)]
    pub user_id: Option<String>,
}

impl EngineConfig {
    /// Environment variable names used by [`Self::from_env`]
    pub const ENV_DB_PATH: &'static str = "WAYMARK_DB_PATH";
    pub const ENV_API_URL: &'static str = "WAYMARK_API_URL";
    pub const ENV_API_TOKEN: &'static str = "WAYMARK_API_TOKEN";
    pub const ENV_USER_ID: &'static str = "WAYMARK_USER_ID";

    /// Read configuration from the environment, with `default_db_path` used
    /// when no override is set.
    #[must_use]
    pub fn from_env(default_db_path: PathBuf) -> Self {
        let var = |name: &str| normalize_text_option(std::env::var(name).ok());
        Self {
            db_path: var(Self::ENV_DB_PATH).map_or(default_db_path, PathBuf::from),
            api_base_url: var(Self::ENV_API_URL),
            api_token: var(Self::ENV_API_TOKEN),
            user_id: var(Self::ENV_USER_ID),
        }
    }

    /// Whether the remote side is fully configured.
    #[must_use]
    pub fn is_remote_configured(&self) -> bool {
        self.api_base_url.is_some() && self.api_token.is_some() && self.user_id.is_some()
    }

    /// Assemble a ready-to-use engine from this configuration.
    pub async fn build_engine(&self) -> Result<SyncEngine> {
        let base_url = self
            .api_base_url
            .as_deref()
            .ok_or_else(|| Error::InvalidInput("API base URL is required".to_string()))?;
        if !is_http_url(base_url) {
            return Err(Error::InvalidInput(
                "API base URL must include http:// or https://".to_string(),
            ));
        }
        let token = self
            .api_token
            .as_deref()
            .ok_or_else(|| Error::InvalidInput("API token is required".to_string()))?;
        let user_id = self
            .user_id
            .clone()
            .ok_or(Error::NotAuthenticated)?;

        let store = LocalStore::open_path(&self.db_path).await?;
        let remote = HttpContentService::new(base_url, token)?;
        Ok(SyncEngine::new(store, Arc::new(remote), Arc::new(StaticIdentity(user_id))).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_configured_requires_all_three_values() {
        let mut config = EngineConfig {
            db_path: PathBuf::from("/tmp/waymark.db"),
            ..EngineConfig::default()
        };
        assert!(!config.is_remote_configured());

        config.api_base_url = Some("https://api.example.com".to_string());
        config.api_token = Some("token".to_string());
        assert!(!config.is_remote_configured());

        config.user_id = Some("user-1".to_string());
        assert!(config.is_remote_configured());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_build_engine_rejects_missing_remote_config() {
        let config = EngineConfig {
            db_path: PathBuf::from("/tmp/waymark.db"),
            ..EngineConfig::default()
        };
        assert!(config.build_engine().await.is_err());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_build_engine_rejects_non_http_url() {
        let config = EngineConfig {
            db_path: std::env::temp_dir().join("waymark-test.db"),
            api_base_url: Some("api.example.com".to_string()),
            api_token: Some("token".to_string()),
            user_id: Some("user-1".to_string()),
        };
        assert!(matches!(
            config.build_engine().await,
            Err(Error::InvalidInput(_))
        ));
    }
}
