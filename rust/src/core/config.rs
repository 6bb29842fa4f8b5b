use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

pub(crate) const CONFIG_FILE_NAME: &str = "push_config.json";

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;
const DEFAULT_RECEIPT_BACKOFF_UNIT_MS: u64 = 1_000;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct PushConfig {
    pub(crate) disable_network: Option<bool>,
    pub(crate) http_timeout_secs: Option<u64>,
    // Tests shrink this so the backoff table runs in milliseconds.
    pub(crate) receipt_backoff_unit_ms: Option<u64>,
}

pub(crate) fn load_push_config(data_dir: &str) -> PushConfig {
    let path = Path::new(data_dir).join(CONFIG_FILE_NAME);
    let Ok(bytes) = std::fs::read(&path) else {
        return PushConfig::default();
    };
    match serde_json::from_slice::<PushConfig>(&bytes) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(%e, path = %path.display(), "invalid push config, using defaults");
            PushConfig::default()
        }
    }
}

impl PushConfig {
    pub(crate) fn network_enabled(&self) -> bool {
        if let Some(disable) = self.disable_network {
            return !disable;
        }
        std::env::var("PUSH_DISABLE_NETWORK").ok().as_deref() != Some("1")
    }

    pub(crate) fn http_timeout(&self) -> Duration {
        Duration::from_secs(
            self.http_timeout_secs
                .filter(|s| *s > 0)
                .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS),
        )
    }

    pub(crate) fn receipt_backoff_unit(&self) -> Duration {
        Duration::from_millis(
            self.receipt_backoff_unit_ms
                .unwrap_or(DEFAULT_RECEIPT_BACKOFF_UNIT_MS),
        )
    }
}
