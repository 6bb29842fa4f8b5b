use std::sync::OnceLock;

use anyhow::{anyhow, Context, Result};

pub const DEFAULT_KEYRING_SERVICE: &str = "com.chat.push.credentials";

/// Bearer tokens per server URL.
pub trait CredentialStore: Send + Sync + 'static {
    fn token_for_server(&self, server_url: &str) -> Option<String>;
}

/// Tokens kept in the platform keyring, one entry per server URL.
pub struct KeyringCredentials {
    service: String,
}

impl KeyringCredentials {
    pub fn new(service: impl Into<String>) -> Result<Self> {
        init_keyring_once()?;
        Ok(Self {
            service: service.into(),
        })
    }

    pub fn store_token(&self, server_url: &str, token: &str) -> Result<()> {
        keyring_core::Entry::new(&self.service, server_url)
            .context("open keyring entry")?
            .set_password(token)
            .context("store server token")
    }

    pub fn delete_token(&self, server_url: &str) -> Result<()> {
        let entry = keyring_core::Entry::new(&self.service, server_url)
            .context("open keyring entry")?;
        match entry.delete_credential() {
            Ok(()) | Err(keyring_core::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("delete server token"),
        }
    }
}

impl CredentialStore for KeyringCredentials {
    fn token_for_server(&self, server_url: &str) -> Option<String> {
        let entry = match keyring_core::Entry::new(&self.service, server_url) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(%e, "failed to open keyring entry");
                return None;
            }
        };
        match entry.get_password() {
            Ok(token) if !token.is_empty() => Some(token),
            Ok(_) | Err(keyring_core::Error::NoEntry) => None,
            Err(e) => {
                tracing::warn!(%e, "failed to read server token");
                None
            }
        }
    }
}

pub fn init_keyring_once() -> Result<()> {
    static INIT: OnceLock<std::result::Result<(), String>> = OnceLock::new();
    match INIT.get_or_init(|| init_keyring_inner().map_err(|e| e.to_string())) {
        Ok(()) => Ok(()),
        Err(e) => Err(anyhow!(e.clone())),
    }
}

fn init_keyring_inner() -> Result<()> {
    // `set_default_store` may only run once per process; the OnceLock above guards it.
    #[cfg(target_os = "android")]
    {
        use android_native_keyring_store::credential::AndroidStore;

        let store = AndroidStore::from_ndk_context()
            .context("Android keyring store not initialized; ndk-context must be available")?;
        keyring_core::set_default_store(store);
        return Ok(());
    }

    #[cfg(not(target_os = "android"))]
    {
        keyring_core::set_default_store(
            keyring_core::mock::Store::new().context("failed to create mock keyring store")?,
        );
        Ok(())
    }
}
