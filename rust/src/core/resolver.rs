use crate::credentials::CredentialStore;
use crate::payload::{keys, PushPayload};
use crate::servers::ServerRegistry;

use super::PushCore;

/// Finds the server a payload came from and records it as `server_url`.
///
/// With `server_id` the registry maps that id; otherwise the single active
/// server is assumed. Empty results are treated as misses.
pub fn resolve_server_url(
    servers: &dyn ServerRegistry,
    payload: &mut PushPayload,
) -> Option<String> {
    let url = match payload.server_id() {
        Some(server_id) => servers.server_url_for_identifier(server_id),
        None => servers.only_server_url(),
    }
    .filter(|url| !url.is_empty())?;
    payload.insert(keys::SERVER_URL, url.clone());
    Some(url)
}

pub fn get_token(credentials: &dyn CredentialStore, server_url: &str) -> Option<String> {
    credentials
        .token_for_server(server_url)
        .filter(|token| !token.is_empty())
}

/// Joins an API path onto a server URL, dropping one trailing `/` from the base.
pub(crate) fn api_url(server_url: &str, path: &str) -> String {
    let base = server_url.strip_suffix('/').unwrap_or(server_url);
    format!("{base}{path}")
}

impl PushCore {
    pub(super) fn resolve_server_url(&self, payload: &mut PushPayload) -> Option<String> {
        resolve_server_url(self.host.servers.as_ref(), payload)
    }

    pub(super) fn token_for(&self, server_url: &str) -> Option<String> {
        get_token(self.host.credentials.as_ref(), server_url)
    }
}
