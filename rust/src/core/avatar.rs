use std::sync::Arc;

use image::{Rgba, RgbaImage};
use tokio::runtime::Handle;

use crate::credentials::CredentialStore;
use crate::error::PushError;

use super::resolver::{api_url, get_token};

const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;
// Subsamples per axis when computing edge coverage of the circle.
const MASK_SUBSAMPLES: u32 = 4;

/// Where the builder gets user avatars from. Absent means "render without".
pub trait AvatarSource {
    fn avatar(&self, server_url: &str, user_id: &str, override_url: Option<&str>)
        -> Option<RgbaImage>;
}

/// Never has an avatar.
pub struct NoAvatars;

impl AvatarSource for NoAvatars {
    fn avatar(&self, _: &str, _: &str, _: Option<&str>) -> Option<RgbaImage> {
        None
    }
}

#[derive(Clone)]
pub struct AvatarFetcher {
    http: reqwest::Client,
    credentials: Arc<dyn CredentialStore>,
    handle: Handle,
    network_enabled: bool,
}

impl AvatarFetcher {
    pub fn new(
        http: reqwest::Client,
        credentials: Arc<dyn CredentialStore>,
        handle: Handle,
        network_enabled: bool,
    ) -> Self {
        Self {
            http,
            credentials,
            handle,
            network_enabled,
        }
    }

    pub async fn fetch_avatar(
        &self,
        server_url: &str,
        user_id: &str,
        override_url: Option<&str>,
    ) -> Result<RgbaImage, PushError> {
        if !self.network_enabled {
            return Err(PushError::ConfigMissing("network disabled"));
        }
        let request = match override_url.filter(|u| !u.is_empty()) {
            Some(url) => self.http.get(url),
            None => {
                let token = get_token(self.credentials.as_ref(), server_url)
                    .ok_or(PushError::ConfigMissing("Invalid token"))?;
                let url = api_url(server_url, &format!("/api/v4/users/{user_id}/image"));
                self.http.get(url).bearer_auth(token)
            }
        };

        let resp = request.send().await?;
        let status = resp.status().as_u16();
        if status != 200 {
            return Err(PushError::UnexpectedStatus(status));
        }
        if resp
            .content_length()
            .is_some_and(|len| len > MAX_IMAGE_BYTES as u64)
        {
            return Err(PushError::Image("avatar too large".into()));
        }
        let bytes = resp.bytes().await?;
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(PushError::Image(format!(
                "avatar too large ({} bytes)",
                bytes.len()
            )));
        }

        let decoded = image::load_from_memory(&bytes)?.to_rgba8();
        Ok(circle_mask(&decoded))
    }
}

impl AvatarSource for AvatarFetcher {
    fn avatar(
        &self,
        server_url: &str,
        user_id: &str,
        override_url: Option<&str>,
    ) -> Option<RgbaImage> {
        // Called from the core actor thread, never from inside the runtime.
        match self
            .handle
            .block_on(self.fetch_avatar(server_url, user_id, override_url))
        {
            Ok(image) => Some(image),
            Err(e) => {
                tracing::debug!(%e, user_id, "avatar unavailable");
                None
            }
        }
    }
}

/// Keeps the source pixels inside the ellipse inscribed in the image bounds
/// and clears everything outside it. Edge pixels get partial alpha.
pub fn circle_mask(src: &RgbaImage) -> RgbaImage {
    let (width, height) = src.dimensions();
    let mut out = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 0]));
    if width == 0 || height == 0 {
        return out;
    }

    let rx = width as f32 / 2.0;
    let ry = height as f32 / 2.0;
    let samples = MASK_SUBSAMPLES * MASK_SUBSAMPLES;

    for (x, y, pixel) in src.enumerate_pixels() {
        let mut inside = 0u32;
        for sy in 0..MASK_SUBSAMPLES {
            for sx in 0..MASK_SUBSAMPLES {
                let px = x as f32 + (sx as f32 + 0.5) / MASK_SUBSAMPLES as f32;
                let py = y as f32 + (sy as f32 + 0.5) / MASK_SUBSAMPLES as f32;
                let nx = (px - rx) / rx;
                let ny = (py - ry) / ry;
                if nx * nx + ny * ny <= 1.0 {
                    inside += 1;
                }
            }
        }
        if inside == 0 {
            continue;
        }
        let Rgba([r, g, b, a]) = *pixel;
        let alpha = (u32::from(a) * inside / samples) as u8;
        out.put_pixel(x, y, Rgba([r, g, b, alpha]));
    }
    out
}
