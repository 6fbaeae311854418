use anyhow::Context;
use bytes::Bytes;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::state::AppState;

/// Image formats accepted for recipe uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
    Webp,
}

impl ImageFormat {
    /// Detects the format from the file's magic bytes; the declared content type is ignored.
    pub fn sniff(data: &[u8]) -> Option<Self> {
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(ImageFormat::Jpeg)
        } else if data.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
            Some(ImageFormat::Png)
        } else if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
            Some(ImageFormat::Gif)
        } else if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
            Some(ImageFormat::Webp)
        } else {
            None
        }
    }

    pub fn ext(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Png => "png",
            ImageFormat::Gif => "gif",
            ImageFormat::Webp => "webp",
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
            ImageFormat::Gif => "image/gif",
            ImageFormat::Webp => "image/webp",
        }
    }
}

pub fn object_key(user_id: Uuid, recipe_id: i64, format: ImageFormat) -> String {
    format!("recipes/{}/{}-{}.{}", user_id, recipe_id, Uuid::new_v4(), format.ext())
}

/// Puts the image in the bucket and returns its key.
pub async fn store_recipe_image(
    st: &AppState,
    user_id: Uuid,
    recipe_id: i64,
    format: ImageFormat,
    body: Bytes,
) -> anyhow::Result<String> {
    let key = object_key(user_id, recipe_id, format);
    st.storage
        .put_object(&key, body, format.mime())
        .await
        .with_context(|| format!("put_object {}", key))?;
    debug!(key = %key, "recipe image stored");
    Ok(key)
}

/// Best effort; a failed delete only leaves an orphaned object behind.
pub async fn discard(st: &AppState, key: &str) {
    if let Err(e) = st.storage.delete_object(key).await {
        warn!(error = %e, key = %key, "failed to delete recipe image");
    }
}

pub async fn presign(st: &AppState, key: Option<&str>) -> anyhow::Result<Option<String>> {
    let Some(key) = key else { return Ok(None) };
    let url = st
        .storage
        .presign_get(key, st.config.storage.url_ttl_secs)
        .await
        .with_context(|| format!("presign url for key {}", key))?;
    Ok(Some(url))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_HEADER: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0];

    #[test]
    fn sniff_known_formats() {
        assert_eq!(ImageFormat::sniff(&[0xFF, 0xD8, 0xFF, 0xE0, 0x00]), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::sniff(PNG_HEADER), Some(ImageFormat::Png));
        assert_eq!(ImageFormat::sniff(b"GIF89a...."), Some(ImageFormat::Gif));
        assert_eq!(ImageFormat::sniff(b"RIFF\x10\x00\x00\x00WEBPVP8 "), Some(ImageFormat::Webp));
    }

    #[test]
    fn sniff_rejects_non_images() {
        assert_eq!(ImageFormat::sniff(b"notanimage"), None);
        assert_eq!(ImageFormat::sniff(b"%PDF-1.7"), None);
        assert_eq!(ImageFormat::sniff(b"RIFF"), None);
        assert_eq!(ImageFormat::sniff(&[]), None);
    }

    #[test]
    fn object_keys_are_scoped_and_unique() {
        let user = Uuid::new_v4();
        let a = object_key(user, 7, ImageFormat::Png);
        let b = object_key(user, 7, ImageFormat::Png);
        assert!(a.starts_with(&format!("recipes/{user}/7-")));
        assert!(a.ends_with(".png"));
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn presign_uses_storage() {
        let state = AppState::fake();
        assert_eq!(presign(&state, None).await.unwrap(), None);
        let url = presign(&state, Some("recipes/x/1.png")).await.unwrap().unwrap();
        assert!(url.contains("recipes/x/1.png"));
    }
}
