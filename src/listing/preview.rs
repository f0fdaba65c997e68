//! Revocable preview handles for locally selected images.
//!
//! A [`PreviewStore`] hands out [`PreviewHandle`]s and tracks which are live,
//! the same way a browser tracks object URLs. Each handle is revoked exactly
//! once: explicitly through [`PreviewHandle::release`], or when dropped.

use crate::api::ImageFile;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex};
use tokio::task::JoinError;
use tracing::trace;

#[derive(Debug, Default)]
struct Registry {
    next_id: u64,
    live: HashSet<u64>,
}

/// Issues preview handles and counts the ones not yet revoked
#[derive(Debug, Clone, Default)]
pub struct PreviewStore {
    registry: Arc<Mutex<Registry>>,
}

impl PreviewStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive a displayable preview for `image`. Encoding runs on the
    /// blocking pool so large images don't stall the executor.
    pub async fn create(&self, image: &ImageFile) -> Result<PreviewHandle, JoinError> {
        let bytes = image.bytes.clone();
        let media_type = image.media_type.clone();
        let url = tokio::task::spawn_blocking(move || {
            format!("data:{};base64,{}", media_type, STANDARD.encode(bytes))
        })
        .await?;

        let id = {
            let mut registry = self.registry.lock().unwrap_or_else(|e| e.into_inner());
            registry.next_id += 1;
            let id = registry.next_id;
            registry.live.insert(id);
            id
        };
        trace!("Created preview {} for {}", id, image.file_name);

        Ok(PreviewHandle {
            id,
            url,
            registry: Arc::clone(&self.registry),
            revoked: false,
        })
    }

    /// Number of handles issued and not yet revoked
    pub fn live(&self) -> usize {
        self.registry
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .live
            .len()
    }
}

/// A live preview of a local image
pub struct PreviewHandle {
    id: u64,
    url: String,
    registry: Arc<Mutex<Registry>>,
    revoked: bool,
}

impl PreviewHandle {
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn release(mut self) {
        self.revoke();
    }

    fn revoke(&mut self) {
        if self.revoked {
            return;
        }
        self.revoked = true;
        self.registry
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .live
            .remove(&self.id);
        trace!("Revoked preview {}", self.id);
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        self.revoke();
    }
}

impl fmt::Debug for PreviewHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreviewHandle")
            .field("id", &self.id)
            .field("url_len", &self.url.len())
            .finish()
    }
}

/// What the image slot of a draft currently shows
#[derive(Debug, Default)]
pub enum Preview {
    #[default]
    None,
    /// Existing image on the backend, already resolved to a full URL
    Remote(String),
    /// Freshly selected local image
    Local(PreviewHandle),
}

impl Preview {
    pub fn url(&self) -> Option<&str> {
        match self {
            Preview::None => None,
            Preview::Remote(url) => Some(url),
            Preview::Local(handle) => Some(handle.url()),
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Preview::Local(_))
    }

    /// Revoke a local handle, leaving `Preview::None`
    pub fn release(&mut self) {
        if let Preview::Local(handle) = std::mem::take(self) {
            handle.release();
        }
    }
}
