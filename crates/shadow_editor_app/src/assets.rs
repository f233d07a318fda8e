// SPDX-License-Identifier: MIT OR Apache-2.0
//! Asynchronous asset loading.
//!
//! Commands that depend on an external asset (a texture image, a model from
//! the asset server) are not built until the asset has arrived. A
//! [`PendingCommand`] couples the in-flight load with the code that turns the
//! loaded bytes into a command; the editor awaits the load and only then
//! touches the scene. Dropping a pending command abandons the load and
//! leaves the document and its history untouched.

use crate::commands::{Command, CommandError, EditorContext};
use crate::resources::Texture;
use crate::scene::Subtree;
use crate::serialization::object::tree_from_record;
use crate::serialization::{as_record, Warnings};
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// Broad asset category, guessed from the file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    /// Image used as a texture
    Texture,
    /// Serialized scene subtree
    Model,
    /// Script source
    Script,
    /// Audio clip
    Audio,
    /// Anything else
    Other,
}

impl AssetKind {
    /// Guess the kind from a URL or path
    pub fn from_url(url: &str) -> Self {
        let extension = Path::new(url)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        match extension.as_str() {
            "png" | "jpg" | "jpeg" | "gif" | "bmp" | "tga" | "hdr" | "dds" | "ktx" => Self::Texture,
            "json" | "object" => Self::Model,
            "js" | "glsl" | "vert" | "frag" => Self::Script,
            "mp3" | "ogg" | "wav" => Self::Audio,
            _ => Self::Other,
        }
    }
}

/// A request for one asset
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssetRequest {
    /// URL or path relative to the loader's root
    pub url: String,
    /// Expected kind
    pub kind: AssetKind,
}

impl AssetRequest {
    /// Request `url`, guessing its kind
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        let kind = AssetKind::from_url(&url);
        Self { url, kind }
    }

    /// Request `url` as a specific kind
    pub fn with_kind(url: impl Into<String>, kind: AssetKind) -> Self {
        Self { url: url.into(), kind }
    }
}

/// Asset loading errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum AssetError {
    /// Nothing at the requested location
    #[error("Asset not found: {0}")]
    NotFound(String),

    /// URL escapes the loader root or is otherwise unusable
    #[error("Invalid asset path: {0}")]
    InvalidPath(String),

    /// Bytes arrived but are not what the request expected
    #[error("Failed to decode {url}: {reason}")]
    Decode {
        /// Requested URL
        url: String,
        /// Decoder message
        reason: String,
    },

    /// Read failure
    #[error("IO error reading {url}: {message}")]
    Io {
        /// Requested URL
        url: String,
        /// OS message
        message: String,
    },
}

/// A loaded asset
#[derive(Clone, PartialEq)]
pub struct LoadedAsset {
    /// The request this answers
    pub request: AssetRequest,
    /// Raw content
    pub bytes: Arc<[u8]>,
}

impl fmt::Debug for LoadedAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedAsset")
            .field("request", &self.request)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl LoadedAsset {
    fn decode_error(&self, reason: impl Into<String>) -> AssetError {
        AssetError::Decode {
            url: self.request.url.clone(),
            reason: reason.into(),
        }
    }

    /// Content as UTF-8 text
    pub fn text(&self) -> Result<&str, AssetError> {
        std::str::from_utf8(&self.bytes).map_err(|e| self.decode_error(e.to_string()))
    }

    /// A texture record pointing at this asset
    pub fn texture(&self, name: impl Into<String>) -> Texture {
        Texture::new(name, self.request.url.clone())
    }

    /// Parse a serialized node tree
    ///
    /// Model assets are strict: any skipped record fails the whole parse.
    pub fn subtree(&self) -> Result<Subtree, AssetError> {
        let value: serde_json::Value =
            serde_json::from_slice(&self.bytes).map_err(|e| self.decode_error(e.to_string()))?;
        let record = as_record("model", &value).map_err(|e| self.decode_error(e.to_string()))?;
        let mut warnings = Warnings::new();
        let nodes = tree_from_record(record, &mut warnings).map_err(|e| self.decode_error(e.to_string()))?;
        warnings
            .into_strict()
            .map_err(|e| self.decode_error(e.to_string()))?;
        Subtree::from_nodes(nodes).ok_or_else(|| self.decode_error("empty model"))
    }
}

/// Source of asset bytes
pub trait AssetLoader: Send + Sync {
    /// Start loading; the returned future settles once
    fn load(&self, request: AssetRequest) -> BoxFuture<'_, Result<LoadedAsset, AssetError>>;
}

/// Loads assets from a directory with an in-memory cache
#[derive(Debug, Clone)]
pub struct FileAssetLoader {
    root: PathBuf,
    cache: Arc<RwLock<HashMap<String, Arc<[u8]>>>>,
}

impl FileAssetLoader {
    /// Serve assets found under `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Directory assets are read from
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of cached assets
    pub fn cached_count(&self) -> usize {
        self.cache.read().len()
    }

    /// Drop every cached asset
    pub fn clear_cache(&self) {
        self.cache.write().clear();
    }

    fn resolve(&self, url: &str) -> Result<PathBuf, AssetError> {
        let relative = Path::new(url.trim_start_matches('/'));
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if url.is_empty() || escapes {
            return Err(AssetError::InvalidPath(url.to_string()));
        }
        Ok(self.root.join(relative))
    }

    async fn read(&self, request: AssetRequest) -> Result<LoadedAsset, AssetError> {
        let key = request.url.trim_start_matches('/').to_string();
        let cached = self.cache.read().get(&key).cloned();
        if let Some(bytes) = cached {
            tracing::trace!("Asset cache hit: {}", request.url);
            return Ok(LoadedAsset { request, bytes });
        }

        let path = self.resolve(&request.url)?;
        let bytes: Arc<[u8]> = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes.into(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AssetError::NotFound(request.url));
            }
            Err(e) => {
                return Err(AssetError::Io {
                    url: request.url,
                    message: e.to_string(),
                });
            }
        };
        tracing::debug!("Loaded asset {} ({} bytes)", request.url, bytes.len());
        self.cache.write().insert(key, bytes.clone());
        Ok(LoadedAsset { request, bytes })
    }
}

impl AssetLoader for FileAssetLoader {
    fn load(&self, request: AssetRequest) -> BoxFuture<'_, Result<LoadedAsset, AssetError>> {
        self.read(request).boxed()
    }
}

type BuildCommand<'a> =
    Box<dyn FnOnce(LoadedAsset, &EditorContext) -> Result<Command, CommandError> + Send + 'a>;

/// A command waiting for the asset it is built from
pub struct PendingCommand<'a> {
    pub(crate) load: BoxFuture<'a, Result<LoadedAsset, AssetError>>,
    pub(crate) build: BuildCommand<'a>,
}

impl<'a> PendingCommand<'a> {
    /// Wait for `load`, then build the command from the loaded asset
    pub fn new(
        load: BoxFuture<'a, Result<LoadedAsset, AssetError>>,
        build: impl FnOnce(LoadedAsset, &EditorContext) -> Result<Command, CommandError> + Send + 'a,
    ) -> Self {
        Self {
            load,
            build: Box::new(build),
        }
    }

    /// Start loading `request` from `loader`
    pub fn from_loader(
        loader: &'a dyn AssetLoader,
        request: AssetRequest,
        build: impl FnOnce(LoadedAsset, &EditorContext) -> Result<Command, CommandError> + Send + 'a,
    ) -> Self {
        Self::new(loader.load(request), build)
    }
}

impl fmt::Debug for PendingCommand<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingCommand").finish_non_exhaustive()
    }
}
