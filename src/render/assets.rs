use async_trait::async_trait;
use image::DynamicImage;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use super::selector::{choose, Selector};
use crate::cache::IconCache;

pub const DEFAULT_ICON_BASE_URL: &str = "https://openweathermap.org/img/wn";

#[derive(Error, Debug)]
pub enum AssetLoadError {
    #[error("Invalid icon code: {0:?}")]
    InvalidIconCode(String),

    #[error("Failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Icon server returned {status} for {url}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode {reference}: {source}")]
    Decode {
        reference: String,
        #[source]
        source: image::ImageError,
    },

    #[error("Character gallery {0} has no PNG images")]
    EmptyGallery(String),
}

/// Bitmaps needed for one render
#[derive(Debug, Clone)]
pub struct RenderAssets {
    pub night_icon: Arc<DynamicImage>,
    pub day_icon: Arc<DynamicImage>,
    pub character: Arc<DynamicImage>,
}

/// Resolves icon codes and gallery paths into decoded bitmaps
#[async_trait]
pub trait AssetLoader: Send + Sync {
    async fn icon(&self, code: &str) -> Result<Arc<DynamicImage>, AssetLoadError>;

    async fn character(&self, path: &Path) -> Result<Arc<DynamicImage>, AssetLoadError>;
}

/// Where weather icons come from
#[derive(Debug, Clone)]
pub enum IconSource {
    /// `{base_url}/{code}@4x.png`
    Remote { base_url: String },
    /// `{dir}/{code}.png`, for offline icon sets
    Directory(PathBuf),
}

impl IconSource {
    pub fn remote(base_url: &str) -> Self {
        Self::Remote {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

/// OpenWeatherMap codes look like "10d"; anything else never reaches a URL or path
fn validate_icon_code(code: &str) -> Result<(), AssetLoadError> {
    if code.is_empty() || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(AssetLoadError::InvalidIconCode(code.to_string()));
    }
    Ok(())
}

fn decode(bytes: &[u8], reference: &str) -> Result<DynamicImage, AssetLoadError> {
    image::load_from_memory(bytes).map_err(|source| AssetLoadError::Decode {
        reference: reference.to_string(),
        source,
    })
}

async fn read_image(path: &Path) -> Result<DynamicImage, AssetLoadError> {
    let reference = path.display().to_string();
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| AssetLoadError::Read {
            path: reference.clone(),
            source,
        })?;
    decode(&bytes, &reference)
}

/// Default loader: icons over HTTP (or from disk) with caching, characters from disk
pub struct AssetService {
    client: Client,
    icons: IconSource,
    cache: IconCache,
}

impl AssetService {
    pub fn new(client: Client, icons: IconSource, cache: IconCache) -> Self {
        Self {
            client,
            icons,
            cache,
        }
    }

    async fn fetch_icon(&self, code: &str) -> Result<DynamicImage, AssetLoadError> {
        match &self.icons {
            IconSource::Remote { base_url } => {
                let url = format!("{}/{}@4x.png", base_url, code);
                tracing::debug!(url = %url, "Fetching weather icon");

                let response = self
                    .client
                    .get(&url)
                    .send()
                    .await
                    .map_err(|source| AssetLoadError::Fetch {
                        url: url.clone(),
                        source,
                    })?;

                let status = response.status();
                if !status.is_success() {
                    return Err(AssetLoadError::Status { url, status });
                }

                let bytes = response
                    .bytes()
                    .await
                    .map_err(|source| AssetLoadError::Fetch {
                        url: url.clone(),
                        source,
                    })?;
                decode(&bytes, &url)
            }
            IconSource::Directory(dir) => read_image(&dir.join(format!("{}.png", code))).await,
        }
    }
}

#[async_trait]
impl AssetLoader for AssetService {
    async fn icon(&self, code: &str) -> Result<Arc<DynamicImage>, AssetLoadError> {
        validate_icon_code(code)?;

        if let Some(cached) = self.cache.get(&code.to_string()) {
            tracing::debug!(code = %code, "Icon cache hit");
            return Ok(cached);
        }

        let icon = Arc::new(self.fetch_icon(code).await?);
        self.cache.insert(code.to_string(), Arc::clone(&icon));
        Ok(icon)
    }

    async fn character(&self, path: &Path) -> Result<Arc<DynamicImage>, AssetLoadError> {
        tracing::debug!(path = %path.display(), "Loading character image");
        read_image(path).await.map(Arc::new)
    }
}

/// The fixed set of character illustrations
#[derive(Debug, Clone)]
pub struct Gallery {
    dir: PathBuf,
    images: Vec<PathBuf>,
}

impl Gallery {
    /// Collect every `.png` in `dir`, sorted by file name
    pub fn scan(dir: impl Into<PathBuf>) -> Result<Self, AssetLoadError> {
        let dir = dir.into();
        let read_err = |source| AssetLoadError::Read {
            path: dir.display().to_string(),
            source,
        };

        let mut images = Vec::new();
        for entry in std::fs::read_dir(&dir).map_err(read_err)? {
            let path = entry.map_err(read_err)?.path();
            let is_png = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("png"));
            if is_png && path.is_file() {
                images.push(path);
            }
        }
        images.sort();

        tracing::debug!(dir = %dir.display(), count = images.len(), "Scanned character gallery");

        Ok(Self { dir, images })
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn pick(&self, selector: &dyn Selector) -> Result<&Path, AssetLoadError> {
        choose(selector, &self.images)
            .map(PathBuf::as_path)
            .ok_or_else(|| AssetLoadError::EmptyGallery(self.dir.display().to_string()))
    }
}
