//! Static asset upload into a storage bucket.

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt, stream};
use reqwest::Method;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

use super::client::{Api, Body, PlatformClient};
use super::traits::StaticUploader;
use super::types::UploadSummary;
use crate::error::{EdgeDeployError, Result};

/// Files transferred concurrently.
pub const UPLOAD_CONCURRENCY: usize = 4;

/// Uploads a directory tree through the storage API.
#[derive(Debug, Clone)]
pub struct StorageUploader {
    /// Transport.
    client: PlatformClient,
    /// Files in flight at once.
    concurrency: usize,
}

impl StorageUploader {
    /// Creates an uploader with the default concurrency.
    #[must_use]
    pub const fn new(client: PlatformClient) -> Self {
        Self {
            client,
            concurrency: UPLOAD_CONCURRENCY,
        }
    }

    async fn upload_file(&self, bucket: &str, root: &Path, file: PathBuf) -> Result<u64> {
        let key = object_key(root, &file)?;
        let data = tokio::fs::read(&file).await?;
        let size = data.len() as u64;

        debug!("Uploading {} -> {bucket}/{key}", file.display());
        self.client
            .send_unit(
                Method::POST,
                Api::Storage,
                &object_path(bucket, &key),
                Some(Body::Bytes {
                    data,
                    content_type: content_type(&file).to_string(),
                }),
            )
            .await?;

        Ok(size)
    }
}

#[async_trait]
impl StaticUploader for StorageUploader {
    async fn upload_dir(&self, bucket: &str, dir: &Path) -> Result<UploadSummary> {
        let files = collect_files(dir)?;
        info!("Uploading {} static files to bucket '{bucket}'", files.len());

        let sizes: Vec<u64> = stream::iter(files)
            .map(|file| self.upload_file(bucket, dir, file))
            .buffer_unordered(self.concurrency)
            .try_collect()
            .await?;

        Ok(UploadSummary {
            files: sizes.len(),
            bytes: sizes.iter().sum(),
        })
    }
}

/// Lists regular files under `dir`, sorted for stable ordering.
///
/// An unreadable entry fails the listing so no file is silently left out.
pub(crate) fn collect_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1) {
        let entry = entry.map_err(std::io::Error::from)?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

/// Request path of an object, each segment percent-encoded.
fn object_path(bucket: &str, key: &str) -> String {
    let key = key
        .split('/')
        .map(urlencoding::encode)
        .collect::<Vec<_>>()
        .join("/");
    format!("storage/buckets/{}/objects/{key}", urlencoding::encode(bucket))
}

/// Object key for a file: its path relative to the upload root, `/`-separated.
fn object_key(root: &Path, file: &Path) -> Result<String> {
    let relative = file.strip_prefix(root).map_err(|_| {
        EdgeDeployError::internal(format!(
            "{} is not under {}",
            file.display(),
            root.display()
        ))
    })?;

    Ok(relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/"))
}

/// Content type by file extension.
fn content_type(file: &Path) -> &'static str {
    let ext = file
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        Some("html" | "htm") => "text/html",
        Some("css") => "text/css",
        Some("js" | "mjs") => "application/javascript",
        Some("json" | "map") => "application/json",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("ico") => "image/x-icon",
        Some("txt") => "text/plain",
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("wasm") => "application/wasm",
        _ => "application/octet-stream",
    }
}
