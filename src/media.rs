//! Featured image handling: download, normalize to RGB PNG, upload.
//!
//! Each attempt owns two scoped resources:
//! - a [`tempfile::NamedTempFile`] holding the re-encoded PNG, removed on drop
//! - an [`FtpSession`] that sends `QUIT` on drop, swallowing its own errors
//!
//! The whole attempt is wrapped in the shared [`RetryPolicy`]; only transport
//! and file-store errors are retried.

use crate::error::{FileStoreError, MediaError};
use crate::http::fetch_bytes;
use crate::retry::RetryPolicy;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use image::ImageFormat;
use std::fs::File;
use std::path::{Path, PathBuf};
use suppaftp::FtpStream;
use suppaftp::types::FileType;
use tracing::{debug, info, instrument, warn};

const UPLOAD_EXTENSION: &str = "png";

/// Remote storage for uploaded images.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Store the file at `local` under `remote_name`.
    async fn upload(&self, local: &Path, remote_name: &str) -> Result<(), FileStoreError>;
}

#[derive(Debug, Clone)]
pub struct FtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub upload_path: String,
}

/// An authenticated FTP control connection positioned in the upload dir.
struct FtpSession {
    stream: FtpStream,
}

impl FtpSession {
    fn open(config: &FtpConfig) -> Result<Self, FileStoreError> {
        let stream = FtpStream::connect((config.host.as_str(), config.port))?;
        // From here on, Drop disconnects even if login or cwd fails.
        let mut session = Self { stream };
        session.stream.login(&config.user, &config.password)?;
        session.stream.cwd(&config.upload_path)?;
        session.stream.transfer_type(FileType::Binary)?;
        Ok(session)
    }

    fn store(&mut self, local: &Path, remote_name: &str) -> Result<u64, FileStoreError> {
        let mut file = File::open(local)?;
        Ok(self.stream.put_file(remote_name, &mut file)?)
    }
}

impl Drop for FtpSession {
    fn drop(&mut self) {
        match self.stream.quit() {
            Ok(()) => debug!("FTP connection closed"),
            Err(e) => debug!(error = %e, "FTP quit failed; ignoring"),
        }
    }
}

/// [`FileStore`] backed by a plain FTP server.
#[derive(Debug, Clone)]
pub struct FtpFileStore {
    config: FtpConfig,
}

impl FtpFileStore {
    pub fn new(config: FtpConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl FileStore for FtpFileStore {
    #[instrument(level = "info", skip_all, fields(host = %self.config.host, %remote_name))]
    async fn upload(&self, local: &Path, remote_name: &str) -> Result<(), FileStoreError> {
        let config = self.config.clone();
        let local: PathBuf = local.to_path_buf();
        let remote = remote_name.to_string();

        let bytes = tokio::task::spawn_blocking(move || {
            let mut session = FtpSession::open(&config)?;
            session.store(&local, &remote)
        })
        .await??;

        info!(bytes, "Uploaded file");
        Ok(())
    }
}

/// `news_<UTC yyyymmdd_hhmmss>_<first 8 hex of md5(url)>.png`
///
/// The hash keeps two images fetched in the same second apart; it is not a
/// content hash.
pub fn upload_filename(image_url: &str, now: DateTime<Utc>) -> String {
    let digest = format!("{:x}", md5::compute(image_url.as_bytes()));
    format!(
        "news_{}_{}.{}",
        now.format("%Y%m%d_%H%M%S"),
        &digest[..8],
        UPLOAD_EXTENSION
    )
}

/// Decode arbitrary image bytes and write them to `dest` as 8-bit RGB PNG.
fn normalize_image(bytes: &[u8], dest: &Path) -> Result<(), MediaError> {
    let rgb = image::load_from_memory(bytes)?.to_rgb8();
    rgb.save_with_format(dest, ImageFormat::Png)?;
    Ok(())
}

pub struct MediaHandler {
    store: Box<dyn FileStore>,
    policy: RetryPolicy,
}

impl MediaHandler {
    pub fn new(store: Box<dyn FileStore>, policy: RetryPolicy) -> Self {
        Self { store, policy }
    }

    /// Download, normalize, and upload `image_url`; returns the uploaded
    /// filename.
    #[instrument(level = "info", skip_all, fields(%image_url))]
    pub async fn process(&self, image_url: &str) -> Result<String, MediaError> {
        let result = self
            .policy
            .run("image upload", || self.attempt(image_url), MediaError::is_transient)
            .await;

        if let Err(e) = &result {
            warn!(error = %e, "Image processing failed");
        }
        result
    }

    async fn attempt(&self, image_url: &str) -> Result<String, MediaError> {
        info!("Downloading image");
        let bytes = fetch_bytes(image_url).await?;

        let temp = tempfile::Builder::new()
            .prefix("news_")
            .suffix(".png")
            .tempfile()
            .map_err(MediaError::TempFile)?;
        debug!(path = %temp.path().display(), "Created temp file");

        normalize_image(&bytes, temp.path())?;

        let filename = upload_filename(image_url, Utc::now());
        self.store.upload(temp.path(), &filename).await?;
        info!(%filename, "Image uploaded");
        Ok(filename)
    }
}
