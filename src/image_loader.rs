//! Reads a user-chosen image file off the UI path and encodes it as a
//! `data:` URI.
//!
//! Loads run on spawned tokio tasks and report back through a channel. Each
//! load is tagged with a generation number; only a result carrying the most
//! recent generation is accepted, so a slow first read can never overwrite
//! a faster second one.

use crate::config::ImageConfig;
use crate::gratitude_entry::EncodedImage;
use base64::engine::general_purpose::STANDARD as B64_ENGINE;
use base64::Engine;
use std::{
    future::Future,
    path::{Path, PathBuf},
    time::Duration,
};
use thiserror::Error;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum ImageLoadError {
    #[error("could not read file: {0}")]
    Io(#[from] std::io::Error),
    #[error("reading the file took longer than {0:?}")]
    TimedOut(Duration),
    #[error("file is {size} bytes, the limit is {limit}")]
    TooLarge { size: u64, limit: u64 },
    #[error("file is empty")]
    Empty,
    #[error("file is not a recognised image")]
    NotAnImage,
}

/// Completion message sent by a load task.
#[derive(Debug)]
pub struct ImageLoaded {
    pub generation: u64,
    pub outcome: Result<EncodedImage, ImageLoadError>,
}

#[derive(Debug)]
pub enum LoadResolution {
    Ready(EncodedImage),
    Failed(ImageLoadError),
    /// A newer load (or an invalidation) happened after this one started.
    Stale,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    pub generation: u64,
    pub path: PathBuf,
}

pub struct ImageLoader {
    tx: UnboundedSender<ImageLoaded>,
    generation: u64,
    pending: bool,
    timeout: Duration,
    max_bytes: u64,
}

impl ImageLoader {
    pub fn new(config: &ImageConfig) -> (Self, UnboundedReceiver<ImageLoaded>) {
        let (tx, rx) = unbounded_channel();
        let loader = ImageLoader {
            tx,
            generation: 0,
            pending: false,
            timeout: config.load_timeout(),
            max_bytes: config.max_bytes,
        };
        (loader, rx)
    }

    /// Starts reading `path` in the background. `None` does nothing.
    ///
    /// Must be called from within a tokio runtime.
    pub fn load(&mut self, path: Option<PathBuf>) -> Option<LoadTicket> {
        let path = path?;
        let read = read_and_encode(path.clone(), self.max_bytes);
        Some(self.start(path, read))
    }

    /// Runs `read` under the load timeout as the newest generation.
    pub(crate) fn start<F>(&mut self, path: PathBuf, read: F) -> LoadTicket
    where
        F: Future<Output = Result<EncodedImage, ImageLoadError>> + Send + 'static,
    {
        self.generation += 1;
        self.pending = true;

        let generation = self.generation;
        let tx = self.tx.clone();
        let timeout = self.timeout;

        info!(generation, path = %path.display(), "loading image");
        tokio::spawn(async move {
            let outcome = with_timeout(timeout, read).await;
            if tx.send(ImageLoaded { generation, outcome }).is_err() {
                debug!(generation, "image loaded after the receiver was dropped");
            }
        });

        LoadTicket { generation, path }
    }

    #[cfg(test)]
    pub fn with_load_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Makes every in-flight load stale without starting a new one.
    pub fn invalidate(&mut self) {
        if self.pending {
            debug!(generation = self.generation, "discarding in-flight image load");
        }
        self.generation += 1;
        self.pending = false;
    }

    pub fn resolve(&mut self, loaded: ImageLoaded) -> LoadResolution {
        if loaded.generation != self.generation {
            debug!(
                generation = loaded.generation,
                current = self.generation,
                "ignoring stale image load"
            );
            return LoadResolution::Stale;
        }

        self.pending = false;
        match loaded.outcome {
            Ok(image) => {
                info!(
                    generation = loaded.generation,
                    image = %image.summary(),
                    encoded_len = image.data_uri().len(),
                    "image ready"
                );
                LoadResolution::Ready(image)
            }
            Err(e) => {
                warn!(generation = loaded.generation, error = %e, "image load failed");
                LoadResolution::Failed(e)
            }
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    #[cfg(test)]
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

async fn with_timeout<F>(timeout: Duration, read: F) -> Result<EncodedImage, ImageLoadError>
where
    F: Future<Output = Result<EncodedImage, ImageLoadError>>,
{
    tokio::time::timeout(timeout, read)
        .await
        .map_err(|_| ImageLoadError::TimedOut(timeout))?
}

async fn read_and_encode(path: PathBuf, max_bytes: u64) -> Result<EncodedImage, ImageLoadError> {
    let size = tokio::fs::metadata(&path).await?.len();
    if size > max_bytes {
        return Err(ImageLoadError::TooLarge {
            size,
            limit: max_bytes,
        });
    }

    let bytes = tokio::fs::read(&path).await?;
    // The file may have grown between the two calls.
    if bytes.len() as u64 > max_bytes {
        return Err(ImageLoadError::TooLarge {
            size: bytes.len() as u64,
            limit: max_bytes,
        });
    }

    encode(&path, &bytes)
}

pub fn encode(path: &Path, bytes: &[u8]) -> Result<EncodedImage, ImageLoadError> {
    if bytes.is_empty() {
        return Err(ImageLoadError::Empty);
    }
    let media_type = sniff_media_type(bytes)
        .or_else(|| media_type_from_extension(path))
        .ok_or(ImageLoadError::NotAnImage)?;

    Ok(EncodedImage::new(
        media_type,
        &B64_ENGINE.encode(bytes),
        bytes.len(),
    ))
}

fn sniff_media_type(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        Some("image/png")
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some("image/gif")
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some("image/webp")
    } else if is_bmp(bytes) {
        Some("image/bmp")
    } else if is_ico(bytes) {
        Some("image/x-icon")
    } else {
        None
    }
}

/// `BM`, zeroed reserved fields and a DIB header size that some BMP
/// version actually uses.
fn is_bmp(bytes: &[u8]) -> bool {
    if bytes.len() < 26 || !bytes.starts_with(b"BM") || bytes[6..10].iter().any(|&b| b != 0) {
        return false;
    }
    let dib_size = u32::from_le_bytes([bytes[14], bytes[15], bytes[16], bytes[17]]);
    matches!(dib_size, 12 | 40 | 52 | 56 | 64 | 108 | 124)
}

/// ICONDIR with type 1 and at least one image.
fn is_ico(bytes: &[u8]) -> bool {
    bytes.len() >= 6
        && bytes.starts_with(&[0x00, 0x00, 0x01, 0x00])
        && u16::from_le_bytes([bytes[4], bytes[5]]) > 0
}

fn media_type_from_extension(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "bmp" => Some("image/bmp"),
        "ico" => Some("image/x-icon"),
        "svg" => Some("image/svg+xml"),
        "avif" => Some("image/avif"),
        "heic" => Some("image/heic"),
        "heif" => Some("image/heif"),
        "tif" | "tiff" => Some("image/tiff"),
        _ => None,
    }
}
