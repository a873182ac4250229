//! Preview frame extraction for video files.

use async_trait::async_trait;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Mutex;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, trace, warn};
use url::Url;

use crate::config::ThumbnailConfig;
use crate::models::FileId;
use crate::utils::ThumbnailError;

const MEMORY_CACHE_SIZE: usize = 256;

/// Where in the source to sample and how well to encode the result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThumbnailOptions {
    pub time_offset: Duration,
    pub quality: f32,
}

impl Default for ThumbnailOptions {
    fn default() -> Self {
        Self {
            time_offset: Duration::from_millis(1000),
            quality: 0.8,
        }
    }
}

impl From<&ThumbnailConfig> for ThumbnailOptions {
    fn from(config: &ThumbnailConfig) -> Self {
        Self {
            time_offset: config.time_offset(),
            quality: config.quality,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ThumbnailRequest {
    pub id: FileId,
    pub source_url: String,
    pub options: ThumbnailOptions,
}

#[async_trait]
pub trait ThumbnailGenerator: Send + Sync + std::fmt::Debug {
    /// Produce a preview image for the request and return its URI.
    async fn generate(&self, request: &ThumbnailRequest) -> Result<String, ThumbnailError>;
}

/// Extracts a single frame with the `ffmpeg` binary and stores it as
/// `<cache_dir>/<id>.jpg`.
pub struct FfmpegThumbnailGenerator {
    ffmpeg_path: String,
    cache_dir: PathBuf,
    generated: Mutex<LruCache<FileId, PathBuf>>,
}

impl std::fmt::Debug for FfmpegThumbnailGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FfmpegThumbnailGenerator")
            .field("ffmpeg_path", &self.ffmpeg_path)
            .field("cache_dir", &self.cache_dir)
            .finish()
    }
}

impl FfmpegThumbnailGenerator {
    pub fn new(ffmpeg_path: impl Into<String>, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            cache_dir: cache_dir.into(),
            generated: Mutex::new(LruCache::new(
                NonZeroUsize::new(MEMORY_CACHE_SIZE).unwrap_or(NonZeroUsize::MIN),
            )),
        }
    }

    pub fn from_config(config: &ThumbnailConfig) -> Self {
        Self::new(config.ffmpeg_path.clone(), config.resolved_cache_dir())
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn cache_path(&self, id: &FileId) -> PathBuf {
        self.cache_dir.join(format!("{}.jpg", file_stem(id)))
    }

    fn remembered(&self, id: &FileId) -> Option<PathBuf> {
        let mut generated = self.generated.lock().ok()?;
        generated.get(id).cloned()
    }

    fn remember(&self, id: &FileId, path: &Path) {
        if let Ok(mut generated) = self.generated.lock() {
            generated.put(id.clone(), path.to_path_buf());
        }
    }

    async fn run_ffmpeg(
        &self,
        request: &ThumbnailRequest,
        output: &Path,
    ) -> Result<(), ThumbnailError> {
        let offset = format_offset(request.options.time_offset);
        let quality = ffmpeg_quality(request.options.quality).to_string();

        trace!(
            "Running {} for {} at {} (q={})",
            self.ffmpeg_path, request.id, offset, quality
        );

        let result = Command::new(&self.ffmpeg_path)
            .args(["-hide_banner", "-loglevel", "error", "-y", "-ss"])
            .arg(&offset)
            .arg("-i")
            .arg(&request.source_url)
            .args(["-frames:v", "1", "-q:v"])
            .arg(&quality)
            .arg(output)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(ThumbnailError::Generation(format!(
                "ffmpeg exited with {}: {}",
                result.status,
                stderr.trim()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl ThumbnailGenerator for FfmpegThumbnailGenerator {
    async fn generate(&self, request: &ThumbnailRequest) -> Result<String, ThumbnailError> {
        if let Some(path) = self.remembered(&request.id)
            && path.exists()
        {
            return file_uri(&path);
        }

        let path = self.cache_path(&request.id);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            debug!("Reusing cached thumbnail for {}", request.id);
            self.remember(&request.id, &path);
            return file_uri(&path);
        }

        tokio::fs::create_dir_all(&self.cache_dir).await?;

        // Each run writes its own temp file and renames it into place, so a
        // killed ffmpeg never leaves a truncated file that later looks
        // cached, and overlapping runs for one id do not share a path.
        let partial = tempfile::Builder::new()
            .prefix(".thumb-")
            .suffix(".jpg")
            .tempfile_in(&self.cache_dir)?
            .into_temp_path();
        if let Err(e) = self.run_ffmpeg(request, &partial).await {
            warn!("Thumbnail for {} failed: {}", request.id, e);
            return Err(e);
        }
        partial
            .persist(&path)
            .map_err(|e| ThumbnailError::Io(e.error.to_string()))?;

        debug!("Generated thumbnail for {} at {:?}", request.id, path);
        self.remember(&request.id, &path);
        file_uri(&path)
    }
}

/// Maps 0.0..=1.0 onto ffmpeg's `-q:v` scale, where 2 is best and 31 worst.
pub fn ffmpeg_quality(quality: f32) -> u8 {
    let quality = if quality.is_nan() { 1.0 } else { quality.clamp(0.0, 1.0) };
    2 + ((1.0 - quality) * 29.0).round() as u8
}

fn format_offset(offset: Duration) -> String {
    format!("{}.{:03}", offset.as_secs(), offset.subsec_millis())
}

/// Ids are opaque server strings. Keep `[A-Za-z0-9-]` and write every
/// other byte as `_xx`, which keeps distinct ids on distinct files and
/// inside the cache dir.
fn file_stem(id: &FileId) -> String {
    let mut stem = String::with_capacity(id.as_str().len());
    for byte in id.as_str().bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            stem.push(byte as char);
        } else {
            stem.push_str(&format!("_{:02x}", byte));
        }
    }
    stem
}

fn file_uri(path: &Path) -> Result<String, ThumbnailError> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    Url::from_file_path(&absolute)
        .map(|url| url.to_string())
        .map_err(|_| ThumbnailError::Generation(format!("not a file path: {:?}", absolute)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn request(id: &str) -> ThumbnailRequest {
        ThumbnailRequest {
            id: FileId::new(id),
            source_url: "http://localhost:1/content/1".to_string(),
            options: ThumbnailOptions::default(),
        }
    }

    #[test]
    fn test_quality_mapping() {
        assert_eq!(ffmpeg_quality(1.0), 2);
        assert_eq!(ffmpeg_quality(0.0), 31);
        assert_eq!(ffmpeg_quality(0.8), 8);
        assert_eq!(ffmpeg_quality(7.0), 2);
        assert_eq!(ffmpeg_quality(-1.0), 31);
    }

    #[test]
    fn test_offset_formatting() {
        assert_eq!(format_offset(Duration::from_millis(1000)), "1.000");
        assert_eq!(format_offset(Duration::from_millis(61_250)), "61.250");
    }

    #[test]
    fn test_file_stem_is_sanitized() {
        assert_eq!(file_stem(&FileId::new("../etc/passwd")), "_2e_2e_2fetc_2fpasswd");
        assert_eq!(file_stem(&FileId::new("abc-12_3")), "abc-12_5f3");
        assert_eq!(file_stem(&FileId::new("clip 1")), "clip_201");
    }

    #[tokio::test]
    async fn test_existing_file_is_reused_without_ffmpeg() {
        let dir = TempDir::new().unwrap();
        let generator = FfmpegThumbnailGenerator::new("/nonexistent/ffmpeg", dir.path());
        std::fs::write(dir.path().join("7.jpg"), b"jpeg").unwrap();

        let uri = generator.generate(&request("7")).await.unwrap();
        assert!(uri.starts_with("file://"));
        assert!(uri.ends_with("/7.jpg"));
    }

    #[tokio::test]
    async fn test_missing_binary_is_an_error() {
        let dir = TempDir::new().unwrap();
        let generator = FfmpegThumbnailGenerator::new("/nonexistent/ffmpeg", dir.path());

        let err = generator.generate(&request("8")).await.unwrap_err();
        assert!(matches!(err, ThumbnailError::Io(_)));
        assert!(!dir.path().join("8.jpg").exists());
    }

    /// Stand-in for ffmpeg that writes its `-i` argument into the output
    /// file, so each cached image records which source produced it.
    #[cfg(unix)]
    fn fake_ffmpeg(dir: &Path) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let script = dir.join("fake-ffmpeg.sh");
        std::fs::write(
            &script,
            "#!/bin/sh\nfor last; do :; done\nwhile [ $# -gt 0 ]; do\n  if [ \"$1\" = \"-i\" ]; then src=\"$2\"; fi\n  shift\ndone\nprintf '%s' \"$src\" > \"$last\"\n",
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        script
    }

    #[cfg(unix)]
    fn source_request(id: &str) -> ThumbnailRequest {
        ThumbnailRequest {
            id: FileId::new(id),
            source_url: format!("http://s/content/{}", id),
            options: ThumbnailOptions::default(),
        }
    }

    #[cfg(unix)]
    fn read_uri(uri: &str) -> String {
        let path = Url::parse(uri).unwrap().to_file_path().unwrap();
        std::fs::read_to_string(path).unwrap()
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_similar_ids_get_separate_files() {
        let bin = TempDir::new().unwrap();
        let cache = TempDir::new().unwrap();
        let ffmpeg = fake_ffmpeg(bin.path());
        let generator =
            FfmpegThumbnailGenerator::new(ffmpeg.to_string_lossy().to_string(), cache.path());

        let mut uris = Vec::new();
        for id in ["a.b", "a_b", "a/b"] {
            let uri = generator.generate(&source_request(id)).await.unwrap();
            assert_eq!(read_uri(&uri), format!("http://s/content/{}", id));
            uris.push(uri);
        }
        uris.sort();
        uris.dedup();
        assert_eq!(uris.len(), 3);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_overlapping_runs_for_one_id_both_succeed() {
        let bin = TempDir::new().unwrap();
        let cache = TempDir::new().unwrap();
        let ffmpeg = fake_ffmpeg(bin.path());
        let generator =
            FfmpegThumbnailGenerator::new(ffmpeg.to_string_lossy().to_string(), cache.path());

        let request = source_request("5");
        let (first, second) = tokio::join!(generator.generate(&request), generator.generate(&request));
        assert_eq!(first.unwrap(), second.unwrap());

        // Only the final image is left behind
        let names: Vec<_> = std::fs::read_dir(cache.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["5.jpg"]);
    }
}
