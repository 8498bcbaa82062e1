//! Content-addressed page cache.
//!
//! Downloaded pages are stored gzip-compressed under
//! `<dir>/<channel>-<md5(path)>.<kind>.gz`, where `path` is the path and
//! query of the normalized URL. Two URLs differing only by scheme or host
//! alias therefore share one entry.

use md5::{Digest, Md5};
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

/// Stable cache key of one document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Key for `uri` (path + query) of a page on `channel`; `json` selects
    /// the payload kind so HTML and JSON entries never collide.
    pub fn new(channel: &str, uri: &str, json: bool) -> Self {
        let digest = Md5::digest(uri.as_bytes());
        let kind = if json { "json" } else { "html" };
        Self(format!("{}-{}.{}", channel, hex::encode(digest), kind))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_json(&self) -> bool {
        self.0.ends_with(".json")
    }
}

/// Storage for raw page text.
pub trait PageCache {
    fn has(&self, key: &CacheKey) -> bool;
    fn load(&self, key: &CacheKey) -> io::Result<String>;
    fn save(&self, key: &CacheKey, content: &str) -> io::Result<()>;
}

/// Gzip files in a single directory.
#[derive(Debug, Clone)]
pub struct GzipFileCache {
    dir: PathBuf,
}

impl GzipFileCache {
    /// Cache rooted at `dir`, created if missing.
    #[instrument(level = "debug", skip_all, fields(dir = %dir.as_ref().display()))]
    pub fn new(dir: impl AsRef<Path>) -> io::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.is_dir() {
            debug!("Creating cache directory");
            fs::create_dir_all(&dir)?;
        }
        Ok(Self { dir })
    }

    /// `~/.twnews/cache`
    pub fn default_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".twnews").join("cache"))
    }

    pub fn path_of(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(format!("{}.gz", key.as_str()))
    }
}

impl PageCache for GzipFileCache {
    fn has(&self, key: &CacheKey) -> bool {
        self.path_of(key).is_file()
    }

    fn load(&self, key: &CacheKey) -> io::Result<String> {
        read_gzip(&self.path_of(key))
    }

    fn save(&self, key: &CacheKey, content: &str) -> io::Result<()> {
        let path = self.path_of(key);
        let mut encoder = GzEncoder::new(File::create(&path)?, Compression::default());
        encoder.write_all(content.as_bytes())?;
        encoder.finish()?;
        debug!(path = %path.display(), "Wrote cache entry");
        Ok(())
    }
}

/// Cache that never hits and discards writes.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullCache;

impl PageCache for NullCache {
    fn has(&self, _key: &CacheKey) -> bool {
        false
    }

    fn load(&self, _key: &CacheKey) -> io::Result<String> {
        Err(io::Error::new(io::ErrorKind::NotFound, "cache disabled"))
    }

    fn save(&self, _key: &CacheKey, _content: &str) -> io::Result<()> {
        Ok(())
    }
}

/// Read a whole gzip file as UTF-8 text.
pub fn read_gzip(path: &Path) -> io::Result<String> {
    let mut text = String::new();
    GzDecoder::new(File::open(path)?).read_to_string(&mut text)?;
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_is_stable() {
        let a = CacheKey::new("appledaily", "/headline/daily/20181201/38194705/", false);
        let b = CacheKey::new("appledaily", "/headline/daily/20181201/38194705/", false);
        assert_eq!(a, b);
        assert_eq!(
            a.as_str(),
            "appledaily-ed33e11740a7c95cb0852827b91cd37d.html"
        );
    }

    #[test]
    fn test_cache_key_kind() {
        assert!(CacheKey::new("udn", "/api/more", true).is_json());
        assert!(!CacheKey::new("udn", "/api/more", true).as_str().ends_with(".html"));
    }

    #[test]
    fn test_gzip_cache_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = GzipFileCache::new(dir.path().join("nested")).unwrap();
        let key = CacheKey::new("ltn", "/news/society/breakingnews/2581807", false);

        assert!(!cache.has(&key));
        cache.save(&key, "<html>自由時報</html>").unwrap();
        assert!(cache.has(&key));
        assert!(cache.path_of(&key).to_string_lossy().ends_with(".html.gz"));
        assert_eq!(cache.load(&key).unwrap(), "<html>自由時報</html>");
    }

    #[test]
    fn test_null_cache_never_hits() {
        let key = CacheKey::new("cna", "/news/asoc/201810170077.aspx", false);
        NullCache.save(&key, "content").unwrap();
        assert!(!NullCache.has(&key));
        assert!(NullCache.load(&key).is_err());
    }
}
