//! Shared collaborators of extractors and searches.

use crate::cache::{GzipFileCache, NullCache, PageCache};
use crate::config::ChannelRegistry;
use crate::transport::{ReqwestTransport, Transport};
use std::error::Error;
use std::fmt;
use std::path::PathBuf;
use tracing::info;

/// Transport, page cache and channel registry, constructed once at process
/// start and lent to every [`NewsSoup`](crate::NewsSoup) and
/// [`NewsSearch`](crate::NewsSearch).
///
/// Logging goes through the process-wide `tracing` subscriber.
pub struct ClientContext<T> {
    transport: T,
    cache: Box<dyn PageCache + Send + Sync>,
    channels: ChannelRegistry,
}

impl<T: Transport> ClientContext<T> {
    pub fn new(
        transport: T,
        cache: Box<dyn PageCache + Send + Sync>,
        channels: ChannelRegistry,
    ) -> Self {
        Self {
            transport,
            cache,
            channels,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn cache(&self) -> &dyn PageCache {
        self.cache.as_ref()
    }

    pub fn channels(&self) -> &ChannelRegistry {
        &self.channels
    }
}

/// Options for [`ClientContext::from_options`].
#[derive(Debug, Clone, Default)]
pub struct ContextOptions {
    /// Replacement channel configuration document.
    pub channels_path: Option<PathBuf>,
    /// Cache directory; `~/.twnews/cache` when unset.
    pub cache_dir: Option<PathBuf>,
    pub no_cache: bool,
}

impl ClientContext<ReqwestTransport> {
    /// Live HTTP transport, gzip file cache and the configured channels.
    pub fn from_options(options: &ContextOptions) -> Result<Self, Box<dyn Error>> {
        let channels = match &options.channels_path {
            Some(path) => ChannelRegistry::from_path(path)?,
            None => ChannelRegistry::builtin()?,
        };

        let cache: Box<dyn PageCache + Send + Sync> = if options.no_cache {
            Box::new(NullCache)
        } else {
            let dir = options
                .cache_dir
                .clone()
                .or_else(GzipFileCache::default_dir)
                .ok_or("cannot determine home directory for the page cache")?;
            info!(dir = %dir.display(), "Using page cache");
            Box::new(GzipFileCache::new(dir)?)
        };

        Ok(Self::new(ReqwestTransport::new()?, cache, channels))
    }
}

impl<T> fmt::Debug for ClientContext<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientContext")
            .field("channels", &self.channels.names().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_options_with_cache_dir() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ClientContext::from_options(&ContextOptions {
            channels_path: None,
            cache_dir: Some(dir.path().join("cache")),
            no_cache: false,
        })
        .unwrap();
        assert!(dir.path().join("cache").is_dir());
        assert!(ctx.channels().get("udn").is_some());
    }

    #[test]
    fn test_from_options_rejects_missing_channels_file() {
        let result = ClientContext::from_options(&ContextOptions {
            channels_path: Some(PathBuf::from("/nonexistent/channels.json")),
            cache_dir: None,
            no_cache: true,
        });
        assert!(result.is_err());
    }
}
