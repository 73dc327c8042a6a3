//! Polite blocking HTTP fetcher with an optional on-disk HTML cache

use super::Fetch;
use crate::{PageKind, Result, ScraperConfig};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Why a page could not be retrieved
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("HTTP {status}: {url}")]
    Status { url: String, status: u16 },

    #[error("no cached copy of {url} (offline mode)")]
    Offline { url: String },

    #[error("could not read body of {url}: {message}")]
    Body { url: String, message: String },
}

/// On-disk copies of fetched pages, one subdirectory per page kind
///
/// Site pages are keyed by their trailing id (`events/<id>.html`); anything
/// else lands in `other/` under its flattened host and path.
#[derive(Debug, Clone)]
pub struct PageCache {
    root: PathBuf,
}

impl PageCache {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        PageCache {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn path_for(&self, url: &str) -> PathBuf {
        let parsed = Url::parse(url).ok();
        let id = parsed.as_ref().and_then(|u| {
            let segment = u.path_segments()?.rev().find(|s| !s.is_empty())?;
            Some(match u.query() {
                Some(query) => format!("{segment}_{query}"),
                None => segment.to_string(),
            })
        });

        match (PageKind::from_url(url), id) {
            (Some(kind), Some(id)) => self.root.join(kind.dir_name()).join(sanitize(&id) + ".html"),
            _ => {
                let flat = url.split_once("://").map_or(url, |(_, rest)| rest);
                self.root.join("other").join(sanitize(flat) + ".html")
            }
        }
    }

    pub fn load(&self, url: &str) -> Option<String> {
        let path = self.path_for(url);
        let html = std::fs::read_to_string(&path).ok()?;
        log::debug!("Cache hit {}", path.display());
        Some(html)
    }

    pub fn store(&self, url: &str, html: &str) -> std::io::Result<PathBuf> {
        let path = self.path_for(url);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, html)?;
        log::debug!("Cached {}", path.display());
        Ok(path)
    }
}

fn sanitize(key: &str) -> String {
    key.chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '-' | '.') { c } else { '_' })
        .collect()
}

/// Fetcher for the statistics site
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
    /// Pause after every network request
    delay: Duration,
    cache: Option<PageCache>,
    /// Serve only cached pages
    offline: bool,
}

impl HttpFetcher {
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(HttpFetcher {
            client,
            delay: Duration::from_millis(config.delay_ms),
            cache: config.cache_dir.as_ref().map(PageCache::new),
            offline: config.offline,
        })
    }

    pub fn with_cache(mut self, cache: PageCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Refuse network requests; every page must already be cached
    pub fn offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn download(&self, url: &str) -> std::result::Result<String, FetchError> {
        log::debug!("Fetching {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| FetchError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().map_err(|e| FetchError::Body {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, url: &str) -> std::result::Result<String, FetchError> {
        if let Some(html) = self.cache.as_ref().and_then(|cache| cache.load(url)) {
            return Ok(html);
        }

        if self.offline {
            return Err(FetchError::Offline {
                url: url.to_string(),
            });
        }

        let result = self.download(url);
        // rate limit applies to failed requests too
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }

        let html = result?;
        if let Some(cache) = &self.cache {
            if let Err(e) = cache.store(url, &html) {
                log::warn!("Failed to cache {}: {}", url, e);
            }
        }
        Ok(html)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Config;

    fn offline_fetcher(dir: &Path) -> HttpFetcher {
        HttpFetcher::new(&Config::default().scraper)
            .unwrap()
            .with_cache(PageCache::new(dir))
            .offline(true)
    }

    #[test]
    fn test_cache_paths_by_page_kind() {
        let cache = PageCache::new("cache");
        assert_eq!(
            cache.path_for("http://ufcstats.com/event-details/abc123"),
            Path::new("cache/events/abc123.html")
        );
        assert_eq!(
            cache.path_for("http://ufcstats.com/fighter-details/f9/"),
            Path::new("cache/fighters/f9.html")
        );
        assert_eq!(
            cache.path_for("http://ufcstats.com/fight-details/d1?x=1"),
            Path::new("cache/fights/d1_x_1.html")
        );
        assert_eq!(
            cache.path_for("http://ufcstats.com/statistics/events"),
            Path::new("cache/other/ufcstats.com_statistics_events.html")
        );
    }

    #[test]
    fn test_offline_serves_cache_only() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = offline_fetcher(dir.path());
        let url = "http://ufcstats.com/event-details/abc";

        let err = fetcher.fetch(url).unwrap_err();
        assert_eq!(err, FetchError::Offline { url: url.to_string() });

        let path = PageCache::new(dir.path())
            .store(url, "<html>cached</html>")
            .unwrap();
        assert!(path.ends_with("events/abc.html"));
        assert_eq!(fetcher.fetch(url).unwrap(), "<html>cached</html>");
    }
}
