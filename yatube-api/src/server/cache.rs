//! Short-lived memo of rendered index pages.
//!
//! Entries are dropped when their time to live runs out or when [`IndexCache::clear`] is
//! called. Creating a post does neither, so a fresh post only shows up on the index once the
//! cached page has expired.

use axum::http::Uri;
use moka::future::Cache;
use std::{
    fmt::{Debug, Formatter},
    future::Future,
    sync::Arc,
    time::Duration,
};
use tracing::debug;
use yatube_common::model::{Id, user::UserMarker};

const INDEX_CACHE_CAPACITY: u64 = 1024;

pub type CachedHtml = Arc<str>;

#[derive(Clone)]
pub struct IndexCache {
    /// `None` when caching is switched off by a zero time to live.
    pages: Option<Cache<String, CachedHtml>>,
}

impl IndexCache {
    #[must_use]
    pub fn new(time_to_live: Duration) -> Self {
        let pages = (!time_to_live.is_zero()).then(|| {
            Cache::builder()
                .max_capacity(INDEX_CACHE_CAPACITY)
                .time_to_live(time_to_live)
                .build()
        });

        Self { pages }
    }

    /// Pages differ per viewer because the navigation shows who is logged in.
    #[must_use]
    pub fn key(viewer: Option<Id<UserMarker>>, uri: &Uri) -> String {
        let path = uri.path_and_query().map_or("/", |path| path.as_str());
        match viewer {
            Some(viewer) => format!("user:{viewer}:{path}"),
            None => format!("anonymous:{path}"),
        }
    }

    /// Returns the cached page for `key`, rendering and storing it on a miss.
    ///
    /// Failed renders are not cached.
    pub async fn get_or_render<F, E>(&self, key: String, render: F) -> Result<CachedHtml, E>
    where
        F: Future<Output = Result<String, E>>,
    {
        let Some(pages) = &self.pages else {
            return render.await.map(CachedHtml::from);
        };

        if let Some(page) = pages.get(&key).await {
            debug!(%key, "Index cache hit");
            return Ok(page);
        }

        debug!(%key, "Index cache miss");
        let page = CachedHtml::from(render.await?);
        pages.insert(key, page.clone()).await;

        Ok(page)
    }

    pub fn clear(&self) {
        if let Some(pages) = &self.pages {
            debug!("Clearing index cache");
            pages.invalidate_all();
        }
    }
}

impl Debug for IndexCache {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexCache")
            .field("enabled", &self.pages.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use crate::server::cache::IndexCache;
    use axum::http::Uri;
    use std::{convert::Infallible, time::Duration};
    use yatube_common::model::Id;

    fn render(text: &str) -> impl Future<Output = Result<String, Infallible>> + use<> {
        let text = text.to_owned();
        async move { Ok(text) }
    }

    #[tokio::test]
    async fn serves_stale_page_until_cleared() {
        let cache = IndexCache::new(Duration::from_secs(60));
        let key = IndexCache::key(None, &Uri::from_static("/"));

        let first = cache.get_or_render(key.clone(), render("old")).await.unwrap();
        let second = cache.get_or_render(key.clone(), render("new")).await.unwrap();
        assert_eq!(&*first, "old");
        assert_eq!(&*second, "old");

        cache.clear();
        let third = cache.get_or_render(key, render("new")).await.unwrap();
        assert_eq!(&*third, "new");
    }

    #[tokio::test]
    async fn zero_time_to_live_disables_caching() {
        let cache = IndexCache::new(Duration::ZERO);
        let key = IndexCache::key(None, &Uri::from_static("/"));

        cache.get_or_render(key.clone(), render("old")).await.unwrap();
        let page = cache.get_or_render(key, render("new")).await.unwrap();
        assert_eq!(&*page, "new");
    }

    #[tokio::test]
    async fn failed_renders_are_not_cached() {
        let cache = IndexCache::new(Duration::from_secs(60));
        let key = IndexCache::key(None, &Uri::from_static("/?page=2"));

        let failed = cache
            .get_or_render(key.clone(), async { Err::<String, _>("boom") })
            .await;
        assert_eq!(failed, Err("boom"));

        let page = cache
            .get_or_render(key, async { Ok::<_, &str>("fine".to_owned()) })
            .await
            .unwrap();
        assert_eq!(&*page, "fine");
    }

    #[test]
    fn keys_separate_viewers_and_pages() {
        let index = Uri::from_static("/");
        let second_page = Uri::from_static("/?page=2");

        assert_eq!(IndexCache::key(None, &index), "anonymous:/");
        assert_eq!(IndexCache::key(Some(Id::new(4)), &index), "user:4:/");
        assert_ne!(
            IndexCache::key(None, &index),
            IndexCache::key(None, &second_page)
        );
    }
}
