use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use crate::cache::{CacheError, CacheStore};
use crate::data_models::{Post, PostsHolder};
use crate::fetcher::RefreshOutcome;

/// Produce the authoritative post corpus for this worker session:
/// read the cache, attempt one conditional refresh with the cached
/// freshness marker, and fall back to whatever is already local when
/// the network cannot help.
///
/// A refreshed payload that does not parse fails the whole load; no
/// partial or stale corpus is served in its place, since a corrupt
/// corpus cannot be trusted for query correctness.
pub async fn load_blog_posts<F, Fut>(cache: &CacheStore, fetch_refresh: F) -> Result<Vec<Post>>
where
    F: FnOnce(Option<String>) -> Fut,
    Fut: Future<Output = RefreshOutcome>,
{
    let (cached, marker) = match cache.read() {
        Ok(snapshot) => snapshot,
        Err(CacheError::Unavailable(reason)) => {
            log::warn!("cache storage unavailable ({reason}); starting from an empty corpus");
            (None, None)
        }
        Err(err) => return Err(err).context("reading cached posts"),
    };

    match fetch_refresh(marker).await {
        RefreshOutcome::NotModified => {
            log::info!("posts dataset not modified; cached corpus is current");
            Ok(cached.unwrap_or_default())
        }
        RefreshOutcome::Failed { code, message } => {
            log::warn!("posts refresh failed ({code}): {message}; serving cached corpus");
            Ok(cached.unwrap_or_default())
        }
        RefreshOutcome::Refreshed {
            payload,
            last_modified,
        } => {
            let holder: PostsHolder =
                serde_json::from_str(&payload).context("malformed posts payload from refresh")?;

            // Posts and marker go down together; losing the write only
            // costs a re-fetch on the next load.
            if let Err(err) = cache.write(&holder.posts, last_modified.as_deref()) {
                log::warn!("failed to persist refreshed posts: {err}");
            }

            log::info!("posts dataset refreshed: {} posts", holder.posts.len());
            Ok(holder.posts)
        }
    }
}

/// Filter a loaded corpus down to publishable posts. Evaluated once at
/// load time; posts that become publishable later are picked up on the
/// next load, not retroactively.
pub fn keep_publishable(posts: Vec<Post>, before: DateTime<Utc>) -> Vec<Post> {
    posts
        .into_iter()
        .filter(|post| post.is_publishable(before))
        .collect()
}
