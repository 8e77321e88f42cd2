use anyhow::Result;

use quill::cache::CacheStore;
use quill::data_models::{Linked, Post};
use quill::search::SearchEngine;

mod test_helpers {
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    use anyhow::Result;
    use axum::Router;
    use axum::extract::State;
    use axum::http::{HeaderMap, StatusCode, header};
    use axum::response::{IntoResponse, Response};
    use axum::routing::get;

    use quill::cache::CacheStore;
    use quill::data_models::Post;
    use quill::fetcher::fetch_posts_db;
    use quill::loader::load_blog_posts;

    pub const POSTS_JSON: &str = r#"{"posts":[{"slug":"/blog/a","title":"Hello","draft":false,"date":"2020-01-01T00:00:00Z","category":["/category/x","x"],"author":["/author/y","y"],"description":"d","content":"hello world"}]}"#;

    pub struct Fixture {
        pub marker: Option<String>,
        pub body: String,
        pub status: StatusCode,
        pub hits: AtomicUsize,
        pub not_modified_hits: AtomicUsize,
    }

    impl Fixture {
        pub fn new(body: &str, marker: Option<&str>, status: StatusCode) -> Arc<Fixture> {
            Arc::new(Fixture {
                marker: marker.map(str::to_string),
                body: body.to_string(),
                status,
                hits: AtomicUsize::new(0),
                not_modified_hits: AtomicUsize::new(0),
            })
        }
    }

    async fn postsdb(State(fixture): State<Arc<Fixture>>, headers: HeaderMap) -> Response {
        use std::sync::atomic::Ordering;

        fixture.hits.fetch_add(1, Ordering::SeqCst);

        if fixture.status != StatusCode::OK {
            return fixture.status.into_response();
        }

        let client_marker = headers
            .get(header::IF_MODIFIED_SINCE)
            .and_then(|value| value.to_str().ok());
        if fixture.marker.is_some() && client_marker == fixture.marker.as_deref() {
            fixture.not_modified_hits.fetch_add(1, Ordering::SeqCst);
            return StatusCode::NOT_MODIFIED.into_response();
        }

        let mut response = (StatusCode::OK, fixture.body.clone()).into_response();
        if let Some(marker) = fixture.marker.as_deref() {
            response
                .headers_mut()
                .insert(header::LAST_MODIFIED, marker.parse().unwrap());
        }
        response
    }

    pub async fn serve(fixture: Arc<Fixture>) -> Result<String> {
        let app = Router::new()
            .route("/postsdb", get(postsdb))
            .with_state(fixture);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let url = format!("http://{}/postsdb", listener.local_addr()?);
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Ok(url)
    }

    pub async fn dead_url() -> Result<String> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let url = format!("http://{}/postsdb", listener.local_addr()?);
        drop(listener);
        Ok(url)
    }

    /// One loader run against an endpoint, the way the worker wires it.
    pub async fn load_from(cache: &CacheStore, url: &str) -> anyhow::Result<Vec<Post>> {
        let client = reqwest::Client::new();
        load_blog_posts(cache, |marker| async move {
            fetch_posts_db(&client, url, marker.as_deref()).await
        })
        .await
    }
}

use axum::http::StatusCode;
use test_helpers::*;

fn sample_post(slug: &str) -> Post {
    Post {
        slug: slug.to_string(),
        title: "Cached".to_string(),
        category: Linked::new("/category/x", "x"),
        description: "d".to_string(),
        author: Linked::new("/author/y", "y"),
        date: "2019-01-01T00:00:00Z".parse().unwrap(),
        draft: false,
        content: "cached content".to_string(),
    }
}

// Concrete end-to-end scenario: empty cache, 200 with marker W1,
// then a query for "hello" hits the fetched post.
#[tokio::test]
async fn test_first_run_fetches_persists_and_serves_queries() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let cache = CacheStore::new(dir.path());
    let url = serve(Fixture::new(POSTS_JSON, Some("W1"), StatusCode::OK)).await?;

    let posts = load_from(&cache, &url).await?;
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].slug, "/blog/a");
    assert_eq!(posts[0].date.to_rfc3339(), "2020-01-01T00:00:00+00:00");

    // Post and marker are now persisted together
    let (cached, marker) = cache.read()?;
    assert_eq!(cached.unwrap(), posts);
    assert_eq!(marker.as_deref(), Some("W1"));

    let engine = SearchEngine::build(posts);
    let results = engine.query("hello");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].slug, "/blog/a");
    Ok(())
}

// Freshness idempotence: a second load with a warm cache takes the
// 304 path and yields the same corpus without a second body fetch.
#[tokio::test]
async fn test_second_load_takes_not_modified_path() -> Result<()> {
    use std::sync::atomic::Ordering;

    let dir = tempfile::tempdir()?;
    let fixture = Fixture::new(POSTS_JSON, Some("W1"), StatusCode::OK);
    let url = serve(fixture.clone()).await?;

    let first = {
        let cache = CacheStore::new(dir.path());
        load_from(&cache, &url).await?
    };

    // Fresh worker, same cache directory
    let cache = CacheStore::new(dir.path());
    let second = load_from(&cache, &url).await?;

    assert_eq!(first, second);
    assert_eq!(fixture.hits.load(Ordering::SeqCst), 2);
    assert_eq!(fixture.not_modified_hits.load(Ordering::SeqCst), 1);
    Ok(())
}

// Graceful degradation: HTTP 500 with a warm cache serves exactly the
// cached posts.
#[tokio::test]
async fn test_failed_refresh_falls_back_to_cached_posts() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let cache = CacheStore::new(dir.path());

    let cached = vec![sample_post("/blog/cached")];
    cache.write(&cached, Some("W0"))?;

    let url = serve(Fixture::new("", None, StatusCode::INTERNAL_SERVER_ERROR)).await?;
    let posts = load_from(&cache, &url).await?;
    assert_eq!(posts, cached);
    Ok(())
}

#[tokio::test]
async fn test_failed_refresh_with_empty_cache_yields_empty_corpus() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let cache = CacheStore::new(dir.path());

    let url = serve(Fixture::new("", None, StatusCode::INTERNAL_SERVER_ERROR)).await?;
    let posts = load_from(&cache, &url).await?;
    assert!(posts.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_unreachable_endpoint_falls_back_to_cached_posts() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let cache = CacheStore::new(dir.path());

    let cached = vec![sample_post("/blog/cached")];
    cache.write(&cached, Some("W0"))?;

    let url = dead_url().await?;
    let posts = load_from(&cache, &url).await?;
    assert_eq!(posts, cached);
    Ok(())
}

// A refreshed payload that does not parse rejects the whole load; the
// previously cached corpus is left untouched for the next attempt.
#[tokio::test]
async fn test_malformed_payload_fails_the_load() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let cache = CacheStore::new(dir.path());

    let cached = vec![sample_post("/blog/cached")];
    cache.write(&cached, Some("W0"))?;

    let url = serve(Fixture::new("this is not json", Some("W9"), StatusCode::OK)).await?;
    let result = load_from(&cache, &url).await;
    assert!(result.is_err());

    let (still_cached, marker) = cache.read()?;
    assert_eq!(still_cached.unwrap(), cached);
    assert_eq!(marker.as_deref(), Some("W0"));
    Ok(())
}

// An unavailable cache is treated as empty: the load still succeeds
// off the network. Nothing persists, so the next load re-fetches.
#[tokio::test]
async fn test_unavailable_cache_degrades_to_network_only() -> Result<()> {
    let cache = CacheStore::new("/nonexistent/quill-cache");
    let url = serve(Fixture::new(POSTS_JSON, Some("W1"), StatusCode::OK)).await?;

    let posts = load_from(&cache, &url).await?;
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].slug, "/blog/a");
    Ok(())
}

#[tokio::test]
async fn test_refresh_without_marker_still_caches_posts() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let cache = CacheStore::new(dir.path());

    let url = serve(Fixture::new(POSTS_JSON, None, StatusCode::OK)).await?;
    let posts = load_from(&cache, &url).await?;
    assert_eq!(posts.len(), 1);

    let (cached, marker) = cache.read()?;
    assert_eq!(cached.unwrap(), posts);
    assert!(marker.is_none());
    Ok(())
}
