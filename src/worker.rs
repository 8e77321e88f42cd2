use std::collections::VecDeque;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::cache::CacheStore;
use crate::config::CONFIG;
use crate::fetcher::fetch_posts_db;
use crate::loader::{keep_publishable, load_blog_posts};
use crate::messages::{Request, Response};
use crate::search::SearchEngine;

/// Readiness gate for the request stream. Requests that arrive while
/// the corpus is still loading are held in arrival order and served
/// before anything received after readiness.
enum Gate {
    Loading(VecDeque<Request>),
    Ready(SearchEngine),
}

/// Worker-side protocol layer: queues or serves incoming requests and
/// posts back correlated responses. Serving is synchronous and in
/// arrival order, so response order matches request order.
pub struct Router {
    gate: Gate,
    out: mpsc::UnboundedSender<Response>,
}

impl Router {
    pub fn new(out: mpsc::UnboundedSender<Response>) -> Router {
        Router {
            gate: Gate::Loading(VecDeque::new()),
            out,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.gate, Gate::Ready(_))
    }

    pub fn accept(&mut self, request: Request) {
        match &mut self.gate {
            Gate::Loading(pending) => pending.push_back(request),
            Gate::Ready(engine) => Self::serve(engine, &self.out, request),
        }
    }

    /// Flip the gate: drain the held requests in arrival order, then
    /// serve everything else directly.
    pub fn make_ready(&mut self, engine: SearchEngine) {
        if let Gate::Loading(pending) = &mut self.gate {
            for request in std::mem::take(pending) {
                Self::serve(&engine, &self.out, request);
            }
        }
        self.gate = Gate::Ready(engine);
    }

    fn serve(engine: &SearchEngine, out: &mpsc::UnboundedSender<Response>, request: Request) {
        let results = match &request {
            Request::PostSearch { term, .. } => engine.query(term),
        };
        let response = Response::post_search(&request, results);
        if out.send(response).is_err() {
            log::warn!("search client went away; dropping response");
        }
    }
}

/// Wiring for one worker session.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub postsdb_url: String,
    pub cache_dir: PathBuf,
}

impl WorkerConfig {
    pub fn from_config() -> WorkerConfig {
        WorkerConfig {
            postsdb_url: CONFIG.postsdb_url.clone(),
            cache_dir: PathBuf::from(&CONFIG.cache_dir),
        }
    }
}

/// Spawn the search worker task. Returns the request sender, the
/// response receiver, and the task handle; the task runs until the
/// request channel closes. The handle resolves to an `Err` only for
/// the fatal startup conditions (unusable cache directory, malformed
/// corpus payload) where serving would be wrong.
pub fn spawn(
    config: WorkerConfig,
) -> (
    mpsc::UnboundedSender<Request>,
    mpsc::UnboundedReceiver<Response>,
    JoinHandle<Result<()>>,
) {
    let (request_tx, request_rx) = mpsc::unbounded_channel();
    let (response_tx, response_rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(run(config, request_rx, response_tx));
    (request_tx, response_rx, handle)
}

async fn run(
    config: WorkerConfig,
    mut requests: mpsc::UnboundedReceiver<Request>,
    responses: mpsc::UnboundedSender<Response>,
) -> Result<()> {
    // A worker whose storage location cannot even be created would be
    // serving against a broken backend; terminate instead.
    std::fs::create_dir_all(&config.cache_dir).with_context(|| {
        format!(
            "cache directory {} is unusable",
            config.cache_dir.display()
        )
    })?;

    let cache = CacheStore::new(&config.cache_dir);
    let client = reqwest::Client::new();
    let url = config.postsdb_url.as_str();

    let load = load_blog_posts(&cache, |marker| {
        let client = &client;
        async move { fetch_posts_db(client, url, marker.as_deref()).await }
    });
    tokio::pin!(load);

    let mut router = Router::new(responses);

    // Load phase: requests pile up behind the gate in arrival order.
    loop {
        tokio::select! {
            posts = &mut load => {
                let published = keep_publishable(posts?, Utc::now());
                log::info!("corpus loaded: {} publishable posts", published.len());
                router.make_ready(SearchEngine::build(published));
                break;
            }
            request = requests.recv() => match request {
                Some(request) => router.accept(request),
                None => return Ok(()),
            },
        }
    }

    // Serve phase: synchronous, in arrival order.
    while let Some(request) = requests.recv().await {
        router.accept(request);
    }

    Ok(())
}
