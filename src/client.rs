use std::sync::{Arc, Mutex};

use anyhow::Result;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::data_models::SearchResult;
use crate::messages::{Request, Response};
use crate::worker::{self, WorkerConfig};

/// Client-side proxy for the search worker. Issues correlated queries
/// and surfaces results through a watch channel, keeping only the
/// results of the most recently issued query: a response whose id does
/// not match the latest query is dropped on arrival (last-query-wins),
/// so subscribers never observe a stale result, even when responses
/// arrive out of order.
pub struct SearchClient {
    requests: mpsc::UnboundedSender<Request>,
    last_id: Arc<Mutex<Option<String>>>,
    results: watch::Receiver<Vec<SearchResult>>,
}

impl SearchClient {
    /// Spawn a worker and attach a client to it. The returned handle
    /// resolves when the worker terminates (normally, once this client
    /// is dropped).
    pub fn spawn(config: WorkerConfig) -> (SearchClient, JoinHandle<Result<()>>) {
        let (request_tx, response_rx, handle) = worker::spawn(config);
        (SearchClient::attach(request_tx, response_rx), handle)
    }

    /// Attach to an already-running worker's channel pair.
    pub fn attach(
        requests: mpsc::UnboundedSender<Request>,
        mut responses: mpsc::UnboundedReceiver<Response>,
    ) -> SearchClient {
        let last_id: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));
        let (results_tx, results_rx) = watch::channel(Vec::new());

        let filter_id = Arc::clone(&last_id);
        tokio::spawn(async move {
            while let Some(response) = responses.recv().await {
                let Response::PostSearch { id, results } = response;

                let current = filter_id.lock().unwrap().as_deref() == Some(id.as_str());
                if !current {
                    // Stale: a newer query was issued since this one
                    continue;
                }
                if results_tx.send(results).is_err() {
                    break;
                }
            }
        });

        SearchClient {
            requests,
            last_id,
            results: results_rx,
        }
    }

    /// Issue a query and remember it as the most recent one. Returns
    /// the correlation id assigned to it.
    pub fn search_posts(&self, term: &str) -> String {
        let request = Request::post_search(term);
        let id = request.id().to_string();

        *self.last_id.lock().unwrap() = Some(id.clone());
        if self.requests.send(request).is_err() {
            log::warn!("search worker is gone; query {id} dropped");
        }

        id
    }

    /// Subscribe to the latest results. Dropping the receiver
    /// unsubscribes.
    pub fn subscribe(&self) -> watch::Receiver<Vec<SearchResult>> {
        self.results.clone()
    }
}
