use nanoid::nanoid;
use serde::{Deserialize, Serialize};

use crate::data_models::SearchResult;

/// Requests: client ➔ worker. Tagged-union wire shape:
/// `{"kind":"post-search","id":...,"term":...}`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Request {
    PostSearch { id: String, term: String },
}

impl Request {
    /// Build a search request with a fresh correlation id. The caller
    /// reads the id back to remember its most recent query.
    pub fn post_search(term: impl Into<String>) -> Request {
        Request::PostSearch {
            id: nanoid!(),
            term: term.into(),
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Request::PostSearch { id, .. } => id,
        }
    }
}

/// Results: worker ➔ client, correlated to a request by id.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Response {
    PostSearch {
        id: String,
        results: Vec<SearchResult>,
    },
}

impl Response {
    /// Pair search results with the request they answer.
    pub fn post_search(request: &Request, results: Vec<SearchResult>) -> Response {
        Response::PostSearch {
            id: request.id().to_string(),
            results,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Response::PostSearch { id, .. } => id,
        }
    }
}
