use reqwest::StatusCode;
use reqwest::header::{ACCEPT, IF_MODIFIED_SINCE, LAST_MODIFIED};

/// Outcome of one conditional refresh attempt against the posts
/// endpoint. Network and server failures are data here, not errors:
/// the loader falls back to the cached corpus on `Failed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// 304; the cached corpus is authoritative.
    NotModified,
    /// 2xx with a fresh serialized corpus. Parsing is the caller's job.
    Refreshed {
        payload: String,
        last_modified: Option<String>,
    },
    /// Non-2xx status or transport error. Transport errors carry
    /// `code: 0` since no HTTP status was ever received.
    Failed { code: u16, message: String },
}

/// Fetch the posts dataset, conditionally when a prior freshness
/// marker is supplied. One attempt, no retries; a refresh that cannot
/// complete is a `Failed` outcome, never a panic or an `Err`.
pub async fn fetch_posts_db(
    client: &reqwest::Client,
    url: &str,
    last_modified: Option<&str>,
) -> RefreshOutcome {
    let mut request = client.get(url).header(ACCEPT, "application/json");
    if let Some(marker) = last_modified {
        request = request.header(IF_MODIFIED_SINCE, marker);
    }

    let response = match request.send().await {
        Ok(response) => response,
        Err(err) => {
            return RefreshOutcome::Failed {
                code: 0,
                message: err.to_string(),
            };
        }
    };

    let status = response.status();
    if status == StatusCode::NOT_MODIFIED {
        return RefreshOutcome::NotModified;
    }

    if !status.is_success() {
        return RefreshOutcome::Failed {
            code: status.as_u16(),
            message: status.canonical_reason().unwrap_or("").to_string(),
        };
    }

    let current_last_modified = response
        .headers()
        .get(LAST_MODIFIED)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    match response.text().await {
        Ok(payload) => RefreshOutcome::Refreshed {
            payload,
            last_modified: current_last_modified,
        },
        Err(err) => RefreshOutcome::Failed {
            code: 0,
            message: err.to_string(),
        },
    }
}
