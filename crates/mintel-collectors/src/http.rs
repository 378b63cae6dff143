//! Shared HTTP plumbing: client construction and status classification.

use std::time::Duration;

use reqwest::{Client, Response, StatusCode, Url};

use crate::error::CollectorError;

/// Builds a client with the configured timeout and `User-Agent`.
pub(crate) fn build_client(timeout_secs: u64, user_agent: &str) -> Result<Client, CollectorError> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .user_agent(user_agent)
        .build()?)
}

/// Parses a base URL and normalises it to end with exactly one slash, so
/// `join` appends to the path instead of replacing its last segment.
pub(crate) fn parse_base_url(base_url: &str) -> Result<Url, CollectorError> {
    let normalised = format!("{}/", base_url.trim_end_matches('/'));
    Url::parse(&normalised).map_err(|e| CollectorError::InvalidBaseUrl {
        url: base_url.to_owned(),
        reason: e.to_string(),
    })
}

/// Sends a GET and maps non-2xx statuses to typed errors.
pub(crate) async fn get_checked(client: &Client, url: &Url) -> Result<Response, CollectorError> {
    let response = client.get(url.clone()).send().await?;
    let status = response.status();

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after_secs = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(60);
        return Err(CollectorError::RateLimited {
            host: url.host_str().unwrap_or_default().to_owned(),
            retry_after_secs,
        });
    }

    if status == StatusCode::NOT_FOUND {
        return Err(CollectorError::NotFound {
            url: redact_key(url),
        });
    }

    if !status.is_success() {
        return Err(CollectorError::UnexpectedStatus {
            status: status.as_u16(),
            url: redact_key(url),
        });
    }

    Ok(response)
}

/// Renders a URL for error messages without its `key` query parameter.
pub(crate) fn redact_key(url: &Url) -> String {
    let mut clean = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != "key")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if pairs.is_empty() {
        clean.set_query(None);
    } else {
        clean.query_pairs_mut().clear().extend_pairs(pairs);
    }
    clean.to_string()
}
