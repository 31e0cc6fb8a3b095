//! Shared HTTP client for listing pages, article pages, and image downloads.

use crate::error::FetchError;
use once_cell::sync::Lazy;
use reqwest::{Client, ClientBuilder, Response};
use std::time::Duration;
use tracing::{debug, instrument};

const USER_AGENT: &str = "Mozilla/5.0 (compatible; CurrentAffairsIngest/0.1)";

static HTTP_CLIENT: Lazy<Client> = Lazy::new(|| {
    ClientBuilder::new()
        .connect_timeout(Duration::from_secs(10))
        .timeout(Duration::from_secs(30))
        .user_agent(USER_AGENT)
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .unwrap_or_else(|_| Client::new())
});

pub fn client() -> &'static Client {
    &HTTP_CLIENT
}

async fn get_ok(url: &str) -> Result<Response, FetchError> {
    let parsed = url::Url::parse(url)?;
    let response = HTTP_CLIENT.get(parsed).send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Http { status });
    }
    Ok(response)
}

/// GET an HTML page as text. Non-2xx statuses are errors.
#[instrument(level = "debug", skip_all, fields(%url))]
pub async fn fetch_html(url: &str) -> Result<String, FetchError> {
    let body = get_ok(url).await?.text().await?;
    debug!(bytes = body.len(), "Fetched page");
    Ok(body)
}

/// GET a binary resource. Non-2xx statuses are errors.
#[instrument(level = "debug", skip_all, fields(%url))]
pub async fn fetch_bytes(url: &str) -> Result<Vec<u8>, FetchError> {
    let body = get_ok(url).await?.bytes().await?;
    debug!(bytes = body.len(), "Fetched resource");
    Ok(body.to_vec())
}
