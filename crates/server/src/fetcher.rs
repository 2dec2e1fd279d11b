//! HTTP-backed [`DataFetcher`] for the realtime feeds.

use std::time::Duration;

use timetable_transit::{DataFetcher, FetchFuture, TransitError};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client })
    }
}

impl DataFetcher for HttpFetcher {
    fn fetch<'a>(&'a self, url: &'a str) -> FetchFuture<'a> {
        Box::pin(async move {
            let response = self
                .client
                .get(url)
                .send()
                .await
                .and_then(reqwest::Response::error_for_status)
                .map_err(|e| TransitError::Fetch(e.to_string()))?;

            let bytes = response
                .bytes()
                .await
                .map_err(|e| TransitError::Fetch(e.to_string()))?;
            Ok(bytes.to_vec())
        })
    }
}
