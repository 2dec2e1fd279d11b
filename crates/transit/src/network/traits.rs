//! Pluggable networking traits.
//!
//! The library never opens sockets itself. The binary hands an HTTP client
//! to the realtime cache through [`DataFetcher`]; tests hand it canned bytes.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::models::types::Result;

pub type FetchFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<u8>>> + Send + 'a>>;

/// Fetch the raw body behind a feed URL
///
/// Failures should be reported as [`crate::TransitError::Fetch`].
pub trait DataFetcher: Send + Sync {
    fn fetch<'a>(&'a self, url: &'a str) -> FetchFuture<'a>;
}

impl<T: DataFetcher + ?Sized> DataFetcher for Arc<T> {
    fn fetch<'a>(&'a self, url: &'a str) -> FetchFuture<'a> {
        (**self).fetch(url)
    }
}
