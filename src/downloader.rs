//! # Downloader
//!
//! The pooled page downloader and the `HttpClient` seam it fetches through.
//!
//! Each downloader owns one client produced by the factory passed to
//! [`Scheduler::start`](crate::Scheduler::start); clients are never shared
//! across pool entities, so a client only needs to be usable from the worker
//! that checked its downloader out. `reqwest::Client` is the production
//! implementation; tests substitute stubs.

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use url::Url;

use crate::data::{Request, Response};
use crate::pool::PoolEntity;

/// What a fetch yields before the engine stamps a depth onto it.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// The HTTP seam of the engine. One client per pooled downloader.
#[async_trait]
pub trait HttpClient: Send + Sync + 'static {
    async fn fetch(&self, url: &Url) -> Result<RawResponse>;
}

#[async_trait]
impl HttpClient for reqwest::Client {
    async fn fetch(&self, url: &Url) -> Result<RawResponse> {
        let resp = self.get(url.clone()).send().await?;
        let status = resp.status();
        let headers = resp.headers().clone();
        let body = resp.bytes().await?;
        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}

/// A pooled downloader: a stable id plus its own HTTP client.
pub struct PageDownloader<C> {
    id: u32,
    client: C,
}

impl<C> PageDownloader<C> {
    pub fn new(id: u32, client: C) -> Self {
        PageDownloader { id, client }
    }
}

impl<C: Send + 'static> PoolEntity for PageDownloader<C> {
    fn id(&self) -> u32 {
        self.id
    }
}

impl<C: HttpClient> PageDownloader<C> {
    /// Performs the HTTP GET and wraps the result with the request's depth.
    pub async fn download(&self, req: &Request) -> Result<Response> {
        let raw = self.client.fetch(req.url()).await?;
        Ok(Response::new(
            req.url().clone(),
            raw.status,
            raw.headers,
            raw.body,
            req.depth(),
        ))
    }
}
