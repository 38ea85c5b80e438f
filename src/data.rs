//! # Data Model
//!
//! The values that flow between the crawl stages: `Request`, `Response`,
//! `Item`, and the `Data` sum the analyzer emits.
//!
//! Requests are immutable; the analyze stage normalizes depth by building a
//! new `Request` rather than mutating one in place. A request extracted from
//! a response of depth *d* always enters admission with depth *d + 1*.

use std::collections::HashMap;

use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use url::Url;

/// A crawl request: a target URL plus its hop distance from the seed.
#[derive(Debug, Clone)]
pub struct Request {
    url: Url,
    depth: u32,
}

impl Request {
    pub fn new(url: Url, depth: u32) -> Self {
        Request { url, depth }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// The same target at a different depth.
    pub fn with_depth(&self, depth: u32) -> Self {
        Request {
            url: self.url.clone(),
            depth,
        }
    }
}

/// A fetched page, carrying forward the depth of the request that produced
/// it.
#[derive(Debug, Clone)]
pub struct Response {
    url: Url,
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
    depth: u32,
}

impl Response {
    pub fn new(url: Url, status: StatusCode, headers: HeaderMap, body: Bytes, depth: u32) -> Self {
        Response {
            url,
            status,
            headers,
            body,
            depth,
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Whether the response carries a usable body.
    pub fn is_valid(&self) -> bool {
        !self.body.is_empty()
    }
}

/// An extracted record: a mapping from field name to opaque value.
pub type Item = HashMap<String, serde_json::Value>;

/// What a response parser may emit: a request to be re-scheduled or an item
/// to be piped.
#[derive(Debug, Clone)]
pub enum Data {
    Request(Request),
    Item(Item),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_depth_keeps_the_url() {
        let req = Request::new(Url::parse("http://example.com/a").unwrap(), 2);
        let bumped = req.with_depth(3);
        assert_eq!(bumped.url(), req.url());
        assert_eq!(bumped.depth(), 3);
        assert_eq!(req.depth(), 2);
    }

    #[test]
    fn empty_body_is_not_a_valid_response() {
        let url = Url::parse("http://example.com/").unwrap();
        let resp = Response::new(url.clone(), StatusCode::OK, HeaderMap::new(), Bytes::new(), 0);
        assert!(!resp.is_valid());

        let resp = Response::new(url, StatusCode::OK, HeaderMap::new(), Bytes::from("<html>"), 0);
        assert!(resp.is_valid());
    }
}
