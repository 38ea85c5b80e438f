//! Unbounded FIFO buffer for pending requests.
//!
//! The analyzer produces requests in bursts while the downloader drains them
//! at pool speed; the cache absorbs the difference so analyze workers never
//! block on a full request channel. The feeder is the only consumer.

use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam::queue::SegQueue;

use crate::data::Request;

#[derive(Debug, Default)]
pub struct RequestCache {
    queue: SegQueue<Request>,
    closed: AtomicBool,
}

impl RequestCache {
    pub fn new() -> Self {
        RequestCache::default()
    }

    /// Buffers a request. A no-op once the cache is closed.
    pub fn put(&self, req: Request) -> bool {
        if self.closed.load(Ordering::SeqCst) {
            return false;
        }
        self.queue.push(req);
        true
    }

    /// Pops the oldest pending request, if any. After close, drains the
    /// remaining entries and then yields `None`.
    pub fn get(&self) -> Option<Request> {
        self.queue.pop()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn summary(&self) -> String {
        let status = if self.is_closed() { "closed" } else { "running" };
        format!("status: {}, length: {}", status, self.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn req(path: &str, depth: u32) -> Request {
        Request::new(Url::parse(&format!("http://example.com{}", path)).unwrap(), depth)
    }

    #[test]
    fn fifo_order() {
        let cache = RequestCache::new();
        cache.put(req("/a", 0));
        cache.put(req("/b", 1));
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get().unwrap().url().path(), "/a");
        assert_eq!(cache.get().unwrap().url().path(), "/b");
        assert!(cache.get().is_none());
    }

    #[test]
    fn close_rejects_puts_and_drains_to_none() {
        let cache = RequestCache::new();
        cache.put(req("/a", 0));
        cache.close();
        assert!(!cache.put(req("/b", 0)));
        assert_eq!(cache.len(), 1);
        // buffered entries are still drained
        assert_eq!(cache.get().unwrap().url().path(), "/a");
        assert!(cache.get().is_none());
        assert_eq!(cache.summary(), "status: closed, length: 0");
    }
}
