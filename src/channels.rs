//! # Channel Manager
//!
//! Owns the four typed channels the stages communicate over: requests,
//! responses, items, and errors.
//!
//! The manager moves through `Uninitialized -> Initialized -> Closed` and
//! never back (except via an explicit `init(.., reset)`). Accessors hand out
//! clones of the channel halves only while the manager is initialized;
//! closing drops every held half, which closes the underlying channels and
//! propagates end-of-input to each stage supervisor.

use std::fmt;

use kanal::{AsyncReceiver, AsyncSender};
use parking_lot::RwLock;
use serde::Serialize;
use thiserror::Error;

use crate::config::ChannelArgs;
use crate::data::{Item, Request, Response};
use crate::error::CrawlError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChannelManagerStatus {
    Uninitialized,
    Initialized,
    Closed,
}

impl fmt::Display for ChannelManagerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChannelManagerStatus::Uninitialized => "uninitialized",
            ChannelManagerStatus::Initialized => "initialized",
            ChannelManagerStatus::Closed => "closed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChannelManagerError {
    #[error("undesirable channel manager status: {0}")]
    UndesirableStatus(ChannelManagerStatus),
}

struct Chans {
    req: (AsyncSender<Request>, AsyncReceiver<Request>),
    resp: (AsyncSender<Response>, AsyncReceiver<Response>),
    item: (AsyncSender<Item>, AsyncReceiver<Item>),
    error: (AsyncSender<CrawlError>, AsyncReceiver<CrawlError>),
}

struct Inner {
    status: ChannelManagerStatus,
    args: ChannelArgs,
    chans: Option<Chans>,
}

pub struct ChannelManager {
    inner: RwLock<Inner>,
}

/// Occupancy of one managed channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChannelSummary {
    pub len: usize,
    pub cap: usize,
}

/// Occupancy of all four managed channels.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ChannelManagerSummary {
    pub status: ChannelManagerStatus,
    pub req: ChannelSummary,
    pub resp: ChannelSummary,
    pub item: ChannelSummary,
    pub error: ChannelSummary,
}

impl fmt::Display for ChannelManagerSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "status: {}, requestChan: {}/{}, responseChan: {}/{}, itemChan: {}/{}, errorChan: {}/{}",
            self.status,
            self.req.len,
            self.req.cap,
            self.resp.len,
            self.resp.cap,
            self.item.len,
            self.item.cap,
            self.error.len,
            self.error.cap,
        )
    }
}

impl ChannelManager {
    /// Builds a manager and initializes it with `args`.
    pub fn new(args: ChannelArgs) -> Self {
        let manager = ChannelManager {
            inner: RwLock::new(Inner {
                status: ChannelManagerStatus::Uninitialized,
                args,
                chans: None,
            }),
        };
        manager.init(args, true);
        manager
    }

    /// (Re-)creates the four channels. Refuses to touch an initialized
    /// manager unless `reset` is set.
    pub fn init(&self, args: ChannelArgs, reset: bool) -> bool {
        let mut inner = self.inner.write();
        if inner.status == ChannelManagerStatus::Initialized && !reset {
            return false;
        }
        inner.args = args;
        inner.chans = Some(Chans {
            req: kanal::bounded_async(args.req_chan_len() as usize),
            resp: kanal::bounded_async(args.resp_chan_len() as usize),
            item: kanal::bounded_async(args.item_chan_len() as usize),
            error: kanal::bounded_async(args.error_chan_len() as usize),
        });
        inner.status = ChannelManagerStatus::Initialized;
        true
    }

    /// Closes all four channels exactly once by dropping every held half.
    /// Stage supervisors observe the closure as end-of-input.
    pub fn close(&self) -> bool {
        let mut inner = self.inner.write();
        if inner.status != ChannelManagerStatus::Initialized {
            return false;
        }
        inner.chans = None;
        inner.status = ChannelManagerStatus::Closed;
        true
    }

    pub fn status(&self) -> ChannelManagerStatus {
        self.inner.read().status
    }

    fn with_chans<R>(&self, f: impl FnOnce(&Chans) -> R) -> Result<R, ChannelManagerError> {
        let inner = self.inner.read();
        match (&inner.chans, inner.status) {
            (Some(chans), ChannelManagerStatus::Initialized) => Ok(f(chans)),
            (_, status) => Err(ChannelManagerError::UndesirableStatus(status)),
        }
    }

    pub fn req_sender(&self) -> Result<AsyncSender<Request>, ChannelManagerError> {
        self.with_chans(|c| c.req.0.clone())
    }

    pub fn req_receiver(&self) -> Result<AsyncReceiver<Request>, ChannelManagerError> {
        self.with_chans(|c| c.req.1.clone())
    }

    pub fn resp_sender(&self) -> Result<AsyncSender<Response>, ChannelManagerError> {
        self.with_chans(|c| c.resp.0.clone())
    }

    pub fn resp_receiver(&self) -> Result<AsyncReceiver<Response>, ChannelManagerError> {
        self.with_chans(|c| c.resp.1.clone())
    }

    pub fn item_sender(&self) -> Result<AsyncSender<Item>, ChannelManagerError> {
        self.with_chans(|c| c.item.0.clone())
    }

    pub fn item_receiver(&self) -> Result<AsyncReceiver<Item>, ChannelManagerError> {
        self.with_chans(|c| c.item.1.clone())
    }

    pub fn error_sender(&self) -> Result<AsyncSender<CrawlError>, ChannelManagerError> {
        self.with_chans(|c| c.error.0.clone())
    }

    pub fn error_receiver(&self) -> Result<AsyncReceiver<CrawlError>, ChannelManagerError> {
        self.with_chans(|c| c.error.1.clone())
    }

    pub fn summary(&self) -> ChannelManagerSummary {
        let inner = self.inner.read();
        let args = inner.args;
        let occupancy = |len: usize, cap: u32| ChannelSummary {
            len,
            cap: cap as usize,
        };
        match &inner.chans {
            Some(chans) => ChannelManagerSummary {
                status: inner.status,
                req: occupancy(chans.req.0.len(), args.req_chan_len()),
                resp: occupancy(chans.resp.0.len(), args.resp_chan_len()),
                item: occupancy(chans.item.0.len(), args.item_chan_len()),
                error: occupancy(chans.error.0.len(), args.error_chan_len()),
            },
            None => ChannelManagerSummary {
                status: inner.status,
                req: occupancy(0, args.req_chan_len()),
                resp: occupancy(0, args.resp_chan_len()),
                item: occupancy(0, args.item_chan_len()),
                error: occupancy(0, args.error_chan_len()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn manager() -> ChannelManager {
        ChannelManager::new(ChannelArgs::new(2, 2, 2, 2))
    }

    #[test]
    fn new_manager_is_initialized() {
        let m = manager();
        assert_eq!(m.status(), ChannelManagerStatus::Initialized);
        assert!(m.req_sender().is_ok());
        assert!(m.error_receiver().is_ok());
    }

    #[test]
    fn init_refuses_without_reset() {
        let m = manager();
        assert!(!m.init(ChannelArgs::default(), false));
        assert!(m.init(ChannelArgs::default(), true));
        assert_eq!(m.status(), ChannelManagerStatus::Initialized);
    }

    #[test]
    fn close_is_terminal_and_idempotent() {
        let m = manager();
        assert!(m.close());
        assert_eq!(m.status(), ChannelManagerStatus::Closed);
        assert!(!m.close());
        let err = m.req_sender().unwrap_err();
        assert_eq!(
            err,
            ChannelManagerError::UndesirableStatus(ChannelManagerStatus::Closed)
        );
    }

    #[tokio::test]
    async fn close_propagates_to_held_receivers() {
        let m = manager();
        let tx = m.req_sender().unwrap();
        let rx = m.req_receiver().unwrap();
        let req = Request::new(Url::parse("http://example.com/").unwrap(), 0);
        tx.send(req).await.unwrap();
        drop(tx);
        m.close();

        // buffered value drains, then end-of-input
        assert!(rx.recv().await.is_ok());
        assert!(rx.recv().await.is_err());
    }

    #[tokio::test]
    async fn summary_reports_len_and_cap() {
        let m = manager();
        let tx = m.item_sender().unwrap();
        tx.send(Item::new()).await.unwrap();
        let summary = m.summary();
        assert_eq!(summary.item, ChannelSummary { len: 1, cap: 2 });
        assert_eq!(summary.req, ChannelSummary { len: 0, cap: 2 });
    }
}
