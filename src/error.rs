//! Error types surfaced by the crawl engine.
//!
//! Two families live here. `CrawlError` is the value carried on the error
//! channel during a crawl: a stage kind plus a message, reported to whoever
//! drains the channel. `StartError` covers everything that can go wrong
//! synchronously inside [`Scheduler::start`](crate::Scheduler::start) before
//! any stage has been spawned.

use std::fmt;

use thiserror::Error;

/// The stage a [`CrawlError`] originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum ErrorKind {
    Downloader,
    Analyzer,
    ItemProcessor,
    /// Internal faults (pool checkout failures and the like). Rendered
    /// without a kind tag.
    Scheduler,
}

impl ErrorKind {
    fn tag(&self) -> Option<&'static str> {
        match self {
            ErrorKind::Downloader => Some("Downloader Error"),
            ErrorKind::Analyzer => Some("Analyzer Error"),
            ErrorKind::ItemProcessor => Some("Item Processor Error"),
            ErrorKind::Scheduler => None,
        }
    }
}

/// An error produced by one of the crawl stages, fanned into the error
/// channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlError {
    kind: ErrorKind,
    message: String,
}

impl CrawlError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        CrawlError {
            kind,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CrawlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Crawler Error: ")?;
        if let Some(tag) = self.kind.tag() {
            write!(f, "{}: ", tag)?;
        }
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CrawlError {}

/// Synchronous failures of [`Scheduler::start`](crate::Scheduler::start).
///
/// Once the stages are running, nothing is reported through this type any
/// more; operational errors go to the error channel as [`CrawlError`]s.
#[derive(Debug, Error)]
pub enum StartError {
    #[error("the scheduler has already been started")]
    AlreadyRunning,
    #[error("invalid channel arguments: {0}")]
    InvalidChannelArgs(String),
    #[error("invalid pool arguments: {0}")]
    InvalidPoolArgs(String),
    #[error("the response parser list is empty")]
    EmptyParserList,
    #[error("the item processor list is empty")]
    EmptyProcessorList,
    #[error("the seed request is invalid: {0}")]
    InvalidSeed(String),
    #[error("{0}")]
    Domain(#[from] crate::domain::DomainError),
    #[error("pool construction failed: {0}")]
    Pool(#[from] crate::pool::PoolError),
    #[error("fatal scheduler error: {0}")]
    Panic(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_the_kind_tag() {
        let err = CrawlError::new(ErrorKind::Downloader, "connection refused");
        assert_eq!(
            err.to_string(),
            "Crawler Error: Downloader Error: connection refused"
        );

        let err = CrawlError::new(ErrorKind::ItemProcessor, "bad item");
        assert_eq!(err.to_string(), "Crawler Error: Item Processor Error: bad item");
    }

    #[test]
    fn scheduler_kind_renders_without_a_tag() {
        let err = CrawlError::new(ErrorKind::Scheduler, "downloader pool drained");
        assert_eq!(err.to_string(), "Crawler Error: downloader pool drained");
    }
}
