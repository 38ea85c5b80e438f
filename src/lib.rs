//! # trawler-core
//!
//! Concurrency engine of the `trawler` bounded-depth, single-domain web
//! crawler.
//!
//! Given a seed URL, the [`Scheduler`] repeatedly fetches pages through a
//! pool of downloaders, runs user parsers over each response through a pool
//! of analyzers, pipes extracted items through user processors, and feeds
//! newly discovered links back into the crawl, subject to depth bounds, URL
//! de-duplication, and same-primary-domain confinement. Stage errors fan
//! into a read-only error channel; a one-shot stop sign drains the whole
//! engine without deadlock.
//!
//! ## Example
//!
//! ```rust,ignore
//! use trawler_core::prelude::*;
//! use url::Url;
//!
//! let args = CrawlBuilder::default()
//!     .crawl_depth(3)
//!     .add_parser(|resp: &Response| {
//!         // extract Data::Request links and Data::Item records
//!         (vec![], vec![])
//!     })
//!     .add_processor(|item: &Item| Ok(None))
//!     .seed(Url::parse("http://example.com/").unwrap())
//!     .build()?;
//!
//! let scheduler = Scheduler::new();
//! // start blocks until stop() is called from another task
//! scheduler.start(args).await?;
//! ```

pub mod analyzer;
pub mod builder;
pub mod cache;
pub mod channels;
pub mod config;
pub mod data;
pub mod domain;
pub mod downloader;
pub mod error;
pub mod pipeline;
pub mod pool;
pub mod prelude;
pub mod scheduler;
pub mod stop;

pub use analyzer::{Analyzer, ParseResponse};
pub use builder::CrawlBuilder;
pub use config::{ChannelArgs, PoolArgs};
pub use data::{Data, Item, Request, Response};
pub use domain::primary_domain;
pub use downloader::{HttpClient, PageDownloader, RawResponse};
pub use error::{CrawlError, ErrorKind, StartError};
pub use pipeline::{ItemPipeline, ProcessItem};
pub use scheduler::{CrawlArgs, SchedSummary, Scheduler};

pub use async_trait::async_trait;
pub use tokio;
pub use url::Url;
