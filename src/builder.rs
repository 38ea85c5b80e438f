//! # Builder Module
//!
//! Provides `CrawlBuilder`, a fluent API for assembling the arguments of
//! [`Scheduler::start`](crate::Scheduler::start).
//!
//! ## Example
//!
//! ```rust,ignore
//! use trawler_core::{CrawlBuilder, Scheduler};
//! use url::Url;
//!
//! let args = CrawlBuilder::default()
//!     .crawl_depth(2)
//!     .add_parser(my_link_parser)
//!     .add_processor(my_item_processor)
//!     .seed(Url::parse("http://example.com/")?)
//!     .build()?;
//!
//! let scheduler = Scheduler::new();
//! scheduler.start(args).await?;
//! ```

use std::sync::Arc;

use url::Url;

use crate::analyzer::ParseResponse;
use crate::config::{ChannelArgs, PoolArgs};
use crate::data::{Data, Item, Response};
use crate::downloader::HttpClient;
use crate::error::StartError;
use crate::pipeline::ProcessItem;
use crate::scheduler::CrawlArgs;

pub struct CrawlBuilder<C: HttpClient> {
    channel_args: ChannelArgs,
    pool_args: PoolArgs,
    crawl_depth: u32,
    client_factory: Arc<dyn Fn() -> C + Send + Sync>,
    parsers: Vec<ParseResponse>,
    processors: Vec<ProcessItem>,
    seed: Option<Url>,
}

impl Default for CrawlBuilder<reqwest::Client> {
    fn default() -> Self {
        CrawlBuilder::new(reqwest::Client::new)
    }
}

impl<C: HttpClient> CrawlBuilder<C> {
    /// Starts a builder around the HTTP client factory; the factory runs
    /// once per pooled downloader.
    pub fn new<F>(client_factory: F) -> Self
    where
        F: Fn() -> C + Send + Sync + 'static,
    {
        let cpus = num_cpus::get() as u32;
        CrawlBuilder {
            channel_args: ChannelArgs::default(),
            pool_args: PoolArgs::new(cpus.clamp(2, 16), cpus.clamp(2, 8)),
            crawl_depth: 3,
            client_factory: Arc::new(client_factory),
            parsers: Vec::new(),
            processors: Vec::new(),
            seed: None,
        }
    }

    pub fn channel_args(mut self, args: ChannelArgs) -> Self {
        self.channel_args = args;
        self
    }

    pub fn pool_args(mut self, args: PoolArgs) -> Self {
        self.pool_args = args;
        self
    }

    pub fn crawl_depth(mut self, depth: u32) -> Self {
        self.crawl_depth = depth;
        self
    }

    /// Appends a response parser; parsers run in registration order.
    pub fn add_parser<P>(mut self, parser: P) -> Self
    where
        P: Fn(&Response) -> (Vec<Data>, Vec<anyhow::Error>) + Send + Sync + 'static,
    {
        self.parsers.push(Arc::new(parser));
        self
    }

    /// Appends an item processor; processors run in registration order.
    pub fn add_processor<P>(mut self, processor: P) -> Self
    where
        P: Fn(&Item) -> Result<Option<Item>, anyhow::Error> + Send + Sync + 'static,
    {
        self.processors.push(Arc::new(processor));
        self
    }

    /// The first request of the crawl; its host fixes the primary domain.
    pub fn seed(mut self, seed: Url) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn build(self) -> Result<CrawlArgs<C>, StartError> {
        let seed = self
            .seed
            .ok_or_else(|| StartError::InvalidSeed("the seed url is missing".to_string()))?;
        Ok(CrawlArgs {
            channel_args: self.channel_args,
            pool_args: self.pool_args,
            crawl_depth: self.crawl_depth,
            client_factory: self.client_factory,
            parsers: self.parsers,
            processors: self.processors,
            seed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_requires_a_seed() {
        let result = CrawlBuilder::default().build();
        assert!(matches!(result, Err(StartError::InvalidSeed(_))));
    }

    #[test]
    fn build_collects_parsers_and_processors() {
        let args = CrawlBuilder::default()
            .crawl_depth(1)
            .channel_args(ChannelArgs::new(1, 1, 1, 1))
            .pool_args(PoolArgs::new(1, 1))
            .add_parser(|_resp| (vec![], vec![]))
            .add_processor(|_item| Ok(None))
            .seed(Url::parse("http://example.com/").unwrap())
            .build()
            .unwrap();
        assert_eq!(args.crawl_depth, 1);
        assert_eq!(args.parsers.len(), 1);
        assert_eq!(args.processors.len(), 1);
        assert_eq!(args.seed.as_str(), "http://example.com/");
    }
}
