//! Read-only snapshot of scheduler state.

use std::fmt;

use serde::Serialize;

use crate::channels::ChannelManagerSummary;
use crate::config::{ChannelArgs, PoolArgs};
use crate::downloader::HttpClient;
use crate::scheduler::SchedulerCore;

/// Usage of one entity pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolSummary {
    pub total: u32,
    pub used: u32,
}

/// A point-in-time view of one crawl run. Call
/// [`Scheduler::summary`](crate::Scheduler::summary) again for a fresh one.
#[derive(Debug, Clone, Serialize)]
pub struct SchedSummary {
    pub prefix: String,
    pub running: bool,
    pub channel_args: ChannelArgs,
    pub pool_args: PoolArgs,
    pub crawl_depth: u32,
    pub primary_domain: String,
    pub chanman: ChannelManagerSummary,
    pub downloader_pool: PoolSummary,
    pub analyzer_pool: PoolSummary,
    pub item_pipeline: String,
    pub request_cache: String,
    pub urls_seen: usize,
    pub stop_sign: String,
}

impl SchedSummary {
    pub(crate) fn new<C: HttpClient>(
        core: &SchedulerCore<C>,
        running: bool,
        prefix: &str,
    ) -> Self {
        SchedSummary {
            prefix: prefix.to_string(),
            running,
            channel_args: core.channel_args,
            pool_args: core.pool_args,
            crawl_depth: core.crawl_depth,
            primary_domain: core.primary_domain.clone(),
            chanman: core.chanman.summary(),
            downloader_pool: PoolSummary {
                total: core.dl_pool.total(),
                used: core.dl_pool.used(),
            },
            analyzer_pool: PoolSummary {
                total: core.analyzer_pool.total(),
                used: core.analyzer_pool.used(),
            },
            item_pipeline: core.pipeline.summary(),
            request_cache: core.req_cache.summary(),
            urls_seen: core.url_registry.len(),
            stop_sign: core.stop_sign.summary(),
        }
    }
}

impl fmt::Display for SchedSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = &self.prefix;
        writeln!(f, "{}running: {}", p, self.running)?;
        writeln!(f, "{}channelArgs: {}", p, self.channel_args)?;
        writeln!(f, "{}poolArgs: {}", p, self.pool_args)?;
        writeln!(f, "{}crawlDepth: {}", p, self.crawl_depth)?;
        writeln!(f, "{}primaryDomain: {}", p, self.primary_domain)?;
        writeln!(f, "{}chanman: {}", p, self.chanman)?;
        writeln!(
            f,
            "{}downloaderPool: {}/{}",
            p, self.downloader_pool.used, self.downloader_pool.total
        )?;
        writeln!(
            f,
            "{}analyzerPool: {}/{}",
            p, self.analyzer_pool.used, self.analyzer_pool.total
        )?;
        writeln!(f, "{}itemPipeline: {}", p, self.item_pipeline)?;
        writeln!(f, "{}requestCache: {}", p, self.request_cache)?;
        writeln!(f, "{}urlsSeen: {}", p, self.urls_seen)?;
        writeln!(f, "{}stopSign: {}", p, self.stop_sign)
    }
}
