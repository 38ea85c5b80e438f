//! # Scheduler
//!
//! The concurrency engine that coordinates the four crawl stages over the
//! typed channels and the two entity pools.
//!
//! ## Overview
//!
//! `Scheduler::start` wires everything together: the channel manager, the
//! downloader and analyzer pools, the item pipeline, the request cache, and
//! the seen-URL registry. It then spawns one long-lived supervisor task per
//! stage plus the feeder, seeds the request cache with the first request at
//! depth 0, and blocks until every supervisor has exited, which happens only
//! after `stop` signs the stop sign and closes the channels.
//!
//! ## Dataflow
//!
//! ```text
//! seed -> request cache -> request chan -> download stage -> response chan
//!      -> analyze stage -> { item chan -> pipeline stage, request cache }
//! ```
//!
//! Errors from every stage fan into the error channel, which `error_chan`
//! exposes read-only. Every send onto a channel (and every push into the
//! request cache) is guarded by the stop sign: once signed, senders
//! acknowledge under their worker code and abandon the value, so shutdown
//! drains without deadlock.

mod analyze_stage;
mod download_stage;
mod feeder;
mod pipeline_stage;
mod summary;

pub use summary::{PoolSummary, SchedSummary};

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use kanal::AsyncReceiver;
use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tracing::{error, info, trace, warn};
use url::Url;

use crate::analyzer::{Analyzer, ParseResponse};
use crate::cache::RequestCache;
use crate::channels::ChannelManager;
use crate::config::{ChannelArgs, PoolArgs};
use crate::data::{Item, Request, Response};
use crate::domain::{primary_domain, UrlRegistry};
use crate::downloader::{HttpClient, PageDownloader};
use crate::error::{CrawlError, ErrorKind, StartError};
use crate::pipeline::{ItemPipeline, ProcessItem};
use crate::pool::{IdGenerator, Pool};
use crate::stop::StopSign;

pub(crate) const DOWNLOADER_CODE: &str = "downloader";
pub(crate) const ANALYZER_CODE: &str = "analyzer";
pub(crate) const ITEM_PIPELINE_CODE: &str = "item_pipeline";
pub(crate) const SCHEDULER_CODE: &str = "scheduler";

/// Interval of the feeder that drains the request cache into the request
/// channel.
const FEED_INTERVAL: Duration = Duration::from_millis(10);

const UNSTARTED: u32 = 0;
const RUNNING: u32 = 1;
const STOPPED: u32 = 2;

/// `"<prefix>-<id>"` code identifying one pooled worker instance.
pub(crate) fn generate_code(prefix: &str, id: u32) -> String {
    format!("{}-{}", prefix, id)
}

/// Splits a worker code back into its stage prefix.
pub(crate) fn parse_code(code: &str) -> &str {
    match code.find('-') {
        Some(index) if index > 0 => &code[..index],
        _ => code,
    }
}

/// Everything `Scheduler::start` needs.
pub struct CrawlArgs<C: HttpClient> {
    pub channel_args: ChannelArgs,
    pub pool_args: PoolArgs,
    /// Requests deeper than this are dropped at admission. The seed has
    /// depth 0.
    pub crawl_depth: u32,
    /// Called once per downloader at pool construction.
    pub client_factory: Arc<dyn Fn() -> C + Send + Sync>,
    pub parsers: Vec<ParseResponse>,
    pub processors: Vec<ProcessItem>,
    pub seed: Url,
}

/// Shared state of one crawl run. Stage supervisors and workers hold an
/// `Arc` to it.
pub(crate) struct SchedulerCore<C: HttpClient> {
    pub(crate) channel_args: ChannelArgs,
    pub(crate) pool_args: PoolArgs,
    pub(crate) crawl_depth: u32,
    pub(crate) primary_domain: String,
    pub(crate) chanman: ChannelManager,
    pub(crate) stop_sign: Arc<StopSign>,
    pub(crate) dl_pool: Pool<PageDownloader<C>>,
    pub(crate) analyzer_pool: Pool<Analyzer>,
    pub(crate) pipeline: ItemPipeline,
    pub(crate) req_cache: RequestCache,
    pub(crate) url_registry: UrlRegistry,
    pub(crate) parsers: Vec<ParseResponse>,
}

impl<C: HttpClient> SchedulerCore<C> {
    /// Stop-guarded send onto the response channel.
    pub(crate) async fn send_resp(&self, resp: Response, code: &str) -> bool {
        if self.stop_sign.signed() {
            self.stop_sign.deal(code);
            return false;
        }
        match self.chanman.resp_sender() {
            Ok(tx) => tx.send(resp).await.is_ok(),
            Err(_) => false,
        }
    }

    /// Stop-guarded send onto the item channel.
    pub(crate) async fn send_item(&self, item: Item, code: &str) -> bool {
        if self.stop_sign.signed() {
            self.stop_sign.deal(code);
            return false;
        }
        match self.chanman.item_sender() {
            Ok(tx) => tx.send(item).await.is_ok(),
            Err(_) => false,
        }
    }

    /// Stop-guarded fan-in onto the error channel. The error kind is derived
    /// from the worker code's stage prefix.
    pub(crate) async fn send_error(&self, err: anyhow::Error, code: &str) -> bool {
        let kind = match parse_code(code) {
            DOWNLOADER_CODE => ErrorKind::Downloader,
            ANALYZER_CODE => ErrorKind::Analyzer,
            ITEM_PIPELINE_CODE => ErrorKind::ItemProcessor,
            _ => ErrorKind::Scheduler,
        };
        let crawl_err = CrawlError::new(kind, err.to_string());
        if self.stop_sign.signed() {
            self.stop_sign.deal(code);
            return false;
        }
        match self.chanman.error_sender() {
            Ok(tx) => tx.send(crawl_err).await.is_ok(),
            Err(_) => false,
        }
    }

    /// Admission: applies the scheme, dedup, domain, depth, and stop checks
    /// in order and buffers the request on success. Rejections are warnings,
    /// not errors.
    pub(crate) fn save_req_to_cache(&self, req: Request, code: &str) -> bool {
        let url = req.url().clone();
        if !url.scheme().eq_ignore_ascii_case("http") {
            warn!("Ignored request {}: scheme '{}' is not http", url, url.scheme());
            return false;
        }
        if self.url_registry.contains(url.as_str()) {
            warn!("Ignored request {}: url already scheduled", url);
            return false;
        }
        let host = url.host_str().unwrap_or("");
        match primary_domain(host) {
            Ok(pd) if pd == self.primary_domain => {}
            _ => {
                warn!(
                    "Ignored request {}: host '{}' is outside primary domain '{}'",
                    url, host, self.primary_domain
                );
                return false;
            }
        }
        if req.depth() > self.crawl_depth {
            warn!(
                "Ignored request {}: depth {} exceeds crawl depth {}",
                url,
                req.depth(),
                self.crawl_depth
            );
            return false;
        }
        if self.stop_sign.signed() {
            self.stop_sign.deal(code);
            return false;
        }
        // the registry decides races between concurrent analyze workers:
        // at most one insert succeeds per url
        if !self.url_registry.insert(url.as_str()) {
            warn!("Ignored request {}: url already scheduled", url);
            return false;
        }
        self.req_cache.put(req);
        true
    }

    pub(crate) fn idle(&self) -> bool {
        self.dl_pool.used() == 0
            && self.analyzer_pool.used() == 0
            && self.pipeline.processing_number() == 0
    }
}

/// The crawl engine façade.
///
/// One instance drives at most one run at a time; a stopped scheduler can be
/// started again.
pub struct Scheduler<C: HttpClient = reqwest::Client> {
    running: AtomicU32,
    stop_sign: Arc<StopSign>,
    core: RwLock<Option<Arc<SchedulerCore<C>>>>,
}

impl<C: HttpClient> Default for Scheduler<C> {
    fn default() -> Self {
        Scheduler::new()
    }
}

impl<C: HttpClient> Scheduler<C> {
    pub fn new() -> Self {
        Scheduler {
            running: AtomicU32::new(UNSTARTED),
            stop_sign: Arc::new(StopSign::new()),
            core: RwLock::new(None),
        }
    }

    /// Validates the arguments, wires the components, spawns the four stage
    /// supervisors, seeds the crawl, and blocks until the supervisors exit
    /// (i.e. until [`stop`](Scheduler::stop) is called).
    pub async fn start(&self, args: CrawlArgs<C>) -> Result<(), StartError> {
        let prev = self.running.load(Ordering::SeqCst);
        if prev == RUNNING {
            return Err(StartError::AlreadyRunning);
        }
        if self
            .running
            .compare_exchange(prev, RUNNING, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(StartError::AlreadyRunning);
        }

        let handles = match self.wire(args) {
            Ok(handles) => handles,
            Err(err) => {
                self.running.store(prev, Ordering::SeqCst);
                return Err(err);
            }
        };

        for result in join_all(handles).await {
            if let Err(err) = result {
                error!("A stage supervisor failed: {}", err);
            }
        }
        trace!("All stage supervisors exited");
        Ok(())
    }

    fn wire(&self, args: CrawlArgs<C>) -> Result<Vec<JoinHandle<()>>, StartError> {
        let CrawlArgs {
            channel_args,
            pool_args,
            crawl_depth,
            client_factory,
            parsers,
            processors,
            seed,
        } = args;

        channel_args.check()?;
        pool_args.check()?;
        if parsers.is_empty() {
            return Err(StartError::EmptyParserList);
        }
        if processors.is_empty() {
            return Err(StartError::EmptyProcessorList);
        }
        let host = seed
            .host_str()
            .ok_or_else(|| StartError::InvalidSeed(format!("the url '{}' has no host", seed)))?;
        let primary_domain = primary_domain(host)?;

        self.stop_sign.reset();

        // the factory is user code; a panic here is a start failure, not a
        // process abort
        let dl_ids = IdGenerator::new();
        let dl_pool = catch_unwind(AssertUnwindSafe(|| {
            Pool::new(pool_args.downloader_pool_size(), || {
                PageDownloader::new(dl_ids.next_id(), client_factory())
            })
        }))
        .map_err(|payload| StartError::Panic(panic_message(payload)))??;

        let an_ids = IdGenerator::new();
        let analyzer_pool = Pool::new(pool_args.analyzer_pool_size(), || {
            Analyzer::new(an_ids.next_id())
        })?;

        let pipeline = ItemPipeline::new(processors);
        pipeline.set_fail_fast(true);

        let core = Arc::new(SchedulerCore {
            channel_args,
            pool_args,
            crawl_depth,
            primary_domain,
            chanman: ChannelManager::new(channel_args),
            stop_sign: self.stop_sign.clone(),
            dl_pool,
            analyzer_pool,
            pipeline,
            req_cache: RequestCache::new(),
            url_registry: UrlRegistry::new(),
            parsers,
        });
        *self.core.write() = Some(core.clone());

        let handles = vec![
            download_stage::spawn(core.clone()),
            analyze_stage::spawn(core.clone()),
            pipeline_stage::spawn(core.clone()),
            feeder::spawn(core.clone(), FEED_INTERVAL),
        ];

        // seed at depth 0, recorded in the registry so it is never
        // re-admitted
        core.url_registry.insert(seed.as_str());
        core.req_cache.put(Request::new(seed, 0));
        info!(
            "Scheduler started (primaryDomain={}, crawlDepth={})",
            core.primary_domain, crawl_depth
        );
        Ok(handles)
    }

    /// Signs the stop sign, closes the channels and the request cache, and
    /// marks the scheduler stopped. Returns `false` if it was not running.
    ///
    /// In-flight workers observe the signed stop sign at their next guarded
    /// send and abandon their output; channel closure reaches each
    /// supervisor as end-of-input, which unblocks `start`.
    pub fn stop(&self) -> bool {
        if self
            .running
            .compare_exchange(RUNNING, STOPPED, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return false;
        }
        let core = self.core.read().clone();
        if let Some(core) = core {
            core.stop_sign.sign();
            core.chanman.close();
            core.req_cache.close();
        }
        info!("Scheduler stopped");
        true
    }

    pub fn running(&self) -> bool {
        self.running.load(Ordering::SeqCst) == RUNNING
    }

    /// The read side of the error channel, while the channel manager is
    /// initialized.
    pub fn error_chan(&self) -> Option<AsyncReceiver<CrawlError>> {
        let core = self.core.read();
        core.as_ref()?.chanman.error_receiver().ok()
    }

    /// Whether every stage is quiescent: no downloader or analyzer checked
    /// out and no item inside the pipeline.
    pub fn idle(&self) -> bool {
        match self.core.read().as_ref() {
            Some(core) => core.idle(),
            None => false,
        }
    }

    /// Snapshot of the run's observable state. `None` before the first
    /// start.
    pub fn summary(&self, prefix: &str) -> Option<SchedSummary> {
        let core = self.core.read();
        core.as_ref()
            .map(|core| SchedSummary::new(core, self.running(), prefix))
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
