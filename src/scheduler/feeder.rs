//! The feeder: sole writer of the request channel.
//!
//! On a fixed tick it moves buffered requests from the request cache into
//! the request channel, never exceeding the channel's free capacity, so a
//! full channel back-pressures into the unbounded cache instead of blocking
//! the analyze workers.

use std::sync::Arc;
use std::time::Duration;

use tracing::trace;

use crate::downloader::HttpClient;
use crate::scheduler::{SchedulerCore, SCHEDULER_CODE};

pub(crate) fn spawn<C: HttpClient>(
    core: Arc<SchedulerCore<C>>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            if core.stop_sign.signed() {
                core.stop_sign.deal(SCHEDULER_CODE);
                trace!("Feeder acknowledged the stop sign");
                return;
            }
            let Ok(req_tx) = core.chanman.req_sender() else {
                return;
            };
            let capacity = core.channel_args.req_chan_len() as usize;
            let mut free = capacity.saturating_sub(req_tx.len());
            while free > 0 {
                let Some(req) = core.req_cache.get() else {
                    break;
                };
                trace!("Feeding request {} (depth {})", req.url(), req.depth());
                if req_tx.send(req).await.is_err() {
                    break;
                }
                free -= 1;
            }
            tokio::time::sleep(interval).await;
        }
    })
}
