//! Analyze stage: one supervisor reading the response channel, one worker
//! per response.
//!
//! The worker runs the user parsers through a pooled analyzer, then
//! dispatches each emitted datum: items go to the item channel, requests go
//! through depth normalization and admission. A request extracted from a
//! response of depth *d* is admitted at depth *d + 1* regardless of what the
//! parser set.

use std::sync::Arc;

use anyhow::anyhow;
use tokio::task::JoinSet;
use tracing::{error, trace};

use crate::data::{Data, Response};
use crate::downloader::HttpClient;
use crate::pool::PoolEntity;
use crate::scheduler::{generate_code, SchedulerCore, ANALYZER_CODE, SCHEDULER_CODE};

pub(crate) fn spawn<C: HttpClient>(core: Arc<SchedulerCore<C>>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let resp_rx = match core.chanman.resp_receiver() {
            Ok(rx) => rx,
            Err(err) => {
                error!("Analyze supervisor could not open the response channel: {}", err);
                return;
            }
        };
        let mut workers = JoinSet::new();
        while let Ok(resp) = resp_rx.recv().await {
            let core = core.clone();
            workers.spawn(async move { analyze_one(core, resp).await });
        }
        while let Some(result) = workers.join_next().await {
            if let Err(err) = result {
                error!("Fatal analysis error: {}", err);
            }
        }
        trace!("Analyze supervisor finished");
    })
}

async fn analyze_one<C: HttpClient>(core: Arc<SchedulerCore<C>>, resp: Response) {
    let lease = match core.analyzer_pool.checkout().await {
        Ok(lease) => lease,
        Err(err) => {
            core.send_error(anyhow!("analyzer pool error: {}", err), SCHEDULER_CODE)
                .await;
            return;
        }
    };
    let code = generate_code(ANALYZER_CODE, lease.id());
    let (data_list, errors) = lease.analyze(&core.parsers, &resp);
    for err in errors {
        core.send_error(err, &code).await;
    }
    let next_depth = resp.depth().saturating_add(1);
    for data in data_list {
        match data {
            Data::Item(item) => {
                core.send_item(item, &code).await;
            }
            Data::Request(req) => {
                let req = if req.depth() == next_depth {
                    req
                } else {
                    req.with_depth(next_depth)
                };
                core.save_req_to_cache(req, &code);
            }
        }
    }
}
