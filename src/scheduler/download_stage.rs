//! Download stage: one supervisor reading the request channel, one worker
//! per request.

use std::sync::Arc;

use anyhow::anyhow;
use tokio::task::JoinSet;
use tracing::{error, trace};

use crate::data::Request;
use crate::downloader::HttpClient;
use crate::pool::PoolEntity;
use crate::scheduler::{generate_code, SchedulerCore, DOWNLOADER_CODE, SCHEDULER_CODE};

pub(crate) fn spawn<C: HttpClient>(core: Arc<SchedulerCore<C>>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let req_rx = match core.chanman.req_receiver() {
            Ok(rx) => rx,
            Err(err) => {
                error!("Download supervisor could not open the request channel: {}", err);
                return;
            }
        };
        let mut workers = JoinSet::new();
        while let Ok(req) = req_rx.recv().await {
            let core = core.clone();
            workers.spawn(async move { download_one(core, req).await });
        }
        // request channel closed; wait out the in-flight workers
        while let Some(result) = workers.join_next().await {
            if let Err(err) = result {
                error!("Fatal download error: {}", err);
            }
        }
        trace!("Download supervisor finished");
    })
}

async fn download_one<C: HttpClient>(core: Arc<SchedulerCore<C>>, req: Request) {
    let lease = match core.dl_pool.checkout().await {
        Ok(lease) => lease,
        Err(err) => {
            core.send_error(anyhow!("downloader pool error: {}", err), SCHEDULER_CODE)
                .await;
            return;
        }
    };
    let code = generate_code(DOWNLOADER_CODE, lease.id());
    trace!("Downloading {} (depth {})", req.url(), req.depth());
    match lease.download(&req).await {
        Ok(resp) => {
            core.send_resp(resp, &code).await;
        }
        Err(err) => {
            core.send_error(err, &code).await;
        }
    }
}
