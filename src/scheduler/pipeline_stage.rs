//! Item-pipeline stage: one supervisor reading the item channel, one
//! short-lived worker per item.

use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{error, trace};

use crate::downloader::HttpClient;
use crate::scheduler::{SchedulerCore, ITEM_PIPELINE_CODE};

pub(crate) fn spawn<C: HttpClient>(core: Arc<SchedulerCore<C>>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let item_rx = match core.chanman.item_receiver() {
            Ok(rx) => rx,
            Err(err) => {
                error!("Pipeline supervisor could not open the item channel: {}", err);
                return;
            }
        };
        let mut workers = JoinSet::new();
        while let Ok(item) = item_rx.recv().await {
            let core = core.clone();
            workers.spawn(async move {
                let errs = core.pipeline.send(item);
                for err in errs {
                    core.send_error(err, ITEM_PIPELINE_CODE).await;
                }
            });
        }
        while let Some(result) = workers.join_next().await {
            if let Err(err) = result {
                error!("Fatal item processing error: {}", err);
            }
        }
        trace!("Pipeline supervisor finished");
    })
}
