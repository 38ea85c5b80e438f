//! # Item Pipeline
//!
//! Threads each extracted item through an ordered list of user processors.
//!
//! A processor may transform the item (`Ok(Some(..))`), pass it through
//! unchanged (`Ok(None)`), or fail; failures accumulate and, under
//! `fail_fast`, halt the chain. The pipeline keeps atomic counts of items
//! sent, accepted, and processed, plus the number currently inside `send`;
//! the scheduler's idleness check reads that last gauge.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crate::data::Item;

/// A user-supplied item processor. Returning `Ok(None)` leaves the current
/// item unchanged.
pub type ProcessItem = Arc<dyn Fn(&Item) -> Result<Option<Item>, anyhow::Error> + Send + Sync>;

pub struct ItemPipeline {
    processors: Vec<ProcessItem>,
    fail_fast: AtomicBool,
    sent: AtomicU64,
    accepted: AtomicU64,
    processed: AtomicU64,
    processing_number: AtomicU64,
}

// Decrements on every exit path out of `send`, panicking processors
// included.
struct ProcessingGuard<'a>(&'a AtomicU64);

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ItemPipeline {
    pub fn new(processors: Vec<ProcessItem>) -> Self {
        ItemPipeline {
            processors,
            fail_fast: AtomicBool::new(false),
            sent: AtomicU64::new(0),
            accepted: AtomicU64::new(0),
            processed: AtomicU64::new(0),
            processing_number: AtomicU64::new(0),
        }
    }

    /// Runs the item through every processor in order, collecting errors.
    pub fn send(&self, item: Item) -> Vec<anyhow::Error> {
        self.processing_number.fetch_add(1, Ordering::SeqCst);
        let _guard = ProcessingGuard(&self.processing_number);
        self.sent.fetch_add(1, Ordering::SeqCst);
        self.accepted.fetch_add(1, Ordering::SeqCst);

        let mut errs = Vec::new();
        let mut current_item = item;
        for processor in &self.processors {
            match processor(&current_item) {
                Ok(Some(next)) => current_item = next,
                Ok(None) => {}
                Err(err) => {
                    errs.push(err);
                    if self.fail_fast.load(Ordering::SeqCst) {
                        break;
                    }
                }
            }
        }
        self.processed.fetch_add(1, Ordering::SeqCst);
        errs
    }

    pub fn fail_fast(&self) -> bool {
        self.fail_fast.load(Ordering::SeqCst)
    }

    pub fn set_fail_fast(&self, fail_fast: bool) {
        self.fail_fast.store(fail_fast, Ordering::SeqCst);
    }

    /// Counts of items sent, accepted, and processed, in that order.
    pub fn counts(&self) -> [u64; 3] {
        [
            self.sent.load(Ordering::SeqCst),
            self.accepted.load(Ordering::SeqCst),
            self.processed.load(Ordering::SeqCst),
        ]
    }

    /// Number of items currently inside `send`.
    pub fn processing_number(&self) -> u64 {
        self.processing_number.load(Ordering::SeqCst)
    }

    pub fn processor_number(&self) -> usize {
        self.processors.len()
    }

    pub fn summary(&self) -> String {
        let [sent, accepted, processed] = self.counts();
        format!(
            "failFast: {}, processorNumber: {}, sent: {}, accepted: {}, processed: {}, processingNumber: {}",
            self.fail_fast(),
            self.processor_number(),
            sent,
            accepted,
            processed,
            self.processing_number(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use serde_json::json;

    fn item_with(key: &str, value: i64) -> Item {
        let mut item = Item::new();
        item.insert(key.to_string(), json!(value));
        item
    }

    fn annotate(key: &'static str) -> ProcessItem {
        Arc::new(move |item| {
            let mut next = item.clone();
            next.insert(key.to_string(), json!(true));
            Ok(Some(next))
        })
    }

    #[test]
    fn threads_the_item_through_processors_in_order() {
        let pipeline = ItemPipeline::new(vec![annotate("first"), annotate("second")]);
        let errs = pipeline.send(item_with("n", 1));
        assert!(errs.is_empty());
        assert_eq!(pipeline.counts(), [1, 1, 1]);
        assert_eq!(pipeline.processing_number(), 0);
    }

    #[test]
    fn none_result_leaves_current_item_unchanged() {
        let observed = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let noop: ProcessItem = Arc::new(|_| Ok(None));
        let record = {
            let observed = observed.clone();
            let record: ProcessItem = Arc::new(move |item: &Item| {
                observed.lock().push(item.clone());
                Ok(None)
            });
            record
        };
        let pipeline = ItemPipeline::new(vec![annotate("tag"), noop, record]);
        let errs = pipeline.send(item_with("n", 1));
        assert!(errs.is_empty());
        // the no-op did not erase the first processor's transformation
        let seen = observed.lock();
        assert!(seen[0].contains_key("tag"));
        assert_eq!(pipeline.counts(), [1, 1, 1]);
    }

    #[test]
    fn fail_fast_halts_the_chain() {
        let reached = Arc::new(AtomicU64::new(0));
        let failing: ProcessItem = Arc::new(|_| Err(anyhow!("boom")));
        let counting = {
            let reached = reached.clone();
            let counting: ProcessItem = Arc::new(move |_| {
                reached.fetch_add(1, Ordering::SeqCst);
                Ok(None)
            });
            counting
        };

        let pipeline = ItemPipeline::new(vec![failing.clone(), counting.clone()]);
        pipeline.set_fail_fast(true);
        let errs = pipeline.send(Item::new());
        assert_eq!(errs.len(), 1);
        assert_eq!(reached.load(Ordering::SeqCst), 0);
        // processed still counts the halted item
        assert_eq!(pipeline.counts(), [1, 1, 1]);

        let pipeline = ItemPipeline::new(vec![failing, counting.clone()]);
        let errs = pipeline.send(Item::new());
        assert_eq!(errs.len(), 1);
        assert_eq!(reached.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn summary_reflects_counters() {
        let pipeline = ItemPipeline::new(vec![annotate("x")]);
        pipeline.set_fail_fast(true);
        pipeline.send(Item::new());
        assert_eq!(
            pipeline.summary(),
            "failFast: true, processorNumber: 1, sent: 1, accepted: 1, processed: 1, processingNumber: 0"
        );
    }
}
