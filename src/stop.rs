//! One-shot broadcast cancellation with per-handler acknowledgment counters.

use std::collections::HashMap;

use parking_lot::RwLock;

#[derive(Debug, Default)]
struct StopState {
    signed: bool,
    deal_counts: HashMap<String, u32>,
}

/// The stop sign every guarded channel send consults.
///
/// `sign` flips the flag once; each handler that observes the signed flag and
/// abandons a value records that under its own code via `deal`.
#[derive(Debug, Default)]
pub struct StopSign {
    state: RwLock<StopState>,
}

impl StopSign {
    pub fn new() -> Self {
        StopSign::default()
    }

    /// Sets the flag. Returns `false` if it was already set.
    pub fn sign(&self) -> bool {
        let mut state = self.state.write();
        if state.signed {
            return false;
        }
        state.signed = true;
        true
    }

    pub fn signed(&self) -> bool {
        self.state.read().signed
    }

    /// Records that the handler identified by `code` acknowledged the stop.
    /// A no-op while the sign is not set.
    pub fn deal(&self, code: &str) {
        let mut state = self.state.write();
        if !state.signed {
            return;
        }
        *state.deal_counts.entry(code.to_string()).or_insert(0) += 1;
    }

    /// Withdraws the sign and clears all acknowledgment records.
    pub fn reset(&self) {
        let mut state = self.state.write();
        state.signed = false;
        state.deal_counts.clear();
    }

    pub fn deal_count(&self, code: &str) -> u32 {
        self.state.read().deal_counts.get(code).copied().unwrap_or(0)
    }

    pub fn deal_total(&self) -> u32 {
        self.state.read().deal_counts.values().sum()
    }

    pub fn summary(&self) -> String {
        let state = self.state.read();
        if state.signed {
            let mut codes: Vec<_> = state.deal_counts.iter().collect();
            codes.sort_by_key(|(code, _)| code.as_str());
            let counts: Vec<String> = codes
                .iter()
                .map(|(code, count)| format!("{}: {}", code, count))
                .collect();
            format!("signed: true, dealCount: {{{}}}", counts.join(", "))
        } else {
            "signed: false".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_is_idempotent() {
        let sign = StopSign::new();
        assert!(!sign.signed());
        assert!(sign.sign());
        assert!(sign.signed());
        assert!(!sign.sign());
        assert!(sign.signed());
    }

    #[test]
    fn deal_only_counts_after_signing() {
        let sign = StopSign::new();
        sign.deal("downloader-0");
        assert_eq!(sign.deal_total(), 0);

        sign.sign();
        sign.deal("downloader-0");
        sign.deal("downloader-0");
        sign.deal("scheduler");
        assert_eq!(sign.deal_count("downloader-0"), 2);
        assert_eq!(sign.deal_count("scheduler"), 1);
        assert_eq!(sign.deal_count("analyzer-1"), 0);
        assert_eq!(sign.deal_total(), 3);
    }

    #[test]
    fn reset_clears_flag_and_records() {
        let sign = StopSign::new();
        sign.sign();
        sign.deal("scheduler");
        sign.reset();
        assert!(!sign.signed());
        assert_eq!(sign.deal_total(), 0);
        assert_eq!(sign.summary(), "signed: false");
    }

    #[test]
    fn summary_lists_deal_counts() {
        let sign = StopSign::new();
        sign.sign();
        sign.deal("scheduler");
        assert_eq!(sign.summary(), "signed: true, dealCount: {scheduler: 1}");
    }
}
