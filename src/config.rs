//! Structural configuration passed to [`Scheduler::start`](crate::Scheduler::start).

use std::fmt;

use serde::Serialize;

use crate::error::StartError;

/// Capacities of the four typed channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChannelArgs {
    req_chan_len: u32,
    resp_chan_len: u32,
    item_chan_len: u32,
    error_chan_len: u32,
}

impl ChannelArgs {
    pub fn new(req_chan_len: u32, resp_chan_len: u32, item_chan_len: u32, error_chan_len: u32) -> Self {
        ChannelArgs {
            req_chan_len,
            resp_chan_len,
            item_chan_len,
            error_chan_len,
        }
    }

    /// Every capacity must be positive.
    pub fn check(&self) -> Result<(), StartError> {
        if self.req_chan_len == 0
            || self.resp_chan_len == 0
            || self.item_chan_len == 0
            || self.error_chan_len == 0
        {
            return Err(StartError::InvalidChannelArgs(self.to_string()));
        }
        Ok(())
    }

    pub fn req_chan_len(&self) -> u32 {
        self.req_chan_len
    }

    pub fn resp_chan_len(&self) -> u32 {
        self.resp_chan_len
    }

    pub fn item_chan_len(&self) -> u32 {
        self.item_chan_len
    }

    pub fn error_chan_len(&self) -> u32 {
        self.error_chan_len
    }
}

impl Default for ChannelArgs {
    fn default() -> Self {
        ChannelArgs::new(10, 10, 10, 10)
    }
}

impl fmt::Display for ChannelArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "reqChanLen: {}, respChanLen: {}, itemChanLen: {}, errorChanLen: {}",
            self.req_chan_len, self.resp_chan_len, self.item_chan_len, self.error_chan_len
        )
    }
}

/// Capacities of the downloader and analyzer pools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolArgs {
    downloader_pool_size: u32,
    analyzer_pool_size: u32,
}

impl PoolArgs {
    pub fn new(downloader_pool_size: u32, analyzer_pool_size: u32) -> Self {
        PoolArgs {
            downloader_pool_size,
            analyzer_pool_size,
        }
    }

    /// Every pool size must be positive.
    pub fn check(&self) -> Result<(), StartError> {
        if self.downloader_pool_size == 0 || self.analyzer_pool_size == 0 {
            return Err(StartError::InvalidPoolArgs(self.to_string()));
        }
        Ok(())
    }

    pub fn downloader_pool_size(&self) -> u32 {
        self.downloader_pool_size
    }

    pub fn analyzer_pool_size(&self) -> u32 {
        self.analyzer_pool_size
    }
}

impl Default for PoolArgs {
    fn default() -> Self {
        PoolArgs::new(3, 3)
    }
}

impl fmt::Display for PoolArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "downloaderPoolSize: {}, analyzerPoolSize: {}",
            self.downloader_pool_size, self.analyzer_pool_size
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_capacities_are_rejected() {
        assert!(ChannelArgs::new(0, 10, 10, 10).check().is_err());
        assert!(ChannelArgs::new(10, 10, 10, 0).check().is_err());
        assert!(ChannelArgs::new(1, 1, 1, 1).check().is_ok());

        assert!(PoolArgs::new(0, 3).check().is_err());
        assert!(PoolArgs::new(3, 0).check().is_err());
        assert!(PoolArgs::new(1, 1).check().is_ok());
    }
}
