//! A "prelude" for users of the `trawler-core` crate.
//!
//! # Example
//!
//! ```
//! use trawler_core::prelude::*;
//! ```

pub use crate::{
    // Engine façade
    Scheduler,
    // Argument assembly
    ChannelArgs,
    CrawlArgs,
    CrawlBuilder,
    PoolArgs,
    // Dataflow values
    Data,
    Item,
    Request,
    Response,
    // The HTTP seam
    HttpClient,
    RawResponse,
    // Errors
    CrawlError,
    ErrorKind,
    StartError,
    // Essential re-export for HttpClient implementations
    async_trait,
};
