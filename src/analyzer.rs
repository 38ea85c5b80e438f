//! The pooled analyzer that runs user response parsers.

use std::sync::Arc;

use tracing::debug;

use crate::data::{Data, Response};
use crate::pool::PoolEntity;

/// A user-supplied response parser.
///
/// Parsers may return data and errors at once; either list may be empty. A
/// parser reads the response depth from the response itself; the depth of any
/// request it emits is normalized by the analyze stage before admission, so
/// parsers do not have to get it right.
pub type ParseResponse = Arc<dyn Fn(&Response) -> (Vec<Data>, Vec<anyhow::Error>) + Send + Sync>;

/// A pooled analyzer. Stateless apart from its id; pooling bounds how many
/// responses are parsed concurrently.
pub struct Analyzer {
    id: u32,
}

impl Analyzer {
    pub fn new(id: u32) -> Self {
        Analyzer { id }
    }

    /// Runs each parser in order against the response and concatenates their
    /// results.
    pub fn analyze(
        &self,
        parsers: &[ParseResponse],
        resp: &Response,
    ) -> (Vec<Data>, Vec<anyhow::Error>) {
        debug!("Parsing response from {} (depth {})", resp.url(), resp.depth());
        let mut data_list = Vec::new();
        let mut error_list = Vec::new();
        for parser in parsers {
            let (data, errors) = parser(resp);
            data_list.extend(data);
            error_list.extend(errors);
        }
        (data_list, error_list)
    }
}

impl PoolEntity for Analyzer {
    fn id(&self) -> u32 {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Item, Request};
    use anyhow::anyhow;
    use bytes::Bytes;
    use reqwest::header::HeaderMap;
    use reqwest::StatusCode;
    use url::Url;

    fn resp(depth: u32) -> Response {
        Response::new(
            Url::parse("http://example.com/").unwrap(),
            StatusCode::OK,
            HeaderMap::new(),
            Bytes::from("<a href=\"/x\">x</a>"),
            depth,
        )
    }

    #[test]
    fn concatenates_parser_output_in_order() {
        let link_parser: ParseResponse = Arc::new(|resp| {
            let req = Request::new(resp.url().join("/x").unwrap(), resp.depth());
            (vec![Data::Request(req)], vec![])
        });
        let item_parser: ParseResponse = Arc::new(|_resp| {
            (vec![Data::Item(Item::new())], vec![anyhow!("partial parse")])
        });

        let analyzer = Analyzer::new(7);
        let (data, errors) = analyzer.analyze(&[link_parser, item_parser], &resp(1));

        assert_eq!(data.len(), 2);
        assert!(matches!(data[0], Data::Request(_)));
        assert!(matches!(data[1], Data::Item(_)));
        assert_eq!(errors.len(), 1);
        assert_eq!(analyzer.id(), 7);
    }

    #[test]
    fn empty_parser_list_yields_nothing() {
        let analyzer = Analyzer::new(0);
        let (data, errors) = analyzer.analyze(&[], &resp(0));
        assert!(data.is_empty());
        assert!(errors.is_empty());
    }
}
