//! Pagination: collect every record of a list endpoint.
//!
//! ## Continuation rule
//!
//! Keep fetching while the page advertises `links.next` **or** came back
//! exactly full. The API's next link is not always present on the last
//! page, so a full page is taken as "there may be more". A last page that
//! happens to be full costs one extra, empty request; an empty page always
//! ends the loop.

use crate::error::CloudConvertError;
use crate::filters::Query;
use crate::model::Page;
use serde_json::Value;
use std::future::Future;
use tracing::debug;

/// Records requested per page.
pub const PAGE_SIZE: usize = 100;

/// Something that can return one page of a list endpoint.
///
/// [`crate::client::CloudConvertClient`] implements it over HTTP; tests use
/// an in-memory source.
pub trait PageSource {
    fn fetch_page(
        &self,
        endpoint: &str,
        query: &Query,
    ) -> impl Future<Output = Result<Page, CloudConvertError>> + Send;
}

/// Fetch all records of `endpoint`, in order.
///
/// `base_query` (usually filter pairs) is sent with every page, followed by
/// `per_page` and `page` (1-based).
pub async fn fetch_all<S: PageSource + Sync>(
    source: &S,
    endpoint: &str,
    base_query: &Query,
) -> Result<Vec<Value>, CloudConvertError> {
    let mut records = Vec::new();
    let mut page_num = 1usize;

    loop {
        let mut query = base_query.clone();
        query.push(("per_page".to_string(), PAGE_SIZE.to_string()));
        query.push(("page".to_string(), page_num.to_string()));

        let page = source.fetch_page(endpoint, &query).await?;
        let count = page.data.len();
        let more = count > 0 && (page.has_next() || count == PAGE_SIZE);
        debug!("{}: page {} returned {} records", endpoint, page_num, count);

        records.extend(page.data);
        if !more {
            break;
        }
        page_num += 1;
    }

    Ok(records)
}
