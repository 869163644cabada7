//! Streaming helpers for iterating Qdrant scroll endpoints without manual loops.

use async_stream::try_stream;
use futures_core::Stream;

use super::client::QdrantService;
use super::types::{Point, QdrantError, ScrollRequest};

/// Stream every point of a collection, following scroll cursors until exhausted.
///
/// `request.offset` is used as the starting cursor, so a partially consumed scroll can be
/// resumed.
pub fn stream_points<'a>(
    service: &'a QdrantService,
    collection: &'a str,
    request: ScrollRequest,
) -> impl Stream<Item = Result<Point, QdrantError>> + 'a {
    try_stream! {
        let mut request = request;

        loop {
            let page = service.scroll_points(collection, &request).await?;
            for point in page.points {
                yield point;
            }

            match page.next_offset {
                Some(next) => request.offset = Some(next),
                None => break,
            }
        }
    }
}
