use std::fmt;

use futures::stream::{self, BoxStream};
use futures::StreamExt;

use super::fetch::FetchError;
use crate::prelude::{Future, Stream};

/// Where the tile pixel size comes from
///
/// Usually a single asynchronous lookup, but any finite stream works; the
/// combinator keeps using the last size it saw after the source finishes.
pub struct TileSizeSource {
    stream: BoxStream<'static, Result<u32, FetchError>>,
}

impl TileSizeSource {
    /// A size known up front
    pub fn fixed(tile_size_px: u32) -> Self {
        Self::from_values([tile_size_px])
    }

    /// A finite, already known sequence of sizes
    pub fn from_values<I>(sizes: I) -> Self
    where
        I: IntoIterator<Item = u32>,
        I::IntoIter: Send + 'static,
    {
        Self {
            stream: stream::iter(sizes.into_iter().map(Ok)).boxed(),
        }
    }

    /// A one-shot asynchronous lookup
    pub fn from_future<F>(future: F) -> Self
    where
        F: Future<Output = Result<u32, FetchError>> + Send + 'static,
    {
        Self {
            stream: stream::once(future).boxed(),
        }
    }

    pub fn from_stream<S>(sizes: S) -> Self
    where
        S: Stream<Item = Result<u32, FetchError>> + Send + 'static,
    {
        Self {
            stream: sizes.boxed(),
        }
    }

    pub(crate) fn into_stream(self) -> BoxStream<'static, Result<u32, FetchError>> {
        self.stream
    }
}

impl fmt::Debug for TileSizeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TileSizeSource").finish_non_exhaustive()
    }
}
