//! Bounded streaming of a response body into a write sink.

use std::path::Path;

use futures_util::{Stream, StreamExt};
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};

use super::constants::STREAM_CHUNK_SIZE;
use super::error::FetchError;
use crate::hasher::{ContentDigest, ContentHasher};

/// What happened to a streamed body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum StreamResult {
    /// The whole body was written and hashed.
    Complete { bytes: u64, digest: ContentDigest },
    /// The running byte count passed the limit; streaming stopped.
    LimitExceeded { bytes: u64 },
}

/// Copies `stream` into `sink`, hashing as it goes and stopping as soon as
/// more than `limit` bytes have arrived. Bytes past the limit are never
/// written.
///
/// `url` and `path` only give context to errors.
pub(crate) async fn stream_to_sink<S, B, W>(
    mut stream: S,
    sink: &mut W,
    limit: u64,
    url: &str,
    path: &Path,
) -> Result<StreamResult, FetchError>
where
    S: Stream<Item = Result<B, reqwest::Error>> + Unpin,
    B: AsRef<[u8]>,
    W: AsyncWrite + Unpin,
{
    let mut writer = BufWriter::with_capacity(STREAM_CHUNK_SIZE, sink);
    let mut hasher = ContentHasher::new();
    let mut received: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| FetchError::from_transport(url, e))?;
        let chunk = chunk.as_ref();

        received = received.saturating_add(chunk.len() as u64);
        if received > limit {
            return Ok(StreamResult::LimitExceeded { bytes: received });
        }

        writer
            .write_all(chunk)
            .await
            .map_err(|e| FetchError::io(path, e))?;
        hasher.update(chunk);
    }

    writer.flush().await.map_err(|e| FetchError::io(path, e))?;

    Ok(StreamResult::Complete {
        bytes: received,
        digest: hasher.finalize(),
    })
}
