//! Line-by-line decoding of newline-delimited JSON results.

use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::stream::{self, BoxStream, Stream};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};

use crate::bulk::BulkOperationError;

/// A lazy, single-pass stream of bulk operation result records.
///
/// Each item is one decoded line of the result file, in file order. Only
/// the current line is held in memory; blank lines are skipped. The stream
/// owns its source, so a downloaded temporary file is released as soon as
/// the stream is dropped, whether it was consumed to the end or not.
///
/// # Example
///
/// ```rust
/// use futures::TryStreamExt;
/// use shopify_client::bulk::BulkRecords;
///
/// # tokio_test::block_on(async {
/// let data: &[u8] = b"{\"id\":1}\n{\"id\":2}\n";
/// let records: Vec<_> = BulkRecords::from_reader(data).try_collect().await.unwrap();
///
/// assert_eq!(records.len(), 2);
/// assert_eq!(records[1]["id"], 2);
/// # });
/// ```
pub struct BulkRecords {
    inner: BoxStream<'static, Result<Value, BulkOperationError>>,
}

impl BulkRecords {
    /// Decodes records from any buffered reader.
    pub fn from_reader<R>(reader: R) -> Self
    where
        R: AsyncBufRead + Unpin + Send + 'static,
    {
        let inner = stream::try_unfold((reader.lines(), 0_usize), |(lines, line)| {
            next_record(lines, line)
        });

        Self {
            inner: Box::pin(inner),
        }
    }

    /// A stream without records, for operations that matched nothing.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            inner: Box::pin(stream::empty()),
        }
    }
}

/// Reads up to the next non-blank line and decodes it. `line` counts the
/// lines read so far, blank ones included.
async fn next_record<R>(
    mut lines: Lines<R>,
    mut line: usize,
) -> Result<Option<(Value, (Lines<R>, usize))>, BulkOperationError>
where
    R: AsyncBufRead + Unpin,
{
    while let Some(text) = lines.next_line().await? {
        line += 1;
        if text.trim().is_empty() {
            continue;
        }
        let record: Value = serde_json::from_str(&text)
            .map_err(|source| BulkOperationError::Decode { line, source })?;
        return Ok(Some((record, (lines, line))));
    }
    Ok(None)
}

impl Stream for BulkRecords {
    type Item = Result<Value, BulkOperationError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

impl fmt::Debug for BulkRecords {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BulkRecords").finish_non_exhaustive()
    }
}
