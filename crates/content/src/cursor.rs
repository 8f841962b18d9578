//! Row and byte streams returned by providers
//!
//! Both streams poll the caller's cancellation token before producing each
//! row or chunk and stop with [`RDroidError::CancellationRequested`] once it
//! is raised. Whatever was already produced is the caller's to discard.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use tokio_util::sync::CancellationToken;

use r_droid_core::{RDroidError, Result};
use r_droid_intent::{Bundle, Value};

use crate::query_args::{EXTRA_HONORED_ARGS, EXTRA_TOTAL_COUNT};

/// One result row, positionally matching the stream's columns
pub type Row = Vec<Value>;

/// Query result
pub struct RowStream {
    columns: Vec<String>,
    extras: Bundle,
    rows: Box<dyn Iterator<Item = Result<Row>> + Send>,
    cancel: CancellationToken,
    finished: bool,
}

impl RowStream {
    /// Stream over rows already in memory
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self::from_rows(columns, rows.into_iter().map(Ok))
    }

    /// Stream over lazily produced rows
    pub fn from_rows<I>(columns: Vec<String>, rows: I) -> Self
    where
        I: Iterator<Item = Result<Row>> + Send + 'static,
    {
        Self {
            columns,
            extras: Bundle::new(),
            rows: Box::new(rows),
            cancel: CancellationToken::new(),
            finished: false,
        }
    }

    pub fn empty(columns: Vec<String>) -> Self {
        Self::new(columns, Vec::new())
    }

    pub fn with_extras(mut self, extras: Bundle) -> Self {
        self.extras = extras;
        self
    }

    /// Tie the stream to the caller's token
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Provider-supplied response extras, passed through unchanged
    pub fn extras(&self) -> &Bundle {
        &self.extras
    }

    /// Query argument keys the provider reports as honored
    pub fn honored_args(&self) -> Option<&[String]> {
        self.extras.get_str_list(EXTRA_HONORED_ARGS)
    }

    pub fn total_count(&self) -> Option<i32> {
        self.extras.get_int(EXTRA_TOTAL_COUNT)
    }

    /// Drain the remaining rows, failing on cancellation or a row error
    pub fn collect_rows(self) -> Result<Vec<Row>> {
        self.collect()
    }
}

impl Iterator for RowStream {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        if self.cancel.is_cancelled() {
            self.finished = true;
            return Some(Err(RDroidError::CancellationRequested));
        }
        let next = self.rows.next();
        if next.is_none() {
            self.finished = true;
        }
        next
    }
}

impl std::fmt::Debug for RowStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowStream")
            .field("columns", &self.columns)
            .field("extras", &self.extras)
            .field("finished", &self.finished)
            .finish()
    }
}

const DEFAULT_CHUNK_SIZE: usize = 8 * 1024;

/// Byte stream behind `open_file` and typed asset files
pub struct AssetStream {
    mime_type: Option<String>,
    reader: Box<dyn Read + Send>,
    cancel: CancellationToken,
    chunk_size: usize,
}

impl AssetStream {
    pub fn from_reader(reader: impl Read + Send + 'static) -> Self {
        Self {
            mime_type: None,
            reader: Box::new(reader),
            cancel: CancellationToken::new(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self::from_reader(std::io::Cursor::new(bytes))
    }

    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self::from_reader(File::open(path)?))
    }

    pub fn with_mime_type(mut self, mime_type: &str) -> Self {
        self.mime_type = Some(mime_type.to_string());
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }

    /// Next chunk, or `None` at end of stream
    pub fn read_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        if self.cancel.is_cancelled() {
            return Err(RDroidError::CancellationRequested);
        }
        let mut buf = vec![0u8; self.chunk_size];
        let n = self.reader.read(&mut buf)?;
        if n == 0 {
            return Ok(None);
        }
        buf.truncate(n);
        Ok(Some(buf))
    }

    pub fn read_to_end(&mut self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        while let Some(chunk) = self.read_chunk()? {
            out.extend_from_slice(&chunk);
        }
        Ok(out)
    }
}

impl std::fmt::Debug for AssetStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetStream")
            .field("mime_type", &self.mime_type)
            .field("chunk_size", &self.chunk_size)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(n: i64) -> Vec<Row> {
        (0..n).map(|i| vec![Value::Long(i), Value::Str(format!("note {}", i))]).collect()
    }

    #[test]
    fn test_collect() {
        let stream = RowStream::new(vec!["_id".into(), "title".into()], rows(3));
        assert_eq!(stream.column_index("title"), Some(1));
        assert_eq!(stream.collect_rows().unwrap().len(), 3);
    }

    #[test]
    fn test_cancel_mid_stream() {
        let token = CancellationToken::new();
        let mut stream = RowStream::new(vec!["_id".into()], rows(5)).with_cancellation(token.clone());

        assert!(stream.next().unwrap().is_ok());
        token.cancel();
        assert!(matches!(stream.next(), Some(Err(RDroidError::CancellationRequested))));
        assert!(stream.next().is_none());
    }

    #[test]
    fn test_honored_args_passthrough() {
        let extras = Bundle::new()
            .with(EXTRA_HONORED_ARGS, Value::StrList(vec!["android:query-arg-limit".into()]))
            .with(EXTRA_TOTAL_COUNT, 42);
        let stream = RowStream::empty(vec![]).with_extras(extras);
        assert_eq!(stream.honored_args().unwrap(), ["android:query-arg-limit".to_string()]);
        assert_eq!(stream.total_count(), Some(42));
    }

    #[test]
    fn test_asset_chunks_and_cancel() {
        let token = CancellationToken::new();
        let mut asset = AssetStream::from_bytes(b"hello world".to_vec())
            .with_chunk_size(4)
            .with_cancellation(token.clone());

        assert_eq!(asset.read_chunk().unwrap().unwrap(), b"hell");
        token.cancel();
        assert!(matches!(asset.read_chunk(), Err(RDroidError::CancellationRequested)));
    }

    #[test]
    fn test_asset_read_to_end() {
        let mut asset = AssetStream::from_bytes(b"hello world".to_vec()).with_chunk_size(3);
        assert_eq!(asset.read_to_end().unwrap(), b"hello world");
    }
}
