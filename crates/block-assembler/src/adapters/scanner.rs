//! Line scanner
//!
//! Reads raw lines from the upstream byte source and forwards only those
//! carrying the instrumentation marker, preserving source order. Unrelated
//! output interleaved by the node is skipped without decoding it.

use crate::domain::events::MARKER;
use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

pub struct LineScanner<R> {
    reader: R,
    buf: Vec<u8>,
    lines_seen: u64,
}

impl<R: AsyncBufRead + Unpin> LineScanner<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::with_capacity(4096),
            lines_seen: 0,
        }
    }

    /// Next instrumentation line with its terminator stripped, or `None` at
    /// end of input.
    pub async fn next_line(&mut self) -> io::Result<Option<String>> {
        loop {
            self.buf.clear();
            if self.reader.read_until(b'\n', &mut self.buf).await? == 0 {
                return Ok(None);
            }
            self.lines_seen += 1;

            let raw = trim_line_end(&self.buf);
            if !is_instrumentation(raw) {
                continue;
            }

            let line = std::str::from_utf8(raw)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            return Ok(Some(line.to_string()));
        }
    }

    /// Lines read so far, instrumentation or not
    pub fn lines_seen(&self) -> u64 {
        self.lines_seen
    }
}

fn trim_line_end(buf: &[u8]) -> &[u8] {
    let mut end = buf.len();
    while end > 0 && matches!(buf[end - 1], b'\n' | b'\r') {
        end -= 1;
    }
    &buf[..end]
}

fn is_instrumentation(raw: &[u8]) -> bool {
    raw.strip_prefix(MARKER.as_bytes())
        .is_some_and(|rest| rest.first() == Some(&b' '))
}
