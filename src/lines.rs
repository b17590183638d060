//! Lazy extraction of non-empty lines from a byte stream.
//!
//! The applet listing arrives as newline-separated names on a pipe. This
//! iterator yields each non-empty line as an owned `String`, treating `\r`
//! and `\n` both as line boundaries and collapsing runs of them, so blank
//! lines never appear in the output. It is finite and not restartable.

use std::io::{self, ErrorKind, Read};

const CHUNK: usize = 4096;

/// Iterator over the non-empty lines of a finite byte stream.
///
/// Interrupted reads are retried transparently. Any other read error is
/// yielded once, after which the iterator is exhausted.
pub(crate) struct NonEmptyLines<R> {
    reader: R,
    buf: Vec<u8>,
    start: usize,
    eof: bool,
    failed: bool,
}

impl<R: Read> NonEmptyLines<R> {
    pub(crate) fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::with_capacity(CHUNK),
            start: 0,
            eof: false,
            failed: false,
        }
    }

    /// Take the next buffered line, if a complete one is available.
    fn take_buffered(&mut self) -> Option<String> {
        while let Some(rel) = self.buf[self.start..]
            .iter()
            .position(|b| *b == b'\r' || *b == b'\n')
        {
            let end = self.start + rel;
            let line = &self.buf[self.start..end];
            if line.is_empty() {
                self.start = end + 1;
                continue;
            }
            let line = String::from_utf8_lossy(line).into_owned();
            self.start = end + 1;
            return Some(line);
        }
        None
    }
}

impl<R: Read> Iterator for NonEmptyLines<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            if let Some(line) = self.take_buffered() {
                return Some(Ok(line));
            }
            if self.eof {
                // Final line without a terminator.
                if self.start < self.buf.len() {
                    let line = String::from_utf8_lossy(&self.buf[self.start..]).into_owned();
                    self.start = self.buf.len();
                    return Some(Ok(line));
                }
                return None;
            }
            self.buf.drain(..self.start);
            self.start = 0;
            let mut chunk = [0u8; CHUNK];
            match self.reader.read(&mut chunk) {
                Ok(0) => self.eof = true,
                Ok(n) => self.buf.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            }
        }
    }
}
