//! Byte-level plumbing for the reader: the paged byte source and the
//! scratch stack node text is built on.

use std::io::{self, Read};
use tern_api::{Cursor, Node, Status};

/// A buffered pull source over a caller-supplied reader.
///
/// The source keeps one page of input and hands it out a byte at a time
/// through [`fill`](ByteSource::fill) and [`advance`](ByteSource::advance).
/// A read that returns `Ok(0)` is a *soft* end of input: the current
/// attempt sees no data, but a later call retries the read, which is what
/// socket-like sources need. I/O errors surface as `BadStream`;
/// `Interrupted` reads are treated as soft.
pub struct ByteSource<R: Read> {
    read: R,
    name: Option<Node>,
    page: Vec<u8>,
    len: usize,
    head: usize,
    line: u32,
    col: u32,
}

impl<R: Read> ByteSource<R> {
    /// Creates a source reading pages of `page_size` bytes (at least one)
    /// from `read`. The optional `name` identifies the source in cursors
    /// and error messages.
    pub fn new(read: R, name: Option<Node>, page_size: usize) -> ByteSource<R> {
        ByteSource {
            read,
            name,
            page: vec![0; page_size.max(1)],
            len: 0,
            head: 0,
            line: 1,
            col: 1,
        }
    }

    /// The current byte, if one is buffered.
    pub fn peek(&self) -> Option<u8> {
        if self.head < self.len {
            Some(self.page[self.head])
        } else {
            None
        }
    }

    /// Returns the current byte, reading a page when the buffer is
    /// exhausted. Returns `Failure` at soft end of input; a later call
    /// retries.
    pub fn fill(&mut self) -> Result<u8, Status> {
        if self.head >= self.len {
            self.page()?;
        }
        Ok(self.page[self.head])
    }

    /// Consumes the current byte, prefetching the next page when the
    /// buffer empties. A soft end of input discovered by the prefetch is
    /// not an error for the byte just consumed; only stream errors are.
    pub fn advance(&mut self) -> Result<(), Status> {
        if self.head < self.len {
            let b = self.page[self.head];
            self.head += 1;
            if b == b'\n' {
                self.line += 1;
                self.col = 1;
            } else {
                self.col += 1;
            }
        }
        if self.head >= self.len {
            match self.page() {
                Ok(()) | Err(Status::Failure) => Ok(()),
                Err(status) => Err(status),
            }
        } else {
            Ok(())
        }
    }

    fn page(&mut self) -> Result<(), Status> {
        self.head = 0;
        self.len = 0;
        match self.read.read(&mut self.page) {
            Ok(0) => Err(Status::Failure),
            Ok(n) => {
                self.len = n;
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => Err(Status::Failure),
            Err(_) => Err(Status::BadStream),
        }
    }

    /// The position of the current byte in the source, when the source
    /// has a name to anchor it to.
    pub fn cursor(&self) -> Option<Cursor> {
        self.name.as_ref().map(|name| Cursor {
            file: name.clone(),
            line: self.line,
            col: self.col,
        })
    }

    pub fn name(&self) -> Option<&Node> {
        self.name.as_ref()
    }
}

impl<'a> ByteSource<io::Cursor<&'a [u8]>> {
    /// A source over an in-memory buffer, read in a single page.
    pub fn from_bytes(bytes: &'a [u8]) -> Self {
        ByteSource::new(io::Cursor::new(bytes), None, bytes.len().max(1))
    }
}

/// An append-only byte arena holding node text under construction.
///
/// A frame is opened per token, grown a byte at a time, and closed into a
/// `(start, end)` range that stays valid until the stack is truncated
/// back to a saved height at the end of the chunk. Only the topmost open
/// frame may grow, which every push asserts in debug builds.
#[derive(Debug, Default)]
pub(crate) struct Stack {
    buf: Vec<u8>,
    open: Option<usize>,
}

impl Stack {
    pub fn height(&self) -> usize {
        self.buf.len()
    }

    /// Opens a new frame and returns its offset.
    pub fn open_frame(&mut self) -> usize {
        debug_assert!(self.open.is_none(), "frame opened over an open frame");
        let start = self.buf.len();
        self.open = Some(start);
        start
    }

    pub fn push_byte(&mut self, frame: usize, b: u8) {
        debug_assert_eq!(self.open, Some(frame), "push to a frame not on top");
        self.buf.push(b);
    }

    pub fn push_bytes(&mut self, frame: usize, bytes: &[u8]) {
        debug_assert_eq!(self.open, Some(frame), "push to a frame not on top");
        self.buf.extend_from_slice(bytes);
    }

    /// Closes the frame opened at `start`, yielding its byte range.
    pub fn close_frame(&mut self, start: usize) -> (usize, usize) {
        debug_assert_eq!(self.open, Some(start));
        self.open = None;
        (start, self.buf.len())
    }

    pub fn bytes(&self, range: (usize, usize)) -> &[u8] {
        &self.buf[range.0..range.1]
    }

    /// Truncates back to a saved height, abandoning any open frame.
    pub fn truncate(&mut self, height: usize) {
        self.buf.truncate(height);
        self.open = None;
    }
}
