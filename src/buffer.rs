// this_file: src/buffer.rs

//! The Input Buffer: owns the unconsumed tail of all chunks received so
//! far and exposes the peek/take/scan primitives the tokenizer drives.
//!
//! Grounded on `vexy_json_core::streaming::simple_lexer::SimpleStreamingLexer`,
//! which tracks a running `position` over an accumulating string and feeds
//! it one character at a time — but that lexer discards the consumed
//! prefix implicitly (it re-borrows `&self.buffer` each call and never
//! grows unbounded because JSONL lines are short). A single JSON document
//! can be arbitrarily large, so this buffer tracks an explicit consumed
//! cursor and only reclaims memory when `commit` is called, bounding
//! retained text to at most the longest in-progress token.
//!
//! Text is modeled as `Vec<char>` rather than raw bytes, over a sequence
//! of Unicode code units — `char` (a full Unicode scalar value) is the
//! closest safe-Rust analogue reachable without hand-rolling UTF-16 code
//! unit arithmetic. This is recorded as an explicit Open Question
//! decision in `DESIGN.md`.
//!
//! The `tracing::trace!`/`tracing::debug!` calls around chunk delivery
//! follow the field-value event style of a streaming SSE/tool-input
//! parser's buffer handling (`tracing::debug!(size = buffer.size(), "...")`
//! in `tyrchen-claude-code-proxy`'s `src/streaming/parser.rs`).

use crate::error::{Error, Result, Span};
use std::future::Future;

/// A source of text chunks, pulled lazily and consumed at most once.
///
/// This is the seam left explicitly out of scope: an HTTP body reader, a
/// file chunker, or an LLM response adapter all implement this trait
/// without this crate depending on any particular I/O stack.
pub trait ChunkSource {
    /// Returns the next chunk, or `None` once the source is exhausted.
    fn next_chunk(&mut self) -> impl Future<Output = Option<String>>;
}

/// Adapts any [`futures_core::Stream`] of owned `String` chunks into a
/// [`ChunkSource`], the same adaptation `synkit-core`'s `futures` feature
/// performs for its own incremental lexer traits.
impl<S> ChunkSource for S
where
    S: futures_core::Stream<Item = String> + Unpin,
{
    async fn next_chunk(&mut self) -> Option<String> {
        use futures_core::Stream;
        std::future::poll_fn(|cx| Stream::poll_next(std::pin::Pin::new(self), cx)).await
    }
}

/// The unconsumed tail of all chunks seen so far, plus pull primitives.
pub struct InputBuffer<S> {
    source: S,
    data: Vec<char>,
    /// Cursor into `data`; everything before it has been consumed but not
    /// yet reclaimed by `commit`.
    pos: usize,
    /// How many chars were permanently dropped by prior `commit` calls —
    /// added to `pos`-relative offsets to report stable spans.
    global_offset: usize,
    upstream_exhausted: bool,
    /// Cleared while scanning an unterminated number, whose end is
    /// legitimately signaled by end-of-stream rather than an error.
    more_content_expected: bool,
}

impl<S: ChunkSource> InputBuffer<S> {
    /// Creates a new, empty buffer over `source`.
    pub fn new(source: S) -> Self {
        Self::with_capacity(source, 0)
    }

    /// Creates a new, empty buffer over `source`, pre-sizing its backing
    /// storage. Purely a performance hint (see
    /// [`crate::options::ParserOptions::initial_buffer_capacity`]) — never
    /// affects parsing semantics.
    pub fn with_capacity(source: S, capacity: usize) -> Self {
        InputBuffer {
            source,
            data: Vec::with_capacity(capacity),
            pos: 0,
            global_offset: 0,
            upstream_exhausted: false,
            more_content_expected: true,
        }
    }

    /// Remaining unread characters.
    pub fn len(&self) -> usize {
        self.data.len() - self.pos
    }

    /// True if there is no unread text buffered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The absolute offset of the cursor, for error spans.
    pub fn offset(&self) -> usize {
        self.global_offset + self.pos
    }

    /// A zero-width span at the current cursor position.
    pub fn here(&self) -> Span {
        Span::at(self.offset())
    }

    /// Inspects the character `offset` positions ahead of the cursor
    /// without consuming it.
    pub fn peek_char(&self, offset: usize) -> Option<char> {
        self.data.get(self.pos + offset).copied()
    }

    /// Consumes and returns `n` characters. Panics if fewer than `n` are
    /// buffered — callers must check `len()` (or rely on a prior
    /// successful scan) first.
    pub fn take(&mut self, n: usize) -> String {
        assert!(self.pos + n <= self.data.len(), "take() past buffer end");
        let s: String = self.data[self.pos..self.pos + n].iter().collect();
        self.pos += n;
        s
    }

    /// Consumes `n` characters without returning them.
    pub fn advance(&mut self, n: usize) {
        assert!(self.pos + n <= self.data.len(), "advance() past buffer end");
        self.pos += n;
    }

    /// If the buffer starts with `s`, consumes it and returns true.
    pub fn try_take_prefix(&mut self, s: &str) -> bool {
        let chars: Vec<char> = s.chars().collect();
        if self.len() < chars.len() {
            return false;
        }
        if (0..chars.len()).all(|i| self.data[self.pos + i] == chars[i]) {
            self.pos += chars.len();
            true
        } else {
            false
        }
    }

    /// Consumes one character, if any is buffered.
    pub fn try_take_char(&mut self) -> Option<char> {
        let c = self.peek_char(0)?;
        self.pos += 1;
        Some(c)
    }

    /// Consumes a run of JSON whitespace (space, tab, line feed, carriage
    /// return — JSON's only whitespace characters; no other Unicode
    /// whitespace is recognized).
    pub fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek_char(0) {
            if matches!(c, ' ' | '\t' | '\n' | '\r') {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    /// Returns the maximal prefix containing neither `"` nor `\`, and
    /// whether the scan stopped because it hit one of those (as opposed
    /// to running out of buffered text). Fails if a control character
    /// (code unit < 0x20) is encountered.
    pub fn scan_string_body(&mut self) -> Result<(String, bool)> {
        let mut end = self.pos;
        while end < self.data.len() {
            let c = self.data[end];
            if c == '"' || c == '\\' {
                let s: String = self.data[self.pos..end].iter().collect();
                self.pos = end;
                return Ok((s, true));
            }
            if (c as u32) < 0x20 {
                return Err(Error::Lexical {
                    message: format!("unescaped control character U+{:04X} in string", c as u32),
                    span: Span::at(self.global_offset + end),
                });
            }
            end += 1;
        }
        let s: String = self.data[self.pos..end].iter().collect();
        self.pos = end;
        Ok((s, false))
    }

    /// Discards the consumed prefix, bounding retained memory to the
    /// unconsumed tail. Safe to call between pump cycles.
    pub fn commit(&mut self) {
        if self.pos > 0 {
            self.data.drain(0..self.pos);
            self.global_offset += self.pos;
            self.pos = 0;
        }
    }

    /// Whether the upstream source is known to have no further chunks.
    pub fn upstream_exhausted(&self) -> bool {
        self.upstream_exhausted
    }

    /// Whether the caller currently requires more input to make progress
    /// (cleared only while scanning an unterminated number).
    pub fn more_content_expected(&self) -> bool {
        self.more_content_expected
    }

    pub(crate) fn set_more_content_expected(&mut self, value: bool) {
        self.more_content_expected = value;
    }

    /// Pulls one chunk from upstream and appends it. Returns whether a
    /// chunk was actually delivered. Fails with
    /// [`Error::UnexpectedEndOfInput`] if the stream ends while more
    /// content is still expected.
    pub async fn expand(&mut self) -> Result<bool> {
        if self.upstream_exhausted {
            return Ok(false);
        }
        match self.source.next_chunk().await {
            Some(chunk) => {
                tracing::trace!(len = chunk.len(), "buffer expanded");
                self.data.extend(chunk.chars());
                Ok(true)
            }
            None => {
                self.upstream_exhausted = true;
                if self.more_content_expected {
                    tracing::debug!("upstream exhausted while content still expected");
                    Err(Error::UnexpectedEndOfInput)
                } else {
                    Ok(false)
                }
            }
        }
    }

    /// After the top-level value has closed, requires that everything
    /// remaining — buffered and not-yet-pulled — is whitespace.
    pub async fn expect_end_of_content(&mut self) -> Result<()> {
        self.more_content_expected = false;
        loop {
            self.skip_whitespace();
            if !self.is_empty() {
                return Err(Error::TrailingContent { span: self.here() });
            }
            if self.upstream_exhausted || !self.expand().await? {
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct VecSource(std::vec::IntoIter<&'static str>);

    impl ChunkSource for VecSource {
        async fn next_chunk(&mut self) -> Option<String> {
            self.0.next().map(|s| s.to_string())
        }
    }

    fn source(chunks: &[&'static str]) -> VecSource {
        VecSource(chunks.to_vec().into_iter())
    }

    #[tokio::test]
    async fn expand_appends_chunks() {
        let mut buf = InputBuffer::new(source(&["ab", "cd"]));
        assert!(buf.expand().await.unwrap());
        assert_eq!(buf.len(), 2);
        assert!(buf.expand().await.unwrap());
        assert_eq!(buf.len(), 4);
        assert!(!buf.expand().await.unwrap());
    }

    #[tokio::test]
    async fn expand_fails_on_early_eof_when_content_expected() {
        let mut buf = InputBuffer::new(source(&[]));
        assert!(matches!(
            buf.expand().await,
            Err(Error::UnexpectedEndOfInput)
        ));
    }

    #[tokio::test]
    async fn scan_string_body_stops_on_quote() {
        let mut buf = InputBuffer::new(source(&["hello\" tail"]));
        buf.expand().await.unwrap();
        let (s, stopped) = buf.scan_string_body().unwrap();
        assert_eq!(s, "hello");
        assert!(stopped);
        assert_eq!(buf.peek_char(0), Some('"'));
    }

    #[tokio::test]
    async fn scan_string_body_rejects_control_chars() {
        let mut buf = InputBuffer::new(source(&["ab\ncd"]));
        buf.expand().await.unwrap();
        assert!(matches!(
            buf.scan_string_body(),
            Err(Error::Lexical { .. })
        ));
    }

    #[tokio::test]
    async fn commit_reclaims_consumed_prefix() {
        let mut buf = InputBuffer::new(source(&["abcdef"]));
        buf.expand().await.unwrap();
        buf.advance(3);
        buf.commit();
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.offset(), 3);
        assert_eq!(buf.peek_char(0), Some('d'));
    }

    #[tokio::test]
    async fn expect_end_of_content_accepts_trailing_whitespace() {
        let mut buf = InputBuffer::new(source(&["  \n"]));
        buf.expand().await.unwrap();
        assert!(buf.expect_end_of_content().await.is_ok());
    }

    #[tokio::test]
    async fn expect_end_of_content_rejects_trailing_garbage() {
        let mut buf = InputBuffer::new(source(&[" x"]));
        buf.expand().await.unwrap();
        assert!(matches!(
            buf.expect_end_of_content().await,
            Err(Error::TrailingContent { .. })
        ));
    }
}
