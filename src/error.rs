// this_file: src/error.rs

//! Error types for the incremental parser.
//!
//! The streaming pipeline never attempts to recover from malformed input:
//! the first violation terminates the value stream. This mirrors
//! `vexy_json_core::error::types::Error` in shape (a `thiserror` enum
//! carrying a [`Span`]) but drops that module's repair-suggestion and
//! error-code machinery, which exists there to support a forgiving parser
//! this crate deliberately is not.

use thiserror::Error;

/// A byte-offset range into the logical, concatenated input.
///
/// Offsets are counted over the whole stream (all chunks seen so far),
/// not just the currently buffered tail, so that error locations remain
/// meaningful regardless of where `commit` has discarded buffered text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// Start offset, inclusive.
    pub start: usize,
    /// End offset, exclusive.
    pub end: usize,
}

impl Span {
    /// Creates a new span.
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }

    /// A zero-width span at `position`.
    pub fn at(position: usize) -> Self {
        Span {
            start: position,
            end: position,
        }
    }
}

/// The terminal failure kinds of a streaming parse.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Invalid character at the current lexical state, a bad escape, an
    /// unescaped control code, a malformed `\u` escape, or a malformed
    /// number.
    #[error("lexical error at {span:?}: {message}")]
    Lexical {
        /// Human-readable context; not part of the stability contract.
        message: String,
        /// Where the offending character or partial token was found.
        span: Span,
    },

    /// Closing the wrong container, a missing colon or comma, or an
    /// unexpected token for the current state.
    #[error("structural error at {span:?}: {message}")]
    Structural {
        /// Human-readable context; not part of the stability contract.
        message: String,
        /// Where the unexpected token was found.
        span: Span,
    },

    /// Upstream was exhausted while more content was still expected and
    /// the builder's state stack was non-empty.
    #[error("unexpected end of content")]
    UnexpectedEndOfInput,

    /// Non-whitespace content followed the closed top-level value.
    #[error("unexpected trailing content at {span:?}")]
    TrailingContent {
        /// Where the first offending trailing character was found.
        span: Span,
    },

    /// An internal invariant was violated. Not a recoverable condition —
    /// implementers (and callers) should treat this as a crash-only bug.
    #[error("internal invariant violated: {0}")]
    InternalInvariant(String),
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;
