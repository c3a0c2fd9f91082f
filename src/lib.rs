// this_file: src/lib.rs
#![warn(
    missing_docs,
    rust_2018_idioms,
    unused_lifetimes,
    unused_qualifications
)]

//! An incremental JSON parser: a resumable tokenizer and an in-place
//! growing value builder, driven together by a single pull-based
//! [`parse`] entry point.
//!
//! Feed it a lazy sequence of text chunks (anything implementing
//! [`buffer::ChunkSource`], including any
//! `futures_core::Stream<Item = String>`) and pull a lazy sequence of
//! increasingly complete [`JsonValue`]s back: scalars appear only once
//! fully decoded, strings grow through successive replacements, and
//! arrays/objects are mutated in place behind a shared handle a consumer
//! may hold across the whole parse.
//!
//! ```no_run
//! use increjson::{parse, ParserOptions};
//! use futures_util::StreamExt;
//!
//! # async fn run(chunks: impl futures_core::Stream<Item = String> + Unpin) {
//! let stream = parse(chunks, ParserOptions::new());
//! tokio::pin!(stream);
//! while let Some(value) = stream.next().await {
//!     let value = value.expect("parse error");
//!     println!("{value}");
//! }
//! # }
//! ```

/// The Input Buffer: the unconsumed tail of all chunks seen so far, plus
/// the peek/take/scan primitives the Tokenizer drives.
pub mod buffer;

/// The Value Builder's state stack, progression, completion paths, and
/// duplicate-key policy.
pub mod builder;

/// The Parse Driver: wires the Input Buffer, Tokenizer, and Value
/// Builder into a single lazy value stream.
pub mod driver;

/// Error kinds, spans, and the crate's `Result` alias.
pub mod error;

/// Options accepted by [`parse`].
pub mod options;

/// Token kinds and the handler trait the Tokenizer drives.
pub mod token;

/// The resumable Tokenizer state machine.
pub mod tokenizer;

/// The growing `JsonValue` data model.
pub mod value;

pub use builder::{CompletionPath, Segment};
pub use driver::parse;
pub use error::{Error, Result, Span};
pub use options::ParserOptions;
pub use value::JsonValue;
