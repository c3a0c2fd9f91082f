// this_file: src/driver.rs

//! The Parse Driver: the single entry point that wires the Input Buffer,
//! Tokenizer, and Value Builder together into a lazy stream of values.
//!
//! Grounded on the `unfold`-based stream construction pattern used by
//! `pierre_mcp_server`'s SSE line-buffering parser (`SseLineBuffer`'s
//! stream adapter in `src/llm/sse_parser.rs`): there, a line buffer plus
//! a user `parse_data` closure feed `futures_util::stream::unfold` to
//! turn a byte stream into a stream of parsed events without a hand-rolled
//! `Pin<Box<dyn Future>>` state machine. The same shape applies here, one
//! layer down: a tokenizer pump plus a value builder feed `unfold` to turn
//! a chunk stream into a stream of `JsonValue`s.
//!
//! Terminal-error logging (`tracing::warn!(error = %err, "...")`) follows
//! the same pattern `arbstr`'s SSE stream adapter uses when a parse
//! attempt fails partway through (`tracing::warn!(error = %e, "Failed to
//! parse SSE data line as JSON")` in `src/proxy/stream.rs`).

use crate::builder::Builder;
use crate::buffer::{ChunkSource, InputBuffer};
use crate::error::Result;
use crate::options::ParserOptions;
use crate::tokenizer::{PumpOutcome, Tokenizer};
use crate::value::JsonValue;
use futures_core::Stream;

type CompleteCallback = Box<dyn FnMut(&JsonValue, &crate::builder::CompletionPath)>;

struct DriverState<S> {
    buffer: InputBuffer<S>,
    tokenizer: Tokenizer,
    builder: Builder<CompleteCallback>,
    /// Set once the stream has yielded its terminal item (an error, or a
    /// clean end after trailing-content enforcement). No further polls
    /// produce anything but `None`.
    finished: bool,
}

/// Parses a lazy sequence of text chunks into a lazy sequence of
/// increasingly complete [`JsonValue`]s.
///
/// Pulling the next item from the returned stream:
/// 1. If already finished, yields nothing further.
/// 2. Pumps the tokenizer, expanding the buffer from `source` as needed,
///    until a pump call leaves the value builder having made a
///    user-visible change, or the tokenizer is done.
/// 3. If the tree changed, yields the current top-level value — the
///    same reference as last time if the consumer is still holding one,
///    mutated in place.
/// 4. Otherwise (the tokenizer was already done and made no further
///    progress) enforces that only whitespace remains, then ends the
///    stream.
///
/// A pump, an expand, or the end-of-content check failing all surface as
/// a terminal `Err` on the next item; no further items follow it.
pub fn parse<S>(
    source: S,
    mut options: ParserOptions,
) -> impl Stream<Item = Result<JsonValue>>
where
    S: ChunkSource,
{
    let buffer = InputBuffer::with_capacity(source, options.initial_buffer_capacity);
    let builder = Builder::new(options.complete_callback.take());
    let state = DriverState {
        buffer,
        tokenizer: Tokenizer::new(),
        builder,
        finished: false,
    };
    futures_util::stream::unfold(state, drive_one)
}

/// Advances `state` until either a value is ready to yield or the stream
/// is over, implementing the Parse Driver's pull algorithm for one item.
async fn drive_one<S: ChunkSource>(
    mut state: DriverState<S>,
) -> Option<(Result<JsonValue>, DriverState<S>)> {
    if state.finished {
        return None;
    }
    loop {
        match state.tokenizer.pump(&mut state.buffer, &mut state.builder) {
            // The tokenizer advanced, but that alone doesn't mean the tree
            // changed in a way a consumer should see — e.g. consuming an
            // object key's characters, or a lone ':'/','. Only yield once
            // the builder itself reports a user-visible change; otherwise
            // keep pumping (the buffer already has what's needed, or the
            // next pump will legitimately ask for more).
            Ok(PumpOutcome::Progressed) => {
                if state.builder.take_progressed() {
                    break;
                }
            }
            Ok(PumpOutcome::Done) => {
                state.finished = true;
                return match state.buffer.expect_end_of_content().await {
                    Ok(()) => None,
                    Err(err) => {
                        tracing::warn!(error = %err, "trailing content after the value closed");
                        Some((Err(err), state))
                    }
                };
            }
            Ok(PumpOutcome::NeedMoreInput) => match state.buffer.expand().await {
                Ok(_) => continue,
                Err(err) => {
                    tracing::warn!(error = %err, "input exhausted before the value closed");
                    state.finished = true;
                    return Some((Err(err), state));
                }
            },
            Err(err) => {
                tracing::warn!(error = %err, "parse failed");
                state.finished = true;
                return Some((Err(err), state));
            }
        }
    }
    let value = state
        .builder
        .root()
        .cloned()
        .expect("a pump reporting progress always leaves at least a root value behind");
    Some((Ok(value), state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use futures_util::StreamExt;

    struct VecSource(std::vec::IntoIter<&'static str>);

    impl ChunkSource for VecSource {
        async fn next_chunk(&mut self) -> Option<String> {
            self.0.next().map(|s| s.to_string())
        }
    }

    fn source(chunks: &[&'static str]) -> VecSource {
        VecSource(chunks.to_vec().into_iter())
    }

    async fn collect_ok(chunks: &[&'static str]) -> Result<Vec<JsonValue>> {
        let stream = parse(source(chunks), ParserOptions::new());
        tokio::pin!(stream);
        let mut values = Vec::new();
        while let Some(item) = stream.next().await {
            values.push(item?);
        }
        Ok(values)
    }

    #[tokio::test]
    async fn scalar_literal_yields_once() {
        let values = collect_ok(&["true"]).await.unwrap();
        assert_eq!(values, vec![JsonValue::Boolean(true)]);
    }

    #[tokio::test]
    async fn number_split_across_chunks_yields_once() {
        let values = collect_ok(&["3.", "14"]).await.unwrap();
        assert_eq!(values, vec![JsonValue::Number(3.14)]);
    }

    #[tokio::test]
    async fn array_yields_every_growth_step() {
        let values = collect_ok(&["[", "1", ",2]"]).await.unwrap();
        assert_eq!(values.len(), 3);
        assert_eq!(values[0].as_array().unwrap().borrow().len(), 0);
        assert_eq!(values[1].as_array().unwrap().borrow().len(), 1);
        let last = values[2].as_array().unwrap().borrow();
        assert_eq!(*last, vec![JsonValue::Number(1.0), JsonValue::Number(2.0)]);
        // Every yielded array is the same growing instance.
        assert!(crate::builder::same_root(&values[0], &values[1]));
        assert!(crate::builder::same_root(&values[1], &values[2]));
    }

    #[tokio::test]
    async fn unterminated_array_is_an_error() {
        let err = collect_ok(&["[1, 2"]).await.unwrap_err();
        assert!(matches!(err, Error::UnexpectedEndOfInput));
    }

    #[tokio::test]
    async fn trailing_garbage_is_an_error_after_the_value_closes() {
        let err = collect_ok(&["[1,2] garbage"]).await.unwrap_err();
        assert!(matches!(err, Error::TrailingContent { .. }));
    }

    #[tokio::test]
    async fn completion_callback_fires_in_post_order() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let log: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
        let log2 = log.clone();
        let options = ParserOptions::new().with_complete_callback(move |value, _path| {
            log2.borrow_mut().push(format!("{value}"));
        });
        let stream = parse(source(&[r#"{"a":1,"a":2}"#]), options);
        tokio::pin!(stream);
        while let Some(item) = stream.next().await {
            item.unwrap();
        }
        assert_eq!(log.borrow().as_slice(), &["2".to_string(), r#"{"a":2}"#.to_string()]);
    }
}
