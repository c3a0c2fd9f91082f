// this_file: src/tokenizer.rs

//! The Tokenizer: a resumable state machine that turns buffered text into
//! [`TokenHandler`] calls.
//!
//! Grounded on `vexy_json_core::streaming::simple_lexer::SimpleStreamingLexer`
//! — a character-at-a-time incremental lexer with its own `LexerState`
//! enum for `InString`/`InNumber`/etc — but restructured around pulling
//! from an [`InputBuffer`] rather than a `feed_char` push API, and
//! carrying its own container stack so it can validate JSON structure
//! (bracket matching, comma/colon placement) as it goes, the same
//! responsibility `SimpleStreamingLexer`'s state machine keeps internally.
//!
//! A `pump` call never performs I/O itself; it consumes as much of the
//! already-buffered text as it can and returns a [`PumpOutcome`] telling
//! the caller whether to pump again immediately, expand the buffer first,
//! or stop (the top-level value is complete).

use crate::buffer::{ChunkSource, InputBuffer};
use crate::error::{Error, Result};
use crate::token::TokenHandler;

const REPLACEMENT: char = char::REPLACEMENT_CHARACTER;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Container {
    Array,
    Object,
}

#[derive(Debug, Clone, PartialEq)]
enum State {
    /// Expecting the start of a value. `allow_close` is true only
    /// immediately after `[`, where an empty array's `]` is legal.
    BeforeValue { allow_close: bool },
    /// Expecting an object key string or (if `allow_close`) `}`.
    BeforeKey { allow_close: bool },
    /// Just closed a key string; expecting `:`.
    AfterKey,
    /// Just closed a value inside a non-empty container; expecting `,`
    /// or the container's closing bracket.
    AfterValue,
    /// Matching the remaining characters of `true`/`false`/`null`.
    InLiteral { lit: &'static str, pos: usize },
    /// Accumulating the characters of a number literal.
    InNumber { text: String },
    /// Inside a string (key or value). `pending_high` holds a UTF-16
    /// high surrogate decoded from a `\u` escape while we wait to see
    /// whether it is followed by a matching low surrogate.
    InString {
        is_key: bool,
        pending_high: Option<u16>,
    },
    /// The top-level value is complete.
    Done,
}

/// What a [`Tokenizer::pump`] call accomplished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpOutcome {
    /// Consumed input and changed state; the caller may pump again
    /// immediately without expanding the buffer.
    Progressed,
    /// Made no progress; the buffer must be expanded before pumping
    /// again.
    NeedMoreInput,
    /// The top-level value is complete.
    Done,
}

/// A resumable JSON tokenizer.
pub struct Tokenizer {
    stack: Vec<Container>,
    state: State,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Tokenizer {
    /// Creates a tokenizer positioned at the start of a document.
    pub fn new() -> Self {
        Tokenizer {
            stack: Vec::new(),
            state: State::BeforeValue { allow_close: false },
        }
    }

    /// True once the top-level value has closed.
    pub fn is_done(&self) -> bool {
        matches!(self.state, State::Done)
    }

    /// Consumes as much buffered input as possible, dispatching to
    /// `handler` as tokens complete.
    pub fn pump<S: ChunkSource, H: TokenHandler>(
        &mut self,
        buffer: &mut InputBuffer<S>,
        handler: &mut H,
    ) -> Result<PumpOutcome> {
        let mut progressed = false;
        loop {
            match &self.state {
                State::Done => {
                    return Ok(if progressed {
                        PumpOutcome::Progressed
                    } else {
                        PumpOutcome::Done
                    });
                }
                State::BeforeValue { allow_close } => {
                    let allow_close = *allow_close;
                    buffer.skip_whitespace();
                    match buffer.peek_char(0) {
                        None => return self.stall(progressed),
                        Some('"') => {
                            buffer.advance(1);
                            handler.string_start()?;
                            self.state = State::InString {
                                is_key: false,
                                pending_high: None,
                            };
                        }
                        Some('{') => {
                            buffer.advance(1);
                            handler.object_start()?;
                            self.stack.push(Container::Object);
                            self.state = State::BeforeKey { allow_close: true };
                        }
                        Some('[') => {
                            buffer.advance(1);
                            handler.array_start()?;
                            self.stack.push(Container::Array);
                            self.state = State::BeforeValue { allow_close: true };
                        }
                        Some('t') => self.start_literal(buffer, "true"),
                        Some('f') => self.start_literal(buffer, "false"),
                        Some('n') => self.start_literal(buffer, "null"),
                        Some(c) if c == '-' || c.is_ascii_digit() => {
                            self.state = State::InNumber { text: String::new() };
                        }
                        Some(']') if allow_close && self.stack.last() == Some(&Container::Array) => {
                            buffer.advance(1);
                            self.stack.pop();
                            handler.array_end()?;
                            self.finish_value();
                        }
                        Some(c) => {
                            return Err(Error::Structural {
                                message: format!("unexpected character {c:?} while expecting a value"),
                                span: buffer.here(),
                            });
                        }
                    }
                    progressed = true;
                }
                State::BeforeKey { allow_close } => {
                    let allow_close = *allow_close;
                    buffer.skip_whitespace();
                    match buffer.peek_char(0) {
                        None => return self.stall(progressed),
                        Some('"') => {
                            buffer.advance(1);
                            handler.string_start()?;
                            self.state = State::InString {
                                is_key: true,
                                pending_high: None,
                            };
                        }
                        Some('}') if allow_close => {
                            buffer.advance(1);
                            self.stack.pop();
                            handler.object_end()?;
                            self.finish_value();
                        }
                        Some(c) => {
                            return Err(Error::Structural {
                                message: format!("unexpected character {c:?} while expecting an object key"),
                                span: buffer.here(),
                            });
                        }
                    }
                    progressed = true;
                }
                State::AfterKey => {
                    buffer.skip_whitespace();
                    match buffer.peek_char(0) {
                        None => return self.stall(progressed),
                        Some(':') => {
                            buffer.advance(1);
                            self.state = State::BeforeValue { allow_close: false };
                        }
                        Some(c) => {
                            return Err(Error::Structural {
                                message: format!("expected ':' but found {c:?}"),
                                span: buffer.here(),
                            });
                        }
                    }
                    progressed = true;
                }
                State::AfterValue => {
                    buffer.skip_whitespace();
                    let top = *self.stack.last().ok_or_else(|| {
                        Error::InternalInvariant("AfterValue with empty container stack".into())
                    })?;
                    match buffer.peek_char(0) {
                        None => return self.stall(progressed),
                        Some(',') => {
                            buffer.advance(1);
                            self.state = match top {
                                Container::Array => State::BeforeValue { allow_close: false },
                                Container::Object => State::BeforeKey { allow_close: false },
                            };
                        }
                        Some(']') if top == Container::Array => {
                            buffer.advance(1);
                            self.stack.pop();
                            handler.array_end()?;
                            self.finish_value();
                        }
                        Some('}') if top == Container::Object => {
                            buffer.advance(1);
                            self.stack.pop();
                            handler.object_end()?;
                            self.finish_value();
                        }
                        Some(c) => {
                            let expected = match top {
                                Container::Array => "',' or ']'",
                                Container::Object => "',' or '}'",
                            };
                            return Err(Error::Structural {
                                message: format!("expected {expected} but found {c:?}"),
                                span: buffer.here(),
                            });
                        }
                    }
                    progressed = true;
                }
                State::InLiteral { .. } => {
                    if !self.pump_literal(buffer, handler)? {
                        return self.stall(progressed);
                    }
                    progressed = true;
                }
                State::InNumber { .. } => {
                    match self.pump_number(buffer, handler)? {
                        PumpOutcome::NeedMoreInput if !progressed => return Ok(PumpOutcome::NeedMoreInput),
                        PumpOutcome::NeedMoreInput => return Ok(PumpOutcome::Progressed),
                        _ => progressed = true,
                    }
                }
                State::InString { .. } => {
                    match self.pump_string(buffer, handler)? {
                        PumpOutcome::NeedMoreInput if !progressed => return Ok(PumpOutcome::NeedMoreInput),
                        PumpOutcome::NeedMoreInput => return Ok(PumpOutcome::Progressed),
                        _ => progressed = true,
                    }
                }
            }
        }
    }

    fn stall(&mut self, progressed: bool) -> Result<PumpOutcome> {
        Ok(if progressed {
            PumpOutcome::Progressed
        } else {
            PumpOutcome::NeedMoreInput
        })
    }

    fn finish_value(&mut self) {
        self.state = if self.stack.is_empty() {
            State::Done
        } else {
            State::AfterValue
        };
    }

    fn start_literal(&mut self, buffer: &mut InputBuffer<impl ChunkSource>, lit: &'static str) {
        buffer.advance(1);
        self.state = State::InLiteral { lit, pos: 1 };
    }

    /// Returns `Ok(true)` if the literal completed this call, `Ok(false)`
    /// if the buffer ran out first (state is left resumable).
    fn pump_literal(
        &mut self,
        buffer: &mut InputBuffer<impl ChunkSource>,
        handler: &mut impl TokenHandler,
    ) -> Result<bool> {
        let State::InLiteral { lit, mut pos } = self.state.clone() else {
            unreachable!()
        };
        while pos < lit.len() {
            let expected = lit.as_bytes()[pos] as char;
            match buffer.peek_char(0) {
                None => {
                    self.state = State::InLiteral { lit, pos };
                    return Ok(false);
                }
                Some(c) if c == expected => {
                    buffer.advance(1);
                    pos += 1;
                }
                Some(c) => {
                    return Err(Error::Lexical {
                        message: format!("invalid literal, expected {lit:?}, found {c:?}"),
                        span: buffer.here(),
                    });
                }
            }
        }
        match lit {
            "null" => handler.null()?,
            "true" => handler.boolean(true)?,
            "false" => handler.boolean(false)?,
            _ => unreachable!(),
        }
        self.finish_value();
        Ok(true)
    }

    fn pump_number(
        &mut self,
        buffer: &mut InputBuffer<impl ChunkSource>,
        handler: &mut impl TokenHandler,
    ) -> Result<PumpOutcome> {
        let State::InNumber { mut text } = std::mem::replace(
            &mut self.state,
            State::BeforeValue { allow_close: false },
        ) else {
            unreachable!()
        };
        loop {
            match buffer.peek_char(0) {
                Some(c) if is_number_char(c) => {
                    text.push(c);
                    buffer.advance(1);
                }
                Some(_) => {
                    let value = parse_json_number(&text, buffer)?;
                    handler.number(value)?;
                    buffer.set_more_content_expected(true);
                    self.finish_value();
                    return Ok(PumpOutcome::Progressed);
                }
                None if buffer.upstream_exhausted() => {
                    let value = parse_json_number(&text, buffer)?;
                    handler.number(value)?;
                    buffer.set_more_content_expected(true);
                    self.finish_value();
                    return Ok(PumpOutcome::Progressed);
                }
                None => {
                    buffer.set_more_content_expected(false);
                    self.state = State::InNumber { text };
                    return Ok(PumpOutcome::NeedMoreInput);
                }
            }
        }
    }

    fn pump_string(
        &mut self,
        buffer: &mut InputBuffer<impl ChunkSource>,
        handler: &mut impl TokenHandler,
    ) -> Result<PumpOutcome> {
        let State::InString { is_key, mut pending_high } = self.state.clone() else {
            unreachable!()
        };

        if let Some(high) = pending_high {
            match buffer.peek_char(0) {
                None => return Ok(PumpOutcome::NeedMoreInput),
                Some('\\') => match buffer.peek_char(1) {
                    None => return Ok(PumpOutcome::NeedMoreInput),
                    Some('u') => {
                        if buffer.len() < 6 {
                            return Ok(PumpOutcome::NeedMoreInput);
                        }
                        let cu = read_hex4(buffer, 2)?;
                        buffer.advance(6);
                        if (0xDC00..=0xDFFF).contains(&cu) {
                            let combined = combine_surrogates(high, cu);
                            handler.string_middle(&combined.to_string())?;
                            pending_high = None;
                        } else {
                            handler.string_middle(&REPLACEMENT.to_string())?;
                            pending_high = emit_escaped_unit(cu, handler)?;
                        }
                    }
                    Some(_) => {
                        handler.string_middle(&REPLACEMENT.to_string())?;
                        pending_high = None;
                    }
                },
                Some(_) => {
                    handler.string_middle(&REPLACEMENT.to_string())?;
                    pending_high = None;
                }
            }
            self.state = State::InString { is_key, pending_high };
            return Ok(PumpOutcome::Progressed);
        }

        let (fragment, stopped) = buffer.scan_string_body()?;
        let mut made_progress = !fragment.is_empty();
        if made_progress {
            handler.string_middle(&fragment)?;
        }
        if !stopped {
            self.state = State::InString { is_key, pending_high: None };
            return Ok(if made_progress {
                PumpOutcome::Progressed
            } else {
                PumpOutcome::NeedMoreInput
            });
        }

        match buffer.peek_char(0).expect("scan_string_body stopped on a char") {
            '"' => {
                buffer.advance(1);
                handler.string_end()?;
                if is_key {
                    self.state = State::AfterKey;
                } else {
                    self.finish_value();
                }
                made_progress = true;
            }
            '\\' => {
                let Some(escape) = buffer.peek_char(1) else {
                    self.state = State::InString { is_key, pending_high: None };
                    return Ok(PumpOutcome::NeedMoreInput);
                };
                match escape {
                    '"' => {
                        buffer.advance(2);
                        handler.string_middle("\"")?;
                    }
                    '\\' => {
                        buffer.advance(2);
                        handler.string_middle("\\")?;
                    }
                    '/' => {
                        buffer.advance(2);
                        handler.string_middle("/")?;
                    }
                    'b' => {
                        buffer.advance(2);
                        handler.string_middle("\u{8}")?;
                    }
                    'f' => {
                        buffer.advance(2);
                        handler.string_middle("\u{c}")?;
                    }
                    'n' => {
                        buffer.advance(2);
                        handler.string_middle("\n")?;
                    }
                    'r' => {
                        buffer.advance(2);
                        handler.string_middle("\r")?;
                    }
                    't' => {
                        buffer.advance(2);
                        handler.string_middle("\t")?;
                    }
                    'u' => {
                        if buffer.len() < 6 {
                            self.state = State::InString { is_key, pending_high: None };
                            return Ok(PumpOutcome::NeedMoreInput);
                        }
                        let cu = read_hex4(buffer, 2)?;
                        buffer.advance(6);
                        let new_pending = emit_escaped_unit(cu, handler)?;
                        self.state = State::InString { is_key, pending_high: new_pending };
                        return Ok(PumpOutcome::Progressed);
                    }
                    other => {
                        return Err(Error::Lexical {
                            message: format!("invalid escape sequence '\\{other}'"),
                            span: buffer.here(),
                        });
                    }
                }
                self.state = State::InString { is_key, pending_high: None };
                made_progress = true;
            }
            _ => unreachable!(),
        }
        Ok(if made_progress {
            PumpOutcome::Progressed
        } else {
            PumpOutcome::NeedMoreInput
        })
    }
}

/// Emits the decoded code unit `cu` immediately unless it is a high
/// surrogate, in which case it is returned so the caller can hold it
/// pending a possible matching low surrogate.
fn emit_escaped_unit(cu: u16, handler: &mut impl TokenHandler) -> Result<Option<u16>> {
    if (0xD800..=0xDBFF).contains(&cu) {
        Ok(Some(cu))
    } else if (0xDC00..=0xDFFF).contains(&cu) {
        handler.string_middle(&REPLACEMENT.to_string())?;
        Ok(None)
    } else {
        let c = char::from_u32(cu as u32).unwrap_or(REPLACEMENT);
        handler.string_middle(&c.to_string())?;
        Ok(None)
    }
}

fn combine_surrogates(high: u16, low: u16) -> char {
    let c = 0x10000 + (high as u32 - 0xD800) * 0x400 + (low as u32 - 0xDC00);
    char::from_u32(c).unwrap_or(REPLACEMENT)
}

fn read_hex4(buffer: &InputBuffer<impl ChunkSource>, offset: usize) -> Result<u16> {
    let mut value: u16 = 0;
    for i in 0..4 {
        let c = buffer.peek_char(offset + i).ok_or_else(|| Error::Lexical {
            message: "truncated \\u escape".into(),
            span: buffer.here(),
        })?;
        let digit = c.to_digit(16).ok_or_else(|| Error::Lexical {
            message: format!("invalid hex digit {c:?} in \\u escape"),
            span: buffer.here(),
        })?;
        value = value * 16 + digit as u16;
    }
    Ok(value)
}

fn is_number_char(c: char) -> bool {
    c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E')
}

/// Validates and parses a JSON number literal. Rust's `f64::from_str` is
/// more permissive than JSON's grammar (it accepts `"1."`, `"+1"`,
/// `"01"`), so the exact grammar is checked by hand first.
fn parse_json_number(text: &str, buffer: &InputBuffer<impl ChunkSource>) -> Result<f64> {
    if !is_valid_json_number(text) {
        return Err(Error::Lexical {
            message: format!("invalid number literal {text:?}"),
            span: buffer.here(),
        });
    }
    text.parse::<f64>().map_err(|_| Error::Lexical {
        message: format!("unparsable number literal {text:?}"),
        span: buffer.here(),
    })
}

fn is_valid_json_number(s: &str) -> bool {
    let bytes = s.as_bytes();
    let mut i = 0;
    if bytes.get(i) == Some(&b'-') {
        i += 1;
    }
    let int_start = i;
    match bytes.get(i) {
        Some(b'0') => i += 1,
        Some(b'1'..=b'9') => {
            i += 1;
            while matches!(bytes.get(i), Some(b'0'..=b'9')) {
                i += 1;
            }
        }
        _ => return false,
    }
    if i == int_start {
        return false;
    }
    if bytes.get(i) == Some(&b'.') {
        i += 1;
        let frac_start = i;
        while matches!(bytes.get(i), Some(b'0'..=b'9')) {
            i += 1;
        }
        if i == frac_start {
            return false;
        }
    }
    if matches!(bytes.get(i), Some(b'e') | Some(b'E')) {
        i += 1;
        if matches!(bytes.get(i), Some(b'+') | Some(b'-')) {
            i += 1;
        }
        let exp_start = i;
        while matches!(bytes.get(i), Some(b'0'..=b'9')) {
            i += 1;
        }
        if i == exp_start {
            return false;
        }
    }
    i == bytes.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::InputBuffer;
    use crate::token::{RecordingHandler, Token};

    struct VecSource(std::vec::IntoIter<&'static str>);

    impl ChunkSource for VecSource {
        async fn next_chunk(&mut self) -> Option<String> {
            self.0.next().map(|s| s.to_string())
        }
    }

    async fn drive(chunks: &[&'static str]) -> Result<Vec<Token>> {
        let mut buffer = InputBuffer::new(VecSource(chunks.to_vec().into_iter()));
        let mut tokenizer = Tokenizer::new();
        let mut handler = RecordingHandler::default();
        loop {
            match tokenizer.pump(&mut buffer, &mut handler)? {
                PumpOutcome::Progressed => continue,
                PumpOutcome::Done => break,
                PumpOutcome::NeedMoreInput => {
                    buffer.expand().await?;
                }
            }
        }
        Ok(handler.0)
    }

    #[tokio::test]
    async fn tokenizes_flat_object() {
        let tokens = drive(&[r#"{"a":1,"b":true}"#]).await.unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::ObjectStart,
                Token::StringStart,
                Token::StringMiddle("a".into()),
                Token::StringEnd,
                Token::Number(1.0),
                Token::StringStart,
                Token::StringMiddle("b".into()),
                Token::StringEnd,
                Token::Boolean(true),
                Token::ObjectEnd,
            ]
        );
    }

    #[tokio::test]
    async fn tokenizes_nested_array_split_across_chunks() {
        let tokens = drive(&["[1, \"a", "bc\", nul", "l, [tr", "ue]]"]).await.unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::ArrayStart,
                Token::Number(1.0),
                Token::StringStart,
                Token::StringMiddle("a".into()),
                Token::StringMiddle("bc".into()),
                Token::StringEnd,
                Token::Null,
                Token::ArrayStart,
                Token::Boolean(true),
                Token::ArrayEnd,
                Token::ArrayEnd,
            ]
        );
    }

    #[tokio::test]
    async fn tokenizes_escape_sequences() {
        let tokens = drive(&[r#""a\nb\tcA""#]).await.unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::StringStart,
                Token::StringMiddle("a".into()),
                Token::StringMiddle("\n".into()),
                Token::StringMiddle("b".into()),
                Token::StringMiddle("\t".into()),
                Token::StringMiddle("cA".into()),
                Token::StringEnd,
            ]
        );
    }

    #[tokio::test]
    async fn tokenizes_surrogate_pair() {
        let tokens = drive(&[r#""\ud83d"#, r#"\ude00""#]).await.unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::StringStart,
                Token::StringMiddle("\u{1F600}".into()),
                Token::StringEnd,
            ]
        );
    }

    #[tokio::test]
    async fn tolerates_lone_high_surrogate() {
        let tokens = drive(&[r#""\ud83dx""#]).await.unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::StringStart,
                Token::StringMiddle("\u{FFFD}".into()),
                Token::StringMiddle("x".into()),
                Token::StringEnd,
            ]
        );
    }

    #[tokio::test]
    async fn rejects_leading_zero() {
        let err = drive(&["01"]).await.unwrap_err();
        assert!(matches!(err, Error::Lexical { .. }));
    }

    #[tokio::test]
    async fn scalar_number_at_top_level_ends_on_eof() {
        let tokens = drive(&["42"]).await.unwrap();
        assert_eq!(tokens, vec![Token::Number(42.0)]);
    }

    #[tokio::test]
    async fn nested_number_eof_without_closing_bracket_is_an_error() {
        // A number's EOF-tolerant stall must not leak past its own
        // emission: once "2" is decoded, the array is still open and
        // wants ',' or ']', so running out of input here is an error,
        // not a second legitimate stall.
        let err = drive(&["[1, 2"]).await.unwrap_err();
        assert!(matches!(err, Error::UnexpectedEndOfInput));
    }

    #[tokio::test]
    async fn rejects_unexpected_character() {
        let err = drive(&["[1, x]"]).await.unwrap_err();
        assert!(matches!(err, Error::Structural { .. }));
    }
}
