// this_file: src/builder.rs

//! The Value Builder: consumes [`Token`]s and grows a [`JsonValue`] tree
//! in place, tracking its own state stack and invoking completion
//! callbacks as values finish.
//!
//! Grounded on `vexy_json_core::streaming::mod::StreamingValueBuilder` in
//! shape (a builder driven by discrete events that assembles a value
//! tree) but diverges from it in the one respect that matters here: that
//! builder only produces a final value once parsing ends, whereas this
//! one mutates a tree that is already visible to a consumer and grows in
//! place, one token at a time.

use crate::error::{Error, Result};
use crate::token::TokenHandler;
use crate::value::JsonValue;
use std::rc::Rc;

/// One step of a path to a value inside the tree, used by completion
/// callbacks to describe where a value sits.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// An index into an array.
    Index(usize),
    /// A key into an object.
    Key(String),
}

/// A path from the document root to a value, valid only at the instant
/// it is handed to a completion callback: later container growth may
/// change what the same path would resolve to.
pub type CompletionPath = Vec<Segment>;

/// Where a string *value* (never a key) writes its growing content back
/// into the tree as each fragment arrives, so a consumer already holding
/// a reference to the parent array/object observes the string grow in
/// place — the same in-place-growth contract `JsonValue::Array`/`Object`
/// get from their `Rc<RefCell<_>>` handles, extended to string values.
/// Object keys have no sink: a key is only meaningful once fully known,
/// so it accumulates invisibly and is used atomically at `string_end`.
enum StringSink {
    Root,
    ArrayIndex(crate::value::SharedArray, usize),
    ObjectKey(crate::value::SharedObject, String),
}

/// A stack frame for the container currently being built.
enum Frame {
    /// Accumulating a string's content before it is assigned anywhere.
    InString {
        acc: String,
        sink: Option<StringSink>,
    },
    /// Building the elements of an array.
    InArray {
        handle: crate::value::SharedArray,
        path: CompletionPath,
    },
    /// An object waiting for its next key.
    InObjectExpectingKey {
        handle: crate::value::SharedObject,
        path: CompletionPath,
        /// A value already assigned to a key but not yet reported
        /// complete, because the same key could still be overwritten.
        pending: Option<(String, JsonValue)>,
    },
    /// An object that has just read a key and now expects its value.
    InObjectExpectingValue {
        handle: crate::value::SharedObject,
        path: CompletionPath,
        key: String,
        pending: Option<(String, JsonValue)>,
    },
}

/// Grows a [`JsonValue`] tree from a token stream.
///
/// The initial builder state is represented implicitly by an empty
/// `stack` and `root: None`.
pub struct Builder<F: FnMut(&JsonValue, &CompletionPath)> {
    stack: Vec<Frame>,
    root: Option<JsonValue>,
    on_complete: Option<F>,
    /// Set whenever a token processed since the last [`Self::take_progressed`]
    /// call made a user-visible change to the tree — the fine-grained
    /// progression rule the Parse Driver uses to decide whether to yield,
    /// distinct from the Tokenizer's own buffer-draining progress flag.
    progressed: bool,
}

impl<F: FnMut(&JsonValue, &CompletionPath)> Builder<F> {
    /// Creates an empty builder. `on_complete` is invoked once per value
    /// (scalar, array, or object) as it is known to be final, in
    /// post-order (children before parents).
    pub fn new(on_complete: Option<F>) -> Self {
        Builder {
            stack: Vec::new(),
            root: None,
            on_complete,
            progressed: false,
        }
    }

    /// The root value built so far, if any token has been processed.
    pub fn root(&self) -> Option<&JsonValue> {
        self.root.as_ref()
    }

    /// Reads and clears whether the tree changed in a user-visible way
    /// since the last call.
    pub fn take_progressed(&mut self) -> bool {
        std::mem::replace(&mut self.progressed, false)
    }

    /// Invokes the completion callback, if one is set.
    fn complete(&mut self, value: JsonValue, path: CompletionPath) {
        if let Some(cb) = self.on_complete.as_mut() {
            cb(&value, &path);
        }
    }

    /// Flushes a frame's pending completion, if any, then clears it.
    fn flush_pending(&mut self, frame: &mut Frame) {
        let pending = match frame {
            Frame::InObjectExpectingKey { pending, .. } => pending.take(),
            Frame::InObjectExpectingValue { pending, .. } => pending.take(),
            _ => None,
        };
        if let Some((key, value)) = pending {
            let path = match frame {
                Frame::InObjectExpectingKey { path, .. } | Frame::InObjectExpectingValue { path, .. } => {
                    let mut p = path.clone();
                    p.push(Segment::Key(key));
                    p
                }
                _ => unreachable!(),
            };
            self.complete(value, path);
        }
    }

    /// Places a freshly completed value into whatever container is on
    /// top of the stack (or makes it the root, if the stack is empty),
    /// invoking completion callbacks under the duplicate-key deferral
    /// policy recorded in `DESIGN.md`. Any flush due to a *different* key
    /// superseding a pending one already happened in `string_end`, so by
    /// the time this runs the frame's `pending` field (if any) always
    /// belongs to the key being written.
    fn place_value(&mut self, value: JsonValue) -> Result<()> {
        match self.stack.pop() {
            None => {
                self.root = Some(value.clone());
                self.complete(value, Vec::new());
            }
            Some(Frame::InArray { handle, path }) => {
                let index = handle.borrow().len();
                handle.borrow_mut().push(value.clone());
                let mut item_path = path.clone();
                item_path.push(Segment::Index(index));
                self.complete(value, item_path);
                self.stack.push(Frame::InArray { handle, path });
            }
            Some(Frame::InObjectExpectingValue { handle, path, key, .. }) => {
                handle.borrow_mut().insert(key.clone(), value.clone());
                self.stack.push(Frame::InObjectExpectingKey {
                    handle,
                    path,
                    pending: Some((key, value)),
                });
            }
            Some(frame @ (Frame::InString { .. } | Frame::InObjectExpectingKey { .. })) => {
                self.stack.push(frame);
                return Err(Error::InternalInvariant(
                    "place_value called in a state that cannot accept one".into(),
                ));
            }
        }
        Ok(())
    }

    /// Makes a freshly opened, still-empty array or object visible in its
    /// parent (or as the root) right away, the same in-place-growth
    /// treatment `string_start` gives string values — callers still on
    /// the stack see it grow from here on through the shared `Rc`, with
    /// no further insertion needed when it later closes. Returns the path
    /// this container itself occupies.
    fn open_container(&mut self, value: JsonValue) -> Result<CompletionPath> {
        match self.stack.last() {
            None => {
                self.root = Some(value);
                Ok(Vec::new())
            }
            Some(Frame::InArray { handle, path }) => {
                let index = handle.borrow().len();
                handle.borrow_mut().push(value);
                let mut p = path.clone();
                p.push(Segment::Index(index));
                Ok(p)
            }
            Some(Frame::InObjectExpectingValue { handle, path, key, .. }) => {
                handle.borrow_mut().insert(key.clone(), value);
                let mut p = path.clone();
                p.push(Segment::Key(key.clone()));
                Ok(p)
            }
            Some(Frame::InObjectExpectingKey { .. }) | Some(Frame::InString { .. }) => {
                Err(Error::InternalInvariant(
                    "open_container called while not expecting a value".into(),
                ))
            }
        }
    }

    /// Finalizes an array or object whose handle was already placed into
    /// its parent by `open_container` when it opened — fires completion
    /// callbacks (deferring through the duplicate-key policy for object
    /// values, same as `place_value`) without inserting the value again.
    fn finish_composite(&mut self, value: JsonValue, own_path: CompletionPath) -> Result<()> {
        match self.stack.pop() {
            None => {
                self.complete(value, own_path);
                Ok(())
            }
            Some(Frame::InArray { handle, path }) => {
                self.complete(value, own_path);
                self.stack.push(Frame::InArray { handle, path });
                Ok(())
            }
            Some(Frame::InObjectExpectingValue { handle, path, key, .. }) => {
                self.stack.push(Frame::InObjectExpectingKey {
                    handle,
                    path,
                    pending: Some((key, value)),
                });
                Ok(())
            }
            Some(frame @ (Frame::InString { .. } | Frame::InObjectExpectingKey { .. })) => {
                self.stack.push(frame);
                Err(Error::InternalInvariant(
                    "finish_composite called in a state that cannot accept one".into(),
                ))
            }
        }
    }

    /// Finalizes a string *value* (never a key) whose content is already
    /// written in place by `string_start`/`string_middle`, firing its
    /// completion callback without inserting it again.
    fn finish_string_value(&mut self, acc: String, sink: Option<StringSink>) -> Result<()> {
        let value = JsonValue::String(acc);
        match sink {
            // A value string always gets a sink from `string_start`; this
            // only defends against a future caller that forgets to.
            None => self.place_value(value),
            Some(StringSink::Root) => {
                self.root = Some(value.clone());
                self.complete(value, Vec::new());
                Ok(())
            }
            Some(StringSink::ArrayIndex(_, index)) => {
                let path = match self.stack.last() {
                    Some(Frame::InArray { path, .. }) => path.clone(),
                    _ => {
                        return Err(Error::InternalInvariant(
                            "string value sink did not match the array on top of the stack".into(),
                        ))
                    }
                };
                let mut item_path = path;
                item_path.push(Segment::Index(index));
                self.complete(value, item_path);
                Ok(())
            }
            Some(StringSink::ObjectKey(_, key)) => match self.stack.pop() {
                Some(Frame::InObjectExpectingValue { handle, path, key: frame_key, .. })
                    if frame_key == key =>
                {
                    self.stack.push(Frame::InObjectExpectingKey {
                        handle,
                        path,
                        pending: Some((key, value)),
                    });
                    Ok(())
                }
                _ => Err(Error::InternalInvariant(
                    "string value sink did not match the object on top of the stack".into(),
                )),
            },
        }
    }
}

impl<F: FnMut(&JsonValue, &CompletionPath)> TokenHandler for Builder<F> {
    fn null(&mut self) -> Result<()> {
        self.progressed = true;
        self.place_value(JsonValue::Null)
    }

    fn boolean(&mut self, value: bool) -> Result<()> {
        self.progressed = true;
        self.place_value(JsonValue::Boolean(value))
    }

    fn number(&mut self, value: f64) -> Result<()> {
        self.progressed = true;
        self.place_value(JsonValue::Number(value))
    }

    fn string_start(&mut self) -> Result<()> {
        let sink = match self.stack.last() {
            None => Some(StringSink::Root),
            Some(Frame::InArray { handle, .. }) => {
                Some(StringSink::ArrayIndex(handle.clone(), handle.borrow().len()))
            }
            Some(Frame::InObjectExpectingValue { handle, key, .. }) => {
                Some(StringSink::ObjectKey(handle.clone(), key.clone()))
            }
            // A string opened while an object awaits its next key is that
            // key itself: keys have no sink, they accumulate invisibly.
            Some(Frame::InObjectExpectingKey { .. }) => None,
            Some(Frame::InString { .. }) => {
                return Err(Error::InternalInvariant(
                    "string_start while already inside a string".into(),
                ));
            }
        };
        match &sink {
            Some(StringSink::Root) => self.root = Some(JsonValue::String(String::new())),
            Some(StringSink::ArrayIndex(handle, _)) => {
                handle.borrow_mut().push(JsonValue::String(String::new()));
            }
            Some(StringSink::ObjectKey(handle, key)) => {
                handle.borrow_mut().insert(key.clone(), JsonValue::String(String::new()));
            }
            None => {}
        }
        // A key accumulating (sink is None) is never user-visible until
        // string_end turns it into a key; a value string is, from its
        // first (empty) fragment onward.
        if sink.is_some() {
            self.progressed = true;
        }
        self.stack.push(Frame::InString {
            acc: String::new(),
            sink,
        });
        Ok(())
    }

    fn string_middle(&mut self, fragment: &str) -> Result<()> {
        let Some(Frame::InString { mut acc, sink }) = self.stack.pop() else {
            return Err(Error::InternalInvariant(
                "string_middle outside of a string".into(),
            ));
        };
        acc.push_str(fragment);
        match &sink {
            Some(StringSink::Root) => self.root = Some(JsonValue::String(acc.clone())),
            Some(StringSink::ArrayIndex(handle, index)) => {
                handle.borrow_mut()[*index] = JsonValue::String(acc.clone());
            }
            Some(StringSink::ObjectKey(handle, key)) => {
                handle.borrow_mut().insert(key.clone(), JsonValue::String(acc.clone()));
            }
            None => {}
        }
        if sink.is_some() {
            self.progressed = true;
        }
        self.stack.push(Frame::InString { acc, sink });
        Ok(())
    }

    fn string_end(&mut self) -> Result<()> {
        let Some(Frame::InString { acc, sink }) = self.stack.pop() else {
            return Err(Error::InternalInvariant("string_end outside of a string".into()));
        };
        match self.stack.pop() {
            Some(Frame::InObjectExpectingKey { handle, path, mut pending }) => {
                // The string just closed was an object key, not a value.
                // A pending completion from the *previous* key fires now,
                // unless that previous key is this same key reappearing
                // before its value ever fired — then it stays deferred
                // and is silently replaced once the new value lands.
                if let Some((pending_key, pending_value)) = pending.take() {
                    if pending_key == acc {
                        pending = Some((pending_key, pending_value));
                    } else {
                        let mut p = path.clone();
                        p.push(Segment::Key(pending_key));
                        self.complete(pending_value, p);
                    }
                }
                self.stack.push(Frame::InObjectExpectingValue {
                    handle,
                    path,
                    key: acc,
                    pending,
                });
                Ok(())
            }
            Some(other) => {
                self.stack.push(other);
                self.finish_string_value(acc, sink)
            }
            None => self.finish_string_value(acc, sink),
        }
    }

    fn array_start(&mut self) -> Result<()> {
        self.progressed = true;
        let (_, handle) = JsonValue::new_array();
        let path = self.open_container(JsonValue::Array(handle.clone()))?;
        self.stack.push(Frame::InArray { handle, path });
        Ok(())
    }

    fn array_end(&mut self) -> Result<()> {
        let Some(Frame::InArray { handle, path }) = self.stack.pop() else {
            return Err(Error::InternalInvariant("array_end outside of an array".into()));
        };
        self.finish_composite(JsonValue::Array(handle), path)
    }

    fn object_start(&mut self) -> Result<()> {
        self.progressed = true;
        let (_, handle) = JsonValue::new_object();
        let path = self.open_container(JsonValue::Object(handle.clone()))?;
        self.stack.push(Frame::InObjectExpectingKey {
            handle,
            path,
            pending: None,
        });
        Ok(())
    }

    fn object_end(&mut self) -> Result<()> {
        let Some(mut frame) = self.stack.pop() else {
            return Err(Error::InternalInvariant("object_end outside of an object".into()));
        };
        self.flush_pending(&mut frame);
        let Frame::InObjectExpectingKey { handle, path, .. } = frame else {
            return Err(Error::InternalInvariant(
                "object_end while a key's value was still open".into(),
            ));
        };
        self.finish_composite(JsonValue::Object(handle), path)
    }
}

/// True if `value` shares storage with `other` (same `Rc` allocation),
/// used by the Parse Driver to decide whether the root reference handed
/// to the consumer has already been seen.
pub fn same_root(a: &JsonValue, b: &JsonValue) -> bool {
    match (a, b) {
        (JsonValue::Array(x), JsonValue::Array(y)) => Rc::ptr_eq(x, y),
        (JsonValue::Object(x), JsonValue::Object(y)) => Rc::ptr_eq(x, y),
        _ => a == b,
    }
}
