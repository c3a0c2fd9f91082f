// this_file: src/options.rs

//! Options accepted by [`crate::driver::parse`].

use crate::builder::CompletionPath;
use crate::value::JsonValue;

/// The default capacity hint for the Input Buffer's backing storage.
///
/// Purely a performance hint; changing it never affects parsing
/// semantics.
pub const DEFAULT_INITIAL_BUFFER_CAPACITY: usize = 256;

/// Options for a single parse.
pub struct ParserOptions {
    /// Invoked once per value (scalar, array, or object) as soon as it is
    /// known to be final. Children complete before their parents.
    pub complete_callback: Option<Box<dyn FnMut(&JsonValue, &CompletionPath)>>,
    /// A capacity hint for the Input Buffer's backing storage.
    pub initial_buffer_capacity: usize,
}

impl Default for ParserOptions {
    fn default() -> Self {
        ParserOptions {
            complete_callback: None,
            initial_buffer_capacity: DEFAULT_INITIAL_BUFFER_CAPACITY,
        }
    }
}

impl ParserOptions {
    /// Creates options with no completion callback.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the completion callback.
    pub fn with_complete_callback(
        mut self,
        callback: impl FnMut(&JsonValue, &CompletionPath) + 'static,
    ) -> Self {
        self.complete_callback = Some(Box::new(callback));
        self
    }
}
