// this_file: tests/scenarios.rs

//! The concrete end-to-end scenarios: literal chunk sequences paired with
//! the exact sequence of yielded values (and, where relevant, completion
//! callback order) they must produce.

use increjson::{parse, JsonValue, ParserOptions};
use std::cell::RefCell;
use std::rc::Rc;

struct VecSource(std::vec::IntoIter<String>);

impl increjson::buffer::ChunkSource for VecSource {
    async fn next_chunk(&mut self) -> Option<String> {
        self.0.next()
    }
}

fn source(chunks: &[&str]) -> VecSource {
    VecSource(chunks.iter().map(|s| s.to_string()).collect::<Vec<_>>().into_iter())
}

/// Splits `text` into one-character chunks, matching scenario 1's
/// "one-byte-chunked" delivery (one Unicode scalar per chunk; this input
/// is pure ASCII, so the distinction does not matter here).
fn byte_chunked(text: &str) -> VecSource {
    VecSource(text.chars().map(|c| c.to_string()).collect::<Vec<_>>().into_iter())
}

async fn collect(src: VecSource, options: ParserOptions) -> increjson::Result<Vec<JsonValue>> {
    use futures_util::StreamExt;
    let stream = parse(src, options);
    tokio::pin!(stream);
    let mut values = Vec::new();
    while let Some(item) = stream.next().await {
        values.push(item?);
    }
    Ok(values)
}

fn obj(value: &JsonValue) -> std::cell::Ref<'_, indexmap::IndexMap<String, JsonValue>> {
    value.as_object().unwrap().borrow()
}

fn arr(value: &JsonValue) -> std::cell::Ref<'_, Vec<JsonValue>> {
    value.as_array().unwrap().borrow()
}

#[tokio::test]
async fn scenario_1_object_with_nested_array_one_byte_chunked() {
    let log: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
    let log2 = log.clone();
    let options = ParserOptions::new().with_complete_callback(move |value, _path| {
        log2.borrow_mut().push(format!("{value}"));
    });
    let values = collect(byte_chunked(r#"{"name":"Alex","keys":[1,20,300]}"#), options)
        .await
        .unwrap();

    // Ten user-visible changes: the object opening, the five successive
    // growths of "Alex" (empty through full), the "keys" array opening,
    // and one per number appended to it.
    assert_eq!(values.len(), 10, "expected exactly ten yielded snapshots");

    assert!(obj(&values[0]).is_empty());
    assert_eq!(obj(&values[1])["name"], JsonValue::String(String::new()));
    assert_eq!(obj(&values[2])["name"], JsonValue::String("A".into()));
    assert_eq!(obj(&values[3])["name"], JsonValue::String("Al".into()));
    assert_eq!(obj(&values[4])["name"], JsonValue::String("Ale".into()));
    assert_eq!(obj(&values[5])["name"], JsonValue::String("Alex".into()));
    assert!(obj(&values[6]).contains_key("keys"));
    assert!(arr(&obj(&values[6])["keys"]).is_empty());
    assert_eq!(*arr(&obj(&values[7])["keys"]), vec![JsonValue::Number(1.0)]);
    assert_eq!(
        *arr(&obj(&values[8])["keys"]),
        vec![JsonValue::Number(1.0), JsonValue::Number(20.0)]
    );
    assert_eq!(
        *arr(&obj(&values[9])["keys"]),
        vec![JsonValue::Number(1.0), JsonValue::Number(20.0), JsonValue::Number(300.0)]
    );

    assert_eq!(
        log.borrow().as_slice(),
        &[
            "\"Alex\"".to_string(),
            "1".to_string(),
            "20".to_string(),
            "300".to_string(),
            "[1,20,300]".to_string(),
            r#"{"name":"Alex","keys":[1,20,300]}"#.to_string(),
        ]
    );
}

#[tokio::test]
async fn scenario_2_bare_boolean_literal() {
    let values = collect(source(&["true"]), ParserOptions::new()).await.unwrap();
    assert_eq!(values, vec![JsonValue::Boolean(true)]);
}

#[tokio::test]
async fn scenario_3_number_split_across_chunks() {
    let values = collect(source(&["3.", "14"]), ParserOptions::new()).await.unwrap();
    assert_eq!(values, vec![JsonValue::Number(3.14)]);
}

#[tokio::test]
async fn scenario_4_array_grows_one_element_at_a_time() {
    let values = collect(source(&["[", "1", ",2]"]), ParserOptions::new()).await.unwrap();
    assert_eq!(values.len(), 3);
    assert!(arr(&values[0]).is_empty());
    assert_eq!(*arr(&values[1]), vec![JsonValue::Number(1.0)]);
    assert_eq!(*arr(&values[2]), vec![JsonValue::Number(1.0), JsonValue::Number(2.0)]);
}

#[tokio::test]
async fn scenario_5_duplicate_key_last_wins_with_deferred_completion() {
    let log: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
    let log2 = log.clone();
    let options = ParserOptions::new().with_complete_callback(move |value, _path| {
        log2.borrow_mut().push(format!("{value}"));
    });
    let values = collect(source(&[r#"{"a":1,"a":2}"#]), options).await.unwrap();

    assert_eq!(values.len(), 3);
    assert!(obj(&values[0]).is_empty());
    assert_eq!(obj(&values[1])["a"], JsonValue::Number(1.0));
    assert_eq!(obj(&values[2])["a"], JsonValue::Number(2.0));
    assert_eq!(obj(&values[2]).len(), 1, "the duplicate key leaves a single entry behind");

    assert_eq!(
        log.borrow().as_slice(),
        &["2".to_string(), r#"{"a":2}"#.to_string()],
        "the superseded value 1 must never be reported complete"
    );
}

#[tokio::test]
async fn scenario_6_eof_mid_array_is_unexpected_end_of_input() {
    let err = collect(source(&["[1, 2"]), ParserOptions::new()).await.unwrap_err();
    assert!(matches!(err, increjson::Error::UnexpectedEndOfInput));
}

#[tokio::test]
async fn scenario_7_trailing_garbage_after_a_closed_value_is_an_error() {
    let err = collect(source(&["[1,2] garbage"]), ParserOptions::new()).await.unwrap_err();
    assert!(matches!(err, increjson::Error::TrailingContent { .. }));
}
