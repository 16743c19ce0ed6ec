use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use deep_match::operators::{any, code, contains, nil};
use deep_match::value::Ptr;
use deep_match::{eq_deeply, match_deeply, Type, Value};
use pretty_assertions::assert_eq;

#[test]
fn test_contains_sequence() {
    let got: Value = vec![12i64, 34, 28].into();
    assert!(match_deeply(&got, &contains(34i64).into()).is_ok());

    let err = match_deeply(&got, &contains(35i64).into()).unwrap_err();
    assert_eq!(err.message, "does not contain");
    assert!(!eq_deeply(&got, &contains(35i64).into()));
}

#[test]
fn test_contains_map_values() {
    let got = Value::map(Type::Str, Type::Int, [("a", 12i64), ("b", 34)]);
    assert!(eq_deeply(&got, &contains(34i64).into()));
}

#[test]
fn test_contains_string() {
    assert!(eq_deeply(&Value::from("foo bar"), &contains('o').into()));
}

#[test]
fn test_contains_typed_nil() {
    let got = Value::seq(
        Type::ptr(Type::Int),
        [Value::ptr(Type::Int, 1i64), Value::Ptr(Ptr::nil(Type::Int))],
    );
    assert!(eq_deeply(&got, &contains(Value::Nil).into()));
    assert!(eq_deeply(&got, &contains(nil()).into()));
    assert!(!eq_deeply(&got, &contains(Value::Ptr(Ptr::nil(Type::Byte))).into()));
}

#[test]
fn test_any_reports_the_candidates() {
    assert!(match_deeply(&Value::Int(6), &any([5i64, 6, 7]).into()).is_ok());

    let err = match_deeply(&Value::Int(8), &any([5i64, 6, 7]).into()).unwrap_err();
    assert_eq!(err.message, "comparing with Any");
    assert_eq!(err.expected_string(), "Any(5, 6, 7)");
    let loc = err.location.unwrap();
    assert_eq!(loc.operator, "Any");
    assert!(loc.file.ends_with("builtin_operators.rs"));
    assert_eq!(loc.line, 45);
}

#[test]
fn test_code_incompatible_type() {
    let called = Arc::new(AtomicBool::new(false));
    let flag = called.clone();
    let op: Value = code(move |_: String| {
        flag.store(true, Ordering::SeqCst);
        true
    })
    .into();

    let err = match_deeply(&Value::Int(12), &op).unwrap_err();
    assert_eq!(err.message, "incompatible parameter type");
    assert_eq!((err.got_string(), err.expected_string()), ("int", "string"));
    assert!(!called.load(Ordering::SeqCst));
}

#[test]
fn test_index_is_reported() {
    let got = Value::list([1i64, 2, 3]);
    let err = match_deeply(&got, &Value::list([Value::Int(1), any([5i64]).into(), Value::Int(3)])).unwrap_err();
    assert_eq!(err.path, "DATA[1]");
}

#[test]
fn test_contains_nil_error() {
    let got = Value::seq(Type::Error, [Value::Error("boom".into()), Value::Nil]);
    assert!(eq_deeply(&got, &contains(Value::Nil).into()));
    assert!(eq_deeply(&got, &contains(nil()).into()));
    assert!(eq_deeply(&got, &contains(Value::Error("boom".into())).into()));

    let only_errors = Value::seq(Type::Error, [Value::Error("boom".into())]);
    let err = match_deeply(&only_errors, &contains(nil()).into()).unwrap_err();
    assert_eq!(err.message, "does not contain");
}
