use itertools::Itertools;
use tracing::trace;

use crate::context::{Context, VisitGuard};
use crate::report::{CmpResult, Error, Mismatch};
use crate::types::RecordType;
use crate::value::{Map, Ptr, Record, Seq, Value};

/// Pending work of one comparison.
///
/// Children are pushed in reverse so they pop in order; the first
/// difference found is the same as a recursive walk would find.
enum Step<'a> {
    Compare(Context, &'a Value, &'a Value),
    /// Ends a pointer pair's visit once everything above it is done.
    Leave(VisitGuard),
}

/// Compares `got` against `expected`, operators included.
///
/// Stops at the first difference; in diagnostic mode the returned
/// [`Mismatch`] carries the corresponding error. Nesting depth is bounded
/// by the heap, not the call stack, so long pointer chains are fine.
pub fn compare(ctx: &Context, got: &Value, expected: &Value) -> CmpResult {
    let mut stack = vec![Step::Compare(ctx.clone(), got, expected)];
    while let Some(step) = stack.pop() {
        match step {
            Step::Compare(ctx, got, expected) => compare_node(&ctx, got, expected, &mut stack)?,
            Step::Leave(guard) => drop(guard),
        }
    }
    Ok(())
}

/// Boolean-mode comparison.
pub fn equal(ctx: &Context, got: &Value, expected: &Value) -> bool {
    compare(&ctx.to_boolean(), got, expected).is_ok()
}

/// Checks one pair of values and schedules their children.
fn compare_node<'a>(
    ctx: &Context,
    got: &'a Value,
    expected: &'a Value,
    stack: &mut Vec<Step<'a>>,
) -> CmpResult {
    let got = got.unwrap_dyn();
    let expected = expected.unwrap_dyn();

    if let Value::Operator(op) = expected {
        return op.matches(ctx, got);
    }

    match (got, expected) {
        (Value::Nil, Value::Nil) => return Ok(()),
        (Value::Nil, _) | (_, Value::Nil) => return Err(values_differ(ctx, got, expected)),
        _ => {}
    }

    if got.ty() != expected.ty() {
        return Err(type_mismatch(ctx, got, expected));
    }

    match (got, expected) {
        (Value::Bool(a), Value::Bool(b)) => same(ctx, a == b, got, expected),
        (Value::Int(a), Value::Int(b)) => same(ctx, a == b, got, expected),
        (Value::Uint(a), Value::Uint(b)) => same(ctx, a == b, got, expected),
        (Value::Byte(a), Value::Byte(b)) => same(ctx, a == b, got, expected),
        // exact, no tolerance
        (Value::Float(a), Value::Float(b)) => same(ctx, a == b, got, expected),
        (Value::Char(a), Value::Char(b)) => same(ctx, a == b, got, expected),
        (Value::Str(a), Value::Str(b)) | (Value::Error(a), Value::Error(b)) => {
            same(ctx, a == b, got, expected)
        }
        (Value::Seq(g), Value::Seq(e)) => push_seq(ctx, g, e, got, expected, stack),
        (Value::Map(g), Value::Map(e)) => push_map(ctx, g, e, got, expected, stack),
        (Value::Ptr(g), Value::Ptr(e)) => push_ptr(ctx, g, e, got, expected, stack),
        (Value::Record(g), Value::Record(e)) => {
            let mut fields = Vec::new();
            record_fields(g.record_type(), g, e, &mut Vec::new(), &mut fields);
            stack.extend(
                fields
                    .into_iter()
                    .rev()
                    .map(|(name, gv, ev)| Step::Compare(ctx.add_field(name), gv, ev)),
            );
            Ok(())
        }
        (Value::Handle(g), Value::Handle(e)) => same(ctx, g.id() == e.id(), got, expected),
        _ => Err(values_differ(ctx, got, expected)),
    }
}

fn same(ctx: &Context, eq: bool, got: &Value, expected: &Value) -> CmpResult {
    if eq {
        Ok(())
    } else {
        Err(values_differ(ctx, got, expected))
    }
}

#[cold]
fn values_differ(ctx: &Context, got: &Value, expected: &Value) -> Mismatch {
    ctx.collect_error(|r| {
        Error::new("values differ")
            .with_got(r.value(got))
            .with_expected(r.value(expected))
    })
}

#[cold]
fn type_mismatch(ctx: &Context, got: &Value, expected: &Value) -> Mismatch {
    ctx.collect_error(|_| {
        Error::new("type mismatch")
            .with_got(got.type_name())
            .with_expected(expected.type_name())
    })
}

fn nil_state(is_nil: bool) -> &'static str {
    if is_nil {
        "nil"
    } else {
        "not nil"
    }
}

fn push_seq<'a>(
    ctx: &Context,
    g: &'a Seq,
    e: &'a Seq,
    got: &Value,
    expected: &Value,
    stack: &mut Vec<Step<'a>>,
) -> CmpResult {
    let (g_items, e_items) = match (&g.items, &e.items) {
        (None, None) => return Ok(()),
        (Some(g_items), Some(e_items)) => (g_items, e_items),
        _ => {
            return Err(ctx.collect_error(|_| {
                Error::new("nil slice")
                    .with_got(nil_state(g.items.is_none()))
                    .with_expected(nil_state(e.items.is_none()))
            }))
        }
    };

    if g_items.len() != e_items.len() {
        return Err(ctx.collect_error(|r| {
            Error::new(format!(
                "length mismatch: got {}, expected {}",
                g_items.len(),
                e_items.len()
            ))
            .with_got(r.value(got))
            .with_expected(r.value(expected))
        }));
    }

    let items = g_items.iter().zip(e_items).enumerate().rev();
    stack.extend(items.map(|(i, (gv, ev))| Step::Compare(ctx.add_index(i), gv, ev)));
    Ok(())
}

fn push_map<'a>(
    ctx: &Context,
    g: &'a Map,
    e: &'a Map,
    got: &Value,
    expected: &Value,
    stack: &mut Vec<Step<'a>>,
) -> CmpResult {
    let (g_entries, e_entries) = match (&g.entries, &e.entries) {
        (None, None) => return Ok(()),
        (Some(g_entries), Some(e_entries)) => (g_entries, e_entries),
        _ => {
            return Err(ctx.collect_error(|_| {
                Error::new("nil map")
                    .with_got(nil_state(g.entries.is_none()))
                    .with_expected(nil_state(e.entries.is_none()))
            }))
        }
    };

    // entries are sorted, so equal key sets means equal key sequences
    if g_entries.len() != e_entries.len() || !g_entries.keys().eq(e_entries.keys()) {
        return Err(ctx.collect_error(|r| {
            let missing = e_entries.keys().filter(|k| !g_entries.contains_key(*k)).collect_vec();
            let extra = g_entries.keys().filter(|k| !e_entries.contains_key(*k)).collect_vec();
            let mut summary = Vec::new();
            for (label, keys) in [("Missing", missing), ("Extra", extra)] {
                if !keys.is_empty() {
                    summary.push(format!("{label} key(s): {}", keys.iter().join(", ")));
                }
            }
            Error::new("comparing map")
                .with_got(r.value(got))
                .with_expected(r.value(expected))
                .with_summary(summary.join("\n"))
        }));
    }

    let entries = g_entries.iter().zip(e_entries).collect_vec();
    stack.extend(
        entries
            .into_iter()
            .rev()
            .map(|((key, gv), (_, ev))| Step::Compare(ctx.add_key(key), gv, ev)),
    );
    Ok(())
}

fn push_ptr<'a>(
    ctx: &Context,
    g: &'a Ptr,
    e: &'a Ptr,
    got: &Value,
    expected: &Value,
    stack: &mut Vec<Step<'a>>,
) -> CmpResult {
    match (g.deref(), e.deref()) {
        (Err(_), Err(_)) => Ok(()),
        (Err(_), Ok(_)) => Err(ctx.collect_error(|r| {
            Error::new("nil value")
                .with_got(r.value(got))
                .with_expected(r.value(expected))
        })),
        (Ok(_), Err(_)) => Err(ctx.collect_error(|r| {
            Error::new("non-nil")
                .with_got(r.value(got))
                .with_expected(r.value(expected))
        })),
        (Ok(gv), Ok(ev)) => {
            let ids = (g.identity().unwrap_or_default(), e.identity().unwrap_or_default());
            match ctx.enter(ids.0, ids.1) {
                Some(guard) => {
                    stack.push(Step::Leave(guard));
                    stack.push(Step::Compare(ctx.add_deref(), gv, ev));
                }
                None => {
                    trace!(depth = ctx.depth(), "pointer pair already on this branch, assuming equal");
                }
            }
            Ok(())
        }
    }
}

/// Lists record fields in declaration order. Embedded records of the same
/// type are walked in place, their fields being named as flattened in
/// `outer`.
fn record_fields<'a>(
    outer: &'a RecordType,
    g: &'a Record,
    e: &'a Record,
    index: &mut Vec<usize>,
    out: &mut Vec<(&'a str, &'a Value, &'a Value)>,
) {
    let fields = g.record_type().fields().iter().zip(g.values()).zip(e.values());
    for (i, ((def, gv), ev)) in fields.enumerate() {
        index.push(i);
        match (gv, ev) {
            (Value::Record(gr), Value::Record(er))
                if def.embedded && gr.record_type() == er.record_type() =>
            {
                record_fields(outer, gr, er, index, out)
            }
            _ => out.push((outer.field_name(index).unwrap_or(&def.name), gv, ev)),
        }
        index.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FieldDef, Type};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn diag(got: &Value, expected: &Value) -> Error {
        match compare(&Context::default(), got, expected) {
            Err(Mismatch::Report(err)) => *err,
            other => panic!("expected a report, got {other:?}"),
        }
    }

    fn ok(got: &Value, expected: &Value) {
        assert_eq!(compare(&Context::default(), got, expected), Ok(()));
        assert!(equal(&Context::default(), got, expected));
    }

    #[test]
    fn scalars() {
        ok(&Value::Int(3), &Value::Int(3));
        let err = diag(&Value::Int(3), &Value::Int(4));
        assert_eq!(err.message, "values differ");
        assert_eq!(err.path, "DATA");
        assert_eq!(err.got_string(), "3");
        assert_eq!(err.expected_string(), "4");

        let err = diag(&Value::Int(3), &Value::Uint(3));
        assert_eq!(err.message, "type mismatch");
        assert_eq!((err.got_string(), err.expected_string()), ("int", "uint"));

        assert!(!equal(&Context::default(), &Value::Float(f64::NAN), &Value::Float(f64::NAN)));
    }

    #[test]
    fn untyped_nil() {
        ok(&Value::Nil, &Value::Nil);
        ok(&Value::dynamic(Value::Nil), &Value::Nil);
        let err = diag(&Value::Nil, &Value::Ptr(Ptr::nil(Type::Int)));
        assert_eq!(err.message, "values differ");
        assert_eq!(err.got_string(), "nil");
    }

    #[test]
    fn sequences() {
        let a: Value = vec![1i64, 2, 3].into();
        ok(&a, &a.clone());

        let err = diag(&a, &vec![1i64, 2, 4].into());
        assert_eq!(err.path, "DATA[2]");

        let err = diag(&a, &vec![1i64, 2].into());
        assert_eq!(err.message, "length mismatch: got 3, expected 2");
        assert_eq!(err.path, "DATA");

        let err = diag(&Value::Seq(Seq::nil(Type::Int)), &Value::seq(Type::Int, Vec::<i64>::new()));
        assert_eq!(err.message, "nil slice");
        assert_eq!((err.got_string(), err.expected_string()), ("nil", "not nil"));
    }

    #[test]
    fn maps_report_missing_and_extra_keys() {
        let got = Value::map(Type::Str, Type::Int, [("a", 1i64), ("c", 3), ("d", 4)]);
        let exp = Value::map(Type::Str, Type::Int, [("a", 1i64), ("b", 2), ("d", 4)]);
        let err = diag(&got, &exp);
        assert_eq!(err.message, "comparing map");
        assert_eq!(err.summary_string(), "Missing key(s): \"b\"\nExtra key(s): \"c\"");

        let exp = Value::map(Type::Str, Type::Int, [("a", 1i64), ("c", 30), ("d", 40)]);
        let err = diag(&got, &exp);
        assert_eq!(err.path, "DATA[\"c\"]");
        assert!(matches!(
            compare(&Context::default().to_boolean(), &got, &exp),
            Err(Mismatch::Boolean)
        ));
    }

    #[test]
    fn pointers_are_transparent_except_for_the_marker() {
        let got = Value::ptr(Type::Int, 1i64);
        let err = diag(&got, &Value::ptr(Type::Int, 2i64));
        assert_eq!(err.path, "*DATA");

        let err = diag(&Value::Ptr(Ptr::nil(Type::Int)), &got);
        assert_eq!(err.message, "nil value");
        let err = diag(&got, &Value::Ptr(Ptr::nil(Type::Int)));
        assert_eq!(err.message, "non-nil");

        let err = diag(&got, &Value::Ptr(Ptr::nil(Type::Uint)));
        assert_eq!(err.message, "type mismatch");
        assert_eq!((err.got_string(), err.expected_string()), ("*int", "*uint"));
    }

    fn node_type() -> Arc<RecordType> {
        let node = RecordType::declare("Node");
        node.define(vec![
            FieldDef::new("Val", Type::Int),
            FieldDef::new("Next", Type::ptr(Type::Record(node.clone()))),
        ])
        .unwrap();
        node
    }

    /// Ring of `vals.len()` nodes, returned as a pointer to the first one.
    fn ring(node: &Arc<RecordType>, vals: &[i64]) -> Value {
        let (head, slot) = Ptr::pending(Type::Record(node.clone()));
        let mut next = head.clone();
        for v in vals.iter().skip(1).rev() {
            let rec = Record::new(node, vec![Value::Int(*v), next.into()]).unwrap();
            next = Ptr::new(Type::Record(node.clone()), rec.into());
        }
        slot.fill(Record::new(node, vec![Value::Int(vals[0]), next.into()]).unwrap().into());
        head.into()
    }

    /// Chain of nodes ending with a nil pointer.
    fn chain(node: &Arc<RecordType>, vals: &[i64]) -> Value {
        let mut next = Value::Ptr(Ptr::nil(Type::Record(node.clone())));
        for v in vals.iter().rev() {
            let rec = Record::new(node, vec![Value::Int(*v), next]).unwrap();
            next = Value::ptr(Type::Record(node.clone()), rec);
        }
        next
    }

    #[test]
    fn cycles_terminate() {
        let node = node_type();
        ok(&ring(&node, &[1]), &ring(&node, &[1]));
        ok(&ring(&node, &[1, 1]), &ring(&node, &[1]));
        let one = ring(&node, &[1]);
        ok(&one, &one);

        let err = diag(&ring(&node, &[1, 2]), &ring(&node, &[1, 3]));
        assert_eq!(err.path, "DATA.Next.Val");

        let err = diag(&ring(&node, &[1]), &chain(&node, &[1, 1, 1]));
        assert_eq!(err.message, "non-nil");
        assert_eq!(err.path, "DATA.Next.Next.Next");
        assert!(!equal(&Context::default(), &chain(&node, &[1, 1]), &ring(&node, &[1])));
    }

    #[test]
    fn records_flatten_embedded_fields() {
        let base = RecordType::new("Base", vec![FieldDef::new("Flag", Type::Bool)]);
        let outer = RecordType::new(
            "Outer",
            vec![FieldDef::embed(&base), FieldDef::new("Count", Type::Int)],
        );
        let make = |flag: bool, count: i64| -> Value {
            let inner = Record::new(&base, vec![flag.into()]).unwrap();
            Record::new(&outer, vec![inner.into(), count.into()]).unwrap().into()
        };
        ok(&make(true, 1), &make(true, 1));
        assert_eq!(diag(&make(true, 1), &make(false, 1)).path, "DATA.Flag");
        assert_eq!(diag(&make(true, 1), &make(true, 2)).path, "DATA.Count");

        let other = RecordType::new("Outer", vec![]);
        let err = diag(&make(true, 1), &Record::zero(&other).into());
        assert_eq!(err.message, "type mismatch");
    }

    #[test]
    fn dynamic_values_unwrap_before_type_check() {
        let got = Value::list([Value::Int(1), Value::from("x")]);
        ok(&got, &Value::list([Value::Int(1), Value::from("x")]));
        let err = diag(&got, &Value::list([Value::Int(1), Value::Int(2)]));
        assert_eq!(err.path, "DATA[1]");
        assert_eq!(err.message, "type mismatch");
        assert_eq!((err.got_string(), err.expected_string()), ("string", "int"));
    }
}
