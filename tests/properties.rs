use std::sync::{Arc, OnceLock};

use deep_match::value::{Map, Ptr, Record, Seq};
use deep_match::{eq_deeply, match_deeply, operators, FieldDef, RecordType, Type, Value};
use proptest::prelude::*;

fn pair_type() -> Arc<RecordType> {
    static PAIR: OnceLock<Arc<RecordType>> = OnceLock::new();
    PAIR.get_or_init(|| {
        RecordType::new(
            "Pair",
            vec![FieldDef::new("Left", Type::Any), FieldDef::new("Right", Type::Any)],
        )
    })
    .clone()
}

// Floats stay finite: exact float equality makes NaN unequal to itself.
fn leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Nil),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        (-1.0e9f64..1.0e9).prop_map(Value::Float),
        "[a-z]{0,6}".prop_map(Value::Str),
        prop::collection::vec(any::<i64>(), 0..3).prop_map(|v| Value::seq(Type::Int, v)),
        Just(Value::Seq(Seq::nil(Type::Int))),
        Just(Value::Map(Map::nil(Type::Str, Type::Any))),
        Just(Value::Ptr(Ptr::nil(Type::Any))),
    ]
}

fn containers(inner: BoxedStrategy<Value>) -> impl Strategy<Value = Value> {
    prop_oneof![
        prop::collection::vec(inner.clone(), 0..4).prop_map(Value::list),
        prop::collection::btree_map("[a-z]{1,3}", inner.clone(), 0..4).prop_map(|m| {
            Value::map(Type::Str, Type::Any, m.into_iter().map(|(k, v)| (k, Value::dynamic(v))))
        }),
        inner.clone().prop_map(|v| Value::ptr(Type::Any, Value::dynamic(v))),
        (inner.clone(), inner).prop_map(|(l, r)| {
            let fields = vec![Value::dynamic(l), Value::dynamic(r)];
            Record::new(&pair_type(), fields).unwrap().into()
        }),
    ]
}

/// Plain data, as found on the got side.
fn arb_value() -> impl Strategy<Value = Value> {
    leaf().prop_recursive(4, 48, 4, containers)
}

/// Data possibly holding operators, as found on the expected side.
fn arb_expected() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        4 => leaf(),
        1 => Just(Value::from(operators::nil())),
        1 => Just(Value::from(operators::not_nil())),
        1 => Just(Value::from(operators::zero())),
    ];
    leaf.prop_recursive(4, 48, 4, |inner| {
        prop_oneof![
            containers(inner.clone()),
            prop::collection::vec(inner.clone(), 1..3)
                .prop_map(|items| Value::from(operators::any(items))),
            inner.clone().prop_map(|v| Value::from(operators::contains(v))),
            inner.prop_map(|v| Value::from(operators::ptr(v))),
        ]
    })
}

proptest! {
    #[test]
    fn reflexive(v in arb_value()) {
        prop_assert!(match_deeply(&v, &v.clone()).is_ok());
        prop_assert!(eq_deeply(&v, &v));
    }

    #[test]
    fn modes_agree(v in arb_value(), w in arb_expected()) {
        prop_assert_eq!(match_deeply(&v, &w).is_ok(), eq_deeply(&v, &w));
    }

    #[test]
    fn any_of_itself_matches(v in arb_value(), w in arb_value()) {
        let expected = Value::from(operators::any([w, v.clone()]));
        prop_assert!(eq_deeply(&v, &expected));
        prop_assert!(match_deeply(&v, &expected).is_ok());
    }

    #[test]
    fn first_differing_index_is_reported(
        items in prop::collection::vec(any::<i64>(), 1..10),
        pick in any::<prop::sample::Index>(),
    ) {
        let i = pick.index(items.len());
        let mut changed = items.clone();
        changed[i] = changed[i].wrapping_add(1);

        let err = match_deeply(&Value::list(items), &Value::list(changed));
        let err = err.err();
        prop_assert_eq!(err.map(|e| e.path), Some(format!("DATA[{i}]")));
    }
}
