use crate::comparison::compare;
use crate::context::Context;
use crate::matcher::Matcher;
use crate::render::Renderer;
use crate::report::{CmpResult, Error};
use crate::types::Type;
use crate::value::Value;

use super::ExpectedType;

/// Non-nil pointer whose target matches an expectation.
pub struct Ptr {
    expected: Value,
    /// Unknown when the expectation is itself an operator without a type.
    ty: Option<ExpectedType>,
}

impl Ptr {
    pub fn new(expected: Value) -> Self {
        let ty = match expected.unwrap_dyn() {
            Value::Operator(op) => op.type_behind().filter(|t| *t != Type::Any),
            v => v.ty(),
        };
        Self { expected, ty: ty.map(ExpectedType::pointer_to) }
    }
}

impl Matcher for Ptr {
    fn name(&self) -> &'static str {
        "Ptr"
    }

    fn matches(&self, ctx: &Context, got: &Value) -> CmpResult {
        if let Some(ty) = &self.ty {
            ty.check(ctx, got)?;
        }
        let Value::Ptr(ptr) = got else {
            return Err(ctx.collect_error(|_| {
                Error::new("type mismatch")
                    .with_got(got.type_name())
                    .with_expected("pointer")
            }));
        };
        match ptr.deref() {
            Ok(target) => compare(&ctx.add_deref(), target, &self.expected),
            Err(_) => Err(ctx.collect_error(|r| {
                Error::new("nil value")
                    .with_got(r.value(got))
                    .with_expected(self.render())
            })),
        }
    }

    fn render(&self) -> String {
        format!("Ptr({})", Renderer::default().value(&self.expected))
    }

    fn type_behind(&self) -> Option<Type> {
        self.ty.as_ref().map(ExpectedType::expected)
    }
}

#[cfg(test)]
mod tests {
    use crate::operators::{any, ptr};
    use crate::types::{FieldDef, RecordType, Type};
    use crate::value::{Ptr, Record};
    use crate::{eq_deeply, match_deeply, Value};
    use pretty_assertions::assert_eq;

    #[test]
    fn matches_the_target() {
        let got = Value::ptr(Type::Int, 12i64);
        assert!(eq_deeply(&got, &ptr(12i64).into()));
        assert!(eq_deeply(&got, &ptr(any([11i64, 12])).into()));

        let err = match_deeply(&got, &ptr(13i64).into()).unwrap_err();
        assert_eq!(err.path, "*DATA");
        assert_eq!(err.message, "values differ");
        assert_eq!(err.location.as_ref().map(|l| l.operator.as_str()), Some("Ptr"));
    }

    #[test]
    fn pointer_type_is_checked_first() {
        let err = match_deeply(&Value::Int(12), &ptr(12i64).into()).unwrap_err();
        assert_eq!(err.message, "type mismatch");
        assert_eq!(err.got_string(), "int");
        assert_eq!(err.expected_string(), "*int");

        let err = match_deeply(&Value::ptr(Type::Uint, 12u64), &ptr(12i64).into()).unwrap_err();
        assert_eq!(err.expected_string(), "*int");

        let err = match_deeply(&Value::Int(12), &ptr(any([12i64])).into()).unwrap_err();
        assert_eq!(err.expected_string(), "pointer");
    }

    #[test]
    fn nil_pointer() {
        let err = match_deeply(&Value::Ptr(Ptr::nil(Type::Int)), &ptr(12i64).into()).unwrap_err();
        assert_eq!(err.message, "nil value");
        assert_eq!(err.expected_string(), "Ptr(12)");
    }

    #[test]
    fn field_through_pointer() {
        let rt = RecordType::new("Box", vec![FieldDef::new("Size", Type::Int)]);
        let rec = |n: i64| -> Value { Record::new(&rt, vec![n.into()]).unwrap().into() };
        let got = Value::ptr(Type::Record(rt.clone()), rec(1));
        let err = match_deeply(&got, &ptr(rec(2)).into()).unwrap_err();
        assert_eq!(err.path, "DATA.Size");
    }
}
