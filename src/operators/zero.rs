use crate::comparison::{compare, equal};
use crate::context::Context;
use crate::matcher::Matcher;
use crate::report::{CmpResult, Error};
use crate::value::Value;

/// Zero value of `got`'s own type. Untyped nil counts as zero.
pub struct Zero;

pub struct NotZero;

fn zero_of(got: &Value) -> Value {
    got.ty().map_or(Value::Nil, |ty| ty.zero_value())
}

impl Matcher for Zero {
    fn name(&self) -> &'static str {
        "Zero"
    }

    fn matches(&self, ctx: &Context, got: &Value) -> CmpResult {
        compare(ctx, got, &zero_of(got))
    }

    fn render(&self) -> String {
        "Zero()".to_string()
    }
}

impl Matcher for NotZero {
    fn name(&self) -> &'static str {
        "NotZero"
    }

    fn matches(&self, ctx: &Context, got: &Value) -> CmpResult {
        if !equal(ctx, got, &zero_of(got)) {
            return Ok(());
        }
        Err(ctx.collect_error(|r| {
            Error::new("zero value").with_got(r.value(got)).with_expected("NotZero()")
        }))
    }

    fn render(&self) -> String {
        "NotZero()".to_string()
    }
}
