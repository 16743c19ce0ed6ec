use crate::context::Context;
use crate::matcher::Matcher;
use crate::report::{CmpResult, Error};
use crate::value::Value;

/// Untyped nil, or a nil of any nilable type.
pub struct Nil;

/// Anything but nil.
pub struct NotNil;

impl Matcher for Nil {
    fn name(&self) -> &'static str {
        "Nil"
    }

    fn matches(&self, ctx: &Context, got: &Value) -> CmpResult {
        if got.is_nil() {
            return Ok(());
        }
        Err(ctx.collect_error(|r| {
            Error::new("non-nil").with_got(r.value(got)).with_expected("nil")
        }))
    }

    fn render(&self) -> String {
        "nil".to_string()
    }
}

impl Matcher for NotNil {
    fn name(&self) -> &'static str {
        "NotNil"
    }

    fn matches(&self, ctx: &Context, got: &Value) -> CmpResult {
        if !got.is_nil() {
            return Ok(());
        }
        Err(ctx.collect_error(|r| {
            Error::new("nil value").with_got(r.value(got)).with_expected("not nil")
        }))
    }

    fn render(&self) -> String {
        "not nil".to_string()
    }
}
