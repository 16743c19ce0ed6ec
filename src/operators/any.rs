use crate::comparison::equal;
use crate::context::Context;
use crate::matcher::Matcher;
use crate::render::Renderer;
use crate::report::{CmpResult, Error};
use crate::value::Value;

/// Alternation over candidate expectations.
pub struct Any {
    items: Vec<Value>,
}

impl Any {
    pub fn new(items: Vec<Value>) -> Self {
        Self { items }
    }

    fn describe(&self, r: &Renderer) -> String {
        format!("Any({})", r.list(&self.items))
    }
}

impl Matcher for Any {
    fn name(&self) -> &'static str {
        "Any"
    }

    fn matches(&self, ctx: &Context, got: &Value) -> CmpResult {
        if self.items.iter().any(|item| equal(ctx, got, item)) {
            return Ok(());
        }
        Err(ctx.collect_error(|r| {
            Error::new("comparing with Any")
                .with_got(r.value(got))
                .with_expected(self.describe(r))
        }))
    }

    fn render(&self) -> String {
        self.describe(&Renderer::default())
    }
}

#[cfg(test)]
mod tests {
    use crate::operators::any;
    use crate::{eq_deeply, match_deeply, Value};
    use pretty_assertions::assert_eq;

    #[test]
    fn picks_any_candidate() {
        let op: Value = any([5i64, 6, 7]).into();
        assert!(match_deeply(&Value::Int(6), &op).is_ok());
        assert!(match_deeply(&Value::Nil, &any([Value::Int(5), Value::Nil]).into()).is_ok());

        let err = match_deeply(&Value::Int(8), &op).unwrap_err();
        assert_eq!(err.message, "comparing with Any");
        assert_eq!(err.path, "DATA");
        assert_eq!(err.got_string(), "8");
        assert_eq!(err.expected_string(), "Any(5, 6, 7)");
        assert!(err.location.is_some());
        assert!(!eq_deeply(&Value::Int(8), &op));
    }

    #[test]
    fn nil_candidate_is_rendered() {
        let err = match_deeply(&Value::Int(6), &any([Value::Nil]).into()).unwrap_err();
        assert_eq!(err.expected_string(), "Any(nil)");
        let err = match_deeply(&Value::Nil, &any([6i64]).into()).unwrap_err();
        assert_eq!(err.got_string(), "nil");
    }

    #[test]
    fn has_no_type_behind() {
        assert!(any([6i64]).type_behind().is_none());
        assert_eq!(any([6i64, 7]).render(), "Any(6, 7)");
    }
}
