use crate::context::Context;
use crate::matcher::Matcher;
use crate::report::{CmpResult, Error};
use crate::types::Type;
use crate::value::{FromValue, Value};

/// Return types a [`Code`] predicate may have.
pub trait Verdict {
    /// Type name used when rendering the operator.
    fn shape() -> &'static str;

    fn into_verdict(self) -> (bool, Option<String>);
}

impl Verdict for bool {
    fn shape() -> &'static str {
        "bool"
    }

    fn into_verdict(self) -> (bool, Option<String>) {
        (self, None)
    }
}

impl Verdict for (bool, String) {
    fn shape() -> &'static str {
        "(bool, string)"
    }

    fn into_verdict(self) -> (bool, Option<String>) {
        (self.0, Some(self.1).filter(|r| !r.is_empty()))
    }
}

impl Verdict for (bool, &'static str) {
    fn shape() -> &'static str {
        "(bool, string)"
    }

    fn into_verdict(self) -> (bool, Option<String>) {
        (self.0, Some(self.1.to_string()).filter(|r| !r.is_empty()))
    }
}

type Predicate = Box<dyn Fn(&Value) -> Option<(bool, Option<String>)> + Send + Sync>;

/// Custom predicate over a typed argument.
pub struct Code {
    param: Type,
    returns: &'static str,
    predicate: Predicate,
}

impl Code {
    pub fn new<T, R, F>(f: F) -> Self
    where
        T: FromValue + 'static,
        R: Verdict + 'static,
        F: Fn(T) -> R + Send + Sync + 'static,
    {
        Self {
            param: T::param_type(),
            returns: R::shape(),
            predicate: Box::new(move |got| T::from_value(got).map(|arg| f(arg).into_verdict())),
        }
    }

    fn accepts(&self, got: &Value) -> bool {
        match got.ty() {
            Some(ty) => ty.assignable_to(&self.param),
            None => self.param == Type::Any,
        }
    }

    fn incompatible(&self, ctx: &Context, got: &Value) -> CmpResult {
        Err(ctx.collect_error(|_| {
            Error::new("incompatible parameter type")
                .with_got(got.type_name())
                .with_expected(self.param.to_string())
        }))
    }
}

impl Matcher for Code {
    fn name(&self) -> &'static str {
        "Code"
    }

    fn matches(&self, ctx: &Context, got: &Value) -> CmpResult {
        if !self.accepts(got) {
            return self.incompatible(ctx, got);
        }
        let Some((ok, reason)) = (self.predicate)(got) else {
            return self.incompatible(ctx, got);
        };
        if ok {
            return Ok(());
        }
        Err(ctx.collect_error(|r| {
            let value = format!("value: {}", r.value(got));
            let summary = match reason {
                Some(reason) => format!("{value}\nreason: {reason}"),
                None => format!("{value}\nthe predicate gave no reason"),
            };
            Error::new(format!("ran code with {} as argument", ctx.path_string()))
                .with_summary(summary)
        }))
    }

    fn render(&self) -> String {
        format!("Code(fn({}) -> {})", self.param, self.returns)
    }

    fn type_behind(&self) -> Option<Type> {
        Some(self.param.clone())
    }
}
