use crate::comparison::equal;
use crate::context::Context;
use crate::matcher::Matcher;
use crate::render::Renderer;
use crate::report::{CmpResult, Error, Mismatch};
use crate::types::Type;
use crate::value::Value;

/// Containment check on sequences, maps and strings.
pub struct Contains {
    expected: Value,
}

impl Contains {
    pub fn new(expected: Value) -> Self {
        Self { expected }
    }

    fn is_operator(&self) -> bool {
        self.expected.as_operator().is_some()
    }

    /// An untyped nil expectation becomes a nil of the item type when that
    /// type has one. Resolved on every call, the same operator can face
    /// containers of different item types.
    fn expected_for(&self, item: &Type) -> Value {
        match (&self.expected, item.typed_nil()) {
            (Value::Nil, Some(typed)) => typed,
            _ => self.expected.clone(),
        }
    }

    fn does_not_contain(&self, ctx: &Context, got: &Value) -> Mismatch {
        ctx.collect_error(|r| {
            Error::new("does not contain")
                .with_got(r.value(got))
                .with_expected(self.describe(r))
        })
    }

    fn describe(&self, r: &Renderer) -> String {
        format!("Contains({})", r.value(&self.expected))
    }

    fn contains_text(&self, ctx: &Context, got: &Value) -> Option<CmpResult> {
        let needle = match self.expected.unwrap_dyn() {
            v @ (Value::Str(_) | Value::Char(_) | Value::Byte(_)) => v,
            _ => return None,
        };
        let Some(text) = got.string_form() else {
            return Some(Err(ctx.collect_error(|_| {
                Error::new("bad type")
                    .with_got(got.type_name())
                    .with_expected("string, error or record with a stringer")
            })));
        };
        let found = match needle {
            Value::Str(s) => text.contains(s.as_str()),
            Value::Char(c) => text.contains(*c),
            Value::Byte(b) => text.as_bytes().contains(b),
            _ => false,
        };
        Some(if found {
            Ok(())
        } else {
            Err(self.does_not_contain(ctx, &Value::Str(text)))
        })
    }
}

impl Matcher for Contains {
    fn name(&self) -> &'static str {
        "Contains"
    }

    fn matches(&self, ctx: &Context, got: &Value) -> CmpResult {
        match got {
            Value::Seq(seq) => {
                let expected = self.expected_for(&seq.elem);
                // order is unobservable, only existence matters
                if seq.items().iter().rev().any(|item| equal(ctx, item, &expected)) {
                    return Ok(());
                }
                return Err(self.does_not_contain(ctx, got));
            }
            Value::Map(map) => {
                let expected = self.expected_for(&map.value);
                if map.iter().any(|(_, item)| equal(ctx, item, &expected)) {
                    return Ok(());
                }
                return Err(self.does_not_contain(ctx, got));
            }
            Value::Str(s) if self.is_operator() => {
                if s.chars().any(|c| equal(ctx, &Value::Char(c), &self.expected)) {
                    return Ok(());
                }
                return Err(self.does_not_contain(ctx, got));
            }
            _ => {}
        }

        if !self.is_operator() {
            if let Some(res) = self.contains_text(ctx, got) {
                return res;
            }
        }

        Err(ctx.collect_error(|r| {
            let expected = match self.expected.ty() {
                Some(ty) if !self.is_operator() => ty.to_string(),
                _ => self.describe(r),
            };
            Error::new("cannot check contains")
                .with_got(got.type_name())
                .with_expected(expected)
        }))
    }

    fn render(&self) -> String {
        self.describe(&Renderer::default())
    }
}
