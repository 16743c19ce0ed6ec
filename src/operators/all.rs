use crate::comparison::compare;
use crate::context::Context;
use crate::matcher::Matcher;
use crate::render::Renderer;
use crate::report::{CmpResult, Error, Mismatch};
use crate::value::Value;

/// Conjunction: every item must match. A failing item is reported with the
/// nested error as origin.
pub struct All {
    items: Vec<Value>,
}

impl All {
    pub fn new(items: Vec<Value>) -> Self {
        Self { items }
    }
}

impl Matcher for All {
    fn name(&self) -> &'static str {
        "All"
    }

    fn matches(&self, ctx: &Context, got: &Value) -> CmpResult {
        let total = self.items.len();
        for (idx, item) in self.items.iter().enumerate() {
            match compare(ctx, got, item) {
                Ok(()) => {}
                Err(Mismatch::Boolean) => return Err(Mismatch::Boolean),
                Err(Mismatch::Report(origin)) => {
                    return Err(ctx.collect_error(|r| {
                        Error::new(format!("compared (part {} of {total})", idx + 1))
                            .with_got(r.value(got))
                            .with_expected(r.value(item))
                            .with_origin(*origin)
                    }))
                }
            }
        }
        Ok(())
    }

    fn render(&self) -> String {
        format!("All({})", Renderer::default().list(&self.items))
    }
}
