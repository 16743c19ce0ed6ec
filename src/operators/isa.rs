use crate::context::Context;
use crate::matcher::Matcher;
use crate::report::{CmpResult, Error};
use crate::types::Type;
use crate::value::Value;

/// Type requirement shared by operators that only accept one concrete type.
#[derive(Clone, Debug)]
pub struct ExpectedType {
    pub ty: Type,
    /// When set, `got` must be a pointer to `ty`.
    pub is_ptr: bool,
}

impl ExpectedType {
    pub fn new(ty: Type) -> Self {
        Self { ty, is_ptr: false }
    }

    pub fn pointer_to(ty: Type) -> Self {
        Self { ty, is_ptr: true }
    }

    /// The full type `got` must have.
    pub fn expected(&self) -> Type {
        if self.is_ptr {
            Type::ptr(self.ty.clone())
        } else {
            self.ty.clone()
        }
    }

    pub fn check(&self, ctx: &Context, got: &Value) -> CmpResult {
        let expected = self.expected();
        if got.ty().as_ref() == Some(&expected) {
            return Ok(());
        }
        Err(ctx.collect_error(|_| {
            Error::new("type mismatch")
                .with_got(got.type_name())
                .with_expected(expected.to_string())
        }))
    }
}

/// Checks `got`'s type only.
pub struct Isa {
    expected: ExpectedType,
}

impl Isa {
    pub fn new(ty: Type) -> Self {
        Self { expected: ExpectedType::new(ty) }
    }
}

impl Matcher for Isa {
    fn name(&self) -> &'static str {
        "Isa"
    }

    fn matches(&self, ctx: &Context, got: &Value) -> CmpResult {
        self.expected.check(ctx, got)
    }

    fn render(&self) -> String {
        format!("Isa({})", self.expected.expected())
    }

    fn type_behind(&self) -> Option<Type> {
        Some(self.expected.expected())
    }
}
