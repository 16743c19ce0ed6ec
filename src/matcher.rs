use std::fmt;
use std::sync::Arc;

use crate::context::Context;
use crate::report::{CmpResult, Location, Mismatch};
use crate::types::Type;
use crate::value::Value;

/// Custom comparison logic that can stand in for a value anywhere inside an
/// expected structure.
///
/// Implementations hold only configuration captured at construction and can
/// be shared between comparisons and threads.
pub trait Matcher: Send + Sync {
    /// Short operator name used in locations, e.g. `Contains`.
    fn name(&self) -> &'static str;

    /// Checks `got`. Dynamic wrapping has already been removed.
    fn matches(&self, ctx: &Context, got: &Value) -> CmpResult;

    /// Human readable description, e.g. `Any(5, 6, 7)`.
    fn render(&self) -> String;

    /// Concrete type this matcher would accept, when there is one.
    fn type_behind(&self) -> Option<Type> {
        None
    }
}

/// Handle to a [`Matcher`], tagged with the place it was built.
#[derive(Clone)]
pub struct Operator {
    matcher: Arc<dyn Matcher>,
    location: Option<Location>,
}

impl Operator {
    /// Wraps `matcher`, recording the caller's source location.
    #[track_caller]
    pub fn new(matcher: impl Matcher + 'static) -> Self {
        let location = Location::caller(matcher.name());
        Self { matcher: Arc::new(matcher), location: Some(location) }
    }

    /// Replaces the recorded location, e.g. with a position inside an
    /// expression.
    pub fn with_location(mut self, location: Option<Location>) -> Self {
        self.location = location;
        self
    }

    pub fn name(&self) -> &'static str {
        self.matcher.name()
    }

    pub fn location(&self) -> Option<&Location> {
        self.location.as_ref()
    }

    /// Runs the matcher. Errors of the chain without a location get this
    /// operator's, so the innermost operator involved is the one reported.
    pub fn matches(&self, ctx: &Context, got: &Value) -> CmpResult {
        tracing::trace!(operator = self.name(), depth = ctx.depth(), "delegating to operator");
        self.matcher.matches(ctx, got).map_err(|mut mismatch| {
            if let (Mismatch::Report(err), Some(loc)) = (&mut mismatch, &self.location) {
                let mut cur = Some(&mut **err);
                while let Some(e) = cur {
                    if e.location.is_none() {
                        e.location = Some(loc.clone());
                    }
                    cur = e.origin.as_deref_mut();
                }
            }
            mismatch
        })
    }

    pub fn render(&self) -> String {
        self.matcher.render()
    }

    pub fn type_behind(&self) -> Option<Type> {
        self.matcher.type_behind()
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl fmt::Debug for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operator")
            .field("matcher", &self.render())
            .field("location", &self.location)
            .finish()
    }
}
