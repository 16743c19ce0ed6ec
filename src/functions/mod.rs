use std::collections::HashMap;
use std::ops::RangeInclusive;
use std::sync::Arc;

use crate::errors::{Result, UsageError};
use crate::matcher::Operator;
use crate::value::Value;

/// Builds an operator from the arguments of an expression call.
pub trait Builder: Send + Sync {
    fn name(&self) -> &'static str;
    fn arity(&self) -> RangeInclusive<usize>;
    fn build(&self, args: Vec<Value>) -> Result<Operator>;
}

/// Thread-safe operator registry.
#[derive(Clone, Default)]
pub struct Registry {
    inner: Arc<HashMap<&'static str, Arc<dyn Builder>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let mut map: HashMap<&'static str, Arc<dyn Builder>> = HashMap::new();
        map.insert("any", Arc::new(builtins::Any));
        map.insert("all", Arc::new(builtins::All));
        map.insert("contains", Arc::new(builtins::Contains));
        map.insert("nil", Arc::new(builtins::Nil));
        map.insert("not_nil", Arc::new(builtins::NotNil));
        map.insert("zero", Arc::new(builtins::Zero));
        map.insert("not_zero", Arc::new(builtins::NotZero));
        map.insert("isa", Arc::new(builtins::Isa));
        Self { inner: Arc::new(map) }
    }

    pub fn register<B: Builder + 'static>(&mut self, b: B) {
        let mut_map = Arc::make_mut(&mut self.inner);
        mut_map.insert(b.name(), Arc::new(b));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Builder>> {
        self.inner.get(name).cloned()
    }

    /// Looks `name` up, checks the argument count, then builds.
    pub fn build(&self, name: &str, args: Vec<Value>) -> Result<Operator> {
        let builder = self
            .get(name)
            .ok_or_else(|| UsageError::UnknownOperator(name.to_string()))?;
        let arity = builder.arity();
        if !arity.contains(&args.len()) {
            return Err(UsageError::Arity {
                name: name.to_string(),
                expected: describe_arity(&arity),
                got: args.len(),
            });
        }
        builder.build(args)
    }
}

fn describe_arity(arity: &RangeInclusive<usize>) -> String {
    match (*arity.start(), *arity.end()) {
        (start, usize::MAX) => format!("at least {start}"),
        (start, end) if start == end => start.to_string(),
        (start, end) => format!("{start} to {end}"),
    }
}

pub mod builtins {
    use super::*;
    use crate::operators;
    use crate::types::Type;

    pub struct Any;
    impl Builder for Any {
        fn name(&self) -> &'static str { "any" }
        fn arity(&self) -> RangeInclusive<usize> { 1..=usize::MAX }
        fn build(&self, args: Vec<Value>) -> Result<Operator> {
            Ok(operators::any(args))
        }
    }

    pub struct All;
    impl Builder for All {
        fn name(&self) -> &'static str { "all" }
        fn arity(&self) -> RangeInclusive<usize> { 1..=usize::MAX }
        fn build(&self, args: Vec<Value>) -> Result<Operator> {
            Ok(operators::all(args))
        }
    }

    pub struct Contains;
    impl Builder for Contains {
        fn name(&self) -> &'static str { "contains" }
        fn arity(&self) -> RangeInclusive<usize> { 1..=1 }
        fn build(&self, args: Vec<Value>) -> Result<Operator> {
            let expected = args.into_iter().next().unwrap_or(Value::Nil);
            Ok(operators::contains(expected))
        }
    }

    pub struct Nil;
    impl Builder for Nil {
        fn name(&self) -> &'static str { "nil" }
        fn arity(&self) -> RangeInclusive<usize> { 0..=0 }
        fn build(&self, _: Vec<Value>) -> Result<Operator> {
            Ok(operators::nil())
        }
    }

    pub struct NotNil;
    impl Builder for NotNil {
        fn name(&self) -> &'static str { "not_nil" }
        fn arity(&self) -> RangeInclusive<usize> { 0..=0 }
        fn build(&self, _: Vec<Value>) -> Result<Operator> {
            Ok(operators::not_nil())
        }
    }

    pub struct Zero;
    impl Builder for Zero {
        fn name(&self) -> &'static str { "zero" }
        fn arity(&self) -> RangeInclusive<usize> { 0..=0 }
        fn build(&self, _: Vec<Value>) -> Result<Operator> {
            Ok(operators::zero())
        }
    }

    pub struct NotZero;
    impl Builder for NotZero {
        fn name(&self) -> &'static str { "not_zero" }
        fn arity(&self) -> RangeInclusive<usize> { 0..=0 }
        fn build(&self, _: Vec<Value>) -> Result<Operator> {
            Ok(operators::not_zero())
        }
    }

    /// `isa("[]int")`: the argument is a type name.
    pub struct Isa;
    impl Builder for Isa {
        fn name(&self) -> &'static str { "isa" }
        fn arity(&self) -> RangeInclusive<usize> { 1..=1 }
        fn build(&self, args: Vec<Value>) -> Result<Operator> {
            match args.first().map(Value::unwrap_dyn) {
                Some(Value::Str(name)) => Ok(operators::isa(name.parse::<Type>()?)),
                other => Err(UsageError::BadArgument {
                    name: "isa".to_string(),
                    message: format!(
                        "expected a type name, got {}",
                        other.map_or_else(|| "nothing".to_string(), Value::type_name)
                    ),
                }),
            }
        }
    }
}
