//! Built-in operators.
//!
//! Every constructor is `#[track_caller]`: the returned [`Operator`] points
//! at the line that built it, which is what error reports show.

mod all;
mod any;
mod code;
mod contains;
mod isa;
mod nil;
mod ptr;
mod zero;

pub use self::all::All;
pub use self::any::Any;
pub use self::code::{Code, Verdict};
pub use self::contains::Contains;
pub use self::isa::{ExpectedType, Isa};
pub use self::nil::{Nil, NotNil};
pub use self::ptr::Ptr;
pub use self::zero::{NotZero, Zero};

use crate::matcher::Operator;
use crate::types::Type;
use crate::value::{FromValue, Value};

/// Matches when `got` matches at least one of `items`.
#[track_caller]
pub fn any<I>(items: I) -> Operator
where
    I: IntoIterator,
    I::Item: Into<Value>,
{
    Operator::new(Any::new(items.into_iter().map(Into::into).collect()))
}

/// Matches when `got` matches every one of `items`.
#[track_caller]
pub fn all<I>(items: I) -> Operator
where
    I: IntoIterator,
    I::Item: Into<Value>,
{
    Operator::new(All::new(items.into_iter().map(Into::into).collect()))
}

/// Matches sequences and maps holding a matching item, and strings holding
/// a sub-string, char or byte.
#[track_caller]
pub fn contains(expected: impl Into<Value>) -> Operator {
    Operator::new(Contains::new(expected.into()))
}

/// Matches when `f` accepts `got`.
///
/// ```
/// use deep_match::{match_deeply, operators::code, Value};
///
/// let even = code(|n: i64| n % 2 == 0);
/// assert!(match_deeply(&Value::Int(4), &even.into()).is_ok());
/// ```
#[track_caller]
pub fn code<T, R, F>(f: F) -> Operator
where
    T: FromValue + 'static,
    R: Verdict + 'static,
    F: Fn(T) -> R + Send + Sync + 'static,
{
    Operator::new(Code::new(f))
}

#[track_caller]
pub fn nil() -> Operator {
    Operator::new(Nil)
}

#[track_caller]
pub fn not_nil() -> Operator {
    Operator::new(NotNil)
}

/// Matches the zero value of `got`'s own type.
#[track_caller]
pub fn zero() -> Operator {
    Operator::new(Zero)
}

#[track_caller]
pub fn not_zero() -> Operator {
    Operator::new(NotZero)
}

/// Matches a non-nil pointer whose target matches `expected`.
#[track_caller]
pub fn ptr(expected: impl Into<Value>) -> Operator {
    Operator::new(Ptr::new(expected.into()))
}

/// Matches values of type `ty`. A pointer type also accepts nil pointers.
#[track_caller]
pub fn isa(ty: Type) -> Operator {
    Operator::new(Isa::new(ty))
}
