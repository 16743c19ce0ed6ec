//! Deep structural comparison of dynamic values, with operators that can
//! stand in for any part of the expected value.
//!
//! ```
//! use deep_match::operators::{any, contains};
//! use deep_match::{from_json, match_deeply, Type, Value};
//!
//! let got = from_json(r#"{"id": 7, "tags": ["a", "b"]}"#).unwrap();
//! let expected = Value::map(
//!     Type::Str,
//!     Type::Any,
//!     [("id", Value::from(any([6i64, 7]))), ("tags", contains("b").into())],
//! );
//! assert!(match_deeply(&got, &expected).is_ok());
//! ```

pub mod errors;
pub mod types;
pub mod value;
pub mod render;
pub mod report;
pub mod config;
pub mod context;
pub mod matcher;
pub mod comparison;
pub mod operators;
pub mod engine;
pub mod expression;
pub mod functions;  // operator builders for expressions
mod parser;

pub use comparison::{compare, equal};
pub use config::Config;
pub use context::{Context, Mode, PathSegment};
pub use engine::{eq_deeply, eq_deeply_with, from_json, match_deeply, match_deeply_with};
pub use errors::{ParseError, Result, UsageError};
pub use expression::{compile, Compiler};
pub use functions::{Builder, Registry};
pub use matcher::{Matcher, Operator};
pub use render::Renderer;
pub use report::{CmpResult, Error, Location, Mismatch};
pub use types::{FieldDef, RecordType, Type};
pub use value::{FromValue, Key, Value};
