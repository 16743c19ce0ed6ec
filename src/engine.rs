use serde_json::Value as Json;
use tracing::debug;

use crate::comparison::compare;
use crate::config::Config;
use crate::context::Context;
use crate::errors::Result;
use crate::report::{Error, Mismatch};
use crate::types::Type;
use crate::value::{Key, Map, Value};

/// =========================
/// Public API (Comparison)
/// =========================

/// Deeply compares `got` with `expected`, reporting the first difference.
pub fn match_deeply(got: &Value, expected: &Value) -> std::result::Result<(), Error> {
    match_deeply_with(&Config::default(), got, expected)
}

pub fn match_deeply_with(
    config: &Config,
    got: &Value,
    expected: &Value,
) -> std::result::Result<(), Error> {
    let ctx = Context::new(config);
    match compare(&ctx, got, expected) {
        Ok(()) => Ok(()),
        Err(Mismatch::Report(err)) => {
            debug!(path = %err.path, message = %err.message, "deep comparison failed");
            Err(*err)
        }
        // a diagnostic context never yields a bare boolean failure, unless a
        // custom matcher returns one itself
        Err(Mismatch::Boolean) => {
            debug!("deep comparison failed without a report");
            Err(Error {
                path: config.root_name.clone(),
                ..Error::new("values differ")
            })
        }
    }
}

/// Same decision as [`match_deeply`], without building any diagnostic.
pub fn eq_deeply(got: &Value, expected: &Value) -> bool {
    eq_deeply_with(&Config::default(), got, expected)
}

pub fn eq_deeply_with(config: &Config, got: &Value, expected: &Value) -> bool {
    compare(&Context::boolean(config), got, expected).is_ok()
}

/// =========================
/// Public API (JSON input)
/// =========================

/// Parses a JSON document into a [`Value`].
pub fn from_json(json_str: &str) -> Result<Value> {
    let data: Json = serde_json::from_str(json_str)?;
    Ok(Value::from(data))
}

impl From<Json> for Value {
    /// Arrays become `[]any`, objects `map[string]any`.
    fn from(json: Json) -> Self {
        match json {
            Json::Null => Value::Nil,
            Json::Bool(b) => Value::Bool(b),
            Json::Number(n) => match (n.as_i64(), n.as_u64()) {
                (Some(i), _) => Value::Int(i),
                (None, Some(u)) => Value::Uint(u),
                _ => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Json::String(s) => Value::Str(s),
            Json::Array(items) => Value::list(items.into_iter().map(Value::from)),
            Json::Object(fields) => {
                let entries = fields
                    .into_iter()
                    .map(|(k, v)| (Key::Str(k), Value::dynamic(Value::from(v))))
                    .collect();
                Value::Map(Map::new(Type::Str, Type::Any, entries))
            }
        }
    }
}
