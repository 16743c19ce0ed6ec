use itertools::Itertools;

use crate::value::Value;

/// Turns values into the text shown in reports.
///
/// Carried by the [`Context`](crate::context::Context) and applied when an
/// error is built, so two comparisons with different settings never
/// interfere.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Renderer {
    /// Nesting level below which values are elided as `…`.
    pub max_depth: usize,
}

impl Default for Renderer {
    fn default() -> Self {
        Self { max_depth: 32 }
    }
}

impl Renderer {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    pub fn value(&self, v: &Value) -> String {
        let mut out = String::new();
        self.write(v, 0, &mut Vec::new(), &mut out);
        out
    }

    fn write(&self, v: &Value, depth: usize, stack: &mut Vec<usize>, out: &mut String) {
        if depth > self.max_depth {
            out.push('…');
            return;
        }
        match v {
            Value::Nil => out.push_str("nil"),
            Value::Bool(b) => out.push_str(&b.to_string()),
            Value::Int(i) => out.push_str(&i.to_string()),
            Value::Uint(u) => out.push_str(&u.to_string()),
            Value::Byte(b) => out.push_str(&format!("(byte) {b}")),
            Value::Float(f) => out.push_str(&format!("{f:?}")),
            Value::Char(c) => out.push_str(&format!("{c:?}")),
            Value::Str(s) => out.push_str(&format!("{s:?}")),
            Value::Error(msg) => out.push_str(&format!("error({msg:?})")),
            Value::Seq(s) => match &s.items {
                None => out.push_str(&format!("([]{})(nil)", s.elem)),
                Some(items) => {
                    out.push('[');
                    for (i, item) in items.iter().enumerate() {
                        if i > 0 {
                            out.push_str(", ");
                        }
                        self.write(item, depth + 1, stack, out);
                    }
                    out.push(']');
                }
            },
            Value::Map(m) => match &m.entries {
                None => out.push_str(&format!("(map[{}]{})(nil)", m.key, m.value)),
                Some(entries) => {
                    out.push('{');
                    for (i, (k, item)) in entries.iter().enumerate() {
                        if i > 0 {
                            out.push_str(", ");
                        }
                        out.push_str(&format!("{k}: "));
                        self.write(item, depth + 1, stack, out);
                    }
                    out.push('}');
                }
            },
            Value::Ptr(p) => match (p.identity(), p.deref()) {
                (Some(id), _) if stack.contains(&id) => out.push_str("&<cycle>"),
                (Some(id), Ok(target)) => {
                    out.push('&');
                    stack.push(id);
                    self.write(target, depth + 1, stack, out);
                    stack.pop();
                }
                _ => out.push_str(&format!("(*{})(nil)", p.elem)),
            },
            Value::Record(r) => {
                out.push_str(r.record_type().name());
                out.push_str(" { ");
                let fields = r.record_type().fields();
                for (i, (def, item)) in fields.iter().zip(r.values()).enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    out.push_str(&def.name);
                    out.push_str(": ");
                    self.write(item, depth + 1, stack, out);
                }
                out.push_str(" }");
            }
            Value::Dyn(inner) => self.write(inner, depth, stack, out),
            // ids only serve identity, they depend on creation order
            Value::Handle(h) if h.id().is_some() => out.push_str(&format!("({})(non-nil)", h.ty)),
            Value::Handle(h) => out.push_str(&format!("({})(nil)", h.ty)),
            Value::Operator(op) => out.push_str(&op.render()),
        }
    }

    /// Comma separated rendering of a list, as used by operators.
    pub fn list(&self, items: &[Value]) -> String {
        items.iter().map(|v| self.value(v)).join(", ")
    }
}
