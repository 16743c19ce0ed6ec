// src/expression.rs
//! Expected values written as text.
//!
//! ```text
//! expr   := call | array | object | string | number | true | false | null
//! call   := ident '(' [expr (',' expr)*] ')'
//! array  := '[' [expr (',' expr)*] ']'
//! object := '{' [string ':' expr (',' string ':' expr)*] '}'
//! ```
//!
//! Arrays compile to `[]any` and objects to `map[string]any`, the shapes
//! [`from_json`](crate::engine::from_json) produces, so JSON documents can
//! be matched against compiled expressions.

use std::collections::BTreeMap;

use tracing::trace;

use crate::errors::{ParseError, Result};
use crate::functions::Registry;
use crate::parser::Parser;
use crate::report::Location;
use crate::types::Type;
use crate::value::{Key, Map, Value};

#[derive(Debug, Clone)]
pub enum ENode {
    Call {
        name: String,
        args: Vec<ENode>,
        offset: usize,
    },
    Array(Vec<ENode>),
    Object(Vec<(String, ENode)>),
    Str(String),
    Number(Value),
    Bool(bool),
    Null,
}

pub fn parse_expr(input: &str) -> std::result::Result<ENode, ParseError> {
    let mut p = EParser::new(input);
    let node = p.parse_node()?;
    p.parser.skip_ws();
    if !p.parser.eof() {
        return Err(p.parser.error("trailing input"));
    }
    Ok(node)
}

struct EParser<'a> {
    parser: Parser<'a>,
}

impl<'a> EParser<'a> {
    fn new(s: &'a str) -> Self {
        Self {
            parser: Parser::new(s),
        }
    }

    fn parse_node(&mut self) -> std::result::Result<ENode, ParseError> {
        self.parser.skip_ws();
        match self.parser.peek_char() {
            Some('"' | '\'') => return Ok(ENode::Str(self.parser.parse_quoted_string()?)),
            Some('[') => {
                self.parser.expect('[')?;
                return Ok(ENode::Array(self.parse_list(']')?));
            }
            Some('{') => return self.parse_object(),
            Some(c) if c == '-' || c.is_ascii_digit() => {
                return Ok(ENode::Number(self.parser.parse_number_literal()?));
            }
            None => return Err(self.parser.error("expression expected")),
            _ => {}
        }

        let offset = self.parser.offset();
        let name = self.parser.parse_identifier()?;
        self.parser.skip_ws();
        if !self.parser.consume_char('(') {
            return match name.as_str() {
                "true" => Ok(ENode::Bool(true)),
                "false" => Ok(ENode::Bool(false)),
                "null" => Ok(ENode::Null),
                _ => Err(ParseError::new(offset, format!("expected '(' after `{name}`"))),
            };
        }
        let args = self.parse_list(')')?;
        Ok(ENode::Call { name, args, offset })
    }

    /// Comma separated nodes up to `close`, the opening char being consumed.
    fn parse_list(&mut self, close: char) -> std::result::Result<Vec<ENode>, ParseError> {
        let mut out = Vec::new();
        self.parser.skip_ws();
        if self.parser.consume_char(close) {
            return Ok(out);
        }
        loop {
            out.push(self.parse_node()?);
            self.parser.skip_ws();
            if self.parser.consume_char(',') {
                continue;
            }
            self.parser.expect(close)?;
            return Ok(out);
        }
    }

    fn parse_object(&mut self) -> std::result::Result<ENode, ParseError> {
        self.parser.expect('{')?;
        let mut out: Vec<(String, ENode)> = Vec::new();
        self.parser.skip_ws();
        if self.parser.consume_char('}') {
            return Ok(ENode::Object(out));
        }
        loop {
            self.parser.skip_ws();
            let offset = self.parser.offset();
            let key = self.parser.parse_quoted_string()?;
            if out.iter().any(|(k, _)| *k == key) {
                return Err(ParseError::new(offset, format!("duplicate key {key:?}")));
            }
            self.parser.skip_ws();
            self.parser.expect(':')?;
            let value = self.parse_node()?;
            out.push((key, value));
            self.parser.skip_ws();
            if self.parser.consume_char(',') {
                continue;
            }
            self.parser.expect('}')?;
            return Ok(ENode::Object(out));
        }
    }
}

/// Turns expressions into expected [`Value`]s, resolving calls through a
/// [`Registry`].
#[derive(Clone)]
pub struct Compiler {
    registry: Registry,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new(Registry::with_builtins())
    }
}

impl Compiler {
    pub fn new(registry: Registry) -> Self {
        Self { registry }
    }

    pub fn compile(&self, expr: &str) -> Result<Value> {
        let ast = parse_expr(expr)?;
        self.eval_ast(&ast)
    }

    /// Evaluate AST node → Value
    pub fn eval_ast(&self, node: &ENode) -> Result<Value> {
        Ok(match node {
            ENode::Null => Value::Nil,
            ENode::Bool(b) => Value::Bool(*b),
            ENode::Str(s) => Value::Str(s.clone()),
            ENode::Number(n) => n.clone(),
            ENode::Array(items) => {
                let items = items.iter().map(|n| self.eval_ast(n)).collect::<Result<Vec<_>>>()?;
                Value::list(items)
            }
            ENode::Object(fields) => {
                let mut entries = BTreeMap::new();
                for (key, node) in fields {
                    entries.insert(Key::Str(key.clone()), Value::dynamic(self.eval_ast(node)?));
                }
                Value::Map(Map::new(Type::Str, Type::Any, entries))
            }
            ENode::Call { name, args, offset } => {
                let args = args.iter().map(|n| self.eval_ast(n)).collect::<Result<Vec<_>>>()?;
                let op = self.registry.build(name, args)?;
                trace!(operator = op.name(), offset, "compiled operator call");
                let location = Location::in_expression(*offset, op.name());
                Value::Operator(op.with_location(Some(location)))
            }
        })
    }
}

/// Compiles `expr` with the built-in operators.
pub fn compile(expr: &str) -> Result<Value> {
    Compiler::default().compile(expr)
}
