//! Config Values
//!
//! 节点配置中的常量值。序列化为外部标记形式，例如 `{"int": 10}`、`{"channel": 1}`。

use arc_syntax::ast::Literal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
    /// 通道 ID
    Channel(u32),
}

impl Value {
    pub fn as_channel(&self) -> Option<u32> {
        match self {
            Value::Channel(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<Literal> for Value {
    fn from(lit: Literal) -> Self {
        match lit {
            Literal::Int(v) => Value::Int(v),
            Literal::Float(v) => Value::Float(v),
            Literal::Str(s) => Value::Str(s),
        }
    }
}

impl From<&Literal> for Value {
    fn from(lit: &Literal) -> Self {
        Value::from(lit.clone())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Str(s) => write!(f, "\"{}\"", s),
            Value::Channel(id) => write!(f, "chan#{}", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_literal() {
        assert_eq!(Value::from(Literal::Int(3)), Value::Int(3));
        assert_eq!(Value::from(&Literal::Str("a".into())), Value::Str("a".into()));
    }

    #[test]
    fn test_tagged_json() {
        let json = serde_json::to_string(&Value::Channel(7)).unwrap();
        assert_eq!(json, r#"{"channel":7}"#);
        let back: Value = serde_json::from_str(r#"{"float":1.5}"#).unwrap();
        assert_eq!(back, Value::Float(1.5));
    }
}
