//! Arc 类型系统
//!
//! 数值、字符串、时间类型，以及 `chan T` / `series T` 容器和函数签名。
//! 分析阶段只需要类型的"形状"（例如是否是通道），不做类型推导。

use crate::ast::Literal;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// 未声明输入名时使用的默认输入句柄
pub const DEFAULT_INPUT_PARAM: &str = "input";
/// 未声明输出名时使用的默认输出句柄
pub const DEFAULT_OUTPUT_PARAM: &str = "output";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Type {
    // --- 数值类型 ---
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,

    // --- 字符串与时间 ---
    #[serde(rename = "str")]
    String,
    TimeStamp,
    TimeSpan,

    // --- 容器类型 ---
    // 通道: chan f32
    Chan(Box<Type>),
    // 序列: series f64
    Series(Box<Type>),

    // 函数签名 (函数符号的类型)
    Function(Box<FunctionType>),

    // 错误占位符 (无法确定类型时使用，防止后续分析崩溃)
    Invalid,
}

impl Type {
    pub fn chan(elem: Type) -> Self {
        Type::Chan(Box::new(elem))
    }

    pub fn series(elem: Type) -> Self {
        Type::Series(Box::new(elem))
    }

    pub fn function(sig: FunctionType) -> Self {
        Type::Function(Box::new(sig))
    }

    /// 取出 chan/series 的元素类型，其他类型原样返回
    pub fn elem(&self) -> Type {
        match self {
            Type::Chan(elem) | Type::Series(elem) => (**elem).clone(),
            other => other.clone(),
        }
    }

    pub fn is_chan(&self) -> bool {
        matches!(self, Type::Chan(_))
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            Type::U8
                | Type::U16
                | Type::U32
                | Type::U64
                | Type::I8
                | Type::I16
                | Type::I32
                | Type::I64
        )
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Type::F32 | Type::F64)
    }

    pub fn is_numeric(&self) -> bool {
        self.is_integer() || self.is_float()
    }

    pub fn is_valid(&self) -> bool {
        !matches!(self, Type::Invalid)
    }

    /// 函数签名（仅当类型是函数时）
    pub fn as_function(&self) -> Option<&FunctionType> {
        match self {
            Type::Function(sig) => Some(sig),
            _ => None,
        }
    }

    /// 按源码拼写解析基础类型，例如 "f32"、"chan u8"
    pub fn parse(text: &str) -> Option<Type> {
        let text = text.trim();
        if let Some(rest) = text.strip_prefix("chan ") {
            return Type::parse(rest).map(Type::chan);
        }
        if let Some(rest) = text.strip_prefix("series ") {
            return Type::parse(rest).map(Type::series);
        }
        let ty = match text {
            "u8" => Type::U8,
            "u16" => Type::U16,
            "u32" => Type::U32,
            "u64" => Type::U64,
            "i8" => Type::I8,
            "i16" => Type::I16,
            "i32" => Type::I32,
            "i64" => Type::I64,
            "f32" => Type::F32,
            "f64" => Type::F64,
            "str" => Type::String,
            "timestamp" => Type::TimeStamp,
            "timespan" => Type::TimeSpan,
            _ => return None,
        };
        Some(ty)
    }
}

impl Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::U8 => write!(f, "u8"),
            Type::U16 => write!(f, "u16"),
            Type::U32 => write!(f, "u32"),
            Type::U64 => write!(f, "u64"),
            Type::I8 => write!(f, "i8"),
            Type::I16 => write!(f, "i16"),
            Type::I32 => write!(f, "i32"),
            Type::I64 => write!(f, "i64"),
            Type::F32 => write!(f, "f32"),
            Type::F64 => write!(f, "f64"),
            Type::String => write!(f, "str"),
            Type::TimeStamp => write!(f, "timestamp"),
            Type::TimeSpan => write!(f, "timespan"),
            Type::Chan(elem) => write!(f, "chan {}", elem),
            Type::Series(elem) => write!(f, "series {}", elem),
            Type::Function(sig) => write!(f, "{}", sig),
            Type::Invalid => write!(f, "invalid"),
        }
    }
}

/// 单个参数：名称、类型、可选默认值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: Type,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Literal>,
}

impl Param {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
            value: None,
        }
    }

    pub fn with_default(mut self, value: Literal) -> Self {
        self.value = Some(value);
        self
    }
}

/// 有序参数列表
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Params(Vec<Param>);

impl Params {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, param: Param) {
        self.0.push(param);
    }

    pub fn get(&self, name: &str) -> Option<&Param> {
        self.0.iter().find(|p| p.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// 第一个参数的名称（默认句柄）
    pub fn first_name(&self) -> Option<&str> {
        self.0.first().map(|p| p.name.as_str())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Param> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Param> for Params {
    fn from_iter<I: IntoIterator<Item = Param>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Params {
    type Item = &'a Param;
    type IntoIter = std::slice::Iter<'a, Param>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// 函数签名
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionType {
    #[serde(default)]
    pub config: Params,
    #[serde(default)]
    pub inputs: Params,
    #[serde(default)]
    pub outputs: Params,
}

impl Display for FunctionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |params: &Params| {
            params
                .iter()
                .map(|p| format!("{} {}", p.name, p.ty))
                .collect::<Vec<_>>()
                .join(", ")
        };
        write!(f, "func")?;
        if !self.config.is_empty() {
            write!(f, "{{{}}}", join(&self.config))?;
        }
        write!(f, "({})", join(&self.inputs))?;
        match self.outputs.len() {
            0 => Ok(()),
            1 => match self.outputs.iter().next() {
                Some(out) => write!(f, " {}", out.ty),
                None => Ok(()),
            },
            _ => write!(f, " ({})", join(&self.outputs)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Type::F32.to_string(), "f32");
        assert_eq!(Type::String.to_string(), "str");
        assert_eq!(Type::chan(Type::F32).to_string(), "chan f32");
        assert_eq!(Type::series(Type::I64).to_string(), "series i64");
    }

    #[test]
    fn test_unwrap() {
        assert_eq!(Type::chan(Type::U8).elem(), Type::U8);
        assert_eq!(Type::series(Type::F64).elem(), Type::F64);
        assert_eq!(Type::I32.elem(), Type::I32);
    }

    #[test]
    fn test_parse() {
        assert_eq!(Type::parse("chan f32"), Some(Type::chan(Type::F32)));
        assert_eq!(Type::parse("timespan"), Some(Type::TimeSpan));
        assert_eq!(Type::parse("bogus"), None);
    }

    #[test]
    fn test_function_signature_display() {
        let sig = FunctionType {
            config: [Param::new("threshold", Type::F32)].into_iter().collect(),
            inputs: [Param::new("val", Type::F32)].into_iter().collect(),
            outputs: [Param::new("output", Type::F32)].into_iter().collect(),
        };
        assert_eq!(sig.to_string(), "func{threshold f32}(val f32) f32");
        assert_eq!(sig.inputs.first_name(), Some("val"));
    }

    #[test]
    fn test_numeric_predicates() {
        assert!(Type::U16.is_integer());
        assert!(Type::F64.is_float());
        assert!(!Type::String.is_numeric());
        assert!(Type::chan(Type::F32).is_chan());
    }
}
