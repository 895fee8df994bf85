//! Arc Syntax
//!
//! Arc 语言的语法树与类型模型。源码由外部解析器转换为 [`ast::Program`]，
//! 本 crate 只定义语法树的形状，供语义分析与图构建使用。

pub mod ast;
pub mod build;
pub mod types;

pub use types::{FunctionType, Param, Params, Type, DEFAULT_INPUT_PARAM, DEFAULT_OUTPUT_PARAM};
