//! Arc IR
//!
//! 分析结果的图结构：节点、边、函数、序列与执行层级。
//!
//! # 不变量
//!
//! - 每条边的两端都引用同一 IR 中存在的节点键
//! - 同一输入端口至多有一条持续边（在构建时检查）
//! - 节点键按 `类型_序号` 确定性生成

pub mod edge;
pub mod error;
pub mod function;
pub mod ir;
pub mod key;
pub mod node;
pub mod sequence;
pub mod strata;
pub mod value;

pub use edge::{Edge, EdgeKind, Handle};
pub use error::{IrError, IrResult};
pub use function::{Body, Function};
pub use ir::IR;
pub use key::KeyGenerator;
pub use node::{kind, Node, ACTIVATE_PARAM};
pub use sequence::{Sequence, Sequences, Stage};
pub use strata::Strata;
pub use value::Value;

pub use arc_syntax::types::{DEFAULT_INPUT_PARAM, DEFAULT_OUTPUT_PARAM};
