//! Symbol Definitions
//!
//! 符号是作用域树中每个节点携带的数据。所有种类共用同一个扁平结构，
//! 由 `kind` 标签区分语义角色，`ty` 描述其类型。

use arc_syntax::ast::{AstRef, Literal};
use arc_syntax::types::{FunctionType, Type};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// 符号种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Variable,
    StatefulVariable,
    Channel,
    Function,
    Block,
    Config,
    Input,
    Output,
    Sequence,
    Stage,
    Constant,
    GlobalConstant,
}

impl SymbolKind {
    /// 是否在添加时分配局部 ID
    pub fn is_id_bearing(self) -> bool {
        matches!(
            self,
            SymbolKind::Variable
                | SymbolKind::StatefulVariable
                | SymbolKind::Input
                | SymbolKind::Output
                | SymbolKind::Config
                | SymbolKind::Channel
        )
    }

    /// 是否拥有独立的 ID 计数器
    pub fn owns_counter(self) -> bool {
        matches!(self, SymbolKind::Function | SymbolKind::Sequence)
    }

    pub fn name(self) -> &'static str {
        match self {
            SymbolKind::Variable => "variable",
            SymbolKind::StatefulVariable => "stateful variable",
            SymbolKind::Channel => "channel",
            SymbolKind::Function => "function",
            SymbolKind::Block => "block",
            SymbolKind::Config => "config",
            SymbolKind::Input => "input",
            SymbolKind::Output => "output",
            SymbolKind::Sequence => "sequence",
            SymbolKind::Stage => "stage",
            SymbolKind::Constant => "constant",
            SymbolKind::GlobalConstant => "global constant",
        }
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 符号
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    #[serde(rename = "type")]
    pub ty: Type,
    /// 源码位置；来自全局解析器的符号为 None
    #[serde(default)]
    pub ast: Option<AstRef>,
    /// 在所属 ID 计数作用域内唯一
    pub id: Option<u32>,
    pub default_value: Option<Literal>,
    /// 别名指向的原始通道/配置 ID
    pub source_id: Option<u32>,
}

impl Symbol {
    pub fn new(name: impl Into<String>, kind: SymbolKind, ty: Type) -> Self {
        Self {
            name: name.into(),
            kind,
            ty,
            ast: None,
            id: None,
            default_value: None,
            source_id: None,
        }
    }

    /// 全局通道（例如通道注册表中的条目），`elem` 为元素类型
    pub fn channel(name: impl Into<String>, id: u32, elem: Type) -> Self {
        Self::new(name, SymbolKind::Channel, Type::chan(elem)).with_id(id)
    }

    /// 全局函数（例如标准库提供的节点类型）
    pub fn function(name: impl Into<String>, sig: FunctionType) -> Self {
        Self::new(name, SymbolKind::Function, Type::function(sig))
    }

    pub fn with_ast(mut self, ast: AstRef) -> Self {
        self.ast = Some(ast);
        self
    }

    pub fn with_id(mut self, id: u32) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_default(mut self, value: Literal) -> Self {
        self.default_value = Some(value);
        self
    }

    pub fn with_source_id(mut self, source_id: u32) -> Self {
        self.source_id = Some(source_id);
        self
    }

    /// 来自全局解析器（允许被局部声明遮蔽）
    pub fn is_global(&self) -> bool {
        self.ast.is_none()
    }

    /// 通道符号，或类型为 `chan T` 的变量
    pub fn is_channel(&self) -> bool {
        self.kind == SymbolKind::Channel || self.ty.is_chan()
    }

    /// 通道读写集合中使用的 ID，别名优先使用原始 ID
    pub fn channel_id(&self) -> Option<u32> {
        self.source_id.or(self.id)
    }
}

/// 通道读写集合 (ID -> 名称)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channels {
    pub read: BTreeMap<u32, String>,
    pub write: BTreeMap<u32, String>,
}

impl Channels {
    pub fn new() -> Self {
        Self::default()
    }

    /// 同一 ID 保留首次记录的名称
    pub fn add_read(&mut self, id: u32, name: impl Into<String>) {
        self.read.entry(id).or_insert_with(|| name.into());
    }

    pub fn add_write(&mut self, id: u32, name: impl Into<String>) {
        self.write.entry(id).or_insert_with(|| name.into());
    }

    pub fn merge(&mut self, other: &Channels) {
        for (id, name) in &other.read {
            self.add_read(*id, name.clone());
        }
        for (id, name) in &other.write {
            self.add_write(*id, name.clone());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.read.is_empty() && self.write.is_empty()
    }
}
