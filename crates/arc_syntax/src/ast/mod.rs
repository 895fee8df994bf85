pub mod decl;
pub mod expr;
pub mod flow;
pub mod stmt;

// 重新导出核心类型，方便外部直接使用 arc_syntax::ast::Expr 等
pub use decl::{FunctionDecl, ParamDecl, SequenceDecl, StageDecl};
pub use expr::{BinaryOp, Expr, ExprKind, Literal, UnaryOp};
pub use flow::{
    ConfigValues, FlowItem, FlowNode, FlowNodeKind, FlowOperator, FlowStatement, NamedValue,
    RoutingEntry, RoutingTable,
};
pub use stmt::{Block, Stmt};

use arc_diagnostics::Span;
use serde::{Deserialize, Serialize};

/// AST 节点标识，由解析器分配，在一棵树内唯一
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

/// 指向 AST 中某个节点的句柄，符号通过它映射回源码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AstRef {
    pub node: NodeId,
    pub span: Span,
}

impl AstRef {
    pub fn new(node: NodeId, span: Span) -> Self {
        Self { node, span }
    }
}

// 整个程序的数据结构
// 顶层条目按源码顺序排列
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Item {
    Function(FunctionDecl),
    Sequence(SequenceDecl),
    Flow(FlowStatement),
}

impl Item {
    pub fn span(&self) -> Span {
        match self {
            Item::Function(f) => f.span,
            Item::Sequence(s) => s.span,
            Item::Flow(flow) => flow.span,
        }
    }
}
