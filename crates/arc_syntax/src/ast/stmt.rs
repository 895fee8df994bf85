use super::{Expr, NodeId};
use crate::types::Type;
use arc_diagnostics::Span;
use serde::{Deserialize, Serialize};

/// 语句块，每个块在分析时创建一个匿名 Block 作用域
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: NodeId,
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    // 变量声明: x := 1 或 x f32 := 1
    VarDecl {
        id: NodeId,
        name: String,
        ty: Option<Type>,
        value: Expr,
        span: Span,
    },

    // 有状态变量: count $= 0 (跨执行周期保持值)
    StatefulVarDecl {
        id: NodeId,
        name: String,
        ty: Option<Type>,
        value: Expr,
        span: Span,
    },

    // 赋值: x = x + 1，目标为通道时表示写入
    Assignment {
        target: String,
        value: Expr,
        span: Span,
    },

    // if / else if / else
    If {
        condition: Expr,
        then_block: Block,
        else_ifs: Vec<(Expr, Block)>,
        else_block: Option<Block>,
        span: Span,
    },

    Return {
        value: Option<Expr>,
        span: Span,
    },

    Expression(Expr),
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Stmt::VarDecl { span, .. }
            | Stmt::StatefulVarDecl { span, .. }
            | Stmt::Assignment { span, .. }
            | Stmt::If { span, .. }
            | Stmt::Return { span, .. } => *span,
            Stmt::Expression(expr) => expr.span,
        }
    }
}
