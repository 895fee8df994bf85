//! AST Builder
//!
//! 解析器不在本仓库中，宿主或测试通过 [`AstBuilder`] 以编程方式构造语法树。
//! 构造器负责分配唯一的 [`NodeId`]，并允许设置后续节点的源码位置。

use crate::ast::*;
use crate::types::{Type, DEFAULT_OUTPUT_PARAM};
use arc_diagnostics::{Position, Span};
use std::cell::Cell;

/// 语法树构造器
///
/// 所有方法只需要 `&self`，因此可以嵌套调用:
///
/// ```rust
/// use arc_syntax::build::AstBuilder;
///
/// let b = AstBuilder::new();
/// let flow = b.pipe(vec![b.ident_node("ox_pt_1"), b.invoke("calc"), b.ident_node("ox_pt_doubled")]);
/// assert_eq!(flow.items.len(), 3);
/// ```
#[derive(Debug)]
pub struct AstBuilder {
    next_id: Cell<u32>,
    pos: Cell<Position>,
}

impl Default for AstBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AstBuilder {
    pub fn new() -> Self {
        Self {
            next_id: Cell::new(0),
            pos: Cell::new(Position::new(1, 1)),
        }
    }

    /// 设置后续节点的源码位置
    pub fn at(&self, line: u32, column: u32) -> &Self {
        self.pos.set(Position::new(line, column));
        self
    }

    fn alloc(&self) -> (NodeId, Span) {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        let pos = self.pos.get();
        (NodeId(id), Span::new(pos, pos))
    }

    fn expr(&self, kind: ExprKind) -> Expr {
        let (id, span) = self.alloc();
        Expr { id, kind, span }
    }

    // ============ 表达式 ============

    pub fn int(&self, value: i64) -> Expr {
        self.expr(ExprKind::Literal(Literal::Int(value)))
    }

    pub fn float(&self, value: f64) -> Expr {
        self.expr(ExprKind::Literal(Literal::Float(value)))
    }

    pub fn string(&self, value: &str) -> Expr {
        self.expr(ExprKind::Literal(Literal::Str(value.to_string())))
    }

    pub fn ident(&self, name: &str) -> Expr {
        self.expr(ExprKind::Identifier(name.to_string()))
    }

    pub fn binary(&self, left: Expr, op: BinaryOp, right: Expr) -> Expr {
        self.expr(ExprKind::Binary(Box::new(left), op, Box::new(right)))
    }

    pub fn unary(&self, op: UnaryOp, operand: Expr) -> Expr {
        self.expr(ExprKind::Unary(op, Box::new(operand)))
    }

    pub fn call(&self, callee: &str, args: Vec<Expr>) -> Expr {
        self.expr(ExprKind::Call {
            callee: callee.to_string(),
            args,
        })
    }

    // ============ 语句 ============

    pub fn var(&self, name: &str, value: Expr) -> Stmt {
        let (id, span) = self.alloc();
        Stmt::VarDecl {
            id,
            name: name.to_string(),
            ty: None,
            value,
            span,
        }
    }

    pub fn var_typed(&self, name: &str, ty: Type, value: Expr) -> Stmt {
        let (id, span) = self.alloc();
        Stmt::VarDecl {
            id,
            name: name.to_string(),
            ty: Some(ty),
            value,
            span,
        }
    }

    pub fn stateful(&self, name: &str, value: Expr) -> Stmt {
        let (id, span) = self.alloc();
        Stmt::StatefulVarDecl {
            id,
            name: name.to_string(),
            ty: None,
            value,
            span,
        }
    }

    pub fn assign(&self, target: &str, value: Expr) -> Stmt {
        let (_, span) = self.alloc();
        Stmt::Assignment {
            target: target.to_string(),
            value,
            span,
        }
    }

    pub fn ret(&self, value: Expr) -> Stmt {
        let (_, span) = self.alloc();
        Stmt::Return {
            value: Some(value),
            span,
        }
    }

    pub fn expr_stmt(&self, expr: Expr) -> Stmt {
        Stmt::Expression(expr)
    }

    pub fn if_else(&self, condition: Expr, then: Vec<Stmt>, otherwise: Option<Vec<Stmt>>) -> Stmt {
        let then_block = self.block(then);
        let else_block = otherwise.map(|stmts| self.block(stmts));
        let (_, span) = self.alloc();
        Stmt::If {
            condition,
            then_block,
            else_ifs: Vec::new(),
            else_block,
            span,
        }
    }

    pub fn block(&self, stmts: Vec<Stmt>) -> Block {
        let (id, span) = self.alloc();
        Block { id, stmts, span }
    }

    // ============ 声明 ============

    pub fn param(&self, name: &str, ty: Type) -> ParamDecl {
        let (id, span) = self.alloc();
        ParamDecl {
            id,
            name: name.to_string(),
            ty,
            default: None,
            span,
        }
    }

    pub fn param_default(&self, name: &str, ty: Type, default: Literal) -> ParamDecl {
        let mut param = self.param(name, ty);
        param.default = Some(default);
        param
    }

    /// 单个匿名返回值，名称为默认输出 "output"
    pub fn output(&self, ty: Type) -> Vec<ParamDecl> {
        vec![self.param(DEFAULT_OUTPUT_PARAM, ty)]
    }

    pub fn function(
        &self,
        name: &str,
        config: Vec<ParamDecl>,
        inputs: Vec<ParamDecl>,
        outputs: Vec<ParamDecl>,
        body: Vec<Stmt>,
    ) -> FunctionDecl {
        let body = self.block(body);
        let (id, span) = self.alloc();
        FunctionDecl {
            id,
            name: name.to_string(),
            config,
            inputs,
            outputs,
            body,
            span,
        }
    }

    pub fn stage(&self, name: &str, flows: Vec<FlowStatement>) -> StageDecl {
        let (id, span) = self.alloc();
        StageDecl {
            id,
            name: name.to_string(),
            flows,
            span,
        }
    }

    pub fn sequence(&self, name: &str, stages: Vec<StageDecl>) -> SequenceDecl {
        let (id, span) = self.alloc();
        SequenceDecl {
            id,
            name: name.to_string(),
            stages,
            span,
        }
    }

    // ============ 流 ============

    fn flow_node(&self, kind: FlowNodeKind) -> FlowNode {
        let (id, span) = self.alloc();
        FlowNode { id, kind, span }
    }

    pub fn ident_node(&self, name: &str) -> FlowNode {
        self.flow_node(FlowNodeKind::Identifier(name.to_string()))
    }

    pub fn invoke(&self, callee: &str) -> FlowNode {
        self.flow_node(FlowNodeKind::Invocation {
            callee: callee.to_string(),
            config: ConfigValues::default(),
        })
    }

    pub fn invoke_named(&self, callee: &str, values: Vec<(&str, Expr)>) -> FlowNode {
        let values = values
            .into_iter()
            .map(|(name, value)| NamedValue {
                name: name.to_string(),
                span: value.span,
                value,
            })
            .collect();
        self.flow_node(FlowNodeKind::Invocation {
            callee: callee.to_string(),
            config: ConfigValues::Named(values),
        })
    }

    pub fn invoke_positional(&self, callee: &str, values: Vec<Expr>) -> FlowNode {
        self.flow_node(FlowNodeKind::Invocation {
            callee: callee.to_string(),
            config: ConfigValues::Positional(values),
        })
    }

    pub fn expr_node(&self, expr: Expr) -> FlowNode {
        self.flow_node(FlowNodeKind::Expression(expr))
    }

    pub fn next_node(&self) -> FlowNode {
        self.flow_node(FlowNodeKind::Next)
    }

    pub fn routing(&self, entries: Vec<(&str, Vec<FlowNode>)>) -> RoutingTable {
        self.routing_to(
            entries
                .into_iter()
                .map(|(output, nodes)| (output, nodes, None))
                .collect(),
        )
    }

    /// 条目的第三项是链尾节点的目标输入
    pub fn routing_to(&self, entries: Vec<(&str, Vec<FlowNode>, Option<&str>)>) -> RoutingTable {
        let (id, span) = self.alloc();
        RoutingTable {
            id,
            entries: entries
                .into_iter()
                .map(|(output, nodes, target)| RoutingEntry {
                    output: output.to_string(),
                    nodes,
                    target_param: target.map(str::to_string),
                    span,
                })
                .collect(),
            span,
        }
    }

    pub fn flow(&self, items: Vec<FlowItem>, operators: Vec<FlowOperator>) -> FlowStatement {
        let (id, span) = self.alloc();
        FlowStatement {
            id,
            items,
            operators,
            span,
        }
    }

    /// 全部由 `->` 连接的流语句
    pub fn pipe(&self, nodes: Vec<FlowNode>) -> FlowStatement {
        let operators = vec![FlowOperator::Continuous; nodes.len().saturating_sub(1)];
        self.flow(nodes.into_iter().map(FlowItem::from).collect(), operators)
    }

    /// 单个 `=>` 连接的转移语句: source => target
    pub fn transition(&self, source: FlowNode, target: FlowNode) -> FlowStatement {
        self.flow(
            vec![source.into(), target.into()],
            vec![FlowOperator::Transition],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        let b = AstBuilder::new();
        let x = b.int(1);
        let y = b.int(2);
        assert_ne!(x.id, y.id);
    }

    #[test]
    fn test_position_applies_to_following_nodes() {
        let b = AstBuilder::new();
        let stmt = b.at(4, 9).var("x", b.int(1));
        assert_eq!(stmt.span().start, Position::new(4, 9));
    }

    #[test]
    fn test_pipe_uses_continuous_operators() {
        let b = AstBuilder::new();
        let flow = b.pipe(vec![b.ident_node("a"), b.invoke("f"), b.ident_node("c")]);
        assert_eq!(flow.operators, vec![FlowOperator::Continuous; 2]);

        let t = b.transition(b.expr_node(b.ident("cond")), b.next_node());
        assert_eq!(t.operators, vec![FlowOperator::Transition]);
    }
}
