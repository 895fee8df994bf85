//! 流语句中的内联表达式
//!
//! 字面量登记为匿名常量；其他表达式合成为一个无输入、单输出的函数
//! `expression_N`，表达式在该函数作用域内分析，读取的通道记在函数上。
//! 两者都挂在根作用域下，并绑定到流节点的 AST ID，图构建阶段据此找回。

use super::Analyzer;
use crate::symbol::{Symbol, SymbolKind};
use arc_syntax::ast::{AstRef, Expr, FlowItem, FlowNode, FlowNodeKind, FlowStatement, Literal};
use arc_syntax::types::{FunctionType, Param, Type, DEFAULT_OUTPUT_PARAM};
use tracing::trace;

pub const EXPRESSION_PREFIX: &str = "expression_";

pub fn analyze_flow(analyzer: &mut Analyzer, flow: &FlowStatement) {
    for item in &flow.items {
        match item {
            FlowItem::Node(node) => analyze_flow_node(analyzer, node),
            FlowItem::Routing(table) => {
                for entry in &table.entries {
                    for node in &entry.nodes {
                        analyze_flow_node(analyzer, node);
                    }
                }
            }
        }
    }
}

fn analyze_flow_node(analyzer: &mut Analyzer, node: &FlowNode) {
    let FlowNodeKind::Expression(expr) = &node.kind else {
        return;
    };
    let ast = AstRef::new(node.id, node.span);
    match expr.as_literal() {
        Some(lit) => declare_constant(analyzer, lit, ast),
        None => declare_expression(analyzer, expr, ast),
    }
}

fn declare_constant(analyzer: &mut Analyzer, lit: &Literal, ast: AstRef) {
    let root = analyzer.tree.root();
    let symbol = Symbol::new("", SymbolKind::Constant, lit.ty())
        .with_ast(ast)
        .with_default(lit.clone());
    if let Err(e) = analyzer.tree.add(root, symbol) {
        analyzer.report(e);
    }
}

fn declare_expression(analyzer: &mut Analyzer, expr: &Expr, ast: AstRef) {
    let root = analyzer.tree.root();
    let name = analyzer.tree.auto_name(root, EXPRESSION_PREFIX);
    let symbol = Symbol::new(&name, SymbolKind::Function, Type::Invalid).with_ast(ast);
    let scope = match analyzer.tree.add(root, symbol) {
        Ok(scope) => scope,
        Err(e) => {
            analyzer.report(e);
            return;
        }
    };
    analyzer.tree.accumulate_read_channels(scope);

    let output = analyzer.analyze_expr(scope, expr);
    trace!(%name, ty = %output, "inline expression");
    let sig = FunctionType {
        outputs: [Param::new(DEFAULT_OUTPUT_PARAM, output)]
            .into_iter()
            .collect(),
        ..FunctionType::default()
    };
    analyzer.tree.symbol_mut(scope).ty = Type::function(sig);
}

#[cfg(test)]
mod tests {
    use crate::analyzer::Analyzer;
    use crate::cancel::CancellationToken;
    use crate::config::AnalyzerConfig;
    use crate::resolver::MapResolver;
    use crate::symbol::{Symbol, SymbolKind};
    use arc_syntax::ast::{BinaryOp, Item, Literal, Program};
    use arc_syntax::build::AstBuilder;
    use arc_syntax::types::Type;
    use std::sync::Arc;

    fn analyze(program: &Program) -> Analyzer {
        let globals = MapResolver::new()
            .with(Symbol::channel("ox_pt_1", 1, Type::F32))
            .with(Symbol::channel("output", 5, Type::F32));
        let mut analyzer = Analyzer::new(Some(Arc::new(globals)), AnalyzerConfig::default());
        analyzer
            .analyze_program(program, &CancellationToken::new())
            .unwrap();
        analyzer
    }

    #[test]
    fn test_expression_becomes_synthetic_function() {
        let b = AstBuilder::new();
        let cond = b.expr_node(b.binary(b.ident("ox_pt_1"), BinaryOp::Gt, b.int(10)));
        let node_id = cond.id;
        let program = Program {
            items: vec![Item::Flow(b.pipe(vec![cond, b.invoke("alarm")]))],
        };
        let analyzer = analyze(&program);
        let tree = analyzer.tree();

        let scope = tree.child_by_ast(tree.root(), node_id).unwrap();
        let symbol = tree.symbol(scope);
        assert_eq!(symbol.name, "expression_0");
        assert_eq!(symbol.kind, SymbolKind::Function);
        let sig = symbol.ty.as_function().unwrap();
        assert_eq!(sig.outputs.get("output").map(|p| &p.ty), Some(&Type::U8));
        assert!(sig.inputs.is_empty());
        assert!(tree.channels(scope).read.contains_key(&1));
    }

    #[test]
    fn test_expression_can_read_channel_named_output() {
        let b = AstBuilder::new();
        let program = Program {
            items: vec![Item::Flow(b.pipe(vec![
                b.expr_node(b.binary(b.ident("output"), BinaryOp::Add, b.int(1))),
                b.ident_node("ox_pt_1"),
            ]))],
        };
        let analyzer = analyze(&program);
        assert!(analyzer.errors().is_empty(), "{:?}", analyzer.errors());
        let tree = analyzer.tree();
        let scope = tree.find_child_by_name(tree.root(), "expression_0").unwrap();
        assert!(tree.channels(scope).read.contains_key(&5));
    }

    #[test]
    fn test_literal_becomes_constant() {
        let b = AstBuilder::new();
        let lit = b.expr_node(b.int(42));
        let node_id = lit.id;
        let program = Program {
            items: vec![Item::Flow(b.pipe(vec![lit, b.ident_node("ox_pt_1")]))],
        };
        let analyzer = analyze(&program);
        let tree = analyzer.tree();
        let constant = tree.symbol(tree.child_by_ast(tree.root(), node_id).unwrap());
        assert_eq!(constant.kind, SymbolKind::Constant);
        assert_eq!(constant.default_value, Some(Literal::Int(42)));
        assert!(constant.name.is_empty());
    }

    #[test]
    fn test_expression_names_are_unique() {
        let b = AstBuilder::new();
        let expr = || b.expr_node(b.binary(b.ident("ox_pt_1"), BinaryOp::Mul, b.int(2)));
        let program = Program {
            items: vec![
                Item::Flow(b.pipe(vec![expr(), b.ident_node("ox_pt_1")])),
                Item::Flow(b.pipe(vec![expr(), b.ident_node("ox_pt_1")])),
            ],
        };
        let analyzer = analyze(&program);
        let tree = analyzer.tree();
        assert!(tree.find_child_by_name(tree.root(), "expression_0").is_some());
        assert!(tree.find_child_by_name(tree.root(), "expression_1").is_some());
    }

    #[test]
    fn test_stage_expression_is_declared_at_root() {
        let b = AstBuilder::new();
        let cond = b.expr_node(b.binary(b.ident("ox_pt_1"), BinaryOp::Lt, b.int(5)));
        let node_id = cond.id;
        let stage = b.stage("run", vec![b.transition(cond, b.next_node())]);
        let program = Program {
            items: vec![Item::Sequence(b.sequence("main", vec![stage]))],
        };
        let analyzer = analyze(&program);
        let tree = analyzer.tree();

        let scope = tree.child_by_ast(tree.root(), node_id).unwrap();
        assert_eq!(tree.parent(scope), Some(tree.root()));
        assert_eq!(tree.symbol(scope).name, "expression_0");
    }
}
