use super::Analyzer;
use crate::error::SemanticError;
use crate::scope::ScopeId;
use crate::symbol::{Symbol, SymbolKind};
use arc_syntax::ast::{AstRef, Block, Expr, NodeId, Stmt};
use arc_syntax::types::Type;
use arc_diagnostics::Span;

/// 每个语句块创建一个匿名 Block 作用域
pub fn analyze_block(analyzer: &mut Analyzer, parent: ScopeId, block: &Block) {
    let symbol = Symbol::new("", SymbolKind::Block, Type::Invalid)
        .with_ast(AstRef::new(block.id, block.span));
    let scope = match analyzer.tree.add(parent, symbol) {
        Ok(scope) => scope,
        Err(e) => {
            analyzer.report(e);
            return;
        }
    };
    for stmt in &block.stmts {
        analyzer.analyze_stmt(scope, stmt);
    }
}

pub fn analyze_stmt(analyzer: &mut Analyzer, scope: ScopeId, stmt: &Stmt) {
    match stmt {
        Stmt::VarDecl {
            id,
            name,
            ty,
            value,
            span,
        } => {
            // 初始化表达式先分析（变量在自己的初始化器中不可见）
            let inferred = analyzer.analyze_expr(scope, value);
            let symbol = match channel_alias(analyzer, scope, value) {
                Some((source, elem)) => Symbol::new(name, SymbolKind::Channel, Type::chan(elem))
                    .with_source_id(source),
                None => Symbol::new(name, SymbolKind::Variable, ty.clone().unwrap_or(inferred)),
            };
            declare(analyzer, scope, symbol, *id, *span);
        }
        Stmt::StatefulVarDecl {
            id,
            name,
            ty,
            value,
            span,
        } => {
            let inferred = analyzer.analyze_expr(scope, value);
            let mut symbol = Symbol::new(
                name,
                SymbolKind::StatefulVariable,
                ty.clone().unwrap_or(inferred),
            );
            symbol.default_value = value.as_literal().cloned();
            declare(analyzer, scope, symbol, *id, *span);
        }
        Stmt::Assignment {
            target,
            value,
            span,
        } => {
            analyzer.analyze_expr(scope, value);
            assign(analyzer, scope, target, *span);
        }
        Stmt::If {
            condition,
            then_block,
            else_ifs,
            else_block,
            ..
        } => {
            analyzer.analyze_expr(scope, condition);
            analyzer.analyze_block(scope, then_block);
            for (cond, block) in else_ifs {
                analyzer.analyze_expr(scope, cond);
                analyzer.analyze_block(scope, block);
            }
            if let Some(block) = else_block {
                analyzer.analyze_block(scope, block);
            }
        }
        Stmt::Return { value, .. } => {
            if let Some(value) = value {
                analyzer.analyze_expr(scope, value);
            }
        }
        Stmt::Expression(expr) => {
            analyzer.analyze_expr(scope, expr);
        }
    }
}

fn declare(analyzer: &mut Analyzer, scope: ScopeId, symbol: Symbol, id: NodeId, span: Span) {
    let symbol = symbol.with_ast(AstRef::new(id, span));
    if let Err(e) = analyzer.tree.add(scope, symbol) {
        analyzer.report(e);
    }
}

/// `x := ox_pt_1` 声明的是通道别名，返回原始通道 ID 与元素类型
fn channel_alias(analyzer: &Analyzer, scope: ScopeId, value: &Expr) -> Option<(u32, Type)> {
    let name = value.as_identifier()?;
    let resolved = analyzer.tree.lookup(scope, name)?;
    if !resolved.symbol.is_channel() {
        return None;
    }
    let source = resolved.symbol.channel_id()?;
    Some((source, resolved.symbol.ty.elem()))
}

/// 赋值目标为通道时记为写入，写集合挂在最近的函数作用域上
fn assign(analyzer: &mut Analyzer, scope: ScopeId, target: &str, span: Span) {
    let Some(resolved) = analyzer.tree.lookup(scope, target) else {
        analyzer.report(SemanticError::UndefinedSymbol {
            name: target.to_string(),
            scope,
            span: Some(span),
        });
        return;
    };
    if !resolved.symbol.is_channel() {
        return;
    }
    let (Some(channel), Some(func)) = (
        resolved.symbol.channel_id(),
        analyzer.tree.closest_ancestor_of_kind(scope, SymbolKind::Function),
    ) else {
        return;
    };
    analyzer
        .tree
        .channels_mut(func)
        .add_write(channel, resolved.symbol.name);
}
