use super::Analyzer;
use crate::error::SemanticError;
use crate::scope::ScopeId;
use crate::symbol::SymbolKind;
use arc_syntax::ast::{Expr, ExprKind, UnaryOp};
use arc_syntax::types::Type;

/// 解析表达式中的标识符并推导其类型
///
/// 无法确定类型时返回 `Type::Invalid`，错误已记录，调用方无需再报告
pub fn analyze_expr(analyzer: &mut Analyzer, scope: ScopeId, expr: &Expr) -> Type {
    match &expr.kind {
        ExprKind::Literal(lit) => lit.ty(),
        ExprKind::Identifier(name) => match analyzer.tree.resolve(scope, name) {
            // 通道读取的是元素值
            Ok(resolved) => resolved.symbol.ty.elem(),
            Err(e) => {
                analyzer.report(e.at(expr.span));
                Type::Invalid
            }
        },
        ExprKind::Unary(op, operand) => {
            let ty = analyzer.analyze_expr(scope, operand);
            match op {
                UnaryOp::Not => Type::U8,
                UnaryOp::Neg => ty,
            }
        }
        ExprKind::Binary(left, op, right) => {
            let left = analyzer.analyze_expr(scope, left);
            let right = analyzer.analyze_expr(scope, right);
            if op.is_boolean() {
                Type::U8
            } else if left.is_valid() {
                left
            } else {
                right
            }
        }
        ExprKind::Call { callee, args } => {
            for arg in args {
                analyzer.analyze_expr(scope, arg);
            }
            analyze_call(analyzer, scope, callee, expr)
        }
    }
}

fn analyze_call(analyzer: &mut Analyzer, scope: ScopeId, callee: &str, expr: &Expr) -> Type {
    let resolved = match analyzer.tree.resolve(scope, callee) {
        Ok(resolved) => resolved,
        Err(e) => {
            analyzer.report(e.at(expr.span));
            return Type::Invalid;
        }
    };
    if resolved.symbol.kind != SymbolKind::Function {
        analyzer.report(SemanticError::NotCallable {
            name: callee.to_string(),
            kind: resolved.symbol.kind.to_string(),
            span: Some(expr.span),
        });
        return Type::Invalid;
    }
    resolved
        .symbol
        .ty
        .as_function()
        .and_then(|sig| sig.outputs.iter().next())
        .map(|output| output.ty.clone())
        .unwrap_or(Type::Invalid)
}
