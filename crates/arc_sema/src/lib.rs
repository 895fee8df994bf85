//! Arc Semantic Analysis
//!
//! 语义分析模块，负责：
//! - 作用域树与名称解析 (ScopeTree)
//! - 全局符号来源 (Resolver)
//! - 函数体分析与通道读写集合 (Analyzer)
//! - 未定义符号的 "did you mean" 提示
//!
//! 错误全部累积，不会在第一个错误处停止；只有取消会中断分析。

pub mod analyzer;
pub mod cancel;
pub mod config;
pub mod error;
pub mod resolver;
pub mod scope;
pub mod suggest;
pub mod symbol;

// 重新导出核心类型
pub use analyzer::Analyzer;
pub use cancel::{CancellationToken, Cancelled};
pub use config::AnalyzerConfig;
pub use error::{SemanticError, UndefinedSymbol};
pub use resolver::{ChannelInfo, ChannelRegistry, CompoundResolver, MapResolver, ModuleResolver, Resolver};
pub use scope::{Resolved, Scope, ScopeId, ScopeTree};
pub use symbol::{Channels, Symbol, SymbolKind};

use arc_syntax::ast::Program;
use std::sync::Arc;

/// 分析结果：作用域树与累积的错误
#[derive(Debug)]
pub struct AnalysisResult {
    pub tree: ScopeTree,
    pub errors: Vec<SemanticError>,
}

impl AnalysisResult {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// 分析整个程序
///
/// 即使有错误也继续，收集尽可能多的错误信息
///
/// # Errors
///
/// 仅在取消时返回 [`Cancelled`]
pub fn analyze(
    program: &Program,
    resolver: Option<Arc<dyn Resolver>>,
    config: AnalyzerConfig,
    cancel: &CancellationToken,
) -> Result<AnalysisResult, Cancelled> {
    let mut analyzer = Analyzer::new(resolver, config);
    analyzer.analyze_program(program, cancel)?;
    let (tree, errors) = analyzer.into_parts();
    Ok(AnalysisResult { tree, errors })
}

#[cfg(test)]
mod tests {
    use super::*;
    use arc_syntax::ast::{BinaryOp, Item};
    use arc_syntax::build::AstBuilder;
    use arc_syntax::types::Type;

    #[test]
    fn test_analyze_collects_all_errors() {
        let b = AstBuilder::new();
        let func = b.function(
            "f",
            vec![],
            vec![],
            vec![],
            vec![
                b.expr_stmt(b.ident("a")),
                b.expr_stmt(b.binary(b.ident("b"), BinaryOp::Add, b.ident("c"))),
            ],
        );
        let program = Program {
            items: vec![Item::Function(func)],
        };
        let result = analyze(&program, None, AnalyzerConfig::default(), &CancellationToken::new())
            .unwrap();
        assert!(!result.is_ok());
        assert_eq!(result.errors.len(), 3);
    }

    #[test]
    fn test_global_resolver_feeds_analysis() {
        let b = AstBuilder::new();
        let func = b.function("f", vec![], vec![], vec![], vec![b.expr_stmt(b.ident("ox_pt_1"))]);
        let program = Program {
            items: vec![Item::Function(func)],
        };
        let registry = ChannelRegistry::new();
        registry.register(1, "ox_pt_1", Type::F32);
        let result = analyze(
            &program,
            Some(Arc::new(registry)),
            AnalyzerConfig::default(),
            &CancellationToken::new(),
        )
        .unwrap();
        assert!(result.is_ok());
        let func = result.tree.find_child_by_name(result.tree.root(), "f").unwrap();
        assert!(result.tree.channels(func).read.contains_key(&1));
    }
}
