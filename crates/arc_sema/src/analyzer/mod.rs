//! Body Analyzer
//!
//! 语义分析 Pass，填充作用域树并解析标识符引用。
//!
//! 采用两遍扫描：
//! 1. 第一遍：收集所有顶层声明（函数及其参数、序列及其阶段）
//! 2. 第二遍：分析函数体，并为流语句中的内联表达式预先登记作用域
//!
//! 流语句本身（节点与连线）由图构建阶段处理，它复用同一个 Analyzer。

use crate::cancel::{CancellationToken, Cancelled};
use crate::config::AnalyzerConfig;
use crate::error::SemanticError;
use crate::resolver::Resolver;
use crate::scope::{ScopeId, ScopeTree};
use arc_diagnostics::DiagnosticSink;
use arc_syntax::ast::{Block, Expr, FlowStatement, Item, Program, Stmt};
use std::sync::Arc;
use tracing::{debug, instrument};

pub mod decl;
pub mod expr;
pub mod flow;
pub mod stmt;

/// 语义分析器
pub struct Analyzer {
    pub(crate) tree: ScopeTree,
    pub(crate) errors: Vec<SemanticError>,
    pub(crate) config: AnalyzerConfig,
}

impl Analyzer {
    pub fn new(resolver: Option<Arc<dyn Resolver>>, config: AnalyzerConfig) -> Self {
        Self {
            tree: ScopeTree::new(resolver),
            errors: Vec::new(),
            config,
        }
    }

    /// 分析整个程序，每个顶层条目之前检查一次取消
    #[instrument(skip_all, fields(items = program.items.len()))]
    pub fn analyze_program(
        &mut self,
        program: &Program,
        cancel: &CancellationToken,
    ) -> Result<(), Cancelled> {
        // Pass 1: 收集顶层声明
        for item in &program.items {
            cancel.check()?;
            self.collect_item(item);
        }

        // Pass 2: 函数体与流表达式
        for item in &program.items {
            cancel.check()?;
            self.resolve_item(item);
        }

        debug!(
            scopes = self.tree.len(),
            errors = self.errors.len(),
            "body analysis finished"
        );
        Ok(())
    }

    pub fn tree(&self) -> &ScopeTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut ScopeTree {
        &mut self.tree
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn errors(&self) -> &[SemanticError] {
        &self.errors
    }

    /// 记录一个错误，分析继续进行
    pub fn report(&mut self, error: SemanticError) {
        self.errors.push(error);
    }

    /// 把累积的错误转换为诊断（此时才计算提示）
    pub fn diagnostics(&self) -> DiagnosticSink {
        let mut sink = DiagnosticSink::new();
        for error in &self.errors {
            sink.add(error.to_diagnostic(&self.tree, &self.config));
        }
        sink
    }

    pub fn into_parts(self) -> (ScopeTree, Vec<SemanticError>) {
        (self.tree, self.errors)
    }

    // --- Delegation ---

    pub(crate) fn collect_item(&mut self, item: &Item) {
        decl::collect_item(self, item);
    }

    pub(crate) fn resolve_item(&mut self, item: &Item) {
        decl::resolve_item(self, item);
    }

    pub fn analyze_function_body(&mut self, func: ScopeId, body: &Block) {
        decl::analyze_function_body(self, func, body);
    }

    pub(crate) fn analyze_block(&mut self, scope: ScopeId, block: &Block) {
        stmt::analyze_block(self, scope, block);
    }

    pub(crate) fn analyze_stmt(&mut self, scope: ScopeId, stmt: &Stmt) {
        stmt::analyze_stmt(self, scope, stmt);
    }

    pub(crate) fn analyze_expr(&mut self, scope: ScopeId, expr: &Expr) -> arc_syntax::Type {
        expr::analyze_expr(self, scope, expr)
    }

    /// 内联表达式总是登记在根作用域下
    pub(crate) fn analyze_flow(&mut self, flow: &FlowStatement) {
        flow::analyze_flow(self, flow);
    }
}
