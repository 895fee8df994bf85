//! Semantic Analysis Error Types
//!
//! 语义分析错误定义。分析阶段的错误全部累积后统一报告，
//! 只有在转换为诊断时才计算 "did you mean" 提示。

use crate::config::AnalyzerConfig;
use crate::scope::{ScopeId, ScopeTree};
use crate::suggest::suggest_similar;
use arc_diagnostics::{Diagnostic, Span, Suggestion};
use thiserror::Error;

/// 名称解析失败，由 [`ScopeTree::resolve`] 返回
///
/// 只记录名称和发起解析的作用域，提示在 [`UndefinedSymbol::hint`] 中按需计算
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("undefined symbol: {name}")]
pub struct UndefinedSymbol {
    pub name: String,
    pub scope: ScopeId,
}

impl UndefinedSymbol {
    /// 计算 "did you mean" 提示
    pub fn hint(&self, tree: &ScopeTree, config: &AnalyzerConfig) -> Option<String> {
        format_hint(tree, self.scope, &self.name, config)
    }

    /// 附加源码位置，转换为语义错误
    pub fn at(self, span: Span) -> SemanticError {
        SemanticError::UndefinedSymbol {
            name: self.name,
            scope: self.scope,
            span: Some(span),
        }
    }
}

fn candidates(tree: &ScopeTree, scope: ScopeId, name: &str, config: &AnalyzerConfig) -> Vec<String> {
    suggest_similar(
        tree,
        scope,
        name,
        config.max_suggestion_distance,
        config.max_suggestions,
    )
}

fn format_hint(
    tree: &ScopeTree,
    scope: ScopeId,
    name: &str,
    config: &AnalyzerConfig,
) -> Option<String> {
    let suggestions = candidates(tree, scope, name, config);
    if suggestions.is_empty() {
        None
    } else {
        Some(format!("did you mean: {}?", suggestions.join(", ")))
    }
}

/// 语义分析错误
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SemanticError {
    // ============ 名称解析错误 ============
    #[error("undefined symbol: {name}")]
    UndefinedSymbol {
        name: String,
        scope: ScopeId,
        span: Option<Span>,
    },

    /// 与源码中已有的声明重名（遮蔽全局符号不算冲突）
    #[error("name {name} conflicts with existing symbol at line {}, col {}", .previous.start.line, .previous.start.column)]
    NameConflict {
        name: String,
        span: Option<Span>,
        previous: Span,
    },

    // ============ 调用错误 ============
    #[error("unresolved invocation: '{name}' is not a known function")]
    UnresolvedInvocation {
        name: String,
        scope: Option<ScopeId>,
        span: Option<Span>,
    },

    #[error("'{name}' is a {kind}, not a function")]
    NotCallable {
        name: String,
        kind: String,
        span: Option<Span>,
    },

    // ============ 配置参数错误 ============
    #[error("invalid value for config '{param}' of '{function}': {reason}")]
    InvalidConfig {
        function: String,
        param: String,
        reason: String,
        span: Option<Span>,
    },

    #[error("'{function}' has no config parameter '{param}'")]
    UnknownConfig {
        function: String,
        param: String,
        span: Option<Span>,
    },

    #[error("missing required config '{param}' for '{function}'")]
    MissingConfig {
        function: String,
        param: String,
        span: Option<Span>,
    },

    // ============ 流与图结构错误 ============
    #[error("missing required input '{param}' on node '{node}'")]
    MissingInput {
        node: String,
        param: String,
        span: Option<Span>,
    },

    #[error("invalid flow: {reason}")]
    InvalidFlow { reason: String, span: Option<Span> },

    #[error("'next' used outside of a sequence")]
    NextOutsideSequence { span: Option<Span> },

    #[error("stage '{stage}' is the last stage of sequence '{sequence}' and has no next stage")]
    NoNextStage {
        stage: String,
        sequence: String,
        span: Option<Span>,
    },

    #[error("sequence '{name}' has no stages")]
    EmptySequence { name: String, span: Option<Span> },

    #[error("input '{param}' of node '{node}' already has a continuous producer")]
    DuplicateProducer {
        node: String,
        param: String,
        span: Option<Span>,
    },

    #[error("duplicate node key '{key}'")]
    DuplicateNodeKey { key: String, span: Option<Span> },

    #[error("{reason}")]
    HandleMismatch { reason: String, span: Option<Span> },

    #[error("node '{node}' has no output '{output}'")]
    UnknownOutput {
        node: String,
        output: String,
        span: Option<Span>,
    },

    #[error("node '{node}' does not have input '{input}'")]
    UnknownInput {
        node: String,
        input: String,
        span: Option<Span>,
    },
}

impl SemanticError {
    /// 获取错误发生的位置
    pub fn span(&self) -> Option<Span> {
        match self {
            Self::UndefinedSymbol { span, .. }
            | Self::NameConflict { span, .. }
            | Self::UnresolvedInvocation { span, .. }
            | Self::NotCallable { span, .. }
            | Self::InvalidConfig { span, .. }
            | Self::UnknownConfig { span, .. }
            | Self::MissingConfig { span, .. }
            | Self::MissingInput { span, .. }
            | Self::InvalidFlow { span, .. }
            | Self::NextOutsideSequence { span }
            | Self::NoNextStage { span, .. }
            | Self::EmptySequence { span, .. }
            | Self::DuplicateProducer { span, .. }
            | Self::DuplicateNodeKey { span, .. }
            | Self::HandleMismatch { span, .. }
            | Self::UnknownOutput { span, .. }
            | Self::UnknownInput { span, .. } => *span,
        }
    }

    /// 诊断中的错误码
    pub fn code(&self) -> &'static str {
        match self {
            Self::UndefinedSymbol { .. } => "undefined_symbol",
            Self::NameConflict { .. } => "name_conflict",
            Self::UnresolvedInvocation { .. } => "unresolved_invocation",
            Self::NotCallable { .. } => "not_callable",
            Self::InvalidConfig { .. } => "invalid_config",
            Self::UnknownConfig { .. } => "unknown_config",
            Self::MissingConfig { .. } => "missing_config",
            Self::MissingInput { .. } => "missing_input",
            Self::InvalidFlow { .. } => "invalid_flow",
            Self::NextOutsideSequence { .. } => "next_outside_sequence",
            Self::NoNextStage { .. } => "no_next_stage",
            Self::EmptySequence { .. } => "empty_sequence",
            Self::DuplicateProducer { .. } => "duplicate_producer",
            Self::DuplicateNodeKey { .. } => "duplicate_node_key",
            Self::HandleMismatch { .. } => "handle_mismatch",
            Self::UnknownOutput { .. } => "unknown_output",
            Self::UnknownInput { .. } => "unknown_input",
        }
    }

    /// 转换为诊断，此时才计算未定义符号的提示
    ///
    /// 最接近的候选名同时作为可直接替换的修复建议
    pub fn to_diagnostic(&self, tree: &ScopeTree, config: &AnalyzerConfig) -> Diagnostic {
        let mut diag = Diagnostic::error(self.to_string())
            .maybe_span(self.span())
            .with_code(self.code());

        let similar = match self {
            Self::UndefinedSymbol { name, scope, .. } => candidates(tree, *scope, name, config),
            Self::UnresolvedInvocation {
                name,
                scope: Some(scope),
                ..
            } => candidates(tree, *scope, name, config),
            _ => Vec::new(),
        };
        if let Some(best) = similar.first() {
            diag = diag
                .with_note(format!("did you mean: {}?", similar.join(", ")))
                .with_suggestion(
                    Suggestion::new(format!("replace with '{}'", best)).with_replacement(best.as_str()),
                );
        }

        match self {
            Self::MissingConfig { param, .. } => {
                diag.suggest(format!("set '{}' in the invocation config", param))
            }
            Self::MissingInput { param, .. } => {
                diag.suggest(format!("connect a producer to input '{}'", param))
            }
            _ => diag,
        }
    }
}
