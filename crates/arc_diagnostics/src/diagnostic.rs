//! Diagnostic - 诊断信息
//!
//! 一条诊断携带 `{severity, start, end, message, code?, notes[]}`，
//! 可直接转换为编辑器中的问题条目。

use crate::level::DiagnosticLevel;
use crate::span::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 修复建议
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub message: String,
    /// 建议的替换内容（如果有）
    pub replacement: Option<String>,
}

impl Suggestion {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            replacement: None,
        }
    }

    pub fn with_replacement(mut self, replacement: impl Into<String>) -> Self {
        self.replacement = Some(replacement.into());
        self
    }
}

/// 诊断信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// 诊断级别
    pub level: DiagnosticLevel,
    /// 主要消息
    pub message: String,
    /// 源码位置（可选）
    pub span: Option<Span>,
    /// 错误码，例如 "undefined_symbol"
    pub code: Option<String>,
    /// 补充注释
    pub notes: Vec<String>,
    /// 修复建议
    pub suggestions: Vec<Suggestion>,
}

impl Diagnostic {
    pub fn new(level: DiagnosticLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            span: None,
            code: None,
            notes: Vec::new(),
            suggestions: Vec::new(),
        }
    }

    /// 创建错误诊断
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(DiagnosticLevel::Error, message)
    }

    /// 创建警告诊断
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(DiagnosticLevel::Warning, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(DiagnosticLevel::Info, message)
    }

    pub fn hint(message: impl Into<String>) -> Self {
        Self::new(DiagnosticLevel::Hint, message)
    }

    /// 设置位置信息
    pub fn span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// 设置可选位置信息
    pub fn maybe_span(mut self, span: Option<Span>) -> Self {
        self.span = span;
        self
    }

    /// 设置错误码
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// 添加注释
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: Suggestion) -> Self {
        self.suggestions.push(suggestion);
        self
    }

    /// 添加简单建议（仅消息）
    pub fn suggest(self, message: impl Into<String>) -> Self {
        self.with_suggestion(Suggestion::new(message))
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(span) = &self.span {
            write!(f, "{}: ", span)?;
        }
        write!(f, "{}: {}", self.level, self.message)?;
        for note in &self.notes {
            write!(f, " ({})", note)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::Position;

    #[test]
    fn test_diagnostic_creation() {
        let span = Span::new(Position::new(2, 1), Position::new(2, 6));
        let diag = Diagnostic::error("test error")
            .span(span)
            .with_code("test_code")
            .with_note("test note")
            .suggest("try this");

        assert_eq!(diag.level, DiagnosticLevel::Error);
        assert_eq!(diag.message, "test error");
        assert_eq!(diag.span, Some(span));
        assert_eq!(diag.code.as_deref(), Some("test_code"));
        assert_eq!(diag.notes, vec!["test note".to_string()]);
        assert_eq!(diag.suggestions[0].message, "try this");
    }

    #[test]
    fn test_display_includes_position_and_notes() {
        let diag = Diagnostic::error("undefined symbol: frobnicate")
            .span(Span::point(4, 9))
            .with_note("did you mean: frobnicat?");
        assert_eq!(
            diag.to_string(),
            "4:9: error: undefined symbol: frobnicate (did you mean: frobnicat?)"
        );
    }

    #[test]
    fn test_different_levels() {
        assert_eq!(Diagnostic::warning("w").level, DiagnosticLevel::Warning);
        assert_eq!(Diagnostic::info("i").level, DiagnosticLevel::Info);
        assert_eq!(Diagnostic::hint("h").level, DiagnosticLevel::Hint);
    }
}
