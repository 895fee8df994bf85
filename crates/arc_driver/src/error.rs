//! Compilation Errors
//!
//! 驱动层的错误类型，集成统一诊断系统

use arc_diagnostics::{Diagnostic, DiagnosticSink, Emitter};
use arc_ir::IrError;
use arc_sema::Cancelled;
use arc_stratifier::StratifyError;
use std::error::Error as StdError;
use thiserror::Error;

/// 外部解析器/后端的错误
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// 编译错误
#[derive(Debug, Error)]
pub enum CompileError {
    /// 外部解析器失败
    #[error("parse error: {0}")]
    Parse(BoxError),

    /// 语义分析错误（可能有多个）
    #[error("analysis failed with {} error(s):\n{}", .0.error_count(), .0)]
    Diagnostics(DiagnosticSink),

    /// 持续数据流中存在环
    #[error(transparent)]
    Cycle(#[from] StratifyError),

    /// 边引用了不存在的节点或端口
    #[error(transparent)]
    HandleMismatch(#[from] IrError),

    /// 图输入的 JSON 无法解析
    #[error("invalid graph: {0}")]
    Graph(#[from] serde_json::Error),

    /// 外部字节码/WASM 编译器失败
    #[error("backend error: {0}")]
    Backend(BoxError),

    #[error("compilation cancelled")]
    Cancelled,
}

impl From<Cancelled> for CompileError {
    fn from(_: Cancelled) -> Self {
        CompileError::Cancelled
    }
}

impl CompileError {
    /// 转换为诊断并收集到 DiagnosticSink
    pub fn collect_to_sink(&self, sink: &mut DiagnosticSink) {
        match self {
            CompileError::Diagnostics(diagnostics) => {
                sink.extend(diagnostics.diagnostics().iter().cloned());
            }
            CompileError::Parse(err) => {
                sink.add(Diagnostic::error(format!("parse error: {}", err)).with_code("parse"));
            }
            CompileError::Cycle(err) => {
                let mut diag = Diagnostic::error(err.to_string()).with_code("cycle");
                if let StratifyError::Cycle { nodes, .. } = err {
                    diag = diag.with_note(format!("nodes on or after the cycle: {}", nodes.join(", ")));
                }
                sink.add(diag);
            }
            CompileError::HandleMismatch(err) => {
                sink.add(Diagnostic::error(err.to_string()).with_code("handle_mismatch"));
            }
            CompileError::Graph(err) => {
                sink.add(Diagnostic::error(format!("invalid graph: {}", err)).with_code("graph"));
            }
            CompileError::Backend(err) => {
                sink.add(Diagnostic::error(format!("backend error: {}", err)).with_code("backend"));
            }
            CompileError::Cancelled => {}
        }
    }

    /// 使用统一诊断系统输出错误
    pub fn emit(&self, source: Option<&str>) {
        let mut sink = DiagnosticSink::new();
        self.collect_to_sink(&mut sink);

        let emitter = Emitter::new();
        if let Some(src) = source {
            for diag in sink.diagnostics() {
                emitter.emit_with_source(diag, src);
            }
        } else {
            emitter.emit_all(sink.diagnostics());
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, CompileError::Cancelled)
    }
}

/// 编译结果类型
pub type CompileResult<T> = Result<T, CompileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostics_message_counts_errors() {
        let mut sink = DiagnosticSink::new();
        sink.error("undefined symbol: x");
        sink.warning("unused");
        let err = CompileError::Diagnostics(sink);
        assert!(err.to_string().starts_with("analysis failed with 1 error(s):"));
    }

    #[test]
    fn test_cycle_collects_with_note() {
        let err = CompileError::from(StratifyError::Cycle {
            nodes: vec!["a".to_string(), "b".to_string()],
            path: vec!["a".to_string(), "b".to_string(), "a".to_string()],
        });
        let mut sink = DiagnosticSink::new();
        err.collect_to_sink(&mut sink);
        assert!(!sink.ok());
        let diag = &sink.diagnostics()[0];
        assert_eq!(diag.code.as_deref(), Some("cycle"));
        assert_eq!(
            diag.message,
            "cycle detected in continuous dataflow: a -> b -> a"
        );
        assert_eq!(diag.notes.len(), 1);
    }

    #[test]
    fn test_cancelled_is_not_a_diagnostic() {
        let err = CompileError::from(Cancelled);
        assert!(err.is_cancelled());
        let mut sink = DiagnosticSink::new();
        err.collect_to_sink(&mut sink);
        assert!(sink.is_empty());
    }
}
