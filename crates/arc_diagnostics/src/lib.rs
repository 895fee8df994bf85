//! Arc Diagnostics
//!
//! Arc 编译器的统一诊断系统。分析阶段的错误累积在 [`DiagnosticSink`] 中，
//! 由 LSP 或命令行宿主统一呈现。
//!
//! # 核心类型
//!
//! - [`Diagnostic`] - 诊断信息主体
//! - [`DiagnosticLevel`] - 诊断级别（Error/Warning/Info/Hint）
//! - [`DiagnosticSink`] - 诊断收集器
//! - [`Emitter`] - 诊断输出器
//! - [`Span`] / [`Position`] - 源码位置信息
//!
//! # 示例
//!
//! ```rust
//! use arc_diagnostics::{Diagnostic, DiagnosticSink, Span};
//!
//! let mut sink = DiagnosticSink::new();
//! sink.add(
//!     Diagnostic::error("undefined symbol: frobnicate")
//!         .span(Span::point(3, 5))
//!         .with_note("did you mean: frobnicat?"),
//! );
//! assert!(!sink.ok());
//! ```

pub mod diagnostic;
pub mod emitter;
pub mod level;
pub mod sink;
pub mod span;

pub use diagnostic::{Diagnostic, Suggestion};
pub use emitter::Emitter;
pub use level::DiagnosticLevel;
pub use sink::DiagnosticSink;
pub use span::{Position, Span};
