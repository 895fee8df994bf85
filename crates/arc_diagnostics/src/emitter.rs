//! Emitter - 诊断输出器
//!
//! 负责将诊断信息格式化输出。有源码时使用 ariadne 渲染带标注的报告。

use crate::diagnostic::Diagnostic;
use crate::level::DiagnosticLevel;
use ariadne::{Color, Config, Label, Report, ReportKind, Source};
use colored::*;

/// 诊断输出器
pub struct Emitter {
    use_colors: bool,
}

impl Default for Emitter {
    fn default() -> Self {
        Self::new()
    }
}

impl Emitter {
    pub fn new() -> Self {
        Self { use_colors: true }
    }

    /// 创建无颜色的输出器
    pub fn without_colors() -> Self {
        Self { use_colors: false }
    }

    /// 输出单个诊断
    pub fn emit(&self, diagnostic: &Diagnostic) {
        println!("{}", self.render(diagnostic));
    }

    /// 输出所有诊断
    pub fn emit_all(&self, diagnostics: &[Diagnostic]) {
        for diagnostic in diagnostics {
            self.emit(diagnostic);
            println!();
        }
    }

    /// 结合源码输出诊断
    pub fn emit_with_source(&self, diagnostic: &Diagnostic, source: &str) {
        eprint!("{}", self.render_with_source(diagnostic, source));
    }

    /// 格式化为字符串（不含源码）
    pub fn render(&self, diagnostic: &Diagnostic) -> String {
        let mut out = String::new();
        let code = diagnostic
            .code
            .as_ref()
            .map(|c| format!("[{}]", c))
            .unwrap_or_default();

        if self.use_colors {
            out.push_str(&format!(
                "{}{}: {}",
                diagnostic.level.colored_name(),
                code,
                diagnostic.message.bold()
            ));
            if let Some(span) = &diagnostic.span {
                out.push_str(&format!("\n  {} {}", "-->".blue().bold(), span));
            }
            for note in &diagnostic.notes {
                out.push_str(&format!(
                    "\n  {} {}",
                    "=".blue().bold(),
                    format!("note: {}", note).bright_black()
                ));
            }
            for suggestion in &diagnostic.suggestions {
                out.push_str(&format!(
                    "\n  {} {}",
                    "=".green().bold(),
                    format!("help: {}", suggestion.message).green()
                ));
                if let Some(replacement) = &suggestion.replacement {
                    out.push_str(&format!("\n        try: {}", replacement.green().italic()));
                }
            }
        } else {
            out.push_str(&format!("{}{}: {}", diagnostic.level, code, diagnostic.message));
            if let Some(span) = &diagnostic.span {
                out.push_str(&format!("\n  --> {}", span));
            }
            for note in &diagnostic.notes {
                out.push_str(&format!("\n  = note: {}", note));
            }
            for suggestion in &diagnostic.suggestions {
                out.push_str(&format!("\n  = help: {}", suggestion.message));
                if let Some(replacement) = &suggestion.replacement {
                    out.push_str(&format!("\n        try: {}", replacement));
                }
            }
        }
        out
    }

    /// 使用 ariadne 渲染带源码标注的报告
    pub fn render_with_source(&self, diagnostic: &Diagnostic, source: &str) -> String {
        let range = diagnostic
            .span
            .map(|s| s.to_range(source))
            .unwrap_or(0..0);

        let (kind, color) = match diagnostic.level {
            DiagnosticLevel::Error => (ReportKind::Error, Color::Red),
            DiagnosticLevel::Warning => (ReportKind::Warning, Color::Yellow),
            DiagnosticLevel::Info | DiagnosticLevel::Hint => (ReportKind::Advice, Color::Blue),
        };

        let mut builder = Report::build(kind, (), range.start)
            .with_config(Config::default().with_color(self.use_colors))
            .with_message(&diagnostic.message)
            .with_label(
                Label::new(range)
                    .with_message(&diagnostic.message)
                    .with_color(color),
            );
        if let Some(code) = &diagnostic.code {
            builder = builder.with_code(code);
        }
        for note in &diagnostic.notes {
            builder = builder.with_note(note);
        }
        for suggestion in &diagnostic.suggestions {
            builder = builder.with_help(&suggestion.message);
        }

        let mut buf = Vec::new();
        if builder.finish().write(Source::from(source), &mut buf).is_err() {
            return self.render(diagnostic);
        }
        String::from_utf8_lossy(&buf).into_owned()
    }
}
