//! External Collaborators
//!
//! 解析器与字节码/WASM 编译器都在本仓库之外，这里只定义接口。

use arc_ir::IR;
use arc_syntax::ast::Program;
use std::convert::Infallible;
use std::error::Error as StdError;

/// 外部的 IR 编译器
pub trait Backend {
    type Output;
    type Error: StdError + Send + Sync + 'static;
    /// 后端特有的编译选项
    type Options;

    fn compile(&self, ir: &IR, options: &Self::Options) -> Result<Self::Output, Self::Error>;
}

/// 外部的源码解析器
pub trait SourceParser {
    type Error: StdError + Send + Sync + 'static;

    fn parse(&self, source: &str) -> Result<Program, Self::Error>;
}

/// 不生成代码，只保留 IR（LSP 与测试使用）
#[derive(Debug, Clone, Copy, Default)]
pub struct IrOnly;

impl Backend for IrOnly {
    type Output = ();
    type Error = Infallible;
    type Options = ();

    fn compile(&self, _ir: &IR, _options: &()) -> Result<(), Infallible> {
        Ok(())
    }
}

/// 把 IR 序列化为 JSON，交给进程外的编译器
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBackend;

/// JSON 输出选项
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonOptions {
    pub pretty: bool,
}

impl Backend for JsonBackend {
    type Output = String;
    type Error = serde_json::Error;
    type Options = JsonOptions;

    fn compile(&self, ir: &IR, options: &JsonOptions) -> Result<String, serde_json::Error> {
        if options.pretty {
            serde_json::to_string_pretty(ir)
        } else {
            serde_json::to_string(ir)
        }
    }
}
