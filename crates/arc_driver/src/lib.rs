//! Arc Compiler Driver
//!
//! 编译器驱动模块，串联所有编译阶段：
//! 分析 → 句柄校验 → 分层 → 外部后端
//!
//! 文本与图两种输入共用同一条管线，产出同样的 [`IR`]。
//! 分析阶段的错误全部收集后一起返回；环与悬空句柄这类结构错误直接中断。

pub mod backend;
pub mod error;
pub mod graph;
pub mod text;

pub use backend::{Backend, IrOnly, JsonBackend, JsonOptions, SourceParser};
pub use error::{BoxError, CompileError, CompileResult};
pub use graph::{Graph, GraphFunction, GraphNode};

use arc_diagnostics::DiagnosticSink;
use arc_ir::{Body, Function, IR};
use arc_sema::{
    Analyzer, AnalyzerConfig, CancellationToken, Cancelled, Resolver, ScopeTree, Symbol,
    SymbolKind,
};
use arc_syntax::ast::Program;
use std::sync::Arc;
use tracing::{info, instrument};

/// 编译选项
#[derive(Debug, Clone)]
pub struct CompileOptions {
    pub analyzer: AnalyzerConfig,
    pub cancel: CancellationToken,
    /// 关闭后跳过分层（只需要符号信息的 LSP 场景）
    pub stratify: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            analyzer: AnalyzerConfig::default(),
            cancel: CancellationToken::new(),
            stratify: true,
        }
    }
}

/// 编译产物：分层后的 IR 与后端输出
#[derive(Debug)]
pub struct Module<O> {
    pub ir: IR,
    pub output: O,
}

/// 分析文本程序
///
/// 总是返回尽可能完整的 IR，配合诊断给 LSP 使用。
/// 没有分析错误时继续做句柄校验和分层，失败也记入诊断。
///
/// # Errors
///
/// 仅在取消时返回 [`Cancelled`]
pub fn analyze_text(
    program: &Program,
    resolver: Option<Arc<dyn Resolver>>,
    options: &CompileOptions,
) -> Result<(IR, DiagnosticSink), Cancelled> {
    let (mut ir, mut sink) = build_text(program, resolver, options)?;
    check_structure(&mut ir, &mut sink, options);
    Ok((ir, sink))
}

/// 分析图输入，语义同 [`analyze_text`]
///
/// # Errors
///
/// 仅在取消时返回 [`Cancelled`]
pub fn analyze_graph(
    graph: &Graph,
    resolver: Option<Arc<dyn Resolver>>,
    options: &CompileOptions,
) -> Result<(IR, DiagnosticSink), Cancelled> {
    let (mut ir, mut sink) = build_graph(graph, resolver, options)?;
    check_structure(&mut ir, &mut sink, options);
    Ok((ir, sink))
}

/// 编译文本程序
///
/// # Example
/// ```
/// use arc_driver::{compile_text, CompileOptions, IrOnly};
/// use arc_sema::{MapResolver, Symbol};
/// use arc_syntax::ast::{Item, Program};
/// use arc_syntax::build::AstBuilder;
/// use arc_syntax::types::Type;
/// use std::sync::Arc;
///
/// let b = AstBuilder::new();
/// let program = Program {
///     items: vec![Item::Flow(b.pipe(vec![b.ident_node("ox_pt_1"), b.ident_node("ox_pt_2")]))],
/// };
/// let channels = MapResolver::new()
///     .with(Symbol::channel("ox_pt_1", 1, Type::F32))
///     .with(Symbol::channel("ox_pt_2", 2, Type::F32));
///
/// let module = compile_text(&program, Some(Arc::new(channels)), &CompileOptions::default(), &IrOnly, &())
///     .unwrap();
/// assert_eq!(module.ir.strata.len(), 2);
/// ```
#[instrument(skip_all)]
pub fn compile_text<B: Backend>(
    program: &Program,
    resolver: Option<Arc<dyn Resolver>>,
    options: &CompileOptions,
    backend: &B,
    backend_options: &B::Options,
) -> CompileResult<Module<B::Output>> {
    info!(items = program.items.len(), "compiling text program");
    let (ir, sink) = build_text(program, resolver, options)?;
    lower(ir, sink, options, backend, backend_options)
}

/// 编译图输入
#[instrument(skip_all)]
pub fn compile_graph<B: Backend>(
    graph: &Graph,
    resolver: Option<Arc<dyn Resolver>>,
    options: &CompileOptions,
    backend: &B,
    backend_options: &B::Options,
) -> CompileResult<Module<B::Output>> {
    info!(
        functions = graph.functions.len(),
        nodes = graph.nodes.len(),
        "compiling graph"
    );
    let (ir, sink) = build_graph(graph, resolver, options)?;
    lower(ir, sink, options, backend, backend_options)
}

/// 编译 JSON 格式的图
pub fn compile_graph_json<B: Backend>(
    json: &str,
    resolver: Option<Arc<dyn Resolver>>,
    options: &CompileOptions,
    backend: &B,
    backend_options: &B::Options,
) -> CompileResult<Module<B::Output>> {
    let graph = Graph::from_json(json)?;
    compile_graph(&graph, resolver, options, backend, backend_options)
}

/// 用外部解析器解析源码后编译
pub fn compile_source<P: SourceParser, B: Backend>(
    source: &str,
    parser: &P,
    resolver: Option<Arc<dyn Resolver>>,
    options: &CompileOptions,
    backend: &B,
    backend_options: &B::Options,
) -> CompileResult<Module<B::Output>> {
    // 1. 解析
    let program = parser
        .parse(source)
        .map_err(|e| CompileError::Parse(Box::new(e)))?;

    // 2. 分析、分层与代码生成
    compile_text(&program, resolver, options, backend, backend_options)
}

fn build_text(
    program: &Program,
    resolver: Option<Arc<dyn Resolver>>,
    options: &CompileOptions,
) -> Result<(IR, DiagnosticSink), Cancelled> {
    let mut analyzer = Analyzer::new(resolver, options.analyzer.clone());
    analyzer.analyze_program(program, &options.cancel)?;
    let ir = text::build_ir(&mut analyzer, program, &options.cancel)?;
    Ok(finish(analyzer, ir))
}

fn build_graph(
    graph: &Graph,
    resolver: Option<Arc<dyn Resolver>>,
    options: &CompileOptions,
) -> Result<(IR, DiagnosticSink), Cancelled> {
    let mut analyzer = Analyzer::new(resolver, options.analyzer.clone());
    let ir = graph::build_ir(&mut analyzer, graph, &options.cancel)?;
    Ok(finish(analyzer, ir))
}

/// 诊断在交出作用域树之前生成（提示需要查询树）
fn finish(analyzer: Analyzer, mut ir: IR) -> (IR, DiagnosticSink) {
    let sink = analyzer.diagnostics();
    let (tree, _) = analyzer.into_parts();
    ir.symbols = Some(tree);
    (ir, sink)
}

fn check_structure(ir: &mut IR, sink: &mut DiagnosticSink, options: &CompileOptions) {
    if !sink.ok() {
        return;
    }
    if let Err(e) = ir.validate_handles() {
        CompileError::from(e).collect_to_sink(sink);
        return;
    }
    if options.stratify {
        if let Err(e) = arc_stratifier::stratify_ir(ir) {
            CompileError::from(e).collect_to_sink(sink);
        }
    }
}

fn lower<B: Backend>(
    mut ir: IR,
    sink: DiagnosticSink,
    options: &CompileOptions,
    backend: &B,
    backend_options: &B::Options,
) -> CompileResult<Module<B::Output>> {
    // 1. 分析错误
    if !sink.ok() {
        return Err(CompileError::Diagnostics(sink));
    }

    // 2. 结构校验
    ir.validate_handles()?;

    // 3. 分层
    options.cancel.check()?;
    if options.stratify {
        arc_stratifier::stratify_ir(&mut ir)?;
    }

    // 4. 代码生成
    options.cancel.check()?;
    let output = backend
        .compile(&ir, backend_options)
        .map_err(|e| CompileError::Backend(Box::new(e)))?;

    info!(
        nodes = ir.nodes.len(),
        edges = ir.edges.len(),
        strata = ir.strata.len(),
        "compilation finished"
    );
    Ok(Module { ir, output })
}

/// 根作用域下的函数（用户函数与合成的表达式函数），按声明顺序
pub(crate) fn functions_from_tree(
    tree: &ScopeTree,
    mut body_of: impl FnMut(&Symbol) -> Option<Body>,
) -> Vec<Function> {
    tree.filter_children_by_kind(tree.root(), SymbolKind::Function)
        .into_iter()
        .map(|scope| {
            let symbol = tree.symbol(scope);
            let sig = symbol.ty.as_function().cloned().unwrap_or_default();
            let mut function = Function::new(&symbol.name, &sig);
            function.channels = tree.channels(scope).clone();
            function.body = body_of(symbol);
            function
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use arc_sema::MapResolver;
    use arc_syntax::ast::{BinaryOp, Item};
    use arc_syntax::build::AstBuilder;
    use arc_syntax::types::Type;

    fn channels() -> Option<Arc<dyn Resolver>> {
        Some(Arc::new(
            MapResolver::new()
                .with(Symbol::channel("ox_pt_1", 1, Type::F32))
                .with(Symbol::channel("ox_pt_doubled", 2, Type::F32)),
        ))
    }

    fn doubling_program(b: &AstBuilder) -> Program {
        let calc = b.function(
            "calc",
            vec![],
            vec![b.param("val", Type::F32)],
            b.output(Type::F32),
            vec![b.ret(b.binary(b.ident("val"), BinaryOp::Mul, b.int(2)))],
        );
        let flow = b.pipe(vec![
            b.ident_node("ox_pt_1"),
            b.invoke("calc"),
            b.ident_node("ox_pt_doubled"),
        ]);
        Program {
            items: vec![Item::Function(calc), Item::Flow(flow)],
        }
    }

    #[test]
    fn test_compile_to_json() {
        let b = AstBuilder::new();
        let result = compile_text(
            &doubling_program(&b),
            channels(),
            &CompileOptions::default(),
            &JsonBackend,
            &JsonOptions::default(),
        );
        assert!(result.is_ok(), "Compilation failed: {:?}", result.err());

        let module = result.unwrap();
        let json: serde_json::Value = serde_json::from_str(&module.output).unwrap();
        assert_eq!(json["nodes"].as_array().map(Vec::len), Some(3));
        assert_eq!(json["strata"].as_array().map(Vec::len), Some(3));
        assert_eq!(json["functions"][0]["key"], "calc");
    }

    #[test]
    fn test_diagnostics_abort_before_backend() {
        let b = AstBuilder::new();
        let program = Program {
            items: vec![Item::Flow(b.pipe(vec![b.ident_node("ox_pt_1"), b.invoke("missing")]))],
        };
        let err = compile_text(&program, channels(), &CompileOptions::default(), &IrOnly, &())
            .unwrap_err();
        match err {
            CompileError::Diagnostics(sink) => assert_eq!(sink.error_count(), 1),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_analyze_keeps_partial_ir() {
        let b = AstBuilder::new();
        let program = Program {
            items: vec![Item::Flow(b.pipe(vec![
                b.ident_node("ox_pt_1"),
                b.invoke("missing"),
                b.ident_node("ox_pt_doubled"),
            ]))],
        };
        let (ir, sink) = analyze_text(&program, channels(), &CompileOptions::default()).unwrap();
        assert!(!sink.ok());
        // 失败的调用被跳过，兄弟节点照常生成
        assert_eq!(ir.nodes.len(), 2);
        assert!(ir.edges.is_empty());
        assert!(ir.strata.is_empty());
        assert!(ir.symbols.is_some());
    }

    #[test]
    fn test_stratify_can_be_disabled() {
        let b = AstBuilder::new();
        let options = CompileOptions {
            stratify: false,
            ..CompileOptions::default()
        };
        let (ir, sink) = analyze_text(&doubling_program(&b), channels(), &options).unwrap();
        assert!(sink.ok());
        assert_eq!(ir.nodes.len(), 3);
        assert!(ir.strata.is_empty());
    }
}
