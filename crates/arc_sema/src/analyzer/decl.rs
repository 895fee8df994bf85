use super::Analyzer;
use crate::scope::ScopeId;
use crate::symbol::{Symbol, SymbolKind};
use arc_syntax::ast::{AstRef, Block, FunctionDecl, Item, ParamDecl, SequenceDecl};
use arc_syntax::types::{FunctionType, Param, Type};
use tracing::debug;

/// 收集顶层声明（Pass 1）
pub fn collect_item(analyzer: &mut Analyzer, item: &Item) {
    match item {
        Item::Function(func) => {
            debug!(name = %func.name, "collect function");
            declare_function_decl(analyzer, func);
        }
        Item::Sequence(seq) => {
            debug!(name = %seq.name, stages = seq.stages.len(), "collect sequence");
            declare_sequence(analyzer, seq);
        }
        Item::Flow(_) => {}
    }
}

/// 解析声明体（Pass 2）
pub fn resolve_item(analyzer: &mut Analyzer, item: &Item) {
    let root = analyzer.tree.root();
    match item {
        Item::Function(func) => {
            // 声明失败（重名）时跳过函数体
            if let Some(scope) = analyzer.tree.child_by_ast(root, func.id) {
                analyze_function_body(analyzer, scope, &func.body);
            }
        }
        Item::Sequence(seq) => {
            for stage in &seq.stages {
                // 声明失败的阶段不生成节点，其中的表达式也不登记
                if analyzer.tree.child_by_ast(root, stage.id).is_none() {
                    continue;
                }
                for flow in &stage.flows {
                    analyzer.analyze_flow(flow);
                }
            }
        }
        Item::Flow(flow) => analyzer.analyze_flow(flow),
    }
}

fn declare_function_decl(analyzer: &mut Analyzer, func: &FunctionDecl) -> Option<ScopeId> {
    let root = analyzer.tree.root();
    let ast = Some(AstRef::new(func.id, func.span));
    let scope = declare_function(analyzer, root, &func.name, &func.signature(), ast)?;

    let with_ast = |params: &[ParamDecl]| -> Vec<(Param, Option<AstRef>)> {
        params
            .iter()
            .map(|p| (p.to_param(), Some(AstRef::new(p.id, p.span))))
            .collect()
    };
    declare_params(analyzer, scope, with_ast(&func.config), SymbolKind::Config);
    declare_params(analyzer, scope, with_ast(&func.inputs), SymbolKind::Input);
    declare_params(analyzer, scope, with_ast(&func.outputs), SymbolKind::Output);
    Some(scope)
}

impl Analyzer {
    /// 登记一个函数（图输入等没有参数 AST 的场景）
    ///
    /// 参数按 config、inputs、outputs 的顺序添加，依次获得 ID
    pub fn declare_function(
        &mut self,
        parent: ScopeId,
        name: &str,
        sig: &FunctionType,
        ast: Option<AstRef>,
    ) -> Option<ScopeId> {
        let scope = declare_function(self, parent, name, sig, ast)?;
        let plain = |params: &arc_syntax::Params| -> Vec<(Param, Option<AstRef>)> {
            params.iter().map(|p| (p.clone(), None)).collect()
        };
        declare_params(self, scope, plain(&sig.config), SymbolKind::Config);
        declare_params(self, scope, plain(&sig.inputs), SymbolKind::Input);
        declare_params(self, scope, plain(&sig.outputs), SymbolKind::Output);
        Some(scope)
    }
}

fn declare_function(
    analyzer: &mut Analyzer,
    parent: ScopeId,
    name: &str,
    sig: &FunctionType,
    ast: Option<AstRef>,
) -> Option<ScopeId> {
    let mut symbol = Symbol::new(name, SymbolKind::Function, Type::function(sig.clone()));
    symbol.ast = ast;
    match analyzer.tree.add(parent, symbol) {
        Ok(scope) => {
            analyzer.tree.accumulate_read_channels(scope);
            Some(scope)
        }
        Err(e) => {
            analyzer.report(e);
            None
        }
    }
}

fn declare_params(
    analyzer: &mut Analyzer,
    func: ScopeId,
    params: Vec<(Param, Option<AstRef>)>,
    kind: SymbolKind,
) {
    for (param, ast) in params {
        let mut symbol = Symbol::new(param.name, kind, param.ty);
        symbol.ast = ast;
        symbol.default_value = param.value;
        if let Err(e) = analyzer.tree.add(func, symbol) {
            analyzer.report(e);
        }
    }
}

fn declare_sequence(analyzer: &mut Analyzer, seq: &SequenceDecl) {
    let root = analyzer.tree.root();
    let symbol = Symbol::new(&seq.name, SymbolKind::Sequence, Type::Invalid)
        .with_ast(AstRef::new(seq.id, seq.span));
    let scope = match analyzer.tree.add(root, symbol) {
        Ok(scope) => scope,
        Err(e) => {
            analyzer.report(e);
            return;
        }
    };

    // 所有阶段先登记，阶段之间可以前向引用
    for stage in &seq.stages {
        let symbol = Symbol::new(&stage.name, SymbolKind::Stage, Type::Invalid)
            .with_ast(AstRef::new(stage.id, stage.span));
        if let Err(e) = analyzer.tree.add(scope, symbol) {
            analyzer.report(e);
        }
    }
}

/// 函数体：函数作用域下再开一个 Block 作用域
pub fn analyze_function_body(analyzer: &mut Analyzer, func: ScopeId, body: &Block) {
    analyzer.analyze_block(func, body);
}

#[cfg(test)]
mod tests {
    use crate::analyzer::Analyzer;
    use crate::cancel::CancellationToken;
    use crate::config::AnalyzerConfig;
    use crate::error::SemanticError;
    use crate::resolver::MapResolver;
    use crate::symbol::{Symbol, SymbolKind};
    use arc_syntax::ast::{BinaryOp, Item, Program};
    use arc_syntax::build::AstBuilder;
    use arc_syntax::types::Type;
    use std::sync::Arc;

    fn analyze(program: &Program) -> Analyzer {
        let globals = MapResolver::new()
            .with(Symbol::channel("ox_pt_1", 1, Type::F32))
            .with(Symbol::channel("ox_pt_doubled", 2, Type::F32));
        let mut analyzer = Analyzer::new(Some(Arc::new(globals)), AnalyzerConfig::default());
        analyzer
            .analyze_program(program, &CancellationToken::new())
            .unwrap();
        analyzer
    }

    #[test]
    fn test_function_params_get_ids_in_order() {
        let b = AstBuilder::new();
        let func = b.function(
            "scale",
            vec![b.param("factor", Type::F32)],
            vec![b.param("val", Type::F32)],
            b.output(Type::F32),
            vec![b.ret(b.binary(b.ident("val"), BinaryOp::Mul, b.ident("factor")))],
        );
        let program = Program {
            items: vec![Item::Function(func)],
        };

        let analyzer = analyze(&program);
        assert!(analyzer.errors().is_empty(), "{:?}", analyzer.errors());

        let tree = analyzer.tree();
        let scope = tree.find_child_by_name(tree.root(), "scale").unwrap();
        let ids: Vec<_> = tree
            .children(scope)
            .iter()
            .filter_map(|&c| tree.symbol(c).id)
            .collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert_eq!(
            tree.first_child_of_kind(scope, SymbolKind::Block).map(|b| tree.symbol(b).kind),
            Some(SymbolKind::Block)
        );
    }

    #[test]
    fn test_duplicate_function_reported() {
        let b = AstBuilder::new();
        let program = Program {
            items: vec![
                Item::Function(b.at(1, 1).function("f", vec![], vec![], vec![], vec![])),
                Item::Function(b.at(5, 1).function("f", vec![], vec![], vec![], vec![])),
            ],
        };
        let analyzer = analyze(&program);
        assert_eq!(analyzer.errors().len(), 1);
        assert!(matches!(
            &analyzer.errors()[0],
            SemanticError::NameConflict { previous, .. } if previous.start.line == 1
        ));
    }

    #[test]
    fn test_sequence_and_stages_declared() {
        let b = AstBuilder::new();
        let seq = b.sequence("main", vec![b.stage("first", vec![]), b.stage("second", vec![])]);
        let program = Program {
            items: vec![Item::Sequence(seq)],
        };
        let analyzer = analyze(&program);
        let tree = analyzer.tree();
        let seq = tree.find_child_by_name(tree.root(), "main").unwrap();
        assert_eq!(tree.filter_children_by_kind(seq, SymbolKind::Stage).len(), 2);
    }

    #[test]
    fn test_cancelled_before_first_item() {
        let b = AstBuilder::new();
        let program = Program {
            items: vec![Item::Function(b.function("f", vec![], vec![], vec![], vec![]))],
        };
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut analyzer = Analyzer::new(None, AnalyzerConfig::default());
        assert!(analyzer.analyze_program(&program, &cancel).is_err());
        assert_eq!(analyzer.tree().len(), 1);
    }
}
