//! Text Analysis
//!
//! 把流语句、序列与阶段声明转换为节点和边。
//!
//! 函数体与流中的内联表达式已经由 [`Analyzer::analyze_program`] 处理，
//! 这里复用同一棵作用域树，错误也记录到同一个分析器里。
//!
//! 处理顺序：
//! 1. 为所有序列登记阶段与 `stage_entry` 节点（阶段之间可以前向引用）
//! 2. 按源码顺序处理顶层流语句和阶段体
//! 3. 从作用域树收集函数表

use crate::functions_from_tree;
use arc_diagnostics::Span;
use arc_ir::{
    kind, Body, Edge, KeyGenerator, Node, Sequence, Stage, Value, ACTIVATE_PARAM, IR,
};
use arc_sema::{Analyzer, CancellationToken, Cancelled, ScopeId, SemanticError, SymbolKind};
use arc_syntax::ast::{
    ConfigValues, Expr, FlowItem, FlowNode, FlowNodeKind, FlowOperator, FlowStatement, Item,
    NodeId, Program, RoutingTable, SequenceDecl,
};
use arc_syntax::types::{FunctionType, Param};
use std::collections::{HashMap, HashSet};
use tracing::{debug, instrument, trace};

/// 从已分析的程序构建节点和边
///
/// 分析错误不会中断构建，返回的 IR 尽可能完整（LSP 需要）
///
/// # Errors
///
/// 仅在取消时返回 [`Cancelled`]
#[instrument(skip_all, fields(items = program.items.len()))]
pub fn build_ir(
    analyzer: &mut Analyzer,
    program: &Program,
    cancel: &CancellationToken,
) -> Result<IR, Cancelled> {
    let mut builder = FlowBuilder::new(analyzer);
    builder.declare_sequences(program);

    let root = builder.analyzer.tree().root();
    for item in &program.items {
        cancel.check()?;
        match item {
            Item::Flow(flow) => builder.flow(FlowContext::top_level(root), flow),
            Item::Sequence(seq) => builder.sequence(seq),
            Item::Function(_) => {}
        }
    }

    builder.collect_functions(program);
    debug!(
        nodes = builder.ir.nodes.len(),
        edges = builder.ir.edges.len(),
        sequences = builder.ir.sequences.len(),
        "flows built"
    );
    Ok(builder.ir)
}

/// 流语句所在的位置
#[derive(Debug, Clone, Copy)]
struct FlowContext {
    /// 名称解析的起点
    scope: ScopeId,
    /// 所在阶段：(序列下标, 阶段下标)
    stage: Option<(usize, usize)>,
}

impl FlowContext {
    fn top_level(root: ScopeId) -> Self {
        Self { scope: root, stage: None }
    }
}

/// 已处理节点的连接点
#[derive(Debug, Clone)]
struct Endpoint {
    node: String,
    input: Option<String>,
    output: Option<String>,
}

impl Endpoint {
    fn of(node: &Node) -> Self {
        Self {
            node: node.key.clone(),
            input: node.default_input().map(str::to_string),
            output: node.default_output().map(str::to_string),
        }
    }

    /// 阶段入口：只能作为目标
    fn entry(key: impl Into<String>) -> Self {
        Self {
            node: key.into(),
            input: Some(ACTIVATE_PARAM.to_string()),
            output: None,
        }
    }
}

struct FlowBuilder<'a> {
    analyzer: &'a mut Analyzer,
    keys: KeyGenerator,
    ir: IR,
    used_keys: HashSet<String>,
    /// 阶段声明 -> (序列下标, 阶段下标)
    stages: HashMap<NodeId, (usize, usize)>,
}

impl<'a> FlowBuilder<'a> {
    fn new(analyzer: &'a mut Analyzer) -> Self {
        Self {
            analyzer,
            keys: KeyGenerator::new(),
            ir: IR::new(),
            used_keys: HashSet::new(),
            stages: HashMap::new(),
        }
    }

    fn report(&mut self, error: SemanticError) {
        self.analyzer.report(error);
    }

    fn invalid_flow(&mut self, reason: impl Into<String>, span: Span) {
        self.report(SemanticError::InvalidFlow {
            reason: reason.into(),
            span: Some(span),
        });
    }

    // ============ 序列与阶段 ============

    fn declare_sequences(&mut self, program: &Program) {
        let root = self.analyzer.tree().root();
        for item in &program.items {
            let Item::Sequence(decl) = item else {
                continue;
            };
            // 声明失败（重名）的序列已经报告过
            if self.analyzer.tree().child_by_ast(root, decl.id).is_none() {
                continue;
            }
            let si = self.ir.sequences.len();
            let mut sequence = Sequence::new(&decl.name);
            for stage in &decl.stages {
                if self.analyzer.tree().child_by_ast(root, stage.id).is_none() {
                    continue;
                }
                let entry = KeyGenerator::stage_entry(&decl.name, &stage.name);
                self.used_keys.insert(entry.clone());
                self.ir.nodes.push(Node::stage_entry(&entry));
                self.stages.insert(stage.id, (si, sequence.stages.len()));
                sequence.stages.push(Stage::new(&stage.name, entry));
            }
            self.ir.sequences.push(sequence);
        }
    }

    fn sequence(&mut self, decl: &SequenceDecl) {
        let root = self.analyzer.tree().root();
        for stage in &decl.stages {
            let Some(&position) = self.stages.get(&stage.id) else {
                continue;
            };
            let Some(scope) = self.analyzer.tree().child_by_ast(root, stage.id) else {
                continue;
            };
            trace!(sequence = %decl.name, stage = %stage.name, "stage body");
            let ctx = FlowContext {
                scope,
                stage: Some(position),
            };
            for flow in &stage.flows {
                self.flow(ctx, flow);
            }
        }
    }

    fn stage_entry_for(&self, stage_scope: ScopeId) -> Option<String> {
        let tree = self.analyzer.tree();
        let sequence = tree.parent(stage_scope)?;
        Some(KeyGenerator::stage_entry(
            &tree.symbol(sequence).name,
            &tree.symbol(stage_scope).name,
        ))
    }

    /// `=>` 指向同序列的阶段时记为本阶段的转移
    fn record_transition(&mut self, ctx: FlowContext, target: &str) {
        let Some((si, ti)) = ctx.stage else {
            return;
        };
        let sequence = &mut self.ir.sequences.0[si];
        let Some(next) = sequence
            .stages
            .iter()
            .find(|s| s.entry == target)
            .map(|s| s.key.clone())
        else {
            return;
        };
        let transitions = &mut sequence.stages[ti].transitions;
        if !transitions.contains(&next) {
            transitions.push(next);
        }
    }

    // ============ 流语句 ============

    fn flow(&mut self, ctx: FlowContext, flow: &FlowStatement) {
        if flow.items.len() < 2 {
            self.invalid_flow("flow statement requires at least two nodes", flow.span);
            return;
        }

        let last = flow.items.len() - 1;
        let mut prev: Option<Endpoint> = None;
        for (i, item) in flow.items.iter().enumerate() {
            let op = i
                .checked_sub(1)
                .and_then(|j| flow.operators.get(j))
                .copied()
                .unwrap_or(FlowOperator::Continuous);
            match item {
                FlowItem::Node(node) => {
                    let current = self.flow_node(ctx, node, i == last);
                    if let (Some(source), Some(target)) = (&prev, &current) {
                        self.connect(ctx, source, target, op, node.span);
                    }
                    prev = current;
                }
                FlowItem::Routing(table) => {
                    if i == 0 {
                        self.invalid_flow("input routing tables are not supported", table.span);
                    } else if matches!(flow.items[i - 1], FlowItem::Routing(_)) {
                        self.invalid_flow("routing table must follow a node", table.span);
                    }
                    self.routing(ctx, prev.as_ref(), table, op);
                    // 路由表之后没有单一的上游
                    prev = None;
                }
            }
        }
    }

    /// 输出路由表：每个条目从上游节点的指定输出出发，是一条独立的链
    fn routing(
        &mut self,
        ctx: FlowContext,
        source: Option<&Endpoint>,
        table: &RoutingTable,
        op: FlowOperator,
    ) {
        for entry in &table.entries {
            let mut prev = None;
            if let Some(source) = source {
                let has_output = self
                    .ir
                    .find_node(&source.node)
                    .is_some_and(|n| n.outputs.contains_key(&entry.output));
                if has_output {
                    prev = Some(Endpoint {
                        output: Some(entry.output.clone()),
                        ..source.clone()
                    });
                } else {
                    self.report(SemanticError::UnknownOutput {
                        node: source.node.clone(),
                        output: entry.output.clone(),
                        span: Some(entry.span),
                    });
                }
            }

            let last = entry.nodes.len().saturating_sub(1);
            for (j, node) in entry.nodes.iter().enumerate() {
                let mut current = self.flow_node(ctx, node, j == last);
                if let (true, Some(param), Some(target)) =
                    (j == last, &entry.target_param, current.as_mut())
                {
                    let has_input = self
                        .ir
                        .find_node(&target.node)
                        .is_some_and(|n| n.inputs.contains_key(param));
                    if !has_input {
                        self.report(SemanticError::UnknownInput {
                            node: target.node.clone(),
                            input: param.clone(),
                            span: Some(entry.span),
                        });
                        prev = None;
                        continue;
                    }
                    target.input = Some(param.clone());
                }
                if let (Some(source), Some(target)) = (&prev, &current) {
                    let op = if j == 0 { op } else { FlowOperator::Continuous };
                    self.connect(ctx, source, target, op, node.span);
                }
                prev = current;
            }
        }
    }

    fn connect(
        &mut self,
        ctx: FlowContext,
        source: &Endpoint,
        target: &Endpoint,
        op: FlowOperator,
        span: Span,
    ) {
        let Some(output) = source.output.as_deref() else {
            self.invalid_flow(format!("node '{}' has no output", source.node), span);
            return;
        };
        let Some(input) = target.input.as_deref() else {
            self.invalid_flow(format!("node '{}' accepts no input", target.node), span);
            return;
        };
        let source = arc_ir::Handle::new(&source.node, output);
        let target = arc_ir::Handle::new(&target.node, input);
        let edge = match op {
            FlowOperator::Continuous => Edge::continuous(source, target),
            FlowOperator::Transition => Edge::one_shot(source, target),
        };
        self.push_edge(ctx, edge, span);
    }

    /// 同一输入端口至多一条持续边，追加时检查
    fn push_edge(&mut self, ctx: FlowContext, edge: Edge, span: Span) {
        if edge.is_continuous()
            && self
                .ir
                .edges
                .iter()
                .any(|e| e.is_continuous() && e.target == edge.target)
        {
            self.report(SemanticError::DuplicateProducer {
                node: edge.target.node,
                param: edge.target.param,
                span: Some(span),
            });
            return;
        }
        if !edge.is_continuous() {
            self.record_transition(ctx, &edge.target.node);
        }
        trace!(%edge, "edge");
        self.ir.edges.push(edge);
    }

    fn push_node(&mut self, ctx: FlowContext, node: Node, span: Span) -> Option<Endpoint> {
        if !self.used_keys.insert(node.key.clone()) {
            self.report(SemanticError::DuplicateNodeKey {
                key: node.key,
                span: Some(span),
            });
            return None;
        }
        let endpoint = Endpoint::of(&node);
        if let Some((si, ti)) = ctx.stage {
            self.ir.sequences.0[si].stages[ti].nodes.push(node.key.clone());
        }
        self.ir.nodes.push(node);
        Some(endpoint)
    }

    // ============ 流节点 ============

    fn flow_node(&mut self, ctx: FlowContext, node: &FlowNode, sink: bool) -> Option<Endpoint> {
        match &node.kind {
            FlowNodeKind::Identifier(name) => self.identifier(ctx, name, node.span, sink),
            FlowNodeKind::Invocation { callee, config } => {
                self.invocation(ctx, callee, config, node.span)
            }
            FlowNodeKind::Expression(expr) => self.expression(ctx, node.id, expr, node.span),
            FlowNodeKind::Next => self.next(ctx, node.span),
        }
    }

    fn identifier(
        &mut self,
        ctx: FlowContext,
        name: &str,
        span: Span,
        sink: bool,
    ) -> Option<Endpoint> {
        let resolved = match self.analyzer.tree_mut().resolve(ctx.scope, name) {
            Ok(resolved) => resolved,
            Err(e) => {
                self.report(e.at(span));
                return None;
            }
        };
        let symbol = resolved.symbol;

        if symbol.is_channel() {
            let Some(channel) = symbol.channel_id() else {
                self.invalid_flow(format!("channel '{}' has no id", name), span);
                return None;
            };
            // 链尾的通道是写入，其余位置是读取
            let node = if sink {
                Node::write(self.keys.next(kind::WRITE), channel, &symbol.name, symbol.ty.elem())
            } else {
                Node::on(self.keys.next(kind::ON), channel, &symbol.name, symbol.ty.elem())
            };
            return self.push_node(ctx, node, span);
        }

        match symbol.kind {
            SymbolKind::Stage => match resolved.scope.and_then(|s| self.stage_entry_for(s)) {
                Some(entry) => Some(Endpoint::entry(entry)),
                None => {
                    self.invalid_flow(format!("stage '{}' has no entry", name), span);
                    None
                }
            },
            SymbolKind::Sequence => {
                let tree = self.analyzer.tree();
                let first = resolved
                    .scope
                    .and_then(|s| tree.first_child_of_kind(s, SymbolKind::Stage));
                match first.and_then(|s| self.stage_entry_for(s)) {
                    Some(entry) => Some(Endpoint::entry(entry)),
                    None => {
                        self.report(SemanticError::EmptySequence {
                            name: name.to_string(),
                            span: Some(span),
                        });
                        None
                    }
                }
            }
            SymbolKind::Function => self.invocation(ctx, name, &ConfigValues::default(), span),
            other => {
                self.invalid_flow(
                    format!("'{}' is a {} and cannot be used in a flow", name, other),
                    span,
                );
                None
            }
        }
    }

    fn invocation(
        &mut self,
        ctx: FlowContext,
        callee: &str,
        config: &ConfigValues,
        span: Span,
    ) -> Option<Endpoint> {
        let Ok(resolved) = self.analyzer.tree_mut().resolve(ctx.scope, callee) else {
            self.report(SemanticError::UnresolvedInvocation {
                name: callee.to_string(),
                scope: Some(ctx.scope),
                span: Some(span),
            });
            return None;
        };
        if resolved.symbol.kind != SymbolKind::Function {
            self.report(SemanticError::NotCallable {
                name: callee.to_string(),
                kind: resolved.symbol.kind.to_string(),
                span: Some(span),
            });
            return None;
        }

        let sig = resolved.symbol.ty.as_function().cloned().unwrap_or_default();
        let mut node = Node::invocation(self.keys.next(callee), callee, &sig.inputs, &sig.outputs);
        if let Some(scope) = resolved.scope {
            node.channels = self.analyzer.tree().channels(scope).clone();
        }
        self.apply_config(ctx, &mut node, callee, &sig, config, span);
        self.push_node(ctx, node, span)
    }

    /// 按名称或位置把调用的配置值对应到被调函数的 config 参数
    fn apply_config(
        &mut self,
        ctx: FlowContext,
        node: &mut Node,
        callee: &str,
        sig: &FunctionType,
        values: &ConfigValues,
        span: Span,
    ) {
        let mut supplied: Vec<(&Param, &Expr, Span)> = Vec::new();
        match values {
            ConfigValues::Named(values) => {
                for value in values {
                    match sig.config.get(&value.name) {
                        Some(param) => supplied.push((param, &value.value, value.span)),
                        None => self.report(SemanticError::UnknownConfig {
                            function: callee.to_string(),
                            param: value.name.clone(),
                            span: Some(value.span),
                        }),
                    }
                }
            }
            ConfigValues::Positional(values) => {
                for (i, value) in values.iter().enumerate() {
                    match sig.config.iter().nth(i) {
                        Some(param) => supplied.push((param, value, value.span)),
                        None => self.report(SemanticError::InvalidConfig {
                            function: callee.to_string(),
                            param: format!("#{}", i),
                            reason: format!(
                                "expected at most {} config value(s)",
                                sig.config.len()
                            ),
                            span: Some(value.span),
                        }),
                    }
                }
            }
        }

        let mut seen = HashSet::new();
        for (param, value, value_span) in supplied {
            seen.insert(param.name.as_str());
            match self.config_value(ctx, param, value) {
                Ok((value, read)) => {
                    if let Some((id, name)) = read {
                        node.channels.add_read(id, name);
                    }
                    node.config.insert(param.name.clone(), value);
                }
                Err(reason) => self.report(SemanticError::InvalidConfig {
                    function: callee.to_string(),
                    param: param.name.clone(),
                    reason,
                    span: Some(value_span),
                }),
            }
        }

        for param in &sig.config {
            if seen.contains(param.name.as_str()) {
                continue;
            }
            match &param.value {
                Some(default) => {
                    node.config.insert(param.name.clone(), Value::from(default));
                }
                None => self.report(SemanticError::MissingConfig {
                    function: callee.to_string(),
                    param: param.name.clone(),
                    span: Some(span),
                }),
            }
        }
    }

    /// `chan` 参数接受通道名（记为读取），其他参数只接受字面量
    fn config_value(
        &mut self,
        ctx: FlowContext,
        param: &Param,
        value: &Expr,
    ) -> Result<(Value, Option<(u32, String)>), String> {
        if param.ty.is_chan() {
            let name = value
                .as_identifier()
                .ok_or_else(|| "expected a channel name".to_string())?;
            let resolved = self
                .analyzer
                .tree_mut()
                .resolve(ctx.scope, name)
                .map_err(|e| e.to_string())?;
            return match resolved.symbol.channel_id() {
                Some(id) if resolved.symbol.is_channel() => {
                    Ok((Value::Channel(id), Some((id, resolved.symbol.name))))
                }
                _ => Err(format!("'{}' is not a channel", name)),
            };
        }
        value
            .as_literal()
            .map(|lit| (Value::from(lit), None))
            .ok_or_else(|| "config values must be literals".to_string())
    }

    fn expression(
        &mut self,
        ctx: FlowContext,
        id: NodeId,
        expr: &Expr,
        span: Span,
    ) -> Option<Endpoint> {
        if let Some(lit) = expr.as_literal() {
            let node = Node::constant(self.keys.next(kind::CONSTANT), Value::from(lit), lit.ty());
            return self.push_node(ctx, node, span);
        }

        // 表达式函数在分析阶段登记；分析失败时没有对应作用域
        let (name, sig, channels) = {
            let tree = self.analyzer.tree();
            let scope = tree.child_by_ast(tree.root(), id)?;
            let symbol = tree.symbol(scope);
            let sig = symbol.ty.as_function().cloned().unwrap_or_default();
            (symbol.name.clone(), sig, tree.channels(scope).clone())
        };
        // 节点键与其他调用共用同一个生成器，函数名本身可能已被用户函数的节点占用
        let mut node = Node::invocation(self.keys.next(&name), &name, &sig.inputs, &sig.outputs);
        node.channels = channels;
        self.push_node(ctx, node, span)
    }

    fn next(&mut self, ctx: FlowContext, span: Span) -> Option<Endpoint> {
        let Some((si, ti)) = ctx.stage else {
            self.report(SemanticError::NextOutsideSequence { span: Some(span) });
            return None;
        };
        let sequence = &self.ir.sequences.0[si];
        let stage = &sequence.stages[ti];
        if let Some(next) = sequence.following_stage(&stage.key) {
            return Some(Endpoint::entry(next.entry.clone()));
        }
        let error = SemanticError::NoNextStage {
            stage: stage.key.clone(),
            sequence: sequence.key.clone(),
            span: Some(span),
        };
        self.report(error);
        None
    }

    // ============ 函数表 ============

    fn collect_functions(&mut self, program: &Program) {
        let mut bodies: HashMap<NodeId, Body> = HashMap::new();
        for item in &program.items {
            match item {
                Item::Function(func) => {
                    bodies.insert(func.id, Body::Block(func.body.clone()));
                }
                Item::Sequence(seq) => {
                    for flow in seq.stages.iter().flat_map(|s| &s.flows) {
                        collect_expressions(flow, &mut bodies);
                    }
                }
                Item::Flow(flow) => collect_expressions(flow, &mut bodies),
            }
        }
        self.ir.functions = functions_from_tree(self.analyzer.tree(), |symbol| {
            symbol.ast.and_then(|ast| bodies.remove(&ast.node))
        });
    }
}

fn collect_expressions(flow: &FlowStatement, bodies: &mut HashMap<NodeId, Body>) {
    for item in &flow.items {
        let nodes: Vec<&FlowNode> = match item {
            FlowItem::Node(node) => vec![node],
            FlowItem::Routing(table) => table.entries.iter().flat_map(|e| &e.nodes).collect(),
        };
        for node in nodes {
            if let FlowNodeKind::Expression(expr) = &node.kind {
                if expr.as_literal().is_none() {
                    bodies.insert(node.id, Body::Expression(expr.clone()));
                }
            }
        }
    }
}
