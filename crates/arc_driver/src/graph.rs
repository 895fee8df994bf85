//! Graph Analysis
//!
//! 可视化编辑器提交的图：函数定义、节点实例与连线。
//! 与文本路径共用作用域树和错误类型，产出同样的 IR。

use crate::functions_from_tree;
use arc_ir::{Body, Edge, Node, Value, IR};
use arc_sema::{Analyzer, CancellationToken, Cancelled, ScopeId, SemanticError, SymbolKind};
use arc_syntax::ast::Block;
use arc_syntax::types::{FunctionType, Param, Params};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::{debug, instrument};

/// 图输入
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    #[serde(default)]
    pub functions: Vec<GraphFunction>,
    #[serde(default)]
    pub nodes: Vec<GraphNode>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl Graph {
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

/// 图中定义的函数，函数体可选（没有函数体的只声明签名）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphFunction {
    pub key: String,
    #[serde(default)]
    pub config: Params,
    #[serde(default)]
    pub inputs: Params,
    #[serde(default)]
    pub outputs: Params,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Block>,
}

impl GraphFunction {
    pub fn signature(&self) -> FunctionType {
        FunctionType {
            config: self.config.clone(),
            inputs: self.inputs.clone(),
            outputs: self.outputs.clone(),
        }
    }
}

/// 节点实例：`type` 是函数名，配置值是原始 JSON
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub key: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub config: IndexMap<String, JsonValue>,
}

/// 分析图并构建 IR
///
/// # Errors
///
/// 仅在取消时返回 [`Cancelled`]
#[instrument(skip_all, fields(
    functions = graph.functions.len(),
    nodes = graph.nodes.len(),
    edges = graph.edges.len()
))]
pub fn build_ir(
    analyzer: &mut Analyzer,
    graph: &Graph,
    cancel: &CancellationToken,
) -> Result<IR, Cancelled> {
    let root = analyzer.tree().root();
    let mut ir = IR::new();

    // 1. 登记函数并分析函数体
    for func in &graph.functions {
        cancel.check()?;
        if analyzer.tree().find_child_by_name(root, &func.key).is_some() {
            analyzer.report(SemanticError::InvalidFlow {
                reason: format!("duplicate function '{}'", func.key),
                span: None,
            });
            continue;
        }
        let Some(scope) = analyzer.declare_function(root, &func.key, &func.signature(), None)
        else {
            continue;
        };
        if let Some(body) = &func.body {
            analyzer.analyze_function_body(scope, body);
        }
    }

    // 2. 节点
    let mut required_inputs: Vec<(String, Vec<String>)> = Vec::new();
    for node in &graph.nodes {
        cancel.check()?;
        if ir.find_node(&node.key).is_some() {
            analyzer.report(SemanticError::DuplicateNodeKey {
                key: node.key.clone(),
                span: None,
            });
            continue;
        }
        if let Some((built, required)) = analyze_node(analyzer, root, node) {
            required_inputs.push((built.key.clone(), required));
            ir.nodes.push(built);
        }
    }

    // 3. 连线
    for edge in &graph.edges {
        if let Err(e) = ir.validate_edge(edge) {
            analyzer.report(SemanticError::HandleMismatch {
                reason: e.to_string(),
                span: None,
            });
            continue;
        }
        let taken = edge.is_continuous()
            && ir
                .edges
                .iter()
                .any(|e| e.is_continuous() && e.target == edge.target);
        if taken {
            analyzer.report(SemanticError::DuplicateProducer {
                node: edge.target.node.clone(),
                param: edge.target.param.clone(),
                span: None,
            });
            continue;
        }
        ir.edges.push(edge.clone());
    }

    // 4. 没有默认值的输入必须有连线
    if analyzer.config().check_missing_inputs {
        for (key, required) in &required_inputs {
            for param in required {
                if !ir.incoming(key).any(|e| &e.target.param == param) {
                    analyzer.report(SemanticError::MissingInput {
                        node: key.clone(),
                        param: param.clone(),
                        span: None,
                    });
                }
            }
        }
    }

    ir.functions = functions_from_tree(analyzer.tree(), |symbol| {
        graph
            .functions
            .iter()
            .find(|f| f.key == symbol.name)
            .and_then(|f| f.body.clone())
            .map(Body::Block)
    });
    debug!(nodes = ir.nodes.len(), edges = ir.edges.len(), "graph built");
    Ok(ir)
}

/// 返回节点及其必须连线的输入
fn analyze_node(
    analyzer: &mut Analyzer,
    root: ScopeId,
    node: &GraphNode,
) -> Option<(Node, Vec<String>)> {
    let Ok(resolved) = analyzer.tree_mut().resolve(root, &node.ty) else {
        analyzer.report(SemanticError::UnresolvedInvocation {
            name: node.ty.clone(),
            scope: Some(root),
            span: None,
        });
        return None;
    };
    if resolved.symbol.kind != SymbolKind::Function {
        analyzer.report(SemanticError::NotCallable {
            name: node.ty.clone(),
            kind: resolved.symbol.kind.to_string(),
            span: None,
        });
        return None;
    }

    let sig = resolved.symbol.ty.as_function().cloned().unwrap_or_default();
    let mut built = Node::invocation(&node.key, &node.ty, &sig.inputs, &sig.outputs);
    if let Some(scope) = resolved.scope {
        built.channels = analyzer.tree().channels(scope).clone();
    }

    for (name, value) in &node.config {
        let Some(param) = sig.config.get(name) else {
            analyzer.report(SemanticError::UnknownConfig {
                function: node.ty.clone(),
                param: name.clone(),
                span: None,
            });
            continue;
        };
        match config_value(analyzer, root, param, value) {
            Ok((value, read)) => {
                if let Some((id, channel)) = read {
                    built.channels.add_read(id, channel);
                }
                built.config.insert(name.clone(), value);
            }
            Err(reason) => analyzer.report(SemanticError::InvalidConfig {
                function: node.ty.clone(),
                param: name.clone(),
                reason,
                span: None,
            }),
        }
    }
    for param in &sig.config {
        if node.config.contains_key(&param.name) {
            continue;
        }
        match &param.value {
            Some(default) => {
                built.config.insert(param.name.clone(), Value::from(default));
            }
            None => analyzer.report(SemanticError::MissingConfig {
                function: node.ty.clone(),
                param: param.name.clone(),
                span: None,
            }),
        }
    }

    let required = sig
        .inputs
        .iter()
        .filter(|p| p.value.is_none())
        .map(|p| p.name.clone())
        .collect();
    Some((built, required))
}

/// `chan` 参数接受通道名或数字键，经由解析器查找
fn config_value(
    analyzer: &mut Analyzer,
    root: ScopeId,
    param: &Param,
    value: &JsonValue,
) -> Result<(Value, Option<(u32, String)>), String> {
    if param.ty.is_chan() {
        let name = match value {
            JsonValue::String(s) => s.clone(),
            JsonValue::Number(n) => n.to_string(),
            _ => return Err("expected a channel name or key".to_string()),
        };
        let resolved = analyzer
            .tree_mut()
            .resolve(root, &name)
            .map_err(|e| e.to_string())?;
        return match resolved.symbol.channel_id() {
            Some(id) if resolved.symbol.is_channel() => {
                Ok((Value::Channel(id), Some((id, resolved.symbol.name))))
            }
            _ => Err(format!("'{}' is not a channel", name)),
        };
    }
    match value {
        JsonValue::Number(n) => n
            .as_i64()
            .map(Value::Int)
            .or_else(|| n.as_f64().map(Value::Float))
            .map(|v| (v, None))
            .ok_or_else(|| format!("unsupported number {}", n)),
        JsonValue::String(s) => Ok((Value::Str(s.clone()), None)),
        _ => Err("expected a number or string".to_string()),
    }
}
