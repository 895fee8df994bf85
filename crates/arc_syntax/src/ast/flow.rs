use super::{Expr, NodeId};
use arc_diagnostics::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 流语句: a -> b{} -> c, cond => next
///
/// `operators[i]` 连接 `items[i]` 与 `items[i + 1]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowStatement {
    pub id: NodeId,
    pub items: Vec<FlowItem>,
    pub operators: Vec<FlowOperator>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlowOperator {
    // -> 持续数据流
    Continuous,
    // => 状态转移
    Transition,
}

impl fmt::Display for FlowOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowOperator::Continuous => write!(f, "->"),
            FlowOperator::Transition => write!(f, "=>"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FlowItem {
    Node(FlowNode),
    // 输出路由表: { high: alarm{}, low: ox_pt_low }
    Routing(RoutingTable),
}

impl FlowItem {
    pub fn span(&self) -> Span {
        match self {
            FlowItem::Node(node) => node.span,
            FlowItem::Routing(table) => table.span,
        }
    }
}

impl From<FlowNode> for FlowItem {
    fn from(node: FlowNode) -> Self {
        FlowItem::Node(node)
    }
}

impl From<RoutingTable> for FlowItem {
    fn from(table: RoutingTable) -> Self {
        FlowItem::Routing(table)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowNode {
    pub id: NodeId,
    pub kind: FlowNodeKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FlowNodeKind {
    // 通道、阶段或序列名
    Identifier(String),

    // 函数调用: calc{threshold: 10} 或 calc{10}
    Invocation { callee: String, config: ConfigValues },

    // 内联表达式: ox_pt_1 > 10
    Expression(Expr),

    // 跳转到序列中的下一个阶段
    Next,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConfigValues {
    Named(Vec<NamedValue>),
    Positional(Vec<Expr>),
}

impl Default for ConfigValues {
    fn default() -> Self {
        ConfigValues::Named(Vec::new())
    }
}

impl ConfigValues {
    pub fn is_empty(&self) -> bool {
        match self {
            ConfigValues::Named(values) => values.is_empty(),
            ConfigValues::Positional(values) => values.is_empty(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedValue {
    pub name: String,
    pub value: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingTable {
    pub id: NodeId,
    pub entries: Vec<RoutingEntry>,
    pub span: Span,
}

/// 路由表条目: 输出名 -> 一条由 `->` 连接的节点链
///
/// `target_param` 指定链尾节点接收数据的输入，缺省时使用默认输入
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingEntry {
    pub output: String,
    pub nodes: Vec<FlowNode>,
    #[serde(default)]
    pub target_param: Option<String>,
    pub span: Span,
}
