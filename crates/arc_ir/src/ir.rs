//! Intermediate Representation
//!
//! 分析阶段的结构化输出，交给外部的字节码/WASM 编译器。

use crate::edge::Edge;
use crate::error::{IrError, IrResult};
use crate::function::Function;
use crate::node::Node;
use crate::sequence::Sequences;
use crate::strata::Strata;
use arc_sema::ScopeTree;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IR {
    /// 分析得到的作用域树（LSP 查询使用，不参与序列化）
    #[serde(skip)]
    pub symbols: Option<ScopeTree>,
    #[serde(default)]
    pub functions: Vec<Function>,
    #[serde(default)]
    pub sequences: Sequences,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub strata: Strata,
}

impl IR {
    pub fn new() -> Self {
        Self::default()
    }

    /// 空 IR（出错时返回给调用方的 "没有可用输出"）
    pub fn is_zero(&self) -> bool {
        self.functions.is_empty()
            && self.sequences.is_empty()
            && self.nodes.is_empty()
            && self.edges.is_empty()
            && self.strata.is_empty()
    }

    pub fn find_node(&self, key: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.key == key)
    }

    pub fn find_function(&self, key: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.key == key)
    }

    /// 以指定节点端口为目标的边
    pub fn incoming<'a>(&'a self, node: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.target.node == node)
    }

    /// 检查每条边的两端都指向存在的节点和端口
    pub fn validate_handles(&self) -> IrResult<()> {
        self.edges.iter().try_for_each(|edge| self.validate_edge(edge))
    }

    /// 检查单条边（边不必已在 IR 中）
    pub fn validate_edge(&self, edge: &Edge) -> IrResult<()> {
        let source = self.find_node(&edge.source.node).ok_or_else(|| {
            IrError::HandleMismatch(format!("edge source node '{}' not found", edge.source.node))
        })?;
        if !source.outputs.contains_key(&edge.source.param) {
            return Err(IrError::HandleMismatch(format!(
                "edge source param '{}' not found on node '{}'",
                edge.source.param, edge.source.node
            )));
        }
        let target = self.find_node(&edge.target.node).ok_or_else(|| {
            IrError::HandleMismatch(format!("edge target node '{}' not found", edge.target.node))
        })?;
        if !target.inputs.contains_key(&edge.target.param) {
            return Err(IrError::HandleMismatch(format!(
                "edge target param '{}' not found on node '{}'",
                edge.target.param, edge.target.node
            )));
        }
        Ok(())
    }
}

impl fmt::Display for IR {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "nodes:")?;
        for node in &self.nodes {
            writeln!(f, "  {}", node)?;
        }
        writeln!(f, "edges:")?;
        for edge in &self.edges {
            writeln!(f, "  {}", edge)?;
        }
        for seq in &self.sequences {
            writeln!(f, "{}", seq)?;
        }
        write!(f, "strata:\n{}", self.strata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::Handle;
    use crate::value::Value;
    use arc_syntax::types::Type;

    fn pipeline() -> IR {
        IR {
            nodes: vec![
                Node::on("on_0", 1, "ox_pt_1", Type::F32),
                Node::new("calc_0", "calc")
                    .with_input("val", Type::F32)
                    .with_output("output", Type::F32),
                Node::write("write_0", 2, "ox_pt_doubled", Type::F32),
            ],
            edges: vec![
                Edge::continuous(Handle::new("on_0", "output"), Handle::new("calc_0", "val")),
                Edge::continuous(Handle::new("calc_0", "output"), Handle::new("write_0", "input")),
            ],
            ..IR::default()
        }
    }

    #[test]
    fn test_zero_value() {
        assert!(IR::new().is_zero());
        assert!(!pipeline().is_zero());
    }

    #[test]
    fn test_valid_handles() {
        let ir = pipeline();
        assert!(ir.validate_handles().is_ok());
        assert_eq!(ir.incoming("write_0").count(), 1);
        assert_eq!(
            ir.find_node("on_0").and_then(|n| n.config.get("channel")),
            Some(&Value::Channel(1))
        );
    }

    #[test]
    fn test_dangling_target_node() {
        let mut ir = pipeline();
        ir.edges.push(Edge::continuous(
            Handle::new("on_0", "output"),
            Handle::new("x", "input"),
        ));
        assert_eq!(
            ir.validate_handles(),
            Err(IrError::HandleMismatch("edge target node 'x' not found".to_string()))
        );
    }

    #[test]
    fn test_dangling_param() {
        let mut ir = pipeline();
        ir.edges[0].target.param = "missing".to_string();
        let err = ir.validate_handles().unwrap_err();
        assert!(err.to_string().contains("'missing' not found"));
    }

    #[test]
    fn test_json_skips_scope_tree() {
        let mut ir = pipeline();
        ir.symbols = Some(ScopeTree::new(None));
        let json = serde_json::to_value(&ir).unwrap();
        assert!(json.get("symbols").is_none());
        assert_eq!(json["nodes"][0]["type"], "on");
        assert_eq!(json["edges"][0]["kind"], "continuous");
    }
}
