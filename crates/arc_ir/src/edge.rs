//! Edges and Handles

use serde::{Deserialize, Serialize};
use std::fmt;

/// 某个节点上的一个命名端口
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Handle {
    pub node: String,
    pub param: String,
}

impl Handle {
    pub fn new(node: impl Into<String>, param: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            param: param.into(),
        }
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.node, self.param)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// 持续数据流：源产生新值时目标重新计算，参与分层
    #[default]
    Continuous,
    /// 一次性触发：阶段转移等控制边，不参与分层
    OneShot,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub source: Handle,
    pub target: Handle,
    #[serde(default)]
    pub kind: EdgeKind,
}

impl Edge {
    pub fn continuous(source: Handle, target: Handle) -> Self {
        Self {
            source,
            target,
            kind: EdgeKind::Continuous,
        }
    }

    pub fn one_shot(source: Handle, target: Handle) -> Self {
        Self {
            source,
            target,
            kind: EdgeKind::OneShot,
        }
    }

    pub fn is_continuous(&self) -> bool {
        self.kind == EdgeKind::Continuous
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let arrow = match self.kind {
            EdgeKind::Continuous => "->",
            EdgeKind::OneShot => "=>",
        };
        write!(f, "{} {} {}", self.source, arrow, self.target)
    }
}
