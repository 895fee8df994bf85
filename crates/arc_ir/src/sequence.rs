//! Sequences and Stages
//!
//! 序列是一个状态机：每个阶段是一张独立分层的持续数据流子图，
//! 阶段之间通过一次性边转移。

use crate::strata::Strata;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    pub key: String,
    /// 本阶段 `stage_entry` 节点的键
    #[serde(default)]
    pub entry: String,
    /// 阶段内的数据流节点（不含入口节点）
    #[serde(default)]
    pub nodes: Vec<String>,
    #[serde(default)]
    pub strata: Strata,
    /// 本阶段一次性边激活的同序列阶段，按边的顺序
    #[serde(default)]
    pub transitions: Vec<String>,
}

impl Stage {
    pub fn new(key: impl Into<String>, entry: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            entry: entry.into(),
            ..Self::default()
        }
    }

    pub fn contains(&self, node: &str) -> bool {
        self.nodes.iter().any(|n| n == node)
    }

    fn header(&self) -> String {
        format!("{}: [{}]", self.key, self.nodes.join(", "))
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.header())?;
        for line in self.strata.to_string().lines() {
            write!(f, "\n  {}", line)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sequence {
    pub key: String,
    #[serde(default)]
    pub stages: Vec<Stage>,
}

impl Sequence {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            stages: Vec::new(),
        }
    }

    /// 入口阶段（第一个声明的阶段），空序列没有入口
    pub fn entry(&self) -> Option<&Stage> {
        self.stages.first()
    }

    pub fn find_stage(&self, key: &str) -> Option<&Stage> {
        self.stages.iter().find(|s| s.key == key)
    }

    pub fn find_stage_mut(&mut self, key: &str) -> Option<&mut Stage> {
        self.stages.iter_mut().find(|s| s.key == key)
    }

    /// 阶段转移的目标：第一条转移边激活的阶段
    ///
    /// 没有转移的阶段是终止状态，返回 None
    pub fn next_stage(&self, key: &str) -> Option<&Stage> {
        let stage = self.find_stage(key)?;
        stage
            .transitions
            .iter()
            .find_map(|target| self.find_stage(target))
    }

    /// 按声明顺序的下一个阶段（`next` 的目标）
    pub fn following_stage(&self, key: &str) -> Option<&Stage> {
        let index = self.stages.iter().position(|s| s.key == key)?;
        self.stages.get(index + 1)
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key)?;
        let last = self.stages.len().saturating_sub(1);
        for (i, stage) in self.stages.iter().enumerate() {
            let branch = if i == last { "└──" } else { "├──" };
            write!(f, "\n{} {}", branch, stage.header())?;
        }
        Ok(())
    }
}

/// 程序中的所有序列
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sequences(pub Vec<Sequence>);

impl Sequences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sequence: Sequence) {
        self.0.push(sequence);
    }

    pub fn find(&self, key: &str) -> Option<&Sequence> {
        self.0.iter().find(|s| s.key == key)
    }

    /// 查找阶段及其所属序列
    pub fn find_stage(&self, key: &str) -> Option<(&Stage, &Sequence)> {
        self.0
            .iter()
            .find_map(|seq| seq.find_stage(key).map(|stage| (stage, seq)))
    }

    /// 所有阶段（按序列、再按声明顺序）
    pub fn stages(&self) -> impl Iterator<Item = &Stage> {
        self.0.iter().flat_map(|seq| seq.stages.iter())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Sequence> {
        self.0.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Sequence> {
        self.0.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> IntoIterator for &'a Sequences {
    type Item = &'a Sequence;
    type IntoIter = std::slice::Iter<'a, Sequence>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
