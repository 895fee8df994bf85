//! Graph Nodes

use crate::value::Value;
use arc_sema::Channels;
use arc_syntax::types::{Params, Type, DEFAULT_INPUT_PARAM, DEFAULT_OUTPUT_PARAM};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 阶段入口节点上的激活输入
pub const ACTIVATE_PARAM: &str = "activate";

/// 内置节点类型
pub mod kind {
    /// 通道读取
    pub const ON: &str = "on";
    /// 通道写入
    pub const WRITE: &str = "write";
    /// 字面量常量
    pub const CONSTANT: &str = "constant";
    /// 阶段入口
    pub const STAGE_ENTRY: &str = "stage_entry";
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub key: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub inputs: IndexMap<String, Type>,
    #[serde(default)]
    pub outputs: IndexMap<String, Type>,
    #[serde(default)]
    pub config: IndexMap<String, Value>,
    #[serde(default)]
    pub channels: Channels,
}

impl Node {
    pub fn new(key: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ty: ty.into(),
            ..Self::default()
        }
    }

    /// 读取通道的 `on` 节点
    pub fn on(key: impl Into<String>, channel: u32, name: impl Into<String>, elem: Type) -> Self {
        let mut node = Self::new(key, kind::ON)
            .with_output(DEFAULT_OUTPUT_PARAM, elem)
            .with_config("channel", Value::Channel(channel));
        node.channels.add_read(channel, name);
        node
    }

    /// 写入通道的 `write` 节点
    pub fn write(key: impl Into<String>, channel: u32, name: impl Into<String>, elem: Type) -> Self {
        let mut node = Self::new(key, kind::WRITE)
            .with_input(DEFAULT_INPUT_PARAM, elem)
            .with_config("channel", Value::Channel(channel));
        node.channels.add_write(channel, name);
        node
    }

    pub fn constant(key: impl Into<String>, value: Value, ty: Type) -> Self {
        Self::new(key, kind::CONSTANT)
            .with_output(DEFAULT_OUTPUT_PARAM, ty)
            .with_config("value", value)
    }

    pub fn stage_entry(key: impl Into<String>) -> Self {
        Self::new(key, kind::STAGE_ENTRY).with_input(ACTIVATE_PARAM, Type::U8)
    }

    /// 以函数签名为端口的节点
    pub fn invocation(key: impl Into<String>, ty: impl Into<String>, inputs: &Params, outputs: &Params) -> Self {
        let mut node = Self::new(key, ty);
        for param in inputs {
            node.inputs.insert(param.name.clone(), param.ty.clone());
        }
        for param in outputs {
            node.outputs.insert(param.name.clone(), param.ty.clone());
        }
        node
    }

    pub fn with_input(mut self, name: impl Into<String>, ty: Type) -> Self {
        self.inputs.insert(name.into(), ty);
        self
    }

    pub fn with_output(mut self, name: impl Into<String>, ty: Type) -> Self {
        self.outputs.insert(name.into(), ty);
        self
    }

    pub fn with_config(mut self, name: impl Into<String>, value: Value) -> Self {
        self.config.insert(name.into(), value);
        self
    }

    pub fn is_stage_entry(&self) -> bool {
        self.ty == kind::STAGE_ENTRY
    }

    /// 第一个输入端口（流中的默认连接目标）
    pub fn default_input(&self) -> Option<&str> {
        self.inputs.keys().next().map(String::as_str)
    }

    /// 第一个输出端口（流中的默认连接源）
    pub fn default_output(&self) -> Option<&str> {
        self.outputs.keys().next().map(String::as_str)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.key, self.ty)?;
        if !self.config.is_empty() {
            let config: Vec<String> = self
                .config
                .iter()
                .map(|(k, v)| format!("{}: {}", k, v))
                .collect();
            write!(f, " {{{}}}", config.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_nodes() {
        let on = Node::on("on_0", 1, "ox_pt_1", Type::F32);
        assert_eq!(on.default_output(), Some("output"));
        assert_eq!(on.default_input(), None);
        assert!(on.channels.read.contains_key(&1));
        assert_eq!(on.config.get("channel"), Some(&Value::Channel(1)));

        let write = Node::write("write_0", 2, "ox_pt_doubled", Type::F32);
        assert_eq!(write.default_input(), Some("input"));
        assert!(write.channels.write.contains_key(&2));
    }

    #[test]
    fn test_stage_entry() {
        let entry = Node::stage_entry("entry_main_init");
        assert!(entry.is_stage_entry());
        assert_eq!(entry.default_input(), Some(ACTIVATE_PARAM));
    }

    #[test]
    fn test_display() {
        let node = Node::constant("constant_0", Value::Int(1), Type::I64);
        assert_eq!(node.to_string(), "constant_0 (constant) {value: 1}");
    }
}
