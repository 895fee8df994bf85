//! IR Functions

use crate::value::Value;
use arc_sema::Channels;
use arc_syntax::ast::{Block, Expr};
use arc_syntax::types::{FunctionType, Params};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// 函数体：用户函数是语句块，合成的表达式函数是单个表达式
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Body {
    Block(Block),
    Expression(Expr),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub key: String,
    #[serde(default)]
    pub config: Params,
    #[serde(default)]
    pub inputs: Params,
    #[serde(default)]
    pub outputs: Params,
    #[serde(default)]
    pub channels: Channels,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Body>,
}

impl Function {
    pub fn new(key: impl Into<String>, sig: &FunctionType) -> Self {
        Self {
            key: key.into(),
            config: sig.config.clone(),
            inputs: sig.inputs.clone(),
            outputs: sig.outputs.clone(),
            ..Self::default()
        }
    }

    pub fn signature(&self) -> FunctionType {
        FunctionType {
            config: self.config.clone(),
            inputs: self.inputs.clone(),
            outputs: self.outputs.clone(),
        }
    }

    /// 没有默认值的配置参数
    pub fn required_config(&self) -> impl Iterator<Item = &str> {
        self.config
            .iter()
            .filter(|p| p.value.is_none())
            .map(|p| p.name.as_str())
    }

    /// 配置参数的默认值
    pub fn default_config(&self) -> IndexMap<String, Value> {
        self.config
            .iter()
            .filter_map(|p| p.value.as_ref().map(|v| (p.name.clone(), Value::from(v))))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arc_syntax::ast::Literal;
    use arc_syntax::types::{Param, Type};

    #[test]
    fn test_required_and_default_config() {
        let sig = FunctionType {
            config: [
                Param::new("threshold", Type::F64),
                Param::new("window", Type::I64).with_default(Literal::Int(5)),
            ]
            .into_iter()
            .collect(),
            ..FunctionType::default()
        };
        let func = Function::new("filter", &sig);
        assert_eq!(func.required_config().collect::<Vec<_>>(), vec!["threshold"]);
        assert_eq!(func.default_config().get("window"), Some(&Value::Int(5)));
        assert_eq!(func.signature(), sig);
    }
}
