use super::{Block, FlowStatement, Literal, NodeId};
use crate::types::{FunctionType, Param, Params, Type};
use arc_diagnostics::Span;
use serde::{Deserialize, Serialize};

/// 函数声明: func name{config}(inputs) outputs { body }
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub id: NodeId,
    pub name: String,
    pub config: Vec<ParamDecl>,
    pub inputs: Vec<ParamDecl>,
    pub outputs: Vec<ParamDecl>,
    pub body: Block,
    pub span: Span,
}

impl FunctionDecl {
    /// 从声明中提取函数签名
    pub fn signature(&self) -> FunctionType {
        let collect = |params: &[ParamDecl]| -> Params {
            params.iter().map(ParamDecl::to_param).collect()
        };
        FunctionType {
            config: collect(&self.config),
            inputs: collect(&self.inputs),
            outputs: collect(&self.outputs),
        }
    }
}

/// 参数声明 (config / input / output 共用)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamDecl {
    pub id: NodeId,
    pub name: String,
    pub ty: Type,
    pub default: Option<Literal>,
    pub span: Span,
}

impl ParamDecl {
    pub fn to_param(&self) -> Param {
        Param {
            name: self.name.clone(),
            ty: self.ty.clone(),
            value: self.default.clone(),
        }
    }
}

/// 序列声明: sequence name { stage a { ... } stage b { ... } }
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceDecl {
    pub id: NodeId,
    pub name: String,
    pub stages: Vec<StageDecl>,
    pub span: Span,
}

/// 阶段声明，阶段体由流语句组成
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageDecl {
    pub id: NodeId,
    pub name: String,
    pub flows: Vec<FlowStatement>,
    pub span: Span,
}
