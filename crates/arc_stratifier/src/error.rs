//! Stratification Errors

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StratifyError {
    /// 持续边构成环；反馈必须通过有状态变量表达
    #[error("cycle detected in continuous dataflow: {}", .path.join(" -> "))]
    Cycle {
        /// 无法分层的节点（环以及环的下游）
        nodes: Vec<String>,
        /// 一条具体的环路径，首尾相同
        path: Vec<String>,
    },

    #[error("edge references unknown node '{key}'")]
    UnknownNode { key: String },
}

pub type StratifyResult<T> = Result<T, StratifyError>;
