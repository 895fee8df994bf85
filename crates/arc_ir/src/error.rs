//! IR Errors

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IrError {
    /// 连线引用了不存在的节点或端口
    #[error("{0}")]
    HandleMismatch(String),
}

pub type IrResult<T> = Result<T, IrError>;
