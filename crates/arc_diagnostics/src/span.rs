//! Span - 源码位置信息
//!
//! 表示源代码中的位置范围。行列号均从 1 开始，便于 LSP 直接使用。

use serde::{Deserialize, Serialize};
use std::fmt;

/// 源码中的单个位置
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    /// 行号 (从 1 开始)
    pub line: u32,
    /// 列号 (从 1 开始)
    pub column: u32,
}

impl Position {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }

    /// 转换为源码中的字节偏移
    ///
    /// 超出源码范围时截断到末尾
    pub fn offset_in(&self, source: &str) -> usize {
        let mut offset = 0;
        for (idx, line) in source.split_inclusive('\n').enumerate() {
            if idx + 1 == self.line as usize {
                let col = (self.column.max(1) - 1) as usize;
                return offset + col.min(line.len());
            }
            offset += line.len();
        }
        source.len()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// 源码位置范围
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    /// 创建一个新的 Span
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// 单点位置
    pub fn point(line: u32, column: u32) -> Self {
        let pos = Position::new(line, column);
        Self { start: pos, end: pos }
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// 位置是否落在范围内
    pub fn contains(&self, pos: Position) -> bool {
        self.start <= pos && pos <= self.end
    }

    /// 合并两个范围
    pub fn merge(&self, other: &Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// 转换为字节偏移范围 (供 ariadne 使用)
    pub fn to_range(&self, source: &str) -> std::ops::Range<usize> {
        let start = self.start.offset_in(source);
        let end = self.end.offset_in(source).max(start);
        start..end
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.start)
    }
}
