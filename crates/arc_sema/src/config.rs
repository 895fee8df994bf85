//! Analyzer Configuration

use serde::Deserialize;

/// 分析器配置，宿主可从 JSON/TOML 等格式反序列化
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// "did you mean" 候选的最大编辑距离
    pub max_suggestion_distance: usize,
    /// 最多给出的候选数量
    pub max_suggestions: usize,
    /// 图输入：检查没有默认值的输入是否都有连线
    pub check_missing_inputs: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            max_suggestion_distance: 2,
            max_suggestions: 3,
            check_missing_inputs: true,
        }
    }
}
