//! Suggestion Engine
//!
//! "did you mean" 候选：对作用域链上可见的所有名称计算编辑距离。
//! 只在诊断渲染时显式调用，解析路径上从不计算。

use crate::scope::{ScopeId, ScopeTree};

/// 编辑距离（插入、删除、替换代价均为 1）
///
/// 两行滚动数组，空间复杂度 O(min(len(a), len(b)))
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (long, short) = if a.len() >= b.len() { (a, b) } else { (b, a) };

    let mut prev: Vec<usize> = (0..=short.len()).collect();
    let mut curr = vec![0usize; short.len() + 1];

    for i in 1..=long.len() {
        curr[0] = i;
        for j in 1..=short.len() {
            let cost = if long[i - 1] == short[j - 1] { 0 } else { 1 };
            curr[j] = (prev[j] + 1)
                .min(curr[j - 1] + 1)
                .min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[short.len()]
}

/// 在 `from` 可见的名称中查找与 `name` 相近的候选
///
/// 过滤 `0 < distance <= max_distance`，按距离、再按字母序排序，最多返回 `max_suggestions` 个
pub fn suggest_similar(
    tree: &ScopeTree,
    from: ScopeId,
    name: &str,
    max_distance: usize,
    max_suggestions: usize,
) -> Vec<String> {
    rank_candidates(name, tree.visible_names(from), max_distance, max_suggestions)
}

/// 对任意候选集合排序（图输入等没有作用域链的场景）
pub fn rank_candidates(
    name: &str,
    candidates: impl IntoIterator<Item = String>,
    max_distance: usize,
    max_suggestions: usize,
) -> Vec<String> {
    let mut scored: Vec<(usize, String)> = candidates
        .into_iter()
        .filter_map(|c| {
            let d = levenshtein(name, &c);
            if d > 0 && d <= max_distance {
                Some((d, c))
            } else {
                None
            }
        })
        .collect();
    scored.sort();
    scored.dedup();
    scored
        .into_iter()
        .take(max_suggestions)
        .map(|(_, c)| c)
        .collect()
}
