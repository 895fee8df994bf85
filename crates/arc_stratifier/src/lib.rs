//! Arc Stratifier
//!
//! 把持续数据流图划分为执行层级。节点的层级为所有持续前驱层级的最大值加一，
//! 没有持续前驱的节点在第 0 层。一次性边只表示控制转移，不参与分层。
//!
//! 分两级进行：
//! 1. 程序级：不属于任何阶段的节点（包括阶段入口）
//! 2. 阶段级：每个阶段自己的数据流节点
//!
//! 只有两端位于同一级的持续边才计入。

pub mod error;

pub use error::{StratifyError, StratifyResult};

use arc_ir::{Edge, Node, Sequences, Strata, IR};
use indexmap::{IndexMap, IndexSet};
use std::collections::HashSet;
use tracing::{debug, instrument, warn};

/// 对一组节点分层
///
/// 层内按 `keys` 中的顺序排列，因此同样的输入总是得到同样的结果。
/// 只考虑持续边；边的端点必须都在 `keys` 中。
pub fn stratify<'a, I>(keys: I, edges: &'a [Edge]) -> StratifyResult<Strata>
where
    I: IntoIterator<Item = &'a str>,
{
    let keys: IndexSet<&str> = keys.into_iter().collect();
    let mut deps = Vec::new();
    for edge in edges.iter().filter(|e| e.is_continuous()) {
        for key in [edge.source.node.as_str(), edge.target.node.as_str()] {
            if !keys.contains(key) {
                return Err(StratifyError::UnknownNode {
                    key: key.to_string(),
                });
            }
        }
        deps.push((edge.source.node.as_str(), edge.target.node.as_str()));
    }
    levels(&keys, &deps)
}

/// 程序级与阶段级分层，阶段的结果写回 `sequences`
#[instrument(skip_all, fields(nodes = nodes.len(), edges = edges.len()))]
pub fn stratify_program(
    nodes: &[Node],
    edges: &[Edge],
    sequences: &mut Sequences,
) -> StratifyResult<Strata> {
    // 节点键 -> 所在阶段（None 为程序级）
    let mut tiers: IndexMap<&str, Option<(usize, usize)>> =
        nodes.iter().map(|n| (n.key.as_str(), None)).collect();
    for (si, seq) in sequences.iter().enumerate() {
        for (ti, stage) in seq.stages.iter().enumerate() {
            for key in &stage.nodes {
                match tiers.get_mut(key.as_str()) {
                    Some(tier) => *tier = Some((si, ti)),
                    None => return Err(StratifyError::UnknownNode { key: key.clone() }),
                }
            }
        }
    }

    let mut by_tier: IndexMap<Option<(usize, usize)>, Vec<(&str, &str)>> = IndexMap::new();
    for edge in edges.iter().filter(|e| e.is_continuous()) {
        let source = tier_of(&tiers, &edge.source.node)?;
        let target = tier_of(&tiers, &edge.target.node)?;
        if source == target {
            by_tier
                .entry(source)
                .or_default()
                .push((edge.source.node.as_str(), edge.target.node.as_str()));
        }
    }

    let global: IndexSet<&str> = tiers
        .iter()
        .filter(|(_, tier)| tier.is_none())
        .map(|(key, _)| *key)
        .collect();
    let strata = levels(&global, by_tier.get(&None).map(Vec::as_slice).unwrap_or(&[]))?;
    debug!(nodes = global.len(), levels = strata.len(), "program stratified");

    let owned_tiers: Vec<(Option<(usize, usize)>, IndexSet<String>)> = sequences
        .iter()
        .enumerate()
        .flat_map(|(si, seq)| {
            seq.stages.iter().enumerate().map(move |(ti, stage)| {
                (Some((si, ti)), stage.nodes.iter().cloned().collect())
            })
        })
        .collect();
    let mut stage_strata = Vec::with_capacity(owned_tiers.len());
    for (tier, keys) in &owned_tiers {
        let keys: IndexSet<&str> = keys.iter().map(String::as_str).collect();
        let deps = by_tier.get(tier).map(Vec::as_slice).unwrap_or(&[]);
        let strata = levels(&keys, deps)?;
        stage_strata.push((*tier, strata));
    }

    for (tier, strata) in stage_strata {
        if let Some((si, ti)) = tier {
            let stage = &mut sequences.0[si].stages[ti];
            debug!(stage = %stage.key, levels = strata.len(), "stage stratified");
            stage.strata = strata;
        }
    }
    Ok(strata)
}

/// 对整个 IR 分层，结果写回 `ir.strata` 与各阶段
pub fn stratify_ir(ir: &mut IR) -> StratifyResult<()> {
    ir.strata = stratify_program(&ir.nodes, &ir.edges, &mut ir.sequences)?;
    Ok(())
}

fn tier_of(
    tiers: &IndexMap<&str, Option<(usize, usize)>>,
    key: &str,
) -> StratifyResult<Option<(usize, usize)>> {
    tiers
        .get(key)
        .copied()
        .ok_or_else(|| StratifyError::UnknownNode {
            key: key.to_string(),
        })
}

/// Kahn 算法按波次分层：每一波是当前入度为零的节点
fn levels(keys: &IndexSet<&str>, deps: &[(&str, &str)]) -> StratifyResult<Strata> {
    let mut in_degree: IndexMap<&str, usize> = keys.iter().map(|k| (*k, 0)).collect();
    let mut dependents: IndexMap<&str, Vec<&str>> = IndexMap::new();
    for &(source, target) in deps {
        if let Some(degree) = in_degree.get_mut(target) {
            *degree += 1;
        }
        dependents.entry(source).or_default().push(target);
    }

    let mut result = Vec::new();
    let mut current: Vec<&str> = keys
        .iter()
        .copied()
        .filter(|k| in_degree.get(k) == Some(&0))
        .collect();
    let mut processed = 0;

    while !current.is_empty() {
        processed += current.len();
        let mut next = Vec::new();
        for key in &current {
            for dep in dependents.get(key).into_iter().flatten() {
                if let Some(degree) = in_degree.get_mut(dep) {
                    *degree -= 1;
                    if *degree == 0 {
                        next.push(*dep);
                    }
                }
            }
        }
        // 层内保持声明顺序
        next.sort_by_key(|k| keys.get_index_of(k));
        result.push(current.iter().map(|k| k.to_string()).collect());
        current = next;
    }

    if processed != keys.len() {
        let nodes: Vec<String> = in_degree
            .iter()
            .filter(|(_, degree)| **degree > 0)
            .map(|(key, _)| key.to_string())
            .collect();
        let path = trace_cycle_path(&nodes, deps);
        warn!(path = %path.join(" -> "), "continuous dataflow cycle");
        return Err(StratifyError::Cycle { nodes, path });
    }

    Ok(Strata(result))
}

/// 沿前驱回溯找出一条具体的环
///
/// 剩余节点都至少有一个剩余前驱，所以回溯一定会回到走过的节点
fn trace_cycle_path(remaining: &[String], deps: &[(&str, &str)]) -> Vec<String> {
    let Some(start) = remaining.first() else {
        return Vec::new();
    };
    let remaining: HashSet<&str> = remaining.iter().map(String::as_str).collect();

    let mut walk: Vec<&str> = vec![start.as_str()];
    loop {
        let current = walk[walk.len() - 1];
        let Some(&(pred, _)) = deps
            .iter()
            .find(|(source, target)| *target == current && remaining.contains(source))
        else {
            break;
        };
        if let Some(pos) = walk.iter().position(|k| *k == pred) {
            let mut cycle: Vec<String> = walk[pos..].iter().map(|k| k.to_string()).collect();
            cycle.push(pred.to_string());
            cycle.reverse();
            return cycle;
        }
        walk.push(pred);
    }
    walk.iter().rev().map(|k| k.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use arc_ir::{Handle, Sequence, Stage};
    use arc_syntax::types::Type;

    fn flow(source: &str, target: &str) -> Edge {
        Edge::continuous(Handle::new(source, "output"), Handle::new(target, "input"))
    }

    fn trigger(source: &str, target: &str) -> Edge {
        Edge::one_shot(Handle::new(source, "output"), Handle::new(target, "activate"))
    }

    fn levels_of(strata: &Strata) -> Vec<Vec<&str>> {
        strata
            .iter()
            .map(|level| level.iter().map(String::as_str).collect())
            .collect()
    }

    #[test]
    fn test_linear_chain() {
        let edges = vec![flow("on_0", "calc_0"), flow("calc_0", "write_0")];
        let strata = stratify(["on_0", "calc_0", "write_0"], &edges).unwrap();
        assert_eq!(
            levels_of(&strata),
            vec![vec!["on_0"], vec!["calc_0"], vec!["write_0"]]
        );
    }

    #[test]
    fn test_longest_path_layering() {
        // a -> b -> d, a -> d: d 在第 2 层
        let edges = vec![flow("a", "b"), flow("b", "d"), flow("a", "d"), flow("c", "d")];
        let strata = stratify(["a", "b", "c", "d"], &edges).unwrap();
        assert_eq!(levels_of(&strata), vec![vec!["a", "c"], vec!["b"], vec!["d"]]);

        for edge in &edges {
            assert!(strata.get(&edge.source.node) < strata.get(&edge.target.node));
        }
    }

    #[test]
    fn test_one_shot_edges_ignored() {
        let edges = vec![trigger("a", "b"), trigger("b", "a")];
        let strata = stratify(["a", "b"], &edges).unwrap();
        assert_eq!(levels_of(&strata), vec![vec!["a", "b"]]);
    }

    #[test]
    fn test_idempotent() {
        let edges = vec![flow("x", "y"), flow("w", "y"), flow("y", "z")];
        let keys = ["w", "x", "y", "z"];
        assert_eq!(stratify(keys, &edges).unwrap(), stratify(keys, &edges).unwrap());
    }

    #[test]
    fn test_cycle_detected_with_path() {
        let edges = vec![flow("a", "b"), flow("b", "c"), flow("c", "a"), flow("c", "d")];
        let err = stratify(["a", "b", "c", "d"], &edges).unwrap_err();
        match err {
            StratifyError::Cycle { nodes, path } => {
                assert_eq!(nodes, vec!["a", "b", "c", "d"]);
                assert_eq!(path.first(), path.last());
                assert_eq!(path.len(), 4);
                assert!(!path.contains(&"d".to_string()));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_self_loop_is_cycle() {
        let err = stratify(["a"], &[flow("a", "a")]).unwrap_err();
        assert_eq!(err.to_string(), "cycle detected in continuous dataflow: a -> a");
    }

    #[test]
    fn test_unknown_node() {
        let err = stratify(["a"], &[flow("a", "ghost")]).unwrap_err();
        assert_eq!(
            err,
            StratifyError::UnknownNode {
                key: "ghost".to_string()
            }
        );
    }

    #[test]
    fn test_program_and_stage_tiers() {
        let nodes = vec![
            Node::on("on_0", 1, "start_cmd", Type::U8),
            Node::stage_entry("entry_main_init"),
            Node::constant("constant_0", arc_ir::Value::Int(1), Type::I64),
            Node::write("write_0", 2, "output", Type::I64),
        ];
        let edges = vec![
            trigger("on_0", "entry_main_init"),
            flow("constant_0", "write_0"),
        ];
        let mut stage = Stage::new("init", "entry_main_init");
        stage.nodes = vec!["constant_0".to_string(), "write_0".to_string()];
        let mut sequences = Sequences::new();
        sequences.push(Sequence {
            key: "main".to_string(),
            stages: vec![stage],
        });

        let strata = stratify_program(&nodes, &edges, &mut sequences).unwrap();
        assert_eq!(levels_of(&strata), vec![vec!["on_0", "entry_main_init"]]);

        let stage = sequences.find_stage("init").unwrap().0;
        assert_eq!(
            levels_of(&stage.strata),
            vec![vec!["constant_0"], vec!["write_0"]]
        );
    }

    #[test]
    fn test_cross_tier_edges_ignored() {
        // 程序级节点到阶段内节点的持续边不影响任何一级
        let nodes = vec![
            Node::new("src_0", "src"),
            Node::new("a_0", "a"),
            Node::new("b_0", "b"),
        ];
        let edges = vec![flow("src_0", "a_0"), flow("a_0", "b_0")];
        let mut stage = Stage::new("run", "entry_main_run");
        stage.nodes = vec!["a_0".to_string(), "b_0".to_string()];
        let mut sequences = Sequences::new();
        sequences.push(Sequence {
            key: "main".to_string(),
            stages: vec![stage],
        });

        let strata = stratify_program(&nodes, &edges, &mut sequences).unwrap();
        assert_eq!(levels_of(&strata), vec![vec!["src_0"]]);
        let stage = &sequences.0[0].stages[0];
        assert_eq!(levels_of(&stage.strata), vec![vec!["a_0"], vec!["b_0"]]);
    }

    #[test]
    fn test_stratify_ir_writes_back() {
        let mut ir = IR {
            nodes: vec![Node::new("a", "a"), Node::new("b", "b")],
            edges: vec![flow("a", "b")],
            ..IR::default()
        };
        stratify_ir(&mut ir).unwrap();
        assert_eq!(ir.strata.get("b"), Some(1));
    }
}
