//! Node Key Generation
//!
//! 键按类型分别计数: `on_0`, `on_1`, `calc_0`。同一输入总是得到同样的键。

use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct KeyGenerator {
    counters: HashMap<String, usize>,
}

impl KeyGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 为指定类型生成下一个键
    pub fn next(&mut self, ty: &str) -> String {
        let counter = self.counters.entry(ty.to_string()).or_insert(0);
        let key = format!("{}_{}", ty, counter);
        *counter += 1;
        key
    }

    /// 阶段入口节点的键
    pub fn stage_entry(sequence: &str, stage: &str) -> String {
        format!("entry_{}_{}", sequence, stage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_per_type() {
        let mut keys = KeyGenerator::new();
        assert_eq!(keys.next("on"), "on_0");
        assert_eq!(keys.next("calc"), "calc_0");
        assert_eq!(keys.next("on"), "on_1");
        assert_eq!(KeyGenerator::stage_entry("main", "init"), "entry_main_init");
    }
}
