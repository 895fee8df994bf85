//! Execution Strata

use serde::{Deserialize, Serialize};
use std::fmt;

/// 执行层级：第 i 层必须在第 i+1 层之前全部完成，层内顺序任意
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Strata(pub Vec<Vec<String>>);

impl Strata {
    pub fn new() -> Self {
        Self::default()
    }

    /// 节点所在的层
    pub fn get(&self, key: &str) -> Option<usize> {
        self.0.iter().position(|level| level.iter().any(|k| k == key))
    }

    pub fn node_count(&self) -> usize {
        self.0.iter().map(Vec::len).sum()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Vec<String>> {
        self.0.iter()
    }
}

impl From<Vec<Vec<String>>> for Strata {
    fn from(levels: Vec<Vec<String>>) -> Self {
        Self(levels)
    }
}

impl<'a> IntoIterator for &'a Strata {
    type Item = &'a Vec<String>;
    type IntoIter = std::slice::Iter<'a, Vec<String>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for Strata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, level) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "[{}]: {}", i, level.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strata() -> Strata {
        Strata::from(vec![
            vec!["a".to_string(), "b".to_string()],
            vec!["c".to_string()],
        ])
    }

    #[test]
    fn test_lookup() {
        let strata = strata();
        assert_eq!(strata.get("b"), Some(0));
        assert_eq!(strata.get("c"), Some(1));
        assert_eq!(strata.get("z"), None);
        assert_eq!(strata.node_count(), 3);
    }

    #[test]
    fn test_display() {
        assert_eq!(strata().to_string(), "[0]: a, b\n[1]: c");
    }
}
