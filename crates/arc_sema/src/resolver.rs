//! Global Symbol Resolvers
//!
//! 作用域树之外的符号来源：标准库函数、通道注册表、模块命名空间等。
//! 解析器只读共享，多个编译可以并发调用。

use crate::symbol::Symbol;
use arc_syntax::types::Type;
use dashmap::DashMap;
use indexmap::IndexMap;
use std::collections::HashSet;

/// 全局符号来源
pub trait Resolver: Send + Sync {
    /// 按名称精确查找
    fn resolve(&self, name: &str) -> Option<Symbol>;

    /// 按前缀查找（用于补全与提示）
    fn resolve_prefix(&self, prefix: &str) -> Vec<Symbol>;
}

/// 静态符号表
#[derive(Debug, Clone, Default)]
pub struct MapResolver {
    symbols: IndexMap<String, Symbol>,
}

impl MapResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, symbol: Symbol) {
        self.symbols.insert(symbol.name.clone(), symbol);
    }

    pub fn with(mut self, symbol: Symbol) -> Self {
        self.insert(symbol);
        self
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

impl FromIterator<Symbol> for MapResolver {
    fn from_iter<I: IntoIterator<Item = Symbol>>(iter: I) -> Self {
        let mut resolver = Self::new();
        for symbol in iter {
            resolver.insert(symbol);
        }
        resolver
    }
}

impl Resolver for MapResolver {
    fn resolve(&self, name: &str) -> Option<Symbol> {
        self.symbols.get(name).cloned()
    }

    fn resolve_prefix(&self, prefix: &str) -> Vec<Symbol> {
        self.symbols
            .values()
            .filter(|s| s.name.starts_with(prefix))
            .cloned()
            .collect()
    }
}

/// 有序组合：精确查找时第一个命中者胜出，前缀查找按名称去重
#[derive(Default)]
pub struct CompoundResolver {
    resolvers: Vec<Box<dyn Resolver>>,
}

impl CompoundResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, resolver: impl Resolver + 'static) {
        self.resolvers.push(Box::new(resolver));
    }

    pub fn with(mut self, resolver: impl Resolver + 'static) -> Self {
        self.push(resolver);
        self
    }
}

impl Resolver for CompoundResolver {
    fn resolve(&self, name: &str) -> Option<Symbol> {
        self.resolvers.iter().find_map(|r| r.resolve(name))
    }

    fn resolve_prefix(&self, prefix: &str) -> Vec<Symbol> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for resolver in &self.resolvers {
            for symbol in resolver.resolve_prefix(prefix) {
                if seen.insert(symbol.name.clone()) {
                    out.push(symbol);
                }
            }
        }
        out
    }
}

/// 模块命名空间: `math.sin` 在模块 `math` 中查找 `sin`
///
/// 返回的符号名称为限定名
#[derive(Default)]
pub struct ModuleResolver {
    modules: IndexMap<String, Box<dyn Resolver>>,
}

impl ModuleResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_module(mut self, name: impl Into<String>, resolver: impl Resolver + 'static) -> Self {
        self.modules.insert(name.into(), Box::new(resolver));
        self
    }

    fn qualify(module: &str, mut symbol: Symbol) -> Symbol {
        symbol.name = format!("{}.{}", module, symbol.name);
        symbol
    }
}

impl Resolver for ModuleResolver {
    fn resolve(&self, name: &str) -> Option<Symbol> {
        let (module, member) = name.split_once('.')?;
        let resolver = self.modules.get(module)?;
        resolver
            .resolve(member)
            .map(|symbol| Self::qualify(module, symbol))
    }

    fn resolve_prefix(&self, prefix: &str) -> Vec<Symbol> {
        match prefix.split_once('.') {
            Some((module, rest)) => self
                .modules
                .get(module)
                .map(|resolver| {
                    resolver
                        .resolve_prefix(rest)
                        .into_iter()
                        .map(|s| Self::qualify(module, s))
                        .collect()
                })
                .unwrap_or_default(),
            None => self
                .modules
                .iter()
                .filter(|(name, _)| name.starts_with(prefix))
                .flat_map(|(name, resolver)| {
                    resolver
                        .resolve_prefix("")
                        .into_iter()
                        .map(move |s| Self::qualify(name, s))
                })
                .collect(),
        }
    }
}

/// 通道注册表中的条目
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelInfo {
    pub key: u32,
    pub name: String,
    pub data_type: Type,
}

/// 在线通道注册表：按名称或数字键查找
///
/// 注册表可以在编译进行时被宿主更新，读取是并发安全的
#[derive(Debug, Default)]
pub struct ChannelRegistry {
    by_key: DashMap<u32, ChannelInfo>,
    by_name: DashMap<String, u32>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册或替换通道
    ///
    /// 键和名称都一一对应：替换任一方时，旧的另一方一并移除
    pub fn register(&self, key: u32, name: impl Into<String>, data_type: Type) {
        let name = name.into();
        let info = ChannelInfo {
            key,
            name: name.clone(),
            data_type,
        };
        if let Some(old) = self.by_key.insert(key, info) {
            if old.name != name {
                self.by_name.remove(&old.name);
            }
        }
        if let Some(stale) = self.by_name.insert(name, key) {
            if stale != key {
                self.by_key.remove(&stale);
            }
        }
    }

    pub fn unregister(&self, key: u32) -> Option<ChannelInfo> {
        let (_, info) = self.by_key.remove(&key)?;
        self.by_name.remove(&info.name);
        Some(info)
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    fn symbol_for(&self, key: u32) -> Option<Symbol> {
        self.by_key
            .get(&key)
            .map(|info| Symbol::channel(info.name.clone(), info.key, info.data_type.clone()))
    }
}

impl Resolver for ChannelRegistry {
    fn resolve(&self, name: &str) -> Option<Symbol> {
        let by_name = self.by_name.get(name).map(|key| *key);
        match by_name {
            Some(key) => self.symbol_for(key),
            None => name.parse::<u32>().ok().and_then(|key| self.symbol_for(key)),
        }
    }

    fn resolve_prefix(&self, prefix: &str) -> Vec<Symbol> {
        let mut keys: Vec<u32> = self
            .by_name
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .map(|entry| *entry.value())
            .collect();
        keys.sort_unstable();
        keys.into_iter().filter_map(|k| self.symbol_for(k)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::SymbolKind;
    use arc_syntax::types::FunctionType;

    fn channels() -> MapResolver {
        MapResolver::new()
            .with(Symbol::channel("ox_pt_1", 1, Type::F32))
            .with(Symbol::channel("ox_pt_2", 2, Type::F32))
    }

    #[test]
    fn test_map_resolver() {
        let resolver = channels();
        assert_eq!(resolver.resolve("ox_pt_1").and_then(|s| s.id), Some(1));
        assert!(resolver.resolve("missing").is_none());
        assert_eq!(resolver.resolve_prefix("ox_").len(), 2);
    }

    #[test]
    fn test_compound_first_match_wins_and_prefix_dedup() {
        let shadow = MapResolver::new().with(Symbol::channel("ox_pt_1", 99, Type::F64));
        let compound = CompoundResolver::new().with(shadow).with(channels());

        assert_eq!(compound.resolve("ox_pt_1").and_then(|s| s.id), Some(99));
        assert_eq!(compound.resolve("ox_pt_2").and_then(|s| s.id), Some(2));

        let names: Vec<String> = compound
            .resolve_prefix("ox")
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["ox_pt_1".to_string(), "ox_pt_2".to_string()]);
    }

    #[test]
    fn test_module_resolver_qualifies_names() {
        let math = MapResolver::new()
            .with(Symbol::function("sin", FunctionType::default()))
            .with(Symbol::function("sqrt", FunctionType::default()));
        let modules = ModuleResolver::new().with_module("math", math);

        let sin = modules.resolve("math.sin").unwrap();
        assert_eq!(sin.name, "math.sin");
        assert_eq!(sin.kind, SymbolKind::Function);
        assert!(modules.resolve("sin").is_none());
        assert!(modules.resolve("time.now").is_none());

        assert_eq!(modules.resolve_prefix("math.s").len(), 2);
        assert_eq!(modules.resolve_prefix("ma").len(), 2);
        assert!(modules.resolve_prefix("x").is_empty());
    }

    #[test]
    fn test_channel_registry_by_name_and_key() {
        let registry = ChannelRegistry::new();
        registry.register(12, "ox_pt_1", Type::F32);
        registry.register(13, "ox_pt_2", Type::F64);

        assert_eq!(registry.resolve("ox_pt_1").and_then(|s| s.id), Some(12));
        let by_key = registry.resolve("13").unwrap();
        assert_eq!(by_key.name, "ox_pt_2");
        assert_eq!(by_key.ty, Type::chan(Type::F64));

        registry.register(12, "renamed", Type::F32);
        assert!(registry.resolve("ox_pt_1").is_none());
        assert_eq!(registry.resolve_prefix("").len(), 2);

        assert!(registry.unregister(13).is_some());
        assert!(registry.resolve("ox_pt_2").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_channel_moved_to_new_key_drops_old_key() {
        let registry = ChannelRegistry::new();
        registry.register(1, "ox_pt_1", Type::F32);
        registry.register(2, "ox_pt_1", Type::F64);

        assert!(registry.resolve("1").is_none());
        assert_eq!(registry.resolve("ox_pt_1").and_then(|s| s.id), Some(2));
        assert_eq!(registry.resolve("2").map(|s| s.ty), Some(Type::chan(Type::F64)));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.resolve_prefix("ox").len(), 1);
    }

    #[test]
    fn test_registry_is_shareable_across_threads() {
        use std::sync::Arc;
        let registry = Arc::new(ChannelRegistry::new());
        registry.register(1, "a", Type::U8);

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || registry.resolve("a").is_some())
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap());
        }
    }
}
