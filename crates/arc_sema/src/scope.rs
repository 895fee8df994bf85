//! Scope Management
//!
//! 作用域树：每个作用域节点携带一个符号，子作用域按声明顺序排列。
//! 采用 arena 设计，父指针只是索引，不持有所有权。
//!
//! 解析顺序：当前作用域的直接子节点 → 当前作用域的全局解析器 → 父作用域。

use crate::error::{SemanticError, UndefinedSymbol};
use crate::resolver::Resolver;
use crate::symbol::{Channels, Symbol, SymbolKind};
use arc_syntax::ast::NodeId;
use arc_syntax::types::Type;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// 作用域 ID（在所属树内的下标）
pub type ScopeId = usize;

/// 解析成功时触发的副作用
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveHook {
    /// 把解析到的通道记入本作用域的 `channels.read`
    ChannelAccumulator,
}

/// 单个作用域
#[derive(Clone)]
pub struct Scope {
    pub id: ScopeId,
    pub symbol: Symbol,
    /// 父作用域 ID（根作用域为 None）
    pub parent: Option<ScopeId>,
    /// 子作用域，按添加顺序
    pub children: Vec<ScopeId>,
    pub channels: Channels,
    global_resolver: Option<Arc<dyn Resolver>>,
    /// 下一个可分配的 ID；只有 Function/Sequence 与根作用域持有计数器
    counter: Option<u32>,
    hook: Option<ResolveHook>,
}

impl Scope {
    fn new(id: ScopeId, parent: Option<ScopeId>, symbol: Symbol) -> Self {
        let counter = symbol.kind.owns_counter().then_some(0);
        Self {
            id,
            symbol,
            parent,
            children: Vec::new(),
            channels: Channels::new(),
            global_resolver: None,
            counter,
            hook: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.symbol.name
    }

    pub fn kind(&self) -> SymbolKind {
        self.symbol.kind
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("id", &self.id)
            .field("symbol", &self.symbol)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("channels", &self.channels)
            .field("global_resolver", &self.global_resolver.is_some())
            .field("counter", &self.counter)
            .field("hook", &self.hook)
            .finish()
    }
}

/// 解析结果
///
/// `scope` 为 None 表示符号来自全局解析器，不在树中
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub scope: Option<ScopeId>,
    pub symbol: Symbol,
}

/// 作用域树
#[derive(Debug, Clone)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
}

impl ScopeTree {
    /// 创建只有根作用域的树，根作用域持有新的 ID 计数器
    pub fn new(global_resolver: Option<Arc<dyn Resolver>>) -> Self {
        let mut root = Scope::new(0, None, Symbol::new("", SymbolKind::Block, Type::Invalid));
        root.counter = Some(0);
        root.global_resolver = global_resolver;
        Self { scopes: vec![root] }
    }

    pub fn root(&self) -> ScopeId {
        0
    }

    pub fn get(&self, id: ScopeId) -> &Scope {
        &self.scopes[id]
    }

    pub fn symbol(&self, id: ScopeId) -> &Symbol {
        &self.scopes[id].symbol
    }

    pub fn symbol_mut(&mut self, id: ScopeId) -> &mut Symbol {
        &mut self.scopes[id].symbol
    }

    pub fn parent(&self, id: ScopeId) -> Option<ScopeId> {
        self.scopes[id].parent
    }

    pub fn children(&self, id: ScopeId) -> &[ScopeId] {
        &self.scopes[id].children
    }

    pub fn channels(&self, id: ScopeId) -> &Channels {
        &self.scopes[id].channels
    }

    pub fn channels_mut(&mut self, id: ScopeId) -> &mut Channels {
        &mut self.scopes[id].channels
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// 添加子作用域
    ///
    /// 名称非空时先检查冲突：若能解析到同名且来自源码的符号则报错，
    /// 来自全局解析器的符号允许被遮蔽。ID 在最近的计数器上分配。
    pub fn add(&mut self, parent: ScopeId, mut symbol: Symbol) -> Result<ScopeId, SemanticError> {
        if !symbol.name.is_empty() {
            if let Some(existing) = self.lookup(parent, &symbol.name) {
                if let Some(previous) = existing.symbol.ast {
                    return Err(SemanticError::NameConflict {
                        name: symbol.name,
                        span: symbol.ast.map(|a| a.span),
                        previous: previous.span,
                    });
                }
            }
        }

        if symbol.kind.is_id_bearing() {
            symbol.id = Some(self.next_id(parent));
        }

        let id = self.scopes.len();
        self.scopes.push(Scope::new(id, Some(parent), symbol));
        self.scopes[parent].children.push(id);
        Ok(id)
    }

    /// 从最近的计数器分配 ID
    fn next_id(&mut self, from: ScopeId) -> u32 {
        let mut current = Some(from);
        while let Some(id) = current {
            if let Some(next) = self.scopes[id].counter {
                self.scopes[id].counter = Some(next + 1);
                return next;
            }
            current = self.scopes[id].parent;
        }
        // 根作用域总是持有计数器，不会走到这里
        0
    }

    /// 仅在一个作用域内查找：子节点优先，其次是该作用域的全局解析器
    fn find_local(&self, id: ScopeId, name: &str) -> Option<Resolved> {
        let scope = &self.scopes[id];
        let child = scope
            .children
            .iter()
            .find(|&&child| self.scopes[child].symbol.name == name);
        if let Some(&child) = child {
            return Some(Resolved {
                scope: Some(child),
                symbol: self.scopes[child].symbol.clone(),
            });
        }
        scope
            .global_resolver
            .as_ref()
            .and_then(|r| r.resolve(name))
            .map(|symbol| Resolved {
                scope: None,
                symbol,
            })
    }

    /// 解析名称，沿途触发解析钩子
    pub fn resolve(&mut self, from: ScopeId, name: &str) -> Result<Resolved, UndefinedSymbol> {
        let mut path = Vec::new();
        let mut current = Some(from);
        while let Some(id) = current {
            path.push(id);
            if let Some(found) = self.find_local(id, name) {
                self.fire_hooks(&path, &found.symbol);
                return Ok(found);
            }
            current = self.scopes[id].parent;
        }
        Err(UndefinedSymbol {
            name: name.to_string(),
            scope: from,
        })
    }

    /// 无副作用的解析：不触发钩子，失败时也不构造错误
    pub fn lookup(&self, from: ScopeId, name: &str) -> Option<Resolved> {
        let mut current = Some(from);
        while let Some(id) = current {
            if let Some(found) = self.find_local(id, name) {
                return Some(found);
            }
            current = self.scopes[id].parent;
        }
        None
    }

    fn fire_hooks(&mut self, path: &[ScopeId], symbol: &Symbol) {
        for &id in path {
            match self.scopes[id].hook {
                Some(ResolveHook::ChannelAccumulator) if symbol.is_channel() => {
                    if let Some(channel) = symbol.channel_id() {
                        self.scopes[id].channels.add_read(channel, symbol.name.clone());
                    }
                }
                _ => {}
            }
        }
    }

    /// 前缀查找，顺序与 resolve 相同，按名称去重（先到先得）
    pub fn resolve_prefix(&self, from: ScopeId, prefix: &str) -> Vec<Resolved> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        let mut current = Some(from);
        while let Some(id) = current {
            let scope = &self.scopes[id];
            for &child in &scope.children {
                let symbol = &self.scopes[child].symbol;
                if !symbol.name.is_empty()
                    && symbol.name.starts_with(prefix)
                    && seen.insert(symbol.name.clone())
                {
                    out.push(Resolved {
                        scope: Some(child),
                        symbol: symbol.clone(),
                    });
                }
            }
            if let Some(resolver) = &scope.global_resolver {
                for symbol in resolver.resolve_prefix(prefix) {
                    if seen.insert(symbol.name.clone()) {
                        out.push(Resolved {
                            scope: None,
                            symbol,
                        });
                    }
                }
            }
            current = scope.parent;
        }
        out
    }

    /// 所有可见名称（供 "did you mean" 使用）
    pub fn visible_names(&self, from: ScopeId) -> Vec<String> {
        self.resolve_prefix(from, "")
            .into_iter()
            .map(|r| r.symbol.name)
            .collect()
    }

    /// 开启通道读取累积
    pub fn accumulate_read_channels(&mut self, id: ScopeId) {
        self.scopes[id].hook = Some(ResolveHook::ChannelAccumulator);
    }

    pub fn find_child_by_name(&self, id: ScopeId, name: &str) -> Option<ScopeId> {
        self.scopes[id]
            .children
            .iter()
            .copied()
            .find(|&c| self.scopes[c].symbol.name == name)
    }

    pub fn filter_children_by_kind(&self, id: ScopeId, kind: SymbolKind) -> Vec<ScopeId> {
        self.scopes[id]
            .children
            .iter()
            .copied()
            .filter(|&c| self.scopes[c].symbol.kind == kind)
            .collect()
    }

    pub fn first_child_of_kind(&self, id: ScopeId, kind: SymbolKind) -> Option<ScopeId> {
        self.scopes[id]
            .children
            .iter()
            .copied()
            .find(|&c| self.scopes[c].symbol.kind == kind)
    }

    /// 最近的指定种类祖先（包含自身）
    pub fn closest_ancestor_of_kind(&self, id: ScopeId, kind: SymbolKind) -> Option<ScopeId> {
        let mut current = Some(id);
        while let Some(cur) = current {
            if self.scopes[cur].symbol.kind == kind {
                return Some(cur);
            }
            current = self.scopes[cur].parent;
        }
        None
    }

    /// 在子树中查找绑定到指定 AST 节点的作用域
    pub fn child_by_ast(&self, id: ScopeId, node: NodeId) -> Option<ScopeId> {
        let mut stack: Vec<ScopeId> = self.scopes[id].children.iter().rev().copied().collect();
        while let Some(cur) = stack.pop() {
            if self.scopes[cur].symbol.ast.map(|a| a.node) == Some(node) {
                return Some(cur);
            }
            stack.extend(self.scopes[cur].children.iter().rev().copied());
        }
        None
    }

    /// 生成在 `id` 中未被占用的名称: prefix0, prefix1, ...
    pub fn auto_name(&self, id: ScopeId, prefix: &str) -> String {
        let mut n = 0;
        loop {
            let candidate = format!("{}{}", prefix, n);
            if self.lookup(id, &candidate).is_none() {
                return candidate;
            }
            n += 1;
        }
    }

    /// 以 `id` 为根的子树文本表示
    pub fn display(&self, id: ScopeId) -> ScopeDisplay<'_> {
        ScopeDisplay { tree: self, id }
    }

    fn fmt_scope(&self, f: &mut fmt::Formatter<'_>, id: ScopeId, depth: usize) -> fmt::Result {
        let scope = &self.scopes[id];
        let name = if scope.symbol.name.is_empty() {
            "<anonymous>"
        } else {
            &scope.symbol.name
        };
        write!(f, "{:indent$}{} ({})", "", name, scope.symbol.kind, indent = depth * 2)?;
        if let Some(id) = scope.symbol.id {
            write!(f, " #{}", id)?;
        }
        if scope.symbol.ty.is_valid() {
            write!(f, ": {}", scope.symbol.ty)?;
        }
        writeln!(f)?;
        for &child in &scope.children {
            self.fmt_scope(f, child, depth + 1)?;
        }
        Ok(())
    }
}

pub struct ScopeDisplay<'a> {
    tree: &'a ScopeTree,
    id: ScopeId,
}

impl fmt::Display for ScopeDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.tree.fmt_scope(f, self.id, 0)
    }
}

impl fmt::Display for ScopeTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_scope(f, self.root(), 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::MapResolver;
    use arc_diagnostics::Span;
    use arc_syntax::ast::AstRef;

    fn src(node: u32, line: u32, column: u32) -> AstRef {
        AstRef::new(NodeId(node), Span::point(line, column))
    }

    fn globals() -> Arc<dyn Resolver> {
        Arc::new(
            MapResolver::new()
                .with(Symbol::channel("ox_pt_1", 1, Type::F32))
                .with(Symbol::channel("shared", 7, Type::F32)),
        )
    }

    #[test]
    fn test_resolution_order() {
        let mut tree = ScopeTree::new(Some(globals()));
        let root = tree.root();
        let func = tree
            .add(
                root,
                Symbol::new("calc", SymbolKind::Function, Type::Invalid).with_ast(src(0, 1, 1)),
            )
            .unwrap();
        let block = tree
            .add(func, Symbol::new("", SymbolKind::Block, Type::Invalid))
            .unwrap();

        // 局部声明遮蔽全局
        tree.add(
            block,
            Symbol::new("shared", SymbolKind::Variable, Type::I64).with_ast(src(1, 2, 5)),
        )
        .unwrap();

        let local = tree.resolve(block, "shared").unwrap();
        assert_eq!(local.symbol.kind, SymbolKind::Variable);
        assert!(local.scope.is_some());

        let global = tree.resolve(block, "ox_pt_1").unwrap();
        assert!(global.scope.is_none());
        assert_eq!(global.symbol.id, Some(1));

        // 祖先中的声明同样可见
        assert_eq!(tree.resolve(block, "calc").unwrap().scope, Some(func));

        // 兄弟函数体内不可见
        assert!(tree.resolve(root, "shared").unwrap().scope.is_none());
        assert!(tree.resolve(func, "missing").is_err());
    }

    #[test]
    fn test_shadowing_global_is_not_conflict() {
        let mut tree = ScopeTree::new(Some(globals()));
        let root = tree.root();
        let result = tree.add(
            root,
            Symbol::new("ox_pt_1", SymbolKind::Variable, Type::F32).with_ast(src(0, 1, 1)),
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_name_conflict_cites_previous_position() {
        let mut tree = ScopeTree::new(None);
        let root = tree.root();
        let func = tree
            .add(root, Symbol::new("f", SymbolKind::Function, Type::Invalid).with_ast(src(0, 1, 1)))
            .unwrap();
        tree.add(
            func,
            Symbol::new("x", SymbolKind::Variable, Type::I64).with_ast(src(1, 2, 5)),
        )
        .unwrap();

        let err = tree
            .add(
                func,
                Symbol::new("x", SymbolKind::Variable, Type::I64).with_ast(src(2, 3, 5)),
            )
            .unwrap_err();
        match err {
            SemanticError::NameConflict { name, previous, span } => {
                assert_eq!(name, "x");
                assert_eq!((previous.start.line, previous.start.column), (2, 5));
                assert_eq!(span, Some(Span::point(3, 5)));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_ids_dense_through_nested_blocks() {
        let mut tree = ScopeTree::new(None);
        let root = tree.root();
        let func = tree
            .add(root, Symbol::new("f", SymbolKind::Function, Type::Invalid))
            .unwrap();
        let a = tree.add(func, Symbol::new("a", SymbolKind::Input, Type::F32)).unwrap();
        let block = tree.add(func, Symbol::new("", SymbolKind::Block, Type::Invalid)).unwrap();
        let inner = tree.add(block, Symbol::new("", SymbolKind::Block, Type::Invalid)).unwrap();
        let b = tree.add(inner, Symbol::new("b", SymbolKind::Variable, Type::F32)).unwrap();
        let c = tree
            .add(block, Symbol::new("c", SymbolKind::StatefulVariable, Type::F32))
            .unwrap();

        let ids: Vec<_> = [a, b, c].iter().map(|&s| tree.symbol(s).id).collect();
        assert_eq!(ids, vec![Some(0), Some(1), Some(2)]);
        assert_eq!(tree.symbol(block).id, None);

        // 新的函数拥有新的计数器
        let g = tree
            .add(root, Symbol::new("g", SymbolKind::Function, Type::Invalid))
            .unwrap();
        let d = tree.add(g, Symbol::new("d", SymbolKind::Input, Type::F32)).unwrap();
        assert_eq!(tree.symbol(d).id, Some(0));
    }

    #[test]
    fn test_channel_accumulation_through_parents() {
        let mut tree = ScopeTree::new(Some(globals()));
        let root = tree.root();
        let func = tree
            .add(root, Symbol::new("f", SymbolKind::Function, Type::Invalid))
            .unwrap();
        tree.accumulate_read_channels(func);
        let block = tree.add(func, Symbol::new("", SymbolKind::Block, Type::Invalid)).unwrap();

        tree.resolve(block, "ox_pt_1").unwrap();
        assert_eq!(tree.channels(func).read.get(&1).map(String::as_str), Some("ox_pt_1"));

        // lookup 没有副作用
        tree.lookup(block, "shared");
        assert!(!tree.channels(func).read.contains_key(&7));

        // 钩子只作用于解析路径上的作用域
        tree.resolve(root, "shared").unwrap();
        assert!(!tree.channels(func).read.contains_key(&7));
    }

    #[test]
    fn test_resolve_prefix_dedups_first_wins() {
        let mut tree = ScopeTree::new(Some(globals()));
        let root = tree.root();
        tree.add(
            root,
            Symbol::new("shared", SymbolKind::Variable, Type::I64).with_ast(src(0, 1, 1)),
        )
        .unwrap();

        let matches = tree.resolve_prefix(root, "sh");
        assert_eq!(matches.len(), 1);
        assert!(matches[0].scope.is_some());
        assert_eq!(tree.resolve_prefix(root, "").len(), 2);
    }

    #[test]
    fn test_navigation_helpers() {
        let mut tree = ScopeTree::new(None);
        let root = tree.root();
        let seq = tree
            .add(root, Symbol::new("main", SymbolKind::Sequence, Type::Invalid))
            .unwrap();
        let first = tree
            .add(seq, Symbol::new("first", SymbolKind::Stage, Type::Invalid).with_ast(src(9, 2, 1)))
            .unwrap();
        let second = tree
            .add(seq, Symbol::new("second", SymbolKind::Stage, Type::Invalid))
            .unwrap();

        assert_eq!(tree.find_child_by_name(seq, "second"), Some(second));
        assert_eq!(tree.first_child_of_kind(seq, SymbolKind::Stage), Some(first));
        assert_eq!(tree.filter_children_by_kind(seq, SymbolKind::Stage).len(), 2);
        assert_eq!(tree.closest_ancestor_of_kind(second, SymbolKind::Sequence), Some(seq));
        assert_eq!(tree.child_by_ast(root, NodeId(9)), Some(first));
        assert_eq!(tree.auto_name(root, "expression_"), "expression_0");

        let rendered = tree.to_string();
        assert!(rendered.contains("main (sequence)"));
        assert!(rendered.contains("    second (stage)"));
    }
}
