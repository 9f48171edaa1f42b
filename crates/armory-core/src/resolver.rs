//! Extension dependency resolution.

use std::collections::HashSet;

use tracing::warn;

/// Why a dependency walk stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The last package declares no dependency.
    Complete,
    /// A package depends on itself.
    SelfDependency(String),
    /// A dependency was already seen (cycle or diamond).
    AlreadyVisited(String),
    /// The chain reached the depth limit.
    DepthLimit,
}

/// Transitive dependencies of one extension, in discovery order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyChain {
    /// Dependencies, nearest first. Never contains the root.
    pub dependencies: Vec<String>,
    /// Why the walk ended.
    pub stop: StopReason,
}

impl DependencyChain {
    /// Dependencies in install order (deepest first).
    pub fn install_order(&self) -> impl Iterator<Item = &str> {
        self.dependencies.iter().rev().map(String::as_str)
    }
}

/// Walks `depends_on` links starting at `root`.
///
/// `depends_on` maps a command name to the command name it depends on, or
/// `None` if it has no dependency or is unknown. The walk never fails: it
/// stops on a self-dependency, a repeated name or after `max_depth`
/// dependencies, and returns what it found so far.
pub fn resolve_dependencies<F>(root: &str, max_depth: usize, mut depends_on: F) -> DependencyChain
where
    F: FnMut(&str) -> Option<String>,
{
    let mut visited: HashSet<String> = HashSet::from([root.to_string()]);
    let mut dependencies = Vec::new();
    let mut current = root.to_string();

    let stop = loop {
        let Some(dep) = depends_on(&current) else {
            break StopReason::Complete;
        };
        if dep == current {
            break StopReason::SelfDependency(dep);
        }
        if visited.contains(&dep) {
            break StopReason::AlreadyVisited(dep);
        }
        if dependencies.len() >= max_depth {
            warn!("Dependency chain of '{root}' exceeds {max_depth} levels; stopping at '{current}'");
            break StopReason::DepthLimit;
        }
        visited.insert(dep.clone());
        dependencies.push(dep.clone());
        current = dep;
    };

    DependencyChain { dependencies, stop }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn graph(edges: &[(&str, &str)]) -> HashMap<String, String> {
        edges
            .iter()
            .map(|(a, b)| ((*a).to_string(), (*b).to_string()))
            .collect()
    }

    fn walk(edges: &[(&str, &str)], root: &str, max_depth: usize) -> DependencyChain {
        let g = graph(edges);
        resolve_dependencies(root, max_depth, |cmd| g.get(cmd).cloned())
    }

    #[test]
    fn test_simple_chain() {
        let chain = walk(&[("nanodump", "coff-loader")], "nanodump", 10);
        assert_eq!(chain.dependencies, vec!["coff-loader"]);
        assert_eq!(chain.stop, StopReason::Complete);
    }

    #[test]
    fn test_install_order_is_deepest_first() {
        let chain = walk(&[("a", "b"), ("b", "c")], "a", 10);
        let order: Vec<&str> = chain.install_order().collect();
        assert_eq!(order, vec!["c", "b"]);
    }

    #[test]
    fn test_no_dependencies() {
        let chain = walk(&[], "standalone", 10);
        assert!(chain.dependencies.is_empty());
        assert_eq!(chain.stop, StopReason::Complete);
    }

    #[test]
    fn test_three_cycle_terminates_without_root() {
        let chain = walk(&[("a", "b"), ("b", "c"), ("c", "a")], "a", 10);
        assert_eq!(chain.dependencies, vec!["b", "c"]);
        assert_eq!(chain.stop, StopReason::AlreadyVisited("a".into()));
    }

    #[test]
    fn test_self_dependency() {
        let chain = walk(&[("a", "a")], "a", 10);
        assert!(chain.dependencies.is_empty());
        assert_eq!(chain.stop, StopReason::SelfDependency("a".into()));
    }

    #[test]
    fn test_depth_limit() {
        let edges: Vec<(String, String)> = (0..20)
            .map(|i| (format!("p{i}"), format!("p{}", i + 1)))
            .collect();
        let borrowed: Vec<(&str, &str)> = edges
            .iter()
            .map(|(a, b)| (a.as_str(), b.as_str()))
            .collect();
        let chain = walk(&borrowed, "p0", 10);
        assert_eq!(chain.dependencies.len(), 10);
        assert_eq!(chain.dependencies.last().map(String::as_str), Some("p10"));
        assert_eq!(chain.stop, StopReason::DepthLimit);
    }
}
